//! GC Heap management

use std::borrow::Cow;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::error::AllocError;
use crate::object::{Block, Body, Header, WORD_SIZE, bytes_wosize, tags};
use crate::value::{Addr, Value};

/// First address handed out by a fresh heap
const HEAP_BASE: u64 = 0x1000;

/// When allocations should be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultPolicy {
    /// Allocations only fail when the heap limit is reached
    #[default]
    Never,
    /// Every allocation fails
    Always,
    /// Fail once this many allocations have succeeded
    AfterAllocations(u64),
}

/// GC configuration
#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Hard limit on live words, headers included (default: unlimited)
    pub heap_limit_words: Option<usize>,
    /// Live words that trigger a collection before the next allocation (default: 256K words)
    pub collect_threshold_words: usize,
    /// Collect before every allocation (default: false)
    pub collect_every_allocation: bool,
    /// Fault injection (default: never)
    pub fault: FaultPolicy,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            heap_limit_words: None,
            collect_threshold_words: 256 * 1024, // 2MB
            collect_every_allocation: false,
            fault: FaultPolicy::Never,
        }
    }
}

impl GcConfig {
    /// Configuration that collects on every allocation
    pub fn stress() -> Self {
        Self {
            collect_every_allocation: true,
            ..Self::default()
        }
    }

    /// Configuration where every allocation fails
    pub fn failing() -> Self {
        Self {
            fault: FaultPolicy::Always,
            ..Self::default()
        }
    }
}

/// GC statistics
#[derive(Debug, Default, Clone)]
pub struct HeapStats {
    /// Calls into the allocator, including failed ones
    pub allocation_calls: u64,
    /// Successful allocations
    pub allocations: u64,
    /// Allocations that returned an error
    pub failed_allocations: u64,
    /// Words handed out, headers included
    pub words_allocated: u64,
    /// Number of collections
    pub collections: u64,
    /// Words reclaimed in last collection
    pub last_reclaimed_words: usize,
    /// Blocks copied in last collection
    pub last_relocated: usize,
    /// Total time spent in collection
    pub total_pause: Duration,
    /// Duration of the last collection
    pub last_pause: Duration,
}

/// Handle to a global root slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(usize);

/// The managed heap.
///
/// Owns every block, the LIFO root stack used while values are held in
/// native locals, and a table of long-lived global roots. Collections copy
/// every reachable block to a new address and rewrite all roots.
pub struct Heap {
    config: GcConfig,
    pub(crate) blocks: FxHashMap<Addr, Block>,
    pub(crate) next_addr: u64,
    pub(crate) live_words: usize,
    pub(crate) root_stack: Vec<Value>,
    pub(crate) globals: Vec<Option<Value>>,
    globals_free: Vec<usize>,
    pub(crate) stats: HeapStats,
}

impl Heap {
    /// Create new heap with default config
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    /// Create new heap with custom config
    pub fn with_config(config: GcConfig) -> Self {
        Self {
            config,
            blocks: FxHashMap::default(),
            next_addr: HEAP_BASE,
            live_words: 0,
            root_stack: Vec::new(),
            globals: Vec::new(),
            globals_free: Vec::new(),
            stats: HeapStats::default(),
        }
    }

    /// Get config
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Mutable config, for adjusting fault injection at runtime
    pub fn config_mut(&mut self) -> &mut GcConfig {
        &mut self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }

    /// Words currently live, headers included
    pub fn live_words(&self) -> usize {
        self.live_words
    }

    /// Number of blocks currently in the heap
    pub fn live_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Allocate a record of `wosize` fields, each initialized to unit.
    ///
    /// May run a collection first. Every heap value not registered as a
    /// root is invalid once this returns.
    pub fn allocate(&mut self, wosize: usize, tag: u8) -> Result<Value, AllocError> {
        let body = Body::Fields(vec![Value::UNIT; wosize]);
        self.allocate_block(Header::new(wosize, tag), body)
    }

    /// Allocate a string block holding a copy of `bytes`
    pub fn alloc_string(&mut self, bytes: &[u8]) -> Result<Value, AllocError> {
        let header = Header::new(bytes_wosize(bytes.len()), tags::STRING);
        self.allocate_block(header, Body::Bytes(bytes.into()))
    }

    fn allocate_block(&mut self, header: Header, body: Body) -> Result<Value, AllocError> {
        self.stats.allocation_calls += 1;
        if let Err(err) = self.check_fault() {
            self.stats.failed_allocations += 1;
            return Err(err);
        }

        let words = header.wosize() + 1;
        let mut collected = false;
        if self.config.collect_every_allocation
            || self.live_words + words > self.config.collect_threshold_words
        {
            self.collect();
            collected = true;
        }

        if let Some(limit) = self.config.heap_limit_words {
            // Only report exhaustion once garbage has been reclaimed
            if !collected && self.live_words + words > limit {
                self.collect();
            }
            if self.live_words + words > limit {
                self.stats.failed_allocations += 1;
                return Err(AllocError::OutOfMemory {
                    requested: words,
                    limit,
                });
            }
        }

        let addr = self.fresh_addr(words);
        self.blocks.insert(addr, Block { header, body });
        self.live_words += words;
        self.stats.allocations += 1;
        self.stats.words_allocated += words as u64;
        Ok(Value::Block(addr))
    }

    fn check_fault(&self) -> Result<(), AllocError> {
        let allocations = self.stats.allocations;
        match self.config.fault {
            FaultPolicy::Never => Ok(()),
            FaultPolicy::Always => Err(AllocError::InjectedFault { allocations }),
            FaultPolicy::AfterAllocations(n) if allocations >= n => {
                Err(AllocError::InjectedFault { allocations })
            }
            FaultPolicy::AfterAllocations(_) => Ok(()),
        }
    }

    pub(crate) fn fresh_addr(&mut self, words: usize) -> Addr {
        let addr = Addr::new(self.next_addr);
        self.next_addr += (words * WORD_SIZE) as u64;
        addr
    }

    /// Header of the block `v` points to
    pub fn header(&self, v: Value) -> Option<Header> {
        match v {
            Value::Int(_) => None,
            Value::Block(addr) => self.blocks.get(&addr).map(|b| b.header),
            Value::Static(block) => Some(*block.header()),
        }
    }

    /// True if `v` is an immediate, a static block, or a live heap block
    pub fn contains(&self, v: Value) -> bool {
        match v {
            Value::Block(addr) => self.blocks.contains_key(&addr),
            _ => true,
        }
    }

    /// All fields of a record
    pub fn fields(&self, v: Value) -> Option<&[Value]> {
        match v {
            Value::Int(_) => None,
            Value::Block(addr) => match &self.blocks.get(&addr)?.body {
                Body::Fields(fields) => Some(fields),
                Body::Bytes(_) => None,
            },
            Value::Static(block) => block.fields(),
        }
    }

    /// Mutable fields of a heap record. Static blocks are immutable.
    pub fn fields_mut(&mut self, v: Value) -> Option<&mut [Value]> {
        let addr = v.addr()?;
        match &mut self.blocks.get_mut(&addr)?.body {
            Body::Fields(fields) => Some(fields),
            Body::Bytes(_) => None,
        }
    }

    /// A single field of a record
    pub fn field(&self, v: Value, index: usize) -> Option<Value> {
        self.fields(v)?.get(index).copied()
    }

    /// Payload of a string block
    pub fn bytes(&self, v: Value) -> Option<&[u8]> {
        match v {
            Value::Int(_) => None,
            Value::Block(addr) => match &self.blocks.get(&addr)?.body {
                Body::Bytes(bytes) => Some(bytes),
                Body::Fields(_) => None,
            },
            Value::Static(block) => block.bytes(),
        }
    }

    /// Payload of a string block, decoded lossily as UTF-8
    pub fn string(&self, v: Value) -> Option<Cow<'_, str>> {
        self.bytes(v).map(String::from_utf8_lossy)
    }

    // ------------------------------------------------------------------
    // Root stack
    // ------------------------------------------------------------------

    /// Current length of the root stack
    pub fn root_depth(&self) -> usize {
        self.root_stack.len()
    }

    /// Drop every root above `depth`.
    ///
    /// Handler scopes call this after catching, mirroring what the guards
    /// abandoned by the unwind already did.
    pub fn truncate_roots(&mut self, depth: usize) {
        self.root_stack.truncate(depth);
    }

    pub(crate) fn root(&self, slot: usize) -> Value {
        self.root_stack[slot]
    }

    // ------------------------------------------------------------------
    // Global roots
    // ------------------------------------------------------------------

    /// Register a long-lived root
    pub fn add_global(&mut self, value: Value) -> GlobalId {
        if let Some(slot) = self.globals_free.pop() {
            self.globals[slot] = Some(value);
            return GlobalId(slot);
        }
        self.globals.push(Some(value));
        GlobalId(self.globals.len() - 1)
    }

    /// Current value of a global root
    pub fn global(&self, id: GlobalId) -> Option<Value> {
        self.globals.get(id.0).copied().flatten()
    }

    /// Overwrite a global root. Returns false if the slot was removed.
    pub fn set_global(&mut self, id: GlobalId, value: Value) -> bool {
        match self.globals.get_mut(id.0) {
            Some(slot) if slot.is_some() => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Unregister a global root
    pub fn remove_global(&mut self, id: GlobalId) -> Option<Value> {
        let value = self.globals.get_mut(id.0)?.take()?;
        self.globals_free.push(id.0);
        Some(value)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
