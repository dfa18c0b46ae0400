//! Copying garbage collector
//!
//! Every block reachable from the root stack or the global roots is copied to
//! a fresh address; everything else is dropped. Static blocks are never
//! visited. The collection runs to completion before the allocation that
//! triggered it proceeds.

use std::collections::VecDeque;
use std::time::Instant;

use rustc_hash::FxHashMap;

use crate::heap::Heap;
use crate::object::{Block, Body};
use crate::value::{Addr, Value};

/// Evacuation state for one collection
struct Copier {
    /// Blocks not yet copied
    from_space: FxHashMap<Addr, Block>,
    /// Old address -> new address
    forwarding: FxHashMap<Addr, Addr>,
    /// Copied blocks whose fields still point into from-space
    worklist: VecDeque<Addr>,
    copied: usize,
}

impl Copier {
    fn new(from_space: FxHashMap<Addr, Block>) -> Self {
        Self {
            from_space,
            forwarding: FxHashMap::default(),
            worklist: VecDeque::new(),
            copied: 0,
        }
    }

    /// Copy the block `v` points to, if not copied yet, and return its new location
    fn evacuate(&mut self, heap: &mut Heap, v: Value) -> Value {
        let Value::Block(old) = v else {
            return v;
        };
        if let Some(&new) = self.forwarding.get(&old) {
            return Value::Block(new);
        }
        let Some(mut block) = self.from_space.remove(&old) else {
            // Not a from-space address; leave it for the caller to notice
            return v;
        };

        block.header.promote();
        let new = heap.fresh_addr(block.total_words());
        let scan = matches!(block.body, Body::Fields(_));
        heap.blocks.insert(new, block);
        self.forwarding.insert(old, new);
        self.copied += 1;
        if scan {
            self.worklist.push_back(new);
        }
        Value::Block(new)
    }

    /// Scan copied blocks until no from-space pointers remain
    fn drain(&mut self, heap: &mut Heap) {
        while let Some(addr) = self.worklist.pop_front() {
            let mut fields = match heap.blocks.get_mut(&addr).map(|b| &mut b.body) {
                Some(Body::Fields(fields)) => std::mem::take(fields),
                _ => continue,
            };
            for field in fields.iter_mut() {
                *field = self.evacuate(heap, *field);
            }
            if let Some(Block {
                body: Body::Fields(slot),
                ..
            }) = heap.blocks.get_mut(&addr)
            {
                *slot = fields;
            }
        }
    }
}

impl Heap {
    /// Run a full collection. Returns the number of words reclaimed.
    pub fn collect(&mut self) -> usize {
        let start = Instant::now();
        let initial_words = self.live_words;

        #[cfg(feature = "gc_logging")]
        tracing::debug!(
            target: "heron::gc",
            roots = self.root_stack.len(),
            globals = self.globals.len(),
            live_words = initial_words,
            blocks = self.blocks.len(),
            "GC cycle starting"
        );

        let mut copier = Copier::new(std::mem::take(&mut self.blocks));

        for slot in 0..self.root_stack.len() {
            let root = self.root_stack[slot];
            let moved = copier.evacuate(self, root);
            self.root_stack[slot] = moved;
        }
        for slot in 0..self.globals.len() {
            if let Some(root) = self.globals[slot] {
                let moved = copier.evacuate(self, root);
                self.globals[slot] = Some(moved);
            }
        }
        copier.drain(self);

        self.live_words = self.blocks.values().map(Block::total_words).sum();
        let reclaimed = initial_words.saturating_sub(self.live_words);
        let elapsed = start.elapsed();

        self.stats.collections += 1;
        self.stats.last_reclaimed_words = reclaimed;
        self.stats.last_relocated = copier.copied;
        self.stats.total_pause += elapsed;
        self.stats.last_pause = elapsed;

        #[cfg(feature = "gc_logging")]
        tracing::info!(
            target: "heron::gc",
            collection = self.stats.collections,
            reclaimed_words = reclaimed,
            relocated = copier.copied,
            freed_blocks = copier.from_space.len(),
            pause_us = elapsed.as_micros() as u64,
            live_words = self.live_words,
            "GC cycle complete"
        );

        reclaimed
    }
}
