//! Runtime - the main entry point
//!
//! Owns the heap and the collaborators the raising core relies on: the
//! unwinder (handler frames and the transfer primitive), the blocking-section
//! tracker and the process boundary.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};

use heron_gc::{AllocError, GcConfig, GlobalId, Heap, Value, tags};

use crate::boundary::{ExitBoundary, ProcessBoundary, UNCAUGHT_EXIT_CODE};
use crate::error::{RuntimeResult, UncaughtException};
use crate::exception::ExceptionObject;
use crate::section::{BlockingSection, SectionFlag};
use crate::tag::{ExnTag, UserTag};
use crate::unwind::{PanicUnwinder, Unwinder};

/// Source of per-runtime stamps for user-defined tags
static NEXT_STAMP: AtomicU32 = AtomicU32::new(1);

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Heap configuration
    pub gc: GcConfig,
    /// Exit status used by the default boundary for an uncaught exception
    pub exit_code_on_uncaught: i32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc: GcConfig::default(),
            exit_code_on_uncaught: UNCAUGHT_EXIT_CODE,
        }
    }
}

/// A single-threaded runtime instance
pub struct Runtime {
    pub(crate) heap: Heap,
    pub(crate) unwinder: Box<dyn Unwinder>,
    pub(crate) section: Box<dyn BlockingSection>,
    pub(crate) boundary: Box<dyn ProcessBoundary>,
    /// Stamp carried by every tag this runtime defines
    stamp: u32,
    /// Global roots of user-defined constructors, indexed by tag index - 1
    constructors: Vec<GlobalId>,
}

impl Runtime {
    /// Create a new runtime with default configuration
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            heap: Heap::with_config(config.gc),
            unwinder: Box::new(PanicUnwinder::new()),
            section: Box::new(SectionFlag::new()),
            boundary: Box::new(ExitBoundary::new(config.exit_code_on_uncaught)),
            stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed) & 0x7fff_ffff,
            constructors: Vec::new(),
        }
    }

    /// Replace the unwinder
    pub fn with_unwinder(mut self, unwinder: impl Unwinder + 'static) -> Self {
        self.unwinder = Box::new(unwinder);
        self
    }

    /// Replace the blocking-section tracker
    pub fn with_blocking_section(mut self, section: impl BlockingSection + 'static) -> Self {
        self.section = Box::new(section);
        self
    }

    /// Replace the process boundary
    pub fn with_boundary(mut self, boundary: impl ProcessBoundary + 'static) -> Self {
        self.boundary = Box::new(boundary);
        self
    }

    /// Get the heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Get the heap mutably
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    /// Run `body` with a handler installed.
    ///
    /// Returns `Err` with the bucket if `body` raised. Root registrations made
    /// inside `body` are gone once this returns, and the returned bucket is
    /// not rooted: register it with [`register_global`](Self::register_global)
    /// before allocating again if it must outlive the next collection. Panics
    /// that are not raises keep unwinding.
    pub fn try_with<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> Result<R, ExceptionObject> {
        let depth = self.heap.root_depth();
        self.unwinder.enter_handler();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(self)));
        self.unwinder.leave_handler();

        match outcome {
            Ok(value) => Ok(value),
            Err(payload) => match self.unwinder.recover(payload) {
                Ok(exn) => {
                    self.heap.truncate_roots(depth);
                    Err(exn)
                }
                Err(payload) => panic::resume_unwind(payload),
            },
        }
    }

    /// Run `body` as a toplevel computation, turning an escaping raise into
    /// [`RuntimeError::Uncaught`](crate::RuntimeError::Uncaught)
    pub fn run_toplevel<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> RuntimeResult<R> {
        self.try_with(body).map_err(|exn| {
            let report = UncaughtException::new(exn, self.describe(exn));
            tracing::debug!(target: "heron::raise", "toplevel caught {report}");
            report.into()
        })
    }

    // ------------------------------------------------------------------
    // Blocking sections
    // ------------------------------------------------------------------

    /// Hand control to native code
    pub fn enter_blocking_section(&mut self) {
        self.section.enter_blocking_section();
    }

    /// Take control back from native code
    pub fn leave_blocking_section(&mut self) {
        self.section.exit_blocking_section();
    }

    /// True while native code holds control
    pub fn in_blocking_section(&self) -> bool {
        self.section.is_active()
    }

    /// Run `body` inside a blocking section.
    ///
    /// A raise from `body` leaves the section on its way out.
    pub fn blocking<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.enter_blocking_section();
        let result = body(self);
        self.leave_blocking_section();
        result
    }

    // ------------------------------------------------------------------
    // Roots and constructors
    // ------------------------------------------------------------------

    /// Keep `value` alive (and up to date) across collections
    pub fn register_global(&mut self, value: Value) -> GlobalId {
        self.heap.add_global(value)
    }

    /// Current value of a global root
    pub fn global(&self, id: GlobalId) -> Option<Value> {
        self.heap.global(id)
    }

    /// Drop a global root
    pub fn release_global(&mut self, id: GlobalId) -> Option<Value> {
        self.heap.remove_global(id)
    }

    /// Copy native text into a fresh string value.
    ///
    /// Raises `Out_of_memory` if the heap cannot hold it.
    pub fn intern_text(&mut self, text: &[u8]) -> Value {
        match self.heap.alloc_string(text) {
            Ok(v) => v,
            Err(err) => self.allocation_failed(err),
        }
    }

    /// Create a new exception constructor named `name`
    pub fn define_exception(&mut self, name: &str) -> ExnTag {
        let index = match u32::try_from(self.constructors.len() + 1) {
            Ok(index) => index,
            Err(_) => self.invalid_argument("too many exception constructors"),
        };
        let tag = UserTag::compose(self.stamp, index);
        let id = tag.id();
        let name = self.intern_text(name.as_bytes());
        let constructor =
            match self
                .heap
                .allocate_protected(&[name], 2, tags::OBJECT, |roots, fields| {
                    fields[0] = roots[0];
                    fields[1] = Value::Int(id);
                }) {
                Ok(v) => v,
                Err(err) => self.allocation_failed(err),
            };
        let root = self.heap.add_global(constructor);
        self.constructors.push(root);
        ExnTag::User(tag)
    }

    /// Current constructor block of `tag`, or `None` if this runtime did not
    /// define it
    pub fn constructor(&self, tag: ExnTag) -> Option<Value> {
        match tag {
            ExnTag::Predefined(p) => Some(p.value()),
            ExnTag::User(user) if user.stamp() == self.stamp => {
                let slot = usize::try_from(user.index()).ok()?.checked_sub(1)?;
                self.heap.global(*self.constructors.get(slot)?)
            }
            ExnTag::User(_) => None,
        }
    }

    /// Tag of `exn`, provided its constructor is one this runtime knows
    pub fn tag_of(&self, exn: ExceptionObject) -> Option<ExnTag> {
        let constructor = exn.constructor(&self.heap)?;
        let tag = ExnTag::of_constructor(&self.heap, constructor)?;
        (self.constructor(tag)? == constructor).then_some(tag)
    }

    /// Constructor name of `tag`
    pub fn tag_name(&self, tag: ExnTag) -> Option<String> {
        let constructor = self.constructor(tag)?;
        let name = self.heap.field(constructor, 0)?;
        self.heap.string(name).map(|s| s.into_owned())
    }

    /// Constructor block of `tag`, raising `Invalid_argument` for a tag this
    /// runtime never defined
    pub(crate) fn constructor_or_raise(&mut self, tag: ExnTag) -> Value {
        match self.constructor(tag) {
            Some(v) => v,
            None => self.invalid_argument("unknown exception constructor"),
        }
    }

    pub(crate) fn allocation_failed(&mut self, err: AllocError) -> ! {
        tracing::warn!(target: "heron::raise", %err, "allocation failed");
        self.out_of_memory()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
