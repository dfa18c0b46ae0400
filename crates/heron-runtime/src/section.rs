//! Blocking sections
//!
//! While native code runs on behalf of the runtime (a blocking I/O call, a
//! foreign library), the runtime's own invariants are suspended. A raise from
//! inside such a section must restore them before transferring control.

/// Tracks whether control is currently inside a blocking section
pub trait BlockingSection {
    /// Hand control to native code
    fn enter_blocking_section(&mut self);

    /// Restore managed invariants. Must be idempotent: raising calls this
    /// unconditionally, whether or not a section was entered.
    fn exit_blocking_section(&mut self);

    /// True while a section is active
    fn is_active(&self) -> bool;
}

/// Default section tracker: a single flag
#[derive(Debug, Default)]
pub struct SectionFlag {
    active: bool,
}

impl SectionFlag {
    /// Create a tracker with no active section
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockingSection for SectionFlag {
    fn enter_blocking_section(&mut self) {
        debug_assert!(!self.active, "blocking sections do not nest");
        self.active = true;
    }

    fn exit_blocking_section(&mut self) {
        if self.active {
            tracing::trace!(target: "heron::raise", "leaving blocking section");
            self.active = false;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
