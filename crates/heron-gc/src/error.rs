//! Allocation errors

use thiserror::Error;

/// Reasons an allocation request could not be satisfied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The heap limit would be exceeded even after a collection
    #[error("out of memory: requested {requested} words, limit is {limit} words")]
    OutOfMemory {
        /// Words requested, header included
        requested: usize,
        /// Configured heap limit in words
        limit: usize,
    },

    /// Failure injected by [`FaultPolicy`](crate::FaultPolicy)
    #[error("allocation failure injected after {allocations} allocations")]
    InjectedFault {
        /// Successful allocations before the fault
        allocations: u64,
    },
}
