//! # Heron Garbage Collector
//!
//! Copying collector for the Heron runtime.
//!
//! ## Design
//!
//! - **Moving**: every collection copies live blocks to fresh addresses, so a
//!   value held in a native local is stale unless it was registered as a root
//! - **Scoped roots**: [`RootScope`] registers values for a lexical scope and
//!   releases them on every exit path, unwinding included
//! - **Static blocks**: data that must exist without allocating lives outside
//!   the heap in [`StaticBlock`]s and is never moved
//! - **Fault injection**: [`GcConfig`] can force a collection on every
//!   allocation or make allocations fail

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod collector;
pub mod error;
pub mod heap;
pub mod object;
pub mod roots;
pub mod value;

pub use error::AllocError;
pub use heap::{FaultPolicy, GcConfig, GlobalId, Heap, HeapStats};
pub use object::{Generation, Header, StaticBlock, tags};
pub use roots::RootScope;
pub use value::{Addr, Value};
