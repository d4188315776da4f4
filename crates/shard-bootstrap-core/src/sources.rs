//! Concrete [`Source`](crate::source::Source) implementations.
pub mod memory;
