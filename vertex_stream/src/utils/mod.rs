/// Small helpers shared across the crate

pub mod slot_allocator;

pub use slot_allocator::*;
