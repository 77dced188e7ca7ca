//! Allocation helpers shared by the index and the culler.

mod paged_array;
mod slot_arena;

pub use paged_array::{PagedArray, PagedArrayPool};
pub use slot_arena::SlotArena;
