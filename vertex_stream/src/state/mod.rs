/// Device-side state shared by every buffer of a render context

pub mod array_state;
pub mod index_scratch;

pub use array_state::*;
pub use index_scratch::*;
