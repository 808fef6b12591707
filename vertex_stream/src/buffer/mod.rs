/// Vertex buffers - the trait, its three implementations, and ring discard strategies

// Module declarations
pub mod vertex_buffer;
pub mod base_buffer;
pub mod streaming_buffer;
pub mod persistent_buffer;
pub mod discard_strategy;

pub use vertex_buffer::{BufferVariant, VertexBuffer};
pub use base_buffer::BaseBuffer;
pub use streaming_buffer::StreamingBuffer;
pub use persistent_buffer::PersistentBuffer;
pub use discard_strategy::{
    DiscardStrategy, Ring, UnsynchronizedDiscard, OrphanDiscard, FencedDiscard, MAX_RING_SLOTS,
};
