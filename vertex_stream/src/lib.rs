/*!
# vertex_stream

Vertex buffer management for streaming per-frame geometry to the GPU.

This crate sits between a mesh or particle pipeline and a buffer-object
graphics API. It moves vertex data into device memory without stalling the
pipeline on three capability tiers: plain buffer objects, range-mapped
buffers, and persistently mapped ring buffers with fence synchronization.

## Architecture

- **GraphicsDevice**: trait over the buffer-object API (implemented by backends,
  plus a host-memory mock)
- **RenderContext**: owns the device, the array-state cache and index scratch,
  and creates vertex buffers
- **VertexBuffer**: write / lock / unlock / draw interface
- **StreamingBuffer**: single buffer, orphaned on discard
- **PersistentBuffer**: persistent mapping split into ring slots, with a
  pluggable discard strategy

```no_run
use vertex_stream::vstream::{
    RenderContext, BufferConfig, VertexBufferDesc, BufferUsage, BufferFlags, Primitive,
};
use vertex_stream::vstream::device::{Capabilities, MockGraphicsDevice};
use vertex_stream::vstream::vertex::LitVertex;

let device = MockGraphicsDevice::new(Capabilities::all());
let context = RenderContext::new(Box::new(device), BufferConfig::default())?;

let mut buffer = context.create_vertex_buffer::<LitVertex>(
    VertexBufferDesc::new(100, BufferUsage::Stream),
)?;
let vertices = vec![LitVertex::default(); 50];
buffer.set_data(&vertices, 0, BufferFlags::DISCARD_BUFFER)?;
buffer.draw(Primitive::TriangleList, 50, 0)?;
# Ok::<(), vertex_stream::vstream::Error>(())
```
*/

// Internal modules
mod error;
mod render_context;
pub mod log;
pub mod utils;
pub mod graphics_device;
pub mod vertex;
pub mod state;
pub mod buffer;

// Main vstream namespace module
pub mod vstream {
    // Error types
    pub use crate::error::{Error, Result};

    // Context and buffer factory
    pub use crate::render_context::{
        RenderContext, BufferConfig, UploadMode, VertexBufferDesc, ContextStats,
    };

    // Buffer interface
    pub use crate::buffer::{VertexBuffer, BufferVariant, MAX_RING_SLOTS};
    pub use crate::graphics_device::{BufferUsage, BufferFlags, Primitive};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger,
        };
    }

    // Device sub-module
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Vertex sub-module
    pub mod vertex {
        pub use crate::vertex::*;
    }

    // Buffer implementations sub-module
    pub mod buffer {
        pub use crate::buffer::*;
    }
}

// Re-export math library at crate root
pub use glam;
