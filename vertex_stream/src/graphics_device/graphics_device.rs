/// GraphicsDevice trait - the buffer-object API the vertex buffers drive

use std::ptr::NonNull;

use crate::error::Result;
use crate::graphics_device::{
    BufferId, BufferUsage, MapFlags, StorageFlags,
    FenceId, WaitResult,
    Primitive, IndexData, VertexAttribute,
};

/// Optional device features
///
/// Queried once when the render context is created; buffer variants are
/// chosen from these and never re-checked per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Indexed draws accept a per-call base vertex
    pub draw_elements_base_vertex: bool,
    /// Sub-ranges can be mapped with invalidate / unsynchronized hints
    pub map_buffer_range: bool,
    /// Immutable storage and persistent coherent mappings are available
    pub buffer_storage: bool,
}

impl Capabilities {
    /// Every optional feature available
    pub fn all() -> Self {
        Self {
            draw_elements_base_vertex: true,
            map_buffer_range: true,
            buffer_storage: true,
        }
    }

    /// Plain buffer objects only
    pub fn basic() -> Self {
        Self::default()
    }
}

/// Buffer-object device interface
///
/// Follows the bind-to-target model: allocation, upload and mapping calls
/// act on the buffer last passed to `bind_buffer`. Implemented by backends
/// and by `MockGraphicsDevice`.
///
/// All calls come from the single rendering thread.
pub trait GraphicsDevice {
    /// Optional features supported by this device
    fn capabilities(&self) -> Capabilities;

    // ===== BUFFER OBJECTS =====

    /// Generate a new buffer name (no storage yet)
    fn create_buffer(&mut self) -> Result<BufferId>;

    /// Delete a buffer and free its storage; the name may be reused
    fn delete_buffer(&mut self, buffer: BufferId);

    /// Bind a buffer as the vertex array buffer (`None` unbinds)
    fn bind_buffer(&mut self, buffer: Option<BufferId>);

    /// (Re)allocate mutable storage for the bound buffer
    ///
    /// Reallocating storage that is already in use orphans it: pending reads
    /// keep the old memory and the buffer gets fresh memory under the same name.
    fn buffer_data(&mut self, size: usize, data: Option<&[u8]>, usage: BufferUsage);

    /// Allocate immutable storage for the bound buffer
    fn buffer_storage(&mut self, size: usize, data: Option<&[u8]>, flags: StorageFlags);

    /// Overwrite part of the bound buffer's storage
    fn buffer_sub_data(&mut self, offset: usize, data: &[u8]);

    /// Map the whole bound buffer for writing
    ///
    /// Returns `None` when the mapping fails.
    fn map_buffer(&mut self) -> Option<NonNull<u8>>;

    /// Map a byte range of the bound buffer
    ///
    /// The returned pointer addresses `offset`. Returns `None` on failure.
    fn map_buffer_range(&mut self, offset: usize, length: usize, flags: MapFlags) -> Option<NonNull<u8>>;

    /// Unmap the bound buffer
    ///
    /// Returns `false` when the storage was lost while mapped; written data
    /// is then undefined.
    fn unmap_buffer(&mut self) -> bool;

    // ===== SYNCHRONIZATION =====

    /// Insert a fence after every command submitted so far
    fn fence_sync(&mut self) -> FenceId;

    /// Wait up to `timeout_ns` for a fence, optionally flushing pending commands first
    fn client_wait_sync(&mut self, fence: FenceId, flush_commands: bool, timeout_ns: u64) -> WaitResult;

    /// Delete a fence
    fn delete_sync(&mut self, fence: FenceId);

    /// Block until every submitted command has completed
    fn finish(&mut self);

    // ===== VERTEX ARRAYS =====

    /// Enable or disable an attribute channel
    fn set_attribute_enabled(&mut self, attribute: VertexAttribute, enabled: bool);

    /// Point an attribute channel at the bound buffer
    fn attribute_pointer(&mut self, attribute: VertexAttribute, components: u32, stride: usize, offset: usize);

    // ===== DRAWS =====

    /// Non-indexed draw of `count` vertices starting at `first`
    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize);

    /// Indexed draw; every index lies in `[start, end]`
    fn draw_range_elements(&mut self, primitive: Primitive, start: usize, end: usize, indices: IndexData<'_>);

    /// Indexed draw with `base_vertex` added to every index by the device
    fn draw_range_elements_base_vertex(
        &mut self,
        primitive: Primitive,
        start: usize,
        end: usize,
        indices: &[u16],
        base_vertex: usize,
    );
}
