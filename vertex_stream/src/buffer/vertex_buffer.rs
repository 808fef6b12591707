/// VertexBuffer trait - the interface every buffer variant implements

use std::mem::size_of;
use std::ptr::NonNull;

use crate::error::Result;
use crate::graphics_device::{BufferFlags, BufferId, BufferUsage, Primitive};
use crate::vertex::Vertex;
use crate::vs_error;

/// Which implementation backs a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferVariant {
    /// Single buffer, sub-data writes, whole-buffer map
    SubData,
    /// Single buffer, range-mapped locks
    MapRange,
    /// Persistent ring without synchronization
    PersistentUnsynchronized { multiplier: usize },
    /// Persistent single slot, orphaned on discard
    PersistentOrphan,
    /// Persistent ring with one fence per slot
    PersistentFenced { multiplier: usize },
}

impl BufferVariant {
    /// Number of ring slots the variant allocates
    pub fn multiplier(&self) -> usize {
        match self {
            BufferVariant::PersistentUnsynchronized { multiplier }
            | BufferVariant::PersistentFenced { multiplier } => *multiplier,
            _ => 1,
        }
    }

    /// Whether the variant keeps its storage mapped for its whole lifetime
    pub fn is_persistent(&self) -> bool {
        !matches!(self, BufferVariant::SubData | BufferVariant::MapRange)
    }
}

/// GPU vertex buffer of fixed capacity
///
/// Regions are counted in records of `V`. Every region passed in must lie
/// inside `[0, capacity)`; violating that is a caller bug and panics.
pub trait VertexBuffer<V: Vertex> {
    /// Records per slot
    fn capacity(&self) -> usize;

    /// Usage class given at creation
    fn usage(&self) -> BufferUsage;

    /// Implementation backing this buffer
    fn variant(&self) -> BufferVariant;

    /// Device handle
    fn buffer_id(&self) -> BufferId;

    /// Start of the current ring slot, in records (0 for single buffers)
    fn ring_offset(&self) -> usize;

    /// Write `vertices` starting at record `offset`
    fn set_data(&mut self, vertices: &[V], offset: usize, flags: BufferFlags) -> Result<()>;

    /// Map up to `count` records starting at `offset` for writing
    ///
    /// Returns `None` if the device could not map the buffer. The mapping
    /// stays valid until `unlock`.
    fn lock(&mut self, flags: BufferFlags, offset: usize, count: usize) -> Option<&mut [V]>;

    /// Commit the last `lock`
    fn unlock(&mut self);

    /// Draw `count` records starting at `offset`
    fn draw(&self, primitive: Primitive, count: usize, offset: usize) -> Result<()>;

    /// Draw `indices` relative to record `offset`; `count` records are referenced
    fn draw_indexed(&self, primitive: Primitive, count: usize, offset: usize, indices: &[u16]) -> Result<()>;
}

/// View `count` mapped records starting at `ptr`
///
/// # Safety
///
/// `ptr` must point at `count * size_of::<V>()` writable bytes that stay
/// mapped and unaliased for `'a`.
pub(crate) unsafe fn mapped_records<'a, V: Vertex>(
    source: &str,
    ptr: NonNull<u8>,
    count: usize,
) -> Option<&'a mut [V]> {
    let bytes = std::slice::from_raw_parts_mut(ptr.as_ptr(), count * size_of::<V>());
    match bytemuck::try_cast_slice_mut(bytes) {
        Ok(records) => Some(records),
        Err(err) => {
            vs_error!(source, "Mapped vertex memory is unusable: {:?}", err);
            None
        }
    }
}
