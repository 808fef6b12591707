/// Persistent multi-buffer - one mapping for the buffer's whole lifetime
///
/// Allocates `capacity * multiplier` records of immutable storage and maps
/// it once. Writes are plain copies into the mapping at the current ring
/// slot. Synchronization with the device is the discard strategy's job;
/// writes without a hint stall on a full `finish`.

use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::buffer::base_buffer::BaseBuffer;
use crate::buffer::discard_strategy::{DiscardStrategy, Ring};
use crate::buffer::vertex_buffer::{mapped_records, BufferVariant, VertexBuffer};
use crate::error::Result;
use crate::graphics_device::{BufferFlags, BufferId, BufferUsage, MapFlags, Primitive, StorageFlags};
use crate::render_context::{ContextState, RenderContext};
use crate::vertex::Vertex;
use crate::{vs_debug, vs_error, vs_warn};

const SOURCE: &str = "vstream::PersistentBuffer";

pub struct PersistentBuffer<V: Vertex> {
    base: BaseBuffer,
    ring: Ring,
    strategy: Box<dyn DiscardStrategy>,
    variant: BufferVariant,
    _vertex: PhantomData<V>,
}

impl<V: Vertex> PersistentBuffer<V> {
    /// Create and map a ring of `multiplier` slots of `capacity` records
    ///
    /// A failed mapping is logged; the buffer then skips writes and
    /// `lock` returns `None`.
    pub fn new(
        context: Rc<RenderContext>,
        capacity: usize,
        usage: BufferUsage,
        multiplier: usize,
        strategy: Box<dyn DiscardStrategy>,
    ) -> Result<Self> {
        assert!(usage != BufferUsage::Static, "persistent vertex buffers cannot be static");
        assert!(multiplier > 0, "ring multiplier must be non-zero");

        let base = BaseBuffer::new(Rc::clone(&context), capacity, usage, V::LAYOUT)?;
        let size = capacity * multiplier * size_of::<V>();

        let mut storage = StorageFlags::MAP_WRITE | StorageFlags::PERSISTENT | StorageFlags::COHERENT;
        if usage == BufferUsage::Stream {
            storage |= StorageFlags::CLIENT_STORAGE;
        }

        let mut ring = Ring::new(base.id(), size, multiplier, None);
        {
            let mut state = context.state()?;
            state.bind_buffer(base.id());
            state.device.buffer_storage(size, None, storage);
            ring.map(state.device.as_mut(), MapFlags::UNSYNCHRONIZED);
        }

        let variant = strategy.variant(multiplier);
        vs_debug!(
            SOURCE,
            "Buffer {:?}: {} slots of {} records, {} discard",
            base.id(),
            multiplier,
            capacity,
            strategy.name()
        );

        Ok(Self {
            base,
            ring,
            strategy,
            variant,
            _vertex: PhantomData,
        })
    }

    /// Current ring slot
    pub fn position(&self) -> usize {
        self.ring.position()
    }

    /// Whether the persistent mapping is live
    pub fn is_mapped(&self) -> bool {
        self.ring.mapping().is_some()
    }

    /// Make the current slot writable according to `flags`
    fn sync(&mut self, state: &mut ContextState, flags: BufferFlags) {
        if flags.contains(BufferFlags::DISCARD_BUFFER) {
            state.bind_buffer(self.base.id());
            self.strategy.discard(state.device.as_mut(), &mut self.ring, &mut state.stats);
            self.base.set_ring_offset(self.ring.position() * self.base.capacity());
        } else if !flags.contains(BufferFlags::NO_OVERWRITE) {
            vs_warn!(SOURCE, "Blocking buffer upload, use DISCARD_BUFFER or NO_OVERWRITE");
            state.device.finish();
            state.stats.blocking_flushes += 1;
        }
    }

    /// Byte offset of record `offset` in the current slot
    fn byte_offset(&self, offset: usize) -> usize {
        (self.base.ring_offset() + offset) * size_of::<V>()
    }
}

impl<V: Vertex> VertexBuffer<V> for PersistentBuffer<V> {
    fn capacity(&self) -> usize {
        self.base.capacity()
    }

    fn usage(&self) -> BufferUsage {
        self.base.usage()
    }

    fn variant(&self) -> BufferVariant {
        self.variant
    }

    fn buffer_id(&self) -> BufferId {
        self.base.id()
    }

    fn ring_offset(&self) -> usize {
        self.base.ring_offset()
    }

    fn set_data(&mut self, vertices: &[V], offset: usize, flags: BufferFlags) -> Result<()> {
        self.base.check_region(offset, vertices.len());

        let context = Rc::clone(self.base.context());
        self.sync(&mut *context.state()?, flags);

        if vertices.is_empty() {
            return Ok(());
        }
        let Some(mapping) = self.ring.mapping() else {
            vs_error!(SOURCE, "Buffer {:?} is not mapped, write skipped", self.base.id());
            return Ok(());
        };

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        // SAFETY: the region check keeps the copy inside the current slot,
        // which lies inside the mapped allocation.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                mapping.as_ptr().add(self.byte_offset(offset)),
                bytes.len(),
            );
        }
        Ok(())
    }

    fn lock(&mut self, flags: BufferFlags, offset: usize, count: usize) -> Option<&mut [V]> {
        let capacity = self.base.capacity();
        assert!(offset < capacity, "vertex offset {} out of range (capacity {})", offset, capacity);

        let context = Rc::clone(self.base.context());
        self.sync(&mut *context.state().ok()?, flags);

        let Some(mapping) = self.ring.mapping() else {
            vs_error!(SOURCE, "Could not map vertex buffer");
            return None;
        };
        let count = count.min(capacity - offset);

        // SAFETY: the records lie inside the current slot of the mapped
        // allocation, which stays mapped until the buffer is dropped.
        unsafe {
            let start = NonNull::new_unchecked(mapping.as_ptr().add(self.byte_offset(offset)));
            mapped_records(SOURCE, start, count)
        }
    }

    fn unlock(&mut self) {}

    fn draw(&self, primitive: Primitive, count: usize, offset: usize) -> Result<()> {
        self.base.draw(primitive, count, offset)
    }

    fn draw_indexed(&self, primitive: Primitive, count: usize, offset: usize, indices: &[u16]) -> Result<()> {
        self.base.draw_indexed(primitive, count, offset, indices)
    }
}

impl<V: Vertex> Drop for PersistentBuffer<V> {
    fn drop(&mut self) {
        let Ok(mut state) = self.base.context().state() else { return };
        let state = &mut *state;

        self.strategy.release(state.device.as_mut());

        if self.ring.take_mapping().is_some() {
            state.bind_buffer(self.base.id());
            if !state.device.unmap_buffer() {
                vs_warn!(SOURCE, "Persistently mapped vertex buffer invalidated");
            }
        }
    }
}

#[cfg(test)]
#[path = "persistent_buffer_tests.rs"]
mod tests;
