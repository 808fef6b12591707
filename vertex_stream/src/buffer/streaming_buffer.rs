/// Streaming buffer - single-buffered writes with orphan-on-discard
///
/// Storage is (re)specified through `initialize`: a full-range write
/// uploads directly, a discard or the first partial write orphans the old
/// storage so the device can keep reading it while new data lands in a
/// fresh allocation. Locks use either a whole-buffer map or a range map,
/// chosen at creation.

use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::buffer::base_buffer::BaseBuffer;
use crate::buffer::vertex_buffer::{mapped_records, BufferVariant, VertexBuffer};
use crate::error::Result;
use crate::graphics_device::{BufferFlags, BufferId, BufferUsage, Primitive, StorageFlags};
use crate::render_context::{ContextState, RenderContext};
use crate::vertex::Vertex;
use crate::{vs_error, vs_warn};

const SOURCE: &str = "vstream::StreamingBuffer";

pub struct StreamingBuffer<V: Vertex> {
    base: BaseBuffer,
    range_mapping: bool,
    initialized: bool,
    _vertex: PhantomData<V>,
}

impl<V: Vertex> StreamingBuffer<V> {
    /// Create a buffer of `capacity` records
    ///
    /// With `range_mapping` locks map only the requested range and turn the
    /// write flags into map hints.
    pub fn new(
        context: Rc<RenderContext>,
        capacity: usize,
        usage: BufferUsage,
        range_mapping: bool,
    ) -> Result<Self> {
        Ok(Self {
            base: BaseBuffer::new(context, capacity, usage, V::LAYOUT)?,
            range_mapping,
            initialized: false,
            _vertex: PhantomData,
        })
    }

    /// Whether storage has been specified yet
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Panic if this is a static buffer whose contents are already set
    fn assert_mutable(&self) {
        assert!(
            !self.initialized || self.base.usage() != BufferUsage::Static,
            "static vertex buffer {:?} is immutable once initialized",
            self.base.id()
        );
    }

    /// (Re)specify the whole storage, optionally with contents
    ///
    /// Static buffers get immutable storage when the device has it, and
    /// must be initialized exactly once, with data.
    fn initialize(&mut self, state: &mut ContextState, data: Option<&[V]>) {
        let usage = self.base.usage();
        assert!(
            !self.initialized || usage != BufferUsage::Static,
            "static vertex buffer {:?} initialized twice",
            self.base.id()
        );
        assert!(
            data.is_some() || usage != BufferUsage::Static,
            "static vertex buffer {:?} initialized without data",
            self.base.id()
        );

        let size = self.base.capacity() * size_of::<V>();
        let bytes = data.map(bytemuck::cast_slice::<V, u8>);

        if usage == BufferUsage::Static && self.base.context().capabilities().buffer_storage {
            state.device.buffer_storage(size, bytes, StorageFlags::empty());
        } else {
            state.device.buffer_data(size, bytes, usage);
        }

        if self.initialized {
            state.stats.orphaned_uploads += 1;
        }
        self.initialized = true;
    }
}

impl<V: Vertex> VertexBuffer<V> for StreamingBuffer<V> {
    fn capacity(&self) -> usize {
        self.base.capacity()
    }

    fn usage(&self) -> BufferUsage {
        self.base.usage()
    }

    fn variant(&self) -> BufferVariant {
        if self.range_mapping {
            BufferVariant::MapRange
        } else {
            BufferVariant::SubData
        }
    }

    fn buffer_id(&self) -> BufferId {
        self.base.id()
    }

    fn ring_offset(&self) -> usize {
        0
    }

    fn set_data(&mut self, vertices: &[V], offset: usize, flags: BufferFlags) -> Result<()> {
        let count = vertices.len();
        self.base.check_region(offset, count);

        let context = Rc::clone(self.base.context());
        let mut state = context.state()?;
        state.bind_buffer(self.base.id());

        if offset == 0 && count == self.base.capacity() {
            self.initialize(&mut state, Some(vertices));
            return Ok(());
        }

        self.assert_mutable();
        if !self.initialized || flags.contains(BufferFlags::DISCARD_BUFFER) {
            self.initialize(&mut state, None);
        }

        if count != 0 {
            state.device.buffer_sub_data(offset * size_of::<V>(), bytemuck::cast_slice(vertices));
        }
        Ok(())
    }

    fn lock(&mut self, flags: BufferFlags, offset: usize, count: usize) -> Option<&mut [V]> {
        let capacity = self.base.capacity();
        assert!(offset < capacity, "vertex offset {} out of range (capacity {})", offset, capacity);

        self.assert_mutable();

        let count = count.min(capacity - offset);
        let stride = size_of::<V>();

        let context = Rc::clone(self.base.context());
        let mut state = context.state().ok()?;
        state.bind_buffer(self.base.id());

        let mapping = if self.range_mapping {
            if !self.initialized {
                self.initialize(&mut state, None);
            }
            state.device.map_buffer_range(offset * stride, count * stride, flags.to_map_flags())
        } else {
            if !self.initialized || flags.contains(BufferFlags::DISCARD_BUFFER) {
                self.initialize(&mut state, None);
            }
            state
                .device
                .map_buffer()
                .and_then(|ptr| NonNull::new(ptr.as_ptr().wrapping_add(offset * stride)))
        };

        let Some(ptr) = mapping else {
            vs_error!(SOURCE, "Could not map vertex buffer");
            return None;
        };

        // SAFETY: the device mapped `count` records at `ptr`; they stay mapped
        // until `unlock`, which needs `&mut self`.
        unsafe { mapped_records(SOURCE, ptr, count) }
    }

    fn unlock(&mut self) {
        let Ok(mut state) = self.base.context().state() else { return };
        state.bind_buffer(self.base.id());
        if !state.device.unmap_buffer() {
            vs_warn!(SOURCE, "Vertex buffer invalidated");
        }
    }

    fn draw(&self, primitive: Primitive, count: usize, offset: usize) -> Result<()> {
        self.base.draw(primitive, count, offset)
    }

    fn draw_indexed(&self, primitive: Primitive, count: usize, offset: usize, indices: &[u16]) -> Result<()> {
        self.base.draw_indexed(primitive, count, offset, indices)
    }
}

#[cfg(test)]
#[path = "streaming_buffer_tests.rs"]
mod tests;
