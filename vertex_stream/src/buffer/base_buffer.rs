/// Base buffer - device handle ownership and draw submission
///
/// Every vertex buffer variant embeds one. It owns the device handle and
/// the ring offset, and issues draws with the array state configured for
/// its vertex layout.

use std::rc::Rc;

use crate::error::Result;
use crate::graphics_device::{BufferId, BufferUsage, Primitive};
use crate::render_context::{ContextState, RenderContext};
use crate::vertex::VertexLayout;
use crate::{vs_error, vs_trace};

const SOURCE: &str = "vstream::BaseBuffer";

pub struct BaseBuffer {
    context: Rc<RenderContext>,
    buffer: BufferId,
    capacity: usize,
    usage: BufferUsage,
    layout: VertexLayout,
    ring_offset: usize,
}

impl BaseBuffer {
    /// Allocate a device handle for a buffer of `capacity` records
    ///
    /// No storage is allocated yet.
    pub fn new(
        context: Rc<RenderContext>,
        capacity: usize,
        usage: BufferUsage,
        layout: VertexLayout,
    ) -> Result<Self> {
        let buffer = context.state()?.device.create_buffer()?;
        vs_trace!(SOURCE, "Created buffer {:?} ({} x {:?}, {:?})", buffer, capacity, layout, usage);

        Ok(Self {
            context,
            buffer,
            capacity,
            usage,
            layout,
            ring_offset: 0,
        })
    }

    pub fn context(&self) -> &Rc<RenderContext> {
        &self.context
    }

    pub fn id(&self) -> BufferId {
        self.buffer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Start of the current ring slot, in records
    pub fn ring_offset(&self) -> usize {
        self.ring_offset
    }

    pub(crate) fn set_ring_offset(&mut self, ring_offset: usize) {
        self.ring_offset = ring_offset;
    }

    /// Panic unless `[offset, offset + count)` lies inside the buffer
    pub(crate) fn check_region(&self, offset: usize, count: usize) {
        assert!(
            offset < self.capacity,
            "vertex offset {} out of range (capacity {})",
            offset,
            self.capacity
        );
        assert!(
            offset.checked_add(count).is_some_and(|end| end <= self.capacity),
            "vertex region {}+{} exceeds capacity {}",
            offset,
            count,
            self.capacity
        );
    }

    /// Bind this buffer and point the vertex attributes at it
    fn prepare_draw(&self, state: &mut ContextState) {
        state.bind_buffer(self.buffer);
        state.array_state.bind(state.device.as_mut(), self.layout, self.buffer);
    }

    /// Draw `count` records starting at `offset`
    pub fn draw(&self, primitive: Primitive, count: usize, offset: usize) -> Result<()> {
        self.check_region(offset, count);

        let mut state = self.context.state()?;
        let state = &mut *state;
        self.prepare_draw(state);

        state.device.draw_arrays(primitive, self.ring_offset + offset, count);
        state.stats.draw_calls += 1;
        Ok(())
    }

    /// Draw 16-bit `indices` relative to record `offset`
    ///
    /// Uses a base-vertex draw when the device has one. Otherwise non-zero
    /// offsets are added to the indices on the CPU.
    pub fn draw_indexed(
        &self,
        primitive: Primitive,
        count: usize,
        offset: usize,
        indices: &[u16],
    ) -> Result<()> {
        self.check_region(offset, count);
        assert!(!indices.is_empty(), "indexed draw without indices");

        let offset = offset + self.ring_offset;
        let last = count.saturating_sub(1);

        let mut state = self.context.state()?;
        let state = &mut *state;
        self.prepare_draw(state);

        if self.context.capabilities().draw_elements_base_vertex {
            state.device.draw_range_elements_base_vertex(primitive, 0, last, indices, offset);
        } else {
            if offset != 0 {
                state.stats.rebased_draws += 1;
            }
            let data = state.index_scratch.rebase(indices, offset);
            state.device.draw_range_elements(primitive, offset, offset + last, data);
        }

        state.stats.indexed_draw_calls += 1;
        Ok(())
    }
}

impl Drop for BaseBuffer {
    fn drop(&mut self) {
        let Ok(mut state) = self.context.state() else {
            vs_error!(SOURCE, "Leaking buffer {:?}: context busy", self.buffer);
            return;
        };
        state.array_state.clear(self.buffer);
        state.unbind_buffer(self.buffer);
        state.device.delete_buffer(self.buffer);
        vs_trace!(SOURCE, "Deleted buffer {:?}", self.buffer);
    }
}

#[cfg(test)]
#[path = "base_buffer_tests.rs"]
mod tests;
