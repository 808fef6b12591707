/// Discard strategies for persistently mapped buffers
///
/// A persistent buffer cannot re-specify its storage, so a `DISCARD_BUFFER`
/// write has to find memory the device is no longer reading some other way:
/// - UnsynchronizedDiscard: assume the device is far enough behind
/// - OrphanDiscard: remap with buffer invalidation (fresh backing memory)
/// - FencedDiscard: fence the current ring slot, move on, wait for the next

use std::ptr::NonNull;

use crate::buffer::vertex_buffer::BufferVariant;
use crate::graphics_device::{BufferId, FenceId, GraphicsDevice, MapFlags, WaitResult};
use crate::render_context::ContextStats;
use crate::{vs_error, vs_trace};

const SOURCE: &str = "vstream::DiscardStrategy";

/// Highest ring multiplier a fenced buffer supports
pub const MAX_RING_SLOTS: usize = 8;

// ===== RING =====

/// Persistent allocation split into `multiplier` equal slots
#[derive(Debug)]
pub struct Ring {
    buffer: BufferId,
    size: usize,
    multiplier: usize,
    position: usize,
    mapping: Option<NonNull<u8>>,
}

impl Ring {
    /// Flags every persistent map carries
    pub const MAP_FLAGS: MapFlags = MapFlags::WRITE
        .union(MapFlags::PERSISTENT)
        .union(MapFlags::COHERENT);

    /// Ring over `size` bytes of `buffer`, starting at slot 0
    pub fn new(buffer: BufferId, size: usize, multiplier: usize, mapping: Option<NonNull<u8>>) -> Self {
        Self { buffer, size, multiplier, position: 0, mapping }
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    /// Total size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn multiplier(&self) -> usize {
        self.multiplier
    }

    /// Current slot
    pub fn position(&self) -> usize {
        self.position
    }

    /// Start of the whole allocation, if mapped
    pub fn mapping(&self) -> Option<NonNull<u8>> {
        self.mapping
    }

    pub(crate) fn take_mapping(&mut self) -> Option<NonNull<u8>> {
        self.mapping.take()
    }

    /// Move to the next slot
    pub fn advance(&mut self) {
        self.position = (self.position + 1) % self.multiplier;
    }

    /// Map the whole allocation with the persistent flags plus `extra`
    ///
    /// The buffer must be bound.
    pub fn map(&mut self, device: &mut dyn GraphicsDevice, extra: MapFlags) -> Option<NonNull<u8>> {
        self.mapping = device.map_buffer_range(0, self.size, Self::MAP_FLAGS | extra);
        if self.mapping.is_none() {
            vs_error!(SOURCE, "Could not map persistent vertex buffer {:?}", self.buffer);
        }
        self.mapping
    }
}

// ===== DISCARD STRATEGY =====

/// What a persistent buffer does on `DISCARD_BUFFER`
///
/// `discard` is called with the ring's buffer bound.
pub trait DiscardStrategy {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Buffer variant this strategy implements for a ring of `multiplier` slots
    fn variant(&self, multiplier: usize) -> BufferVariant;

    /// Make the ring's current slot safe to overwrite
    fn discard(&mut self, device: &mut dyn GraphicsDevice, ring: &mut Ring, stats: &mut ContextStats);

    /// Release device objects before the buffer is deleted
    fn release(&mut self, _device: &mut dyn GraphicsDevice) {}
}

// ===== UNSYNCHRONIZED =====

/// Never waits
///
/// With one slot the same memory is rewritten in place; with more the ring
/// advances so consecutive frames at least use different slots.
#[derive(Debug, Default)]
pub struct UnsynchronizedDiscard;

impl DiscardStrategy for UnsynchronizedDiscard {
    fn name(&self) -> &'static str {
        "unsynchronized"
    }

    fn variant(&self, multiplier: usize) -> BufferVariant {
        BufferVariant::PersistentUnsynchronized { multiplier }
    }

    fn discard(&mut self, _device: &mut dyn GraphicsDevice, ring: &mut Ring, _stats: &mut ContextStats) {
        ring.advance();
    }
}

// ===== ORPHAN =====

/// Unmaps and remaps with buffer invalidation
#[derive(Debug, Default)]
pub struct OrphanDiscard;

impl DiscardStrategy for OrphanDiscard {
    fn name(&self) -> &'static str {
        "orphan"
    }

    fn variant(&self, _multiplier: usize) -> BufferVariant {
        BufferVariant::PersistentOrphan
    }

    fn discard(&mut self, device: &mut dyn GraphicsDevice, ring: &mut Ring, stats: &mut ContextStats) {
        if ring.take_mapping().is_some() {
            device.unmap_buffer();
        }
        ring.map(device, MapFlags::INVALIDATE_BUFFER);
        stats.orphaned_uploads += 1;
    }
}

// ===== FENCED =====

/// One fence per ring slot
///
/// A slot is fenced when the writer leaves it and waited on when the
/// writer comes back around to it.
///
/// Between discards at most `multiplier - 1` fences are outstanding. Inside
/// `discard` all `multiplier` are alive for a moment: the slot being left is
/// fenced before the fence of the slot being reused is deleted.
#[derive(Debug)]
pub struct FencedDiscard {
    fences: [Option<FenceId>; MAX_RING_SLOTS],
    multiplier: usize,
}

impl FencedDiscard {
    pub fn new(multiplier: usize) -> Self {
        assert!(
            (1..=MAX_RING_SLOTS).contains(&multiplier),
            "fenced ring multiplier {} outside 1..={}",
            multiplier,
            MAX_RING_SLOTS
        );
        Self { fences: [None; MAX_RING_SLOTS], multiplier }
    }

    /// Fence guarding `slot`, if any
    pub fn fence(&self, slot: usize) -> Option<FenceId> {
        self.fences.get(slot).copied().flatten()
    }

    /// Number of slots with an outstanding fence
    pub fn pending(&self) -> usize {
        self.fences[..self.multiplier].iter().filter(|fence| fence.is_some()).count()
    }

    fn wait(device: &mut dyn GraphicsDevice, fence: FenceId, slot: usize) {
        loop {
            match device.client_wait_sync(fence, true, 1) {
                result if result.is_signaled() => break,
                WaitResult::WaitFailed => {
                    vs_error!(SOURCE, "Waiting for the fence of ring slot {} failed", slot);
                    break;
                }
                _ => {}
            }
        }
    }
}

impl DiscardStrategy for FencedDiscard {
    fn name(&self) -> &'static str {
        "fenced"
    }

    fn variant(&self, multiplier: usize) -> BufferVariant {
        BufferVariant::PersistentFenced { multiplier }
    }

    fn discard(&mut self, device: &mut dyn GraphicsDevice, ring: &mut Ring, stats: &mut ContextStats) {
        let current = ring.position();
        assert!(
            self.fences[current].is_none(),
            "ring slot {} fenced twice",
            current
        );
        self.fences[current] = Some(device.fence_sync());

        ring.advance();
        let next = ring.position();
        if let Some(fence) = self.fences[next].take() {
            vs_trace!(SOURCE, "Waiting for ring slot {} ({:?})", next, fence);
            Self::wait(device, fence, next);
            device.delete_sync(fence);
            stats.fence_waits += 1;
        }
    }

    fn release(&mut self, device: &mut dyn GraphicsDevice) {
        for fence in self.fences.iter_mut().filter_map(Option::take) {
            device.delete_sync(fence);
        }
    }
}

#[cfg(test)]
#[path = "discard_strategy_tests.rs"]
mod tests;
