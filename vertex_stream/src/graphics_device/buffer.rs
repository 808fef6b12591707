/// Buffer object handles, usage classes and flag sets

use bitflags::bitflags;

/// Device buffer object name
///
/// Names are recycled by the device after deletion, so a `BufferId` only
/// identifies a buffer for as long as that buffer is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Expected write frequency of a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once at creation, drawn many times
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

bitflags! {
    /// Per-call write hints passed to `set_data` and `lock`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        /// Previous contents of the whole buffer are no longer needed
        const DISCARD_BUFFER = 1 << 0;
        /// Previous contents of the written range are no longer needed
        const DISCARD_RANGE = 1 << 1;
        /// Caller guarantees the range is not read by in-flight draws
        const NO_OVERWRITE = 1 << 2;
    }
}

bitflags! {
    /// Access flags for `map_buffer_range`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MapFlags: u32 {
        const WRITE = 1 << 0;
        const INVALIDATE_RANGE = 1 << 1;
        const INVALIDATE_BUFFER = 1 << 2;
        const UNSYNCHRONIZED = 1 << 3;
        const PERSISTENT = 1 << 4;
        const COHERENT = 1 << 5;
    }
}

bitflags! {
    /// Flags for immutable storage allocation (`buffer_storage`)
    ///
    /// An empty set allocates storage that can never be mapped or rewritten.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StorageFlags: u32 {
        const MAP_WRITE = 1 << 0;
        const PERSISTENT = 1 << 1;
        const COHERENT = 1 << 2;
        const CLIENT_STORAGE = 1 << 3;
    }
}

impl BufferFlags {
    /// Map flags used by range-capable hardware for these write hints
    pub fn to_map_flags(self) -> MapFlags {
        let mut flags = MapFlags::WRITE;
        if self.contains(BufferFlags::DISCARD_BUFFER) {
            flags |= MapFlags::INVALIDATE_BUFFER;
        }
        if self.contains(BufferFlags::DISCARD_RANGE) {
            flags |= MapFlags::INVALIDATE_RANGE;
        }
        if self.contains(BufferFlags::NO_OVERWRITE) {
            flags |= MapFlags::UNSYNCHRONIZED;
        }
        flags
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
