/// Mock GraphicsDevice (no GPU required)
///
/// Keeps buffer storage in host memory so writes can be read back, records
/// every device call, snapshots the vertex bytes each draw consumes, and
/// simulates fence latency. Buffer names are recycled after deletion the way
/// a real driver recycles them.
///
/// The state lives behind `Rc<RefCell<_>>` so a test can keep a handle to it
/// after the device itself has been moved into a `RenderContext`.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Capabilities,
    BufferId, BufferUsage, MapFlags, StorageFlags,
    FenceId, WaitResult,
    Primitive, IndexData, VertexAttribute,
};
use crate::utils::SlotAllocator;

// ============================================================================
// Recorded calls
// ============================================================================

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CreateBuffer(BufferId),
    DeleteBuffer(BufferId),
    BindBuffer(Option<BufferId>),
    BufferData { buffer: BufferId, size: usize, usage: BufferUsage, with_data: bool },
    BufferStorage { buffer: BufferId, size: usize, flags: StorageFlags, with_data: bool },
    BufferSubData { buffer: BufferId, offset: usize, len: usize },
    MapBuffer { buffer: BufferId },
    MapBufferRange { buffer: BufferId, offset: usize, length: usize, flags: MapFlags },
    UnmapBuffer { buffer: BufferId, ok: bool },
    FenceSync(FenceId),
    ClientWaitSync { fence: FenceId, result: WaitResult },
    DeleteSync(FenceId),
    Finish,
    SetAttributeEnabled { attribute: VertexAttribute, enabled: bool },
    AttributePointer { attribute: VertexAttribute, components: u32, stride: usize, offset: usize },
    DrawArrays { primitive: Primitive, first: usize, count: usize },
    DrawRangeElements { primitive: Primitive, start: usize, end: usize, index_count: usize, wide: bool },
    DrawRangeElementsBaseVertex { primitive: Primitive, start: usize, end: usize, index_count: usize, base_vertex: usize },
}

/// What a draw call consumed
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Buffer the position attribute pointed at
    pub buffer: Option<BufferId>,
    pub primitive: Primitive,
    /// First vertex record consumed
    pub first_vertex: usize,
    /// Number of vertex records consumed
    pub vertex_count: usize,
    /// Final vertex indices (base vertex applied); empty for non-indexed draws
    pub indices: Vec<u32>,
    /// Raw bytes of the consumed vertex records
    pub vertices: Vec<u8>,
}

/// Attribute pointer as captured at `attribute_pointer` time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePointer {
    pub buffer: Option<BufferId>,
    pub components: u32,
    pub stride: usize,
    pub offset: usize,
}

// ============================================================================
// Mock storage
// ============================================================================

#[derive(Debug, Default)]
struct MockStorage {
    bytes: Vec<u8>,
    allocated: bool,
    immutable: bool,
    storage_flags: StorageFlags,
    mapped: Option<MapFlags>,
}

/// Inspectable state of a `MockGraphicsDevice`
#[derive(Debug)]
pub struct MockDeviceState {
    /// Every call, in order
    pub calls: Vec<DeviceCall>,
    /// Every draw, in order
    pub draws: Vec<DrawRecord>,
    /// API misuse detected by the mock (would be driver errors on real hardware)
    pub errors: Vec<String>,
    /// Number of `finish` calls (blocking flushes)
    pub finish_count: usize,
    /// Number of times live storage was replaced (orphaned)
    pub orphan_count: usize,
    /// Highest number of fences alive at the same time
    pub max_live_fences: usize,
    /// Make the next map call fail
    pub fail_next_map: bool,
    /// Make the next unmap report lost storage
    pub lose_next_unmap: bool,
    /// Wait polls a new fence needs before it signals
    pub fence_latency: u32,
    /// Most buffers that may be alive at once (`None` is unlimited)
    pub buffer_limit: Option<usize>,
    buffers: FxHashMap<BufferId, MockStorage>,
    names: SlotAllocator,
    fences: FxHashMap<FenceId, u32>,
    next_fence: u64,
    bound: Option<BufferId>,
    enabled: FxHashSet<VertexAttribute>,
    pointers: FxHashMap<VertexAttribute, AttributePointer>,
}

impl MockDeviceState {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            draws: Vec::new(),
            errors: Vec::new(),
            finish_count: 0,
            orphan_count: 0,
            max_live_fences: 0,
            fail_next_map: false,
            lose_next_unmap: false,
            fence_latency: 0,
            buffer_limit: None,
            buffers: FxHashMap::default(),
            names: SlotAllocator::starting_at(1),
            fences: FxHashMap::default(),
            next_fence: 1,
            bound: None,
            enabled: FxHashSet::default(),
            pointers: FxHashMap::default(),
        }
    }

    /// Current contents of a buffer's storage
    pub fn contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers
            .get(&buffer)
            .filter(|storage| storage.allocated)
            .map(|storage| storage.bytes.as_slice())
    }

    /// Whether a buffer name is alive
    pub fn is_live(&self, buffer: BufferId) -> bool {
        self.buffers.contains_key(&buffer)
    }

    /// Number of live buffers
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Whether a buffer is currently mapped
    pub fn is_mapped(&self, buffer: BufferId) -> bool {
        self.buffers.get(&buffer).is_some_and(|storage| storage.mapped.is_some())
    }

    /// Whether a buffer uses immutable storage
    pub fn is_immutable(&self, buffer: BufferId) -> bool {
        self.buffers.get(&buffer).is_some_and(|storage| storage.immutable)
    }

    /// Number of fences not yet deleted
    pub fn live_fence_count(&self) -> usize {
        self.fences.len()
    }

    /// Currently bound buffer
    pub fn bound_buffer(&self) -> Option<BufferId> {
        self.bound
    }

    /// Whether an attribute channel is enabled
    pub fn is_enabled(&self, attribute: VertexAttribute) -> bool {
        self.enabled.contains(&attribute)
    }

    /// Current pointer of an attribute channel
    pub fn pointer(&self, attribute: VertexAttribute) -> Option<AttributePointer> {
        self.pointers.get(&attribute).copied()
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, pred: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    /// Forget recorded calls and draws (storage and names are kept)
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    fn bound_storage(&mut self, op: &str) -> Option<(BufferId, &mut MockStorage)> {
        let Some(buffer) = self.bound else {
            self.errors.push(format!("{}: no buffer bound", op));
            return None;
        };
        if !self.buffers.contains_key(&buffer) {
            self.errors.push(format!("{}: bound buffer {:?} was deleted", op, buffer));
            return None;
        }
        self.buffers.get_mut(&buffer).map(|storage| (buffer, storage))
    }

    fn map_pointer(storage: &mut MockStorage, offset: usize) -> Option<NonNull<u8>> {
        // SAFETY: callers check offset <= bytes.len()
        NonNull::new(unsafe { storage.bytes.as_mut_ptr().add(offset) })
    }

    fn record_draw(&mut self, primitive: Primitive, first: usize, count: usize, indices: Vec<u32>) {
        let Some(pointer) = self.pointer(VertexAttribute::Position) else {
            self.errors.push("draw: no position attribute pointer".to_string());
            return;
        };
        if !self.is_enabled(VertexAttribute::Position) {
            self.errors.push("draw: position attribute disabled".to_string());
        }
        let vertices = pointer
            .buffer
            .and_then(|buffer| self.contents(buffer))
            .map(|bytes| {
                let begin = (first * pointer.stride).min(bytes.len());
                let end = ((first + count) * pointer.stride).min(bytes.len());
                bytes[begin..end].to_vec()
            })
            .unwrap_or_default();
        self.draws.push(DrawRecord {
            buffer: pointer.buffer,
            primitive,
            first_vertex: first,
            vertex_count: count,
            indices,
            vertices,
        });
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Software GraphicsDevice that tracks everything it is asked to do
#[derive(Debug, Clone)]
pub struct MockGraphicsDevice {
    capabilities: Capabilities,
    state: Rc<RefCell<MockDeviceState>>,
}

impl MockGraphicsDevice {
    /// Create a mock device advertising `capabilities`
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            state: Rc::new(RefCell::new(MockDeviceState::new())),
        }
    }

    /// Fences need `polls` unsuccessful waits before they signal
    pub fn with_fence_latency(self, polls: u32) -> Self {
        self.state.borrow_mut().fence_latency = polls;
        self
    }

    /// Shared handle to the recorded state
    pub fn state(&self) -> Rc<RefCell<MockDeviceState>> {
        self.state.clone()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_buffer(&mut self) -> Result<BufferId> {
        let mut state = self.state.borrow_mut();
        if state.buffer_limit.is_some_and(|limit| state.buffers.len() >= limit) {
            return Err(Error::OutOfMemory);
        }
        let buffer = BufferId(state.names.alloc());
        state.buffers.insert(buffer, MockStorage::default());
        state.calls.push(DeviceCall::CreateBuffer(buffer));
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.calls.push(DeviceCall::DeleteBuffer(buffer));
        if !state.names.free(buffer.0) {
            state.errors.push(format!("delete_buffer: unknown buffer {:?}", buffer));
            return;
        }
        state.buffers.remove(&buffer);
        if state.bound == Some(buffer) {
            state.bound = None;
        }
    }

    fn bind_buffer(&mut self, buffer: Option<BufferId>) {
        let mut state = self.state.borrow_mut();
        state.calls.push(DeviceCall::BindBuffer(buffer));
        if let Some(id) = buffer {
            if !state.buffers.contains_key(&id) {
                state.errors.push(format!("bind_buffer: unknown buffer {:?}", id));
            }
        }
        state.bound = buffer;
    }

    fn buffer_data(&mut self, size: usize, data: Option<&[u8]>, usage: BufferUsage) {
        let mut state = self.state.borrow_mut();
        let Some((buffer, storage)) = state.bound_storage("buffer_data") else { return };
        if storage.immutable {
            state.errors.push(format!("buffer_data: {:?} has immutable storage", buffer));
            return;
        }
        let orphaned = storage.allocated;
        let mut bytes = data.map(<[u8]>::to_vec).unwrap_or_default();
        bytes.resize(size, 0);
        storage.bytes = bytes;
        storage.allocated = true;
        storage.mapped = None;
        if orphaned {
            state.orphan_count += 1;
        }
        state.calls.push(DeviceCall::BufferData { buffer, size, usage, with_data: data.is_some() });
    }

    fn buffer_storage(&mut self, size: usize, data: Option<&[u8]>, flags: StorageFlags) {
        let mut state = self.state.borrow_mut();
        let Some((buffer, storage)) = state.bound_storage("buffer_storage") else { return };
        if storage.immutable {
            state.errors.push(format!("buffer_storage: {:?} already has immutable storage", buffer));
            return;
        }
        let mut bytes = data.map(<[u8]>::to_vec).unwrap_or_default();
        bytes.resize(size, 0);
        storage.bytes = bytes;
        storage.allocated = true;
        storage.immutable = true;
        storage.storage_flags = flags;
        state.calls.push(DeviceCall::BufferStorage { buffer, size, flags, with_data: data.is_some() });
    }

    fn buffer_sub_data(&mut self, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some((buffer, storage)) = state.bound_storage("buffer_sub_data") else { return };
        let error = if !storage.allocated {
            Some(format!("buffer_sub_data: {:?} has no storage", buffer))
        } else if storage.immutable {
            Some(format!("buffer_sub_data: {:?} has immutable storage", buffer))
        } else if offset + data.len() > storage.bytes.len() {
            Some(format!("buffer_sub_data: range {}+{} out of bounds", offset, data.len()))
        } else {
            storage.bytes[offset..offset + data.len()].copy_from_slice(data);
            None
        };
        state.calls.push(DeviceCall::BufferSubData { buffer, offset, len: data.len() });
        state.errors.extend(error);
    }

    fn map_buffer(&mut self) -> Option<NonNull<u8>> {
        let mut state = self.state.borrow_mut();
        let fail = std::mem::take(&mut state.fail_next_map);
        let Some((buffer, storage)) = state.bound_storage("map_buffer") else { return None };
        let result = if fail {
            None
        } else if !storage.allocated || storage.mapped.is_some() || storage.immutable {
            None
        } else {
            storage.mapped = Some(MapFlags::WRITE);
            MockDeviceState::map_pointer(storage, 0)
        };
        state.calls.push(DeviceCall::MapBuffer { buffer });
        result
    }

    fn map_buffer_range(&mut self, offset: usize, length: usize, flags: MapFlags) -> Option<NonNull<u8>> {
        let mut state = self.state.borrow_mut();
        let fail = std::mem::take(&mut state.fail_next_map);
        let Some((buffer, storage)) = state.bound_storage("map_buffer_range") else { return None };
        let persistent_ok = !flags.contains(MapFlags::PERSISTENT)
            || storage.storage_flags.contains(StorageFlags::PERSISTENT);
        let writable = !storage.immutable || storage.storage_flags.contains(StorageFlags::MAP_WRITE);
        let mut orphaned = false;
        let result = if fail {
            None
        } else if !storage.allocated
            || storage.mapped.is_some()
            || offset + length > storage.bytes.len()
            || !persistent_ok
            || !writable
        {
            None
        } else {
            if flags.contains(MapFlags::INVALIDATE_BUFFER) {
                // Fresh backing memory under the same name
                storage.bytes = vec![0; storage.bytes.len()];
                orphaned = true;
            }
            storage.mapped = Some(flags);
            MockDeviceState::map_pointer(storage, offset)
        };
        if result.is_none() && !fail {
            state.errors.push(format!(
                "map_buffer_range: cannot map {:?} range {}+{} with {:?}",
                buffer, offset, length, flags
            ));
        }
        if orphaned {
            state.orphan_count += 1;
        }
        state.calls.push(DeviceCall::MapBufferRange { buffer, offset, length, flags });
        result
    }

    fn unmap_buffer(&mut self) -> bool {
        let mut state = self.state.borrow_mut();
        let lose = std::mem::take(&mut state.lose_next_unmap);
        let Some((buffer, storage)) = state.bound_storage("unmap_buffer") else { return false };
        let was_mapped = storage.mapped.take().is_some();
        let ok = was_mapped && !lose;
        if !was_mapped {
            state.errors.push(format!("unmap_buffer: {:?} is not mapped", buffer));
        }
        state.calls.push(DeviceCall::UnmapBuffer { buffer, ok });
        ok
    }

    fn fence_sync(&mut self) -> FenceId {
        let mut state = self.state.borrow_mut();
        let fence = FenceId(state.next_fence);
        state.next_fence += 1;
        let latency = state.fence_latency;
        state.fences.insert(fence, latency);
        state.max_live_fences = state.max_live_fences.max(state.fences.len());
        state.calls.push(DeviceCall::FenceSync(fence));
        fence
    }

    fn client_wait_sync(&mut self, fence: FenceId, _flush_commands: bool, _timeout_ns: u64) -> WaitResult {
        let mut state = self.state.borrow_mut();
        let result = match state.fences.get_mut(&fence) {
            None => WaitResult::WaitFailed,
            Some(0) => WaitResult::AlreadySignaled,
            Some(remaining) => {
                *remaining -= 1;
                if *remaining == 0 {
                    WaitResult::ConditionSatisfied
                } else {
                    WaitResult::TimeoutExpired
                }
            }
        };
        state.calls.push(DeviceCall::ClientWaitSync { fence, result });
        result
    }

    fn delete_sync(&mut self, fence: FenceId) {
        let mut state = self.state.borrow_mut();
        if state.fences.remove(&fence).is_none() {
            state.errors.push(format!("delete_sync: unknown fence {:?}", fence));
        }
        state.calls.push(DeviceCall::DeleteSync(fence));
    }

    fn finish(&mut self) {
        let mut state = self.state.borrow_mut();
        for remaining in state.fences.values_mut() {
            *remaining = 0;
        }
        state.finish_count += 1;
        state.calls.push(DeviceCall::Finish);
    }

    fn set_attribute_enabled(&mut self, attribute: VertexAttribute, enabled: bool) {
        let mut state = self.state.borrow_mut();
        if enabled {
            state.enabled.insert(attribute);
        } else {
            state.enabled.remove(&attribute);
        }
        state.calls.push(DeviceCall::SetAttributeEnabled { attribute, enabled });
    }

    fn attribute_pointer(&mut self, attribute: VertexAttribute, components: u32, stride: usize, offset: usize) {
        let mut state = self.state.borrow_mut();
        let buffer = state.bound;
        state.pointers.insert(attribute, AttributePointer { buffer, components, stride, offset });
        state.calls.push(DeviceCall::AttributePointer { attribute, components, stride, offset });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize) {
        let mut state = self.state.borrow_mut();
        state.calls.push(DeviceCall::DrawArrays { primitive, first, count });
        state.record_draw(primitive, first, count, Vec::new());
    }

    fn draw_range_elements(&mut self, primitive: Primitive, start: usize, end: usize, indices: IndexData<'_>) {
        let mut state = self.state.borrow_mut();
        let resolved: Vec<u32> = (0..indices.len()).filter_map(|i| indices.get(i)).collect();
        if resolved.iter().any(|&index| (index as usize) < start || (index as usize) > end) {
            state.errors.push(format!("draw_range_elements: index outside [{}, {}]", start, end));
        }
        state.calls.push(DeviceCall::DrawRangeElements {
            primitive,
            start,
            end,
            index_count: indices.len(),
            wide: matches!(indices, IndexData::U32(_)),
        });
        state.record_draw(primitive, start, end + 1 - start, resolved);
    }

    fn draw_range_elements_base_vertex(
        &mut self,
        primitive: Primitive,
        start: usize,
        end: usize,
        indices: &[u16],
        base_vertex: usize,
    ) {
        let mut state = self.state.borrow_mut();
        if indices.iter().any(|&index| (index as usize) < start || (index as usize) > end) {
            state.errors.push(format!("draw_range_elements_base_vertex: index outside [{}, {}]", start, end));
        }
        let resolved: Vec<u32> = indices.iter().map(|&index| index as u32 + base_vertex as u32).collect();
        state.calls.push(DeviceCall::DrawRangeElementsBaseVertex {
            primitive,
            start,
            end,
            index_count: indices.len(),
            base_vertex,
        });
        state.record_draw(primitive, start + base_vertex, end + 1 - start, resolved);
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
