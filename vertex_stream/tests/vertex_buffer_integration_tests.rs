//! Integration tests for vertex buffer workflows
//!
//! These tests drive the public API end to end against MockGraphicsDevice:
//! buffer creation through the render context, writes, locks, draws and
//! ring cycling. No GPU required.
//!
//! Run with: cargo test --test vertex_buffer_integration_tests

use std::cell::RefCell;
use std::mem::size_of;
use std::rc::Rc;

use vertex_stream::glam::{Vec2, Vec3};
use vertex_stream::vstream::device::{Capabilities, DeviceCall, MockDeviceState, MockGraphicsDevice};
use vertex_stream::vstream::vertex::{LitVertex, MultiLayerVertex, TexturedVertex, Vertex};
use vertex_stream::vstream::{
    BufferConfig, BufferFlags, BufferUsage, BufferVariant, Primitive, RenderContext, UploadMode,
    VertexBuffer, VertexBufferDesc,
};

// ============================================================================
// HELPERS
// ============================================================================

fn create_context(caps: Capabilities, config: BufferConfig) -> (Rc<RenderContext>, Rc<RefCell<MockDeviceState>>) {
    let device = MockGraphicsDevice::new(caps);
    let state = device.state();
    let context = RenderContext::new(Box::new(device), config).unwrap();
    (context, state)
}

fn lit_vertices(first: usize, count: usize) -> Vec<LitVertex> {
    (first..first + count)
        .map(|i| LitVertex::new(Vec3::new(i as f32, -(i as f32), 0.5), 0x8040_20ff, Vec2::new(0.0, 1.0)))
        .collect()
}

fn bytes_of<V: bytemuck::Pod>(vertices: &[V]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Bytes of the current ring slot of `buffer`
fn read_back<V: Vertex>(state: &Rc<RefCell<MockDeviceState>>, buffer: &dyn VertexBuffer<V>) -> Vec<u8> {
    let stride = size_of::<V>();
    let start = buffer.ring_offset() * stride;
    let end = start + buffer.capacity() * stride;
    state.borrow().contents(buffer.buffer_id()).unwrap()[start..end].to_vec()
}

// ============================================================================
// STREAMING SCENARIO
// ============================================================================

fn run_stream_scenario(caps: Capabilities, config: BufferConfig) {
    let (context, state) = create_context(caps, config);
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(100, BufferUsage::Stream))
        .unwrap();

    let first = lit_vertices(0, 50);
    let second = lit_vertices(50, 50);
    buffer.set_data(&first, 0, BufferFlags::DISCARD_BUFFER).unwrap();
    buffer.set_data(&second, 50, BufferFlags::NO_OVERWRITE).unwrap();
    buffer.draw(Primitive::TriangleList, 100, 0).unwrap();

    let mock = state.borrow();
    assert_eq!(mock.finish_count, 0, "{:?}", buffer.variant());
    assert_eq!(mock.draws.len(), 1);

    let draw = &mock.draws[0];
    assert_eq!(draw.vertex_count, 100);
    assert_eq!(&draw.vertices[..50 * size_of::<LitVertex>()], bytes_of(&first));
    assert_eq!(&draw.vertices[50 * size_of::<LitVertex>()..], bytes_of(&second));
    assert!(mock.errors.is_empty(), "{:?}", mock.errors);

    assert_eq!(context.stats().blocking_flushes, 0);
}

#[test]
fn test_integration_stream_scenario_every_tier() {
    let tiers = [
        (Capabilities::basic(), UploadMode::Auto),
        (Capabilities { map_buffer_range: true, ..Capabilities::basic() }, UploadMode::Auto),
        (Capabilities::all(), UploadMode::Auto),
        (Capabilities::all(), UploadMode::PersistentOrphan),
        (Capabilities::all(), UploadMode::PersistentUnsynchronized),
    ];
    for (caps, mode) in tiers {
        run_stream_scenario(caps, BufferConfig { upload_mode: mode, ..BufferConfig::default() });
    }
}

// ============================================================================
// FENCED RING SCENARIO
// ============================================================================

#[test]
fn test_integration_fenced_ring_cycles_and_waits() {
    let device = MockGraphicsDevice::new(Capabilities::all()).with_fence_latency(2);
    let state = device.state();
    let context = RenderContext::new(Box::new(device), BufferConfig::default()).unwrap();
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(8, BufferUsage::Stream).with_multiplier(3))
        .unwrap();
    assert_eq!(buffer.variant(), BufferVariant::PersistentFenced { multiplier: 3 });

    let mut slots = Vec::new();
    for frame in 0..4 {
        let data = lit_vertices(frame * 8, 8);
        buffer.set_data(&data, 0, BufferFlags::DISCARD_BUFFER).unwrap();
        buffer.draw(Primitive::TriangleList, 8, 0).unwrap();
        slots.push(buffer.ring_offset() / 8);

        assert!(state.borrow().live_fence_count() <= 2);
        assert_eq!(read_back(&state, &*buffer), bytes_of(&data));
    }
    assert_eq!(slots, vec![1, 2, 0, 1]);

    // Coming back to slot 0 waited on the fence placed when leaving it
    let mock = state.borrow();
    let first_fence = mock
        .calls
        .iter()
        .find_map(|call| match call {
            DeviceCall::FenceSync(fence) => Some(*fence),
            _ => None,
        })
        .unwrap();
    let waited = mock
        .calls
        .iter()
        .any(|call| matches!(call, DeviceCall::ClientWaitSync { fence, result } if *fence == first_fence && result.is_signaled()));
    assert!(waited);
    assert_eq!(context.stats().fence_waits, 2);
    assert_eq!(mock.finish_count, 0);
}

#[test]
fn test_integration_slot_not_written_before_fence_signals() {
    let device = MockGraphicsDevice::new(Capabilities::all()).with_fence_latency(3);
    let state = device.state();
    let context = RenderContext::new(Box::new(device), BufferConfig::default()).unwrap();
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(4, BufferUsage::Stream).with_multiplier(2))
        .unwrap();

    buffer.set_data(&lit_vertices(0, 4), 0, BufferFlags::DISCARD_BUFFER).unwrap();
    let before = state.borrow().calls.len();
    buffer.set_data(&lit_vertices(4, 4), 0, BufferFlags::DISCARD_BUFFER).unwrap();

    // The second discard returns to slot 0 only after its fence signaled
    let mock = state.borrow();
    let waits: Vec<_> = mock.calls[before..]
        .iter()
        .filter_map(|call| match call {
            DeviceCall::ClientWaitSync { result, .. } => Some(*result),
            _ => None,
        })
        .collect();
    assert_eq!(waits.len(), 3);
    assert!(waits.last().unwrap().is_signaled());
    assert_eq!(buffer.ring_offset(), 0);
}

// ============================================================================
// READ-BACK
// ============================================================================

#[test]
fn test_integration_write_read_back_all_variants() {
    let modes = [
        UploadMode::SubData,
        UploadMode::MapRange,
        UploadMode::PersistentUnsynchronized,
        UploadMode::PersistentOrphan,
        UploadMode::PersistentFenced,
    ];
    for mode in modes {
        let (context, state) = create_context(
            Capabilities::all(),
            BufferConfig { upload_mode: mode, ..BufferConfig::default() },
        );
        let mut buffer = context
            .create_vertex_buffer::<MultiLayerVertex>(VertexBufferDesc::new(6, BufferUsage::Dynamic))
            .unwrap();

        let data: Vec<MultiLayerVertex> = (0..3)
            .map(|i| MultiLayerVertex::new(Vec3::splat(i as f32), i, [Vec2::X, Vec2::Y, Vec2::ONE]))
            .collect();
        for offset in [0, 2, 3] {
            buffer.set_data(&data, offset, BufferFlags::NO_OVERWRITE).unwrap();
            let bytes = read_back(&state, &*buffer);
            let stride = size_of::<MultiLayerVertex>();
            assert_eq!(&bytes[offset * stride..(offset + 3) * stride], bytes_of(&data), "{:?} @ {}", mode, offset);
        }
    }
}

#[test]
fn test_integration_lock_read_back() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    let mut buffer = context
        .create_vertex_buffer::<TexturedVertex>(VertexBufferDesc::new(16, BufferUsage::Stream))
        .unwrap();

    let data: Vec<TexturedVertex> = (0..4)
        .map(|i| TexturedVertex::new(Vec3::new(i as f32, 0.0, 0.0), 0.25, 0xffff_ffff, Vec2::ZERO))
        .collect();
    buffer
        .lock(BufferFlags::DISCARD_BUFFER, 4, 4)
        .unwrap()
        .copy_from_slice(&data);
    buffer.unlock();

    let stride = size_of::<TexturedVertex>();
    let bytes = read_back(&state, &*buffer);
    assert_eq!(&bytes[4 * stride..8 * stride], bytes_of(&data));
}

// ============================================================================
// STATIC BUFFERS
// ============================================================================

#[test]
fn test_integration_static_buffer_upload_and_draw() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(6, BufferUsage::Static))
        .unwrap();
    assert!(!buffer.variant().is_persistent());

    let data = lit_vertices(0, 6);
    buffer.set_data(&data, 0, BufferFlags::empty()).unwrap();
    buffer.draw_indexed(Primitive::TriangleList, 4, 2, &[0, 1, 2, 2, 3, 0]).unwrap();

    let mock = state.borrow();
    assert!(mock.is_immutable(buffer.buffer_id()));
    assert_eq!(mock.draws[0].indices, vec![2, 3, 4, 4, 5, 2]);
}

#[test]
#[should_panic(expected = "initialized twice")]
fn test_integration_static_second_full_write_panics() {
    let (context, _state) = create_context(Capabilities::all(), BufferConfig::default());
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(6, BufferUsage::Static))
        .unwrap();
    buffer.set_data(&lit_vertices(0, 6), 0, BufferFlags::empty()).unwrap();
    buffer.set_data(&lit_vertices(0, 6), 0, BufferFlags::empty()).unwrap();
}

// ============================================================================
// SHARED STATE ACROSS BUFFERS
// ============================================================================

#[test]
fn test_integration_switching_buffers_rebinds_attributes() {
    let (context, state) = create_context(Capabilities::basic(), BufferConfig::default());
    let mut lit = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(4, BufferUsage::Dynamic))
        .unwrap();
    let mut textured = context
        .create_vertex_buffer::<TexturedVertex>(VertexBufferDesc::new(4, BufferUsage::Dynamic))
        .unwrap();
    lit.set_data(&lit_vertices(0, 4), 0, BufferFlags::empty()).unwrap();
    textured
        .set_data(&[TexturedVertex::default(); 4], 0, BufferFlags::empty())
        .unwrap();

    lit.draw(Primitive::TriangleList, 3, 0).unwrap();
    textured.draw(Primitive::TriangleList, 3, 0).unwrap();
    lit.draw(Primitive::TriangleList, 3, 0).unwrap();

    let mock = state.borrow();
    assert_eq!(mock.draws[0].buffer, Some(lit.buffer_id()));
    assert_eq!(mock.draws[1].buffer, Some(textured.buffer_id()));
    assert_eq!(mock.draws[2].buffer, Some(lit.buffer_id()));
    assert_eq!(mock.draws[1].vertices.len(), 3 * size_of::<TexturedVertex>());
}

#[test]
fn test_integration_dropping_buffers_frees_device_names() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    {
        let mut a = context
            .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(4, BufferUsage::Stream))
            .unwrap();
        let _b = context
            .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(4, BufferUsage::Static))
            .unwrap();
        a.set_data(&lit_vertices(0, 4), 0, BufferFlags::DISCARD_BUFFER).unwrap();
        a.draw(Primitive::TriangleList, 4, 0).unwrap();
        assert_eq!(state.borrow().live_buffer_count(), 2);
    }

    let mock = state.borrow();
    assert_eq!(mock.live_buffer_count(), 0);
    assert_eq!(mock.live_fence_count(), 0);
    assert!(mock.errors.is_empty(), "{:?}", mock.errors);
}
