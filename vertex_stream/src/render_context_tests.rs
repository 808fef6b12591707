//! Unit tests for render_context.rs
//!
//! Tests context creation, buffer variant selection, stats and the bind cache
//! using MockGraphicsDevice (no GPU required).

use std::cell::RefCell;
use std::rc::Rc;

use crate::buffer::{BufferVariant, MAX_RING_SLOTS};
use crate::error::Error;
use crate::graphics_device::{
    BufferUsage, BufferFlags, Capabilities, DeviceCall, MockDeviceState, MockGraphicsDevice, Primitive,
};
use crate::render_context::*;
use crate::vertex::LitVertex;

fn create_context(caps: Capabilities, config: BufferConfig) -> (Rc<RenderContext>, Rc<RefCell<MockDeviceState>>) {
    let device = MockGraphicsDevice::new(caps);
    let state = device.state();
    let context = RenderContext::new(Box::new(device), config).unwrap();
    (context, state)
}

fn with_mode(mode: UploadMode) -> BufferConfig {
    BufferConfig { upload_mode: mode, ..BufferConfig::default() }
}

fn map_range_only() -> Capabilities {
    Capabilities { map_buffer_range: true, ..Capabilities::basic() }
}

// ============================================================================
// CONFIG / CREATION
// ============================================================================

#[test]
fn test_buffer_config_default() {
    let config = BufferConfig::default();
    assert_eq!(config.upload_mode, UploadMode::Auto);
    assert_eq!(config.default_multiplier, 3);
}

#[test]
fn test_new_rejects_zero_default_multiplier() {
    let config = BufferConfig { default_multiplier: 0, ..BufferConfig::default() };
    let result = RenderContext::new(Box::new(MockGraphicsDevice::new(Capabilities::all())), config);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_new_rejects_oversized_default_multiplier() {
    let config = BufferConfig { default_multiplier: MAX_RING_SLOTS + 1, ..BufferConfig::default() };
    let result = RenderContext::new(Box::new(MockGraphicsDevice::new(Capabilities::all())), config);
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_capabilities_are_cached() {
    let (context, _) = create_context(map_range_only(), BufferConfig::default());
    assert_eq!(context.capabilities(), map_range_only());
    assert_eq!(context.config().upload_mode, UploadMode::Auto);
}

#[test]
fn test_vertex_buffer_desc_builder() {
    let desc = VertexBufferDesc::new(64, BufferUsage::Dynamic);
    assert_eq!(desc.multiplier, None);
    assert_eq!(desc.with_multiplier(4).multiplier, Some(4));
}

// ============================================================================
// VARIANT SELECTION: AUTO
// ============================================================================

#[test]
fn test_auto_prefers_fenced_ring() {
    let (context, _) = create_context(Capabilities::all(), BufferConfig::default());
    let desc = VertexBufferDesc::new(100, BufferUsage::Stream);
    assert_eq!(
        context.select_variant(&desc).unwrap(),
        BufferVariant::PersistentFenced { multiplier: 3 }
    );
}

#[test]
fn test_auto_single_slot_orphans() {
    let (context, _) = create_context(Capabilities::all(), BufferConfig::default());
    let desc = VertexBufferDesc::new(100, BufferUsage::Dynamic).with_multiplier(1);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::PersistentOrphan);
}

#[test]
fn test_auto_without_storage_uses_map_range() {
    let (context, _) = create_context(map_range_only(), BufferConfig::default());
    let desc = VertexBufferDesc::new(100, BufferUsage::Stream);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::MapRange);
}

#[test]
fn test_auto_basic_uses_sub_data() {
    let (context, _) = create_context(Capabilities::basic(), BufferConfig::default());
    let desc = VertexBufferDesc::new(100, BufferUsage::Stream);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::SubData);
}

#[test]
fn test_static_never_persistent() {
    let (context, _) = create_context(Capabilities::all(), with_mode(UploadMode::PersistentFenced));
    let desc = VertexBufferDesc::new(100, BufferUsage::Static);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::MapRange);
}

// ============================================================================
// VARIANT SELECTION: EXPLICIT MODES
// ============================================================================

#[test]
fn test_explicit_modes_with_full_capabilities() {
    let desc = VertexBufferDesc::new(10, BufferUsage::Dynamic).with_multiplier(2);
    let cases = [
        (UploadMode::SubData, BufferVariant::SubData),
        (UploadMode::MapRange, BufferVariant::MapRange),
        (UploadMode::PersistentUnsynchronized, BufferVariant::PersistentUnsynchronized { multiplier: 2 }),
        (UploadMode::PersistentOrphan, BufferVariant::PersistentOrphan),
        (UploadMode::PersistentFenced, BufferVariant::PersistentFenced { multiplier: 2 }),
    ];

    for (mode, expected) in cases {
        let (context, _) = create_context(Capabilities::all(), with_mode(mode));
        assert_eq!(context.select_variant(&desc).unwrap(), expected, "{:?}", mode);
    }
}

#[test]
fn test_persistent_mode_falls_back_without_storage() {
    let (context, _) = create_context(map_range_only(), with_mode(UploadMode::PersistentFenced));
    let desc = VertexBufferDesc::new(10, BufferUsage::Stream);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::MapRange);

    let (context, _) = create_context(Capabilities::basic(), with_mode(UploadMode::PersistentOrphan));
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::SubData);
}

#[test]
fn test_map_range_mode_falls_back_to_sub_data() {
    let (context, _) = create_context(Capabilities::basic(), with_mode(UploadMode::MapRange));
    let desc = VertexBufferDesc::new(10, BufferUsage::Dynamic);
    assert_eq!(context.select_variant(&desc).unwrap(), BufferVariant::SubData);
}

// ============================================================================
// VARIANT SELECTION: INVALID DESCRIPTORS
// ============================================================================

#[test]
fn test_zero_capacity_is_invalid() {
    let (context, _) = create_context(Capabilities::all(), BufferConfig::default());
    let desc = VertexBufferDesc::new(0, BufferUsage::Stream);
    assert!(matches!(context.select_variant(&desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_zero_multiplier_is_invalid() {
    let (context, _) = create_context(Capabilities::all(), BufferConfig::default());
    let desc = VertexBufferDesc::new(10, BufferUsage::Stream).with_multiplier(0);
    assert!(matches!(context.select_variant(&desc), Err(Error::InvalidResource(_))));
}

#[test]
fn test_oversized_ring_is_invalid() {
    let (context, _) = create_context(Capabilities::all(), BufferConfig::default());
    let desc = VertexBufferDesc::new(10, BufferUsage::Stream).with_multiplier(MAX_RING_SLOTS + 1);
    assert!(matches!(context.select_variant(&desc), Err(Error::InvalidResource(_))));

    let desc = desc.with_multiplier(MAX_RING_SLOTS);
    assert!(context.select_variant(&desc).is_ok());
}

#[test]
fn test_create_vertex_buffer_propagates_invalid_desc() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    let result = context.create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(0, BufferUsage::Stream));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(state.borrow().live_buffer_count(), 0);
}

// ============================================================================
// BUFFER CREATION
// ============================================================================

#[test]
fn test_create_vertex_buffer_matches_selection() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    let buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(16, BufferUsage::Stream))
        .unwrap();

    assert_eq!(buffer.variant(), BufferVariant::PersistentFenced { multiplier: 3 });
    assert_eq!(buffer.capacity(), 16);
    assert_eq!(buffer.usage(), BufferUsage::Stream);
    assert!(state.borrow().is_live(buffer.buffer_id()));
}

#[test]
fn test_create_vertex_buffer_propagates_out_of_memory() {
    let (context, state) = create_context(Capabilities::all(), BufferConfig::default());
    state.borrow_mut().buffer_limit = Some(0);
    let result = context.create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(16, BufferUsage::Stream));
    assert!(matches!(result, Err(Error::OutOfMemory)));
}

#[test]
fn test_dropping_buffer_deletes_it() {
    let (context, state) = create_context(Capabilities::basic(), BufferConfig::default());
    let buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(16, BufferUsage::Dynamic))
        .unwrap();
    let id = buffer.buffer_id();
    drop(buffer);

    assert!(!state.borrow().is_live(id));
    assert!(state.borrow().errors.is_empty());
}

// ============================================================================
// STATS / BIND CACHE
// ============================================================================

#[test]
fn test_stats_accumulate_and_reset() {
    let (context, _) = create_context(Capabilities::basic(), BufferConfig::default());
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(8, BufferUsage::Dynamic))
        .unwrap();
    buffer.set_data(&[LitVertex::default(); 8], 0, BufferFlags::empty()).unwrap();
    buffer.draw(Primitive::TriangleList, 3, 0).unwrap();
    buffer.draw(Primitive::TriangleList, 3, 3).unwrap();

    assert_eq!(context.stats().draw_calls, 2);
    context.reset_stats();
    assert_eq!(context.stats(), ContextStats::default());
}

#[test]
fn test_redundant_binds_are_skipped() {
    let (context, state) = create_context(Capabilities::basic(), BufferConfig::default());
    let mut buffer = context
        .create_vertex_buffer::<LitVertex>(VertexBufferDesc::new(8, BufferUsage::Dynamic))
        .unwrap();
    buffer.set_data(&[LitVertex::default(); 8], 0, BufferFlags::empty()).unwrap();
    buffer.draw(Primitive::TriangleList, 3, 0).unwrap();
    buffer.draw(Primitive::TriangleList, 3, 0).unwrap();

    let binds = state
        .borrow()
        .count_calls(|call| matches!(call, DeviceCall::BindBuffer(Some(_))));
    assert_eq!(binds, 1);
}
