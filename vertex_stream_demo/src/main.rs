//! Streams a batch of particle quads through each vertex buffer tier
//!
//! Runs against the host-memory mock device, so it needs no GPU. Every frame
//! starts with a DISCARD_BUFFER write and appends the following batches with
//! NO_OVERWRITE, the way a particle system would feed the buffer.

use vertex_stream::glam::{Vec2, Vec3};
use vertex_stream::vstream::device::{Capabilities, MockGraphicsDevice};
use vertex_stream::vstream::vertex::TexturedVertex;
use vertex_stream::vstream::{
    BufferConfig, BufferFlags, BufferUsage, Primitive, RenderContext, Result, UploadMode,
    VertexBufferDesc,
};
use vertex_stream::{vs_error, vs_info};

const SOURCE: &str = "vstream_demo";

const FRAMES: usize = 6;
const BATCHES_PER_FRAME: usize = 4;
const QUADS_PER_BATCH: usize = 16;
const CAPACITY: usize = BATCHES_PER_FRAME * QUADS_PER_BATCH * 4;

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

fn quad(center: Vec3, size: f32, color: u32) -> [TexturedVertex; 4] {
    let half = size * 0.5;
    [
        TexturedVertex::new(center + Vec3::new(-half, -half, 0.0), 1.0, color, Vec2::new(0.0, 1.0)),
        TexturedVertex::new(center + Vec3::new(half, -half, 0.0), 1.0, color, Vec2::new(1.0, 1.0)),
        TexturedVertex::new(center + Vec3::new(-half, half, 0.0), 1.0, color, Vec2::new(0.0, 0.0)),
        TexturedVertex::new(center + Vec3::new(half, half, 0.0), 1.0, color, Vec2::new(1.0, 0.0)),
    ]
}

fn batch(frame: usize, batch: usize) -> (Vec<TexturedVertex>, Vec<u16>) {
    let mut vertices = Vec::with_capacity(QUADS_PER_BATCH * 4);
    let mut indices = Vec::with_capacity(QUADS_PER_BATCH * 6);
    for i in 0..QUADS_PER_BATCH {
        let t = (frame * BATCHES_PER_FRAME + batch) as f32 + i as f32 / QUADS_PER_BATCH as f32;
        let center = Vec3::new(t.cos() * 10.0, t.sin() * 10.0, i as f32);
        let color = 0xff00_0000 | ((i as u32 * 16) << 8) | (batch as u32 * 64);
        let base = vertices.len() as u16;
        vertices.extend_from_slice(&quad(center, 0.5, color));
        indices.extend(QUAD_INDICES.iter().map(|index| base + index));
    }
    (vertices, indices)
}

fn run_tier(name: &str, capabilities: Capabilities, upload_mode: UploadMode) -> Result<()> {
    let device = MockGraphicsDevice::new(capabilities).with_fence_latency(2);
    let mock = device.state();
    let config = BufferConfig { upload_mode, ..BufferConfig::default() };
    let context = RenderContext::new(Box::new(device), config)?;

    let mut buffer =
        context.create_vertex_buffer::<TexturedVertex>(VertexBufferDesc::new(CAPACITY, BufferUsage::Stream))?;
    vs_info!(SOURCE, "[{}] streaming through {:?}", name, buffer.variant());

    for frame in 0..FRAMES {
        let mut offset = 0;
        for index in 0..BATCHES_PER_FRAME {
            let (vertices, indices) = batch(frame, index);
            let flags = if index == 0 { BufferFlags::DISCARD_BUFFER } else { BufferFlags::NO_OVERWRITE };
            buffer.set_data(&vertices, offset, flags)?;
            buffer.draw_indexed(Primitive::TriangleList, vertices.len(), offset, &indices)?;
            offset += vertices.len();
        }
    }

    let stats = context.stats();
    vs_info!(
        SOURCE,
        "[{}] {} indexed draws, {} rebased, {} orphaned uploads, {} fence waits, {} blocking flushes",
        name,
        stats.indexed_draw_calls,
        stats.rebased_draws,
        stats.orphaned_uploads,
        stats.fence_waits,
        stats.blocking_flushes
    );

    drop(buffer);
    let mock = mock.borrow();
    if !mock.errors.is_empty() {
        vs_error!(SOURCE, "[{}] device reported errors: {:?}", name, mock.errors);
    }
    vs_info!(
        SOURCE,
        "[{}] {} draws recorded, {} buffers still alive",
        name,
        mock.draws.len(),
        mock.live_buffer_count()
    );
    Ok(())
}

fn main() -> Result<()> {
    let range_only = Capabilities { map_buffer_range: true, ..Capabilities::basic() };

    run_tier("buffer objects", Capabilities::basic(), UploadMode::Auto)?;
    run_tier("range mapping", range_only, UploadMode::Auto)?;
    run_tier("persistent orphan", Capabilities::all(), UploadMode::PersistentOrphan)?;
    run_tier("persistent fenced", Capabilities::all(), UploadMode::PersistentFenced)?;
    run_tier("persistent unsynchronized", Capabilities::all(), UploadMode::PersistentUnsynchronized)?;
    Ok(())
}
