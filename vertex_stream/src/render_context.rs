/// Render context - owns the device and the state every vertex buffer shares
///
/// Architecture:
/// - ContextState: device, array-state cache, index scratch, bind cache, stats
///   (behind a RefCell, single thread)
/// - Capabilities: queried once when the context is created
/// - BufferConfig: upload mode and ring multiplier used by the buffer factory
///
/// Buffers hold an `Rc<RenderContext>` and borrow the state for the
/// duration of one operation.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use crate::buffer::{
    BufferVariant, DiscardStrategy, FencedDiscard, OrphanDiscard, PersistentBuffer,
    StreamingBuffer, UnsynchronizedDiscard, VertexBuffer, MAX_RING_SLOTS,
};
use crate::error::{Error, Result};
use crate::graphics_device::{BufferId, BufferUsage, Capabilities, GraphicsDevice};
use crate::state::{ArrayStateCache, IndexScratch};
use crate::vertex::Vertex;
use crate::{vs_bail, vs_debug, vs_error, vs_info};

const SOURCE: &str = "vstream::RenderContext";

// ===== UPLOAD MODE =====

/// How dynamic vertex data reaches the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadMode {
    /// Pick the best path the capabilities allow
    #[default]
    Auto,
    /// Single buffer, `buffer_sub_data` writes, whole-buffer map for locks
    SubData,
    /// Single buffer, range-mapped locks
    MapRange,
    /// Persistent ring, no synchronization on discard
    PersistentUnsynchronized,
    /// Persistent buffer, orphaned on discard
    PersistentOrphan,
    /// Persistent ring, fenced slots
    PersistentFenced,
}

impl UploadMode {
    fn is_persistent(&self) -> bool {
        matches!(
            self,
            UploadMode::PersistentUnsynchronized
                | UploadMode::PersistentOrphan
                | UploadMode::PersistentFenced
        )
    }
}

// ===== BUFFER CONFIG =====

/// Buffer factory configuration
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Upload path for Dynamic and Stream buffers (Static buffers always stream)
    pub upload_mode: UploadMode,

    /// Ring multiplier used when a descriptor does not name one
    pub default_multiplier: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            upload_mode: UploadMode::Auto,
            default_multiplier: 3,
        }
    }
}

// ===== VERTEX BUFFER DESC =====

/// Descriptor for `RenderContext::create_vertex_buffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferDesc {
    /// Vertex records per slot
    pub capacity: usize,
    pub usage: BufferUsage,
    /// Ring slots for persistent buffers (`None` = config default)
    pub multiplier: Option<usize>,
}

impl VertexBufferDesc {
    /// Descriptor with the configured default multiplier
    pub fn new(capacity: usize, usage: BufferUsage) -> Self {
        Self { capacity, usage, multiplier: None }
    }

    /// Same descriptor with an explicit ring multiplier
    pub fn with_multiplier(mut self, multiplier: usize) -> Self {
        self.multiplier = Some(multiplier);
        self
    }
}

// ===== CONTEXT STATS =====

/// Counters accumulated by every buffer of a context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Non-indexed draws
    pub draw_calls: u64,
    /// Indexed draws
    pub indexed_draw_calls: u64,
    /// Indexed draws whose indices were rebased on the CPU
    pub rebased_draws: u64,
    /// `finish` calls caused by writes without a sync hint
    pub blocking_flushes: u64,
    /// Storage replaced under a live buffer name
    pub orphaned_uploads: u64,
    /// Ring discards that had to wait on a fence
    pub fence_waits: u64,
}

// ===== CONTEXT STATE =====

/// Mutable state shared by the buffers of one context
pub(crate) struct ContextState {
    pub(crate) device: Box<dyn GraphicsDevice>,
    pub(crate) array_state: ArrayStateCache,
    pub(crate) index_scratch: IndexScratch,
    pub(crate) stats: ContextStats,
    bound_buffer: Option<BufferId>,
}

impl ContextState {
    /// Bind `buffer`, skipping the device call if it is already bound
    pub(crate) fn bind_buffer(&mut self, buffer: BufferId) {
        if self.bound_buffer != Some(buffer) {
            self.device.bind_buffer(Some(buffer));
            self.bound_buffer = Some(buffer);
        }
    }

    /// Unbind `buffer` if it is the bound one
    pub(crate) fn unbind_buffer(&mut self, buffer: BufferId) {
        if self.bound_buffer == Some(buffer) {
            self.device.bind_buffer(None);
            self.bound_buffer = None;
        }
    }
}

// ===== RENDER CONTEXT =====

/// Owner of the graphics device and factory for vertex buffers
pub struct RenderContext {
    state: RefCell<ContextState>,
    capabilities: Capabilities,
    config: BufferConfig,
}

impl RenderContext {
    /// Create a context around `device`
    ///
    /// Capabilities are queried here once and never again.
    pub fn new(device: Box<dyn GraphicsDevice>, config: BufferConfig) -> Result<Rc<Self>> {
        if config.default_multiplier == 0 || config.default_multiplier > MAX_RING_SLOTS {
            return Err(Error::InitializationFailed(format!(
                "default ring multiplier must be in 1..={}, got {}",
                MAX_RING_SLOTS, config.default_multiplier
            )));
        }

        let capabilities = device.capabilities();
        vs_info!(SOURCE, "Render context created ({:?}, {:?})", capabilities, config.upload_mode);

        Ok(Rc::new(Self {
            state: RefCell::new(ContextState {
                device,
                array_state: ArrayStateCache::new(),
                index_scratch: IndexScratch::new(),
                stats: ContextStats::default(),
                bound_buffer: None,
            }),
            capabilities,
            config,
        }))
    }

    /// Capabilities queried at creation
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Buffer configuration
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Snapshot of the accumulated counters
    pub fn stats(&self) -> ContextStats {
        match self.state.try_borrow() {
            Ok(state) => state.stats,
            Err(_) => {
                vs_error!(SOURCE, "Context state is busy, stats unavailable");
                ContextStats::default()
            }
        }
    }

    /// Zero all counters
    pub fn reset_stats(&self) {
        match self.state.try_borrow_mut() {
            Ok(mut state) => state.stats = ContextStats::default(),
            Err(_) => vs_error!(SOURCE, "Context state is busy, stats not reset"),
        }
    }

    pub(crate) fn state(&self) -> Result<RefMut<'_, ContextState>> {
        match self.state.try_borrow_mut() {
            Ok(state) => Ok(state),
            Err(_) => vs_bail!(SOURCE, "Context state is already borrowed"),
        }
    }

    /// Buffer variant `create_vertex_buffer` would build for `desc`
    pub fn select_variant(&self, desc: &VertexBufferDesc) -> Result<BufferVariant> {
        // ========== VALIDATION ==========
        if desc.capacity == 0 {
            return Err(Error::InvalidResource("vertex buffer capacity must be non-zero".to_string()));
        }
        if desc.multiplier == Some(0) {
            return Err(Error::InvalidResource("ring multiplier must be non-zero".to_string()));
        }
        let multiplier = desc.multiplier.unwrap_or(self.config.default_multiplier);

        let caps = self.capabilities;
        let streaming = if caps.map_buffer_range {
            BufferVariant::MapRange
        } else {
            BufferVariant::SubData
        };

        // ========== STATIC ==========
        if desc.usage == BufferUsage::Static {
            return Ok(match self.config.upload_mode {
                UploadMode::SubData => BufferVariant::SubData,
                _ => streaming,
            });
        }

        // ========== DYNAMIC / STREAM ==========
        let mode = self.config.upload_mode;
        if mode.is_persistent() && !caps.buffer_storage {
            vs_info!(
                SOURCE,
                "{:?} needs persistent buffer storage, falling back to {:?}",
                mode,
                streaming
            );
            return Ok(streaming);
        }

        let variant = match mode {
            UploadMode::Auto if caps.buffer_storage && multiplier > 1 => {
                BufferVariant::PersistentFenced { multiplier }
            }
            UploadMode::Auto if caps.buffer_storage => BufferVariant::PersistentOrphan,
            UploadMode::Auto => streaming,
            UploadMode::SubData => BufferVariant::SubData,
            UploadMode::MapRange if caps.map_buffer_range => BufferVariant::MapRange,
            UploadMode::MapRange => {
                vs_info!(SOURCE, "MapRange needs range mapping, falling back to SubData");
                BufferVariant::SubData
            }
            UploadMode::PersistentUnsynchronized => BufferVariant::PersistentUnsynchronized { multiplier },
            UploadMode::PersistentOrphan => BufferVariant::PersistentOrphan,
            UploadMode::PersistentFenced => BufferVariant::PersistentFenced { multiplier },
        };

        if variant.multiplier() > MAX_RING_SLOTS {
            return Err(Error::InvalidResource(format!(
                "ring multiplier {} exceeds the {} slot limit",
                multiplier, MAX_RING_SLOTS
            )));
        }

        Ok(variant)
    }

    /// Create a vertex buffer holding `desc.capacity` records of `V`
    pub fn create_vertex_buffer<V: Vertex + 'static>(
        self: &Rc<Self>,
        desc: VertexBufferDesc,
    ) -> Result<Box<dyn VertexBuffer<V>>> {
        let variant = self.select_variant(&desc)?;
        vs_debug!(
            SOURCE,
            "Creating {:?} vertex buffer: {} x {:?}, {:?}",
            variant,
            desc.capacity,
            V::LAYOUT,
            desc.usage
        );

        let context = Rc::clone(self);
        let buffer: Box<dyn VertexBuffer<V>> = match variant {
            BufferVariant::SubData => {
                Box::new(StreamingBuffer::<V>::new(context, desc.capacity, desc.usage, false)?)
            }
            BufferVariant::MapRange => {
                Box::new(StreamingBuffer::<V>::new(context, desc.capacity, desc.usage, true)?)
            }
            BufferVariant::PersistentUnsynchronized { multiplier } => {
                Self::persistent::<V>(context, desc, multiplier, Box::new(UnsynchronizedDiscard))?
            }
            BufferVariant::PersistentOrphan => {
                Self::persistent::<V>(context, desc, 1, Box::new(OrphanDiscard))?
            }
            BufferVariant::PersistentFenced { multiplier } => {
                Self::persistent::<V>(context, desc, multiplier, Box::new(FencedDiscard::new(multiplier)))?
            }
        };
        Ok(buffer)
    }

    fn persistent<V: Vertex + 'static>(
        context: Rc<Self>,
        desc: VertexBufferDesc,
        multiplier: usize,
        strategy: Box<dyn DiscardStrategy>,
    ) -> Result<Box<dyn VertexBuffer<V>>> {
        let buffer = PersistentBuffer::<V>::new(context, desc.capacity, desc.usage, multiplier, strategy)?;
        Ok(Box::new(buffer))
    }
}

#[cfg(test)]
#[path = "render_context_tests.rs"]
mod tests;
