/// Array-state cache - remembers which vertex layout the device is configured for

use crate::graphics_device::{BufferId, GraphicsDevice, VertexAttribute};
use crate::vertex::VertexLayout;

/// Currently configured vertex array
///
/// Attribute pointers capture the buffer bound when they are set, so the
/// cache key is the layout plus the owning buffer. Reconfiguring is skipped
/// when both match.
#[derive(Debug, Default)]
pub struct ArrayStateCache {
    layout: Option<VertexLayout>,
    owner: Option<BufferId>,
    arrays_enabled: bool,
    tex_channels: usize,
}

impl ArrayStateCache {
    /// Create an empty cache (nothing configured)
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout currently configured, if any
    pub fn layout(&self) -> Option<VertexLayout> {
        self.layout
    }

    /// Buffer the configured attribute pointers refer to, if any
    pub fn owner(&self) -> Option<BufferId> {
        self.owner
    }

    /// Number of texture coordinate channels currently enabled
    pub fn tex_channels(&self) -> usize {
        self.tex_channels
    }

    /// Switch the cached vertex array to `layout` owned by `owner`
    ///
    /// Returns `false` when the pair already matches (nothing to do).
    /// Otherwise enables the always-on channels on first use, enables or
    /// disables texture coordinate channels to match `tex_count`, records
    /// the new pair and returns `true`; the caller must then point every
    /// attribute at the new buffer.
    pub fn switch_vertex_array(
        &mut self,
        device: &mut dyn GraphicsDevice,
        layout: VertexLayout,
        owner: BufferId,
        tex_count: usize,
    ) -> bool {
        if self.layout == Some(layout) && self.owner == Some(owner) {
            return false;
        }

        if !self.arrays_enabled {
            device.set_attribute_enabled(VertexAttribute::Position, true);
            device.set_attribute_enabled(VertexAttribute::Color, true);
            self.arrays_enabled = true;
        }

        for channel in tex_count..self.tex_channels {
            device.set_attribute_enabled(VertexAttribute::TexCoord(channel as u32), false);
        }
        for channel in self.tex_channels..tex_count {
            device.set_attribute_enabled(VertexAttribute::TexCoord(channel as u32), true);
        }
        self.tex_channels = tex_count;

        self.layout = Some(layout);
        self.owner = Some(owner);
        true
    }

    /// Make sure the device attributes describe `layout` inside `owner`
    ///
    /// `owner` must be bound. Returns whether anything was reconfigured.
    pub fn bind(&mut self, device: &mut dyn GraphicsDevice, layout: VertexLayout, owner: BufferId) -> bool {
        if !self.switch_vertex_array(device, layout, owner, layout.tex_coord_count()) {
            return false;
        }

        let format = layout.format();
        let stride = format.stride;

        device.attribute_pointer(
            VertexAttribute::Position,
            format.position_components,
            stride,
            format.position_offset,
        );

        match format.fog_offset {
            Some(offset) => {
                device.set_attribute_enabled(VertexAttribute::FogDepth, true);
                device.attribute_pointer(VertexAttribute::FogDepth, 1, stride, offset);
            }
            None => device.set_attribute_enabled(VertexAttribute::FogDepth, false),
        }

        device.attribute_pointer(VertexAttribute::Color, 4, stride, format.color_offset);

        for (channel, &offset) in format.tex_coord_offsets.iter().enumerate() {
            device.attribute_pointer(VertexAttribute::TexCoord(channel as u32), 2, stride, offset);
        }

        true
    }

    /// Forget the configured array if it refers to `owner`
    ///
    /// Called when `owner` is deleted: its name can be handed to an
    /// unrelated buffer that must not be mistaken for it.
    pub fn clear(&mut self, owner: BufferId) {
        if self.owner == Some(owner) {
            self.layout = None;
            self.owner = None;
        }
    }
}

#[cfg(test)]
#[path = "array_state_tests.rs"]
mod tests;
