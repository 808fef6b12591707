/// Graphics device module - the buffer-object API and its software mock

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod draw;
pub mod fence;
pub mod mock_graphics_device;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use draw::*;
pub use fence::*;
pub use mock_graphics_device::{
    MockGraphicsDevice, MockDeviceState, DeviceCall, DrawRecord, AttributePointer,
};
