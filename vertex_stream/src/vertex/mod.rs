/// Vertex module - record types and attribute layouts

pub mod vertex;

pub use vertex::*;
