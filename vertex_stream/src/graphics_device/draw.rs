/// Draw submission types: primitives, index lists, vertex attributes

/// Primitive topology for draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineList,
    LineStrip,
}

/// Borrowed index list handed to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexData<'a> {
    /// 16-bit indices
    U16(&'a [u16]),
    /// 32-bit indices (used when rebased values overflow 16 bits)
    U32(&'a [u32]),
}

impl IndexData<'_> {
    /// Number of indices
    pub fn len(&self) -> usize {
        match self {
            IndexData::U16(indices) => indices.len(),
            IndexData::U32(indices) => indices.len(),
        }
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index at position `i`, widened to 32 bits
    pub fn get(&self, i: usize) -> Option<u32> {
        match self {
            IndexData::U16(indices) => indices.get(i).map(|&index| index as u32),
            IndexData::U32(indices) => indices.get(i).copied(),
        }
    }
}

/// Fixed-function vertex attribute channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position,
    Color,
    FogDepth,
    /// Texture coordinate channel (0-based)
    TexCoord(u32),
}
