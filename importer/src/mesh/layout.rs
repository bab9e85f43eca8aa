//! Vertex layout description: semantics, component types and element packing.

/// Engine vertex attribute semantics.
///
/// Declaration order is the canonical element order inside an interleaved
/// vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexSemantic {
    Position,
    Normal,
    Tangent,
    Color,
    BlendIndices,
    BlendWeight,
    TexCoord0,
    TexCoord1,
    TexCoord2,
    TexCoord3,
    TexCoord4,
    TexCoord5,
    TexCoord6,
    TexCoord7,
}

impl VertexSemantic {
    /// Map a glTF attribute name to an engine semantic.
    ///
    /// Unknown attributes (`COLOR_1`, `JOINTS_1`, `_CUSTOM`, ...) return `None`
    /// and are skipped by the importer.
    pub fn from_gltf(name: &str) -> Option<Self> {
        Some(match name {
            "POSITION" => Self::Position,
            "NORMAL" => Self::Normal,
            "TANGENT" => Self::Tangent,
            "COLOR_0" => Self::Color,
            "JOINTS_0" => Self::BlendIndices,
            "WEIGHTS_0" => Self::BlendWeight,
            "TEXCOORD_0" => Self::TexCoord0,
            "TEXCOORD_1" => Self::TexCoord1,
            "TEXCOORD_2" => Self::TexCoord2,
            "TEXCOORD_3" => Self::TexCoord3,
            "TEXCOORD_4" => Self::TexCoord4,
            "TEXCOORD_5" => Self::TexCoord5,
            "TEXCOORD_6" => Self::TexCoord6,
            "TEXCOORD_7" => Self::TexCoord7,
            _ => return None,
        })
    }

    /// Short name used in cache keys and debug output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::Color => "COLOR",
            Self::BlendIndices => "BLENDINDICES",
            Self::BlendWeight => "BLENDWEIGHT",
            Self::TexCoord0 => "TEXCOORD0",
            Self::TexCoord1 => "TEXCOORD1",
            Self::TexCoord2 => "TEXCOORD2",
            Self::TexCoord3 => "TEXCOORD3",
            Self::TexCoord4 => "TEXCOORD4",
            Self::TexCoord5 => "TEXCOORD5",
            Self::TexCoord6 => "TEXCOORD6",
            Self::TexCoord7 => "TEXCOORD7",
        }
    }

    /// Whether this is one of the texture coordinate channels.
    pub fn is_tex_coord(&self) -> bool {
        *self >= Self::TexCoord0
    }
}

/// Numeric storage type of a vertex or accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
}

impl ComponentType {
    /// Map a glTF `componentType` code (5120–5126).
    pub fn from_gltf(code: u32) -> Option<Self> {
        Some(match code {
            5120 => Self::I8,
            5121 => Self::U8,
            5122 => Self::I16,
            5123 => Self::U16,
            5124 => Self::I32,
            5125 => Self::U32,
            5126 => Self::F32,
            _ => return None,
        })
    }

    /// Size of one component in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
        }
    }
}

/// One attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Attribute semantic.
    pub semantic: VertexSemantic,
    /// Number of components (1–4).
    pub components: u32,
    /// Component storage type.
    pub data_type: ComponentType,
    /// Integer components are normalized to [0, 1] / [-1, 1] when read.
    pub normalize: bool,
    /// Byte offset within the vertex.
    pub offset: u32,
    /// Unpadded byte size (`components * data_type.size()`).
    pub size: u32,
}

/// Description of an element before offsets are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementDesc {
    /// Attribute semantic.
    pub semantic: VertexSemantic,
    /// Number of components.
    pub components: u32,
    /// Component storage type.
    pub data_type: ComponentType,
    /// Normalized integer flag.
    pub normalize: bool,
}

/// Interleaved vertex layout.
///
/// Elements are laid out in the given order, each starting on a 4-byte
/// boundary so the whole vertex can be copied as 32-bit words.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    stride: u32,
}

impl VertexFormat {
    /// Build a layout from element descriptions.
    pub fn new(descs: &[ElementDesc]) -> Self {
        let mut offset = 0u32;
        let elements = descs
            .iter()
            .map(|d| {
                let size = d.components * d.data_type.size() as u32;
                let element = VertexElement {
                    semantic: d.semantic,
                    components: d.components,
                    data_type: d.data_type,
                    normalize: d.normalize,
                    offset,
                    size,
                };
                offset += size.next_multiple_of(4);
                element
            })
            .collect();
        Self {
            elements,
            stride: offset,
        }
    }

    /// All elements in layout order.
    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Find the element for a semantic.
    pub fn element(&self, semantic: VertexSemantic) -> Option<&VertexElement> {
        self.elements.iter().find(|e| e.semantic == semantic)
    }

    /// Whether the layout contains a semantic.
    pub fn has(&self, semantic: VertexSemantic) -> bool {
        self.element(semantic).is_some()
    }
}
