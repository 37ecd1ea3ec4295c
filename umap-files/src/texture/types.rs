use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    #[serde(rename = "PF_B8G8R8A8")]
    B8G8R8A8,
    #[serde(rename = "PF_R8G8B8A8")]
    R8G8B8A8,
    #[serde(rename = "PF_G8")]
    G8,
    #[serde(rename = "PF_DXT1")]
    DXT1,
    #[serde(rename = "PF_DXT3")]
    DXT3,
    #[serde(rename = "PF_DXT5")]
    DXT5,
    #[serde(rename = "PF_BC4")]
    BC4,
    #[serde(rename = "PF_BC5")]
    BC5,
    #[serde(rename = "PF_BC6H")]
    BC6H,
    #[serde(rename = "PF_BC7")]
    BC7,
    #[serde(rename = "PF_FloatRGBA")]
    FloatRGBA,
    #[serde(other)]
    Unknown,
}

impl PixelFormat {
    /// The four character code a .dds container would carry for this format, if there is a legacy one.
    pub fn dds_four_cc(&self) -> Option<[u8; 4]> {
        match self {
            PixelFormat::DXT1 => Some(*b"DXT1"),
            PixelFormat::DXT3 => Some(*b"DXT3"),
            PixelFormat::DXT5 => Some(*b"DXT5"),
            PixelFormat::BC4 => Some(*b"ATI1"),
            PixelFormat::BC5 => Some(*b"ATI2"),
            _ => None,
        }
    }

    /// Bytes per 4x4 block for block compressed formats.
    pub fn block_size(&self) -> Option<usize> {
        match self {
            PixelFormat::DXT1 | PixelFormat::BC4 => Some(8),
            PixelFormat::DXT3 | PixelFormat::DXT5 | PixelFormat::BC5 | PixelFormat::BC6H | PixelFormat::BC7 => {
                Some(16)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextureData {
    pub format: PixelFormat,
    #[serde(default)]
    pub mips: Vec<TextureMip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextureMip {
    pub width: u32,
    pub height: u32,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
}

fn to_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
