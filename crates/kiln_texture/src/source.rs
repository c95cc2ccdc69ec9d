//! Source texture inspection.
//!
//! The compressor never needs full pixel data for validation, only the
//! on-disk container format and the dimensions of every face. PNG and TGA
//! dimensions come from the `image` crate; DDS and KTX carry them at fixed
//! header offsets and are probed directly.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::TextureError;

/// On-disk container format of a source texture.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SourceFormat {
    /// Portable Network Graphics.
    Png,
    /// Truevision TGA.
    Tga,
    /// DirectDraw Surface. Carries its own mip chain.
    Dds,
    /// Khronos KTX. Carries its own mip chain.
    Ktx,
}

impl SourceFormat {
    /// Detects the container format from a file extension.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "png" => Some(SourceFormat::Png),
            "tga" => Some(SourceFormat::Tga),
            "dds" => Some(SourceFormat::Dds),
            "ktx" => Some(SourceFormat::Ktx),
            _ => None,
        }
    }

    /// Returns `true` for containers whose native form carries a mip chain,
    /// which is what HD splitting of an uncompressed (`origin`) texture
    /// requires.
    pub fn supports_hd_split(self) -> bool {
        matches!(self, SourceFormat::Dds | SourceFormat::Ktx)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Png => write!(f, "png"),
            SourceFormat::Tga => write!(f, "tga"),
            SourceFormat::Dds => write!(f, "dds"),
            SourceFormat::Ktx => write!(f, "ktx"),
        }
    }
}

/// Dimensions of one face of a source texture.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct FaceInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A loaded source texture: its path, container format, and face dimensions.
///
/// Plain 2D textures have one face; cube maps have six.
#[derive(Clone, Debug)]
pub struct TextureSource {
    /// Absolute path of the source file.
    pub path: PathBuf,
    /// The on-disk container format.
    pub format: SourceFormat,
    /// Per-face dimensions.
    pub faces: Vec<FaceInfo>,
}

impl TextureSource {
    /// Inspects a source texture file.
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let format = SourceFormat::from_extension(path).ok_or_else(|| TextureError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "unrecognized texture extension",
            ),
        })?;

        let (width, height) = match format {
            SourceFormat::Png | SourceFormat::Tga => image::image_dimensions(path)
                .map_err(|e| TextureError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
                })?,
            SourceFormat::Dds => probe_dds(path)?,
            SourceFormat::Ktx => probe_ktx(path)?,
        };

        Ok(Self {
            path: path.to_path_buf(),
            format,
            faces: vec![FaceInfo { width, height }],
        })
    }

    /// Builds a source from known parts. Used for cube maps assembled by the
    /// caller and by tests that don't want real image files.
    pub fn from_parts(path: impl Into<PathBuf>, format: SourceFormat, faces: Vec<FaceInfo>) -> Self {
        Self {
            path: path.into(),
            format,
            faces,
        }
    }
}

/// Reads width/height from a DDS header (`dwHeight` at byte 12, `dwWidth`
/// at byte 16, little-endian, after the 4-byte magic).
fn probe_dds(path: &Path) -> Result<(u32, u32), TextureError> {
    let raw = std::fs::read(path).map_err(|e| TextureError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if raw.len() < 20 || &raw[..4] != b"DDS " {
        return Err(TextureError::InvalidContainer {
            path: path.to_path_buf(),
            reason: "missing DDS magic".to_string(),
        });
    }
    let height = u32::from_le_bytes(raw[12..16].try_into().unwrap());
    let width = u32::from_le_bytes(raw[16..20].try_into().unwrap());
    Ok((width, height))
}

/// Reads width/height from a KTX1 header (`pixelWidth` at byte 36,
/// `pixelHeight` at byte 40, after the 12-byte identifier).
fn probe_ktx(path: &Path) -> Result<(u32, u32), TextureError> {
    const KTX_IDENTIFIER: [u8; 12] = [
        0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A,
    ];
    let raw = std::fs::read(path).map_err(|e| TextureError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    if raw.len() < 44 || raw[..12] != KTX_IDENTIFIER {
        return Err(TextureError::InvalidContainer {
            path: path.to_path_buf(),
            reason: "missing KTX identifier".to_string(),
        });
    }
    let width = u32::from_le_bytes(raw[36..40].try_into().unwrap());
    let height = u32::from_le_bytes(raw[40..44].try_into().unwrap());
    Ok((width, height))
}
