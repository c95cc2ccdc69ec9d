//! Per-texture compression descriptors.
//!
//! A descriptor is a TOML sidecar file (`<texture>.tex`) declaring, per GPU
//! family, the target pixel format, plus the HD-split flag and an optional
//! quality override. A texture without a descriptor can still ship for the
//! `origin` family; any device family then fails format resolution.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use kiln_config::Quality;

use crate::error::TextureError;
use crate::gpu::{GpuFamily, PixelFormat};

/// A texture's compression settings, parsed from its `.tex` sidecar.
#[derive(Debug, Clone, Default)]
pub struct CompressionDescriptor {
    formats: BTreeMap<GpuFamily, PixelFormat>,
    /// Whether high-detail mips are split into separately loadable files.
    pub hd_split: bool,
    /// Quality override; falls back to the output target's quality when absent.
    pub quality: Option<Quality>,
}

/// The raw TOML shape of a descriptor file.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    formats: BTreeMap<String, String>,
    #[serde(default)]
    hd_split: bool,
    #[serde(default)]
    quality: Option<Quality>,
}

impl CompressionDescriptor {
    /// Loads the descriptor sidecar for a texture, if one exists.
    ///
    /// `texture_path` is the texture file itself; the sidecar lives next to
    /// it with `.tex` appended (`rock.png` → `rock.png.tex`). A missing
    /// sidecar yields the default descriptor.
    pub fn load_for(texture_path: &Path) -> Result<Self, TextureError> {
        let mut sidecar = texture_path.as_os_str().to_owned();
        sidecar.push(".tex");
        let sidecar = Path::new(&sidecar);
        if !sidecar.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(sidecar).map_err(|e| TextureError::Io {
            path: sidecar.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, sidecar)
    }

    /// Parses a descriptor from TOML text.
    pub fn parse(content: &str, path: &Path) -> Result<Self, TextureError> {
        let raw: RawDescriptor =
            toml::from_str(content).map_err(|e| TextureError::DescriptorParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut formats = BTreeMap::new();
        for (family_name, format_name) in &raw.formats {
            let family =
                GpuFamily::from_str(family_name).map_err(|_| TextureError::UnknownName {
                    path: path.to_path_buf(),
                    name: family_name.clone(),
                })?;
            let format =
                PixelFormat::from_str(format_name).map_err(|_| TextureError::UnknownName {
                    path: path.to_path_buf(),
                    name: format_name.clone(),
                })?;
            formats.insert(family, format);
        }

        Ok(Self {
            formats,
            hd_split: raw.hd_split,
            quality: raw.quality,
        })
    }

    /// Builds a descriptor programmatically (used by tests and the atlas path).
    pub fn with_format(mut self, family: GpuFamily, format: PixelFormat) -> Self {
        self.formats.insert(family, format);
        self
    }

    /// Resolves the configured target pixel format for a family.
    pub fn format_for(&self, family: GpuFamily) -> Option<PixelFormat> {
        self.formats.get(&family).copied()
    }
}
