//! The `.ktex` compressed-texture container.
//!
//! A `.ktex` file frames an encoded mip chain: a 4-byte little-endian header
//! length, a bincode header (magic, format version, pixel format,
//! dimensions, payload checksum), then each mip as a length-prefixed blob.
//! HD splitting decomposes one container into several so a constrained
//! device can skip loading the highest-detail files.

use std::path::{Path, PathBuf};

use kiln_common::Digest;
use serde::{Deserialize, Serialize};

use crate::error::TextureError;
use crate::gpu::PixelFormat;

/// Magic bytes identifying a Kiln compressed-texture container.
const KTEX_MAGIC: [u8; 4] = *b"KTEX";

/// Current container format version. Increment on breaking changes.
const KTEX_FORMAT_VERSION: u32 = 1;

/// Minimum width/height at which block compression is attempted.
pub const MIN_COMPRESS_DIM: u32 = 16;

/// Header prepended to every `.ktex` container for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KtexHeader {
    magic: [u8; 4],
    format_version: u32,
    pixel_format: PixelFormat,
    width: u32,
    height: u32,
    mip_count: u32,
    checksum: Digest,
}

/// An encoded texture: target pixel format, top-level dimensions, and one
/// blob per mip level, largest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedTexture {
    /// The GPU-native pixel format of every mip blob.
    pub pixel_format: PixelFormat,
    /// Width of mip 0 in pixels.
    pub width: u32,
    /// Height of mip 0 in pixels.
    pub height: u32,
    /// Encoded mip payloads, largest first.
    pub mips: Vec<Vec<u8>>,
}

impl CompressedTexture {
    /// Serializes the container to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, TextureError> {
        let mut payload = Vec::new();
        for mip in &self.mips {
            payload.extend_from_slice(&(mip.len() as u32).to_le_bytes());
            payload.extend_from_slice(mip);
        }

        let header = KtexHeader {
            magic: KTEX_MAGIC,
            format_version: KTEX_FORMAT_VERSION,
            pixel_format: self.pixel_format,
            width: self.width,
            height: self.height,
            mip_count: self.mips.len() as u32,
            checksum: Digest::from_bytes(&payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| TextureError::InvalidContainer {
                path: PathBuf::new(),
                reason: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Writes the container to a file.
    pub fn write(&self, path: &Path) -> Result<(), TextureError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TextureError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let raw = self.encode()?;
        std::fs::write(path, raw).map_err(|e| TextureError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads and validates a container from a file.
    pub fn read(path: &Path) -> Result<Self, TextureError> {
        let raw = std::fs::read(path).map_err(|e| TextureError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::decode(&raw).ok_or_else(|| TextureError::InvalidContainer {
            path: path.to_path_buf(),
            reason: "header or checksum validation failed".to_string(),
        })
    }

    /// Decodes a container from bytes, returning `None` on any validation
    /// failure.
    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }
        let header: KtexHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;
        if header.magic != KTEX_MAGIC || header.format_version != KTEX_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if Digest::from_bytes(payload) != header.checksum {
            return None;
        }

        let mut mips = Vec::with_capacity(header.mip_count as usize);
        let mut rest = payload;
        for _ in 0..header.mip_count {
            if rest.len() < 4 {
                return None;
            }
            let len = u32::from_le_bytes(rest[..4].try_into().ok()?) as usize;
            rest = &rest[4..];
            if rest.len() < len {
                return None;
            }
            mips.push(rest[..len].to_vec());
            rest = &rest[len..];
        }
        if !rest.is_empty() {
            return None;
        }

        Some(Self {
            pixel_format: header.pixel_format,
            width: header.width,
            height: header.height,
            mips,
        })
    }

    /// Splits the mip chain for HD loading.
    ///
    /// The first `top_levels` mips become one single-mip container each; the
    /// remaining mips stay together in one final container. A device that
    /// skips the leading files still gets a complete (lower-resolution)
    /// chain from the last one. Returns the containers in order, highest
    /// detail first. If the chain has `top_levels` or fewer mips the whole
    /// chain comes back as a single container.
    pub fn split_hd(&self, top_levels: usize) -> Vec<CompressedTexture> {
        if self.mips.len() <= top_levels || top_levels == 0 {
            return vec![self.clone()];
        }

        let mut parts = Vec::with_capacity(top_levels + 1);
        let mut width = self.width;
        let mut height = self.height;
        for mip in &self.mips[..top_levels] {
            parts.push(CompressedTexture {
                pixel_format: self.pixel_format,
                width,
                height,
                mips: vec![mip.clone()],
            });
            width = (width / 2).max(1);
            height = (height / 2).max(1);
        }
        parts.push(CompressedTexture {
            pixel_format: self.pixel_format,
            width,
            height,
            mips: self.mips[top_levels..].to_vec(),
        });
        parts
    }
}

/// Returns the artifact file names for an HD-split texture with the given
/// stem: `<stem>.0.ktex`, `<stem>.1.ktex`, ...
pub fn split_file_name(stem: &str, index: usize) -> String {
    format!("{stem}.{index}.ktex")
}
