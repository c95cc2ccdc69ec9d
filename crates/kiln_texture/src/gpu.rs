//! GPU families and target pixel formats.
//!
//! Both enums are deliberately closed tagged variants dispatched with
//! `match`; adding a family or format is a change here, not a new subclass
//! somewhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A target hardware/texture-compression profile.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuFamily {
    /// Uncompressed/source format; the original file ships untouched.
    Origin,
    /// ARM Mali GPUs (ETC family formats).
    Mali,
    /// Qualcomm Adreno GPUs (ATC).
    Adreno,
    /// Imagination PowerVR GPUs (PVRTC).
    PowerVr,
    /// NVIDIA Tegra GPUs (DXT).
    Tegra,
}

impl GpuFamily {
    /// Returns the canonical lowercase name used in configs, descriptors,
    /// parameter digests, and output subdirectories.
    pub fn name(self) -> &'static str {
        match self {
            GpuFamily::Origin => "origin",
            GpuFamily::Mali => "mali",
            GpuFamily::Adreno => "adreno",
            GpuFamily::PowerVr => "powervr",
            GpuFamily::Tegra => "tegra",
        }
    }

    /// Returns `true` for the pseudo-family that ships sources uncompressed.
    pub fn is_origin(self) -> bool {
        self == GpuFamily::Origin
    }
}

impl FromStr for GpuFamily {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "origin" => Ok(GpuFamily::Origin),
            "mali" => Ok(GpuFamily::Mali),
            "adreno" => Ok(GpuFamily::Adreno),
            "powervr" => Ok(GpuFamily::PowerVr),
            "tegra" => Ok(GpuFamily::Tegra),
            _ => Err(()),
        }
    }
}

impl fmt::Display for GpuFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A GPU-native target pixel format.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Uncompressed 8-bit RGBA.
    Rgba8,
    /// ETC1 (RGB, no alpha).
    Etc1,
    /// ETC2 (RGBA).
    Etc2,
    /// ATC (Adreno texture compression).
    Atc,
    /// PVRTC 2 bpp. Requires square input.
    Pvrtc2,
    /// PVRTC 4 bpp. Requires square input.
    Pvrtc4,
    /// DXT1/BC1 (RGB).
    Dxt1,
    /// DXT5/BC3 (RGBA).
    Dxt5,
}

impl PixelFormat {
    /// Returns the canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::Rgba8 => "rgba8",
            PixelFormat::Etc1 => "etc1",
            PixelFormat::Etc2 => "etc2",
            PixelFormat::Atc => "atc",
            PixelFormat::Pvrtc2 => "pvrtc2",
            PixelFormat::Pvrtc4 => "pvrtc4",
            PixelFormat::Dxt1 => "dxt1",
            PixelFormat::Dxt5 => "dxt5",
        }
    }

    /// Returns `true` for formats whose block layout demands square input.
    pub fn requires_square(self) -> bool {
        matches!(self, PixelFormat::Pvrtc2 | PixelFormat::Pvrtc4)
    }
}

impl FromStr for PixelFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "rgba8" => Ok(PixelFormat::Rgba8),
            "etc1" => Ok(PixelFormat::Etc1),
            "etc2" => Ok(PixelFormat::Etc2),
            "atc" => Ok(PixelFormat::Atc),
            "pvrtc2" => Ok(PixelFormat::Pvrtc2),
            "pvrtc4" => Ok(PixelFormat::Pvrtc4),
            "dxt1" => Ok(PixelFormat::Dxt1),
            "dxt5" => Ok(PixelFormat::Dxt5),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
