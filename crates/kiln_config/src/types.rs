//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level project configuration parsed from `kiln.toml`.
///
/// Contains project metadata, output target definitions, build options,
/// atlas packing parameters, external tool paths, and the optional
/// build-cache store settings.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, source root).
    pub project: ProjectMeta,
    /// Output targets; each gets a full mirror of the exported tree.
    #[serde(default, rename = "output")]
    pub outputs: Vec<OutputTarget>,
    /// Build settings (optimize flag, exporter version pinning).
    #[serde(default)]
    pub build: BuildConfig,
    /// Atlas packing settings.
    #[serde(default)]
    pub atlas: AtlasConfig,
    /// External tool paths.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Build-cache store settings; absent means no cache is attached.
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

/// Core project metadata required in every `kiln.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// Directory containing designer-authored source assets, relative to the
    /// project directory.
    pub source_root: PathBuf,
}

/// One output target: a destination directory plus the GPU families to
/// produce for it.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputTarget {
    /// Destination directory for this target's artifacts.
    pub dir: PathBuf,
    /// GPU family names (e.g. `"origin"`, `"mali"`, `"powervr"`).
    pub gpu_families: Vec<String>,
    /// Compression quality for this target.
    #[serde(default)]
    pub quality: Quality,
    /// Whether high-detail mip levels are split into separate files.
    #[serde(default)]
    pub hd_split: bool,
}

/// Compression quality requested from the external encoder.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Fastest encode, lowest quality.
    Fast,
    /// Balanced encode (default).
    #[default]
    Normal,
    /// Slowest encode, highest quality.
    High,
}

impl Quality {
    /// Returns the canonical lowercase name, used in parameter digests and
    /// encoder command lines.
    pub fn name(self) -> &'static str {
        match self {
            Quality::Fast => "fast",
            Quality::Normal => "normal",
            Quality::High => "high",
        }
    }
}

/// Build configuration controlling export behavior.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// Whether textures are optimized (atlas-packed) on export.
    #[serde(default)]
    pub optimize: bool,
    /// Forces a rebuild of everything regardless of digests.
    #[serde(default)]
    pub force: bool,
}

/// Atlas packing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AtlasConfig {
    /// Maximum atlas page dimension in pixels.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    /// Margin in pixels added around every packed frame.
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Restrict candidate resolutions to squares.
    #[serde(default)]
    pub square_only: bool,
}

fn default_max_dimension() -> u32 {
    2048
}

fn default_margin() -> u32 {
    2
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_dimension: default_max_dimension(),
            margin: default_margin(),
            square_only: false,
        }
    }
}

/// External tool paths.
#[derive(Debug, Deserialize)]
pub struct ToolsConfig {
    /// Executable invoked for GPU-native block compression.
    #[serde(default = "default_encoder")]
    pub encoder: PathBuf,
}

fn default_encoder() -> PathBuf {
    PathBuf::from("ktexc")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            encoder: default_encoder(),
        }
    }
}

/// Build-cache store settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Root of the shared cache store (typically a network mount).
    pub store: PathBuf,
    /// Timeout for the initial store probe, in milliseconds. Exceeding it
    /// disables caching for the remainder of the run.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Free-text description recorded with stored bundles.
    #[serde(default)]
    pub description: String,
}

fn default_connect_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn quality_all_variants() {
        for (input, expected) in [
            ("fast", Quality::Fast),
            ("normal", Quality::Normal),
            ("high", Quality::High),
        ] {
            let toml = format!(
                r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"

[[output]]
dir = "out/android"
gpu_families = ["mali"]
quality = "{input}"
"#
            );
            let config = load_config_from_str(&toml).unwrap();
            assert_eq!(config.outputs[0].quality, expected);
        }
    }

    #[test]
    fn quality_names() {
        assert_eq!(Quality::Fast.name(), "fast");
        assert_eq!(Quality::Normal.name(), "normal");
        assert_eq!(Quality::High.name(), "high");
    }

    #[test]
    fn atlas_defaults() {
        let toml = r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.atlas.max_dimension, 2048);
        assert_eq!(config.atlas.margin, 2);
        assert!(!config.atlas.square_only);
    }

    #[test]
    fn output_defaults() {
        let toml = r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"

[[output]]
dir = "out/pc"
gpu_families = ["origin"]
"#;
        let config = load_config_from_str(toml).unwrap();
        let out = &config.outputs[0];
        assert_eq!(out.quality, Quality::Normal);
        assert!(!out.hd_split);
    }

    #[test]
    fn cache_section_optional() {
        let toml = r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.cache.is_none());
    }

    #[test]
    fn cache_section_with_defaults() {
        let toml = r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"

[cache]
store = "/mnt/buildcache"
"#;
        let config = load_config_from_str(toml).unwrap();
        let cache = config.cache.unwrap();
        assert_eq!(cache.store, PathBuf::from("/mnt/buildcache"));
        assert_eq!(cache.connect_timeout_ms, 2000);
        assert!(cache.description.is_empty());
    }

    #[test]
    fn tools_default_encoder() {
        let toml = r#"
[project]
name = "test"
version = "0.1.0"
source_root = "assets"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.tools.encoder, PathBuf::from("ktexc"));
    }
}
