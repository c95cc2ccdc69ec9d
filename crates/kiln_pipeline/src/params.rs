//! Build parameters and their digest.
//!
//! The parameter digest is the secondary half of every cache key. It must be
//! byte-identical for identical declared parameters on any machine, so the
//! canonical string deliberately excludes anything machine-local: output
//! directories, absolute paths, hostnames, timestamps.

use kiln_common::Digest;
use kiln_config::ProjectConfig;
use kiln_digest::ChangeDetector;

/// The declared build parameters that shape every artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildParams {
    exporter_version: String,
    optimize: bool,
    /// One canonical entry per output target: sorted GPU families, quality,
    /// HD-split flag.
    targets: Vec<String>,
}

impl BuildParams {
    /// Derives the parameters from a project configuration.
    pub fn from_config(config: &ProjectConfig) -> Self {
        let mut targets: Vec<String> = config
            .outputs
            .iter()
            .map(|t| {
                let mut families = t.gpu_families.clone();
                families.sort_unstable();
                format!(
                    "gpus={};quality={};hd={}",
                    families.join("+"),
                    t.quality.name(),
                    t.hd_split
                )
            })
            .collect();
        targets.sort_unstable();
        Self {
            exporter_version: env!("CARGO_PKG_VERSION").to_string(),
            optimize: config.build.optimize,
            targets,
        }
    }

    /// The canonical parameter string fed to the digest.
    pub fn param_string(&self) -> String {
        format!(
            "exporter={};optimize={};targets=[{}]",
            self.exporter_version,
            self.optimize,
            self.targets.join("|")
        )
    }

    /// Digest of the canonical parameter string.
    pub fn digest(&self) -> Digest {
        ChangeDetector::digest_params(&self.param_string())
    }
}
