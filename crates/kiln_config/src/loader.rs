//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Loads and validates a `kiln.toml` configuration from a project directory.
///
/// Reads `<project_dir>/kiln.toml`, parses it, and validates required fields.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join("kiln.toml");
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `kiln.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.source_root.as_os_str().is_empty() {
        return Err(ConfigError::MissingField("project.source_root".to_string()));
    }
    for (i, output) in config.outputs.iter().enumerate() {
        if output.gpu_families.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "output[{i}].gpu_families"
            )));
        }
    }
    if !config.atlas.max_dimension.is_power_of_two() {
        return Err(ConfigError::InvalidValue {
            field: "atlas.max_dimension".to_string(),
            reason: "must be a power of two".to_string(),
        });
    }
    if config.atlas.max_dimension < 8 {
        return Err(ConfigError::InvalidValue {
            field: "atlas.max_dimension".to_string(),
            reason: "must be at least 8".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "demo"
version = "0.1.0"
source_root = "assets"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.project.version, "0.1.0");
        assert!(config.outputs.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
version = "0.1.0"
source_root = "assets"

[[output]]
dir = "out/pc"
gpu_families = ["origin"]

[[output]]
dir = "out/android"
gpu_families = ["mali", "adreno"]
quality = "high"
hd_split = true

[build]
optimize = true

[atlas]
max_dimension = 1024
margin = 4
square_only = true

[tools]
encoder = "/opt/gpu-tools/ktexc"

[cache]
store = "/mnt/buildcache"
connect_timeout_ms = 500
description = "nightly farm"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.outputs[1].gpu_families, vec!["mali", "adreno"]);
        assert!(config.outputs[1].hd_split);
        assert!(config.build.optimize);
        assert_eq!(config.atlas.max_dimension, 1024);
        assert_eq!(config.atlas.margin, 4);
        assert!(config.atlas.square_only);
        assert_eq!(config.cache.unwrap().connect_timeout_ms, 500);
    }

    #[test]
    fn empty_name_rejected() {
        let toml = r#"
[project]
name = ""
version = "0.1.0"
source_root = "assets"
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::MissingField(f)) if f == "project.name"
        ));
    }

    #[test]
    fn empty_gpu_families_rejected() {
        let toml = r#"
[project]
name = "demo"
version = "0.1.0"
source_root = "assets"

[[output]]
dir = "out/pc"
gpu_families = []
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::MissingField(f)) if f == "output[0].gpu_families"
        ));
    }

    #[test]
    fn non_pow2_max_dimension_rejected() {
        let toml = r#"
[project]
name = "demo"
version = "0.1.0"
source_root = "assets"

[atlas]
max_dimension = 1000
"#;
        assert!(matches!(
            load_config_from_str(toml),
            Err(ConfigError::InvalidValue { field, .. }) if field == "atlas.max_dimension"
        ));
    }

    #[test]
    fn invalid_toml_rejected() {
        assert!(matches!(
            load_config_from_str("not toml {{{"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("kiln.toml"),
            r#"
[project]
name = "demo"
version = "0.1.0"
source_root = "assets"
"#,
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "demo");
    }
}
