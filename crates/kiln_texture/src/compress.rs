//! The texture compressor.
//!
//! For every requested GPU family the compressor resolves the target pixel
//! format from the texture's descriptor, validates the source, and either
//! reuses a previously encoded artifact (when the recorded source digest is
//! unchanged) or dispatches the encode through the [`Encoder`] seam. The
//! `origin` family ships the source file untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use kiln_config::Quality;
use kiln_digest::ChangeDetector;

use crate::container::{split_file_name, CompressedTexture};
use crate::descriptor::CompressionDescriptor;
use crate::error::TextureError;
use crate::gpu::{GpuFamily, PixelFormat};
use crate::source::TextureSource;
use crate::validate::validate_source;

/// How many of the highest-detail mips get their own file when HD splitting.
const HD_SPLIT_TOP_LEVELS: usize = 2;

/// Produces an encoded mip chain for one (source, format, quality) request.
///
/// The production implementation shells out to an external block encoder;
/// tests substitute a deterministic in-process fake.
pub trait Encoder: Send + Sync {
    /// Encodes the source into the given pixel format.
    fn encode(
        &self,
        source: &TextureSource,
        format: PixelFormat,
        quality: Quality,
    ) -> Result<CompressedTexture, TextureError>;
}

/// An [`Encoder`] that spawns the configured external encoder executable.
///
/// Invocation shape: `<tool> --format <name> --quality <name> -o <out> <in>`.
/// The tool writes a `.ktex` container which is read back and validated.
pub struct ToolEncoder {
    executable: PathBuf,
}

impl ToolEncoder {
    /// Creates an encoder around the named executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Encoder for ToolEncoder {
    fn encode(
        &self,
        source: &TextureSource,
        format: PixelFormat,
        quality: Quality,
    ) -> Result<CompressedTexture, TextureError> {
        let work = tempfile::tempdir().map_err(|e| TextureError::Io {
            path: PathBuf::from("<tempdir>"),
            source: e,
        })?;
        let out_path = work.path().join("encoded.ktex");

        let output = Command::new(&self.executable)
            .arg("--format")
            .arg(format.name())
            .arg("--quality")
            .arg(quality.name())
            .arg("-o")
            .arg(&out_path)
            .arg(&source.path)
            .output()
            .map_err(|e| TextureError::EncoderFailed {
                path: source.path.clone(),
                reason: format!("failed to launch {}: {e}", self.executable.display()),
            })?;

        if !output.status.success() {
            return Err(TextureError::EncoderFailed {
                path: source.path.clone(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        CompressedTexture::read(&out_path)
    }
}

/// One family's finished artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedArtifact {
    /// Uncompressed passthrough: the source file ships as-is.
    Native {
        /// The source file to copy into output targets.
        source: PathBuf,
    },
    /// One or more `.ktex` files under the artifact root. More than one
    /// when the texture is HD-split.
    Encoded {
        /// The container files, highest detail first.
        files: Vec<PathBuf>,
    },
}

impl CompressedArtifact {
    /// The files an output target must receive for this artifact.
    pub fn files(&self) -> Vec<&Path> {
        match self {
            CompressedArtifact::Native { source } => vec![source.as_path()],
            CompressedArtifact::Encoded { files } => files.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// The result of compressing one texture for a set of families.
#[derive(Debug)]
pub struct TextureOutcome {
    /// Number of (texture, family) pairs requested.
    pub requested: usize,
    /// Number of pairs that failed validation or encoding.
    pub failed: usize,
    /// Finished artifacts keyed by family.
    pub artifacts: BTreeMap<GpuFamily, CompressedArtifact>,
    /// The errors behind `failed`, for diagnostics.
    pub errors: Vec<TextureError>,
}

impl TextureOutcome {
    /// An empty outcome with nothing requested, ready to merge into.
    pub fn new() -> Self {
        Self {
            requested: 0,
            failed: 0,
            artifacts: BTreeMap::new(),
            errors: Vec::new(),
        }
    }

    /// A texture succeeds when at least one requested pair produced an
    /// artifact.
    pub fn success(&self) -> bool {
        self.failed < self.requested
    }

    /// Folds another outcome for the same texture into this one. Used when
    /// one texture's families are compressed in separate batches.
    pub fn merge(&mut self, other: TextureOutcome) {
        self.requested += other.requested;
        self.failed += other.failed;
        self.artifacts.extend(other.artifacts);
        self.errors.extend(other.errors);
    }
}

impl Default for TextureOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// Compresses textures for a set of GPU families, reusing encoded artifacts
/// whose recorded source digest is unchanged.
///
/// HD splitting needs two opt-ins: the output target asks for it
/// ([`hd_split`](Self::hd_split)) and the texture's descriptor marks the
/// texture as splittable.
pub struct TextureCompressor<'a> {
    encoder: &'a dyn Encoder,
    artifact_root: PathBuf,
    default_quality: Quality,
    hd_split: bool,
}

impl<'a> TextureCompressor<'a> {
    /// Creates a compressor writing encoded artifacts under `artifact_root`.
    pub fn new(encoder: &'a dyn Encoder, artifact_root: impl Into<PathBuf>, quality: Quality) -> Self {
        Self {
            encoder,
            artifact_root: artifact_root.into(),
            default_quality: quality,
            hd_split: false,
        }
    }

    /// Enables HD mip splitting for textures whose descriptor opts in.
    pub fn hd_split(mut self, enabled: bool) -> Self {
        self.hd_split = enabled;
        self
    }

    /// Compresses `source_path` for every family in `families`.
    ///
    /// `relative_path` is the texture's path relative to the source root; it
    /// names the artifact files. Validation or encoding failure for one
    /// family never blocks the others.
    pub fn compress(
        &self,
        source_path: &Path,
        relative_path: &Path,
        families: &[GpuFamily],
    ) -> TextureOutcome {
        let mut outcome = TextureOutcome {
            requested: families.len(),
            failed: 0,
            artifacts: BTreeMap::new(),
            errors: Vec::new(),
        };

        let (source, descriptor) = match Self::inspect(source_path) {
            Ok(pair) => pair,
            Err(err) => {
                // Unreadable source or descriptor fails every pair at once.
                outcome.failed = outcome.requested;
                outcome.errors.push(err);
                return outcome;
            }
        };
        let quality = descriptor.quality.unwrap_or(self.default_quality);

        for &family in families {
            match self.compress_for(&source, &descriptor, relative_path, family, quality) {
                Ok(artifact) => {
                    outcome.artifacts.insert(family, artifact);
                }
                Err(err) => {
                    outcome.failed += 1;
                    outcome.errors.push(err);
                }
            }
        }
        outcome
    }

    fn inspect(
        source_path: &Path,
    ) -> Result<(TextureSource, CompressionDescriptor), TextureError> {
        let source = TextureSource::load(source_path)?;
        let descriptor = CompressionDescriptor::load_for(source_path)?;
        Ok((source, descriptor))
    }

    fn compress_for(
        &self,
        source: &TextureSource,
        descriptor: &CompressionDescriptor,
        relative_path: &Path,
        family: GpuFamily,
        quality: Quality,
    ) -> Result<CompressedArtifact, TextureError> {
        let format = self.resolve_format(source, descriptor, family)?;
        let split = self.hd_split && descriptor.hd_split;
        validate_source(source, format, split)?;

        if format == PixelFormat::Rgba8 {
            return Ok(CompressedArtifact::Native {
                source: source.path.clone(),
            });
        }

        let source_digest = ChangeDetector::digest_file(&source.path)?;
        let stem = self.artifact_stem(relative_path, family, format);
        // Split and whole artifacts track staleness separately, so toggling
        // the split flag always re-encodes into the right shape.
        let mut record_name = stem.as_os_str().to_owned();
        if split {
            record_name.push(".hd");
        }
        record_name.push(".digest");
        let record_path = PathBuf::from(record_name);

        if !ChangeDetector::has_changed(source_digest, &record_path) {
            if let Some(files) = existing_artifact_files(&stem, split) {
                return Ok(CompressedArtifact::Encoded { files });
            }
        }

        let encoded = self.encoder.encode(source, format, quality)?;
        let files = self.write_artifact(&stem, &encoded, split)?;
        ChangeDetector::update(source_digest, &record_path)?;
        Ok(CompressedArtifact::Encoded { files })
    }

    fn resolve_format(
        &self,
        source: &TextureSource,
        descriptor: &CompressionDescriptor,
        family: GpuFamily,
    ) -> Result<PixelFormat, TextureError> {
        if family.is_origin() {
            // Origin always ships uncompressed, descriptor or not.
            return Ok(PixelFormat::Rgba8);
        }
        descriptor
            .format_for(family)
            .ok_or_else(|| TextureError::NoFormatForFamily {
                path: source.path.clone(),
                family,
            })
    }

    /// Artifact path stem: `<root>/<family>/<relative_path>.<format>`, no
    /// final extension. Separate formats never collide even when two
    /// families share one.
    fn artifact_stem(&self, relative_path: &Path, family: GpuFamily, format: PixelFormat) -> PathBuf {
        let mut name = relative_path.as_os_str().to_owned();
        name.push(".");
        name.push(format.name());
        self.artifact_root.join(family.name()).join(name)
    }

    fn write_artifact(
        &self,
        stem: &Path,
        encoded: &CompressedTexture,
        hd_split: bool,
    ) -> Result<Vec<PathBuf>, TextureError> {
        if hd_split && encoded.mips.len() > HD_SPLIT_TOP_LEVELS {
            let parts = encoded.split_hd(HD_SPLIT_TOP_LEVELS);
            let mut files = Vec::with_capacity(parts.len());
            for (index, part) in parts.iter().enumerate() {
                let path = split_part_path(stem, index);
                part.write(&path)?;
                files.push(path);
            }
            Ok(files)
        } else {
            let path = stem.with_extension(ktex_extension(stem));
            encoded.write(&path)?;
            Ok(vec![path])
        }
    }
}

/// Returns the artifact files already on disk for a stem in the requested
/// shape, or `None` if no usable layout exists. Splitting still falls back
/// to a whole file because short mip chains never split.
fn existing_artifact_files(stem: &Path, hd_split: bool) -> Option<Vec<PathBuf>> {
    if hd_split {
        let mut files = Vec::new();
        loop {
            let next = split_part_path(stem, files.len());
            if !next.is_file() {
                break;
            }
            files.push(next);
        }
        if !files.is_empty() {
            return Some(files);
        }
    }
    let single = stem.with_extension(ktex_extension(stem));
    if single.is_file() {
        Some(vec![single])
    } else {
        None
    }
}

fn split_part_path(stem: &Path, index: usize) -> PathBuf {
    let file = split_file_name(&stem.file_name().unwrap_or_default().to_string_lossy(), index);
    stem.with_file_name(file)
}

/// `Path::with_extension` replaces the last dot segment, which here is the
/// format name we want to keep. Append instead.
fn ktex_extension(stem: &Path) -> String {
    match stem.extension() {
        Some(ext) => format!("{}.ktex", ext.to_string_lossy()),
        None => "ktex".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic in-process encoder: one mip per halving down to 4px,
    /// payload derived from the format so artifacts are distinguishable.
    struct FakeEncoder {
        calls: AtomicUsize,
    }

    impl FakeEncoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Encoder for FakeEncoder {
        fn encode(
            &self,
            source: &TextureSource,
            format: PixelFormat,
            _quality: Quality,
        ) -> Result<CompressedTexture, TextureError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let face = source.faces[0];
            let mut mips = Vec::new();
            let (mut w, mut h) = (face.width, face.height);
            while w >= 4 && h >= 4 {
                mips.push(vec![format as u8; (w * h / 8) as usize]);
                w /= 2;
                h /= 2;
            }
            Ok(CompressedTexture {
                pixel_format: format,
                width: face.width,
                height: face.height,
                mips,
            })
        }
    }

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        image::RgbaImage::new(width, height).save(&path).unwrap();
        path
    }

    fn write_sidecar(texture: &Path, content: &str) {
        let mut sidecar = texture.as_os_str().to_owned();
        sidecar.push(".tex");
        std::fs::write(sidecar, content).unwrap();
    }

    #[test]
    fn origin_family_ships_source_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "rock.png", 64, 64);
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        let outcome = compressor.compress(&texture, Path::new("rock.png"), &[GpuFamily::Origin]);
        assert!(outcome.success());
        assert_eq!(
            outcome.artifacts[&GpuFamily::Origin],
            CompressedArtifact::Native {
                source: texture.clone()
            }
        );
        assert_eq!(encoder.call_count(), 0);
    }

    #[test]
    fn one_bad_family_does_not_block_the_others() {
        // Mali gets etc2 and succeeds; PowerVR demands square pvrtc4 and
        // this source is rectangular, so only that pair fails.
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "banner.png", 128, 64);
        write_sidecar(
            &texture,
            "[formats]\nmali = \"etc2\"\npowervr = \"pvrtc4\"\n",
        );
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        let outcome = compressor.compress(
            &texture,
            Path::new("banner.png"),
            &[GpuFamily::Mali, GpuFamily::PowerVr],
        );

        assert!(outcome.success());
        assert_eq!(outcome.requested, 2);
        assert_eq!(outcome.failed, 1);
        assert!(outcome.artifacts.contains_key(&GpuFamily::Mali));
        assert!(!outcome.artifacts.contains_key(&GpuFamily::PowerVr));
        assert!(matches!(
            outcome.errors[0],
            TextureError::NonSquareSource { .. }
        ));
    }

    #[test]
    fn every_family_failing_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "plain.png", 64, 64);
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        // No sidecar: device families have no configured format.
        let outcome = compressor.compress(
            &texture,
            Path::new("plain.png"),
            &[GpuFamily::Mali, GpuFamily::Adreno],
        );
        assert!(!outcome.success());
        assert_eq!(outcome.failed, 2);
    }

    #[test]
    fn unchanged_source_reuses_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "rock.png", 64, 64);
        write_sidecar(&texture, "[formats]\nmali = \"etc1\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        let first = compressor.compress(&texture, Path::new("rock.png"), &[GpuFamily::Mali]);
        assert!(first.success());
        assert_eq!(encoder.call_count(), 1);

        let second = compressor.compress(&texture, Path::new("rock.png"), &[GpuFamily::Mali]);
        assert!(second.success());
        assert_eq!(encoder.call_count(), 1);
        assert_eq!(
            first.artifacts[&GpuFamily::Mali],
            second.artifacts[&GpuFamily::Mali]
        );
    }

    #[test]
    fn changed_source_reencodes() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "rock.png", 64, 64);
        write_sidecar(&texture, "[formats]\nmali = \"etc1\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        compressor.compress(&texture, Path::new("rock.png"), &[GpuFamily::Mali]);
        // Different pixel content, same dimensions.
        let mut img = image::RgbaImage::new(64, 64);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.save(&texture).unwrap();

        compressor.compress(&texture, Path::new("rock.png"), &[GpuFamily::Mali]);
        assert_eq!(encoder.call_count(), 2);
    }

    #[test]
    fn hd_split_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "cliff.png", 256, 256);
        write_sidecar(&texture, "hd_split = true\n\n[formats]\nmali = \"etc2\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal)
                .hd_split(true);

        let outcome = compressor.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        assert!(outcome.success());

        let CompressedArtifact::Encoded { files } = &outcome.artifacts[&GpuFamily::Mali] else {
            panic!("expected encoded artifact");
        };
        // 256 → 7 mips (256..4): top 2 split out, remainder in the third.
        assert_eq!(files.len(), 3);
        assert!(files[0].to_string_lossy().ends_with(".0.ktex"));
        assert!(files[2].to_string_lossy().ends_with(".2.ktex"));

        let last = CompressedTexture::read(&files[2]).unwrap();
        assert_eq!(last.width, 64);
        assert_eq!(last.mips.len(), 5);
    }

    #[test]
    fn hd_split_reuse_finds_all_parts() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "cliff.png", 256, 256);
        write_sidecar(&texture, "hd_split = true\n\n[formats]\nmali = \"etc2\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal)
                .hd_split(true);

        let first = compressor.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        let second = compressor.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        assert_eq!(encoder.call_count(), 1);
        assert_eq!(
            first.artifacts[&GpuFamily::Mali].files(),
            second.artifacts[&GpuFamily::Mali].files()
        );
    }

    #[test]
    fn descriptor_split_alone_keeps_the_chain_whole() {
        // The descriptor marks the texture splittable, but no target asked
        // for splitting, so the compressor was not opted in.
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "cliff.png", 256, 256);
        write_sidecar(&texture, "hd_split = true\n\n[formats]\nmali = \"etc2\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        let outcome = compressor.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        assert!(outcome.success());

        let files = outcome.artifacts[&GpuFamily::Mali].files();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().ends_with(".etc2.ktex"));
    }

    #[test]
    fn toggling_split_on_reencodes_into_parts() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "cliff.png", 256, 256);
        write_sidecar(&texture, "hd_split = true\n\n[formats]\nmali = \"etc2\"\n");
        let encoder = FakeEncoder::new();
        let root = dir.path().join("artifacts");

        let whole = TextureCompressor::new(&encoder, &root, Quality::Normal);
        whole.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        assert_eq!(encoder.call_count(), 1);

        // Same unchanged source, but the split shape has no recorded digest
        // yet, so the stale whole file is never handed out.
        let split = TextureCompressor::new(&encoder, &root, Quality::Normal).hd_split(true);
        let outcome = split.compress(&texture, Path::new("cliff.png"), &[GpuFamily::Mali]);
        assert_eq!(encoder.call_count(), 2);
        assert_eq!(outcome.artifacts[&GpuFamily::Mali].files().len(), 3);
    }

    #[test]
    fn merged_outcomes_accumulate_pairs() {
        let mut total = TextureOutcome::new();
        let mut part = TextureOutcome::new();
        part.requested = 2;
        part.failed = 1;
        total.merge(part);

        let mut rest = TextureOutcome::new();
        rest.requested = 1;
        rest.artifacts.insert(
            GpuFamily::Origin,
            CompressedArtifact::Native {
                source: PathBuf::from("a.png"),
            },
        );
        total.merge(rest);

        assert_eq!(total.requested, 3);
        assert_eq!(total.failed, 1);
        assert!(total.success());
        assert!(total.artifacts.contains_key(&GpuFamily::Origin));
    }

    #[test]
    fn families_with_different_formats_get_separate_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let texture = write_png(dir.path(), "rock.png", 64, 64);
        write_sidecar(&texture, "[formats]\nmali = \"etc2\"\ntegra = \"dxt5\"\n");
        let encoder = FakeEncoder::new();
        let compressor =
            TextureCompressor::new(&encoder, dir.path().join("artifacts"), Quality::Normal);

        let outcome = compressor.compress(
            &texture,
            Path::new("rock.png"),
            &[GpuFamily::Mali, GpuFamily::Tegra],
        );
        assert_eq!(outcome.artifacts.len(), 2);
        assert_ne!(
            outcome.artifacts[&GpuFamily::Mali],
            outcome.artifacts[&GpuFamily::Tegra]
        );
    }
}
