//! The pipeline facade and directory walk.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;

use kiln_atlas::{compose_page, AtlasDefinition, AtlasPacker, Frame};
use kiln_cache::{BuildCache, CacheBundle, CacheTransport};
use kiln_common::{CacheKey, Digest, DigestFold, ExportedObject, ExportedObjectCollection, ObjectKind};
use kiln_config::{ProjectConfig, Quality};
use kiln_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use kiln_digest::{ChangeDetector, DigestError};
use kiln_output::{read_manifest, write_manifest, OutputWriter};
use kiln_scene::{DependencyCollector, Scene};
use kiln_texture::{Encoder, GpuFamily, TextureCompressor, TextureOutcome, ToolEncoder};

use crate::params::BuildParams;
use crate::state::{ExportState, StateTracker};

const CODE_SCENE_LOAD: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 101,
};
const CODE_OUTPUT_IO: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 102,
};
const CODE_DEPENDENCIES: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 103,
};
const CODE_DIGEST: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 104,
};
const CODE_TEXTURE: DiagnosticCode = DiagnosticCode {
    category: Category::Validation,
    number: 201,
};
const CODE_ATLAS: DiagnosticCode = DiagnosticCode {
    category: Category::Validation,
    number: 202,
};
const CODE_CONFIG: DiagnosticCode = DiagnosticCode {
    category: Category::Validation,
    number: 203,
};

/// The export pipeline: one instance owns one source/output tree for the
/// duration of a run.
pub struct Pipeline {
    config: ProjectConfig,
    source_root: PathBuf,
    work_dir: PathBuf,
    targets: Vec<PathBuf>,
    sink: Arc<DiagnosticSink>,
    cache: Option<BuildCache>,
    encoder: Box<dyn Encoder>,
    params: BuildParams,
    tracker: StateTracker,
}

impl Pipeline {
    /// Builds a pipeline for a project directory.
    ///
    /// Intermediate artifacts and digest records live under
    /// `<project_dir>/.kiln`; output targets resolve relative to
    /// `project_dir`.
    pub fn configure(
        project_dir: &Path,
        config: ProjectConfig,
        sink: Arc<DiagnosticSink>,
    ) -> Self {
        let source_root = project_dir.join(&config.project.source_root);
        let work_dir = project_dir.join(".kiln");
        let targets = config
            .outputs
            .iter()
            .map(|t| project_dir.join(&t.dir))
            .collect();
        let encoder: Box<dyn Encoder> = Box::new(ToolEncoder::new(&config.tools.encoder));
        let params = BuildParams::from_config(&config);
        Self {
            config,
            source_root,
            work_dir,
            targets,
            sink,
            cache: None,
            encoder,
            params,
            tracker: StateTracker::new(),
        }
    }

    /// Replaces the external encoder. Tests use a deterministic in-process
    /// fake here.
    pub fn with_encoder(mut self, encoder: Box<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Attaches a build cache over the given transport.
    ///
    /// The connect probe honors the configured timeout; failure disables
    /// caching for the run without failing anything.
    pub fn attach_cache(&mut self, transport: Box<dyn CacheTransport>, description: &str) {
        let timeout_ms = self
            .config
            .cache
            .as_ref()
            .map(|c| c.connect_timeout_ms)
            .unwrap_or(2000);
        self.cache = Some(BuildCache::attach(
            transport,
            Duration::from_millis(timeout_ms),
            description,
            &self.sink,
        ));
    }

    /// The current state of the export state machine.
    pub fn state(&self) -> ExportState {
        self.tracker.current()
    }

    /// Every state entered so far, in order.
    pub fn state_trace(&self) -> &[ExportState] {
        self.tracker.trace()
    }

    /// Exports the whole source tree, depth-first per directory.
    ///
    /// Returns the aggregate success; per-object failures accumulate in the
    /// diagnostic sink.
    pub fn export_tree(&mut self) -> bool {
        self.process_directory(Path::new(""))
    }

    /// Exports a named set of objects directly, bypassing directory digests.
    pub fn export(&mut self, objects: &ExportedObjectCollection) -> bool {
        let mut ok = true;
        let writer = OutputWriter::new(self.targets.clone());
        if let Err(e) = writer.prepare_directories(objects) {
            self.sink
                .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string()));
            return false;
        }
        for scene in objects.of_kind(ObjectKind::Scene) {
            let (scene_ok, _) = self.export_scene(scene);
            ok &= scene_ok;
        }
        for kind in [ObjectKind::Heightmap, ObjectKind::EmitterConfig] {
            for rel in objects.of_kind(kind) {
                if let Err(e) = writer.copy_object(&self.source_root.join(rel), rel) {
                    self.sink.emit(
                        Diagnostic::error(CODE_OUTPUT_IO, e.to_string()).with_object(rel),
                    );
                    ok = false;
                }
            }
        }
        let textures: Vec<PathBuf> = objects
            .of_kind(ObjectKind::Texture)
            .map(Path::to_path_buf)
            .collect();
        if !textures.is_empty() {
            let (textures_ok, _) = self.compress_and_place(&textures);
            ok &= textures_ok;
        }
        ok
    }

    /// Runs the state machine over one directory, then recurses into its
    /// children.
    fn process_directory(&mut self, rel_dir: &Path) -> bool {
        self.tracker.advance(ExportState::Scanning);
        let abs_dir = self.source_root.join(rel_dir);

        let mut scenes = Vec::new();
        let mut subdirs = Vec::new();
        let mut has_files = false;
        match sorted_entries(&abs_dir) {
            Ok(entries) => {
                for entry in entries {
                    let name = entry.file_name().unwrap_or_default().to_string_lossy();
                    if name.starts_with('.') {
                        continue;
                    }
                    if entry.is_dir() {
                        subdirs.push(rel_dir.join(name.as_ref()));
                    } else {
                        has_files = true;
                        if entry.extension().is_some_and(|e| e == "scene") {
                            scenes.push(rel_dir.join(name.as_ref()));
                        }
                    }
                }
            }
            Err(e) => {
                self.sink.emit(Diagnostic::error(
                    CODE_OUTPUT_IO,
                    format!("cannot scan {}: {e}", abs_dir.display()),
                ));
                self.tracker.advance(ExportState::Idle);
                return false;
            }
        }

        let mut ok = true;
        if scenes.is_empty() {
            // Only a leaf with nothing in it at all clears its mirrored
            // output directory. Scene-less files stay: scenes elsewhere in
            // the tree reference heightmaps, emitters, and textures here,
            // and their copies land under this directory's mirror.
            if !has_files && subdirs.is_empty() && !rel_dir.as_os_str().is_empty() {
                let writer = OutputWriter::new(self.targets.clone());
                if let Err(e) = writer.clear_directory(rel_dir) {
                    self.sink
                        .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string()));
                    ok = false;
                }
            }
            self.tracker.advance(ExportState::Idle);
        } else {
            ok &= self.process_scenes(rel_dir, &abs_dir, &scenes);
        }

        for subdir in &subdirs {
            ok &= self.process_directory(subdir);
        }
        ok
    }

    /// The CheckingCache → {Retrieving | Rebuilding} → Writing →
    /// UpdatingDigests leg for one directory's scenes.
    fn process_scenes(&mut self, rel_dir: &Path, abs_dir: &Path, scenes: &[PathBuf]) -> bool {
        // The parameter digest is recomputed from scratch every run.
        let param_digest = self.params.digest();
        let dir_digest = match self.directory_content_digest(rel_dir, abs_dir, scenes) {
            Ok(d) => d,
            Err(e) => {
                self.sink
                    .emit(Diagnostic::error(CODE_DIGEST, e.to_string()));
                self.tracker.advance(ExportState::Idle);
                return false;
            }
        };
        let record_dir = self.work_dir.join("digests").join(rel_dir);
        let content_record = record_dir.join("content.digest");
        let param_record = record_dir.join("params.digest");

        let changed = self.config.build.force
            || ChangeDetector::has_changed(dir_digest, &content_record)
            || ChangeDetector::has_changed(param_digest, &param_record);

        self.tracker.advance(ExportState::CheckingCache);
        if !changed {
            self.tracker.advance(ExportState::Idle);
            return true;
        }

        let key = CacheKey::new(dir_digest, param_digest);
        let mut ok = true;
        let cached = self
            .cache
            .as_ref()
            .and_then(|c| c.request(key, &self.sink));
        let mut written = Vec::new();
        let mut rebuilt = false;

        match cached {
            Some(bundle) => {
                self.tracker.advance(ExportState::Retrieving);
                let writer = OutputWriter::new(self.targets.clone());
                for (rel, bytes) in &bundle.files {
                    if let Err(e) = writer.write_bytes(rel, bytes) {
                        self.sink
                            .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string()));
                        ok = false;
                    }
                }
            }
            None => {
                self.tracker.advance(ExportState::Rebuilding);
                rebuilt = true;
                for scene in scenes {
                    let (scene_ok, paths) = self.export_scene(scene);
                    ok &= scene_ok;
                    written.extend(paths);
                }
            }
        }

        self.tracker.advance(ExportState::Writing);
        if ok && rebuilt {
            if let Some(cache) = &self.cache {
                if cache.is_enabled() {
                    let bundle = self.assemble_bundle(cache, &written);
                    cache.add(key, bundle, &self.sink);
                }
            }
        }

        if ok {
            self.tracker.advance(ExportState::UpdatingDigests);
            // The manifests written this run feed the dependency fold, so
            // the recorded digest is recomputed after them. The next clean
            // run then lands on the same value and skips.
            match self.directory_content_digest(rel_dir, abs_dir, scenes) {
                Ok(content_now) => {
                    for (digest, record) in
                        [(content_now, &content_record), (param_digest, &param_record)]
                    {
                        if let Err(e) = ChangeDetector::update(digest, record) {
                            self.sink
                                .emit(Diagnostic::error(CODE_DIGEST, e.to_string()));
                            ok = false;
                        }
                    }
                }
                Err(e) => {
                    self.sink
                        .emit(Diagnostic::error(CODE_DIGEST, e.to_string()));
                    ok = false;
                }
            }
        }
        self.tracker.advance(ExportState::Idle);
        ok
    }

    /// The content digest behind one directory's rebuild decision: the
    /// directory's own files folded with the digests of out-of-directory
    /// dependencies named by the previous run's manifests.
    ///
    /// A scene may reference a heightmap or texture anywhere under the
    /// source root; without the fold, editing such a file would leave this
    /// digest unchanged and ship stale outputs. A directory with no
    /// manifests yet has no digest record either, so the first run rebuilds
    /// regardless.
    fn directory_content_digest(
        &self,
        rel_dir: &Path,
        abs_dir: &Path,
        scenes: &[PathBuf],
    ) -> Result<Digest, DigestError> {
        let base = ChangeDetector::digest_directory(abs_dir, false)?;
        let Some(first_target) = self.targets.first() else {
            return Ok(base);
        };

        let mut deps = BTreeSet::new();
        for scene in scenes {
            let manifest = first_target.join(scene.with_extension("deps"));
            let Ok(collection) = read_manifest(&manifest) else {
                continue;
            };
            for object in collection.iter() {
                if object.kind != ObjectKind::Scene
                    && object.relative_path.parent() != Some(rel_dir)
                {
                    deps.insert(object.relative_path);
                }
            }
        }
        if deps.is_empty() {
            return Ok(base);
        }

        let mut fold = DigestFold::new();
        fold.update(base.as_raw());
        for dep in deps {
            fold.update(dep.to_string_lossy().as_bytes());
            match ChangeDetector::digest_file(&self.source_root.join(&dep)) {
                Ok(digest) => fold.update(digest.as_raw()),
                // A dependency that vanished still flips the digest.
                Err(_) => fold.update(&[0]),
            }
        }
        Ok(fold.finish())
    }

    /// Bundles the files a rebuild just wrote, reading them back from the
    /// first output target.
    fn assemble_bundle(&self, cache: &BuildCache, written: &[PathBuf]) -> CacheBundle {
        let mut bundle = CacheBundle::new(cache.bundle_meta());
        let Some(first_target) = self.targets.first() else {
            return bundle;
        };
        for rel in written {
            match std::fs::read(first_target.join(rel)) {
                Ok(bytes) => bundle.insert(rel.clone(), bytes),
                Err(e) => self.sink.emit(Diagnostic::warning(
                    CODE_OUTPUT_IO,
                    format!("output {} not bundled for the cache: {e}", rel.display()),
                )),
            }
        }
        bundle
    }

    /// Exports one scene: sanitize, collect dependencies, place every
    /// referenced object, write the dependency manifest.
    ///
    /// Returns the success flag and the target-relative paths written. A
    /// scene that fails to load or collect fails entirely; sibling scenes
    /// still proceed.
    fn export_scene(&self, rel_scene: &Path) -> (bool, Vec<PathBuf>) {
        let abs_scene = self.source_root.join(rel_scene);
        let scene = match Scene::load(&abs_scene) {
            Ok(s) => s,
            Err(e) => {
                self.sink.emit(
                    Diagnostic::error(CODE_SCENE_LOAD, e.to_string()).with_object(rel_scene),
                );
                return (false, Vec::new());
            }
        };
        let sanitized = scene.sanitized();

        let collector = DependencyCollector::new(&self.source_root);
        let deps = match collector.collect(&sanitized) {
            Ok(deps) => deps,
            Err(e) => {
                self.sink.emit(
                    Diagnostic::error(CODE_DEPENDENCIES, e.to_string()).with_object(rel_scene),
                );
                return (false, Vec::new());
            }
        };
        let mut collection = ExportedObjectCollection::new();
        collection.push(ExportedObject::new(ObjectKind::Scene, rel_scene));
        collection.extend(&deps);

        let writer = OutputWriter::new(self.targets.clone());
        if let Err(e) = writer.prepare_directories(&collection) {
            self.sink
                .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string()).with_object(rel_scene));
            return (false, Vec::new());
        }

        let mut ok = true;
        let mut written = Vec::new();

        // The saved scene is the sanitized one, never the authored file.
        match serde_json::to_vec_pretty(&sanitized) {
            Ok(json) => match writer.write_bytes(rel_scene, &json) {
                Ok(()) => written.push(rel_scene.to_path_buf()),
                Err(e) => {
                    self.sink.emit(
                        Diagnostic::error(CODE_OUTPUT_IO, e.to_string()).with_object(rel_scene),
                    );
                    ok = false;
                }
            },
            Err(e) => {
                self.sink.emit(
                    Diagnostic::error(CODE_SCENE_LOAD, e.to_string()).with_object(rel_scene),
                );
                ok = false;
            }
        }

        for kind in [ObjectKind::Heightmap, ObjectKind::EmitterConfig] {
            for rel in collection.of_kind(kind) {
                match writer.copy_object(&self.source_root.join(rel), rel) {
                    Ok(()) => written.push(rel.to_path_buf()),
                    Err(e) => {
                        self.sink.emit(
                            Diagnostic::error(CODE_OUTPUT_IO, e.to_string()).with_object(rel),
                        );
                        ok = false;
                    }
                }
            }
        }

        let textures: Vec<PathBuf> = collection
            .of_kind(ObjectKind::Texture)
            .map(Path::to_path_buf)
            .collect();
        if !textures.is_empty() {
            let (textures_ok, texture_writes) = self.compress_and_place(&textures);
            ok &= textures_ok;
            written.extend(texture_writes);

            if self.config.build.optimize {
                written.extend(self.pack_scene_atlas(rel_scene, &textures, &writer));
            }
        }

        let rel_manifest = rel_scene.with_extension("deps");
        for target in writer.targets() {
            if let Err(e) = write_manifest(&target.join(&rel_manifest), &collection) {
                self.sink
                    .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string()).with_object(rel_scene));
                ok = false;
            }
        }
        written.push(rel_manifest);

        (ok, written)
    }

    /// Compresses textures for every requested GPU family on the worker
    /// pool and places the artifacts in the targets that asked for each
    /// family.
    fn compress_and_place(&self, textures: &[PathBuf]) -> (bool, Vec<PathBuf>) {
        let families = self.requested_families();
        if families.is_empty() {
            return (true, Vec::new());
        }
        let quality = self
            .config
            .outputs
            .first()
            .map(|t| t.quality)
            .unwrap_or(Quality::Normal);
        // A family compresses with HD splitting when any target that
        // requests it asks for splitting. One family, one artifact shape.
        let (hd_families, whole_families): (Vec<GpuFamily>, Vec<GpuFamily>) = families
            .into_iter()
            .partition(|f| self.family_requests_hd(*f));
        let artifact_root = self.work_dir.join("artifacts");
        let whole = TextureCompressor::new(&*self.encoder, &artifact_root, quality);
        let split = TextureCompressor::new(&*self.encoder, &artifact_root, quality).hd_split(true);

        // Sources are read-only and every artifact path is unique per
        // (texture, family), so textures compress independently.
        let outcomes: Vec<_> = textures
            .par_iter()
            .map(|rel| {
                let abs = self.source_root.join(rel);
                let mut outcome = TextureOutcome::new();
                for (compressor, group) in [(&whole, &whole_families), (&split, &hd_families)] {
                    if !group.is_empty() {
                        outcome.merge(compressor.compress(&abs, rel, group));
                    }
                }
                (rel, outcome)
            })
            .collect();

        let mut ok = true;
        let mut written = Vec::new();
        for (rel, outcome) in outcomes {
            for err in &outcome.errors {
                self.sink
                    .emit(Diagnostic::error(CODE_TEXTURE, err.to_string()).with_object(rel));
            }
            if !outcome.success() {
                ok = false;
            }
            for (family, artifact) in &outcome.artifacts {
                let targets = self.targets_for_family(*family);
                if targets.is_empty() {
                    continue;
                }
                let family_writer = OutputWriter::new(targets);
                match family_writer.write_gpu_artifact(family.name(), rel, &artifact.files()) {
                    Ok(paths) => written.extend(paths),
                    Err(e) => {
                        self.sink.emit(
                            Diagnostic::error(CODE_OUTPUT_IO, e.to_string())
                                .with_object(rel)
                                .with_gpu_family(family.name()),
                        );
                        ok = false;
                    }
                }
            }
        }
        (ok, written)
    }

    /// Packs the scene's file textures into an atlas, writing the
    /// definition manifest and composed pages next to the scene.
    fn pack_scene_atlas(
        &self,
        rel_scene: &Path,
        textures: &[PathBuf],
        writer: &OutputWriter,
    ) -> Vec<PathBuf> {
        let mut frames = Vec::new();
        let mut images = std::collections::BTreeMap::new();
        for rel in textures {
            // Only plain raster sources participate; container formats keep
            // their own mip chains and stay standalone.
            let is_raster = rel
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("png") || e.eq_ignore_ascii_case("tga"));
            if !is_raster {
                continue;
            }
            match image::open(self.source_root.join(rel)) {
                Ok(img) => {
                    let rgba = img.to_rgba8();
                    let name = rel.to_string_lossy().into_owned();
                    frames.push(Frame::new(name.clone(), rgba.width(), rgba.height()));
                    images.insert(name, rgba);
                }
                Err(e) => {
                    self.sink.emit(
                        Diagnostic::error(CODE_ATLAS, format!("cannot load for packing: {e}"))
                            .with_object(rel),
                    );
                }
            }
        }
        if frames.is_empty() {
            return Vec::new();
        }

        let packer = AtlasPacker::new(&self.config.atlas);
        let layouts = match packer.pack(frames) {
            Ok(layouts) => layouts,
            Err(e) => {
                self.sink
                    .emit(Diagnostic::error(CODE_ATLAS, e.to_string()).with_object(rel_scene));
                return Vec::new();
            }
        };

        let stem = rel_scene
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        let rel_dir = rel_scene.parent().unwrap_or_else(|| Path::new(""));
        let mut written = Vec::new();

        let definition = AtlasDefinition::from_layouts(&stem, &layouts);
        match serde_json::to_vec_pretty(&definition) {
            Ok(json) => {
                let rel_def = rel_dir.join(format!("{stem}.atlas.json"));
                match writer.write_bytes(&rel_def, &json) {
                    Ok(()) => written.push(rel_def),
                    Err(e) => self
                        .sink
                        .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string())),
                }
            }
            Err(e) => self
                .sink
                .emit(Diagnostic::error(CODE_ATLAS, e.to_string())),
        }

        for (index, layout) in layouts.iter().enumerate() {
            let page = match compose_page(layout, &images) {
                Ok(page) => page,
                Err(e) => {
                    self.sink
                        .emit(Diagnostic::error(CODE_ATLAS, e.to_string()).with_object(rel_scene));
                    continue;
                }
            };
            let mut png = Vec::new();
            let encode = image::DynamicImage::ImageRgba8(page)
                .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png);
            if let Err(e) = encode {
                self.sink
                    .emit(Diagnostic::error(CODE_ATLAS, e.to_string()).with_object(rel_scene));
                continue;
            }
            let rel_page = rel_dir.join(format!("{stem}.atlas.{index}.png"));
            match writer.write_bytes(&rel_page, &png) {
                Ok(()) => written.push(rel_page),
                Err(e) => self
                    .sink
                    .emit(Diagnostic::error(CODE_OUTPUT_IO, e.to_string())),
            }
        }
        written
    }

    /// The union of GPU families requested across all output targets.
    fn requested_families(&self) -> Vec<GpuFamily> {
        let mut families = Vec::new();
        for target in &self.config.outputs {
            for name in &target.gpu_families {
                match GpuFamily::from_str(name) {
                    Ok(family) => {
                        if !families.contains(&family) {
                            families.push(family);
                        }
                    }
                    Err(_) => self.sink.emit(Diagnostic::error(
                        CODE_CONFIG,
                        format!("unknown GPU family '{name}' in output target"),
                    )),
                }
            }
        }
        families.sort_by_key(|f| f.name());
        families
    }

    fn family_requests_hd(&self, family: GpuFamily) -> bool {
        self.config
            .outputs
            .iter()
            .any(|t| t.hd_split && t.gpu_families.iter().any(|n| n == family.name()))
    }

    fn targets_for_family(&self, family: GpuFamily) -> Vec<PathBuf> {
        self.config
            .outputs
            .iter()
            .zip(&self.targets)
            .filter(|(target, _)| target.gpu_families.iter().any(|n| n == family.name()))
            .map(|(_, dir)| dir.clone())
            .collect()
    }
}

/// Directory entries sorted by name for deterministic traversal.
fn sorted_entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}
