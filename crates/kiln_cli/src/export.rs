//! The `kiln export` command.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_cache::DirStore;
use kiln_config::load_config;
use kiln_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};
use kiln_pipeline::Pipeline;

use crate::{ExportArgs, GlobalArgs};

/// Runs a full tree export for the project.
///
/// Loads `kiln.toml`, walks the source tree through the pipeline, renders
/// any accumulated diagnostics, and returns the process exit code.
pub fn run(args: &ExportArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = match &global.project {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };

    let mut config = load_config(&project_dir)?;
    if args.force {
        config.build.force = true;
    }
    let cache_config = if args.no_cache {
        None
    } else {
        config.cache.clone()
    };

    let sink = Arc::new(DiagnosticSink::new());
    let mut pipeline = Pipeline::configure(&project_dir, config, Arc::clone(&sink));

    if let Some(cache) = &cache_config {
        pipeline.attach_cache(Box::new(DirStore::new(&cache.store)), &cache.description);
    }

    if !global.quiet {
        eprintln!("  Exporting project at `{}`", project_dir.display());
    }

    let ok = pipeline.export_tree();

    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.take_all() {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(&diag));
    }

    if ok {
        if !global.quiet {
            eprintln!("  Export finished");
        }
        Ok(0)
    } else {
        eprintln!("  Export finished with errors");
        Ok(1)
    }
}
