use anyhow::{Context, Result};
use tracing::{debug, debug_span};

use crate::args::{CliArgs, OutputFormat};
use crate::manifest::{LoadedManifest, load_manifest};
use crate::reporter::{ContextReport, Reporter};
use mixr_resolver::{CompositionBuilder, CompositionOptions};

/// Reads and resolves the manifest named on the command line.
pub fn load(args: &CliArgs) -> Result<LoadedManifest> {
    let path = &args.manifest;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    load_manifest(&text).with_context(|| format!("failed to load manifest {}", path.display()))
}

/// Manifest options with command-line overrides applied.
pub fn effective_options(args: &CliArgs, manifest: &LoadedManifest) -> CompositionOptions {
    if args.no_structural {
        manifest.options.without_structural_binding()
    } else {
        manifest.options
    }
}

/// Builds every selected context. A failing context does not stop the others.
pub fn build_reports(args: &CliArgs, manifest: &LoadedManifest) -> Result<Vec<ContextReport>> {
    let builder =
        CompositionBuilder::new(&manifest.table).with_options(effective_options(args, manifest));
    let selected = manifest.select(&args.contexts)?;

    let reports = selected
        .into_iter()
        .map(|(name, context)| {
            let _span = debug_span!("context", name).entered();
            let result = builder.build(context);
            debug!(ok = result.is_ok(), "built context");
            ContextReport::new(name, &manifest.table, &result)
        })
        .collect();
    Ok(reports)
}

pub fn render(args: &CliArgs, reports: &[ContextReport], color: bool) -> Result<String> {
    match args.format {
        OutputFormat::Text => Ok(Reporter::new(color).render(reports)),
        OutputFormat::Json if args.pretty => {
            serde_json::to_string_pretty(reports).context("failed to serialize reports")
        }
        OutputFormat::Json => serde_json::to_string(reports).context("failed to serialize reports"),
    }
}

/// Load, build and render in one go.
pub fn run(args: &CliArgs, color: bool) -> Result<(String, Vec<ContextReport>)> {
    let manifest = load(args)?;
    let reports = build_reports(args, &manifest)?;
    let rendered = render(args, &reports, color)?;
    Ok((rendered, reports))
}
