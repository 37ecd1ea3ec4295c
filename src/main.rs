use std::path::Path;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use serde::Serialize;
use umap_exporter::exporter::world::WorldExporter;
use umap_exporter::io::loose::loader::LooseFileProvider;
use umap_exporter::materialize::Materializer;
use umap_exporter::settings::{CliArgs, Config};
use umap_exporter::util::write_atomically;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Serialize)]
struct ProcessedMarker<'a> {
    path: &'a str,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = Config::load(&args.config)?;
    if let Some(export_package) = &args.export_package {
        config.export_package = export_package.clone();
    }
    config.validate()?;

    let dump_dir = config.dump_assets.then(|| args.output_dir.clone());
    let provider = LooseFileProvider::new(
        &config.paks_directory,
        &config.encryption_keys,
        config.object_cache_size,
        dump_dir,
    )?;
    info!(
        "Mounted {} containers with {} packages",
        provider.mounted().len(),
        provider.package_count()
    );

    let materializer = Materializer::new(&args.output_dir, args.workers, config.export_to_dds_when_possible)?;

    info!("Exporting {} ({})", config.export_package, config.ue_version);
    let mut exporter = WorldExporter::new(&provider, &config, &materializer);
    let root = exporter
        .export(config.export_package.trim())
        .with_context(|| format!("Failed to export {}", config.export_package))?;

    while materializer.outstanding() > 0 {
        info!("Waiting for {} tasks", materializer.outstanding());
        materializer.wait_idle(DRAIN_POLL_INTERVAL);
    }

    write_processed_marker(&args.output_dir, &root)?;
    info!("All done in {:.1} sec", start.elapsed().as_secs_f64());
    Ok(())
}

fn write_processed_marker(output_dir: &Path, root: &str) -> anyhow::Result<()> {
    let path = output_dir.join("processed.json");
    info!("Writing to {}", path.display());
    write_atomically(&path, |wtr| {
        serde_json::to_writer(wtr, &ProcessedMarker { path: root })?;
        Ok(())
    })
}
