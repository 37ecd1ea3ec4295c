use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use dashmap::DashMap;
use log::{debug, info, warn};
use tokio::runtime::Runtime;
use umap_files::mesh::writer::PskWriter;
use umap_files::package::types::Export;
use umap_files::texture::decoder::TextureDecoder;

use crate::materialize::work_tracker::WorkTracker;
use crate::util::paths::export_dir;
use crate::util::write_atomically;

pub mod work_tracker;

/// Writes meshes and textures referenced by the traversal to disk in the background. Every output path is written
/// at most once per run: a per-path lock serializes racing tasks and the existence check is repeated under it.
pub struct Materializer {
    runtime: Runtime,
    tracker: Arc<WorkTracker>,
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
    output_dir: PathBuf,
    prefer_dds: bool,
}

impl Materializer {
    pub fn new(output_dir: &Path, workers: usize, prefer_dds: bool) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers.max(1))
            .thread_name("umap-export-worker")
            .build()
            .context("Failed to start the export workers")?;

        Ok(Materializer {
            runtime,
            tracker: WorkTracker::new(),
            locks: Arc::new(DashMap::new()),
            output_dir: output_dir.to_path_buf(),
            prefer_dds,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.tracker.wait_idle(timeout)
    }

    /// Queues the first LOD of `mesh` as `<dir>/<name>.pskx`.
    pub fn export_mesh(&self, mesh: &Arc<Export>, materials: Vec<String>) {
        let target = export_dir(&self.output_dir, &mesh.package_name).join(format!("{}.pskx", mesh.name));
        if target.exists() {
            debug!("Mesh already exists, skipping: {}", target.display());
            return;
        }

        let mesh = mesh.clone();
        self.spawn_export("mesh", target, move |wtr| {
            let lod = mesh
                .static_mesh
                .as_ref()
                .and_then(|data| data.lods.first())
                .ok_or_else(|| anyhow!("Mesh '{}' has no LODs", mesh.name))?;

            PskWriter::write(wtr, lod, &materials)?;
            Ok(())
        });
    }

    /// Queues the first mip of a 2D texture as `<dir>/<name>.png`. Anything but `Texture2D` is ignored. Selecting the
    /// DDS path for a format that has a DDS equivalent is an error.
    pub fn export_texture(&self, texture: &Arc<Export>) -> anyhow::Result<()> {
        if !texture.is_texture_2d() {
            return Ok(());
        }

        let Some(data) = &texture.texture else {
            warn!("Texture '{}' carries no pixel data", texture.name);
            return Ok(());
        };

        let four_cc = self
            .prefer_dds
            .then(|| data.format.dds_four_cc())
            .flatten();
        let extension = if four_cc.is_some() { "dds" } else { "png" };
        let target = export_dir(&self.output_dir, &texture.package_name).join(format!("{}.{}", texture.name, extension));

        if target.exists() {
            debug!("Texture already exists, skipping: {}", target.display());
            return Ok(());
        }

        if four_cc.is_some() {
            bail!("DDS export is not implemented");
        }

        let texture = texture.clone();
        self.spawn_export("texture", target, move |wtr| {
            let data = texture
                .texture
                .as_ref()
                .ok_or_else(|| anyhow!("Texture '{}' carries no pixel data", texture.name))?;

            // only the first mip is exported, lower resolutions are left to the importer
            let mip = data
                .mips
                .first()
                .ok_or_else(|| anyhow!("Texture '{}' has no mips", texture.name))?;

            TextureDecoder::export_png(data.format, mip, wtr)?;
            Ok(())
        });

        Ok(())
    }

    fn spawn_export<F>(&self, kind: &'static str, target: PathBuf, write: F)
    where
        F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()> + Send + 'static,
    {
        let guard = self.tracker.start();
        let locks = self.locks.clone();

        self.runtime.spawn_blocking(move || {
            let _guard = guard;
            let lock = locks.entry(target.clone()).or_default().clone();
            {
                let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
                write_once(kind, &target, write);
            }

            // only the map and this task hold the lock, nobody is queued behind it
            locks.remove_if(&target, |_, entry| Arc::strong_count(entry) == 2);
        });
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

fn write_once<F>(kind: &str, target: &Path, write: F)
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    if target.exists() {
        debug!("{} was written concurrently, skipping: {}", kind, target.display());
        return;
    }

    info!("Saving {} to {}", kind, target.display());
    if let Err(e) = write_atomically(target, write) {
        warn!("Failed to save {} {}: {:#}", kind, target.display(), e);
    }
}
