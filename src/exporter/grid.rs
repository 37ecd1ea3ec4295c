use std::sync::Arc;

use umap_files::package::types::{ObjectRef, Package, PropertyBag, SoftObjectPath};

use crate::exporter::resolver::ReferenceResolver;
use crate::exporter::world::WorldExporter;
use crate::exporter::{ExportError, soft_to_none};
use crate::util::substring_after_last;

const HLOD_PREFIX: &str = "HLOD";

impl WorldExporter<'_> {
    /// Exports every cell world of a streaming grid, in grid order, and returns their canonical paths. Cells that
    /// fail to export keep a `None` slot, HLOD cells are left out entirely.
    pub(crate) fn flatten_grid(
        &mut self,
        owner: &Arc<Package>,
        grid: &PropertyBag,
    ) -> Result<Vec<Option<String>>, ExportError> {
        let resolver = ReferenceResolver::new(self.provider());
        let mut children = vec![];

        for level in grid
            .get::<Vec<PropertyBag>>("GridLevels")
            .unwrap_or_default()
        {
            for layer_cell in level
                .get::<Vec<PropertyBag>>("LayerCells")
                .unwrap_or_default()
            {
                let grid_cells = layer_cell
                    .get::<Vec<Option<ObjectRef>>>("GridCells")
                    .unwrap_or_default();

                for grid_cell in grid_cells.iter().flatten() {
                    let world_asset = resolver
                        .resolve(owner, grid_cell)
                        .and_then(|cell| resolver.follow(&cell, "LevelStreaming"))
                        .and_then(|streaming| streaming.props().get::<SoftObjectPath>("WorldAsset"));

                    let Some(world_asset) = world_asset else {
                        continue;
                    };

                    let path = world_asset.asset_path_name;
                    if substring_after_last(&path, '/').starts_with(HLOD_PREFIX) {
                        continue;
                    }

                    children.push(soft_to_none(self.export(&path))?);
                }
            }
        }

        Ok(children)
    }
}
