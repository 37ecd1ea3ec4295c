#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tempfile::TempDir;
use umap_exporter::exporter::ExportError;
use umap_exporter::exporter::world::WorldExporter;
use umap_exporter::io::loose::loader::LooseFileProvider;
use umap_exporter::materialize::Materializer;
use umap_exporter::settings::Config;

/// A 4x4 DXT1 block, solid red.
pub const RED_DXT1: &str = "APgA+AAAAAA=";

pub const WALL_MESH: &str = r#"{"Exports": [
    {"Type": "StaticMesh", "Name": "SM_Wall", "Properties": [
        {"Name": "StaticMaterials", "Value": {"Array": [
            {"Struct": [
                {"Name": "MaterialInterface", "Value": {"Object": "/Game/Materials/M_Wall.M_Wall"}},
                {"Name": "MaterialSlotName", "Value": {"Name": "Wall"}}
            ]}
        ]}}
    ], "StaticMesh": {"Lods": [{
        "Points": [[0, 0, 0], [100, 0, 0], [0, 100, 0]],
        "Wedges": [{"Point": 0, "Uv": [0, 0]}, {"Point": 1, "Uv": [1, 0]}, {"Point": 2, "Uv": [0, 1]}],
        "Faces": [{"Wedges": [0, 1, 2]}]
    }]}}
]}"#;

pub const WALL_MATERIAL: &str = r#"{"Exports": [
    {"Type": "Material", "Name": "M_Wall", "Properties": [
        {"Name": "TextureParameterValues", "Value": {"Array": [
            {"Struct": [
                {"Name": "ParameterInfo", "Value": {"Struct": [{"Name": "Name", "Value": {"Name": "Diffuse"}}]}},
                {"Name": "ParameterValue", "Value": {"Object": "/Game/Textures/T_Wall.T_Wall"}}
            ]}
        ]}}
    ]}
]}"#;

pub fn texture(name: &str) -> String {
    format!(
        r#"{{"Exports": [{{"Type": "Texture2D", "Name": "{}", "Texture": {{"Format": "PF_DXT1", "Mips": [
            {{"Width": 4, "Height": 4, "Data": "{}"}}
        ]}}}}]}}"#,
        name, RED_DXT1
    )
}

/// A copy of the wall mesh under another name.
pub fn mesh(name: &str) -> String {
    WALL_MESH.replace("SM_Wall", name)
}

/// A material instance without parameters.
pub fn material(name: &str) -> String {
    format!(
        r#"{{"Exports": [{{"Type": "MaterialInstanceConstant", "Name": "{}"}}]}}"#,
        name
    )
}

/// A world whose persistent level lists `actors` (export indices). Index 0 is the world, 1 the level.
pub fn world(name: &str, actors: &[Option<usize>], world_props: &str, exports: &[&str]) -> String {
    let actors = actors
        .iter()
        .map(|actor| match actor {
            Some(index) => format!(r#"{{"Object": {}}}"#, index),
            None => r#"{"Object": null}"#.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut all = vec![
        format!(
            r#"{{"Type": "World", "Name": "{}", "Properties": [
                {{"Name": "PersistentLevel", "Value": {{"Object": 1}}}}{}
            ]}}"#,
            name,
            if world_props.is_empty() {
                String::new()
            } else {
                format!(", {}", world_props)
            }
        ),
        format!(
            r#"{{"Type": "Level", "Name": "PersistentLevel", "Properties": [
                {{"Name": "Actors", "Value": {{"Array": [{}]}}}}
            ]}}"#,
            actors
        ),
    ];
    all.extend(exports.iter().map(|export| export.to_string()));

    format!(r#"{{"Exports": [{}]}}"#, all.join(",\n"))
}

pub struct Fixture {
    pub paks: TempDir,
    pub out: TempDir,
}

impl Fixture {
    pub fn new() -> anyhow::Result<Self> {
        let fixture = Fixture {
            paks: tempfile::tempdir()?,
            out: tempfile::tempdir()?,
        };

        fixture
            .package("FortniteGame/Content/Meshes/SM_Wall", WALL_MESH)?
            .package("FortniteGame/Content/Materials/M_Wall", WALL_MATERIAL)?
            .package("FortniteGame/Content/Textures/T_Wall", &texture("T_Wall"))?;
        Ok(fixture)
    }

    pub fn package(&self, archive_path: &str, json: &str) -> anyhow::Result<&Self> {
        let path = self.paks.path().join(format!("{}.json", archive_path));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        Ok(self)
    }

    pub fn config(&self, root: &str) -> Config {
        Config {
            paks_directory: self.paks.path().to_path_buf(),
            export_package: root.to_string(),
            ..Config::default()
        }
    }

    /// Exports `config.export_package` with a fresh traversal and waits for all side files.
    pub fn run(&self, config: &Config) -> anyhow::Result<Result<String, ExportError>> {
        let provider = LooseFileProvider::new(
            &config.paks_directory,
            &config.encryption_keys,
            config.object_cache_size,
            None,
        )?;
        let materializer = Materializer::new(self.out.path(), 2, config.export_to_dds_when_possible)?;

        let result = WorldExporter::new(&provider, config, &materializer).export(&config.export_package);
        anyhow::ensure!(
            materializer.wait_idle(Duration::from_secs(60)),
            "materialization did not drain"
        );
        Ok(result)
    }

    pub fn output(&self, relative: &str) -> PathBuf {
        self.out.path().join(relative)
    }

    /// Parsed `jsons/<world>.processed.json`, `world` like `Game/Maps/Apollo`.
    pub fn nodes(&self, world: &str) -> anyhow::Result<Value> {
        read_json(&self.output(&format!("jsons/{}.processed.json", world)))
    }

    pub fn lights(&self, world: &str) -> anyhow::Result<Value> {
        read_json(&self.output(&format!("jsons/{}.lights.processed.json", world)))
    }
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

pub fn labels(nodes: &Value) -> Vec<String> {
    nodes
        .as_array()
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(|node| node[1].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
