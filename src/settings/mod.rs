use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use umap_files::common::types::Guid;

#[derive(Parser, Debug)]
#[command(name = "umap-exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Flattens extracted game worlds into scene descriptions for downstream importers")]
pub struct CliArgs {
    #[arg(long, env = "UMAP_CONFIG", default_value = "config.json")]
    pub config: PathBuf,

    /// Root of everything written: `jsons/`, the exported assets and `processed.json`.
    #[arg(long, env = "UMAP_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Overrides `ExportPackage` of the config file.
    #[arg(long)]
    pub export_package: Option<String>,

    #[arg(long, env = "UMAP_WORKERS", default_value_t = default_workers())]
    pub workers: usize,
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncryptionKey {
    #[serde(rename = "Guid", default)]
    pub guid: Option<Guid>,
    #[serde(rename = "FileName", default)]
    pub file_name: Option<String>,
    #[serde(rename = "Key")]
    pub key: String,
}

impl EncryptionKey {
    /// `0x` followed by the 64 hex digits of an AES-256 key.
    pub fn is_well_formed(&self) -> bool {
        self.key
            .strip_prefix("0x")
            .or_else(|| self.key.strip_prefix("0X"))
            .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

/// Parameter names probed, in order, for each texture slot of one uv channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMap {
    #[serde(rename = "Diffuse", default)]
    pub diffuse: Vec<String>,
    #[serde(rename = "Normal", default)]
    pub normal: Vec<String>,
    #[serde(rename = "Specular", default)]
    pub specular: Vec<String>,
    #[serde(rename = "Emission", default)]
    pub emission: Vec<String>,
    #[serde(rename = "MaskTexture", default)]
    pub mask_texture: Vec<String>,
}

impl TextureMap {
    fn of(diffuse: &[&str], normal: &[&str], specular: &[&str], emission: &[&str], mask: &[&str]) -> Self {
        let own = |names: &[&str]| names.iter().map(|name| name.to_string()).collect_vec();
        TextureMap {
            diffuse: own(diffuse),
            normal: own(normal),
            specular: own(specular),
            emission: own(emission),
            mask_texture: own(mask),
        }
    }

    fn suffixed(suffix: &str) -> Self {
        TextureMap {
            diffuse: vec![format!("Diffuse_Texture{}", suffix)],
            normal: vec![format!("Normals_Texture{}", suffix)],
            specular: vec![format!("SpecularMasks{}", suffix)],
            emission: vec![format!("EmissiveTexture{}", suffix)],
            mask_texture: vec![format!("MaskTexture{}", suffix)],
        }
    }

    /// Diffuse, normal, specular, emission, mask.
    pub fn slots(&self) -> [&[String]; 5] {
        [
            self.diffuse.as_slice(),
            self.normal.as_slice(),
            self.specular.as_slice(),
            self.emission.as_slice(),
            self.mask_texture.as_slice(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureMapping {
    #[serde(rename = "UV1", default = "TextureMapping::default_uv1")]
    pub uv1: TextureMap,
    #[serde(rename = "UV2", default = "TextureMapping::default_uv2")]
    pub uv2: TextureMap,
    #[serde(rename = "UV3", default = "TextureMapping::default_uv3")]
    pub uv3: TextureMap,
    #[serde(rename = "UV4", default = "TextureMapping::default_uv4")]
    pub uv4: TextureMap,
}

impl TextureMapping {
    fn default_uv1() -> TextureMap {
        TextureMap::of(
            &["Trunk_BaseColor", "Diffuse", "DiffuseTexture", "Base_Color_Tex", "Tex_Color"],
            &["Trunk_Normal", "Normals", "Normal", "Base_Normal_Tex", "Tex_Normal"],
            &["Trunk_Specular", "SpecularMasks"],
            &["EmissiveTexture"],
            &["MaskTexture"],
        )
    }

    // the second uv channel maps the third texture set, building materials are authored that way
    fn default_uv2() -> TextureMap {
        TextureMap::suffixed("_3")
    }

    fn default_uv3() -> TextureMap {
        TextureMap::suffixed("_4")
    }

    fn default_uv4() -> TextureMap {
        TextureMap::suffixed("_2")
    }

    pub fn uv_sets(&self) -> [&TextureMap; 4] {
        [&self.uv1, &self.uv2, &self.uv3, &self.uv4]
    }
}

impl Default for TextureMapping {
    fn default() -> Self {
        TextureMapping {
            uv1: TextureMapping::default_uv1(),
            uv2: TextureMapping::default_uv2(),
            uv3: TextureMapping::default_uv3(),
            uv4: TextureMapping::default_uv4(),
        }
    }
}

fn yes() -> bool {
    true
}

fn default_cache_size() -> usize {
    100
}

fn default_ue_version() -> String {
    "GAME_UE5_LATEST".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "PaksDirectory", default)]
    pub paks_directory: PathBuf,
    #[serde(rename = "UEVersion", default = "default_ue_version")]
    pub ue_version: String,
    #[serde(rename = "EncryptionKeys", default)]
    pub encryption_keys: Vec<EncryptionKey>,
    #[serde(rename = "bDumpAssets", default)]
    pub dump_assets: bool,
    #[serde(rename = "ObjectCacheSize", default = "default_cache_size")]
    pub object_cache_size: usize,
    #[serde(rename = "bReadMaterials", default = "yes")]
    pub read_materials: bool,
    #[serde(rename = "bExportToDDSWhenPossible", default)]
    pub export_to_dds_when_possible: bool,
    #[serde(rename = "bExportBuildingFoundations", default = "yes")]
    pub export_building_foundations: bool,
    #[serde(rename = "ExportPackage", default)]
    pub export_package: String,
    #[serde(rename = "Textures", default)]
    pub textures: TextureMapping,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            paks_directory: PathBuf::new(),
            ue_version: default_ue_version(),
            encryption_keys: vec![],
            dump_assets: false,
            object_cache_size: default_cache_size(),
            read_materials: true,
            export_to_dds_when_possible: false,
            export_building_foundations: true,
            export_package: String::new(),
            textures: TextureMapping::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let file = File::open(path).with_context(|| format!("config.json not found at {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Everything that has to hold before a traversal may start.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.paks_directory.is_dir() {
            bail!("Directory {} not found.", self.paks_directory.display());
        }

        if self.export_package.trim().is_empty() {
            bail!("Please specify ExportPackage.");
        }

        if self.object_cache_size == 0 {
            bail!("ObjectCacheSize has to be at least 1.");
        }

        if let Some(key) = self
            .encryption_keys
            .iter()
            .find(|key| !key.is_well_formed())
        {
            bail!(
                "Encryption key for {} is not a 0x prefixed 256 bit hex key.",
                key.file_name
                    .clone()
                    .or_else(|| key.guid.map(|guid| guid.to_string()))
                    .unwrap_or_default()
            );
        }

        Ok(())
    }
}
