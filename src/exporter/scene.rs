use std::sync::Arc;

use glam::{DQuat, DVec3};
use serde::ser::{SerializeMap, SerializeStruct, SerializeTuple};
use serde::{Serialize, Serializer};
use umap_files::common::types::Rotator;
use umap_files::package::types::{Export, PropertyBag};

/// Texture paths per uv channel: diffuse, normal, specular, emission, mask.
pub type UvTextureSet = [[Option<String>; 5]; 4];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRotation {
    Euler(Rotator),
    Quat(DQuat),
}

impl Serialize for NodeRotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeRotation::Euler(rotator) => rotator.to_array().serialize(serializer),
            NodeRotation::Quat(quat) => quat.to_array().serialize(serializer),
        }
    }
}

/// Material path to texture grid, in insertion order. Keys are unique, the first insert wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialMap {
    entries: Vec<(String, Option<UvTextureSet>)>,
}

impl MaterialMap {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == key)
    }

    /// Returns whether the entry was added.
    pub fn insert_if_absent(&mut self, key: String, textures: Option<UvTextureSet>) -> bool {
        if self.contains(&key) {
            return false;
        }

        self.entries.push((key, textures));
        true
    }

    pub fn get(&self, key: &str) -> Option<&Option<UvTextureSet>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, textures)| textures)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MaterialMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, textures) in &self.entries {
            map.serialize_entry(key, textures)?;
        }
        map.end()
    }
}

/// The textures a texture-data asset overrides for one slot, next to the asset's own path.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDataOverride {
    pub texture_data: String,
    /// Diffuse, normal, specular.
    pub textures: [Option<String>; 3],
}

impl Serialize for TextureDataOverride {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.texture_data, &self.textures).serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub location: DVec3,
    pub rotation: Rotator,
    pub scale: DVec3,
}

impl Serialize for InstanceTransform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.location, self.rotation.to_array(), self.scale).serialize(serializer)
    }
}

/// One flattened node. Serialized positionally, consumers index into the array.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub mesh: Option<String>,
    pub materials: Option<MaterialMap>,
    pub texture_data: Option<Vec<Option<TextureDataOverride>>>,
    pub location: DVec3,
    pub rotation: NodeRotation,
    pub scale: DVec3,
    pub children: Vec<Option<String>>,
    /// 0: none, > 0: 1-based light of the actor's class, < 0: 1-based light without a mesh parent.
    pub light_index: i64,
    pub instances: Vec<InstanceTransform>,
}

impl SceneNode {
    /// A node without geometry, used for lights and for nested worlds.
    pub fn container(id: String, label: String, location: DVec3, rotation: NodeRotation, scale: DVec3) -> Self {
        SceneNode {
            id,
            label,
            mesh: None,
            materials: None,
            texture_data: None,
            location,
            rotation,
            scale,
            children: vec![],
            light_index: 0,
            instances: vec![],
        }
    }
}

impl Serialize for SceneNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(11)?;
        tuple.serialize_element(&self.id)?;
        tuple.serialize_element(&self.label)?;
        tuple.serialize_element(&self.mesh)?;
        tuple.serialize_element(&self.materials)?;
        tuple.serialize_element(&self.texture_data)?;
        tuple.serialize_element(&self.location)?;
        tuple.serialize_element(&self.rotation)?;
        tuple.serialize_element(&self.scale)?;
        tuple.serialize_element(&self.children)?;
        tuple.serialize_element(&self.light_index)?;
        tuple.serialize_element(&self.instances)?;
        tuple.end()
    }
}

/// The light components found for one node, passed through as-is.
#[derive(Debug, Clone, Default)]
pub struct LightRecord {
    pub props: Vec<Arc<Export>>,
}

struct LightProps<'a>(&'a Export);

impl Serialize for LightProps<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rotation = self
            .0
            .properties
            .get_or("RelativeRotation", Rotator::ZERO)
            .normalized();

        let mut state = serializer.serialize_struct("LightProps", 4)?;
        state.serialize_field("Type", &self.0.class_name)?;
        state.serialize_field("Name", &self.0.name)?;
        state.serialize_field::<PropertyBag>("Properties", &self.0.properties)?;
        state.serialize_field("RelativeRotation", &rotation.to_array())?;
        state.end()
    }
}

impl Serialize for LightRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let props: Vec<LightProps> = self.props.iter().map(|export| LightProps(export)).collect();
        let mut state = serializer.serialize_struct("LightRecord", 1)?;
        state.serialize_field("Props", &props)?;
        state.end()
    }
}

/// Everything collected for one world, in visitation order. Both arrays only ever grow.
#[derive(Debug, Default)]
pub struct WorldScene {
    pub nodes: Vec<SceneNode>,
    pub lights: Vec<LightRecord>,
}

impl WorldScene {
    pub fn push(&mut self, node: SceneNode) {
        self.nodes.push(node);
    }

    /// Appends `record` and returns the new registry size, the 1-based index of the record.
    pub fn register_light(&mut self, record: LightRecord) -> i64 {
        self.lights.push(record);
        self.lights.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn nodes_are_positional() -> anyhow::Result<()> {
        let mut materials = MaterialMap::default();
        materials.insert_if_absent("/Game/M_Wall".to_string(), None);

        let node = SceneNode {
            id: "abc".to_string(),
            label: "Wall".to_string(),
            mesh: Some("/Game/SM_Wall".to_string()),
            materials: Some(materials),
            texture_data: Some(vec![
                None,
                Some(TextureDataOverride {
                    texture_data: "/Game/TD_Brick".to_string(),
                    textures: [Some("/Game/T_Brick_D".to_string()), None, None],
                }),
            ]),
            location: DVec3::new(1.0, 2.0, 3.0),
            rotation: NodeRotation::Euler(Rotator::new(0.0, 90.0, 0.0)),
            scale: DVec3::ONE,
            children: vec![None, Some("/Game/Maps/Child".to_string())],
            light_index: -2,
            instances: vec![InstanceTransform {
                location: DVec3::ZERO,
                rotation: Rotator::ZERO,
                scale: DVec3::ONE,
            }],
        };

        let json: Value = serde_json::to_value(&node)?;
        let expected: Value = serde_json::from_str(
            r#"["abc", "Wall", "/Game/SM_Wall", {"/Game/M_Wall": null},
                [null, ["/Game/TD_Brick", ["/Game/T_Brick_D", null, null]]],
                [1.0, 2.0, 3.0], [0.0, 90.0, 0.0], [1.0, 1.0, 1.0],
                [null, "/Game/Maps/Child"], -2,
                [[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]]]"#,
        )?;
        assert_eq!(json, expected);
        Ok(())
    }

    #[test]
    fn quaternion_rotation_has_four_components() -> anyhow::Result<()> {
        let node = SceneNode::container(
            "id".to_string(),
            "Streaming".to_string(),
            DVec3::ZERO,
            NodeRotation::Quat(DQuat::IDENTITY),
            DVec3::ONE,
        );

        let json: Value = serde_json::to_value(&node)?;
        assert_eq!(json[3], Value::Null);
        assert_eq!(json[4], Value::Null);
        assert_eq!(json[6], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
        assert_eq!(json[9], 0);
        Ok(())
    }

    #[test]
    fn material_map_keeps_the_first_entry() -> anyhow::Result<()> {
        let mut materials = MaterialMap::default();
        let mut grid: UvTextureSet = Default::default();
        grid[0][0] = Some("/Game/T_First".to_string());

        assert!(materials.insert_if_absent("/Game/M".to_string(), Some(grid)));
        assert!(!materials.insert_if_absent("/Game/M".to_string(), None));
        assert!(materials.insert_if_absent("0000000a".to_string(), None));

        let json = serde_json::to_string(&materials)?;
        assert!(json.starts_with(r#"{"/Game/M":[["/Game/T_First",null"#));
        assert_eq!(materials.keys().collect::<Vec<_>>(), vec!["/Game/M", "0000000a"]);
        Ok(())
    }

    #[test]
    fn light_ids_count_from_one() {
        let mut scene = WorldScene::default();
        assert_eq!(scene.register_light(LightRecord::default()), 1);
        assert_eq!(scene.register_light(LightRecord::default()), 2);
    }
}
