use std::sync::Arc;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::common::types::{Guid, Rotator, Transform};
use crate::mesh::types::StaticMeshData;
use crate::texture::types::TextureData;

/// Reference to another object. Either an index into the exports of the package that contains the reference, or a
/// full object path (`/Game/Dir/Package.Object`) into another package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Export(usize),
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoftObjectPath {
    pub asset_path_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionInput {
    #[serde(default)]
    pub expression: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Name(String),
    Object(Option<ObjectRef>),
    SoftObject(Option<SoftObjectPath>),
    Guid(Guid),
    Vector(DVec3),
    Rotator(Rotator),
    Quat(DQuat),
    Transform(Transform),
    ExpressionInput(ExpressionInput),
    Struct(PropertyBag),
    Array(Vec<PropertyValue>),
    /// Any property kind not modeled above, or a known kind with a malformed payload (e.g. a guid that isn't 32 hex
    /// digits). Kept verbatim so a single odd tag doesn't fail the whole package, typed access yields `None`.
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PropertyTag {
    pub name: String,
    #[serde(default)]
    pub array_index: usize,
    pub value: PropertyValue,
}

/// Typed access into a property value. A value of the wrong kind converts to `None` rather than an error, callers
/// decide on defaults.
pub trait FromProperty: Sized {
    fn from_property(value: &PropertyValue) -> Option<Self>;
}

/// The tagged properties of an object or struct, in serialization order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(pub Vec<PropertyTag>);

impl PropertyBag {
    pub fn iter(&self) -> impl Iterator<Item = &PropertyTag> {
        self.0.iter()
    }

    /// First tag with that name, names compare case-insensitively like engine names do.
    pub fn find(&self, name: &str) -> Option<&PropertyTag> {
        self.0.iter().find(|tag| tag.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn get<T: FromProperty>(&self, name: &str) -> Option<T> {
        self.find(name)
            .and_then(|tag| T::from_property(&tag.value))
    }

    pub fn get_or<T: FromProperty>(&self, name: &str, default: T) -> T {
        self.get(name).unwrap_or(default)
    }

    /// Collects every tag sharing `name` into a dense vector sized by the highest array index. Indices without a
    /// tag (or with a value of the wrong kind) stay `None`.
    pub fn get_indexed<T: FromProperty>(&self, name: &str) -> Vec<Option<T>> {
        let tags: Vec<&PropertyTag> = self
            .0
            .iter()
            .filter(|tag| tag.name.eq_ignore_ascii_case(name))
            .collect();

        let len = tags
            .iter()
            .map(|tag| tag.array_index + 1)
            .max()
            .unwrap_or(0);

        let mut values: Vec<Option<T>> = (0..len).map(|_| None).collect();
        for tag in tags {
            if values[tag.array_index].is_none() {
                values[tag.array_index] = T::from_property(&tag.value);
            }
        }

        values
    }
}

impl FromProperty for bool {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromProperty for i64 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromProperty for f64 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromProperty for String {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Str(s) | PropertyValue::Name(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromProperty for ObjectRef {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Object(reference) => reference.clone(),
            _ => None,
        }
    }
}

impl FromProperty for SoftObjectPath {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::SoftObject(path) => path.clone(),
            _ => None,
        }
    }
}

impl FromProperty for Guid {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Guid(guid) => Some(*guid),
            _ => None,
        }
    }
}

impl FromProperty for DVec3 {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromProperty for Rotator {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Rotator(r) => Some(*r),
            _ => None,
        }
    }
}

impl FromProperty for DQuat {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Quat(q) => Some(*q),
            _ => None,
        }
    }
}

impl FromProperty for Transform {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Transform(t) => Some(*t),
            _ => None,
        }
    }
}

impl FromProperty for ExpressionInput {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::ExpressionInput(input) => Some(input.clone()),
            _ => None,
        }
    }
}

impl FromProperty for PropertyBag {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Struct(bag) => Some(bag.clone()),
            _ => None,
        }
    }
}

/// Keeps the slot even if the element doesn't convert, e.g. null entries of an object array.
impl<T: FromProperty> FromProperty for Option<T> {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        Some(T::from_property(value))
    }
}

impl<T: FromProperty> FromProperty for Vec<T> {
    fn from_property(value: &PropertyValue) -> Option<Self> {
        match value {
            PropertyValue::Array(values) => values.iter().map(T::from_property).collect(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Export {
    #[serde(rename = "Type")]
    pub class_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_struct: Option<ObjectRef>,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_mesh: Option<StaticMeshData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<TextureData>,
    /// Archive path of the owning package, filled in by the reader.
    #[serde(skip)]
    pub package_name: String,
}

pub const LIGHT_ACTOR_TYPES: [&str; 4] = ["PointLight", "SpotLight", "RectLight", "DirectionalLight"];

impl Export {
    /// `<package>.<object>`
    pub fn path_name(&self) -> String {
        format!("{}.{}", self.package_name, self.name)
    }

    pub fn is_world(&self) -> bool {
        self.class_name == "World"
    }

    pub fn is_level(&self) -> bool {
        self.class_name == "Level"
    }

    pub fn is_light_actor(&self) -> bool {
        LIGHT_ACTOR_TYPES.contains(&self.class_name.as_str())
    }

    pub fn is_rect_light(&self) -> bool {
        self.class_name.starts_with("RectLight")
    }

    pub fn is_light_component(&self) -> bool {
        self.class_name.ends_with("LightComponent")
    }

    pub fn is_material_instance(&self) -> bool {
        self.class_name.starts_with("MaterialInstance")
    }

    pub fn is_material_interface(&self) -> bool {
        self.class_name == "Material" || self.is_material_instance()
    }

    pub fn is_instanced_static_mesh_component(&self) -> bool {
        self.class_name.ends_with("InstancedStaticMeshComponent")
    }

    pub fn is_texture_2d(&self) -> bool {
        self.class_name == "Texture2D"
    }

    pub fn is_blueprint_class(&self) -> bool {
        self.class_name == "BlueprintGeneratedClass"
    }
}

#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Archive path without extension, e.g. `FortniteGame/Content/Maps/Apollo`.
    pub name: String,
    pub exports: Vec<Arc<Export>>,
}

impl Package {
    pub fn export(&self, index: usize) -> Option<&Arc<Export>> {
        self.exports.get(index)
    }

    pub fn find_export(&self, name: &str) -> Option<&Arc<Export>> {
        self.exports
            .iter()
            .find(|export| export.name.eq_ignore_ascii_case(name))
    }

    pub fn first_of_type(&self, class_name: &str) -> Option<&Arc<Export>> {
        self.exports
            .iter()
            .find(|export| export.class_name == class_name)
    }

    /// Last path segment, the name the main export usually shares.
    pub fn short_name(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map_or(self.name.as_str(), |(_, name)| name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PackageDocument {
    #[serde(default)]
    pub exports: Vec<Export>,
}
