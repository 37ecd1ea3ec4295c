use log::{trace, warn};
use umap_files::package::types::{ObjectRef, PropertyBag, PropertyValue};

use crate::exporter::resolver::{BoundRef, ReferenceResolver, ResolvedObject};
use crate::exporter::scene::{MaterialMap, UvTextureSet};
use crate::materialize::Materializer;
use crate::settings::TextureMapping;

const MAX_PARENT_DEPTH: usize = 32;
const TEXTURE_SAMPLE_PARAMETER: &str = "MaterialExpressionTextureSampleParameter2D";

/// Texture parameter name to canonical texture path, as contributed by the texture-data assets of an actor.
pub type ParamOverrides = Vec<(String, String)>;

/// Parameter names the diffuse, normal and specular texture of the `index`th texture-data asset bind to.
pub fn texture_data_param_names(index: usize) -> [String; 3] {
    if index == 0 {
        ["Diffuse".to_string(), "Normals".to_string(), "SpecularMasks".to_string()]
    } else {
        [
            format!("Diffuse_Texture_{}", index + 1),
            format!("Normals_Texture_{}", index + 1),
            format!("SpecularMasks_{}", index + 1),
        ]
    }
}

/// Flattens the overrides of all texture-data slots, earlier slots win on a name collision.
pub fn merge_overrides(per_slot: &[ParamOverrides]) -> ParamOverrides {
    let mut merged: ParamOverrides = vec![];
    for (name, path) in per_slot.iter().flatten() {
        if !merged
            .iter()
            .any(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            merged.push((name.clone(), path.clone()));
        }
    }

    merged
}

/// The parameter bindings of one material slot of a mesh.
pub struct Mat {
    pub material: Option<ResolvedObject>,
    slot_index: usize,
    /// Name of the base material at the end of the parent chain.
    shader_name: Option<String>,
    texture_params: Vec<(String, BoundRef)>,
    scalar_params: Vec<(String, f64)>,
    /// Linear RGBA.
    vector_params: Vec<(String, [f64; 4])>,
}

impl Mat {
    pub fn new(material: Option<ResolvedObject>, slot_index: usize) -> Self {
        Mat {
            material,
            slot_index,
            shader_name: None,
            texture_params: vec![],
            scalar_params: vec![],
            vector_params: vec![],
        }
    }

    pub fn shader_name(&self) -> Option<&str> {
        self.shader_name.as_deref()
    }

    pub fn scalar_param(&self, name: &str) -> Option<f64> {
        find_param(&self.scalar_params, name).copied()
    }

    pub fn vector_param(&self, name: &str) -> Option<[f64; 4]> {
        find_param(&self.vector_params, name).copied()
    }

    pub fn texture_param(&self, name: &str) -> Option<&BoundRef> {
        find_param(&self.texture_params, name)
    }

    /// Collects texture, scalar and vector parameters of the material and, for instances, of its parents. Parameters closer to the
    /// instance shadow the ones of its parents.
    pub fn populate_textures(&mut self, resolver: &ReferenceResolver) {
        if let Some(material) = self.material.clone() {
            self.populate_from(resolver, &material, 0);
        }
    }

    fn populate_from(&mut self, resolver: &ReferenceResolver, material: &ResolvedObject, depth: usize) {
        if !material.export.is_material_interface() {
            return;
        }

        if depth >= MAX_PARENT_DEPTH {
            warn!("Parent chain of {} is too deep, stopping", material.dir_path());
            return;
        }

        if !material.export.is_material_instance() {
            self.shader_name = Some(material.name().to_string());
        }

        // older materials wire textures straight into the material inputs
        for tag in material.props().iter() {
            let PropertyValue::ExpressionInput(input) = &tag.value else {
                continue;
            };

            let texture = input
                .expression
                .as_deref()
                .and_then(|expression| material.package.find_export(expression))
                .and_then(|expression| expression.properties.get::<ObjectRef>("Texture"));

            if let Some(texture) = texture {
                self.insert_param(&tag.name, BoundRef::new(&material.package, texture));
            }
        }

        let expressions = material
            .props()
            .get::<Vec<Option<ObjectRef>>>("Expressions")
            .unwrap_or_default();
        for expression in expressions
            .iter()
            .flatten()
            .filter_map(|reference| resolver.resolve(&material.package, reference))
            .filter(|expression| expression.class_name() == TEXTURE_SAMPLE_PARAMETER)
        {
            let name = expression
                .props()
                .get::<String>("ParameterName")
                .filter(|name| is_valid_name(name));
            let texture = expression.props().get::<ObjectRef>("Texture");

            if let (Some(name), Some(texture)) = (name, texture) {
                self.insert_param(&name, BoundRef::new(&expression.package, texture));
            }
        }

        let values = material
            .props()
            .get::<Vec<PropertyBag>>("TextureParameterValues")
            .unwrap_or_default();
        for value in values {
            let texture = value.get::<ObjectRef>("ParameterValue");
            if let (Some(name), Some(texture)) = (parameter_name(&value), texture) {
                self.insert_param(&name, BoundRef::new(&material.package, texture));
            }
        }

        for value in material
            .props()
            .get::<Vec<PropertyBag>>("ScalarParameterValues")
            .unwrap_or_default()
        {
            if let (Some(name), Some(scalar)) = (parameter_name(&value), value.get::<f64>("ParameterValue")) {
                insert_first(&mut self.scalar_params, name, scalar);
            }
        }

        for value in material
            .props()
            .get::<Vec<PropertyBag>>("VectorParameterValues")
            .unwrap_or_default()
        {
            let color = value
                .get::<PropertyBag>("ParameterValue")
                .map(|color| ["R", "G", "B", "A"].map(|channel| color.get_or(channel, 0.0)));

            if let (Some(name), Some(color)) = (parameter_name(&value), color) {
                insert_first(&mut self.vector_params, name, color);
            }
        }

        if material.export.is_material_instance() {
            if let Some(parent) = resolver.follow(material, "Parent") {
                self.populate_from(resolver, &parent, depth + 1);
            }
        }
    }

    fn insert_param(&mut self, name: &str, texture: BoundRef) {
        insert_first(&mut self.texture_params, name.to_string(), texture);
    }

    /// Adds this slot to `map` under the material's canonical path unless an earlier slot already did. Every
    /// uv channel and texture kind takes the first alias that either an override or the material binds; the
    /// material's own textures get exported on the way.
    pub fn add_to(
        &self,
        map: &mut MaterialMap,
        overrides: &ParamOverrides,
        mapping: &TextureMapping,
        resolver: &ReferenceResolver,
        materializer: &Materializer,
    ) -> anyhow::Result<()> {
        let Some(material) = &self.material else {
            map.insert_if_absent(format!("{:08x}", self.slot_index), None);
            return Ok(());
        };

        let key = material.dir_path();
        if map.contains(&key) {
            return Ok(());
        }

        trace!(
            "{}: shader {}, {} scalar and {} vector parameters",
            key,
            self.shader_name().unwrap_or("None"),
            self.scalar_params.len(),
            self.vector_params.len()
        );

        let mut textures: UvTextureSet = Default::default();
        for (uv, texture_map) in mapping.uv_sets().into_iter().enumerate() {
            for (kind, aliases) in texture_map.slots().into_iter().enumerate() {
                textures[uv][kind] = self.select(aliases, overrides, resolver, materializer)?;
            }
        }

        map.insert_if_absent(key, Some(textures));
        Ok(())
    }

    fn select(
        &self,
        aliases: &[String],
        overrides: &ParamOverrides,
        resolver: &ReferenceResolver,
        materializer: &Materializer,
    ) -> anyhow::Result<Option<String>> {
        for alias in aliases {
            if let Some((_, path)) = overrides
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(alias))
            {
                return Ok(Some(path.clone()));
            }

            let Some(texture) = self.texture_param(alias) else {
                continue;
            };

            return match resolver.resolve_bound(texture) {
                Some(resolved) => {
                    materializer.export_texture(&resolved.export)?;
                    Ok(Some(resolved.dir_path()))
                }
                None => Ok(texture.dir_path()),
            };
        }

        Ok(None)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.eq_ignore_ascii_case("None")
}

/// `ParameterInfo.Name` of a parameter value struct.
fn parameter_name(value: &PropertyBag) -> Option<String> {
    value
        .get::<PropertyBag>("ParameterInfo")
        .and_then(|info| info.get::<String>("Name"))
        .filter(|name| is_valid_name(name))
}

fn find_param<'a, T>(params: &'a [(String, T)], name: &str) -> Option<&'a T> {
    params
        .iter()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

/// Parameters seen first, i.e. closer to the instance, shadow later ones.
fn insert_first<T>(params: &mut Vec<(String, T)>, name: String, value: T) {
    if find_param(params, &name).is_none() {
        params.push((name, value));
    }
}
