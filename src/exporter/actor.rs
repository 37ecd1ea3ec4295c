use glam::DVec3;
use log::{debug, warn};
use umap_files::common::types::{Guid, Rotator, Transform};
use umap_files::package::types::{ObjectRef, PropertyBag, SoftObjectPath};
use uuid::Uuid;

use crate::exporter::material::{Mat, ParamOverrides, merge_overrides, texture_data_param_names};
use crate::exporter::resolver::{BoundRef, ReferenceResolver, ResolvedObject};
use crate::exporter::scene::{
    InstanceTransform, LightRecord, MaterialMap, NodeRotation, SceneNode, TextureDataOverride, WorldScene,
};
use crate::exporter::world::WorldExporter;
use crate::exporter::{ExportError, soft_to_none};

const MAX_INSTANCE_DEPTH: usize = 16;
const KILL_VOLUME_CLASS: &str = "FortKillVolume_C";
const MESH_COMPONENT_PROPERTIES: [&str; 3] = ["StaticMeshComponent", "RootComponent", "Component"];
const LIGHT_COMPONENT_PROPERTIES: [&str; 2] = ["LightComponent", "RootComponent"];
const TEXTURE_DATA_KEYS: [&str; 3] = ["Diffuse", "Normal", "Specular"];

/// How an actor ends up in the scene, decided once per actor.
enum ActorKind {
    Light {
        component: ResolvedObject,
    },
    PartitionedWorld {
        runtime_hash: ResolvedObject,
        grid: PropertyBag,
    },
    StaticMesh {
        component: ResolvedObject,
    },
    InstancedMeshComponent {
        component: ResolvedObject,
    },
    Generic,
}

/// The persisted guid of the actor, or a fresh one.
fn node_id(actor: &ResolvedObject) -> String {
    actor
        .props()
        .get::<Guid>("MyGuid")
        .map(|guid| guid.to_string())
        .unwrap_or_else(fresh_id)
}

pub(crate) fn fresh_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl WorldExporter<'_> {
    pub(crate) fn process_actor(&mut self, scene: &mut WorldScene, actor: &ResolvedObject) -> Result<(), ExportError> {
        self.process_actor_at(scene, actor, 0)
    }

    fn process_actor_at(
        &mut self,
        scene: &mut WorldScene,
        actor: &ResolvedObject,
        depth: usize,
    ) -> Result<(), ExportError> {
        let resolver = ReferenceResolver::new(self.provider());

        // owned instance components come first, so importers see them before their owner
        let instance_components = actor
            .props()
            .get::<Vec<Option<ObjectRef>>>("InstanceComponents")
            .unwrap_or_default();
        for reference in instance_components.iter().flatten() {
            let Some(component) = resolver.resolve(&actor.package, reference) else {
                continue;
            };

            if component.is_same(actor) {
                continue;
            }

            if depth >= MAX_INSTANCE_DEPTH {
                warn!("Instance components of {} nest too deep, skipping", actor.name());
                break;
            }

            self.process_actor_at(scene, &component, depth + 1)?;
        }

        match ActorKind::classify(&resolver, actor) {
            ActorKind::Light { component } => {
                self.emit_light(scene, actor, &component);
                Ok(())
            }
            ActorKind::PartitionedWorld { runtime_hash, grid } => self.emit_partitioned(scene, actor, &runtime_hash, &grid),
            ActorKind::StaticMesh { component } => self.emit_mesh(scene, &resolver, actor, &component, false),
            ActorKind::InstancedMeshComponent { component } => {
                self.emit_mesh(scene, &resolver, actor, &component, true)
            }
            ActorKind::Generic => Ok(()),
        }
    }

    fn emit_light(&self, scene: &mut WorldScene, actor: &ResolvedObject, component: &ResolvedObject) {
        // lights point down unless they are area lights
        let default_rotation = if actor.export.is_rect_light() {
            Rotator::ZERO
        } else {
            Rotator::new(-90.0, 0.0, 0.0)
        };

        let props = component.props();
        let mut node = SceneNode::container(
            node_id(actor),
            actor.name().to_string(),
            props.get_or("RelativeLocation", DVec3::ZERO),
            NodeRotation::Euler(props.get_or("RelativeRotation", default_rotation)),
            props.get_or("RelativeScale3D", DVec3::ONE),
        );

        let count = scene.register_light(LightRecord {
            props: vec![component.export.clone()],
        });
        node.light_index = -count;
        scene.push(node);
    }

    fn emit_partitioned(
        &mut self,
        scene: &mut WorldScene,
        actor: &ResolvedObject,
        runtime_hash: &ResolvedObject,
        grid: &PropertyBag,
    ) -> Result<(), ExportError> {
        let children = self.flatten_grid(&runtime_hash.package, grid)?;
        if children.is_empty() {
            debug!("Streaming grid of {} has no cells", actor.name());
            return Ok(());
        }

        let mut node = SceneNode::container(
            fresh_id(),
            actor.name().to_string(),
            grid.get_or("Origin", DVec3::ZERO),
            NodeRotation::Euler(Rotator::ZERO),
            DVec3::ONE,
        );
        node.children = children;
        scene.push(node);
        Ok(())
    }

    fn emit_mesh(
        &mut self,
        scene: &mut WorldScene,
        resolver: &ReferenceResolver,
        actor: &ResolvedObject,
        component: &ResolvedObject,
        instanced: bool,
    ) -> Result<(), ExportError> {
        let Some(mesh) = find_mesh(resolver, actor, component) else {
            debug!("{} has no static mesh, skipping", actor.name());
            return Ok(());
        };

        let mut mats = self.export_mesh(resolver, &mesh);

        let mut materials = MaterialMap::default();
        let mut texture_data = vec![];
        if self.config().read_materials {
            let mut base_material = actor
                .props()
                .get::<ObjectRef>("BaseMaterial")
                .and_then(|reference| resolver.resolve(&actor.package, &reference));
            let override_materials = component
                .props()
                .get::<Vec<Option<ObjectRef>>>("OverrideMaterials")
                .unwrap_or_default();

            let mut overrides: Vec<ParamOverrides> = vec![];
            for (index, reference) in actor
                .props()
                .get_indexed::<ObjectRef>("TextureData")
                .into_iter()
                .enumerate()
            {
                let Some(td) = reference.and_then(|reference| resolver.resolve(&actor.package, &reference)) else {
                    texture_data.push(None);
                    overrides.push(vec![]);
                    continue;
                };

                let (entry, params) = self.read_texture_data(resolver, &td, index)?;
                texture_data.push(Some(entry));
                overrides.push(params);

                // a texture data material replaces the base material from here on
                if let Some(material) = resolver.follow(&td, "OverrideMaterial") {
                    base_material = Some(material);
                }
            }

            let overrides = merge_overrides(&overrides);
            for (index, mat) in mats.iter_mut().enumerate() {
                let override_material = override_materials
                    .get(index)
                    .cloned()
                    .flatten()
                    .and_then(|reference| resolver.resolve(&component.package, &reference));

                if let Some(material) = override_material.or_else(|| base_material.clone()) {
                    mat.material = Some(material);
                }

                mat.populate_textures(resolver);
                mat.add_to(
                    &mut materials,
                    &overrides,
                    &self.config().textures,
                    resolver,
                    self.materializer(),
                )?;
            }
        }

        let mut children = vec![];
        if self.config().export_building_foundations {
            let additional_worlds = actor
                .props()
                .get::<Vec<SoftObjectPath>>("AdditionalWorlds")
                .unwrap_or_default();
            for world in additional_worlds {
                children.push(soft_to_none(self.export(&world.asset_path_name))?);
            }
        }

        let light_index = match class_lights(resolver, actor) {
            Some(record) => scene.register_light(record),
            None => 0,
        };

        let instances = if instanced {
            instance_transforms(actor)
        } else {
            vec![]
        };

        let props = component.props();
        scene.push(SceneNode {
            id: node_id(actor),
            label: actor.name().to_string(),
            mesh: Some(mesh.dir_path()),
            materials: Some(materials),
            texture_data: Some(texture_data),
            location: props.get_or("RelativeLocation", DVec3::ZERO),
            rotation: NodeRotation::Euler(props.get_or("RelativeRotation", Rotator::ZERO)),
            scale: props.get_or("RelativeScale3D", DVec3::ONE),
            children,
            light_index,
            instances,
        });

        Ok(())
    }

    /// Queues the mesh for export and returns one material slot per mesh material.
    fn export_mesh(&self, resolver: &ReferenceResolver, mesh: &ResolvedObject) -> Vec<Mat> {
        let slots = mesh
            .props()
            .get::<Vec<PropertyBag>>("StaticMaterials")
            .unwrap_or_default();

        let mut slot_names = vec![];
        let mut mats = vec![];
        for (index, slot) in slots.iter().enumerate() {
            let material = slot
                .get::<ObjectRef>("MaterialInterface")
                .and_then(|reference| resolver.resolve(&mesh.package, &reference));

            slot_names.push(
                slot.get::<String>("MaterialSlotName")
                    .or_else(|| material.as_ref().map(|material| material.name().to_string()))
                    .unwrap_or_else(|| format!("Material_{}", index)),
            );
            mats.push(Mat::new(material, index));
        }

        self.materializer().export_mesh(&mesh.export, slot_names);

        if self.config().read_materials { mats } else { vec![] }
    }

    /// Reads the diffuse, normal and specular texture of a texture data asset. Returns the node entry and the
    /// parameter bindings the textures override.
    fn read_texture_data(
        &self,
        resolver: &ReferenceResolver,
        td: &ResolvedObject,
        index: usize,
    ) -> Result<(TextureDataOverride, ParamOverrides), ExportError> {
        let names = texture_data_param_names(index);
        let mut textures: [Option<String>; 3] = Default::default();
        let mut params = vec![];

        for (slot, key) in TEXTURE_DATA_KEYS.iter().enumerate() {
            let Some(reference) = td.props().get::<ObjectRef>(key) else {
                continue;
            };

            let bound = BoundRef::new(&td.package, reference);
            let path = match resolver.resolve_bound(&bound) {
                Some(texture) => {
                    self.materializer().export_texture(&texture.export)?;
                    Some(texture.dir_path())
                }
                None => bound.dir_path(),
            };

            if let Some(path) = path {
                params.push((names[slot].clone(), path.clone()));
                textures[slot] = Some(path);
            }
        }

        Ok((
            TextureDataOverride {
                texture_data: td.dir_path(),
                textures,
            },
            params,
        ))
    }
}

impl ActorKind {
    fn classify(resolver: &ReferenceResolver, actor: &ResolvedObject) -> ActorKind {
        if actor.export.is_light_actor() {
            return LIGHT_COMPONENT_PROPERTIES
                .iter()
                .filter_map(|name| resolver.follow(actor, name))
                .find(|component| component.export.is_light_component())
                .map_or(ActorKind::Generic, |component| ActorKind::Light { component });
        }

        let runtime_hash = resolver
            .follow(actor, "WorldPartition")
            .and_then(|partition| resolver.follow(&partition, "RuntimeHash"));
        if let Some(runtime_hash) = runtime_hash {
            if let Some(grids) = runtime_hash
                .props()
                .get::<Vec<PropertyBag>>("StreamingGrids")
            {
                let grid = grids.into_iter().find(|grid| {
                    grid.get::<String>("GridName")
                        .is_some_and(|name| !name.starts_with("HLOD"))
                });

                return match grid {
                    Some(grid) => ActorKind::PartitionedWorld { runtime_hash, grid },
                    None => ActorKind::Generic,
                };
            }
        }

        let component = MESH_COMPONENT_PROPERTIES
            .iter()
            .find_map(|name| resolver.follow(actor, name));

        if actor.export.is_instanced_static_mesh_component() {
            return ActorKind::InstancedMeshComponent {
                component: component.unwrap_or_else(|| actor.clone()),
            };
        }

        match component {
            Some(component) => ActorKind::StaticMesh { component },
            None => ActorKind::Generic,
        }
    }
}

/// The component's mesh, else the first mesh referenced from the actor's blueprint package, else from the package
/// of its parent blueprint.
fn find_mesh(resolver: &ReferenceResolver, actor: &ResolvedObject, component: &ResolvedObject) -> Option<ResolvedObject> {
    if let Some(mesh) = resolver.follow(component, "StaticMesh") {
        return Some(mesh);
    }

    let class = actor
        .export
        .class
        .as_ref()
        .and_then(|class| resolver.resolve(&actor.package, class))
        .filter(|class| class.export.is_blueprint_class())?;

    mesh_in_package_of(resolver, &class).or_else(|| {
        let super_class = class
            .export
            .super_struct
            .as_ref()
            .and_then(|super_struct| resolver.resolve(&class.package, super_struct))?;
        mesh_in_package_of(resolver, &super_class)
    })
}

fn mesh_in_package_of(resolver: &ReferenceResolver, class: &ResolvedObject) -> Option<ResolvedObject> {
    class
        .package
        .exports
        .iter()
        .filter(|export| export.class_name != KILL_VOLUME_CLASS)
        .filter_map(|export| export.properties.get::<ObjectRef>("StaticMesh"))
        .find_map(|reference| resolver.resolve(&class.package, &reference))
}

/// All light components of the package that defines the actor's class.
fn class_lights(resolver: &ReferenceResolver, actor: &ResolvedObject) -> Option<LightRecord> {
    let class = actor
        .export
        .class
        .as_ref()
        .and_then(|class| resolver.resolve(&actor.package, class))?;

    let props = class
        .package
        .exports
        .iter()
        .filter(|export| export.is_light_component())
        .cloned()
        .collect::<Vec<_>>();

    (!props.is_empty()).then_some(LightRecord { props })
}

fn instance_transforms(component: &ResolvedObject) -> Vec<InstanceTransform> {
    component
        .props()
        .get::<Vec<PropertyBag>>("PerInstanceSMData")
        .unwrap_or_default()
        .iter()
        .map(|instance| {
            let transform = instance.get_or("TransformData", Transform::IDENTITY);
            InstanceTransform {
                location: transform.translation,
                rotation: Rotator::from_quat(transform.rotation),
                scale: transform.scale_3d,
            }
        })
        .collect()
}
