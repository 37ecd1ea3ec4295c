use std::sync::Arc;

use umap_files::package::types::{Export, ObjectRef, Package, PropertyBag};

use crate::io::common::loader::{AssetProvider, object_name_of};
use crate::util::paths::{compact_file_path, object_dir_path, strip_object_suffix};

/// A loaded export together with the package its export index references are relative to.
#[derive(Debug, Clone)]
pub struct ResolvedObject {
    pub package: Arc<Package>,
    pub export: Arc<Export>,
}

impl ResolvedObject {
    pub fn props(&self) -> &PropertyBag {
        &self.export.properties
    }

    pub fn name(&self) -> &str {
        &self.export.name
    }

    pub fn class_name(&self) -> &str {
        &self.export.class_name
    }

    /// Canonical path, e.g. `/Game/Meshes/SM_Wall`.
    pub fn dir_path(&self) -> String {
        object_dir_path(&self.package.name, &self.export.name)
    }

    pub fn is_same(&self, other: &ResolvedObject) -> bool {
        Arc::ptr_eq(&self.export, &other.export)
    }
}

/// A reference that has not been loaded yet, kept with the package it was read from.
#[derive(Debug, Clone)]
pub struct BoundRef {
    pub owner: Arc<Package>,
    pub reference: ObjectRef,
}

impl BoundRef {
    pub fn new(owner: &Arc<Package>, reference: ObjectRef) -> Self {
        BoundRef {
            owner: owner.clone(),
            reference,
        }
    }

    /// Canonical path of the referenced object, derived from the reference alone. `None` for dangling indices.
    pub fn dir_path(&self) -> Option<String> {
        match &self.reference {
            ObjectRef::Export(index) => self
                .owner
                .export(*index)
                .map(|export| object_dir_path(&self.owner.name, &export.name)),
            ObjectRef::Path(path) => Some(object_dir_path(
                &compact_file_path(strip_object_suffix(path)),
                object_name_of(path),
            )),
        }
    }
}

pub struct ReferenceResolver<'a> {
    provider: &'a dyn AssetProvider,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(provider: &'a dyn AssetProvider) -> Self {
        ReferenceResolver { provider }
    }

    pub fn provider(&self) -> &'a dyn AssetProvider {
        self.provider
    }

    /// Index references resolve inside `owner`, path references are loaded through the provider. Misses are `None`.
    pub fn resolve(&self, owner: &Arc<Package>, reference: &ObjectRef) -> Option<ResolvedObject> {
        match reference {
            ObjectRef::Export(index) => owner.export(*index).map(|export| ResolvedObject {
                package: owner.clone(),
                export: export.clone(),
            }),
            ObjectRef::Path(path) => self.load_object(path),
        }
    }

    pub fn resolve_bound(&self, bound: &BoundRef) -> Option<ResolvedObject> {
        self.resolve(&bound.owner, &bound.reference)
    }

    /// Follows the object property `name` of `object`.
    pub fn follow(&self, object: &ResolvedObject, name: &str) -> Option<ResolvedObject> {
        let reference = object.props().get::<ObjectRef>(name)?;
        self.resolve(&object.package, &reference)
    }

    pub fn load_object(&self, path: &str) -> Option<ResolvedObject> {
        let export = self.provider.try_load_object(path)?;
        let package = self.provider.try_load_package(&export.package_name)?;
        Some(ResolvedObject { package, export })
    }
}
