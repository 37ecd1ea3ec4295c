use std::io::{Read, Write};
use std::sync::Arc;

use serde::Serialize;

use crate::PackageError;
use crate::package::types::{Export, Package, PackageDocument};

pub struct PackageReader {}

impl PackageReader {
    /// Parses an extracted package document (`{"Exports": [...]}`). `name` is the archive path of the package
    /// without extension and becomes the owner of every export.
    pub fn parse_package<R: Read>(rdr: &mut R, name: &str) -> Result<Package, PackageError> {
        let document: PackageDocument = serde_json::from_reader(rdr)?;

        if document
            .exports
            .iter()
            .any(|export| export.name.is_empty() || export.class_name.is_empty())
        {
            return Err(PackageError::format(format!(
                "{} contains an export without name or type",
                name
            )));
        }

        let exports = document
            .exports
            .into_iter()
            .map(|mut export| {
                export.package_name = name.to_string();
                Arc::new(export)
            })
            .collect();

        Ok(Package {
            name: name.to_string(),
            exports,
        })
    }

    pub fn dump_package<W: Write>(wtr: &mut W, package: &Package) -> Result<(), PackageError> {
        let document = DumpDocument {
            exports: package.exports.iter().map(|export| export.as_ref()).collect(),
        };
        serde_json::to_writer_pretty(wtr, &document)?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DumpDocument<'a> {
    exports: Vec<&'a Export>,
}
