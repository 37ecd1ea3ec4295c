use std::path::{Path, PathBuf};

use crate::util::{substring_after, substring_after_last, substring_before_last};

pub const JSONS_FOLDER: &str = "jsons";

/// Maps an archive path onto the short virtual path the engine uses for mounting:
/// `Engine/Content/..` to `/Engine/..`, `Engine/Plugins/..` to `/Plugins/..` and `<Game>/Content/..` to `/Game/..`.
/// Already mounted paths (leading `/`) and anything unrecognized pass through.
pub fn compact_file_path(path: &str) -> String {
    if path.starts_with('/') {
        return path.to_string();
    }

    if let Some(rest) = path.strip_prefix("Engine/Content") {
        return format!("/Engine{}", rest);
    }

    if let Some(rest) = path.strip_prefix("Engine") {
        if rest.starts_with("/Plugins") {
            return rest.to_string();
        }
    }

    match path.find("/Content/") {
        Some(delim) => format!("/Game{}", &path[delim + "/Content".len()..]),
        None => path.to_string(),
    }
}

/// Drops a trailing `.ext` or `.Object` suffix, but only from the last path segment.
pub fn strip_object_suffix(path: &str) -> &str {
    let last_segment = substring_after_last(path, '/');
    if last_segment.contains('.') {
        &path[..path.len() - last_segment.len() + substring_before_last(last_segment, '.').len()]
    } else {
        path
    }
}

/// Canonical path of an object: the compacted package path, plus the object name if it differs from the package
/// name.
pub fn object_dir_path(package_name: &str, object_name: &str) -> String {
    let compacted = compact_file_path(package_name);
    let package_path = strip_object_suffix(&compacted);

    if substring_after_last(package_path, '/').eq_ignore_ascii_case(object_name) {
        package_path.to_string()
    } else {
        format!("{}/{}", package_path, object_name)
    }
}

/// Directory the side files of objects of `package_name` are written to.
pub fn export_dir(output_dir: &Path, package_name: &str) -> PathBuf {
    let compacted = compact_file_path(package_name);
    let relative = strip_object_suffix(&compacted).trim_start_matches('/');

    let package_file = output_dir.join(relative);
    package_file
        .parent()
        .map_or_else(|| output_dir.to_path_buf(), Path::to_path_buf)
}

fn jsons_path(output_dir: &Path, package_name: &str, suffix: &str) -> PathBuf {
    let compacted = compact_file_path(package_name);
    output_dir
        .join(JSONS_FOLDER)
        .join(format!("{}{}", substring_after(&compacted, '/'), suffix))
}

pub fn processed_json_path(output_dir: &Path, package_name: &str) -> PathBuf {
    jsons_path(output_dir, package_name, ".processed.json")
}

pub fn lights_json_path(output_dir: &Path, package_name: &str) -> PathBuf {
    jsons_path(output_dir, package_name, ".lights.processed.json")
}
