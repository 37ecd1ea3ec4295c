use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;

pub mod package_cache;
pub mod paths;

/// Writes `target` through a sibling temporary file that is renamed into place once `write` succeeded, so readers
/// never observe a partially written file. Parent directories are created on demand.
pub fn write_atomically<F>(target: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> anyhow::Result<()>,
{
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut tmp_name = target.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = Path::new(&tmp_name);

    let result = fs::File::create(tmp)
        .with_context(|| format!("Failed to create {}", tmp.display()))
        .and_then(|file| {
            let mut wtr = BufWriter::new(file);
            write(&mut wtr)?;
            wtr.flush()?;
            Ok(())
        })
        .and_then(|_| {
            fs::rename(tmp, target).with_context(|| format!("Failed to move {} into place", target.display()))
        });

    if result.is_err() {
        let _ = fs::remove_file(tmp);
    }

    result
}

/// Everything before the last `delimiter`, the whole string if there is none.
pub fn substring_before_last(input: &str, delimiter: char) -> &str {
    input
        .rfind(delimiter)
        .map_or(input, |index| &input[..index])
}

/// Everything after the last `delimiter`, the whole string if there is none.
pub fn substring_after_last(input: &str, delimiter: char) -> &str {
    input
        .rfind(delimiter)
        .map_or(input, |index| &input[index + delimiter.len_utf8()..])
}

/// Everything after the first `delimiter`, the whole string if there is none.
pub fn substring_after(input: &str, delimiter: char) -> &str {
    input
        .find(delimiter)
        .map_or(input, |index| &input[index + delimiter.len_utf8()..])
}
