use std::fs;

use anyhow::{bail, Context};

/// Resolve the input glob to absolute paths, in a stable order.
///
/// Only regular files match. Workers may run from any directory, so relative
/// paths would not mean the same file to all of them.
pub fn expand_inputs(pattern: &str) -> anyhow::Result<Vec<String>> {
    let mut inputs = Vec::new();

    for entry in glob::glob(pattern).with_context(|| format!("invalid glob `{pattern}`"))? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        let path = fs::canonicalize(&path)
            .with_context(|| format!("failed to resolve `{}`", path.display()))?;
        inputs.push(path.to_string_lossy().into_owned());
    }

    if inputs.is_empty() {
        bail!("no input files match `{pattern}`");
    }
    inputs.sort();
    Ok(inputs)
}
