use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::codec;
use crate::naming::{merge_path, result_path, segment_path};

/// Combine the outputs of all reduce tasks into `mrtmp.<job>`, one
/// `key: value` line per key, sorted by key.
pub fn merge(work_dir: &Path, job_name: &str, n_reduce: usize) -> anyhow::Result<PathBuf> {
    let mut results = BTreeMap::new();

    for reduce_task in 0..n_reduce {
        let path = merge_path(work_dir, job_name, reduce_task);
        let file = File::open(&path)
            .with_context(|| format!("missing reduce output `{}`", path.display()))?;
        for record in codec::read_records(BufReader::new(file))? {
            let (key, value) = record.into_parts();
            results.insert(key, value);
        }
    }

    let out_path = result_path(work_dir, job_name);
    let mut writer = BufWriter::new(
        File::create(&out_path)
            .with_context(|| format!("failed to create `{}`", out_path.display()))?,
    );
    for (key, value) in &results {
        writeln!(writer, "{key}: {value}")?;
    }
    writer.flush()?;

    info!("Merged {} keys of `{job_name}` into `{}`", results.len(), out_path.display());

    Ok(out_path)
}

/// Remove the intermediate segments and reduce outputs of a job.
///
/// Files that are already gone are not an error.
pub fn clean_intermediate(
    work_dir: &Path,
    job_name: &str,
    n_map: usize,
    n_reduce: usize,
) -> anyhow::Result<()> {
    let segments = (0..n_map)
        .flat_map(|m| (0..n_reduce).map(move |r| (m, r)))
        .map(|(m, r)| segment_path(work_dir, job_name, m, r));
    let outputs = (0..n_reduce).map(|r| merge_path(work_dir, job_name, r));

    for path in segments.chain(outputs) {
        match fs::remove_file(&path) {
            Ok(()) => debug!("Removed `{}`", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove `{}`", path.display()))
            }
        }
    }

    Ok(())
}
