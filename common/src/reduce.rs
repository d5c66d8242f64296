use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::naming::{merge_path, segment_path};
use crate::{codec, KeyValue, ReduceFn};

/// Run one reduce task: gather the segment every map task wrote for
/// `reduce_task`, group values by key and apply `reduce_fn` to each group in
/// key order.
///
/// Returns the path of the reduce output, which is overwritten on retry.
pub fn do_reduce(
    work_dir: &Path,
    job_name: &str,
    reduce_task: usize,
    n_map: usize,
    reduce_fn: ReduceFn,
    aux: &[String],
) -> anyhow::Result<PathBuf> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for map_task in 0..n_map {
        let path = segment_path(work_dir, job_name, map_task, reduce_task);
        let file = File::open(&path)
            .with_context(|| format!("missing segment `{}`", path.display()))?;
        let records = codec::decode_segment(BufReader::new(file))
            .with_context(|| format!("corrupt segment `{}`", path.display()))?;

        for record in records {
            let (key, value) = record.into_parts();
            groups.entry(key).or_default().push(value);
        }
    }

    info!(
        "Reduce task {reduce_task} of `{job_name}` has {} keys from {n_map} segments",
        groups.len()
    );

    let out_path = merge_path(work_dir, job_name, reduce_task);
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&out_path)
        .with_context(|| format!("failed to open reduce output `{}`", out_path.display()))?;
    let mut writer = BufWriter::new(file);

    for (key, values) in groups {
        let value = reduce_fn(&key, values, aux)
            .with_context(|| format!("reduce function failed on key `{key}`"))?;
        codec::write_record(&mut writer, &KeyValue::new(key, value))?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| e.into_error())?
        .sync_all()
        .with_context(|| format!("failed to sync reduce output `{}`", out_path.display()))?;

    Ok(out_path)
}
