use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use tracing::{debug, info};

use crate::naming::segment_path;
use crate::{bucket, codec, KeyValue, MapFn};

/// Run one map task: read `in_file`, apply `map_fn` to its contents and
/// write one segment per reduce bucket into `work_dir`.
///
/// Every segment is truncated before being written, so a retried attempt
/// replaces whatever an earlier, failed attempt left behind. Buckets that
/// receive no records still get an (empty) segment.
pub fn do_map(
    work_dir: &Path,
    job_name: &str,
    map_task: usize,
    in_file: &str,
    n_reduce: usize,
    map_fn: MapFn,
    aux: &[String],
) -> anyhow::Result<()> {
    if n_reduce == 0 {
        bail!("map task {map_task} of `{job_name}` has no reduce buckets");
    }

    let in_path = fs::canonicalize(in_file)
        .with_context(|| format!("failed to resolve input file `{in_file}`"))?;
    let contents = fs::read_to_string(&in_path)
        .with_context(|| format!("failed to read input file `{}`", in_path.display()))?;

    info!("Map task {map_task} of `{job_name}` read {} bytes from `{in_file}`", contents.len());

    let records = map_fn(in_file, &contents, aux)
        .with_context(|| format!("map function failed on `{in_file}`"))?;

    debug!("Map task {map_task} of `{job_name}` emitted {} records", records.len());

    for (reduce_task, records) in partition(records, n_reduce).iter().enumerate() {
        let path = segment_path(work_dir, job_name, map_task, reduce_task);
        write_segment(&path, records)?;
    }

    Ok(())
}

/// Split records into `n_reduce` buckets by key, keeping emission order
/// within each bucket.
pub fn partition(records: Vec<KeyValue>, n_reduce: usize) -> Vec<Vec<KeyValue>> {
    let mut buckets = vec![Vec::new(); n_reduce];
    for record in records {
        buckets[bucket(&record.key, n_reduce)].push(record);
    }
    buckets
}

fn write_segment(path: &Path, records: &[KeyValue]) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open segment `{}`", path.display()))?;

    let mut writer = BufWriter::new(file);
    codec::encode_segment(&mut writer, records)
        .with_context(|| format!("failed to write segment `{}`", path.display()))?;
    writer.flush()?;

    let file: File = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
        .with_context(|| format!("failed to sync segment `{}`", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::anyhow;
    use tempfile::TempDir;

    use super::*;
    use crate::codec::decode_segment;

    fn words(_file: &str, contents: &str, _aux: &[String]) -> anyhow::Result<Vec<KeyValue>> {
        Ok(contents
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| !word.is_empty())
            .map(|word| KeyValue::new(word, "1"))
            .collect())
    }

    fn broken(_file: &str, _contents: &str, _aux: &[String]) -> anyhow::Result<Vec<KeyValue>> {
        Err(anyhow!("user code blew up"))
    }

    fn read_segment(dir: &Path, map_task: usize, reduce_task: usize) -> Vec<KeyValue> {
        let file = File::open(segment_path(dir, "wc", map_task, reduce_task)).unwrap();
        decode_segment(file).unwrap()
    }

    fn write_input(dir: &Path, name: &str, contents: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn partition_keeps_emission_order_per_bucket() {
        let records: Vec<_> = (0..50).map(|i| KeyValue::new(format!("k{}", i % 7), i.to_string())).collect();
        let buckets = partition(records.clone(), 4);

        assert_eq!(buckets.iter().map(Vec::len).sum::<usize>(), records.len());
        for (index, records_in_bucket) in buckets.iter().enumerate() {
            assert!(records_in_bucket.iter().all(|kv| bucket(&kv.key, 4) == index));
            let values: Vec<usize> = records_in_bucket.iter().map(|kv| kv.value.parse().unwrap()).collect();
            assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn writes_every_bucket_even_when_empty() {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), "one-word.txt", "hello");

        do_map(dir.path(), "wc", 0, &input, 5, words, &[]).unwrap();

        let mut total = 0;
        for reduce_task in 0..5 {
            let records = read_segment(dir.path(), 0, reduce_task);
            assert!(records.iter().all(|kv| bucket(&kv.key, 5) == reduce_task));
            total += records.len();
        }
        assert_eq!(total, 1);
        assert!(!segment_path(dir.path(), "wc", 0, 5).exists());
    }

    #[test]
    fn retried_attempt_supersedes_partial_output() {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), "in.txt", "a b c d e f g a b c\nsecond line");

        do_map(dir.path(), "wc", 3, &input, 3, words, &[]).unwrap();
        let expected: Vec<Vec<u8>> = (0..3)
            .map(|r| fs::read(segment_path(dir.path(), "wc", 3, r)).unwrap())
            .collect();

        // Simulate a crashed attempt: one segment is garbage, one is longer
        // than the real content would be, one is missing.
        fs::write(segment_path(dir.path(), "wc", 3, 0), b"[{\"key\":\"stale").unwrap();
        fs::write(segment_path(dir.path(), "wc", 3, 1), vec![b' '; 4096]).unwrap();
        fs::remove_file(segment_path(dir.path(), "wc", 3, 2)).unwrap();

        do_map(dir.path(), "wc", 3, &input, 3, words, &[]).unwrap();

        for (reduce_task, expected) in expected.iter().enumerate() {
            let actual = fs::read(segment_path(dir.path(), "wc", 3, reduce_task)).unwrap();
            assert_eq!(&actual, expected);
        }
    }

    #[test]
    fn unreadable_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.txt");

        let err = do_map(dir.path(), "wc", 0, &missing.to_string_lossy(), 2, words, &[]);

        assert!(err.is_err());
        assert!(!segment_path(dir.path(), "wc", 0, 0).exists());
    }

    #[test]
    fn user_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), "in.txt", "text");

        assert!(do_map(dir.path(), "wc", 0, &input, 2, broken, &[]).is_err());
    }

    #[test]
    fn unwritable_segment_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), "in.txt", "text");
        let missing_dir = dir.path().join("does-not-exist");

        assert!(do_map(&missing_dir, "wc", 0, &input, 2, words, &[]).is_err());
    }

    #[test]
    fn zero_buckets_is_rejected() {
        let dir = TempDir::new().unwrap();
        let input = write_input(dir.path(), "in.txt", "text");

        assert!(do_map(dir.path(), "wc", 0, &input, 0, words, &[]).is_err());
    }
}
