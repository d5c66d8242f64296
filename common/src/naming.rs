//! File names shared by the writers and readers of every job file.
//!
//! Names only depend on their arguments, so a worker writing a segment and
//! the worker reading it later always agree on where it lives.

use std::path::{Path, PathBuf};

const PREFIX: &str = "mrtmp.";

/// Name of the intermediate segment written by `map_task` for `reduce_task`.
pub fn reduce_name(job_name: &str, map_task: usize, reduce_task: usize) -> String {
    format!("{PREFIX}{job_name}-{map_task}-{reduce_task}")
}

/// Name of the output of `reduce_task`.
pub fn merge_name(job_name: &str, reduce_task: usize) -> String {
    format!("{PREFIX}{job_name}-res-{reduce_task}")
}

/// Name of the final, merged output of a job.
pub fn result_name(job_name: &str) -> String {
    format!("{PREFIX}{job_name}")
}

pub fn segment_path(work_dir: &Path, job_name: &str, map_task: usize, reduce_task: usize) -> PathBuf {
    work_dir.join(reduce_name(job_name, map_task, reduce_task))
}

pub fn merge_path(work_dir: &Path, job_name: &str, reduce_task: usize) -> PathBuf {
    work_dir.join(merge_name(job_name, reduce_task))
}

pub fn result_path(work_dir: &Path, job_name: &str) -> PathBuf {
    work_dir.join(result_name(job_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(reduce_name("wc", 1, 2), "mrtmp.wc-1-2");
        assert_eq!(reduce_name("wc", 1, 2), reduce_name("wc", 1, 2));
        assert_eq!(merge_name("wc", 0), "mrtmp.wc-res-0");
        assert_eq!(result_name("wc"), "mrtmp.wc");
    }

    #[test]
    fn segments_of_different_tasks_never_collide() {
        let mut seen = std::collections::HashSet::new();
        for map_task in 0..12 {
            for reduce_task in 0..12 {
                assert!(seen.insert(reduce_name("job", map_task, reduce_task)));
            }
        }
    }

    #[test]
    fn paths_live_in_the_work_dir() {
        let dir = Path::new("/tmp/mr");
        assert_eq!(segment_path(dir, "wc", 0, 1), dir.join("mrtmp.wc-0-1"));
        assert_eq!(merge_path(dir, "wc", 1), dir.join("mrtmp.wc-res-1"));
        assert_eq!(result_path(dir, "wc"), dir.join("mrtmp.wc"));
    }
}
