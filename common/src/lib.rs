//! A fault-tolerant MapReduce (lite) system.
//!
//! Users specify map and reduce functions, and the coordinator distributes
//! the resulting tasks to whichever workers happen to be registered. Input,
//! intermediate and output files live on a filesystem shared by the
//! coordinator and every worker.

use std::fmt;
use std::fmt::Formatter;

use serde::{Deserialize, Serialize};

pub mod address;
pub mod codec;
pub mod input;
pub mod job;
pub mod map;
pub mod merge;
pub mod naming;
pub mod reduce;
pub mod schedule;
pub mod task;

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// A map function takes the name of an input file, its entire contents and
/// the auxiliary arguments of the job.
///
/// It returns every key-value pair for that file at once. An `Err` fails the
/// current task attempt, which is then retried like any other failure.
pub type MapFn = fn(file: &str, contents: &str, aux: &[String]) -> anyhow::Result<Vec<KeyValue>>;

/// A reduce function takes in a key, every value emitted for that key across
/// all map tasks, and the auxiliary arguments. It returns a single output value.
pub type ReduceFn = fn(key: &str, values: Vec<String>, aux: &[String]) -> anyhow::Result<String>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload").finish_non_exhaustive()
    }
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
///
/// Both halves are arbitrary text; the codec takes care of quoting.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: String,

    /// The value.
    pub value: String,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the value of this key-value pair.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> String {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> String {
        self.value
    }

    /// Consumes the pair and returns both halves.
    #[inline]
    pub fn into_parts(self) -> (String, String) {
        (self.key, self.value)
    }
}

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

const FNV32_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;

/// Hashes an intermediate key with 32-bit FNV-1a and clears the sign bit.
///
/// Every process that decides where a key goes must agree on this value,
/// so it never depends on per-process hasher state.
pub fn ihash(key: &[u8]) -> u32 {
    let hash = key.iter().fold(FNV32_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV32_PRIME)
    });
    hash & 0x7fff_ffff
}

/// Compute the reduce bucket for a given key: `ihash(key) % n_reduce`.
///
/// # Panics
///
/// Panics if `n_reduce` is zero.
#[inline]
pub fn bucket(key: &str, n_reduce: usize) -> usize {
    ihash(key.as_bytes()) as usize % n_reduce
}
