//! This module provides deterministic `HashMap`, `HashSet`, `IndexMap` and `IndexSet` variants.
//! The hashing data structures in the standard library are not deterministic:
//!
//! > By default, HashMap uses a hashing algorithm selected to provide
//! > resistance against HashDoS attacks. The algorithm is randomly seeded, and a
//! > reasonable best-effort is made to generate this seed from a high quality,
//! > secure source of randomness provided by the host without blocking the program.
//!
//! Two engines built from the same inputs and seed must produce identical state, so every map in
//! this crate uses the Fx hasher. Use `HashMap::default()` to create a new map.
//!
//! The insertion-ordered `IndexSet` is what contact sets and location occupancy are built on:
//! iteration order depends only on insertion order, never on hash values.
//!
//! The `hash_str` free function is used by `crate::random` to derive per-stream seeds.

use rustc_hash::FxBuildHasher;
use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub type IndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;
pub type IndexSet<T> = indexmap::IndexSet<T, FxBuildHasher>;

/// A convenience method to compute the hash of a `&str`. Stable across platforms and releases.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
