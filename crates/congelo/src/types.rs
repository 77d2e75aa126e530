//! Shared type definitions for the congelo crate
//!
//! This module contains common aliases used across multiple components of
//! the freezer, ensuring deterministic iteration everywhere module names or
//! paths are collected.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Type alias for IndexMap with FxHasher for better performance
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Type alias for IndexSet with FxHasher for better performance
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;
