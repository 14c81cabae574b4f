//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the vector domain:
//! - `TestQdrant`: Qdrant container with automatic cleanup (feature: "qdrant")
//! - `TestStoreDir`: Temporary directory holding a CSV store file (always available)
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `qdrant` (default): Enables Qdrant test infrastructure
//!
//! # Usage
//!
//! ## File store testing
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestStoreDir};
//!
//! #[tokio::test]
//! async fn my_file_store_test() {
//!     let dir = TestStoreDir::new();
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let path = dir.csv_path("vectors");
//!     let vector = builder.vector(8, 0);
//! }
//! ```
//!
//! ## Qdrant testing
//!
//! ```rust,ignore
//! use test_utils::TestQdrant;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn my_qdrant_test() {
//!     let qdrant = TestQdrant::new().await;
//!     let url = qdrant.url();
//! }
//! ```

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

#[cfg(feature = "qdrant")]
mod qdrant;

#[cfg(feature = "qdrant")]
pub use qdrant::TestQdrant;

/// Temporary directory for file-backed stores, removed on drop
pub struct TestStoreDir {
    dir: TempDir,
}

impl TestStoreDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `<name>.csv` inside the directory. The file is not created.
    pub fn csv_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{name}.csv"))
    }
}

impl Default for TestStoreDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_search_ranking");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Deterministic UUID for record `index`
    pub fn id(&self, index: u64) -> Uuid {
        let hi = mix(self.seed ^ index).to_le_bytes();
        let lo = mix(self.seed.wrapping_add(index).rotate_left(17)).to_le_bytes();
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&hi);
        bytes[8..].copy_from_slice(&lo);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.name("collection", "main");
    /// // Returns: "test-collection-12345-main"
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Collection name unique to this builder's seed
    pub fn collection_name(&self) -> String {
        self.name("collection", "main")
    }

    /// Deterministic vector of `dimension` components in `[-1, 1)`
    ///
    /// Different `index` values give different vectors; none is all zeros.
    pub fn vector(&self, dimension: usize, index: u64) -> Vec<f32> {
        let mut state = self.seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut values: Vec<f32> = (0..dimension)
            .map(|_| {
                state = mix(state);
                ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
            })
            .collect();
        if values.iter().all(|v| *v == 0.0) {
            if let Some(first) = values.first_mut() {
                *first = 0.5;
            }
        }
        values
    }

    /// Unit vector along `axis`
    pub fn unit_vector(dimension: usize, axis: usize) -> Vec<f32> {
        let mut values = vec![0.0; dimension];
        values[axis] = 1.0;
        values
    }
}

// splitmix64
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that two floats differ by at most `tolerance`
    pub fn assert_approx_eq(actual: f32, expected: f32, tolerance: f32, context: &str) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{}: expected {} ± {}, got {}",
            context,
            expected,
            tolerance,
            actual
        );
    }

    /// Assert that scores never increase
    pub fn assert_non_increasing(scores: &[f32], context: &str) {
        for pair in scores.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: scores out of order: {:?}",
                context,
                scores
            );
        }
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.id(0), builder2.id(0));
        assert_eq!(builder1.vector(16, 3), builder2.vector(16, 3));
        assert_eq!(
            builder1.name("collection", "test"),
            builder2.name("collection", "test")
        );
    }

    #[test]
    fn test_data_builder_from_name() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.collection_name(), builder2.collection_name());
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.id(0), builder2.id(0));
        assert_ne!(builder1.vector(8, 0), builder2.vector(8, 0));
    }

    #[test]
    fn test_vectors_in_range() {
        let builder = TestDataBuilder::new(7);
        for index in 0..10 {
            let vector = builder.vector(32, index);
            assert_eq!(vector.len(), 32);
            assert!(vector.iter().all(|v| (-1.0..1.0).contains(v)));
            assert!(vector.iter().any(|v| *v != 0.0));
        }
        assert_ne!(builder.id(1), builder.id(2));
    }

    #[test]
    fn test_store_dir_csv_path() {
        let dir = TestStoreDir::new();
        let path = dir.csv_path("vectors");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("csv"));
        assert!(path.starts_with(dir.path()));
        assert!(!path.exists());
    }

    #[test]
    fn test_assert_non_increasing_accepts_ties() {
        assertions::assert_non_increasing(&[1.0, 0.5, 0.5, -0.2], "ties");
    }

    #[test]
    #[should_panic(expected = "scores out of order")]
    fn test_assert_non_increasing_rejects_ascending() {
        assertions::assert_non_increasing(&[0.1, 0.9], "ascending");
    }
}
