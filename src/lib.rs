//! Perceptual image fingerprints for near-duplicate and crop-resistant matching.

pub mod crop;
pub mod error;
pub mod fingerprint;
pub mod hashes;
pub mod preprocess;
pub mod services;

pub use crop::{crop_resistant_hash, crop_resistant_hash_with, CropConfig, MultiFingerprint};
pub use error::HashError;
pub use fingerprint::Fingerprint;
pub use hashes::{Algorithm, SegmentHasher};
