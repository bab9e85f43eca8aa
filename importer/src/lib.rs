//! # RedLilium Importer
//!
//! glTF 2.0 / GLB asset import pipeline for RedLilium Engine.
//!
//! Produces engine-ready CPU-side descriptors from glTF assets. GPU upload
//! is left to the caller through [`sink::ResourceSink`].

pub mod compute;
pub mod fetch;
pub mod gltf;
pub mod material;
pub mod math;
pub mod mesh;
pub mod scene;
pub mod sink;

/// Importer library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
