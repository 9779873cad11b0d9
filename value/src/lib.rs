//! Constant payloads for the tessera content-generation IR.
//!
//! The optimizer treats these values as opaque except for a few properties:
//! their [`Category`], a cheap content [`Digest`] and deep equality. Large
//! payloads (images, meshes, layouts) live behind [`Resource`], which keeps
//! the digest resident and defers loading the content until a comparison
//! actually needs it.
//!
//! # Module Organization
//!
//! - [`category`] - Output categories and the foldable subset
//! - [`scalar`] - Bit-exact scalar and colour values
//! - [`image`] - Image payloads and sizes
//! - [`mesh`] - Mesh payloads, skeletons and bone remapping
//! - [`layout`] - Block layouts
//! - [`resource`] - Lazily loaded payloads with resident digests
//! - [`value`] - The evaluated value of a foldable subgraph

pub mod category;
pub mod error;
pub mod image;
pub mod layout;
pub mod mesh;
pub mod resource;
pub mod scalar;
pub mod value;


pub use category::Category;
pub use error::{Error, Result};
pub use image::{Image, ImageFormat, ImageSize};
pub use layout::{Layout, LayoutBlock};
pub use mesh::{BoneId, BoneInfluence, Mesh, MeshFeature, Skeleton};
pub use resource::{ContentDigest, Digest, Resource, ResourceLoader};
pub use scalar::{Color, Scalar};
pub use value::Value;
