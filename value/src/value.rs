//! Evaluated values.

use std::sync::Arc;

use crate::category::Category;
use crate::image::Image;
use crate::layout::Layout;
use crate::mesh::Mesh;
use crate::scalar::{Color, Scalar};

/// The concrete result of evaluating (or resolving) a constant subgraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Scalar(Scalar),
    Color(Color),
    Image(Arc<Image>),
    Mesh(Arc<Mesh>),
    Layout(Arc<Layout>),
}

impl Value {
    pub fn category(&self) -> Category {
        match self {
            Self::Bool(_) => Category::Bool,
            Self::Scalar(_) => Category::Scalar,
            Self::Color(_) => Category::Color,
            Self::Image(_) => Category::Image,
            Self::Mesh(_) => Category::Mesh,
            Self::Layout(_) => Category::Layout,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_mesh(&self) -> Option<&Arc<Mesh>> {
        match self {
            Self::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&Arc<Image>> {
        match self {
            Self::Image(i) => Some(i),
            _ => None,
        }
    }
}
