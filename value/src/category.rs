//! Output categories of IR operations.

/// The kind of value an operation produces.
///
/// Only a subset of categories can be materialized as constants by the
/// folding scheduler, see [`Category::is_foldable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::AsRefStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Bool,
    Scalar,
    Color,
    Image,
    Mesh,
    Layout,
    Instance,
}

impl Category {
    /// Whether a fully constant subgraph of this category can be replaced by a constant node.
    pub fn is_foldable(self) -> bool {
        matches!(self, Self::Bool | Self::Color | Self::Image | Self::Mesh | Self::Layout)
    }
}
