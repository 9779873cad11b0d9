//! Texture layouts: a grid subdivided into rectangular blocks.

/// One rectangular block of a layout grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBlock {
    /// Stable block identifier assigned by the content author.
    pub id: u64,
    pub min: (u16, u16),
    pub size: (u16, u16),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Layout {
    pub grid: (u16, u16),
    pub blocks: Vec<LayoutBlock>,
}

impl Layout {
    pub fn new(grid: (u16, u16), blocks: Vec<LayoutBlock>) -> Self {
        Self { grid, blocks }
    }

    /// Concatenate the blocks of `other`, keeping the larger grid.
    pub fn merged(&self, other: &Layout) -> Layout {
        let grid = (self.grid.0.max(other.grid.0), self.grid.1.max(other.grid.1));
        let mut blocks = self.blocks.clone();
        blocks.extend(other.blocks.iter().filter(|b| !self.blocks.iter().any(|own| own.id == b.id)).copied());
        Layout { grid, blocks }
    }
}
