use core::{fmt::Display, ops::Range};

use super::descriptor::TensorDescriptor;

/// Order in which cubes walk the output tiles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TileOrder {
    /// Block `id` handles tile `(id / n_blocks, id % n_blocks)`.
    #[default]
    RowMajor,
    /// Tile rows are processed `group_m` at a time, column by column inside a group, so
    /// consecutive cubes share B tiles. The last group may hold fewer rows.
    Grouped { group_m: u32 },
}

impl Display for TileOrder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TileOrder::RowMajor => f.write_str("RowMajor"),
            TileOrder::Grouped { group_m } => write!(f, "Grouped({group_m})"),
        }
    }
}

/// Maps a linear cube index to the output tile it computes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockToETileMap {
    m_per_block: usize,
    n_per_block: usize,
    m_blocks: usize,
    n_blocks: usize,
    order: TileOrder,
}

/// Output elements covered by one tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileRegion {
    pub m: Range<usize>,
    pub n: Range<usize>,
    /// Rows of the tile holding real data, the rest is padding.
    pub valid_m: usize,
    /// Columns of the tile holding real data, the rest is padding.
    pub valid_n: usize,
}

impl TileRegion {
    /// Whether the element at `(m, n)` within the tile must be left untouched.
    pub fn is_masked(&self, m: usize, n: usize) -> bool {
        m >= self.valid_m || n >= self.valid_n
    }
}

impl BlockToETileMap {
    /// Tiles the (padded) `M x N` output descriptor.
    pub fn new(
        e_grid_desc_m_n: &TensorDescriptor,
        m_per_block: u32,
        n_per_block: u32,
        order: TileOrder,
    ) -> Self {
        let m_per_block = m_per_block as usize;
        let n_per_block = n_per_block as usize;

        Self {
            m_per_block,
            n_per_block,
            m_blocks: blocks(e_grid_desc_m_n.length(0), m_per_block),
            n_blocks: blocks(e_grid_desc_m_n.length(1), n_per_block),
            order,
        }
    }

    /// Number of cubes needed to cover every tile of the output exactly once.
    pub fn calculate_grid_size(&self, e_grid_desc_m_n: &TensorDescriptor) -> usize {
        blocks(e_grid_desc_m_n.length(0), self.m_per_block)
            * blocks(e_grid_desc_m_n.length(1), self.n_per_block)
    }

    pub fn grid_size(&self) -> usize {
        self.m_blocks * self.n_blocks
    }

    /// Tile count along M and N.
    pub fn tile_counts(&self) -> (usize, usize) {
        (self.m_blocks, self.n_blocks)
    }

    /// Tile `(m_block, n_block)` computed by cube `block_id`.
    ///
    /// Ids past the grid map to a tile rejected by [is_valid_tile_index](Self::is_valid_tile_index).
    pub fn calculate_bottom_index(&self, block_id: usize) -> (usize, usize) {
        let n_block = block_id % self.n_blocks.max(1);
        let m_block = block_id / self.n_blocks.max(1);

        match self.order {
            TileOrder::RowMajor => (m_block, n_block),
            TileOrder::Grouped { .. } if block_id >= self.grid_size() => (m_block, n_block),
            TileOrder::Grouped { group_m } => {
                let group_m = group_m.max(1) as usize;
                let full_rows = self.m_blocks - self.m_blocks % group_m;
                let group_rows = match m_block < full_rows {
                    true => group_m,
                    false => self.m_blocks % group_m,
                };

                let group = m_block / group_m;
                let local = n_block + (m_block % group_m) * self.n_blocks;

                (local % group_rows + group * group_m, local / group_rows)
            }
        }
    }

    pub fn is_valid_tile_index(&self, tile: (usize, usize)) -> bool {
        tile.0 < self.m_blocks && tile.1 < self.n_blocks
    }

    /// Whether the map covers `e_grid_desc_m_n` with a grid the launcher can address.
    pub fn check_validity(&self, e_grid_desc_m_n: &TensorDescriptor) -> bool {
        let grid_size = self.grid_size();

        grid_size > 0
            && grid_size == self.calculate_grid_size(e_grid_desc_m_n)
            && u32::try_from(grid_size).is_ok()
    }

    /// Elements of the output covered by `tile`, and how many of them are real.
    pub fn tile_region(
        &self,
        tile: (usize, usize),
        e_grid_desc_m_n: &TensorDescriptor,
    ) -> TileRegion {
        let m_start = tile.0 * self.m_per_block;
        let n_start = tile.1 * self.n_per_block;
        let valid_m = e_grid_desc_m_n.valid_length(0);
        let valid_n = e_grid_desc_m_n.valid_length(1);

        TileRegion {
            m: m_start..m_start + self.m_per_block,
            n: n_start..n_start + self.n_per_block,
            valid_m: valid_m.saturating_sub(m_start).min(self.m_per_block),
            valid_n: valid_n.saturating_sub(n_start).min(self.n_per_block),
        }
    }

    /// Tiles in launch order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.grid_size()).map(|block_id| self.calculate_bottom_index(block_id))
    }
}

fn blocks(length: usize, per_block: usize) -> usize {
    match per_block {
        0 => 0,
        _ => length.div_ceil(per_block),
    }
}
