use glam::Vec3;
use tracing::debug;

use super::heightfield::HeightField;
use crate::math::Plane;

/// Height extrema and geometric error of one quadtree cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockInfo {
    pub min_height: f32,
    pub max_height: f32,
    pub geo_error: f32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            min_height: 1.0,
            max_height: 0.0,
            geo_error: 0.0,
        }
    }
}

/// Quadtree cell `(x, y)` of `level`, covering `[x/n, (x+1)/n] x [y/n, (y+1)/n]`
/// with `n = 2^level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    pub level: u32,
    pub x: u32,
    pub y: u32,
}

impl CellId {
    pub const ROOT: CellId = CellId {
        level: 0,
        x: 0,
        y: 0,
    };

    pub fn new(level: u32, x: u32, y: u32) -> Self {
        Self { level, x, y }
    }

    pub fn cells_per_edge(&self) -> u32 {
        1 << self.level
    }

    /// Edge length on the unit footprint.
    pub fn scale(&self) -> f32 {
        1.0 / self.cells_per_edge() as f32
    }

    pub fn min_u(&self) -> f32 {
        self.x as f32 * self.scale()
    }

    pub fn min_v(&self) -> f32 {
        self.y as f32 * self.scale()
    }

    pub fn max_u(&self) -> f32 {
        (self.x + 1) as f32 * self.scale()
    }

    pub fn max_v(&self) -> f32 {
        (self.y + 1) as f32 * self.scale()
    }

    /// Children in the order `(min, min)`, `(half, min)`, `(min, half)`, `(half, half)`.
    pub fn children(&self) -> [CellId; 4] {
        let (level, x, y) = (self.level + 1, self.x * 2, self.y * 2);
        [
            CellId::new(level, x, y),
            CellId::new(level, x + 1, y),
            CellId::new(level, x, y + 1),
            CellId::new(level, x + 1, y + 1),
        ]
    }
}

/// First flat index of `level`: `sum_{i < level} 4^i`.
pub fn level_offset(level: u32) -> usize {
    (0..level).map(|i| 1usize << (2 * i)).sum()
}

/// Number of cells in a tree whose deepest level is `max_level`.
pub fn cell_count(max_level: u32) -> usize {
    level_offset(max_level + 1)
}

/// Levels until one block covers `block_size - 1` height map pixels.
pub fn max_level_for(heightmap_size: u32, block_size: u32) -> u32 {
    let blocks = heightmap_size / block_size.saturating_sub(1).max(1);
    let mut level = 0;
    let mut i = 1u32;
    while i < blocks {
        i *= 2;
        level += 1;
    }
    level
}

/// Precomputed quadtree of [`BlockInfo`] stored level by level.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    max_level: u32,
    blocks: Vec<BlockInfo>,
}

impl BlockTree {
    pub fn build(field: &HeightField, block_size: u32) -> Self {
        let max_level = max_level_for(field.size(), block_size);
        let mut blocks = vec![BlockInfo::default(); cell_count(max_level)];

        for level in 0..=max_level {
            let n = 1u32 << level;
            for y in 0..n {
                for x in 0..n {
                    let cell = CellId::new(level, x, y);
                    blocks[Self::index(cell)] = measure_cell(field, block_size, cell);
                }
            }
        }

        debug!(
            "Built block tree: {} levels, {} cells",
            max_level + 1,
            blocks.len()
        );
        Self { max_level, blocks }
    }

    /// Flat position of `cell`.
    pub fn index(cell: CellId) -> usize {
        level_offset(cell.level) + (cell.y as usize) * (cell.cells_per_edge() as usize) + cell.x as usize
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, cell: CellId) -> Option<&BlockInfo> {
        if cell.level > self.max_level {
            return None;
        }
        let n = cell.cells_per_edge();
        if cell.x >= n || cell.y >= n {
            return None;
        }
        self.blocks.get(Self::index(cell))
    }

    /// All cells of one level, row-major.
    pub fn level(&self, level: u32) -> &[BlockInfo] {
        if level > self.max_level {
            return &[];
        }
        &self.blocks[level_offset(level)..level_offset(level + 1)]
    }

    pub fn blocks(&self) -> &[BlockInfo] {
        &self.blocks
    }
}

fn pixel_point(field: &HeightField, px: i64, py: i64) -> Vec3 {
    let n = field.size() as f32;
    Vec3::new(px as f32 / n, field.height_at_pixel(px, py), py as f32 / n)
}

/// Samples every height map pixel of every sub-quad of `cell`, edges included.
fn measure_cell(field: &HeightField, block_size: u32, cell: CellId) -> BlockInfo {
    let quads = block_size.saturating_sub(1).max(1);
    let n = cell.cells_per_edge();
    let step = (field.size() / (n * quads)).max(1) as i64;
    let base_x = (cell.x * field.size() / n) as i64;
    let base_y = (cell.y * field.size() / n) as i64;

    let mut info = BlockInfo::default();
    for v in 0..quads as i64 {
        for u in 0..quads as i64 {
            let x0 = base_x + u * step;
            let y0 = base_y + v * step;
            let c0 = pixel_point(field, x0, y0);
            let c1 = pixel_point(field, x0, y0 + step);
            let c2 = pixel_point(field, x0 + step, y0);
            let c3 = pixel_point(field, x0 + step, y0 + step);
            let tri0 = Plane::from_points(c0, c1, c2);
            let tri1 = Plane::from_points(c1, c2, c3);

            for vv in 0..=step {
                for uu in 0..=step {
                    let tri = if uu <= vv { &tri0 } else { &tri1 };
                    let point = pixel_point(field, x0 + uu, y0 + vv);
                    info.min_height = info.min_height.min(point.y);
                    info.max_height = info.max_height.max(point.y);
                    info.geo_error = info.geo_error.max(tri.distance_to_point(point).abs());
                }
            }
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_count_is_sum_of_powers_of_four() {
        assert_eq!(cell_count(0), 1);
        assert_eq!(cell_count(1), 5);
        assert_eq!(cell_count(2), 21);
        assert_eq!(cell_count(3), 85);
    }

    #[test]
    fn max_level_counts_doublings() {
        assert_eq!(max_level_for(64, 17), 2);
        assert_eq!(max_level_for(32, 33), 0);
        assert_eq!(max_level_for(1024, 33), 5);
        assert_eq!(max_level_for(32, 17), 1);
    }

    #[test]
    fn index_is_level_major_then_row_major() {
        assert_eq!(BlockTree::index(CellId::ROOT), 0);
        assert_eq!(BlockTree::index(CellId::new(1, 1, 0)), 2);
        assert_eq!(BlockTree::index(CellId::new(1, 0, 1)), 3);
        assert_eq!(BlockTree::index(CellId::new(2, 0, 0)), 5);
        assert_eq!(BlockTree::index(CellId::new(2, 3, 3)), 20);
    }

    #[test]
    fn children_cover_parent() {
        let cell = CellId::new(1, 1, 0);
        let children = cell.children();
        assert_eq!(children[0].min_u(), cell.min_u());
        assert_eq!(children[1].max_u(), cell.max_u());
        assert_eq!(children[2].max_v(), cell.max_v());
        assert_eq!(children[3].min_u(), 0.75);
        assert_eq!(children[3].min_v(), 0.25);
    }

    #[test]
    fn tree_for_64_map_has_21_valid_cells() {
        let field = HeightField::from_fn(64, |x, y| ((x * 37 + y * 91) % 4096) as u16 * 16);
        let tree = BlockTree::build(&field, 17);
        assert_eq!(tree.max_level(), 2);
        assert_eq!(tree.len(), 21);
        for block in tree.blocks() {
            assert!(block.geo_error >= 0.0);
            assert!(block.max_height >= block.min_height);
        }
        assert_eq!(tree.level(2).len(), 16);
        assert!(tree.get(CellId::new(3, 0, 0)).is_none());
        assert!(tree.get(CellId::new(2, 4, 0)).is_none());
    }

    #[test]
    fn flat_field_has_no_error() {
        let tree = BlockTree::build(&HeightField::flat(64), 17);
        for block in tree.blocks() {
            assert_eq!(block.geo_error, 0.0);
            assert_eq!(block.min_height, 0.0);
            assert_eq!(block.max_height, 0.0);
        }
    }

    #[test]
    fn plane_fits_a_ramp_exactly_but_not_a_ridge() {
        let ramp = HeightField::from_fn(64, |x, _| (x * 1000) as u16);
        let tree = BlockTree::build(&ramp, 17);
        assert!(tree.get(CellId::new(1, 0, 0)).unwrap().geo_error < 1e-4);

        let ridge = HeightField::from_fn(64, |x, _| if x == 2 { 60000 } else { 0 });
        let tree = BlockTree::build(&ridge, 17);
        let root = tree.get(CellId::ROOT).unwrap();
        assert!(root.geo_error > 0.1);
        let leaf = tree.get(CellId::new(2, 0, 0)).unwrap();
        assert!(leaf.geo_error < 1e-4);
        assert!(root.max_height > 0.9);
    }
}
