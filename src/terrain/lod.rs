//! Per-frame choice of which quadtree cells to draw.
//!
//! A cell is drawn as one block once its geometric error seen from the camera drops below
//! the LOD threshold, or once the deepest level is reached. Otherwise it is split and its
//! children are visited nearest first.

use std::ops::ControlFlow;

use glam::{Mat4, Vec3};

use super::block_tree::{BlockTree, CellId};
use crate::math::{Aabb, Frustum};

/// Lower bound for camera distances so that `geo_error / dist` stays finite.
pub const MIN_DISTANCE: f32 = 0.00001;

/// A cell chosen for drawing together with its camera distance, which also scales the
/// skirt drop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedBlock {
    pub cell: CellId,
    pub distance: f32,
}

pub trait BlockVisitor {
    fn visit_block(&mut self, block: SelectedBlock) -> ControlFlow<()>;
}

impl<F> BlockVisitor for F
where
    F: FnMut(SelectedBlock) -> ControlFlow<()>,
{
    fn visit_block(&mut self, block: SelectedBlock) -> ControlFlow<()> {
        self(block)
    }
}

pub struct LodSelector<'a> {
    pub tree: &'a BlockTree,
    /// Terrain to world transform, used for culling.
    pub transform: Mat4,
    pub skirt_height: f32,
    pub lod_threshold: f32,
    /// Camera in terrain local space.
    pub camera: Option<Vec3>,
    pub frusta: [Option<&'a Frustum>; 2],
}

impl<'a> LodSelector<'a> {
    /// Feeds every selected block to `visitor` in draw order. Stops early when the visitor
    /// breaks.
    pub fn traverse(&self, visitor: &mut impl BlockVisitor) -> ControlFlow<()> {
        match self.camera {
            Some(camera) => self.visit(CellId::ROOT, camera, visitor),
            None => {
                if self.culled(CellId::ROOT) {
                    return ControlFlow::Continue(());
                }
                visitor.visit_block(SelectedBlock {
                    cell: CellId::ROOT,
                    distance: 1.0,
                })
            }
        }
    }

    pub fn select(&self) -> Vec<SelectedBlock> {
        let mut blocks = Vec::new();
        let _ = self.traverse(&mut |block: SelectedBlock| {
            blocks.push(block);
            ControlFlow::Continue(())
        });
        blocks
    }

    fn local_box(&self, cell: CellId) -> Option<Aabb> {
        let info = self.tree.get(cell)?;
        Some(Aabb::new(
            Vec3::new(cell.min_u(), info.min_height - self.skirt_height, cell.min_v()),
            Vec3::new(cell.max_u(), info.max_height, cell.max_v()),
        ))
    }

    fn culled(&self, cell: CellId) -> bool {
        let Some(local) = self.local_box(cell) else {
            return true;
        };
        let world = local.transform(&self.transform);
        self.frusta
            .iter()
            .flatten()
            .any(|frustum| frustum.cull_box(&world))
    }

    fn visit(&self, cell: CellId, camera: Vec3, visitor: &mut impl BlockVisitor) -> ControlFlow<()> {
        let (Some(info), Some(local)) = (self.tree.get(cell), self.local_box(cell)) else {
            return ControlFlow::Continue(());
        };
        if self.culled(cell) {
            return ControlFlow::Continue(());
        }

        let distance = local.nearest_distance(camera).max(MIN_DISTANCE);
        if info.geo_error / distance < self.lod_threshold || cell.level >= self.tree.max_level() {
            return visitor.visit_block(SelectedBlock { cell, distance });
        }

        for child in near_to_far(cell, camera) {
            self.visit(child, camera, visitor)?;
        }
        ControlFlow::Continue(())
    }
}

/// Children of `cell` sorted so that the ones on the camera's side come first.
pub fn near_to_far(cell: CellId, camera: Vec3) -> [CellId; 4] {
    let mut children = cell.children();
    let half_u = (cell.min_u() + cell.max_u()) * 0.5;
    let half_v = (cell.min_v() + cell.max_v()) * 0.5;
    if camera.x > half_u {
        children.swap(0, 1);
        children.swap(2, 3);
    }
    if camera.z > half_v {
        children.swap(0, 2);
        children.swap(1, 3);
    }
    children
}

/// Cells of a camera independent cut through the tree: a cell is kept once its raw
/// geometric error is below `lod_threshold` or it sits on the deepest level.
pub fn select_fixed(tree: &BlockTree, lod_threshold: f32) -> Vec<CellId> {
    fn walk(tree: &BlockTree, cell: CellId, lod_threshold: f32, out: &mut Vec<CellId>) {
        let Some(info) = tree.get(cell) else {
            return;
        };
        if info.geo_error < lod_threshold || cell.level >= tree.max_level() {
            out.push(cell);
            return;
        }
        for child in cell.children() {
            walk(tree, child, lod_threshold, out);
        }
    }

    let mut cells = Vec::new();
    walk(tree, CellId::ROOT, lod_threshold, &mut cells);
    cells
}
