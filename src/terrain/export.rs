use tracing::{debug, info};

use super::block_tree::BlockTree;
use super::heightfield::HeightField;
use super::lod::select_fixed;
use super::mesher::BlockMesh;
use super::{Terrain, TerrainError};
use crate::render::database::{Database, GeometryBlob, ResHandle, ResourceType};

/// Static mesh of the tree cut at `lod_threshold`, every block as plain triangles with its
/// skirt dropped by the full `skirt_height`.
pub fn bake(
    field: &HeightField,
    tree: &BlockTree,
    mesh: &BlockMesh,
    skirt_height: f32,
    lod_threshold: f32,
) -> GeometryBlob {
    let cells = select_fixed(tree, lod_threshold);
    let quads = (mesh.edge() as usize - 1).pow(2);
    let mut blob = GeometryBlob {
        positions: Vec::with_capacity(cells.len() * mesh.vertex_count()),
        indices: Vec::with_capacity(cells.len() * quads * 6),
    };
    for cell in &cells {
        mesh.append_static(field, *cell, skirt_height, &mut blob.positions, &mut blob.indices);
    }
    debug!(
        "Baked {} blocks into {} vertices, {} indices",
        cells.len(),
        blob.positions.len(),
        blob.indices.len()
    );
    blob
}

impl Terrain {
    pub fn bake_geometry(&self, lod_threshold: f32) -> GeometryBlob {
        bake(
            self.height_field(),
            self.block_tree(),
            self.mesh(),
            self.skirt_height(),
            lod_threshold,
        )
    }

    /// Serialized `H3DG` blob of the terrain at a fixed LOD.
    pub fn export_geometry(&self, lod_threshold: f32) -> Vec<u8> {
        self.bake_geometry(lod_threshold).to_bytes()
    }

    /// Bakes the terrain and registers it as geometry `name`. Nothing is registered when the
    /// name is empty or already taken.
    pub fn create_geometry_resource(
        &self,
        db: &mut Database,
        name: &str,
        lod_threshold: f32,
    ) -> Result<ResHandle, TerrainError> {
        if name.is_empty() {
            return Err(TerrainError::EmptyName);
        }
        if db.find(ResourceType::Geometry, name).is_some() {
            debug!("Geometry resource {} already exists", name);
            return Err(TerrainError::GeometryExists(name.to_string()));
        }

        let data = self.export_geometry(lod_threshold);
        let size = data.len();
        let handle = db.add_geometry(name, data)?;
        info!(
            "Exported terrain {} as geometry {} ({} bytes)",
            self.name(),
            name,
            size
        );
        Ok(handle)
    }
}
