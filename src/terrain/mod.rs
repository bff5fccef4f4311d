pub mod block_tree;
pub mod export;
pub mod heightfield;
pub mod intersect;
pub mod lod;
pub mod mesher;

pub use block_tree::{BlockInfo, BlockTree, CellId};
pub use heightfield::{HeightField, HeightFieldError};
pub use lod::{BlockVisitor, LodSelector, SelectedBlock};
pub use mesher::BlockMesh;

use std::fmt;
use std::ops::ControlFlow;

use bytemuck::cast_slice;
use glam::{Mat4, Vec3};
use tracing::{debug, info, warn};

use crate::config::{TerrainConfig, DEFAULT_BLOCK_SIZE, DEFAULT_MESH_QUALITY};
use crate::math::Aabb;
use crate::render::database::{
    self, Database, MaterialResource, ResHandle, ResourceType, TextureResource, TextureType,
};
use crate::render::{
    BlockParams, BufferHandle, BufferUsage, DeviceError, DrawIndexed, FrameStats, PrimitiveType,
    RenderDevice, RenderView,
};

/// Node parameters with their stable numeric ids.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainParam {
    HeightTexRes = 10000,
    MatRes = 10001,
    MeshQuality = 10002,
    SkirtHeight = 10003,
    BlockSize = 10004,
}

impl TryFrom<i32> for TerrainParam {
    type Error = TerrainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            10000 => TerrainParam::HeightTexRes,
            10001 => TerrainParam::MatRes,
            10002 => TerrainParam::MeshQuality,
            10003 => TerrainParam::SkirtHeight,
            10004 => TerrainParam::BlockSize,
            _ => return Err(TerrainError::UnknownParam(value)),
        })
    }
}

#[derive(Debug)]
pub enum TerrainError {
    UnknownParam(i32),
    WrongParamType(TerrainParam),
    WriteOnly(TerrainParam),
    InvalidHeightTexture(ResHandle),
    InvalidMaterial(ResHandle),
    HeightField(HeightFieldError),
    InvalidBlockSize { value: i32, heightmap_size: u32 },
    InvalidMeshQuality(f32),
    InvalidSkirtHeight(f32),
    EmptyName,
    GeometryExists(String),
    Database(database::Error),
    Device(DeviceError),
}

impl fmt::Display for TerrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainError::UnknownParam(p) => write!(f, "unknown terrain parameter {}", p),
            TerrainError::WrongParamType(p) => write!(f, "wrong value type for {:?}", p),
            TerrainError::WriteOnly(p) => write!(f, "{:?} can only be written", p),
            TerrainError::InvalidHeightTexture(h) => {
                write!(f, "invalid height map texture handle {}", h)
            }
            TerrainError::InvalidMaterial(h) => write!(f, "invalid material handle {}", h),
            TerrainError::HeightField(err) => write!(f, "height map rejected: {}", err),
            TerrainError::InvalidBlockSize {
                value,
                heightmap_size,
            } => write!(
                f,
                "invalid block size {} for a {} height map (must be 2^x + 1)",
                value, heightmap_size
            ),
            TerrainError::InvalidMeshQuality(q) => {
                write!(f, "mesh quality must be finite and positive, got {}", q)
            }
            TerrainError::InvalidSkirtHeight(s) => {
                write!(f, "skirt height must be finite and non-negative, got {}", s)
            }
            TerrainError::EmptyName => write!(f, "geometry name is empty"),
            TerrainError::GeometryExists(name) => {
                write!(f, "geometry resource '{}' already exists", name)
            }
            TerrainError::Database(err) => write!(f, "{}", err),
            TerrainError::Device(err) => write!(f, "device error: {}", err),
        }
    }
}

impl std::error::Error for TerrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerrainError::HeightField(err) => Some(err),
            TerrainError::Database(err) => Some(err),
            TerrainError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HeightFieldError> for TerrainError {
    fn from(value: HeightFieldError) -> Self {
        TerrainError::HeightField(value)
    }
}

impl From<database::Error> for TerrainError {
    fn from(value: database::Error) -> Self {
        TerrainError::Database(value)
    }
}

impl From<DeviceError> for TerrainError {
    fn from(value: DeviceError) -> Self {
        TerrainError::Device(value)
    }
}

/// Material a terrain is drawn with.
#[derive(Debug, Clone)]
pub struct TerrainMaterial {
    pub handle: ResHandle,
    pub material: MaterialResource,
}

impl TerrainMaterial {
    pub fn resolve(db: &Database, handle: ResHandle) -> Result<Self, TerrainError> {
        let material = db
            .material(handle)
            .map_err(|_| TerrainError::InvalidMaterial(handle))?;
        Ok(Self {
            handle,
            material: material.clone(),
        })
    }
}

/// `value` works as block size when `value - 1` divides the height map edge.
pub fn block_size_valid(value: i64, heightmap_size: u32) -> bool {
    value >= 2 && value <= heightmap_size as i64 && heightmap_size as i64 % (value - 1) == 0
}

fn resolve_height_texture(db: &Database, handle: ResHandle) -> Result<&TextureResource, TerrainError> {
    match db.texture(handle) {
        Ok(texture) if texture.tex_type == TextureType::Tex2D => Ok(texture),
        _ => Err(TerrainError::InvalidHeightTexture(handle)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockBuffers {
    vertex: BufferHandle,
    index: BufferHandle,
}

/// A height field terrain node occupying the unit cube in its local space.
pub struct Terrain {
    name: String,
    material: Option<TerrainMaterial>,
    block_size: u32,
    skirt_height: f32,
    mesh_quality: f32,
    height_field: HeightField,
    block_tree: BlockTree,
    mesh: BlockMesh,
    heights: Vec<f32>,
    buffers: Option<BlockBuffers>,
    retired: Vec<BufferHandle>,
    transform: Mat4,
    inv_transform: Mat4,
    bounds: Aabb,
}

impl Terrain {
    /// Builds a terrain from an already resolved height map. An unusable height map gives a
    /// flat terrain, unusable settings fall back to their defaults.
    pub fn new(
        name: &str,
        height_map: Option<&TextureResource>,
        material: Option<TerrainMaterial>,
        config: &TerrainConfig,
    ) -> Self {
        info!("Adding terrain '{}'", name);
        let (height_field, _) = HeightField::load_or_flat(height_map);

        let mut block_size = config.block_size;
        if !block_size_valid(block_size as i64, height_field.size()) {
            warn!(
                "Block size {} does not fit a {} height map, using {}",
                block_size,
                height_field.size(),
                DEFAULT_BLOCK_SIZE
            );
            block_size = DEFAULT_BLOCK_SIZE;
        }

        let mut mesh_quality = config.mesh_quality;
        if !(mesh_quality.is_finite() && mesh_quality > 0.0) {
            warn!("Invalid mesh quality {}, using {}", mesh_quality, DEFAULT_MESH_QUALITY);
            mesh_quality = DEFAULT_MESH_QUALITY;
        }

        let mut skirt_height = config.skirt_height;
        if !(skirt_height.is_finite() && skirt_height >= 0.0) {
            warn!("Invalid skirt height {}, disabling skirts", skirt_height);
            skirt_height = 0.0;
        }

        let block_tree = BlockTree::build(&height_field, block_size);
        Self {
            name: name.to_string(),
            material,
            block_size,
            skirt_height,
            mesh_quality,
            height_field,
            block_tree,
            mesh: BlockMesh::new(block_size),
            heights: Vec::new(),
            buffers: None,
            retired: Vec::new(),
            transform: Mat4::IDENTITY,
            inv_transform: Mat4::IDENTITY,
            bounds: Aabb::unit(),
        }
    }

    /// Terrain from resource handles. The height map must be a 2D texture and the material
    /// must exist.
    pub fn from_handles(
        db: &Database,
        name: &str,
        height_map: ResHandle,
        material: ResHandle,
        config: &TerrainConfig,
    ) -> Result<Self, TerrainError> {
        let texture = resolve_height_texture(db, height_map)?;
        let material = TerrainMaterial::resolve(db, material)?;
        Ok(Self::new(name, Some(texture), Some(material), config))
    }

    /// Terrain from a template whose resources are referenced by name.
    pub fn from_config(db: &Database, name: &str, config: &TerrainConfig) -> Result<Self, TerrainError> {
        let height_map = config
            .heightmap
            .as_deref()
            .and_then(|n| db.find(ResourceType::Texture, n))
            .unwrap_or(0);
        let material = config
            .material
            .as_deref()
            .and_then(|n| db.find(ResourceType::Material, n))
            .unwrap_or(0);
        Self::from_handles(db, name, height_map, material, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn skirt_height(&self) -> f32 {
        self.skirt_height
    }

    pub fn mesh_quality(&self) -> f32 {
        self.mesh_quality
    }

    pub fn lod_threshold(&self) -> f32 {
        1.0 / self.mesh_quality
    }

    pub fn material(&self) -> Option<&TerrainMaterial> {
        self.material.as_ref()
    }

    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    pub fn block_tree(&self) -> &BlockTree {
        &self.block_tree
    }

    pub fn mesh(&self) -> &BlockMesh {
        &self.mesh
    }

    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// World space bounds under the current transform.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.inv_transform = transform.inverse();
        self.bounds = Aabb::unit().transform(&transform);
    }

    pub fn get_param_i(&self, param: TerrainParam) -> Result<i32, TerrainError> {
        match param {
            TerrainParam::HeightTexRes => Err(TerrainError::WriteOnly(param)),
            TerrainParam::MatRes => Ok(self.material.as_ref().map_or(0, |m| m.handle as i32)),
            TerrainParam::BlockSize => Ok(self.block_size as i32),
            _ => Err(TerrainError::WrongParamType(param)),
        }
    }

    pub fn set_param_i(
        &mut self,
        db: &Database,
        param: TerrainParam,
        value: i32,
    ) -> Result<(), TerrainError> {
        match param {
            TerrainParam::HeightTexRes => {
                let texture = resolve_height_texture(db, value as ResHandle)?;
                let (field, err) = HeightField::load_or_flat(Some(texture));
                self.replace_height_field(field);
                match err {
                    Some(err) => Err(err.into()),
                    None => Ok(()),
                }
            }
            TerrainParam::MatRes => {
                self.material = Some(TerrainMaterial::resolve(db, value as ResHandle)?);
                Ok(())
            }
            TerrainParam::BlockSize => {
                let size = self.height_field.size();
                if !block_size_valid(value as i64, size) {
                    return Err(TerrainError::InvalidBlockSize {
                        value,
                        heightmap_size: size,
                    });
                }
                if self.block_size != value as u32 {
                    self.rebuild_blocks(value as u32);
                }
                Ok(())
            }
            _ => Err(TerrainError::WrongParamType(param)),
        }
    }

    pub fn get_param_f(&self, param: TerrainParam) -> Result<f32, TerrainError> {
        match param {
            TerrainParam::MeshQuality => Ok(self.mesh_quality),
            TerrainParam::SkirtHeight => Ok(self.skirt_height),
            _ => Err(TerrainError::WrongParamType(param)),
        }
    }

    pub fn set_param_f(&mut self, param: TerrainParam, value: f32) -> Result<(), TerrainError> {
        match param {
            TerrainParam::MeshQuality => {
                if !(value.is_finite() && value > 0.0) {
                    return Err(TerrainError::InvalidMeshQuality(value));
                }
                self.mesh_quality = value;
                Ok(())
            }
            TerrainParam::SkirtHeight => {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(TerrainError::InvalidSkirtHeight(value));
                }
                self.skirt_height = value;
                Ok(())
            }
            _ => Err(TerrainError::WrongParamType(param)),
        }
    }

    fn replace_height_field(&mut self, field: HeightField) {
        self.height_field = field;
        let block_size = if block_size_valid(self.block_size as i64, self.height_field.size()) {
            self.block_size
        } else {
            warn!(
                "Block size {} does not fit the new {} height map, using {}",
                self.block_size,
                self.height_field.size(),
                DEFAULT_BLOCK_SIZE
            );
            DEFAULT_BLOCK_SIZE
        };
        self.rebuild_blocks(block_size);
    }

    fn rebuild_blocks(&mut self, block_size: u32) {
        if block_size != self.mesh.block_size() {
            self.mesh = BlockMesh::new(block_size);
            self.retired.extend(
                self.buffers
                    .take()
                    .into_iter()
                    .flat_map(|b| [b.vertex, b.index]),
            );
        }
        self.block_size = block_size;
        self.block_tree = BlockTree::build(&self.height_field, block_size);
        debug!(
            "Terrain '{}' rebuilt: block size {}, {} levels",
            self.name,
            block_size,
            self.block_tree.max_level() + 1
        );
    }

    fn ensure_buffers(&mut self, device: &mut impl RenderDevice) -> Result<BlockBuffers, TerrainError> {
        for buffer in self.retired.drain(..) {
            device.destroy_buffer(buffer);
        }
        if let Some(buffers) = self.buffers {
            return Ok(buffers);
        }

        let vertex = device.create_buffer(BufferUsage::Vertex, &self.mesh.vertex_buffer_bytes())?;
        let index = match device.create_buffer(BufferUsage::Index, self.mesh.indices().as_bytes()) {
            Ok(index) => index,
            Err(err) => {
                device.destroy_buffer(vertex);
                return Err(err.into());
            }
        };
        let buffers = BlockBuffers { vertex, index };
        self.buffers = Some(buffers);
        Ok(buffers)
    }

    /// Frees the device buffers. They are created again on the next render.
    pub fn release(&mut self, device: &mut impl RenderDevice) {
        for buffer in self.retired.drain(..) {
            device.destroy_buffer(buffer);
        }
        if let Some(buffers) = self.buffers.take() {
            device.destroy_buffer(buffers.vertex);
            device.destroy_buffer(buffers.index);
        }
    }

    fn selector<'a>(&'a self, view: &RenderView<'a>) -> LodSelector<'a> {
        LodSelector {
            tree: &self.block_tree,
            transform: self.transform,
            skirt_height: self.skirt_height,
            lod_threshold: self.lod_threshold(),
            camera: view.camera.map(|c| self.inv_transform.transform_point3(c)),
            frusta: view.frusta,
        }
    }

    /// Blocks `render` would draw for `view`, in draw order.
    pub fn select_blocks(&self, view: &RenderView) -> Vec<SelectedBlock> {
        self.selector(view).select()
    }

    fn accepts(&self, view: &RenderView) -> bool {
        if view.debug_view {
            return true;
        }
        match (&self.material, view.material_class) {
            (None, _) => false,
            (Some(m), Some(class)) => m.material.is_of_class(class),
            (Some(_), None) => true,
        }
    }

    /// Draws the terrain for one view. Each selected block gets its uniform, its height
    /// stream and one strip draw.
    pub fn render(
        &mut self,
        device: &mut impl RenderDevice,
        view: &RenderView,
    ) -> Result<FrameStats, TerrainError> {
        if !self.accepts(view) {
            return Ok(FrameStats::default());
        }
        let buffers = self.ensure_buffers(device)?;
        device.set_world_transform(&self.transform);

        let mut heights = std::mem::take(&mut self.heights);
        let mut submitter = BlockSubmitter {
            device,
            field: &self.height_field,
            mesh: &self.mesh,
            buffers,
            skirt_height: self.skirt_height,
            heights: &mut heights,
            stats: FrameStats::default(),
            error: None,
        };
        let _ = self.selector(view).traverse(&mut submitter);
        let BlockSubmitter { stats, error, .. } = submitter;
        self.heights = heights;

        match error {
            Some(err) => Err(err.into()),
            None => Ok(stats),
        }
    }

    /// Ray query in world space over the segment `origin..origin + dir`. Returns the world
    /// position of the hit.
    pub fn check_intersection(&self, origin: Vec3, dir: Vec3) -> Option<Vec3> {
        if !self.bounds.intersects_ray(origin, dir) {
            return None;
        }
        let local_origin = self.inv_transform.transform_point3(origin);
        let local_dir = self.inv_transform.transform_vector3(dir);
        self.height_field
            .intersect_ray(local_origin, local_dir)
            .map(|p| self.transform.transform_point3(p))
    }
}

struct BlockSubmitter<'a, D: RenderDevice> {
    device: &'a mut D,
    field: &'a HeightField,
    mesh: &'a BlockMesh,
    buffers: BlockBuffers,
    skirt_height: f32,
    heights: &'a mut Vec<f32>,
    stats: FrameStats,
    error: Option<DeviceError>,
}

impl<D: RenderDevice> BlockVisitor for BlockSubmitter<'_, D> {
    fn visit_block(&mut self, block: SelectedBlock) -> ControlFlow<()> {
        let cell = block.cell;
        self.device
            .set_block_params(&BlockParams::new(cell.min_u(), cell.min_v(), cell.scale()));

        self.mesh
            .fill_heights(self.field, cell, self.skirt_height * block.distance, self.heights);
        let offset = self.mesh.height_stream_offset();
        if let Err(err) = self
            .device
            .update_buffer(self.buffers.vertex, offset, cast_slice(self.heights.as_slice()))
        {
            self.error = Some(err);
            return ControlFlow::Break(());
        }

        self.device.draw_indexed(&DrawIndexed {
            primitive: PrimitiveType::TriangleStrip,
            vertex_buffer: self.buffers.vertex,
            index_buffer: self.buffers.index,
            index_format: self.mesh.indices().format(),
            index_count: self.mesh.index_count() as u32,
            vertex_count: self.mesh.vertex_count() as u32,
            height_stream_offset: offset,
        });
        self.stats.batch_count += 1;
        self.stats.triangle_count += self.mesh.triangles_per_block();
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::database::TextureFormat;
    use crate::render::HeadlessDevice;

    fn texture(size: u32, f: impl Fn(u32, u32) -> u16) -> TextureResource {
        let mut pixels = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let h = f(x, y);
                pixels.extend_from_slice(&[0, (h & 0xff) as u8, (h >> 8) as u8, 255]);
            }
        }
        TextureResource {
            width: size,
            height: size,
            format: TextureFormat::Bgra8,
            tex_type: TextureType::Tex2D,
            pixels,
        }
    }

    fn material() -> TerrainMaterial {
        TerrainMaterial {
            handle: 7,
            material: MaterialResource {
                name: "ground".into(),
                class: "Terrain".into(),
                shader: None,
            },
        }
    }

    fn terrain_64() -> Terrain {
        let tex = texture(64, |x, y| ((x * 613 + y * 1021) % 509) as u16 * 120);
        Terrain::new("t", Some(&tex), Some(material()), &TerrainConfig::default())
    }

    #[test]
    fn block_size_rules() {
        assert!(block_size_valid(17, 64));
        assert!(block_size_valid(65, 64));
        assert!(block_size_valid(2, 64));
        assert!(!block_size_valid(10, 64));
        assert!(!block_size_valid(129, 64));
        assert!(!block_size_valid(1, 64));
        assert!(!block_size_valid(-3, 64));
    }

    #[test]
    fn param_ids_are_stable() {
        assert_eq!(TerrainParam::HeightTexRes as i32, 10000);
        assert_eq!(TerrainParam::try_from(10004).unwrap(), TerrainParam::BlockSize);
        assert!(matches!(
            TerrainParam::try_from(42),
            Err(TerrainError::UnknownParam(42))
        ));
    }

    #[test]
    fn rejected_block_size_keeps_state() {
        let mut terrain = terrain_64();
        let db = Database::in_memory();
        let before = terrain.block_tree().clone();
        let err = terrain
            .set_param_i(&db, TerrainParam::BlockSize, 10)
            .unwrap_err();
        assert!(err.to_string().contains("2^x + 1"));
        assert_eq!(terrain.block_size(), 17);
        assert_eq!(terrain.block_tree(), &before);

        terrain.set_param_i(&db, TerrainParam::BlockSize, 33).unwrap();
        assert_eq!(terrain.block_size(), 33);
        assert_eq!(terrain.mesh().vertex_count(), 35 * 35);
        assert_eq!(terrain.block_tree().max_level(), 1);
    }

    #[test]
    fn float_params_are_validated() {
        let mut terrain = terrain_64();
        assert!(terrain.set_param_f(TerrainParam::MeshQuality, 0.0).is_err());
        assert!(terrain.set_param_f(TerrainParam::MeshQuality, f32::NAN).is_err());
        assert_eq!(terrain.get_param_f(TerrainParam::MeshQuality).unwrap(), 50.0);
        terrain.set_param_f(TerrainParam::MeshQuality, 25.0).unwrap();
        assert!((terrain.lod_threshold() - 0.04).abs() < 1e-7);
        terrain.set_param_f(TerrainParam::SkirtHeight, 0.3).unwrap();
        assert_eq!(terrain.get_param_f(TerrainParam::SkirtHeight).unwrap(), 0.3);
        assert!(matches!(
            terrain.get_param_f(TerrainParam::BlockSize),
            Err(TerrainError::WrongParamType(TerrainParam::BlockSize))
        ));
        assert!(matches!(
            terrain.get_param_i(TerrainParam::HeightTexRes),
            Err(TerrainError::WriteOnly(_))
        ));
    }

    #[test]
    fn render_uploads_heights_per_block() {
        let mut terrain = terrain_64();
        let mut device = HeadlessDevice::capturing();
        let view = RenderView {
            camera: Some(Vec3::new(0.1, 0.5, 0.1)),
            ..Default::default()
        };
        let stats = terrain.render(&mut device, &view).unwrap();
        let selected = terrain.select_blocks(&view);

        assert_eq!(stats.batch_count as usize, selected.len());
        assert_eq!(stats.triangle_count, selected.len() as u64 * 648);
        assert_eq!(device.buffer_count(), 2);
        assert_eq!(device.draws.len(), selected.len());
        let first = &device.draws[0].draw;
        assert_eq!(device.buffer_usage(first.vertex_buffer), Some(BufferUsage::Vertex));
        assert_eq!(device.buffer_usage(first.index_buffer), Some(BufferUsage::Index));
        for (draw, block) in device.draws.iter().zip(&selected) {
            let cell = block.cell;
            assert_eq!(draw.params, BlockParams::new(cell.min_u(), cell.min_v(), cell.scale()));
            assert_eq!(draw.draw.index_count, 702);
            assert_eq!(draw.draw.primitive, PrimitiveType::TriangleStrip);
            let mut expected = Vec::new();
            terrain
                .mesh()
                .fill_heights(terrain.height_field(), cell, 0.1 * block.distance, &mut expected);
            assert_eq!(draw.heights.as_ref(), Some(&expected));
        }
    }

    #[test]
    fn material_class_filters_passes() {
        let mut terrain = terrain_64();
        let mut device = HeadlessDevice::new();
        let mut view = RenderView {
            material_class: Some("Water"),
            ..Default::default()
        };
        assert_eq!(terrain.render(&mut device, &view).unwrap().batch_count, 0);
        view.debug_view = true;
        assert_eq!(terrain.render(&mut device, &view).unwrap().batch_count, 1);
        view.debug_view = false;
        view.material_class = Some("Terrain");
        assert_eq!(terrain.render(&mut device, &view).unwrap().batch_count, 1);

        let mut bare = Terrain::new("bare", None, None, &TerrainConfig::default());
        assert_eq!(bare.render(&mut device, &RenderView::default()).unwrap().batch_count, 0);
    }

    #[test]
    fn block_size_change_recreates_buffers() {
        let mut terrain = terrain_64();
        let db = Database::in_memory();
        let mut device = HeadlessDevice::new();
        terrain.render(&mut device, &RenderView::default()).unwrap();
        let first = device.draws[0].draw.vertex_buffer;

        terrain.set_param_i(&db, TerrainParam::BlockSize, 33).unwrap();
        terrain.render(&mut device, &RenderView::default()).unwrap();
        assert_eq!(device.buffer_count(), 2);
        assert!(device.buffer_data(first).is_none());
        assert_eq!(device.draws[1].draw.vertex_count, 35 * 35);

        terrain.release(&mut device);
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn intersection_follows_transform() {
        let mut terrain = Terrain::new("flat", None, Some(material()), &TerrainConfig::default());
        terrain.set_transform(Mat4::from_scale_rotation_translation(
            Vec3::new(100.0, 10.0, 100.0),
            glam::Quat::IDENTITY,
            Vec3::new(-50.0, 5.0, -50.0),
        ));
        let hit = terrain
            .check_intersection(Vec3::new(0.0, 100.0, 0.0), Vec3::NEG_Y)
            .unwrap();
        assert!((hit.y - 5.0).abs() < 1e-3);
        assert!(hit.x.abs() < 1e-3 && hit.z.abs() < 1e-3);
        assert!(terrain
            .check_intersection(Vec3::new(80.0, 100.0, 0.0), Vec3::NEG_Y)
            .is_none());
    }

    #[test]
    fn slanted_ray_on_scaled_terrain() {
        let tex = texture(32, |_, _| 32768);
        let mut terrain = Terrain::new("plateau", Some(&tex), Some(material()), &TerrainConfig::default());
        terrain.set_transform(Mat4::from_scale(Vec3::new(100.0, 10.0, 100.0)));

        // local ray enters at height 0.7 and reaches the plateau at x = 0.2
        let origin = Vec3::new(-100.0, 17.0, 50.0);
        let hit = terrain
            .check_intersection(origin, Vec3::new(300.0, -30.0, 0.0))
            .unwrap();
        assert!((hit.x - 20.0).abs() < 4.0);
        assert!((hit.y - 5.0).abs() < 0.5);
        assert!((hit.z - 50.0).abs() < 1e-3);

        // same direction, too short to reach the footprint
        assert!(terrain
            .check_intersection(origin, Vec3::new(1.0, -0.1, 0.0))
            .is_none());
    }
}
