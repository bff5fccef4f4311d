pub mod config;
pub mod math;
pub mod render;
pub mod terrain;

pub use config::TerrainConfig;
pub use terrain::{Terrain, TerrainError, TerrainParam};

use glam::{Mat4, Vec3};
use render::database::{Database, MaterialResource, ResHandle, TextureFormat, TextureResource, TextureType};
use std::ffi::*;
use std::sync::Once;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Handle of a terrain inside a [`TerrainContext`]; `0` is never valid.
pub type NodeHandle = u32;

static LOGGING: Once = Once::new();

fn init_logging() {
    LOGGING.call_once(|| {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::INFO)
            .finish();
        // The host may already have installed its own subscriber.
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Resources plus the terrains created from them, returned by
/// [`meshi_terrain_make_context`].
pub struct TerrainContext {
    database: Database,
    terrains: Vec<Option<Terrain>>,
}

impl TerrainContext {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            terrains: Vec::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.database
    }

    pub fn add_terrain(&mut self, terrain: Terrain) -> NodeHandle {
        self.terrains.push(Some(terrain));
        self.terrains.len() as NodeHandle
    }

    pub fn terrain(&self, node: NodeHandle) -> Option<&Terrain> {
        let idx = (node as usize).checked_sub(1)?;
        self.terrains.get(idx)?.as_ref()
    }

    pub fn terrain_mut(&mut self, node: NodeHandle) -> Option<&mut Terrain> {
        let idx = (node as usize).checked_sub(1)?;
        self.terrains.get_mut(idx)?.as_mut()
    }

    pub fn remove_terrain(&mut self, node: NodeHandle) -> Option<Terrain> {
        let idx = (node as usize).checked_sub(1)?;
        self.terrains.get_mut(idx)?.take()
    }
}

fn str_arg<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn context<'a>(ctx: *mut TerrainContext) -> Option<&'a mut TerrainContext> {
    if ctx.is_null() {
        return None;
    }
    Some(unsafe { &mut *ctx })
}

/// Create a terrain context.
///
/// With a null `base_path` the resource database starts empty; otherwise it is loaded from
/// `<base_path>/db.json`. Returns null when the database cannot be loaded.
///
/// # Safety
/// `base_path` must be null or a valid C string.
#[no_mangle]
pub extern "C" fn meshi_terrain_make_context(base_path: *const c_char) -> *mut TerrainContext {
    init_logging();

    let database = if base_path.is_null() {
        Database::in_memory()
    } else {
        let Some(path) = str_arg(base_path) else {
            return std::ptr::null_mut();
        };
        match Database::new(path) {
            Ok(db) => db,
            Err(err) => {
                warn!("Failed to load database '{}': {}", path, err);
                return std::ptr::null_mut();
            }
        }
    };

    info!("--INITIALIZING TERRAIN CONTEXT--");
    Box::into_raw(Box::new(TerrainContext::new(database)))
}

/// Destroy a context previously created with [`meshi_terrain_make_context`].
///
/// # Safety
/// `ctx` must be null or a pointer returned from [`meshi_terrain_make_context`] that is not
/// used afterwards.
#[no_mangle]
pub extern "C" fn meshi_terrain_destroy_context(ctx: *mut TerrainContext) {
    if !ctx.is_null() {
        unsafe {
            let _ctx = Box::from_raw(ctx);
        }
    }
}

////////////////////////////////////////////
/////////////////RESOURCES//////////////////
////////////////////////////////////////////

/// Load an image file as texture `name`. Returns `0` on failure.
///
/// # Safety
/// `ctx` must be a valid context, `name` and `path` valid C strings.
#[no_mangle]
pub extern "C" fn meshi_terrain_load_texture(
    ctx: *mut TerrainContext,
    name: *const c_char,
    path: *const c_char,
) -> ResHandle {
    let (Some(ctx), Some(name), Some(path)) = (context(ctx), str_arg(name), str_arg(path)) else {
        return 0;
    };
    ctx.database.load_image(name, path).unwrap_or_else(|err| {
        warn!("Failed to load texture '{}': {}", name, err);
        0
    })
}

/// Register `width * height` BGRA8 texels as 2D texture `name`. Returns `0` on failure.
///
/// # Safety
/// `pixels` must point to `width * height * 4` readable bytes.
#[no_mangle]
pub extern "C" fn meshi_terrain_add_texture_bgra8(
    ctx: *mut TerrainContext,
    name: *const c_char,
    width: u32,
    height: u32,
    pixels: *const u8,
) -> ResHandle {
    let (Some(ctx), Some(name)) = (context(ctx), str_arg(name)) else {
        return 0;
    };
    if pixels.is_null() {
        return 0;
    }
    let len = width as usize * height as usize * 4;
    let pixels = unsafe { std::slice::from_raw_parts(pixels, len) }.to_vec();
    let texture = TextureResource {
        width,
        height,
        format: TextureFormat::Bgra8,
        tex_type: TextureType::Tex2D,
        pixels,
    };
    ctx.database.add_texture(name, texture).unwrap_or(0)
}

/// Register material `name` of `class` (may be null). Returns `0` on failure.
///
/// # Safety
/// `name` must be a valid C string, `class` null or a valid C string.
#[no_mangle]
pub extern "C" fn meshi_terrain_add_material(
    ctx: *mut TerrainContext,
    name: *const c_char,
    class: *const c_char,
) -> ResHandle {
    let (Some(ctx), Some(name)) = (context(ctx), str_arg(name)) else {
        return 0;
    };
    let material = MaterialResource {
        name: name.to_string(),
        class: str_arg(class).unwrap_or_default().to_string(),
        shader: None,
    };
    ctx.database.add_material(name, material).unwrap_or(0)
}

/// Pointer to the serialized data of geometry resource `res`, its size written to `size`.
/// Returns null for anything but a geometry resource.
///
/// # Safety
/// The returned pointer is valid until the resource or context is destroyed.
#[no_mangle]
pub extern "C" fn meshi_terrain_geometry_data(
    ctx: *mut TerrainContext,
    res: ResHandle,
    size: *mut u32,
) -> *const u8 {
    let Some(ctx) = context(ctx) else {
        return std::ptr::null();
    };
    match ctx.database.geometry(res) {
        Ok(geo) => {
            if !size.is_null() {
                unsafe { *size = geo.data.len() as u32 };
            }
            geo.data.as_ptr()
        }
        Err(_) => std::ptr::null(),
    }
}

////////////////////////////////////////////
//////////////////TERRAIN///////////////////
////////////////////////////////////////////

/// Add a terrain using a 2D height map texture and a material. Returns `0` on failure.
///
/// # Safety
/// `ctx` must be a valid context and `name` null or a valid C string.
#[no_mangle]
pub extern "C" fn meshi_terrain_add(
    ctx: *mut TerrainContext,
    name: *const c_char,
    height_map: ResHandle,
    material: ResHandle,
) -> NodeHandle {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let name = str_arg(name).unwrap_or_default();
    match Terrain::from_handles(
        &ctx.database,
        name,
        height_map,
        material,
        &TerrainConfig::default(),
    ) {
        Ok(terrain) => ctx.add_terrain(terrain),
        Err(err) => {
            warn!("Failed to add terrain '{}': {}", name, err);
            0
        }
    }
}

/// Remove a terrain. Returns `1` when it existed.
#[no_mangle]
pub extern "C" fn meshi_terrain_remove(ctx: *mut TerrainContext, node: NodeHandle) -> i32 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    ctx.remove_terrain(node).is_some() as i32
}

fn param_result<T>(result: Result<T, TerrainError>, fallback: T) -> T {
    result.unwrap_or_else(|err| {
        warn!("{}", err);
        fallback
    })
}

#[no_mangle]
pub extern "C" fn meshi_terrain_get_param_i(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    param: i32,
) -> i32 {
    let Some(terrain) = context(ctx).and_then(|c| c.terrain(node)) else {
        return 0;
    };
    param_result(
        TerrainParam::try_from(param).and_then(|p| terrain.get_param_i(p)),
        0,
    )
}

/// Returns `1` on success, `0` when the value was rejected.
#[no_mangle]
pub extern "C" fn meshi_terrain_set_param_i(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    param: i32,
    value: i32,
) -> i32 {
    let Some(ctx) = context(ctx) else {
        return 0;
    };
    let TerrainContext { database, terrains } = ctx;
    let Some(terrain) = (node as usize)
        .checked_sub(1)
        .and_then(|i| terrains.get_mut(i))
        .and_then(|t| t.as_mut())
    else {
        return 0;
    };
    let result = TerrainParam::try_from(param).and_then(|p| terrain.set_param_i(database, p, value));
    param_result(result.map(|_| 1), 0)
}

#[no_mangle]
pub extern "C" fn meshi_terrain_get_param_f(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    param: i32,
) -> c_float {
    let Some(terrain) = context(ctx).and_then(|c| c.terrain(node)) else {
        return 0.0;
    };
    param_result(
        TerrainParam::try_from(param).and_then(|p| terrain.get_param_f(p)),
        0.0,
    )
}

/// Returns `1` on success, `0` when the value was rejected.
#[no_mangle]
pub extern "C" fn meshi_terrain_set_param_f(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    param: i32,
    value: c_float,
) -> i32 {
    let Some(terrain) = context(ctx).and_then(|c| c.terrain_mut(node)) else {
        return 0;
    };
    param_result(
        TerrainParam::try_from(param)
            .and_then(|p| terrain.set_param_f(p, value))
            .map(|_| 1),
        0,
    )
}

/// Set the world transform of a terrain.
///
/// # Safety
/// `transform` must point to a valid [`Mat4`].
#[no_mangle]
pub extern "C" fn meshi_terrain_set_transform(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    transform: *const Mat4,
) -> i32 {
    if transform.is_null() {
        return 0;
    }
    let Some(terrain) = context(ctx).and_then(|c| c.terrain_mut(node)) else {
        return 0;
    };
    terrain.set_transform(unsafe { *transform });
    1
}

/// Intersect a world space ray with a terrain. Writes the hit to `out` and returns `1` on a
/// hit.
///
/// # Safety
/// `origin`, `dir` and `out` must be valid pointers.
#[no_mangle]
pub extern "C" fn meshi_terrain_check_intersection(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    origin: *const Vec3,
    dir: *const Vec3,
    out: *mut Vec3,
) -> i32 {
    if origin.is_null() || dir.is_null() || out.is_null() {
        return 0;
    }
    let Some(terrain) = context(ctx).and_then(|c| c.terrain(node)) else {
        return 0;
    };
    match terrain.check_intersection(unsafe { *origin }, unsafe { *dir }) {
        Some(hit) => {
            unsafe { *out = hit };
            1
        }
        None => 0,
    }
}

/// Bake a terrain at `mesh_quality` into geometry resource `name`. Returns `0` on failure.
///
/// # Safety
/// `name` must be a valid C string.
#[no_mangle]
pub extern "C" fn meshi_terrain_create_geometry(
    ctx: *mut TerrainContext,
    node: NodeHandle,
    name: *const c_char,
    mesh_quality: c_float,
) -> ResHandle {
    let (Some(ctx), Some(name)) = (context(ctx), str_arg(name)) else {
        return 0;
    };
    if !(mesh_quality.is_finite() && mesh_quality > 0.0) {
        warn!("Invalid mesh quality {} for geometry '{}'", mesh_quality, name);
        return 0;
    }
    let TerrainContext { database, terrains } = ctx;
    let Some(terrain) = (node as usize)
        .checked_sub(1)
        .and_then(|i| terrains.get(i))
        .and_then(|t| t.as_ref())
    else {
        return 0;
    };
    param_result(
        terrain.create_geometry_resource(database, name, 1.0 / mesh_quality),
        0,
    )
}
