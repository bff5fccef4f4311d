pub mod error;
pub mod geometry;
pub mod images;
pub mod json;

pub use error::*;
pub use geometry::*;
use images::*;

use std::collections::HashMap;
use std::fs;
use tracing::{debug, info};

use crate::config::TerrainConfig;

/// Resource handle; `0` never refers to a resource.
pub type ResHandle = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Texture,
    Material,
    Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Bgra8,
    Rgba8,
    Rgba16F,
    Dxt1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureType {
    Tex2D,
    TexCube,
}

#[derive(Debug, Clone)]
pub struct TextureResource {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub tex_type: TextureType,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MaterialResource {
    pub name: String,
    pub class: String,
    pub shader: Option<String>,
}

impl MaterialResource {
    /// Class names are dot separated paths; `"Terrain"` matches `"Terrain.Rock"`.
    /// A leading `~` negates the match.
    pub fn is_of_class(&self, class: &str) -> bool {
        if let Some(negated) = class.strip_prefix('~') {
            return !self.is_of_class(negated);
        }
        if class.is_empty() {
            return true;
        }
        self.class == class
            || self
                .class
                .strip_prefix(class)
                .map_or(false, |rest| rest.starts_with('.'))
    }
}

#[derive(Debug, Clone)]
pub enum Resource {
    Texture(TextureResource),
    Material(MaterialResource),
    Geometry(GeometryResource),
}

impl Resource {
    pub fn kind(&self) -> ResourceType {
        match self {
            Resource::Texture(_) => ResourceType::Texture,
            Resource::Material(_) => ResourceType::Material,
            Resource::Geometry(_) => ResourceType::Geometry,
        }
    }
}

struct Entry {
    name: String,
    resource: Resource,
}

/// Named resources addressed by handle. Stands in for the engine resource manager.
#[derive(Default)]
pub struct Database {
    base_path: String,
    entries: HashMap<ResHandle, Entry>,
    names: HashMap<(ResourceType, String), ResHandle>,
    next_handle: ResHandle,
    terrains: Vec<(String, TerrainConfig)>,
}

impl Database {
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn in_memory() -> Self {
        Self {
            next_handle: 1,
            ..Default::default()
        }
    }

    pub fn new(base_path: &str) -> Result<Self> {
        info!("Loading Database {}", format!("{}/db.json", base_path));

        let json_data = fs::read_to_string(format!("{}/db.json", base_path))?;
        let info: json::Database = serde_json::from_str(&json_data)?;

        let mut db = Self::in_memory();
        db.base_path = base_path.to_string();

        if let Some(images_file) = info.images {
            let images_path = format!("{}/{}", base_path, images_file);
            let images_json = fs::read_to_string(&images_path)?;
            let images_cfg: json::Image = serde_json::from_str(&images_json)?;
            for img in images_cfg.images {
                let path = format!("{}/{}", base_path, img.path);
                let texture = load_image_from_path(&path).map_err(|_| {
                    Error::LoadingError(LoadingError {
                        entry: img.name.clone(),
                        path: path.clone(),
                    })
                })?;
                db.add_texture(&img.name, texture)?;
                info!("Registered image asset: {}", img.name);
            }
        }

        if let Some(mat_file) = info.materials {
            let mat_path = format!("{}/{}", base_path, mat_file);
            let mat_json = fs::read_to_string(&mat_path)?;
            let mat_cfg: json::Materials = serde_json::from_str(&mat_json)?;
            for mat in mat_cfg.materials {
                info!("Registered material asset: {}", mat.name);
                let name = mat.name.clone();
                db.add_material(
                    &name,
                    MaterialResource {
                        name: mat.name,
                        class: mat.class,
                        shader: mat.shader,
                    },
                )?;
            }
        }

        if let Some(terrain_file) = info.terrains {
            let terrain_path = format!("{}/{}", base_path, terrain_file);
            let terrain_json = fs::read_to_string(&terrain_path)?;
            let terrain_cfg: json::Terrains = serde_json::from_str(&terrain_json)?;
            for terrain in terrain_cfg.terrains {
                info!("Registered terrain template: {}", terrain.name);
                db.terrains.push((terrain.name, terrain.config));
            }
        }

        Ok(db)
    }

    fn insert(&mut self, name: &str, resource: Resource) -> Result<ResHandle> {
        let key = (resource.kind(), name.to_string());
        if self.names.contains_key(&key) {
            return Err(Error::DuplicateError(DuplicateError {
                kind: key.0,
                entry: key.1,
            }));
        }

        if self.next_handle == 0 {
            self.next_handle = 1;
        }
        let handle = self.next_handle;
        self.next_handle += 1;

        debug!("Registering {:?} resource {} as {}", key.0, name, handle);
        self.names.insert(key, handle);
        self.entries.insert(
            handle,
            Entry {
                name: name.to_string(),
                resource,
            },
        );
        Ok(handle)
    }

    pub fn add_texture(&mut self, name: &str, texture: TextureResource) -> Result<ResHandle> {
        self.insert(name, Resource::Texture(texture))
    }

    pub fn add_material(&mut self, name: &str, material: MaterialResource) -> Result<ResHandle> {
        self.insert(name, Resource::Material(material))
    }

    /// Validates `data` as an `H3DG` blob before registering it.
    pub fn add_geometry(&mut self, name: &str, data: Vec<u8>) -> Result<ResHandle> {
        if self.find(ResourceType::Geometry, name).is_some() {
            return Err(Error::DuplicateError(DuplicateError {
                kind: ResourceType::Geometry,
                entry: name.to_string(),
            }));
        }
        let geometry = GeometryResource::load(data)?;
        self.insert(name, Resource::Geometry(geometry))
    }

    /// Loads an image relative to the database directory as a texture.
    pub fn load_image(&mut self, name: &str, path: &str) -> Result<ResHandle> {
        let full = if self.base_path.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", self.base_path, path)
        };
        let texture = load_image_from_path(&full)?;
        self.add_texture(name, texture)
    }

    pub fn find(&self, kind: ResourceType, name: &str) -> Option<ResHandle> {
        self.names.get(&(kind, name.to_string())).copied()
    }

    pub fn resolve(&self, handle: ResHandle) -> Option<&Resource> {
        self.entries.get(&handle).map(|e| &e.resource)
    }

    pub fn name_of(&self, handle: ResHandle) -> Option<&str> {
        self.entries.get(&handle).map(|e| e.name.as_str())
    }

    pub fn texture(&self, handle: ResHandle) -> Result<&TextureResource> {
        match self.resolve(handle) {
            Some(Resource::Texture(tex)) => Ok(tex),
            _ => Err(Error::lookup(format!("texture #{}", handle))),
        }
    }

    pub fn material(&self, handle: ResHandle) -> Result<&MaterialResource> {
        match self.resolve(handle) {
            Some(Resource::Material(mat)) => Ok(mat),
            _ => Err(Error::lookup(format!("material #{}", handle))),
        }
    }

    pub fn geometry(&self, handle: ResHandle) -> Result<&GeometryResource> {
        match self.resolve(handle) {
            Some(Resource::Geometry(geo)) => Ok(geo),
            _ => Err(Error::lookup(format!("geometry #{}", handle))),
        }
    }

    pub fn remove(&mut self, handle: ResHandle) -> Option<Resource> {
        let entry = self.entries.remove(&handle)?;
        self.names.remove(&(entry.resource.kind(), entry.name));
        Some(entry.resource)
    }

    /// Terrain templates declared in the database config.
    pub fn terrain_configs(&self) -> &[(String, TerrainConfig)] {
        &self.terrains
    }

    pub fn terrain_config(&self, name: &str) -> Result<&TerrainConfig> {
        self.terrains
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cfg)| cfg)
            .ok_or_else(|| Error::lookup(name))
    }
}
