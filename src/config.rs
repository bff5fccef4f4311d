use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_MESH_QUALITY: f32 = 50.0;
pub const DEFAULT_SKIRT_HEIGHT: f32 = 0.1;
pub const DEFAULT_BLOCK_SIZE: u32 = 17;

/// Terrain template, as written in scene files or the database `terrains` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TerrainConfig {
    /// Name of the height map texture.
    pub heightmap: Option<String>,
    pub material: Option<String>,
    pub mesh_quality: f32,
    pub skirt_height: f32,
    pub block_size: u32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            heightmap: None,
            material: None,
            mesh_quality: DEFAULT_MESH_QUALITY,
            skirt_height: DEFAULT_SKIRT_HEIGHT,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidAttribute { key: String, value: String },
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidAttribute { key, value } => {
                write!(f, "invalid value '{}' for terrain attribute '{}'", value, key)
            }
            ConfigError::Json(err) => write!(f, "failed to parse terrain config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Json(value)
    }
}

impl TerrainConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds a template from scene node attributes. Unknown keys are ignored.
    pub fn from_attributes(attribs: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = attribs.get("heightmap") {
            cfg.heightmap = Some(v.clone());
        }
        if let Some(v) = attribs.get("material") {
            cfg.material = Some(v.clone());
        }
        if let Some(v) = attribs.get("meshQuality") {
            cfg.mesh_quality = parse_attribute("meshQuality", v)?;
        }
        if let Some(v) = attribs.get("skirtHeight") {
            cfg.skirt_height = parse_attribute("skirtHeight", v)?;
        }
        if let Some(v) = attribs.get("blockSize") {
            cfg.block_size = parse_attribute("blockSize", v)?;
        }
        Ok(cfg)
    }

    pub fn lod_threshold(&self) -> f32 {
        1.0 / self.mesh_quality
    }
}

fn parse_attribute<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidAttribute {
            key: key.to_string(),
            value: value.to_string(),
        })
}
