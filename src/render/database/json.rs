use serde::{Deserialize, Serialize};

use crate::config::TerrainConfig;

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct ImageEntry {
    pub name: String,
    pub path: String,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct Image {
    pub images: Vec<ImageEntry>,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct MaterialEntry {
    pub name: String,
    #[serde(default)]
    pub class: String,
    pub shader: Option<String>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Materials {
    pub materials: Vec<MaterialEntry>,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct TerrainEntry {
    pub name: String,
    #[serde(flatten)]
    pub config: TerrainConfig,
}

#[derive(Deserialize, Serialize, Clone)]
pub struct Terrains {
    pub terrains: Vec<TerrainEntry>,
}

#[derive(Deserialize, Serialize, Clone, Default)]
pub struct Database {
    pub images: Option<String>,
    pub materials: Option<String>,
    pub terrains: Option<String>,
}
