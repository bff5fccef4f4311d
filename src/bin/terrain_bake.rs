//! Bakes a height map image into a static `H3DG` geometry file.
//!
//! Usage: `terrain_bake <heightmap> <out.geo> [meshQuality] [blockSize] [skirtHeight]`

use std::process::ExitCode;

use meshi_terrain::render::database::images::load_image_from_path;
use meshi_terrain::terrain::HeightField;
use meshi_terrain::{Terrain, TerrainConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn parse_arg<T: std::str::FromStr>(args: &[String], idx: usize, name: &str, default: T) -> Result<T, String> {
    match args.get(idx) {
        Some(value) => value
            .parse()
            .map_err(|_| format!("invalid {} '{}'", name, value)),
        None => Ok(default),
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let (Some(input), Some(output)) = (args.get(1), args.get(2)) else {
        return Err(format!(
            "usage: {} <heightmap> <out.geo> [meshQuality] [blockSize] [skirtHeight]",
            args.first().map_or("terrain_bake", |s| s.as_str())
        ));
    };

    let defaults = TerrainConfig::default();
    let config = TerrainConfig {
        mesh_quality: parse_arg(args, 3, "mesh quality", defaults.mesh_quality)?,
        block_size: parse_arg(args, 4, "block size", defaults.block_size)?,
        skirt_height: parse_arg(args, 5, "skirt height", defaults.skirt_height)?,
        ..defaults
    };

    let texture = load_image_from_path(input).map_err(|e| format!("{}: {}", input, e))?;
    // no flat fallback when baking
    HeightField::load(&texture).map_err(|e| format!("{}: {}", input, e))?;

    let terrain = Terrain::new(input, Some(&texture), None, &config);
    let data = terrain.export_geometry(terrain.lod_threshold());
    std::fs::write(output, &data).map_err(|e| format!("{}: {}", output, e))?;

    info!(
        "Wrote {} ({} bytes, block size {}, mesh quality {})",
        output,
        data.len(),
        terrain.block_size(),
        terrain.mesh_quality()
    );
    Ok(())
}

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args: Vec<String> = std::env::args().collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
