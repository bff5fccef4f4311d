#![allow(dead_code)]

use meshi_terrain::render::database::{TextureFormat, TextureResource, TextureType};

/// BGRA8 texels encoding `f(x, y)` in red (high byte) and green (low byte).
pub fn bgra_pixels(size: u32, f: impl Fn(u32, u32) -> u16) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let [hi, lo] = f(x, y).to_be_bytes();
            pixels.extend_from_slice(&[0, lo, hi, 255]);
        }
    }
    pixels
}

pub fn height_texture(size: u32, f: impl Fn(u32, u32) -> u16) -> TextureResource {
    TextureResource {
        width: size,
        height: size,
        format: TextureFormat::Bgra8,
        tex_type: TextureType::Tex2D,
        pixels: bgra_pixels(size, f),
    }
}

/// Rolling hills with enough detail to force subdivision near the camera.
pub fn hills(x: u32, y: u32) -> u16 {
    let fx = x as f32 * 0.37;
    let fy = y as f32 * 0.23;
    let h = 0.5 + 0.25 * fx.sin() * fy.cos() + 0.2 * (fx * 0.31 + fy * 0.7).sin();
    (h.clamp(0.0, 1.0) * 65535.0) as u16
}
