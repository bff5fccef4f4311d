use image::{DynamicImage, ImageBuffer, Luma, RgbaImage};
use tracing::debug;

use super::{Error, LoadingError, Result, TextureFormat, TextureResource, TextureType};

/// Reorders RGBA8 texels into the BGRA8 layout terrain height maps are read from.
pub fn texture_from_rgba(img: &RgbaImage) -> TextureResource {
    let (width, height) = img.dimensions();
    let mut pixels = img.as_raw().clone();
    for texel in pixels.chunks_exact_mut(4) {
        texel.swap(0, 2);
    }

    TextureResource {
        width,
        height,
        format: TextureFormat::Bgra8,
        tex_type: TextureType::Tex2D,
        pixels,
    }
}

/// Packs 16 bit grayscale into red (coarse) and green (fine), keeping full precision.
pub fn texture_from_luma16(img: &ImageBuffer<Luma<u16>, Vec<u16>>) -> TextureResource {
    let (width, height) = img.dimensions();
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for texel in img.pixels() {
        let [hi, lo] = texel.0[0].to_be_bytes();
        pixels.extend_from_slice(&[0, lo, hi, 255]);
    }

    TextureResource {
        width,
        height,
        format: TextureFormat::Bgra8,
        tex_type: TextureType::Tex2D,
        pixels,
    }
}

pub fn texture_from_image(img: DynamicImage) -> TextureResource {
    match img {
        DynamicImage::ImageLuma16(buf) => texture_from_luma16(&buf),
        other => texture_from_rgba(&other.to_rgba8()),
    }
}

pub fn load_image_from_path(path: &str) -> Result<TextureResource> {
    debug!("Decoding image {}", path);
    let img = image::open(path).map_err(|err| {
        Error::LoadingError(LoadingError {
            entry: err.to_string(),
            path: path.to_string(),
        })
    })?;
    Ok(texture_from_image(img))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rgba_is_swizzled_to_bgra() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        let tex = texture_from_rgba(&img);
        assert_eq!(tex.pixels, vec![3, 2, 1, 4]);
        assert_eq!(tex.format, TextureFormat::Bgra8);
    }

    #[test]
    fn luma16_keeps_both_bytes() {
        let mut img = ImageBuffer::<Luma<u16>, Vec<u16>>::new(1, 1);
        img.put_pixel(0, 0, Luma([0x1234]));
        let tex = texture_from_luma16(&img);
        assert_eq!(tex.pixels[2] as u16 * 256 + tex.pixels[1] as u16, 0x1234);
    }
}
