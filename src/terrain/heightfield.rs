use std::fmt;

use tracing::{debug, warn};

use crate::render::database::{TextureFormat, TextureResource, TextureType};

pub const MIN_HEIGHTMAP_SIZE: u32 = 32;
pub const MAX_HEIGHTMAP_SIZE: u32 = 8192;
/// Edge of the flat field used when the height source is unusable.
pub const FLAT_SIZE: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeightFieldError {
    UnsupportedType(TextureType),
    UnsupportedFormat(TextureFormat),
    NotSquare { width: u32, height: u32 },
    UnsupportedSize(u32),
    TruncatedPixels { expected: usize, actual: usize },
}

impl fmt::Display for HeightFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightFieldError::UnsupportedType(t) => {
                write!(f, "height map must be a 2D texture, got {:?}", t)
            }
            HeightFieldError::UnsupportedFormat(fmt) => {
                write!(f, "height map must be BGRA8, got {:?}", fmt)
            }
            HeightFieldError::NotSquare { width, height } => {
                write!(f, "height map must be square, got {}x{}", width, height)
            }
            HeightFieldError::UnsupportedSize(size) => write!(
                f,
                "height map edge {} is not a power of two in {}..={}",
                size, MIN_HEIGHTMAP_SIZE, MAX_HEIGHTMAP_SIZE
            ),
            HeightFieldError::TruncatedPixels { expected, actual } => write!(
                f,
                "height map holds {} bytes, {} expected",
                actual, expected
            ),
        }
    }
}

impl std::error::Error for HeightFieldError {}

/// Square grid of 16-bit elevations with one replicated row and column, so that
/// `(N + 1) x (N + 1)` samples cover the closed unit square.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    size: u32,
    samples: Vec<u16>,
}

impl HeightField {
    /// All-zero field of the fallback size.
    pub fn flat_default() -> Self {
        Self::flat(FLAT_SIZE)
    }

    pub fn flat(size: u32) -> Self {
        let edge = size as usize + 1;
        Self {
            size,
            samples: vec![0; edge * edge],
        }
    }

    /// Builds a field of edge `size` from a sampling function over pixel coordinates.
    pub fn from_fn(size: u32, mut f: impl FnMut(u32, u32) -> u16) -> Self {
        let edge = size as usize + 1;
        let mut samples = Vec::with_capacity(edge * edge);
        for y in 0..=size {
            for x in 0..=size {
                let last = size.saturating_sub(1);
                samples.push(f(x.min(last), y.min(last)));
            }
        }
        Self { size, samples }
    }

    pub fn load(texture: &TextureResource) -> Result<Self, HeightFieldError> {
        if texture.tex_type != TextureType::Tex2D {
            return Err(HeightFieldError::UnsupportedType(texture.tex_type));
        }
        if texture.format != TextureFormat::Bgra8 {
            return Err(HeightFieldError::UnsupportedFormat(texture.format));
        }
        Self::from_bgra8(texture.width, texture.height, &texture.pixels)
    }

    pub fn from_bgra8(width: u32, height: u32, pixels: &[u8]) -> Result<Self, HeightFieldError> {
        if width != height {
            return Err(HeightFieldError::NotSquare { width, height });
        }
        let size = width;
        if !size.is_power_of_two() || !(MIN_HEIGHTMAP_SIZE..=MAX_HEIGHTMAP_SIZE).contains(&size) {
            return Err(HeightFieldError::UnsupportedSize(size));
        }
        let expected = size as usize * size as usize * 4;
        if pixels.len() < expected {
            return Err(HeightFieldError::TruncatedPixels {
                expected,
                actual: pixels.len(),
            });
        }

        let n = size as usize;
        let field = Self::from_fn(size, |x, y| {
            let texel = (y as usize * n + x as usize) * 4;
            (pixels[texel + 2] as u16) << 8 | pixels[texel + 1] as u16
        });
        debug!("Decoded {}x{} height map", size, size);
        Ok(field)
    }

    /// Loads `texture`, falling back to the flat default and handing back the reason.
    pub fn load_or_flat(texture: Option<&TextureResource>) -> (Self, Option<HeightFieldError>) {
        match texture.map(Self::load) {
            Some(Ok(field)) => (field, None),
            Some(Err(err)) => {
                warn!("Unsupported height map ({}), using a flat terrain", err);
                (Self::flat_default(), Some(err))
            }
            None => (Self::flat_default(), None),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Raw sample at pixel `(x, y)`, clamped into the field.
    pub fn sample(&self, x: i64, y: i64) -> u16 {
        let n = self.size as i64;
        let x = x.clamp(0, n) as usize;
        let y = y.clamp(0, n) as usize;
        self.samples[y * (self.size as usize + 1) + x]
    }

    /// Normalized height at pixel `(x, y)`.
    pub fn height_at_pixel(&self, x: i64, y: i64) -> f32 {
        self.sample(x, y) as f32 / 65535.0
    }

    /// Normalized height of the sample nearest to `(u, v)` on the unit square.
    pub fn height(&self, u: f32, v: f32) -> f32 {
        let n = self.size as f32;
        self.height_at_pixel((u * n).round() as i64, (v * n).round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra(size: u32, f: impl Fn(u32, u32) -> u16) -> Vec<u8> {
        let mut pixels = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let h = f(x, y);
                pixels.extend_from_slice(&[0, (h & 0xff) as u8, (h >> 8) as u8, 255]);
            }
        }
        pixels
    }

    #[test]
    fn decodes_red_green_as_sixteen_bits() {
        let pixels = bgra(32, |x, y| (x * 1000 + y) as u16);
        let field = HeightField::from_bgra8(32, 32, &pixels).unwrap();
        assert_eq!(field.size(), 32);
        assert_eq!(field.sample(3, 2), 3002);
        assert_eq!(field.sample(31, 0), 31000);
    }

    #[test]
    fn last_row_and_column_are_replicated() {
        let pixels = bgra(32, |x, y| (x * 1000 + y) as u16);
        let field = HeightField::from_bgra8(32, 32, &pixels).unwrap();
        assert_eq!(field.sample(32, 5), field.sample(31, 5));
        assert_eq!(field.sample(7, 32), field.sample(7, 31));
        assert_eq!(field.sample(32, 32), field.sample(31, 31));
        assert_eq!(field.sample(99, -4), field.sample(32, 0));
    }

    #[test]
    fn rejects_unusable_sources() {
        assert_eq!(
            HeightField::from_bgra8(32, 64, &[]),
            Err(HeightFieldError::NotSquare {
                width: 32,
                height: 64
            })
        );
        assert_eq!(
            HeightField::from_bgra8(48, 48, &bgra(48, |_, _| 0)),
            Err(HeightFieldError::UnsupportedSize(48))
        );
        assert_eq!(
            HeightField::from_bgra8(16, 16, &bgra(16, |_, _| 0)),
            Err(HeightFieldError::UnsupportedSize(16))
        );
        assert!(matches!(
            HeightField::from_bgra8(32, 32, &[0; 16]),
            Err(HeightFieldError::TruncatedPixels { .. })
        ));
    }

    #[test]
    fn fallback_is_flat() {
        let texture = TextureResource {
            width: 32,
            height: 32,
            format: TextureFormat::Rgba16F,
            tex_type: TextureType::Tex2D,
            pixels: vec![0xff; 32 * 32 * 8],
        };
        let (field, err) = HeightField::load_or_flat(Some(&texture));
        assert_eq!(err, Some(HeightFieldError::UnsupportedFormat(TextureFormat::Rgba16F)));
        assert_eq!(field, HeightField::flat_default());
        assert_eq!(field.height(0.3, 0.9), 0.0);
    }

    #[test]
    fn height_rounds_to_nearest_sample() {
        let field = HeightField::from_fn(32, |x, _| if x >= 16 { 65535 } else { 0 });
        assert_eq!(field.height(15.4 / 32.0, 0.5), 0.0);
        assert_eq!(field.height(15.6 / 32.0, 0.5), 1.0);
        assert_eq!(field.height(1.0, 1.0), 1.0);
    }
}
