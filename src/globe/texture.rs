//! Equirectangular world texture: decoded from an image file on a worker
//! thread, or rasterized from built-in continent outlines

use crate::colors::Rgb;
use image::{DynamicImage, Rgb as Pixel, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Textures wider than this are downsampled after decoding.
const MAX_TEXTURE_WIDTH: u32 = 2048;

const LAND_LEVEL: u8 = 215;
const GRID_LEVEL: u8 = 70;
const OCEAN_LEVEL: u8 = 18;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode world texture: {0}")]
    Decode(#[from] image::ImageError),
    #[error("world texture has no pixels")]
    Empty,
}

#[derive(Clone)]
pub struct WorldTexture {
    image: RgbImage,
}

impl WorldTexture {
    pub fn from_image(image: DynamicImage) -> Result<Self, TextureError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TextureError::Empty);
        }
        let image = if image.width() > MAX_TEXTURE_WIDTH {
            image.resize_exact(
                MAX_TEXTURE_WIDTH,
                MAX_TEXTURE_WIDTH / 2,
                image::imageops::FilterType::Triangle,
            )
        } else {
            image
        };
        Ok(Self { image: image.to_rgb8() })
    }

    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let bytes = std::fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_image(image::load_from_memory(&bytes)?)
    }

    /// Rasterize the built-in continent outlines with a 30 degree graticule.
    pub fn builtin(width: u32, height: u32) -> Self {
        let width = width.max(2);
        let height = height.max(1);
        let mut image = RgbImage::from_pixel(width, height, Pixel([OCEAN_LEVEL; 3]));

        for y in 0..height {
            let lat = 90.0 - (y as f32 + 0.5) / height as f32 * 180.0;
            for (from, to) in land_spans(lat) {
                let x0 = lon_to_x(from, width);
                let x1 = lon_to_x(to, width);
                for x in x0..x1.min(width) {
                    image.put_pixel(x, y, Pixel([LAND_LEVEL; 3]));
                }
            }
        }

        for y in 0..height {
            for x in 0..width {
                let lon = x as f32 / width as f32 * 360.0 - 180.0;
                let lat = 90.0 - y as f32 / height as f32 * 180.0;
                let on_meridian = (lon.rem_euclid(30.0)) < 360.0 / width as f32;
                let on_parallel = (lat.rem_euclid(30.0)) < 180.0 / height as f32;
                if (on_meridian || on_parallel) && image.get_pixel(x, y).0[0] == OCEAN_LEVEL {
                    image.put_pixel(x, y, Pixel([GRID_LEVEL; 3]));
                }
            }
        }

        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Nearest texel at texture coordinates; wraps horizontally, clamps vertically.
    pub fn sample(&self, u: f32, v: f32) -> Rgb {
        let w = self.image.width() as i64;
        let h = self.image.height() as i64;
        let x = (u.floor() as i64).rem_euclid(w) as u32;
        let y = (v.floor() as i64).clamp(0, h - 1) as u32;
        let p = self.image.get_pixel(x, y).0;
        Rgb::new(p[0], p[1], p[2])
    }
}

fn lon_to_x(lon: f32, width: u32) -> u32 {
    (((lon + 180.0) / 360.0) * width as f32).round().clamp(0.0, width as f32) as u32
}

/// Longitude spans covered by land along one parallel (even-odd rule per outline).
fn land_spans(lat: f32) -> Vec<(f32, f32)> {
    let mut spans = Vec::new();
    for outline in CONTINENTS {
        let mut crossings: Vec<f32> = Vec::new();
        for i in 0..outline.len() {
            let (lat1, lon1) = outline[i];
            let (lat2, lon2) = outline[(i + 1) % outline.len()];
            if (lat1 > lat) != (lat2 > lat) {
                crossings.push(lon1 + (lat - lat1) / (lat2 - lat1) * (lon2 - lon1));
            }
        }
        crossings.sort_by(f32::total_cmp);
        for pair in crossings.chunks_exact(2) {
            spans.push((pair[0], pair[1]));
        }
    }
    spans
}

/// One horizontal piece of a wrapped texture blit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureSlice {
    pub src_x: f32,
    pub src_w: f32,
    pub dst_x: f32,
    pub dst_w: f32,
}

/// Split a `window`-texel wide read starting at `offset` into at most two
/// slices: `offset..width`, then `0..rest`, laid side by side over
/// `dst_x..dst_x + dst_w`.
pub fn wrap_slices(offset: f32, window: f32, tex_width: f32, dst_x: f32, dst_w: f32) -> Vec<TextureSlice> {
    if tex_width <= 0.0 || window <= 0.0 {
        return Vec::new();
    }
    let window = window.min(tex_width);
    let offset = offset.rem_euclid(tex_width);
    let first = window.min(tex_width - offset);
    let first_dst = dst_w * first / window;

    let mut slices = vec![TextureSlice {
        src_x: offset,
        src_w: first,
        dst_x,
        dst_w: first_dst,
    }];
    if window - first > f32::EPSILON {
        slices.push(TextureSlice {
            src_x: 0.0,
            src_w: window - first,
            dst_x: dst_x + first_dst,
            dst_w: dst_w - first_dst,
        });
    }
    slices
}

// ============================================================================
// Background loading
// ============================================================================

enum LoadState {
    Pending(Receiver<Result<WorldTexture, TextureError>>),
    Ready(WorldTexture),
    Failed,
}

/// Texture that becomes available once decoding finishes.
pub struct TextureLoader {
    state: LoadState,
}

impl TextureLoader {
    /// Decode `path` on a worker thread.
    pub fn spawn(path: PathBuf) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = WorldTexture::load(&path);
            // Receiver is gone if the view was torn down first
            let _ = tx.send(result);
        });
        Self { state: LoadState::Pending(rx) }
    }

    pub fn ready(texture: WorldTexture) -> Self {
        Self { state: LoadState::Ready(texture) }
    }

    /// Pick up a finished decode. Returns true when the state changed.
    pub fn poll(&mut self) -> bool {
        let result = match &self.state {
            LoadState::Pending(rx) => match rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => Err(TextureError::Empty),
            },
            _ => return false,
        };
        self.finish(result);
        true
    }

    /// Block until the decode finishes or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) {
        let result = match &self.state {
            LoadState::Pending(rx) => match rx.recv_timeout(timeout) {
                Ok(result) => result,
                Err(_) => return,
            },
            _ => return,
        };
        self.finish(result);
    }

    fn finish(&mut self, result: Result<WorldTexture, TextureError>) {
        self.state = match result {
            Ok(texture) => {
                tracing::info!(width = texture.width(), height = texture.height(), "world texture decoded");
                LoadState::Ready(texture)
            }
            Err(e) => {
                tracing::warn!(error = %e, "world texture unavailable, rendering bare globe");
                LoadState::Failed
            }
        };
    }

    pub fn texture(&self) -> Option<&WorldTexture> {
        match &self.state {
            LoadState::Ready(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LoadState::Pending(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, LoadState::Failed)
    }
}

// Coarse continent outlines as (lat, lon) degrees
const CONTINENTS: &[&[(f32, f32)]] = &[
    // North America
    &[
        (69.5, -90.5), (67.1, -81.4), (58.9, -94.7), (51.2, -79.9), (62.6, -77.4), (58.2, -67.6),
        (60.3, -64.6), (53.3, -55.8), (46.8, -71.1), (49.2, -65.1), (45.9, -59.8), (39.2, -76.3),
        (31.4, -81.3), (25.2, -80.4), (30.1, -84.1), (27.8, -97.1), (18.8, -95.9), (21.5, -87.1),
        (15.9, -88.9), (15.3, -83.4), (9.0, -82.2), (11.1, -74.9), (7.2, -80.9), (19.3, -105.0),
        (31.2, -113.1), (23.4, -109.4), (24.7, -112.2), (40.3, -124.4), (49.0, -122.8),
        (58.1, -134.1), (61.3, -150.6), (54.4, -164.8), (58.9, -157.0), (61.5, -166.1),
        (64.8, -160.8), (65.7, -168.1), (71.4, -156.6), (67.4, -108.9), (67.3, -96.1), (71.9, -95.2),
    ],
    // South America
    &[
        (11.1, -74.9), (10.7, -61.9), (4.2, -51.3), (-0.1, -50.4), (-7.3, -34.7), (-21.9, -40.9),
        (-24.9, -47.6), (-34.4, -53.8), (-33.9, -58.4), (-36.9, -56.8), (-41.1, -65.1),
        (-48.1, -66.0), (-53.8, -71.0), (-52.3, -74.9), (-46.6, -75.6), (-42.4, -72.7),
        (-18.3, -70.4), (-14.6, -76.0), (-4.7, -81.4), (3.8, -77.1), (9.0, -79.1),
    ],
    // Europe
    &[
        (36.7, 27.6), (39.5, 26.2), (41.1, 28.8), (40.3, 22.6), (36.4, 23.2), (45.6, 13.9),
        (40.2, 18.5), (37.9, 15.7), (44.4, 8.9), (36.0, -5.9), (36.9, -8.9), (43.0, -9.4),
        (43.4, -1.9), (48.7, -4.6), (53.5, 8.1), (57.1, 8.5), (54.0, 10.9), (54.4, 19.7),
        (59.2, 23.3), (60.0, 29.1), (60.7, 21.3), (65.1, 25.4), (65.7, 22.2), (55.4, 12.9),
        (59.5, 10.4), (58.6, 5.7), (62.6, 5.9), (69.8, 19.2), (70.5, 31.3), (69.3, 33.8),
        (66.6, 33.2), (60.0, 40.0), (47.3, 39.1), (46.6, 30.7), (41.5, 29.0),
    ],
    // Africa
    &[
        (31.2, 29.7), (31.2, 32.3), (29.9, 32.4), (11.7, 42.7), (10.6, 51.0), (-4.7, 39.2),
        (-14.7, 40.8), (-19.8, 34.8), (-24.1, 35.5), (-32.8, 28.2), (-34.8, 19.6), (-18.1, 11.8),
        (-10.7, 13.7), (3.7, 9.4), (6.3, 4.3), (4.4, -8.0), (14.7, -17.6), (21.0, -17.0),
        (27.7, -13.0), (35.8, -5.9), (37.0, 10.0), (32.9, 13.0), (30.5, 19.9),
    ],
    // Asia
    &[
        (77.0, 107.0), (70.8, 131.3), (69.4, 178.6), (62.3, 179.2), (59.9, 163.5), (51.0, 156.8),
        (56.8, 155.9), (62.6, 164.5), (54.7, 135.1), (52.2, 141.4), (39.8, 127.5), (35.1, 129.1),
        (40.9, 121.6), (39.2, 118.0), (37.5, 122.4), (34.9, 119.2), (28.2, 121.7), (19.8, 105.9),
        (13.4, 109.3), (8.6, 105.2), (13.4, 100.1), (1.3, 104.2), (22.8, 91.4), (15.9, 80.3),
        (8.0, 77.5), (21.4, 72.6), (25.3, 61.6), (27.0, 56.5), (30.3, 48.9), (24.0, 51.8),
        (22.3, 59.8), (12.6, 43.5), (21.3, 39.1), (29.9, 32.6), (36.7, 36.2), (36.7, 27.6),
        (41.5, 29.0), (41.5, 41.6), (47.3, 39.1), (60.0, 40.0), (66.6, 33.2), (68.6, 43.5),
        (68.1, 68.5), (71.0, 66.7), (73.0, 69.9), (66.2, 72.4), (72.8, 74.7),
    ],
    // Australia
    &[
        (-13.8, 143.6), (-26.1, 153.1), (-37.4, 150.0), (-38.0, 140.6), (-34.4, 138.2),
        (-35.3, 136.8), (-32.9, 137.8), (-34.9, 136.0), (-31.5, 131.3), (-34.2, 115.0),
        (-21.8, 114.1), (-19.7, 120.9), (-14.2, 125.7), (-15.0, 129.6), (-11.1, 132.4),
        (-11.9, 136.5), (-15.0, 135.5), (-17.7, 140.2), (-11.0, 142.1),
    ],
    // Greenland
    &[
        (83.5, -27.1), (82.7, -20.8), (81.3, -12.2), (80.1, -17.7), (76.6, -21.7), (74.3, -19.4),
        (70.2, -26.4), (65.5, -39.8), (60.1, -43.4), (63.6, -51.6), (67.2, -54.0), (69.9, -50.9),
        (70.6, -51.4), (75.5, -58.6), (78.0, -73.3), (81.8, -62.7),
    ],
    // Japan
    &[
        (37.1, 141.0), (33.5, 135.8), (33.9, 131.0), (31.4, 130.2), (33.3, 129.4), (38.2, 139.4),
        (41.2, 140.3), (45.4, 141.9), (43.3, 145.5),
    ],
    // Great Britain and Ireland
    &[(58.6, -3.0), (51.3, 1.4), (50.0, -5.2), (51.5, -10.0), (55.3, -7.5), (56.8, -6.1)],
    // Antarctica
    &[
        (-64.2, -58.6), (-68.0, -65.7), (-73.7, -60.8), (-79.2, -78.0), (-83.2, -58.2),
        (-80.3, -28.5), (-70.9, -6.9), (-65.8, 54.5), (-72.3, 69.9), (-66.2, 88.0),
        (-65.3, 135.1), (-71.7, 171.2), (-78.0, 180.0), (-90.0, 180.0), (-90.0, -180.0),
        (-78.0, -180.0), (-76.9, -158.4), (-73.9, -74.9),
    ],
];

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn single_slice_when_window_fits() {
        let slices = wrap_slices(100.0, 200.0, 1000.0, 10.0, 40.0);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0], TextureSlice { src_x: 100.0, src_w: 200.0, dst_x: 10.0, dst_w: 40.0 });
    }

    #[test]
    fn window_past_right_edge_wraps_to_left() {
        let slices = wrap_slices(900.0, 200.0, 1000.0, 0.0, 40.0);
        assert_eq!(slices.len(), 2);
        assert!((slices[0].src_x - 900.0).abs() < EPS);
        assert!((slices[0].src_w - 100.0).abs() < EPS);
        assert!((slices[0].dst_w - 20.0).abs() < EPS);
        assert_eq!(slices[1].src_x, 0.0);
        assert!((slices[1].src_w - 100.0).abs() < EPS);
        assert!((slices[1].dst_x - 20.0).abs() < EPS);
        assert!((slices[1].dst_w - 20.0).abs() < EPS);
    }

    #[test]
    fn negative_and_large_offsets_are_wrapped() {
        let a = wrap_slices(-100.0, 200.0, 1000.0, 0.0, 40.0);
        let b = wrap_slices(2900.0, 200.0, 1000.0, 0.0, 40.0);
        assert_eq!(a.len(), 2);
        assert!((a[0].src_x - 900.0).abs() < EPS);
        assert!((b[0].src_x - 900.0).abs() < EPS);
        let total: f32 = a.iter().map(|s| s.dst_w).sum();
        assert!((total - 40.0).abs() < EPS);
    }

    #[test]
    fn builtin_texture_has_land_and_ocean() {
        let tex = WorldTexture::builtin(360, 180);
        assert_eq!((tex.width(), tex.height()), (360, 180));
        // Central Brazil and the mid Pacific
        let brazil = tex.sample(lon_to_x(-50.0, 360) as f32, 90.0 + 10.0);
        let pacific = tex.sample(lon_to_x(-140.0, 360) as f32 + 0.5, 90.0 + 15.5);
        assert!(brazil.luminance() > 0.7, "{:?}", brazil);
        assert!(pacific.luminance() < 0.2, "{:?}", pacific);
    }

    #[test]
    fn sample_wraps_horizontally() {
        let tex = WorldTexture::builtin(64, 32);
        assert_eq!(tex.sample(-1.0, 5.0), tex.sample(63.0, 5.0));
        assert_eq!(tex.sample(64.0, 5.0), tex.sample(0.0, 5.0));
        assert_eq!(tex.sample(3.0, -10.0), tex.sample(3.0, 0.0));
    }

    #[test]
    fn missing_file_fails_and_loader_reports_it() {
        let missing = PathBuf::from("/nonexistent/world.png");
        assert!(matches!(WorldTexture::load(&missing), Err(TextureError::Io { .. })));

        let mut loader = TextureLoader::spawn(missing);
        loader.wait(Duration::from_secs(5));
        assert!(loader.is_failed());
        assert!(loader.texture().is_none());
    }

    #[test]
    fn loader_decodes_png_in_background() {
        let path = std::env::temp_dir().join(format!("threatglobe-tex-{}.png", std::process::id()));
        WorldTexture::builtin(64, 32).image.save(&path).unwrap();

        let mut loader = TextureLoader::spawn(path.clone());
        loader.wait(Duration::from_secs(5));
        let _ = std::fs::remove_file(&path);

        let tex = loader.texture().expect("texture should decode");
        assert_eq!((tex.width(), tex.height()), (64, 32));
        assert!(!loader.poll());
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let path = std::env::temp_dir().join(format!("threatglobe-bad-{}.png", std::process::id()));
        std::fs::write(&path, b"not an image").unwrap();
        let result = WorldTexture::load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(TextureError::Decode(_))));
    }
}
