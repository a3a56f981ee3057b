//! RGB pixel canvas with circular clipping, flushed to the terminal as
//! half-block cells (two square pixels per cell)

use super::projection::ScreenPoint;
use super::texture::{TextureSlice, WorldTexture};
use crate::colors::Rgb;
use crate::terminal::Terminal;

#[derive(Clone, Copy, Debug, PartialEq)]
struct CircleClip {
    center: ScreenPoint,
    radius_sq: f32,
}

pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Rgb>,
    clip: Option<CircleClip>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; width * height],
            clip: None,
        }
    }

    /// Canvas covering a terminal of `cols` x `rows` cells.
    pub fn for_terminal(cols: u16, rows: u16) -> Self {
        Self::new(cols as usize, rows as usize * 2)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![Rgb::BLACK; width * height];
        }
        self.clip = None;
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set_clip_circle(&mut self, center: ScreenPoint, radius: f32) {
        self.clip = Some(CircleClip { center, radius_sq: radius * radius });
    }

    pub fn clear_clip(&mut self) {
        self.clip = None;
    }

    #[cfg(test)]
    pub fn is_clipped(&self) -> bool {
        self.clip.is_some()
    }

    fn visible(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        match self.clip {
            Some(clip) => {
                let dx = x as f32 + 0.5 - clip.center.x;
                let dy = y as f32 + 0.5 - clip.center.y;
                dx * dx + dy * dy <= clip.radius_sq
            }
            None => true,
        }
    }

    /// Alpha-blend `color` over the pixel; clipped and out-of-range pixels are ignored.
    pub fn blend(&mut self, x: i32, y: i32, color: Rgb, alpha: f32) {
        if alpha <= 0.0 || !self.visible(x, y) {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.pixels[idx] = self.pixels[idx].lerp(color, alpha);
    }

    /// Pixel-space bounding box of a circle, clamped to the canvas.
    fn circle_bounds(&self, center: ScreenPoint, radius: f32) -> (i32, i32, i32, i32) {
        let x0 = ((center.x - radius).floor() as i32).max(0);
        let y0 = ((center.y - radius).floor() as i32).max(0);
        let x1 = ((center.x + radius).ceil() as i32).min(self.width as i32 - 1);
        let y1 = ((center.y + radius).ceil() as i32).min(self.height as i32 - 1);
        (x0, y0, x1, y1)
    }

    /// Soft ring fading out on both sides of `inner`, reaching zero at `outer`.
    pub fn glow_ring(&mut self, center: ScreenPoint, inner: f32, outer: f32, color: Rgb, max_alpha: f32) {
        let spread = (outer - inner).max(0.5);
        let (x0, y0, x1, y1) = self.circle_bounds(center, outer);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = ScreenPoint::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                let t = ((d - inner).abs() / spread).min(1.0);
                let falloff = (1.0 - t) * (1.0 - t);
                self.blend(x, y, color, max_alpha * falloff);
            }
        }
    }

    /// Filled disc shading from `inner` at the lit point to `outer` at the rim.
    pub fn radial_gradient_disc(&mut self, center: ScreenPoint, radius: f32, inner: Rgb, outer: Rgb) {
        let lit = ScreenPoint::new(center.x - radius * 0.3, center.y - radius * 0.3);
        let reach = radius * 1.3;
        let (x0, y0, x1, y1) = self.circle_bounds(center, radius);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let p = ScreenPoint::new(x as f32 + 0.5, y as f32 + 0.5);
                if p.distance(center) > radius {
                    continue;
                }
                let t = (p.distance(lit) / reach).min(1.0).powf(1.5);
                self.blend(x, y, inner.lerp(outer, t), 1.0);
            }
        }
    }

    /// Copy one horizontal texture slice into a destination rectangle,
    /// tinting every texel by its luminance.
    pub fn blit_tinted(&mut self, texture: &WorldTexture, slice: &TextureSlice, dst_y: f32, dst_h: f32, tint: Rgb) {
        if slice.dst_w <= 0.0 || dst_h <= 0.0 {
            return;
        }
        let x0 = slice.dst_x.floor() as i32;
        let x1 = (slice.dst_x + slice.dst_w).ceil() as i32;
        let y0 = dst_y.floor() as i32;
        let y1 = (dst_y + dst_h).ceil() as i32;
        let tex_h = texture.height() as f32;

        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            if cy < dst_y || cy >= dst_y + dst_h {
                continue;
            }
            let v = (cy - dst_y) / dst_h * tex_h;
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                if cx < slice.dst_x || cx >= slice.dst_x + slice.dst_w {
                    continue;
                }
                let u = slice.src_x + (cx - slice.dst_x) / slice.dst_w * slice.src_w;
                let lum = texture.sample(u, v).luminance();
                self.blend(x, y, tint.scale(0.35 + lum), (lum * 0.9).min(0.9));
            }
        }
    }

    pub fn draw_line(&mut self, a: ScreenPoint, b: ScreenPoint, color: Rgb, alpha: f32) {
        let steps = a.distance(b).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let p = a.lerp(b, i as f32 / steps as f32);
            self.blend(p.x.floor() as i32, p.y.floor() as i32, color, alpha);
        }
    }

    pub fn stroke_polyline(&mut self, points: &[ScreenPoint], color: Rgb, alpha: f32) {
        for pair in points.windows(2) {
            self.draw_line(pair[0], pair[1], color, alpha);
        }
    }

    /// Blurred halo with a solid core.
    pub fn glow_dot(&mut self, center: ScreenPoint, radius: f32, glow: Rgb, core: Rgb) {
        let halo = radius * 2.5;
        let (x0, y0, x1, y1) = self.circle_bounds(center, halo);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = ScreenPoint::new(x as f32 + 0.5, y as f32 + 0.5).distance(center);
                if d <= radius {
                    self.blend(x, y, core, 1.0);
                } else if d <= halo {
                    let t = 1.0 - (d - radius) / (halo - radius);
                    self.blend(x, y, glow, 0.8 * t * t);
                }
            }
        }
        // Always mark the center pixel so tiny pulses stay visible
        self.blend(center.x.floor() as i32, center.y.floor() as i32, core, 1.0);
    }

    /// Write the canvas into the terminal back buffer, two pixel rows per cell.
    pub fn flush_to(&self, term: &mut Terminal) {
        for cy in 0..self.height / 2 {
            for cx in 0..self.width {
                let top = self.pixels[cy * 2 * self.width + cx];
                let bottom = self.pixels[(cy * 2 + 1) * self.width + cx];
                match (top == Rgb::BLACK, bottom == Rgb::BLACK) {
                    (true, true) => {}
                    (false, true) => term.set(cx as i32, cy as i32, '▀', Some(top.to_color()), false),
                    (true, false) => term.set(cx as i32, cy as i32, '▄', Some(bottom.to_color()), false),
                    (false, false) => term.set_with_bg(
                        cx as i32,
                        cy as i32,
                        '▀',
                        Some(top.to_color()),
                        Some(bottom.to_color()),
                        false,
                    ),
                }
            }
        }
    }
}
