//! Per-frame drawing of the globe, its atmosphere, the map and the arcs

use super::arcs::ThreatArc;
use super::canvas::Canvas;
use super::clock::pulse_fraction;
use super::projection::{in_front_band, project, wrap_angle, ScreenPoint};
use super::texture::{wrap_slices, WorldTexture};
use crate::colors::Theme;
use std::f32::consts::TAU;

/// Control point offset as a fraction of the chord length.
const ARC_BOW: f32 = 0.4;
/// Segments used to stroke and measure each curve.
const CURVE_SEGMENTS: usize = 32;
const TRAIL_ALPHA: f32 = 0.35;
const ATMOSPHERE_SPREAD: f32 = 0.15;

/// Everything a frame needs, read once before any drawing starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameState<'a> {
    /// Automatic phase plus manual offset, in radians.
    pub rotation: f32,
    pub pulse: f32,
    pub shimmer: f32,
    pub arcs: &'a [ThreatArc],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub arcs_drawn: usize,
    pub arcs_culled: usize,
    pub texture_drawn: bool,
}

/// Disc placement for a canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobeLayout {
    pub center: ScreenPoint,
    pub radius: f32,
}

impl GlobeLayout {
    pub fn fit(width: usize, height: usize) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            center: ScreenPoint::new(w / 2.0, h / 2.0),
            // Leave room for the atmosphere ring
            radius: (w.min(h) / 2.0 / (1.0 + ATMOSPHERE_SPREAD) - 1.0).max(1.0),
        }
    }
}

/// Quadratic Bezier with an arc-length lookup table.
#[derive(Clone, Debug)]
pub struct QuadCurve {
    start: ScreenPoint,
    control: ScreenPoint,
    end: ScreenPoint,
    lengths: [f32; CURVE_SEGMENTS + 1],
}

impl QuadCurve {
    /// Curve from `start` to `end`, bowed perpendicular to the chord.
    pub fn bowed(start: ScreenPoint, end: ScreenPoint) -> Self {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let mid = start.lerp(end, 0.5);
        // Left-hand normal scaled by chord length; bows upward for west->east arcs
        let control = ScreenPoint::new(mid.x + dy * ARC_BOW, mid.y - dx * ARC_BOW);
        Self::new(start, control, end)
    }

    pub fn new(start: ScreenPoint, control: ScreenPoint, end: ScreenPoint) -> Self {
        let mut curve = Self { start, control, end, lengths: [0.0; CURVE_SEGMENTS + 1] };
        let mut prev = start;
        for i in 1..=CURVE_SEGMENTS {
            let p = curve.at(i as f32 / CURVE_SEGMENTS as f32);
            curve.lengths[i] = curve.lengths[i - 1] + prev.distance(p);
            prev = p;
        }
        curve
    }

    #[cfg(test)]
    pub fn control(&self) -> ScreenPoint {
        self.control
    }

    /// Point at Bezier parameter `t`.
    pub fn at(&self, t: f32) -> ScreenPoint {
        let u = 1.0 - t;
        ScreenPoint::new(
            u * u * self.start.x + 2.0 * u * t * self.control.x + t * t * self.end.x,
            u * u * self.start.y + 2.0 * u * t * self.control.y + t * t * self.end.y,
        )
    }

    pub fn length(&self) -> f32 {
        self.lengths[CURVE_SEGMENTS]
    }

    /// Point at `fraction` of the curve's length.
    pub fn point_at_length(&self, fraction: f32) -> ScreenPoint {
        let total = self.length();
        if total <= f32::EPSILON {
            return self.start;
        }
        let target = fraction.clamp(0.0, 1.0) * total;
        let seg = self.lengths.partition_point(|&l| l < target).clamp(1, CURVE_SEGMENTS);
        let (l0, l1) = (self.lengths[seg - 1], self.lengths[seg]);
        let local = if l1 > l0 { (target - l0) / (l1 - l0) } else { 0.0 };
        let t = (seg as f32 - 1.0 + local) / CURVE_SEGMENTS as f32;
        self.at(t)
    }

    pub fn points(&self) -> Vec<ScreenPoint> {
        (0..=CURVE_SEGMENTS)
            .map(|i| self.at(i as f32 / CURVE_SEGMENTS as f32))
            .collect()
    }
}

/// Source window offset (in texels) that centers longitude `rotation` on the disc.
pub fn texture_offset(rotation: f32, tex_width: f32) -> f32 {
    let center_u = (wrap_angle(rotation) / TAU + 0.5) * tex_width;
    (center_u - tex_width / 4.0).rem_euclid(tex_width)
}

/// Draw one complete frame. Nothing carries over from the previous frame.
pub fn render_frame(
    canvas: &mut Canvas,
    frame: &FrameState<'_>,
    texture: Option<&WorldTexture>,
    theme: &Theme,
) -> RenderStats {
    let layout = GlobeLayout::fit(canvas.width(), canvas.height());
    let GlobeLayout { center, radius } = layout;
    let mut stats = RenderStats::default();

    canvas.clear_clip();
    canvas.fill(theme.background);

    // Atmosphere
    let shimmer = 0.75 + 0.25 * (frame.shimmer * TAU).sin();
    canvas.glow_ring(center, radius, radius * (1.0 + ATMOSPHERE_SPREAD), theme.accent, 0.55 * shimmer);

    // Body
    canvas.radial_gradient_disc(center, radius, theme.body_inner, theme.body_outer);

    canvas.set_clip_circle(center, radius);

    if let Some(texture) = texture {
        let tex_w = texture.width() as f32;
        let slices = wrap_slices(
            texture_offset(frame.rotation, tex_w),
            tex_w / 2.0,
            tex_w,
            center.x - radius,
            radius * 2.0,
        );
        for slice in &slices {
            canvas.blit_tinted(texture, slice, center.y - radius, radius * 2.0, theme.accent);
        }
        stats.texture_drawn = true;
    }

    for arc in frame.arcs {
        let start = project(arc.start, center, radius, frame.rotation);
        if !in_front_band(start, center, radius) {
            stats.arcs_culled += 1;
            continue;
        }
        let end = project(arc.end, center, radius, frame.rotation);
        let curve = QuadCurve::bowed(start, end);
        canvas.stroke_polyline(&curve.points(), theme.trail, TRAIL_ALPHA);

        let at = curve.point_at_length(pulse_fraction(frame.pulse, arc.phase));
        let size = 0.8 + 1.2 * arc.confidence as f32 / 100.0;
        canvas.glow_dot(at, size, theme.accent, theme.pulse_core);
        stats.arcs_drawn += 1;
    }

    canvas.clear_clip();
    stats
}
