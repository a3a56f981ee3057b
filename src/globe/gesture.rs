//! Horizontal drag to manual rotation offset

/// Radians of rotation per pixel of horizontal drag.
pub const SENSITIVITY: f32 = 0.005;

/// Approximate pixel width of a terminal cell, used to turn mouse columns
/// into drag pixels.
pub const CELL_PIXEL_WIDTH: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct DragController {
    manual_offset: f32,
    anchor_x: Option<f32>,
    sensitivity: f32,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(SENSITIVITY)
    }
}

impl DragController {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            manual_offset: 0.0,
            anchor_x: None,
            sensitivity,
        }
    }

    pub fn drag_start(&mut self, x: f32) {
        self.anchor_x = Some(x);
    }

    /// Accumulate the delta since the last event and move the anchor.
    pub fn drag_move(&mut self, x: f32) {
        match self.anchor_x {
            Some(anchor) => self.manual_offset += (x - anchor) * self.sensitivity,
            None => tracing::trace!(x, "drag move without start, anchoring"),
        }
        self.anchor_x = Some(x);
    }

    /// The offset is kept; rotation stays where the user left it.
    pub fn drag_end(&mut self) {
        self.anchor_x = None;
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.anchor_x.is_some()
    }

    #[cfg(test)]
    pub fn manual_offset(&self) -> f32 {
        self.manual_offset
    }

    /// Automatic phase plus the accumulated manual offset.
    pub fn composite(&self, automatic: f32) -> f32 {
        automatic + self.manual_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    #[test]
    fn start_then_move_accumulates_signed_deltas() {
        // 100 -> 150 -> 80: +50 then -70
        let mut drag = DragController::default();
        drag.drag_start(100.0);
        drag.drag_move(150.0);
        drag.drag_move(80.0);
        assert!((drag.manual_offset() - (-20.0 * SENSITIVITY)).abs() < EPS);
    }

    #[test]
    fn many_small_moves_match_one_big_move() {
        let mut a = DragController::default();
        a.drag_start(0.0);
        for x in 1..=40 {
            a.drag_move(x as f32);
        }
        let mut b = DragController::default();
        b.drag_start(0.0);
        b.drag_move(40.0);
        assert!((a.manual_offset() - b.manual_offset()).abs() < 1e-5);
    }

    #[test]
    fn reversals_sum_every_step() {
        let mut drag = DragController::new(0.01);
        drag.drag_start(10.0);
        let path = [30.0, 5.0, 25.0, 0.0];
        let mut sum = 0.0;
        let mut prev = 10.0;
        for x in path {
            drag.drag_move(x);
            sum += x - prev;
            prev = x;
        }
        assert!((drag.manual_offset() - sum * 0.01).abs() < EPS);
    }

    #[test]
    fn offset_persists_after_release() {
        let mut drag = DragController::default();
        drag.drag_start(0.0);
        drag.drag_move(100.0);
        drag.drag_end();
        assert!(!drag.is_dragging());
        assert!((drag.manual_offset() - 0.5).abs() < EPS);

        // New drag starts from a fresh anchor
        drag.drag_start(500.0);
        drag.drag_move(510.0);
        assert!((drag.manual_offset() - 0.55).abs() < EPS);
    }

    #[test]
    fn move_without_start_only_anchors() {
        let mut drag = DragController::default();
        drag.drag_move(300.0);
        assert_eq!(drag.manual_offset(), 0.0);
        drag.drag_move(310.0);
        assert!((drag.manual_offset() - 10.0 * SENSITIVITY).abs() < EPS);
    }

    #[test]
    fn composite_is_additive() {
        let mut drag = DragController::default();
        drag.drag_start(0.0);
        drag.drag_move(-200.0);
        assert!((drag.composite(1.25) - (1.25 - 1.0)).abs() < EPS);
    }
}
