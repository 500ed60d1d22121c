// src/selection_logic.rs
// Mouse-drag rectangle selection. Pure logic, no widget code.

use crate::geometry::{Point, Rect};

/// 拖拽选区状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragSelection {
    #[default]
    Idle,
    /// Pointer is down. `rect` stays `None` until the first move.
    Anchored { anchor: Point, rect: Option<Rect> },
    /// Move key held: the box is translated instead of resized.
    AnchoredWithOffset { anchor: Point, offset: Point, rect: Rect },
}

impl DragSelection {
    pub fn new() -> Self {
        DragSelection::Idle
    }

    pub fn is_anchored(&self) -> bool {
        !matches!(self, DragSelection::Idle)
    }

    pub fn current_rect(&self) -> Option<Rect> {
        match *self {
            DragSelection::Idle => None,
            DragSelection::Anchored { rect, .. } => rect,
            DragSelection::AnchoredWithOffset { rect, .. } => Some(rect),
        }
    }

    pub fn pointer_down(&mut self, pos: Point) {
        *self = DragSelection::Anchored { anchor: pos, rect: None };
    }

    pub fn pointer_move(&mut self, pos: Point) {
        *self = match *self {
            DragSelection::Idle => DragSelection::Idle,
            DragSelection::Anchored { anchor, .. } => DragSelection::Anchored {
                anchor,
                rect: Some(Rect::from_points(anchor, pos).abs()),
            },
            DragSelection::AnchoredWithOffset { anchor, offset, rect } => {
                // delta since the previous event, not since the key went down
                let delta = pos - offset;
                DragSelection::AnchoredWithOffset {
                    anchor: anchor + delta,
                    offset: offset + delta,
                    rect: rect + delta,
                }
            }
        };
    }

    /// Move key pressed at `pos`. Returns whether the key was consumed.
    pub fn move_key_down(&mut self, pos: Point) -> bool {
        match *self {
            DragSelection::Idle => false,
            DragSelection::Anchored { anchor, rect: Some(rect) } => {
                *self = DragSelection::AnchoredWithOffset { anchor, offset: pos, rect };
                true
            }
            // nothing to move yet
            DragSelection::Anchored { rect: None, .. } => true,
            // auto-repeat
            DragSelection::AnchoredWithOffset { .. } => true,
        }
    }

    pub fn move_key_up(&mut self) {
        if let DragSelection::AnchoredWithOffset { anchor, rect, .. } = *self {
            *self = DragSelection::Anchored { anchor, rect: Some(rect) };
        }
    }

    /// Pointer released at `pos`. Yields the finished selection, if any, and
    /// always returns to `Idle`.
    pub fn pointer_up(&mut self, pos: Point) -> Option<Rect> {
        if !self.is_anchored() {
            return None;
        }
        self.pointer_move(pos);
        let made = self.current_rect().filter(|r| r.area() > 0.0);
        *self = DragSelection::Idle;
        made
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::from_origin_size((x, y), (w, h))
    }

    fn drag(from: Point, to: Point) -> DragSelection {
        let mut sel = DragSelection::new();
        sel.pointer_down(from);
        sel.pointer_move(to);
        sel
    }

    #[test]
    fn drag_builds_bounding_box() {
        let sel = drag(Point::new(100.0, 100.0), Point::new(300.0, 250.0));
        assert_eq!(sel.current_rect(), Some(rect(100.0, 100.0, 200.0, 150.0)));
    }

    #[test]
    fn drag_in_any_direction() {
        let pairs = [
            (Point::new(300.0, 250.0), Point::new(100.0, 100.0)),
            (Point::new(100.0, 250.0), Point::new(300.0, 100.0)),
            (Point::new(300.0, 100.0), Point::new(100.0, 250.0)),
        ];
        for (p0, p1) in pairs {
            assert_eq!(drag(p0, p1).current_rect(), Some(rect(100.0, 100.0, 200.0, 150.0)));
        }
    }

    #[test]
    fn move_key_translates_rigidly() {
        let mut sel = drag(Point::new(100.0, 100.0), Point::new(300.0, 250.0));
        assert!(sel.move_key_down(Point::new(300.0, 250.0)));
        sel.pointer_move(Point::new(310.0, 260.0));
        assert_eq!(sel.current_rect(), Some(rect(110.0, 110.0, 200.0, 150.0)));

        // deltas accumulate event to event
        sel.pointer_move(Point::new(305.0, 270.0));
        assert_eq!(sel.current_rect(), Some(rect(105.0, 120.0, 200.0, 150.0)));
    }

    #[test]
    fn resize_resumes_from_translated_anchor() {
        let mut sel = drag(Point::new(100.0, 100.0), Point::new(300.0, 250.0));
        sel.move_key_down(Point::new(300.0, 250.0));
        sel.pointer_move(Point::new(310.0, 260.0));
        sel.move_key_up();
        assert!(matches!(sel, DragSelection::Anchored { anchor, .. } if anchor == Point::new(110.0, 110.0)));

        sel.pointer_move(Point::new(410.0, 310.0));
        assert_eq!(sel.current_rect(), Some(rect(110.0, 110.0, 300.0, 200.0)));
    }

    #[test]
    fn move_key_before_first_drag_is_swallowed() {
        let mut sel = DragSelection::new();
        sel.pointer_down(Point::new(10.0, 10.0));
        assert!(sel.move_key_down(Point::new(10.0, 10.0)));
        assert!(matches!(sel, DragSelection::Anchored { rect: None, .. }));
    }

    #[test]
    fn move_key_while_idle_is_not_consumed() {
        let mut sel = DragSelection::new();
        assert!(!sel.move_key_down(Point::new(1.0, 1.0)));
        assert_eq!(sel, DragSelection::Idle);
    }

    #[test]
    fn pointer_up_finalizes_and_resets() {
        let mut sel = drag(Point::new(100.0, 100.0), Point::new(300.0, 250.0));
        let made = sel.pointer_up(Point::new(300.0, 250.0));
        assert_eq!(made, Some(rect(100.0, 100.0, 200.0, 150.0)));
        assert_eq!(sel, DragSelection::Idle);
    }

    #[test]
    fn pointer_up_without_anchor_is_noop() {
        let mut sel = DragSelection::new();
        assert_eq!(sel.pointer_up(Point::new(5.0, 5.0)), None);
        assert_eq!(sel, DragSelection::Idle);
    }

    #[test]
    fn click_without_drag_yields_nothing() {
        let mut sel = DragSelection::new();
        sel.pointer_down(Point::new(40.0, 40.0));
        assert_eq!(sel.pointer_up(Point::new(40.0, 40.0)), None);
        assert_eq!(sel, DragSelection::Idle);

        // a straight line has no area either
        sel.pointer_down(Point::new(40.0, 40.0));
        assert_eq!(sel.pointer_up(Point::new(40.0, 90.0)), None);
    }
}
