// src/geometry.rs

// 屏幕坐标和矩形直接用 kurbo 的值类型
pub use druid::kurbo::{Point, Rect};

/// Converts a rectangle whose origin is the top-left corner of the primary
/// display (window enumeration space) into one whose origin is the
/// bottom-left corner of the primary display (pointer event space).
///
/// The mapping is its own inverse for a fixed `primary_height`, so it is
/// also used to go back.
pub fn to_bottom_left_origin(rect: Rect, primary_height: f64) -> Rect {
    let rect = rect.abs();
    Rect::from_origin_size((rect.x0, primary_height - rect.y0 - rect.height()), rect.size())
}

pub fn point_to_bottom_left(p: Point, primary_height: f64) -> Point {
    Point::new(p.x, primary_height - p.y)
}

/// True when the two rects share some area; touching edges do not count.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.intersect(b).area() > 0.0
}
