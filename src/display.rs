// src/display.rs

use anyhow::{Context, Result};
use xcap::Monitor;

use crate::geometry::{Point, Rect};

/// One connected display, frame in global top-left-origin points.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDescriptor {
    pub index: usize,
    pub frame: Rect,
    pub is_primary: bool,
}

pub fn list_displays() -> Result<Vec<DisplayDescriptor>> {
    let monitors = Monitor::all().context("failed to enumerate monitors")?;
    Ok(monitors
        .iter()
        .enumerate()
        .map(|(index, m)| DisplayDescriptor {
            index,
            frame: monitor_frame(m),
            is_primary: m.is_primary().unwrap_or(false),
        })
        .collect())
}

pub(crate) fn monitor_frame(m: &Monitor) -> Rect {
    Rect::from_origin_size(
        (m.x().unwrap_or(0) as f64, m.y().unwrap_or(0) as f64),
        (m.width().unwrap_or(0) as f64, m.height().unwrap_or(0) as f64),
    )
}

/// The display positioned at `(0,0)`. This is not necessarily the focused
/// one; falls back to the flagged primary, then the first display.
pub fn primary_display(displays: &[DisplayDescriptor]) -> Option<&DisplayDescriptor> {
    displays
        .iter()
        .find(|d| d.frame.origin() == Point::ZERO)
        .or_else(|| displays.iter().find(|d| d.is_primary))
        .or_else(|| displays.first())
}

pub fn primary_display_height(displays: &[DisplayDescriptor]) -> f64 {
    primary_display(displays).map(|d| d.frame.height()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(index: usize, (x, y, w, h): (f64, f64, f64, f64), is_primary: bool) -> DisplayDescriptor {
        DisplayDescriptor { index, frame: Rect::from_origin_size((x, y), (w, h)), is_primary }
    }

    #[test]
    fn primary_is_the_display_at_origin() {
        // the OS flags the external one as primary, but it is not at (0,0)
        let displays = vec![
            display(0, (-2560.0, -300.0, 2560.0, 1440.0), true),
            display(1, (0.0, 0.0, 1512.0, 982.0), false),
        ];
        assert_eq!(primary_display(&displays).map(|d| d.index), Some(1));
        assert_eq!(primary_display_height(&displays), 982.0);
    }

    #[test]
    fn primary_falls_back_to_flag_then_first() {
        let flagged = vec![
            display(0, (10.0, 0.0, 800.0, 600.0), false),
            display(1, (810.0, 0.0, 1024.0, 768.0), true),
        ];
        assert_eq!(primary_display(&flagged).map(|d| d.index), Some(1));

        let unflagged = vec![display(0, (10.0, 0.0, 800.0, 600.0), false)];
        assert_eq!(primary_display(&unflagged).map(|d| d.index), Some(0));
        assert_eq!(primary_display_height(&[]), 0.0);
    }
}
