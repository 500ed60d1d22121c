// src/window_pick.rs
// Window-under-cursor selection.

use anyhow::{Context, Result};
use log::{debug, warn};
use xcap::Window;

use crate::geometry::{Point, Rect, to_bottom_left_origin};

/// A window seen at one instant. `frame` is top-left-origin, as enumerated.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDescriptor {
    pub id: u32,
    pub stacking_level: i32,
    pub frame: Rect,
}

/// Source of on-screen windows.
pub trait WindowSource {
    /// Visible windows, frontmost first, excluding our own overlays.
    fn windows_front_to_back(&self) -> Result<Vec<WindowDescriptor>>;
}

/// Topmost window whose frame, converted to bottom-left-origin space,
/// contains `pointer`. The returned descriptor carries the converted frame.
pub fn window_under(
    pointer: Point,
    primary_height: f64,
    windows: &[WindowDescriptor],
) -> Option<WindowDescriptor> {
    windows.iter().find_map(|w| {
        let frame = to_bottom_left_origin(w.frame, primary_height);
        frame.contains(pointer).then(|| WindowDescriptor { frame, ..w.clone() })
    })
}

/// 窗口悬停状态
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HoverSelection {
    #[default]
    Idle,
    Hovering(WindowDescriptor),
}

impl HoverSelection {
    pub fn highlighted(&self) -> Option<&WindowDescriptor> {
        match self {
            HoverSelection::Idle => None,
            HoverSelection::Hovering(w) => Some(w),
        }
    }

    fn query(pointer: Point, primary_height: f64, source: &dyn WindowSource) -> Option<WindowDescriptor> {
        match source.windows_front_to_back() {
            Ok(windows) => window_under(pointer, primary_height, &windows),
            Err(err) => {
                warn!("window enumeration failed: {err:#}");
                None
            }
        }
    }

    /// Re-queries the window under the pointer. Returns true if the
    /// highlight changed.
    pub fn pointer_move(&mut self, pointer: Point, primary_height: f64, source: &dyn WindowSource) -> bool {
        let next = match Self::query(pointer, primary_height, source) {
            Some(w) => HoverSelection::Hovering(w),
            None => HoverSelection::Idle,
        };
        let changed = *self != next;
        *self = next;
        changed
    }

    /// Pointer released: the window id under the pointer, if any.
    pub fn pointer_up(&mut self, pointer: Point, primary_height: f64, source: &dyn WindowSource) -> Option<u32> {
        if matches!(self, HoverSelection::Idle) {
            return None;
        }
        let picked = Self::query(pointer, primary_height, source).map(|w| w.id);
        *self = HoverSelection::Idle;
        picked
    }
}

/// Window enumeration backed by xcap.
pub struct XcapWindowSource {
    own_pid: u32,
}

impl XcapWindowSource {
    pub fn new() -> Self {
        XcapWindowSource { own_pid: std::process::id() }
    }
}

impl Default for XcapWindowSource {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowSource for XcapWindowSource {
    fn windows_front_to_back(&self) -> Result<Vec<WindowDescriptor>> {
        let windows = Window::all().context("failed to enumerate windows")?;
        let mut list: Vec<WindowDescriptor> = windows
            .iter()
            .filter(|w| !w.is_minimized().unwrap_or(true))
            // the overlays belong to this process
            .filter(|w| w.pid().map(|pid| pid != self.own_pid).unwrap_or(true))
            .filter_map(|w| {
                Some(WindowDescriptor {
                    id: w.id().ok()?,
                    stacking_level: w.z().unwrap_or(0),
                    frame: Rect::from_origin_size(
                        (w.x().ok()? as f64, w.y().ok()? as f64),
                        (w.width().ok()? as f64, w.height().ok()? as f64),
                    ),
                })
            })
            .collect();
        // stable: ties keep enumeration order
        list.sort_by(|a, b| b.stacking_level.cmp(&a.stacking_level));
        debug!("{} candidate windows", list.len());
        Ok(list)
    }
}
