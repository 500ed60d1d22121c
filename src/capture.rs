// src/capture.rs
//
// Capture invoker plus the xcap-backed capture backend.

use anyhow::{Context, anyhow, bail};
use image::{RgbaImage, imageops};
use log::{debug, info};
use xcap::{Monitor, Window};

use crate::display::monitor_frame;
use crate::geometry::{Rect, overlaps};

/// What to capture. Regions are top-left-origin global points.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureTarget {
    /// Zero-based display index.
    Display(usize),
    Window(u32),
    Region(Rect),
    AllDisplays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    /// Native pixels (2x on Retina).
    Best,
    /// One pixel per point.
    Nominal,
}

impl std::fmt::Display for Density {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Density::Best => f.write_str("high-density"),
            Density::Nominal => f.write_str("standard-density"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Nominal,
    Best,
    #[default]
    Both,
}

impl Quality {
    fn densities(self) -> &'static [Density] {
        match self {
            Quality::Nominal => &[Density::Nominal],
            Quality::Best => &[Density::Best],
            Quality::Both => &[Density::Best, Density::Nominal],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageOptions {
    /// Leave out the window shadow.
    pub ignore_framing: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to capture {density} screenshot: {reason}")]
    Failed { density: Density, reason: String },
}

/// Result of one target: one or both densities.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub best: Option<RgbaImage>,
    pub nominal: Option<RgbaImage>,
}

impl Captured {
    /// The image to use when only one fits (clipboard).
    pub fn preferred_single(&self) -> Option<&RgbaImage> {
        self.nominal.as_ref().or(self.best.as_ref())
    }
}

/// The OS capture call. An error plays the role of a null image.
pub trait CaptureBackend {
    fn capture(&self, target: &CaptureTarget, density: Density, options: ImageOptions) -> anyhow::Result<RgbaImage>;
}

pub struct CaptureInvoker<B> {
    backend: B,
    quality: Quality,
    options: ImageOptions,
}

impl<B: CaptureBackend> CaptureInvoker<B> {
    pub fn new(backend: B, quality: Quality, options: ImageOptions) -> Self {
        CaptureInvoker { backend, quality, options }
    }

    /// One backend call per requested density.
    pub fn capture(&self, target: &CaptureTarget) -> Result<Captured, CaptureError> {
        let mut captured = Captured::default();
        for &density in self.quality.densities() {
            let image = self
                .backend
                .capture(target, density, self.options)
                .map_err(|e| CaptureError::Failed { density, reason: format!("{e:#}") })?;
            debug!("captured {target:?} at {density}: {}x{}", image.width(), image.height());
            match density {
                Density::Best => captured.best = Some(image),
                Density::Nominal => captured.nominal = Some(image),
            }
        }
        Ok(captured)
    }
}

// xcap backend

/// A monitor image together with where it sits in global points.
struct Shot {
    frame: Rect,
    image: RgbaImage,
}

impl Shot {
    /// Pixels per point of the raw capture.
    fn pixel_ratio(&self) -> f64 {
        if self.frame.width() <= 0.0 {
            1.0
        } else {
            self.image.width() as f64 / self.frame.width()
        }
    }
}

pub struct XcapBackend;

impl XcapBackend {
    fn shots(filter: impl Fn(&Rect) -> bool) -> anyhow::Result<Vec<Shot>> {
        let monitors = Monitor::all().context("failed to enumerate monitors")?;
        let mut shots = Vec::new();
        for m in monitors.iter() {
            let frame = monitor_frame(m);
            if !filter(&frame) {
                continue;
            }
            let image = m.capture_image().context("monitor capture returned no image")?;
            shots.push(Shot { frame, image });
        }
        Ok(shots)
    }

    fn display(index: usize, density: Density) -> anyhow::Result<RgbaImage> {
        let monitors = Monitor::all().context("failed to enumerate monitors")?;
        let m = monitors.get(index).ok_or_else(|| anyhow!("no display number {}", index + 1))?;
        let frame = monitor_frame(m);
        let image = m.capture_image().context("monitor capture returned no image")?;
        Ok(match density {
            Density::Best => image,
            Density::Nominal => to_points(image, frame.width(), frame.height()),
        })
    }

    fn window(id: u32, density: Density, options: ImageOptions) -> anyhow::Result<RgbaImage> {
        let windows = Window::all().context("failed to enumerate windows")?;
        let w = windows
            .into_iter()
            .find(|w| w.id().map(|wid| wid == id).unwrap_or(false))
            .ok_or_else(|| anyhow!("no window with id {id}"))?;
        let width = w.width().unwrap_or(0) as f64;
        let mut image = w.capture_image().context("window capture returned no image")?;
        let ratio = if width > 0.0 { image.width() as f64 / width } else { 1.0 };
        if options.ignore_framing {
            image = trim_translucent_border(&image);
        }
        Ok(match density {
            Density::Best => image,
            Density::Nominal => {
                let (w, h) = (image.width() as f64 / ratio, image.height() as f64 / ratio);
                to_points(image, w, h)
            }
        })
    }

    fn region(rect: Option<Rect>, density: Density) -> anyhow::Result<RgbaImage> {
        let shots = Self::shots(|frame| rect.is_none_or(|r| overlaps(*frame, r)))?;
        if shots.is_empty() {
            bail!("region lies outside every display");
        }
        let bounds = match rect {
            Some(r) => r,
            None => shots.iter().skip(1).fold(shots[0].frame, |acc, s| acc.union(s.frame)),
        };
        let scale = match density {
            Density::Best => shots.iter().map(Shot::pixel_ratio).fold(1.0, f64::max),
            Density::Nominal => 1.0,
        };
        compose(&shots, bounds, scale)
    }
}

impl CaptureBackend for XcapBackend {
    fn capture(&self, target: &CaptureTarget, density: Density, options: ImageOptions) -> anyhow::Result<RgbaImage> {
        info!("capturing {target:?} at {density}");
        match target {
            CaptureTarget::Display(index) => Self::display(*index, density),
            CaptureTarget::Window(id) => Self::window(*id, density, options),
            CaptureTarget::Region(rect) => Self::region(Some(*rect), density),
            CaptureTarget::AllDisplays => Self::region(None, density),
        }
    }
}

fn to_points(image: RgbaImage, width: f64, height: f64) -> RgbaImage {
    let (w, h) = (width.round() as u32, height.round() as u32);
    if w == 0 || h == 0 || (image.width(), image.height()) == (w, h) {
        return image;
    }
    imageops::resize(&image, w, h, imageops::FilterType::Lanczos3)
}

/// Paints every shot into a canvas covering `bounds` at `scale` pixels per
/// point.
fn compose(shots: &[Shot], bounds: Rect, scale: f64) -> anyhow::Result<RgbaImage> {
    let width = (bounds.width() * scale).round() as u32;
    let height = (bounds.height() * scale).round() as u32;
    if width == 0 || height == 0 {
        bail!("empty capture region");
    }
    let mut canvas = RgbaImage::new(width, height);
    for shot in shots {
        let w = (shot.frame.width() * scale).round() as u32;
        let h = (shot.frame.height() * scale).round() as u32;
        let scaled = if (shot.image.width(), shot.image.height()) == (w, h) {
            shot.image.clone()
        } else {
            imageops::resize(&shot.image, w, h, imageops::FilterType::Lanczos3)
        };
        let x = ((shot.frame.x0 - bounds.x0) * scale).round() as i64;
        let y = ((shot.frame.y0 - bounds.y0) * scale).round() as i64;
        imageops::replace(&mut canvas, &scaled, x, y);
    }
    Ok(canvas)
}

/// Drops outer rows and columns without a single opaque pixel, which is
/// where the drop shadow lives.
fn trim_translucent_border(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let row_opaque = |y: u32| (0..w).any(|x| image.get_pixel(x, y)[3] == 255);
    let col_opaque = |x: u32| (0..h).any(|y| image.get_pixel(x, y)[3] == 255);

    let Some(top) = (0..h).find(|&y| row_opaque(y)) else {
        return image.clone();
    };
    let bottom = (0..h).rev().find(|&y| row_opaque(y)).unwrap_or(top);
    let left = (0..w).find(|&x| col_opaque(x)).unwrap_or(0);
    let right = (0..w).rev().find(|&x| col_opaque(x)).unwrap_or(left);

    imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::cell::RefCell;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::from_origin_size((x, y), (w, h))
    }

    #[derive(Default)]
    struct FakeBackend {
        calls: RefCell<Vec<Density>>,
        fail_on: Option<Density>,
    }

    impl CaptureBackend for &FakeBackend {
        fn capture(&self, _target: &CaptureTarget, density: Density, _options: ImageOptions) -> anyhow::Result<RgbaImage> {
            self.calls.borrow_mut().push(density);
            if self.fail_on == Some(density) {
                bail!("capture returned nothing");
            }
            let side = match density {
                Density::Best => 4,
                Density::Nominal => 2,
            };
            Ok(RgbaImage::new(side, side))
        }
    }

    #[test]
    fn both_quality_makes_two_calls() {
        let backend = FakeBackend::default();
        let invoker = CaptureInvoker::new(&backend, Quality::Both, ImageOptions::default());
        let captured = invoker.capture(&CaptureTarget::Display(0)).unwrap();
        assert_eq!(*backend.calls.borrow(), vec![Density::Best, Density::Nominal]);
        assert_eq!(captured.best.map(|i| i.width()), Some(4));
        assert_eq!(captured.nominal.map(|i| i.width()), Some(2));
    }

    #[test]
    fn single_quality_makes_one_call() {
        for (quality, density) in [(Quality::Best, Density::Best), (Quality::Nominal, Density::Nominal)] {
            let backend = FakeBackend::default();
            let invoker = CaptureInvoker::new(&backend, quality, ImageOptions::default());
            let captured = invoker.capture(&CaptureTarget::Window(3)).unwrap();
            assert_eq!(*backend.calls.borrow(), vec![density]);
            assert_eq!(captured.best.is_some(), density == Density::Best);
            assert_eq!(captured.nominal.is_some(), density == Density::Nominal);
        }
    }

    #[test]
    fn failure_is_tagged_with_density() {
        let backend = FakeBackend { fail_on: Some(Density::Nominal), ..Default::default() };
        let invoker = CaptureInvoker::new(&backend, Quality::Both, ImageOptions::default());
        let err = invoker.capture(&CaptureTarget::AllDisplays).unwrap_err();
        assert!(matches!(err, CaptureError::Failed { density: Density::Nominal, .. }));
        assert!(err.to_string().contains("standard-density"));
    }

    #[test]
    fn clipboard_prefers_nominal() {
        let captured = Captured { best: Some(RgbaImage::new(4, 4)), nominal: Some(RgbaImage::new(2, 2)) };
        assert_eq!(captured.preferred_single().map(|i| i.width()), Some(2));
        let best_only = Captured { best: Some(RgbaImage::new(4, 4)), nominal: None };
        assert_eq!(best_only.preferred_single().map(|i| i.width()), Some(4));
    }

    #[test]
    fn compose_places_displays_side_by_side() {
        let left = Shot {
            frame: rect(-2.0, 0.0, 2.0, 2.0),
            image: RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255])),
        };
        let right = Shot {
            frame: rect(0.0, 0.0, 2.0, 1.0),
            image: RgbaImage::from_pixel(4, 2, Rgba([0, 0, 255, 255])),
        };
        let bounds = left.frame.union(right.frame);
        let canvas = compose(&[left, right], bounds, 2.0).unwrap();
        assert_eq!(canvas.dimensions(), (8, 4));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(5, 0), &Rgba([0, 0, 255, 255]));
        // below the shorter display stays empty
        assert_eq!(canvas.get_pixel(5, 3), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn compose_crops_to_region() {
        let shot = Shot {
            frame: rect(0.0, 0.0, 10.0, 10.0),
            image: RgbaImage::from_fn(10, 10, |x, y| Rgba([x as u8, y as u8, 0, 255])),
        };
        let canvas = compose(&[shot], rect(3.0, 4.0, 2.0, 2.0), 1.0).unwrap();
        assert_eq!(canvas.dimensions(), (2, 2));
        assert_eq!(canvas.get_pixel(0, 0), &Rgba([3, 4, 0, 255]));
        assert_eq!(canvas.get_pixel(1, 1), &Rgba([4, 5, 0, 255]));
    }

    #[test]
    fn compose_rejects_empty_region() {
        assert!(compose(&[], rect(0.0, 0.0, 0.0, 5.0), 2.0).is_err());
    }

    #[test]
    fn trims_shadow_margin() {
        let mut image = RgbaImage::from_pixel(6, 5, Rgba([0, 0, 0, 40]));
        for y in 1..3 {
            for x in 1..5 {
                image.put_pixel(x, y, Rgba([200, 200, 200, 255]));
            }
        }
        let trimmed = trim_translucent_border(&image);
        assert_eq!(trimmed.dimensions(), (4, 2));

        let all_clear = RgbaImage::new(3, 3);
        assert_eq!(trim_translucent_border(&all_clear).dimensions(), (3, 3));
    }
}
