// src/output.rs
//
// Writing captured images: file naming, encoding, clipboard, save dialog.

use std::path::{Path, PathBuf};

use arboard::{Clipboard, ImageData};
use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat, RgbaImage};
use log::{debug, info};
use thiserror::Error;

use crate::capture::Captured;
use crate::config::SuffixPattern;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Error writing image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),
    #[error("Error writing image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Save cancelled")]
    Cancelled,
    #[error("Nothing was captured")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FileFormat {
    #[default]
    Png,
    #[value(alias = "jpg")]
    Jpeg,
    #[value(alias = "tif")]
    Tiff,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Png => "png",
            FileFormat::Jpeg => "jpeg",
            FileFormat::Tiff => "tiff",
        }
    }

    fn image_format(&self) -> ImageFormat {
        match self {
            FileFormat::Png => ImageFormat::Png,
            FileFormat::Jpeg => ImageFormat::Jpeg,
            FileFormat::Tiff => ImageFormat::Tiff,
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(FileFormat::Png),
            "jpg" | "jpeg" => Some(FileFormat::Jpeg),
            "tif" | "tiff" => Some(FileFormat::Tiff),
            _ => None,
        }
    }
}

/// Where one capture result goes: `base` has no extension yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputItem {
    pub base: String,
    pub format: FileFormat,
}

/// Splits a user-supplied file name. A known image extension picks the
/// format and is removed; anything else keeps `fallback` and stays whole.
pub fn split_file(file: &str, fallback: FileFormat) -> OutputItem {
    let path = Path::new(file);
    let known = path.extension().and_then(|e| e.to_str()).and_then(FileFormat::from_extension);
    match known {
        Some(format) => {
            let ext_len = path.extension().map(|e| e.len() + 1).unwrap_or(0);
            OutputItem { base: file[..file.len() - ext_len].to_string(), format }
        }
        None => OutputItem { base: file.to_string(), format: fallback },
    }
}

/// Result i goes to file i; extra results without a file are dropped.
pub fn plan_for_files(files: &[String], results: usize, format: FileFormat) -> Vec<OutputItem> {
    files.iter().take(results).map(|f| split_file(f, format)).collect()
}

/// `base`, `base (2)`, `base (3)`...
pub fn plan_for_base(base: &str, results: usize, format: FileFormat) -> Vec<OutputItem> {
    (0..results)
        .map(|i| {
            let base = if i == 0 { base.to_string() } else { format!("{base} ({})", i + 1) };
            OutputItem { base, format }
        })
        .collect()
}

pub fn default_name(now: DateTime<Local>) -> String {
    now.format("Screenshot %Y-%m-%d at %H.%M.%S").to_string()
}

pub struct OutputWriter {
    suffix: SuffixPattern,
}

impl OutputWriter {
    pub fn new(suffix: SuffixPattern) -> Self {
        OutputWriter { suffix }
    }

    /// File names for one result. With both densities the high-density
    /// image gets the suffix.
    pub fn paths<'a>(&self, item: &OutputItem, captured: &'a Captured) -> Vec<(PathBuf, &'a RgbaImage)> {
        let ext = item.format.extension();
        let plain = PathBuf::from(format!("{}.{ext}", item.base));
        match (&captured.best, &captured.nominal) {
            (Some(best), Some(nominal)) => vec![
                (PathBuf::from(format!("{}{}.{ext}", item.base, self.suffix.as_str())), best),
                (plain, nominal),
            ],
            (Some(image), None) | (None, Some(image)) => vec![(plain, image)],
            (None, None) => Vec::new(),
        }
    }

    pub fn write(&self, results: &[Captured], plan: &[OutputItem]) -> Result<Vec<PathBuf>, OutputError> {
        let mut written = Vec::new();
        for (captured, item) in results.iter().zip(plan) {
            for (path, image) in self.paths(item, captured) {
                write_image(image, &path, item.format)?;
                println!("Wrote {}", path.display());
                written.push(path);
            }
        }
        if written.is_empty() {
            return Err(OutputError::Empty);
        }
        Ok(written)
    }
}

pub fn write_image(image: &RgbaImage, path: &Path, format: FileFormat) -> Result<(), OutputError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    match format {
        // JPEG has no alpha channel
        FileFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .save_with_format(path, format.image_format())?,
        _ => image.save_with_format(path, format.image_format())?,
    }
    debug!("encoded {}x{} as {:?}", image.width(), image.height(), format);
    Ok(())
}

// Clipboard helpers
pub fn copy_image_to_clipboard(image: &RgbaImage) -> Result<(), OutputError> {
    let mut clipboard = Clipboard::new()?;
    let image_data = ImageData {
        width: image.width() as usize,
        height: image.height() as usize,
        bytes: image.as_raw().into(),
    };
    clipboard.set_image(image_data)?;
    info!("copied {}x{} image to clipboard", image.width(), image.height());
    Ok(())
}

/// Native save dialog. The chosen file's extension picks the format.
pub fn prompt_for_save_location(
    default_dir: &Path,
    default_name: &str,
    format: FileFormat,
) -> Result<OutputItem, OutputError> {
    let path = rfd::FileDialog::new()
        .set_title("Save screenshot")
        .set_directory(default_dir)
        .set_file_name(format!("{default_name}.{}", format.extension()))
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .add_filter("TIFF", &["tiff", "tif"])
        .save_file()
        .ok_or(OutputError::Cancelled)?;
    let file = path.to_string_lossy();
    Ok(split_file(&file, format))
}
