// src/cli.rs

use clap::{ArgAction, Parser, ValueEnum};
use log::warn;

use crate::capture::{ImageOptions, Quality};
use crate::output::FileFormat;
use crate::overlay::ModePolicy;
use crate::selection::InteractionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    #[value(name = "1x")]
    Nominal,
    #[value(name = "2x")]
    Best,
    Both,
}

impl From<QualityArg> for Quality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Nominal => Quality::Nominal,
            QualityArg::Best => Quality::Best,
            QualityArg::Both => Quality::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SuffixArg {
    /// name@2x.png
    At,
    /// name_2x.png
    Underscore,
}

#[derive(Parser, Debug)]
#[command(
    name = "dualshot",
    version,
    about = "Capture displays, windows or a selected region at native and standard density",
    after_help = "In interactive mode the space key toggles between mouse selection and window \
                  selection, holding space while dragging moves the box and escape cancels."
)]
pub struct Args {
    /// Where to save the capture, one file per display. Defaults to the
    /// screenshot folder.
    #[arg(value_name = "FILE")]
    pub files: Vec<String>,

    /// Copy the capture to the clipboard instead of writing files.
    #[arg(short = 'c', long, action = ArgAction::SetTrue)]
    pub clipboard: bool,

    /// Select a region or a window interactively.
    #[arg(short = 'i', long, action = ArgAction::SetTrue)]
    pub interactive: bool,

    /// Capture the given display. 1 is the main display, 2 the next one...
    #[arg(short = 'D', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub display: Option<u32>,

    /// Do not include the window shadow in window captures.
    #[arg(short = 'o', long, action = ArgAction::SetTrue)]
    pub no_shadow: bool,

    /// Only allow mouse selection.
    #[arg(short = 's', long, action = ArgAction::SetTrue, conflicts_with = "window_only")]
    pub select_only: bool,

    /// Only allow window selection.
    #[arg(short = 'w', long, action = ArgAction::SetTrue)]
    pub window_only: bool,

    /// Start interactive mode in window selection.
    #[arg(short = 'W', action = ArgAction::SetTrue)]
    pub start_in_window: bool,

    #[arg(short = 't', long, value_enum, default_value_t = FileFormat::Png)]
    pub format: FileFormat,

    /// Capture the window with the given id.
    #[arg(short = 'l', long = "window", value_name = "ID")]
    pub window_id: Option<u32>,

    #[arg(short = 'q', long, value_enum, default_value_t = QualityArg::Both)]
    pub quality: QualityArg,

    /// Capture every display into a single image.
    #[arg(short = 'e', long, action = ArgAction::SetTrue)]
    pub everything: bool,

    /// Ask where to save with a file dialog.
    #[arg(short = 'f', long, action = ArgAction::SetTrue)]
    pub dialog: bool,

    /// File name marker of the high-density image.
    #[arg(long, value_enum)]
    pub suffix: Option<SuffixArg>,
}

/// Parsed and reconciled command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub files: Vec<String>,
    pub clipboard: bool,
    pub interactive: bool,
    /// Zero-based.
    pub display: Option<usize>,
    pub window_id: Option<u32>,
    pub everything: bool,
    pub dialog: bool,
    pub format: FileFormat,
    pub quality: Quality,
    pub image_options: ImageOptions,
    pub modes: ModePolicy,
    pub suffix: Option<SuffixArg>,
}

impl From<Args> for Options {
    fn from(args: Args) -> Self {
        let only = if args.select_only {
            Some(InteractionMode::MouseSelection)
        } else if args.window_only {
            Some(InteractionMode::WindowSelection)
        } else {
            None
        };
        let start = if args.start_in_window {
            InteractionMode::WindowSelection
        } else {
            InteractionMode::MouseSelection
        };
        let interactive = args.interactive || args.select_only || args.window_only || args.start_in_window;

        if interactive && args.display.is_some() {
            warn!("ignoring `-D` because running in interactive mode");
        }
        if interactive && args.window_id.is_some() {
            warn!("ignoring `-l` because running in interactive mode");
        }
        if args.clipboard && !args.files.is_empty() {
            warn!("ignoring destination files since `-c` was set");
        }

        Options {
            files: args.files,
            clipboard: args.clipboard,
            interactive,
            display: args.display.map(|n| n as usize - 1),
            window_id: args.window_id,
            everything: args.everything,
            dialog: args.dialog,
            format: args.format,
            quality: args.quality.into(),
            // all-displays captures carry no shadow, but the framing margin
            // would still be reserved
            image_options: ImageOptions { ignore_framing: args.no_shadow || args.everything },
            modes: ModePolicy::new(start, only),
            suffix: args.suffix,
        }
    }
}
