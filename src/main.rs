use anyhow::{Result, bail};
use chrono::Local;
use clap::Parser;
use log::{info, warn};

mod capture;
mod cli;
mod config;
mod display;
mod geometry;
mod output;
mod overlay;
mod selection;
mod selection_logic;
mod ui;
mod window_pick;

use capture::{CaptureInvoker, CaptureTarget, Captured, Quality, XcapBackend};
use cli::{Args, Options, SuffixArg};
use config::{Config, SuffixPattern};
use output::{
    OutputError, OutputWriter, copy_image_to_clipboard, default_name, plan_for_base, plan_for_files,
    prompt_for_save_location,
};
use ui::{KeyBindings, SessionOutcome};

/// Targets of a non-interactive run, most specific option first.
fn headless_targets(options: &Options, display_count: usize) -> Vec<CaptureTarget> {
    if let Some(id) = options.window_id {
        vec![CaptureTarget::Window(id)]
    } else if let Some(index) = options.display {
        vec![CaptureTarget::Display(index)]
    } else if options.everything {
        vec![CaptureTarget::AllDisplays]
    } else {
        // one display per file, or all of them when no file is given
        let count = if options.files.is_empty() {
            display_count
        } else {
            options.files.len().min(display_count)
        };
        (0..count).map(CaptureTarget::Display).collect()
    }
}

/// The clipboard takes a single image, so `both` degrades to 1x there.
fn effective_quality(options: &Options) -> Quality {
    if options.clipboard && options.quality == Quality::Both {
        Quality::Nominal
    } else {
        options.quality
    }
}

fn suffix_pattern(options: &Options, config: &Config) -> SuffixPattern {
    match options.suffix {
        Some(SuffixArg::At) => SuffixPattern::At,
        Some(SuffixArg::Underscore) => SuffixPattern::Underscore,
        None => config.suffix,
    }
}

/// Hands the results to the clipboard or the file system.
fn deliver(options: &Options, config: &Config, results: &[Captured]) -> Result<()> {
    if options.clipboard {
        let image = results.first().and_then(Captured::preferred_single).ok_or(OutputError::Empty)?;
        copy_image_to_clipboard(image)?;
        println!("Copied to clipboard");
        return Ok(());
    }

    let save_dir = config.resolved_save_dir();
    let name = default_name(Local::now());
    let plan = if options.dialog {
        let item = prompt_for_save_location(&save_dir, &name, options.format)?;
        plan_for_base(&item.base, results.len(), item.format)
    } else if !options.files.is_empty() {
        plan_for_files(&options.files, results.len(), options.format)
    } else {
        let base = save_dir.join(&name);
        plan_for_base(&base.to_string_lossy(), results.len(), options.format)
    };

    OutputWriter::new(suffix_pattern(options, config)).write(results, &plan)?;
    Ok(())
}

fn run_headless(options: &Options, config: &Config) -> Result<()> {
    let displays = display::list_displays()?;
    let invoker = CaptureInvoker::new(XcapBackend, effective_quality(options), options.image_options);

    let mut results = Vec::new();
    for target in headless_targets(options, displays.len()) {
        // any failure ends the run
        results.push(invoker.capture(&target)?);
    }
    deliver(options, config, &results)
}

fn run_interactive(options: Options, config: Config) -> Result<()> {
    let displays = display::list_displays()?;
    let invoker = CaptureInvoker::new(XcapBackend, effective_quality(&options), options.image_options);
    let keys = KeyBindings { move_key: config.move_key, toggle_key: config.toggle_key };
    if options.modes.locked {
        info!("mode toggle disabled, {:?} only", options.modes.start);
    }

    let modes = options.modes;
    let save = Box::new(move |captured: &Captured| deliver(&options, &config, std::slice::from_ref(captured)));
    match ui::run_interactive(displays, modes, keys, invoker, save)? {
        SessionOutcome::Saved => Ok(()),
        SessionOutcome::Cancelled => Ok(()),
        SessionOutcome::Pending => {
            warn!("overlays closed without a selection");
            Ok(())
        }
        SessionOutcome::Failed(reason) => bail!(reason),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options: Options = Args::parse().into();
    let config = Config::load();

    if options.interactive {
        run_interactive(options, config)
    } else {
        run_headless(&options, &config)
    }
}
