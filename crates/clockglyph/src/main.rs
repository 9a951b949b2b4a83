//! Clockglyph — hour and minute clock icons for the system tray.
//!
//! GUI subsystem: run one instance with `--mode hour` and one with
//! `--mode minute`; the two keep their settings in sync.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(any(windows, target_os = "linux"))]
mod tray;

use std::path::PathBuf;

use clap::Parser;
use clockglyph_lib::clock::DisplayMode;
use clockglyph_lib::settings::Settings;

#[cfg(any(windows, target_os = "linux"))]
use std::sync::atomic::AtomicBool;

/// Shared shutdown flag, set by tray quit.
#[cfg(any(windows, target_os = "linux"))]
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(name = "clockglyph", version, about = "Hour and minute clock icons for the system tray")]
struct TrayArgs {
    /// Which half of the clock this icon shows (hour or minute)
    #[arg(long, default_value = "hour")]
    mode: DisplayMode,

    /// Settings file to use instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Initialize the tray app logger, directing output to a log file.
///
/// Falls back to stderr if the log file can't be opened.
fn init_tray_logger(mode: DisplayMode) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.format_target(false);

    if let Some(log_path) = Settings::log_path(mode) {
        if let Some(dir) = log_path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Ok(file) = std::fs::File::create(&log_path) {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }

    builder.init();
}

fn main() {
    let args = TrayArgs::parse();
    init_tray_logger(args.mode);

    #[cfg(not(any(windows, target_os = "linux")))]
    {
        let _ = args.config;
        eprintln!("The tray app is only available on Windows and Linux.");
        eprintln!("Use clockglyph-cli watch for a headless clock.");
        std::process::exit(1);
    }

    #[cfg(any(windows, target_os = "linux"))]
    {
        log::info!("starting {} icon", args.mode);
        if let Err(e) = tray::run(args.mode, args.config) {
            let msg = format!("Error: {e}");
            eprintln!("{msg}");
            show_fatal_error(&msg);
            std::process::exit(1);
        }
    }
}

/// Show a fatal error to the user. On Windows, displays a MessageBox since the
/// tray binary has no console. On other platforms, the eprintln above suffices.
#[cfg(windows)]
fn show_fatal_error(msg: &str) {
    use windows::Win32::UI::WindowsAndMessaging::{MB_ICONERROR, MB_OK, MessageBoxW};
    use windows::core::PCWSTR;

    let wide_msg: Vec<u16> = msg.encode_utf16().chain(std::iter::once(0)).collect();
    let title: Vec<u16> = "Clockglyph"
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();
    unsafe {
        let _ = MessageBoxW(
            None,
            PCWSTR(wide_msg.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_ICONERROR | MB_OK,
        );
    }
}

#[cfg(target_os = "linux")]
fn show_fatal_error(_msg: &str) {
    // On Linux, eprintln above is visible from the terminal.
}
