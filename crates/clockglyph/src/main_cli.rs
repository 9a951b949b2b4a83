//! Clockglyph CLI — render icons, inspect colors, and edit the shared clock settings.
//!
//! Console subsystem: works normally in PowerShell, cmd, and other terminals.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use clockglyph_lib::clock::DisplayMode;

mod cli;

/// Shared shutdown flag, set by Ctrl+C handler.
pub static RUNNING: AtomicBool = AtomicBool::new(true);

#[derive(Parser)]
#[command(
    name = "clockglyph-cli",
    version,
    about = "Render and configure the Clockglyph hour and minute icons"
)]
struct Args {
    /// Output as JSON (for render, config, color, format, sync, watch)
    #[arg(long, global = true)]
    json: bool,

    /// Which icon's settings to use (hour or minute)
    #[arg(long, global = true, default_value = "hour")]
    mode: DisplayMode,

    /// Settings file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Don't push changes to the companion icon
    #[arg(long, global = true)]
    no_sync: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: cli::Command,
}

// ── Ctrl+C handler ──

#[cfg(windows)]
unsafe extern "system" fn ctrl_handler(_ctrl_type: u32) -> windows::core::BOOL {
    RUNNING.store(false, Ordering::SeqCst);
    windows::core::BOOL(1)
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Install Ctrl+C handler
    #[cfg(windows)]
    unsafe {
        let _ = windows::Win32::System::Console::SetConsoleCtrlHandler(Some(ctrl_handler), true);
    }

    #[cfg(not(windows))]
    {
        ctrlc::set_handler(move || {
            RUNNING.store(false, Ordering::SeqCst);
        })
        .ok();
    }

    let ctx = cli::CliContext {
        mode: args.mode,
        settings_path: args.config,
        sync: !args.no_sync,
        json: args.json,
    };
    if let Err(e) = cli::run(args.command, &ctx) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
