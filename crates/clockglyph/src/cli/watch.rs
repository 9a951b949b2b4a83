//! `watch` subcommand — headless icon update loop.
//!
//! Runs the same schedule as the tray (boundaries, stale refresh, settings
//! changes on disk) and prints each new icon instead of showing it.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use clockglyph_lib::coordinator::DrawCoordinator;
use clockglyph_lib::schedule;
use clockglyph_lib::settings::SettingsWatcher;
use clockglyph_lib::surface::OffscreenSurface;
use clockglyph_lib::updater::IconUpdater;

use super::{CliContext, RUNNING, Result, WatchEventJson};

/// Longest sleep between checks, so Ctrl+C and settings edits are noticed.
const MAX_SLEEP: Duration = Duration::from_millis(250);

pub(super) fn cmd_watch(ctx: &CliContext, count: Option<u32>) -> Result<()> {
    let mut settings = ctx.load();
    let mut watcher = ctx.path().map(SettingsWatcher::new);
    let mut updater = IconUpdater::new(ctx.mode, DrawCoordinator::new(OffscreenSurface::default()));
    let mut updates = 0u32;

    if !ctx.json {
        println!("Watching the {} icon (Ctrl+C to stop)...", ctx.mode);
    }

    while RUNNING.load(Ordering::SeqCst) {
        if let Some(fresh) = watcher.as_mut().and_then(SettingsWatcher::poll)
            && fresh != settings
        {
            settings = fresh;
            updater.settings_changed();
        }

        let now_wall = chrono::Local::now().naive_local();
        if let Some((reason, outcome)) = updater.tick(&settings, now_wall, Instant::now()) {
            if ctx.json {
                let event = WatchEventJson {
                    time: now_wall.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    reason: format!("{reason:?}"),
                    text: outcome.text,
                    tooltip: outcome.tooltip,
                    rendered: outcome.rendered,
                };
                // One compact object per line.
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{line}");
                }
            } else {
                let status = if outcome.rendered { "" } else { "  (render failed)" };
                println!(
                    "[{}] {:<3} {}{status}",
                    now_wall.format("%H:%M:%S"),
                    outcome.text,
                    outcome.tooltip
                );
            }
            updates += 1;
            if count.is_some_and(|n| updates >= n) {
                break;
            }
        }

        let wait = schedule::until_next_boundary(ctx.mode, now_wall).min(MAX_SLEEP);
        std::thread::sleep(wait.max(Duration::from_millis(10)));
    }
    Ok(())
}
