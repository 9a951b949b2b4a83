//! Integration tests: a settings change travelling between two companions.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::mpsc;
use std::time::Duration;

use clockglyph_lib::clock::{DisplayMode, IconSpec};
use clockglyph_lib::settings::{Settings, SettingsPatch, SettingsWatcher};
use clockglyph_lib::sync::{SyncListener, send_to_companion};

const WAIT: Duration = Duration::from_secs(5);

fn any_port() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
}

#[test]
fn color_change_reaches_companion_store() {
    let dir = tempfile::tempdir().unwrap();
    let hour_path = dir.path().join("hour.toml");
    let minute_path = dir.path().join("minute.toml");

    // Minute instance: listening, with its own store.
    let (tx, rx) = mpsc::channel();
    let listener = SyncListener::bind(any_port(), tx).unwrap();
    let mut minute = Settings::default();
    minute.save_to(&minute_path).unwrap();

    // Hour instance: user picks a color.
    let mut hour = Settings::default();
    hour.set_custom_color("#f80").unwrap();
    hour.save_to(&hour_path).unwrap();
    send_to_companion(listener.local_addr(), &hour.to_patch()).unwrap();

    // Minute instance applies, saves, and does not forward.
    let patch = rx.recv_timeout(WAIT).unwrap();
    assert!(minute.apply_patch(&patch));
    minute.save_to(&minute_path).unwrap();

    let (reloaded, warnings) = Settings::load_from(&minute_path);
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(reloaded, hour);
    assert_eq!(reloaded.display_color(), "#FF8800");
    assert_eq!(reloaded.recent_colors, vec!["#FF8800".to_string()]);
}

#[test]
fn both_icons_agree_after_format_sync() {
    let (tx, rx) = mpsc::channel();
    let listener = SyncListener::bind(any_port(), tx).unwrap();

    let patch = SettingsPatch {
        use_24_hour_format: Some(true),
        show_leading_zero: Some(true),
        ..SettingsPatch::default()
    };
    send_to_companion(listener.local_addr(), &patch).unwrap();

    let mut hour = Settings::default();
    hour.apply_patch(&patch);
    let mut minute = Settings::default();
    minute.apply_patch(&rx.recv_timeout(WAIT).unwrap());

    let now = chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(7, 4, 0)
        .unwrap();
    let h = IconSpec::for_time(DisplayMode::Hour, &hour, now);
    let m = IconSpec::for_time(DisplayMode::Minute, &minute, now);
    assert_eq!((h.text.as_str(), m.text.as_str()), ("07", "04"));
    assert_eq!(h.tooltip, m.tooltip);
}

#[test]
fn receiver_save_is_not_reported_as_external_edit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minute.toml");
    Settings::default().save_to(&path).unwrap();
    let mut watcher = SettingsWatcher::new(path.clone());

    let mut settings = Settings::default();
    settings.apply_patch(&SettingsPatch {
        show_leading_zero: Some(true),
        ..SettingsPatch::default()
    });
    settings.save_to(&path).unwrap();
    watcher.mark_seen();
    assert!(watcher.poll().is_none());
}
