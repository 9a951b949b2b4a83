//! Windows system tray — Win32 message loop.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clockglyph_lib::clock::DisplayMode;

use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, MSG, MsgWaitForMultipleObjects, PM_REMOVE, PeekMessageW, QS_ALLINPUT,
    TranslateMessage, WM_QUIT,
};

use super::shared::{self, PlatformAdapter};
use crate::RUNNING;

/// Pump all pending Win32 messages. Required for tray-icon to receive its
/// internal window messages on Windows.
fn pump_messages() {
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                RUNNING.store(false, Ordering::SeqCst);
                return;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

pub struct WindowsAdapter;

impl PlatformAdapter for WindowsAdapter {
    fn platform_init() -> clockglyph_lib::error::Result<()> {
        Ok(())
    }

    fn pump_events() {
        pump_messages();
    }

    fn wait_for_events() {
        unsafe {
            MsgWaitForMultipleObjects(None, false, 50, QS_ALLINPUT);
        }
    }
}

pub fn run(mode: DisplayMode, settings_path: Option<PathBuf>) -> clockglyph_lib::error::Result<()> {
    shared::run_core::<WindowsAdapter>(mode, settings_path)
}
