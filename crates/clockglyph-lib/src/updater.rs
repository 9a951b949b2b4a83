//! Icon update pipeline — settings and wall time in, bitmap and tooltip out.
//!
//! [`IconUpdater`] is what the tray loop and the CLI `watch` command drive.
//! It owns the draw coordinator and the update schedule, and never fails:
//! a render error leaves the last good icon in place, or the static fallback
//! when nothing has been drawn yet.

use std::time::Instant;

use chrono::NaiveDateTime;

use crate::clock::{DisplayMode, IconSpec};
use crate::coordinator::DrawCoordinator;
use crate::render::Bitmap;
use crate::schedule::{UpdateReason, UpdateSchedule};
use crate::settings::Settings;
use crate::surface::RenderTransport;

/// Result of one update.
///
/// `text` and `tooltip` always describe the time shown by `bitmap`. After a
/// failed render they are carried over from the last good icon; with no good
/// icon yet, the fallback shows no digits and the tooltip gives the current time.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub bitmap: Bitmap,
    pub text: String,
    pub tooltip: String,
    /// False when `bitmap` is a stand-in (last good icon or fallback).
    pub rendered: bool,
}

pub struct IconUpdater<T: RenderTransport> {
    coordinator: DrawCoordinator<T>,
    schedule: UpdateSchedule,
    last_good: Option<UpdateOutcome>,
}

impl<T: RenderTransport> IconUpdater<T> {
    pub fn new(mode: DisplayMode, coordinator: DrawCoordinator<T>) -> Self {
        Self::with_schedule(coordinator, UpdateSchedule::new(mode))
    }

    pub fn with_schedule(coordinator: DrawCoordinator<T>, schedule: UpdateSchedule) -> Self {
        Self {
            coordinator,
            schedule,
            last_good: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.schedule.mode()
    }

    pub fn coordinator(&self) -> &DrawCoordinator<T> {
        &self.coordinator
    }

    pub fn schedule(&self) -> &UpdateSchedule {
        &self.schedule
    }

    /// Settings changed: force a redraw on the next [`tick`](Self::tick).
    pub fn settings_changed(&mut self) {
        self.schedule.mark_dirty();
    }

    /// Update if one is due. Returns the reason and the outcome.
    pub fn tick(
        &mut self,
        settings: &Settings,
        now_wall: NaiveDateTime,
        now: Instant,
    ) -> Option<(UpdateReason, UpdateOutcome)> {
        let reason = self.schedule.poll(now_wall, now)?;
        log::debug!("[update] {} icon: {reason:?}", self.mode());
        Some((reason, self.update(settings, now_wall, now)))
    }

    /// Draw the icon for `now_wall` unconditionally.
    pub fn update(
        &mut self,
        settings: &Settings,
        now_wall: NaiveDateTime,
        now: Instant,
    ) -> UpdateOutcome {
        let spec = IconSpec::for_time(self.mode(), settings, now_wall);
        match self.coordinator.draw(spec.to_request()) {
            Ok(bitmap) => {
                self.schedule.record_success(spec.slot, now);
                let outcome = UpdateOutcome {
                    bitmap,
                    text: spec.text,
                    tooltip: spec.tooltip,
                    rendered: true,
                };
                self.last_good = Some(outcome.clone());
                outcome
            }
            Err(e) => {
                log::warn!("[update] {} icon \"{}\" failed: {e}", self.mode(), spec.text);
                self.schedule.record_failure(now);
                let stand_in = self.last_good.clone().unwrap_or_else(|| UpdateOutcome {
                    bitmap: Bitmap::fallback(),
                    text: spec.text,
                    tooltip: spec.tooltip,
                    rendered: false,
                });
                UpdateOutcome {
                    rendered: false,
                    ..stand_in
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderRequest, RenderResponse};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    use chrono::NaiveDate;

    /// Renders inline, or fails every request while `broken` is set.
    #[derive(Default)]
    struct SwitchableTransport {
        broken: AtomicBool,
    }

    impl RenderTransport for SwitchableTransport {
        fn dispatch(&self, request: RenderRequest) -> mpsc::Receiver<RenderResponse> {
            let (tx, rx) = mpsc::channel();
            let cache_key = request.cache_key.clone();
            let response = if self.broken.load(Ordering::SeqCst) {
                RenderResponse::Failed {
                    error: "surface lost".into(),
                    cache_key,
                }
            } else {
                let bitmap = crate::render::render_icon(&request).unwrap();
                RenderResponse::Rendered { bitmap, cache_key }
            };
            tx.send(response).unwrap();
            rx
        }
    }

    fn wall(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn updater(mode: DisplayMode) -> IconUpdater<SwitchableTransport> {
        IconUpdater::new(
            mode,
            DrawCoordinator::new(SwitchableTransport::default()),
        )
    }

    #[test]
    fn first_tick_draws_initial_icon() {
        let mut u = updater(DisplayMode::Hour);
        let (reason, outcome) = u
            .tick(&Settings::default(), wall(15, 20), Instant::now())
            .unwrap();
        assert_eq!(reason, UpdateReason::Initial);
        assert!(outcome.rendered);
        assert_eq!(outcome.text, "3");
        assert_eq!(outcome.tooltip, "3:20 PM");
        assert!(outcome.bitmap.opaque_pixels() > 0);
    }

    #[test]
    fn no_tick_within_same_minute() {
        let mut u = updater(DisplayMode::Minute);
        let now = Instant::now();
        u.tick(&Settings::default(), wall(9, 1), now).unwrap();
        assert!(u.tick(&Settings::default(), wall(9, 1), now).is_none());
        let (reason, outcome) = u.tick(&Settings::default(), wall(9, 2), now).unwrap();
        assert_eq!(reason, UpdateReason::Boundary);
        assert_eq!(outcome.text, "2");
    }

    #[test]
    fn settings_change_forces_redraw() {
        let mut u = updater(DisplayMode::Minute);
        let now = Instant::now();
        u.tick(&Settings::default(), wall(9, 1), now).unwrap();
        u.settings_changed();
        let zero = Settings {
            show_leading_zero: true,
            ..Settings::default()
        };
        let (reason, outcome) = u.tick(&zero, wall(9, 1), now).unwrap();
        assert_eq!(reason, UpdateReason::SettingsChanged);
        assert_eq!(outcome.text, "01");
    }

    #[test]
    fn failure_without_history_uses_fallback() {
        let mut u = updater(DisplayMode::Hour);
        u.coordinator().transport().broken.store(true, Ordering::SeqCst);
        let outcome = u.update(&Settings::default(), wall(8, 0), Instant::now());
        assert!(!outcome.rendered);
        assert_eq!(outcome.bitmap, Bitmap::fallback());
        assert_eq!(outcome.tooltip, "8:00 AM");
        assert_eq!(u.schedule().consecutive_failures(), 1);
    }

    #[test]
    fn failure_keeps_last_good_icon() {
        let mut u = updater(DisplayMode::Hour);
        let now = Instant::now();
        let good = u.update(&Settings::default(), wall(8, 0), now);
        assert!(good.rendered);

        u.coordinator().transport().broken.store(true, Ordering::SeqCst);
        let failed = u.update(&Settings::default(), wall(9, 0), now);
        assert!(!failed.rendered);
        assert_eq!(failed.bitmap, good.bitmap);
        // Tooltip and text match the icon still on screen.
        assert_eq!(failed.text, "8");
        assert_eq!(failed.tooltip, good.tooltip);
    }

    #[test]
    fn failure_backs_off_then_recovers() {
        let mut u = updater(DisplayMode::Minute);
        let start = Instant::now();
        u.coordinator().transport().broken.store(true, Ordering::SeqCst);
        assert!(u.tick(&Settings::default(), wall(7, 30), start).is_some());
        // Retry is held back for the backoff delay.
        assert!(u.tick(&Settings::default(), wall(7, 30), start).is_none());

        u.coordinator().transport().broken.store(false, Ordering::SeqCst);
        let later = start + Duration::from_secs(2);
        let (_, outcome) = u.tick(&Settings::default(), wall(7, 30), later).unwrap();
        assert!(outcome.rendered);
        assert_eq!(u.schedule().consecutive_failures(), 0);
    }
}
