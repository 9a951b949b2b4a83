//! Unified error type for the clockglyph-lib crate.
//!
//! [`ClockglyphError`] wraps module-specific errors (`RenderError`, `SyncError`)
//! and domain-specific error kinds (`Config`, `Color`).
//! `From` impls allow `?` to propagate across module boundaries seamlessly.

use std::fmt;

use crate::render::RenderError;
use crate::sync::SyncError;

/// Unified error type for clockglyph-lib operations.
#[derive(Debug)]
pub enum ClockglyphError {
    /// Icon rendering failed, timed out, or was cancelled.
    Render(RenderError),
    /// Companion settings sync failed (connect, write, acknowledgement).
    Sync(SyncError),
    /// Standard I/O error (file read/write, settings persistence).
    Io(std::io::Error),
    /// Settings validation error.
    Config(String),
    /// Color validation error.
    Color(String),
}

impl fmt::Display for ClockglyphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockglyphError::Render(e) => write!(f, "{e}"),
            ClockglyphError::Sync(e) => write!(f, "{e}"),
            ClockglyphError::Io(e) => write!(f, "I/O error: {e}"),
            ClockglyphError::Config(e) => write!(f, "Config error: {e}"),
            ClockglyphError::Color(e) => write!(f, "Color error: {e}"),
        }
    }
}

impl std::error::Error for ClockglyphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClockglyphError::Render(e) => Some(e),
            ClockglyphError::Sync(e) => Some(e),
            ClockglyphError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderError> for ClockglyphError {
    fn from(e: RenderError) -> Self {
        ClockglyphError::Render(e)
    }
}

impl From<SyncError> for ClockglyphError {
    fn from(e: SyncError) -> Self {
        ClockglyphError::Sync(e)
    }
}

impl From<std::io::Error> for ClockglyphError {
    fn from(e: std::io::Error) -> Self {
        ClockglyphError::Io(e)
    }
}

/// Crate-level Result alias using [`ClockglyphError`].
pub type Result<T> = std::result::Result<T, ClockglyphError>;
