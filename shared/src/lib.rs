//! Shared core of the Roots & Routes companion app.
//!
//! The shell owns rendering, the camera and plant detection. This crate owns
//! the application state: which screen is showing, the learner's
//! accessibility and theme preferences, the camera-permission flag and the
//! field journal. [`App`] is a Crux app: shells send it [`Event`]s, carry out
//! the [`Effect`]s it requests (storage, presentation, render) and draw the
//! [`ViewModel`] it exposes.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod app;
pub mod capabilities;
pub mod config;
mod event;
pub mod model;
pub mod navigation;
pub mod store;
pub mod validation;
mod view;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

pub use app::{App, Model, MAX_DEFERRED_EVENTS};
pub use capabilities::{
    Capabilities, Effect, KvError, KvOperation, KvOutput, PresentationOperation,
    PresentationState,
};
pub use config::{AppConfig, ConfigError};
pub use event::Event;
pub use model::{
    AccessibilitySettings, AccessibilityUpdate, ApplicationState, EntryId, JournalEntry,
    NewJournalEntry, PlantDetails, Route, Screen, TextSize, ThemeMode,
};
pub use navigation::{NavigationError, TransitionOutcome, NAV_ITEMS};
pub use store::PersistentStore;
pub use validation::ValidationError;
pub use view::{NavItemView, ScreenLink, ViewModel};

pub const DEFAULT_STORAGE_PREFIX: &str = "rr_";
pub const MAX_TEXT_LENGTH: usize = 10_000;
pub const ANNOUNCEMENT_PREFIX: &str = "Navigated to";

/// Current UTC time as RFC 3339 with millisecond precision and a `Z` suffix.
#[must_use]
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] KvError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Stable identifier for shells to switch on.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Navigation(NavigationError::SameScreen { .. }) => "NAVIGATION_SAME_SCREEN",
            Self::Navigation(NavigationError::NotPermitted { .. }) => "NAVIGATION_NOT_PERMITTED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(KvError::Unavailable) => "STORAGE_UNAVAILABLE",
            Self::Storage(KvError::ValueTooLarge { .. }) => "QUOTA_EXCEEDED",
            Self::Storage(KvError::Serialization { .. }) => "SERIALIZATION_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_INVALID",
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}
