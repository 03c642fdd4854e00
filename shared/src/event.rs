use serde::{Deserialize, Serialize};

use crate::capabilities::{KvResult, StorageKey};
use crate::model::{AccessibilityUpdate, NewJournalEntry, PlantDetails, Screen, ThemeMode};

/// Messages a shell sends to the core. Each maps onto one controller operation.
///
/// The skipped variants are storage callbacks the core sends itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    Initialize,

    Navigate { target: Screen },

    UpdateAccessibility(AccessibilityUpdate),
    SetTheme { mode: ThemeMode },
    SetCameraGranted { granted: bool },

    SetCurrentPlant(Option<PlantDetails>),
    /// The detector recognised a plant: record it and show the result screen.
    PlantDetected(PlantDetails),

    AddJournalEntry(NewJournalEntry),
    ResetAll,

    ConnectivityChanged { online: bool },
    RetryConnection { online: bool },

    #[serde(skip)]
    SliceLoaded {
        generation: u64,
        slice: StorageKey,
        result: KvResult,
    },
    #[serde(skip)]
    SlicePersisted { slice: StorageKey, result: KvResult },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Navigate { .. } => "navigate",
            Self::UpdateAccessibility(_) => "update_accessibility",
            Self::SetTheme { .. } => "set_theme",
            Self::SetCameraGranted { .. } => "set_camera_granted",
            Self::SetCurrentPlant(_) => "set_current_plant",
            Self::PlantDetected(_) => "plant_detected",
            Self::AddJournalEntry(_) => "add_journal_entry",
            Self::ResetAll => "reset_all",
            Self::ConnectivityChanged { .. } => "connectivity_changed",
            Self::RetryConnection { .. } => "retry_connection",
            Self::SliceLoaded { .. } => "slice_loaded",
            Self::SlicePersisted { .. } => "slice_persisted",
        }
    }

    /// Whether the event has to wait until stored state has been loaded.
    /// Anything that reads or writes the persisted slices does.
    #[must_use]
    pub const fn needs_hydration(&self) -> bool {
        !matches!(
            self,
            Self::Initialize | Self::SliceLoaded { .. } | Self::SlicePersisted { .. }
        )
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::Navigate { .. }
                | Self::UpdateAccessibility(_)
                | Self::SetTheme { .. }
                | Self::SetCameraGranted { .. }
                | Self::AddJournalEntry(_)
                | Self::ResetAll
                | Self::RetryConnection { .. }
        )
    }
}
