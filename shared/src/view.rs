use serde::Serialize;

use crate::app::Model;
use crate::capabilities::PresentationState;
use crate::model::{
    AccessibilitySettings, ApplicationState, JournalEntry, PlantDetails, Screen, ThemeMode,
};
use crate::navigation::NAV_ITEMS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenLink {
    pub screen: Screen,
    pub heading: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavItemView {
    pub label: &'static str,
    pub screen: Screen,
    pub active: bool,
    /// Whether tapping the item would be accepted from the current screen.
    pub reachable: bool,
}

/// Snapshot the shell renders from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    /// False until stored preferences and the journal have been loaded.
    pub ready: bool,
    pub screen: Screen,
    pub heading: &'static str,
    pub allowed_targets: Vec<ScreenLink>,
    pub nav_items: Vec<NavItemView>,

    pub accessibility: AccessibilitySettings,
    pub text_size_label: &'static str,
    pub theme: ThemeMode,
    pub camera_granted: bool,

    pub journal: Vec<JournalEntry>,
    pub journal_count: usize,
    pub current_plant: Option<PlantDetails>,

    pub offline: bool,
    pub narration_region_visible: bool,
    pub announcement: String,

    pub presentation: PresentationState,
}

impl ViewModel {
    #[must_use]
    pub fn from_model(model: &Model) -> Self {
        Self::from_state(model.state(), model.presentation(), model.is_hydrated())
    }

    #[must_use]
    pub fn from_state(
        state: &ApplicationState,
        presentation: &PresentationState,
        ready: bool,
    ) -> Self {
        let screen = state.current_screen();
        let accessibility = *state.accessibility();

        let allowed_targets = screen
            .allowed_targets()
            .iter()
            .map(|&target| ScreenLink {
                screen: target,
                heading: target.heading(),
            })
            .collect();

        let nav_items = NAV_ITEMS
            .iter()
            .map(|item| NavItemView {
                label: item.label,
                screen: item.screen,
                active: item.screen == screen,
                reachable: screen.can_transition_to(item.screen),
            })
            .collect();

        Self {
            ready,
            screen,
            heading: screen.heading(),
            allowed_targets,
            nav_items,
            accessibility,
            text_size_label: accessibility.text_size.label(),
            theme: state.theme(),
            camera_granted: state.camera_granted(),
            journal: state.journal().to_vec(),
            journal_count: state.journal().len(),
            current_plant: state.current_plant().cloned(),
            offline: !state.is_online(),
            narration_region_visible: accessibility.narration,
            announcement: state.announcement().to_string(),
            presentation: *presentation,
        }
    }

    #[must_use]
    pub fn can_navigate_to(&self, target: Screen) -> bool {
        self.allowed_targets.iter().any(|link| link.screen == target)
    }
}
