use serde::Serialize;
use thiserror::Error;

use crate::model::Screen;

impl Screen {
    /// Screens reachable in one step from `self`. Total over [`Screen::ALL`].
    #[must_use]
    pub const fn allowed_targets(self) -> &'static [Screen] {
        use Screen::{
            Accessibility, Cultural, Educator, ErrorCamera, Home, JournalEntry, JournalList,
            NoPlant, Offline, Permissions, Poster, Privacy, ScanDetected, ScanDetecting,
            ScanIdle, Settings, Simulation, Stem, Welcome,
        };

        match self {
            Welcome => &[Permissions, Home],
            Permissions => &[Accessibility, Welcome, Home, ErrorCamera],
            Accessibility => &[Privacy, Home],
            Privacy => &[Home],
            Home => &[
                ScanIdle,
                ScanDetecting,
                ScanDetected,
                Cultural,
                Stem,
                Simulation,
                JournalList,
                JournalEntry,
                Settings,
                Educator,
                ErrorCamera,
                Offline,
                NoPlant,
                Poster,
                Welcome,
            ],
            ScanIdle => &[ScanDetecting, Home, ErrorCamera, NoPlant],
            ScanDetecting => &[ScanDetected, ScanIdle, Home],
            ScanDetected => &[Cultural, Stem, ScanIdle, Home],
            Cultural => &[Stem, Simulation, Home, JournalEntry, JournalList, ScanIdle],
            Stem => &[Cultural, Simulation, Home, JournalEntry, JournalList, ScanIdle],
            Simulation => &[Home, JournalEntry, JournalList, Stem, Cultural],
            JournalList => &[JournalEntry, Home, ScanIdle, Settings],
            JournalEntry => &[JournalList, Home],
            Settings => &[Home, Welcome, ScanIdle, JournalList],
            Educator => &[Home],
            ErrorCamera => &[Settings, Home, Permissions],
            Offline => &[Home, JournalList, JournalEntry],
            NoPlant => &[ScanIdle, Home, Poster],
            Poster => &[Home, ScanIdle],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self.allowed_targets().contains(&to)
    }

    pub fn validate_transition(self, to: Self) -> Result<(), NavigationError> {
        if self == to {
            return Err(NavigationError::SameScreen { screen: self });
        }
        if !self.can_transition_to(to) {
            return Err(NavigationError::NotPermitted { from: self, to });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("already on {screen}")]
    SameScreen { screen: Screen },
    #[error("navigation from {from} to {to} is not permitted")]
    NotPermitted { from: Screen, to: Screen },
}

/// Result of a transition request that did not violate the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Committed { from: Screen, to: Screen },
    /// The target was already the current screen; nothing changed.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub screen: Screen,
}

/// Bottom navigation bar entries.
pub const NAV_ITEMS: [NavItem; 4] = [
    NavItem { label: "Home", screen: Screen::Home },
    NavItem { label: "Scan", screen: Screen::ScanIdle },
    NavItem { label: "Journal", screen: Screen::JournalList },
    NavItem { label: "Settings", screen: Screen::Settings },
];
