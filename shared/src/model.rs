use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use crate::validation::{sanitize_string, ValidationError};

/// Every screen the shell can render. The set is closed and known at build time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    #[default]
    Welcome,
    Permissions,
    Accessibility,
    Privacy,
    Home,
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
}

impl Screen {
    pub const ALL: [Self; 19] = [
        Self::Welcome,
        Self::Permissions,
        Self::Accessibility,
        Self::Privacy,
        Self::Home,
        Self::ScanIdle,
        Self::ScanDetecting,
        Self::ScanDetected,
        Self::Cultural,
        Self::Stem,
        Self::Simulation,
        Self::JournalList,
        Self::JournalEntry,
        Self::Settings,
        Self::Educator,
        Self::ErrorCamera,
        Self::Offline,
        Self::NoPlant,
        Self::Poster,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Permissions => "permissions",
            Self::Accessibility => "accessibility",
            Self::Privacy => "privacy",
            Self::Home => "home",
            Self::ScanIdle => "scan-idle",
            Self::ScanDetecting => "scan-detecting",
            Self::ScanDetected => "scan-detected",
            Self::Cultural => "cultural",
            Self::Stem => "stem",
            Self::Simulation => "simulation",
            Self::JournalList => "journal-list",
            Self::JournalEntry => "journal-entry",
            Self::Settings => "settings",
            Self::Educator => "educator",
            Self::ErrorCamera => "error-camera",
            Self::Offline => "offline",
            Self::NoPlant => "no-plant",
            Self::Poster => "poster",
        }
    }

    /// Heading shown at the top of the screen; also the focus target and the
    /// text read out by narration.
    #[must_use]
    pub const fn heading(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Permissions => "Camera Permissions",
            Self::Accessibility => "Accessibility Setup",
            Self::Privacy => "Privacy Overview",
            Self::Home => "Home",
            Self::ScanIdle => "Ready to Scan",
            Self::ScanDetecting => "Scanning Plant",
            Self::ScanDetected => "Plant Identified",
            Self::Cultural => "Cultural Route",
            Self::Stem => "STEM Route",
            Self::Simulation => "Climate Simulation",
            Self::JournalList => "Journal Entries",
            Self::JournalEntry => "Journal Entry",
            Self::Settings => "Settings",
            Self::Educator => "Educator Dashboard",
            Self::ErrorCamera => "Camera Access Required",
            Self::Offline => "Offline Mode",
            Self::NoPlant => "No Plant Detected",
            Self::Poster => "Roots & Routes Poster",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|screen| screen.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownScreen(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    #[default]
    Normal,
    Large,
    Xl,
}

impl TextSize {
    pub const ALL: [Self; 3] = [Self::Normal, Self::Large, Self::Xl];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Large => "large",
            Self::Xl => "xl",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Large => "Large",
            Self::Xl => "Extra Large",
        }
    }

    /// Root font-size multiplier.
    #[must_use]
    pub const fn scale(self) -> &'static str {
        match self {
            Self::Normal => "1",
            Self::Large => "1.15",
            Self::Xl => "1.3",
        }
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextSize {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidTextSize(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub text_size: TextSize,
    pub high_contrast: bool,
    pub reduce_motion: bool,
    pub narration: bool,
}

impl AccessibilitySettings {
    /// Applies every field present in `update`, returning which fields actually changed.
    pub fn merge(&mut self, update: &AccessibilityUpdate) -> AccessibilityChanges {
        let before = *self;

        if let Some(text_size) = update.text_size {
            self.text_size = text_size;
        }
        if let Some(high_contrast) = update.high_contrast {
            self.high_contrast = high_contrast;
        }
        if let Some(reduce_motion) = update.reduce_motion {
            self.reduce_motion = reduce_motion;
        }
        if let Some(narration) = update.narration {
            self.narration = narration;
        }

        AccessibilityChanges {
            text_size: before.text_size != self.text_size,
            high_contrast: before.high_contrast != self.high_contrast,
            reduce_motion: before.reduce_motion != self.reduce_motion,
            narration: before.narration != self.narration,
        }
    }
}

/// Partial accessibility settings; `None` keeps the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessibilityUpdate {
    pub text_size: Option<TextSize>,
    pub high_contrast: Option<bool>,
    pub reduce_motion: Option<bool>,
    pub narration: Option<bool>,
}

impl AccessibilityUpdate {
    #[must_use]
    pub fn text_size(mut self, text_size: TextSize) -> Self {
        self.text_size = Some(text_size);
        self
    }

    #[must_use]
    pub fn high_contrast(mut self, enabled: bool) -> Self {
        self.high_contrast = Some(enabled);
        self
    }

    #[must_use]
    pub fn reduce_motion(mut self, enabled: bool) -> Self {
        self.reduce_motion = Some(enabled);
        self
    }

    #[must_use]
    pub fn narration(mut self, enabled: bool) -> Self {
        self.narration = Some(enabled);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessibilityChanges {
    pub text_size: bool,
    pub high_contrast: bool,
    pub reduce_motion: bool,
    pub narration: bool,
}

impl AccessibilityChanges {
    #[must_use]
    pub const fn any(self) -> bool {
        self.text_size || self.high_contrast || self.reduce_motion || self.narration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Learning route a journal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[default]
    Cultural,
    Stem,
}

impl Route {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cultural => "cultural",
            Self::Stem => "stem",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: EntryId,
    pub plant_name: String,
    /// ISO-8601 creation timestamp, fixed at creation.
    pub date: String,
    pub route: Route,
    pub notes: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_standards"
    )]
    pub standards: Option<Vec<String>>,
}

impl JournalEntry {
    /// Parsed creation time, if the stored date is a valid RFC 3339 timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<chrono::DateTime<chrono::FixedOffset>> {
        chrono::DateTime::parse_from_rfc3339(&self.date).ok()
    }
}

// `standards` is not part of the stored-entry contract, so a malformed value is read as absent
// instead of failing the whole journal.
fn lenient_standards<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// A journal entry as submitted by a screen: everything except the id and date,
/// which the controller assigns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "NewJournalEntryFields")]
pub struct NewJournalEntry {
    plant_name: String,
    route: Route,
    notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    standards: Option<Vec<String>>,
}

impl NewJournalEntry {
    /// Trims both fields. Length is capped later, when the controller files
    /// the entry under its configured limit.
    pub fn new(
        plant_name: impl AsRef<str>,
        route: Route,
        notes: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        let plant_name = plant_name.as_ref().trim();
        if plant_name.is_empty() {
            return Err(ValidationError::EmptyField { field: "plantName" });
        }

        Ok(Self {
            plant_name: plant_name.to_string(),
            route,
            notes: notes.as_ref().trim().to_string(),
            standards: None,
        })
    }

    /// Prefills the plant name from a scanned plant, preferring its common name.
    pub fn for_plant(
        plant: &PlantDetails,
        route: Route,
        notes: impl AsRef<str>,
    ) -> Result<Self, ValidationError> {
        Self::new(plant.display_name(), route, notes)
    }

    #[must_use]
    pub fn with_standards<I, S>(mut self, standards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let standards: Vec<String> = standards.into_iter().map(Into::into).collect();
        self.standards = if standards.is_empty() { None } else { Some(standards) };
        self
    }

    #[must_use]
    pub fn plant_name(&self) -> &str {
        &self.plant_name
    }

    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn standards(&self) -> Option<&[String]> {
        self.standards.as_deref()
    }

    pub(crate) fn into_entry(self, id: EntryId, date: String, max_len: usize) -> JournalEntry {
        JournalEntry {
            id,
            plant_name: sanitize_string(&self.plant_name, max_len),
            date,
            route: self.route,
            notes: sanitize_string(&self.notes, max_len),
            standards: self.standards,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewJournalEntryFields {
    plant_name: String,
    route: Route,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    standards: Option<Vec<String>>,
}

impl TryFrom<NewJournalEntryFields> for NewJournalEntry {
    type Error = ValidationError;

    fn try_from(fields: NewJournalEntryFields) -> Result<Self, Self::Error> {
        let entry = Self::new(fields.plant_name, fields.route, fields.notes)?;
        Ok(entry.with_standards(fields.standards.unwrap_or_default()))
    }
}

/// Output of the plant-detection collaborator. Opaque to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDetails {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_story: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stem_info: Option<String>,
}

impl PlantDetails {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            common_name: None,
            family: None,
            origin: None,
            thumbnail: None,
            cultural_story: None,
            stem_info: None,
        }
    }

    #[must_use]
    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.common_name.as_deref().unwrap_or(&self.name)
    }
}

/// The aggregate owned by [`crate::App`]. Only the controller writes to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub(crate) current_screen: Screen,
    pub(crate) accessibility: AccessibilitySettings,
    pub(crate) theme: ThemeMode,
    pub(crate) camera_granted: bool,
    pub(crate) journal: Vec<JournalEntry>,
    pub(crate) current_plant: Option<PlantDetails>,
    // Session-only, never persisted.
    pub(crate) online: bool,
    pub(crate) announcement: String,
}

impl Default for ApplicationState {
    fn default() -> Self {
        Self::new(Screen::Welcome)
    }
}

impl ApplicationState {
    #[must_use]
    pub fn new(initial_screen: Screen) -> Self {
        Self {
            current_screen: initial_screen,
            accessibility: AccessibilitySettings::default(),
            theme: ThemeMode::default(),
            camera_granted: false,
            journal: Vec::new(),
            current_plant: None,
            online: true,
            announcement: String::new(),
        }
    }

    #[must_use]
    pub const fn current_screen(&self) -> Screen {
        self.current_screen
    }

    #[must_use]
    pub const fn accessibility(&self) -> &AccessibilitySettings {
        &self.accessibility
    }

    #[must_use]
    pub const fn theme(&self) -> ThemeMode {
        self.theme
    }

    #[must_use]
    pub const fn camera_granted(&self) -> bool {
        self.camera_granted
    }

    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    #[must_use]
    pub const fn current_plant(&self) -> Option<&PlantDetails> {
        self.current_plant.as_ref()
    }

    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub fn announcement(&self) -> &str {
        &self.announcement
    }
}
