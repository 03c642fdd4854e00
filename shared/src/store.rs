//! Slice-level persistence on top of the [`KeyValue`] capability.
//!
//! Reads come back as raw text and are guarded by a [`Validator`]: a slice
//! that fails to decode or to validate is reported as absent and logged, so
//! the controller falls back to its defaults. Writes are fire-and-forget; the
//! in-memory state stays authoritative and failures only show up in the logs.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::capabilities::{KeyNamespace, KeyValue, KvError, KvKey, StorageKey, MAX_VALUE_SIZE};
use crate::event::Event;
use crate::model::{AccessibilitySettings, ApplicationState, JournalEntry, ThemeMode};
use crate::validation::{
    is_accessibility_settings, is_camera_flag, is_journal_entry_list, is_theme_mode, Validator,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistentStore {
    namespace: KeyNamespace,
}

impl PersistentStore {
    #[must_use]
    pub const fn new(namespace: KeyNamespace) -> Self {
        Self { namespace }
    }

    #[must_use]
    pub fn key(&self, slice: StorageKey) -> KvKey {
        self.namespace.key(slice)
    }

    /// Asks the shell for `slice`; the answer arrives as [`Event::SliceLoaded`].
    pub fn load(&self, kv: &KeyValue<Event>, slice: StorageKey, generation: u64) {
        kv.get(&self.key(slice), move |result| Event::SliceLoaded {
            generation,
            slice,
            result,
        });
    }

    pub fn save<T>(&self, kv: &KeyValue<Event>, slice: StorageKey, value: &T)
    where
        T: Serialize + ?Sized,
    {
        match encode(slice, value) {
            Ok(raw) => self.save_raw(kv, slice, raw),
            Err(err) => warn!(slice = %slice, error = %err, "refusing to persist slice"),
        }
    }

    pub fn save_raw(&self, kv: &KeyValue<Event>, slice: StorageKey, raw: String) {
        if raw.len() > MAX_VALUE_SIZE {
            let err = KvError::ValueTooLarge {
                size: raw.len(),
                max: MAX_VALUE_SIZE,
            };
            warn!(slice = %slice, error = %err, "refusing to persist slice");
            return;
        }

        kv.set(&self.key(slice), raw, move |result| Event::SlicePersisted {
            slice,
            result,
        });
    }

    /// Removing an absent slice is not an error.
    pub fn remove(&self, kv: &KeyValue<Event>, slice: StorageKey) {
        kv.delete(&self.key(slice), move |result| Event::SlicePersisted {
            slice,
            result,
        });
    }

    /// Issues one removal per slice; each succeeds or fails on its own.
    pub fn remove_all(&self, kv: &KeyValue<Event>) {
        for slice in StorageKey::ALL {
            self.remove(kv, slice);
        }
    }

    pub fn save_accessibility(&self, kv: &KeyValue<Event>, settings: &AccessibilitySettings) {
        self.save(kv, StorageKey::Accessibility, settings);
    }

    pub fn save_theme(&self, kv: &KeyValue<Event>, mode: ThemeMode) {
        self.save(kv, StorageKey::Theme, &mode);
    }

    pub fn save_camera_granted(&self, kv: &KeyValue<Event>, granted: bool) {
        self.save_raw(kv, StorageKey::Camera, encode_camera_granted(granted).to_string());
    }

    pub fn save_journal(&self, kv: &KeyValue<Event>, journal: &[JournalEntry]) {
        self.save(kv, StorageKey::Journal, journal);
    }
}

pub fn encode<T: Serialize + ?Sized>(slice: StorageKey, value: &T) -> Result<String, KvError> {
    serde_json::to_string(value).map_err(|err| KvError::Serialization {
        message: err.to_string(),
        key: Some(slice.name().to_string()),
    })
}

/// The camera flag is stored as a bare literal, not JSON.
#[must_use]
pub const fn encode_camera_granted(granted: bool) -> &'static str {
    if granted {
        "true"
    } else {
        "false"
    }
}

/// Parses `raw` as JSON and returns it only if `validator` accepts the whole value.
#[must_use]
pub fn decode(slice: StorageKey, raw: &str, validator: Validator) -> Option<Value> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(slice = %slice, error = %err, "stored slice is not valid JSON, ignoring");
            return None;
        }
    };

    if !validator(&value) {
        warn!(slice = %slice, "stored slice failed validation, ignoring");
        return None;
    }

    Some(value)
}

#[must_use]
pub fn decode_as<T: DeserializeOwned>(
    slice: StorageKey,
    raw: &str,
    validator: Validator,
) -> Option<T> {
    let value = decode(slice, raw, validator)?;
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(err) => {
            warn!(slice = %slice, error = %err, "validated slice did not convert, ignoring");
            None
        }
    }
}

#[must_use]
pub fn decode_accessibility(raw: &str) -> Option<AccessibilitySettings> {
    decode_as(StorageKey::Accessibility, raw, is_accessibility_settings)
}

/// Accepts the JSON form (`"dark"`) and the bare literal (`dark`) older
/// builds wrote.
#[must_use]
pub fn decode_theme(raw: &str) -> Option<ThemeMode> {
    let value = serde_json::from_str::<Value>(raw)
        .ok()
        .filter(is_theme_mode)
        .or_else(|| Some(Value::String(raw.trim().to_string())).filter(is_theme_mode));

    match value.map(serde_json::from_value::<ThemeMode>) {
        Some(Ok(mode)) => Some(mode),
        _ => {
            warn!(slice = %StorageKey::Theme, "stored theme is not light or dark, ignoring");
            None
        }
    }
}

#[must_use]
pub fn decode_camera_granted(raw: &str) -> Option<bool> {
    if is_camera_flag(raw) {
        Some(raw == "true")
    } else {
        warn!(
            slice = %StorageKey::Camera,
            "stored camera flag is not a boolean literal, ignoring"
        );
        None
    }
}

#[must_use]
pub fn decode_journal(raw: &str) -> Option<Vec<JournalEntry>> {
    decode_as(StorageKey::Journal, raw, is_journal_entry_list)
}

/// Copies a stored slice into `state` if it decodes and validates. Returns
/// whether anything was applied.
pub fn hydrate_slice(state: &mut ApplicationState, slice: StorageKey, raw: &str) -> bool {
    let applied = match slice {
        StorageKey::Accessibility => {
            if let Some(settings) = decode_accessibility(raw) {
                state.accessibility = settings;
                true
            } else {
                false
            }
        }
        StorageKey::Theme => {
            if let Some(mode) = decode_theme(raw) {
                state.theme = mode;
                true
            } else {
                false
            }
        }
        StorageKey::Camera => {
            if let Some(granted) = decode_camera_granted(raw) {
                state.camera_granted = granted;
                true
            } else {
                false
            }
        }
        StorageKey::Journal => {
            if let Some(journal) = decode_journal(raw) {
                state.journal = journal;
                true
            } else {
                false
            }
        }
    };
    debug!(slice = %slice, applied, "hydrated slice");
    applied
}
