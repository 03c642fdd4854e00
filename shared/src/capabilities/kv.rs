use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::DEFAULT_STORAGE_PREFIX;

pub const MAX_KEY_LENGTH: usize = 512;
/// Roughly the per-origin quota browsers give local storage.
pub const MAX_VALUE_SIZE: usize = 5 * 1024 * 1024;
pub const MAX_PREFIX_LENGTH: usize = 64;

/// The independently persisted pieces of application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKey {
    Accessibility,
    Theme,
    Camera,
    Journal,
}

impl StorageKey {
    pub const ALL: [Self; 4] = [Self::Accessibility, Self::Theme, Self::Camera, Self::Journal];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accessibility => "accessibility",
            Self::Theme => "theme",
            Self::Camera => "camera",
            Self::Journal => "journal",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Prefix prepended to every raw key, so several apps can share one backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyNamespace(String);

impl Default for KeyNamespace {
    fn default() -> Self {
        Self(DEFAULT_STORAGE_PREFIX.to_string())
    }
}

impl KeyNamespace {
    /// An empty prefix is allowed and yields bare slice names.
    pub fn new(prefix: impl Into<String>) -> Result<Self, KvError> {
        let prefix = prefix.into();
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(KvError::InvalidKey {
                key: prefix,
                reason: format!("namespace exceeds maximum length of {MAX_PREFIX_LENGTH} bytes"),
            });
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(KvError::InvalidKey {
                key: prefix,
                reason: "namespace contains invalid characters".to_string(),
            });
        }
        Ok(Self(prefix))
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn key(&self, slice: StorageKey) -> KvKey {
        KvKey(format!("{}{}", self.0, slice.name()))
    }
}

/// A fully namespaced key as written to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KvKey(String);

impl KvKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rejects keys a backend should never be asked to store.
pub fn validate_key(key: &str) -> Result<(), KvError> {
    if key.trim().is_empty() {
        return Err(KvError::InvalidKey {
            key: key.to_string(),
            reason: "key cannot be empty".to_string(),
        });
    }

    if key.len() > MAX_KEY_LENGTH {
        return Err(KvError::InvalidKey {
            key: key.chars().take(50).collect::<String>() + "...",
            reason: format!("key exceeds maximum length of {MAX_KEY_LENGTH} bytes"),
        });
    }

    if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
        return Err(KvError::InvalidKey {
            key: key.to_string(),
            reason: "key cannot contain path traversal sequences".to_string(),
        });
    }

    if key.chars().any(char::is_control) {
        return Err(KvError::InvalidKey {
            key: key.escape_default().to_string(),
            reason: "key contains control characters".to_string(),
        });
    }

    Ok(())
}

/// Request the core makes of the shell's key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum KvOperation {
    Get { key: String },
    Set { key: String, value: String },
    Delete { key: String },
}

impl KvOperation {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Get { key } | Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }

    /// Checks the key and, for writes, the value size.
    pub fn validate(&self) -> Result<(), KvError> {
        validate_key(self.key())?;
        if let Self::Set { value, .. } = self {
            if value.len() > MAX_VALUE_SIZE {
                return Err(KvError::ValueTooLarge {
                    size: value.len(),
                    max: MAX_VALUE_SIZE,
                });
            }
        }
        Ok(())
    }
}

impl Operation for KvOperation {
    type Output = KvResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KvOutput {
    Value { value: Option<String> },
    Written,
    Deleted { existed: bool },
}

pub type KvResult = Result<KvOutput, KvError>;

/// Key-value storage as a capability: the shell performs each operation and
/// the outcome comes back as an event.
pub struct KeyValue<Ev> {
    context: CapabilityContext<KvOperation, Ev>,
}

impl<Ev> Capability<Ev> for KeyValue<Ev> {
    type Operation = KvOperation;
    type MappedSelf<MappedEv> = KeyValue<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        KeyValue::new(self.context.map_event(f))
    }
}

impl<Ev> KeyValue<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<KvOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn get<F>(&self, key: &KvKey, callback: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        self.request(
            KvOperation::Get {
                key: key.to_string(),
            },
            callback,
        );
    }

    pub fn set<F>(&self, key: &KvKey, value: String, callback: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        self.request(
            KvOperation::Set {
                key: key.to_string(),
                value,
            },
            callback,
        );
    }

    pub fn delete<F>(&self, key: &KvKey, callback: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        self.request(
            KvOperation::Delete {
                key: key.to_string(),
            },
            callback,
        );
    }

    fn request<F>(&self, operation: KvOperation, callback: F)
    where
        F: FnOnce(KvResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(callback(result));
        });
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum KvError {
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("storage error: {message} (code: {code:?}, retryable: {retryable})")]
    Storage {
        code: StorageErrorCode,
        message: String,
        retryable: bool,
    },

    #[error("serialization error: {message}")]
    Serialization { message: String, key: Option<String> },

    #[error("no durable storage backend is available")]
    Unavailable,
}

impl KvError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub fn storage(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageErrorCode {
    Unknown,
    Corrupted,
    QuotaExceeded,
    PermissionDenied,
    Busy,
    Locked,
    IoError,
}

impl StorageErrorCode {
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Busy | Self::Locked)
    }
}

/// Durable key-value storage a shell resolves [`KvOperation`]s against.
///
/// Keys are raw (already namespaced) and values are text; encoding is the
/// core's concern.
pub trait KvBackend: Send {
    /// `false` when there is no durable storage at all (server rendering,
    /// non-interactive contexts).
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Returns whether the key existed.
    fn delete(&self, key: &str) -> Result<bool, KvError>;

    /// Performs one requested operation, producing the output the core expects.
    fn execute(&self, operation: &KvOperation) -> KvResult {
        if !self.is_available() {
            return Err(KvError::Unavailable);
        }
        operation.validate()?;

        match operation {
            KvOperation::Get { key } => self.get(key).map(|value| KvOutput::Value { value }),
            KvOperation::Set { key, value } => self.set(key, value).map(|()| KvOutput::Written),
            KvOperation::Delete { key } => {
                self.delete(key).map(|existed| KvOutput::Deleted { existed })
            }
        }
    }
}

/// In-process backend. Clones share the same map, so a test can keep a handle
/// to inspect what the core wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that refuses writes once the stored text would exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota_bytes: Some(bytes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, KvError> {
        self.entries
            .lock()
            .map_err(|_| KvError::storage(StorageErrorCode::Locked, "memory backend poisoned"))
    }

    /// Reads by raw key, bypassing namespacing.
    #[must_use]
    pub fn get_raw(&self, raw_key: &str) -> Option<String> {
        self.lock().ok()?.get(raw_key).cloned()
    }

    /// Writes by raw key, bypassing namespacing and quota.
    pub fn insert_raw(&self, raw_key: impl Into<String>, value: impl Into<String>) {
        if let Ok(mut entries) = self.lock() {
            entries.insert(raw_key.into(), value.into());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut entries = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let used = others + key.len() + value.len();
            if used > quota {
                return Err(KvError::storage(
                    StorageErrorCode::QuotaExceeded,
                    format!("{used} bytes exceeds quota of {quota} bytes"),
                ));
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.lock()?.remove(key).is_some())
    }
}

/// Stand-in used where no durable storage exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl KvBackend for UnavailableBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), KvError> {
        Err(KvError::Unavailable)
    }

    fn delete(&self, _key: &str) -> Result<bool, KvError> {
        Err(KvError::Unavailable)
    }
}
