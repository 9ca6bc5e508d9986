use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::config::hooks::ChangeHooks;
use crate::config::key::ConfigKey;
use crate::config::schema::{default_of, type_of, TypeTag};
use crate::config::snapshot::{ConfigSnapshot, LaunchMode};
use crate::config::value::{coerce, ConfigValue, LogLevel, PathElement, RawConfig, RawValue};
use crate::error::{Error, Result};

static STORE_CONSTRUCTED: AtomicBool = AtomicBool::new(false);

/// Holder of the current configuration snapshot.
///
/// Readers load the published `Arc<ConfigSnapshot>` without locking; writers
/// are serialised and publish a fresh snapshot with a single pointer swap.
pub struct ConfigStore {
    current: ArcSwap<ConfigSnapshot>,
    write_lock: Mutex<()>,
    hooks: ChangeHooks,
}

impl ConfigStore {
    /// Builds the process's only store. A second call fails with
    /// `AlreadyInitialized`, even if the first store has been dropped.
    pub fn init(initial: RawConfig, mode: LaunchMode, hooks: ChangeHooks) -> Result<Self> {
        if STORE_CONSTRUCTED
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        Self::build(initial, mode, hooks).inspect_err(|_| {
            STORE_CONSTRUCTED.store(false, Ordering::SeqCst);
        })
    }

    pub(crate) fn build(initial: RawConfig, mode: LaunchMode, hooks: ChangeHooks) -> Result<Self> {
        let values = initial
            .into_iter()
            .map(|(key, raw)| Ok((key, coerce_for(key, raw)?)))
            .collect::<Result<Vec<_>>>()?;

        let empty = ConfigSnapshot::empty(mode);
        let first = empty.with_values(values);
        hooks.dispatch(&empty, &first);
        tracing::debug!(keys = first.len(), mode = %mode, "configuration initialized");

        Ok(Self {
            current: ArcSwap::from_pointee(first),
            write_lock: Mutex::new(()),
            hooks,
        })
    }

    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn mode(&self) -> LaunchMode {
        self.current.load().mode()
    }

    pub fn hooks(&self) -> &ChangeHooks {
        &self.hooks
    }

    /// Current value, or the compiled-in default when the key is unset.
    pub fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        self.current
            .load()
            .get(key)
            .cloned()
            .or_else(|| default_of(key))
    }

    pub fn get_bool(&self, key: ConfigKey) -> bool {
        self.get(key)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    pub fn get_int(&self, key: ConfigKey) -> Option<i64> {
        self.get(key).and_then(|value| value.as_int())
    }

    pub fn get_str(&self, key: ConfigKey) -> Option<String> {
        self.get(key).map(|value| value.to_string())
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.get(ConfigKey::LogLevel)
            .and_then(|value| value.as_log_level())
            .unwrap_or(LogLevel::Warn)
    }

    pub fn get_path(&self, key: ConfigKey) -> Vec<PathElement> {
        match self.get(key) {
            Some(ConfigValue::Path(elements)) => elements,
            _ => Vec::new(),
        }
    }

    pub fn set(&self, key: ConfigKey, value: impl Into<RawValue>) -> Result<()> {
        self.set_many([(key.as_str(), value)])
    }

    /// Applies every change or none: unknown keys, coercion failures and
    /// values of the wrong type are reported before any hook runs or
    /// anything is published.
    pub fn set_many<I, K, V>(&self, changes: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RawValue>,
    {
        let parsed = changes
            .into_iter()
            .map(|(key, value)| Ok((key.as_ref().parse::<ConfigKey>()?, value.into())))
            .collect::<Result<Vec<(ConfigKey, RawValue)>>>()?;

        let coerced = parsed
            .into_iter()
            .map(|(key, raw)| Ok((key, coerce_for(key, raw)?)))
            .collect::<Result<Vec<(ConfigKey, ConfigValue)>>>()?;

        let _guard = self.lock_writer();
        let old = self.current.load_full();
        let candidate = old.with_values(coerced);
        self.commit(&old, candidate);
        Ok(())
    }

    /// Extends a path-typed key with the elements of `raw`.
    pub fn append(&self, key: &str, raw: impl Into<RawValue>) -> Result<()> {
        let key = key.parse::<ConfigKey>()?;
        let declared = type_of(key);
        if declared != TypeTag::Path {
            return Err(Error::TypeMismatch {
                key: key.to_string(),
                expected: TypeTag::Path,
                actual: declared,
            });
        }

        let addition = match coerce_for(key, raw.into())? {
            ConfigValue::Path(elements) => elements,
            other => {
                return Err(Error::TypeMismatch {
                    key: key.to_string(),
                    expected: TypeTag::Path,
                    actual: other.type_tag(),
                })
            }
        };

        let _guard = self.lock_writer();
        let old = self.current.load_full();
        let mut elements = old
            .get(key)
            .and_then(ConfigValue::as_path)
            .map(<[PathElement]>::to_vec)
            .unwrap_or_default();
        elements.extend(addition);
        let candidate = old.with_values([(key, ConfigValue::Path(elements))]);
        self.commit(&old, candidate);
        Ok(())
    }

    /// Drops `key` from the snapshot so readers fall back to its default.
    pub fn unset(&self, key: &str) -> Result<()> {
        let key = key.parse::<ConfigKey>()?;
        let _guard = self.lock_writer();
        let old = self.current.load_full();
        if !old.contains(key) {
            return Ok(());
        }
        let candidate = old.without(key);
        self.commit(&old, candidate);
        Ok(())
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Caller holds the write lock.
    fn commit(&self, old: &ConfigSnapshot, candidate: ConfigSnapshot) {
        let changed = old.changed_keys(&candidate);
        let fired = self.hooks.dispatch(old, &candidate);
        self.current.store(Arc::new(candidate));
        tracing::debug!(?changed, ?fired, "configuration updated");
    }
}

// Coerces `raw` and checks the result against the key's declared type and
// against what its change hook can act on.
fn coerce_for(key: ConfigKey, raw: RawValue) -> Result<ConfigValue> {
    let declared = type_of(key);
    let value = coerce(declared, raw)?;
    if !declared.accepts(value.type_tag()) {
        return Err(Error::TypeMismatch {
            key: key.to_string(),
            expected: declared,
            actual: value.type_tag(),
        });
    }
    ChangeHooks::check_value(key, &value)?;
    Ok(value)
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("current", &self.current.load())
            .field("hooks", &self.hooks)
            .finish()
    }
}
