use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::key::ConfigKey;
use crate::config::value::ConfigValue;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    #[default]
    Start,
    Attach,
}

impl std::fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Attach => f.write_str("attach"),
        }
    }
}

/// Immutable, fully coerced configuration at one point in time.
///
/// Updates never touch an existing snapshot; `with_values` and `without`
/// return a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    values: BTreeMap<ConfigKey, ConfigValue>,
    mode: LaunchMode,
}

impl ConfigSnapshot {
    pub fn empty(mode: LaunchMode) -> Self {
        Self {
            values: BTreeMap::new(),
            mode,
        }
    }

    pub fn mode(&self) -> LaunchMode {
        self.mode
    }

    pub fn get(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ConfigKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConfigKey, &ConfigValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn with_values<I>(&self, changes: I) -> Self
    where
        I: IntoIterator<Item = (ConfigKey, ConfigValue)>,
    {
        let mut values = self.values.clone();
        values.extend(changes);
        Self {
            values,
            mode: self.mode,
        }
    }

    pub fn without(&self, key: ConfigKey) -> Self {
        let mut values = self.values.clone();
        values.remove(&key);
        Self {
            values,
            mode: self.mode,
        }
    }

    /// Keys whose value differs between `self` and `other` (presence counts).
    pub fn changed_keys(&self, other: &ConfigSnapshot) -> Vec<ConfigKey> {
        ConfigKey::ALL
            .iter()
            .copied()
            .filter(|key| self.get(*key) != other.get(*key))
            .collect()
    }
}

impl Serialize for ConfigSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        map.serialize_entry("mode", &self.mode)?;
        for (key, value) in &self.values {
            map.serialize_entry(key.as_str(), value)?;
        }
        map.end()
    }
}

impl std::fmt::Display for ConfigSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "mode = {}", self.mode)?;
        for (key, value) in &self.values {
            writeln!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigSnapshot, LaunchMode};
    use crate::config::key::ConfigKey;
    use crate::config::value::ConfigValue;

    #[test]
    fn with_values_leaves_original_untouched() {
        let base = ConfigSnapshot::empty(LaunchMode::Attach)
            .with_values([(ConfigKey::Nonstop, ConfigValue::Bool(true))]);
        let next = base.with_values([
            (ConfigKey::Nonstop, ConfigValue::Bool(false)),
            (ConfigKey::ShowFrames, ConfigValue::Int(5)),
        ]);

        assert_eq!(base.get(ConfigKey::Nonstop), Some(&ConfigValue::Bool(true)));
        assert!(!base.contains(ConfigKey::ShowFrames));
        assert_eq!(next.get(ConfigKey::Nonstop), Some(&ConfigValue::Bool(false)));
        assert_eq!(next.mode(), LaunchMode::Attach);
        assert_eq!(
            base.changed_keys(&next),
            vec![ConfigKey::ShowFrames, ConfigKey::Nonstop]
        );
    }

    #[test]
    fn without_drops_key() {
        let base = ConfigSnapshot::empty(LaunchMode::Start)
            .with_values([(ConfigKey::Host, ConfigValue::String("::1".to_owned()))]);
        let next = base.without(ConfigKey::Host);
        assert!(next.is_empty());
        assert_eq!(base.len(), 1);
        assert_eq!(base.changed_keys(&next), vec![ConfigKey::Host]);
    }

    #[test]
    fn serializes_mode_and_present_keys() {
        let snapshot = ConfigSnapshot::empty(LaunchMode::Start)
            .with_values([(ConfigKey::SaveHistory, ConfigValue::Int(50))]);
        let rendered = serde_json::to_value(&snapshot).expect("snapshot should serialize");
        assert_eq!(
            rendered,
            serde_json::json!({ "mode": "start", "save_history": 50 })
        );
    }
}
