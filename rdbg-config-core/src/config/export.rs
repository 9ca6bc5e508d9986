use std::collections::BTreeMap;

use crate::config::schema::env_name_of;
use crate::config::snapshot::ConfigSnapshot;
use crate::config::value::stringify;

/// Environment form of every key present in `snapshot`, keyed by variable name.
///
/// Feeding the result back through bootstrap reproduces the same values.
pub fn snapshot_to_env_map(snapshot: &ConfigSnapshot) -> BTreeMap<String, String> {
    snapshot
        .iter()
        .map(|(key, value)| (env_name_of(key).to_owned(), stringify(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::snapshot_to_env_map;
    use crate::config::hooks::tests::Fixture;
    use crate::config::key::ConfigKey;
    use crate::config::loader::{merge_sources, CliOverrides};
    use crate::config::snapshot::{ConfigSnapshot, LaunchMode};
    use crate::config::store::ConfigStore;
    use crate::config::value::{ConfigValue, LogLevel, PathElement};

    #[test]
    fn renders_present_keys_only() {
        let snapshot = ConfigSnapshot::empty(LaunchMode::Start).with_values([
            (ConfigKey::LogLevel, ConfigValue::LogLevel(LogLevel::Info)),
            (ConfigKey::Nonstop, ConfigValue::Bool(true)),
            (
                ConfigKey::SkipPath,
                ConfigValue::Path(vec![
                    PathElement::literal("baz"),
                    PathElement::pattern("foo").expect("pattern"),
                ]),
            ),
        ]);

        let exported = snapshot_to_env_map(&snapshot);
        assert_eq!(exported.len(), 3);
        assert_eq!(exported["RUBY_DEBUG_LOG_LEVEL"], "INFO");
        assert_eq!(exported["RUBY_DEBUG_NONSTOP"], "true");
        assert_eq!(exported["RUBY_DEBUG_SKIP_PATH"], "baz:/foo/");
    }

    #[test]
    fn exported_environment_bootstraps_the_same_snapshot() {
        let fixture = Fixture::new();
        let original = ConfigStore::build(Default::default(), LaunchMode::Start, fixture.hooks())
            .expect("store");
        original
            .set_many([
                ("log_level", "ERROR"),
                ("show_src_lines", "25"),
                ("use_short_path", "1"),
                ("skip_path", "/gems/:vendor"),
                ("host", "::1"),
                ("port", "12345"),
            ])
            .expect("set_many");

        let exported = snapshot_to_env_map(&original.snapshot());
        let (raw, mode) = merge_sources(&exported, &CliOverrides::new()).expect("merge");
        let restored = ConfigStore::build(raw, mode, fixture.hooks()).expect("restored store");

        assert_eq!(*restored.snapshot(), *original.snapshot());
    }
}
