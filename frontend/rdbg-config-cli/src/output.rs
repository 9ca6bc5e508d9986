use std::collections::BTreeMap;

use rdbg_config_core::config::{ConfigKey, ConfigSnapshot, ConfigValue, TypeTag};
use rdbg_config_core::Error;
use serde::Serialize;
use serde_json::{json, Value};

const ENVELOPE_SCHEMA: &str = "rdbg-config/envelope/v1";

/// One JSON line per action. `status` tells `data` and `error` apart.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Envelope<'a, T: Serialize> {
    Ok {
        schema: &'static str,
        action: &'a str,
        data: &'a T,
    },
    Error {
        schema: &'static str,
        action: &'a str,
        error: ErrorReport,
    },
}

#[derive(Debug, Serialize)]
struct ErrorReport {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

pub fn print_data<T: Serialize>(action: &str, data: &T) -> rdbg_config_core::Result<()> {
    println!("{}", data_json(action, data)?);
    Ok(())
}

pub fn print_error(action: &str, error: &Error) -> rdbg_config_core::Result<()> {
    println!("{}", error_json(action, error)?);
    Ok(())
}

fn data_json<T: Serialize>(action: &str, data: &T) -> rdbg_config_core::Result<String> {
    let envelope = Envelope::Ok {
        schema: ENVELOPE_SCHEMA,
        action,
        data,
    };
    Ok(serde_json::to_string(&envelope)?)
}

fn error_json(action: &str, error: &Error) -> rdbg_config_core::Result<String> {
    let envelope: Envelope<'_, ()> = Envelope::Error {
        schema: ENVELOPE_SCHEMA,
        action,
        error: ErrorReport {
            code: error_code(error),
            message: error.to_string(),
            details: error_details(error),
        },
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn error_code(error: &Error) -> &'static str {
    match error {
        Error::AlreadyInitialized => "already_initialized",
        Error::UnknownConfigKey(_) => "unknown_config_key",
        Error::TypeMismatch { .. } => "type_mismatch",
        Error::InvalidLogLevel(_) => "invalid_log_level",
        Error::InvalidPattern { .. } => "invalid_pattern",
        Error::InvalidSignal(_) => "invalid_signal",
        Error::Config(_) => "config_error",
        Error::Signal(_) => "signal_error",
        Error::Io(_) => "io_error",
        Error::Json(_) => "json_error",
    }
}

/// The offending key or input, for callers that fix up configuration programmatically.
fn error_details(error: &Error) -> Option<Value> {
    match error {
        Error::UnknownConfigKey(key) => Some(json!({ "key": key })),
        Error::TypeMismatch {
            key,
            expected,
            actual,
        } => Some(json!({ "key": key, "expected": expected, "actual": actual })),
        Error::InvalidLogLevel(level) => Some(json!({ "level": level })),
        Error::InvalidPattern { pattern, .. } => Some(json!({ "pattern": pattern })),
        Error::InvalidSignal(signal) => Some(json!({ "signal": signal })),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct LaunchFlags {
    pub command: bool,
    pub open: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShowData<'a> {
    pub launch: LaunchFlags,
    pub config: &'a ConfigSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Configured,
    Default,
    Unset,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => f.write_str("configured"),
            Self::Default => f.write_str("default"),
            Self::Unset => f.write_str("unset"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GetData {
    pub key: ConfigKey,
    pub env_name: &'static str,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub source: ValueSource,
    pub value: Option<ConfigValue>,
}

#[derive(Debug, Serialize)]
pub struct DescribeEntry {
    pub key: ConfigKey,
    pub env_name: &'static str,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    pub category: &'static str,
    pub description: &'static str,
    pub default: Option<&'static str>,
}

pub fn render_show(data: &ShowData<'_>) -> String {
    let mut rendered = data.config.to_string();
    if data.launch.command {
        rendered.push_str("launch.command = true\n");
    }
    if let Some(open) = &data.launch.open {
        let frontend = if open.is_empty() { "default" } else { open.as_str() };
        rendered.push_str(&format!("launch.open = {frontend}\n"));
    }
    rendered
}

pub fn render_get(data: &GetData) -> String {
    match &data.value {
        Some(value) => format!("{} = {value} ({})", data.key, data.source),
        None => format!("{} is not set", data.key),
    }
}

pub fn render_env(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect()
}

pub fn render_describe(entries: &[DescribeEntry]) -> String {
    let mut rendered = String::new();
    let mut category = "";
    for entry in entries {
        if entry.category != category {
            category = entry.category;
            rendered.push_str(&format!("{category}\n"));
        }
        let description = entry
            .description
            .split_once(':')
            .map(|(_, text)| text.trim())
            .unwrap_or(entry.description);
        rendered.push_str(&format!(
            "  {} ({}, {}): {description}\n",
            entry.env_name, entry.key, entry.type_tag
        ));
        if let Some(default) = entry.default {
            rendered.push_str(&format!("      default: {default}\n"));
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use rdbg_config_core::config::{ConfigKey, ConfigSnapshot, ConfigValue, LaunchMode, TypeTag};
    use rdbg_config_core::Error;

    use serde_json::{json, Value};

    use super::{
        data_json, error_code, error_json, render_describe, render_show, DescribeEntry,
        LaunchFlags, ShowData,
    };

    #[test]
    fn show_lists_mode_values_and_launch_flags() {
        let snapshot = ConfigSnapshot::empty(LaunchMode::Attach)
            .with_values([(ConfigKey::Port, ConfigValue::String("12345".to_owned()))]);
        let data = ShowData {
            launch: LaunchFlags {
                command: false,
                open: Some(String::new()),
            },
            config: &snapshot,
        };

        assert_eq!(
            render_show(&data),
            "mode = attach\nport = 12345\nlaunch.open = default\n"
        );
    }

    #[test]
    fn describe_groups_by_category() {
        let entries = [
            DescribeEntry {
                key: ConfigKey::LogLevel,
                env_name: "RUBY_DEBUG_LOG_LEVEL",
                type_tag: TypeTag::LogLevel,
                category: "UI",
                description: "UI: Log level same as Logger",
                default: Some("WARN"),
            },
            DescribeEntry {
                key: ConfigKey::Nonstop,
                env_name: "RUBY_DEBUG_NONSTOP",
                type_tag: TypeTag::Bool,
                category: "BOOT",
                description: "BOOT: Nonstop mode",
                default: None,
            },
        ];

        let rendered = render_describe(&entries);
        assert!(rendered.starts_with("UI\n  RUBY_DEBUG_LOG_LEVEL (log_level, loglevel): Log level"));
        assert!(rendered.contains("      default: WARN\n"));
        assert!(rendered.contains("BOOT\n  RUBY_DEBUG_NONSTOP (nonstop, bool): Nonstop mode\n"));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            error_code(&Error::UnknownConfigKey("x".to_owned())),
            "unknown_config_key"
        );
        assert_eq!(error_code(&Error::AlreadyInitialized), "already_initialized");
    }

    #[test]
    fn type_mismatch_reports_key_and_both_types() {
        let error = Error::TypeMismatch {
            key: "log_level".to_owned(),
            expected: TypeTag::LogLevel,
            actual: TypeTag::Int,
        };

        let parsed: Value = serde_json::from_str(&error_json("set", &error).expect("json"))
            .expect("envelope should be valid json");
        assert_eq!(parsed["schema"], "rdbg-config/envelope/v1");
        assert_eq!(parsed["status"], "error");
        assert_eq!(parsed["action"], "set");
        assert_eq!(parsed["error"]["code"], "type_mismatch");
        assert_eq!(
            parsed["error"]["details"],
            json!({ "key": "log_level", "expected": "log_level", "actual": "int" })
        );
    }

    #[test]
    fn errors_without_a_subject_omit_details() {
        let parsed: Value = serde_json::from_str(
            &error_json("show", &Error::AlreadyInitialized).expect("json"),
        )
        .expect("envelope should be valid json");
        assert!(parsed["error"].get("details").is_none());

        let parsed: Value = serde_json::from_str(
            &error_json("set", &Error::InvalidSignal("BOGUS".to_owned())).expect("json"),
        )
        .expect("envelope should be valid json");
        assert_eq!(parsed["error"]["details"], json!({ "signal": "BOGUS" }));
    }

    #[test]
    fn data_envelope_carries_action_payload() {
        let exported = json!({ "RUBY_DEBUG_PORT": "12345" });
        let parsed: Value = serde_json::from_str(&data_json("export", &exported).expect("json"))
            .expect("envelope should be valid json");
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["action"], "export");
        assert_eq!(parsed["data"]["RUBY_DEBUG_PORT"], "12345");
        assert!(parsed.get("error").is_none());
    }
}
