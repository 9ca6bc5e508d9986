use std::collections::BTreeMap;
use std::str::FromStr;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::config::key::ConfigKey;
use crate::config::schema::TypeTag;
use crate::error::{Error, Result};

/// Raw inputs keyed by schema key, as produced by the environment and CLI layers.
pub type RawConfig = BTreeMap<ConfigKey, RawValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Unknown = 0,
    Fatal = 1,
    Error = 2,
    Warn = 3,
    Info = 4,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        Self::Unknown,
        Self::Fatal,
        Self::Error,
        Self::Warn,
        Self::Info,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }

    /// `tracing_subscriber::EnvFilter` directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Self::Unknown => "off",
            Self::Fatal | Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| Error::InvalidLogLevel(value.to_owned()))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum PathElement {
    Literal(String),
    Pattern(Regex),
}

impl PathElement {
    pub fn pattern(source: &str) -> Result<Self> {
        Regex::new(source)
            .map(Self::Pattern)
            .map_err(|source_error| Error::InvalidPattern {
                pattern: source.to_owned(),
                source: source_error,
            })
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Whether a frame location is covered by this element.
    pub fn matches(&self, location: &str) -> bool {
        match self {
            Self::Literal(prefix) => location.starts_with(prefix.as_str()),
            Self::Pattern(regex) => regex.is_match(location),
        }
    }
}

impl PartialEq for PathElement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Pattern(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

impl Serialize for PathElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A fully coerced configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    Int(i64),
    LogLevel(LogLevel),
    Path(Vec<PathElement>),
}

impl ConfigValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::String(_) => TypeTag::String,
            Self::Bool(_) => TypeTag::Bool,
            Self::Int(_) => TypeTag::Int,
            Self::LogLevel(_) => TypeTag::LogLevel,
            Self::Path(_) => TypeTag::Path,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_log_level(&self) -> Option<LogLevel> {
        match self {
            Self::LogLevel(level) => Some(*level),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&[PathElement]> {
        match self {
            Self::Path(elements) => Some(elements),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::LogLevel(level) => f.write_str(level.as_str()),
            Self::Path(elements) => {
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        f.write_str(":")?;
                    }
                    write!(f, "{element}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::String(value) => serializer.serialize_str(value),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Int(value) => serializer.serialize_i64(*value),
            Self::LogLevel(level) => serializer.serialize_str(level.as_str()),
            Self::Path(elements) => elements.serialize(serializer),
        }
    }
}

/// Input to coercion: either a raw string or a value that is already typed.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Raw(String),
    Typed(ConfigValue),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<ConfigValue> for RawValue {
    fn from(value: ConfigValue) -> Self {
        Self::Typed(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Typed(ConfigValue::Bool(value))
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Typed(ConfigValue::Int(value))
    }
}

impl From<LogLevel> for RawValue {
    fn from(value: LogLevel) -> Self {
        Self::Typed(ConfigValue::LogLevel(value))
    }
}

pub fn coerce(type_tag: TypeTag, raw: RawValue) -> Result<ConfigValue> {
    match raw {
        RawValue::Typed(value) => Ok(value),
        RawValue::Raw(raw) => coerce_str(type_tag, &raw),
    }
}

pub fn coerce_str(type_tag: TypeTag, raw: &str) -> Result<ConfigValue> {
    match type_tag {
        TypeTag::Bool => Ok(ConfigValue::Bool(matches!(raw, "1" | "true" | "TRUE" | "T"))),
        TypeTag::Int => Ok(ConfigValue::Int(parse_leading_int(raw))),
        TypeTag::LogLevel => raw.parse().map(ConfigValue::LogLevel),
        TypeTag::Path => parse_path(raw).map(ConfigValue::Path),
        TypeTag::String | TypeTag::Untyped => Ok(ConfigValue::String(raw.to_owned())),
    }
}

/// Export form of a value; coercing the result with the key's type yields the value again.
pub fn stringify(value: &ConfigValue) -> String {
    value.to_string()
}

// Leading-numeric parse: text without leading digits is 0.
fn parse_leading_int(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let bytes = digits.as_bytes();
    let mut value: i64 = 0;
    let mut after_digit = false;
    for (index, byte) in bytes.iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                let digit = i64::from(byte - b'0');
                value = if negative {
                    value.saturating_mul(10).saturating_sub(digit)
                } else {
                    value.saturating_mul(10).saturating_add(digit)
                };
                after_digit = true;
            }
            b'_' if after_digit && bytes.get(index + 1).is_some_and(u8::is_ascii_digit) => {
                after_digit = false;
            }
            _ => break,
        }
    }
    value
}

fn parse_path(raw: &str) -> Result<Vec<PathElement>> {
    let mut segments: Vec<&str> = raw.split(':').collect();
    while segments.last().is_some_and(|segment| segment.is_empty()) {
        segments.pop();
    }

    segments
        .into_iter()
        .map(|segment| {
            if segment.len() >= 2 && segment.starts_with('/') && segment.ends_with('/') {
                PathElement::pattern(&segment[1..segment.len() - 1])
            } else {
                Ok(PathElement::literal(segment))
            }
        })
        .collect()
}
