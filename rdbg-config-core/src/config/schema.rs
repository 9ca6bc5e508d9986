use serde::Serialize;

use crate::config::key::ConfigKey;
use crate::config::value::{coerce_str, ConfigValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTag {
    String,
    Bool,
    Int,
    LogLevel,
    Path,
    Untyped,
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::LogLevel => "loglevel",
            Self::Path => "path",
            Self::Untyped => "untyped",
        };
        f.write_str(name)
    }
}

impl TypeTag {
    /// Whether a value tagged `actual` may be stored under a key declared as `self`.
    /// Untyped keys hold plain strings.
    pub fn accepts(self, actual: TypeTag) -> bool {
        self == actual || (self == Self::Untyped && actual == Self::String)
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SchemaEntry {
    pub key: ConfigKey,
    pub env_name: &'static str,
    pub description: &'static str,
    pub type_tag: TypeTag,
    /// Raw compiled-in default, applied by readers when the key is unset.
    pub default: Option<&'static str>,
}

const fn entry(
    key: ConfigKey,
    env_name: &'static str,
    description: &'static str,
    type_tag: TypeTag,
    default: Option<&'static str>,
) -> SchemaEntry {
    SchemaEntry {
        key,
        env_name,
        description,
        type_tag,
        default,
    }
}

// Indexed by `ConfigKey::index()`.
pub const SCHEMA: [SchemaEntry; 27] = [
    // UI
    entry(
        ConfigKey::LogLevel,
        "RUBY_DEBUG_LOG_LEVEL",
        "UI: Log level same as Logger (default: WARN)",
        TypeTag::LogLevel,
        Some("WARN"),
    ),
    entry(
        ConfigKey::ShowSrcLines,
        "RUBY_DEBUG_SHOW_SRC_LINES",
        "UI: Show n lines source code on breakpoint (default: 10 lines)",
        TypeTag::Int,
        Some("10"),
    ),
    entry(
        ConfigKey::ShowFrames,
        "RUBY_DEBUG_SHOW_FRAMES",
        "UI: Show n frames on breakpoint (default: 2 frames)",
        TypeTag::Int,
        Some("2"),
    ),
    entry(
        ConfigKey::UseShortPath,
        "RUBY_DEBUG_USE_SHORT_PATH",
        "UI: Show shorten PATH (like $(Gem)/foo.rb)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::NoColor,
        "RUBY_DEBUG_NO_COLOR",
        "UI: Do not use colorize (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::NoSigintHook,
        "RUBY_DEBUG_NO_SIGINT_HOOK",
        "UI: Do not suspend on SIGINT (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::NoReline,
        "RUBY_DEBUG_NO_RELINE",
        "UI: Do not use Reline library (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    // CONTROL
    entry(
        ConfigKey::SkipPath,
        "RUBY_DEBUG_SKIP_PATH",
        "CONTROL: Skip showing/entering frames for given paths (default: [])",
        TypeTag::Path,
        None,
    ),
    entry(
        ConfigKey::SkipNosrc,
        "RUBY_DEBUG_SKIP_NOSRC",
        "CONTROL: Skip on no source code lines (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::KeepAllocSite,
        "RUBY_DEBUG_KEEP_ALLOC_SITE",
        "CONTROL: Keep allocation site and p, pp shows it (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::Postmortem,
        "RUBY_DEBUG_POSTMORTEM",
        "CONTROL: Enable postmortem debug (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::ParentOnFork,
        "RUBY_DEBUG_PARENT_ON_FORK",
        "CONTROL: Keep debugging parent process on fork (default: false)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::SigdumpSig,
        "RUBY_DEBUG_SIGDUMP_SIG",
        "CONTROL: Sigdump signal (default: disabled)",
        TypeTag::Untyped,
        None,
    ),
    // BOOT
    entry(
        ConfigKey::Nonstop,
        "RUBY_DEBUG_NONSTOP",
        "BOOT: Nonstop mode",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::StopAtLoad,
        "RUBY_DEBUG_STOP_AT_LOAD",
        "BOOT: Stop at just loading location",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::InitScript,
        "RUBY_DEBUG_INIT_SCRIPT",
        "BOOT: debug command script path loaded at first stop",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::Commands,
        "RUBY_DEBUG_COMMANDS",
        "BOOT: debug commands invoked at the first stop. Commands should be separated by ';;'",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::NoRc,
        "RUBY_DEBUG_NO_RC",
        "BOOT: ignore loading ~/.rdbgrc(.rb)",
        TypeTag::Bool,
        Some("false"),
    ),
    entry(
        ConfigKey::HistoryFile,
        "RUBY_DEBUG_HISTORY_FILE",
        "BOOT: history file (default: ~/.rdbg_history)",
        TypeTag::String,
        Some("~/.rdbg_history"),
    ),
    entry(
        ConfigKey::SaveHistory,
        "RUBY_DEBUG_SAVE_HISTORY",
        "BOOT: maximum save history lines (default: 10,000)",
        TypeTag::Int,
        Some("10000"),
    ),
    // REMOTE
    entry(
        ConfigKey::Port,
        "RUBY_DEBUG_PORT",
        "REMOTE: TCP/IP remote debugging: port",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::Host,
        "RUBY_DEBUG_HOST",
        "REMOTE: TCP/IP remote debugging: host (default: 127.0.0.1)",
        TypeTag::String,
        Some("127.0.0.1"),
    ),
    entry(
        ConfigKey::SockPath,
        "RUBY_DEBUG_SOCK_PATH",
        "REMOTE: UNIX Domain Socket remote debugging: socket path",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::SockDir,
        "RUBY_DEBUG_SOCK_DIR",
        "REMOTE: UNIX Domain Socket remote debugging: socket directory",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::Cookie,
        "RUBY_DEBUG_COOKIE",
        "REMOTE: Cookie for negotiation",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::OpenFrontend,
        "RUBY_DEBUG_OPEN_FRONTEND",
        "REMOTE: frontend used by open command (vscode, chrome, default: rdbg).",
        TypeTag::Untyped,
        None,
    ),
    entry(
        ConfigKey::ChromePath,
        "RUBY_DEBUG_CHROME_PATH",
        "REMOTE: Platform dependent path of Chrome",
        TypeTag::Untyped,
        None,
    ),
];

pub fn entries() -> impl Iterator<Item = &'static SchemaEntry> {
    SCHEMA.iter()
}

pub fn entry_of(key: ConfigKey) -> &'static SchemaEntry {
    &SCHEMA[key.index()]
}

/// Resolves a key identifier to its external variable name and type.
pub fn lookup(key: &str) -> Option<(&'static str, TypeTag)> {
    let key = key.parse::<ConfigKey>().ok()?;
    let entry = entry_of(key);
    Some((entry.env_name, entry.type_tag))
}

pub fn type_of(key: ConfigKey) -> TypeTag {
    entry_of(key).type_tag
}

pub fn env_name_of(key: ConfigKey) -> &'static str {
    entry_of(key).env_name
}

pub fn describe() -> Vec<(ConfigKey, &'static str, &'static str)> {
    SCHEMA
        .iter()
        .map(|entry| (entry.key, entry.env_name, entry.description))
        .collect()
}

pub fn default_of(key: ConfigKey) -> Option<ConfigValue> {
    let entry = entry_of(key);
    entry
        .default
        .and_then(|raw| coerce_str(entry.type_tag, raw).ok())
}

/// Category prefix of a description (`UI`, `CONTROL`, `BOOT`, `REMOTE`).
pub fn category_of(entry: &SchemaEntry) -> &'static str {
    entry
        .description
        .split_once(':')
        .map(|(category, _)| category)
        .unwrap_or("")
}
