use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// Identifier of a recognized configuration key.
///
/// Variant order is the schema declaration order; `ConfigKey::ALL[k.index()] == k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    LogLevel,
    ShowSrcLines,
    ShowFrames,
    UseShortPath,
    NoColor,
    NoSigintHook,
    NoReline,
    SkipPath,
    SkipNosrc,
    KeepAllocSite,
    Postmortem,
    ParentOnFork,
    SigdumpSig,
    Nonstop,
    StopAtLoad,
    InitScript,
    Commands,
    NoRc,
    HistoryFile,
    SaveHistory,
    Port,
    Host,
    SockPath,
    SockDir,
    Cookie,
    OpenFrontend,
    ChromePath,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 27] = [
        Self::LogLevel,
        Self::ShowSrcLines,
        Self::ShowFrames,
        Self::UseShortPath,
        Self::NoColor,
        Self::NoSigintHook,
        Self::NoReline,
        Self::SkipPath,
        Self::SkipNosrc,
        Self::KeepAllocSite,
        Self::Postmortem,
        Self::ParentOnFork,
        Self::SigdumpSig,
        Self::Nonstop,
        Self::StopAtLoad,
        Self::InitScript,
        Self::Commands,
        Self::NoRc,
        Self::HistoryFile,
        Self::SaveHistory,
        Self::Port,
        Self::Host,
        Self::SockPath,
        Self::SockDir,
        Self::Cookie,
        Self::OpenFrontend,
        Self::ChromePath,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LogLevel => "log_level",
            Self::ShowSrcLines => "show_src_lines",
            Self::ShowFrames => "show_frames",
            Self::UseShortPath => "use_short_path",
            Self::NoColor => "no_color",
            Self::NoSigintHook => "no_sigint_hook",
            Self::NoReline => "no_reline",
            Self::SkipPath => "skip_path",
            Self::SkipNosrc => "skip_nosrc",
            Self::KeepAllocSite => "keep_alloc_site",
            Self::Postmortem => "postmortem",
            Self::ParentOnFork => "parent_on_fork",
            Self::SigdumpSig => "sigdump_sig",
            Self::Nonstop => "nonstop",
            Self::StopAtLoad => "stop_at_load",
            Self::InitScript => "init_script",
            Self::Commands => "commands",
            Self::NoRc => "no_rc",
            Self::HistoryFile => "history_file",
            Self::SaveHistory => "save_history",
            Self::Port => "port",
            Self::Host => "host",
            Self::SockPath => "sock_path",
            Self::SockDir => "sock_dir",
            Self::Cookie => "cookie",
            Self::OpenFrontend => "open_frontend",
            Self::ChromePath => "chrome_path",
        }
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| Error::UnknownConfigKey(value.to_owned()))
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConfigKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
