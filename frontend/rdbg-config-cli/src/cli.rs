use std::ffi::OsString;

use clap::{Parser, Subcommand, ValueEnum};
use rdbg_config_core::config::{CliOverrides, LaunchMode};

pub const ENV_OPTIONS: &str = "RUBY_DEBUG_OPT";

#[derive(Debug, Parser)]
#[command(
    name = "rdbg-config",
    about = "Inspect and exercise the debugger configuration",
    args_override_self = true
)]
pub struct Cli {
    /// Do not stop at the beginning of the script
    #[arg(short = 'n', long)]
    pub nonstop: bool,

    /// Execute debug command at the beginning of the script (repeatable)
    #[arg(short = 'e', value_name = "COMMAND")]
    pub commands: Vec<String>,

    /// Execute debug command in the given file
    #[arg(short = 'x', long, value_name = "FILE")]
    pub init_script: Option<String>,

    /// Ignore ~/.rdbgrc
    #[arg(long)]
    pub no_rc: bool,

    /// Disable colorize
    #[arg(long)]
    pub no_color: bool,

    /// Disable to trap SIGINT
    #[arg(long)]
    pub no_sigint_hook: bool,

    /// Treat the target as a command in $PATH
    #[arg(short = 'c', long = "command")]
    pub command_mode: bool,

    /// Open the debug port, optionally naming a frontend
    #[arg(
        short = 'O',
        long,
        value_name = "FRONTEND",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    pub open: Option<String>,

    #[arg(long, value_name = "PATH")]
    pub sock_path: Option<String>,

    #[arg(long)]
    pub port: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub cookie: Option<String>,

    /// Attach to a running debuggee instead of starting one
    #[arg(short = 'A', long)]
    pub attach: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Action {
    /// Print the effective configuration
    Show,
    /// Print one key with its source
    Get { key: String },
    /// Apply KEY=VALUE updates and print the result
    Set {
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },
    /// Extend a path-typed key
    Append { key: String, value: String },
    /// Drop a key so it reverts to its default
    Unset { key: String },
    /// Print the configuration as environment variables
    Export,
    /// List every recognized key
    Describe,
    /// Run a command with the configuration exported into its environment
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Get { .. } => "get",
            Self::Set { .. } => "set",
            Self::Append { .. } => "append",
            Self::Unset { .. } => "unset",
            Self::Export => "export",
            Self::Describe => "describe",
            Self::Exec { .. } => "exec",
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}

/// Splices the words of `options` in after the program name so that real
/// arguments, parsed later, take precedence.
pub fn with_env_options<I>(options: Option<&str>, args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut merged: Vec<OsString> = args.next().into_iter().collect();
    merged.extend(
        options
            .unwrap_or_default()
            .split_whitespace()
            .map(OsString::from),
    );
    merged.extend(args);
    merged
}

impl Cli {
    pub fn parse_args() -> Self {
        let options = std::env::var(ENV_OPTIONS).ok();
        Self::parse_from(with_env_options(options.as_deref(), std::env::args_os()))
    }

    /// Raw schema overrides carried by the debugger flags.
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides::new();
        if self.nonstop {
            overrides.set("nonstop", "1");
        }
        if !self.commands.is_empty() {
            let joined: String = self
                .commands
                .iter()
                .map(|command| format!("{command};;"))
                .collect();
            overrides.set("commands", joined);
        }
        if let Some(script) = &self.init_script {
            overrides.set("init_script", script.as_str());
        }
        for (enabled, key) in [
            (self.no_rc, "no_rc"),
            (self.no_color, "no_color"),
            (self.no_sigint_hook, "no_sigint_hook"),
        ] {
            if enabled {
                overrides.set(key, "true");
            }
        }
        for (value, key) in [
            (&self.sock_path, "sock_path"),
            (&self.port, "port"),
            (&self.host, "host"),
            (&self.cookie, "cookie"),
        ] {
            if let Some(value) = value {
                overrides.set(key, value.as_str());
            }
        }
        if let Some(frontend) = self.open.as_deref().filter(|name| !name.is_empty()) {
            overrides.set("open_frontend", frontend.to_ascii_lowercase());
        }
        if self.attach {
            overrides.set_mode(LaunchMode::Attach);
        }
        overrides
    }
}
