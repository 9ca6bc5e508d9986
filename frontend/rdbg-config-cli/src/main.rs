mod cli;
mod output;

use rdbg_config_core::config::schema::{category_of, default_of, entries, entry_of};
use rdbg_config_core::config::{
    bootstrap, snapshot_to_env_map, ChangeHooks, ConfigKey, ConfigStore, ProcessEnv,
};
use rdbg_config_core::{logging, Error, SessionSlot};

use crate::cli::{Action, Cli, OutputFormat};
use crate::output::{DescribeEntry, GetData, LaunchFlags, ShowData, ValueSource};

fn main() {
    if let Err(error) = run() {
        eprintln!("rdbg-config failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> rdbg_config_core::Result<()> {
    let args = Cli::parse_args();
    let action = args.action.clone().unwrap_or(Action::Show);
    let name = action.name();

    if let Err(error) = execute(&args, action) {
        match args.output {
            OutputFormat::Text => return Err(error),
            OutputFormat::Json => {
                output::print_error(name, &error)?;
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn execute(args: &Cli, action: Action) -> rdbg_config_core::Result<()> {
    let store = bootstrap(
        &ProcessEnv,
        &args.overrides(),
        ChangeHooks::system(SessionSlot::new()),
    )?;
    logging::init_for_level(store.get_log_level());
    tracing::debug!(action = action.name(), mode = %store.mode(), "configuration ready");

    match action {
        Action::Show => show(args, &store),
        Action::Get { key } => {
            let key = key.parse::<ConfigKey>()?;
            let data = get_data(&store, key);
            emit(args.output, "get", &data, || output::render_get(&data))
        }
        Action::Set { assignments } => {
            store.set_many(assignments)?;
            show(args, &store)
        }
        Action::Append { key, value } => {
            store.append(&key, value)?;
            show(args, &store)
        }
        Action::Unset { key } => {
            store.unset(&key)?;
            show(args, &store)
        }
        Action::Export => {
            let exported = snapshot_to_env_map(&store.snapshot());
            emit(args.output, "export", &exported, || {
                output::render_env(&exported)
            })
        }
        Action::Describe => {
            let described = describe_entries();
            emit(args.output, "describe", &described, || {
                output::render_describe(&described)
            })
        }
        Action::Exec { command } => exec(&store, &command),
    }
}

fn show(args: &Cli, store: &ConfigStore) -> rdbg_config_core::Result<()> {
    let snapshot = store.snapshot();
    let data = ShowData {
        launch: LaunchFlags {
            command: args.command_mode,
            open: args.open.clone(),
        },
        config: &snapshot,
    };
    emit(args.output, "show", &data, || output::render_show(&data))
}

fn emit<T, F>(format: OutputFormat, command: &str, data: &T, render: F) -> rdbg_config_core::Result<()>
where
    T: serde::Serialize,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Json => output::print_data(command, data),
        OutputFormat::Text => {
            let rendered = render();
            if rendered.ends_with('\n') {
                print!("{rendered}");
            } else {
                println!("{rendered}");
            }
            Ok(())
        }
    }
}

fn get_data(store: &ConfigStore, key: ConfigKey) -> GetData {
    let entry = entry_of(key);
    let configured = store.snapshot().get(key).cloned();
    let (source, value) = match configured {
        Some(value) => (ValueSource::Configured, Some(value)),
        None => match default_of(key) {
            Some(value) => (ValueSource::Default, Some(value)),
            None => (ValueSource::Unset, None),
        },
    };
    GetData {
        key,
        env_name: entry.env_name,
        type_tag: entry.type_tag,
        source,
        value,
    }
}

fn describe_entries() -> Vec<DescribeEntry> {
    entries()
        .map(|entry| DescribeEntry {
            key: entry.key,
            env_name: entry.env_name,
            type_tag: entry.type_tag,
            category: category_of(entry),
            description: entry.description,
            default: entry.default,
        })
        .collect()
}

fn exec(store: &ConfigStore, command: &[String]) -> rdbg_config_core::Result<()> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| Error::Config("exec needs a command to run".to_owned()))?;
    let exported = snapshot_to_env_map(&store.snapshot());
    tracing::info!(program = %program, variables = exported.len(), "spawning child");

    let status = std::process::Command::new(program)
        .args(rest)
        .envs(&exported)
        .status()
        .map_err(|err| Error::Config(format!("failed to run '{program}': {err}")))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}
