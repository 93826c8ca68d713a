use std::{env, ffi::OsStr, fmt::Display, path::PathBuf, process::exit, str::FromStr};

use anyhow::Error;
use argp::{FromArgValue, FromArgs};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub mod argp_version;
pub mod cmd;
pub mod util;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "info" => Self::Info,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => return Err(()),
        })
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    }
}

impl FromArgValue for LogLevel {
    fn from_arg_value(value: &OsStr) -> Result<Self, String> {
        String::from_arg_value(value)
            .and_then(|s| Self::from_str(&s).map_err(|_| "Invalid log level".to_string()))
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(FromArgs, Debug)]
/// Memory usage reports for SDK linker map files.
struct TopLevel {
    #[argp(subcommand)]
    command: SubCommand,
    #[argp(option, short = 'C')]
    /// Change working directory.
    chdir: Option<PathBuf>,
    #[argp(option, short = 'L')]
    /// Minimum logging level. (Default: info)
    /// Possible values: error, warn, info, debug, trace
    log_level: Option<LogLevel>,
    /// Print version information and exit.
    #[argp(switch, short = 'V')]
    #[allow(dead_code)]
    version: bool,
    /// Disable color output. (env: NO_COLOR)
    #[argp(switch)]
    no_color: bool,
}

#[derive(FromArgs, Debug)]
#[argp(subcommand)]
enum SubCommand {
    Diff(cmd::diff::Args),
    Report(cmd::report::Args),
    Sections(cmd::sections::Args),
    Summary(cmd::summary::Args),
}

fn use_colors(args: &TopLevel) -> bool {
    if args.no_color || env::var_os("NO_COLOR").is_some() {
        return false;
    }
    // Windows consoles need ANSI support switched on first.
    if enable_ansi_support::enable_ansi_support().is_err() {
        return false;
    }
    supports_color::on(supports_color::Stream::Stdout).is_some_and(|c| c.has_basic)
}

fn main() {
    let args: TopLevel = argp_version::from_env();
    let use_colors = use_colors(&args);
    owo_colors::set_override(use_colors);

    let builder = tracing_subscriber::fmt()
        .compact()
        .with_ansi(use_colors)
        .with_target(false)
        .without_time();
    let result = match args.log_level {
        Some(level) => builder.with_max_level(LevelFilter::from(level)).try_init(),
        None => builder
            .with_env_filter(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut result = Ok(());
    if let Some(dir) = &args.chdir {
        result = env::set_current_dir(dir).map_err(|e| {
            Error::new(e).context(format!("Failed to change working directory to '{}'", dir.display()))
        });
    }
    result = result.and_then(|_| match args.command {
        SubCommand::Diff(c_args) => cmd::diff::run(c_args),
        SubCommand::Report(c_args) => cmd::report::run(c_args),
        SubCommand::Sections(c_args) => cmd::sections::run(c_args),
        SubCommand::Summary(c_args) => cmd::summary::run(c_args),
    });
    if let Err(e) = result {
        eprintln!("Failed: {e:?}");
        exit(1);
    }
}
