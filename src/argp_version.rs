//! `-V`/`--version` support on top of `argp`, reporting the package version
//! and the git commit it was built from.
use std::ffi::OsStr;

use argp::{parser::ParseGlobalOptions, EarlyExit, FromArgs, TopLevelCommand};

/// The top-level command, or an early exit after printing the version.
struct WithVersion<T>(T)
where T: FromArgs;

impl<T> TopLevelCommand for WithVersion<T> where T: FromArgs {}

impl<T> FromArgs for WithVersion<T>
where T: FromArgs
{
    fn _from_args(
        command_name: &[&str],
        args: &[&OsStr],
        parent: Option<&mut dyn ParseGlobalOptions>,
    ) -> Result<Self, EarlyExit> {
        if is_version_request(args) {
            println!("{}", version_string(command_name.first().copied()));
            std::process::exit(0);
        }
        T::_from_args(command_name, args, parent).map(Self)
    }
}

/// Only a lone version flag asks for the version; anything else goes to the command.
fn is_version_request(args: &[&OsStr]) -> bool {
    matches!(args, [flag] if *flag == "-V" || *flag == "--version")
}

fn version_string(command_name: Option<&str>) -> String {
    format!(
        "{} {} ({})",
        command_name.unwrap_or(env!("CARGO_PKG_NAME")),
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_SHA"),
    )
}

/// Parses the top-level command from the process arguments, exiting on errors,
/// `--help` and `--version`.
pub fn from_env<T>() -> T
where T: TopLevelCommand {
    argp::parse_args_or_exit::<WithVersion<T>>(argp::DEFAULT).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_request() {
        assert!(is_version_request(&[OsStr::new("-V")]));
        assert!(is_version_request(&[OsStr::new("--version")]));
        assert!(!is_version_request(&[OsStr::new("-V"), OsStr::new("sections")]));
        assert!(!is_version_request(&[]));
    }

    #[test]
    fn test_version_string() {
        let version = version_string(Some("memrep"));
        assert!(version.starts_with(concat!("memrep ", env!("CARGO_PKG_VERSION"))));
    }
}
