//! Command-line arguments

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

const AFTER_HELP: &str = "\
EXAMPLES:
  # Copy a specific key
  redis-copier --key=user:1001

  # Use external configuration file
  redis-copier --config=/path/to/redis-config.properties --key=user:1001

  # Interactive mode with custom config
  redis-copier --config=./my-redis.properties

CONFIGURATION:
  Defaults: source localhost:6379/0, destination localhost:6380/0.
  An external configuration file may contain these properties
  (the `redis.` prefix is optional):

  # Source Redis Database
  redis.source.host=localhost
  redis.source.port=6379
  redis.source.database=0
  redis.source.password=
  redis.source.timeout=2000

  # Destination Redis Database
  redis.destination.host=localhost
  redis.destination.port=6380
  redis.destination.database=0
  redis.destination.password=
  redis.destination.timeout=2000

SUPPORTED DATA TYPES:
  - String: Simple key-value pairs
  - List: Ordered collections of strings
  - Set: Unordered collections of unique strings
  - ZSet: Ordered collections with scores
  - Hash: Maps between string fields and string values

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=debug) for diagnostic output on stderr.";

/// Copies Redis keys from a source database to a destination database,
/// preserving data types and TTL.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None, after_help = AFTER_HELP)]
pub struct Args {
    /// Copy the specified key from source to destination, then exit
    #[arg(long, value_name = "KEY")]
    pub key: Option<String>,

    /// Use external configuration file (overrides default config)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Parse the process arguments, ignoring any this program does not know.
    pub fn from_env() -> Self {
        Self::parse_from(recognized(std::env::args()))
    }

    /// Full help text, as printed by `--help`.
    pub fn help_text() -> String {
        Self::command().render_long_help().to_string()
    }
}

/// Keep the program name plus `--key`, `--config` (either `=value` or
/// separate-value form) and the help flags. A bare `help` counts as `--help`.
pub fn recognized<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut kept: Vec<String> = args.next().into_iter().collect();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--key" | "--config" => {
                if let Some(value) = args.next() {
                    kept.push(arg);
                    kept.push(value);
                }
            }
            "--help" | "-h" => kept.push(arg),
            "help" => kept.push("--help".to_string()),
            _ if arg.starts_with("--key=") || arg.starts_with("--config=") => kept.push(arg),
            _ => {}
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_key_and_config() {
        let args = Args::parse_from(recognized(argv(&[
            "redis-copier",
            "--config=./redis.properties",
            "--key=session:abc123",
        ])));

        assert_eq!(args.key.as_deref(), Some("session:abc123"));
        assert_eq!(args.config, Some(PathBuf::from("./redis.properties")));
    }

    #[test]
    fn unknown_arguments_are_dropped() {
        let kept = recognized(argv(&[
            "redis-copier",
            "--spring.profiles.active=dev",
            "-x",
            "stray",
            "--key",
            "user:1",
        ]));

        assert_eq!(kept, argv(&["redis-copier", "--key", "user:1"]));
        assert_eq!(Args::parse_from(kept).key.as_deref(), Some("user:1"));
    }

    #[test]
    fn dangling_flag_without_value_is_dropped() {
        assert_eq!(recognized(argv(&["p", "--config"])), argv(&["p"]));
    }

    #[test]
    fn help_word_maps_to_flag() {
        assert_eq!(recognized(argv(&["p", "help"])), argv(&["p", "--help"]));
        assert_eq!(recognized(argv(&["p", "-h"])), argv(&["p", "-h"]));
    }

    #[test]
    fn no_arguments_means_interactive() {
        let args = Args::parse_from(recognized(argv(&["redis-copier"])));
        assert_eq!(args.key, None);
        assert_eq!(args.config, None);
    }

    #[test]
    fn help_text_documents_properties_and_types() {
        let help = Args::help_text();

        assert!(help.contains("--key <KEY>"));
        assert!(help.contains("redis.destination.port=6380"));
        assert!(help.contains("ZSet: Ordered collections with scores"));
    }

    #[test]
    fn clap_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
