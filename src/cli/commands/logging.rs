use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_LEVEL: &str = "log-level";
pub const ARG_LOG_FILTER: &str = "log-filter";

/// How loud the service should be, resolved from the command line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogSettings {
    /// `None` keeps the quiet default (errors only).
    pub level: Option<Level>,
    /// Extra `EnvFilter` directives, comma separated.
    pub directives: Option<String>,
}

impl LogSettings {
    /// An explicit `--log-level` wins over `-v` counts.
    #[must_use]
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let level = matches
            .get_one::<Level>(ARG_LOG_LEVEL)
            .copied()
            .or_else(|| verbosity_level(matches.get_count(ARG_VERBOSITY)));

        Self {
            level,
            directives: matches
                .get_one::<String>(ARG_LOG_FILTER)
                .filter(|value| !value.trim().is_empty())
                .cloned(),
        }
    }
}

const fn verbosity_level(count: u8) -> Option<Level> {
    match count {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Raise verbosity: -v warn, -vv info, -vvv debug, -vvvv trace")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long(ARG_LOG_LEVEL)
                .help("Log level (error, warn, info, debug, trace); overrides -v")
                .env("KEYWARD_LOG_LEVEL")
                .global(true)
                .value_parser(clap::value_parser!(Level)),
        )
        .arg(
            Arg::new(ARG_LOG_FILTER)
                .long(ARG_LOG_FILTER)
                .help("Extra tracing directives, e.g. sqlx::query=debug,tower_http=debug")
                .env("KEYWARD_LOG_FILTER")
                .global(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(args: &[&str]) -> LogSettings {
        let command = with_args(Command::new("keyward"));
        LogSettings::from_matches(&command.get_matches_from(args.iter().copied()))
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some(Level::WARN));
        assert_eq!(verbosity_level(2), Some(Level::INFO));
        assert_eq!(verbosity_level(3), Some(Level::DEBUG));
        assert_eq!(verbosity_level(9), Some(Level::TRACE));
    }

    #[test]
    fn quiet_by_default() {
        temp_env::with_vars(
            [
                ("KEYWARD_LOG_LEVEL", None::<&str>),
                ("KEYWARD_LOG_FILTER", None),
            ],
            || {
                assert_eq!(settings(&["keyward"]), LogSettings::default());
            },
        );
    }

    #[test]
    fn counts_verbose_flags() {
        temp_env::with_vars([("KEYWARD_LOG_LEVEL", None::<&str>)], || {
            assert_eq!(settings(&["keyward", "-vv"]).level, Some(Level::INFO));
        });
    }

    #[test]
    fn log_level_env_overrides_verbose_flags() {
        temp_env::with_vars([("KEYWARD_LOG_LEVEL", Some("debug"))], || {
            assert_eq!(settings(&["keyward", "-v"]).level, Some(Level::DEBUG));
        });
    }

    #[test]
    fn log_filter_from_env() {
        temp_env::with_vars(
            [("KEYWARD_LOG_FILTER", Some("sqlx::query=debug"))],
            || {
                assert_eq!(
                    settings(&["keyward"]).directives.as_deref(),
                    Some("sqlx::query=debug")
                );
            },
        );
    }

    #[test]
    fn rejects_unknown_level() {
        let result = with_args(Command::new("keyward")).try_get_matches_from([
            "keyward",
            "--log-level",
            "loud",
        ]);
        assert_eq!(
            result.map(|_| ()).map_err(|e| e.kind()),
            Err(clap::error::ErrorKind::ValueValidation)
        );
    }
}
