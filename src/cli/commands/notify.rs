use clap::{Arg, ArgMatches, Command};

pub const ARG_NOTIFY_WEBHOOK_URL: &str = "notify-webhook-url";

#[derive(Debug)]
pub struct Options {
    /// When unset, notifications are only logged.
    pub webhook_url: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            webhook_url: matches
                .get_one::<String>(ARG_NOTIFY_WEBHOOK_URL)
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_NOTIFY_WEBHOOK_URL)
            .long(ARG_NOTIFY_WEBHOOK_URL)
            .help("URL that receives verification and reset notifications as JSON")
            .env("KEYWARD_NOTIFY_WEBHOOK_URL"),
    )
}
