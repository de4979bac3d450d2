use crate::config::MonitorType;
use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        PossibleValuesParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

/// Default probe timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Pure clap command definitions with zero business logic
#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("type")
                .env("PROBEPULSE_TYPE")
                .help("Monitor type to probe")
                .long("type")
                .short('t')
                .value_name("TYPE")
                .ignore_case(true)
                .value_parser(PossibleValuesParser::new(
                    MonitorType::ALL.map(|kind| kind.as_str()),
                ))
                .required(true),
        )
        .arg(
            Arg::new("config")
                .env("PROBEPULSE_CONFIG")
                .help("Monitor configuration as JSON, or @path to read it from a file")
                .long("config")
                .long_help(
                    "Monitor configuration as a JSON object, or @path to read it from a file.\n\
                    The \"type\" field may be omitted, it defaults to --type.\n\n\
                    Examples:\n\
                    - '{\"url\": \"https://example.com\", \"expectedStatus\": \"200-299,302\"}'\n\
                    - '{\"host\": \"db.internal\", \"port\": 5432}'\n\
                    - @/etc/probepulse/redis.json"
                )
                .short('c')
                .value_name("JSON|@FILE")
                .required(true),
        )
        .arg(
            Arg::new("timeout")
                .default_value("10000")
                .env("PROBEPULSE_TIMEOUT")
                .help("Probe timeout in milliseconds")
                .long("timeout")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("verbose")
                .help("Increase log verbosity, -v info, -vv debug, -vvv trace")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count),
        )
}
