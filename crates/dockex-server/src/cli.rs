use std::{ffi::OsString, sync::Arc, time::Duration};

use clap::{
    Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser, value_parser,
};
use dockex_docker::{DockerConfig, config::normalize_api_version};
use dockex_exporter::{
    ExporterConfig, Scraper,
    exporter::{DEFAULT_CONTAINER_CONCURRENCY, DEFAULT_SCRAPE_TIMEOUT},
    router::DEFAULT_TELEMETRY_PATH,
};

use crate::logging::{LogFormat, LogLevel};

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9417";

#[derive(Debug, Parser)]
#[command(
    name = "dockex",
    about = "Prometheus exporter for Docker daemon, container and image metrics",
    disable_version_flag = true
)]
pub struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = DEFAULT_LISTEN_ADDRESS)]
    pub listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", default_value = DEFAULT_TELEMETRY_PATH)]
    pub telemetry_path: String,

    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// File to append logs to; stderr when empty.
    #[arg(long = "log-output", default_value = "")]
    pub log_output: String,

    /// Daemon endpoint; falls back to DOCKER_HOST.
    #[arg(long = "docker.host")]
    pub docker_host: Option<String>,

    /// Engine API version; falls back to DOCKER_API_VERSION.
    #[arg(long = "docker.api-version")]
    pub docker_api_version: Option<String>,

    /// Maximum number of containers inspected at once.
    #[arg(
        long = "docker.container-concurrency",
        default_value_t = DEFAULT_CONTAINER_CONCURRENCY,
        value_parser = parse_concurrency
    )]
    pub container_concurrency: usize,

    /// Seconds a scrape may take before unfinished collectors are abandoned.
    #[arg(
        long = "scrape.timeout",
        default_value_t = DEFAULT_SCRAPE_TIMEOUT.as_secs(),
        value_parser = value_parser!(u64).range(1..)
    )]
    pub scrape_timeout: u64,

    /// Print version information.
    #[arg(long, action = ArgAction::SetTrue)]
    pub version: bool,
}

impl Cli {
    pub fn docker_config(&self) -> DockerConfig {
        let mut config = DockerConfig::from_env();
        if let Some(host) = &self.docker_host {
            config.host = host.clone();
        }
        if let Some(version) = &self.docker_api_version {
            config.api_version = normalize_api_version(version);
        }
        config
    }

    pub fn exporter_config(&self) -> ExporterConfig {
        ExporterConfig {
            scrape_timeout: Duration::from_secs(self.scrape_timeout),
            container_concurrency: self.container_concurrency,
        }
    }

    /// Accepts the `:9417` shorthand for all interfaces.
    pub fn bind_address(&self) -> String {
        match self.listen_address.strip_prefix(':') {
            Some(port) => format!("0.0.0.0:{port}"),
            None => self.listen_address.clone(),
        }
    }
}

pub struct Settings {
    pub cli: Cli,
    pub scrapers: Vec<Arc<dyn Scraper>>,
}

/// Parses the fixed flags plus one `--collect.<name>` flag per known scraper,
/// keeping only the scrapers left enabled.
pub fn parse_from<I, T>(args: I, scrapers: Vec<Arc<dyn Scraper>>) -> Result<Settings, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(&scrapers).try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let scrapers = scrapers
        .into_iter()
        .filter(|scraper| is_enabled(&matches, scraper.as_ref()))
        .collect();

    Ok(Settings { cli, scrapers })
}

pub fn command(scrapers: &[Arc<dyn Scraper>]) -> Command {
    scrapers
        .iter()
        .fold(Cli::command(), |command, scraper| {
            command.arg(collect_arg(scraper.as_ref()))
        })
}

fn collect_arg(scraper: &dyn Scraper) -> Arg {
    let flag = collect_flag(scraper.name());
    Arg::new(flag.clone())
        .long(flag)
        .help(scraper.help())
        .action(ArgAction::Set)
        .value_parser(value_parser!(bool))
        .num_args(0..=1)
        .require_equals(true)
        .default_value(if scraper.enabled_by_default() { "true" } else { "false" })
        .default_missing_value("true")
}

fn is_enabled(matches: &ArgMatches, scraper: &dyn Scraper) -> bool {
    matches
        .get_one::<bool>(&collect_flag(scraper.name()))
        .copied()
        .unwrap_or_else(|| scraper.enabled_by_default())
}

fn collect_flag(name: &str) -> String {
    format!("collect.{name}")
}

fn parse_concurrency(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(limit) => Ok(limit),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dockex_exporter::builtin_scrapers;

    use super::{DEFAULT_LISTEN_ADDRESS, parse_from};
    use crate::logging::{LogFormat, LogLevel};

    fn parse(args: &[&str]) -> super::Settings {
        let argv = std::iter::once("dockex").chain(args.iter().copied());
        parse_from(argv, builtin_scrapers()).unwrap()
    }

    fn names(settings: &super::Settings) -> Vec<&'static str> {
        settings.scrapers.iter().map(|scraper| scraper.name()).collect()
    }

    #[test]
    fn defaults() {
        let settings = parse(&[]);
        let cli = &settings.cli;

        assert_eq!(cli.listen_address, DEFAULT_LISTEN_ADDRESS);
        assert_eq!(cli.telemetry_path, "/metrics");
        assert_eq!(cli.log_level, LogLevel::Info);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.log_output.is_empty());
        assert!(!cli.version);

        let config = cli.exporter_config();
        assert_eq!(config.scrape_timeout, Duration::from_secs(30));
        assert_eq!(config.container_concurrency, 32);
        assert_eq!(names(&settings), vec!["info", "container", "image"]);
    }

    #[test]
    fn collect_flags_toggle_scrapers() {
        let settings = parse(&["--collect.image=false", "--collect.info"]);
        assert_eq!(names(&settings), vec!["info", "container"]);

        let settings = parse(&["--collect.container=false", "--collect.image=false"]);
        assert_eq!(names(&settings), vec!["info"]);
    }

    #[test]
    fn rejects_unknown_collectors_and_bad_values() {
        let argv = ["dockex", "--collect.volume=false"];
        assert!(parse_from(argv, builtin_scrapers()).is_err());

        let argv = ["dockex", "--docker.container-concurrency", "0"];
        assert!(parse_from(argv, builtin_scrapers()).is_err());

        let argv = ["dockex", "--scrape.timeout", "0"];
        assert!(parse_from(argv, builtin_scrapers()).is_err());
    }

    #[test]
    fn docker_flags_override_environment() {
        let settings = parse(&[
            "--docker.host",
            "tcp://10.0.0.5:2376",
            "--docker.api-version",
            "1.43",
        ]);
        let config = settings.cli.docker_config();

        assert_eq!(config.host, "tcp://10.0.0.5:2376");
        assert_eq!(config.api_version, "1.43");

        let settings = parse(&["--docker.api-version", "v1.44"]);
        assert_eq!(settings.cli.docker_config().api_version, "1.44");
    }

    #[test]
    fn expands_port_only_listen_address() {
        let settings = parse(&["--web.listen-address", ":9500", "--log-format", "json"]);
        assert_eq!(settings.cli.bind_address(), "0.0.0.0:9500");
        assert_eq!(settings.cli.log_format, LogFormat::Json);

        let settings = parse(&["--web.listen-address", "127.0.0.1:9417"]);
        assert_eq!(settings.cli.bind_address(), "127.0.0.1:9417");
    }

    #[test]
    fn fatal_log_level_maps_to_error() {
        let settings = parse(&["--log-level", "fatal"]);
        assert_eq!(settings.cli.log_level, LogLevel::Error);
    }

    #[test]
    fn command_is_consistent() {
        super::command(&builtin_scrapers()).debug_assert();
    }
}
