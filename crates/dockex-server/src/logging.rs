use std::{error::Error, fs::OpenOptions, sync::Arc};

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, filter::Directive, fmt::writer::BoxMakeWriter};

/// Crates whose events follow `--log-level`; everything else stays at `warn`
/// unless `RUST_LOG` says otherwise.
const LOG_TARGETS: &[&str] = &[
    "dockex",
    "dockex_common",
    "dockex_docker",
    "dockex_exporter",
    "tower_http",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    #[value(alias = "fatal")]
    Error,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

pub fn init(
    level: LogLevel,
    format: LogFormat,
    output: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    for target in LOG_TARGETS {
        let directive: Directive = format!("{target}={}", level.as_directive()).parse()?;
        env_filter = env_filter.add_directive(directive);
    }

    let to_file = !output.is_empty();
    let writer = if to_file {
        let file = OpenOptions::new().create(true).append(true).open(output)?;
        BoxMakeWriter::new(Arc::new(file))
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(!to_file);

    match format {
        LogFormat::Text => builder.try_init()?,
        LogFormat::Json => builder.json().try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;

    use super::{LogFormat, LogLevel, init};

    #[test]
    fn level_names_match_directives() {
        for level in LogLevel::value_variants() {
            let name = level
                .to_possible_value()
                .map(|value| value.get_name().to_string())
                .unwrap();
            assert_eq!(name, level.as_directive());
        }
    }

    #[test]
    fn fatal_is_accepted_as_error() {
        assert_eq!(LogLevel::from_str("fatal", true), Ok(LogLevel::Error));
        assert_eq!(LogLevel::from_str("error", true), Ok(LogLevel::Error));
    }

    #[test]
    fn init_opens_log_file_and_refuses_second_subscriber() {
        let path = std::env::temp_dir().join(format!("dockex-log-{}.log", std::process::id()));
        let output = path.to_string_lossy().into_owned();

        init(LogLevel::Debug, LogFormat::Json, &output).unwrap();
        assert!(path.exists());

        let second = init(LogLevel::Info, LogFormat::Text, &output);
        assert!(second.is_err());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parses_formats() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("TEXT", true), Ok(LogFormat::Text));
        assert!(LogFormat::from_str("xml", true).is_err());
    }
}
