//! Rolling file logs for the core and the CLI.
//!
//! Events are `key=value` lines carrying ids, counts and durations only,
//! never question or answer bodies.
//!
//! One backend per process: the first successful `init_logging_from` wins and
//! later calls must resolve to the same [`LogSettings`].

use crate::config::LoggingConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const LOG_FILE_BASENAME: &str = "devflow";
const BYTES_PER_MB: u64 = 1024 * 1024;
const PANIC_SUMMARY_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Logging configuration after parsing and bounds checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub dir: PathBuf,
    pub max_file_bytes: u64,
    pub max_files: usize,
}

impl LogSettings {
    /// Resolves `config` into backend settings.
    ///
    /// Returns `Ok(None)` when no directory is configured.
    pub fn resolve(config: &LoggingConfig) -> Result<Option<Self>, String> {
        let Some(raw_dir) = config.dir.as_deref().map(str::trim) else {
            return Ok(None);
        };
        let raw_level = config.level.trim();
        let level = raw_level.parse::<LevelFilter>().map_err(|_| {
            format!("unsupported log level `{raw_level}`; expected off|error|warn|info|debug|trace")
        })?;
        let dir = PathBuf::from(raw_dir);
        if !dir.is_absolute() {
            return Err(format!(
                "logging.dir must be an absolute path, got `{raw_dir}`"
            ));
        }
        if config.max_file_size_mb == 0 || config.max_files == 0 {
            return Err("log rotation needs a non-zero file size and file count".to_string());
        }

        Ok(Some(Self {
            level,
            dir,
            max_file_bytes: config.max_file_size_mb.saturating_mul(BYTES_PER_MB),
            max_files: config.max_files,
        }))
    }
}

impl Display for LogSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "level={} log_dir={} max_file_bytes={} max_files={}",
            self.level,
            self.dir.display(),
            self.max_file_bytes,
            self.max_files
        )
    }
}

/// Starts the file backend described by `config`.
///
/// Returns the active settings, or `Ok(None)` without touching the logger
/// when no directory is configured so embedding callers keep their own
/// `log` backend.
///
/// # Errors
/// - The level, directory or rotation bounds are invalid.
/// - The directory cannot be created or the backend fails to start.
/// - A backend is already running with different settings.
pub fn init_logging_from(config: &LoggingConfig) -> Result<Option<LogSettings>, String> {
    let Some(settings) = LogSettings::resolve(config)? else {
        return Ok(None);
    };

    let active = ACTIVE.get_or_try_init(|| start_backend(&settings))?;
    if active.settings != settings {
        return Err(format!(
            "logging already initialized with {}; refusing to switch to {}",
            active.settings, settings
        ));
    }
    Ok(Some(settings))
}

/// Shorthand for [`init_logging_from`] with default rotation bounds.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let config = LoggingConfig {
        level: level.to_string(),
        dir: Some(log_dir.to_string()),
        ..LoggingConfig::default()
    };
    init_logging_from(&config).map(|_| ())
}

/// Settings of the running backend, if any.
pub fn logging_status() -> Option<LogSettings> {
    ACTIVE.get().map(|active| active.settings.clone())
}

/// `debug` in debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_backend(settings: &LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            settings.dir.display()
        )
    })?;

    let handle = Logger::with(LogSpecification::builder().default(settings.level).build())
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.clone())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(settings.max_file_bytes),
            Naming::Numbers,
            Cleanup::KeepLogFiles(settings.max_files),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=core_init module=logging status=ok version={} {settings}",
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings: settings.clone(),
        _handle: handle,
    })
}

// Runs once: `start_backend` is only reached through `ACTIVE` initialisation.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}", loc.file(), loc.line()),
        );
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
            .unwrap_or("non-string payload");
        error!(
            "event=panic_captured module=core status=error location={location} payload={}",
            single_line(payload, PANIC_SUMMARY_CHARS)
        );
        previous(info);
    }));
}

/// Replaces control characters with spaces and caps the length at `max_chars`.
fn single_line(text: &str, max_chars: usize) -> String {
    let mut line: String = text
        .chars()
        .take(max_chars)
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect();
    if text.chars().nth(max_chars).is_some() {
        line.push_str("...");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::{init_logging_from, logging_status, single_line, LogSettings, BYTES_PER_MB};
    use crate::config::LoggingConfig;
    use log::LevelFilter;

    fn config_at(dir: &std::path::Path) -> LoggingConfig {
        LoggingConfig {
            level: "info".to_string(),
            dir: Some(dir.to_string_lossy().into_owned()),
            max_file_size_mb: 2,
            max_files: 3,
        }
    }

    #[test]
    fn resolve_maps_config_into_rotation_bounds() {
        let config = LoggingConfig {
            level: " WARN ".to_string(),
            ..config_at(std::path::Path::new("/var/log/devflow"))
        };
        let settings = LogSettings::resolve(&config)
            .expect("config should resolve")
            .expect("directory is set");
        assert_eq!(settings.level, LevelFilter::Warn);
        assert_eq!(settings.max_file_bytes, 2 * BYTES_PER_MB);
        assert_eq!(settings.max_files, 3);
    }

    #[test]
    fn resolve_rejects_bad_level_relative_dir_and_zero_bounds() {
        let base = config_at(std::path::Path::new("/var/log/devflow"));

        let bad_level = LoggingConfig {
            level: "loud".to_string(),
            ..base.clone()
        };
        assert!(LogSettings::resolve(&bad_level)
            .expect_err("unknown level should fail")
            .contains("loud"));

        let relative = LoggingConfig {
            dir: Some("logs/dev".to_string()),
            ..base.clone()
        };
        assert!(LogSettings::resolve(&relative)
            .expect_err("relative dir should fail")
            .contains("absolute"));

        let no_retention = LoggingConfig {
            max_files: 0,
            ..base
        };
        assert!(LogSettings::resolve(&no_retention).is_err());
    }

    #[test]
    fn init_without_directory_leaves_backend_alone() {
        let config = LoggingConfig {
            dir: None,
            ..LoggingConfig::default()
        };
        assert_eq!(init_logging_from(&config), Ok(None));
    }

    #[test]
    fn single_line_flattens_and_caps_payload() {
        assert_eq!(single_line("line1\nline2", 20), "line1 line2");
        assert_eq!(single_line("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn init_is_idempotent_for_same_settings_and_rejects_changes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config_at(dir.path());

        let started = init_logging_from(&config)
            .expect("first init should succeed")
            .expect("directory is set");
        assert_eq!(started.max_files, 3);
        assert_eq!(
            init_logging_from(&config).expect("same settings are idempotent"),
            Some(started.clone())
        );

        let more_files = LoggingConfig {
            max_files: 4,
            ..config.clone()
        };
        assert!(init_logging_from(&more_files)
            .expect_err("retention change should fail")
            .contains("refusing to switch"));

        let other_dir = tempfile::tempdir().expect("temp dir");
        assert!(init_logging_from(&config_at(other_dir.path())).is_err());

        assert_eq!(logging_status(), Some(started));
    }
}
