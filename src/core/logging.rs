//! Process-wide logger behind the `log` facade
//!
//! Reconfigurable at startup from CLI/config: level, optional log file and
//! text or JSON line format. Kept deliberately small; the kiosk runs
//! unattended, so log output has to be machine-collectable.

use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Clone)]
struct LogConfig {
    level: LevelFilter,
    format_json: bool,
}

struct KioskLogger {
    config: Arc<Mutex<LogConfig>>,
    file_writer: Arc<Mutex<Option<File>>>,
}

impl KioskLogger {
    fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(LogConfig {
                level: LevelFilter::Info,
                format_json: false,
            })),
            file_writer: Arc::new(Mutex::new(None)),
        }
    }

    fn reconfigure(
        &self,
        log_level: Option<&str>,
        log_format: Option<&str>,
        log_file: Option<&str>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let level = match log_level {
            Some(level_str) => match level_str.to_lowercase().as_str() {
                "trace" => LevelFilter::Trace,
                "debug" => LevelFilter::Debug,
                "info" => LevelFilter::Info,
                "warn" => LevelFilter::Warn,
                "error" => LevelFilter::Error,
                "off" => LevelFilter::Off,
                _ => LevelFilter::Info,
            },
            None => LevelFilter::Info,
        };

        match log_file {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                *self.file_writer.lock().unwrap() = Some(file);
            }
            None => {
                *self.file_writer.lock().unwrap() = None;
            }
        }

        *self.config.lock().unwrap() = LogConfig {
            level,
            format_json: log_format == Some("json"),
        };
        log::set_max_level(level);

        Ok(())
    }

    fn format_line(&self, record: &Record, json: bool) -> String {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        if json {
            format!(
                "{{\"ts\":\"{}\",\"level\":\"{}\",\"target\":\"{}\",\"message\":{}}}",
                timestamp,
                record.level(),
                record.target(),
                serde_json::to_string(&record.args().to_string()).unwrap_or_default()
            )
        } else {
            format!(
                "{} [{:<5}] {}: {}",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            )
        }
    }
}

impl Log for KioskLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.config.lock().unwrap().level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let json = self.config.lock().unwrap().format_json;
        let line = self.format_line(record, json);

        let mut writer = self.file_writer.lock().unwrap();
        match writer.as_mut() {
            Some(file) => {
                let _ = writeln!(file, "{}", line);
            }
            None => eprintln!("{}", line),
        }
    }

    fn flush(&self) {
        if let Some(file) = self.file_writer.lock().unwrap().as_mut() {
            let _ = file.flush();
        }
    }
}

static LOGGER: OnceLock<KioskLogger> = OnceLock::new();

/// Install (once) and configure the process logger
///
/// Later calls only reconfigure; the logger itself is registered with the
/// `log` facade exactly once.
pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let logger = LOGGER.get_or_init(KioskLogger::new);
    logger.reconfigure(log_level, log_format, log_file)?;
    // set_logger fails when another backend is already installed; for this
    // process that only happens on repeated init calls, which is fine.
    let _ = log::set_logger(logger);
    Ok(())
}
