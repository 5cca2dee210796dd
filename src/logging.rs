use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;

/// Log levels matching the driver's verbosity scale
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Nothing = 0,
    User = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    All = 6,
}

impl LogLevel {
    /// Create a LogLevel from an integer
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Nothing,
            1 => LogLevel::User,
            2 => LogLevel::Error,
            3 => LogLevel::Warning,
            4 => LogLevel::Info,
            5 => LogLevel::Debug,
            6 => LogLevel::All,
            _ => LogLevel::Info,
        }
    }

    /// Get the integer representation for the C interface
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Filter applied to the `log` facade
    pub fn filter(&self) -> LevelFilter {
        match self {
            LogLevel::Nothing => LevelFilter::Off,
            LogLevel::User | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::All => LevelFilter::Trace,
        }
    }
}

/// Writes records to stderr with a crate prefix
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(
            std::io::stderr().lock(),
            "[blitscale] [{}] {}",
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Error returned when the host installed its own logger first
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Another logger is already installed")]
pub struct LoggerInstalled;

/// Install the stderr logger and set the verbosity
///
/// Safe to call repeatedly; later calls only change the level. When the
/// host application installed a different logger, the level is still
/// applied and [`LoggerInstalled`] is returned.
pub fn init(level: LogLevel) -> Result<(), LoggerInstalled> {
    let installed = log::set_logger(&LOGGER).is_ok() || is_ours();
    log::set_max_level(level.filter());
    if installed {
        Ok(())
    } else {
        Err(LoggerInstalled)
    }
}

fn is_ours() -> bool {
    std::ptr::eq(
        log::logger() as *const dyn Log as *const (),
        &LOGGER as *const StderrLogger as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_level_from_i32() {
        assert_eq!(LogLevel::from_i32(0), LogLevel::Nothing);
        assert_eq!(LogLevel::from_i32(1), LogLevel::User);
        assert_eq!(LogLevel::from_i32(2), LogLevel::Error);
        assert_eq!(LogLevel::from_i32(3), LogLevel::Warning);
        assert_eq!(LogLevel::from_i32(4), LogLevel::Info);
        assert_eq!(LogLevel::from_i32(5), LogLevel::Debug);
        assert_eq!(LogLevel::from_i32(6), LogLevel::All);
    }

    #[test]
    fn test_log_level_as_i32() {
        assert_eq!(LogLevel::Nothing.as_i32(), 0);
        assert_eq!(LogLevel::Warning.as_i32(), 3);
        assert_eq!(LogLevel::All.as_i32(), 6);
    }

    #[test]
    fn test_log_level_invalid() {
        // Invalid values should default to Info
        assert_eq!(LogLevel::from_i32(100), LogLevel::Info);
        assert_eq!(LogLevel::from_i32(-1), LogLevel::Info);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Nothing.filter(), LevelFilter::Off);
        assert_eq!(LogLevel::User.filter(), LevelFilter::Error);
        assert_eq!(LogLevel::Warning.filter(), LevelFilter::Warn);
        assert_eq!(LogLevel::All.filter(), LevelFilter::Trace);
    }

    #[test]
    #[serial]
    fn test_init_twice() {
        assert_eq!(init(LogLevel::Warning), Ok(()));
        assert_eq!(log::max_level(), LevelFilter::Warn);
        assert_eq!(init(LogLevel::Debug), Ok(()));
        assert_eq!(log::max_level(), LevelFilter::Debug);
        log::debug!("debug record through the stderr logger");
        init(LogLevel::Nothing).unwrap();
    }
}
