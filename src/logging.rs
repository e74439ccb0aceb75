use crate::config::AppConfig;
use std::{
    env, fs,
    io::Write,
    panic,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, OnceLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};

const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
const CRASH_LOG_MAX_BYTES: u64 = 256 * 1024;
static LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);
static CRASH_LOG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_STATE: OnceLock<Mutex<LogState>> = OnceLock::new();

/// Path to the temp debug log, rotated between runs.
pub fn log_file_path() -> PathBuf {
    env::temp_dir().join("medivox_client.log")
}

/// Path to the crash log (metadata only by default).
pub fn crash_log_path() -> PathBuf {
    env::temp_dir().join("medivox_crash.log")
}

struct LogWriter {
    path: PathBuf,
    file: fs::File,
    max_bytes: u64,
    bytes_written: u64,
}

impl LogWriter {
    fn new(path: PathBuf, max_bytes: u64) -> Option<Self> {
        let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if bytes_written > max_bytes {
            let _ = fs::remove_file(&path);
            bytes_written = 0;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(Self {
            path,
            file,
            max_bytes,
            bytes_written,
        })
    }

    fn rotate_if_needed(&mut self, next_len: usize) {
        if self.bytes_written.saturating_add(next_len as u64) <= self.max_bytes {
            return;
        }
        if let Ok(file) = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
        {
            self.file = file;
            self.bytes_written = 0;
        }
    }

    fn write_line(&mut self, line: &str) {
        self.rotate_if_needed(line.len());
        if self.file.write_all(line.as_bytes()).is_ok() {
            self.bytes_written = self.bytes_written.saturating_add(line.len() as u64);
        }
    }
}

#[derive(Default)]
struct LogState {
    writer: Option<LogWriter>,
}

fn log_state() -> &'static Mutex<LogState> {
    LOG_STATE.get_or_init(|| Mutex::new(LogState::default()))
}

/// Configure logging from CLI flags or environment.
///
/// Utterance text and transcripts stay out of the log unless `--log-content`
/// is set; default lines carry lengths and statuses only.
pub fn init_logging(config: &AppConfig) {
    let enabled = config.logs && !config.no_logs;
    let content_enabled = enabled && config.log_content;
    LOG_ENABLED.store(enabled, Ordering::Relaxed);
    LOG_CONTENT_ENABLED.store(content_enabled, Ordering::Relaxed);
    CRASH_LOG_ENABLED.store(enabled, Ordering::Relaxed);

    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if enabled {
        state.writer = LogWriter::new(log_file_path(), LOG_MAX_BYTES);
    } else {
        state.writer = None;
    }
}

/// Write a debug line to the temp log file.
pub fn log_debug(msg: &str) {
    if !LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let line = format!("[{timestamp}] {msg}\n");
    let mut state = log_state()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(writer) = state.writer.as_mut() {
        writer.write_line(&line);
    }
}

/// Write a line that may contain user content (utterances, transcripts).
pub fn log_debug_content(msg: &str) {
    if !LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        return;
    }
    log_debug(msg);
}

/// Append a minimal crash entry, omitting the panic payload unless content
/// logging was explicitly enabled.
pub fn log_panic(info: &panic::PanicHookInfo<'_>) {
    if !CRASH_LOG_ENABLED.load(Ordering::Relaxed) {
        return;
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let location = info
        .location()
        .map(|loc| format!("{}:{}", loc.file(), loc.line()))
        .unwrap_or_else(|| "unknown".to_string());

    let payload = if LOG_CONTENT_ENABLED.load(Ordering::Relaxed) {
        if let Some(text) = info.payload().downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = info.payload().downcast_ref::<String>() {
            text.clone()
        } else {
            "non-string panic payload".to_string()
        }
    } else {
        "panic payload omitted (log-content disabled)".to_string()
    };

    let line = format!(
        "[{timestamp}] panic at {location}: {payload} (v{})\n",
        env!("CARGO_PKG_VERSION")
    );
    let path = crash_log_path();
    let mut bytes_written = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    if bytes_written > CRASH_LOG_MAX_BYTES {
        let _ = fs::remove_file(&path);
        bytes_written = 0;
    }
    if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
        if bytes_written.saturating_add(line.len() as u64) > CRASH_LOG_MAX_BYTES {
            if let Ok(mut file) = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
            {
                let _ = file.write_all(line.as_bytes());
            }
        } else {
            let _ = file.write_all(line.as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    static LOG_TEST_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    /// Serializes tests that flip the process-global logging switches.
    fn with_log_lock(action: impl FnOnce()) {
        let _guard = LOG_TEST_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        action();
    }

    fn clear_log_env() {
        env::remove_var("MEDIVOX_LOGS");
        env::remove_var("MEDIVOX_NO_LOGS");
        env::remove_var("MEDIVOX_LOG_CONTENT");
    }

    #[test]
    fn logging_disabled_by_default() {
        with_log_lock(|| {
            clear_log_env();
            let config = AppConfig::parse_from(["medivox-tests"]);
            init_logging(&config);
            let log_path = log_file_path();
            let _ = fs::remove_file(&log_path);
            log_debug("should-not-write");
            assert!(fs::metadata(&log_path).is_err());
        });
    }

    #[test]
    fn logging_enabled_writes_log() {
        with_log_lock(|| {
            clear_log_env();
            let log_path = log_file_path();
            let _ = fs::remove_file(&log_path);
            let mut config = AppConfig::parse_from(["medivox-tests"]);
            config.logs = true;
            init_logging(&config);
            log_debug("log-enabled");
            let contents = fs::read_to_string(&log_path).expect("log file should be created");
            assert!(contents.contains("log-enabled"));
        });
    }

    #[test]
    fn log_content_requires_flag() {
        with_log_lock(|| {
            clear_log_env();
            let log_path = log_file_path();
            let _ = fs::remove_file(&log_path);
            let mut config = AppConfig::parse_from(["medivox-tests"]);
            config.logs = true;
            config.log_content = false;
            init_logging(&config);
            log_debug_content("secret");
            let contents = fs::read_to_string(&log_path).unwrap_or_default();
            assert!(
                !contents.contains("secret"),
                "content should not be logged without --log-content"
            );
        });
    }

    #[test]
    fn no_logs_overrides_logs() {
        with_log_lock(|| {
            clear_log_env();
            let mut config = AppConfig::parse_from(["medivox-tests"]);
            config.logs = true;
            config.no_logs = true;
            init_logging(&config);
            let log_path = log_file_path();
            let _ = fs::remove_file(&log_path);
            log_debug("suppressed");
            assert!(fs::metadata(&log_path).is_err());
        });
    }

    #[test]
    fn log_writer_rotates_when_over_cap() {
        let path = env::temp_dir().join(format!(
            "medivox_log_rotate_{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        let mut writer = LogWriter::new(path.clone(), 32).expect("writer");
        writer.write_line("0123456789012345678901234567\n");
        writer.write_line("next line exceeds the cap\n");
        let len = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        assert!(len <= 32, "log should have been truncated, len={len}");
        let _ = fs::remove_file(&path);
    }
}
