use anyhow::Result;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Shared line buffer behind the simulated terminal view. Cheap to clone;
/// the batch worker and the UI loop both hold handles.
#[derive(Clone)]
pub struct TerminalLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TerminalLog {
    pub fn new() -> Self {
        TerminalLog {
            entries: Arc::new(Mutex::new(vec![
                "iDevice tweaks terminal initialized!".to_string(),
                format!("idevice-tweaks v{}", env!("CARGO_PKG_VERSION")),
            ])),
        }
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.entries.lock().unwrap().push(message);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
        entries.push("Terminal cleared".to_string());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TerminalLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a file logger under the config directory. The TUI owns the
/// terminal, so stderr is not an option. Failure here is reported to the
/// caller, which runs on without a file logger.
pub fn init_file_logging() -> Result<()> {
    let file = open_log_file(log_dir())?;
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    WriteLogger::init(LevelFilter::Info, config, file)?;
    Ok(())
}

fn open_log_file(mut path: PathBuf) -> Result<fs::File> {
    fs::create_dir_all(&path)?;
    path.push(format!(
        "idevice-tweaks-{}.log",
        chrono::Local::now().format("%Y%m%d")
    ));
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

fn log_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".config");
    path.push("idevice-tweaks");
    path.push("logs");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_accumulates_and_clears() {
        let log = TerminalLog::new();
        assert!(!log.is_empty());
        let banner_lines = log.len();
        log.push("[*] hello");
        assert_eq!(log.len(), banner_lines + 1);
        assert_eq!(log.snapshot().last().unwrap(), "[*] hello");

        log.clear();
        assert_eq!(log.snapshot(), vec!["Terminal cleared".to_string()]);
    }

    #[test]
    fn unusable_log_dir_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the logs directory should go.
        let blocker = dir.path().join("logs");
        fs::write(&blocker, "").unwrap();
        assert!(open_log_file(blocker).is_err());
    }

    #[test]
    fn log_file_is_created_under_the_given_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        open_log_file(logs.clone()).unwrap();
        assert_eq!(fs::read_dir(logs).unwrap().count(), 1);
    }

    #[test]
    fn clones_share_the_buffer() {
        let log = TerminalLog::new();
        let other = log.clone();
        other.push("[*] from the worker");
        assert_eq!(log.snapshot().last().unwrap(), "[*] from the worker");
    }
}
