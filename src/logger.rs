//! Session logger — a `log` backend that writes to one file in the OS data
//! directory.
//!
//! The file is **truncated at each launch**, so it only ever contains output
//! from the most recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PixelGraph\pixelgraph.log`
//!   Linux:    `~/.local/share/PixelGraph/pixelgraph.log`
//!   macOS:    `~/Library/Application Support/PixelGraph/pixelgraph.log`
//!
//! Use the ordinary `log::info!` / `log::warn!` / ... macros anywhere in the
//! crate. Panics are mirrored into the file by a hook installed in [`init`].

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

pub struct SessionLogger {
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
    /// Mirror every record to stderr.
    echo: bool,
    level: LevelFilter,
}

impl SessionLogger {
    /// Open (truncating) `path`. Failure to open is not fatal: the logger
    /// then only echoes, if asked to.
    pub fn open(path: Option<&Path>, echo: bool, level: LevelFilter) -> Self {
        let file = path.and_then(|path| {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)
            {
                Ok(f) => Some(Mutex::new(f)),
                Err(e) => {
                    eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
                    None
                }
            }
        });
        let path = file.as_ref().and(path.map(Path::to_path_buf));
        Self {
            file,
            path,
            echo,
            level,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a line to the file. I/O errors are ignored so that logging never
    /// fails a command.
    fn write_line(&self, line: &str) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] [{}] {}", timestamp(), record.level(), record.args());
        self.write_line(&line);
        if self.echo {
            eprintln!("{}", line);
        }
    }

    fn flush(&self) {
        if let Some(mutex) = &self.file
            && let Ok(mut file) = mutex.lock()
        {
            let _ = file.flush();
        }
    }
}

/// Install the session logger as the global `log` backend. Call once.
///
/// * `to_file` — create (or truncate) the session log file.
/// * `verbose` — mirror records to stderr and lower the level to `Debug`.
///
/// Also installs a panic hook that writes the panic message to the log
/// before running the default handler.
pub fn init(to_file: bool, verbose: bool) -> Option<&'static Path> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let path = to_file.then(log_file_path);
    let logger = LOGGER.get_or_init(|| SessionLogger::open(path.as_deref(), verbose, level));

    if log::set_logger(logger).is_err() {
        return logger.path();
    }
    log::set_max_level(level);

    logger.write_line(&format!(
        "=== PixelGraph session started {} ===",
        human_timestamp()
    ));
    if let Some(path) = logger.path() {
        logger.write_line(&format!("Log file: {}", path.display()));
    }
    logger.write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(logger) = LOGGER.get() {
            logger.write_line(&format!("[{}] [PANIC] {}", timestamp(), info));
        }
        prev(info);
    }));

    logger.path()
}

fn log_file_path() -> PathBuf {
    data_dir().join("PixelGraph").join("pixelgraph.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

/// HH:MM:SS (UTC) within the current day.
fn timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let h = (secs % 86400) / 3600;
            let m = (secs % 3600) / 60;
            let s = secs % 60;
            format!("{:02}:{:02}:{:02}", h, m, s)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

fn human_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => format!("(unix {})", d.as_secs()),
        Err(_) => "(unknown time)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;
    use tempfile::TempDir;

    #[test]
    fn records_are_timestamped_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs").join("session.log");
        let logger = SessionLogger::open(Some(&path), false, LevelFilter::Info);
        assert_eq!(logger.path(), Some(path.as_path()));

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .args(format_args!("wrote {}", "a.png"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("hidden"))
                .build(),
        );
        logger.flush();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("] [INFO] wrote a.png"), "{}", lines[0]);
        assert_eq!(&lines[0][..1], "[");
        assert_eq!(&lines[0][9..10], "]");
    }

    #[test]
    fn no_file_means_no_path() {
        let logger = SessionLogger::open(None, false, LevelFilter::Info);
        assert!(logger.path().is_none());
        logger.write_line("dropped");
    }
}
