//! Rotating file sink with size-based rotation
//!
//! The active file is renamed to `<path>.<YYYYmmdd-HHMMSS.ffffff>` once the
//! next entry would push it past the configured size, and a fresh file is
//! opened at the original path. Rotated files can be gzip-compressed on a
//! background thread and announced through a rotation callback.

use crate::core::error::{stderr_handler, ErrorHandler, LoggerError, Result};
use crate::core::log_entry::LogEntry;
use crate::core::output_format::OutputFormat;
use crate::core::sink::Sink;
use crate::core::timestamp::{rotation_suffix, TimestampFormat};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Called on a background thread with the path of each rotated artifact
/// (the `.gz` path when compression succeeded).
pub type RotateCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

const COMPRESS_BUFFER_SIZE: usize = 64 * 1024;

/// Configuration for rotating file sink
///
/// # Examples
///
/// ```
/// use vlog::RotationPolicy;
///
/// // Rotate at 50 MB and gzip the rotated files
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_compression(true);
///
/// assert!(RotationPolicy::never().max_size == 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size in bytes the active file may not exceed; 0 disables rotation
    pub max_size: u64,
    /// Whether to compress rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024, // 10 MB
            compress: false,
        }
    }
}

impl RotationPolicy {
    /// Create a new rotation policy with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Never rotate (useful when external rotation is used)
    #[must_use]
    pub fn never() -> Self {
        Self {
            max_size: 0,
            compress: false,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

struct FileState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    closed: bool,
}

/// File sink that rotates by size
///
/// # Examples
///
/// ```no_run
/// use vlog::{RotatingFileSink, RotationPolicy};
/// use std::sync::Arc;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(100 * 1024 * 1024)
///     .with_compression(true);
/// let sink = RotatingFileSink::with_policy("/var/log/app.log", policy)
///     .unwrap()
///     .on_rotate(Arc::new(|rotated| println!("rotated to {}", rotated.display())));
/// ```
pub struct RotatingFileSink {
    path: PathBuf,
    name: String,
    policy: RotationPolicy,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
    state: Mutex<FileState>,
    rotations: AtomicU64,
    on_rotate: RwLock<Option<RotateCallback>>,
    on_error: ErrorHandler,
    /// Compression and callback threads not yet joined
    jobs: Mutex<Vec<JoinHandle<()>>>,
}

impl RotatingFileSink {
    /// Open `path` for appending with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Open `path` for appending with a custom policy
    ///
    /// Missing parent directories are created. The size counter starts at
    /// the length of any existing file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::file_sink(
                    path.display().to_string(),
                    format!("Failed to create directory '{}': {}", parent.display(), e),
                )
            })?;
        }

        let file = open_append(&path)?;
        let current_size = file_len(&path, &file)?;

        Ok(Self {
            name: format!("file:{}", path.display()),
            path,
            policy,
            output_format: OutputFormat::default(),
            timestamp_format: TimestampFormat::default(),
            state: Mutex::new(FileState {
                writer: Some(BufWriter::new(file)),
                current_size,
                closed: false,
            }),
            rotations: AtomicU64::new(0),
            on_rotate: RwLock::new(None),
            on_error: stderr_handler(),
            jobs: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn on_rotate(self, callback: RotateCallback) -> Self {
        self.set_rotate_callback(callback);
        self
    }

    /// Receiver for compression failures, which never reach the dispatcher
    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    /// Register the rotation callback; applies to later rotations only.
    pub fn set_rotate_callback(&self, callback: RotateCallback) {
        *self.on_rotate.write() = Some(callback);
    }

    /// Length of the active file, including bytes it held when opened
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Number of successful rotations
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    fn needs_rotation(&self, current_size: u64, incoming: u64) -> bool {
        self.policy.max_size > 0
            && current_size > 0
            && current_size + incoming > self.policy.max_size
    }

    /// First free `<path>.<suffix>[-N]` name, also avoiding compressed leftovers
    fn rotation_target(&self) -> PathBuf {
        let base = append_to_path(&self.path, &format!(".{}", rotation_suffix(&Utc::now())));
        let mut candidate = base.clone();
        let mut n = 1;
        while candidate.exists() || gz_path(&candidate).exists() {
            candidate = append_to_path(&base, &format!("-{}", n));
            n += 1;
        }
        candidate
    }

    /// Open the active path and resync the size counter with the file on disk.
    fn reopen(&self, state: &mut FileState) -> Result<()> {
        let file = open_append(&self.path)?;
        state.current_size = file_len(&self.path, &file)?;
        state.writer = Some(BufWriter::new(file));
        Ok(())
    }

    /// Move the active file aside and start a new one.
    ///
    /// On failure the original path is reopened and writing continues
    /// un-rotated; the next write that crosses the threshold retries.
    fn rotate(&self, state: &mut FileState) -> Result<PathBuf> {
        let flushed = match state.writer.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        };

        let target = self.rotation_target();
        let renamed = flushed.and_then(|()| fs::rename(&self.path, &target));

        if let Err(e) = renamed {
            self.reopen(state)?;
            return Err(LoggerError::file_rotation(
                self.path.display().to_string(),
                format!("Failed to rotate to '{}': {}", target.display(), e),
            ));
        }

        self.reopen(state)?;
        self.rotations.fetch_add(1, Ordering::Relaxed);
        Ok(target)
    }

    /// Compress and announce a rotated file off the dispatcher thread.
    fn spawn_post_rotation(&self, rotated: PathBuf) {
        let callback = self.on_rotate.read().clone();
        if !self.policy.compress && callback.is_none() {
            return;
        }

        let compress = self.policy.compress;
        let on_error = Arc::clone(&self.on_error);
        let display = rotated.display().to_string();

        let spawned = thread::Builder::new()
            .name("vlog-rotate".to_string())
            .spawn(move || {
                let artifact = if compress {
                    match compress_file(&rotated, &on_error) {
                        Ok(gz) => gz,
                        Err(e) => {
                            on_error(&e);
                            rotated
                        }
                    }
                } else {
                    rotated
                };

                if let Some(callback) = callback {
                    callback(artifact);
                }
            });

        match spawned {
            Ok(handle) => {
                let mut jobs = self.jobs.lock();
                jobs.retain(|job| !job.is_finished());
                jobs.push(handle);
            }
            Err(e) => (self.on_error)(&LoggerError::io_operation(
                "spawning rotation job",
                format!("'{}' left uncompressed", display),
                e,
            )),
        }
    }

    fn append(&self, state: &mut FileState, bytes: &[u8]) -> Result<()> {
        if state.writer.is_none() {
            self.reopen(state)?;
        }
        if let Some(ref mut writer) = state.writer {
            writer.write_all(bytes).map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to write log entry: {}", e),
                )
            })?;
            state.current_size += bytes.len() as u64;
        }
        Ok(())
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let line = self.output_format.format(entry, &self.timestamp_format)?;

        let mut state = self.state.lock();
        if state.closed {
            return Err(LoggerError::LoggerClosed);
        }

        let mut rotation_error = None;
        if self.needs_rotation(state.current_size, line.len() as u64) {
            match self.rotate(&mut state) {
                Ok(rotated) => self.spawn_post_rotation(rotated),
                Err(e) => rotation_error = Some(e),
            }
        }

        self.append(&mut state, line.as_bytes())?;

        match rotation_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(ref mut writer) = state.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let flushed = {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            match state.writer.take() {
                Some(mut writer) => writer.flush().map_err(|e| {
                    LoggerError::file_sink(
                        self.path.display().to_string(),
                        format!("Failed to flush on close: {}", e),
                    )
                }),
                None => Ok(()),
            }
        };

        let jobs = std::mem::take(&mut *self.jobs.lock());
        for job in jobs {
            if job.join().is_err() {
                (self.on_error)(&LoggerError::other(format!(
                    "Rotation job for '{}' panicked",
                    self.path.display()
                )));
            }
        }

        flushed
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        // no-op when the owning logger already closed this sink
        let _ = self.close();
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })
}

fn file_len(path: &Path, file: &File) -> Result<u64> {
    file.metadata().map(|m| m.len()).map_err(|e| {
        LoggerError::file_sink(
            path.display().to_string(),
            format!("Cannot access file metadata: {}", e),
        )
    })
}

fn append_to_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn gz_path(path: &Path) -> PathBuf {
    append_to_path(path, ".gz")
}

/// Gzip `path` into `<path>.gz` through a temporary file, then remove `path`.
///
/// The original is only deleted once the compressed file is complete.
fn compress_file(path: &Path, on_error: &ErrorHandler) -> Result<PathBuf> {
    let gz = gz_path(path);
    let temp = append_to_path(path, ".gz.tmp");
    let fail = |message: String| {
        let _ = fs::remove_file(&temp);
        LoggerError::compression(path.display().to_string(), message)
    };

    let input = File::open(path).map_err(|e| fail(format!("Failed to open for reading: {}", e)))?;
    let mut reader = BufReader::with_capacity(COMPRESS_BUFFER_SIZE, input);

    let output = File::create(&temp).map_err(|e| {
        fail(format!("Failed to create '{}': {}", temp.display(), e))
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(COMPRESS_BUFFER_SIZE, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; COMPRESS_BUFFER_SIZE];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| fail(format!("Failed to read: {}", e)))?;
        if read == 0 {
            break;
        }
        encoder
            .write_all(&buffer[..read])
            .map_err(|e| fail(format!("Failed to compress data chunk: {}", e)))?;
    }

    encoder
        .finish()
        .and_then(|mut inner| inner.flush())
        .map_err(|e| fail(format!("Failed to finish compression: {}", e)))?;

    fs::rename(&temp, &gz).map_err(|e| {
        fail(format!("Failed to rename to '{}': {}", gz.display(), e))
    })?;

    if let Err(e) = fs::remove_file(path) {
        // the archive is complete, so only the duplicate remains
        on_error(&LoggerError::compression(
            path.display().to_string(),
            format!("Compressed but failed to remove original: {}", e),
        ));
    }

    Ok(gz)
}
