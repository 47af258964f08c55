//! Live delay configuration: atomic snapshot handle and FIFO control channel.
//!
//! The pipeline reads the configuration on every scheduling decision, while
//! updates arrive rarely (if ever) through a named FIFO. The handle therefore
//! stores the config behind an [`ArcSwap`]: readers get a complete snapshot,
//! writers replace it wholesale, and no reader can ever observe a half-updated
//! mix of old and new values.
//!
//! Writing four whitespace-separated integers to the FIFO replaces both delay
//! ranges at runtime:
//!
//! ```bash
//! echo "10 20 0 0" > /tmp/lagwire-ctl
//! ```

use crate::delay::{DelayConfig, DelayRange};
use crate::error::{Error, Result};
use arc_swap::ArcSwap;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared handle to the live delay configuration.
///
/// Cloning is cheap; all clones refer to the same configuration.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<DelayConfig>>,
}

impl ConfigHandle {
    /// Create a handle holding the startup configuration.
    pub fn new(config: DelayConfig) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> Arc<DelayConfig> {
        self.inner.load_full()
    }

    /// Atomically replace the configuration.
    pub fn replace(&self, config: DelayConfig) {
        self.inner.store(Arc::new(config));
    }
}

/// Parse a reconfiguration message into a pair of delay ranges.
///
/// The message must contain exactly four whitespace-separated non-negative
/// integers: `min_click max_click min_move max_move`. Each range is clamped
/// so that `max >= min`. Returns `None` for anything else, leaving the caller
/// to keep the previous configuration.
pub fn parse_ranges(message: &str) -> Option<(DelayRange, DelayRange)> {
    let fields: Vec<&str> = message.split_whitespace().collect();
    if fields.len() != 4 {
        return None;
    }

    let mut values = [0u64; 4];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field.parse().ok()?;
    }

    Some((
        DelayRange::new(values[0], values[1]),
        DelayRange::new(values[2], values[3]),
    ))
}

/// A named FIFO through which delay ranges can be adjusted at runtime.
#[derive(Debug, Clone)]
pub struct ControlChannel {
    path: PathBuf,
}

impl ControlChannel {
    /// Create the FIFO, replacing any stale node at the same path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::ControlChannel {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"),
            })?;

        // Remove a leftover FIFO from a previous run; a failure here only
        // matters if mkfifo fails too.
        unsafe {
            libc::unlink(c_path.as_ptr());
        }

        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o666) };
        if rc != 0 {
            return Err(Error::ControlChannel {
                path,
                source: io::Error::last_os_error(),
            });
        }

        Ok(Self { path })
    }

    /// Path of the FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Spawn the listener loop on its own thread.
    ///
    /// Opening a FIFO for reading blocks until a writer connects, so the
    /// loop needs a thread it can park indefinitely; the thread dies with
    /// the process.
    pub fn spawn_listener(&self, handle: ConfigHandle) -> JoinHandle<()> {
        let channel = self.clone();
        thread::spawn(move || channel.listen(handle))
    }

    /// Service loop: wait for writes to the FIFO and apply them.
    ///
    /// Malformed input is rejected with a warning and the previous
    /// configuration stays active; the loop then resumes waiting for the
    /// next write.
    fn listen(self, handle: ConfigHandle) {
        loop {
            let message = match std::fs::read_to_string(&self.path) {
                Ok(message) => message,
                Err(e) => {
                    log::warn!("control channel read failed: {e}");
                    thread::sleep(Duration::from_millis(100));
                    continue;
                }
            };

            if message.trim().is_empty() {
                continue;
            }

            match parse_ranges(&message) {
                Some((click, motion)) => {
                    let updated = handle.current().with_ranges(click, motion);
                    handle.replace(updated);
                    log::debug!(
                        "set new delays: click [{}, {}] motion [{}, {}]",
                        click.min,
                        click.max,
                        motion.min,
                        motion.max
                    );
                }
                None => {
                    log::warn!(
                        "rejected control message {:?}: expected four whitespace-separated integers",
                        message.trim()
                    );
                }
            }
        }
    }

    /// Remove the FIFO node. Called on graceful shutdown.
    pub fn remove(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            log::warn!("failed to remove control channel {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::Distribution;
    use std::thread;

    fn config(click: (u64, u64), motion: (u64, u64)) -> DelayConfig {
        DelayConfig {
            click: DelayRange::new(click.0, click.1),
            motion: DelayRange::new(motion.0, motion.1),
            distribution: Distribution::Uniform,
        }
    }

    #[test]
    fn test_parse_four_integers() {
        let (click, motion) = parse_ranges("10 20 0 0").unwrap();
        assert_eq!(click, DelayRange::new(10, 20));
        assert_eq!(motion, DelayRange::new(0, 0));
    }

    #[test]
    fn test_parse_tolerates_surrounding_whitespace() {
        let (click, motion) = parse_ranges("  5\t10  15 25\n").unwrap();
        assert_eq!(click, DelayRange::new(5, 10));
        assert_eq!(motion, DelayRange::new(15, 25));
    }

    #[test]
    fn test_parse_clamps_inverted_range() {
        let (click, _) = parse_ranges("30 10 0 0").unwrap();
        assert_eq!(click, DelayRange::new(30, 30));
    }

    #[test]
    fn test_parse_rejects_partial_input() {
        assert!(parse_ranges("10 20 0").is_none());
        assert!(parse_ranges("").is_none());
        assert!(parse_ranges("10 20 0 0 5").is_none());
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(parse_ranges("10 20 zero 0").is_none());
        assert!(parse_ranges("10 20 -5 0").is_none());
    }

    #[test]
    fn test_replace_swaps_whole_config() {
        let handle = ConfigHandle::new(config((50, 50), (0, 0)));
        handle.replace(config((10, 20), (1, 2)));
        let current = handle.current();
        assert_eq!(current.click, DelayRange::new(10, 20));
        assert_eq!(current.motion, DelayRange::new(1, 2));
    }

    #[test]
    fn test_concurrent_readers_see_complete_snapshots() {
        let a = config((1, 1), (1, 1));
        let b = config((1000, 1000), (1000, 1000));
        let handle = ConfigHandle::new(a);

        let writer = {
            let handle = handle.clone();
            thread::spawn(move || {
                for i in 0..5000 {
                    handle.replace(if i % 2 == 0 { b } else { a });
                }
            })
        };

        for _ in 0..5000 {
            let snapshot = *handle.current();
            assert!(
                snapshot == a || snapshot == b,
                "observed torn config: {snapshot:?}"
            );
        }

        writer.join().unwrap();
    }

    #[test]
    fn test_fifo_update_applies_and_rejects() {
        let path = std::env::temp_dir().join(format!("lagwire-ctl-{}", std::process::id()));
        let channel = ControlChannel::create(&path).unwrap();
        let handle = ConfigHandle::new(config((50, 50), (0, 0)));

        let _listener = channel.spawn_listener(handle.clone());

        // Opening the FIFO for writing blocks until the listener has opened
        // the read side, so this write is enough to synchronize.
        std::fs::write(&path, "10 20 0 0").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while handle.current().click != DelayRange::new(10, 20) {
            assert!(std::time::Instant::now() < deadline, "update never applied");
            thread::sleep(Duration::from_millis(10));
        }

        // Malformed message: configuration must stay as-is.
        std::fs::write(&path, "10 20 0").unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(handle.current().click, DelayRange::new(10, 20));
        assert_eq!(handle.current().motion, DelayRange::new(0, 0));

        channel.remove();
        assert!(!path.exists());
    }
}
