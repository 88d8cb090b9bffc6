//! Runtime measurements attached to end-of-invocation records

use crate::HandlerError;
use once_cell::sync::Lazy;
use std::time::Instant;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Pin the process start instant.
///
/// Call as early as possible in `main`; otherwise the first probe created
/// marks the start.
pub fn mark_process_start() {
    Lazy::force(&PROCESS_START);
}

/// Source of execution time and memory measurements
pub trait RuntimeProbe: Send + Sync {
    /// Seconds elapsed since the invocation started
    fn elapsed_seconds(&self) -> f64;

    /// Peak resident memory of the process, in bytes
    fn peak_memory_bytes(&self) -> Result<u64, HandlerError>;
}

/// Probe measuring the current process
#[derive(Debug, Clone, Copy)]
pub struct ProcessProbe {
    started: Instant,
}

impl ProcessProbe {
    /// Probe measuring time since [`mark_process_start`]
    pub fn new() -> Self {
        Self {
            started: *PROCESS_START,
        }
    }

    /// Probe measuring time since `started`
    pub fn since(started: Instant) -> Self {
        Self { started }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeProbe for ProcessProbe {
    fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn peak_memory_bytes(&self) -> Result<u64, HandlerError> {
        peak_rss_bytes()
    }
}

#[cfg(unix)]
fn peak_rss_bytes() -> Result<u64, HandlerError> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();

    // SAFETY: getrusage only writes into the provided struct
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return Err(HandlerError::unavailable(
            "memoryPeakUsageBytes",
            std::io::Error::last_os_error().to_string(),
        ));
    }

    // SAFETY: initialized by the successful call above
    let max_rss = unsafe { usage.assume_init() }.ru_maxrss;
    let max_rss = u64::try_from(max_rss).unwrap_or(0);

    // ru_maxrss is reported in bytes on macOS, kilobytes elsewhere
    if cfg!(target_os = "macos") {
        Ok(max_rss)
    } else {
        Ok(max_rss.saturating_mul(1024))
    }
}

#[cfg(not(unix))]
fn peak_rss_bytes() -> Result<u64, HandlerError> {
    Err(HandlerError::unavailable(
        "memoryPeakUsageBytes",
        "not supported on this platform",
    ))
}
