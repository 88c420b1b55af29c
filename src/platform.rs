//! Host probes used by the precondition gate.
use anyhow::{Context as _, Result};
use std::path::Path;
use std::time::Duration;

/// Read-only questions the engine asks about the host before mutating it.
#[cfg_attr(test, mockall::automock)]
pub trait Probe: Send + Sync {
    /// Whether the process runs with effective uid 0.
    fn is_elevated(&self) -> bool;

    /// Free space in megabytes available to unprivileged users on the
    /// filesystem containing `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem cannot be queried.
    fn free_megabytes(&self, path: &Path) -> Result<u64>;

    /// Device id of the filesystem containing `path`, or `None` if `path`
    /// does not exist.
    fn device_id(&self, path: &Path) -> Option<u64>;

    /// Whether `url` answers an HTTP request within `timeout`. Any HTTP
    /// status counts as reachable.
    fn reachable(&self, url: &str, timeout: Duration) -> bool;
}

/// [`Probe`] that queries the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl Probe for SystemProbe {
    #[allow(unsafe_code)]
    fn is_elevated(&self) -> bool {
        // SAFETY: geteuid has no preconditions and cannot fail.
        unsafe { libc::geteuid() == 0 }
    }

    #[allow(unsafe_code)]
    fn free_megabytes(&self, path: &Path) -> Result<u64> {
        use std::ffi::CString;
        use std::mem::MaybeUninit;
        use std::os::unix::ffi::OsStrExt as _;

        let c_path = CString::new(path.as_os_str().as_bytes())
            .with_context(|| format!("invalid path: {}", path.display()))?;

        // SAFETY: c_path is a valid NUL-terminated string and stat is only
        // read after statvfs reports success.
        let stat = unsafe {
            let mut stat: MaybeUninit<libc::statvfs> = MaybeUninit::uninit();
            if libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) != 0 {
                return Err(std::io::Error::last_os_error())
                    .with_context(|| format!("statvfs failed for {}", path.display()));
            }
            stat.assume_init()
        };

        #[allow(clippy::useless_conversion)]
        let bytes = u64::from(stat.f_bavail).saturating_mul(u64::from(stat.f_frsize));
        Ok(bytes / (1024 * 1024))
    }

    fn device_id(&self, path: &Path) -> Option<u64> {
        use std::os::unix::fs::MetadataExt as _;
        std::fs::metadata(path).ok().map(|m| m.dev())
    }

    fn reachable(&self, url: &str, timeout: Duration) -> bool {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        agent.head(url).call().is_ok()
    }
}
