use std::{
    fs::{self, OpenOptions},
    io::Write,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use log::{debug, error, warn};
use nix::fcntl::OFlag;
use serde::Serialize;

use crate::{
    bias::PerfBias,
    error::BiasError,
    linux::privilege::{Credentials, PrivilegeManager},
};

pub const CPU_ROOT: &str = "/sys/devices/system/cpu";
pub const CONTROL_FILE: &str = "power/energy_perf_bias";

const CORE_PREFIX: &str = "cpu";
const MAX_ENTRY_NAME_LEN: usize = 16;
const MAX_CONTROL_PATH_LEN: usize = 256;

/// `is_core_name` matches directory entries such as `cpu0` or `cpu127`,
/// but not `cpufreq`, `cpuidle` or anything implausibly long.
fn is_core_name(name: &str) -> bool {
    if name.len() > MAX_ENTRY_NAME_LEN {
        return false;
    }
    match name.strip_prefix(CORE_PREFIX) {
        Some(id) => !id.is_empty() && id.bytes().all(|byte| byte.is_ascii_digit()),
        None => false,
    }
}

/// `ControlPaths` yields the `energy_perf_bias` path of every core listed
/// under the CPU root, in directory order.
/// The sequence is consumed once; enumerate again with [ControlPaths::open].
#[derive(Debug)]
pub struct ControlPaths {
    root: PathBuf,
    entries: fs::ReadDir,
}

impl ControlPaths {
    pub fn open(root: &Path) -> Result<Self, BiasError> {
        let entries = fs::read_dir(root).map_err(|source| BiasError::Enumeration {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(ControlPaths {
            root: root.to_path_buf(),
            entries,
        })
    }
}

impl Iterator for ControlPaths {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("failed to read an entry of {}: {}", self.root.display(), err);
                    continue;
                }
            };

            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_core_name(name) {
                if name.starts_with(CORE_PREFIX) {
                    debug!("skipping {:?}", name);
                }
                continue;
            }

            let path = entry.path().join(CONTROL_FILE);
            if path.as_os_str().len() > MAX_CONTROL_PATH_LEN {
                warn!("skipping {}: the path is too long", path.display());
                continue;
            }
            return Some(path);
        }
        None
    }
}

/// `is_supported` reports whether at least one core under `root` exposes
/// `energy_perf_bias`. It only tests for existence and never writes.
pub fn is_supported(root: &Path) -> bool {
    match ControlPaths::open(root) {
        Ok(mut paths) => paths.any(|path| matches!(path.try_exists(), Ok(true))),
        Err(err) => {
            debug!("{}", err);
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
}

/// `write_control_file` writes `bias` to a single control file.
/// `O_NOFOLLOW` makes the open fail if the control file has been replaced by
/// a symbolic link.
fn write_control_file(path: &Path, bias: PerfBias) -> Result<(), BiasError> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .custom_flags((OFlag::O_NOFOLLOW | OFlag::O_CLOEXEC).bits())
        .open(path)
        .map_err(|source| BiasError::PathOpen {
            path: path.to_path_buf(),
            source,
        })?;

    file.write_all(bias.to_string().as_bytes())
        .map_err(|source| BiasError::PathWrite {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(())
}

/// `set_perf_bias` writes `bias` to the control file of every core under `root`.
/// A core that rejects the write is logged and skipped. Only failing to open
/// `root` itself, or losing privilege midway, aborts the operation, so a
/// returned [WriteSummary] means success even when `failed` isn't zero.
pub fn set_perf_bias<C: Credentials>(
    root: &Path,
    bias: PerfBias,
    privilege: &PrivilegeManager<C>,
) -> Result<WriteSummary, BiasError> {
    let mut summary = WriteSummary::default();
    for path in ControlPaths::open(root)? {
        privilege.require_elevated()?;

        summary.attempted += 1;
        match write_control_file(&path, bias) {
            Ok(()) => {
                debug!("set {} to {}", path.display(), bias);
                summary.written += 1;
            }
            Err(err) => {
                error!("{}", err);
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}
