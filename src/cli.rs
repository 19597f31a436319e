use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};

use crate::{
    bias::PerfBias,
    error::BiasError,
    linux::{
        cpu::{self, CPU_ROOT},
        privilege::{Credentials, PrivilegeManager},
    },
    report::Report,
};

const EXIT_CODES: &str = "Exit status:
  0   the bias was applied (individual cores may have failed, see stderr)
  1   not running with root privileges
  2   invalid arguments
  3   the value is not a number
  4   the value is not between 1 and 15
  5   energy_perf_bias is not supported on this system
  6   the CPU directory can't be opened
  7   privileges couldn't be dropped
  10  the report couldn't be serialized";

#[derive(Parser, Debug)]
#[clap(version, about, after_long_help = EXIT_CODES)]
pub struct Cli {
    #[arg(
        allow_negative_numbers = true,
        help = "performance bias between 1 (performance) and 15 (power saving)"
    )]
    pub value: String,

    #[arg(long, help = "print the confirmation as a JSON object")]
    pub json: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "increase the log verbosity")]
    pub verbose: u8,

    #[arg(short, long, help = "only print fatal errors")]
    pub quiet: bool,

    #[arg(long, hide = true, default_value = CPU_ROOT)]
    pub cpu_root: PathBuf,
}

/// `usage_error` picks the error reported for unparseable arguments.
/// Privilege is checked first, as it is for a well-formed invocation.
pub fn usage_error<C: Credentials>(credentials: &C) -> BiasError {
    if credentials.is_elevated() {
        BiasError::BadArgumentCount
    } else {
        BiasError::NotPrivileged
    }
}

/// `set` applies the performance bias to every core under `cpu_root`:
/// it verifies privilege, validates `value`, probes for support,
/// writes every core, and drops privilege once the writes are done.
pub fn set<C: Credentials>(
    cpu_root: &Path,
    value: &str,
    credentials: C,
) -> Result<Report, BiasError> {
    let mut privilege = PrivilegeManager::verify_elevated(credentials)?;
    let bias: PerfBias = value.parse()?;

    if !cpu::is_supported(cpu_root) {
        return Err(BiasError::Unsupported);
    }

    let summary = cpu::set_perf_bias(cpu_root, bias, &privilege)?;
    info!(
        "wrote {} of {} control files under {}",
        summary.written,
        summary.attempted,
        cpu_root.display()
    );

    privilege.drop_privileges()?;
    debug!("privilege state is now {:?}", privilege.state());
    Ok(Report { bias, summary })
}
