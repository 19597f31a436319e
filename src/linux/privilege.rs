use anyhow::{bail, Context, Result};
use caps::CapSet;
use log::{debug, info};
use nix::{
    sys::prctl,
    unistd::{self, Gid, Uid, User},
};
use procfs::process::Process;

use crate::error::BiasError;

/// The account to fall back to when the real identity is root as well.
const FALLBACK_USER: &str = "nobody";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeState {
    Elevated,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: Uid,
    pub gid: Gid,
}

/// `Credentials` is the process identity the [PrivilegeManager] operates on.
pub trait Credentials {
    /// `is_elevated` reports whether the effective identity is root.
    fn is_elevated(&self) -> bool;

    /// `drop_target` resolves the unprivileged identity to switch to.
    fn drop_target(&self) -> Result<Identity>;

    /// `switch_to` permanently changes every process identity to `identity`.
    fn switch_to(&mut self, identity: &Identity) -> Result<()>;

    /// `verify_dropped` checks that no privilege survived the switch.
    fn verify_dropped(&self, identity: &Identity) -> Result<()>;
}

/// `PrivilegeManager` owns the only transition of [PrivilegeState],
/// from `Elevated` to `Dropped`. The transition happens once and is never undone.
#[derive(Debug)]
pub struct PrivilegeManager<C: Credentials> {
    credentials: C,
    state: PrivilegeState,
}

impl<C: Credentials> PrivilegeManager<C> {
    /// `verify_elevated` fails with [BiasError::NotPrivileged] unless the
    /// process runs with an effective identity of root.
    pub fn verify_elevated(credentials: C) -> Result<Self, BiasError> {
        if !credentials.is_elevated() {
            return Err(BiasError::NotPrivileged);
        }
        Ok(PrivilegeManager {
            credentials,
            state: PrivilegeState::Elevated,
        })
    }

    pub fn state(&self) -> PrivilegeState {
        self.state
    }

    /// `require_elevated` guards every privileged operation.
    pub fn require_elevated(&self) -> Result<(), BiasError> {
        match self.state {
            PrivilegeState::Elevated => Ok(()),
            PrivilegeState::Dropped => Err(BiasError::NotPrivileged),
        }
    }

    /// `drop_privileges` switches the process to the unprivileged identity and
    /// verifies the switch. The state is `Dropped` from the first step on, so a
    /// failed drop still refuses further privileged operations.
    pub fn drop_privileges(&mut self) -> Result<Identity, BiasError> {
        if self.state == PrivilegeState::Dropped {
            return Err(BiasError::PrivilegeDrop(anyhow::anyhow!(
                "privileges have already been dropped"
            )));
        }
        self.state = PrivilegeState::Dropped;

        let identity = self
            .credentials
            .drop_target()
            .map_err(BiasError::PrivilegeDrop)?;
        if identity.uid.is_root() {
            return Err(BiasError::PrivilegeDrop(anyhow::anyhow!(
                "refusing to drop privileges to root"
            )));
        }

        self.credentials
            .switch_to(&identity)
            .map_err(BiasError::PrivilegeDrop)?;
        self.credentials
            .verify_dropped(&identity)
            .map_err(BiasError::PrivilegeDrop)?;

        info!(
            "dropped privileges to uid {} and gid {}",
            identity.uid, identity.gid
        );
        Ok(identity)
    }
}

/// `ProcessCredentials` is the identity of the running process.
#[derive(Debug, Default)]
pub struct ProcessCredentials;

impl Credentials for ProcessCredentials {
    fn is_elevated(&self) -> bool {
        unistd::geteuid().is_root()
    }

    /// The real identity is the invoking user when the binary is installed
    /// setuid root. Under sudo the real identity is root too, and `nobody` is
    /// used instead.
    fn drop_target(&self) -> Result<Identity> {
        let uid = unistd::getuid();
        let gid = unistd::getgid();
        if !uid.is_root() {
            return Ok(Identity { uid, gid });
        }

        let user = User::from_name(FALLBACK_USER)
            .context(format!("failed to look up the {} user", FALLBACK_USER))?
            .context(format!("the {} user doesn't exist", FALLBACK_USER))?;
        Ok(Identity {
            uid: user.uid,
            gid: user.gid,
        })
    }

    /// For more information, see the [setresuid(2)](https://man7.org/linux/man-pages/man2/setresuid.2.html)
    /// and [capabilities(7)](https://man7.org/linux/man-pages/man7/capabilities.7.html) man pages.
    fn switch_to(&mut self, identity: &Identity) -> Result<()> {
        unistd::setgroups(&[]).context("failed to clear the supplementary groups")?;
        unistd::setresgid(identity.gid, identity.gid, identity.gid)
            .context(format!("failed to set gid to {}", identity.gid))?;
        unistd::setresuid(identity.uid, identity.uid, identity.uid)
            .context(format!("failed to set uid to {}", identity.uid))?;

        prctl::set_keepcaps(false).context("failed to set PR_SET_KEEPCAPS to false")?;
        for cap_set in [
            CapSet::Ambient,
            CapSet::Inheritable,
            CapSet::Effective,
            CapSet::Permitted,
        ] {
            caps::clear(None, cap_set)
                .context(format!("failed to clear the {:?} capabilities", cap_set))?;
        }
        Ok(())
    }

    /// `verify_dropped` reads `/proc/self/status` to make sure the saved and
    /// filesystem ids were switched along with the real and effective ones.
    fn verify_dropped(&self, identity: &Identity) -> Result<()> {
        let status = Process::myself()
            .context("failed to inspect the current process")?
            .status()
            .context("failed to inspect the status of the current process")?;

        let uids = [status.ruid, status.euid, status.suid, status.fuid];
        if uids.iter().any(|uid| *uid != identity.uid.as_raw()) {
            bail!(
                "uids {:?} don't match the target uid {}",
                uids,
                identity.uid
            );
        }
        let gids = [status.rgid, status.egid, status.sgid, status.fgid];
        if gids.iter().any(|gid| *gid != identity.gid.as_raw()) {
            bail!(
                "gids {:?} don't match the target gid {}",
                gids,
                identity.gid
            );
        }

        let effective = caps::read(None, CapSet::Effective)
            .context("failed to read the effective capabilities")?;
        if !effective.is_empty() {
            bail!("effective capabilities remain: {:?}", effective);
        }

        if unistd::setuid(Uid::from_raw(0)).is_ok() {
            bail!("the process can still regain root");
        }
        debug!("verified that root can't be regained");
        Ok(())
    }
}
