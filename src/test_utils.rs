#[cfg(test)]
pub mod tests {
    use std::{cell::RefCell, fs, os::unix, path::Path, path::PathBuf, rc::Rc};

    use anyhow::{bail, Result};
    use nix::unistd::{Gid, Uid};

    use crate::linux::{
        cpu::CONTROL_FILE,
        privilege::{Credentials, Identity},
    };

    #[derive(Debug, Default)]
    struct FakeIdentity {
        elevated: bool,
        switch_count: usize,
    }

    /// `FakeCredentials` records identity switches instead of performing them.
    /// Clones share the same record.
    #[derive(Debug, Clone)]
    pub struct FakeCredentials {
        identity: Rc<RefCell<FakeIdentity>>,
        target: Identity,
        fail_switch: bool,
        fail_verification: bool,
    }

    impl FakeCredentials {
        pub fn root() -> Self {
            Self::new(true)
        }

        pub fn unprivileged() -> Self {
            Self::new(false)
        }

        fn new(elevated: bool) -> Self {
            FakeCredentials {
                identity: Rc::new(RefCell::new(FakeIdentity {
                    elevated,
                    switch_count: 0,
                })),
                target: Self::target(),
                fail_switch: false,
                fail_verification: false,
            }
        }

        pub fn target() -> Identity {
            Identity {
                uid: Uid::from_raw(1000),
                gid: Gid::from_raw(1000),
            }
        }

        pub fn with_target(mut self, target: Identity) -> Self {
            self.target = target;
            self
        }

        pub fn failing_switch(mut self) -> Self {
            self.fail_switch = true;
            self
        }

        pub fn failing_verification(mut self) -> Self {
            self.fail_verification = true;
            self
        }

        pub fn switch_count(&self) -> usize {
            self.identity.borrow().switch_count
        }
    }

    impl Credentials for FakeCredentials {
        fn is_elevated(&self) -> bool {
            self.identity.borrow().elevated
        }

        fn drop_target(&self) -> Result<Identity> {
            Ok(self.target)
        }

        fn switch_to(&mut self, _identity: &Identity) -> Result<()> {
            if self.fail_switch {
                bail!("failed to set uid to {}", self.target.uid);
            }
            let mut identity = self.identity.borrow_mut();
            identity.elevated = false;
            identity.switch_count += 1;
            Ok(())
        }

        fn verify_dropped(&self, _identity: &Identity) -> Result<()> {
            if self.fail_verification || self.is_elevated() {
                bail!("the process can still regain root");
            }
            Ok(())
        }
    }

    /// `control_path` returns the `energy_perf_bias` path of `cpu` under `root`.
    pub fn control_path(root: &Path, cpu: &str) -> PathBuf {
        root.join(cpu).join(CONTROL_FILE)
    }

    /// `test_write_cpu_bias` creates `<root>/<cpu>/power/energy_perf_bias` holding `value`.
    pub fn test_write_cpu_bias(root: &Path, cpu: &str, value: &str) -> PathBuf {
        let path = control_path(root, cpu);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, value).unwrap();
        path
    }

    /// `test_write_unwritable_cpu` makes the control path a directory, which
    /// can't be opened for writing even by root.
    pub fn test_write_unwritable_cpu(root: &Path, cpu: &str) -> PathBuf {
        let path = control_path(root, cpu);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// `test_write_symlinked_cpu` makes the control path a symbolic link to `target`.
    pub fn test_write_symlinked_cpu(root: &Path, cpu: &str, target: &Path) -> PathBuf {
        let path = control_path(root, cpu);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        unix::fs::symlink(target, &path).unwrap();
        path
    }

    pub fn read_bias(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }
}
