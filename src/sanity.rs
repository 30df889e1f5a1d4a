//! Pre-flight checks for the runtime environment
//!
//! Verifies that the binaries the plan is about to invoke are on PATH.
//! Nothing here aborts the run: a missing package manager shows up again
//! as a failed action with the spawn error, this only warns earlier.

use crate::action::Translator;
use crate::platform::PlatformInfo;
use crate::registry::Phase;
use crate::types::{ActionKind, ActionOption, Family};
use std::collections::BTreeSet;

/// Result of environment verification
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PreflightReport {
    pub missing_binaries: Vec<String>,
}

impl PreflightReport {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty()
    }
}

/// Binaries the plan needs for `platform`
pub fn required_binaries(
    phases: &[Phase],
    platform: &PlatformInfo,
    translator: &Translator,
) -> BTreeSet<String> {
    let mut needed = BTreeSet::new();

    for action in phases.iter().flat_map(|p| p.actions.iter()) {
        if !action.applies_to(platform) {
            continue;
        }
        match action.kind() {
            ActionKind::Install
                if action.has_option(ActionOption::FromAur) && platform.family() == Family::Arch =>
            {
                needed.insert(translator.aur_helper().to_string());
            }
            ActionKind::Install | ActionKind::Refresh => {
                if let Some(pm) = translator.package_manager(platform.family()) {
                    needed.insert(pm);
                }
            }
            ActionKind::PipInstall => {
                needed.insert(translator.python().to_string());
            }
            ActionKind::Run => {
                needed.insert("sh".to_string());
            }
        }
    }

    needed
}

/// Check that every binary the plan needs can be found
pub fn preflight(
    phases: &[Phase],
    platform: &PlatformInfo,
    translator: &Translator,
) -> PreflightReport {
    let missing_binaries = required_binaries(phases, platform, translator)
        .into_iter()
        .filter(|binary| which::which(binary).is_err())
        .collect::<Vec<_>>();

    for binary in &missing_binaries {
        tracing::warn!("Required binary not found on PATH: {}", binary);
    }

    PreflightReport { missing_binaries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Guard};
    use crate::registry::{PhaseRegistry, COMMON_FIRST, COMMON_LAST};

    fn registry() -> PhaseRegistry {
        let mut reg = PhaseRegistry::new();
        reg.register(COMMON_FIRST, Action::refresh());
        reg.register(COMMON_FIRST, Action::pip_install("wheel"));
        reg.register(
            COMMON_LAST,
            Action::install("lcov-git").from_aur().when(Guard::DistroIs {
                distro: "arch".into(),
            }),
        );
        reg.register(COMMON_LAST, Action::run("true"));
        reg
    }

    #[test]
    fn test_required_binaries_debian() {
        let ubuntu = PlatformInfo::new(Family::Debian, "ubuntu", "22.04", "x86_64");
        let phases = registry().phases_for(&ubuntu);
        let needed = required_binaries(&phases, &ubuntu, &Translator::new());
        let needed: Vec<&str> = needed.iter().map(String::as_str).collect();
        assert_eq!(needed, ["apt-get", "python3", "sh"]);
    }

    #[test]
    fn test_required_binaries_arch_includes_aur_helper() {
        let arch = PlatformInfo::new(Family::Arch, "arch", "", "x86_64");
        let phases = registry().phases_for(&arch);
        let needed = required_binaries(&phases, &arch, &Translator::new().with_aur_helper("paru"));
        assert!(needed.contains("paru"));
        assert!(needed.contains("pacman"));
    }

    #[test]
    fn test_preflight_finds_sh() {
        let mut reg = PhaseRegistry::new();
        reg.register(COMMON_FIRST, Action::run("true"));
        let ubuntu = PlatformInfo::new(Family::Debian, "ubuntu", "22.04", "x86_64");
        let report = preflight(&reg.phases_for(&ubuntu), &ubuntu, &Translator::new());
        assert!(report.is_ok());
    }
}
