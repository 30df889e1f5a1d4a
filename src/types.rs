//! Type-safe vocabulary shared by the detector, registry and executor
//!
//! Closed enums replace the string-keyed dispatch a setup script would use,
//! so every match over a family or action kind is exhaustive.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Package-manager family of the detected host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Debian,
    Redhat,
    Arch,
    Macos,
    Other,
}

impl Family {
    /// Name of the family compatibility phase (e.g. `redhat-compat`)
    pub fn compat_phase(self) -> String {
        format!("{}-compat", self)
    }

    /// Map an os-release `ID` to its family, if it is a known one
    pub fn from_distro_id(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "pop" | "raspbian" | "elementary" | "kali" => {
                Some(Self::Debian)
            }
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "amzn" => {
                Some(Self::Redhat)
            }
            "arch" | "archlinux" | "manjaro" | "endeavouros" => Some(Self::Arch),
            _ => None,
        }
    }
}

/// Primitive action kinds understood by the translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Install system packages through the family package manager
    Install,
    /// Run a shell command verbatim
    Run,
    /// Install Python packages through `<python> -m pip install`
    PipInstall,
    /// Refresh the package manager's repository metadata
    Refresh,
}

impl ActionKind {
    /// Whether the kind has a translation that does not depend on the family
    pub fn is_platform_agnostic(self) -> bool {
        matches!(self, Self::Run)
    }
}

/// Per-action flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ActionOption {
    /// Arch only: install through the configured AUR helper
    FromAur,
    /// A non-zero exit is recorded as skipped instead of failed
    AllowNoop,
}

/// Per-action outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Skipped,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_family_display() {
        assert_eq!(Family::Redhat.to_string(), "redhat");
        assert_eq!(Family::from_str("macos").unwrap(), Family::Macos);
    }

    #[test]
    fn test_compat_phase_names() {
        let names: Vec<String> = Family::iter().map(Family::compat_phase).collect();
        assert_eq!(
            names,
            [
                "debian-compat",
                "redhat-compat",
                "arch-compat",
                "macos-compat",
                "other-compat"
            ]
        );
    }

    #[test]
    fn test_family_from_distro_id() {
        assert_eq!(Family::from_distro_id("ubuntu"), Some(Family::Debian));
        assert_eq!(Family::from_distro_id("centos"), Some(Family::Redhat));
        assert_eq!(Family::from_distro_id("manjaro"), Some(Family::Arch));
        assert_eq!(Family::from_distro_id("gentoo"), None);
    }

    #[test]
    fn test_action_kind_serialization() {
        assert_eq!(ActionKind::PipInstall.to_string(), "pip-install");
        let json = serde_json::to_string(&ActionKind::PipInstall).unwrap();
        assert_eq!(json, "\"pip-install\"");
        assert!(ActionKind::Run.is_platform_agnostic());
        assert!(!ActionKind::Install.is_platform_agnostic());
    }

    #[test]
    fn test_option_parse() {
        assert_eq!(ActionOption::from_str("from-aur").unwrap(), ActionOption::FromAur);
        assert_eq!(ActionOption::AllowNoop.to_string(), "allow-noop");
    }
}
