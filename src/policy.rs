//! Built-in setup policy
//!
//! Build prerequisites for a C module with a Python flow-test suite: a
//! compiler toolchain, git/jq/curl, lcov for coverage and the Python test
//! tools. Used when no setup file is given on the command line.
//!
//! Helper scripts are referenced through the `{readies}` placeholder and the
//! interpreter through `{python}`; both are resolved by the translator.

use crate::action::{Action, Guard, PackageOverride};
use crate::config_file::SetupConfig;
use crate::registry::{COMMON_FIRST, COMMON_LAST};

/// lcov is not packaged for CentOS 8; this RPM is installed instead
pub const CENTOS8_LCOV_RPM: &str = "https://pkgs.dyn.su/el8/base/x86_64/lcov-1.14-3.el8.noarch.rpm";

/// GNU userland expected by the build scripts on macOS
const GNU_UTILS: &[&str] = &["make", "coreutils", "findutils", "gnu-sed", "gnu-tar", "gawk"];

/// Python requirements for the flow tests
pub const FLOW_TEST_REQUIREMENTS: &str = "tests/flow/requirements.txt";

/// The default policy.
pub fn default_config() -> SetupConfig {
    let mut config = SetupConfig::new();

    config
        .add(COMMON_FIRST, Action::pip_install("wheel"))
        .add(COMMON_FIRST, Action::pip_install("setuptools --upgrade"))
        .add(COMMON_FIRST, Action::install("git jq curl"))
        .add(COMMON_FIRST, Action::run("{readies}/bin/getgcc"));

    config
        .add("redhat-compat", Action::install("redhat-lsb-core"))
        .add("redhat-compat", Action::run("{readies}/bin/getepel"));

    config.add("fedora", Action::install("python3-networkx"));

    let gnu_utils: Vec<String> = GNU_UTILS.iter().map(|s| s.to_string()).collect();
    config.add("macos", Action::install(gnu_utils));

    config
        .add(
            COMMON_LAST,
            Action::install("lcov").when(Guard::DistroIsNot {
                distro: "arch".into(),
            }),
        )
        .add(
            COMMON_LAST,
            Action::install("lcov-git").from_aur().when(Guard::DistroIs {
                distro: "arch".into(),
            }),
        )
        .add(COMMON_LAST, Action::run("{python} {readies}/bin/getrmpytools"))
        .add(
            COMMON_LAST,
            Action::pip_install(format!("-r {}", FLOW_TEST_REQUIREMENTS).as_str()),
        );

    config.overrides.push(PackageOverride {
        distro: "centos".into(),
        version: "8".into(),
        package: "lcov".into(),
        replacement: CENTOS8_LCOV_RPM.into(),
    });

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformInfo;
    use crate::types::{ActionKind, Family};

    fn rendered(platform: &PlatformInfo) -> Vec<String> {
        let config = default_config();
        let translator = config.translator();
        config
            .to_registry()
            .phases_for(platform)
            .iter()
            .flat_map(|phase| phase.actions.iter())
            .filter(|a| a.applies_to(platform))
            .map(|a| translator.translate(a, platform).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(default_config().validate().is_ok());
    }

    #[test]
    fn test_fedora_plan() {
        let fedora = PlatformInfo::new(Family::Redhat, "fedora", "39", "x86_64");
        let cmds = rendered(&fedora);
        assert_eq!(cmds[0], "yum makecache");
        assert!(cmds.contains(&"yum install -y redhat-lsb-core".to_string()));
        assert!(cmds.contains(&"yum install -y python3-networkx".to_string()));
        assert!(cmds.contains(&"yum install -y lcov".to_string()));
        assert_eq!(cmds.last().unwrap(), "python3 -m pip install -r tests/flow/requirements.txt");
    }

    #[test]
    fn test_centos8_uses_lcov_rpm() {
        let centos = PlatformInfo::new(Family::Redhat, "centos", "8", "x86_64");
        let cmds = rendered(&centos);
        assert!(cmds.contains(&format!("yum install -y {}", CENTOS8_LCOV_RPM)));
        assert!(!cmds.contains(&"yum install -y python3-networkx".to_string()));
    }

    #[test]
    fn test_arch_uses_aur_lcov() {
        let arch = PlatformInfo::new(Family::Arch, "arch", "", "x86_64");
        let cmds = rendered(&arch);
        assert!(cmds.contains(&"yay -S --noconfirm lcov-git".to_string()));
        assert!(!cmds.iter().any(|c| c == "pacman -S --noconfirm lcov"));
    }

    #[test]
    fn test_macos_installs_gnu_utils() {
        let macos = PlatformInfo::macos("14.2", "aarch64");
        let cmds = rendered(&macos);
        assert!(cmds.contains(
            &"brew install make coreutils findutils gnu-sed gnu-tar gawk".to_string()
        ));
        assert!(cmds.contains(&"brew install lcov".to_string()));
    }

    #[test]
    fn test_common_first_order() {
        let config = default_config();
        let kinds: Vec<ActionKind> = config.phases[COMMON_FIRST].iter().map(|a| a.kind()).collect();
        assert_eq!(
            kinds,
            [
                ActionKind::PipInstall,
                ActionKind::PipInstall,
                ActionKind::Install,
                ActionKind::Run
            ]
        );
    }
}
