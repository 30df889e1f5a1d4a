//! Host platform detection
//!
//! Identifies the operating system, package-manager family, distribution,
//! release and CPU architecture exactly once at startup.
//!
//! # Design
//!
//! - **Never partial**: an unknown distribution becomes family `other` with
//!   whatever fields could be read; only an unrecognized OS is an error
//! - **Deterministic**: parsing is separated from file access so a fixed
//!   os-release text always yields the same `PlatformInfo`
//! - **Immutable**: `PlatformInfo` has no setters and is passed by reference

use crate::error::{Result, SetupError};
use crate::types::Family;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::process::Command;

/// os-release locations, in lookup order
const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Distributions whose release is compared by major version only
const MAJOR_VERSION_DISTROS: &[&str] = &["centos", "rhel", "rocky", "almalinux", "ol"];

/// Detected host facts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformInfo {
    os: String,
    family: Family,
    distro: String,
    version: String,
    arch: String,
}

impl PlatformInfo {
    /// Build a platform description directly.
    ///
    /// The OS is derived from the family: `macos` for the macOS family,
    /// `linux` for everything else.
    pub fn new(
        family: Family,
        distro: impl Into<String>,
        version: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        let os = match family {
            Family::Macos => "macos",
            _ => "linux",
        };
        Self {
            os: os.to_string(),
            family,
            distro: distro.into(),
            version: version.into(),
            arch: arch.into(),
        }
    }

    /// Describe a Linux host from the text of its os-release file.
    pub fn from_os_release(content: &str, arch: &str) -> Self {
        let vars = parse_os_release(content);
        let distro = vars.get("ID").cloned().unwrap_or_default().to_lowercase();

        let family = Family::from_distro_id(&distro)
            .or_else(|| {
                vars.get("ID_LIKE").and_then(|like| {
                    like.split_whitespace()
                        .find_map(|id| Family::from_distro_id(&id.to_lowercase()))
                })
            })
            .unwrap_or(Family::Other);

        let mut version = vars.get("VERSION_ID").cloned().unwrap_or_default();
        if MAJOR_VERSION_DISTROS.contains(&distro.as_str()) {
            if let Some(major) = version.split('.').next() {
                version = major.to_string();
            }
        }

        Self::new(family, distro, version, arch)
    }

    /// Describe a macOS host with the given product version.
    pub fn macos(version: &str, arch: &str) -> Self {
        Self::new(Family::Macos, "macos", version.trim(), arch)
    }

    /// Operating system name (`linux` or `macos`)
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Package-manager family
    pub fn family(&self) -> Family {
        self.family
    }

    /// Distribution ID (e.g. `ubuntu`, `centos`, `macos`); empty if unknown
    pub fn distro(&self) -> &str {
        &self.distro
    }

    /// Distribution release (e.g. `22.04`, `8`); empty if unknown
    pub fn version(&self) -> &str {
        &self.version
    }

    /// CPU architecture as reported by the toolchain (e.g. `x86_64`)
    pub fn arch(&self) -> &str {
        &self.arch
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distro = if self.distro.is_empty() { "unknown" } else { &self.distro };
        write!(f, "{}/{} {}", self.os, distro, self.family)?;
        if !self.version.is_empty() {
            write!(f, " {}", self.version)?;
        }
        write!(f, " ({})", self.arch)
    }
}

// ============================================================================
// Detection Functions
// ============================================================================

/// Detect the current host.
///
/// # Errors
///
/// `SetupError::Detection` when the OS is neither Linux nor macOS. Missing
/// os-release files or a failing `sw_vers` do not error; the corresponding
/// fields are left empty.
pub fn detect() -> Result<PlatformInfo> {
    let info = detect_for(std::env::consts::OS, std::env::consts::ARCH)?;
    tracing::info!(platform = %info, "Detected platform");
    Ok(info)
}

/// Detect for an explicit OS signal and architecture.
pub fn detect_for(os: &str, arch: &str) -> Result<PlatformInfo> {
    match os {
        "linux" => Ok(PlatformInfo::from_os_release(&read_os_release(), arch)),
        "macos" => Ok(PlatformInfo::macos(&macos_product_version(), arch)),
        other => Err(SetupError::detection(format!(
            "unrecognized operating system '{}'",
            other
        ))),
    }
}

fn read_os_release() -> String {
    for path in OS_RELEASE_PATHS {
        match fs::read_to_string(path) {
            Ok(content) => return content,
            Err(e) => tracing::debug!("Cannot read {}: {}", path, e),
        }
    }
    tracing::warn!("No os-release file found, distribution will be unknown");
    String::new()
}

fn macos_product_version() -> String {
    match Command::new("sw_vers").arg("-productVersion").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            tracing::warn!("sw_vers exited with {}", output.status);
            String::new()
        }
        Err(e) => {
            tracing::warn!("Failed to run sw_vers: {}", e);
            String::new()
        }
    }
}

/// Parse os-release `KEY=value` lines, stripping quotes and comments.
fn parse_os_release(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }

    vars
}
