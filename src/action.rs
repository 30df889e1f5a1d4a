//! Action vocabulary and per-family translation
//!
//! An `Action` is an abstract setup step ("install git", "pip-install wheel").
//! The `Translator` turns it into the `ConcreteCommand` for the detected
//! package-manager family.
//!
//! # Translation Table
//!
//! | Family | install | run | pip-install | refresh |
//! |--------|---------|-----|-------------|---------|
//! | debian | `apt-get install -y` | `sh -c` | `<python> -m pip install` | `apt-get update -qq` |
//! | redhat | `yum`/`dnf install -y` | `sh -c` | same | `yum`/`dnf makecache` |
//! | arch   | `pacman -S --noconfirm` (AUR helper with `from-aur`) | `sh -c` | same | `pacman -Sy` |
//! | macos  | `brew install` | `sh -c` | same | `brew update` |
//! | other  | unsupported | `sh -c` | unsupported | unsupported |
//!
//! There is no fallback guessing: a family missing from the table is an
//! `UnsupportedPlatform` error. The only exception to the family default is
//! the sparse `PackageOverrides` map keyed by exact distro and release.

use crate::error::{Result, SetupError};
use crate::platform::PlatformInfo;
use crate::types::{ActionKind, ActionOption, Family};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use strum::{Display, EnumString};

// ============================================================================
// Actions
// ============================================================================

/// Package list, command line or pip spec carried by an action.
///
/// Install and pip-install split a single string on whitespace, and each
/// list item the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    One(String),
    Many(Vec<String>),
}

impl Payload {
    /// Individual words (packages or pip arguments)
    pub fn words(&self) -> Vec<String> {
        match self {
            Self::One(s) => s.split_whitespace().map(String::from).collect(),
            Self::Many(items) => items
                .iter()
                .flat_map(|s| s.split_whitespace())
                .map(String::from)
                .collect(),
        }
    }

    /// Payload as one command line
    pub fn text(&self) -> String {
        match self {
            Self::One(s) => s.trim().to_string(),
            Self::Many(items) => items.join(" "),
        }
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<Vec<String>> for Payload {
    fn from(items: Vec<String>) -> Self {
        Self::Many(items)
    }
}

/// Platform condition attached to an action.
///
/// An action whose guard does not match is reported as skipped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Guard {
    DistroIs { distro: String },
    DistroIsNot { distro: String },
    ReleaseIs { distro: String, version: String },
    ReleaseIsNot { distro: String, version: String },
    FamilyIs { family: Family },
}

impl Guard {
    pub fn matches(&self, platform: &PlatformInfo) -> bool {
        match self {
            Self::DistroIs { distro } => platform.distro() == distro,
            Self::DistroIsNot { distro } => platform.distro() != distro,
            Self::ReleaseIs { distro, version } => {
                platform.distro() == distro && platform.version() == version
            }
            Self::ReleaseIsNot { distro, version } => {
                !(platform.distro() == distro && platform.version() == version)
            }
            Self::FamilyIs { family } => platform.family() == *family,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DistroIs { distro } => write!(f, "distro == {}", distro),
            Self::DistroIsNot { distro } => write!(f, "distro != {}", distro),
            Self::ReleaseIs { distro, version } => write!(f, "release == {} {}", distro, version),
            Self::ReleaseIsNot { distro, version } => {
                write!(f, "release != {} {}", distro, version)
            }
            Self::FamilyIs { family } => write!(f, "family == {}", family),
        }
    }
}

/// One abstract setup step.
///
/// Built with the constructors and the consuming option methods, then handed
/// to the registry; there are no setters afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    kind: ActionKind,
    payload: Payload,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    options: BTreeSet<ActionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guard: Option<Guard>,
}

impl Action {
    pub fn new(kind: ActionKind, payload: impl Into<Payload>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            options: BTreeSet::new(),
            guard: None,
        }
    }

    pub fn install(packages: impl Into<Payload>) -> Self {
        Self::new(ActionKind::Install, packages)
    }

    pub fn run(command: impl Into<Payload>) -> Self {
        Self::new(ActionKind::Run, command)
    }

    pub fn pip_install(spec: impl Into<Payload>) -> Self {
        Self::new(ActionKind::PipInstall, spec)
    }

    pub fn refresh() -> Self {
        Self::new(ActionKind::Refresh, Payload::Many(Vec::new()))
    }

    /// Install through the AUR helper on Arch-family hosts
    pub fn from_aur(self) -> Self {
        self.with_option(ActionOption::FromAur)
    }

    /// Treat a non-zero exit as skipped
    pub fn allow_noop(self) -> Self {
        self.with_option(ActionOption::AllowNoop)
    }

    pub fn with_option(mut self, option: ActionOption) -> Self {
        self.options.insert(option);
        self
    }

    /// Only run when `guard` matches the platform
    pub fn when(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn has_option(&self, option: ActionOption) -> bool {
        self.options.contains(&option)
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    /// The action with its payload in the form it is passed on: words for
    /// install and pip-install, one line for run. Used to detect duplicates.
    pub fn normalized(&self) -> Action {
        let payload = match self.kind {
            ActionKind::Install | ActionKind::PipInstall => Payload::Many(self.payload.words()),
            ActionKind::Run | ActionKind::Refresh => Payload::One(self.payload.text()),
        };
        Action {
            payload,
            ..self.clone()
        }
    }

    /// Evaluate the guard; an unguarded action always applies.
    pub fn applies_to(&self, platform: &PlatformInfo) -> bool {
        self.guard.as_ref().is_none_or(|g| g.matches(platform))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.payload.text())?;
        for option in &self.options {
            write!(f, " [{}]", option)?;
        }
        Ok(())
    }
}

// ============================================================================
// Package Overrides
// ============================================================================

/// Replace one package with another spec on an exact distro release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageOverride {
    pub distro: String,
    pub version: String,
    pub package: String,
    pub replacement: String,
}

/// Sparse override map consulted before the family default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageOverrides {
    map: HashMap<(String, String), HashMap<String, String>>,
}

impl PackageOverrides {
    pub fn insert(&mut self, o: PackageOverride) {
        self.map
            .entry((o.distro, o.version))
            .or_default()
            .insert(o.package, o.replacement);
    }

    /// Replacement for `package` on this platform, or the package itself.
    pub fn resolve<'a>(&'a self, platform: &PlatformInfo, package: &'a str) -> &'a str {
        let key = (platform.distro().to_string(), platform.version().to_string());
        self.map
            .get(&key)
            .and_then(|pkgs| pkgs.get(package))
            .map(String::as_str)
            .unwrap_or(package)
    }
}

impl FromIterator<PackageOverride> for PackageOverrides {
    fn from_iter<I: IntoIterator<Item = PackageOverride>>(iter: I) -> Self {
        let mut overrides = Self::default();
        for o in iter {
            overrides.insert(o);
        }
        overrides
    }
}

// ============================================================================
// Concrete Commands
// ============================================================================

/// How a concrete command is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Program plus argument vector, no shell involved
    Exec { program: String, args: Vec<String> },
    /// Command line handed to `sh -c` verbatim
    Shell(String),
}

/// A translated, ready-to-run command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcreteCommand {
    invocation: Invocation,
    dry: bool,
}

impl ConcreteCommand {
    pub fn new(invocation: Invocation, dry: bool) -> Self {
        Self { invocation, dry }
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Dry commands are logged but never invoked
    pub fn is_dry(&self) -> bool {
        self.dry
    }

    /// Program to spawn
    pub fn program(&self) -> &str {
        match &self.invocation {
            Invocation::Exec { program, .. } => program,
            Invocation::Shell(_) => "sh",
        }
    }

    /// Arguments to pass to `program()`
    pub fn args(&self) -> Vec<String> {
        match &self.invocation {
            Invocation::Exec { args, .. } => args.clone(),
            Invocation::Shell(line) => vec!["-c".to_string(), line.clone()],
        }
    }
}

impl fmt::Display for ConcreteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.invocation {
            Invocation::Exec { program, args } => {
                write!(f, "{}", program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Invocation::Shell(line) => write!(f, "{}", line),
        }
    }
}

// ============================================================================
// Translator
// ============================================================================

/// Package manager used on Red Hat family hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum RedhatManager {
    #[default]
    Yum,
    Dnf,
}

/// Maps abstract actions to concrete commands.
///
/// Host probing (dnf presence, sudo) happens once in `probe_host`; after
/// construction `translate` depends only on its arguments.
#[derive(Debug, Clone)]
pub struct Translator {
    python: String,
    readies: String,
    aur_helper: String,
    redhat_manager: RedhatManager,
    sudo: bool,
    dry_run: bool,
    overrides: PackageOverrides,
}

impl Default for Translator {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            readies: "deps/readies".to_string(),
            aur_helper: "yay".to_string(),
            redhat_manager: RedhatManager::Yum,
            sudo: false,
            dry_run: false,
            overrides: PackageOverrides::default(),
        }
    }
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_readies(mut self, readies: impl Into<String>) -> Self {
        self.readies = readies.into();
        self
    }

    pub fn with_aur_helper(mut self, helper: impl Into<String>) -> Self {
        self.aur_helper = helper.into();
        self
    }

    pub fn with_redhat_manager(mut self, manager: RedhatManager) -> Self {
        self.redhat_manager = manager;
        self
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_overrides(mut self, overrides: PackageOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Pick dnf over yum when present, and sudo when not running as root.
    pub fn probe_host(mut self, allow_sudo: bool) -> Self {
        if which::which("dnf").is_ok() {
            self.redhat_manager = RedhatManager::Dnf;
        }
        self.sudo = allow_sudo
            && !nix::unistd::geteuid().is_root()
            && which::which("sudo").is_ok();
        tracing::debug!(
            redhat_manager = %self.redhat_manager,
            sudo = self.sudo,
            "Probed host tools"
        );
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn python(&self) -> &str {
        &self.python
    }

    pub fn aur_helper(&self) -> &str {
        &self.aur_helper
    }

    /// Binary the family's install translation invokes, if any
    pub fn package_manager(&self, family: Family) -> Option<String> {
        match family {
            Family::Debian => Some("apt-get".to_string()),
            Family::Redhat => Some(self.redhat_manager.to_string()),
            Family::Arch => Some("pacman".to_string()),
            Family::Macos => Some("brew".to_string()),
            Family::Other => None,
        }
    }

    /// Translate `action` for `platform`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedPlatform` for any non-`run` action on family `other`
    /// - `InvalidAction` for an empty package list, pip spec or command
    pub fn translate(&self, action: &Action, platform: &PlatformInfo) -> Result<ConcreteCommand> {
        let family = platform.family();
        if family == Family::Other && !action.kind().is_platform_agnostic() {
            return Err(SetupError::unsupported(action.kind(), family));
        }

        let invocation = match action.kind() {
            ActionKind::Run => {
                let line = self.expand(&action.payload().text());
                if line.is_empty() {
                    return Err(SetupError::invalid_action("run with an empty command"));
                }
                Invocation::Shell(line)
            }
            ActionKind::Install => self.install(action, platform)?,
            ActionKind::PipInstall => {
                let spec = action.payload().words();
                if spec.is_empty() {
                    return Err(SetupError::invalid_action("pip-install with an empty spec"));
                }
                let mut args = vec!["-m".to_string(), "pip".to_string(), "install".to_string()];
                args.extend(spec);
                Invocation::Exec {
                    program: self.python.clone(),
                    args,
                }
            }
            ActionKind::Refresh => self.refresh(family),
        };

        Ok(ConcreteCommand::new(invocation, self.dry_run))
    }

    fn install(&self, action: &Action, platform: &PlatformInfo) -> Result<Invocation> {
        let packages: Vec<String> = action
            .payload()
            .words()
            .iter()
            .map(|p| self.overrides.resolve(platform, p).to_string())
            .collect();
        if packages.is_empty() {
            return Err(SetupError::invalid_action("install with no packages"));
        }

        let from_aur = action.has_option(ActionOption::FromAur);
        if from_aur && platform.family() != Family::Arch {
            tracing::debug!("Ignoring from-aur on {} family", platform.family());
        }

        let (program, base, privileged): (String, &[&str], bool) = match platform.family() {
            Family::Debian => ("apt-get".into(), &["install", "-y"][..], true),
            Family::Redhat => (self.redhat_manager.to_string(), &["install", "-y"][..], true),
            Family::Arch if from_aur => (self.aur_helper.clone(), &["-S", "--noconfirm"][..], false),
            Family::Arch => ("pacman".into(), &["-S", "--noconfirm"][..], true),
            Family::Macos => ("brew".into(), &["install"][..], false),
            Family::Other => {
                return Err(SetupError::unsupported(action.kind(), Family::Other));
            }
        };

        let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();
        args.extend(packages);
        Ok(self.exec(program, args, privileged))
    }

    fn refresh(&self, family: Family) -> Invocation {
        let (program, args, privileged): (String, &[&str], bool) = match family {
            Family::Debian => ("apt-get".into(), &["update", "-qq"][..], true),
            Family::Redhat => (self.redhat_manager.to_string(), &["makecache"][..], true),
            Family::Arch => ("pacman".into(), &["-Sy"][..], true),
            Family::Macos => ("brew".into(), &["update"][..], false),
            // Rejected in translate() before dispatch
            Family::Other => (String::from("true"), &[][..], false),
        };
        self.exec(program, args.iter().map(|s| s.to_string()).collect(), privileged)
    }

    fn exec(&self, program: String, args: Vec<String>, privileged: bool) -> Invocation {
        if self.sudo && privileged {
            let mut sudo_args = vec![program];
            sudo_args.extend(args);
            Invocation::Exec {
                program: "sudo".to_string(),
                args: sudo_args,
            }
        } else {
            Invocation::Exec { program, args }
        }
    }

    fn expand(&self, line: &str) -> String {
        line.replace("{python}", &self.python)
            .replace("{readies}", &self.readies)
    }
}
