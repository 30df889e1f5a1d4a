//! Setup file handling
//!
//! A setup file is the JSON form of a setup policy: which actions go in
//! which phase, plus the translator and executor settings. The built-in
//! policy (`crate::policy`) produces the same structure, so
//! `--save-config` can export it as a starting point.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::action::{Action, PackageOverride, PackageOverrides, Translator};
use crate::error::SetupError;
use crate::executor::ExecutorOptions;
use crate::registry::{PhaseRegistry, COMMON_FIRST};
use crate::types::ActionKind;

fn default_python() -> String {
    "python3".to_string()
}

fn default_readies() -> String {
    "deps/readies".to_string()
}

fn default_aur_helper() -> String {
    "yay".to_string()
}

fn default_true() -> bool {
    true
}

/// Setup policy that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Phase name → actions, in insertion order within each phase
    #[serde(default)]
    pub phases: BTreeMap<String, Vec<Action>>,

    /// Exact-release package replacements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<PackageOverride>,

    /// Interpreter for pip-install and the `{python}` placeholder
    #[serde(default = "default_python")]
    pub python: String,

    /// Helper-script directory for the `{readies}` placeholder
    #[serde(default = "default_readies")]
    pub readies: String,

    #[serde(default = "default_aur_helper")]
    pub aur_helper: String,

    /// Refresh repository metadata before `common-first`
    #[serde(default = "default_true")]
    pub refresh: bool,

    #[serde(default)]
    pub continue_on_error: bool,

    /// Per-action timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            phases: BTreeMap::new(),
            overrides: Vec::new(),
            python: default_python(),
            readies: default_readies(),
            aur_helper: default_aur_helper(),
            refresh: true,
            continue_on_error: false,
            timeout_secs: None,
        }
    }
}

impl SetupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to a phase
    pub fn add(&mut self, phase: &str, action: Action) -> &mut Self {
        self.phases.entry(phase.to_string()).or_default().push(action);
        self
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize setup file to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write setup file to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read setup file from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse setup file JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), SetupError> {
        if self.python.trim().is_empty() {
            return Err(SetupError::config("python interpreter must not be empty"));
        }
        if self.aur_helper.trim().is_empty() {
            return Err(SetupError::config("aur_helper must not be empty"));
        }
        if self.timeout_secs == Some(0) {
            return Err(SetupError::config("timeout_secs must be greater than zero"));
        }

        for (phase, actions) in &self.phases {
            if phase.trim().is_empty() {
                return Err(SetupError::config("phase name must not be empty"));
            }
            for action in actions {
                let empty = match action.kind() {
                    ActionKind::Run => action.payload().text().is_empty(),
                    ActionKind::Install | ActionKind::PipInstall => {
                        action.payload().words().is_empty()
                    }
                    ActionKind::Refresh => false,
                };
                if empty {
                    return Err(SetupError::config(format!(
                        "empty {} action in phase '{}'",
                        action.kind(),
                        phase
                    )));
                }
            }
        }

        for o in &self.overrides {
            if o.distro.is_empty() || o.package.is_empty() || o.replacement.is_empty() {
                return Err(SetupError::config(format!(
                    "incomplete override for package '{}'",
                    o.package
                )));
            }
        }

        Ok(())
    }

    /// Build the phase registry, with a refresh step first when enabled.
    pub fn to_registry(&self) -> PhaseRegistry {
        let mut registry = PhaseRegistry::new();
        if self.refresh {
            registry.register(COMMON_FIRST, Action::refresh());
        }
        for (phase, actions) in &self.phases {
            registry.register_all(phase, actions.iter().cloned());
        }
        registry
    }

    /// Translator carrying this file's interpreter, helper paths and overrides
    pub fn translator(&self) -> Translator {
        let overrides: PackageOverrides = self.overrides.iter().cloned().collect();
        Translator::new()
            .with_python(&self.python)
            .with_readies(&self.readies)
            .with_aur_helper(&self.aur_helper)
            .with_overrides(overrides)
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            continue_on_error: self.continue_on_error,
            timeout: self.timeout_secs.map(std::time::Duration::from_secs),
        }
    }
}
