//! Phase registry
//!
//! Setup policies register actions under named phases. At run time the
//! registry resolves those names against the detected platform into five
//! fixed slots:
//!
//! | Slot | Phase name matched |
//! |------|--------------------|
//! | 1 | `common-first` |
//! | 2 | `<family>-compat` (e.g. `redhat-compat`) |
//! | 3 | `<distro>` (e.g. `fedora`, `centos`) |
//! | 4 | `<os>` (e.g. `macos`, `linux`), empty when equal to the distro |
//! | 5 | `common-last` |
//!
//! The slot order never depends on registration order or on which platform
//! matched. Bootstrap work in `common-first` always precedes family and
//! distro refinements, which precede `common-last`.

use crate::action::Action;
use crate::platform::PlatformInfo;
use crate::types::Family;
use std::collections::HashSet;
use std::fmt;
use strum::{Display, EnumIter, IntoEnumIterator};

/// Name of the first common phase
pub const COMMON_FIRST: &str = "common-first";
/// Name of the last common phase
pub const COMMON_LAST: &str = "common-last";

/// Fixed execution slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum PhaseSlot {
    CommonFirst,
    FamilyCompat,
    Distro,
    Os,
    CommonLast,
}

impl PhaseSlot {
    /// Phase name this slot resolves to on `platform`, if any
    pub fn phase_name(self, platform: &PlatformInfo) -> Option<String> {
        match self {
            Self::CommonFirst => Some(COMMON_FIRST.to_string()),
            Self::FamilyCompat => Some(platform.family().compat_phase()),
            Self::Distro if platform.distro().is_empty() => None,
            Self::Distro => Some(platform.distro().to_string()),
            Self::Os if platform.os() == platform.distro() => None,
            Self::Os => Some(platform.os().to_string()),
            Self::CommonLast => Some(COMMON_LAST.to_string()),
        }
    }
}

/// A named, ordered bucket of actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: String,
    pub slot: PhaseSlot,
    pub actions: Vec<Action>,
}

impl Phase {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} actions)", self.name, self.actions.len())
    }
}

/// Registered phases, in first-registration order.
#[derive(Debug, Clone, Default)]
pub struct PhaseRegistry {
    phases: Vec<(String, Vec<Action>)>,
}

impl PhaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `action` to `phase_name`, creating the phase on first use.
    pub fn register(&mut self, phase_name: &str, action: Action) {
        match self.phases.iter_mut().find(|(name, _)| name == phase_name) {
            Some((_, actions)) => actions.push(action),
            None => self.phases.push((phase_name.to_string(), vec![action])),
        }
    }

    /// Register several actions under the same phase, keeping their order.
    pub fn register_all<I>(&mut self, phase_name: &str, actions: I)
    where
        I: IntoIterator<Item = Action>,
    {
        for action in actions {
            self.register(phase_name, action);
        }
    }

    /// Actions registered under `phase_name`
    pub fn actions(&self, phase_name: &str) -> &[Action] {
        self.phases
            .iter()
            .find(|(name, _)| name == phase_name)
            .map(|(_, actions)| actions.as_slice())
            .unwrap_or(&[])
    }

    /// Registered phase names, in first-registration order
    pub fn phase_names(&self) -> impl Iterator<Item = &str> {
        self.phases.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve the plan for `platform`.
    ///
    /// Always returns one `Phase` per `PhaseSlot`, in slot order. Slots with
    /// no matching registration are present but empty. An action equal to one
    /// already placed earlier in the plan is dropped; payloads are compared
    /// after normalization, so `"git"` and `["git"]` are the same action.
    pub fn phases_for(&self, platform: &PlatformInfo) -> Vec<Phase> {
        let mut seen: HashSet<Action> = HashSet::new();
        let mut matched: HashSet<String> = HashSet::new();
        let mut plan = Vec::new();

        for slot in PhaseSlot::iter() {
            let name = slot.phase_name(platform);
            let mut actions = Vec::new();

            if let Some(name) = name.as_deref() {
                matched.insert(name.to_string());
                for action in self.actions(name) {
                    if seen.insert(action.normalized()) {
                        actions.push(action.clone());
                    } else {
                        tracing::debug!("Dropping duplicate action in {}: {}", name, action);
                    }
                }
            }

            plan.push(Phase {
                name: name.unwrap_or_else(|| slot.to_string()),
                slot,
                actions,
            });
        }

        for name in self.phase_names().filter(|n| !matched.contains(*n)) {
            tracing::debug!("Phase '{}' does not apply to {}", name, platform);
        }

        plan
    }
}

/// An unrecognized host (family `other` or no distro ID) that no
/// platform-specific phase matched.
///
/// Known hosts with empty compat or distro slots are normal and do not count.
pub fn is_unmatched_host(phases: &[Phase], platform: &PlatformInfo) -> bool {
    let unrecognized = platform.family() == Family::Other || platform.distro().is_empty();
    unrecognized
        && phases
            .iter()
            .filter(|p| !matches!(p.slot, PhaseSlot::CommonFirst | PhaseSlot::CommonLast))
            .all(Phase::is_empty)
}
