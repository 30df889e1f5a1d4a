//! Plan executor
//!
//! Walks the resolved phases in slot order and each phase's actions in
//! insertion order, translating and running one action at a time.
//!
//! # Failure Policy
//!
//! - **Fail-fast (default)**: the first `failed` result halts the run and the
//!   partial result list is returned. A failed prerequisite makes the later
//!   steps meaningless.
//! - **Continue-on-error**: failures are recorded and execution proceeds, so
//!   the final report covers every action.
//! - **Dry-run** never halts; translation failures are recorded and the plan
//!   is walked to the end.
//! - **No retries**: package managers are not safely re-entrant without
//!   operator judgment.
//!
//! # Outcome Rules
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | guard does not match the platform | skipped |
//! | translation error (unsupported family, empty payload) | failed |
//! | dry-run command | skipped, never invoked |
//! | exit 0 | ok |
//! | non-zero exit, `allow-noop` set | skipped |
//! | non-zero exit, spawn error, timeout | failed |

use crate::action::{Action, ConcreteCommand, Translator};
use crate::error::SetupError;
use crate::platform::PlatformInfo;
use crate::registry::Phase;
use crate::runner::CommandRunner;
use crate::types::{ActionOption, Outcome};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Per-action result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Phase the action belonged to
    pub phase: String,
    pub action: Action,
    /// Rendered concrete command, when translation succeeded
    pub command: Option<String>,
    pub outcome: Outcome,
    pub detail: Option<String>,
}

impl ActionResult {
    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Aggregate of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub results: Vec<ActionResult>,
    /// Set when fail-fast stopped the run early
    pub halted: bool,
}

impl ExecutionReport {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(ActionResult::is_failed)
    }

    /// First failed result, if any
    pub fn first_failure(&self) -> Option<&ActionResult> {
        self.results.iter().find(|r| r.is_failed())
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Process exit status: 0 when nothing failed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() { 1 } else { 0 }
    }
}

/// Executor settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub continue_on_error: bool,
    /// Applies to each action separately, never to the whole plan
    pub timeout: Option<Duration>,
}

/// Runs a resolved plan through a `CommandRunner`.
pub struct Executor<R: CommandRunner> {
    runner: R,
    translator: Translator,
    options: ExecutorOptions,
}

impl<R: CommandRunner> Executor<R> {
    pub fn new(runner: R, translator: Translator, options: ExecutorOptions) -> Self {
        Self {
            runner,
            translator,
            options,
        }
    }

    /// Give the runner back (tests inspect recorded invocations)
    pub fn into_runner(self) -> R {
        self.runner
    }

    /// Execute `phases` in order for `platform`.
    pub fn execute(&mut self, phases: &[Phase], platform: &PlatformInfo) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for phase in phases {
            if phase.is_empty() {
                debug!("Phase {} has nothing to do", phase.name);
                continue;
            }
            info!("Phase {}: {} action(s)", phase.name, phase.actions.len());

            for action in &phase.actions {
                let result = self.execute_action(&phase.name, action, platform);
                let failed = result.is_failed();
                report.results.push(result);

                if failed && !self.options.continue_on_error && !self.translator.is_dry_run() {
                    error!("Halting after failure in phase {}: {}", phase.name, action);
                    report.halted = true;
                    return report;
                }
            }
        }

        info!(
            "Plan finished: {} ok, {} skipped, {} failed",
            report.count(Outcome::Ok),
            report.count(Outcome::Skipped),
            report.count(Outcome::Failed)
        );
        report
    }

    fn execute_action(&mut self, phase: &str, action: &Action, platform: &PlatformInfo) -> ActionResult {
        let result = |command: Option<&ConcreteCommand>, outcome, detail: Option<String>| ActionResult {
            phase: phase.to_string(),
            action: action.clone(),
            command: command.map(ToString::to_string),
            outcome,
            detail,
        };

        if let Some(guard) = action.guard() {
            if !guard.matches(platform) {
                debug!("Skipping {} (guard not met: {})", action, guard);
                return result(None, Outcome::Skipped, Some(format!("guard not met: {}", guard)));
            }
        }

        let command = match self.translator.translate(action, platform) {
            Ok(command) => command,
            Err(e) => {
                error!("Cannot translate {}: {}", action, e);
                return result(None, Outcome::Failed, Some(e.to_string()));
            }
        };

        if command.is_dry() {
            info!("[DRY RUN] {}", command);
            return result(Some(&command), Outcome::Skipped, Some("dry run".to_string()));
        }

        let output = match self.runner.run(&command, self.options.timeout) {
            Ok(output) => output,
            Err(e) => {
                error!("{}", e);
                return result(Some(&command), Outcome::Failed, Some(e.to_string()));
            }
        };

        match output.ensure_success(&command.to_string()) {
            Ok(()) => result(Some(&command), Outcome::Ok, None),
            Err(SetupError::CommandExecution { code, output, .. })
                if action.has_option(ActionOption::AllowNoop) =>
            {
                warn!("Ignoring exit code {} from {}", code, command);
                let detail = if output.is_empty() {
                    format!("exit code {} ignored", code)
                } else {
                    format!("exit code {} ignored: {}", code, output)
                };
                result(Some(&command), Outcome::Skipped, Some(detail))
            }
            Err(e) => {
                error!("{}", e);
                let detail = match &e {
                    SetupError::CommandExecution { output, .. } if !output.is_empty() => {
                        format!("{}\n{}", e, output)
                    }
                    _ => e.to_string(),
                };
                result(Some(&command), Outcome::Failed, Some(detail))
            }
        }
    }
}
