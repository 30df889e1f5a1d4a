//! User-visible output
//!
//! Everything printed to stdout goes through here: the plan listing for
//! `--nop`, the failure block after a fail-fast halt, and the summary table.

use crate::executor::{ActionResult, ExecutionReport};
use crate::platform::PlatformInfo;
use crate::registry::Phase;
use crate::types::Outcome;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Outcome")]
    outcome: Outcome,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Numbered plan listing, empty phases left out
pub fn render_plan(phases: &[Phase], platform: &PlatformInfo) -> String {
    let mut lines = vec![format!("Setup plan for {}", platform)];
    let mut n = 0;
    for phase in phases.iter().filter(|p| !p.is_empty()) {
        lines.push(format!("  [{}]", phase.name));
        for action in &phase.actions {
            n += 1;
            match action.guard() {
                Some(guard) => lines.push(format!("    {}. {}  (when {})", n, action, guard)),
                None => lines.push(format!("    {}. {}", n, action)),
            }
        }
    }
    if n == 0 {
        lines.push("  (nothing to do)".to_string());
    }
    lines.join("\n")
}

/// The failing phase, action, command and captured output
pub fn render_failure(result: &ActionResult) -> String {
    let mut lines = vec![
        format!("Setup failed in phase '{}'", result.phase),
        format!("  action:  {}", result.action),
    ];
    if let Some(command) = &result.command {
        lines.push(format!("  command: {}", command));
    }
    if let Some(detail) = &result.detail {
        lines.push("  output:".to_string());
        lines.extend(detail.lines().map(|l| format!("    {}", l)));
    }
    lines.join("\n")
}

/// Table of every result plus a totals line
pub fn render_summary(report: &ExecutionReport) -> String {
    let rows = report.results.iter().enumerate().map(|(i, result)| SummaryRow {
        index: i + 1,
        phase: result.phase.clone(),
        action: result.command.clone().unwrap_or_else(|| result.action.to_string()),
        outcome: result.outcome,
        detail: result
            .detail
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or("")
            .to_string(),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    let mut totals = format!(
        "{} ok, {} skipped, {} failed",
        report.count(Outcome::Ok),
        report.count(Outcome::Skipped),
        report.count(Outcome::Failed)
    );
    if report.halted {
        totals.push_str(" (halted)");
    }

    format!("{}\n{}", table, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Guard};
    use crate::registry::{PhaseRegistry, COMMON_FIRST, COMMON_LAST};
    use crate::types::Family;

    fn failed_result() -> ActionResult {
        ActionResult {
            phase: COMMON_FIRST.into(),
            action: Action::install("nope"),
            command: Some("apt-get install -y nope".into()),
            outcome: Outcome::Failed,
            detail: Some("Command failed (exit code 100)\nE: Unable to locate package nope".into()),
        }
    }

    #[test]
    fn test_render_plan_numbers_actions() {
        let mut reg = PhaseRegistry::new();
        reg.register(COMMON_FIRST, Action::install("git"));
        reg.register(
            COMMON_LAST,
            Action::install("lcov").when(Guard::DistroIsNot {
                distro: "arch".into(),
            }),
        );
        let ubuntu = PlatformInfo::new(Family::Debian, "ubuntu", "22.04", "x86_64");
        let plan = render_plan(&reg.phases_for(&ubuntu), &ubuntu);

        assert!(plan.starts_with("Setup plan for linux/ubuntu debian 22.04"));
        assert!(plan.contains("  [common-first]\n    1. install git"));
        assert!(plan.contains("2. install lcov  (when distro != arch)"));
        assert!(!plan.contains("debian-compat"));
    }

    #[test]
    fn test_render_plan_empty() {
        let other = PlatformInfo::new(Family::Other, "", "", "x86_64");
        let plan = render_plan(&PhaseRegistry::new().phases_for(&other), &other);
        assert!(plan.ends_with("(nothing to do)"));
    }

    #[test]
    fn test_render_failure_includes_output() {
        let text = render_failure(&failed_result());
        assert!(text.contains("phase 'common-first'"));
        assert!(text.contains("command: apt-get install -y nope"));
        assert!(text.contains("    E: Unable to locate package nope"));
    }

    #[test]
    fn test_render_summary_totals() {
        let report = ExecutionReport {
            results: vec![
                ActionResult {
                    phase: COMMON_FIRST.into(),
                    action: Action::install("git"),
                    command: Some("apt-get install -y git".into()),
                    outcome: Outcome::Ok,
                    detail: None,
                },
                failed_result(),
            ],
            halted: true,
        };
        let text = render_summary(&report);
        assert!(text.contains("apt-get install -y git"));
        assert!(text.contains("failed"));
        assert!(text.ends_with("1 ok, 0 skipped, 1 failed (halted)"));
    }
}
