//! Progress reporting for pipeline runs

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use shardguard_application::ports::progress::ProgressNotifier;
use shardguard_application::{StepOutcome, StepReport};
use shardguard_domain::{Plan, ToolCall};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Spinner while planning, then a bar across the sub-prompts.
pub struct ProgressReporter {
    multi: MultiProgress,
    planning: Mutex<Option<ProgressBar>>,
    steps: Mutex<Option<ProgressBar>>,
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            planning: Mutex::new(None),
            steps: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn step_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn step_bar(&self, total: usize) -> ProgressBar {
        let mut slot = lock(&self.steps);
        if let Some(bar) = slot.as_ref() {
            return bar.clone();
        }
        let bar = self.multi.add(ProgressBar::new(total as u64));
        bar.set_style(Self::step_style());
        bar.set_prefix("Executing");
        bar.enable_steady_tick(Duration::from_millis(120));
        *slot = Some(bar.clone());
        bar
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_planning_attempt(&self, attempt: u32, max_attempts: u32) {
        let mut slot = lock(&self.planning);
        let bar = slot.get_or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(Self::spinner_style());
            bar.set_prefix("Planning");
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        bar.set_message(format!("attempt {}/{}", attempt, max_attempts));
    }

    fn on_plan_rejected(&self, attempt: u32, reason: &str) {
        if let Some(bar) = lock(&self.planning).as_ref() {
            bar.println(format!(
                "  {} attempt {} rejected: {}",
                "!".yellow(),
                attempt,
                reason
            ));
        }
    }

    fn on_plan_ready(&self, plan: &Plan, attempts: u32) {
        if let Some(bar) = lock(&self.planning).take() {
            bar.finish_with_message(format!(
                "{} ({} sub-prompts, {} attempt{})",
                "plan ready".green(),
                plan.sub_prompts.len(),
                attempts,
                if attempts == 1 { "" } else { "s" }
            ));
        }
    }

    fn on_step_start(&self, sub_prompt_id: u32, _index: usize, total: usize) {
        self.step_bar(total)
            .set_message(format!("sub-prompt {}", sub_prompt_id));
    }

    fn on_tool_call(&self, _sub_prompt_id: u32, call: &ToolCall) {
        if let Some(bar) = lock(&self.steps).as_ref() {
            bar.set_message(format!("calling {}", call.capability_id()));
        }
    }

    fn on_tool_result(&self, _sub_prompt_id: u32, capability: &str, success: bool) {
        if let Some(bar) = lock(&self.steps).as_ref() {
            let mark = if success { "v".green() } else { "x".red() };
            bar.println(format!("  {} {}", mark, capability));
        }
    }

    fn on_step_complete(&self, report: &StepReport) {
        let mut slot = lock(&self.steps);
        let finished = match slot.as_ref() {
            Some(bar) => {
                if let StepOutcome::Failed { kind, .. } = &report.outcome {
                    bar.println(format!(
                        "  {} sub-prompt {}: {}",
                        "x".red(),
                        report.sub_prompt_id,
                        kind.as_str()
                    ));
                }
                bar.inc(1);
                bar.position() >= bar.length().unwrap_or(0)
            }
            None => false,
        };
        if finished && let Some(bar) = slot.take() {
            bar.finish_with_message("done".green().to_string());
        }
    }
}

/// Simple text-based progress on stderr (no fancy UI)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_planning_attempt(&self, attempt: u32, max_attempts: u32) {
        eprintln!(
            "{} {} (attempt {}/{})",
            "->".cyan(),
            "Planning".bold(),
            attempt,
            max_attempts
        );
    }

    fn on_plan_rejected(&self, attempt: u32, reason: &str) {
        eprintln!("  {} attempt {} rejected: {}", "!".yellow(), attempt, reason);
    }

    fn on_plan_ready(&self, plan: &Plan, _attempts: u32) {
        eprintln!(
            "  {} plan with {} sub-prompts",
            "v".green(),
            plan.sub_prompts.len()
        );
    }

    fn on_step_start(&self, sub_prompt_id: u32, index: usize, total: usize) {
        eprintln!(
            "{} {} {} ({}/{})",
            "->".cyan(),
            "Sub-prompt".bold(),
            sub_prompt_id,
            index + 1,
            total
        );
    }

    fn on_tool_result(&self, _sub_prompt_id: u32, capability: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), capability);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), capability);
        }
    }

    fn on_step_complete(&self, report: &StepReport) {
        match &report.outcome {
            StepOutcome::NoAction => eprintln!("  {} no action", "-".dimmed()),
            StepOutcome::Failed { message, .. } => eprintln!("  {} {}", "x".red(), message),
            StepOutcome::Completed { .. } => {}
        }
    }
}
