//! Console output formatter for plans, registries and pipeline reports

use colored::Colorize;
use serde::Serialize;
use shardguard_application::{PipelineReport, StepOutcome, StepReport};
use shardguard_domain::{CapabilityRegistry, Extraction, Plan, SubPrompt};

/// Formats pipeline artifacts for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Force colors off (or back to terminal detection).
    pub fn set_color_enabled(enabled: bool) {
        if enabled {
            colored::control::unset_override();
        } else {
            colored::control::set_override(false);
        }
    }

    /// Format as pretty-printed JSON
    pub fn format_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format a validated plan. Opaque values are shown by token only.
    pub fn format_plan(plan: &Plan) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Plan"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n",
            "Request:".cyan().bold(),
            plan.original_prompt
        ));

        output.push_str(&Self::section_header(&format!(
            "Sub-prompts ({})",
            plan.sub_prompts.len()
        )));
        for sub_prompt in &plan.sub_prompts {
            output.push_str(&Self::format_sub_prompt(sub_prompt));
        }

        output.push_str(&Self::footer());
        output
    }

    fn format_sub_prompt(sub_prompt: &SubPrompt) -> String {
        let mut output = format!(
            "\n{} {}\n",
            format!("[{}]", sub_prompt.id).yellow().bold(),
            sub_prompt.content
        );

        if sub_prompt.suggested_tools.is_empty() {
            output.push_str(&format!("    {} {}\n", "tools:".dimmed(), "none".dimmed()));
        } else {
            output.push_str(&format!(
                "    {} {}\n",
                "tools:".dimmed(),
                sub_prompt.suggested_tools.join(", ")
            ));
        }

        if !sub_prompt.opaque_values.is_empty() {
            let tokens: Vec<&str> = sub_prompt.opaque_values.keys().map(String::as_str).collect();
            output.push_str(&format!(
                "    {} {}\n",
                "references:".dimmed(),
                tokens.join(", ")
            ));
        }

        if sub_prompt.output_schema.is_some() {
            output.push_str(&format!("    {} yes\n", "output schema:".dimmed()));
        }

        output
    }

    /// Format the capability registry
    pub fn format_registry(registry: &CapabilityRegistry) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Available Tools"));
        output.push('\n');

        if registry.is_empty() {
            output.push_str(&format!("{}\n", "No MCP tools available.".yellow()));
            output.push_str(&Self::footer());
            return output;
        }

        for server in registry.servers() {
            output.push_str(&format!(
                "\n{} {}\n",
                server.name.cyan().bold(),
                format!("- {}", server.description).dimmed()
            ));
            for entry in registry.entries().iter().filter(|e| e.server == server.name) {
                output.push_str(&format!(
                    "  {} {}\n",
                    entry.id().to_string().bold(),
                    entry.description
                ));
                for (name, description, required) in entry.parameters() {
                    let marker = if required { " (required)" } else { "" };
                    output.push_str(&format!(
                        "      {}{}: {}\n",
                        name.yellow(),
                        marker.dimmed(),
                        description
                    ));
                }
            }
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format the result of a pipeline run
    pub fn format_report(report: &PipelineReport) -> String {
        let mut output = Self::format_plan(&report.plan);

        output.push_str(&Self::section_header("Execution"));
        for step in &report.steps {
            output.push_str(&Self::format_step(step));
        }

        let failed = report.failed_steps().count();
        let summary = format!(
            "{} of {} steps completed without error",
            report.steps.len() - failed,
            report.steps.len()
        );
        if failed == 0 {
            output.push_str(&format!("\n{}\n", summary.green().bold()));
        } else {
            output.push_str(&format!("\n{}\n", summary.red().bold()));
        }

        output.push_str(&Self::footer());
        output
    }

    fn format_step(step: &StepReport) -> String {
        let title = format!("── step {} ──", step.sub_prompt_id);
        match &step.outcome {
            StepOutcome::Completed { calls } => {
                let mut output = format!("\n{}\n", title.green().bold());
                for call in calls {
                    output.push_str(&format!("  {} {}\n", "v".green(), call.capability.bold()));
                    output.push_str(&Self::indent(&call.output, "      "));
                    output.push('\n');
                }
                output
            }
            StepOutcome::NoAction => format!(
                "\n{}\n  {}\n",
                title.yellow().bold(),
                "No tool calls proposed".dimmed()
            ),
            StepOutcome::Failed { kind, message } => format!(
                "\n{}\n  {} {}: {}\n",
                title.red().bold(),
                "x".red(),
                kind.as_str().red(),
                message
            ),
        }
    }

    /// Format redaction output; with `explain`, list each detected token.
    pub fn format_redaction(redacted: &str, extraction: Option<&Extraction>) -> String {
        let mut output = format!("{}\n", redacted);
        if let Some(extraction) = extraction {
            output.push_str(&Self::section_header(&format!(
                "Detected spans ({})",
                extraction.references.len()
            )));
            for (token, value) in &extraction.references {
                output.push_str(&format!("  {} <- {}\n", token.yellow(), value));
            }
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
