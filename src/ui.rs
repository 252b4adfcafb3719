//! Interface de terminal: spinner de polling e saída colorida.
//!
//! Usa `indicatif` para o spinner e `console` para cores. O [`PollProgress`]
//! acompanha visualmente o polling de um work item; mensagens de status vão
//! para stderr e o relatório JSON final para stdout.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::da::WorkItemStatus;
use crate::orchestrator::PollReporter;
use crate::resources::Inventory;
use crate::state_machine::WorkItemOutcome;

/// Spinner exibido enquanto um work item é acompanhado.
pub struct PollProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl PollProgress {
    pub fn start(activity_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("submitting work item for {activity_id}"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Encerra o spinner e mostra o resultado em uma linha.
    pub fn finish(&self, outcome: &WorkItemOutcome) {
        self.pb.finish_and_clear();
        if outcome.is_success() {
            eprintln!(
                "  {} Work item {} succeeded after {} polls",
                self.green.apply_to("✓"),
                outcome.work_item_id,
                outcome.polls
            );
        } else {
            eprintln!(
                "  {} Work item {} {}",
                self.red.apply_to("✗"),
                outcome.work_item_id,
                outcome.outcome
            );
        }
    }

    /// Encerra o spinner sem resultado (falha na submissão).
    pub fn abandon(&self) {
        self.pb.finish_and_clear();
    }
}

impl PollReporter for PollProgress {
    fn submitted(&self, work_item_id: &str) {
        self.pb.set_message(format!("work item {work_item_id} submitted"));
    }

    fn polled(&self, attempt: u32, max_attempts: u32, status: &WorkItemStatus) {
        self.pb
            .set_message(format!("status {status} (poll {attempt}/{max_attempts})"));
    }
}

pub fn success(message: &str) {
    eprintln!("  {} {message}", Style::new().green().bold().apply_to("✓"));
}

pub fn failure(message: &str) {
    eprintln!("  {} {message}", Style::new().red().bold().apply_to("✗"));
}

/// Imprime o relatório do work item em JSON no stdout.
pub fn print_outcome(outcome: &WorkItemOutcome) {
    println!(
        "{}",
        serde_json::to_string_pretty(outcome).unwrap_or_default()
    );
}

pub fn print_inventory(inventory: &Inventory, bundle_id: &str, activity_id: &str) {
    print!("{}", render_inventory(inventory, bundle_id, activity_id));
}

fn render_inventory(inventory: &Inventory, bundle_id: &str, activity_id: &str) -> String {
    let heading = Style::new().cyan().bold();
    let mut out = String::new();

    out.push_str(&format!("{}\n", heading.apply_to("App bundles")));
    for id in &inventory.app_bundles {
        out.push_str(&format!("  {id}\n"));
    }
    out.push_str(&format!("{}\n", heading.apply_to("Activities")));
    for id in &inventory.activities {
        out.push_str(&format!("  {id}\n"));
    }
    out.push_str(&format!(
        "{bundle_id}: {}\n",
        presence(inventory.bundle_present)
    ));
    out.push_str(&format!(
        "{activity_id}: {}\n",
        presence(inventory.activity_present)
    ));
    out
}

fn presence(present: bool) -> String {
    if present {
        Style::new().green().apply_to("present").to_string()
    } else {
        Style::new().yellow().apply_to("missing").to_string()
    }
}
