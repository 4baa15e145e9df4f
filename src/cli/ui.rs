use crate::aws::provisioner::{AttachedPolicySummary, BucketSummary};
use crate::aws::{Operation, ProvisionOutput};
use crate::deploy::DeployerEvent;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Color, Format, Modify, Style},
    Table, Tabled,
};
use tokio::sync::mpsc;

/// Creates a standard spinner ProgressBar.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▹▹▹▹▹",
            "▸▹▹▹▹",
            "▹▸▹▹▹",
            "▹▹▸▹▹",
            "▹▹▹▸▹",
            "▹▹▹▹▸",
            "▪▪▪▪▪",
        ]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Handles receiving DeployerEvents and updating a ProgressBar.
pub async fn handle_deployer_events(mut receiver: mpsc::Receiver<DeployerEvent>, pb: ProgressBar) {
    while let Some(event) = receiver.recv().await {
        match event {
            DeployerEvent::StepStarted(msg) => {
                pb.set_message(format!("⏳ {}", msg));
            }
            DeployerEvent::StepCompleted(msg) => {
                pb.set_message(format!("✅ {}", msg));
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            DeployerEvent::StepFailed(step, err) => {
                pb.set_message(format!("❌ Error during {}: {}", step, err));
                break;
            }
            DeployerEvent::PushProgress(status) => {
                pb.set_message(format!("📦 {}", status));
            }
        }
    }
}

pub fn format_header(text: &str) -> String {
    format!("{}", text.blue().bold())
}

pub fn format_highlight(text: &str) -> String {
    format!("{}", text.cyan())
}

pub fn format_success(text: &str) -> String {
    format!("{}", text.green())
}

pub fn format_warning(text: &str) -> String {
    format!("{}", text.yellow())
}

#[derive(Tabled)]
struct BucketRow<'a> {
    #[tabled(rename = "Bucket")]
    name: String,
    #[tabled(rename = "Created")]
    created: &'a str,
}

#[derive(Tabled)]
struct PolicyRow<'a> {
    #[tabled(rename = "Policy")]
    name: String,
    #[tabled(rename = "ARN")]
    arn: &'a str,
}

fn styled(mut table: Table) -> Table {
    table
        .with(Style::blank())
        .with(Modify::new(Rows::first()).with(Color::FG_GREEN))
        .with(Modify::new(Rows::first()).with(Format::content(|s| s.bold().to_string())));
    table
}

pub(crate) fn bucket_table(buckets: &[BucketSummary]) -> Table {
    let rows: Vec<BucketRow> = buckets
        .iter()
        .map(|bucket| BucketRow {
            name: format_highlight(&bucket.name),
            created: bucket.created.as_deref().unwrap_or("-"),
        })
        .collect();
    styled(Table::new(rows))
}

pub(crate) fn policy_table(policies: &[AttachedPolicySummary]) -> Table {
    let rows: Vec<PolicyRow> = policies
        .iter()
        .map(|policy| PolicyRow {
            name: format_highlight(&policy.name),
            arn: &policy.arn,
        })
        .collect();
    styled(Table::new(rows))
}

/// Prints an executor's result to stdout.
pub fn print_output(operation: &Operation, output: &ProvisionOutput) {
    println!("{}", format_header(&operation.to_string()));
    match output {
        ProvisionOutput::Response(response) => println!("{}", response),
        ProvisionOutput::Buckets(buckets) if buckets.is_empty() => {
            println!("{}", format_warning("No buckets found."))
        }
        ProvisionOutput::Buckets(buckets) => println!("{}", bucket_table(buckets)),
        ProvisionOutput::AttachedPolicies(policies) if policies.is_empty() => {
            println!("{}", format_warning("No managed policies attached."))
        }
        ProvisionOutput::AttachedPolicies(policies) => println!("{}", policy_table(policies)),
    }
}
