//! # cd-guard
//!
//! Post-sync guards for Argo CD applications. After a sync, the guards read the
//! application's managed resources and check two policies:
//!
//! - **hpa**: a Deployment or Rollout scaled by a HorizontalPodAutoscaler must
//!   not declare `spec.replicas`. Live objects whose last-applied annotation
//!   still records a replica count get a merge patch removing it.
//! - **ingress**: every ALB ingress with `target-type: ip` must be referenced by
//!   a pod readiness gate of some workload.
//!
//! The process exit status tells the pipeline which check failed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cd_guard::guard::GuardKind;
//! use cd_guard::handlers::{RunOptions, run_guard};
//! use cd_guard::platform::ArgoCdClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArgoCdClient::with_url("https://argocd.example.com", Some("token".into()))?;
//! let report = run_guard(&client, "shop", GuardKind::Ingress, RunOptions::default()).await;
//! println!("{}", report.outcome);
//! std::process::exit(report.outcome.exit_status());
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod formatter;
pub mod guard;
pub mod handlers;
pub mod platform;

// Re-export commonly used types and functions
pub use error::{ConfigError, GuardError, Result};
pub use guard::{GuardCode, GuardKind, GuardOutcome};
pub use handlers::{GuardReport, RunOptions, run_all, run_guard};
use cli::{Cli, Commands};
use log::debug;
use platform::ArgoCdClient;

/// Run a guard command and print its report, returning the exit status
pub async fn run_command(cli: &Cli, command: &Commands) -> Result<i32> {
    let args = command.args();
    let settings = config::load_guard_settings(cli.guard_config.as_deref())?;
    let local = config::load_argocd_config(cli.config.as_deref())?;
    let connection =
        config::resolve_connection(&cli.connection_overrides(args.timeout), local.as_ref())?;
    let client = ArgoCdClient::new(&connection)?;
    debug!("Using Argo CD server {}", client.api_url());
    if cli.grpc_web {
        debug!("Ignoring --grpc-web; requests go through the REST gateway");
    }

    let options = RunOptions {
        refresh: cli.refresh.unwrap_or(settings.refresh),
        dry_run: args.dry_run || settings.dry_run,
    };

    let reports = match command.guard() {
        Some(guard) => vec![run_guard(&client, &args.app, guard, options).await],
        None => run_all(&client, &args.app, &settings.guards, options).await,
    };

    formatter::format_reports(&reports, cli.output.unwrap_or(settings.output));
    Ok(handlers::exit_status(&reports))
}
