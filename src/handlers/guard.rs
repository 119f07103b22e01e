//! Guard command handlers: fetch, evaluate, remediate, report.

use crate::error::Result;
use crate::guard::{
    GuardCode, GuardKind, GuardOutcome, MERGE_PATCH_TYPE, ResourceSnapshot, SnapshotSet,
    build_snapshots, evaluate_hpa, evaluate_ingress, resolve, synthesize_patch,
};
use crate::platform::api::{ApplicationService, PatchResourceRequest, RefreshMode};
use log::{debug, error, info};
use serde::Serialize;

/// Options shared by every guard run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub refresh: RefreshMode,
    /// Report remediation patches without submitting them
    pub dry_run: bool,
}

/// What happened to one remediation patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatchStatus {
    Applied,
    DryRun,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// `Kind:name`
    pub resource: String,
    pub status: PatchStatus,
}

/// Result of one guard against one application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardReport {
    pub guard: GuardKind,
    pub app: String,
    pub outcome: GuardOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchReport>,
}

impl GuardReport {
    fn new(guard: GuardKind, app: &str, outcome: GuardOutcome) -> Self {
        Self {
            guard,
            app: app.to_string(),
            outcome,
            patches: Vec::new(),
        }
    }
}

/// Run a single guard
pub async fn run_guard<S: ApplicationService>(
    service: &S,
    app: &str,
    guard: GuardKind,
    options: RunOptions,
) -> GuardReport {
    match load_snapshots(service, app, options.refresh).await {
        Ok(snapshots) => evaluate(service, app, guard, &snapshots, options).await,
        Err(outcome) => GuardReport::new(guard, app, outcome),
    }
}

/// Run guards in order against one snapshot, stopping at the first one that
/// does not pass
pub async fn run_all<S: ApplicationService>(
    service: &S,
    app: &str,
    guards: &[GuardKind],
    options: RunOptions,
) -> Vec<GuardReport> {
    let Some(first) = guards.first() else {
        return Vec::new();
    };

    let snapshots = match load_snapshots(service, app, options.refresh).await {
        Ok(snapshots) => snapshots,
        Err(outcome) => return vec![GuardReport::new(*first, app, outcome)],
    };

    let mut reports = Vec::with_capacity(guards.len());
    for guard in guards {
        let report = evaluate(service, app, *guard, &snapshots, options).await;
        let passing = report.outcome.is_passing();
        reports.push(report);
        if !passing {
            break;
        }
    }
    reports
}

/// Exit status of a batch: the first non-passing outcome decides
pub fn exit_status(reports: &[GuardReport]) -> i32 {
    reports
        .iter()
        .map(|r| r.outcome.exit_status())
        .find(|status| *status != 0)
        .unwrap_or(0)
}

/// Submit a remediation patch for each workload
///
/// Failures are logged and recorded; the batch always runs to the end.
pub async fn apply_remediation<S: ApplicationService>(
    service: &S,
    app: &str,
    workloads: &[&ResourceSnapshot],
    dry_run: bool,
) -> Vec<PatchReport> {
    let mut reports = Vec::with_capacity(workloads.len());

    for workload in workloads {
        let resource = workload.display_name();
        let status = match submit_patch(service, app, workload, dry_run).await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to patch {}: {}", resource, e);
                PatchStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        reports.push(PatchReport { resource, status });
    }

    reports
}

async fn submit_patch<S: ApplicationService>(
    service: &S,
    app: &str,
    workload: &ResourceSnapshot,
    dry_run: bool,
) -> Result<PatchStatus> {
    let patch = synthesize_patch(workload)?;
    let request = PatchResourceRequest {
        app_name: app.to_string(),
        namespace: patch.target.namespace.clone(),
        resource_name: patch.target.name.clone(),
        version: patch.target.version.clone(),
        group: patch.target.group.clone(),
        kind: patch.target.kind.clone(),
        patch: patch.body(),
        patch_type: MERGE_PATCH_TYPE.to_string(),
    };

    if dry_run {
        info!(
            "Dry run: would patch {} with {}",
            workload.display_name(),
            request.patch
        );
        return Ok(PatchStatus::DryRun);
    }

    service.patch_resource(&request).await?;
    info!(
        "Removed spec.replicas from the last-applied-configuration of {}",
        workload.display_name()
    );
    Ok(PatchStatus::Applied)
}

async fn load_snapshots<S: ApplicationService>(
    service: &S,
    app: &str,
    refresh: RefreshMode,
) -> std::result::Result<SnapshotSet, GuardOutcome> {
    fetch_snapshots(service, app, refresh).await.map_err(|e| {
        error!("Failed to read application {}: {}", app, e);
        GuardOutcome::data_error(
            GuardCode::FetchFailed,
            format!("Failed to read application {}: {}", app, e),
        )
    })
}

async fn fetch_snapshots<S: ApplicationService>(
    service: &S,
    app: &str,
    refresh: RefreshMode,
) -> Result<SnapshotSet> {
    let application = service.get_application(app, refresh).await?;
    if let Some(sync) = &application.status.sync {
        debug!(
            "Application {} is {} at {}",
            application.metadata.name,
            sync.status,
            sync.revision.as_deref().unwrap_or("unknown revision")
        );
    }
    if let Some(health) = &application.status.health {
        debug!(
            "Application {} health is {}",
            application.metadata.name, health.status
        );
    }

    let diffs = service.managed_resources(app).await?;
    debug!("Application {} manages {} resources", app, diffs.len());
    Ok(build_snapshots(&diffs))
}

async fn evaluate<S: ApplicationService>(
    service: &S,
    app: &str,
    guard: GuardKind,
    snapshots: &SnapshotSet,
    options: RunOptions,
) -> GuardReport {
    if let Some(unreadable) = snapshots.first_unreadable(|kind| guard.inspects(kind)) {
        error!("{}", unreadable.error);
        let outcome =
            GuardOutcome::data_error(GuardCode::TargetUnreadable, unreadable.error.to_string());
        return GuardReport::new(guard, app, outcome);
    }

    match guard {
        GuardKind::Hpa => {
            let resolved = resolve(&snapshots.resources);
            let evaluation = evaluate_hpa(&resolved.autoscaler_refs, &resolved.workloads_by_name);
            let mut report = GuardReport::new(guard, app, evaluation.outcome);

            if report.outcome.is_passing() && !evaluation.remediation.is_empty() {
                let workloads: Vec<&ResourceSnapshot> = evaluation
                    .remediation
                    .iter()
                    .filter_map(|name| resolved.workloads_by_name.get(name))
                    .collect();
                report.patches =
                    apply_remediation(service, app, &workloads, options.dry_run).await;
            }
            report
        }
        GuardKind::Ingress => {
            GuardReport::new(guard, app, evaluate_ingress(&snapshots.resources))
        }
    }
}
