// Handler modules
pub mod guard;

// Re-export all handler functions
pub use guard::{
    GuardReport, PatchReport, PatchStatus, RunOptions, apply_remediation, exit_status, run_all,
    run_guard,
};
