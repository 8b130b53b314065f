//! # Batch Pipelines
//!
//! The three scheduled maintenance pipelines, each one entry point
//! returning a terminal [`JobExecution`](crate::batch::JobExecution):
//!
//! - [`fan_out`]: expand READY bulk passes into per-member entitlements.
//! - [`expiration`]: sweep PROGRESSED passes whose window elapsed.
//! - [`notification`]: generate pre-class notifications, then dispatch
//!   unsent ones through the delivery collaborator.
//!
//! Every pipeline is idempotent under re-run: read predicates are status
//! gated, so records processed by a committed chunk no longer match.

pub mod expiration;
pub mod fan_out;
pub mod notification;

pub use expiration::run_expiration_job;
pub use fan_out::run_fan_out_job;
pub use notification::{
    run_notification_dispatch_job, run_notification_generation_job, run_notification_job,
};
