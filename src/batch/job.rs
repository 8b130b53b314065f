//! # Job Runner
//!
//! An ordered sequence of steps run to completion or first failure. A job
//! never rolls back a completed step: partial progress is durable, and
//! re-running the job is the recovery mechanism.

use tracing::{error, info};

use crate::batch::step::{Step, StepExecution, StepStatus};
use crate::error::BatchError;

/// Terminal state of one job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Outcome of one job run, with per-step executions in order. Steps after
/// the first failed one never ran and have no execution entry.
#[derive(Debug, Clone, PartialEq)]
pub struct JobExecution {
    pub job_name: String,
    pub status: JobStatus,
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }

    /// The failing chunk's error, when the job failed.
    pub fn error(&self) -> Option<&BatchError> {
        self.step_executions
            .iter()
            .find(|s| s.status == StepStatus::Failed)
            .and_then(|s| s.error.as_ref())
    }

    /// Execution of one step by name.
    pub fn step(&self, step_name: &str) -> Option<&StepExecution> {
        self.step_executions
            .iter()
            .find(|s| s.step_name == step_name)
    }
}

/// Explicitly wired job: holds its steps directly, no container.
pub struct Job {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run every step in order, stopping at the first unrecovered failure.
    pub async fn run(mut self) -> JobExecution {
        info!(job = %self.name, steps = self.steps.len(), "job starting");
        let mut step_executions = Vec::with_capacity(self.steps.len());

        for step in &mut self.steps {
            let execution = step.execute().await;
            let failed = execution.status == StepStatus::Failed;
            step_executions.push(execution);

            if failed {
                error!(job = %self.name, step = %step.name(), "job failed");
                return JobExecution {
                    job_name: self.name,
                    status: JobStatus::Failed,
                    step_executions,
                };
            }
        }

        info!(job = %self.name, "job completed");
        JobExecution {
            job_name: self.name,
            status: JobStatus::Completed,
            step_executions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct ScriptedStep {
        name: String,
        status: StepStatus,
    }

    #[async_trait]
    impl Step for ScriptedStep {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&mut self) -> StepExecution {
            StepExecution {
                step_name: self.name.clone(),
                status: self.status,
                read_count: 0,
                write_count: 0,
                skip_count: 0,
                chunks_committed: 0,
                error: (self.status == StepStatus::Failed)
                    .then(|| BatchError::StoreWrite("forced".to_string())),
            }
        }
    }

    fn step(name: &str, status: StepStatus) -> ScriptedStep {
        ScriptedStep {
            name: name.to_string(),
            status,
        }
    }

    #[tokio::test]
    async fn all_steps_run_in_order_on_success() {
        let execution = Job::new("ok-job")
            .with_step(step("first", StepStatus::Completed))
            .with_step(step("second", StepStatus::Completed))
            .run()
            .await;

        assert!(execution.is_completed());
        let names: Vec<&str> = execution
            .step_executions
            .iter()
            .map(|s| s.step_name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn a_failed_step_stops_the_job() {
        let execution = Job::new("failing-job")
            .with_step(step("first", StepStatus::Completed))
            .with_step(step("second", StepStatus::Failed))
            .with_step(step("third", StepStatus::Completed))
            .run()
            .await;

        assert_eq!(execution.status, JobStatus::Failed);
        assert_eq!(execution.step_executions.len(), 2, "third step never ran");
        assert_eq!(
            execution.error(),
            Some(&BatchError::StoreWrite("forced".to_string()))
        );
    }

    #[tokio::test]
    async fn an_empty_job_completes() {
        let execution = Job::new("empty").run().await;
        assert!(execution.is_completed());
        assert!(execution.step_executions.is_empty());
    }
}
