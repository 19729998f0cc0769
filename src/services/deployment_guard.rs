//! Deployment with automatic rollback.
//!
//! A deployment whose smoke tests fail is rolled back by a second devops
//! agent. The workflow fails either way; the rollback result is kept under
//! the `rollback` phase for diagnostics.

use serde_json::json;
use tracing::{error, info, instrument};

use super::phase_executor::{PhaseExecutor, PhaseFailure, PhaseSpec, RunContext};
use crate::domain::models::{AgentRequest, DevOpsTask, PhaseName};

/// Rollback status reported when the rollback agent itself errored.
pub const ROLLBACK_ERROR_STATUS: &str = "rollback_error";

/// How a guarded deployment ended, when the deploy agent did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// Smoke tests passed.
    Deployed { deployment_id: String },
    /// Smoke tests failed and a rollback was attempted.
    RolledBack { rollback_status: String, error: String },
}

#[derive(Debug, Clone)]
pub struct DeploymentGuard {
    executor: PhaseExecutor,
}

impl DeploymentGuard {
    pub fn new(executor: PhaseExecutor) -> Self {
        Self { executor }
    }

    #[instrument(skip(self, ctx, project_id), fields(workflow_id = %ctx.workflow_id))]
    pub async fn run(
        &self,
        ctx: &RunContext,
        environment: &str,
        project_id: Option<String>,
    ) -> Result<DeploymentOutcome, PhaseFailure> {
        let deployed = self
            .executor
            .run(
                ctx,
                PhaseSpec::new(
                    PhaseName::Deployment,
                    AgentRequest::DevOps(DevOpsTask::Deploy {
                        environment: environment.to_string(),
                        project_id,
                    }),
                    json!({ "environment": environment }),
                ),
            )
            .await?;

        let Some(result) = deployed.as_devops() else {
            return Err(PhaseFailure::Agent {
                phase: PhaseName::Deployment,
                message: "Deployment agent returned no deployment result".to_string(),
            });
        };
        let deployment_id = result.deployment_id().to_string();

        if result.smoke_tests_passed() {
            info!(workflow_id = %ctx.workflow_id, deployment_id = %deployment_id, environment, "Deployment healthy");
            return Ok(DeploymentOutcome::Deployed { deployment_id });
        }

        error!(
            workflow_id = %ctx.workflow_id,
            deployment_id = %deployment_id,
            environment,
            "Smoke tests failed, rolling back"
        );

        let rollback = self
            .executor
            .run(
                ctx,
                PhaseSpec::new(
                    PhaseName::Rollback,
                    AgentRequest::DevOps(DevOpsTask::Rollback {
                        deployment_id: deployment_id.clone(),
                        environment: environment.to_string(),
                    }),
                    json!({ "environment": environment, "deploymentId": deployment_id }),
                ),
            )
            .await;

        let rollback_status = match rollback {
            Ok(result) => result
                .as_devops()
                .map_or(ROLLBACK_ERROR_STATUS, |r| r.status_str())
                .to_string(),
            Err(PhaseFailure::Agent { .. }) => ROLLBACK_ERROR_STATUS.to_string(),
            Err(halted @ PhaseFailure::Halted { .. }) => return Err(halted),
        };

        Ok(DeploymentOutcome::RolledBack {
            error: format!("Deployment smoke tests failed (rollback: {rollback_status})"),
            rollback_status,
        })
    }
}
