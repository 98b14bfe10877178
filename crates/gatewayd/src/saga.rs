//! Skill provisioning workflow.
//!
//! Creating a skill touches two services that share no transaction:
//!
//! 1. register the intent document with the NLU registry (expects 201)
//! 2. build the uploaded archive in the function registry (expects 200)
//! 3. register the built image with the function controller (expects 2xx)
//!
//! Steps run strictly in order. If step 2 or 3 fails, the NLU registration is
//! undone with a single best-effort delete. A failed delete is logged and
//! never replaces the error reported to the caller. Nothing is retried.

use std::sync::Arc;

use gateway_core::{
    BuildArtifact, Compensation, FunctionRecord, IntentDocument, SagaOutcome, SagaStep,
    SkillName, SkillRequest, StepFailure,
};
use tracing::{error, info, warn};

use crate::clients::{FunctionRegistryClient, NluClient, RemoteResponse, TransportError};

const NLU_CREATED: u16 = 201;
const BUILD_OK: u16 = 200;

pub struct SkillSaga {
    nlu: Arc<dyn NluClient>,
    registry: Arc<dyn FunctionRegistryClient>,
    runtime: String,
}

impl SkillSaga {
    pub fn new(
        nlu: Arc<dyn NluClient>,
        registry: Arc<dyn FunctionRegistryClient>,
        runtime: impl Into<String>,
    ) -> Self {
        Self {
            nlu,
            registry,
            runtime: runtime.into(),
        }
    }

    /// Runtime identifier sent with archive builds.
    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Provision a skill across the NLU registry and the function registry.
    pub async fn create_skill(&self, req: SkillRequest) -> SagaOutcome {
        let SkillRequest {
            name,
            intents,
            archive,
        } = req;
        info!(skill = %name, archive_bytes = archive.len(), "provisioning skill");

        if let Err(error) = self.register_intents(&intents).await {
            log_step_failure(&name, SagaStep::NluRegistration, &error);
            return SagaOutcome::NluFailure(error);
        }

        let artifact = match self.build_archive(&name, archive).await {
            Ok(artifact) => artifact,
            Err(error) => {
                log_step_failure(&name, SagaStep::ArchiveBuild, &error);
                let compensation = self.compensate(&name, SagaStep::ArchiveBuild).await;
                return SagaOutcome::BuildFailure {
                    error,
                    compensation,
                };
            }
        };

        let record = FunctionRecord::new(&name, &artifact, self.registry.image_prefix());
        if let Err(error) = self.register_function(&record).await {
            log_step_failure(&name, SagaStep::FunctionRegistration, &error);
            let compensation = self
                .compensate(&name, SagaStep::FunctionRegistration)
                .await;
            return SagaOutcome::ControllerFailure {
                error,
                compensation,
            };
        }

        info!(skill = %name, image = %record.image, version = %record.version, "skill provisioned");
        SagaOutcome::Success(record)
    }

    async fn register_intents(&self, intents: &IntentDocument) -> Result<(), StepFailure> {
        let response = self
            .nlu
            .create_skill(intents)
            .await
            .map_err(transport_failure)?;
        expect_status(response, |status| status == NLU_CREATED)?;
        Ok(())
    }

    async fn build_archive(
        &self,
        name: &SkillName,
        archive: Vec<u8>,
    ) -> Result<BuildArtifact, StepFailure> {
        let response = self
            .registry
            .build_archive(name, &self.runtime, archive)
            .await
            .map_err(transport_failure)?;
        let response = expect_status(response, |status| status == BUILD_OK)?;

        BuildArtifact::from_body(&response.body)
            .map_err(|e| StepFailure::InvalidResponse(e.to_string()))
    }

    async fn register_function(&self, record: &FunctionRecord) -> Result<(), StepFailure> {
        let response = self
            .registry
            .create_function(record)
            .await
            .map_err(transport_failure)?;
        expect_status(response, |status| (200..300).contains(&status))?;
        Ok(())
    }

    /// Undo the NLU registration. Attempted once; the result is only logged.
    async fn compensate(&self, name: &SkillName, failed: SagaStep) -> Compensation {
        warn!(skill = %name, step = %failed, "rolling back nlu registration");

        let reason = match self.nlu.delete_skill(name).await {
            Ok(response) if response.is_success() => {
                info!(skill = %name, status = response.status, "nlu registration rolled back");
                return Compensation::Completed;
            }
            Ok(response) => format!("unexpected status {}: {}", response.status, response.body),
            Err(e) => e.to_string(),
        };

        error!(
            skill = %name,
            step = %failed,
            %reason,
            "compensation failed, nlu skill may be orphaned"
        );
        Compensation::Failed { reason }
    }
}

fn transport_failure(err: TransportError) -> StepFailure {
    StepFailure::Transport(err.to_string())
}

fn expect_status(
    response: RemoteResponse,
    accept: impl Fn(u16) -> bool,
) -> Result<RemoteResponse, StepFailure> {
    if accept(response.status) {
        Ok(response)
    } else {
        Err(StepFailure::Rejected {
            status: response.status,
            body: response.body,
        })
    }
}

fn log_step_failure(name: &SkillName, step: SagaStep, error: &StepFailure) {
    match error.downstream() {
        Some((status, body)) => {
            error!(skill = %name, %step, status, body, "provisioning step rejected");
        }
        None => error!(skill = %name, %step, %error, "provisioning step failed"),
    }
}
