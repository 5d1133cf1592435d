// Copyright (c) 2026 flowforge contributors
// SPDX-License-Identifier: MIT

//! Deployment Pipeline
//!
//! Sequential driver over three ports: resolve the unit catalog, synthesize
//! the flow graph, validate it remotely, then publish. The pipeline aborts
//! on the first failing stage, and the publisher is never invoked without a
//! prior successful validation; that is the core correctness invariant.
//!
//! No stage is retried here; retry policy belongs to the caller or the
//! transport layer.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::application::synthesizer::{self, UnitName};
use crate::config::ConfigError;
use crate::domain::flow::{FlowDefinition, PublishResult};
use crate::domain::parameters::{ParameterError, ParameterSet};

// ============================================================================
// Ports
// ============================================================================

/// Resolves the ordered list of deployed callable units for a service.
#[async_trait]
pub trait UnitCatalog: Send + Sync {
    /// The returned order is part of the contract: it determines the
    /// positional `Split_<i>` naming of the synthesized graph.
    async fn list_units(&self, service_sid: &str) -> Result<Vec<UnitName>, CatalogError>;
}

/// Submits a flow definition to the remote validation endpoint.
#[async_trait]
pub trait FlowValidator: Send + Sync {
    async fn validate(
        &self,
        definition: &FlowDefinition,
    ) -> Result<ValidationOutcome, ValidationError>;
}

/// Publishes a validated flow definition to the hosting service.
///
/// Create and update are independently specified operations; the hosting
/// service routes both through the same verb but distinct URLs, which is
/// what makes a re-run with the same flow SID converge instead of
/// duplicating resources.
#[async_trait]
pub trait FlowPublisher: Send + Sync {
    async fn create_flow(
        &self,
        friendly_name: &str,
        definition: &FlowDefinition,
    ) -> Result<PublishResult, PublishError>;

    async fn update_flow(
        &self,
        flow_sid: &str,
        friendly_name: &str,
        definition: &FlowDefinition,
    ) -> Result<PublishResult, PublishError>;
}

/// Validator verdict. A structural rejection is a normal negative result,
/// not a transport failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Diagnostics),
}

/// Validator diagnostics, carried verbatim to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics(pub Vec<serde_json::Value>);

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(no diagnostics provided)");
        }
        let rendered: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

// ============================================================================
// Port Errors
// ============================================================================

/// The catalog listing call failed or returned an unusable response.
#[derive(Debug, thiserror::Error)]
#[error("unit catalog unavailable for service '{service_sid}': {reason}")]
pub struct CatalogError {
    pub service_sid: String,
    pub reason: String,
}

/// The validation call itself failed, as opposed to returning a verdict.
#[derive(Debug, thiserror::Error)]
#[error("flow validation request failed: {reason}")]
pub struct ValidationError {
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The publish call never produced a usable response.
    #[error("flow publish request failed: {0}")]
    Transport(String),

    /// The hosting service declined a structurally valid graph
    /// (authorization, server-side policy).
    #[error("hosting service rejected the publish (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Everything that can abort a run, by stage.
///
/// `Config` failures happen before any remote call; `Catalog`, `Invalid`
/// and `ValidationTransport` abort before any mutation was attempted;
/// `PublishTransport` and `PublishRejected` mean a mutation was attempted
/// and may require inspecting remote state.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("flow definition is invalid: {0}")]
    Invalid(Diagnostics),

    #[error(transparent)]
    ValidationTransport(#[from] ValidationError),

    #[error("publish transport failure: {0}")]
    PublishTransport(String),

    #[error("publish rejected by hosting service (HTTP {status}): {body}")]
    PublishRejected { status: u16, body: String },
}

impl From<PublishError> for PipelineError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Transport(reason) => Self::PublishTransport(reason),
            PublishError::Rejected { status, body } => Self::PublishRejected { status, body },
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ParameterError> for PipelineError {
    fn from(err: ParameterError) -> Self {
        Self::Config(err.to_string())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// One deployment run's inputs.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Serverless service whose functions are wired into the flow.
    pub service_sid: String,
    /// Existing flow to update; `None` creates a new flow.
    pub flow_sid: Option<String>,
    /// Trigger parameters, loaded once before the run.
    pub parameters: ParameterSet,
}

pub struct DeployPipeline {
    catalog: Arc<dyn UnitCatalog>,
    validator: Arc<dyn FlowValidator>,
    publisher: Arc<dyn FlowPublisher>,
}

impl DeployPipeline {
    pub fn new(
        catalog: Arc<dyn UnitCatalog>,
        validator: Arc<dyn FlowValidator>,
        publisher: Arc<dyn FlowPublisher>,
    ) -> Self {
        Self {
            catalog,
            validator,
            publisher,
        }
    }

    /// Run the full resolve -> synthesize -> validate -> publish sequence.
    ///
    /// Strictly sequential and single-pass: each stage's output is the next
    /// stage's sole input, and there is no mid-run cancellation. A failure
    /// before the publish stage leaves the hosting service untouched.
    ///
    /// Concurrent separate runs targeting the same flow SID race at the
    /// remote service (last write wins); serializing such runs is the
    /// caller's responsibility.
    pub async fn run(&self, request: &DeployRequest) -> Result<PublishResult, PipelineError> {
        info!(service_sid = %request.service_sid, "resolving deployed units");
        let units = self.catalog.list_units(&request.service_sid).await?;
        info!(count = units.len(), "resolved unit catalog");

        let definition = synthesizer::synthesize(&request.parameters, &units);

        info!("submitting flow definition for validation");
        match self.validator.validate(&definition).await {
            Ok(ValidationOutcome::Valid) => {
                info!("flow definition accepted by validator");
            }
            Ok(ValidationOutcome::Invalid(diagnostics)) => {
                warn!(%diagnostics, "flow definition rejected by validator");
                return Err(PipelineError::Invalid(diagnostics));
            }
            Err(err) => {
                error!(%err, "validation request failed");
                return Err(err.into());
            }
        }

        let friendly_name = friendly_flow_name(&request.service_sid);
        let result = match &request.flow_sid {
            Some(flow_sid) => {
                info!(%flow_sid, "updating existing flow");
                self.publisher
                    .update_flow(flow_sid, &friendly_name, &definition)
                    .await?
            }
            None => {
                info!("creating new flow");
                self.publisher.create_flow(&friendly_name, &definition).await?
            }
        };

        info!(sid = %result.sid, status = %result.status, "flow published");
        Ok(result)
    }
}

/// Friendly name shown by the hosting service, derived from the service SID.
pub fn friendly_flow_name(service_sid: &str) -> String {
    format!("Studio Flow for {service_sid}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedCatalog {
        units: Vec<UnitName>,
    }

    #[async_trait]
    impl UnitCatalog for FixedCatalog {
        async fn list_units(&self, _service_sid: &str) -> Result<Vec<UnitName>, CatalogError> {
            Ok(self.units.clone())
        }
    }

    struct FailingCatalog;

    #[async_trait]
    impl UnitCatalog for FailingCatalog {
        async fn list_units(&self, service_sid: &str) -> Result<Vec<UnitName>, CatalogError> {
            Err(CatalogError {
                service_sid: service_sid.to_string(),
                reason: "listing returned HTTP 404".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingValidator {
        calls: AtomicUsize,
        verdict: Option<ValidationOutcome>,
    }

    impl RecordingValidator {
        fn accepting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                verdict: Some(ValidationOutcome::Valid),
            }
        }

        fn rejecting(diagnostics: Diagnostics) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                verdict: Some(ValidationOutcome::Invalid(diagnostics)),
            }
        }

        /// `verdict: None` simulates a transport failure.
        fn unreachable_endpoint() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                verdict: None,
            }
        }
    }

    #[async_trait]
    impl FlowValidator for RecordingValidator {
        async fn validate(
            &self,
            _definition: &FlowDefinition,
        ) -> Result<ValidationOutcome, ValidationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.verdict {
                Some(outcome) => Ok(outcome.clone()),
                None => Err(ValidationError {
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        create_calls: AtomicUsize,
        update_calls: AtomicUsize,
        last_update_sid: Mutex<Option<String>>,
    }

    #[async_trait]
    impl FlowPublisher for RecordingPublisher {
        async fn create_flow(
            &self,
            _friendly_name: &str,
            _definition: &FlowDefinition,
        ) -> Result<PublishResult, PublishError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            Ok(PublishResult {
                sid: "FWnew00000000000000000000000000000".to_string(),
                status: "published".to_string(),
            })
        }

        async fn update_flow(
            &self,
            flow_sid: &str,
            _friendly_name: &str,
            _definition: &FlowDefinition,
        ) -> Result<PublishResult, PublishError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_update_sid.lock().unwrap() = Some(flow_sid.to_string());
            Ok(PublishResult {
                sid: flow_sid.to_string(),
                status: "published".to_string(),
            })
        }
    }

    fn request(flow_sid: Option<&str>) -> DeployRequest {
        DeployRequest {
            service_sid: "ZS0000000000000000000000000000000a".to_string(),
            flow_sid: flow_sid.map(String::from),
            parameters: ParameterSet::from_json(r#"{"destination": "Paris"}"#).unwrap(),
        }
    }

    fn pipeline(
        catalog: Arc<dyn UnitCatalog>,
        validator: Arc<RecordingValidator>,
        publisher: Arc<RecordingPublisher>,
    ) -> DeployPipeline {
        DeployPipeline::new(catalog, validator, publisher)
    }

    #[tokio::test]
    async fn invalid_definition_never_reaches_the_publisher() {
        let validator = Arc::new(RecordingValidator::rejecting(Diagnostics(vec![
            serde_json::json!({"message": "unknown widget"}),
        ])));
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(
            Arc::new(FixedCatalog { units: vec!["CheckAvailability".to_string()] }),
            validator.clone(),
            publisher.clone(),
        );

        let err = pipeline.run(&request(None)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Invalid(_)));
        assert!(err.to_string().contains("unknown widget"));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_transport_failure_never_reaches_the_publisher() {
        let validator = Arc::new(RecordingValidator::unreachable_endpoint());
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(
            Arc::new(FixedCatalog { units: vec![] }),
            validator,
            publisher.clone(),
        );

        let err = pipeline.run(&request(None)).await.unwrap_err();
        assert!(matches!(err, PipelineError::ValidationTransport(_)));
        assert_eq!(publisher.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.update_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_before_validation() {
        let validator = Arc::new(RecordingValidator::accepting());
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(Arc::new(FailingCatalog), validator.clone(), publisher.clone());

        let err = pipeline.run(&request(None)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Catalog(_)));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(publisher.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_flow_sid_creates_a_new_flow() {
        let validator = Arc::new(RecordingValidator::accepting());
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(
            Arc::new(FixedCatalog { units: vec!["CheckAvailability".to_string()] }),
            validator,
            publisher.clone(),
        );

        let result = pipeline.run(&request(None)).await.unwrap();
        assert_eq!(result.status, "published");
        assert_eq!(publisher.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.update_calls.load(Ordering::SeqCst), 0);
    }

    // Scenario: an existing flow SID routes to exactly one update call and
    // the result carries that same SID back.
    #[tokio::test]
    async fn existing_flow_sid_updates_exactly_once() {
        let validator = Arc::new(RecordingValidator::accepting());
        let publisher = Arc::new(RecordingPublisher::default());
        let pipeline = pipeline(
            Arc::new(FixedCatalog { units: vec!["CheckAvailability".to_string()] }),
            validator,
            publisher.clone(),
        );

        let result = pipeline
            .run(&request(Some("FW0000000000000000000000000000000b")))
            .await
            .unwrap();

        assert_eq!(publisher.update_calls.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.sid, "FW0000000000000000000000000000000b");
        assert_eq!(
            publisher.last_update_sid.lock().unwrap().as_deref(),
            Some("FW0000000000000000000000000000000b")
        );
    }

    #[test]
    fn friendly_name_embeds_the_service_sid() {
        assert_eq!(
            friendly_flow_name("ZS123"),
            "Studio Flow for ZS123"
        );
    }
}
