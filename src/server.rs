//! HTTP entry point
//!
//! - `POST /solve` checks the submitted identity against the configured one
//!   and, on a match, runs a chain to completion before replying
//! - `GET /health` liveness report, probing the LLM provider when one is
//!   configured
//! - `GET /metrics` metrics snapshot

use crate::chain::{ChainRunner, SubmitterIdentity};
use crate::config::RuntimeSecrets;
use crate::error::{sanitize_error_message, QuizError, QuizResult};
use crate::llm::LlmProvider;
use crate::observability::metrics;
use crate::protocol::{ComponentHealth, ErrorResponse, HealthStatus, QuizRequest, QuizResponse};
use chrono::{DateTime, Utc};
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Shared state behind every route
pub struct QuizService {
    runner: Arc<ChainRunner>,
    expected: SubmitterIdentity,
    llm: Option<Arc<dyn LlmProvider>>,
    instance_id: Uuid,
    started_at: DateTime<Utc>,
}

impl QuizService {
    pub fn new(runner: Arc<ChainRunner>, secrets: &RuntimeSecrets) -> Self {
        Self {
            runner,
            expected: secrets.expected_identity.clone(),
            llm: None,
            instance_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Provider probed by `GET /health`
    pub fn with_llm_provider(mut self, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        self.llm = llm;
        self
    }

    /// Email is checked before the secret
    pub fn authorize(&self, identity: &SubmitterIdentity) -> QuizResult<()> {
        if identity.email != self.expected.email {
            return Err(QuizError::access_denied("Invalid email"));
        }
        if identity.secret != self.expected.secret {
            return Err(QuizError::access_denied("Invalid secret"));
        }
        Ok(())
    }

    /// Authorize, then run the chain to completion
    ///
    /// The only error is [`QuizError::AccessDenied`]; every chain ending is
    /// a response.
    pub async fn solve(&self, request: QuizRequest) -> QuizResult<QuizResponse> {
        let identity = request.identity();
        if let Err(e) = self.authorize(&identity) {
            warn!(email = %identity.email, error = %e, "Rejected solve request");
            metrics().access_denied();
            return Err(e);
        }

        info!(url = %request.url, "Solve request accepted");
        let outcome = self.runner.run_chain(&request.url, &identity).await;
        Ok(QuizResponse::from(&outcome))
    }

    pub async fn health(&self) -> HealthStatus {
        let status = HealthStatus::healthy(self.instance_id, self.started_at);
        let Some(llm) = &self.llm else {
            return status;
        };

        let start = Instant::now();
        let result = llm.health_check().await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        let component = match result {
            Ok(()) => {
                debug!(provider = llm.name(), response_time_ms, "LLM provider healthy");
                ComponentHealth {
                    component: "llm_provider".to_string(),
                    healthy: true,
                    message: Some(format!("{} provider healthy", llm.name())),
                    response_time_ms,
                }
            }
            Err(e) => {
                warn!(provider = llm.name(), error = %e, response_time_ms, "LLM provider health check failed");
                ComponentHealth {
                    component: "llm_provider".to_string(),
                    healthy: false,
                    message: Some(sanitize_error_message(&format!(
                        "{} provider error: {}",
                        llm.name(),
                        e
                    ))),
                    response_time_ms,
                }
            }
        };

        status.with_component(component)
    }
}

/// All routes, with rejections rendered as `{detail}` JSON
pub fn routes(
    service: Arc<QuizService>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_service = warp::any().map(move || service.clone());

    let solve = warp::path("solve")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_service.clone())
        .and_then(handle_solve);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_service)
        .and_then(|service: Arc<QuizService>| async move {
            Ok::<_, Infallible>(warp::reply::json(&service.health().await))
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().get_metrics()));

    solve.or(health).or(metrics_route).recover(handle_rejection)
}

async fn handle_solve(
    request: QuizRequest,
    service: Arc<QuizService>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    let reply = match service.solve(request).await {
        Ok(response) => warp::reply::with_status(warp::reply::json(&response), StatusCode::OK),
        Err(QuizError::AccessDenied { message }) => warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(message)),
            StatusCode::FORBIDDEN,
        ),
        Err(e) => warp::reply::with_status(
            warp::reply::json(&ErrorResponse::new(e.public_message())),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    };
    Ok(reply)
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        warn!(rejection = ?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(detail)),
        status,
    ))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(service: Arc<QuizService>, addr: SocketAddr, shutdown: F) -> QuizResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (bound, server) = warp::serve(routes(service))
        .try_bind_with_graceful_shutdown(addr, shutdown)
        .map_err(|e| QuizError::internal_error(format!("failed to bind {addr}: {e}")))?;

    info!(address = %bound, "HTTP server listening");
    server.await;
    info!("HTTP server stopped");
    Ok(())
}
