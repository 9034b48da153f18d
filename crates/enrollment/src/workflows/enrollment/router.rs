use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::conditional::ConditionalFieldController;
use super::documents::DocumentStatus;
use super::domain::{LocationLevel, LocationNode, LocationOption};
use super::form::hydrate;
use super::location::{LocationHierarchyResolver, LocationLookup, LookupError};
use super::persistence::PersistedFormSnapshot;
use super::review::{ReviewAssembler, ReviewProgress};
use super::validation::FormValidator;

/// Shared handler state: one resolver, so the name cache is shared across requests.
pub struct EnrollmentApi<L> {
    resolver: Arc<LocationHierarchyResolver<L>>,
    review: ReviewAssembler<L>,
    controller: ConditionalFieldController,
    validator: FormValidator,
}

impl<L> EnrollmentApi<L>
where
    L: LocationLookup,
{
    pub fn new(resolver: Arc<LocationHierarchyResolver<L>>) -> Self {
        Self {
            review: ReviewAssembler::new(Arc::clone(&resolver)),
            resolver,
            controller: ConditionalFieldController::new(),
            validator: FormValidator::new(),
        }
    }

    pub fn with_controller(mut self, controller: ConditionalFieldController) -> Self {
        self.controller = controller;
        self
    }
}

/// Router exposing location lists plus server-side validation and review of a snapshot.
pub fn enrollment_router<L>(api: Arc<EnrollmentApi<L>>) -> Router
where
    L: LocationLookup + 'static,
{
    Router::new()
        .route("/api/v1/locations/provinces", get(provinces_handler::<L>))
        .route(
            "/api/v1/locations/provinces/:code/cities",
            get(cities_handler::<L>),
        )
        .route(
            "/api/v1/locations/cities/:code/barangays",
            get(barangays_handler::<L>),
        )
        .route("/api/v1/enrollment/validate", post(validate_handler::<L>))
        .route("/api/v1/enrollment/review", post(review_handler::<L>))
        .with_state(api)
}

fn location_response(result: Result<Vec<LocationNode>, LookupError>) -> Response {
    match result {
        Ok(nodes) => {
            let options: Vec<LocationOption> = nodes.iter().map(LocationOption::from).collect();
            (StatusCode::OK, axum::Json(options)).into_response()
        }
        Err(error @ LookupError::NotFound { .. }) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => {
            warn!(error = %error, "location lookup failed");
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn provinces_handler<L>(State(api): State<Arc<EnrollmentApi<L>>>) -> Response
where
    L: LocationLookup + 'static,
{
    location_response(api.resolver.list_provinces().await)
}

pub(crate) async fn cities_handler<L>(
    State(api): State<Arc<EnrollmentApi<L>>>,
    Path(code): Path<String>,
) -> Response
where
    L: LocationLookup + 'static,
{
    location_response(
        api.resolver
            .list_children(LocationLevel::CityMunicipality, &code)
            .await,
    )
}

pub(crate) async fn barangays_handler<L>(
    State(api): State<Arc<EnrollmentApi<L>>>,
    Path(code): Path<String>,
) -> Response
where
    L: LocationLookup + 'static,
{
    location_response(
        api.resolver
            .list_children(LocationLevel::Barangay, &code)
            .await,
    )
}

pub(crate) async fn validate_handler<L>(
    State(api): State<Arc<EnrollmentApi<L>>>,
    axum::Json(snapshot): axum::Json<PersistedFormSnapshot>,
) -> Response
where
    L: LocationLookup + 'static,
{
    let session = hydrate(&snapshot, &api.controller);
    let report = api.validator.validate_form(&session);
    let status = if report.is_valid() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, axum::Json(report)).into_response()
}

/// Body of the review endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub form_data: PersistedFormSnapshot,
    #[serde(default)]
    pub document_status: Option<DocumentStatus>,
    #[serde(default)]
    pub form_completed: bool,
    #[serde(default)]
    pub terms_accepted: bool,
}

pub(crate) async fn review_handler<L>(
    State(api): State<Arc<EnrollmentApi<L>>>,
    axum::Json(request): axum::Json<ReviewRequest>,
) -> Response
where
    L: LocationLookup + 'static,
{
    let progress = ReviewProgress {
        form_completed: request.form_completed,
        terms_accepted: request.terms_accepted,
    };
    let view = api
        .review
        .assemble(&request.form_data, request.document_status.as_ref(), progress)
        .await;
    (StatusCode::OK, axum::Json(view)).into_response()
}
