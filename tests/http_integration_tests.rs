//! HTTP-level tests for validated endpoints
//!
//! These tests build a router with `ServerBuilder` and drive it through
//! `axum_test::TestServer`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use this_validate::prelude::*;
use validator::Validate;

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
struct CreateSample {
    #[validate(length(min = 1, message = "Name required"))]
    name: String,
    #[validate(range(min = 1, max = 100))]
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct SearchSamples {
    term: String,
}

impl_request_model!(CreateSample);
impl_request_model!(SearchSamples);

async fn created(arguments: ActionArguments) -> impl IntoResponse {
    let name = arguments
        .get_as::<CreateSample>("request")
        .map(|sample| sample.name.clone())
        .unwrap_or_default();
    (StatusCode::CREATED, axum::Json(json!({ "name": name })))
}

async fn search(arguments: ActionArguments) -> impl IntoResponse {
    let term = arguments
        .get_as::<SearchSamples>("query")
        .map(|query| query.term.clone())
        .unwrap_or_default();
    axum::Json(json!({ "term": term }))
}

fn search_validator(query: &SearchSamples) -> ValidationOutcome {
    if query.term.len() < 3 {
        ValidationOutcome::from_failures(vec![
            ValidationFailure::new("term", "term must have at least 3 characters")
                .with_attempted_value(json!(query.term)),
        ])
    } else {
        ValidationOutcome::valid()
    }
}

fn create_endpoint(name: &str) -> Endpoint {
    Endpoint::new(name, created).bind(JsonBody::<CreateSample>::new("request"))
}

fn builder() -> ServerBuilder {
    ServerBuilder::new()
        .with_rule_validator::<CreateSample>()
        .with_validator_fn(search_validator)
        .post(
            "/samples",
            create_endpoint("samples.create").validate([ModelType::of::<CreateSample>()]),
        )
        .put(
            "/samples",
            create_endpoint("samples.replace").validate_async([ModelType::of::<CreateSample>()]),
        )
        .post(
            "/samples/import",
            create_endpoint("samples.import")
                .validate([ModelType::of::<CreateSample>()])
                .skip_validation(),
        )
        .get(
            "/samples",
            Endpoint::new("samples.search", search)
                .bind(QueryParams::<SearchSamples>::new("query"))
                .validate([ModelType::of::<SearchSamples>()]),
        )
}

fn server(builder: ServerBuilder) -> TestServer {
    let app = builder.build().expect("Failed to build app");
    TestServer::new(app).expect("Failed to create test server")
}

// =============================================================================
// Synchronous Validation
// =============================================================================

mod sync_validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_body_reaches_handler() {
        let server = server(builder());

        let response = server
            .post("/samples")
            .json(&json!({ "name": "widget", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["name"], "widget");
    }

    #[tokio::test]
    async fn test_invalid_body_returns_failure_list() {
        let server = server(builder());

        let response = server
            .post("/samples")
            .json(&json!({ "name": "", "quantity": 3 }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body[0]["field"], "name");
        assert_eq!(body[0]["message"], "Name required");
        assert_eq!(body[0]["code"], "length");
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_sorted_by_field() {
        let server = server(builder());

        let response = server
            .post("/samples")
            .json(&json!({ "name": "", "quantity": 0 }))
            .await;

        let body: Value = response.json();
        let fields: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "quantity"]);
    }

    #[tokio::test]
    async fn test_query_model_is_validated() {
        let server = server(builder());

        let response = server.get("/samples").add_query_param("term", "ab").await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body[0]["attempted_value"], "ab");

        let response = server.get("/samples").add_query_param("term", "abc").await;
        response.assert_status_ok();
    }
}

// =============================================================================
// Asynchronous Validation
// =============================================================================

mod async_validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_async_dispatcher_rejects_invalid_body() {
        let server = server(builder());

        let response = server
            .put("/samples")
            .json(&json!({ "name": "", "quantity": 1 }))
            .await;

        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_async_dispatcher_accepts_valid_body() {
        let server = server(builder());

        let response = server
            .put("/samples")
            .json(&json!({ "name": "gadget", "quantity": 1 }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }
}

// =============================================================================
// Skip Marker, Strategies and Configuration
// =============================================================================

mod endpoint_options_tests {
    use super::*;

    #[tokio::test]
    async fn test_skip_validation_accepts_invalid_body() {
        let server = server(builder());

        let response = server
            .post("/samples/import")
            .json(&json!({ "name": "", "quantity": 0 }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_custom_invalid_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let server = server(builder().with_invalid_response_fn(move |failures| {
            counter.fetch_add(1, Ordering::SeqCst);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                axum::Json(json!({ "title": "invalid request", "errors": failures })),
            )
                .into_response()
        }));

        let response = server
            .post("/samples")
            .json(&json!({ "name": "", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: Value = response.json();
        assert_eq!(body["title"], "invalid request");
        assert_eq!(body["errors"][0]["field"], "name");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configured_invalid_status() {
        let server = server(builder().with_config(ValidationConfig {
            invalid_status: 422,
            ..Default::default()
        }));

        let response = server
            .post("/samples")
            .json(&json!({ "name": "", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}

// =============================================================================
// Endpoint Groups
// =============================================================================

mod endpoint_group_tests {
    use super::*;

    fn grouped_server() -> TestServer {
        server(
            ServerBuilder::new().with_rule_validator::<CreateSample>().group(
                EndpointGroup::new("/catalog")
                    .validate([ModelType::of::<CreateSample>()])
                    .post("/samples", create_endpoint("catalog.create"))
                    .post(
                        "/samples/import",
                        create_endpoint("catalog.import").skip_validation(),
                    ),
            ),
        )
    }

    #[tokio::test]
    async fn test_group_validation_rejects_invalid_body() {
        let server = grouped_server();

        let response = server
            .post("/catalog/samples")
            .json(&json!({ "name": "", "quantity": 3 }))
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body[0]["field"], "name");
    }

    #[tokio::test]
    async fn test_skipped_sibling_accepts_invalid_body() {
        let server = grouped_server();

        let response = server
            .post("/catalog/samples/import")
            .json(&json!({ "name": "", "quantity": 0 }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_group_validation_accepts_valid_body() {
        let server = grouped_server();

        let response = server
            .post("/catalog/samples")
            .json(&json!({ "name": "widget", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::CREATED);
    }
}

// =============================================================================
// Binding and Dispatch Errors
// =============================================================================

mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_json_is_rejected_before_validation() {
        let server = server(builder());

        let response = server.post("/samples").text("{not json").await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected() {
        let server = server(builder());

        let response = server.post("/samples").await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_BODY");
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let server = server(builder().with_config(ValidationConfig {
            max_body_bytes: 16,
            ..Default::default()
        }));

        let response = server
            .post("/samples")
            .json(&json!({ "name": "a name well beyond sixteen bytes", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_missing_validator_returns_generic_server_error() {
        let server = server(ServerBuilder::new().post(
            "/samples",
            create_endpoint("samples.create").validate([ModelType::of::<CreateSample>()]),
        ));

        let response = server
            .post("/samples")
            .json(&json!({ "name": "widget", "quantity": 3 }))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["code"], "MISSING_VALIDATOR");
    }
}
