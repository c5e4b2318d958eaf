//! Integration tests for the WASH HTTP transport using wiremock
//!
//! These tests drive `HttpTransport` and a full `ResourceSession` against
//! mocked endpoints, covering response envelopes, status mapping and the
//! list refresh that follows a mutation.

use serde_json::{json, Value};
use std::time::Duration;
use washpro::api::http::HttpTransport;
use washpro::api::Transport;
use washpro::core::{
    FetchOutcome, FetchStatus, MenuAction, MenuAnchor, ModalKind, Notice, ResourceSession,
    SessionOptions, Severity, SubmitOutcome,
};
use washpro::error::CoreError;
use washpro::resource::{RecordId, ResourceKind};
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gutter(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "ward": "Kudan",
        "village": "Hunkuyi",
        "hamlet": "Tudun Wada",
        "condition": "Constructed with Block",
        "status": status,
        "dischargePoint": "yes"
    })
}

fn transport(server: &MockServer, token: Option<&str>) -> HttpTransport {
    HttpTransport::new(
        &format!("{}/api/v1", server.uri()),
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn session(kind: ResourceKind) -> ResourceSession {
    ResourceSession::new(kind, SessionOptions::default()).unwrap()
}

mod transport_tests {
    use super::*;

    /// Bearer token is attached and the envelope is returned as-is
    #[tokio::test]
    async fn test_list_sends_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .and(bearer_token("field-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [gutter("1", "Maintained")]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let http = transport(&server, Some("field-token"));
        let body = http.list("/gutters").await.unwrap();
        assert_eq!(body["data"][0]["_id"], "1");
    }

    #[tokio::test]
    async fn test_record_id_is_percent_encoded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/soak-away/a%20b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let http = transport(&server, None);
        assert!(http.get("/soak-away", &RecordId::from("a b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/gutters/42"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let body = http.delete("/gutters", &RecordId::from("42")).await.unwrap();
        assert_eq!(body, Value::Null);
    }

    #[tokio::test]
    async fn test_conflict_maps_to_conflict() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/api/v1/gutters/7"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"message": "Gutter was modified by another user"})),
            )
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let err = http
            .put("/gutters", &RecordId::from("7"), &json!({"status": "Maintained"}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::Conflict("Gutter was modified by another user".to_string())
        );
    }

    #[tokio::test]
    async fn test_server_error_is_network() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/dump-sites"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let err = http.list("/dump-sites").await.unwrap_err();
        assert!(matches!(err, CoreError::Network(msg) if msg.contains("temporarily unavailable")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\": ["))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        assert!(matches!(
            http.list("/gutters").await,
            Err(CoreError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let http = HttpTransport::new(
            &format!("{}/api/v1", server.uri()),
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(
            http.list("/gutters").await.unwrap_err(),
            CoreError::Timeout(Duration::from_millis(50))
        );
    }
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_refresh_decodes_collection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [gutter("1", "Maintained"), gutter("2", "High Risk")]
            })))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let mut session = session(ResourceKind::Gutters);
        assert_eq!(session.refresh(&http).await, FetchOutcome::Applied);
        assert_eq!(session.collection().len(), 2);
        assert_eq!(session.fetch_status(), &FetchStatus::Succeeded);
    }

    /// A record with an unknown status fails the whole fetch
    #[tokio::test]
    async fn test_schema_mismatch_keeps_previous_collection() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([gutter("1", "Maintained")])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([gutter("1", "Flooded")])))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let mut session = session(ResourceKind::Gutters);
        session.refresh(&http).await;
        let outcome = session.refresh(&http).await;

        assert!(matches!(outcome, FetchOutcome::Failed(CoreError::Decode(_))));
        assert_eq!(session.collection().len(), 1);
        assert_eq!(session.collection()[0].field("status"), "Maintained");
    }

    /// Create posts the validated body, notifies once and re-fetches
    #[tokio::test]
    async fn test_create_then_refresh() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/gutters"))
            .and(body_partial_json(json!({
                "ward": "Kudan",
                "status": "Maintained",
                "geolocation": {"type": "Point", "coordinates": [7.7, 11.3]}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": gutter("new-1", "Maintained")
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([gutter("new-1", "Maintained")])))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let mut session = session(ResourceKind::Gutters);
        session.refresh(&http).await;

        session.open_create().unwrap();
        session.update_draft(|_, draft| {
            draft.set("ward", "Kudan");
            draft.set("village", "Hunkuyi");
            draft.set("hamlet", "Tudun Wada");
            draft.set("geolocation", "7.7, 11.3");
        });

        let mut notices: Vec<Notice> = Vec::new();
        let outcome = session.submit(&http, &mut notices).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Succeeded { .. }));
        assert_eq!(session.modal().kind(), ModalKind::Closed);
        assert_eq!(notices, vec![Notice::success("Gutter created successfully")]);
        assert_eq!(session.collection().len(), 1);
    }

    /// A failed update keeps the form open with the operator's edits
    #[tokio::test]
    async fn test_update_conflict_keeps_draft() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/gutters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([gutter("7", "Maintained")])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/gutters/7"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({})))
            .mount(&server)
            .await;

        let http = transport(&server, None);
        let mut session = session(ResourceKind::Gutters);
        session.refresh(&http).await;
        session
            .open_menu(&RecordId::from("7"), MenuAnchor::default())
            .unwrap();
        session.choose(MenuAction::Edit).unwrap();
        session.update_draft(|def, draft| draft.cycle_choice(def, "status", true));

        let mut notices: Vec<Notice> = Vec::new();
        let outcome = session.submit(&http, &mut notices).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Failed(CoreError::Conflict(_))));
        assert_eq!(session.modal().kind(), ModalKind::Editing);
        assert_eq!(session.modal().draft().unwrap().get("status"), "Unmaintained");
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
        assert!(notices[0].message.starts_with("Failed to update gutter"));
    }
}
