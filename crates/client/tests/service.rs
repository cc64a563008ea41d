//! Tests for the typed FHIR operations, run against a recording mock
//! transport.

mod common;

use pretty_assertions::assert_eq;
use serde_json::{Value as JsonValue, json};

use common::{MockTransport, client, param, patient, searchset};
use fhir_core::request::IF_MATCH;
use fhir_core::resource::make_reference;
use fhir_core::{BundleType, FhirError, HttpMethod, RemoteData, Resource, SearchParams};

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_get_fhir_resource() {
    let transport = MockTransport::always(RemoteData::Success(patient("p1")));
    let fhir = client(&transport);

    let result = fhir
        .get_fhir_resource(&make_reference("Patient", "p1", None))
        .await;

    let resource = result.into_success().expect("patient");
    assert_eq!(resource.id.as_deref(), Some("p1"));
    assert_eq!(resource.version_id(), Some("1"));

    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(request.url, "/Patient/p1");
}

#[tokio::test]
async fn test_failure_payload_passes_through() {
    let outcome = json!({
        "resourceType": "OperationOutcome",
        "issue": [{"severity": "error", "code": "not-found"}]
    });
    let transport = MockTransport::always(RemoteData::Failure(outcome.clone()));

    let result = client(&transport)
        .get_fhir_resource(&make_reference("Patient", "missing", None))
        .await;

    assert_eq!(result, RemoteData::Failure(outcome));
}

#[tokio::test]
async fn test_unexpected_shape_is_a_failure() {
    let transport = MockTransport::always(RemoteData::Success(json!({"unexpected": true})));

    let result = client(&transport)
        .get_fhir_resource(&make_reference("Patient", "p1", None))
        .await;

    assert_eq!(result.failure().unwrap()["error"], "invalid_response");
}

#[tokio::test]
async fn test_get_fhir_resources_excludes_inactive() {
    let transport = MockTransport::always(RemoteData::Success(searchset(&["p1"], &[])));

    let result = client(&transport)
        .get_fhir_resources("Patient", &SearchParams::new().with("name", "Smith"), None)
        .await;

    assert_eq!(result.success().map(|bundle| bundle.entry.len()), Some(1));
    assert_eq!(
        transport.last_request().url_with_query(),
        "/Patient?name=Smith&active:not=false"
    );
}

#[tokio::test]
async fn test_get_all_fhir_resources_follows_next_links() {
    let transport = MockTransport::new(|request| match request.url.as_str() {
        "/Patient" => RemoteData::Success(searchset(
            &["p1", "p2"],
            &[("next", "/Patient?_page=2")],
        )),
        "/Patient?_page=2" => RemoteData::Success(searchset(
            &["p3"],
            &[("next", "/Patient?_page=3"), ("previous", "/Patient?_page=1")],
        )),
        "/Patient?_page=3" => {
            RemoteData::Success(searchset(&["p4"], &[("previous", "/Patient?_page=2")]))
        }
        other => RemoteData::Failure(json!({"error": "unexpected", "error_description": other})),
    });

    let result = client(&transport)
        .get_all_fhir_resources("Patient", &SearchParams::new(), None)
        .await;

    let bundle = result.into_success().expect("all pages");
    let ids: Vec<_> = bundle
        .resources()
        .filter_map(|resource| resource.id.clone())
        .collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
    assert!(!bundle.has_link("next"));
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_get_all_fhir_resources_stops_at_first_failure() {
    let transport = MockTransport::new(|request| match request.url.as_str() {
        "/Patient" => RemoteData::Success(searchset(&["p1"], &[("next", "/Patient?_page=2")])),
        _ => RemoteData::Failure(json!("Network Error")),
    });

    let result = client(&transport)
        .get_all_fhir_resources("Patient", &SearchParams::new(), None)
        .await;

    assert_eq!(result, RemoteData::Failure(json!("Network Error")));
}

#[tokio::test]
async fn test_find_fhir_resource_cardinality() {
    let one = MockTransport::always(RemoteData::Success(searchset(&["p1"], &[])));
    let found = client(&one)
        .find_fhir_resource("Patient", &SearchParams::new(), None)
        .await;
    assert_eq!(found.into_success().and_then(|resource| resource.id), Some("p1".to_string()));

    let none = MockTransport::always(RemoteData::Success(searchset(&[], &[])));
    let missing = client(&none)
        .find_fhir_resource("Patient", &SearchParams::new(), None)
        .await;
    assert_eq!(
        missing,
        RemoteData::Failure(json!({
            "error": "no_resources_found",
            "error_description": "No resources found"
        }))
    );

    let many = MockTransport::always(RemoteData::Success(searchset(&["p1", "p2"], &[])));
    let ambiguous = client(&many)
        .find_fhir_resource("Patient", &SearchParams::new(), None)
        .await;
    assert_eq!(
        ambiguous.failure().unwrap()["error"],
        "too_many_resources_found"
    );
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_save_fhir_resource_uses_if_match() {
    let transport = MockTransport::new(|request| {
        RemoteData::Success(request.data.clone().unwrap_or(JsonValue::Null))
    });
    let resource: Resource = serde_json::from_value(patient("p1")).unwrap();

    let saved = client(&transport).save_fhir_resource(&resource).await;

    assert!(saved.is_success());
    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Put);
    assert_eq!(request.header(IF_MATCH), Some("1"));
}

#[tokio::test]
async fn test_configuration_errors_send_nothing() {
    let transport = MockTransport::always(RemoteData::Success(JsonValue::Null));
    let fhir = client(&transport);
    let unsaved = Resource::new("Patient");

    assert_eq!(
        fhir.update_fhir_resource(&unsaved, None).await,
        Err(FhirError::MissingIdAndSearchParams)
    );
    assert_eq!(
        fhir.patch_fhir_resource(&unsaved, None).await,
        Err(FhirError::MissingIdAndSearchParams)
    );
    assert_eq!(
        fhir.delete_fhir_resource(&make_reference("Encounter", "e1", None))
            .await,
        Err(FhirError::InactiveMappingMissing("Encounter".to_string()))
    );
    assert_eq!(
        fhir.delete_resource(&unsaved).await,
        Err(FhirError::MissingId("Patient".to_string()))
    );

    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_delete_fhir_resource_marks_inactive() {
    let transport = MockTransport::always(RemoteData::Success(patient("p1")));

    let result = client(&transport)
        .delete_fhir_resource(&make_reference("Patient", "p1", None))
        .await
        .expect("mapped type");

    assert!(result.is_success());
    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Patch);
    assert_eq!(request.url, "/Patient/p1");
    assert_eq!(request.data, Some(json!({"active": false})));
}

#[tokio::test]
async fn test_force_delete_returns_raw_body() {
    let transport = MockTransport::always(RemoteData::Success(JsonValue::Null));

    let result = client(&transport)
        .force_delete_fhir_resource("Patient", "p1")
        .await;

    assert_eq!(result, RemoteData::Success(JsonValue::Null));
    assert_eq!(transport.last_request().method, HttpMethod::Delete);
}

#[tokio::test]
async fn test_save_with_related_extracts_primary() {
    let transport = MockTransport::always(RemoteData::Success(json!({
        "resourceType": "Bundle",
        "type": "transaction-response",
        "entry": [
            {"resource": patient("p1"), "response": {"status": "201 Created"}},
            {
                "resource": {"resourceType": "Observation", "id": "o1"},
                "response": {"status": "201 Created"}
            }
        ]
    })));

    let primary = Resource::new("Patient");
    let related = [Resource::new("Observation")];
    let result = client(&transport).save_with_related(&primary, &related).await;

    assert_eq!(
        result.into_success().and_then(|resource| resource.id),
        Some("p1".to_string())
    );

    let request = transport.last_request();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "/");
    let data = request.data.unwrap();
    assert_eq!(data["type"], "transaction");
    assert_eq!(data["entry"][0]["resource"]["resourceType"], "Patient");
    assert_eq!(data["entry"][1]["request"]["url"], "/Observation");
}

#[tokio::test]
async fn test_save_with_related_empty_response() {
    let transport = MockTransport::always(RemoteData::Success(JsonValue::Null));

    let result = client(&transport)
        .save_with_related(&Resource::new("Patient"), &[Resource::new("Observation")])
        .await;

    assert_eq!(
        result,
        RemoteData::Failure(json!({
            "error": "empty_response",
            "error_description": "Empty response from server"
        }))
    );
}

#[tokio::test]
async fn test_save_fhir_resources_and_apply_services() {
    let transport = MockTransport::always(RemoteData::Success(json!({
        "resourceType": "Bundle",
        "type": "batch-response",
        "entry": [{"response": {"status": "200 OK"}}]
    })));
    let fhir = client(&transport);

    let saved = fhir
        .save_fhir_resources(&[Resource::new("Patient")], BundleType::Batch)
        .await;
    assert_eq!(
        saved.success().map(|bundle| bundle.bundle_type),
        Some(BundleType::BatchResponse)
    );
    assert_eq!(transport.last_request().data.unwrap()["type"], "batch");

    let requests = [fhir_core::addressing::get(&make_reference("Patient", "p1", None))];
    let applied = fhir.apply_fhir_services(&requests, BundleType::Transaction).await;
    assert!(applied.is_success());
    let data = transport.last_request().data.unwrap();
    assert_eq!(data["entry"][0]["request"], json!({"method": "GET", "url": "/Patient/p1"}));
}

#[tokio::test]
async fn test_get_concepts() {
    let transport = MockTransport::always(RemoteData::Success(json!({"resourceType": "ValueSet"})));

    let result = client(&transport)
        .get_concepts("gender", Some(&SearchParams::new().with("filter", "fe")))
        .await;

    assert!(result.is_success());
    let request = transport.last_request();
    assert_eq!(request.url, "/ValueSet/gender/$expand");
    assert_eq!(param(&request, "filter").as_deref(), Some("fe"));
}

#[tokio::test]
async fn test_elevated_access_without_credentials_still_runs() {
    let transport = MockTransport::always(RemoteData::Success(patient("p1")));
    let fhir = client(&transport);

    let result = fhir
        .with_elevated_access(
            "admin-token",
            fhir.get_fhir_resource(&make_reference("Patient", "p1", None)),
        )
        .await;

    assert!(result.is_success());
    assert_eq!(fhir.token(), None);
}
