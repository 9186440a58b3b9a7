use accord::{
    ContractDocument, Error, HttpClient, HyperHttpClient, Interaction, InteractionBuilder,
    Matcher, MockServer, MockServerConfig, MockServerState, RequestData, ResponseData,
};
use serde_json::{json, Value};
use std::{net::TcpListener, thread};
use tokio::runtime::Runtime;

const DATE_PATTERN: &str = r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\+|\-)\d{2}:\d{2}";
const DATE_EXAMPLE: &str = "2013-08-16T15:31:20+10:00";

fn config() -> MockServerConfig {
    MockServerConfig::new("Our Little Consumer", "Our Provider")
}

fn dated_interaction(description: &str) -> Interaction {
    InteractionBuilder::new(description)
        .given("date count > 0")
        .with_request("GET", "/provider")
        .with_query("validDate", Matcher::term(DATE_PATTERN, DATE_EXAMPLE).unwrap())
        .will_respond_with(200)
        .with_response_body(Matcher::object(vec![
            ("test", Matcher::from("NO")),
            (
                "validDate",
                Matcher::term(DATE_PATTERN, DATE_EXAMPLE).unwrap(),
            ),
            ("count", Matcher::like(1000)),
        ]))
        .build()
}

fn undated_interaction() -> Interaction {
    InteractionBuilder::new("a request with a missing date parameter")
        .given("date count > 0")
        .with_request("GET", "/provider")
        .will_respond_with(400)
        .with_response_body(json!({"error": "validDate is required"}))
        .build()
}

fn send(server: &MockServer, request: &RequestData) -> ResponseData {
    send_to(&server.url(), request)
}

fn send_to(url: &str, request: &RequestData) -> ResponseData {
    Runtime::new()
        .unwrap()
        .block_on(HyperHttpClient::new().make_request(url, request))
        .unwrap()
}

fn dated_request(date: &str) -> RequestData {
    let mut request = RequestData::new("GET", "/provider");
    request.query.insert("validDate".into(), date.into());
    request
}

fn release_address(server: &MockServer) -> String {
    server.url().trim_start_matches("http://").to_string()
}

#[test]
fn test_exactly_once_traffic_verifies() {
    let mut server = MockServer::start(config()).unwrap();
    server
        .add_interaction(dated_interaction("a request for JSON data"))
        .unwrap();
    assert_eq!(server.state(), MockServerState::Recording);

    let response = send(&server, &dated_request("2019-03-02T10:00:00+00:00"));

    assert_eq!(response.status_code, 200);
    assert!(response
        .header("content-type")
        .unwrap()
        .starts_with("application/json"));
    assert_eq!(
        serde_json::from_str::<Value>(&response.body).unwrap(),
        json!({"test": "NO", "validDate": DATE_EXAMPLE, "count": 1000})
    );

    server.verify().unwrap();
    assert_eq!(server.state(), MockServerState::Verified);
    assert_eq!(server.ledger().all_interactions().len(), 1);

    let document = server.finalize().unwrap();
    assert_eq!(server.state(), MockServerState::Finalized);
    assert_eq!(document.interactions, vec![dated_interaction("a request for JSON data")]);
}

#[test]
fn test_interactions_are_told_apart_by_query() {
    let mut server = MockServer::start(config()).unwrap();
    server
        .add_interaction(dated_interaction("a request for JSON data"))
        .unwrap();
    server.add_interaction(undated_interaction()).unwrap();

    assert_eq!(send(&server, &RequestData::new("GET", "/provider")).status_code, 400);
    assert_eq!(send(&server, &dated_request(DATE_EXAMPLE)).status_code, 200);

    server.verify().unwrap();
}

#[test]
fn test_dated_requests_never_use_up_the_undated_interaction() {
    let mut server = MockServer::start(config()).unwrap();
    server
        .add_interaction(dated_interaction("a request for JSON data"))
        .unwrap();
    server.add_interaction(undated_interaction()).unwrap();

    assert_eq!(send(&server, &dated_request(DATE_EXAMPLE)).status_code, 200);
    assert_eq!(send(&server, &dated_request(DATE_EXAMPLE)).status_code, 200);

    match server.verify() {
        Err(Error::MockVerificationFailed(report)) => {
            assert!(report.unexpected_requests.is_empty());
            assert_eq!(
                report.unused_interactions,
                vec!["a request with a missing date parameter"]
            );
        }
        other => panic!("verification should fail, got {:?}", other),
    }
}

#[test]
fn test_extra_query_parameters_are_unexpected() {
    let mut server = MockServer::start(config()).unwrap();
    server.add_interaction(undated_interaction()).unwrap();

    let mut request = dated_request(DATE_EXAMPLE);
    request.query.insert("page".into(), "2".into());
    let response = send(&server, &request);

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    let paths: Vec<&str> = body["interactionDiffs"][0]["mismatches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|mismatch| mismatch["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["$.query.page", "$.query.validDate"]);
}

#[test]
fn test_concurrent_identical_requests_each_use_one_interaction() {
    const REQUESTS: usize = 8;

    let mut server = MockServer::start(config()).unwrap();
    for index in 0..REQUESTS {
        server
            .add_interaction(dated_interaction(&format!("dated request {}", index)))
            .unwrap();
    }

    let url = server.url();
    let workers: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let url = url.clone();
            thread::spawn(move || send_to(&url, &dated_request(DATE_EXAMPLE)).status_code)
        })
        .collect();
    for worker in workers {
        assert_eq!(worker.join().unwrap(), 200);
    }

    server.verify().unwrap();
    assert_eq!(server.ledger().all_interactions().len(), REQUESTS);
}

#[test]
fn test_unused_interactions_are_named() {
    let mut server = MockServer::start(config()).unwrap();
    server.add_interaction(dated_interaction("first")).unwrap();
    server.add_interaction(dated_interaction("second")).unwrap();
    server.add_interaction(undated_interaction()).unwrap();

    send(&server, &dated_request(DATE_EXAMPLE));

    match server.verify() {
        Err(Error::MockVerificationFailed(report)) => {
            assert!(report.unexpected_requests.is_empty());
            assert_eq!(
                report.unused_interactions,
                vec!["second", "a request with a missing date parameter"]
            );
        }
        other => panic!("verification should fail, got {:?}", other),
    }
    assert_eq!(server.state(), MockServerState::Failed);
}

#[test]
fn test_unexpected_requests_get_a_diagnostic() {
    let mut server = MockServer::start(config()).unwrap();
    server
        .add_interaction(dated_interaction("a request for JSON data"))
        .unwrap();
    send(&server, &dated_request(DATE_EXAMPLE));

    let response = send(&server, &dated_request("not-a-date"));

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("No interaction found for GET /provider"));
    assert_eq!(
        body["interactionDiffs"][0]["mismatches"][0]["path"],
        "$.query.validDate"
    );

    match server.verify() {
        Err(Error::MockVerificationFailed(report)) => {
            assert_eq!(report.unexpected_requests.len(), 1);
            assert_eq!(
                report.unexpected_requests[0].query.get("validDate").unwrap(),
                "not-a-date"
            );
            assert!(report.unused_interactions.is_empty());
        }
        other => panic!("verification should fail, got {:?}", other),
    }
}

#[test]
fn test_interactions_cant_be_added_after_verification() {
    let mut server = MockServer::start(config()).unwrap();
    server.verify().unwrap();

    assert!(matches!(
        server.add_interaction(undated_interaction()),
        Err(Error::InvalidState {
            state: MockServerState::Verified,
            ..
        })
    ));
}

#[test]
fn test_finalize_writes_the_document() {
    let pact_dir = tempfile::tempdir().unwrap();
    let mut configuration = config();
    configuration.set_pact_dir(pact_dir.path());

    let mut server = MockServer::start(configuration).unwrap();
    server.add_interaction(undated_interaction()).unwrap();
    send(&server, &RequestData::new("GET", "/provider"));

    let document = server.verify_and_finalize().unwrap();
    let written =
        ContractDocument::load(pact_dir.path().join("our_little_consumer-our_provider.json"))
            .unwrap();

    assert_eq!(written, document);
    assert_eq!(written.consumer.name, "Our Little Consumer");
}

#[test]
fn test_finalize_releases_the_socket_even_without_interactions() {
    let mut server = MockServer::start(config()).unwrap();
    let address = release_address(&server);
    server.verify().unwrap();

    assert!(matches!(server.finalize(), Err(Error::EmptyLedger)));
    assert!(TcpListener::bind(&address).is_ok());
    assert!(matches!(
        server.verify(),
        Err(Error::InvalidState {
            state: MockServerState::Finalized,
            ..
        })
    ));
}

#[test]
fn test_dropping_the_server_releases_the_socket() {
    let server = MockServer::start(config()).unwrap();
    let address = release_address(&server);

    drop(server);

    assert!(TcpListener::bind(&address).is_ok());
}
