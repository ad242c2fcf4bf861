//! End-to-end slash command handling against a mocked BigQuery REST API.

use std::collections::HashMap;

use lambda_http::{Body, Request, Response};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slack_resource_lookup::error::GENERIC_APOLOGY;
use slack_resource_lookup::handler::FORM_CONTENT_TYPE;
use slack_resource_lookup::slack::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use slack_resource_lookup::{function_handler, App, Config};

const SECRET: &str = "test-signing-secret";
const QUERY_PATH: &str = "/projects/prj/queries";

fn config_for(server_url: &str, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("SLACK_SIGNING_SECRET", SECRET),
        ("BIGQUERY_PROJECT_ID", "prj"),
        ("BIGQUERY_DATASET_ID", "inventory"),
        ("INSTANCES_TABLE_ID", "instances"),
        ("STATUS_CHECK_TABLE_ID", "checks"),
        ("BIGQUERY_ACCESS_TOKEN", "test-token"),
        ("BIGQUERY_API_BASE", server_url),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_vars(|key| vars.get(key).cloned()).unwrap()
}

fn slash_command(command: &str, text: &str) -> String {
    serde_urlencoded::to_string(&[
        ("token", "legacy"),
        ("team_id", "T1"),
        ("channel_id", "C1"),
        ("user_id", "U1"),
        ("user_name", "ops"),
        ("command", command),
        ("text", text),
    ])
    .unwrap()
}

fn signed(body: &str, secret: &str) -> Request {
    let ts = chrono::Utc::now().timestamp().to_string();
    let sig = slack::sign(secret, &ts, body.as_bytes()).unwrap();
    lambda_http::http::Request::builder()
        .method("POST")
        .header("Content-Type", FORM_CONTENT_TYPE)
        .header(TIMESTAMP_HEADER, ts)
        .header(SIGNATURE_HEADER, sig)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn reply_json(response: &Response<Body>) -> Value {
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["Content-Type"], "application/json");
    let Body::Text(text) = response.body() else {
        panic!("expected a text body");
    };
    serde_json::from_str(text).unwrap()
}

fn instance_schema() -> Value {
    json!({"fields": [
        {"name": "instance_id", "type": "STRING"},
        {"name": "instance_name", "type": "STRING"},
        {"name": "project_id", "type": "STRING"},
        {"name": "status", "type": "STRING"},
        {"name": "zone", "type": "STRING"},
        {"name": "machine_type", "type": "STRING"},
        {"name": "creation_timestamp", "type": "TIMESTAMP"},
        {"name": "instance_console_url", "type": "STRING"}
    ]})
}

fn status_schema() -> Value {
    json!({"fields": [
        {"name": "item_name", "type": "STRING"},
        {"name": "current_status", "type": "STRING"},
        {"name": "details", "type": "STRING"},
        {"name": "last_checked", "type": "TIMESTAMP"}
    ]})
}

fn row(values: &[Value]) -> Value {
    json!({"f": values.iter().map(|v| json!({"v": v})).collect::<Vec<_>>()})
}

#[tokio::test]
async fn getinfo_renders_blocks_for_each_match() {
    let server = MockServer::start().await;

    let body = json!({
        "jobComplete": true,
        "schema": instance_schema(),
        "rows": [
            row(&[
                json!("1001"), json!("vm-1"), json!("prj"), json!("RUNNING"),
                json!("us-east1-b"), json!("e2-small"), json!("1700000000000000"),
                json!("https://console.cloud.google.com/compute/instancesDetail/zones/us-east1-b/instances/vm-1?project=prj")
            ]),
            row(&[
                json!("vm-1"), json!("vm-1-old"), json!("prj"), json!("TERMINATED"),
                Value::Null, Value::Null, Value::Null, Value::Null
            ]),
        ]
    });

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .and(body_string_contains("\"parameterMode\":\"NAMED\""))
        .and(body_string_contains("\"parameterValue\":{\"value\":\"vm-1\"}"))
        .and(body_string_contains("prj.inventory.instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/getinfo", "VM-1"), SECRET))
        .await
        .unwrap();

    let reply = reply_json(&response);
    assert_eq!(reply["response_type"], "ephemeral");

    let blocks = reply["blocks"].as_array().unwrap();
    let kinds: Vec<&str> = blocks.iter().map(|b| b["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["section", "actions", "divider", "section"]);

    let first = blocks[0]["text"]["text"].as_str().unwrap();
    assert!(first.starts_with("ℹ️ Information for *vm-1* (ID: *1001*):"));
    assert!(first.contains("• Created/Updated: _14-11-2023 at 22:13 UTC_"));

    let button = &blocks[1]["elements"][0];
    assert_eq!(button["type"], "button");
    assert_eq!(button["text"]["text"], "🔗 Open in GCP Console");

    let second = blocks[3]["text"]["text"].as_str().unwrap();
    assert!(second.contains("• Zone: *N/A*"));
    assert!(second.ends_with("• Created/Updated: _Not available_"));
}

#[tokio::test]
async fn getinfo_without_rows_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": instance_schema(),
            "totalRows": "0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/getinfo", "ghost"), SECRET))
        .await
        .unwrap();

    let reply = reply_json(&response);
    assert_eq!(reply["response_type"], "ephemeral");
    assert_eq!(reply["text"], "No information found for resource: *ghost*.");
}

#[tokio::test]
async fn checkstatus_reports_tier() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .and(body_string_contains("prj.inventory.checks"))
        .and(body_string_contains("\"maxResults\":1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobComplete": true,
            "schema": status_schema(),
            "rows": [row(&[
                json!("db-1"), json!("Pending Review"), json!("waiting on approval"),
                json!("1709629620000000")
            ])]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/checkstatus", "db-1"), SECRET))
        .await
        .unwrap();

    let reply = reply_json(&response);
    assert_eq!(
        reply["text"],
        "⏳ Resource *db-1* has status: *Pending Review*.\n   \
         • Details: _waiting on approval_\n   \
         • Last checked: _05-03-2024 at 09:07 UTC_"
    );
}

#[tokio::test]
async fn backend_failure_is_an_apology_without_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(403).set_body_string("Access Denied: secret-dataset for sa@prj"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/checkstatus", "db-1"), SECRET))
        .await
        .unwrap();

    let reply = reply_json(&response);
    assert_eq!(reply["text"], GENERIC_APOLOGY);
}

#[tokio::test]
async fn incomplete_job_is_an_apology() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobComplete": false})))
        .expect(1)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/getinfo", "vm-1"), SECRET))
        .await
        .unwrap();

    assert_eq!(reply_json(&response)["text"], GENERIC_APOLOGY);
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"jobComplete": true, "schema": status_schema()}))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), &[("BIGQUERY_TIMEOUT_SECS", "1")]);
    let app = App::new(&config).unwrap();
    let response = function_handler(&app, signed(&slash_command("/checkstatus", "db-1"), SECRET))
        .await
        .unwrap();

    assert_eq!(reply_json(&response)["text"], GENERIC_APOLOGY);
}

#[tokio::test]
async fn unconfigured_table_never_reaches_the_store() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server.uri(), &[("STATUS_CHECK_TABLE_ID", "")]);
    let app = App::new(&config).unwrap();
    let response = function_handler(&app, signed(&slash_command("/checkstatus", "db-1"), SECRET))
        .await
        .unwrap();

    assert_eq!(reply_json(&response)["text"], GENERIC_APOLOGY);
}

#[tokio::test]
async fn rejected_requests_never_reach_the_store() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();

    let unknown = function_handler(&app, signed(&slash_command("/foo", "bar"), SECRET))
        .await
        .unwrap();
    assert_eq!(reply_json(&unknown)["text"], "Command '/foo' not recognized.");

    let two_tokens = function_handler(&app, signed(&slash_command("/getinfo", "foo bar"), SECRET))
        .await
        .unwrap();
    assert_eq!(
        reply_json(&two_tokens)["text"],
        "Error: A single parameter was expected. Example: /getinfo my-resource"
    );

    let forged = function_handler(&app, signed(&slash_command("/getinfo", "vm-1"), "not-the-secret"))
        .await
        .unwrap();
    assert_eq!(
        reply_json(&forged)["text"],
        "Validation Error: Invalid Slack signature."
    );
}

#[tokio::test]
async fn parameter_without_allowed_characters_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = App::new(&config_for(&server.uri(), &[])).unwrap();
    let response = function_handler(&app, signed(&slash_command("/checkstatus", "???"), SECRET))
        .await
        .unwrap();

    assert_eq!(
        reply_json(&response)["text"],
        "❓ Resource ** was not found for status check."
    );
}

#[tokio::test]
async fn stale_request_is_rejected() {
    let app = App::new(&config_for("http://127.0.0.1:9", &[])).unwrap();

    let body = slash_command("/getinfo", "vm-1");
    let ts = (chrono::Utc::now().timestamp() - 600).to_string();
    let sig = slack::sign(SECRET, &ts, body.as_bytes()).unwrap();
    let request = lambda_http::http::Request::builder()
        .method("POST")
        .header("Content-Type", FORM_CONTENT_TYPE)
        .header(TIMESTAMP_HEADER, ts)
        .header(SIGNATURE_HEADER, sig)
        .body(Body::from(body))
        .unwrap();

    let response = function_handler(&app, request).await.unwrap();
    assert_eq!(
        reply_json(&response)["text"],
        "Validation Error: Request timestamp is outside the allowed window."
    );
}
