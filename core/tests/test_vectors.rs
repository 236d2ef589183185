//! Verify operations against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector names an operation and its arguments, the request it must
//! produce, a simulated response, and the expected result or error. A fixture
//! transport replays the simulated response, so build and parse are checked
//! through the public `send` path. Comparing parsed JSON (not raw strings)
//! avoids false negatives from field-ordering differences.

use std::sync::Mutex;

use gorse_client::{
    ApiError, ClientConfig, Feedback, GorseClient, HttpMethod, HttpRequest, HttpResponse, Item, ListOptions,
    Transport, User,
};
use serde_json::Value;

const BASE_URL: &str = "http://localhost:8087";
const API_KEY: &str = "zhenghaoz";

/// Replays one canned response and keeps every request it receives.
struct FixtureTransport {
    response: HttpResponse,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Transport for FixtureTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn list_options(v: &Value) -> ListOptions {
    let mut options = ListOptions::new();
    if let Some(s) = v["write-back-type"].as_str() {
        options = options.write_back_type(s);
    }
    if let Some(s) = v["write-back-delay"].as_str() {
        options = options.write_back_delay(s);
    }
    if let Some(n) = v["n"].as_u64() {
        options = options.n(n);
    }
    if let Some(offset) = v["offset"].as_u64() {
        options = options.offset(offset);
    }
    options
}

fn str_arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args[key].as_str().unwrap_or_else(|| panic!("missing string arg {key}"))
}

fn from_arg<T: serde::de::DeserializeOwned>(args: &Value, key: &str) -> T {
    serde_json::from_value(args[key].clone()).unwrap()
}

/// Run `operation` and serialize its result back to JSON for comparison.
fn invoke(client: &GorseClient<FixtureTransport>, operation: &str, args: &Value) -> Result<Value, ApiError> {
    fn json<T: serde::Serialize>(result: Result<T, ApiError>) -> Result<Value, ApiError> {
        result.map(|v| serde_json::to_value(v).unwrap())
    }

    match operation {
        "insert_user" => json(client.insert_user(&from_arg::<User>(args, "user"))),
        "get_user" => json(client.get_user(str_arg(args, "id"))),
        "delete_user" => json(client.delete_user(str_arg(args, "id"))),
        "get_user_neighbors" => json(client.get_user_neighbors(str_arg(args, "id"))),
        "insert_item" => json(client.insert_item(&from_arg::<Item>(args, "item"))),
        "batch_insert_items" => json(client.batch_insert_items(&from_arg::<Vec<Item>>(args, "items"))),
        "get_item" => json(client.get_item(str_arg(args, "id"))),
        "get_item_neighbors" => json(client.get_item_neighbors(str_arg(args, "id"))),
        "get_item_neighbors_in_category" => json(
            client.get_item_neighbors_in_category(str_arg(args, "id"), str_arg(args, "category")),
        ),
        "delete_item" => json(client.delete_item(str_arg(args, "id"))),
        "insert_feedback" => json(client.insert_feedback(&from_arg::<Vec<Feedback>>(args, "feedback"))),
        "get_latest_items" => json(client.get_latest_items(str_arg(args, "user"), &list_options(&args["options"]))),
        "get_latest_category_items" => json(client.get_latest_category_items(
            str_arg(args, "user"),
            str_arg(args, "category"),
            &list_options(&args["options"]),
        )),
        "get_popular_items" => json(client.get_popular_items(str_arg(args, "user"), &list_options(&args["options"]))),
        "get_popular_category_items" => json(client.get_popular_category_items(
            str_arg(args, "user"),
            str_arg(args, "category"),
            &list_options(&args["options"]),
        )),
        "get_recommend" => json(client.get_recommend(str_arg(args, "user"), &list_options(&args["options"]))),
        "get_recommend_in_category" => json(client.get_recommend_in_category(
            str_arg(args, "user"),
            str_arg(args, "category"),
            &list_options(&args["options"]),
        )),
        other => panic!("unknown operation: {other}"),
    }
}

fn run_vectors(raw: &str) {
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let transport = FixtureTransport {
            response: HttpResponse::new(
                sim["status"].as_u64().unwrap() as u16,
                sim["body"].as_str().unwrap(),
            ),
            requests: Mutex::new(Vec::new()),
        };
        let client = GorseClient::with_transport(ClientConfig::new(BASE_URL, API_KEY), transport).unwrap();

        let result = invoke(&client, case["operation"].as_str().unwrap(), &case["args"]);

        // Verify the request
        let requests = client.transport().requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1, "{name}: exactly one request");
        let req = &requests[0];
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: url");
        assert_eq!(req.header("X-API-Key"), Some(API_KEY), "{name}: api key");

        match expected_req.get("body") {
            Some(expected_body) => {
                let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content type");
            }
            None => assert!(req.body.is_none(), "{name}: body should be None"),
        }

        // Verify the outcome
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            if let Some(status) = expected_error.get("status") {
                assert_eq!(err.status(), status.as_u64().map(|s| s as u16), "{name}: status");
                assert_eq!(err.body(), sim["body"].as_str(), "{name}: raw body kept");
            }
            if expected_error.get("kind").and_then(Value::as_str) == Some("deserialization") {
                assert!(matches!(err, ApiError::DeserializationError(_)), "{name}: expected decode error");
            }
        } else {
            assert_eq!(result.unwrap(), case["expected_result"], "{name}: parsed result");
        }
    }
}

#[test]
fn user_test_vectors() {
    run_vectors(include_str!("../../test-vectors/users.json"));
}

#[test]
fn item_test_vectors() {
    run_vectors(include_str!("../../test-vectors/items.json"));
}

#[test]
fn feedback_test_vectors() {
    run_vectors(include_str!("../../test-vectors/feedback.json"));
}

#[test]
fn list_test_vectors() {
    run_vectors(include_str!("../../test-vectors/lists.json"));
}
