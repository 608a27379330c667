//! Check build/parse against the JSON vectors in `test-vectors/`.
//!
//! A vector case names its input, the request `TodoClient` must build, a
//! canned response, and either the parsed result or the error kind. Bodies
//! are compared as JSON values so field order does not matter.

use serde_json::Value;
use todo_core::{ApiError, CreateTodo, HttpRequest, HttpResponse, Todo, TodoClient, UpdateTodo};
use uuid::Uuid;

const BASE_URL: &str = "http://localhost:3001";

/// Fields a PATCH body may carry. Anything not set on the input must be absent.
const PATCH_FIELDS: [&str; 3] = ["title", "completed", "completedAt"];

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn id_of(case: &Value) -> Uuid {
    case["input_id"].as_str().unwrap().parse().unwrap()
}

fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method.as_str(), expected["method"], "{name}: method");
    assert_eq!(req.path, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: path");

    let headers: Vec<(String, String)> = match expected.get("headers") {
        Some(headers) => serde_json::from_value(headers.clone()).unwrap(),
        None => Vec::new(),
    };
    assert_eq!(req.headers, headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&sent, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: unexpected body"),
    }
}

fn response(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

/// Compare a parse result with `expected_result`, or with `expected_error`
/// when the case has one.
fn assert_parsed<T>(name: &str, case: &Value, result: Result<T, ApiError>, check: impl FnOnce(T))
where
    T: std::fmt::Debug,
{
    let Some(kind) = case.get("expected_error") else {
        check(result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}")));
        return;
    };
    let err = result.expect_err(name);
    let ok = match kind.as_str().unwrap() {
        "NotFound" => matches!(err, ApiError::NotFound),
        "Server" => matches!(err, ApiError::Server { .. }),
        other => panic!("{name}: unknown expected_error {other}"),
    };
    assert!(ok, "{name}: expected {kind}, got {err}");
}

fn expected_todo(case: &Value) -> Todo {
    serde_json::from_value(case["expected_result"].clone()).unwrap()
}

#[test]
fn list_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/list.json")) {
        let name = case["name"].as_str().unwrap();
        assert_request(name, &client.build_list_todos(), &case["expected_request"]);

        let expected: Vec<Todo> = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_parsed(name, &case, client.parse_list_todos(response(&case)), |todos| {
            assert_eq!(todos, expected, "{name}: todos");
        });
    }
}

#[test]
fn get_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/get.json")) {
        let name = case["name"].as_str().unwrap();
        assert_request(name, &client.build_get_todo(id_of(&case)), &case["expected_request"]);
        assert_parsed(name, &case, client.parse_get_todo(response(&case)), |todo| {
            assert_eq!(todo, expected_todo(&case), "{name}: todo");
        });
    }
}

#[test]
fn create_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/create.json")) {
        let name = case["name"].as_str().unwrap();
        let input: CreateTodo = serde_json::from_value(case["input"].clone()).unwrap();
        let req = client.build_create_todo(&input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        assert_parsed(name, &case, client.parse_create_todo(response(&case)), |todo| {
            assert_eq!(todo, expected_todo(&case), "{name}: todo");
            assert!(!todo.completed, "{name}: new todos start incomplete");
        });
    }
}

#[test]
fn update_vectors_send_only_the_fields_that_change() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();
        let input: UpdateTodo = serde_json::from_value(case["input"].clone()).unwrap();
        let req = client.build_update_todo(id_of(&case), &input).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        for field in PATCH_FIELDS {
            assert_eq!(
                sent.get(field).is_some(),
                case["input"].get(field).is_some(),
                "{name}: `{field}` presence in the PATCH body",
            );
        }

        assert_parsed(name, &case, client.parse_update_todo(response(&case)), |todo| {
            assert_eq!(todo, expected_todo(&case), "{name}: todo");
            assert!(todo.timestamps_consistent(), "{name}: completedAt out of step with completed");
        });
    }
}

#[test]
fn delete_vectors() {
    let client = TodoClient::new(BASE_URL);
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        assert_request(name, &client.build_delete_todo(id_of(&case)), &case["expected_request"]);
        assert_parsed(name, &case, client.parse_delete_todo(response(&case)), |()| {});
    }
}
