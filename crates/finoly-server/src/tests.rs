//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use finoly_core::{MockBackend, ScriptedReply};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn setup_test_app(ai: Option<AIClient>) -> Router {
    create_router_with_prompts(ServerConfig::default(), ai, PromptLibrary::embedded_only())
}

fn scripted_app(replies: Vec<ScriptedReply>) -> Router {
    setup_test_app(Some(AIClient::Mock(MockBackend::scripted(replies))))
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_prompt(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/expense-tracker")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// ========== General Routes ==========

#[tokio::test]
async fn test_home() {
    let response = get(setup_test_app(None), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );

    let json = get_body_json(response).await;
    assert_eq!(json["message"], "Welcome to Finoly Backend API");
    assert_eq!(json["status"], "success");
    assert_eq!(json["version"], API_VERSION);
}

#[tokio::test]
async fn test_health() {
    let response = get(setup_test_app(None), "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["message"], "Server is running");
}

#[tokio::test]
async fn test_hello_default_and_named() {
    let json = get_body_json(get(setup_test_app(None), "/api/hello").await).await;
    assert_eq!(json["message"], "Hello, World!");
    assert_eq!(json["status"], "success");

    let json = get_body_json(get(setup_test_app(None), "/api/hello?name=Ada").await).await;
    assert_eq!(json["message"], "Hello, Ada!");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = get(setup_test_app(None), "/api/nope").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Not Found");
    assert_eq!(json["message"], "The requested resource was not found");
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let response = setup_test_app(None)
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let config = ServerConfig {
        allowed_origins: vec!["http://app.example".into()],
    };
    let app = create_router_with_prompts(config, None, PromptLibrary::embedded_only());
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .header("origin", "http://app.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "http://app.example"
    );
}

#[test]
fn test_parse_origins() {
    assert_eq!(
        parse_origins(" http://a.test, ,http://b.test "),
        vec!["http://a.test", "http://b.test"]
    );
    assert!(parse_origins("").is_empty());
}

// ========== Expense Tracker: request validation ==========

#[tokio::test]
async fn test_expense_tracker_without_backend() {
    let response = setup_test_app(None)
        .oneshot(post_prompt(serde_json::json!({"prompt": "I spent 5 on tea"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "AI backend not configured");
}

#[tokio::test]
async fn test_expense_tracker_missing_prompt() {
    let app = setup_test_app(Some(AIClient::mock()));
    let response = app
        .oneshot(post_prompt(serde_json::json!({"text": "hello"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Missing prompt");
    assert_eq!(json["message"], "Please provide a prompt in the request body");
}

#[tokio::test]
async fn test_expense_tracker_invalid_body() {
    let app = setup_test_app(Some(AIClient::mock()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/expense-tracker")
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(get_body_json(response).await["error"], "Missing prompt");
}

// ========== Expense Tracker: outcomes ==========

#[tokio::test]
async fn test_expense_tracker_addition() {
    let app = scripted_app(vec![
        ScriptedReply::text(
            r#"{"prompt_type": "addition", "confidence": "high", "reasoning": "spent"}"#,
        ),
        ScriptedReply::text(
            r#"[{"amount": "$50", "category": "Food", "date": "18/10/26", "time": "10am"}]"#,
        ),
    ]);

    let response = app
        .oneshot(post_prompt(
            serde_json::json!({"prompt": "I spent 50 dollars on food"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["prompt_type"], "addition");
    assert_eq!(json["original_prompt"], "I spent 50 dollars on food");
    assert_eq!(json["prompt_analysis"]["confidence"], "high");
    assert_eq!(
        json["expenses"],
        serde_json::json!([{"amount": "50", "category": "food", "date": "18/10/26", "time": "10am"}])
    );
}

#[tokio::test]
async fn test_expense_tracker_missing_info() {
    let app = scripted_app(vec![
        ScriptedReply::text(r#"{"prompt_type": "addition"}"#),
        ScriptedReply::text(
            r#"{"missing_info": true, "required_fields": ["amount"], "message": "How much?"}"#,
        ),
    ]);

    let response = app
        .oneshot(post_prompt(serde_json::json!({"prompt": "add lunch"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Missing required information");
    assert_eq!(json["message"], "How much?");
    assert_eq!(json["required_fields"], serde_json::json!(["amount"]));
    assert_eq!(json["original_prompt"], "add lunch");
    assert!(json["example_prompt"].as_str().unwrap().starts_with("Example:"));
}

#[tokio::test]
async fn test_expense_tracker_unparsed_addition() {
    let app = scripted_app(vec![
        ScriptedReply::text(r#"{"prompt_type": "addition"}"#),
        ScriptedReply::text("I could not find any expenses, sorry."),
    ]);

    let response = app
        .oneshot(post_prompt(serde_json::json!({"prompt": "I paid for stuff"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "unparsed");
    assert_eq!(json["prompt_type"], "addition");
    assert_eq!(json["error"], "Failed to parse expense data");
    assert_eq!(json["raw_response"], "I could not find any expenses, sorry.");
}

#[tokio::test]
async fn test_expense_tracker_view() {
    let app = scripted_app(vec![
        ScriptedReply::text(r#"{"prompt_type": "view", "confidence": "high", "reasoning": "show"}"#),
        ScriptedReply::text(
            r#"{"team": null, "time_period": null, "category": "food", "amount_range": {"operator": "lt", "value": 50, "text": "under 50"}}"#,
        ),
    ]);

    let response = app
        .oneshot(post_prompt(
            serde_json::json!({"prompt": "food expenses under 50 dollars"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["prompt_type"], "view");
    let result = &json["query_result"];
    assert_eq!(
        result["query_code"],
        "db.select().from(expense).where(and(eq(expense.category, 'food'), lt(expense.amount, 50)));"
    );
    assert_eq!(result["filters"]["category"], "food");
    assert!(result["date_range"].is_null());
    assert!(result["explanation"].as_str().unwrap().contains("food"));
}

#[tokio::test]
async fn test_expense_tracker_view_insufficient() {
    let app = scripted_app(vec![
        ScriptedReply::text(r#"{"prompt_type": "view"}"#),
        ScriptedReply::text(
            r#"{"insufficient_info": true, "message": "Which expenses?", "missing_fields": ["team"]}"#,
        ),
    ]);

    let response = app
        .oneshot(post_prompt(serde_json::json!({"prompt": "show me"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Insufficient information");
    assert_eq!(json["message"], "Which expenses?");
    assert_eq!(json["missing_fields"], serde_json::json!(["team"]));
    assert!(!json["example_queries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_expense_tracker_unclear() {
    let app = scripted_app(vec![ScriptedReply::text(
        r#"{"prompt_type": "unclear", "confidence": "low", "reasoning": "greeting"}"#,
    )]);

    let response = app
        .oneshot(post_prompt(serde_json::json!({"prompt": "hello there"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "unclear");
    assert_eq!(json["prompt_analysis"]["prompt_type"], "unclear");
    assert_eq!(
        json["message"],
        "Could not determine if this is an addition or view request"
    );
}

#[tokio::test]
async fn test_expense_tracker_backend_failure_is_sanitized() {
    let app = setup_test_app(Some(AIClient::Mock(MockBackend::failing(
        "groq API error 503: secret upstream detail",
    ))));

    let response = app
        .oneshot(post_prompt(serde_json::json!({"prompt": "I spent 5 on tea"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Expense tracking failed");
    assert_eq!(json["message"], "An internal error occurred");
    assert!(!json.to_string().contains("secret upstream detail"));
}

#[tokio::test]
async fn test_expense_tracker_with_heuristic_mock() {
    let app = setup_test_app(Some(AIClient::mock()));
    let response = app
        .oneshot(post_prompt(
            serde_json::json!({"prompt": "I spent 50 dollars on food today"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["prompt_type"], "addition");
    assert_eq!(json["expenses"][0]["amount"], "50");
    assert_eq!(json["expenses"][0]["category"], "food");
}
