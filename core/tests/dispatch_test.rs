use serde_json::json;
use serial_test::serial;
use weft_core::{
    ChatClient, ChatRequest, ClientConfig, DispatchError, GenerationParams, Message,
    OPENAI_API_BASE,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(uri: &str) -> ClientConfig {
    ClientConfig {
        endpoint: format!("{uri}/v1/chat/completions"),
        model: "gpt-4o-mini".to_string(),
        keys: vec!["sk-test-1".to_string()],
        orgs: vec![],
        retry_budget: 2,
        json_mode: false,
        request_timeout_ms: 2_000,
        rate_limit_backoff_ms: 10,
        batch_concurrency: 4,
        params: GenerationParams::default(),
    }
}

fn completion(text: &str) -> serde_json::Value {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
}

fn provider_error(code: &str) -> serde_json::Value {
    json!({"error": {"code": code, "message": "simulated"}})
}

#[test]
#[serial]
fn config_loads_from_defaults() {
    // Clear env vars to test defaults (including ones from config_loads_from_env test)
    std::env::remove_var("WEFT_API_BASE");
    std::env::remove_var("WEFT_MODEL");
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("WEFT_TIMEOUT_MS");

    let cfg = ClientConfig::default();
    assert_eq!(cfg.endpoint, OPENAI_API_BASE);
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert!(cfg.keys.is_empty());
    assert!(cfg.orgs.is_empty());
    assert_eq!(cfg.retry_budget, 2);
    assert!(!cfg.json_mode);
    assert_eq!(cfg.request_timeout_ms, 30_000);
    assert_eq!(cfg.rate_limit_backoff_ms, 1_000);
    assert_eq!(cfg.batch_concurrency, 20);
}

#[test]
#[serial]
fn config_loads_from_env() {
    std::env::set_var("WEFT_API_BASE", "http://test:9000/v1/chat/completions");
    std::env::set_var("WEFT_MODEL", "qwen-max");
    std::env::set_var("OPENAI_API_KEY", "sk-from-env");
    std::env::set_var("WEFT_TIMEOUT_MS", "5000");

    let cfg = ClientConfig::default();
    assert_eq!(cfg.endpoint, "http://test:9000/v1/chat/completions");
    assert_eq!(cfg.model, "qwen-max");
    assert_eq!(cfg.keys, vec!["sk-from-env".to_string()]);
    assert_eq!(cfg.request_timeout_ms, 5000);

    // Clean up
    std::env::remove_var("WEFT_API_BASE");
    std::env::remove_var("WEFT_MODEL");
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("WEFT_TIMEOUT_MS");
}

#[tokio::test]
async fn send_returns_trimmed_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  hello there  ")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    let answer = client.send("hi").await.unwrap();
    assert_eq!(answer, "hello there");
}

#[tokio::test]
async fn request_body_follows_the_wire_schema() {
    let server = MockServer::start().await;
    // Values chosen to be exactly representable so the JSON matcher compares cleanly
    let params = GenerationParams::default()
        .max_tokens(64)
        .top_p(0.5)
        .temperature(1.0)
        .repetition_penalty(1.0)
        .stop(["<|end|>"]);

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "n": 1,
            "max_tokens": 64,
            "top_p": 0.5,
            "temperature": 1.0,
            "frequency_penalty": 1.0,
            "stop": ["<|end|>"],
            "messages": [
                {"role": "system", "content": "be brief"},
                {"role": "user", "content": "hi"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    let request =
        ChatRequest::new(vec![Message::system("be brief"), Message::user("hi")]).with_params(params);
    client.send(request).await.unwrap();

    // gpt-family requests never carry sampler knobs the API rejects
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("top_k").is_none());
    assert!(body.get("response_format").is_none());
}

#[tokio::test]
async fn max_tokens_is_capped_on_the_wire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"max_tokens": 4096})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    let request = ChatRequest::new("hi").with_params(GenerationParams::default().max_tokens(50_000));
    client.send(request).await.unwrap();
}

#[tokio::test]
async fn internlm_models_keep_top_k() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "internlm2.5-latest", "top_k": 50})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.model = "internlm2.5-latest".to_string();
    cfg.params = GenerationParams::default().top_k(50);
    let client = ChatClient::new(cfg).unwrap();
    client.send("hi").await.unwrap();
}

#[tokio::test]
async fn environment_turns_reach_the_wire_as_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    client
        .send(vec![
            Message::new("environment", "the door is locked"),
            Message::user("what now?"),
        ])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "the door is locked");
    assert_eq!(body["messages"][1]["role"], "user");
}

#[tokio::test]
async fn json_mode_requests_a_json_object_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({"response_format": {"type": "json_object"}}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.json_mode = true;
    let client = ChatClient::new(cfg).unwrap();
    client.send("give me json").await.unwrap();
}

#[tokio::test]
async fn retries_stop_after_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(provider_error("boom")))
        .expect(2)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    match client.send("hi").await.unwrap_err() {
        DispatchError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 2);
            assert!(
                last_error.contains("provider error"),
                "unexpected last error: {last_error}"
            );
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limited_attempt_consumes_budget_then_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(provider_error("rate_limit_exceeded")),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    assert_eq!(client.send("hi").await.unwrap(), "recovered");
}

#[tokio::test]
async fn quota_error_invalidates_key_and_rotates() {
    let server = MockServer::start().await;
    // Rotation picks sk-beta first, which is out of quota; sk-alpha still works.
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-alpha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("fresh key works")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(provider_error("insufficient_quota")))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.keys = vec!["sk-alpha".to_string(), "sk-beta".to_string()];
    let client = ChatClient::new(cfg).unwrap();

    assert_eq!(client.send("hi").await.unwrap(), "fresh key works");
    assert_eq!(client.usable_keys().await, 1);
}

#[tokio::test]
async fn exhausted_keys_fail_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(provider_error("insufficient_quota")))
        .expect(2)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.keys = vec!["sk-alpha".to_string(), "sk-beta".to_string()];
    // A generous budget must not produce more traffic once every key is dead
    cfg.retry_budget = 5;
    let client = ChatClient::new(cfg).unwrap();

    assert!(matches!(
        client.send("hi").await.unwrap_err(),
        DispatchError::ExhaustedCredentials
    ));
    assert_eq!(client.usable_keys().await, 0);
}

#[tokio::test]
async fn empty_key_ring_sends_no_traffic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("never")))
        .expect(0)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.keys = vec![];
    let client = ChatClient::new(cfg).unwrap();
    assert!(matches!(
        client.send("hi").await.unwrap_err(),
        DispatchError::ExhaustedCredentials
    ));
}

#[tokio::test]
async fn unsupported_model_sends_no_traffic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("never")))
        .expect(0)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.model = "llama-3-70b".to_string();
    let client = ChatClient::new(cfg).unwrap();
    assert!(matches!(
        client.send("hi").await.unwrap_err(),
        DispatchError::UnsupportedModel(model) if model == "llama-3-70b"
    ));
}

#[tokio::test]
async fn per_request_model_override_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("never")))
        .expect(0)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    let request =
        ChatRequest::new("hi").with_params(GenerationParams::default().model("claude-3-opus"));
    assert!(matches!(
        client.send(request).await.unwrap_err(),
        DispatchError::UnsupportedModel(model) if model == "claude-3-opus"
    ));
}

#[tokio::test]
async fn org_header_rotates_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(2)
        .mount(&server)
        .await;

    let mut cfg = test_config(&server.uri());
    cfg.orgs = vec!["org-alpha".to_string(), "org-beta".to_string()];
    let client = ChatClient::new(cfg).unwrap();
    client.send("first").await.unwrap();
    client.send("second").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let orgs: Vec<&str> = requests
        .iter()
        .map(|r| r.headers.get("openai-organization").unwrap().to_str().unwrap())
        .collect();
    assert_eq!(orgs, vec!["org-beta", "org-alpha"]);
}

#[tokio::test]
async fn transport_failures_exhaust_the_budget() {
    // Nothing listens on the discard port, so every attempt is refused
    let mut cfg = test_config("http://127.0.0.1:9");
    cfg.retry_budget = 3;
    let client = ChatClient::new(cfg).unwrap();

    match client.send("hi").await.unwrap_err() {
        DispatchError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert!(
                last_error.contains("transport error"),
                "unexpected last error: {last_error}"
            );
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_reply_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("gateway timeout"))
        .expect(2)
        .mount(&server)
        .await;

    let client = ChatClient::new(test_config(&server.uri())).unwrap();
    match client.send("hi").await.unwrap_err() {
        DispatchError::RetriesExhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 2);
            assert!(
                last_error.contains("decode"),
                "unexpected last error: {last_error}"
            );
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}
