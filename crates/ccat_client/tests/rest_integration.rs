//! Integration tests for the settings, LLM and server endpoints.

use ccat_client::{CatClient, SettingRequest};
use serde_json::{json, Map};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CatClient {
    CatClient::builder()
        .base_url(server.uri())
        .api_key("meow")
        .build()
        .unwrap()
}

fn setting(id: &str, name: &str, category: &str) -> serde_json::Value {
    json!({"setting_id": id, "name": name, "category": category, "value": {}})
}

#[tokio::test]
async fn list_settings_sends_search_and_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings"))
        .and(query_param("search", "prompt"))
        .and(header("access_token", "meow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "settings": [setting("a", "prompt_prefix", "prompt"), setting("b", "prompt_suffix", "prompt")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = client_for(&server)
        .settings()
        .list(Some("prompt"))
        .await
        .unwrap();

    let ids: Vec<_> = settings.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
    assert_eq!(settings[0].name, "prompt_prefix");
}

#[tokio::test]
async fn no_access_token_without_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"settings": []})))
        .mount(&server)
        .await;

    let client = CatClient::builder().base_url(server.uri()).build().unwrap();
    assert!(client.settings().list(None).await.unwrap().is_empty());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("access_token"));
    assert!(requests[0].url.query().is_none());
}

#[tokio::test]
async fn get_setting_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"setting": setting("abc", "episodic", "memory")})),
        )
        .mount(&server)
        .await;

    let found = client_for(&server).settings().get("abc").await.unwrap();
    assert_eq!(found.id, "abc");
    assert_eq!(found.category, "memory");
}

#[tokio::test]
async fn create_update_delete_round_the_setting() {
    let server = MockServer::start().await;
    let mut value = Map::new();
    value.insert("k".into(), json!(1));
    let request = SettingRequest::new("n")
        .with_category("c")
        .with_value(value);

    Mock::given(method("POST"))
        .and(path("/settings"))
        .and(body_json(json!({"name": "n", "category": "c", "value": {"k": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"setting": setting("new", "n", "c")})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/settings/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"setting": setting("new", "n", "c")})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/settings/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"setting": setting("new", "n", "c")})))
        .expect(1)
        .mount(&server)
        .await;

    let settings = client_for(&server).settings();
    assert_eq!(settings.create(&request).await.unwrap().id, "new");
    let updated = settings.update("new", &request).await.unwrap();
    assert_eq!(updated.map(|s| s.id).as_deref(), Some("new"));
    let deleted = settings.delete("new").await.unwrap();
    assert_eq!(deleted.map(|s| s.name).as_deref(), Some("n"));
}

#[tokio::test]
async fn error_status_carries_code_and_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"detail":"nope"}"#))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .settings()
        .get("missing")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), r#"code: 404 - msg: Not Found - {"detail":"nope"}"#);
}

#[tokio::test]
async fn llm_list_get_and_update() {
    let server = MockServer::start().await;
    let ollama = json!({
        "name": "LLMOllamaConfig",
        "value": {"model": "llama3"},
        "schema": {
            "humanReadableName": "Ollama",
            "description": "Local models",
            "properties": {"model": {"title": "Model", "type": "string", "default": "llama2"}}
        }
    });
    Mock::given(method("GET"))
        .and(path("/llm/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"settings": [ollama.clone()]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/llm/settings/LLMOllamaConfig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/llm/settings/LLMOllamaConfig"))
        .and(body_json(json!({"model": "mistral"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "setting": {"setting_id": "LLMOllamaConfig", "name": "LLMOllamaConfig", "value": {"model": "mistral"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let llm = client_for(&server).llm();
    assert_eq!(llm.list().await.unwrap().len(), 1);

    let one = llm.get("LLMOllamaConfig").await.unwrap();
    assert_eq!(one.schema.unwrap().properties["model"].title, "Model");

    let mut values = Map::new();
    values.insert("model".into(), json!("mistral"));
    let updated = llm
        .update("LLMOllamaConfig", &values)
        .await
        .unwrap()
        .expect("server echoed the setting");
    assert_eq!(updated.value["model"], "mistral");
}

#[tokio::test]
async fn version_reads_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "We're all mad here, dear!", "version": "1.7.1"})),
        )
        .mount(&server)
        .await;

    let api = client_for(&server).server();
    let version = api.version().await.unwrap();
    assert_eq!(version.version, "1.7.1");
    assert!(api.is_up().await);
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    // Bind then drop to get a port with nothing listening.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = CatClient::builder()
        .base_url(format!("http://127.0.0.1:{}", port))
        .build()
        .unwrap();
    let err = client.server().version().await.unwrap_err();
    assert!(matches!(err, ccat_client::Error::Http(_)), "got {:?}", err);
    assert!(!client.server().is_up().await);
}

#[tokio::test]
async fn success_without_setting_body_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/llm/settings/LLMOllamaConfig"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "LLMOllamaConfig",
            "value": {"model": "mistral"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/settings/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut values = Map::new();
    values.insert("model".into(), json!("mistral"));
    assert_eq!(client.llm().update("LLMOllamaConfig", &values).await.unwrap(), None);
    assert_eq!(client.settings().delete("abc").await.unwrap(), None);
}

#[tokio::test]
async fn get_without_setting_body_is_a_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let err = client_for(&server).settings().get("abc").await.unwrap_err();
    assert!(matches!(err, ccat_client::Error::Json(_)), "got {:?}", err);
}

#[tokio::test]
async fn ids_are_sent_as_one_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings/a%2Fb%3Fc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"setting": setting("a/b?c", "n", "c")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let found = client_for(&server).settings().get("a/b?c").await.unwrap();
    assert_eq!(found.id, "a/b?c");
    assert!(server.received_requests().await.unwrap()[0].url.query().is_none());
}

#[tokio::test]
async fn unauthorized_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"detail":"Invalid Credentials"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/llm/settings"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.settings().list(None).await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(!err.is_not_found());
    assert!(!err.is_server_error());

    let err = client.llm().list().await.unwrap_err();
    assert!(err.is_server_error());
    assert!(!err.is_auth_error());
}

#[tokio::test]
async fn user_agent_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "catctl-tests/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "version": "1"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = CatClient::builder()
        .base_url(server.uri())
        .user_agent("catctl-tests/1.0")
        .build()
        .unwrap();
    assert_eq!(client.server().version().await.unwrap().version, "1");
}

#[tokio::test]
async fn slow_response_hits_the_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "ok", "version": "1"}))
                .set_delay(std::time::Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = CatClient::builder()
        .base_url(server.uri())
        .timeout(std::time::Duration::from_millis(100))
        .build()
        .unwrap();
    match client.server().version().await {
        Err(ccat_client::Error::Http(e)) => assert!(e.is_timeout(), "got {:?}", e),
        other => panic!("expected a timeout, got {:?}", other),
    }
}
