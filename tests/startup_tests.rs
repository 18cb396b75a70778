use std::sync::Arc;

use mockito::Server;
use renaltrack::config::{load_config, parse_config};
use renaltrack::models::TokenPair;
use renaltrack::{startup, Session};
use serde_json::json;

fn file_backed_config(base_url: &str, session_path: &std::path::Path) -> String {
    format!(
        r#"
version: "1.0.0"
api:
  base_url: "{}"
  timeout_in_ms: 2000
store:
  persist: true
  type: file
  path: "{}"
"#,
        base_url,
        session_path.display()
    )
}

#[tokio::test]
async fn in_memory_context_starts_signed_out() {
    let config = parse_config("version: \"1.0.0\"\napi:\n  base_url: \"http://localhost\"\n").unwrap();
    let ctx = startup::build(Arc::new(config)).await.unwrap();

    assert_eq!(ctx.store.get_name(), "memory");
    assert_eq!(ctx.auth.session().await.unwrap(), Session::Unauthenticated);
    assert_eq!(ctx.signal.observer_count(), 0);
}

#[tokio::test]
async fn file_backed_session_survives_a_rebuild() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/auth/login")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "data": {
                    "user": {"id": "u-1"},
                    "tokens": {"accessToken": "T1", "refreshToken": "R1"}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let yaml = file_backed_config(&server.url(), &session_path);

    let first = startup::build(Arc::new(parse_config(&yaml).unwrap()))
        .await
        .unwrap();
    first.auth.login("ada@example.com", "pw").await.unwrap();
    assert!(session_path.exists());
    drop(first);

    let second = startup::build(Arc::new(parse_config(&yaml).unwrap()))
        .await
        .unwrap();
    assert_eq!(second.store.get_name(), "file");
    assert_eq!(second.store.get().await.unwrap(), Some(TokenPair::new("T1", "R1")));
    assert_eq!(second.auth.session().await.unwrap(), Session::Authenticated);
}

#[test]
fn config_file_is_loaded_with_environment_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        "version: \"1.0.0\"\napi:\n  base_url: \"https://api.example.com\"\n  timeout_in_ms: 4000\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.api.timeout_in_ms, 4000);

    std::env::set_var("RENALTRACK_API__TIMEOUT_IN_MS", "1500");
    let overridden = load_config(&path);
    std::env::remove_var("RENALTRACK_API__TIMEOUT_IN_MS");

    let overridden = overridden.unwrap();
    assert_eq!(overridden.api.timeout_in_ms, 1500);
    assert_eq!(overridden.api.base_url, "https://api.example.com");
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_config(dir.path().join("absent.yaml"));
    assert!(matches!(result, Err(renaltrack::Error::Config(_))));
}
