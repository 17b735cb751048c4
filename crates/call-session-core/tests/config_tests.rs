use call_session_core::config::CONFIG_ENV_VAR;
use call_session_core::{CallConfig, CallError, ConfigError, IceTransportPolicy};
use serial_test::serial;
use std::time::Duration;

mod common;

fn write_config(name: &str, yaml: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("call-session-{}-{}.yaml", name, std::process::id()));
    std::fs::write(&path, yaml).unwrap();
    path
}

#[test]
#[serial]
fn test_from_env_without_variable_uses_defaults() {
    std::env::remove_var(CONFIG_ENV_VAR);
    let config = CallConfig::from_env().unwrap();
    assert_eq!(config, CallConfig::default());
}

#[test]
#[serial]
fn test_from_env_loads_file() {
    let path = write_config(
        "env",
        r#"
ice_servers:
  - urls: ["turn:turn.example.com:3478"]
    username: "user"
    credential: "secret"
ice_transport_policy: relay
ring_timeout_secs: 20
negotiation_timeout_secs: null
"#,
    );
    std::env::set_var(CONFIG_ENV_VAR, &path);

    let config = CallConfig::from_env().unwrap();
    std::env::remove_var(CONFIG_ENV_VAR);
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.ice_transport_policy, IceTransportPolicy::Relay);
    assert_eq!(config.ring_timeout(), Some(Duration::from_secs(20)));
    assert_eq!(config.negotiation_timeout(), None);
    assert!(config.reject_when_busy);
}

#[test]
#[serial]
fn test_from_env_missing_file() {
    std::env::set_var(CONFIG_ENV_VAR, "/nonexistent/call-session.yaml");
    let result = CallConfig::from_env();
    std::env::remove_var(CONFIG_ENV_VAR);

    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let config = CallConfig::default().with_event_channel_capacity(0);
    let result = call_session_core::CallSessionManager::builder()
        .with_local_user("alice")
        .with_config(config)
        .with_media_devices(common::MockDevices::new())
        .with_peer_factory(common::MockPeerFactory::new())
        .with_signaling(common::MockSignaling::new())
        .with_surface(common::MockSurface::new())
        .build()
        .await;

    assert!(matches!(result, Err(CallError::Config(ConfigError::Invalid { .. }))));
}

#[tokio::test]
async fn test_builder_requires_collaborators() {
    let result = call_session_core::CallSessionManager::builder()
        .with_local_user("alice")
        .with_media_devices(common::MockDevices::new())
        .build()
        .await;

    assert!(matches!(result, Err(CallError::MissingCollaborator("peer transport factory"))));
}
