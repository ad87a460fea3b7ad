//! Discovery with a plugin whose initialize fails

use async_trait::async_trait;
use std::sync::Arc;
use thot_core::{Plugin, PluginContext, PluginError, PluginOutput, PluginRegistry, PluginState};
use thot_foundation::ConfigStore;

/// Initializes unless its config says `fail = true`
struct Flaky {
    ctx: PluginContext,
}

#[async_trait]
impl Plugin for Flaky {
    fn context(&self) -> &PluginContext {
        &self.ctx
    }

    async fn initialize(&mut self) -> thot_foundation::Result<bool> {
        Ok(self.ctx.get("fail").as_deref() != Some("true"))
    }

    async fn execute(&self, args: &[String]) -> PluginOutput {
        PluginOutput::success(serde_json::json!({ "echo": args }))
    }
}

fn registry(dir: &std::path::Path, store: Arc<ConfigStore>) -> PluginRegistry {
    let mut registry = PluginRegistry::new(store, dir);
    registry.register_factory("flaky", Arc::new(|ctx| Box::new(Flaky { ctx }) as Box<dyn Plugin>));
    registry
}

#[tokio::test]
async fn second_of_three_fails_initialize() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("1_first.json"), r#"{"plugin":"flaky","name":"First"}"#).unwrap();
    std::fs::write(
        dir.path().join("2_second.json"),
        r#"{"plugin":"flaky","name":"Second","config":{"fail":true}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("3_third.json"), r#"{"plugin":"flaky","name":"Third"}"#).unwrap();

    let registry = registry(dir.path(), Arc::new(ConfigStore::empty()));
    let count = registry.discover_all().await;

    assert_eq!(count, 2);
    assert_eq!(registry.list_registered().await, vec!["First", "Third"]);
    assert!(registry.get("Second").await.is_none());

    let outcomes = registry.outcomes().await;
    assert_eq!(outcomes[0].state, PluginState::Registered);
    assert!(matches!(
        &outcomes[1].state,
        PluginState::Failed(PluginError::Init { name, .. }) if name == "Second"
    ));
    assert_eq!(outcomes[2].state, PluginState::Registered);
}

#[tokio::test]
async fn store_section_overrides_manifest_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("second.json"),
        r#"{"plugin":"flaky","name":"Second","config":{"fail":true}}"#,
    )
    .unwrap();

    let store = Arc::new(ConfigStore::empty());
    store.set("Plugin.Second", "fail", "false").unwrap();

    let registry = registry(dir.path(), store);
    assert_eq!(registry.discover_all().await, 1);

    let output = registry
        .execute("Second", &["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(
        output,
        PluginOutput::success(serde_json::json!({ "echo": ["a", "b"] }))
    );
}

#[tokio::test]
async fn builtin_calculator_from_manifest() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("calculator.json"),
        r#"{"plugin":"calculator","name":"Calculator","config":{"precision":1}}"#,
    )
    .unwrap();

    let registry = PluginRegistry::new(Arc::new(ConfigStore::empty()), dir.path()).with_builtins();
    registry.discover_all().await;

    let args: Vec<String> = ["divide", "10", "4"].iter().map(|s| s.to_string()).collect();
    let output = registry.execute("Calculator", &args).await.unwrap();
    match output {
        PluginOutput::Success { data } => assert_eq!(data["result"], 2.5),
        other => panic!("unexpected output: {:?}", other),
    }
}
