//! Non-interactive CLI mode

use crate::App;
use thot_core::PluginState;
use thot_provider::Message;

/// Run a single prompt in non-interactive mode
pub async fn run_once(app: &App, provider: Option<&str>, prompt: &str) -> anyhow::Result<()> {
    let history = [Message::user(prompt)];

    tokio::select! {
        result = app.gateway.chat(&history, provider) => {
            let reply = result?;
            println!("{}", reply.trim_end());
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted");
        }
    }

    Ok(())
}

/// `thot models` / `/models`
pub fn print_models(app: &App, provider: Option<&str>) {
    let models = app.gateway.models();
    for (name, list) in models.list_models(provider) {
        println!("{}:", name);
        if list.is_empty() {
            println!("  (no models)");
        }
        for model in list {
            let marker = if models.has_override(&name, &model) {
                " *"
            } else {
                ""
            };
            println!("  {}{}", model, marker);
        }
    }
}

/// `thot plugins` / `/plugins`
pub async fn print_plugins(app: &App) {
    let names = app.plugins.list_registered().await;
    if names.is_empty() {
        println!("No plugins registered ({})", app.plugins.plugin_dir().display());
    }
    println!("Plugin kinds: {}", app.plugins.factory_kinds().join(", "));

    for name in names {
        let Some(plugin) = app.plugins.get(&name).await else {
            continue;
        };
        println!("{} - {}", name, plugin.description());
        if !plugin.usage().is_empty() {
            println!("  usage: {}", plugin.usage());
        }
        for (key, value) in plugin.describe_config() {
            println!("  {} = {}", key, value);
        }
    }

    for outcome in app.plugins.outcomes().await {
        if let PluginState::Failed(_) = &outcome.state {
            println!("{}: {}", outcome.path.display(), outcome.state);
        }
    }
}
