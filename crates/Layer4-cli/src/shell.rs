//! Interactive shell
//!
//! Plain input is chat; lines starting with `/` are commands. Every error
//! is printed and the loop continues. Provider calls and plugin runs race
//! against Ctrl-C, which abandons the turn and returns to the prompt.

use crate::{cli, codegen, App};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use thot_foundation::{Error, ModelConfig};
use thot_provider::{Message, ProjectSpec};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const HELP: &str = "\
Commands:
  <text>                                 chat with the active provider
  /code <prompt>                         generate code
  /project <prompt>                      generate a project into generated_project_<time>/
  /provider [name]                       show providers, or set the default
  /models [provider]                     list models (* = saved override)
  /set <provider> <model> <field> <value> change a model parameter
  /show <provider> <model>               show effective model parameters
  /reset <provider> <model>              drop a saved override
  /plugins                               list plugins
  /plugin <name> [args...]               run a plugin
  /clear                                 forget the conversation
  /help                                  show this help
  /quit                                  exit";

// ============================================================================
// Command parsing
// ============================================================================

/// 한 줄 입력의 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Empty,
    Chat(String),
    Code(String),
    Project(String),
    Provider(Option<String>),
    Models(Option<String>),
    Set {
        provider: String,
        model: String,
        field: String,
        value: String,
    },
    Show {
        provider: String,
        model: String,
    },
    Reset {
        provider: String,
        model: String,
    },
    Plugins,
    Plugin {
        name: String,
        args: Vec<String>,
    },
    Clear,
    Help,
    Quit,
    /// Known command with missing arguments
    Usage(&'static str),
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Chat(line.to_string());
        };

        let (name, rest) = match command.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (command, ""),
        };
        let words: Vec<&str> = rest.split_whitespace().collect();
        let optional = words.first().map(|w| w.to_string());

        match name.to_ascii_lowercase().as_str() {
            "code" if rest.is_empty() => Self::Usage("/code <prompt>"),
            "code" => Self::Code(rest.to_string()),
            "project" if rest.is_empty() => Self::Usage("/project <prompt>"),
            "project" => Self::Project(rest.to_string()),
            "provider" => Self::Provider(optional),
            "models" => Self::Models(optional),
            "set" => match words.as_slice() {
                [provider, model, field, value @ ..] if !value.is_empty() => Self::Set {
                    provider: provider.to_string(),
                    model: model.to_string(),
                    field: field.to_string(),
                    value: value.join(" "),
                },
                _ => Self::Usage("/set <provider> <model> <field> <value>"),
            },
            "show" => match words.as_slice() {
                [provider, model] => Self::Show {
                    provider: provider.to_string(),
                    model: model.to_string(),
                },
                _ => Self::Usage("/show <provider> <model>"),
            },
            "reset" => match words.as_slice() {
                [provider, model] => Self::Reset {
                    provider: provider.to_string(),
                    model: model.to_string(),
                },
                _ => Self::Usage("/reset <provider> <model>"),
            },
            "plugins" => Self::Plugins,
            "plugin" => match words.as_slice() {
                [name, args @ ..] => Self::Plugin {
                    name: name.to_string(),
                    args: args.iter().map(|a| a.to_string()).collect(),
                },
                [] => Self::Usage("/plugin <name> [args...]"),
            },
            "clear" => Self::Clear,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// 대화 세션 상태
pub struct Session {
    /// `--provider` override for this run; `None` follows the stored default
    provider: Option<String>,
    history: Vec<Message>,
}

impl Session {
    pub fn new(provider: Option<String>) -> Self {
        Self {
            provider,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Handle one non-quit command
    pub async fn handle(&mut self, app: &App, command: ShellCommand) -> anyhow::Result<()> {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Chat(text) => self.chat(app, text).await?,
            ShellCommand::Code(prompt) => {
                let call = app.gateway.generate_code(&prompt, self.provider.as_deref());
                if let Some(result) = interruptible(call).await {
                    println!("{}", result?.trim_end());
                }
            }
            ShellCommand::Project(prompt) => self.project(app, &prompt).await?,
            ShellCommand::Provider(None) => {
                let active = self
                    .provider
                    .clone()
                    .unwrap_or_else(|| app.gateway.default_provider());
                for name in app.gateway.list_providers() {
                    let marker = if name == active { "*" } else { " " };
                    let status = if app.gateway.is_provider_available(name) {
                        "ready"
                    } else {
                        "no api key"
                    };
                    println!("{} {} ({})", marker, name, status);
                }
            }
            ShellCommand::Provider(Some(name)) => {
                let gateway = Arc::clone(&app.gateway);
                let chosen = name.clone();
                app.workers
                    .run(move || gateway.set_default_provider(&chosen))
                    .await??;
                self.provider = None;
                println!("Default provider: {}", name);
            }
            ShellCommand::Models(provider) => cli::print_models(app, provider.as_deref()),
            ShellCommand::Set {
                provider,
                model,
                field,
                value,
            } => {
                let mut config = self.editable_config(app, &provider, &model)?;
                config.set_field(&field, &value)?;
                let models = Arc::clone(app.gateway.models());
                app.workers.try_run(move || models.persist(&config)).await?;
                println!("Saved {}/{} {} = {}", provider, model, field, value);
            }
            ShellCommand::Show { provider, model } => {
                let models = app.gateway.models();
                let config = models.resolve(&provider, &model)?;
                let source = if models.has_override(&provider, &model) {
                    "saved override"
                } else {
                    "built-in"
                };
                println!("{}/{} ({})", provider, model, source);
                for (field, value) in config.to_fields() {
                    println!("  {} = {}", field, value);
                }
            }
            ShellCommand::Reset { provider, model } => {
                let models = Arc::clone(app.gateway.models());
                let (p, m) = (provider.clone(), model.clone());
                let removed = app.workers.try_run(move || models.reset(&p, &m)).await?;
                if removed {
                    println!("Removed override for {}/{}", provider, model);
                } else {
                    println!("No saved override for {}/{}", provider, model);
                }
            }
            ShellCommand::Plugins => cli::print_plugins(app).await,
            ShellCommand::Plugin { name, args } => {
                if let Some(result) = interruptible(app.plugins.execute(&name, &args)).await {
                    println!("{}", serde_json::to_string_pretty(&result?)?);
                }
            }
            ShellCommand::Clear => {
                self.history.clear();
                println!("Conversation cleared");
            }
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Usage(usage) => println!("Usage: {}", usage),
            ShellCommand::Unknown(name) => {
                println!("Unknown command: /{} (try /help)", name);
            }
            ShellCommand::Quit => {}
        }
        Ok(())
    }

    async fn chat(&mut self, app: &App, text: String) -> anyhow::Result<()> {
        self.history.push(Message::user(text));

        let call = app.gateway.chat(&self.history, self.provider.as_deref());
        match interruptible(call).await {
            Some(Ok(reply)) => {
                println!("{}", reply.trim_end());
                self.history.push(Message::assistant(reply));
                Ok(())
            }
            Some(Err(e)) => {
                // keep the history consistent for the next turn
                self.history.pop();
                Err(e.into())
            }
            None => {
                self.history.pop();
                Ok(())
            }
        }
    }

    async fn project(&self, app: &App, prompt: &str) -> anyhow::Result<()> {
        let call = app
            .gateway
            .generate_project_spec(prompt, self.provider.as_deref());
        let Some(result) = interruptible(call).await else {
            return Ok(());
        };
        let response = result?;
        let spec = ProjectSpec::parse(&response);
        if spec.is_empty() {
            println!("{}", response.trim_end());
        }

        let root = codegen::output_dir(&std::env::current_dir()?, chrono::Local::now());
        let summary = codegen::write_project(&app.workers, &spec, root.clone()).await?;
        println!("Project created in {}", root.display());
        for file in &summary.files {
            println!("  {}", file.display());
        }
        Ok(())
    }

    /// Current parameters, or fresh defaults for a new model of a known provider
    fn editable_config(&self, app: &App, provider: &str, model: &str) -> anyhow::Result<ModelConfig> {
        match app.gateway.models().resolve(provider, model) {
            Ok(config) => Ok(config),
            Err(Error::ConfigNotFound { .. }) => {
                app.gateway.get_provider(provider)?;
                debug!("Starting new model config {}/{}", provider, model);
                Ok(ModelConfig::new(provider, model))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Ctrl-C 와 경쟁; 중단되면 `None`
async fn interruptible<F: Future>(future: F) -> Option<F::Output> {
    tokio::select! {
        output = future => Some(output),
        _ = tokio::signal::ctrl_c() => {
            println!("\nInterrupted");
            None
        }
    }
}

// ============================================================================
// Main loop
// ============================================================================

pub async fn run(app: &App, provider: Option<String>) -> anyhow::Result<()> {
    let mut session = Session::new(provider);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Thot - type /help for commands, /quit to exit");
    if let Some(path) = app.store.path() {
        println!("Config: {}", path.display());
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        match ShellCommand::parse(&line) {
            ShellCommand::Quit => break,
            command => {
                if let Err(e) = session.handle(app, command).await {
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    info!("Session ended after {} message(s)", session.history().len());
    Ok(())
}
