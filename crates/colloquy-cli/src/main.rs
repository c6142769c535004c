//! Colloquy CLI - interactive chat with tool orchestration.
//!
//! Thin frontend over colloquy-core: reads user input, forwards it to a
//! thread, renders the thread's outputs, and answers approval requests.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use colloquy_core::{Config, ThreadInput, ThreadManager, ThreadOutput, ThreadStore};

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tool-using chat assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM provider (groq, openai, anthropic, gemini, ollama)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model to use (defaults to the provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// Thread to resume (defaults to a fresh thread)
    #[arg(short, long)]
    thread: Option<String>,

    /// Approve all flagged tools without asking (use with caution!)
    #[arg(long)]
    auto_approve: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat mode (the default)
    Chat,

    /// Show the registered tools
    Tools,

    /// Show the effective configuration
    Config,

    /// List persisted threads
    Threads,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Warn-level by default so log lines don't interleave with the prompt
    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "info,colloquy_core=debug"
        } else {
            "warn"
        })
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    if let Some(provider) = cli.provider.clone() {
        config.provider.provider = provider;
        config.provider.model = None;
    }
    if let Some(model) = cli.model.clone() {
        config.provider.model = Some(model);
    }
    if cli.auto_approve {
        config.orchestration.human_in_loop = false;
    }

    match cli.command {
        None | Some(Commands::Chat) => run_chat(config, cli.thread).await,
        Some(Commands::Tools) => {
            show_tools(&config);
            Ok(())
        }
        Some(Commands::Config) => {
            show_config(&config, &config_path);
            Ok(())
        }
        Some(Commands::Threads) => show_threads(&config),
    }
}

fn show_tools(config: &Config) {
    let registry = colloquy_core::standard_registry(config);
    println!("{}", style("Registered tools:").bold());
    for descriptor in registry.descriptors() {
        let flag = if descriptor.requires_approval {
            style(" [approval required]").yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {}{}\n    {}",
            style(&descriptor.name).green(),
            flag,
            style(&descriptor.description).dim()
        );
    }
}

fn show_config(config: &Config, path: &std::path::Path) {
    println!("{} {}", style("Config file:").bold(), path.display());
    println!("  provider:            {}", config.provider.provider);
    println!(
        "  model:               {}",
        config.provider.model.as_deref().unwrap_or("(provider default)")
    );
    println!("  temperature:         {}", config.provider.temperature);
    println!(
        "  intent window:       {} turns",
        config.orchestration.intent_window_turns
    );
    println!(
        "  schema retries:      {}",
        config.orchestration.max_schema_retries
    );
    println!(
        "  human in loop:       {}",
        config.orchestration.human_in_loop
    );
    let mut approval: Vec<&String> = config.orchestration.tools_requiring_approval.iter().collect();
    approval.sort();
    println!(
        "  approval required:   {}",
        approval
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  data dir:            {}", config.data_dir().display());
}

fn show_threads(config: &Config) -> anyhow::Result<()> {
    let threads = ThreadStore::new(config.threads_dir()).list()?;
    if threads.is_empty() {
        println!("No persisted threads.");
        return Ok(());
    }
    println!("{}", style("Threads (most recent first):").bold());
    for thread in threads {
        println!("  {}", thread);
    }
    Ok(())
}

async fn run_chat(config: Config, thread: Option<String>) -> anyhow::Result<()> {
    let thread_id = thread.unwrap_or_else(|| format!("cli-{}", fresh_thread_suffix()));
    let (manager, mut output_rx) = ThreadManager::new(config);

    println!(
        "{} (thread: {})",
        style("Colloquy").bold().cyan(),
        style(&thread_id).dim()
    );
    println!("{}", style("Type a message, or 'exit' to quit.").dim());

    let mut editor = DefaultEditor::new()?;

    loop {
        let line = match editor.readline(&format!("{} ", style("you>").bold().blue())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        let _ = editor.add_history_entry(&line);

        manager
            .push(&thread_id, ThreadInput::user_message(line))
            .await?;

        // Render outputs for this turn until the thread goes idle
        while let Some((_, output)) = output_rx.recv().await {
            match output {
                ThreadOutput::AssistantMessage { content } => {
                    println!("{} {}", style("assistant>").bold().green(), content);
                }
                ThreadOutput::ToolStart { name, .. } => {
                    println!("  {} {}", style("[running]").dim(), style(&name).yellow());
                }
                ThreadOutput::ToolDone { name, success, .. } => {
                    if success {
                        println!("  {} {}", style("✓").green(), style(&name).dim());
                    } else {
                        println!("  {} {}", style("✗").red(), style(&name).dim());
                    }
                }
                ThreadOutput::ToolPending {
                    id,
                    name,
                    arguments,
                } => {
                    let input = prompt_approval(&name, &arguments)?;
                    manager.push(&thread_id, input_for_decision(id, input)).await?;
                }
                ThreadOutput::Error { message } => {
                    println!("{}", style(format!("error: {}", message)).red());
                }
                ThreadOutput::Cancelled => {
                    println!("{}", style("(turn cancelled)").dim());
                }
                ThreadOutput::Idle => break,
                ThreadOutput::Ready | ThreadOutput::UserMessage { .. } => {}
            }
        }
    }

    manager.stop_all().await;
    println!("{}", style("Bye.").dim());
    Ok(())
}

/// Ask the user to approve or deny a flagged tool call
fn prompt_approval(name: &str, arguments: &serde_json::Value) -> anyhow::Result<bool> {
    println!(
        "{} {} wants to run with:",
        style("approval:").bold().yellow(),
        style(name).bold()
    );
    println!(
        "{}",
        style(serde_json::to_string_pretty(arguments).unwrap_or_default()).dim()
    );
    Ok(dialoguer::Confirm::new()
        .with_prompt("Allow this tool call?")
        .default(false)
        .interact()?)
}

fn input_for_decision(tool_call_id: String, approved: bool) -> ThreadInput {
    if approved {
        ThreadInput::approve_tool(tool_call_id)
    } else {
        ThreadInput::deny_tool(tool_call_id, Some("Denied at the prompt".to_string()))
    }
}

/// Short unique suffix for fresh thread ids
fn fresh_thread_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{:x}", now)
}
