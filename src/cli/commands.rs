use std::io::Write;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;
use tracing::info;

use crate::cli::args::{AskArgs, ConfigAction, ConfigArgs, InitArgs, OutputFormat};
use crate::config::loader::get_config_path;
use crate::config::types::ChorusConfig;
use crate::dispatch::{Dispatcher, Outcome, RoundResult};
use crate::error::Result;
use crate::providers::registry::build_roster;

fn build_dispatcher(config: &ChorusConfig) -> Result<Dispatcher> {
    let roster = build_roster(config)?;
    let timeout = match config.query.timeout_seconds {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    Ok(Dispatcher::new(roster).with_timeout(timeout))
}

// ============================================================================
// Query Commands
// ============================================================================

/// Interactive read-evaluate-print loop
pub async fn repl(config: ChorusConfig, format: OutputFormat) -> Result<()> {
    let dispatcher = build_dispatcher(&config)?;

    println!("Welcome to chorus!");
    println!("Type 'exit' to quit.");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("Please enter your question: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            // EOF ends the loop the same way the sentinel does
            break;
        };

        if is_exit(&line) {
            break;
        }

        info!(prompt_len = line.len(), "Dispatching prompt");
        let round = dispatcher.run(&line).await;
        render_round(&line, &round, &format);
    }

    Ok(())
}

/// Send a single prompt and print every provider's answer
pub async fn ask(args: AskArgs, config: ChorusConfig, format: OutputFormat) -> Result<()> {
    info!(prompt_len = args.prompt.len(), "Dispatching one-shot prompt");

    let dispatcher = build_dispatcher(&config)?;
    let round = dispatcher.run(&args.prompt).await;
    render_round(&args.prompt, &round, &format);

    Ok(())
}

/// List configured providers and whether their credentials are present
pub async fn providers(config: ChorusConfig, format: OutputFormat) -> Result<()> {
    let roster = build_roster(&config)?;

    match format {
        OutputFormat::Text => {
            println!("{:<12} {:<28} {:<20} KEY", "NAME", "MODEL", "ENV");
            println!("{}", "-".repeat(70));

            for provider in &roster {
                let credential = provider.credential();
                println!(
                    "{:<12} {:<28} {:<20} {}",
                    provider.name(),
                    provider.model(),
                    credential.env_var(),
                    if credential.is_set() { "set" } else { "missing" }
                );
            }
        }
        OutputFormat::Json => {
            let entries: Vec<_> = roster
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.name(),
                        "label": p.label(),
                        "model": p.model(),
                        "api_key_env": p.credential().env_var(),
                        "api_key_set": p.credential().is_set(),
                    })
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

pub async fn init(args: InitArgs) -> Result<()> {
    let config_path = get_config_path();

    if config_path.exists() && !args.force {
        println!("Configuration already exists at: {}", config_path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    // Create parent directories if needed
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write default configuration
    let default_config = ChorusConfig::default();
    let toml_str = toml::to_string_pretty(&default_config)
        .map_err(|e| crate::error::ChorusError::Config(e.to_string()))?;

    std::fs::write(&config_path, toml_str)?;

    println!("Created configuration at: {}", config_path.display());
    println!("\nQuick start:");
    println!("  # Set credentials for the providers you use");
    println!("  export OPENAI_API_KEY=...");
    println!("  export ANTHROPIC_API_KEY=...");
    println!("  export GOOGLE_API_KEY=...");
    println!();
    println!("  # Ask one question");
    println!("  chorus ask \"What is the capital of France?\"");
    println!();
    println!("  # Or start the interactive loop");
    println!("  chorus");

    Ok(())
}

pub async fn config(args: ConfigArgs, config: ChorusConfig) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| crate::error::ChorusError::Config(e.to_string()))?;
            println!("{}", toml_str);
        }
        ConfigAction::Path => {
            println!("{}", get_config_path().display());
        }
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// `true` when the line is the loop's exit sentinel.
fn is_exit(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("exit")
}

fn render_round(prompt: &str, round: &RoundResult, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            println!();
            println!("--- AI Responses ---");

            for entry in round.iter() {
                println!("\n--- {} ---\n", entry.label);
                match &entry.outcome {
                    Outcome::Success(text) => println!("{}", text),
                    Outcome::Failure(message) => println!("Error: {}", message),
                }
            }

            println!("\n--------------------\n");
        }
        OutputFormat::Json => {
            println!("{}", round_to_json(prompt, round));
        }
    }
}

fn round_to_json(prompt: &str, round: &RoundResult) -> serde_json::Value {
    let responses: Vec<_> = round
        .iter()
        .map(|entry| match &entry.outcome {
            Outcome::Success(text) => serde_json::json!({
                "provider": entry.provider,
                "ok": true,
                "text": text,
            }),
            Outcome::Failure(message) => serde_json::json!({
                "provider": entry.provider,
                "ok": false,
                "error": message,
            }),
        })
        .collect();

    serde_json::json!({
        "prompt": prompt,
        "responses": responses,
    })
}
