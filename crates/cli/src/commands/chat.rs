//! `delver chat`: Single-question or interactive research mode.

use std::fmt;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use delver_agent::{Assistant, LlmGateway, ProgressEvent, build_assistant};
use delver_config::{AgentMode, AppConfig};
use delver_core::conversation::ConversationHistory;
use delver_tools::ToolRegistry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const PROGRESS_BUFFER: usize = 64;
const QUERY_PREVIEW_CHARS: usize = 100;
const ANSWER_PREVIEW_CHARS: usize = 200;

/// One line of REPL input.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Empty,
    Quit,
    History,
    Clear,
    Tools,
    Reload,
    Query(String),
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "quit" | "exit" | "q" => Self::Quit,
            "history" => Self::History,
            "clear" => Self::Clear,
            "tools" => Self::Tools,
            "reload" => Self::Reload,
            _ => Self::Query(line.to_string()),
        }
    }
}

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    mode: Option<AgentMode>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::resolve_path(config_path);
    let mut config = super::load_config(Some(&path))?;
    if let Some(mode) = mode {
        config.agent_config.mode = mode;
    }

    if let Err(e) = config.require_credentials() {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DELVER_API_KEY        (any provider)");
        eprintln!("    OPENAI_API_KEY        (OpenAI)");
        eprintln!("    OPENROUTER_API_KEY    (OpenRouter)");
        eprintln!("    AZURE_OPENAI_API_KEY  (with AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_DEPLOYMENT_NAME)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", path.display());
        eprintln!();
        return Err(e.into());
    }

    let router = delver_providers::build_from_config(&config);
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", router.default_name()))?;
    let gateway = Arc::new(LlmGateway::from_config(provider, &config));
    let registry = Arc::new(ToolRegistry::load(&config.tools));

    let (tx, mut progress) = mpsc::channel(PROGRESS_BUFFER);
    let mut assistant = build_assistant(
        config.agent_config.mode,
        gateway.clone(),
        registry.clone(),
        &config,
        Some(tx),
    );

    if let Some(msg) = message {
        let answer = ask(assistant.as_mut(), &msg, &mut progress).await;
        println!("{answer}");
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Delver — Interactive Research         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", gateway.provider_name());
    println!("  Model:     {}", gateway.model());
    println!("  Mode:      {}", assistant.mode());
    println!("  Passes:    up to {}", config.agent_config.max_iterations);
    println!("  Tools:     {}", enabled_tools(&registry));
    println!();
    println!("  Commands: history, clear, tools, reload, quit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => println!("  Please enter a question."),
            ReplCommand::Quit => break,
            ReplCommand::History => {
                let mut text = String::new();
                write_history(&mut text, assistant.history())?;
                print!("{text}");
            }
            ReplCommand::Clear => {
                assistant.clear_history();
                println!("  Conversation history cleared.");
            }
            ReplCommand::Tools => {
                let mut text = String::new();
                super::tools::write_report(&mut text, &registry.status(), &config)?;
                print!("{text}");
            }
            ReplCommand::Reload => match super::load_config(Some(&path)) {
                Ok(mut fresh) => {
                    if fresh.agent_config.mode != config.agent_config.mode {
                        println!(
                            "  Mode stays '{}' until restart (config now says '{}').",
                            config.agent_config.mode, fresh.agent_config.mode
                        );
                        fresh.agent_config.mode = config.agent_config.mode;
                    }
                    registry.reload(&fresh.tools);
                    assistant.apply_settings(&fresh);
                    config = fresh;
                    println!("  Configuration reloaded.");
                    println!("  Tools: {}", enabled_tools(&registry));
                }
                Err(e) => eprintln!("  [Error] {e}"),
            },
            ReplCommand::Query(query) => {
                let answer = ask(assistant.as_mut(), &query, &mut progress).await;
                println!();
                for line in answer.lines() {
                    println!("  Assistant > {line}");
                }
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Answer `query` while printing its progress events; returns once the
/// answer is ready and every event up to `Done` has been printed.
async fn ask(
    assistant: &mut dyn Assistant,
    query: &str,
    progress: &mut mpsc::Receiver<ProgressEvent>,
) -> String {
    let (answer, ()) = tokio::join!(assistant.answer(query), print_progress(progress));
    answer
}

async fn print_progress(progress: &mut mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = progress.recv().await {
        if matches!(event, ProgressEvent::Done { .. }) {
            break;
        }
        eprintln!("  · {event}");
    }
}

fn enabled_tools(registry: &ToolRegistry) -> String {
    let names = registry.list_enabled();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn write_history(out: &mut impl fmt::Write, history: &ConversationHistory) -> fmt::Result {
    if history.is_empty() {
        return writeln!(out, "  No conversation history yet.");
    }

    for (i, turn) in history.turns().iter().enumerate() {
        writeln!(out, "  [{}] Q: {}", i + 1, preview(&turn.query, QUERY_PREVIEW_CHARS))?;
        write!(out, "      Iterations: {}", turn.iteration_count)?;
        if turn.tool_steps > 0 {
            write!(out, ", tool steps: {}", turn.tool_steps)?;
        }
        writeln!(out)?;
        writeln!(out, "      A: {}", preview(&turn.answer, ANSWER_PREVIEW_CHARS))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use delver_core::conversation::ConversationTurn;

    fn render_history(history: &ConversationHistory) -> String {
        let mut text = String::new();
        write_history(&mut text, history).unwrap();
        text
    }

    #[test]
    fn parses_repl_commands() {
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
        assert_eq!(ReplCommand::parse("q"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("EXIT"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse(" quit \n"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("history"), ReplCommand::History);
        assert_eq!(ReplCommand::parse("clear"), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("tools"), ReplCommand::Tools);
        assert_eq!(ReplCommand::parse("Reload"), ReplCommand::Reload);
        assert_eq!(
            ReplCommand::parse("  What is the capital of France? "),
            ReplCommand::Query("What is the capital of France?".into())
        );
    }

    #[test]
    fn history_truncates_and_shows_tool_steps() {
        let mut history = ConversationHistory::new();
        history.push(ConversationTurn::new("q".repeat(150), "a".repeat(250), 2));
        history.push(ConversationTurn::new("short", "answer", 1).with_tool_steps(3));

        let text = render_history(&history);
        assert!(text.contains(&format!("[1] Q: {}...", "q".repeat(100))));
        assert!(text.contains(&format!("A: {}...", "a".repeat(200))));
        assert!(text.contains("Iterations: 2\n"));
        assert!(text.contains("[2] Q: short"));
        assert!(text.contains("Iterations: 1, tool steps: 3"));
    }

    #[test]
    fn empty_history_message() {
        assert_eq!(
            render_history(&ConversationHistory::new()),
            "  No conversation history yet.\n"
        );
    }

    #[test]
    fn preview_is_char_based() {
        assert_eq!(preview("héllo", 2), "hé...");
        assert_eq!(preview("hi", 2), "hi");
    }
}
