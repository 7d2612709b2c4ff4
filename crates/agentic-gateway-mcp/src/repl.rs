//! Interactive REPL for the AgenticGateway MCP server.
//!
//! Launch with `agentic-gateway-mcp repl` to enter interactive mode.
//! Type `/help` for available commands, Tab for completion.

use std::sync::Arc;

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::{json, Value};

use agentic_gateway::AsyncJobManager;

use crate::config::GatewayConfig;
use crate::protocol::ProtocolHandler;
use crate::tools::ToolRegistry;
use crate::types::{PROTOCOL_VERSION, SERVER_CAPABILITIES};

const REPL_SESSION_ID: &str = "repl";

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/info", "Show server version and capabilities"),
    ("/tools", "List registered tools"),
    ("/call", "Call a tool: /call <tool_id> [json-args] [--async]"),
    ("/jobs", "List tracked jobs"),
    ("/poll", "Poll a job: /poll <job_id>"),
    ("/cancel", "Cancel a job: /cancel <job_id>"),
    ("/send", "Send a raw JSON message through the dispatcher"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion.
struct GatewayHelper {
    tool_ids: Vec<String>,
}

impl Completer for GatewayHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<10} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        // Tool-id completion for /call.
        let parts: Vec<&str> = input.splitn(2, ' ').collect();
        let cmd = parts[0];
        let args = if parts.len() > 1 { parts[1] } else { "" };

        if cmd == "/call" && !args.contains(' ') {
            let prefix_start = input.len() - args.len();
            let matches: Vec<Pair> = self
                .tool_ids
                .iter()
                .filter(|t| t.starts_with(args.trim()))
                .map(|t| Pair {
                    display: t.clone(),
                    replacement: format!("{t} "),
                })
                .collect();
            return Ok((prefix_start, matches));
        }

        Ok((pos, Vec::new()))
    }
}

impl Hinter for GatewayHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for GatewayHelper {}
impl Validator for GatewayHelper {}
impl Helper for GatewayHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// Run the interactive REPL against an in-process dispatcher.
pub fn run(config: GatewayConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    let tools = Arc::new(ToolRegistry::with_builtins());
    let jobs = Arc::new(AsyncJobManager::new(config.job_manager_config()));
    let handler = ProtocolHandler::new(tools.clone(), jobs);

    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1magentic-gateway-mcp v{}\x1b[0m \x1b[90m\u{2014} Tool Protocol Gateway\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<GatewayHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(rl_config)?;
    rl.set_helper(Some(GatewayHelper {
        tool_ids: tools.list().into_iter().map(|t| t.tool_id).collect(),
    }));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".agentic_gateway_mcp_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let prompt = " \x1b[36mgateway>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let mut parts = input.splitn(2, ' ');
                let cmd = parts.next().unwrap_or("");
                let args = parts.next().unwrap_or("").trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => cmd_info(&tools),
                    "tools" => cmd_tools(&tools),
                    "call" => cmd_call(&runtime, &handler, args),
                    "jobs" => cmd_send(
                        &runtime,
                        &handler,
                        json!({ "request_id": "repl", "op": "list" }),
                    ),
                    "poll" => cmd_job_op(&runtime, &handler, "poll", args),
                    "cancel" => cmd_job_op(&runtime, &handler, "cancel", args),
                    "send" => match serde_json::from_str::<Value>(args) {
                        Ok(raw) => cmd_send(&runtime, &handler, raw),
                        Err(e) => eprintln!("  Invalid JSON: {e}"),
                    },
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  \x1b[90m\u{2728}\x1b[0m Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or(std::path::Path::new(".")));
    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<10} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completion works for commands and tool ids.");
    eprintln!();
}

fn cmd_info(tools: &ToolRegistry) {
    eprintln!();
    eprintln!(
        "  Server:       agentic-gateway-mcp v{}",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("  Protocol:     {PROTOCOL_VERSION}");
    eprintln!("  Capabilities: {}", SERVER_CAPABILITIES.join(", "));
    eprintln!("  Tools:        {}", tools.len());
    eprintln!();
}

fn cmd_tools(tools: &ToolRegistry) {
    let definitions = tools.list();
    eprintln!();
    eprintln!("  {} tools registered:", definitions.len());
    eprintln!();
    for tool in &definitions {
        eprintln!(
            "    {:<16} {}",
            tool.tool_id,
            tool.description.as_deref().unwrap_or("")
        );
    }
    eprintln!();
}

fn cmd_call(runtime: &tokio::runtime::Runtime, handler: &ProtocolHandler, args: &str) {
    let mut parts = args.splitn(2, ' ');
    let tool_id = parts.next().unwrap_or("").trim();
    if tool_id.is_empty() {
        eprintln!("  Usage: /call <tool_id> [json-args] [--async]");
        return;
    }
    let rest = parts.next().unwrap_or("").trim();
    let (rest, is_async) = match rest.strip_suffix("--async") {
        Some(stripped) => (stripped.trim(), true),
        None => (rest, false),
    };

    let arguments: Value = if rest.is_empty() {
        json!({})
    } else {
        match serde_json::from_str(rest) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("  Invalid JSON arguments: {e}");
                return;
            }
        }
    };

    cmd_send(
        runtime,
        handler,
        json!({
            "request_id": format!("repl-{}", uuid::Uuid::new_v4()),
            "tool_id": tool_id,
            "arguments": arguments,
            "mode": if is_async { "async" } else { "sync" },
        }),
    );
}

fn cmd_job_op(runtime: &tokio::runtime::Runtime, handler: &ProtocolHandler, op: &str, args: &str) {
    let job_id = args.split_whitespace().next().unwrap_or("");
    if job_id.is_empty() {
        eprintln!("  Usage: /{op} <job_id>");
        return;
    }
    cmd_send(
        runtime,
        handler,
        json!({ "request_id": "repl", "op": op, "job_id": job_id }),
    );
}

fn cmd_send(runtime: &tokio::runtime::Runtime, handler: &ProtocolHandler, raw: Value) {
    match runtime.block_on(handler.handle_message(raw, REPL_SESSION_ID)) {
        Some(response) => {
            let pretty = serde_json::to_string_pretty(&response)
                .unwrap_or_else(|e| format!("<unprintable: {e}>"));
            for line in pretty.lines() {
                eprintln!("  {line}");
            }
        }
        None => eprintln!("  (no response)"),
    }
}
