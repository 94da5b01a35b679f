use crate::web::{self, AppState, PageConfig};
use application::agent_service::{AgentReply, AgentService, ToolOutcome};
use application::persona;
use application::toolbox::default_registry;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Input;
use domain::model::ChatModel;
use infrastructure::config::Config;
use infrastructure::ollama_client::OllamaClient;
use shared::telemetry::init_tracing;
use shared::types::Result;
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use tracing::info;

const QUESTION_PROMPT: &str = "Please ask any question";

/// Chat demos backed by a local Ollama model.
#[derive(Parser, Debug)]
#[command(name = "parley")]
#[command(about = "Chat demos backed by a local Ollama model", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the interview chat page
    Web {
        /// Address to listen on (defaults to PARLEY_BIND or 127.0.0.1:8501)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Ask questions the model may answer by calling tools
    Tools,
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new() -> Self {
        Self {
            config: Config::load(),
        }
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        init_tracing(cli.verbose);
        info!(model = %self.config.ollama_model, base_url = %self.config.ollama_base_url, "using Ollama");
        match cli.command {
            Command::Web { bind } => self.handle_web(bind).await,
            Command::Tools => self.handle_tools().await,
        }
    }

    pub fn page_config(&self) -> PageConfig {
        PageConfig {
            title: self
                .config
                .page_title
                .clone()
                .unwrap_or_else(|| persona::TITLE.to_string()),
            subheading: self
                .config
                .page_subheading
                .clone()
                .unwrap_or_else(|| persona::CONTEXT_FOR_USER.to_string()),
            preamble: self
                .config
                .system_prompt
                .clone()
                .unwrap_or_else(|| persona::SYSTEM_PROMPT.to_string()),
        }
    }

    async fn handle_web(&self, bind: Option<String>) -> Result<()> {
        let client = OllamaClient::new(&self.config)?;
        let state = AppState::new(Arc::new(client), self.page_config());
        let bind = bind.unwrap_or_else(|| self.config.bind_addr.clone());
        println!("{} http://{}", "Chat UI on".green().bold(), bind);
        web::serve(&bind, state).await
    }

    async fn handle_tools(&self) -> Result<()> {
        let client = OllamaClient::new(&self.config)?;
        let mut agent = AgentService::new(client, default_registry());
        let stdout = std::io::stdout();
        if std::io::stdin().is_terminal() {
            run_tool_loop(&mut agent, ask_question, &mut stdout.lock()).await
        } else {
            let mut lines = std::io::stdin().lock().lines();
            let next = move || lines.next().transpose().map_err(anyhow::Error::from);
            run_tool_loop(&mut agent, next, &mut stdout.lock()).await
        }
    }
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

fn ask_question() -> Result<Option<String>> {
    let question: String = Input::new()
        .with_prompt(QUESTION_PROMPT)
        .allow_empty(true)
        .interact_text()?;
    Ok(Some(question))
}

/// Read questions until the source runs dry. A failed model call is reported
/// and the loop moves on to the next question.
pub async fn run_tool_loop<M, Q, W>(agent: &mut AgentService<M>, mut next_question: Q, out: &mut W) -> Result<()>
where
    M: ChatModel,
    Q: FnMut() -> Result<Option<String>>,
    W: Write,
{
    while let Some(question) = next_question()? {
        match agent.ask(&question).await {
            Ok(Some(reply)) => print_reply(out, &reply)?,
            Ok(None) => continue,
            Err(err) => writeln!(out, "{} {:#}", "Error:".red().bold(), err)?,
        }
        out.flush()?;
    }
    Ok(())
}

fn print_reply<W: Write>(out: &mut W, reply: &AgentReply) -> Result<()> {
    for event in &reply.tool_events {
        match &event.outcome {
            ToolOutcome::Completed(result) => writeln!(
                out,
                "{} {} -> {}",
                event.call.name.cyan(),
                event.call.arguments,
                result
            )?,
            ToolOutcome::Failed(reason) => {
                writeln!(out, "{} {}", event.call.name.red(), reason.red())?
            }
        }
    }
    writeln!(out, "{} {}", "AI:".green().bold(), reply.answer)?;
    Ok(())
}
