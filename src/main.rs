// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tutor main entry point - CLI, commands, and lesson REPL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use tutor::config::{self, CliOptions, ResolvedConfig};
use tutor::credit::{JsonlLedger, TracingLedger};
use tutor::providers::create_generator_from_config;
use tutor::session::{
    LessonRunner, ManagerOptions, SaveOutcome, SessionManager, SessionPhase, SqliteSessionStore,
    TurnOutcome,
};
use tutor::telemetry::{init_telemetry, TelemetryConfig};
use tutor::types::{
    Difficulty, LearningMode, LessonRequest, PriorKnowledge, SessionStore, SharedCreditLedger,
    TeachingLanguage,
};

/// Tutor version string.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tutor - one question at a time.
#[derive(Parser)]
#[command(name = "tutor")]
#[command(
    author,
    version,
    about = "Interactive tutoring sessions, one question at a time",
    long_about = None
)]
struct Cli {
    /// Content-generation provider
    #[arg(short, long, env = "TUTOR_PROVIDER")]
    provider: Option<Provider>,

    /// Model to use
    #[arg(short, long, env = "TUTOR_MODEL")]
    model: Option<String>,

    /// Base URL for the API
    #[arg(long, env = "TUTOR_BASE_URL")]
    base_url: Option<String>,

    /// Session database file
    #[arg(long, env = "TUTOR_DB")]
    db: Option<PathBuf>,

    /// Disable periodic autosave
    #[arg(long)]
    no_autosave: bool,

    /// Show info logs
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Show debug logs
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available providers.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    /// Anthropic - Claude models
    Anthropic,
    /// OpenAI - GPT models
    Openai,
    /// Ollama - Local models
    Ollama,
    /// Any OpenAI-compatible endpoint (needs --base-url)
    OpenaiCompatible,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Openai => write!(f, "openai"),
            Provider::Ollama => write!(f, "ollama"),
            Provider::OpenaiCompatible => write!(f, "openai-compatible"),
        }
    }
}

/// Subcommands for tutor.
#[derive(Subcommand)]
enum Commands {
    /// Start a new lesson
    Start(StartArgs),

    /// Resume a saved lesson
    Resume {
        /// Saved session id (see `tutor sessions`)
        id: String,
    },

    /// List saved lessons
    Sessions,

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Initialize a new configuration file
    Init,

    /// Show version information
    Version,
}

#[derive(clap::Args)]
struct StartArgs {
    /// Subject, e.g. "Science"
    #[arg(short, long)]
    subject: String,

    /// Chapter within the subject
    #[arg(short, long)]
    chapter: String,

    /// Student's name
    #[arg(long, default_value = "")]
    student: String,

    /// Starting topic (defaults to the chapter)
    #[arg(long)]
    topic: Option<String>,

    /// beginner, medium or advanced
    #[arg(long)]
    difficulty: Option<Difficulty>,

    /// interactive, storytelling or example-driven
    #[arg(long)]
    mode: Option<LearningMode>,

    /// english, hindi or hinglish
    #[arg(long)]
    language: Option<TeachingLanguage>,

    /// none, basic, intermediate or advanced
    #[arg(long)]
    prior: Option<PriorKnowledge>,

    /// Extra instructions for the teacher
    #[arg(long)]
    requirements: Option<String>,
}

impl StartArgs {
    fn into_request(self, config: &ResolvedConfig) -> LessonRequest {
        let mut request = LessonRequest::new(self.subject, self.chapter, self.student)
            .with_difficulty(self.difficulty.unwrap_or(config.difficulty))
            .with_learning_mode(self.mode.unwrap_or(config.learning_mode))
            .with_language(self.language.unwrap_or(config.language))
            .with_prior_knowledge(self.prior.unwrap_or_default());
        if let Some(topic) = self.topic {
            request = request.with_topic(topic);
        }
        if let Some(requirements) = self.requirements {
            request = request.with_requirements(requirements);
        }
        request
    }
}

/// Config subcommand actions.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

/// How the REPL session begins.
enum Launch {
    Start(LessonRequest),
    Resume(String),
    Prompt,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _telemetry = init_telemetry(&TelemetryConfig::from_verbosity(cli.verbose, cli.debug))?;

    let cli_options = CliOptions {
        provider: cli.provider.map(|p| p.to_string()),
        model: cli.model,
        base_url: cli.base_url,
        database_path: cli.db,
        no_autosave: cli.no_autosave,
    };

    let workspace_root = std::env::current_dir()?;
    let config = config::load_config(&workspace_root, cli_options)?;

    let launch = match cli.command {
        Some(Commands::Start(args)) => Launch::Start(args.into_request(&config)),
        Some(Commands::Resume { id }) => Launch::Resume(id),
        Some(command) => return handle_command(command, &config).await,
        None => Launch::Prompt,
    };

    run_repl(&config, launch).await
}

async fn handle_command(command: Commands, config: &ResolvedConfig) -> anyhow::Result<()> {
    match command {
        Commands::Sessions => {
            let store = open_store(config)?;
            let sessions = store.list_sessions().await?;
            if sessions.is_empty() {
                println!("{}", "No saved lessons yet.".dimmed());
            } else {
                println!("{}", "Saved lessons".bright_blue().bold());
                for summary in sessions {
                    println!("  {}", summary.format());
                }
                println!("\n{}", "Resume one with: tutor resume ID".dimmed());
            }
        }
        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
        },
        Commands::Init => {
            let workspace_root = std::env::current_dir()?;
            let path = config::init_config(&workspace_root)?;
            println!("Created config file: {}", path.display());
        }
        Commands::Version => {
            println!("tutor {}", VERSION);
        }
        Commands::Start(_) | Commands::Resume { .. } => {}
    }
    Ok(())
}

fn open_store(config: &ResolvedConfig) -> anyhow::Result<SqliteSessionStore> {
    let store = match &config.database_path {
        Some(path) => SqliteSessionStore::open_at(path)?,
        None => SqliteSessionStore::open_default()?,
    };
    Ok(store)
}

fn build_manager(config: &ResolvedConfig) -> anyhow::Result<SessionManager> {
    let generator = create_generator_from_config(config)?;
    let ledger: SharedCreditLedger = match &config.credits_path {
        Some(path) => Arc::new(JsonlLedger::new(path)),
        None => Arc::new(TracingLedger),
    };
    let lessons = LessonRunner::new(generator, ledger).with_history_window(config.history_window);
    let store = Arc::new(open_store(config)?);

    let options = ManagerOptions::from_config(&config.autosave);
    Ok(SessionManager::new(lessons, store).with_options(options))
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_turn(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::AwaitingStudent(message) => {
            println!("\n{} {}\n", "Teacher:".bright_green().bold(), message.content);
        }
        TurnOutcome::Completed(message) => {
            println!("\n{} {}\n", "Teacher:".bright_green().bold(), message.content);
            println!("{}", "Lesson complete. Well done!".bright_yellow().bold());
            println!("{}", "Type /reset for a new lesson or /quit to leave.".dimmed());
        }
        TurnOutcome::Ignored => {
            println!("{}", "There is no open question right now.".dimmed());
        }
        TurnOutcome::Discarded => {}
    }
}

fn print_help() {
    println!("{}", "Commands".bright_blue().bold());
    println!("  /save        save the lesson now");
    println!("  /transcript  show the conversation so far");
    println!("  /reset       end this lesson and start another");
    println!("  /quit        save and leave");
    println!("{}", "Anything else is your answer to the teacher's question.".dimmed());
}

fn read_field(rl: &mut DefaultEditor, label: &str) -> Option<String> {
    match rl.readline(&format!("{} ", format!("{}:", label).cyan())) {
        Ok(line) => Some(line.trim().to_string()),
        Err(_) => None,
    }
}

/// Ask for the minimum lesson inputs. `None` when the user gives up.
fn prompt_lesson_request(rl: &mut DefaultEditor, config: &ResolvedConfig) -> Option<LessonRequest> {
    println!("{}", "New lesson".bright_blue().bold());
    let subject = read_field(rl, "Subject").filter(|s| !s.is_empty())?;
    let chapter = read_field(rl, "Chapter").filter(|s| !s.is_empty())?;
    let student = read_field(rl, "Your name").unwrap_or_default();

    Some(
        LessonRequest::new(subject, chapter, student)
            .with_difficulty(config.difficulty)
            .with_learning_mode(config.learning_mode)
            .with_language(config.language),
    )
}

async fn start_lesson(manager: &SessionManager, request: &LessonRequest) {
    println!(
        "\n{} {} - {}",
        "Lesson:".bright_blue().bold(),
        request.subject,
        request.chapter
    );
    let bar = spinner("Preparing the lesson...");
    let result = manager.start_lesson(request).await;
    bar.finish_and_clear();

    match result {
        Ok(outcome) => print_turn(&outcome),
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            println!("{}", "Type /reset to try again.".dimmed());
        }
    }
}

async fn resume_lesson(manager: &SessionManager, id: &str) -> anyhow::Result<()> {
    let snapshot = manager.resume(id).await?;
    if let Some(context) = &snapshot.context {
        println!(
            "\n{} {} - {}",
            "Resumed:".bright_blue().bold(),
            context.subject,
            context.chapter
        );
    }
    for line in &snapshot.history {
        println!("{}", line.dimmed());
    }
    if let Some(last) = snapshot.messages.last() {
        println!("\n{} {}\n", "Teacher:".bright_green().bold(), last.content);
    }
    Ok(())
}

async fn run_repl(config: &ResolvedConfig, launch: Launch) -> anyhow::Result<()> {
    let manager = Arc::new(build_manager(config)?);
    let autosave = manager.spawn_autosave();
    let mut rl = DefaultEditor::new()?;

    println!(
        "{} {}",
        "tutor".bright_magenta().bold(),
        format!("v{} ({})", VERSION, manager.generator_name()).dimmed()
    );
    println!("{}", "Type /help for commands.".dimmed());

    match launch {
        Launch::Start(request) => start_lesson(&manager, &request).await,
        Launch::Resume(id) => resume_lesson(&manager, &id).await?,
        Launch::Prompt => match prompt_lesson_request(&mut rl, config) {
            Some(request) => start_lesson(&manager, &request).await,
            None => {
                autosave.abort();
                return Ok(());
            }
        },
    }

    loop {
        let line = match rl.readline(&format!("{} ", "You:".bright_cyan().bold())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", format!("Input error: {}", e).red());
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        match input {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/save" => match manager.save_now().await {
                Ok(SaveOutcome::Created(id)) | Ok(SaveOutcome::Updated(id)) => {
                    println!("{} {}", "Saved".green(), id.dimmed());
                }
                Ok(SaveOutcome::Skipped(reason)) => {
                    println!("{}", format!("Nothing saved: {}", reason).dimmed());
                }
                Ok(SaveOutcome::Superseded) => {}
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            "/transcript" => {
                let transcript = manager.state().lock().await.transcript();
                println!("{}", transcript.dimmed());
            }
            "/reset" => {
                manager.reset_session().await;
                match prompt_lesson_request(&mut rl, config) {
                    Some(request) => start_lesson(&manager, &request).await,
                    None => break,
                }
            }
            answer => {
                let phase = manager.state().lock().await.phase();
                if phase == SessionPhase::Completed {
                    println!("{}", "This lesson is complete. Type /reset or /quit.".dimmed());
                    continue;
                }

                let bar = spinner("Thinking...");
                let result = manager.submit_response(answer).await;
                bar.finish_and_clear();

                match result {
                    Ok(outcome) => print_turn(&outcome),
                    Err(e) => {
                        eprintln!("{}", e.to_string().red());
                        if e.is_retryable() {
                            println!("{}", "Send your answer again to retry.".dimmed());
                        }
                    }
                }
            }
        }
    }

    autosave.abort();
    if let Some(outcome) = manager.save_on_teardown().await {
        if outcome.is_saved() {
            println!("{}", "Lesson saved.".green());
        }
    }
    Ok(())
}
