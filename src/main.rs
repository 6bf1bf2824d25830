mod ai;
mod captain_ai;
mod config;
mod job_ai;
mod metrics;
mod models;
mod persist;
mod prompts;
mod resume_ai;
mod sections;
mod store;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ai::Assistant;
use config::Config;
use models::{Fields, KNOWN_STATUSES};
use persist::DataDir;
use sections::Section;
use store::ContextStore;

const WRAP_WIDTH: usize = 88;

#[derive(Parser)]
#[command(name = "captain")]
#[command(about = "AI-assisted job application tracker")]
struct Cli {
    /// Data directory (overrides CAPTAIN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Model to use (overrides CAPTAIN_MODEL)
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage job applications
    App {
        #[command(subcommand)]
        command: AppCommands,
    },

    /// Manage and analyze the master resume
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// AI help for a single job application
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// AI advice across the whole job search
    Captain {
        #[command(subcommand)]
        command: CaptainCommands,
    },

    /// Chat with the assistant (the conversation is kept between runs)
    Chat {
        /// Message to send
        message: Option<String>,

        /// Forget the conversation so far
        #[arg(long)]
        reset: bool,
    },

    /// Show application counts and success rate
    Stats,

    /// Show the action log
    History {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Manage free-form global insights
    Insight {
        #[command(subcommand)]
        command: InsightCommands,
    },
}

#[derive(Subcommand)]
enum AppCommands {
    /// Add a job application
    Add {
        /// Unique key for this application
        key: String,

        #[arg(short, long)]
        company: String,

        #[arg(short, long)]
        position: String,

        /// Job description text
        #[arg(short, long)]
        description: Option<String>,

        /// Read the job description from a file
        #[arg(long, conflicts_with = "description")]
        description_file: Option<PathBuf>,

        #[arg(short, long, default_value = models::STATUS_NOT_STARTED)]
        status: String,

        /// Extra field as name=value (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// List job applications
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show one application
    Show { key: String },

    /// Change an application's status and get advice on the next stage
    Status {
        key: String,

        /// New status (Not Started, Applied, Interview Scheduled, Offer Received, Rejected)
        status: String,

        /// Only record the change, skip the AI briefing
        #[arg(long)]
        no_ai: bool,
    },

    /// Set arbitrary fields on an application
    Set {
        key: String,

        /// name=value pairs
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// Print the current resume
    Show,

    /// Replace the resume with the contents of a file
    Set { file: PathBuf },

    /// List recorded versions
    Versions,

    /// Restore an earlier version (recorded as a new version)
    Rollback { version: u32 },

    /// Analyze the resume
    Analyze,

    /// Suggest improvements (kept as pending suggestions)
    Improve,

    /// Show pending suggestions, or clear them
    Suggestions {
        #[arg(long)]
        clear: bool,
    },

    /// Write a cover letter for an application
    CoverLetter {
        key: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask a question about the resume
    Chat { message: String },
}

#[derive(Subcommand)]
enum JobCommands {
    /// Compare the job description with the resume
    Analyze { key: String },
    /// Suggestions for tailoring the resume to this job
    Improve { key: String },
    /// Full application strategy
    Strategy { key: String },
    /// Likely interview questions with suggested answers
    Interview { key: String },
    /// Company culture read from the job description
    Culture { key: String },
    /// Networking ideas for this application
    Network { key: String },
}

#[derive(Subcommand)]
enum CaptainCommands {
    /// Overview of the whole search
    Overview,
    /// A weekend project to strengthen applications
    Weekend,
    /// Simulate the first day at a job
    FirstDay { key: String },
    /// Goals for this week
    Goals,
    /// A motivational message
    Motivate,
    /// Skills worth improving
    Skills,
    /// A five-year career plan
    Plan,
}

#[derive(Subcommand)]
enum InsightCommands {
    /// Set an insight (value is parsed as JSON, else stored as a string)
    Set { key: String, value: String },
    /// Show one insight
    Get { key: String },
    /// List all insights
    List,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty field name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

fn init_logging(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_assistant(config: &Config, data: &DataDir) -> Result<Assistant> {
    let spec = ai::resolve_model(&config.model)?;
    info!(model = %spec.short_name, "using model");
    let provider = ai::create_provider(&spec)?;
    let mut assistant = Assistant::new(provider, config.max_tokens);
    assistant.load_memory(data.load_conversation()?);
    Ok(assistant)
}

/// Runs `f` with an assistant that remembers earlier turns, then saves the
/// conversation back.
fn with_assistant<T>(
    config: &Config,
    data: &DataDir,
    f: impl FnOnce(&mut Assistant) -> Result<T>,
) -> Result<T> {
    let mut assistant = open_assistant(config, data)?;
    let out = f(&mut assistant)?;
    data.save_conversation(assistant.memory())?;
    Ok(out)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    init_logging(&config.log_filter);

    let data = DataDir::open(&config.data_dir)?;
    let mut store = data.load_state()?;

    match cli.command {
        Commands::App { command } => run_app(command, &config, &data, &mut store)?,
        Commands::Resume { command } => run_resume(command, &config, &data, &mut store)?,
        Commands::Job { command } => run_job(command, &config, &data, &mut store)?,
        Commands::Captain { command } => {
            with_assistant(&config, &data, |a| run_captain(command, a, &store))?;
        }

        Commands::Chat { message, reset } => {
            match message {
                Some(message) => {
                    let reply = with_assistant(&config, &data, |a| {
                        if reset {
                            a.clear_memory();
                        }
                        a.chat(&message)
                    })?;
                    print_prose(&reply);
                }
                None if reset => {
                    data.clear_conversation()?;
                    println!("Conversation cleared.");
                }
                None => return Err(anyhow!("Nothing to send. Pass a message or --reset.")),
            }
        }

        Commands::Stats => {
            let apps = store.list_applications();
            println!("Applications: {}", apps.len());
            println!("Success rate: {}", captain_ai::format_rate(store.success_rate()));
            let breakdown = metrics::status_breakdown(apps.values());
            if !breakdown.is_empty() {
                println!();
                println!("{:<22} {:>6}", "STATUS", "COUNT");
                println!("{}", "-".repeat(29));
                for (status, count) in breakdown {
                    println!("{:<22} {:>6}", status, count);
                }
            }
            let resume = store.get_resume();
            println!(
                "\nResume version: {} (edited {})",
                resume.version,
                resume.last_edited.format("%Y-%m-%d %H:%M")
            );
            println!("Data directory: {}", data.path().display());
        }

        Commands::History { limit } => {
            let history = store.history();
            if history.is_empty() {
                println!("No actions recorded.");
            } else {
                println!("{:<20} {:<14} {:<20}", "WHEN", "ACTION", "JOB");
                println!("{}", "-".repeat(54));
                let skip = history.len().saturating_sub(limit);
                for entry in &history[skip..] {
                    println!(
                        "{:<20} {:<14} {:<20}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        entry.action.to_string(),
                        entry.job_id.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Insight { command } => match command {
            InsightCommands::Set { key, value } => {
                let parsed = serde_json::from_str(&value)
                    .unwrap_or(serde_json::Value::String(value));
                store.add_global_insight(&key, parsed);
                data.save_state(&store)?;
                println!("Insight '{}' saved.", key);
            }
            InsightCommands::Get { key } => match store.global_insight(&key) {
                Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
                None => println!("Insight '{}' not found.", key),
            },
            InsightCommands::List => {
                let insights = store.global_insights();
                if insights.is_empty() {
                    println!("No insights.");
                }
                for (key, value) in insights {
                    println!("{:<20} {}", truncate(key, 18), value);
                }
            }
        },
    }

    Ok(())
}

fn run_app(
    command: AppCommands,
    config: &Config,
    data: &DataDir,
    store: &mut ContextStore,
) -> Result<()> {
    match command {
        AppCommands::Add {
            key,
            company,
            position,
            description,
            description_file,
            status,
            fields: extra,
        } => {
            let description = match description_file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => description.unwrap_or_default(),
            };
            warn_unknown_status(&status);

            let mut fields: Fields = extra.into_iter().collect();
            fields.insert("company".to_string(), company);
            fields.insert("position".to_string(), position);
            fields.insert("description".to_string(), description);
            fields.insert("status".to_string(), status);

            store.add_application(&key, fields)?;
            data.save_state(store)?;
            println!("Added application '{}'", key);
        }

        AppCommands::List { status } => {
            let apps: Vec<_> = store
                .list_applications()
                .iter()
                .filter(|(_, app)| status.as_deref().is_none_or(|s| app.status() == s))
                .collect();
            if apps.is_empty() {
                println!("No applications found.");
            } else {
                println!("{:<16} {:<20} {:<20} {:<26}", "KEY", "STATUS", "COMPANY", "POSITION");
                println!("{}", "-".repeat(85));
                for (key, app) in apps {
                    println!(
                        "{:<16} {:<20} {:<20} {:<26}",
                        truncate(key, 14),
                        app.status(),
                        truncate(app.company(), 18),
                        truncate(app.position(), 24)
                    );
                }
            }
        }

        AppCommands::Show { key } => match store.get_application(&key) {
            Some(app) => {
                println!("Application '{}'", key);
                println!("Company: {}", app.company());
                println!("Position: {}", app.position());
                println!("Status: {}", app.status());
                for (name, value) in app.fields() {
                    if matches!(name.as_str(), "company" | "position" | "status" | "description") {
                        continue;
                    }
                    println!("{}: {}", name, value);
                }
                if !app.description().is_empty() {
                    println!("\n--- Description ---\n{}", app.description());
                }
            }
            None => {
                println!("Application '{}' not found.", key);
            }
        },

        AppCommands::Status { key, status, no_ai } => {
            warn_unknown_status(&status);
            if no_ai {
                let mut partial = Fields::new();
                partial.insert("status".to_string(), status.clone());
                store.update_application(&key, partial)?;
                data.save_state(store)?;
                println!("'{}' is now {}.", key, status);
            } else {
                let briefing = with_assistant(config, data, |a| {
                    change_status_with_briefing(a, data, store, &key, &status)
                })?;
                println!("'{}' is now {}.\n", key, status);
                print_prose(&briefing);
            }
        }

        AppCommands::Set { key, fields } => {
            let count = fields.len();
            store.update_application(&key, fields.into_iter().collect())?;
            data.save_state(store)?;
            println!("Updated {} field(s) on '{}'.", count, key);
        }
    }
    Ok(())
}

/// Records the new status and asks for a briefing on it. The change is saved
/// before the briefing result is looked at, so it sticks when the AI fails.
fn change_status_with_briefing(
    assistant: &mut Assistant,
    data: &DataDir,
    store: &mut ContextStore,
    key: &str,
    status: &str,
) -> Result<String> {
    let briefing = job_ai::update_application_status(assistant, store, key, status);
    data.save_state(store)?;
    briefing
}

fn run_resume(
    command: ResumeCommands,
    config: &Config,
    data: &DataDir,
    store: &mut ContextStore,
) -> Result<()> {
    match command {
        ResumeCommands::Show => {
            let resume = store.get_resume();
            if resume.content.is_empty() {
                println!("No resume yet. Add one with 'captain resume set <file>'.");
            } else {
                println!("{}", resume.content);
            }
        }

        ResumeCommands::Set { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read resume file: {}", file.display()))?;
            store.set_resume(&content);
            data.save_state(store)?;
            println!("Resume updated to version {}.", store.get_resume().version);
        }

        ResumeCommands::Versions => {
            println!("{:<9} {:<20} {:<40}", "VERSION", "EDITED", "FIRST LINE");
            println!("{}", "-".repeat(69));
            for version in store.resume_versions() {
                let first_line = version.content.lines().next().unwrap_or("");
                println!(
                    "{:<9} {:<20} {:<40}",
                    version.version,
                    version.last_edited.format("%Y-%m-%d %H:%M:%S"),
                    truncate(first_line, 38)
                );
            }
        }

        ResumeCommands::Rollback { version } => {
            let new_version = store.rollback_resume(version)?;
            data.save_state(store)?;
            println!("Restored version {} as version {}.", version, new_version);
        }

        ResumeCommands::Suggestions { clear } => {
            if clear {
                store.clear_resume_suggestions();
                data.save_state(store)?;
                println!("Suggestions cleared.");
            } else {
                print_list(&store.get_resume().ai_suggestions);
            }
        }

        ResumeCommands::Analyze => {
            let analysis = with_assistant(config, data, |a| resume_ai::analyze_resume(a, store))?;
            print_sections(&analysis);
        }

        ResumeCommands::Improve => {
            let suggestions =
                with_assistant(config, data, |a| resume_ai::suggest_improvements(a, store))?;
            data.save_state(store)?;
            println!("### Suggested Improvements");
            print_list(&suggestions);
        }

        ResumeCommands::CoverLetter { key, output } => {
            let letter =
                with_assistant(config, data, |a| resume_ai::generate_cover_letter(a, store, &key))?;
            if let Some(path) = output {
                std::fs::write(&path, &letter)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                println!("Cover letter saved to: {}", path.display());
            } else {
                println!("{}", letter);
            }
        }

        ResumeCommands::Chat { message } => {
            let reply =
                with_assistant(config, data, |a| resume_ai::resume_chat(a, store, &message))?;
            print_prose(&reply);
        }
    }
    Ok(())
}

fn run_job(
    command: JobCommands,
    config: &Config,
    data: &DataDir,
    store: &mut ContextStore,
) -> Result<()> {
    let mut assistant = open_assistant(config, data)?;
    match command {
        JobCommands::Analyze { key } => {
            print_sections(&job_ai::analyze_job_description(&mut assistant, store, &key)?);
        }
        JobCommands::Improve { key } => {
            let suggestions = job_ai::suggest_application_improvements(&mut assistant, store, &key)?;
            print_list(&suggestions);
        }
        JobCommands::Strategy { key } => {
            print_prose(&job_ai::generate_application_strategy(&mut assistant, store, &key)?);
        }
        JobCommands::Interview { key } => {
            let questions = job_ai::simulate_interview_questions(&mut assistant, store, &key)?;
            if questions.is_empty() {
                println!("The model did not return usable questions. Try again.");
            }
            for (i, q) in questions.iter().enumerate() {
                println!("Q{}: {}", i + 1, q.question);
                println!("{}\n", textwrap::indent(&textwrap::fill(&q.suggested_answer, WRAP_WIDTH - 4), "    "));
            }
        }
        JobCommands::Culture { key } => {
            let culture = job_ai::analyze_company_culture(&mut assistant, store, &key)?;
            if culture.is_empty() {
                println!("The model did not return a usable culture analysis. Try again.");
            } else {
                data.save_state(store)?;
            }
            for (aspect, value) in &culture {
                let text = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                println!("### {}\n{}\n", aspect, textwrap::fill(&text, WRAP_WIDTH));
            }
        }
        JobCommands::Network { key } => {
            let strategies = job_ai::suggest_networking_strategies(&mut assistant, store, &key)?;
            for line in strategies {
                println!("{}", line);
            }
        }
    }
    data.save_conversation(assistant.memory())?;
    Ok(())
}

fn run_captain(command: CaptainCommands, assistant: &mut Assistant, store: &ContextStore) -> Result<()> {
    match command {
        CaptainCommands::Overview => print_prose(&captain_ai::job_search_overview(assistant, store)?),
        CaptainCommands::Weekend => print_paragraphs(&captain_ai::weekend_project(assistant, store)?),
        CaptainCommands::FirstDay { key } => {
            print_paragraphs(&captain_ai::simulate_first_day(assistant, store, &key)?)
        }
        CaptainCommands::Goals => {
            for goal in captain_ai::weekly_goals(assistant, store)? {
                println!("{}", goal);
            }
        }
        CaptainCommands::Motivate => print_prose(&captain_ai::motivation(assistant, store)?),
        CaptainCommands::Skills => print_sections(&captain_ai::skill_improvement(assistant, store)?),
        CaptainCommands::Plan => print_paragraphs(&captain_ai::career_plan(assistant, store)?),
    }
    Ok(())
}

fn warn_unknown_status(status: &str) {
    if !KNOWN_STATUSES.contains(&status) {
        warn!(status, "status is not one of the usual values");
    }
}

fn print_prose(text: &str) {
    for paragraph in text.split("\n\n") {
        println!("{}\n", textwrap::fill(paragraph.trim_end(), WRAP_WIDTH));
    }
}

fn print_list(items: &[String]) {
    if items.is_empty() {
        println!("(none)");
    }
    for item in items {
        println!("{}", textwrap::fill(&format!("- {}", item), textwrap::Options::new(WRAP_WIDTH).subsequent_indent("  ")));
    }
}

fn print_sections(sections: &[Section]) {
    if sections.is_empty() {
        println!("The model's reply had no recognizable sections. Try again.");
    }
    for section in sections {
        println!("### {}", section.title);
        for item in &section.items {
            println!("{}", textwrap::fill(item, WRAP_WIDTH));
        }
        println!();
    }
}

fn print_paragraphs(sections: &[Section]) {
    if sections.is_empty() {
        println!("The model's reply had no recognizable sections. Try again.");
    }
    for section in sections {
        println!("### {}\n{}\n", section.title, textwrap::fill(&section.paragraph(), WRAP_WIDTH));
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
