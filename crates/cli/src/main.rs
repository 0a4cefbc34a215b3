//! Tutor CLI - mastery tracking and review scheduling.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tutor_core::{EngineConfig, TopicId};
use tutor_progress::{
    Clock, MasteryEstimator, PriorityRanker, ReviewScheduler, SeededNoise, SessionTracker,
    SystemClock,
};
use tutor_storage::JsonStorage;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Adaptive mastery tracking and spaced review scheduling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding progress.json, schedule.json and sessions.json
    #[arg(long, global = true, env = "TUTOR_DATA_DIR", default_value = ".tutor")]
    data_dir: PathBuf,

    /// JSON file overriding model parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for interval jitter
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Knowledge tracing
    Mastery {
        #[command(subcommand)]
        command: MasteryCommand,
    },
    /// Spaced review scheduling
    Schedule {
        #[command(subcommand)]
        command: ScheduleCommand,
    },
    /// Study sessions and streaks
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },
    /// Rank topics by study priority
    Rank {
        /// Topics to boost (repeatable)
        #[arg(long = "boost")]
        boost: Vec<String>,
    },
}

#[derive(Subcommand)]
enum MasteryCommand {
    /// Record an answer
    Update {
        /// Topic ID
        topic: String,
        /// true/false, yes/no, 1/0, correct/incorrect
        correct: String,
    },
    /// Show a topic's mastery
    Get {
        /// Topic ID
        topic: String,
    },
    /// Summarize mastery across topics
    Status,
    /// Suggest what to study next
    Suggest,
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Record a review rated 0-5
    Review {
        /// Topic ID
        topic: String,
        /// Quality rating (0-5)
        #[arg(allow_hyphen_values = true)]
        quality: i64,
    },
    /// Most overdue topic
    Next,
    /// Topics due now
    Due {
        /// Maximum number of topics
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Topics coming due soon
    Upcoming {
        /// Window in days
        #[arg(default_value = "7")]
        days: f64,
        /// Maximum number of topics
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show a topic's schedule
    Stats {
        /// Topic ID
        topic: String,
    },
    /// Forget a topic's schedule
    Reset {
        /// Topic ID
        topic: String,
    },
    /// Overdue topics followed by upcoming ones
    Queue {
        /// Maximum number of entries
        #[arg(default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Start a study session
    Start,
    /// Show the current streak
    Streak,
    /// Session and mastery totals
    Stats,
    /// Log a study action
    Log {
        /// Topic ID
        topic: String,
        /// Action, e.g. answered, reviewed, completed
        action: String,
    },
}

fn init_logging() {
    // stdout carries the JSON results
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let storage = Arc::new(JsonStorage::new(&cli.data_dir).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    debug!("using data directory {}", cli.data_dir.display());

    match cli.command {
        Commands::Mastery { command } => {
            let estimator = MasteryEstimator::new(storage, config.bkt);
            match command {
                MasteryCommand::Update { topic, correct } => {
                    print_json(&estimator.update_from_str(&TopicId::new(topic), &correct).await?)?
                }
                MasteryCommand::Get { topic } => {
                    print_json(&estimator.get(&TopicId::new(topic)).await?)?
                }
                MasteryCommand::Status => print_json(&estimator.status().await?)?,
                MasteryCommand::Suggest => print_json(&estimator.suggest().await?)?,
            }
        }
        Commands::Schedule { command } => {
            let noise = match cli.seed {
                Some(seed) => SeededNoise::new(seed),
                None => SeededNoise::from_entropy(),
            };
            let scheduler = ReviewScheduler::new(storage, config.sm2, clock, noise);
            match command {
                ScheduleCommand::Review { topic, quality } => {
                    print_json(&scheduler.review(&TopicId::new(topic), quality).await?)?
                }
                ScheduleCommand::Next => match scheduler.next().await? {
                    Some(next) => print_json(&next)?,
                    None => print_json(&json!({ "message": "No topics due for review" }))?,
                },
                ScheduleCommand::Due { limit } => print_json(&scheduler.due(limit).await?)?,
                ScheduleCommand::Upcoming { days, limit } => {
                    print_json(&scheduler.upcoming(days, Some(limit)).await?)?
                }
                ScheduleCommand::Stats { topic } => {
                    let topic = TopicId::new(topic);
                    let stats = scheduler
                        .stats(&topic)
                        .await?
                        .with_context(|| format!("topic {topic} has never been reviewed"))?;
                    print_json(&stats)?
                }
                ScheduleCommand::Reset { topic } => {
                    let topic = TopicId::new(topic);
                    let reset = scheduler.reset(&topic).await?;
                    print_json(&json!({ "topic": topic, "reset": reset }))?
                }
                ScheduleCommand::Queue { limit } => print_json(&scheduler.queue(limit).await?)?,
            }
        }
        Commands::Session { command } => {
            let tracker = SessionTracker::new(storage, clock);
            match command {
                SessionCommand::Start => print_json(&tracker.start_session().await?)?,
                SessionCommand::Streak => print_json(&tracker.current_streak().await?)?,
                SessionCommand::Stats => print_json(&tracker.global_stats().await?)?,
                SessionCommand::Log { topic, action } => {
                    print_json(&tracker.log_action(&TopicId::new(topic), &action).await?)?
                }
            }
        }
        Commands::Rank { boost } => {
            let boosted: Vec<TopicId> = boost.into_iter().map(TopicId::new).collect();
            let ranker = PriorityRanker::new(storage, clock);
            print_json(&ranker.rank(&boosted).await?)?
        }
    }

    Ok(())
}
