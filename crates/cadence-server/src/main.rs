//! Cadence CLI
//!
//! Serve the review API or work with the card store directly.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use cadence_core::{DueQueue, NewCard, Quality, ReviewService, ReviewSubmission, Storage};
use cadence_server::{AppState, ConfigOverrides, ServerConfig};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

/// Cadence - Spaced-Repetition Review Scheduler
#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced-repetition review scheduler for flashcards")]
#[command(long_about = "Cadence schedules flashcard reviews with an ease-factor algorithm.\n\nRatings: Again <1d, Hard 1-3d, Good 3-7d, Easy 7d+.")]
struct Cli {
    /// Directory holding the database (env: CADENCE_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind (env: CADENCE_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (env: CADENCE_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Default due-queue size (env: CADENCE_DUE_LIMIT)
        #[arg(long)]
        due_limit: Option<usize>,
        /// Default cap on new cards per queue (env: CADENCE_NEW_CARD_CAP)
        #[arg(long)]
        new_card_cap: Option<usize>,
        /// Retries after a concurrent-update conflict (env: CADENCE_CONFLICT_RETRIES)
        #[arg(long)]
        conflict_retries: Option<u32>,
    },

    /// Add a card
    Add {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        front: String,
        #[arg(long)]
        back: String,
        /// Origin tag (defaults to "direct")
        #[arg(long)]
        source_kind: Option<String>,
    },

    /// List cards due now
    Due {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        new_card_cap: Option<usize>,
    },

    /// Rate a card: again, hard, good, easy (or 1-4)
    Review {
        #[arg(long)]
        owner: String,
        card_id: String,
        quality: Quality,
        /// Idempotency key; resubmitting it never applies the review twice
        #[arg(long)]
        client_review_id: Option<String>,
    },

    /// Show what each rating would do to a card
    Preview {
        #[arg(long)]
        owner: String,
        card_id: String,
    },

    /// Show collection statistics
    Stats {
        #[arg(long)]
        owner: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Quiet by default for one-shot commands; RUST_LOG overrides
    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let base = ServerConfig::from_env()?.with_overrides(ConfigOverrides {
        data_dir: cli.data_dir,
        ..Default::default()
    });

    match cli.command {
        Commands::Serve {
            host,
            port,
            due_limit,
            new_card_cap,
            conflict_retries,
        } => run_serve(base.with_overrides(ConfigOverrides {
            host,
            port,
            due_limit,
            new_card_cap,
            conflict_retries,
            ..Default::default()
        })),
        Commands::Add {
            owner,
            front,
            back,
            source_kind,
        } => run_add(&base, owner, front, back, source_kind),
        Commands::Due {
            owner,
            limit,
            new_card_cap,
        } => run_due(&base, &owner, limit, new_card_cap),
        Commands::Review {
            owner,
            card_id,
            quality,
            client_review_id,
        } => run_review(&base, &owner, card_id, quality, client_review_id),
        Commands::Preview { owner, card_id } => run_preview(&base, &owner, &card_id),
        Commands::Stats { owner } => run_stats(&base, &owner),
    }
}

fn open_storage(config: &ServerConfig) -> anyhow::Result<Arc<Storage>> {
    let path = config.db_path()?;
    let storage = Storage::new(Some(path))?;
    Ok(Arc::new(storage))
}

/// Run serve command
fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    tracing::info!(
        "Cadence v{} using {}",
        env!("CARGO_PKG_VERSION"),
        storage.path().display()
    );

    let state = AppState::new(storage, &config);
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        cadence_server::serve(state, &config.host, config.port)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))
    })
}

/// Run add command
fn run_add(
    config: &ServerConfig,
    owner: String,
    front: String,
    back: String,
    source_kind: Option<String>,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let input = NewCard {
        owner,
        front,
        back,
        source_kind,
    };
    let card = storage.create_card(input, Utc::now())?;

    println!("{}", "=== Card Added ===".cyan().bold());
    println!("{}: {}", "ID".white().bold(), card.id);
    println!("{}: {}", "Front".white().bold(), card.front);
    println!("{}: {}", "Source".white().bold(), card.source_kind);
    Ok(())
}

/// Run due command
fn run_due(
    config: &ServerConfig,
    owner: &str,
    limit: Option<usize>,
    new_card_cap: Option<usize>,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let queue = DueQueue::with_config(storage, config.due_queue());
    let due = queue.due_cards(owner, Utc::now(), limit, new_card_cap)?;

    println!("{}", "=== Due Cards ===".cyan().bold());
    println!();
    if due.is_empty() {
        println!("{}", "Nothing due. Come back later.".dimmed());
        return Ok(());
    }

    for entry in &due {
        let tag = if entry.mastery.is_new() {
            "new".green()
        } else if entry.mastery.lapses > 0 {
            format!("{} lapses", entry.mastery.lapses).red()
        } else {
            format!("{} reps", entry.mastery.reps).yellow()
        };
        println!(
            "  {} [{}] {}",
            entry.card.id.dimmed(),
            tag,
            truncate(&entry.card.front, 60)
        );
    }
    println!();
    println!("{}: {}", "Total".white().bold(), due.len());
    Ok(())
}

/// Run review command
fn run_review(
    config: &ServerConfig,
    owner: &str,
    card_id: String,
    quality: Quality,
    client_review_id: Option<String>,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let service = ReviewService::new(storage).with_conflict_retries(config.conflict_retries);

    let mut submission = ReviewSubmission::new(card_id, quality.as_i64());
    submission.client_review_id = client_review_id;
    let outcome = service.submit_review(owner, &submission, Utc::now())?;
    let m = &outcome.mastery;

    println!("{}", "=== Review Recorded ===".cyan().bold());
    if outcome.duplicate {
        println!("{}", "Already applied; showing the recorded result.".yellow());
    }
    println!("{}: {}", "Rating".white().bold(), quality);
    println!("{}: {} days", "Interval".white().bold(), m.interval_days);
    println!("{}: {:.2}", "Ease".white().bold(), m.ease);
    println!("{}: {}", "Reps".white().bold(), m.reps);
    println!("{}: {}", "Lapses".white().bold(), m.lapses);
    println!("{}: {}", "Next Due".white().bold(), m.due_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

/// Run preview command
fn run_preview(config: &ServerConfig, owner: &str, card_id: &str) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let service = ReviewService::new(storage);
    let preview = service.preview(owner, card_id, Utc::now())?;

    println!("{}", "=== Review Preview ===".cyan().bold());
    println!();
    for quality in Quality::ALL {
        let m = preview.get(quality);
        println!(
            "  {:6} {:>5} days  ease {:.2}  due {}",
            quality.as_str(),
            m.interval_days,
            m.ease,
            m.due_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// Run stats command
fn run_stats(config: &ServerConfig, owner: &str) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats(owner, Utc::now())?;

    println!("{}", "=== Cadence Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Cards".white().bold(), stats.total_cards);
    println!("{}: {}", "Due Now".white().bold(), stats.due_now);
    println!("{}: {}", "Reviews Logged".white().bold(), stats.total_reviews);
    println!("{}: {}", "Total Lapses".white().bold(), stats.total_lapses);
    if let Some(ease) = stats.average_ease {
        println!("{}: {:.2}", "Average Ease".white().bold(), ease);
    }

    if stats.total_cards > 0 {
        println!();
        println!("{}", "=== Maturity ===".yellow().bold());
        print_distribution_bar("Unseen", stats.unseen_cards, stats.total_cards, "magenta");
        print_distribution_bar("Learning", stats.new_cards - stats.unseen_cards, stats.total_cards, "yellow");
        print_distribution_bar("Mature", stats.mature_cards, stats.total_cards, "green");
    }
    Ok(())
}

fn print_distribution_bar(label: &str, count: i64, total: i64, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "green" => bar.green(),
        "yellow" => bar.yellow(),
        "magenta" => bar.magenta(),
        _ => bar.white(),
    };

    println!(
        "  {:10} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}

/// Truncate a string for display (UTF-8 safe)
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
