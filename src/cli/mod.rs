//! Command-line interface for predup.
//!
//! Provides commands for comparing two predictions, clustering a batch
//! into duplicate relations, validating spans against their posts, and
//! showing the resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::dedup::{self, compare_predictions_with, DuplicateRelation, Thresholds};
use crate::domain::{index_posts, quote_field, validate_prediction, Prediction, SourcePost};
use crate::store::{RelationLog, RelationRecord};

/// predup - near-duplicate detection for extracted predictions
#[derive(Parser, Debug)]
#[command(name = "predup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two predictions (JSON files)
    Compare {
        /// First prediction
        a: PathBuf,

        /// Second prediction
        b: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cluster a batch of predictions into duplicate relations
    Cluster {
        /// Predictions file (JSONL, one prediction per line)
        input: PathBuf,

        /// Append relations to this log (defaults to the configured log)
        #[arg(short, long, env = "PREDUP_RELATIONS")]
        output: Option<PathBuf>,

        /// Print relations without writing them
        #[arg(long)]
        dry_run: bool,

        /// Print relations as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Validate prediction spans against their source posts
    Validate {
        /// Predictions file (JSONL)
        input: PathBuf,

        /// Posts file (JSONL with id, text, author)
        #[arg(short, long)]
        posts: PathBuf,

        /// Print the quoted target and timeframe of valid predictions
        #[arg(long)]
        quotes: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Compare { a, b, json } => compare(&a, &b, json).await,
            Commands::Cluster {
                input,
                output,
                dry_run,
                json,
            } => cluster_batch(&input, output, dry_run, json).await,
            Commands::Validate { input, posts, quotes } => validate(&input, &posts, quotes).await,
            Commands::Config => show_config(),
        }
    }
}

/// Read one JSON document
async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read a JSONL file, skipping blank lines
async fn load_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<T>(line)
                .with_context(|| format!("Failed to parse {} line {}", path.display(), idx + 1))
        })
        .collect()
}

async fn compare(a: &Path, b: &Path, json: bool) -> Result<()> {
    let p1: Prediction = load_json(a).await?;
    let p2: Prediction = load_json(b).await?;
    let thresholds = crate::config::thresholds()?;

    let result = compare_predictions_with(&p1, &p2, &thresholds);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Predictions:     {} vs {}", p1.id, p2.id);
    println!("Target score:    {:.4} (threshold {})", result.target_score, thresholds.target);
    println!("Timeframe score: {:.4} (threshold {})", result.timeframe_score, thresholds.timeframe);
    println!(
        "Verdict:         {}",
        if result.is_duplicate { "duplicate" } else { "distinct" }
    );

    Ok(())
}

/// Relations found in one conversation window
struct PartitionOutcome {
    key: String,
    conversation_id: Option<String>,
    predictions: usize,
    relations: Vec<DuplicateRelation>,
}

async fn cluster_batch(input: &Path, output: Option<PathBuf>, dry_run: bool, json: bool) -> Result<()> {
    let predictions: Vec<Prediction> = load_jsonl(input).await?;
    let thresholds = crate::config::thresholds()?;
    let total = predictions.len();

    let groups = dedup::partition_by_conversation(predictions);
    let partitions = groups.len();
    info!(predictions = total, partitions, "Clustering batch");

    let mut tasks = JoinSet::new();
    for (key, group) in groups {
        if group.len() < 2 {
            continue;
        }
        tasks.spawn_blocking(move || cluster_partition(key, group, thresholds));
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.context("Clustering task panicked")?);
    }
    outcomes.sort_by(|a, b| a.key.cmp(&b.key));

    let mut records = Vec::new();
    let mut partitions_with_duplicates = 0;
    for outcome in &outcomes {
        if !outcome.relations.is_empty() {
            partitions_with_duplicates += 1;
        }
        info!(
            partition = %outcome.key,
            predictions = outcome.predictions,
            duplicates = outcome.relations.len(),
            "Partition clustered"
        );
        for relation in &outcome.relations {
            records.push(RelationRecord::new(relation, outcome.conversation_id.clone()));
        }
    }

    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!(
                "{} -> {} ({:.4})",
                record.prediction_id, record.canonical_id, record.similarity_score
            );
        }
    }

    let written = if dry_run {
        0
    } else {
        let log = match output {
            Some(path) => RelationLog::open(path)?,
            None => RelationLog::open_default()?,
        };
        let written = log.append(&records)?;
        if written < records.len() {
            warn!(
                skipped = records.len() - written,
                "Some relations were already recorded"
            );
        }
        info!(path = %log.path().display(), written, "Relations appended");
        written
    };

    eprintln!();
    eprintln!("Predictions analysed:        {}", total);
    eprintln!("Partitions:                  {}", partitions);
    eprintln!("Partitions with duplicates:  {}", partitions_with_duplicates);
    eprintln!("Duplicate relations:         {}", records.len());
    if !dry_run {
        eprintln!("Relations written:           {}", written);
    }

    Ok(())
}

fn cluster_partition(key: String, group: Vec<Prediction>, thresholds: Thresholds) -> PartitionOutcome {
    let relations = dedup::cluster(&group, &thresholds);
    let conversation_id = group.first().and_then(|p| p.conversation_id.clone());
    PartitionOutcome {
        key,
        conversation_id,
        predictions: group.len(),
        relations,
    }
}

async fn validate(input: &Path, posts_path: &Path, quotes: bool) -> Result<()> {
    let predictions: Vec<Prediction> = load_jsonl(input).await?;
    let posts: Vec<SourcePost> = load_jsonl(posts_path).await?;
    let index = index_posts(posts);
    let min_span_len = crate::config::config()?.min_span_len;

    let mut invalid = 0;
    for prediction in &predictions {
        match validate_prediction(prediction, &index, min_span_len) {
            Err(violation) => {
                invalid += 1;
                println!(
                    "{}: {} [{}]",
                    prediction.id,
                    violation,
                    violation.violation.code()
                );
            }
            Ok(()) if quotes => {
                let target = quote_field(&prediction.target, &index).unwrap_or_default();
                let timeframe = quote_field(&prediction.timeframe, &index).unwrap_or_default();
                println!("{}: target {:?}, timeframe {:?}", prediction.id, target, timeframe);
            }
            Ok(()) => {}
        }
    }

    println!();
    println!(
        "{} of {} predictions valid",
        predictions.len() - invalid,
        predictions.len()
    );

    if invalid > 0 {
        anyhow::bail!("{} predictions failed validation", invalid);
    }
    Ok(())
}

fn show_config() -> Result<()> {
    let config = crate::config::config()?;

    println!("predup configuration");
    println!("====================");
    println!();
    match &config.config_file {
        Some(path) => println!("Config file:         {}", path.display()),
        None => println!("Config file:         (none, using defaults)"),
    }
    println!("Home:                {}", config.home.display());
    println!("Relation log:        {}", config.relations.display());
    println!("Target threshold:    {}", config.thresholds.target);
    println!("Timeframe threshold: {}", config.thresholds.timeframe);
    println!("Minimum span length: {}", config.min_span_len);

    Ok(())
}
