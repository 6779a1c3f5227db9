//! Call transcription CLI
//!
//! Local execution entry point using ambient AWS credentials. For AWS Lambda,
//! use `call-transcription-lambda`.

use std::path::PathBuf;

use call_transcription::{
    clients::AwsClients,
    error::Result,
    models::{Config, User},
    pipeline::{self, OnRequest},
};
use clap::{Parser, Subcommand};
use serde_json::json;

/// Call transcription operator tool
#[derive(Parser, Debug)]
#[command(
    name = "call-transcription",
    version,
    about = "On-request call transcription, answer feedback and queue_id backfill"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request transcription of calls on behalf of a user
    Submit {
        /// Email of the requesting user
        #[arg(long)]
        user: String,

        /// Call ids to transcribe
        #[arg(required = true)]
        call_ids: Vec<String>,
    },

    /// Copy inbound queue ids onto internal calls
    Backfill,

    /// Record feedback on a generated answer
    Feedback {
        /// Question the feedback is about
        #[arg(long)]
        question_id: String,

        /// Whether the answer was helpful
        #[arg(long, action = clap::ArgAction::Set)]
        helpful: bool,

        /// Free-form comment stored with the feedback
        #[arg(long)]
        comment: Option<String>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Call transcription CLI starting...");

    let config = Config::load(&cli.config)?;
    log::info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Submit { user, call_ids } => {
            config.validate()?;
            let clients = AwsClients::from_env(config.search.clone()).await?;
            let request = OnRequest {
                user: User { email: user },
                credentials: clients.ambient_credentials().await?,
                body: json!(call_ids),
            };

            let accepted =
                pipeline::run_on_request(&clients, &config.search, &config.on_request, request)
                    .await?;

            log::info!("Job {} accepted", accepted.job_id);
            log::info!(
                "{} calls recorded, {} events published",
                accepted.call_ids.len(),
                accepted.published
            );
            println!("{}", accepted.job_id);
        }

        Command::Backfill => {
            let search = call_transcription::models::SearchConfig {
                index: config.backfill.call_details_index.clone(),
                ..config.search.clone()
            };
            search.validate()?;
            let clients = AwsClients::from_env(search).await?;

            let summary = pipeline::run_backfill(&clients, &config.backfill).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Command::Feedback {
            question_id,
            helpful,
            comment,
        } => {
            let clients = AwsClients::from_env(config.search.clone()).await?;
            let mut feedback = json!({ "helpful": helpful });
            if let Some(comment) = comment {
                feedback["comment"] = json!(comment);
            }

            let body = pipeline::run_feedback(
                &clients,
                &config.feedback,
                Some(&question_id),
                &json!({ "feedback": feedback }),
            )
            .await?;
            println!("{}", body["message"].as_str().unwrap_or_default());
        }

        Command::Validate => {
            config.validate()?;
            log::info!("Configuration is valid");
            log::info!("  Search host: {}", config.search.host);
            log::info!("  Call index: {}", config.search.index);
            log::info!("  Status table: {}", config.on_request.status_table);
            log::info!("  Queue: {}", config.on_request.sqs_queue_url);
        }
    }

    Ok(())
}
