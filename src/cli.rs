///
/// This module implements the CLI interface for outfit-rules: command parsing,
/// argument exposure and the async entrypoint shared by `main` and the tests.
///
/// All rule handling and the upload loop live in the [`outfit-rules-core`]
/// crate. This module only wires configuration, credentials and the
/// Firestore client into it.
///
/// ## How To Use
/// - For command-line users: run the installed `outfit-rules` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`outfit-rules-core`]: ../../outfit-rules-core/
use crate::firestore::FirestoreClient;
use crate::load_config::{load_config, ConfigOverrides};
use anyhow::Result;
use clap::{Parser, Subcommand};
use outfit_rules_core::collection::CollectionId;
use outfit_rules_core::contract::DocumentStore;
use outfit_rules_core::output::write_completion_banner;
use outfit_rules_core::rule::{load_rules, Rule};
use outfit_rules_core::upload::{preview_rules, upload_rules, ErrorPolicy};
use std::io::Write;
use std::path::PathBuf;

/// CLI for outfit-rules: publish outfit recommendation rules to Firestore.
#[derive(Parser)]
#[clap(
    name = "outfit-rules",
    version,
    about = "Upload outfit recommendation rules from a JSON file into a Firestore collection"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add every rule in the rule file as a new document in the collection
    Upload {
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,

        /// Service-account key file
        #[clap(long)]
        credentials: Option<PathBuf>,

        /// Target collection id
        #[clap(long)]
        collection: Option<String>,

        /// JSON file holding an array of rule objects
        #[clap(long)]
        rules: Option<PathBuf>,

        /// Project id, when it differs from the one in the key
        #[clap(long)]
        project_id: Option<String>,

        /// Keep going after a failed rule and report all failures at the end
        #[clap(long)]
        continue_on_error: bool,

        /// Check the rule file and print what would be added, without connecting
        #[clap(long)]
        dry_run: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Upload {
            config,
            credentials,
            collection,
            rules,
            project_id,
            continue_on_error,
            dry_run,
        } => {
            let overrides = ConfigOverrides {
                credentials,
                collection,
                rules,
                project_id,
                continue_on_error,
            };
            let config = load_config(config.as_deref(), overrides)?;
            let rule_set = load_rules(&config.rules)?;
            let mut out = std::io::stdout();

            if dry_run {
                tracing::info!(command = "upload", dry_run = true, "Previewing rule upload");
                let count = preview_rules(&rule_set, &mut out)?;
                writeln!(
                    out,
                    "Dry run: {count} rules would be added to '{}'",
                    config.collection
                )?;
                return Ok(());
            }

            tracing::info!(command = "upload", "Starting rule upload");
            let client = FirestoreClient::connect(&config).await?;
            upload_and_report(&client, &config.collection, &rule_set, config.policy, &mut out).await
        }
    }
}

/// Runs the upload loop and prints the completion banner on full success.
/// Any failure is printed to stderr and returned as an error.
pub async fn upload_and_report<S, W>(
    store: &S,
    collection: &CollectionId,
    rules: &[Rule],
    policy: ErrorPolicy,
    out: &mut W,
) -> Result<()>
where
    S: DocumentStore + ?Sized,
    W: Write,
{
    match upload_rules(store, collection, rules, policy, out).await {
        Ok(report) if report.is_complete() => {
            write_completion_banner(out)?;
            tracing::info!(
                command = "upload",
                inserted = report.inserted.len(),
                "Upload complete"
            );
            Ok(())
        }
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("[ERROR] Rule {}: {}", failure.index, failure.message);
            }
            tracing::error!(
                command = "upload",
                inserted = report.inserted.len(),
                failed = report.failures.len(),
                "Upload finished with failures"
            );
            anyhow::bail!(
                "{} of {} rules failed to upload",
                report.failures.len(),
                report.attempted
            )
        }
        Err(e) => {
            tracing::error!(command = "upload", error = %e, "Upload aborted");
            Err(anyhow::Error::new(e))
        }
    }
}
