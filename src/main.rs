//! Binary entry point for folio.
//!
//! Admin CLI over the content collections kept in the remote store.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Args, Parser, Subcommand};
use folio_sync::config::FolioConfig;
use folio_sync::models::{
    PortfolioItem, PortfolioItemPatch, Profile, ProjectType, RecordId, VisitContext,
    WorkExperience, WorkExperiencePatch,
};
use folio_sync::observability;
use folio_sync::services::{ContentService, HttpGeoLocator, MigrationOutcome, VisitOutcome};
use folio_sync::storage::{FileLocalStore, RestStore};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

type Service = ContentService<RestStore, FileLocalStore, HttpGeoLocator>;
type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Folio - manage portfolio content in the remote store.
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "FOLIO_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Manage portfolio items.
    Portfolio {
        #[command(subcommand)]
        action: PortfolioAction,
    },

    /// Manage work experience entries.
    Experience {
        #[command(subcommand)]
        action: ExperienceAction,
    },

    /// Show or replace the profile.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Move legacy local portfolio items into the store.
    Migrate,

    /// Record a visit.
    Visit {
        /// Path of the viewed page.
        #[arg(long, default_value = "/")]
        path: String,

        /// User agent to log.
        #[arg(long, default_value = concat!("folio-cli/", env!("CARGO_PKG_VERSION")))]
        user_agent: String,
    },

    /// Show visit statistics.
    Stats {
        /// Include the visit log.
        #[arg(long)]
        logs: bool,
    },
}

/// Portfolio subcommands.
#[derive(Subcommand)]
enum PortfolioAction {
    /// List items, migrating legacy data first.
    List,
    /// Add an item.
    Add(PortfolioFields),
    /// Update fields of an item.
    Update {
        /// Item id.
        id: String,
        #[command(flatten)]
        fields: PortfolioPatchFields,
    },
    /// Delete an item.
    Delete {
        /// Item id.
        id: String,
    },
}

/// Fields for a new portfolio item.
#[derive(Args)]
struct PortfolioFields {
    /// Project title.
    #[arg(long)]
    title: String,

    /// Project description.
    #[arg(long, default_value = "")]
    description: String,

    /// Project type: web or mobile.
    #[arg(long = "type", value_parser = parse_project_type)]
    project_type: ProjectType,

    /// Technology tags (comma-separated, order kept).
    #[arg(long, value_delimiter = ',')]
    tech: Vec<String>,

    /// Image reference.
    #[arg(long)]
    image: Option<String>,

    /// Source repository URL.
    #[arg(long)]
    github_url: Option<String>,

    /// Live deployment URL.
    #[arg(long)]
    live_url: Option<String>,
}

/// Optional fields for a portfolio update.
#[derive(Args)]
struct PortfolioPatchFields {
    /// New title.
    #[arg(long)]
    title: Option<String>,

    /// New description.
    #[arg(long)]
    description: Option<String>,

    /// New project type.
    #[arg(long = "type", value_parser = parse_project_type)]
    project_type: Option<ProjectType>,

    /// Replacement technology tags (comma-separated).
    #[arg(long, value_delimiter = ',')]
    tech: Option<Vec<String>>,

    /// New image reference.
    #[arg(long)]
    image: Option<String>,

    /// New source repository URL.
    #[arg(long)]
    github_url: Option<String>,

    /// New live deployment URL.
    #[arg(long)]
    live_url: Option<String>,
}

/// Experience subcommands.
#[derive(Subcommand)]
enum ExperienceAction {
    /// List entries.
    List,
    /// Add an entry.
    Add {
        /// Employer name.
        #[arg(long)]
        company: String,
        /// Role held.
        #[arg(long)]
        role: String,
        /// Period label, e.g. "2021 - Present".
        #[arg(long, default_value = "")]
        period: String,
        /// Description.
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Update fields of an entry.
    Update {
        /// Entry id.
        id: String,
        /// New employer name.
        #[arg(long)]
        company: Option<String>,
        /// New role.
        #[arg(long)]
        role: Option<String>,
        /// New period label.
        #[arg(long)]
        period: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete an entry.
    Delete {
        /// Entry id.
        id: String,
    },
}

/// Profile subcommands.
#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile.
    Show,
    /// Replace the profile.
    Set {
        /// Logo reference.
        #[arg(long)]
        logo: Option<String>,
        /// Biography text.
        #[arg(long)]
        bio: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default location.
fn load_config(path: Option<&std::path::Path>) -> folio_sync::Result<FolioConfig> {
    match path {
        Some(path) => FolioConfig::load_from_file(path),
        None => Ok(FolioConfig::load_default()),
    }
}

fn build_service(config: &FolioConfig) -> folio_sync::Result<Service> {
    let store = Arc::new(RestStore::new(&config.store)?);
    let local = Arc::new(FileLocalStore::new(config.legacy.dir.clone()));
    let locator = Arc::new(HttpGeoLocator::new(&config.geolocation)?);
    tracing::debug!(
        store = store.base_url(),
        legacy_dir = %local.base_path().display(),
        geolocation = locator.endpoint(),
        "Built content service"
    );
    Ok(ContentService::new(store, local, locator, config))
}

/// Runs the selected command.
async fn run_command(cli: Cli, config: FolioConfig) -> CliResult {
    let service = build_service(&config)?;

    match cli.command {
        Commands::Portfolio { action } => cmd_portfolio(&service, action).await,
        Commands::Experience { action } => cmd_experience(&service, action).await,
        Commands::Profile { action } => cmd_profile(&service, action).await,
        Commands::Migrate => cmd_migrate(&service).await,
        Commands::Visit { path, user_agent } => cmd_visit(&service, path, user_agent).await,
        Commands::Stats { logs } => cmd_stats(&service, logs).await,
    }
}

async fn cmd_portfolio(service: &Service, action: PortfolioAction) -> CliResult {
    match action {
        PortfolioAction::List => print_json(&service.load_portfolio().await?),
        PortfolioAction::Add(fields) => {
            let mut item = PortfolioItem::new(fields.title, fields.description, fields.project_type)
                .with_technologies(fields.tech);
            item.image = fields.image;
            item.github_url = fields.github_url;
            item.live_url = fields.live_url;
            print_json(&service.create_portfolio_item(item).await?)
        },
        PortfolioAction::Update { id, fields } => {
            let patch = PortfolioItemPatch {
                title: fields.title,
                description: fields.description,
                image: fields.image,
                technologies: fields.tech,
                project_type: fields.project_type,
                github_url: fields.github_url,
                live_url: fields.live_url,
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            service
                .update_portfolio_item(&RecordId::new(id.clone()), &patch)
                .await?;
            print_json(&json!({"updated": id}))
        },
        PortfolioAction::Delete { id } => {
            service.delete_portfolio_item(&RecordId::new(id.clone())).await?;
            print_json(&json!({"deleted": id}))
        },
    }
}

async fn cmd_experience(service: &Service, action: ExperienceAction) -> CliResult {
    match action {
        ExperienceAction::List => print_json(&service.list_work_experiences().await?),
        ExperienceAction::Add {
            company,
            role,
            period,
            description,
        } => {
            let entry = WorkExperience::new(company, role, period, description);
            print_json(&service.create_work_experience(entry).await?)
        },
        ExperienceAction::Update {
            id,
            company,
            role,
            period,
            description,
        } => {
            let patch = WorkExperiencePatch {
                company,
                role,
                period,
                description,
            };
            if patch == WorkExperiencePatch::default() {
                return Err("nothing to update".into());
            }
            service
                .update_work_experience(&RecordId::new(id.clone()), &patch)
                .await?;
            print_json(&json!({"updated": id}))
        },
        ExperienceAction::Delete { id } => {
            service.delete_work_experience(&RecordId::new(id.clone())).await?;
            print_json(&json!({"deleted": id}))
        },
    }
}

async fn cmd_profile(service: &Service, action: ProfileAction) -> CliResult {
    match action {
        ProfileAction::Show => print_json(&service.get_profile().await?),
        ProfileAction::Set { logo, bio } => {
            let profile = Profile {
                user_logo: logo,
                bio,
            };
            service.save_profile(&profile).await?;
            print_json(&profile)
        },
    }
}

async fn cmd_migrate(service: &Service) -> CliResult {
    let report = match service.migrate_legacy_data().await {
        MigrationOutcome::NoLocalData => json!({"outcome": "no_local_data"}),
        MigrationOutcome::RemoteAlreadyPopulated => json!({"outcome": "remote_already_populated"}),
        MigrationOutcome::Completed(stats) => json!({
            "outcome": "completed",
            "migrated": stats.migrated,
            "total": stats.total,
        }),
        MigrationOutcome::Incomplete(stats) => json!({
            "outcome": "incomplete",
            "migrated": stats.migrated,
            "errors": stats.errors,
            "total": stats.total,
        }),
        MigrationOutcome::Aborted(reason) => json!({"outcome": "aborted", "reason": reason}),
    };
    print_json(&report)
}

async fn cmd_visit(service: &Service, path: String, user_agent: String) -> CliResult {
    let report = match service.record_visit(&VisitContext::new(user_agent, path)).await {
        VisitOutcome::Recorded { total } => json!({"outcome": "recorded", "total": total}),
        VisitOutcome::AlreadyRecorded => json!({"outcome": "already_recorded"}),
        VisitOutcome::InProgress => json!({"outcome": "in_progress"}),
        VisitOutcome::Abandoned(reason) => json!({"outcome": "abandoned", "reason": reason}),
    };
    print_json(&report)
}

async fn cmd_stats(service: &Service, logs: bool) -> CliResult {
    let total = service.total_visits().await?;
    if logs {
        let entries = service.visit_log().await?;
        print_json(&json!({"total_visitors": total, "visit_logs": entries}))
    } else {
        print_json(&json!({"total_visitors": total}))
    }
}

fn parse_project_type(s: &str) -> Result<ProjectType, String> {
    ProjectType::parse(s)
        .ok_or_else(|| format!("unknown project type '{s}' (expected web or mobile)"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
