// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turath: heritage site recognition and account sign-up
//!
//! Command-line front end for the sign-up and capture flows, the document
//! store and the model server.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use turath::auth::{self, IdentityClient};
use turath::config::AppConfig;
use turath::db::{Database, Document};
use turath::download::{self, Downloader};
use turath::signup::{RegistrationForm, SignUpOutcome, SignUpService};
use turath::vision::{
    ClassificationOutcome, Classifier, LabelTable, MetadataEnricher, ModelSlot, ServingClient,
};
use turath::{Result, TurathError};

/// Turath CLI - heritage recognition and sign-up
#[derive(Parser, Debug)]
#[command(name = "turath")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Heritage site recognition and account sign-up", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new account
    Signup {
        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        /// Date of birth as entered on the form
        #[arg(long, default_value = "")]
        birthday: String,

        #[arg(long, default_value = "")]
        email: String,

        #[arg(long, default_value = "")]
        phone: String,

        #[arg(long, default_value = "")]
        password: String,

        /// Defaults to --password
        #[arg(long)]
        confirm_password: Option<String>,
    },

    /// Recognize the heritage site in a photo
    Classify {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,

        /// Readiness retries before giving up on the model server
        #[arg(long)]
        retries: Option<u32>,
    },

    /// List the classes the model can recognize
    Labels,

    /// Document store operations
    Db {
        #[command(subcommand)]
        action: DbCommands,
    },

    /// Download a file into the download directory
    Download {
        url: String,

        /// Local file name (default: last URL segment)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show model server, identity service and database status
    Status,
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Show database statistics
    Stats,

    /// Load documents from a JSON array file
    Import {
        /// Target collection
        collection: String,

        /// JSON file holding an array of objects
        file: PathBuf,

        /// Field to use as document id (generated when absent)
        #[arg(long)]
        id_field: Option<String>,
    },

    /// Find documents where a field equals a value
    Query {
        collection: String,
        field: String,
        value: String,
    },

    /// Vacuum database (reclaim space)
    Vacuum,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("Turath v1.0.0");
    }

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Signup { first_name, last_name, birthday, email, phone, password, confirm_password }) => {
            let form = RegistrationForm {
                first_name,
                last_name,
                birthday,
                email,
                phone_number: phone,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
            };
            run_signup(config, form, &cli.format).await
        }
        Some(Commands::Classify { image, retries }) => {
            run_classify(config, &image, retries, &cli.format).await
        }
        Some(Commands::Labels) => run_labels(config, &cli.format),
        Some(Commands::Db { action }) => run_db_command(config, action, &cli.format),
        Some(Commands::Download { url, name }) => run_download(config, &url, name).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        Some(Commands::Status) | None => run_status(config).await,
    }
}

/// Submit one registration
async fn run_signup(config: AppConfig, form: RegistrationForm, format: &str) -> Result<()> {
    let db = Database::open(&config.database.path)?;
    let auth = Arc::new(IdentityClient::new(&config.auth)?);
    let service = SignUpService::new(auth, Arc::new(db), config.database.users_collection.clone());

    let outcome = service.submit(&form).await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        SignUpOutcome::Registered { account_id } => println!("Registered account {}", account_id),
        SignUpOutcome::Rejected { errors } => {
            println!("Sign-up rejected:");
            for (field, issue) in errors.iter() {
                println!("  {:?}: {}", field, issue.message);
            }
        }
        SignUpOutcome::Failed { message } => println!("Sign-up failed: {}", message),
        SignUpOutcome::Busy => println!("A sign-up is already in progress"),
    }
    Ok(())
}

/// Classify one image file against the model server
async fn run_classify(config: AppConfig, image: &Path, retries: Option<u32>, format: &str) -> Result<()> {
    let payload = std::fs::read(image)?;
    let db = Database::open(&config.database.path)?;
    let labels = Arc::new(LabelTable::from_config(config.model.labels_path.as_deref())?);

    let mut model_config = config.model.clone();
    if let Some(retries) = retries {
        model_config.retries = retries;
    }

    let slot = Arc::new(ModelSlot::new());
    match ServingClient::connect(&model_config).await {
        Ok(client) => {
            slot.install(Arc::new(client));
        }
        Err(e) => warn!("{}", describe_error(&e)),
    }

    let enricher = MetadataEnricher::new(Arc::new(db), config.database.heritage_collection.clone());
    let classifier = Classifier::new(slot, labels, enricher, &config.model);
    let outcome = classifier.classify(&payload).await;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_classification(image, &outcome);
    }
    Ok(())
}

fn describe_error(e: &TurathError) -> String {
    match e {
        TurathError::ModelNotReady(detail) => format!("Model not loaded: {}", detail),
        other => other.to_string(),
    }
}

fn print_classification(image: &Path, outcome: &ClassificationOutcome) {
    println!("{}: {}", image.display(), outcome.message);
    if let Some(prediction) = &outcome.prediction {
        println!("  Confidence: {:.1}%", prediction.confidence * 100.0);
    }
    if let Some(info) = &outcome.additional_info {
        println!("  {}", info);
    }
    for record in &outcome.records {
        if let Some(url) = &record.image {
            println!("  Image: {}", url);
        }
    }
}

fn run_labels(config: AppConfig, format: &str) -> Result<()> {
    let labels = LabelTable::from_config(config.model.labels_path.as_deref())?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&labels)?);
        return Ok(());
    }

    println!("Label table {} ({} classes):", labels.version, labels.len());
    for (i, label) in labels.labels.iter().enumerate() {
        println!("  {:>3} {}", i, label);
    }
    Ok(())
}

/// Run database commands
fn run_db_command(config: AppConfig, action: DbCommands, format: &str) -> Result<()> {
    let db = Database::open(&config.database.path)?;

    match action {
        DbCommands::Stats => {
            let stats = db.get_stats()?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Database Statistics:");
                println!("  Documents: {}", stats.document_count);
                for collection in stats.collections {
                    println!("  {}: {}", collection.name, collection.document_count);
                }
            }
        }
        DbCommands::Import { collection, file, id_field } => {
            let content = std::fs::read_to_string(&file)?;
            let documents: Vec<Document> = serde_json::from_str(&content)?;
            let count = db.import_documents(&collection, id_field.as_deref().unwrap_or(""), &documents)?;
            println!("Imported {} documents into '{}'", count, collection);
        }
        DbCommands::Query { collection, field, value } => {
            let documents = db.find_by_field(&collection, &field, &value)?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&documents)?);
            } else {
                println!("{} matches for {} == '{}':", documents.len(), field, value);
                for document in documents {
                    println!("  {}", serde_json::Value::Object(document));
                }
            }
        }
        DbCommands::Vacuum => {
            db.vacuum()?;
            println!("Database vacuumed successfully");
        }
    }

    Ok(())
}

async fn run_download(config: AppConfig, url: &str, name: Option<String>) -> Result<()> {
    let file_name = name
        .or_else(|| download::file_name_from_url(url))
        .ok_or_else(|| TurathError::Download(format!("Cannot derive a file name from {}", url)))?;

    let downloader = Downloader::new(&config.download)?;
    let path = downloader.download(url, &file_name, |_| {}).await?;
    println!("{}", path.display());
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Model server: {} ({})", config.model.url, config.model.name);
            println!("  Threshold: {}", config.model.threshold);
            println!("  Database: {}", config.database.path);
        }
    }
    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("Turath v1.0.0 Status");
    println!("====================");

    match ServingClient::new(&config.model)?.status().await {
        Ok(versions) => {
            println!("Model server ({}):", config.model.url);
            for v in versions {
                println!("  {} version {}: {}", config.model.name, v.version, v.state);
            }
        }
        Err(e) => println!("Model server: Error - {}", describe_error(&e)),
    }

    match auth::health_check(&config.auth).await {
        Ok(()) => println!("Identity service: Reachable"),
        Err(e) => println!("Identity service: Error - {}", e),
    }

    match Database::open(&config.database.path) {
        Ok(db) => {
            let stats = db.get_stats()?;
            println!("\nDatabase ({}):", config.database.path);
            println!("  Documents: {}", stats.document_count);
            for collection in stats.collections {
                println!("  {}: {}", collection.name, collection.document_count);
            }
        }
        Err(e) => println!("\nDatabase: Error - {}", e),
    }

    let labels = LabelTable::from_config(config.model.labels_path.as_deref())?;
    println!("\nConfiguration:");
    println!("  Labels: {} ({} classes)", labels.version, labels.len());
    println!("  Threshold: {}", config.model.threshold);
    println!("  Input size: {}", config.model.input_size);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["turath"]).unwrap();
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_signup_confirm_defaults_to_none() {
        let cli = Cli::try_parse_from([
            "turath", "signup", "--email", "a@b.com", "--password", "Abcdef1!"
        ]).unwrap();

        match cli.command {
            Some(Commands::Signup { email, password, confirm_password, .. }) => {
                assert_eq!(email, "a@b.com");
                assert_eq!(password, "Abcdef1!");
                assert!(confirm_password.is_none());
            }
            _ => panic!("Expected Signup command"),
        }
    }

    #[test]
    fn test_cli_classify_command() {
        let cli = Cli::try_parse_from([
            "turath", "--format", "json", "classify", "/tmp/photo.jpg", "--retries", "0"
        ]).unwrap();

        assert_eq!(cli.format, "json");
        match cli.command {
            Some(Commands::Classify { image, retries }) => {
                assert_eq!(image, PathBuf::from("/tmp/photo.jpg"));
                assert_eq!(retries, Some(0));
            }
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["turath", "--format", "jsonl", "labels"]).is_err());
    }

    #[test]
    fn test_cli_db_import() {
        let cli = Cli::try_parse_from([
            "turath", "db", "import", "model", "heritage.json"
        ]).unwrap();

        match cli.command {
            Some(Commands::Db { action: DbCommands::Import { collection, file, id_field } }) => {
                assert_eq!(collection, "model");
                assert_eq!(file, PathBuf::from("heritage.json"));
                assert!(id_field.is_none());
            }
            _ => panic!("Expected Db Import command"),
        }
    }
}
