//! CredVault CLI - Command line interface for the credential vault.
//!
//! This tool provides a command-line interface for registering accounts
//! and storing, reading, and removing encrypted credentials in a local
//! SQLite database.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use credvault_common::{OwnerId, RecordId};
use credvault_crypto::{KdfParams, MasterSecret};
use credvault_storage::SqliteStore;
use credvault_vault::{PlaintextRecord, VaultConfig, VaultService};

#[derive(Parser)]
#[command(name = "credvault")]
#[command(about = "CredVault - Encrypted credential storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the SQLite database.
    #[arg(long, default_value = "credvault.db")]
    db: PathBuf,

    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account.
    Register {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,

        /// KDF strength: "interactive", "moderate", or "sensitive".
        /// Defaults to the configured parameters.
        #[arg(short, long)]
        strength: Option<String>,
    },

    /// Add a credential.
    Add {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,

        /// Site name.
        #[arg(short, long)]
        site: String,

        /// Site URL.
        #[arg(long)]
        url: Option<String>,

        /// Login username.
        #[arg(short, long, default_value = "")]
        username: String,

        /// Free-form notes.
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// List all credentials of an account.
    List {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,
    },

    /// Show one credential, including its password.
    Show {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,

        /// Record identifier.
        #[arg(short, long)]
        id: String,
    },

    /// Replace a credential.
    Update {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,

        /// Record identifier.
        #[arg(short, long)]
        id: String,

        /// Site name.
        #[arg(short, long)]
        site: String,

        /// Site URL.
        #[arg(long)]
        url: Option<String>,

        /// Login username.
        #[arg(short, long, default_value = "")]
        username: String,

        /// Free-form notes.
        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// Delete a credential.
    Delete {
        /// Account identifier.
        #[arg(short, long)]
        owner: String,

        /// Record identifier.
        #[arg(short, long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Register { owner, strength } => {
            if let Some(strength) = strength {
                config.kdf_params = parse_strength(&strength)?;
            }
            let service = open_service(&cli.db, config)?;
            cmd_register(&service, &owner).await
        }

        Commands::Add {
            owner,
            site,
            url,
            username,
            notes,
        } => {
            let service = open_service(&cli.db, config)?;
            cmd_add(&service, &owner, site, url, username, notes).await
        }

        Commands::List { owner } => {
            let service = open_service(&cli.db, config)?;
            cmd_list(&service, &owner).await
        }

        Commands::Show { owner, id } => {
            let service = open_service(&cli.db, config)?;
            cmd_show(&service, &owner, &id).await
        }

        Commands::Update {
            owner,
            id,
            site,
            url,
            username,
            notes,
        } => {
            let service = open_service(&cli.db, config)?;
            cmd_update(&service, &owner, &id, site, url, username, notes).await
        }

        Commands::Delete { owner, id } => {
            let service = open_service(&cli.db, config)?;
            cmd_delete(&service, &owner, &id).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<VaultConfig> {
    match path {
        Some(path) => VaultConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(VaultConfig::default()),
    }
}

fn parse_strength(strength: &str) -> Result<KdfParams> {
    match strength {
        "interactive" => Ok(KdfParams::interactive()),
        "moderate" => Ok(KdfParams::moderate()),
        "sensitive" => Ok(KdfParams::sensitive()),
        _ => anyhow::bail!("Invalid strength. Use: interactive, moderate, or sensitive"),
    }
}

fn open_service(db: &Path, config: VaultConfig) -> Result<VaultService> {
    let store = SqliteStore::open(db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    VaultService::with_store(config, Arc::new(store)).context("Invalid vault configuration")
}

/// Prompt for a secret without echoing it.
fn prompt_secret(prompt: &str) -> Result<MasterSecret> {
    let secret = rpassword::prompt_password(prompt).context("Failed to read secret")?;
    Ok(MasterSecret::new(secret))
}

fn build_record(
    site: String,
    url: Option<String>,
    username: String,
    notes: String,
) -> Result<PlaintextRecord> {
    let password = rpassword::prompt_password("Site password: ")
        .context("Failed to read site password")?;

    let mut record = PlaintextRecord::new(site, username, password).with_notes(notes);
    if let Some(url) = url {
        record = record.with_url(url);
    }
    Ok(record)
}

/// Register a new account.
async fn cmd_register(service: &VaultService, owner: &str) -> Result<()> {
    info!("Registering account: {}", owner);
    let owner = OwnerId::new(owner).context("Invalid owner")?;

    let secret = prompt_secret("Enter master secret: ")?;
    let confirm = prompt_secret("Confirm master secret: ")?;

    if secret.as_bytes() != confirm.as_bytes() {
        anyhow::bail!("Master secrets do not match");
    }

    service
        .register(&owner, secret)
        .await
        .context("Failed to register account")?;

    println!("Account registered: {}", owner);

    Ok(())
}

/// Add a credential.
async fn cmd_add(
    service: &VaultService,
    owner: &str,
    site: String,
    url: Option<String>,
    username: String,
    notes: String,
) -> Result<()> {
    let owner = OwnerId::new(owner).context("Invalid owner")?;
    let record = build_record(site, url, username, notes)?;
    let secret = prompt_secret("Enter master secret: ")?;

    let id = service
        .create_secret(&owner, record, secret)
        .await
        .context("Failed to add credential")?;

    println!("Credential added: {}", id);

    Ok(())
}

/// List credentials.
async fn cmd_list(service: &VaultService, owner: &str) -> Result<()> {
    let owner = OwnerId::new(owner).context("Invalid owner")?;
    let secret = prompt_secret("Enter master secret: ")?;

    let entries = service
        .list_secrets(&owner, secret)
        .await
        .context("Failed to list credentials")?;

    if entries.is_empty() {
        println!("Vault is empty.");
    } else {
        println!("Credentials of {}:", owner);
        for entry in entries {
            let url = entry.record.site_url.as_deref().unwrap_or("-");
            println!(
                "  {}  {} ({})  user: {}",
                entry.id,
                entry.record.site_name,
                url,
                entry.record.username.as_str()
            );
        }
    }

    Ok(())
}

/// Show one credential.
async fn cmd_show(service: &VaultService, owner: &str, id: &str) -> Result<()> {
    let owner = OwnerId::new(owner).context("Invalid owner")?;
    let id = RecordId::new(id).context("Invalid record id")?;
    let secret = prompt_secret("Enter master secret: ")?;

    let entry = service
        .get_secret(&id, &owner, secret)
        .await
        .context("Failed to read credential")?;

    println!("Credential {}:", entry.id);
    println!("  Site: {}", entry.record.site_name);
    if let Some(url) = &entry.record.site_url {
        println!("  URL: {}", url);
    }
    println!("  Username: {}", entry.record.username.as_str());
    println!("  Password: {}", entry.record.password.as_str());
    if !entry.record.notes.is_empty() {
        println!("  Notes: {}", entry.record.notes.as_str());
    }
    println!("  Created: {}", entry.created_at);
    println!("  Modified: {}", entry.updated_at);

    Ok(())
}

/// Replace a credential.
async fn cmd_update(
    service: &VaultService,
    owner: &str,
    id: &str,
    site: String,
    url: Option<String>,
    username: String,
    notes: String,
) -> Result<()> {
    info!("Updating credential: {}", id);
    let owner = OwnerId::new(owner).context("Invalid owner")?;
    let id = RecordId::new(id).context("Invalid record id")?;
    let record = build_record(site, url, username, notes)?;
    let secret = prompt_secret("Enter master secret: ")?;

    service
        .update_secret(&id, &owner, record, secret)
        .await
        .context("Failed to update credential")?;

    println!("Credential updated: {}", id);

    Ok(())
}

/// Delete a credential.
async fn cmd_delete(service: &VaultService, owner: &str, id: &str) -> Result<()> {
    info!("Removing credential: {}", id);
    let owner = OwnerId::new(owner).context("Invalid owner")?;
    let id = RecordId::new(id).context("Invalid record id")?;

    service
        .delete_secret(&id, &owner)
        .await
        .context("Failed to delete credential")?;

    println!("Credential removed: {}", id);

    Ok(())
}
