use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vialog::auth::{
    DEFAULT_SESSION_TTL_HOURS, PasswordHasher, TokenService, generate_password,
    validate_password_strength,
};
use vialog::config::{DEFAULT_PUBLIC_BASE_URL, INVITE_SECRET_ENV, SESSION_SECRET_ENV, Secrets, ServerConfig, secrets_path};
use vialog::media::VideoStorage;
use vialog::notify::{DEFAULT_SEND_TIMEOUT, Notifier, SmtpConfig, SmtpMailer};
use vialog::server::{AppState, create_router};
use vialog::service::validation::validate_email;
use vialog::store::{SqliteStore, Store};
use vialog::types::{User, UserRole};

const DEFAULT_ADMIN_EMAIL: &str = "admin@vialog.local";

#[derive(Parser)]
#[command(name = "vialog")]
#[command(about = "A collaborative video annotation server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database, secrets and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Public base URL of the web front end (e.g., "https://annotate.example.org").
        /// Invitation links point here.
        #[arg(long, env = "PUBLIC_BASE_URL", default_value = DEFAULT_PUBLIC_BASE_URL)]
        public_base_url: String,

        /// Lifetime of session tokens, in hours
        #[arg(long, default_value_t = DEFAULT_SESSION_TTL_HOURS)]
        session_ttl_hours: i64,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database, secrets and admin account)
    Init {
        /// Data directory for the database, secrets and uploads
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the admin account
        #[arg(long)]
        admin_email: Option<String>,

        /// Password of the admin account (prompted if omitted)
        #[arg(long)]
        admin_password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },
}

struct InitOptions {
    data_dir: PathBuf,
    admin_email: Option<String>,
    admin_password: Option<String>,
    non_interactive: bool,
}

fn run_init(opts: InitOptions) -> anyhow::Result<()> {
    fs::create_dir_all(&opts.data_dir)?;

    let db_path = opts.data_dir.join("vialog.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let secrets_file = secrets_path(&opts.data_dir);

    if secrets_file.exists() && store.has_admin_user()? {
        bail!(
            "Server already initialized. Secrets exist at: {}",
            secrets_file.display()
        );
    }

    if !secrets_file.exists() {
        Secrets::generate().save(&secrets_file)?;
        info!("Wrote signing secrets to {}", secrets_file.display());
    }

    if store.has_admin_user()? {
        return Ok(());
    }

    let email = match opts.admin_email {
        Some(email) => email,
        None if opts.non_interactive => DEFAULT_ADMIN_EMAIL.to_string(),
        None => inquire::Text::new("Admin email:")
            .with_default(DEFAULT_ADMIN_EMAIL)
            .with_validator(|input: &str| match validate_email(input.trim()) {
                Ok(()) => Ok(inquire::validator::Validation::Valid),
                Err(e) => Ok(inquire::validator::Validation::Invalid(e.to_string().into())),
            })
            .prompt()?,
    };
    let email = email.trim().to_string();
    validate_email(&email)?;

    let (password, generated) = match opts.admin_password {
        Some(password) => (password, false),
        None if opts.non_interactive => (generate_password(), true),
        None => (
            inquire::Password::new("Admin password:")
                .with_validator(|input: &str| match validate_password_strength(input) {
                    Ok(()) => Ok(inquire::validator::Validation::Valid),
                    Err(e) => Ok(inquire::validator::Validation::Invalid(e.to_string().into())),
                })
                .prompt()?,
            false,
        ),
    };
    validate_password_strength(&password)?;

    let hasher = PasswordHasher::new();
    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        password_hash: Some(hasher.hash(&password)?),
        role: UserRole::Admin,
        display_name: Some("Administrator".to_string()),
        invited: false,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&admin)?;

    println!();
    println!("========================================");
    println!("Admin account: {email}");
    if generated {
        println!("Generated password (save this, it won't be shown again):");
        println!();
        println!("  {password}");
        println!();
    }
    println!("Secrets written to: {}", secrets_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn load_secrets(config: &ServerConfig) -> anyhow::Result<Secrets> {
    let path = config.secrets_path();

    let secrets = if path.exists() {
        Secrets::load(&path)?.with_env_overrides()
    } else {
        match (
            std::env::var(SESSION_SECRET_ENV).ok().filter(|s| !s.is_empty()),
            std::env::var(INVITE_SECRET_ENV).ok().filter(|s| !s.is_empty()),
        ) {
            (Some(session_secret), Some(invitation_secret)) => Secrets {
                session_secret,
                invitation_secret,
            },
            _ => bail!(
                "Server not initialized. Run 'vialog admin init' first, or set {SESSION_SECRET_ENV} and {INVITE_SECRET_ENV}."
            ),
        }
    };

    Ok(secrets)
}

fn build_notifier() -> Notifier {
    let Some(config) = SmtpConfig::from_env() else {
        info!("SMTP_HOST not set, email notifications disabled");
        return Notifier::disabled();
    };

    match SmtpMailer::new(&config) {
        Ok(mailer) => {
            info!("Email notifications via {}:{}", config.host, config.port);
            Notifier::new(Some(Arc::new(mailer)), DEFAULT_SEND_TIMEOUT)
        }
        Err(e) => {
            warn!("Invalid SMTP configuration, email notifications disabled: {e}");
            Notifier::disabled()
        }
    }
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let secrets = load_secrets(&config)?;
    let tokens = TokenService::new(
        &secrets.session_secret,
        &secrets.invitation_secret,
        config.session_ttl(),
    )
    .context("Invalid token configuration")?;

    fs::create_dir_all(&config.data_dir)?;
    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    if !store.has_admin_user()? {
        warn!("No admin account exists. Run 'vialog admin init' to create one.");
    }

    let state = Arc::new(AppState {
        store: Arc::new(store),
        storage: VideoStorage::new(&config.data_dir),
        data_dir: config.data_dir.clone(),
        public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        tokens,
        passwords: PasswordHasher::new(),
        notifier: build_notifier(),
    });

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vialog=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                admin_email,
                admin_password,
                non_interactive,
            } => {
                run_init(InitOptions {
                    data_dir: data_dir.into(),
                    admin_email,
                    admin_password,
                    non_interactive,
                })?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
            session_ttl_hours,
        } => {
            run_serve(ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
                public_base_url,
                session_ttl_hours,
            })
            .await?;
        }
    }

    Ok(())
}
