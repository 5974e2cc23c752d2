use std::sync::Arc;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use momentum_api::admin;
use momentum_api::auth::Hs256Verifier;
use momentum_api::config::Config;
use momentum_api::handlers;
use momentum_api::state::AppState;
use momentum_api::store::{create_pool, DocumentStore, MemoryStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "momentum-api")]
#[command(about = "Backend for the Momentum routine app: identity, sync, billing webhooks")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wipe a user's payment docs and clear their profile paymentOption
    ResetPayments {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        uid: Option<String>,
        /// Also delete the user's recorded webhook events
        #[arg(long)]
        clear_webhook_events: bool,
        /// Print what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete all runtime data under users/{uid}, keeping identity aliases
    ResetOnboarding {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        uid: Option<String>,
        /// Print what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete just the profile document
    ResetProfile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        uid: Option<String>,
        /// Print what would change without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a user's payment state and recorded webhook events
    CheckPayments {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        uid: Option<String>,
    },
    /// Copy profile paymentOption into subscription docs that lack one
    BackfillPaymentOption {
        #[arg(long)]
        uid: Option<String>,
        /// Process every user with documents
        #[arg(long)]
        all: bool,
        /// Write changes (default is a dry run)
        #[arg(long)]
        apply: bool,
    },
}

fn open_store(config: &Config) -> SqliteStore {
    let pool = create_pool(&config.database_path).expect("Failed to create database pool");
    SqliteStore::new(pool).expect("Failed to initialize database")
}

fn run_admin(command: Command, config: &Config) {
    let store = open_store(config);
    let result = match command {
        Command::ResetPayments {
            email,
            uid,
            clear_webhook_events,
            dry_run,
        } => admin::resolve_uid(&store, email.as_deref(), uid.as_deref()).and_then(|uid| {
            admin::reset_payments(&store, &uid, clear_webhook_events, dry_run)
        }),
        Command::ResetOnboarding { email, uid, dry_run } => {
            admin::resolve_uid(&store, email.as_deref(), uid.as_deref())
                .and_then(|uid| admin::reset_onboarding(&store, &uid, dry_run))
        }
        Command::ResetProfile { email, uid, dry_run } => {
            admin::resolve_uid(&store, email.as_deref(), uid.as_deref())
                .and_then(|uid| admin::reset_profile(&store, &uid, dry_run))
        }
        Command::CheckPayments { email, uid } => {
            admin::resolve_uid(&store, email.as_deref(), uid.as_deref())
                .and_then(|uid| admin::check_payments(&store, &uid))
        }
        Command::BackfillPaymentOption { uid, all, apply } => {
            admin::backfill_payment_option(&store, uid.as_deref(), all, apply)
        }
    };
    if let Err(e) = result {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "momentum_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if let Some(command) = cli.command {
        run_admin(command, &config);
        return;
    }

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.allow_dev_user_header {
        tracing::warn!("X-User-Id dev header auth is ENABLED");
    }
    if config.revenuecat_webhook_token.is_empty() {
        tracing::warn!("REVENUECAT_WEBHOOK_TOKEN is not set; webhook calls will be rejected");
    }

    let ephemeral = cli.ephemeral && config.dev_mode;
    let store: Arc<dyn DocumentStore> = if ephemeral {
        tracing::info!("EPHEMERAL MODE: using in-memory store, nothing is persisted");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(open_store(&config))
    };

    let state = AppState {
        store,
        verifier: Arc::new(Hs256Verifier::new(&config.auth_token_secret)),
        revenuecat_webhook_token: config.revenuecat_webhook_token.clone(),
        allow_dev_user_header: config.allow_dev_user_header,
    };

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Momentum API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
