//! Shopfront CLI - drive the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! shopfront products --search laptop --sort price-low
//! shopfront categories
//!
//! # Sign in (the session is kept under SHOPFRONT_SESSION_DIR)
//! shopfront login -e ana@example.com -p secret
//! shopfront register -n Ana -e ana@example.com -p secret123 --confirm-password secret123
//! shopfront whoami
//!
//! # Place an order described in a YAML file
//! shopfront checkout --file order.yaml
//!
//! # History and admin alerts
//! shopfront orders
//! shopfront inventory
//! ```
//!
//! Ctrl+C cancels the request in flight.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_storefront::catalog::{ALL_CATEGORIES, ListingQuery, SortKey};
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::scope::FlowScope;
use shopfront_storefront::session::RegisterForm;
use shopfront_storefront::state::Storefront;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Match against name, description or category
        #[arg(short, long, default_value = "")]
        search: String,

        /// Only show this category
        #[arg(short, long, default_value = ALL_CATEGORIES)]
        category: String,

        /// Sort order (`name`, `price-low`, `price-high`)
        #[arg(long, default_value = "name")]
        sort: SortKey,
    },
    /// List product categories
    Categories,
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat the password
        #[arg(
            long,
            env = "SHOPFRONT_CONFIRM_PASSWORD",
            hide_env_values = true
        )]
        confirm_password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your orders
    Orders,
    /// Show low and out of stock products (admins only)
    Inventory,
    /// Place an order described in a YAML file
    Checkout {
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => return fail(&CliError::App(e.into())),
    };

    // Sentry must be up before the subscriber so the layer has a client
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // Returning drops the Sentry guard, which flushes captured events.
    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let mut storefront = Storefront::from_config(config)?;
    let scope = FlowScope::new("cli");
    cancel_on_ctrl_c(&scope);

    match cli.command {
        Commands::Products {
            search,
            category,
            sort,
        } => {
            let query = ListingQuery {
                search,
                category,
                sort,
            };
            commands::catalog::products(&mut storefront, &query, &scope).await?;
        }
        Commands::Categories => commands::catalog::categories(&mut storefront, &scope).await?,
        Commands::Login { email, password } => {
            commands::account::login(&mut storefront, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = RegisterForm {
                name,
                email,
                password,
                confirm_password,
            };
            commands::account::register(&mut storefront, &form).await?;
        }
        Commands::Logout => commands::account::logout(&mut storefront),
        Commands::Whoami => commands::account::whoami(&storefront),
        Commands::Orders => commands::orders::history(&mut storefront, &scope).await?,
        Commands::Inventory => commands::orders::inventory(&mut storefront, &scope).await?,
        Commands::Checkout { file } => {
            commands::checkout::run(&mut storefront, &file, &scope).await?;
        }
    }
    Ok(())
}

/// Abort the command's requests when Ctrl+C is pressed.
fn cancel_on_ctrl_c(scope: &FlowScope) {
    let handle = scope.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, cancelling");
            handle.abort();
        }
    });
}

/// Report `error` and pick the failing exit code.
#[allow(clippy::print_stderr)]
fn fail(error: &CliError) -> ExitCode {
    error.report();
    eprintln!("error: {}", error.user_message());
    ExitCode::FAILURE
}
