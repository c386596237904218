//! tradedesk - command-line access to the trading dashboard session.
//!
//! Inspects and manages the session the dashboard persists: credential
//! login, completing an OAuth redirect by hand, logout, and watching a
//! session until it expires.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tradedesk_core::auth::{
    CallbackEnv, CallbackOutcome, Navigator, Notification, NotificationLevel, Notifier, Route,
};
use tradedesk_core::utils::{format_expiry, format_remaining, format_roles, mask_token};
use tradedesk_core::{
    ApiClient, AuthProvider, CallbackPage, CallbackParams, Config, SessionStore, Url,
};

/// Environment variable read before prompting for a password
const PASSWORD_ENV: &str = "TRADEDESK_PASSWORD";

#[derive(Parser)]
#[command(name = "tradedesk", version, about = "Manage the trading dashboard session")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the stored session
    Status,
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Complete an OAuth redirect, e.g. a copied callback URL
    Callback { url: String },
    /// Log out locally and on the server
    Logout,
    /// Keep checking the session until it expires
    Watch,
    /// Print the login popup URL for an identity provider
    ProviderUrl { provider: String },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Prints notifications the way the dashboard would toast them.
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        let label = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Success => "ok",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{}] {}", label, notification.message);
    }
}

struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &Route) {
        println!("-> {}", route.path());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load().context("Failed to load config")?;
    info!(api = %config.api_base_url, storage = ?config.storage, "tradedesk starting");

    match cli.command {
        Command::Status => status(&config),
        Command::ProviderUrl { provider } => {
            let api = ApiClient::new(&config.api_base_url)?;
            println!("{}", api.provider_url(&provider)?);
            Ok(())
        }
        Command::Login { email } => login(&mut config, email).await,
        Command::Callback { url } => callback(&config, &url).await,
        Command::Logout => logout(&config).await,
        Command::Watch => watch(&config).await,
    }
}

fn start_provider(config: &Config) -> Result<AuthProvider> {
    let api = ApiClient::new(&config.api_base_url).context("Failed to create API client")?;
    Ok(AuthProvider::start(
        config,
        config.storage()?,
        Arc::new(api),
        Arc::new(TerminalNotifier),
    ))
}

fn status(config: &Config) -> Result<()> {
    let store = SessionStore::new(config.storage()?);
    let Some(session) = store.load() else {
        println!("Not logged in");
        return Ok(());
    };

    let user = session.user();
    println!("User:     {} <{}>", user.name, user.email);
    println!("Provider: {}", user.provider.as_deref().unwrap_or("credentials"));
    println!("Roles:    {}", format_roles(user.roles.as_deref()));
    println!("Token:    {}", mask_token(session.token()));
    println!(
        "Expires:  {} ({})",
        format_expiry(session.expires_at()),
        format_remaining(session.time_until_expiry())
    );
    Ok(())
}

async fn login(config: &mut Config, email: Option<String>) -> Result<()> {
    let email = email
        .or_else(|| config.last_email.clone())
        .ok_or_else(|| anyhow::anyhow!("No email given. Use --email <address>"))?;

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };

    let provider = start_provider(config)?;
    let user = provider
        .context()
        .login_with_credentials(&email, &password)
        .await?;

    config.last_email = Some(user.email.clone());
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }
    Ok(())
}

async fn callback(config: &Config, url: &str) -> Result<()> {
    let url = Url::parse(url).with_context(|| format!("Invalid callback URL: {}", url))?;
    let params = CallbackParams::from_url(&url);

    let provider = start_provider(config)?;
    let outcome = CallbackPage::new()
        .run(
            &params,
            CallbackEnv::Standalone {
                auth: provider.context(),
                navigator: &TerminalNavigator,
            },
        )
        .await;

    match outcome {
        CallbackOutcome::Navigated(Route::Home) => Ok(()),
        CallbackOutcome::Navigated(Route::Login { error }) => Err(anyhow::anyhow!(
            "Login failed: {}",
            error.unwrap_or_else(|| "unknown error".to_string())
        )),
        other => Err(anyhow::anyhow!("Unexpected callback outcome: {:?}", other)),
    }
}

async fn logout(config: &Config) -> Result<()> {
    let provider = start_provider(config)?;
    // Local state is cleared even when this fails; the notifier already
    // reported the server error.
    let _ = provider.context().logout().await;
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let provider = start_provider(config)?;
    let auth = provider.context();
    if !auth.is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    let mut state = auth.subscribe();
    println!("Watching session (Ctrl-C to stop)...");
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() || !state.borrow_and_update().is_authenticated() {
                    println!("Session ended");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
