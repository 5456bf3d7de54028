//! civicsync_server: standalone REST server for CivicSync.
//!
//! Configuration is read from env vars (and `.env`); see `config.rs`.
//! Without CIVICSYNC_DATABASE_URL the server runs on in-memory stores,
//! which is handy for local UI work and loses everything on exit.

use std::sync::Arc;

use anyhow::Context;
use civicsync_core::{
    accounts::AccountService,
    memory::{InMemoryIssueStore, InMemoryUserStore},
    password::Argon2Hasher,
    ports::{IssueStore, UserStore},
    service::{CommentPolicy, IssueService, IssueServiceImpl},
};
use civicsync_postgres::PgStores;
use civicsync_server::config::ServerConfig;
use civicsync_server::middleware::gate::AccessPolicy;
use civicsync_server::router::{build_router, AppServices};
use civicsync_server::session::SessionKeys;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,civicsync_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let (issues, users): (Arc<dyn IssueStore>, Arc<dyn UserStore>) = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect_lazy(database_url)
                .context("invalid CIVICSYNC_DATABASE_URL")?;
            civicsync_postgres::migrate(&pool)
                .await
                .context("failed to apply schema")?;
            tracing::info!(max_connections = config.db_max_connections, "using postgres stores");
            let stores = PgStores::new(pool);
            let issues: Arc<dyn IssueStore> = Arc::new(stores.issues);
            let users: Arc<dyn UserStore> = Arc::new(stores.users);
            (issues, users)
        }
        None => {
            tracing::warn!("CIVICSYNC_DATABASE_URL not set; using in-memory stores");
            let issues: Arc<dyn IssueStore> = Arc::new(InMemoryIssueStore::new());
            let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());
            (issues, users)
        }
    };

    let comment_policy = if config.anonymous_comments {
        CommentPolicy::AllowAnonymous
    } else {
        CommentPolicy::RequireActor
    };
    let service: Arc<dyn IssueService> = Arc::new(
        IssueServiceImpl::new(issues, Arc::clone(&users)).with_comment_policy(comment_policy),
    );
    let accounts = Arc::new(AccountService::new(users, Arc::new(Argon2Hasher)));

    let keys = SessionKeys::from_secret(config.jwt_secret.as_bytes())
        .with_cookie_name(config.session_cookie.clone())
        .with_secure_cookies(config.secure_cookies);

    let app = build_router(
        AppServices {
            issues: service,
            accounts,
        },
        keys,
        AccessPolicy::default(),
        &config.static_dir,
    );

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!(
        static_dir = %config.static_dir.display(),
        "civicsync_server listening on {}",
        config.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("civicsync_server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, draining connections");
}
