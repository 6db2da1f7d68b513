//! Application startup and lifecycle management.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AuthConfig, AuthMethod};
use crate::db;
use crate::handlers;
use crate::services::{
    AuthService, AuthStrategy, AuthzService, Database, DirectoryAuthenticator, UserStore,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub db: Database,
    pub store: Arc<dyn UserStore>,
    pub auth: Arc<AuthService>,
    pub authz: Arc<AuthzService>,
    /// Present only when directory authentication is configured.
    pub directory: Option<Arc<DirectoryAuthenticator>>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/directory/lookup", post(handlers::directory::lookup))
        .route(
            "/users",
            get(handlers::user::list).post(handlers::user::create),
        )
        .route("/users/:id", get(handlers::user::get_user))
        .route("/users/:id/disable", post(handlers::user::disable))
        .route("/users/:id/enable", post(handlers::user::enable))
        .route("/users/:id/password", post(handlers::user::change_password))
        .route(
            "/users/:id/admin",
            post(handlers::user::make_admin).delete(handlers::user::revoke_admin),
        )
        .route("/users/:id/stages", post(handlers::user::grant_stage))
        .route(
            "/users/:id/stages/:stage_id",
            delete(handlers::user::revoke_stage),
        )
        .route("/users/:id/projects", get(handlers::authz::projects))
        .route(
            "/users/:id/projects/:project_id",
            get(handlers::authz::check_project),
        )
        .route(
            "/users/:id/projects/:project_id/stages",
            get(handlers::authz::stages),
        )
        .route(
            "/users/:id/access/stages/:stage_id",
            get(handlers::authz::check_stage),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: AuthConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: AuthConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: AuthConfig, run_migrations: bool) -> Result<Self, AppError> {
        let pool = db::create_pool(&config.database).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            AppError::DatabaseError(anyhow::anyhow!(e))
        })?;

        if run_migrations {
            db::run_migrations(&pool).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                AppError::DatabaseError(anyhow::anyhow!(e))
            })?;
        }

        let database = Database::new(pool);
        let store: Arc<dyn UserStore> = Arc::new(database.clone());

        let directory = match config.auth_method {
            AuthMethod::Ldap => {
                let dir_config = config.directory.clone().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!(
                        "AUTH_METHOD is ldap but directory settings are missing"
                    ))
                })?;
                Some(Arc::new(DirectoryAuthenticator::new(dir_config)))
            }
            AuthMethod::Local => None,
        };
        let strategy = match &directory {
            Some(authenticator) => AuthStrategy::Directory(authenticator.clone()),
            None => AuthStrategy::Local,
        };

        let auth = Arc::new(AuthService::new(
            store.clone(),
            strategy,
            config.remember_me_days,
        ));
        let authz = Arc::new(AuthzService::new(store.clone()));

        let addr = config.common.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Auth service listener bound");

        let state = AppState {
            config: Arc::new(config),
            db: database,
            store,
            auth,
            authz,
            directory,
        };

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Serve until the process receives Ctrl-C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "auth service accepting connections"
        );

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
