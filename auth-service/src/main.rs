//! Auth service entry point.

use auth_service::config::AuthConfig;
use auth_service::startup::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AuthConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(&config.service_name, &config.log_level);

    // The database URL stays out of logs.
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service_name = %config.service_name,
        auth_method = ?config.auth_method,
        db_max_connections = config.database.max_connections,
        remember_me_days = config.remember_me_days,
        "starting auth-service"
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "failed to build application");
        std::io::Error::other(format!("Application build error: {}", e))
    })?;

    app.run_until_stopped().await?;
    tracing::info!("shutdown complete");
    Ok(())
}
