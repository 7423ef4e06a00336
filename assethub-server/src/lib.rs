//! HTTP surface of the assethub application server
//!
//! A single axum fallback dispatcher mirrors the protocol's URL space:
//! `session/*` is handled without a bearer check, everything else resolves
//! the bearer token to a live session, opens a fresh main-database
//! connection, and dispatches to the data, ORM or task handlers.

pub mod handlers;
pub mod routes;

use assethub_core::config::Config;
use assethub_core::orm::OrmSchema;
use assethub_core::session::{LogLevel, LogType, Session, SessionLog};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared read-only state handed to every request.
pub struct AppState {
    /// Startup configuration (read-only after load)
    pub config: Config,
    /// Per-process session log database
    pub session_log: SessionLog,
    /// Loaded ORM schema table (read-only after load)
    pub orm: OrmSchema,
}

/// Build the axum router around the protocol dispatcher.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(routes::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the server until the listener fails.
pub async fn run(config: Config) -> anyhow::Result<()> {
    use anyhow::Context;

    let session_log = SessionLog::create(&config.log.prefix)
        .context("failed to create session log database")?;

    let startup = Session::empty();
    session_log.log(
        &startup,
        &format!("Logging to {}..", session_log.path()),
        LogType::System,
        LogLevel::Console,
    );

    let orm = if config.orm.schema_file.exists() {
        let orm = OrmSchema::load(&config.orm.schema_file)
            .context("failed to load ORM schema descriptor")?;
        session_log.log(
            &startup,
            &format!("Loaded {} ORM table mappings..", orm.len()),
            LogType::System,
            LogLevel::Console,
        );
        orm
    } else {
        tracing::warn!(
            path = %config.orm.schema_file.display(),
            "ORM schema descriptor not found; ORM endpoints will reject all entities"
        );
        OrmSchema::default()
    };

    session_log.log(
        &startup,
        &format!(
            "Listening on host {}, port {}..",
            config.server.host, config.server.port
        ),
        LogType::System,
        LogLevel::Console,
    );

    let addr = tokio::net::lookup_host(config.listen_addr())
        .await
        .context("failed to resolve listen address")?
        .next()
        .context("listen address resolved to nothing")?;

    let https_type = config.https.https_type.clone();
    let certificate = config.https.certificate.clone();
    let private_key = config.https.private_key.clone();

    let app = build_app(Arc::new(AppState {
        config,
        session_log,
        orm,
    }));

    match https_type.as_str() {
        "tls" => {
            let tls_config =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(&certificate, &private_key)
                    .await
                    .context("failed to read certificate or private key")?;
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        "none" | "" => {
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
        other => anyhow::bail!("invalid https type: {}", other),
    }

    Ok(())
}
