use actix_web::{middleware::Compress, web, App, HttpServer};
use actix_cors::Cors;
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use blog::openapi::ApiDoc;
use blog::repo::Repo;
use blog::{config, AppState, Config, SecurityHeaders};

#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
async fn build_repo(cfg: &Config) -> anyhow::Result<Arc<dyn Repo>> {
    let path = cfg.snapshot_path();
    info!(path = %path.display(), "Using in-memory repository backend");
    Ok(Arc::new(blog::repo::inmem::InMemRepo::open(path)))
}

#[cfg(feature = "postgres-store")]
async fn build_repo(cfg: &Config) -> anyhow::Result<Arc<dyn Repo>> {
    use sqlx::postgres::PgPoolOptions;
    let db_url = cfg
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for postgres-store")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("Failed to connect to Postgres")?;
    let repo = blog::repo::pg::PgRepo::new(pool);
    repo.migrate().await.context("Failed to apply migrations")?;
    info!("Using Postgres repository backend");
    Ok(Arc::new(repo))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; elsewhere the environment is set externally.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = Arc::new(Config::from_env()?);
    info!("Bootstrapping blog server");
    info!("Frontend URL: {}", cfg.frontend_url.as_deref().unwrap_or("(none)"));
    if cfg.api_enforce_ownership {
        info!("REST API enforces authorship");
    }

    let repo = build_repo(&cfg).await?;
    let openapi = ApiDoc::openapi();
    info!("OpenAPI spec generated");

    let state = AppState { repo, config: cfg.clone() };
    let bind = cfg.bind.clone();

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local frontend dev servers
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Some(front) = state.config.frontend_url.as_deref() {
                c = c.allowed_origin(front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_config(&state.config))
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
    })
    .bind(&bind)
    .with_context(|| format!("cannot bind {bind}"))?;

    info!("Listening on http://{bind}");
    server.run().await?;
    Ok(())
}
