use std::{net::SocketAddr, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context};
use axum::{
    routing::{get, post},
    Router,
};
use ninegeek_memstore::MemStore;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod extractors;
mod fuzz;
mod handlers;
mod tests;

use db::PostgresStore;
use error::Error;
use extractors::{AppState, DynStore};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[derive(Clone, Copy, Debug)]
enum StoreKind {
    Memory,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<StoreKind> {
        match s {
            "memory" => Ok(StoreKind::Memory),
            "postgres" => Ok(StoreKind::Postgres),
            _ => Err(anyhow!("unknown store {s:?}, expected memory or postgres")),
        }
    }
}

#[derive(structopt::StructOpt)]
struct Opt {
    /// Where to keep threads and comments: memory or postgres
    #[structopt(long, default_value = "postgres")]
    store: StoreKind,

    /// Address to listen on
    #[structopt(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

fn env(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

/// Database to connect to, from `DATABASE_URL` if set, otherwise from the
/// `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_HOST` and `DB_PORT` variables.
fn db_connect_options() -> anyhow::Result<PgConnectOptions> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return PgConnectOptions::from_str(&url).context("parsing DATABASE_URL");
    }
    let port = env("DB_PORT")?;
    let port = port
        .parse::<u16>()
        .with_context(|| format!("parsing DB_PORT {port:?}"))?;
    Ok(PgConnectOptions::new()
        .username(&env("DB_USER")?)
        .password(&env("DB_PASSWORD")?)
        .database(&env("DB_NAME")?)
        .host(&env("DB_HOST")?)
        .port(port)
        .ssl_mode(PgSslMode::Disable))
}

pub async fn create_sqlx_pool(opts: PgConnectOptions) -> anyhow::Result<sqlx::PgPool> {
    PgPoolOptions::new()
        .connect_with(opts)
        .await
        .context("connecting to postgres")
}

pub fn app(store: DynStore) -> Router {
    Router::new()
        .route("/users/login", post(handlers::login))
        .route(
            "/threads",
            get(handlers::list_threads).post(handlers::create_thread),
        )
        .route("/threads/:id", get(handlers::get_thread))
        .route(
            "/threads/:id/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .with_state(AppState { store })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine, the variables may come from the environment
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let store: DynStore = match opt.store {
        StoreKind::Memory => {
            tracing::info!("keeping threads in memory, they will be lost on exit");
            Arc::new(MemStore::new())
        }
        StoreKind::Postgres => {
            let pool = create_sqlx_pool(db_connect_options()?).await?;
            MIGRATOR
                .run(&pool)
                .await
                .context("applying database migrations")?;
            tracing::info!("connected to postgres");
            Arc::new(PostgresStore::new(pool))
        }
    };

    tracing::info!("listening on {}", opt.listen);
    axum::Server::bind(&opt.listen)
        .serve(app(store).into_make_service())
        .await
        .context("serving axum webserver")
}
