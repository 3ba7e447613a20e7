use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;

mod auth;
mod balance;
mod config;
mod error;
mod flash;
mod routes;
mod schemas;
mod store;
mod telemetry;
mod views;

use crate::auth::SessionSigner;
use crate::config::{Config, StoreBackend};
use crate::store::{MemoryStore, MongoStore, Store};
use crate::views::Views;

async fn open_store(backend: &StoreBackend) -> anyhow::Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match backend {
        StoreBackend::Mongo { uri, database } => {
            tracing::info!(database = %database, "connecting to MongoDB");
            Arc::new(
                MongoStore::connect(uri, database)
                    .await
                    .context("failed to connect")?,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    store
        .ensure_indexes()
        .await
        .context("failed to create indexes")?;
    Ok(store)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env()?;
    let store = web::Data::from(open_store(&config.store).await?);
    let signer = web::Data::new(SessionSigner::new(&config.secret_key, config.cookie_secure));
    let views = web::Data::new(Views::new().context("failed to load templates")?);

    tracing::info!(address = %config.bind_address, "listening");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(store.clone())
            .app_data(signer.clone())
            .app_data(views.clone())
            .configure(routes::configure)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await?;
    Ok(())
}
