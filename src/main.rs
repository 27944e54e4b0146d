use std::io;
use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use skyethio::ads::AdSessions;
use skyethio::config::AppConfig;
use skyethio::drafts::DraftStore;
use skyethio::storage::{DocumentStore, LocalDocumentStore};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // initialize DB pool outside of `HttpServer::new` so that it is shared across all workers
    let pool = skyethio::initialize_db_pool(&config.database_url).map_err(|e| {
        log::error!("Failed to create database pool: {:?}", e);
        io::Error::other(e)
    })?;

    let store: Arc<dyn DocumentStore> = Arc::new(LocalDocumentStore::new(
        config.storage_root.clone(),
        &config.public_base_url,
    ));
    let store = web::Data::from(store);
    let drafts = web::Data::new(DraftStore::new());
    let sessions = web::Data::new(AdSessions::new());

    let bind = (config.bind_addr.clone(), config.port);
    let max_upload_bytes = config.max_upload_bytes;
    let config = web::Data::new(config);

    log::info!("starting HTTP server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            // add DB pool handle to app data; enables use of `web::Data<DbPool>` extractor
            .app_data(web::Data::new(pool.clone()))
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(drafts.clone())
            .app_data(sessions.clone())
            .app_data(skyethio::json_config())
            .app_data(skyethio::query_config())
            .app_data(skyethio::path_config())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .wrap(middleware::Logger::default())
            .configure(skyethio::configure)
    })
    .bind(bind)?
    .run()
    .await
}
