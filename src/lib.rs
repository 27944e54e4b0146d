#[macro_use]
extern crate diesel;

use actix_web::{error as actix_error, web, HttpResponse};
use diesel::{prelude::*, r2d2};

pub mod actions;
pub mod admin;
pub mod ads;
pub mod catalog;
pub mod config;
pub mod drafts;
pub mod error;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod storage;
pub mod validation;

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;

pub fn initialize_db_pool(database_url: &str) -> Result<DbPool, r2d2::PoolError> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);
    r2d2::Pool::builder().build(manager)
}

/// Registers every public and admin route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    handlers::configure(cfg);
    admin::configure(cfg);
}

/// JSON extractor config that answers malformed bodies with the usual `{message}` shape.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        let response = match err {
            actix_error::JsonPayloadError::ContentType => {
                HttpResponse::UnsupportedMediaType().json(models::ApiResponse {
                    message: "Unsupported Media Type".to_owned(),
                })
            }
            actix_error::JsonPayloadError::Overflow { .. } | actix_error::JsonPayloadError::OverflowKnownLength { .. } => {
                HttpResponse::PayloadTooLarge().json(models::ApiResponse { message: detail })
            }
            actix_error::JsonPayloadError::Deserialize(ref err) => {
                HttpResponse::BadRequest().json(models::ApiResponse { message: err.to_string() })
            }
            _ => HttpResponse::BadRequest().json(models::ApiResponse { message: detail }),
        };
        actix_error::InternalError::from_response(err, response).into()
    })
}

/// Query-string errors answer `400 {message}` instead of plain text.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(models::ApiResponse { message: err.to_string() });
        actix_error::InternalError::from_response(err, response).into()
    })
}

/// Unparsable path segments (e.g. a malformed uuid) answer `404 {message}`.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        log::debug!("Unmatched path parameter: {}", err);
        let response = HttpResponse::NotFound().json(models::ApiResponse { message: "Not found".to_owned() });
        actix_error::InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use actix_web::web;
    use diesel::r2d2;

    use crate::ads::AdSessions;
    use crate::config::{AdminCredentials, AppConfig};
    use crate::drafts::DraftStore;
    use crate::storage::{DocumentStore, LocalDocumentStore};
    use crate::DbPool;

    pub const MAX_UPLOAD_BYTES: usize = 1024;

    /// A pool that never connects up front; only routes that reach the database would notice.
    pub fn lazy_pool() -> DbPool {
        r2d2::Pool::builder()
            .max_size(1)
            .min_idle(Some(0))
            .connection_timeout(Duration::from_millis(200))
            .build_unchecked(r2d2::ConnectionManager::new("postgres://localhost:1/skyethio_unreachable"))
    }

    pub fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("skyethio-http-{}", uuid::Uuid::new_v4()))
    }

    /// Registers the full app with in-memory state and documents under `storage_root`.
    pub fn services(storage_root: PathBuf) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            let config = AppConfig {
                database_url: String::new(),
                bind_addr: "127.0.0.1".to_owned(),
                port: 8080,
                admin: AdminCredentials::default(),
                storage_root,
                public_base_url: "http://localhost:8080".to_owned(),
                max_upload_bytes: MAX_UPLOAD_BYTES,
            };
            let store: Arc<dyn DocumentStore> =
                Arc::new(LocalDocumentStore::new(config.storage_root.clone(), &config.public_base_url));

            cfg.app_data(web::Data::new(lazy_pool()))
                .app_data(web::Data::from(store))
                .app_data(web::Data::new(DraftStore::new()))
                .app_data(web::Data::new(AdSessions::new()))
                .app_data(crate::json_config())
                .app_data(crate::query_config())
                .app_data(crate::path_config())
                .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
                .app_data(web::Data::new(config));
            crate::configure(cfg);
        }
    }
}
