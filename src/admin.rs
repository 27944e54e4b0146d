//! Admin surface: every route here except `login` requires the admin
//! credentials in the `X-Admin-User` / `X-Admin-Password` headers.

use std::future::{ready, Ready};

use actix_web::{delete, dev::Payload, get, patch, post, put, web, FromRequest, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::actions;
use crate::catalog;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::models::{
    ActiveUpdate, AdForm, AmountUpdate, ApiResponse, BookingStatus, InquiryStatus, ListQuery, PaymentUpdate,
    StatusUpdate, VisaStatus,
};
use crate::validation;
use crate::DbPool;

pub const USER_HEADER: &str = "X-Admin-User";
pub const PASSWORD_HEADER: &str = "X-Admin-Password";

const BAD_CREDENTIALS: &str = "Invalid username or password";

/// Extractor that only succeeds for requests carrying the admin credentials.
pub struct Admin;

impl FromRequest for Admin {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        };

        let allowed = req
            .app_data::<web::Data<AppConfig>>()
            .is_some_and(|config| config.admin.matches(header(USER_HEADER).trim(), header(PASSWORD_HEADER)));

        ready(if allowed {
            Ok(Admin)
        } else {
            Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_owned()))
        })
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[post("/login")]
async fn login(config: web::Data<AppConfig>, form: web::Json<LoginRequest>) -> Result<impl Responder, ApiError> {
    if !config.admin.matches(form.username.trim(), &form.password) {
        log::warn!("Rejected admin login for '{}'", form.username);
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_owned()));
    }

    Ok(HttpResponse::Ok().json(ApiResponse { message: "Login successful".to_owned() }))
}

#[get("/health")]
async fn health(_admin: Admin, pool: web::Data<DbPool>) -> Result<impl Responder, ApiError> {
    web::block(move || {
        let mut conn = pool.get()?;
        actions::check_ads_table(&mut conn)
    })
    .await?
    .map_err(|e| ApiError::from_db("database", e))?;

    Ok(HttpResponse::Ok().json(ApiResponse { message: "Database connection healthy".to_owned() }))
}

#[get("/summary")]
async fn summary(_admin: Admin, pool: web::Data<DbPool>) -> Result<impl Responder, ApiError> {
    let counts = web::block(move || {
        let mut conn = pool.get()?;
        actions::dashboard_summary(&mut conn)
    })
    .await?
    .map_err(|e| ApiError::from_db("dashboard", e))?;

    Ok(HttpResponse::Ok().json(counts))
}

// Bookings

#[get("/bookings")]
async fn list_bookings(
    _admin: Admin,
    pool: web::Data<DbPool>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, ApiError> {
    let status = query.status_filter::<BookingStatus>().map_err(ApiError::BadRequest)?;
    let search = query.search_pattern();

    let rows = web::block(move || {
        let mut conn = pool.get()?;
        actions::list_bookings(&mut conn, search, status)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e))?;

    Ok(HttpResponse::Ok().json(rows))
}

#[get("/bookings/{id}")]
async fn get_booking(_admin: Admin, pool: web::Data<DbPool>, path: web::Path<Uuid>) -> Result<impl Responder, ApiError> {
    let booking_id = path.into_inner();
    let booking = web::block(move || {
        let mut conn = pool.get()?;
        actions::get_booking(&mut conn, booking_id)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e))?;

    Ok(HttpResponse::Ok().json(booking))
}

#[patch("/bookings/{id}/status")]
async fn update_booking_status(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<StatusUpdate<BookingStatus>>,
) -> Result<impl Responder, ApiError> {
    let booking_id = path.into_inner();
    let next = form.status;
    let booking = web::block(move || {
        let mut conn = pool.get()?;
        actions::advance_booking_status(&mut conn, booking_id, next)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e))?;

    log::info!("Booking {} moved to {}", booking.id, booking.status);

    Ok(HttpResponse::Ok().json(booking))
}

#[patch("/bookings/{id}/payment")]
async fn update_payment_status(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<PaymentUpdate>,
) -> Result<impl Responder, ApiError> {
    let booking_id = path.into_inner();
    let next = form.payment_status;
    let booking = web::block(move || {
        let mut conn = pool.get()?;
        actions::advance_payment_status(&mut conn, booking_id, next)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e))?;

    log::info!("Booking {} payment moved to {}", booking.id, booking.payment_status);

    Ok(HttpResponse::Ok().json(booking))
}

#[patch("/bookings/{id}/amount")]
async fn update_booking_amount(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<AmountUpdate>,
) -> Result<impl Responder, ApiError> {
    let amount = form.total_amount;
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::BadRequest("Total amount must be zero or more".to_owned()));
    }

    let booking_id = path.into_inner();
    let booking = web::block(move || {
        let mut conn = pool.get()?;
        actions::set_booking_amount(&mut conn, booking_id, amount)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e))?;

    Ok(HttpResponse::Ok().json(booking))
}

// Visa applications

#[get("/visa-applications")]
async fn list_visa_applications(
    _admin: Admin,
    pool: web::Data<DbPool>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, ApiError> {
    let status = query.status_filter::<VisaStatus>().map_err(ApiError::BadRequest)?;
    let search = query.search_pattern();

    let rows = web::block(move || {
        let mut conn = pool.get()?;
        actions::list_visa_applications(&mut conn, search, status)
    })
    .await?
    .map_err(|e| ApiError::from_db("visa application", e))?;

    Ok(HttpResponse::Ok().json(rows))
}

#[get("/visa-applications/{id}")]
async fn get_visa_application(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
) -> Result<impl Responder, ApiError> {
    let application_id = path.into_inner();
    let application = web::block(move || {
        let mut conn = pool.get()?;
        actions::get_visa_application(&mut conn, application_id)
    })
    .await?
    .map_err(|e| ApiError::from_db("visa application", e))?;

    Ok(HttpResponse::Ok().json(application))
}

#[patch("/visa-applications/{id}/status")]
async fn update_visa_status(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<StatusUpdate<VisaStatus>>,
) -> Result<impl Responder, ApiError> {
    let application_id = path.into_inner();
    let next = form.status;
    let application = web::block(move || {
        let mut conn = pool.get()?;
        actions::advance_visa_status(&mut conn, application_id, next)
    })
    .await?
    .map_err(|e| ApiError::from_db("visa application", e))?;

    log::info!("Visa application {} moved to {}", application.id, application.status);

    Ok(HttpResponse::Ok().json(application))
}

// Contact inquiries

#[get("/inquiries")]
async fn list_inquiries(
    _admin: Admin,
    pool: web::Data<DbPool>,
    query: web::Query<ListQuery>,
) -> Result<impl Responder, ApiError> {
    let status = query.status_filter::<InquiryStatus>().map_err(ApiError::BadRequest)?;

    let rows = web::block(move || {
        let mut conn = pool.get()?;
        actions::list_contact_inquiries(&mut conn, status)
    })
    .await?
    .map_err(|e| ApiError::from_db("inquiry", e))?;

    Ok(HttpResponse::Ok().json(rows))
}

#[patch("/inquiries/{id}/status")]
async fn update_inquiry_status(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    form: web::Json<StatusUpdate<InquiryStatus>>,
) -> Result<impl Responder, ApiError> {
    let inquiry_id = path.into_inner();
    let next = form.status;
    let inquiry = web::block(move || {
        let mut conn = pool.get()?;
        actions::advance_inquiry_status(&mut conn, inquiry_id, next)
    })
    .await?
    .map_err(|e| ApiError::from_db("inquiry", e))?;

    Ok(HttpResponse::Ok().json(inquiry))
}

// Advertisements

#[get("/ads")]
async fn list_ads(_admin: Admin, pool: web::Data<DbPool>) -> Result<impl Responder, ApiError> {
    let rows = web::block(move || {
        let mut conn = pool.get()?;
        actions::list_all_ads(&mut conn)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    Ok(HttpResponse::Ok().json(rows))
}

#[post("/ads")]
async fn create_ad(_admin: Admin, pool: web::Data<DbPool>, form: web::Json<AdForm>) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    validation::validate_ad(&form).map_err(ApiError::Validation)?;

    let row = form.into_new_ad(Uuid::new_v4().to_string(), Utc::now());
    let ad = web::block(move || {
        let mut conn = pool.get()?;
        actions::create_ad(&mut conn, &row)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    log::info!("Ad {} created ({})", ad.id, ad.ad_type);

    Ok(HttpResponse::Created().json(ad))
}

#[put("/ads/{id}")]
async fn update_ad(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    form: web::Json<AdForm>,
) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    validation::validate_ad(&form).map_err(ApiError::Validation)?;

    let ad_id = path.into_inner();
    let changes = form.into_changeset(Utc::now());
    let ad = web::block(move || {
        let mut conn = pool.get()?;
        actions::update_ad(&mut conn, &ad_id, &changes)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    Ok(HttpResponse::Ok().json(ad))
}

#[patch("/ads/{id}/active")]
async fn set_ad_active(
    _admin: Admin,
    pool: web::Data<DbPool>,
    path: web::Path<String>,
    form: web::Json<ActiveUpdate>,
) -> Result<impl Responder, ApiError> {
    let ad_id = path.into_inner();
    let active = form.is_active;
    let ad = web::block(move || {
        let mut conn = pool.get()?;
        actions::set_ad_active(&mut conn, &ad_id, active, Utc::now())
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    log::info!("Ad {} {}", ad.id, if ad.is_active { "activated" } else { "deactivated" });

    Ok(HttpResponse::Ok().json(ad))
}

#[delete("/ads/{id}")]
async fn delete_ad(_admin: Admin, pool: web::Data<DbPool>, path: web::Path<String>) -> Result<impl Responder, ApiError> {
    let ad_id = path.into_inner();
    let deleted_id = ad_id.clone();
    web::block(move || {
        let mut conn = pool.get()?;
        actions::delete_ad(&mut conn, &ad_id)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    log::info!("Ad {} deleted", deleted_id);

    Ok(HttpResponse::Ok().json(ApiResponse { message: "Ad deleted successfully".to_owned() }))
}

#[derive(Debug, serde::Serialize)]
struct ImportSummary {
    message: String,
    imported: usize,
    ads: Vec<String>,
}

#[post("/ads/import")]
async fn import_ads(_admin: Admin, pool: web::Data<DbPool>) -> Result<impl Responder, ApiError> {
    let entries = catalog::load().map_err(|e| {
        log::error!("Bundled ad catalog is unreadable: {:?}", e);
        ApiError::Internal("Failed to load the promotional ad catalog".to_owned())
    })?;

    let check_pool = pool.clone();
    web::block(move || {
        let mut conn = check_pool.get()?;
        actions::check_ads_table(&mut conn)
    })
    .await?
    .map_err(|e| {
        log::error!("Ads table check failed: {:?}", e);
        ApiError::Internal("Ads table not found. Please run the database migration first.".to_owned())
    })?;

    let titles = web::block(move || {
        let mut conn = pool.get()?;
        actions::import_catalog(&mut conn, &entries, Utc::now())
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    let outcome = if titles.is_empty() {
        ImportSummary {
            message: "All promotional ads already exist in database".to_owned(),
            imported: 0,
            ads: titles,
        }
    } else {
        log::info!("Imported {} promotional ads", titles.len());
        ImportSummary {
            message: format!("Successfully imported {} promotional ads", titles.len()),
            imported: titles.len(),
            ads: titles,
        }
    };

    Ok(HttpResponse::Ok().json(outcome))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(login)
            .service(health)
            .service(summary)
            .service(list_bookings)
            .service(get_booking)
            .service(update_booking_status)
            .service(update_payment_status)
            .service(update_booking_amount)
            .service(list_visa_applications)
            .service(get_visa_application)
            .service(update_visa_status)
            .service(list_inquiries)
            .service(update_inquiry_status)
            .service(list_ads)
            .service(create_ad)
            .service(import_ads)
            .service(update_ad)
            .service(set_ad_active)
            .service(delete_ad),
    );
}
