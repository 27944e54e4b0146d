use std::collections::HashSet;

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::actions;
use crate::ads::{select_placements, AdSessions, VisitContext};
use crate::config::AppConfig;
use crate::drafts::{is_valid_client_id, DraftForm, DraftStore, MAX_DRAFT_BYTES};
use crate::error::ApiError;
use crate::models::{ApiResponse, BookingForm, ContactForm, VisaForm};
use crate::storage::{content_type_for, DocumentKind, DocumentStore};
use crate::validation;
use crate::DbPool;

/// Passes the insert outcome through, clearing the visitor's draft only when
/// the row was stored.
async fn settle_draft<T>(
    drafts: &DraftStore,
    form: DraftForm,
    draft_id: Option<&str>,
    inserted: Result<T, ApiError>,
) -> Result<T, ApiError> {
    let row = inserted?;
    if let Some(id) = draft_id {
        drafts.clear(form, id).await;
    }
    Ok(row)
}

#[post("/bookings")]
async fn create_booking(
    pool: web::Data<DbPool>,
    drafts: web::Data<DraftStore>,
    form: web::Json<BookingForm>,
) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    validation::validate_booking(&form).map_err(ApiError::Validation)?;

    let draft_id = form.draft_id.clone();
    let row = form.into_new_booking().map_err(ApiError::BadRequest)?;

    let inserted = web::block(move || {
        let mut conn = pool.get()?;
        actions::insert_booking(&mut conn, &row)
    })
    .await?
    .map_err(|e| ApiError::from_db("booking", e));
    let booking = settle_draft(&drafts, DraftForm::BookTicket, draft_id.as_deref(), inserted).await?;

    log::info!(
        "Booking {} submitted: {} -> {} ({} passengers)",
        booking.id,
        booking.departure_city,
        booking.destination,
        booking.passengers
    );

    Ok(HttpResponse::Created().json(booking))
}

#[post("/visa-applications")]
async fn create_visa_application(
    pool: web::Data<DbPool>,
    drafts: web::Data<DraftStore>,
    form: web::Json<VisaForm>,
) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    validation::validate_visa(&form).map_err(ApiError::Validation)?;

    let draft_id = form.draft_id.clone();
    let row = form.into_new_application(Utc::now());

    let inserted = web::block(move || {
        let mut conn = pool.get()?;
        actions::insert_visa_application(&mut conn, &row)
    })
    .await?
    .map_err(|e| ApiError::from_db("visa application", e));
    let application = settle_draft(&drafts, DraftForm::VisaApplication, draft_id.as_deref(), inserted).await?;

    log::info!("Visa application {} submitted ({})", application.id, application.visa_type);

    Ok(HttpResponse::Created().json(application))
}

#[post("/contact")]
async fn create_contact_inquiry(
    pool: web::Data<DbPool>,
    drafts: web::Data<DraftStore>,
    form: web::Json<ContactForm>,
) -> Result<impl Responder, ApiError> {
    let form = form.into_inner();
    validation::validate_contact(&form).map_err(ApiError::Validation)?;

    let draft_id = form.draft_id.clone();
    let row = form.into_new_inquiry();

    let inserted = web::block(move || {
        let mut conn = pool.get()?;
        actions::insert_contact_inquiry(&mut conn, &row)
    })
    .await?
    .map_err(|e| ApiError::from_db("inquiry", e));
    let inquiry = settle_draft(&drafts, DraftForm::Contact, draft_id.as_deref(), inserted).await?;

    log::info!("Contact inquiry {} received", inquiry.id);

    Ok(HttpResponse::Created().json(inquiry))
}

// Documents

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
}

#[post("/documents/{kind}")]
async fn upload_document(
    store: web::Data<dyn DocumentStore>,
    config: web::Data<AppConfig>,
    kind: web::Path<String>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> Result<impl Responder, ApiError> {
    let kind = DocumentKind::from_segment(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown document kind: {}", kind.as_str())))?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_owned()));
    }
    if body.len() > config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Uploaded file exceeds {} bytes",
            config.max_upload_bytes
        )));
    }

    let stored = store.put(kind, &query.filename, &body).await?;

    Ok(HttpResponse::Created().json(stored))
}

#[get("/documents/{prefix}/{name}")]
async fn download_document(
    store: web::Data<dyn DocumentStore>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (prefix, name) = path.into_inner();
    let bytes = store.get(&format!("{prefix}/{name}")).await?;

    Ok(HttpResponse::Ok().content_type(content_type_for(&name)).body(bytes))
}

// Drafts

fn draft_target(form: &str, client_id: &str) -> Result<DraftForm, ApiError> {
    let form = DraftForm::from_key(form).ok_or_else(|| ApiError::NotFound(format!("Unknown form: {form}")))?;
    if !is_valid_client_id(client_id) {
        return Err(ApiError::BadRequest("Invalid client id".to_owned()));
    }
    Ok(form)
}

#[get("/{form}/{client_id}")]
async fn load_draft(
    drafts: web::Data<DraftStore>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (form, client_id) = path.into_inner();
    let form = draft_target(&form, &client_id)?;

    drafts
        .load(form, &client_id, Utc::now())
        .await
        .map(|draft| HttpResponse::Ok().json(draft))
        .ok_or_else(|| ApiError::NotFound("No saved draft".to_owned()))
}

#[put("/{form}/{client_id}")]
async fn save_draft(
    drafts: web::Data<DraftStore>,
    path: web::Path<(String, String)>,
    fields: web::Json<Map<String, Value>>,
) -> Result<impl Responder, ApiError> {
    let (form, client_id) = path.into_inner();
    let form = draft_target(&form, &client_id)?;

    drafts.save(form, &client_id, fields.into_inner(), Utc::now()).await;

    Ok(HttpResponse::Ok().json(ApiResponse { message: "Draft saved".to_owned() }))
}

#[delete("/{form}/{client_id}")]
async fn clear_draft(
    drafts: web::Data<DraftStore>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, ApiError> {
    let (form, client_id) = path.into_inner();
    let form = draft_target(&form, &client_id)?;

    drafts.clear(form, &client_id).await;

    Ok(HttpResponse::NoContent().finish())
}

// Ads

#[derive(Debug, Deserialize)]
struct EligibleQuery {
    page: Option<String>,
    session: Option<String>,
    new_visitor: Option<bool>,
}

#[get("/ads/eligible")]
async fn eligible_ads(
    pool: web::Data<DbPool>,
    sessions: web::Data<AdSessions>,
    query: web::Query<EligibleQuery>,
) -> Result<impl Responder, ApiError> {
    let ads = web::block(move || {
        let mut conn = pool.get()?;
        actions::list_active_ads(&mut conn)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    let now = Utc::now();
    let page = query.page.as_deref().unwrap_or("/");
    let dismissed = match query.session.as_deref().filter(|s| is_valid_client_id(s)) {
        Some(session) => sessions.visit(session, page, now).await,
        None => HashSet::new(),
    };

    let ctx = VisitContext {
        now,
        page,
        new_visitor: query.new_visitor.unwrap_or(false),
        dismissed: &dismissed,
    };

    Ok(HttpResponse::Ok().json(select_placements(ads, &ctx)))
}

#[derive(Debug, Deserialize)]
struct DismissRequest {
    session: String,
    #[serde(default = "root_page")]
    page: String,
}

fn root_page() -> String {
    "/".to_owned()
}

#[post("/ads/{id}/dismiss")]
async fn dismiss_ad(
    sessions: web::Data<AdSessions>,
    ad_id: web::Path<String>,
    body: web::Json<DismissRequest>,
) -> Result<impl Responder, ApiError> {
    if !is_valid_client_id(&body.session) {
        return Err(ApiError::BadRequest("Invalid session id".to_owned()));
    }

    sessions.dismiss(&body.session, &body.page, &ad_id, Utc::now()).await;

    Ok(HttpResponse::Ok().json(ApiResponse { message: "Ad dismissed".to_owned() }))
}

#[post("/ads/{id}/impression")]
async fn track_impression(pool: web::Data<DbPool>, ad_id: web::Path<String>) -> Result<impl Responder, ApiError> {
    let ad_id = ad_id.into_inner();
    let ad = web::block(move || {
        let mut conn = pool.get()?;
        actions::record_impression(&mut conn, &ad_id)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": ad.id,
        "current_impressions": ad.current_impressions,
        "click_count": ad.click_count,
    })))
}

#[post("/ads/{id}/click")]
async fn track_click(pool: web::Data<DbPool>, ad_id: web::Path<String>) -> Result<impl Responder, ApiError> {
    let ad_id = ad_id.into_inner();
    let ad = web::block(move || {
        let mut conn = pool.get()?;
        actions::record_click(&mut conn, &ad_id)
    })
    .await?
    .map_err(|e| ApiError::from_db("ad", e))?;

    log::info!("Ad {} clicked ({} total)", ad.id, ad.click_count);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": ad.id,
        "current_impressions": ad.current_impressions,
        "click_count": ad.click_count,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_booking)
        .service(create_visa_application)
        .service(create_contact_inquiry)
        .service(upload_document)
        .service(download_document)
        .service(
            web::scope("/drafts")
                .app_data(crate::json_config().limit(MAX_DRAFT_BYTES))
                .service(load_draft)
                .service(save_draft)
                .service(clear_draft),
        )
        .service(eligible_ads)
        .service(dismiss_ad)
        .service(track_impression)
        .service(track_click);
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use serde_json::{json, Map};

    use super::settle_draft;
    use crate::drafts::{DraftForm, DraftStore, MAX_DRAFT_BYTES};
    use crate::error::ApiError;
    use crate::testing;

    #[actix_web::test]
    async fn draft_is_cleared_only_once_the_row_is_stored() {
        let drafts = DraftStore::new();
        let now = Utc::now();
        let mut fields = Map::new();
        fields.insert("destination".to_owned(), json!("Dubai"));
        drafts.save(DraftForm::BookTicket, "tab-1", fields, now).await;

        let failed: Result<u32, ApiError> = Err(ApiError::Internal("insert failed".to_owned()));
        assert!(settle_draft(&drafts, DraftForm::BookTicket, Some("tab-1"), failed).await.is_err());
        assert!(drafts.load(DraftForm::BookTicket, "tab-1", now).await.is_some());

        let stored = settle_draft(&drafts, DraftForm::BookTicket, Some("tab-1"), Ok(7)).await;
        assert_eq!(stored.unwrap(), 7);
        assert!(drafts.load(DraftForm::BookTicket, "tab-1", now).await.is_none());

        assert_eq!(settle_draft(&drafts, DraftForm::Contact, None, Ok("no draft")).await.unwrap(), "no draft");
    }

    #[actix_web::test]
    async fn database_failure_keeps_the_draft() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let save = test::TestRequest::put()
            .uri("/drafts/contact_form_v1/visitor-2")
            .set_json(json!({ "subject": "Cargo" }))
            .to_request();
        assert_eq!(test::call_service(&app, save).await.status(), StatusCode::OK);

        let submit = test::TestRequest::post()
            .uri("/contact")
            .set_json(json!({
                "name": "Dawit",
                "email": "dawit@example.com",
                "subject": "Cargo",
                "message": "Rates for 20kg to Dubai, please.",
                "draft_id": "visitor-2"
            }))
            .to_request();
        let resp = test::call_service(&app, submit).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let load = test::TestRequest::get().uri("/drafts/contact_form_v1/visitor-2").to_request();
        assert_eq!(test::call_service(&app, load).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn oversized_draft_is_rejected() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let req = test::TestRequest::put()
            .uri("/drafts/book_ticket_form_v1/tab-big")
            .set_json(json!({ "notes": "n".repeat(MAX_DRAFT_BYTES) }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }

    #[actix_web::test]
    async fn missing_filename_answers_with_json() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let req = test::TestRequest::post()
            .uri("/documents/passports")
            .set_payload("%PDF-1.4")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().contains("filename"));
    }

    #[actix_web::test]
    async fn invalid_booking_lists_field_errors() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let req = test::TestRequest::post()
            .uri("/bookings")
            .set_json(json!({
                "customer_name": "  ",
                "customer_email": "not-an-email",
                "trip_type": "round-trip",
                "departure_date": "2025-10-10",
                "return_date": "2025-10-01"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["customer_name"], "Full name is required.");
        assert_eq!(body["errors"]["customer_email"], "Valid email is required.");
        assert_eq!(body["errors"]["return_date"], "Return date cannot be before the departure date.");
    }

    #[actix_web::test]
    async fn malformed_json_uses_message_shape() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let req = test::TestRequest::post()
            .uri("/contact")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"name\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["message"].is_string());
    }

    #[actix_web::test]
    async fn failed_submission_keeps_the_draft() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let save = test::TestRequest::put()
            .uri("/drafts/contact_form_v1/visitor-1")
            .set_json(json!({ "name": "Hana", "subject": "Umrah" }))
            .to_request();
        assert_eq!(test::call_service(&app, save).await.status(), StatusCode::OK);

        let submit = test::TestRequest::post()
            .uri("/contact")
            .set_json(json!({ "name": "Hana", "subject": "Umrah", "message": "short", "draft_id": "visitor-1" }))
            .to_request();
        assert_eq!(test::call_service(&app, submit).await.status(), StatusCode::BAD_REQUEST);

        let load = test::TestRequest::get().uri("/drafts/contact_form_v1/visitor-1").to_request();
        let resp = test::call_service(&app, load).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let draft: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(draft, json!({ "name": "Hana", "subject": "Umrah" }));
    }

    #[actix_web::test]
    async fn draft_routes() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let save = test::TestRequest::put()
            .uri("/drafts/visa_application_form_v1/abc")
            .set_json(json!({ "visa_type": "Tourist", "passport_file_url": "http://x/passports/1_a.pdf" }))
            .to_request();
        assert_eq!(test::call_service(&app, save).await.status(), StatusCode::OK);

        let load = test::TestRequest::get().uri("/drafts/visa_application_form_v1/abc").to_request();
        let draft: serde_json::Value = test::call_and_read_body_json(&app, load).await;
        assert_eq!(draft, json!({ "visa_type": "Tourist" }));

        let clear = test::TestRequest::delete().uri("/drafts/visa_application_form_v1/abc").to_request();
        assert_eq!(test::call_service(&app, clear).await.status(), StatusCode::NO_CONTENT);

        let load = test::TestRequest::get().uri("/drafts/visa_application_form_v1/abc").to_request();
        assert_eq!(test::call_service(&app, load).await.status(), StatusCode::NOT_FOUND);

        let unknown = test::TestRequest::get().uri("/drafts/checkout_v9/abc").to_request();
        assert_eq!(test::call_service(&app, unknown).await.status(), StatusCode::NOT_FOUND);

        let bad_id = test::TestRequest::get().uri("/drafts/contact_form_v1/a.b").to_request();
        assert_eq!(test::call_service(&app, bad_id).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn upload_then_download() {
        let root = testing::temp_root();
        let app = test::init_service(App::new().configure(testing::services(root.clone()))).await;

        let req = test::TestRequest::post()
            .uri("/documents/bank-statements?filename=june%20statement.pdf")
            .set_payload("%PDF-1.4 statement")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let stored: serde_json::Value = test::read_body_json(resp).await;
        let key = stored["key"].as_str().unwrap().to_owned();
        assert!(key.starts_with("bank_statements/"));
        assert!(key.ends_with("_june_statement.pdf"));
        assert_eq!(stored["url"], format!("http://localhost:8080/documents/{key}"));

        let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/documents/{key}")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
        assert_eq!(test::read_body(resp).await, "%PDF-1.4 statement");

        let missing = test::TestRequest::get().uri("/documents/passports/1_nothing.pdf").to_request();
        assert_eq!(test::call_service(&app, missing).await.status(), StatusCode::NOT_FOUND);

        let _ = std::fs::remove_dir_all(root);
    }

    #[actix_web::test]
    async fn upload_rejects_empty_oversized_and_unknown_kinds() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let empty = test::TestRequest::post().uri("/documents/passports?filename=a.pdf").to_request();
        assert_eq!(test::call_service(&app, empty).await.status(), StatusCode::BAD_REQUEST);

        let big = test::TestRequest::post()
            .uri("/documents/passports?filename=a.pdf")
            .set_payload(vec![b'x'; testing::MAX_UPLOAD_BYTES + 1])
            .to_request();
        assert_eq!(test::call_service(&app, big).await.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let unknown = test::TestRequest::post()
            .uri("/documents/selfies?filename=a.png")
            .set_payload("png")
            .to_request();
        assert_eq!(test::call_service(&app, unknown).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn dismiss_requires_a_session() {
        let app = test::init_service(App::new().configure(testing::services(testing::temp_root()))).await;

        let bad = test::TestRequest::post()
            .uri("/ads/skyethio-umrah-packages/dismiss")
            .set_json(json!({ "session": "" }))
            .to_request();
        assert_eq!(test::call_service(&app, bad).await.status(), StatusCode::BAD_REQUEST);

        let ok = test::TestRequest::post()
            .uri("/ads/skyethio-umrah-packages/dismiss")
            .set_json(json!({ "session": "s-1", "page": "/visa" }))
            .to_request();
        assert_eq!(test::call_service(&app, ok).await.status(), StatusCode::OK);
    }
}
