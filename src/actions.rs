use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::catalog::{self, CatalogAd};
use crate::error::StatusConflict;
use crate::models::{
    self, Ad, AdChangeset, Booking, BookingStatus, ContactInquiry, DashboardSummary, ForwardOnly,
    InquiryStatus, NewAd, PaymentStatus, VisaApplication, VisaStatus,
};

pub type DbError = Box<dyn std::error::Error + Send + Sync>;

fn ensure_forward<S>(entity: &'static str, current: S, next: S) -> Result<(), StatusConflict>
where
    S: ForwardOnly + std::fmt::Display,
{
    if current.can_advance_to(next) {
        Ok(())
    } else {
        Err(StatusConflict::new(entity, current, next))
    }
}

// Bookings

pub fn insert_booking(conn: &mut PgConnection, row: &models::NewBooking) -> Result<Booking, DbError> {
    use crate::schema::bookings::dsl::bookings;

    let booking = diesel::insert_into(bookings)
        .values(row)
        .returning(Booking::as_returning())
        .get_result(conn)?;

    Ok(booking)
}

pub fn list_bookings(
    conn: &mut PgConnection,
    search: Option<String>,
    status_filter: Option<BookingStatus>,
) -> Result<Vec<Booking>, DbError> {
    use crate::schema::bookings;

    let mut query = bookings::table.into_boxed();
    if let Some(s) = status_filter {
        query = query.filter(bookings::status.eq(s));
    }
    if let Some(pattern) = search {
        query = query.filter(
            bookings::customer_name
                .ilike(pattern.clone())
                .or(bookings::customer_email.ilike(pattern.clone()))
                .or(bookings::destination.ilike(pattern)),
        );
    }

    let rows = query
        .order(bookings::created_at.desc())
        .select(Booking::as_select())
        .load(conn)?;

    Ok(rows)
}

pub fn get_booking(conn: &mut PgConnection, booking_id: Uuid) -> Result<Booking, DbError> {
    use crate::schema::bookings::dsl::bookings;

    let booking = bookings
        .find(booking_id)
        .select(Booking::as_select())
        .first(conn)?;

    Ok(booking)
}

pub fn advance_booking_status(
    conn: &mut PgConnection,
    booking_id: Uuid,
    next: BookingStatus,
) -> Result<Booking, DbError> {
    use crate::schema::bookings::dsl::{bookings, status};

    conn.transaction(|conn| {
        let current: BookingStatus = bookings.find(booking_id).select(status).first(conn)?;
        ensure_forward("booking", current, next)?;

        // Conditional on the observed status so a concurrent update is not overwritten.
        diesel::update(bookings.find(booking_id).filter(status.eq(current)))
            .set(status.eq(next))
            .returning(Booking::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| StatusConflict::raced("booking").into())
    })
}

pub fn advance_payment_status(
    conn: &mut PgConnection,
    booking_id: Uuid,
    next: PaymentStatus,
) -> Result<Booking, DbError> {
    use crate::schema::bookings::dsl::{bookings, payment_status};

    conn.transaction(|conn| {
        let current: PaymentStatus = bookings.find(booking_id).select(payment_status).first(conn)?;
        ensure_forward("payment", current, next)?;

        diesel::update(bookings.find(booking_id).filter(payment_status.eq(current)))
            .set(payment_status.eq(next))
            .returning(Booking::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| StatusConflict::raced("payment").into())
    })
}

pub fn set_booking_amount(conn: &mut PgConnection, booking_id: Uuid, amount: f64) -> Result<Booking, DbError> {
    use crate::schema::bookings::dsl::{bookings, total_amount};

    let booking = diesel::update(bookings.find(booking_id))
        .set(total_amount.eq(amount))
        .returning(Booking::as_returning())
        .get_result(conn)?;

    Ok(booking)
}

// Visa applications

pub fn insert_visa_application(
    conn: &mut PgConnection,
    row: &models::NewVisaApplication,
) -> Result<VisaApplication, DbError> {
    use crate::schema::visa_applications::dsl::visa_applications;

    let application = diesel::insert_into(visa_applications)
        .values(row)
        .returning(VisaApplication::as_returning())
        .get_result(conn)?;

    Ok(application)
}

pub fn list_visa_applications(
    conn: &mut PgConnection,
    search: Option<String>,
    status_filter: Option<VisaStatus>,
) -> Result<Vec<VisaApplication>, DbError> {
    use crate::schema::visa_applications as va;

    let mut query = va::table.into_boxed();
    if let Some(s) = status_filter {
        query = query.filter(va::status.eq(s));
    }
    if let Some(pattern) = search {
        query = query.filter(
            va::applicant_name
                .ilike(pattern.clone())
                .or(va::applicant_email.ilike(pattern.clone()))
                .or(va::visa_type.ilike(pattern)),
        );
    }

    let rows = query
        .order(va::created_at.desc())
        .select(VisaApplication::as_select())
        .load(conn)?;

    Ok(rows)
}

pub fn get_visa_application(conn: &mut PgConnection, application_id: Uuid) -> Result<VisaApplication, DbError> {
    use crate::schema::visa_applications::dsl::visa_applications;

    let application = visa_applications
        .find(application_id)
        .select(VisaApplication::as_select())
        .first(conn)?;

    Ok(application)
}

pub fn advance_visa_status(
    conn: &mut PgConnection,
    application_id: Uuid,
    next: VisaStatus,
) -> Result<VisaApplication, DbError> {
    use crate::schema::visa_applications::dsl::{status, visa_applications};

    conn.transaction(|conn| {
        let current: VisaStatus = visa_applications.find(application_id).select(status).first(conn)?;
        ensure_forward("visa application", current, next)?;

        diesel::update(visa_applications.find(application_id).filter(status.eq(current)))
            .set(status.eq(next))
            .returning(VisaApplication::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| StatusConflict::raced("visa application").into())
    })
}

// Contact inquiries

pub fn insert_contact_inquiry(
    conn: &mut PgConnection,
    row: &models::NewContactInquiry,
) -> Result<ContactInquiry, DbError> {
    use crate::schema::contact_inquiries::dsl::contact_inquiries;

    let inquiry = diesel::insert_into(contact_inquiries)
        .values(row)
        .returning(ContactInquiry::as_returning())
        .get_result(conn)?;

    Ok(inquiry)
}

pub fn list_contact_inquiries(
    conn: &mut PgConnection,
    status_filter: Option<InquiryStatus>,
) -> Result<Vec<ContactInquiry>, DbError> {
    use crate::schema::contact_inquiries::dsl::{contact_inquiries, created_at, status};

    let mut query = contact_inquiries.into_boxed();
    if let Some(s) = status_filter {
        query = query.filter(status.eq(s));
    }

    let rows = query
        .order(created_at.desc())
        .select(ContactInquiry::as_select())
        .load(conn)?;

    Ok(rows)
}

pub fn advance_inquiry_status(
    conn: &mut PgConnection,
    inquiry_id: Uuid,
    next: InquiryStatus,
) -> Result<ContactInquiry, DbError> {
    use crate::schema::contact_inquiries::dsl::{contact_inquiries, status};

    conn.transaction(|conn| {
        let current: InquiryStatus = contact_inquiries.find(inquiry_id).select(status).first(conn)?;
        ensure_forward("inquiry", current, next)?;

        diesel::update(contact_inquiries.find(inquiry_id).filter(status.eq(current)))
            .set(status.eq(next))
            .returning(ContactInquiry::as_returning())
            .get_result(conn)
            .optional()?
            .ok_or_else(|| StatusConflict::raced("inquiry").into())
    })
}

// Advertisements

pub fn list_active_ads(conn: &mut PgConnection) -> Result<Vec<Ad>, DbError> {
    use crate::schema::ads::dsl::{ads, created_at, is_active, priority};

    let rows = ads
        .filter(is_active.eq(true))
        .order((priority.desc(), created_at.asc()))
        .select(Ad::as_select())
        .load(conn)?;

    Ok(rows)
}

pub fn list_all_ads(conn: &mut PgConnection) -> Result<Vec<Ad>, DbError> {
    use crate::schema::ads::dsl::{ads, created_at, priority};

    let rows = ads
        .order((priority.desc(), created_at.asc()))
        .select(Ad::as_select())
        .load(conn)?;

    Ok(rows)
}

pub fn create_ad(conn: &mut PgConnection, row: &NewAd) -> Result<Ad, DbError> {
    use crate::schema::ads::dsl::ads;

    let ad = diesel::insert_into(ads)
        .values(row)
        .returning(Ad::as_returning())
        .get_result(conn)?;

    Ok(ad)
}

pub fn update_ad(conn: &mut PgConnection, ad_id: &str, changes: &AdChangeset) -> Result<Ad, DbError> {
    use crate::schema::ads::dsl::ads;

    let ad = diesel::update(ads.find(ad_id))
        .set(changes)
        .returning(Ad::as_returning())
        .get_result(conn)?;

    Ok(ad)
}

pub fn set_ad_active(conn: &mut PgConnection, ad_id: &str, active: bool, now: DateTime<Utc>) -> Result<Ad, DbError> {
    use crate::schema::ads::dsl::{ads, is_active, updated_at};

    let ad = diesel::update(ads.find(ad_id))
        .set((is_active.eq(active), updated_at.eq(now)))
        .returning(Ad::as_returning())
        .get_result(conn)?;

    Ok(ad)
}

pub fn delete_ad(conn: &mut PgConnection, ad_id: &str) -> Result<(), DbError> {
    use crate::schema::ads::dsl::ads;

    let deleted = diesel::delete(ads.find(ad_id)).execute(conn)?;
    if deleted == 0 {
        return Err(diesel::result::Error::NotFound.into());
    }

    Ok(())
}

pub fn record_impression(conn: &mut PgConnection, ad_id: &str) -> Result<Ad, DbError> {
    use crate::schema::ads::dsl::{ads, current_impressions};

    let ad = diesel::update(ads.find(ad_id))
        .set(current_impressions.eq(current_impressions + 1))
        .returning(Ad::as_returning())
        .get_result(conn)?;

    Ok(ad)
}

pub fn record_click(conn: &mut PgConnection, ad_id: &str) -> Result<Ad, DbError> {
    use crate::schema::ads::dsl::{ads, click_count};

    let ad = diesel::update(ads.find(ad_id))
        .set(click_count.eq(click_count + 1))
        .returning(Ad::as_returning())
        .get_result(conn)?;

    Ok(ad)
}

/// Fails when the ads table cannot be queried, e.g. before migrations ran.
pub fn check_ads_table(conn: &mut PgConnection) -> Result<(), DbError> {
    use crate::schema::ads::dsl::{ads, id};

    ads.select(id).limit(1).load::<String>(conn)?;

    Ok(())
}

/// Inserts the catalog ads whose ids are not stored yet and returns their titles.
pub fn import_catalog(
    conn: &mut PgConnection,
    entries: &[CatalogAd],
    now: DateTime<Utc>,
) -> Result<Vec<String>, DbError> {
    use crate::schema::ads::dsl::{ads, id};

    conn.transaction(|conn| {
        let wanted: Vec<&str> = entries.iter().map(|ad| ad.id.as_str()).collect();
        let existing: Vec<String> = ads.filter(id.eq_any(wanted)).select(id).load(conn)?;

        let new_entries = catalog::missing(entries, &existing);
        if new_entries.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<NewAd> = new_entries.iter().map(|ad| ad.to_new_ad(now)).collect();
        diesel::insert_into(ads).values(&rows).execute(conn)?;

        Ok(new_entries.into_iter().map(|ad| ad.title.clone()).collect())
    })
}

// Dashboard

pub fn dashboard_summary(conn: &mut PgConnection) -> Result<DashboardSummary, DbError> {
    use crate::schema::{ads, bookings, visa_applications};

    let total_bookings: i64 = bookings::table.count().get_result(conn)?;
    let pending_bookings: i64 = bookings::table
        .filter(bookings::status.eq(BookingStatus::Pending))
        .count()
        .get_result(conn)?;
    let total_visa_applications: i64 = visa_applications::table.count().get_result(conn)?;
    let pending_visas: i64 = visa_applications::table
        .filter(visa_applications::status.eq(VisaStatus::Pending))
        .count()
        .get_result(conn)?;
    let total_ads: i64 = ads::table.count().get_result(conn)?;
    let active_ads: i64 = ads::table
        .filter(ads::is_active.eq(true))
        .count()
        .get_result(conn)?;

    Ok(DashboardSummary {
        total_bookings,
        total_visa_applications,
        pending_reviews: pending_bookings + pending_visas,
        active_ads,
        total_ads,
    })
}
