use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    serialize::{self, Output, ToSql},
    sql_types::Text,
    AsChangeset, Insertable, Queryable, Selectable,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{ads, bookings, contact_inquiries, visa_applications};

/// Declares a Rust enum backed by a postgres enum type.
///
/// Variants are listed in lifecycle order; the derived `Ord` is what
/// [`ForwardOnly`] uses to reject backwards transitions.
macro_rules! pg_enum {
    ($(#[$meta:meta])* $name:ident => $sql:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
        #[diesel(sql_type = crate::schema::sql_types::$sql)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Unrecognized {} value: {}", stringify!($name), other)),
                }
            }
        }

        impl ToSql<crate::schema::sql_types::$sql, Pg> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
                <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
            }
        }

        impl FromSql<crate::schema::sql_types::$sql, Pg> for $name {
            fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
                <String as FromSql<Text, Pg>>::from_sql(bytes)?
                    .parse::<$name>()
                    .map_err(Into::into)
            }
        }
    };
}

pg_enum!(BookingStatus => BookingStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Cancelled => "cancelled",
});

pg_enum!(PaymentStatus => PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Refunded => "refunded",
});

pg_enum!(VisaStatus => VisaStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

pg_enum!(InquiryStatus => InquiryStatus {
    New => "new",
    Read => "read",
    Replied => "replied",
});

pg_enum!(TripType => TripType {
    RoundTrip => "round-trip",
    OneWay => "one-way",
});

pg_enum!(TravelClass => TravelClass {
    Economy => "economy",
    Business => "business",
    First => "first",
});

pg_enum!(AdType => AdType {
    Banner => "banner",
    Popup => "popup",
    SlideIn => "slide-in",
    Floating => "floating",
    Notification => "notification",
});

pg_enum!(AdContentType => AdContentType {
    Promotional => "promotional",
    Offer => "offer",
    Announcement => "announcement",
    Service => "service",
});

pg_enum!(TargetAudience => AdAudience {
    All => "all",
    NewVisitors => "new_visitors",
    ReturningVisitors => "returning_visitors",
});

impl Default for TripType {
    fn default() -> Self {
        TripType::RoundTrip
    }
}

impl Default for TravelClass {
    fn default() -> Self {
        TravelClass::Economy
    }
}

impl Default for TargetAudience {
    fn default() -> Self {
        TargetAudience::All
    }
}

/// Status enumerations that may only move to a later variant.
pub trait ForwardOnly: Ord + Copy {
    fn can_advance_to(&self, next: Self) -> bool {
        next > *self
    }
}

impl ForwardOnly for BookingStatus {}
impl ForwardOnly for PaymentStatus {}
impl ForwardOnly for VisaStatus {}
impl ForwardOnly for InquiryStatus {}

// Bookings

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = bookings)]
pub struct Booking {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passport_number: String,
    pub departure_city: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub passengers: i32,
    pub travel_class: TravelClass,
    pub preferred_airline: Option<String>,
    pub notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passport_number: String,
    pub departure_city: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub passengers: i32,
    pub travel_class: TravelClass,
    pub preferred_airline: Option<String>,
    pub notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
}

/// Flight booking form as posted by the book-ticket page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookingForm {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub passport_number: String,
    pub departure_city: String,
    pub destination: String,
    pub departure_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub trip_type: TripType,
    pub passengers: Option<i32>,
    pub travel_class: TravelClass,
    pub preferred_airline: Option<String>,
    pub notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub draft_id: Option<String>,
}

impl BookingForm {
    /// Builds the row to insert; expects a validated form.
    pub fn into_new_booking(self) -> Result<NewBooking, String> {
        let departure_date = self.departure_date.ok_or("Departure date is required.")?;
        let return_date = match self.trip_type {
            TripType::RoundTrip => self.return_date,
            TripType::OneWay => None,
        };

        Ok(NewBooking {
            customer_name: self.customer_name.trim().to_owned(),
            customer_email: self.customer_email.trim().to_owned(),
            customer_phone: self.customer_phone.trim().to_owned(),
            passport_number: self.passport_number.trim().to_owned(),
            departure_city: self.departure_city.trim().to_owned(),
            destination: self.destination.trim().to_owned(),
            departure_date,
            return_date,
            trip_type: self.trip_type,
            passengers: self.passengers.unwrap_or(1),
            travel_class: self.travel_class,
            preferred_airline: non_blank(self.preferred_airline),
            notes: non_blank(self.notes),
            passport_file_url: non_blank(self.passport_file_url),
            total_amount: 0.0,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
        })
    }
}

// Visa applications

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = visa_applications)]
pub struct VisaApplication {
    pub id: Uuid,
    pub applicant_name: String,
    pub applicant_email: String,
    pub visa_type: String,
    pub duration: String,
    pub age: i32,
    pub birth_year: i32,
    pub passport_number: String,
    pub additional_notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub bank_statement_url: Option<String>,
    pub status: VisaStatus,
    pub application_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = visa_applications)]
pub struct NewVisaApplication {
    pub applicant_name: String,
    pub applicant_email: String,
    pub visa_type: String,
    pub duration: String,
    pub age: i32,
    pub birth_year: i32,
    pub passport_number: String,
    pub additional_notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub bank_statement_url: Option<String>,
    pub status: VisaStatus,
    pub application_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisaForm {
    pub applicant_name: String,
    pub applicant_email: String,
    pub visa_type: String,
    pub duration: String,
    pub age: Option<i32>,
    pub birth_year: Option<i32>,
    pub passport_number: String,
    pub additional_notes: Option<String>,
    pub passport_file_url: Option<String>,
    pub bank_statement_url: Option<String>,
    pub draft_id: Option<String>,
}

impl VisaForm {
    pub fn into_new_application(self, now: DateTime<Utc>) -> NewVisaApplication {
        NewVisaApplication {
            applicant_name: self.applicant_name.trim().to_owned(),
            applicant_email: self.applicant_email.trim().to_owned(),
            visa_type: self.visa_type.trim().to_owned(),
            duration: self.duration.trim().to_owned(),
            age: self.age.unwrap_or_default(),
            birth_year: self.birth_year.unwrap_or_default(),
            passport_number: self.passport_number.trim().to_owned(),
            additional_notes: non_blank(self.additional_notes),
            passport_file_url: non_blank(self.passport_file_url),
            bank_statement_url: non_blank(self.bank_statement_url),
            status: VisaStatus::Pending,
            application_date: now,
        }
    }
}

// Contact inquiries

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = contact_inquiries)]
pub struct ContactInquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contact_inquiries)]
pub struct NewContactInquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: InquiryStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub draft_id: Option<String>,
}

impl ContactForm {
    pub fn into_new_inquiry(self) -> NewContactInquiry {
        NewContactInquiry {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            phone: non_blank(self.phone),
            subject: self.subject.trim().to_owned(),
            message: self.message.trim().to_owned(),
            status: InquiryStatus::New,
        }
    }
}

// Advertisements

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = ads)]
pub struct Ad {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub ad_type: AdType,
    pub content_type: AdContentType,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub cta_text: String,
    pub cta_url: String,
    pub target_pages: Vec<String>,
    pub target_audience: TargetAudience,
    pub priority: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_impressions: Option<i32>,
    pub current_impressions: i32,
    pub click_count: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = ads)]
pub struct NewAd {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub ad_type: AdType,
    pub content_type: AdContentType,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub cta_text: String,
    pub cta_url: String,
    pub target_pages: Vec<String>,
    pub target_audience: TargetAudience,
    pub priority: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_impressions: Option<i32>,
    pub current_impressions: i32,
    pub click_count: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable fields of an ad, as submitted by the admin ad form.
#[derive(Debug, Clone, Deserialize)]
pub struct AdForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub ad_type: AdType,
    pub content_type: AdContentType,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub cta_text: String,
    #[serde(default)]
    pub cta_url: String,
    #[serde(default)]
    pub target_pages: Vec<String>,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_impressions: Option<i32>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = ads, treat_none_as_null = true)]
pub struct AdChangeset {
    pub title: String,
    pub description: Option<String>,
    pub ad_type: AdType,
    pub content_type: AdContentType,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub cta_text: String,
    pub cta_url: String,
    pub target_pages: Vec<String>,
    pub target_audience: TargetAudience,
    pub priority: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_impressions: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl AdForm {
    pub fn into_new_ad(self, id: String, now: DateTime<Utc>) -> NewAd {
        let changes = self.into_changeset(now);
        NewAd {
            id,
            title: changes.title,
            description: changes.description,
            ad_type: changes.ad_type,
            content_type: changes.content_type,
            image_url: changes.image_url,
            video_url: changes.video_url,
            cta_text: changes.cta_text,
            cta_url: changes.cta_url,
            target_pages: changes.target_pages,
            target_audience: changes.target_audience,
            priority: changes.priority,
            is_active: changes.is_active,
            start_date: changes.start_date,
            end_date: changes.end_date,
            max_impressions: changes.max_impressions,
            current_impressions: 0,
            click_count: 0,
            created_by: ADMIN_AUTHOR.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_changeset(self, now: DateTime<Utc>) -> AdChangeset {
        AdChangeset {
            title: self.title.trim().to_owned(),
            description: non_blank(Some(self.description)),
            ad_type: self.ad_type,
            content_type: self.content_type,
            image_url: non_blank(self.image_url),
            video_url: non_blank(self.video_url),
            cta_text: self.cta_text.trim().to_owned(),
            cta_url: self.cta_url.trim().to_owned(),
            target_pages: self.target_pages,
            target_audience: self.target_audience,
            priority: self.priority,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
            max_impressions: self.max_impressions,
            updated_at: now,
        }
    }
}

pub const ADMIN_AUTHOR: &str = "admin";

fn default_priority() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// Request/Response models for API

#[derive(Debug, Deserialize)]
pub struct StatusUpdate<S> {
    pub status: S,
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct AmountUpdate {
    pub total_amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct ActiveUpdate {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    /// Parses the status filter; `None` and `"all"` mean no filter.
    pub fn status_filter<S: std::str::FromStr<Err = String>>(&self) -> Result<Option<S>, String> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }

    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub total_bookings: i64,
    pub total_visa_applications: i64,
    pub pending_reviews: i64,
    pub active_ads: i64,
    pub total_ads: i64,
}
