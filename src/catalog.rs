use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{AdContentType, AdType, NewAd, TargetAudience, ADMIN_AUTHOR};

const CATALOG_JSON: &str = include_str!("../data/promotional-ads.json");

/// A predefined promotional ad shipped with the site.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogAd {
    pub id: String,
    pub title: String,
    pub description: String,
    pub ad_type: AdType,
    pub content_type: AdContentType,
    pub image_url: Option<String>,
    pub cta_text: String,
    pub cta_url: String,
    pub target_pages: Vec<String>,
    pub target_audience: TargetAudience,
    pub priority: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    skyethio_travels_ads: Vec<CatalogAd>,
}

pub fn load() -> Result<Vec<CatalogAd>, serde_json::Error> {
    serde_json::from_str::<CatalogFile>(CATALOG_JSON).map(|f| f.skyethio_travels_ads)
}

impl CatalogAd {
    /// Imported ads start active, uncapped, without video and with zeroed counters.
    pub fn to_new_ad(&self, now: DateTime<Utc>) -> NewAd {
        NewAd {
            id: self.id.clone(),
            title: self.title.clone(),
            description: Some(self.description.clone()),
            ad_type: self.ad_type,
            content_type: self.content_type,
            image_url: self.image_url.clone(),
            video_url: None,
            cta_text: self.cta_text.clone(),
            cta_url: self.cta_url.clone(),
            target_pages: self.target_pages.clone(),
            target_audience: self.target_audience,
            priority: self.priority,
            is_active: true,
            start_date: self.start_date,
            end_date: self.end_date,
            max_impressions: None,
            current_impressions: 0,
            click_count: 0,
            created_by: ADMIN_AUTHOR.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Catalog entries whose ids are not in `existing`.
pub fn missing<'a>(catalog: &'a [CatalogAd], existing: &[String]) -> Vec<&'a CatalogAd> {
    catalog
        .iter()
        .filter(|ad| !existing.iter().any(|id| id == &ad.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AdForm;
    use crate::validation::validate_ad;
    use std::collections::HashSet;

    #[test]
    fn catalog_parses_with_unique_ids() {
        let catalog = load().unwrap();
        assert!(!catalog.is_empty());
        let ids: HashSet<&str> = catalog.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
    }

    #[test]
    fn every_catalog_ad_passes_ad_validation() {
        for ad in load().unwrap() {
            let form = AdForm {
                title: ad.title.clone(),
                description: ad.description.clone(),
                ad_type: ad.ad_type,
                content_type: ad.content_type,
                image_url: ad.image_url.clone(),
                video_url: None,
                cta_text: ad.cta_text.clone(),
                cta_url: ad.cta_url.clone(),
                target_pages: ad.target_pages.clone(),
                target_audience: ad.target_audience,
                priority: ad.priority,
                is_active: true,
                start_date: ad.start_date,
                end_date: ad.end_date,
                max_impressions: None,
            };
            assert!(validate_ad(&form).is_ok(), "{} fails validation", ad.id);
        }
    }

    #[test]
    fn missing_skips_existing_ids() {
        let catalog = load().unwrap();
        let existing = vec![catalog[0].id.clone(), "someone-elses-ad".to_owned()];
        let todo = missing(&catalog, &existing);
        assert_eq!(todo.len(), catalog.len() - 1);
        assert!(todo.iter().all(|a| a.id != catalog[0].id));

        let all: Vec<String> = catalog.iter().map(|a| a.id.clone()).collect();
        assert!(missing(&catalog, &all).is_empty());
    }

    #[test]
    fn imported_rows_start_clean() {
        let now = Utc::now();
        let row = load().unwrap()[0].to_new_ad(now);
        assert!(row.is_active);
        assert_eq!(row.current_impressions, 0);
        assert_eq!(row.click_count, 0);
        assert_eq!(row.max_impressions, None);
        assert_eq!(row.video_url, None);
        assert_eq!(row.created_by, "admin");
    }
}
