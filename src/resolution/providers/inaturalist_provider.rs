use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::resolution::resolution_constants::PROVIDER_INATURALIST;
use crate::resolution::resolution_errors::{ResolutionError, Result};

use super::models::{clean, ProviderData};
use super::species_provider::SpeciesProvider;

const BASE_URL: &str = "https://api.inaturalist.org/v1";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Taxonomy and observation source. Best photo quality of the three
/// providers, plus the external taxon id, common name and observation count.
pub struct InaturalistProvider {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct TaxaResponse {
    results: Vec<Taxon>,
}

#[derive(Debug, Deserialize)]
struct Taxon {
    id: Option<i64>,
    preferred_common_name: Option<String>,
    observations_count: Option<i64>,
    taxon_photos: Option<Vec<TaxonPhotoEntry>>,
    default_photo: Option<TaxonPhoto>,
}

#[derive(Debug, Deserialize)]
struct TaxonPhotoEntry {
    photo: Option<TaxonPhoto>,
}

#[derive(Debug, Deserialize)]
struct TaxonPhoto {
    medium_url: Option<String>,
    url: Option<String>,
}

impl InaturalistProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SpeciesProvider for InaturalistProvider {
    fn id(&self) -> &'static str {
        PROVIDER_INATURALIST
    }

    async fn fetch(&self, scientific_name: &str) -> Result<Option<ProviderData>> {
        let url = format!(
            "{}/taxa?q={}&rank=species&per_page=1",
            BASE_URL,
            urlencoding::encode(scientific_name)
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!(
                "iNaturalist returned status {} for '{}'",
                response.status(),
                scientific_name
            );
            return Ok(None);
        }

        let body: TaxaResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::Parsing(format!("iNaturalist response: {}", e)))?;

        Ok(extract_taxon(body))
    }
}

fn extract_taxon(response: TaxaResponse) -> Option<ProviderData> {
    let taxon = response.results.into_iter().next()?;

    let photo_url = best_photo(&taxon);
    let data = ProviderData {
        external_id: taxon.id.map(|id| id.to_string()),
        photo_url,
        common_name: clean(taxon.preferred_common_name),
        observations: taxon.observations_count,
        ..Default::default()
    };

    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

/// First taxon photo, preferring the medium rendition, falling back to the
/// default photo.
fn best_photo(taxon: &Taxon) -> Option<String> {
    let from_gallery = taxon
        .taxon_photos
        .as_ref()
        .and_then(|photos| photos.first())
        .and_then(|entry| entry.photo.as_ref())
        .and_then(|photo| photo.medium_url.clone().or_else(|| photo.url.clone()));

    clean(from_gallery.or_else(|| {
        taxon
            .default_photo
            .as_ref()
            .and_then(|photo| photo.medium_url.clone().or_else(|| photo.url.clone()))
    }))
}
