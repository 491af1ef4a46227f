use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::resolution::resolution_constants::PROVIDER_ANTONTOP;
use crate::resolution::resolution_errors::Result;

use super::models::{clean, ProviderData};
use super::species_provider::SpeciesProvider;

const BASE_URL: &str = "https://antontop.com";
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Commerce catalog source. Short marketing-style description plus husbandry
/// metadata (difficulty, behavior, region of origin) from the product page.
pub struct AntontopProvider {
    client: Client,
}

impl AntontopProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    fn slug(scientific_name: &str) -> String {
        scientific_name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    async fn fetch_page(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            debug!("AntOnTop returned status {} for {}", response.status(), url);
            return Ok(None);
        }
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl SpeciesProvider for AntontopProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ANTONTOP
    }

    async fn fetch(&self, scientific_name: &str) -> Result<Option<ProviderData>> {
        let slug = Self::slug(scientific_name);

        // The localized listing is preferred; the bare path is the fallback.
        let primary = format!("{}/es/{}/", BASE_URL, slug);
        let html = match self.fetch_page(&primary).await? {
            Some(html) => html,
            None => {
                let fallback = format!("{}/{}/", BASE_URL, slug);
                match self.fetch_page(&fallback).await? {
                    Some(html) => html,
                    None => return Ok(None),
                }
            }
        };

        Ok(parse_page(&html))
    }
}

fn parse_page(html: &str) -> Option<ProviderData> {
    let document = Html::parse_document(html);

    let main_image = Selector::parse("img.wp-post-image").expect("static selector");
    let photo_url = document
        .select(&main_image)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::to_string);

    let short_description =
        Selector::parse("div.woocommerce-product-details__short-description p")
            .expect("static selector");
    let short_text = document
        .select(&short_description)
        .next()
        .map(|p| p.text().collect::<String>());

    let mut region = None;
    let mut behavior = None;
    let mut difficulty = None;

    // Product-details rows are plain key/value table cells; header keys come
    // in Spanish or English depending on which listing answered.
    let rows = Selector::parse("table tr").expect("static selector");
    let cells = Selector::parse("td").expect("static selector");
    for row in document.select(&rows) {
        let mut iter = row.select(&cells);
        let (Some(key_cell), Some(value_cell)) = (iter.next(), iter.next()) else {
            continue;
        };
        let key = key_cell.text().collect::<String>().trim().to_lowercase();
        let value = value_cell.text().collect::<String>().trim().to_string();

        if key.contains("dificultad") || key.contains("difficulty") {
            difficulty = Some(value);
        } else if key.contains("comportamiento") || key.contains("behavior") {
            behavior = Some(value);
        } else if key.contains("origen") || key.contains("origin") {
            region = Some(value);
        }
    }

    let data = ProviderData {
        photo_url: clean(photo_url),
        short_text: clean(short_text),
        region: clean(region),
        behavior: clean(behavior),
        difficulty: clean(difficulty),
        ..Default::default()
    };

    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}
