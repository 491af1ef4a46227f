use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

use crate::resolution::resolution_constants::PROVIDER_ANTWIKI;
use crate::resolution::resolution_errors::Result;

use super::models::{clean, ProviderData};
use super::species_provider::SpeciesProvider;

const BASE_URL: &str = "https://www.antwiki.org/wiki";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Minimum paragraph length considered substantial reference text.
const MIN_PARAGRAPH_LEN: usize = 50;

/// Wiki-style reference source. Supplies a fallback photo and long-form
/// description text, and doubles as the verification step: a species is
/// considered known once its page exists.
pub struct AntwikiProvider {
    client: Client,
}

impl AntwikiProvider {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    fn page_url(scientific_name: &str) -> String {
        // Pages are addressed as Genus_species; qualifiers follow the same
        // underscore convention.
        let slug = scientific_name.split_whitespace().collect::<Vec<_>>().join("_");
        format!("{}/{}", BASE_URL, slug)
    }
}

#[async_trait]
impl SpeciesProvider for AntwikiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ANTWIKI
    }

    async fn fetch(&self, scientific_name: &str) -> Result<Option<ProviderData>> {
        let url = Self::page_url(scientific_name);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            debug!(
                "AntWiki returned status {} for '{}'",
                response.status(),
                scientific_name
            );
            return Ok(None);
        }

        let html = response.text().await?;
        Ok(Some(parse_page(&html, &url)))
    }
}

/// Extracts the first gallery image and the first substantial paragraph.
/// The page URL itself is always carried: an existing page is data even when
/// it yields neither photo nor text.
fn parse_page(html: &str, page_url: &str) -> ProviderData {
    let document = Html::parse_document(html);

    let gallery_img = Selector::parse("div.gallery img").expect("static selector");
    let photo_url = document
        .select(&gallery_img)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| {
            if src.starts_with("http") {
                src.to_string()
            } else {
                format!("https://www.antwiki.org{}", src)
            }
        });

    let paragraphs = Selector::parse("#mw-content-text p").expect("static selector");
    let long_text = document.select(&paragraphs).find_map(|p| {
        let text = p.text().collect::<String>().trim().to_string();
        if text.len() > MIN_PARAGRAPH_LEN {
            Some(text)
        } else {
            None
        }
    });

    ProviderData {
        photo_url: clean(photo_url),
        long_text: clean(long_text),
        page_url: Some(page_url.to_string()),
        ..Default::default()
    }
}
