use serde::{Deserialize, Serialize};

/// Partial result returned by a single provider. Every field is optional:
/// `None` means "this source has nothing for that field", which is distinct
/// from an empty string — adapters scrub empties to `None` before returning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderData {
    pub external_id: Option<String>,
    pub photo_url: Option<String>,
    /// Short, marketing-style text (catalog source).
    pub short_text: Option<String>,
    /// Long-form reference text (wiki source).
    pub long_text: Option<String>,
    pub common_name: Option<String>,
    pub region: Option<String>,
    pub behavior: Option<String>,
    pub difficulty: Option<String>,
    /// Source page the data came from, when the source is page-addressed.
    pub page_url: Option<String>,
    pub observations: Option<i64>,
}

impl ProviderData {
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.photo_url.is_none()
            && self.short_text.is_none()
            && self.long_text.is_none()
            && self.common_name.is_none()
            && self.region.is_none()
            && self.behavior.is_none()
            && self.difficulty.is_none()
            && self.page_url.is_none()
            && self.observations.is_none()
    }
}

/// Trims a scraped or deserialized value, mapping whitespace-only and empty
/// strings to `None` so a blank field can never masquerade as data.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_scrubs_empty_and_whitespace() {
        assert_eq!(clean(Some("  x ".to_string())), Some("x".to_string()));
        assert_eq!(clean(Some("   ".to_string())), None);
        assert_eq!(clean(Some(String::new())), None);
        assert_eq!(clean(None), None);
    }

    #[test]
    fn default_data_is_empty() {
        assert!(ProviderData::default().is_empty());
        let with_photo = ProviderData {
            photo_url: Some("http://x/p.jpg".to_string()),
            ..Default::default()
        };
        assert!(!with_photo.is_empty());
    }
}
