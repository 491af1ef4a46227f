use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::species::species_errors::Result;
use crate::species::SpeciesRepositoryTrait;

use super::sequence_ratio::sequence_ratio;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 60.0;

const EXACT_SCORE: f64 = 100.0;
const CONTAINMENT_SCORE: f64 = 90.0;

/// A near-matching stored species, returned when exact resolution fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesMatch {
    pub scientific_name: String,
    pub similarity: f64,
    pub region: Option<String>,
    pub photo_url: Option<String>,
}

/// Fuzzy ranking over the full local listing. Only consulted after the
/// resolver has returned NotFound.
pub struct SimilarityMatcher {
    repository: Arc<dyn SpeciesRepositoryTrait>,
}

impl SimilarityMatcher {
    pub fn new(repository: Arc<dyn SpeciesRepositoryTrait>) -> Self {
        Self { repository }
    }

    /// Ranks every stored record against `query`. A record scores the best of
    /// exact equality (100), one-contains-the-other (90), and the rounded
    /// sequence ratio; records at or above `threshold` are returned sorted by
    /// similarity descending, ties keeping store iteration order.
    pub fn suggest(&self, query: &str, threshold: Option<f64>) -> Result<Vec<SpeciesMatch>> {
        let threshold = threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD);
        let needle = query.trim().to_lowercase();

        let mut matches = Vec::new();
        for record in self.repository.get_all()? {
            let haystack = record.scientific_name.trim().to_lowercase();

            let exact = if haystack == needle { EXACT_SCORE } else { 0.0 };
            let containment = if haystack.contains(&needle) || needle.contains(&haystack) {
                CONTAINMENT_SCORE
            } else {
                0.0
            };
            let ratio = (sequence_ratio(&needle, &haystack) * 100.0).round();

            let similarity = exact.max(containment).max(ratio);
            if similarity >= threshold {
                matches.push(SpeciesMatch {
                    scientific_name: record.scientific_name,
                    similarity,
                    region: record.region,
                    photo_url: record.photo_url,
                });
            }
        }

        // Stable sort keeps store order for equal scores.
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        debug!(
            "Similarity search for '{}' matched {} records (threshold {})",
            query,
            matches.len(),
            threshold
        );
        Ok(matches)
    }
}
