use chrono::{DateTime, Utc};

use super::species_errors::Result;
use super::species_model::SpeciesRecord;

/// Storage contract for species records. Exact-name lookup and idempotent
/// upsert are all the resolution engine needs; fuzzy scanning works off the
/// full listing.
pub trait SpeciesRepositoryTrait: Send + Sync {
    fn get_by_name(&self, scientific_name: &str) -> Result<Option<SpeciesRecord>>;
    fn get_all(&self) -> Result<Vec<SpeciesRecord>>;
    fn upsert(&self, record: &SpeciesRecord) -> Result<SpeciesRecord>;
    /// Writes a freshly generated description, overwriting any stale cached
    /// value, and creates the record if it does not exist yet.
    fn save_description(
        &self,
        scientific_name: &str,
        description: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<SpeciesRecord>;
}
