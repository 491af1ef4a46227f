use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::schema::species;

use super::species_errors::{Result, SpeciesError};

/// Domain model for a resolved species record.
///
/// The canonical scientific name is the unique natural key. Every other
/// field is optional: a record may legitimately hold only the subset of
/// fields its providers were able to supply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesRecord {
    pub scientific_name: String,
    pub common_name: Option<String>,
    /// Provider id -> provider-specific id (e.g. an iNaturalist taxon id).
    pub external_ids: HashMap<String, String>,
    pub photo_url: Option<String>,
    pub description_text: Option<String>,
    /// When the description was generated. Governs regeneration,
    /// independently of when the record itself was created.
    pub description_generated_at: Option<DateTime<Utc>>,
    pub region: Option<String>,
    pub behavior: Option<String>,
    pub difficulty: Option<String>,
    pub wiki_url: Option<String>,
    /// Providers that contributed at least one field.
    pub source_providers: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpeciesRecord {
    pub fn new(scientific_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            scientific_name: scientific_name.into(),
            common_name: None,
            external_ids: HashMap::new(),
            photo_url: None,
            description_text: None,
            description_generated_at: None,
            region: None,
            behavior: None,
            difficulty: None,
            wiki_url: None,
            source_providers: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges fields from `other` under the never-downgrade rule: a field
    /// already holding a non-empty value is kept, and absent or empty values
    /// in `other` never overwrite anything.
    pub fn merge_from(&mut self, other: &SpeciesRecord) {
        merge_text(&mut self.common_name, &other.common_name);
        merge_text(&mut self.photo_url, &other.photo_url);
        merge_text(&mut self.region, &other.region);
        merge_text(&mut self.behavior, &other.behavior);
        merge_text(&mut self.difficulty, &other.difficulty);
        merge_text(&mut self.wiki_url, &other.wiki_url);

        // The description and its timestamp travel together.
        if !is_set(&self.description_text) && is_set(&other.description_text) {
            self.description_text = other.description_text.clone();
            self.description_generated_at = other.description_generated_at;
        }

        for (provider, id) in &other.external_ids {
            if !id.trim().is_empty() {
                self.external_ids
                    .entry(provider.clone())
                    .or_insert_with(|| id.clone());
            }
        }
        for provider in &other.source_providers {
            self.source_providers.insert(provider.clone());
        }
    }
}

fn is_set(value: &Option<String>) -> bool {
    matches!(value, Some(s) if !s.trim().is_empty())
}

fn merge_text(dst: &mut Option<String>, src: &Option<String>) {
    if !is_set(dst) && is_set(src) {
        *dst = src.clone();
    }
}

/// Normalizes a free-text query into a canonical scientific name:
/// genus capitalized, species lowercased, internal whitespace collapsed.
/// Trailing tokens are preserved verbatim as a subspecies qualifier.
///
/// Rejects anything with fewer than two tokens before any provider call.
pub fn normalize_scientific_name(raw: &str) -> Result<String> {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(SpeciesError::InvalidName(raw.trim().to_string()));
    }

    let mut chars = tokens[0].chars();
    let genus = match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    };
    let species = tokens[1].to_lowercase();

    let mut canonical = format!("{} {}", genus, species);
    for qualifier in &tokens[2..] {
        canonical.push(' ');
        canonical.push_str(qualifier);
    }
    Ok(canonical)
}

/// Database representation of a species record. The map-valued fields are
/// stored as JSON text columns.
#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = species)]
pub struct SpeciesRecordDB {
    pub scientific_name: String,
    pub common_name: Option<String>,
    pub external_ids: String,
    pub photo_url: Option<String>,
    pub description_text: Option<String>,
    pub description_generated_at: Option<NaiveDateTime>,
    pub region: Option<String>,
    pub behavior: Option<String>,
    pub difficulty: Option<String>,
    pub wiki_url: Option<String>,
    pub source_providers: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SpeciesRecordDB> for SpeciesRecord {
    fn from(db: SpeciesRecordDB) -> Self {
        Self {
            scientific_name: db.scientific_name,
            common_name: db.common_name,
            external_ids: serde_json::from_str(&db.external_ids).unwrap_or_default(),
            photo_url: db.photo_url,
            description_text: db.description_text,
            description_generated_at: db
                .description_generated_at
                .map(|t| DateTime::from_naive_utc_and_offset(t, Utc)),
            region: db.region,
            behavior: db.behavior,
            difficulty: db.difficulty,
            wiki_url: db.wiki_url,
            source_providers: serde_json::from_str(&db.source_providers).unwrap_or_default(),
            created_at: DateTime::from_naive_utc_and_offset(db.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(db.updated_at, Utc),
        }
    }
}

impl From<&SpeciesRecord> for SpeciesRecordDB {
    fn from(record: &SpeciesRecord) -> Self {
        Self {
            scientific_name: record.scientific_name.clone(),
            common_name: record.common_name.clone(),
            external_ids: serde_json::to_string(&record.external_ids)
                .unwrap_or_else(|_| "{}".to_string()),
            photo_url: record.photo_url.clone(),
            description_text: record.description_text.clone(),
            description_generated_at: record.description_generated_at.map(|t| t.naive_utc()),
            region: record.region.clone(),
            behavior: record.behavior.clone(),
            difficulty: record.difficulty.clone(),
            wiki_url: record.wiki_url.clone(),
            source_providers: serde_json::to_string(&record.source_providers)
                .unwrap_or_else(|_| "[]".to_string()),
            created_at: record.created_at.naive_utc(),
            updated_at: record.updated_at.naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_capitalizes_genus_and_lowercases_species() {
        assert_eq!(
            normalize_scientific_name("  LASIUS NIGER ").unwrap(),
            "Lasius niger"
        );
        assert_eq!(
            normalize_scientific_name("lasius niger").unwrap(),
            "Lasius niger"
        );
        assert_eq!(
            normalize_scientific_name("Lasius Niger").unwrap(),
            "Lasius niger"
        );
    }

    #[test]
    fn normalize_collapses_internal_whitespace() {
        assert_eq!(
            normalize_scientific_name("messor   barbarus").unwrap(),
            "Messor barbarus"
        );
    }

    #[test]
    fn normalize_preserves_subspecies_qualifier_verbatim() {
        assert_eq!(
            normalize_scientific_name("camponotus ligniperda Ssp").unwrap(),
            "Camponotus ligniperda Ssp"
        );
    }

    #[test]
    fn normalize_rejects_single_token() {
        assert!(matches!(
            normalize_scientific_name("Lasius"),
            Err(SpeciesError::InvalidName(_))
        ));
        assert!(matches!(
            normalize_scientific_name("   "),
            Err(SpeciesError::InvalidName(_))
        ));
    }

    #[test]
    fn merge_never_downgrades_existing_fields() {
        let mut existing = SpeciesRecord::new("Lasius niger");
        existing.photo_url = Some("A".to_string());

        let mut incoming = SpeciesRecord::new("Lasius niger");
        incoming.photo_url = None;
        incoming.region = Some("Europe".to_string());

        existing.merge_from(&incoming);
        assert_eq!(existing.photo_url.as_deref(), Some("A"));
        assert_eq!(existing.region.as_deref(), Some("Europe"));
    }

    #[test]
    fn merge_treats_empty_strings_as_absent() {
        let mut existing = SpeciesRecord::new("Lasius niger");
        existing.photo_url = Some("A".to_string());

        let mut incoming = SpeciesRecord::new("Lasius niger");
        incoming.photo_url = Some("".to_string());
        incoming.region = Some("   ".to_string());

        existing.merge_from(&incoming);
        assert_eq!(existing.photo_url.as_deref(), Some("A"));
        assert!(existing.region.is_none());
    }

    #[test]
    fn merge_keeps_description_and_timestamp_together() {
        let mut existing = SpeciesRecord::new("Lasius niger");
        let mut incoming = SpeciesRecord::new("Lasius niger");
        let stamp = Utc::now();
        incoming.description_text = Some("desc".to_string());
        incoming.description_generated_at = Some(stamp);

        existing.merge_from(&incoming);
        assert_eq!(existing.description_text.as_deref(), Some("desc"));
        assert_eq!(existing.description_generated_at, Some(stamp));
    }

    #[test]
    fn merge_unions_external_ids_and_sources() {
        let mut existing = SpeciesRecord::new("Lasius niger");
        existing
            .external_ids
            .insert("inaturalist".to_string(), "123".to_string());

        let mut incoming = SpeciesRecord::new("Lasius niger");
        incoming
            .external_ids
            .insert("inaturalist".to_string(), "999".to_string());
        incoming
            .external_ids
            .insert("antwiki".to_string(), "Lasius_niger".to_string());
        incoming.source_providers.insert("antwiki".to_string());

        existing.merge_from(&incoming);
        assert_eq!(existing.external_ids["inaturalist"], "123");
        assert_eq!(existing.external_ids["antwiki"], "Lasius_niger");
        assert!(existing.source_providers.contains("antwiki"));
    }

    #[test]
    fn db_roundtrip_preserves_json_columns() {
        let mut record = SpeciesRecord::new("Messor barbarus");
        record
            .external_ids
            .insert("inaturalist".to_string(), "123".to_string());
        record.source_providers.insert("inaturalist".to_string());

        let db = SpeciesRecordDB::from(&record);
        let back = SpeciesRecord::from(db);
        assert_eq!(back.external_ids, record.external_ids);
        assert_eq!(back.source_providers, record.source_providers);
    }
}
