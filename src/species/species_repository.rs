use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{get_connection, DbPool};
use crate::schema::species;

use super::species_errors::Result;
use super::species_model::{SpeciesRecord, SpeciesRecordDB};
use super::species_traits::SpeciesRepositoryTrait;

/// Repository for species records backed by SQLite.
pub struct SpeciesRepository {
    pool: Arc<DbPool>,
}

impl SpeciesRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Exact lookup by canonical scientific name.
    pub fn get_by_name(&self, scientific_name: &str) -> Result<Option<SpeciesRecord>> {
        let mut conn = get_connection(&self.pool)?;

        species::table
            .find(scientific_name)
            .first::<SpeciesRecordDB>(&mut conn)
            .optional()
            .map(|row| row.map(SpeciesRecord::from))
            .map_err(Into::into)
    }

    /// Full listing in insertion order, used by the similarity matcher.
    pub fn get_all(&self) -> Result<Vec<SpeciesRecord>> {
        let mut conn = get_connection(&self.pool)?;

        species::table
            .order((species::created_at.asc(), species::scientific_name.asc()))
            .load::<SpeciesRecordDB>(&mut conn)
            .map(|rows| rows.into_iter().map(SpeciesRecord::from).collect())
            .map_err(Into::into)
    }

    /// Insert-or-update on the unique scientific name. The existing row is
    /// merged field-by-field under the never-downgrade rule and the result is
    /// committed atomically, so concurrent upserts for the same name converge.
    pub fn upsert(&self, record: &SpeciesRecord) -> Result<SpeciesRecord> {
        let mut conn = get_connection(&self.pool)?;

        let merged = conn.transaction::<SpeciesRecord, diesel::result::Error, _>(|conn| {
            let existing = species::table
                .find(&record.scientific_name)
                .first::<SpeciesRecordDB>(conn)
                .optional()?;

            let merged = match existing {
                Some(row) => {
                    let mut current = SpeciesRecord::from(row);
                    current.merge_from(record);
                    current.updated_at = Utc::now();
                    current
                }
                None => {
                    let mut fresh = record.clone();
                    fresh.created_at = Utc::now();
                    fresh.updated_at = fresh.created_at;
                    fresh
                }
            };

            diesel::replace_into(species::table)
                .values(&SpeciesRecordDB::from(&merged))
                .execute(conn)?;

            Ok(merged)
        })?;

        Ok(merged)
    }

    /// Overwrites the cached description with a freshly generated one.
    /// Unlike `upsert` this is intentionally allowed to replace an existing
    /// (stale) value; the record is created if it does not exist yet.
    pub fn save_description(
        &self,
        scientific_name: &str,
        description: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<SpeciesRecord> {
        let mut conn = get_connection(&self.pool)?;

        let saved = conn.transaction::<SpeciesRecord, diesel::result::Error, _>(|conn| {
            let updated = diesel::update(species::table.find(scientific_name))
                .set((
                    species::description_text.eq(description),
                    species::description_generated_at.eq(generated_at.naive_utc()),
                    species::updated_at.eq(Utc::now().naive_utc()),
                ))
                .execute(conn)?;

            if updated == 0 {
                let mut record = SpeciesRecord::new(scientific_name);
                record.description_text = Some(description.to_string());
                record.description_generated_at = Some(generated_at);
                diesel::insert_into(species::table)
                    .values(&SpeciesRecordDB::from(&record))
                    .execute(conn)?;
            }

            let row = species::table
                .find(scientific_name)
                .first::<SpeciesRecordDB>(conn)?;
            Ok(SpeciesRecord::from(row))
        })?;

        Ok(saved)
    }
}

impl SpeciesRepositoryTrait for SpeciesRepository {
    fn get_by_name(&self, scientific_name: &str) -> Result<Option<SpeciesRecord>> {
        SpeciesRepository::get_by_name(self, scientific_name)
    }

    fn get_all(&self) -> Result<Vec<SpeciesRecord>> {
        SpeciesRepository::get_all(self)
    }

    fn upsert(&self, record: &SpeciesRecord) -> Result<SpeciesRecord> {
        SpeciesRepository::upsert(self, record)
    }

    fn save_description(
        &self,
        scientific_name: &str,
        description: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<SpeciesRecord> {
        SpeciesRepository::save_description(self, scientific_name, description, generated_at)
    }
}
