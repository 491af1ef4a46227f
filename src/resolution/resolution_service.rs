use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::description::{DescriptionOutcome, DescriptionService, SpeciesFacts};
use crate::species::{normalize_scientific_name, SpeciesRecord, SpeciesRepositoryTrait};

use super::providers::models::ProviderData;
use super::providers::species_provider::SpeciesProvider;
use super::resolution_constants::{
    PHOTO_PRIORITY, PROVIDER_ANTONTOP, PROVIDER_ANTWIKI, PROVIDER_INATURALIST,
};
use super::resolution_errors::Result;

/// Outcome of a resolution. `NotFound` is a normal value: the cache and every
/// provider yielded nothing.
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(SpeciesRecord),
    NotFound,
}

/// Orchestrates local lookup, provider fan-out, the priority merge and
/// persistence.
pub struct ResolutionService {
    repository: Arc<dyn SpeciesRepositoryTrait>,
    providers: Vec<Arc<dyn SpeciesProvider>>,
    descriptions: Arc<DescriptionService>,
}

impl ResolutionService {
    pub fn new(
        repository: Arc<dyn SpeciesRepositoryTrait>,
        providers: Vec<Arc<dyn SpeciesProvider>>,
        descriptions: Arc<DescriptionService>,
    ) -> Self {
        Self {
            repository,
            providers,
            descriptions,
        }
    }

    pub async fn resolve(&self, query: &str) -> Result<Resolution> {
        self.resolve_with_seed(query, None).await
    }

    /// Resolves a free-text query into a best-effort merged record. A `seed`
    /// is a partial record the caller already holds; its photo is the last
    /// resort of the photo precedence chain.
    pub async fn resolve_with_seed(
        &self,
        query: &str,
        seed: Option<&SpeciesRecord>,
    ) -> Result<Resolution> {
        let canonical = normalize_scientific_name(query)?;

        if let Some(existing) = self.repository.get_by_name(&canonical)? {
            debug!("Local store hit for '{}', skipping providers", canonical);
            return Ok(Resolution::Resolved(existing));
        }

        let fetches = self.providers.iter().map(|provider| {
            let name = canonical.clone();
            let provider = Arc::clone(provider);
            async move {
                let id = provider.id();
                match provider.fetch(&name).await {
                    Ok(Some(data)) if !data.is_empty() => (id, Some(data)),
                    Ok(_) => {
                        debug!("Provider '{}' had no data for '{}'", id, name);
                        (id, None)
                    }
                    Err(e) => {
                        warn!(
                            "Provider '{}' failed for '{}': {}. Treating as no data.",
                            id, name, e
                        );
                        (id, None)
                    }
                }
            }
        });

        // Every dispatched call settles before the merge; the fixed priority
        // lists decide precedence, never completion order.
        let results: HashMap<&'static str, ProviderData> = join_all(fetches)
            .await
            .into_iter()
            .filter_map(|(id, data)| data.map(|d| (id, d)))
            .collect();

        if results.is_empty() {
            info!("No provider returned data for '{}'", canonical);
            return Ok(Resolution::NotFound);
        }

        let record = self.merge(&canonical, &results, seed).await;

        // Best effort: a failed write is logged but the resolved record is
        // still returned, so a later identical query may re-query providers.
        let (mut resolved, fallback_text) = record;
        resolved = match self.repository.upsert(&resolved) {
            Ok(saved) => saved,
            Err(e) => {
                error!(
                    "Failed to persist resolution for '{}': {}. Returning unsaved record.",
                    canonical, e
                );
                resolved
            }
        };
        if resolved.description_text.is_none() {
            resolved.description_text = fallback_text;
        }

        info!(
            "Resolved '{}' from providers: {:?}",
            canonical, resolved.source_providers
        );
        Ok(Resolution::Resolved(resolved))
    }

    /// Aggregates provider results into one record under the fixed priority
    /// lists. Returns the record plus an unpersisted fallback description, if
    /// synthesis had to fall back.
    async fn merge(
        &self,
        canonical: &str,
        results: &HashMap<&'static str, ProviderData>,
        seed: Option<&SpeciesRecord>,
    ) -> (SpeciesRecord, Option<String>) {
        let mut record = SpeciesRecord::new(canonical);

        for (id, data) in results {
            record.source_providers.insert((*id).to_string());
            if let Some(external_id) = &data.external_id {
                record
                    .external_ids
                    .insert((*id).to_string(), external_id.clone());
            }
        }

        record.photo_url = PHOTO_PRIORITY
            .iter()
            .find_map(|id| results.get(*id).and_then(|d| d.photo_url.clone()))
            .or_else(|| seed.and_then(|s| s.photo_url.clone()));

        let taxonomy = results.get(PROVIDER_INATURALIST);
        let wiki = results.get(PROVIDER_ANTWIKI);
        let catalog = results.get(PROVIDER_ANTONTOP);

        record.common_name = taxonomy.and_then(|d| d.common_name.clone());
        record.wiki_url = wiki.and_then(|d| d.page_url.clone());
        record.region = catalog.and_then(|d| d.region.clone());
        record.behavior = catalog.and_then(|d| d.behavior.clone());
        record.difficulty = catalog.and_then(|d| d.difficulty.clone());

        let provider_text = catalog
            .and_then(|d| d.short_text.clone())
            .or_else(|| wiki.and_then(|d| d.long_text.clone()));

        let mut fallback_text = None;
        record.description_text = match provider_text {
            Some(text) => Some(text),
            None => {
                let facts = SpeciesFacts {
                    common_name: record.common_name.clone(),
                    short_text: None,
                    long_text: None,
                    behavior: record.behavior.clone(),
                    region: record.region.clone(),
                };
                match self.descriptions.get_or_create(canonical, &facts).await {
                    DescriptionOutcome::Cached(text) | DescriptionOutcome::Generated(text) => {
                        Some(text)
                    }
                    // Never persisted; carried on the returned record only.
                    DescriptionOutcome::Fallback(text) => {
                        fallback_text = Some(text);
                        None
                    }
                }
            }
        };

        (record, fallback_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::description_errors::{DescriptionError, Result as DescResult};
    use crate::description::CompletionBackend;
    use crate::resolution::resolution_errors::ResolutionError;
    use crate::species::species_errors::Result as SpeciesResult;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MemoryStore {
        records: StdMutex<Vec<SpeciesRecord>>,
    }

    impl SpeciesRepositoryTrait for MemoryStore {
        fn get_by_name(&self, name: &str) -> SpeciesResult<Option<SpeciesRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.scientific_name == name)
                .cloned())
        }

        fn get_all(&self) -> SpeciesResult<Vec<SpeciesRecord>> {
            Ok(self.records.lock().unwrap().clone())
        }

        fn upsert(&self, record: &SpeciesRecord) -> SpeciesResult<SpeciesRecord> {
            let mut records = self.records.lock().unwrap();
            if let Some(existing) = records
                .iter_mut()
                .find(|r| r.scientific_name == record.scientific_name)
            {
                existing.merge_from(record);
                return Ok(existing.clone());
            }
            records.push(record.clone());
            Ok(record.clone())
        }

        fn save_description(
            &self,
            name: &str,
            description: &str,
            generated_at: DateTime<Utc>,
        ) -> SpeciesResult<SpeciesRecord> {
            let mut records = self.records.lock().unwrap();
            if let Some(existing) = records.iter_mut().find(|r| r.scientific_name == name) {
                existing.description_text = Some(description.to_string());
                existing.description_generated_at = Some(generated_at);
                return Ok(existing.clone());
            }
            let mut record = SpeciesRecord::new(name);
            record.description_text = Some(description.to_string());
            record.description_generated_at = Some(generated_at);
            records.push(record.clone());
            Ok(record)
        }
    }

    struct StubProvider {
        id: &'static str,
        data: Option<ProviderData>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn with_data(id: &'static str, data: ProviderData) -> Arc<Self> {
            Arc::new(Self {
                id,
                data: Some(data),
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn empty(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                data: None,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                data: None,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SpeciesProvider for StubProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn fetch(&self, _scientific_name: &str) -> Result<Option<ProviderData>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ResolutionError::Provider("stub outage".to_string()));
            }
            Ok(self.data.clone())
        }
    }

    struct StubBackend {
        response: DescResult<String>,
        calls: AtomicUsize,
    }

    impl StubBackend {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(DescriptionError::Backend("boom".to_string())),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(&self, _system: &str, _user: &str) -> DescResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(t) => Ok(t.clone()),
                Err(_) => Err(DescriptionError::Backend("boom".to_string())),
            }
        }
    }

    fn service(
        store: Arc<MemoryStore>,
        providers: Vec<Arc<dyn SpeciesProvider>>,
        backend: Arc<StubBackend>,
    ) -> ResolutionService {
        let descriptions = Arc::new(DescriptionService::new(store.clone(), backend));
        ResolutionService::new(store, providers, descriptions)
    }

    fn taxonomy_data() -> ProviderData {
        ProviderData {
            external_id: Some("123".to_string()),
            photo_url: Some("http://inat/photo.jpg".to_string()),
            common_name: Some("Black garden ant".to_string()),
            observations: Some(4567),
            ..Default::default()
        }
    }

    fn wiki_data() -> ProviderData {
        ProviderData {
            photo_url: Some("http://antwiki/photo.jpg".to_string()),
            long_text: Some("A very common European ant.".to_string()),
            page_url: Some("https://www.antwiki.org/wiki/Lasius_niger".to_string()),
            ..Default::default()
        }
    }

    fn catalog_data() -> ProviderData {
        ProviderData {
            photo_url: Some("http://antontop/photo.jpg".to_string()),
            short_text: Some("Great starter species.".to_string()),
            region: Some("Europe".to_string()),
            behavior: Some("Monogynous".to_string()),
            difficulty: Some("Beginner".to_string()),
            ..Default::default()
        }
    }

    fn unwrap_resolved(resolution: Resolution) -> SpeciesRecord {
        match resolution {
            Resolution::Resolved(record) => record,
            Resolution::NotFound => panic!("expected a resolved record"),
        }
    }

    #[tokio::test]
    async fn merges_all_providers_under_fixed_priority() {
        let store = Arc::new(MemoryStore::default());
        let backend = StubBackend::ok("generated");
        let service = service(
            store.clone(),
            vec![
                StubProvider::with_data(PROVIDER_ANTWIKI, wiki_data()),
                StubProvider::with_data(PROVIDER_ANTONTOP, catalog_data()),
                StubProvider::with_data(PROVIDER_INATURALIST, taxonomy_data()),
            ],
            backend.clone(),
        );

        let record = unwrap_resolved(service.resolve("lasius   NIGER").await.unwrap());

        assert_eq!(record.scientific_name, "Lasius niger");
        // Taxonomy photo outranks the other two regardless of declaration order.
        assert_eq!(record.photo_url.as_deref(), Some("http://inat/photo.jpg"));
        assert_eq!(record.common_name.as_deref(), Some("Black garden ant"));
        assert_eq!(record.region.as_deref(), Some("Europe"));
        assert_eq!(record.behavior.as_deref(), Some("Monogynous"));
        assert_eq!(record.difficulty.as_deref(), Some("Beginner"));
        assert_eq!(
            record.wiki_url.as_deref(),
            Some("https://www.antwiki.org/wiki/Lasius_niger")
        );
        assert_eq!(
            record.description_text.as_deref(),
            Some("Great starter species.")
        );
        assert_eq!(record.external_ids["inaturalist"], "123");
        assert_eq!(record.source_providers.len(), 3);
        // Provider text was available, so no completion was spent.
        assert_eq!(backend.calls(), 0);

        let stored = store.get_by_name("Lasius niger").unwrap().unwrap();
        assert_eq!(stored.photo_url, record.photo_url);
    }

    #[tokio::test]
    async fn second_resolution_is_served_from_the_store() {
        let store = Arc::new(MemoryStore::default());
        let taxonomy = StubProvider::with_data(PROVIDER_INATURALIST, taxonomy_data());
        let service = service(
            store,
            vec![taxonomy.clone()],
            StubBackend::ok("generated"),
        );

        let first = unwrap_resolved(service.resolve("Lasius niger").await.unwrap());
        let second = unwrap_resolved(service.resolve("  lasius niger ").await.unwrap());

        assert_eq!(taxonomy.calls(), 1);
        assert_eq!(first.scientific_name, second.scientific_name);
        assert_eq!(first.photo_url, second.photo_url);
    }

    #[tokio::test]
    async fn failing_provider_is_absorbed_not_fatal() {
        let store = Arc::new(MemoryStore::default());
        let service = service(
            store,
            vec![
                StubProvider::failing(PROVIDER_INATURALIST),
                StubProvider::with_data(PROVIDER_ANTWIKI, wiki_data()),
            ],
            StubBackend::ok("generated"),
        );

        let record = unwrap_resolved(service.resolve("Lasius niger").await.unwrap());
        assert_eq!(
            record.photo_url.as_deref(),
            Some("http://antwiki/photo.jpg")
        );
        assert!(record.source_providers.contains("antwiki"));
        assert!(!record.source_providers.contains("inaturalist"));
    }

    #[tokio::test]
    async fn all_providers_empty_means_not_found_and_nothing_stored() {
        let store = Arc::new(MemoryStore::default());
        let backend = StubBackend::ok("generated");
        let service = service(
            store.clone(),
            vec![
                StubProvider::empty(PROVIDER_INATURALIST),
                StubProvider::failing(PROVIDER_ANTWIKI),
            ],
            backend.clone(),
        );

        let resolution = service.resolve("Lasius niger").await.unwrap();
        assert!(matches!(resolution, Resolution::NotFound));
        assert!(store.get_all().unwrap().is_empty());
        // No provider knew the species, so no description was synthesized.
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn malformed_query_is_rejected_before_any_fetch() {
        let store = Arc::new(MemoryStore::default());
        let taxonomy = StubProvider::empty(PROVIDER_INATURALIST);
        let service = service(store, vec![taxonomy.clone()], StubBackend::ok("x"));

        let result = service.resolve("Lasius").await;
        assert!(matches!(
            result,
            Err(ResolutionError::Species(_))
        ));
        assert_eq!(taxonomy.calls(), 0);
    }

    #[tokio::test]
    async fn wiki_text_fills_in_when_catalog_has_none() {
        let store = Arc::new(MemoryStore::default());
        let backend = StubBackend::ok("generated");
        let service = service(
            store,
            vec![StubProvider::with_data(PROVIDER_ANTWIKI, wiki_data())],
            backend.clone(),
        );

        let record = unwrap_resolved(service.resolve("Lasius niger").await.unwrap());
        assert_eq!(
            record.description_text.as_deref(),
            Some("A very common European ant.")
        );
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn synthesized_description_is_persisted_with_the_record() {
        let store = Arc::new(MemoryStore::default());
        let backend = StubBackend::ok("Una hormiga fascinante.");
        let service = service(
            store.clone(),
            vec![StubProvider::with_data(
                PROVIDER_INATURALIST,
                taxonomy_data(),
            )],
            backend.clone(),
        );

        let record = unwrap_resolved(service.resolve("Lasius niger").await.unwrap());
        assert_eq!(
            record.description_text.as_deref(),
            Some("Una hormiga fascinante.")
        );
        assert_eq!(backend.calls(), 1);

        let stored = store.get_by_name("Lasius niger").unwrap().unwrap();
        assert_eq!(
            stored.description_text.as_deref(),
            Some("Una hormiga fascinante.")
        );
        assert!(stored.description_generated_at.is_some());
    }

    #[tokio::test]
    async fn fallback_description_is_returned_but_never_stored() {
        let store = Arc::new(MemoryStore::default());
        let service = service(
            store.clone(),
            vec![StubProvider::with_data(
                PROVIDER_INATURALIST,
                taxonomy_data(),
            )],
            StubBackend::failing(),
        );

        let record = unwrap_resolved(service.resolve("Lasius niger").await.unwrap());
        assert!(record.description_text.is_some());

        let stored = store.get_by_name("Lasius niger").unwrap().unwrap();
        assert!(stored.description_text.is_none());
        assert!(stored.description_generated_at.is_none());
    }

    #[tokio::test]
    async fn seed_photo_is_the_last_resort() {
        let store = Arc::new(MemoryStore::default());
        let data = ProviderData {
            external_id: Some("123".to_string()),
            ..Default::default()
        };
        let service = service(
            store,
            vec![StubProvider::with_data(PROVIDER_INATURALIST, data)],
            StubBackend::ok("generated"),
        );

        let mut seed = SpeciesRecord::new("Lasius niger");
        seed.photo_url = Some("http://seed/photo.jpg".to_string());

        let record = unwrap_resolved(
            service
                .resolve_with_seed("Lasius niger", Some(&seed))
                .await
                .unwrap(),
        );
        assert_eq!(record.photo_url.as_deref(), Some("http://seed/photo.jpg"));
    }
}
