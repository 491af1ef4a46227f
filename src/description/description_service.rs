use chrono::{Duration, Utc};
use dashmap::DashMap;
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::species::SpeciesRepositoryTrait;

use super::completion_backend::CompletionBackend;

/// Maximum cached age of a generated description before it is regenerated.
pub const DESCRIPTION_TTL_DAYS: i64 = 30;

/// Returned when generation fails; never persisted, so a later call retries.
const FALLBACK_DESCRIPTION: &str =
    "Información limitada disponible para esta especie por el momento.";

const DEFAULT_LANGUAGE: &str = "Spanish";

/// Facts collected from providers, used to ground the generated text.
#[derive(Debug, Clone, Default)]
pub struct SpeciesFacts {
    pub common_name: Option<String>,
    pub short_text: Option<String>,
    pub long_text: Option<String>,
    pub behavior: Option<String>,
    pub region: Option<String>,
}

/// How a description was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptionOutcome {
    /// Fresh cached text, returned verbatim; the facts were ignored.
    Cached(String),
    /// Newly generated and persisted with a fresh timestamp.
    Generated(String),
    /// Generation failed; static text, not persisted.
    Fallback(String),
}

impl DescriptionOutcome {
    pub fn text(&self) -> &str {
        match self {
            DescriptionOutcome::Cached(t)
            | DescriptionOutcome::Generated(t)
            | DescriptionOutcome::Fallback(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            DescriptionOutcome::Cached(t)
            | DescriptionOutcome::Generated(t)
            | DescriptionOutcome::Fallback(t) => t,
        }
    }
}

/// Cache-checked natural-language description synthesis.
pub struct DescriptionService {
    repository: Arc<dyn SpeciesRepositoryTrait>,
    backend: Arc<dyn CompletionBackend>,
    language: String,
    /// Per-name locks so repeated synthesis attempts for the same species
    /// never spend two completions; different names stay independent.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DescriptionService {
    pub fn new(
        repository: Arc<dyn SpeciesRepositoryTrait>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            repository,
            backend,
            language: DEFAULT_LANGUAGE.to_string(),
            locks: DashMap::new(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Returns the cached description if it is fresher than
    /// [`DESCRIPTION_TTL_DAYS`]; otherwise generates a new one from `facts`,
    /// persists it with a fresh timestamp and returns it. Never fails: on any
    /// generation problem a static fallback is returned and nothing is cached.
    pub async fn get_or_create(
        &self,
        scientific_name: &str,
        facts: &SpeciesFacts,
    ) -> DescriptionOutcome {
        let lock = self
            .locks
            .entry(scientific_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        match self.repository.get_by_name(scientific_name) {
            Ok(Some(record)) => {
                if let (Some(text), Some(generated_at)) =
                    (&record.description_text, record.description_generated_at)
                {
                    let fresh = Utc::now() - generated_at < Duration::days(DESCRIPTION_TTL_DAYS);
                    if fresh && !text.trim().is_empty() {
                        debug!("Description cache hit for '{}'", scientific_name);
                        return DescriptionOutcome::Cached(text.clone());
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Description cache lookup failed for '{}': {}. Generating anyway.",
                scientific_name, e
            ),
        }

        let system_prompt = build_system_prompt();
        let user_prompt = build_user_prompt(scientific_name, facts, &self.language);

        match self.backend.complete(&system_prompt, &user_prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                if let Err(e) =
                    self.repository
                        .save_description(scientific_name, &text, Utc::now())
                {
                    error!(
                        "Failed to cache generated description for '{}': {}",
                        scientific_name, e
                    );
                }
                DescriptionOutcome::Generated(text)
            }
            Ok(_) => {
                warn!("Empty completion for '{}', using fallback", scientific_name);
                DescriptionOutcome::Fallback(FALLBACK_DESCRIPTION.to_string())
            }
            Err(e) => {
                warn!(
                    "Description generation failed for '{}': {}. Using fallback.",
                    scientific_name, e
                );
                DescriptionOutcome::Fallback(FALLBACK_DESCRIPTION.to_string())
            }
        }
    }
}

fn build_system_prompt() -> String {
    "You are a myrmecology expert who writes brief, accurate summaries about \
     ant species. Be concise and stay within the requested character limit."
        .to_string()
}

fn build_user_prompt(scientific_name: &str, facts: &SpeciesFacts, language: &str) -> String {
    let mut known_facts = String::new();
    let mut push_fact = |label: &str, value: &Option<String>| {
        if let Some(v) = value {
            if !v.trim().is_empty() {
                known_facts.push_str(&format!("{}: {}\n", label, v.trim()));
            }
        }
    };
    push_fact("Common name", &facts.common_name);
    push_fact("Description", &facts.short_text);
    push_fact("Reference text", &facts.long_text);
    push_fact("Behavior", &facts.behavior);
    push_fact("Distribution", &facts.region);

    format!(
        "Write a BRIEF summary (600-700 characters) about the ant {name}, \
         based on the following information.\n\n\
         Available information:\n{facts}\n\
         IMPORTANT RULES:\n\
         1. COMPLETELY IGNORE any measurement, length, size or dimension data\n\
         2. PRIORITIZE social behavior, nesting habits, feeding and ecology\n\
         3. Highlight distinctive physical traits (colors, shapes, special structures)\n\
         4. Mention curious facts about its ecology or distribution\n\
         5. 600-700 characters total\n\
         6. Use at most 2 emojis\n\
         7. Write the text in {language}, popular-science style\n\
         8. If no relevant information is available, say so briefly",
        name = scientific_name,
        facts = known_facts,
        language = language,
    )
}
