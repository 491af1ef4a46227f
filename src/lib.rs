pub mod db;

pub mod description;
pub mod errors;
pub mod resolution;
pub mod schema;
pub mod similarity;
pub mod species;

pub use description::{CompletionBackend, DescriptionOutcome, DescriptionService, SpeciesFacts};
pub use resolution::{Resolution, ResolutionService, SpeciesProvider};
pub use similarity::{SimilarityMatcher, SpeciesMatch};
pub use species::{normalize_scientific_name, SpeciesRecord, SpeciesRepository};
