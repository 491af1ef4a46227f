pub mod species_errors;
pub mod species_model;
pub mod species_repository;
pub mod species_traits;

pub use species_errors::SpeciesError;
pub use species_model::{normalize_scientific_name, SpeciesRecord};
pub use species_repository::SpeciesRepository;
pub use species_traits::SpeciesRepositoryTrait;
