pub mod providers;
pub mod resolution_constants;
pub mod resolution_errors;
pub mod resolution_service;

pub use providers::models::ProviderData;
pub use providers::species_provider::SpeciesProvider;
pub use resolution_errors::ResolutionError;
pub use resolution_service::{Resolution, ResolutionService};
