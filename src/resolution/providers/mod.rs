pub mod antontop_provider;
pub mod antwiki_provider;
pub mod inaturalist_provider;
pub mod models;
pub mod species_provider;

pub use antontop_provider::AntontopProvider;
pub use antwiki_provider::AntwikiProvider;
pub use inaturalist_provider::InaturalistProvider;
pub use models::ProviderData;
pub use species_provider::SpeciesProvider;
