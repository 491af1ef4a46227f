use thiserror::Error;

use crate::species::SpeciesError;

pub type Result<T> = std::result::Result<T, ResolutionError>;

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error("Species store error: {0}")]
    Species(#[from] SpeciesError),
}
