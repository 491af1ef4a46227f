use thiserror::Error;

use crate::species::SpeciesError;

pub type Result<T> = std::result::Result<T, DescriptionError>;

#[derive(Error, Debug)]
pub enum DescriptionError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Completion backend error: {0}")]
    Backend(String),

    #[error("Completion returned no text")]
    EmptyCompletion,

    #[error("Species store error: {0}")]
    Species(#[from] SpeciesError),
}
