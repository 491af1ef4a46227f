use thiserror::Error;

use crate::errors::DatabaseError;

pub type Result<T> = std::result::Result<T, SpeciesError>;

#[derive(Error, Debug)]
pub enum SpeciesError {
    #[error("Invalid scientific name '{0}': expected at least genus and species")]
    InvalidName(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] DatabaseError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
