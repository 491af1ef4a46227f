pub mod completion_backend;
pub mod description_errors;
pub mod description_service;

pub use completion_backend::{CompletionBackend, CompletionConfig, OpenAiBackend};
pub use description_errors::DescriptionError;
pub use description_service::{
    DescriptionOutcome, DescriptionService, SpeciesFacts, DESCRIPTION_TTL_DAYS,
};
