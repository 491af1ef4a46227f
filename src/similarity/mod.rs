pub mod sequence_ratio;
pub mod similarity_matcher;

pub use sequence_ratio::sequence_ratio;
pub use similarity_matcher::{SimilarityMatcher, SpeciesMatch, DEFAULT_SIMILARITY_THRESHOLD};
