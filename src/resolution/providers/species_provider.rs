use async_trait::async_trait;

use crate::resolution::resolution_errors::Result;

use super::models::ProviderData;

/// An external, independently failing data source queried over the network
/// for specific fields about a species.
///
/// `fetch` performs one bounded-timeout call. `Ok(None)` means the source has
/// no data for the name; errors are absorbed by the resolver and contribute
/// the same "no data" to the merge, so a failing provider never aborts a
/// resolution.
#[async_trait]
pub trait SpeciesProvider: Send + Sync {
    /// Stable identifier, used as the key in `external_ids`,
    /// `source_providers` and the merge priority lists.
    fn id(&self) -> &'static str;

    async fn fetch(&self, scientific_name: &str) -> Result<Option<ProviderData>>;
}
