//! Ad-hoc unified search.

use localstock_core::{PostalCode, SearchRequest};
use localstock_storefront::config::StorefrontConfig;
use localstock_storefront::state::AppState;

/// Run one unified search with the environment configuration and print
/// `{ products, errors }` as pretty JSON.
///
/// # Errors
///
/// Returns an error for bad configuration, a blank query or malformed zip.
/// Retailer failures are reported inside the printed `errors` list.
pub async fn run(
    query: &str,
    zip: Option<&str>,
    page: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let postal_code = zip.map(PostalCode::parse).transpose()?;
    let request = SearchRequest::new(query, postal_code, page)?;

    let state = AppState::build(config).await?;
    let results = state.aggregator().search(&request).await;

    if !results.errors.is_empty() {
        tracing::warn!(failed = results.errors.len(), "some retailers failed");
    }

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
