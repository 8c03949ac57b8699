//! Walmart signature debugging.
//!
//! Prints the exact header set the service would send, so a signature can
//! be compared against Walmart's own tooling.

use localstock_storefront::config::StorefrontConfig;
use localstock_storefront::retailers::signer::{SignatureSigner, timestamp_now};

/// Print the signed headers, the canonical string and the public key.
///
/// The timestamp comes from `--timestamp`, then `WALMART_INTIMESTAMP`, then
/// the clock.
///
/// # Errors
///
/// Returns an error when the consumer id or private key is missing or
/// unreadable.
pub async fn print_headers(timestamp: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let signer = SignatureSigner::from_config(&config.walmart).await?;

    let timestamp = timestamp
        .or_else(|| config.walmart.fixed_timestamp.clone())
        .unwrap_or_else(timestamp_now);
    let headers = signer.signed_headers(&timestamp)?;

    #[allow(clippy::print_stdout)]
    {
        for (name, value) in &headers {
            println!("{name}: {value}");
        }
        println!();
        println!("Canonical string (escaped): {:?}", signer.canonical_string(&timestamp));
        println!();
        print!("{}", signer.public_key_pem()?);
    }
    Ok(())
}
