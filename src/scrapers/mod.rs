use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;
use crate::models::Listing;

mod buyee;

pub use buyee::BuyeeScraper;

/// Source of search results for a keyword.
///
/// A call returns one snapshot of the result page. An error covers only that
/// keyword; the caller counts it as zero listings and moves on.
#[async_trait]
pub trait ListingFetcher: Send + Sync {
    async fn fetch(&self, client: &Client, keyword: &str) -> Result<Vec<Listing>, FetchError>;
}
