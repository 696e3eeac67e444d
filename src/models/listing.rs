use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::SeenItemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Jpy,
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Jpy => write!(f, "JPY"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub amount: f64,
    pub currency: Currency,
}

impl Price {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }
}

/// One search result card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Marketplace item id, the last path segment of `item_url`.
    pub id: String,
    pub title: String,
    pub price: Price,
    /// Price exactly as shown on the page.
    pub price_text: String,
    pub image_url: Option<String>,
    pub item_url: String,
    pub keyword: String,
}

impl Listing {
    /// De-duplication key: md5 of the lowercased title plus the image URL
    /// (the item URL when there is no image).
    pub fn signature(&self) -> SeenItemId {
        use md5::Context;

        let mut hasher = Context::new();
        hasher.consume(self.title.to_lowercase().as_bytes());
        hasher.consume(self.image_url.as_deref().unwrap_or(&self.item_url).as_bytes());
        format!("{:x}", hasher.compute())
    }
}

/// Item id from a listing URL: last path segment without the query string.
pub fn item_id_from_url(url: &str) -> String {
    let without_query = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
