use html_escape::encode_text;

use crate::models::{Listing, EMOJI_CHECK, EMOJI_SEARCH, EMOJI_STOPPED};

const MAX_TITLE_CHARS: usize = 200;

pub const STOPPED_MESSAGE: &str = "Mercari bot has stopped.";

pub fn stopped_message() -> String {
    format!("{} {}", EMOJI_STOPPED, STOPPED_MESSAGE)
}

/// Photo caption for a new listing, in Telegram HTML.
pub fn listing_caption(listing: &Listing, price_display: &str, timestamp: &str) -> String {
    format!(
        "<b>{}</b>\nPrice: {}\nTime: {}\n{}",
        encode_text(&truncate(&listing.title, MAX_TITLE_CHARS)),
        encode_text(price_display),
        timestamp,
        encode_text(&listing.item_url)
    )
}

pub fn keyword_header(label: &str) -> String {
    format!(
        "{} Found new listings for: <b>{}</b>...",
        EMOJI_SEARCH,
        encode_text(label)
    )
}

pub fn keyword_footer(label: &str, count: usize) -> String {
    format!(
        "{} Done! Found <b>{}</b> new {} for <b>{}</b>.",
        EMOJI_CHECK,
        count,
        plural_items(count),
        encode_text(label)
    )
}

pub fn plural_items(count: usize) -> &'static str {
    if count == 1 {
        "item"
    } else {
        "items"
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
