pub mod listing;

pub use listing::*;

// Emoji used in Telegram messages
pub const EMOJI_SEARCH: &str = "🔍";
pub const EMOJI_CHECK: &str = "✅";
pub const EMOJI_SUMMARY: &str = "📊";
pub const EMOJI_BULLET: &str = "•";
pub const EMOJI_STOPPED: &str = "🔴";
