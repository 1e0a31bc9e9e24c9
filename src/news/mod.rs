//! Content fetchers: category/trend filters, enriched post queries and
//! feed-card projection.

mod card;
mod fetch;
mod filter;

pub use card::{CardType, FeedCard};
pub use fetch::ContentFetcher;
pub use filter::{is_trend_token, post_filter, trend_metric, HOME_TOKEN, TREND_TOKENS};
