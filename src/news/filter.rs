use crate::nav::NavigationTree;
use crate::storage::{PostFilter, TrendMetric};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Token meaning "no category": the global home feed.
pub const HOME_TOKEN: &str = "home";

/// Trend tokens and the metric each ranks by.
pub const TREND_TOKENS: &[(&str, TrendMetric)] = &[
    ("weekly_trends", TrendMetric::Overall),
    ("weekly_likes", TrendMetric::Likes),
    ("weekly_comments", TrendMetric::Comments),
    ("weekly_shares", TrendMetric::Shares),
    ("weekly_reads", TrendMetric::Reads),
];

/// The trend metric a token selects, if it is one of the `weekly_*` tokens.
pub fn trend_metric(token: &str) -> Option<TrendMetric> {
    TREND_TOKENS
        .iter()
        .find(|(t, _)| *t == token)
        .map(|(_, metric)| *metric)
}

pub fn is_trend_token(token: &str) -> bool {
    trend_metric(token).is_some()
}

/// Convert a selected category token into a post query predicate.
///
/// - `None`, empty and `home` select everything.
/// - `weekly_*` tokens bypass the tree and select posts published in the
///   last `window_days` days, ranked by the token's metric.
/// - Anything else expands through the navigation tree to the token plus
///   every descendant label and value.
pub fn post_filter(
    token: Option<&str>,
    tree: &NavigationTree,
    now: i64,
    window_days: i64,
) -> PostFilter {
    let token = match token.map(str::trim) {
        None | Some("") | Some(HOME_TOKEN) => return PostFilter::All,
        Some(t) => t,
    };

    if let Some(metric) = trend_metric(token) {
        let since = window_days
            .max(0)
            .checked_mul(SECONDS_PER_DAY)
            .map_or(i64::MIN, |window| now.saturating_sub(window));
        return PostFilter::Trending { since, metric };
    }

    PostFilter::Categories(tree.filter_values(token))
}
