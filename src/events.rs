//! Application event handling.
//!
//! Applies results of background fetches to the [`App`]. Results carrying an
//! outdated generation are discarded so the most recent navigation wins
//! regardless of completion order.

use crate::app::{App, AppEvent};
use crate::cache::CacheKind;
use crate::storage::{Interaction, NewsItem, SiteSettings};

/// Handle one event from a background task.
pub async fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::NewsLoaded {
            generation,
            category,
            result,
        } => handle_news_loaded(app, generation, category, result).await,
        AppEvent::NewsItemLoaded {
            generation,
            id,
            result,
        } => handle_news_item_loaded(app, generation, &id, result),
        AppEvent::SettingsUpdated(settings) => handle_settings_updated(app, settings).await,
        AppEvent::InteractionToggled {
            post_id,
            kind,
            active,
        } => handle_interaction_toggled(app, &post_id, kind, active),
    }
}

async fn handle_news_loaded(
    app: &mut App,
    generation: u64,
    category: Option<String>,
    result: Result<Vec<NewsItem>, String>,
) {
    if generation != app.news_generation {
        tracing::debug!(
            expected = app.news_generation,
            got = generation,
            category = ?category,
            "Ignoring stale news list (generation mismatch)"
        );
        return;
    }

    // Failures were logged by the task; keep showing what we have
    if let Ok(items) = result {
        tracing::debug!(category = ?category, count = items.len(), "News list loaded");
        app.apply_news(category, items).await;
        app.refresh_meta();
    }
}

fn handle_news_item_loaded(
    app: &mut App,
    generation: u64,
    id: &str,
    result: Result<Option<NewsItem>, String>,
) {
    if generation != app.detail_generation {
        tracing::debug!(
            expected = app.detail_generation,
            got = generation,
            id = %id,
            "Ignoring stale article load (generation mismatch)"
        );
        return;
    }

    match result {
        Ok(Some(item)) => {
            app.spawn_view_record(item.id.clone());
            app.apply_detail(item);
            app.refresh_meta();
        }
        Ok(None) => tracing::debug!(id = %id, "Article not found"),
        Err(_) => {}
    }
}

/// Update in-memory settings when the payload is for the active language,
/// and the cached settings of the payload's language only.
async fn handle_settings_updated(app: &mut App, settings: SiteSettings) {
    let language = settings.language_code.clone();
    app.cache
        .set_for_language(&CacheKind::SiteSettings, &language, &settings)
        .await;

    if language == app.language {
        tracing::debug!(language = %language, "Applying updated site settings");
        app.settings = Some(settings);
        app.refresh_meta();
    } else {
        tracing::debug!(language = %language, active = %app.language, "Cached settings for inactive language");
    }
}

fn handle_interaction_toggled(app: &mut App, post_id: &str, kind: Interaction, active: bool) {
    let Some(item) = app.news.iter_mut().find(|n| n.id == post_id) else {
        return;
    };
    match kind {
        Interaction::Like => {
            if item.liked != active {
                item.likes_count = (item.likes_count + if active { 1 } else { -1 }).max(0);
            }
            item.liked = active;
        }
        Interaction::Save => item.saved = active,
    }
}
