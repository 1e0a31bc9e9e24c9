use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use url::Url;

use crate::cache::{CacheKind, PersistentCache};
use crate::config::Config;
use crate::i18n::LocaleResolver;
use crate::meta::DocumentMeta;
use crate::nav::{NavigationTree, SidebarState};
use crate::news::{post_filter, ContentFetcher, FeedCard};
use crate::router::{
    path_from_state, state_from_path, AdminRouter, AdminTab, History, ProfileRef, RouteContext,
    View, ViewState,
};
use crate::storage::{
    Database, Interaction, NavNode, NewsItem, PostFilter, Session, SiteSettings, Story,
    UserProfile,
};

// ============================================================================
// Event Types
// ============================================================================

/// Results of background work, delivered back to the [`App`] over its channel.
#[derive(Debug)]
pub enum AppEvent {
    /// A news list finished loading.
    ///
    /// Fields:
    /// - `generation`: `news_generation` when the load was spawned
    /// - `category`: category token the list was requested for
    /// - `result`: posts, or the error message
    NewsLoaded {
        generation: u64,
        category: Option<String>,
        result: Result<Vec<NewsItem>, String>,
    },
    /// A single article finished loading for the detail view.
    NewsItemLoaded {
        generation: u64,
        id: String,
        result: Result<Option<NewsItem>, String>,
    },
    /// Site settings were saved; carries the full payload and its language.
    SettingsUpdated(SiteSettings),
    InteractionToggled {
        post_id: String,
        kind: Interaction,
        active: bool,
    },
}

// ============================================================================
// App
// ============================================================================

/// Portal controller: owns view state, fetched collections and the injected
/// cache, and is the only place that writes browser history.
pub struct App {
    pub config: Config,
    pub db: Database,
    site_url: Url,

    /// Persistent read-through cache, namespaced by `language`.
    pub cache: PersistentCache,
    pub locale: LocaleResolver,
    pub language: String,
    pub admin_router: AdminRouter,
    pub fetcher: ContentFetcher,

    // Navigation
    pub nav: NavigationTree,
    pub sidebar: SidebarState,
    /// Last selected root category, mirrored to the cache.
    pub sticky_category: Option<String>,

    // Routing
    pub state: ViewState,
    pub history: History,

    // Fetched data
    pub news: Vec<NewsItem>,
    /// Category the list in `news` belongs to. Outer `None`: no list yet.
    pub listed_category: Option<Option<String>>,
    pub settings: Option<SiteSettings>,
    pub stories: Vec<Story>,
    pub session: Option<Session>,
    pub meta: Option<DocumentMeta>,

    /// False until boot has settled, whether or not its fetches succeeded.
    pub ready: bool,

    /// Generation counter for news list loads.
    ///
    /// Incremented each time a list load is spawned. A `NewsLoaded` event
    /// whose generation differs is stale and dropped, so a slow earlier
    /// category fetch never overwrites a newer one.
    pub news_generation: u64,
    /// Same as `news_generation`, for single-article loads.
    pub detail_generation: u64,

    event_tx: mpsc::Sender<AppEvent>,
}

impl App {
    pub fn new(
        config: Config,
        db: Database,
        mut cache: PersistentCache,
        locale: LocaleResolver,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Result<Self> {
        let site_url = Url::parse(&config.site_url)
            .with_context(|| format!("Invalid site_url '{}'", config.site_url))?;
        let language = config.default_language.clone();
        cache.set_language(&language);
        let admin_router = AdminRouter::new(&locale, &language);
        let fetcher = ContentFetcher::new(db.clone(), config.page_size);

        Ok(Self {
            config,
            db,
            site_url,
            cache,
            locale,
            language,
            admin_router,
            fetcher,
            nav: NavigationTree::default(),
            sidebar: SidebarState::new(),
            sticky_category: None,
            state: ViewState::default(),
            history: History::new("/"),
            news: Vec::new(),
            listed_category: None,
            settings: None,
            stories: Vec::new(),
            session: None,
            meta: None,
            ready: false,
            news_generation: 0,
            detail_generation: 0,
            event_tx,
        })
    }

    // ========================================================================
    // Boot
    // ========================================================================

    /// Bring the portal up for `initial_path`.
    ///
    /// 1. Seed navigation, settings, stories, sticky category and the news
    ///    list from the cache so something renders immediately.
    /// 2. Fetch session, navigation, settings and stories concurrently.
    /// 3. Once all four settle, resolve the route against the fresh tree and
    ///    fetch posts, which need the tree to expand category filters.
    ///
    /// Every failed fetch is logged and leaves the cached data in place.
    /// `ready` is set at the end regardless.
    pub async fn boot(&mut self, initial_path: &str) {
        let started = Instant::now();
        self.ready = false;
        self.seed_from_cache(initial_path);

        let now = chrono::Utc::now().timestamp();
        let language = self.language.clone();
        let (session, navigation, settings, stories) = tokio::join!(
            self.db.current_session(now),
            self.db.get_navigation(&language),
            self.db.get_site_settings(&language),
            self.db.get_stories(&language, now),
        );

        match session {
            Ok(session) => self.session = session,
            Err(e) => tracing::warn!(error = %e, "Failed to fetch session"),
        }
        match navigation {
            Ok(nodes) => {
                self.cache.set(&CacheKind::Navigation, &nodes).await;
                self.nav = NavigationTree::new(nodes);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to fetch navigation"),
        }
        match settings {
            Ok(Some(settings)) => {
                self.cache.set(&CacheKind::SiteSettings, &settings).await;
                self.settings = Some(settings);
            }
            Ok(None) => tracing::debug!(language = %language, "No site settings stored"),
            Err(e) => tracing::warn!(error = %e, "Failed to fetch site settings"),
        }
        match stories {
            Ok(stories) => {
                self.cache.set(&CacheKind::Stories, &stories).await;
                self.stories = stories;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to fetch stories"),
        }

        // Phase two
        let state = state_from_path(initial_path, &self.route_context());
        let canonical = path_from_state(&state, &self.route_context());
        self.history.replace(&canonical);
        self.set_state(state);
        self.remember_selected_root().await;

        self.news_generation += 1;
        self.detail_generation += 1;
        self.load_news_now().await;
        if let Some(id) = self.missing_detail_id() {
            self.load_detail_now(&id).await;
        }
        if let Some(id) = self.shown_article_id() {
            if let Err(e) = self.db.record_view(&id).await {
                tracing::warn!(error = %e, id = %id, "Failed to record article view");
            }
        }

        self.ready = true;
        self.refresh_meta();
        tracing::info!(
            path = %self.history.current(),
            news = self.news.len(),
            nav_nodes = self.nav.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Boot complete"
        );
    }

    fn seed_from_cache(&mut self, initial_path: &str) {
        if let Some(nodes) = self.cache.get::<Vec<NavNode>>(&CacheKind::Navigation) {
            self.nav = NavigationTree::new(nodes);
        }
        if let Some(settings) = self.cache.get::<SiteSettings>(&CacheKind::SiteSettings) {
            self.settings = Some(settings);
        }
        if let Some(stories) = self.cache.get::<Vec<Story>>(&CacheKind::Stories) {
            self.stories = stories;
        }
        self.sticky_category = self.cache.get::<String>(&CacheKind::LastSelectedCategory);

        let state = state_from_path(initial_path, &self.route_context());
        let category = state.selected_category.clone();
        match self.cache.get::<Vec<NewsItem>>(&CacheKind::News(category.clone())) {
            Some(items) => {
                self.news = items;
                self.listed_category = Some(category);
            }
            None => tracing::debug!(category = ?category, "No cached news"),
        }
        self.set_state(state);
    }

    /// Switch language and boot again at the current path.
    pub async fn switch_language(&mut self, language: &str) {
        if language == self.language {
            return;
        }
        self.language = language.to_string();
        self.cache.set_language(language);
        self.admin_router = AdminRouter::new(&self.locale, language);
        self.nav = NavigationTree::default();
        self.settings = None;
        self.stories.clear();
        self.news.clear();
        self.listed_category = None;
        let path = self.history.current().to_string();
        self.boot(&path).await;
    }

    // ========================================================================
    // Routing
    // ========================================================================

    pub fn route_context(&self) -> RouteContext<'_> {
        RouteContext {
            tree: &self.nav,
            admin: &self.admin_router,
            sticky_category: self.sticky_category.as_deref(),
            session: self.session.as_ref(),
        }
    }

    /// Canonical path of the current state.
    pub fn current_path(&self) -> String {
        path_from_state(&self.state, &self.route_context())
    }

    fn set_state(&mut self, state: ViewState) {
        if let Some(category) = state.selected_category.as_deref() {
            self.sidebar.reveal(&self.nav, category);
        }
        self.state = state;
    }

    /// Programmatic navigation: apply `next` and push its path if it changed.
    pub async fn navigate(&mut self, next: ViewState) {
        let path = path_from_state(&next, &self.route_context());
        if self.history.push(&path) {
            tracing::debug!(path = %path, "History push");
        }
        self.apply_route(next).await;
    }

    /// Browser back/forward: re-resolve `path` and fetch what the new state needs.
    pub async fn on_popstate(&mut self, path: &str) {
        let next = state_from_path(path, &self.route_context());
        self.apply_route(next).await;
    }

    pub async fn go_back(&mut self) -> bool {
        match self.history.back().map(str::to_string) {
            Some(path) => {
                self.on_popstate(&path).await;
                true
            }
            None => false,
        }
    }

    pub async fn go_forward(&mut self) -> bool {
        match self.history.forward().map(str::to_string) {
            Some(path) => {
                self.on_popstate(&path).await;
                true
            }
            None => false,
        }
    }

    /// Shared tail of programmatic and popstate navigation.
    async fn apply_route(&mut self, next: ViewState) {
        self.set_state(next);
        self.remember_selected_root().await;

        if self.state.view == View::Feed
            && self.listed_category.as_ref() != Some(&self.state.selected_category)
        {
            self.spawn_news_load();
        }
        if let Some(id) = self.missing_detail_id() {
            self.spawn_detail_load(id);
        } else if let Some(id) = self.shown_article_id() {
            self.spawn_view_record(id);
        }
        self.refresh_meta();
    }

    /// A root category on the feed is addressed by `/`, which only resolves
    /// back to it through the sticky category.
    async fn remember_selected_root(&mut self) {
        if self.state.view != View::Feed {
            return;
        }
        let Some(category) = self.state.selected_category.clone() else {
            return;
        };
        if self.nav.is_root_category(&category)
            && self.sticky_category.as_deref() != Some(category.as_str())
        {
            self.remember_root(Some(category)).await;
        }
    }

    /// Category click handler.
    ///
    /// - `None`/`home`: global home; the sticky category is forgotten.
    /// - Re-clicking the selected root category: global home, sticky forgotten.
    /// - Re-clicking a selected non-root item: back to its root category, or
    ///   the sticky category when it has no usable root.
    /// - Selecting a new root category: it becomes the sticky category.
    pub async fn select_category(&mut self, token: Option<&str>) {
        let token = token.filter(|t| !t.is_empty() && *t != crate::news::HOME_TOKEN);
        let reclick = self.state.view == View::Feed
            && token.is_some()
            && self.state.selected_category.as_deref() == token;

        let next = match token {
            None => {
                self.remember_root(None).await;
                None
            }
            Some(t) if reclick && self.nav.is_root_category(t) => {
                self.remember_root(None).await;
                None
            }
            Some(t) if reclick => {
                let root = self
                    .nav
                    .root_of(t)
                    .filter(|r| self.nav.is_root_category(r.selector()) && r.selector() != t)
                    .map(|r| r.selector().to_string())
                    .or_else(|| self.sticky_category.clone());
                if root.is_some() {
                    self.remember_root(root.clone()).await;
                }
                root
            }
            Some(t) => {
                if self.nav.is_root_category(t) {
                    self.remember_root(Some(t.to_string())).await;
                }
                Some(t.to_string())
            }
        };

        tracing::debug!(token = ?token, selected = ?next, "Category selected");
        self.navigate(ViewState::feed(next)).await;
    }

    async fn remember_root(&mut self, category: Option<String>) {
        match &category {
            Some(c) => {
                self.cache.set(&CacheKind::LastSelectedCategory, c).await;
            }
            None => self.cache.invalidate(&CacheKind::LastSelectedCategory).await,
        }
        self.sticky_category = category;
    }

    pub async fn open_article(&mut self, id_or_slug: &str) {
        self.navigate(ViewState::detail(id_or_slug)).await;
    }

    pub async fn open_view(&mut self, view: View) {
        self.navigate(ViewState::plain(view)).await;
    }

    pub async fn open_admin(&mut self, tab: AdminTab, entity_id: Option<&str>) {
        self.navigate(ViewState::admin(tab, entity_id.map(str::to_string)))
            .await;
    }

    pub async fn open_profile(&mut self, profile: ProfileRef) {
        self.navigate(ViewState::user(profile)).await;
    }

    pub async fn open_own_profile(&mut self) {
        self.navigate(ViewState {
            view: View::UserDetail,
            profile: self
                .session
                .as_ref()
                .map(|s| ProfileRef::ById(s.user_id.clone())),
            own_profile: true,
            ..Default::default()
        })
        .await;
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    fn current_filter(&self) -> PostFilter {
        post_filter(
            self.state.selected_category.as_deref(),
            &self.nav,
            chrono::Utc::now().timestamp(),
            self.config.trend_window_days,
        )
    }

    /// Article the detail view shows, if it is in the list.
    pub fn current_article(&self) -> Option<&NewsItem> {
        let id = self.state.selected_news_id.as_deref()?;
        self.news
            .iter()
            .find(|n| n.id == id || n.slug.as_deref() == Some(id))
    }

    /// Feed cards for the current list, homepage blocks applied.
    pub fn feed_cards(&self) -> Vec<FeedCard> {
        self.news.iter().map(FeedCard::from_item).collect()
    }

    /// Id of the article the detail view is showing, once it is in the list.
    fn shown_article_id(&self) -> Option<String> {
        if self.state.view != View::Detail {
            return None;
        }
        self.current_article().map(|a| a.id.clone())
    }

    fn missing_detail_id(&self) -> Option<String> {
        if self.state.view != View::Detail || self.current_article().is_some() {
            return None;
        }
        self.state.selected_news_id.clone()
    }

    async fn load_news_now(&mut self) {
        let category = self.state.selected_category.clone();
        let filter = self.current_filter();
        let result = self
            .fetcher
            .list(&self.language, &filter, self.session.as_ref())
            .await;
        match result {
            Ok(items) => self.apply_news(category, items).await,
            Err(e) => {
                tracing::warn!(error = %e, category = ?category, "Failed to fetch news");
            }
        }
    }

    async fn load_detail_now(&mut self, id: &str) {
        let result = self.fetcher.single(id, self.session.as_ref()).await;
        match result {
            Ok(Some(item)) => self.apply_detail(item),
            Ok(None) => tracing::debug!(id = %id, "Article not found"),
            Err(e) => tracing::warn!(error = %e, id = %id, "Failed to fetch article"),
        }
    }

    pub(crate) async fn apply_news(&mut self, category: Option<String>, items: Vec<NewsItem>) {
        self.cache
            .set(&CacheKind::News(category.clone()), &items)
            .await;
        self.news = items;
        self.listed_category = Some(category);
    }

    /// Prepend a fetched article unless the list already has it.
    pub(crate) fn apply_detail(&mut self, item: NewsItem) {
        if !self.news.iter().any(|n| n.id == item.id) {
            self.news.insert(0, item);
        }
    }

    /// Spawn a list load for the selected category, superseding any in flight.
    fn spawn_news_load(&mut self) {
        self.news_generation += 1;
        let generation = self.news_generation;
        let category = self.state.selected_category.clone();
        let filter = self.current_filter();
        let fetcher = self.fetcher.clone();
        let session = self.session.clone();
        let language = self.language.clone();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = fetcher
                .list(&language, &filter, session.as_ref())
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, category = ?category, "Failed to fetch news");
                    e.to_string()
                });
            if let Err(e) = tx
                .send(AppEvent::NewsLoaded {
                    generation,
                    category,
                    result,
                })
                .await
            {
                tracing::warn!(error = %e, event = "NewsLoaded", "Channel send failed (receiver dropped)");
            }
        });
    }

    fn spawn_detail_load(&mut self, id: String) {
        self.detail_generation += 1;
        let generation = self.detail_generation;
        let fetcher = self.fetcher.clone();
        let session = self.session.clone();
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            let result = fetcher.single(&id, session.as_ref()).await.map_err(|e| {
                tracing::warn!(error = %e, id = %id, "Failed to fetch article");
                e.to_string()
            });
            if let Err(e) = tx
                .send(AppEvent::NewsItemLoaded {
                    generation,
                    id,
                    result,
                })
                .await
            {
                tracing::warn!(error = %e, event = "NewsItemLoaded", "Channel send failed (receiver dropped)");
            }
        });
    }

    /// Count a read of `post_id` in the background.
    pub(crate) fn spawn_view_record(&self, post_id: String) {
        let db = self.db.clone();
        tokio::spawn(async move {
            if let Err(e) = db.record_view(&post_id).await {
                tracing::warn!(error = %e, id = %post_id, "Failed to record article view");
            }
        });
    }

    /// Toggle like/save on a post for the session user.
    ///
    /// Returns false without doing anything when nobody is signed in.
    pub fn toggle_interaction(&mut self, post_id: &str, kind: Interaction) -> bool {
        let Some(session) = self.session.clone() else {
            tracing::debug!(post = %post_id, "Interaction ignored, no session");
            return false;
        };
        let fetcher = self.fetcher.clone();
        let tx = self.event_tx.clone();
        let post_id = post_id.to_string();

        tokio::spawn(async move {
            match fetcher.toggle(&session, &post_id, kind).await {
                Ok(active) => {
                    if let Err(e) = tx
                        .send(AppEvent::InteractionToggled {
                            post_id,
                            kind,
                            active,
                        })
                        .await
                    {
                        tracing::warn!(error = %e, event = "InteractionToggled", "Channel send failed (receiver dropped)");
                    }
                }
                Err(e) => tracing::warn!(error = %e, post = %post_id, "Failed to toggle interaction"),
            }
        });
        true
    }

    /// Resolve the profile shown by the user-detail view.
    pub async fn load_profile(&self) -> Result<Option<UserProfile>> {
        match &self.state.profile {
            Some(ProfileRef::ById(id)) => self.db.get_profile(id).await,
            Some(ProfileRef::ByName(name)) => self.db.find_profile_by_name(name).await,
            None => Ok(None),
        }
    }

    /// Refetch navigation after a menu-builder change.
    pub async fn reload_navigation(&mut self) -> Result<()> {
        let nodes = self.db.get_navigation(&self.language).await?;
        self.cache.set(&CacheKind::Navigation, &nodes).await;
        self.nav = NavigationTree::new(nodes);
        Ok(())
    }

    // ========================================================================
    // Settings and Locale
    // ========================================================================

    /// Persist settings and broadcast them to every consumer of this channel.
    pub async fn save_settings(&self, settings: SiteSettings) -> Result<()> {
        self.db.save_site_settings(&settings).await?;
        self.event_tx
            .send(AppEvent::SettingsUpdated(settings))
            .await
            .context("Settings broadcast failed")?;
        Ok(())
    }

    pub(crate) fn refresh_meta(&mut self) {
        self.meta = self.settings.as_ref().map(|settings| {
            let path = path_from_state(&self.state, &self.route_context());
            let article = (self.state.view == View::Detail)
                .then(|| self.current_article())
                .flatten();
            DocumentMeta::build(settings, &self.site_url, &path, article)
        });
    }

    /// Import a JSON language pack, persist it and rebuild localized slugs.
    ///
    /// Returns the number of keys in the stored overlay.
    pub async fn import_language_pack(&mut self, language: &str, json: &str) -> Result<usize> {
        let overlay = self.locale.import_pack(language, json)?;
        self.db.save_language_pack(language, &overlay).await?;
        if language == self.language {
            self.admin_router = AdminRouter::new(&self.locale, language);
        }
        Ok(overlay.len())
    }

    /// Write the merged table for `language` to `path` atomically.
    pub fn export_language_pack(&self, language: &str, path: &std::path::Path) -> Result<()> {
        let json = self.locale.export_pack(language)?;
        crate::util::atomic_write(path, json.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Translate `key` in the current language.
    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        self.locale.t(&self.language, key)
    }
}
