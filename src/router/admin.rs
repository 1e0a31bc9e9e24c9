use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::i18n::LocaleResolver;
use crate::util::slugify;

/// Admin dashboard sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminTab {
    Overview,
    NewsList,
    AddPost,
    EditPost,
    Publishers,
    EditPublisher,
    Users,
    EditUser,
    Navigation,
    Roles,
    Languages,
    Settings,
    Stories,
}

impl AdminTab {
    pub const ALL: [AdminTab; 13] = [
        AdminTab::Overview,
        AdminTab::NewsList,
        AdminTab::AddPost,
        AdminTab::EditPost,
        AdminTab::Publishers,
        AdminTab::EditPublisher,
        AdminTab::Users,
        AdminTab::EditUser,
        AdminTab::Navigation,
        AdminTab::Roles,
        AdminTab::Languages,
        AdminTab::Settings,
        AdminTab::Stories,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            AdminTab::Overview => "overview",
            AdminTab::NewsList => "news_list",
            AdminTab::AddPost => "add_post",
            AdminTab::EditPost => "edit_post",
            AdminTab::Publishers => "publishers",
            AdminTab::EditPublisher => "edit_publisher",
            AdminTab::Users => "users",
            AdminTab::EditUser => "edit_user",
            AdminTab::Navigation => "navigation",
            AdminTab::Roles => "roles",
            AdminTab::Languages => "languages",
            AdminTab::Settings => "settings",
            AdminTab::Stories => "stories",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Edit tab a trailing entity id switches this list tab to.
    pub fn edit_tab(&self) -> Option<AdminTab> {
        match self {
            AdminTab::NewsList => Some(AdminTab::EditPost),
            AdminTab::Publishers => Some(AdminTab::EditPublisher),
            AdminTab::Users => Some(AdminTab::EditUser),
            _ => None,
        }
    }

    /// List tab whose slug the address bar shows while editing an entity.
    pub fn list_tab(&self) -> Option<AdminTab> {
        match self {
            AdminTab::EditPost => Some(AdminTab::NewsList),
            AdminTab::EditPublisher => Some(AdminTab::Publishers),
            AdminTab::EditUser => Some(AdminTab::Users),
            _ => None,
        }
    }

    /// Locale key of the tab label.
    pub fn label_key(&self) -> String {
        format!("admin.tabs.{}", self.id())
    }
}

/// `/admin/...` addressing with localized tab slugs.
///
/// Built per language. Each tab's slug is the slugified localized label;
/// when that is empty or already taken by an earlier tab, the slugified tab
/// id is used, then the raw id, then a numbered form.
#[derive(Debug, Clone)]
pub struct AdminRouter {
    slugs: Vec<(AdminTab, String)>,
}

impl AdminRouter {
    pub fn new(locale: &LocaleResolver, language: &str) -> Self {
        Self::with_labels(|tab| locale.t(language, &tab.label_key()).to_string())
    }

    pub fn with_labels<F: Fn(AdminTab) -> String>(label: F) -> Self {
        let mut used: HashSet<String> = HashSet::new();
        let mut slugs = Vec::with_capacity(AdminTab::ALL.len());

        for tab in AdminTab::ALL {
            let candidates = [slugify(&label(tab)), slugify(tab.id()), tab.id().to_string()];
            let slug = match candidates
                .into_iter()
                .find(|c| !c.is_empty() && !used.contains(c))
            {
                Some(slug) => slug,
                None => {
                    let base = slugify(tab.id());
                    let mut n = 2;
                    loop {
                        let numbered = format!("{base}-{n}");
                        if !used.contains(&numbered) {
                            break numbered;
                        }
                        n += 1;
                    }
                }
            };
            used.insert(slug.clone());
            slugs.push((tab, slug));
        }

        Self { slugs }
    }

    pub fn slug(&self, tab: AdminTab) -> &str {
        self.slugs
            .iter()
            .find(|(t, _)| *t == tab)
            .map(|(_, s)| s.as_str())
            .unwrap_or_else(|| tab.id())
    }

    /// Resolve a slug: this language's slug, then hyphenated id, then raw id.
    pub fn tab_from_slug(&self, slug: &str) -> Option<AdminTab> {
        if let Some((tab, _)) = self.slugs.iter().find(|(_, s)| s == slug) {
            return Some(*tab);
        }
        AdminTab::ALL
            .into_iter()
            .find(|t| t.id().replace('_', "-") == slug)
            .or_else(|| AdminTab::from_id(slug))
    }

    /// Parse the segments after `/admin`.
    ///
    /// Unknown slugs fall back to `Overview`. A trailing entity id on a list
    /// tab switches to its edit tab; on other tabs it is ignored.
    pub fn parse(&self, segments: &[String]) -> (AdminTab, Option<String>) {
        let Some(first) = segments.first() else {
            return (AdminTab::Overview, None);
        };
        let tab = match self.tab_from_slug(first) {
            Some(tab) => tab,
            None => {
                tracing::debug!(slug = %first, "Unknown admin tab slug, showing overview");
                return (AdminTab::Overview, None);
            }
        };
        let entity = segments.get(1).filter(|s| !s.is_empty()).cloned();

        match (entity, tab.edit_tab()) {
            (Some(id), Some(edit)) => (edit, Some(id)),
            (Some(id), None) if tab.list_tab().is_some() => (tab, Some(id)),
            _ => (tab, None),
        }
    }

    /// Path segments (after `/admin`) for a tab and optional entity id.
    pub fn segments(&self, tab: AdminTab, entity_id: Option<&str>) -> Vec<String> {
        let entity_id = entity_id.filter(|id| !id.is_empty());
        match (entity_id, tab.list_tab(), tab.edit_tab()) {
            (Some(id), Some(list), _) => vec![self.slug(list).to_string(), id.to_string()],
            (Some(id), None, Some(_)) => vec![self.slug(tab).to_string(), id.to_string()],
            _ => vec![self.slug(tab).to_string()],
        }
    }
}
