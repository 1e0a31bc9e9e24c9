//! URL path <-> [`ViewState`] mapping.
//!
//! Both directions are pure functions of their inputs so browser
//! back/forward and programmatic navigation produce identical state for
//! identical paths.
//!
//! | Path | View |
//! |---|---|
//! | `/` | feed (home or sticky category) |
//! | `/kategori/<value>` | feed filtered by sub-category or trend |
//! | `/kategoriler`, `/ilceler`, `/trendler` | indexes |
//! | `/haber/<id-or-slug>` | article detail |
//! | `/admin/<tab-slug>[/<entity-id>]` | admin dashboard |
//! | `/giris` | login |
//! | `/kullanicilar` | users index |
//! | `/user/<uuid-or-name>` | public profile |
//! | `/profil`, `/profile` | own profile |
//! | `/profil-duzenle`, `/profile-edit` | edit own profile |
//! | `/hikaye-editoru` | web story editor |
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::admin::{AdminRouter, AdminTab};
use super::state::{ProfileRef, View, ViewState};
use crate::nav::NavigationTree;
use crate::storage::Session;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

const NEWS: &str = "haber";
const CATEGORY: &str = "kategori";
const CATEGORIES: &str = "kategoriler";
const DISTRICTS: &str = "ilceler";
const TRENDS: &str = "trendler";
const ADMIN: &str = "admin";
const LOGIN: &str = "giris";
const USER: &str = "user";
const PROFILE: &str = "profil";
const PROFILE_ALIAS: &str = "profile";
const PROFILE_EDIT: &str = "profil-duzenle";
const PROFILE_EDIT_ALIAS: &str = "profile-edit";
const USERS: &str = "kullanicilar";
const STORY_EDITOR: &str = "hikaye-editoru";

/// Everything outside the path the mapping depends on.
#[derive(Clone, Copy)]
pub struct RouteContext<'a> {
    pub tree: &'a NavigationTree,
    pub admin: &'a AdminRouter,
    /// Last remembered root category, restored on fallback to the feed.
    pub sticky_category: Option<&'a str>,
    pub session: Option<&'a Session>,
}

/// Split a path into decoded, non-empty segments. Query and fragment are dropped.
pub fn segments(path: &str) -> Vec<String> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
        .collect()
}

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Resolve a URL path to a view state.
///
/// Unknown routes and routes missing their parameter fall back to the feed
/// with the sticky category, never to an error.
pub fn state_from_path(path: &str, ctx: &RouteContext<'_>) -> ViewState {
    let segs = segments(path);
    let Some(first) = segs.first() else {
        return fallback(ctx);
    };
    let param = segs.get(1).cloned();

    match (first.as_str(), param) {
        (NEWS, Some(id)) => ViewState::detail(&id),
        (CATEGORY, Some(value)) => ViewState::feed(Some(value)),
        (CATEGORIES, _) => ViewState::plain(View::Categories),
        (DISTRICTS, _) => ViewState::plain(View::Districts),
        (TRENDS, _) => ViewState::plain(View::Trends),
        (LOGIN, _) => ViewState::plain(View::Login),
        (USERS, _) => ViewState::plain(View::Users),
        (STORY_EDITOR, _) => ViewState::plain(View::WebStoryEditor),
        (PROFILE_EDIT | PROFILE_EDIT_ALIAS, _) => ViewState::plain(View::EditUserProfile),
        (ADMIN, _) => {
            let (tab, entity) = ctx.admin.parse(&segs[1..]);
            ViewState::admin(tab, entity)
        }
        (USER, Some(value)) => ViewState::user(ProfileRef::parse(&value)),
        (PROFILE | PROFILE_ALIAS, _) => ViewState {
            view: View::UserDetail,
            profile: ctx
                .session
                .map(|s| ProfileRef::ById(s.user_id.clone())),
            own_profile: true,
            ..Default::default()
        },
        (other, _) => {
            tracing::debug!(path = %path, segment = %other, "Unrecognized route, falling back to feed");
            fallback(ctx)
        }
    }
}

fn fallback(ctx: &RouteContext<'_>) -> ViewState {
    ViewState::feed(ctx.sticky_category.map(str::to_string))
}

/// Build the canonical URL path for a view state.
pub fn path_from_state(state: &ViewState, ctx: &RouteContext<'_>) -> String {
    match state.view {
        View::Feed => match state.selected_category.as_deref() {
            None => "/".to_string(),
            Some(c) if ctx.tree.is_root_category(c) => "/".to_string(),
            Some(c) => format!("/{CATEGORY}/{}", encode(c)),
        },
        View::Detail => match state.selected_news_id.as_deref() {
            Some(id) => format!("/{NEWS}/{}", encode(id)),
            None => "/".to_string(),
        },
        View::Categories => format!("/{CATEGORIES}"),
        View::Districts => format!("/{DISTRICTS}"),
        View::Trends => format!("/{TRENDS}"),
        View::Login => format!("/{LOGIN}"),
        View::Users => format!("/{USERS}"),
        View::WebStoryEditor => format!("/{STORY_EDITOR}"),
        View::EditUserProfile => format!("/{PROFILE_EDIT}"),
        View::UserDetail => match (&state.profile, state.own_profile) {
            (Some(profile), false) => format!("/{USER}/{}", encode(profile.as_str())),
            _ => format!("/{PROFILE}"),
        },
        View::Admin => {
            let tab = state.admin_tab.unwrap_or(AdminTab::Overview);
            let segs = ctx.admin.segments(tab, state.admin_user_id.as_deref());
            let encoded: Vec<String> = segs.iter().map(|s| encode(s)).collect();
            format!("/{ADMIN}/{}", encoded.join("/"))
        }
    }
}
