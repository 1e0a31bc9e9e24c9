use serde::{Deserialize, Serialize};

use super::admin::AdminTab;

/// The screen currently shown. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Feed,
    Detail,
    Users,
    UserDetail,
    Categories,
    Districts,
    Trends,
    EditUserProfile,
    Login,
    Admin,
    WebStoryEditor,
}

/// Whose profile a `UserDetail` view shows.
///
/// `/user/<segment>` is ambiguous: a segment that parses as a UUID is taken
/// as a user id, anything else as a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfileRef {
    ById(String),
    ByName(String),
}

impl ProfileRef {
    pub fn parse(segment: &str) -> Self {
        match uuid::Uuid::parse_str(segment) {
            Ok(_) => ProfileRef::ById(segment.to_string()),
            Err(_) => ProfileRef::ByName(segment.to_string()),
        }
    }

    /// The raw id or name.
    pub fn as_str(&self) -> &str {
        match self {
            ProfileRef::ById(s) | ProfileRef::ByName(s) => s,
        }
    }
}

/// What is on screen: view plus selection.
///
/// The URL path is derived from this value and parses back into it (see
/// [`crate::router::path`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewState {
    pub view: View,
    /// Category, district or trend token; `None` is the global home feed.
    pub selected_category: Option<String>,
    /// Article id or slug for `Detail`.
    pub selected_news_id: Option<String>,
    /// Internal admin tab (edit tabs included) for `Admin`.
    pub admin_tab: Option<AdminTab>,
    /// Entity being edited on an edit tab.
    pub admin_user_id: Option<String>,
    /// Profile shown by `UserDetail`; `None` renders an empty identity.
    pub profile: Option<ProfileRef>,
    /// `UserDetail` reached through `/profil` rather than `/user/<x>`.
    pub own_profile: bool,
}

impl ViewState {
    pub fn feed(category: Option<String>) -> Self {
        Self {
            view: View::Feed,
            selected_category: category,
            ..Default::default()
        }
    }

    pub fn detail(news_id: &str) -> Self {
        Self {
            view: View::Detail,
            selected_news_id: Some(news_id.to_string()),
            ..Default::default()
        }
    }

    pub fn admin(tab: AdminTab, entity_id: Option<String>) -> Self {
        Self {
            view: View::Admin,
            admin_tab: Some(tab),
            admin_user_id: entity_id,
            ..Default::default()
        }
    }

    pub fn user(profile: ProfileRef) -> Self {
        Self {
            view: View::UserDetail,
            profile: Some(profile),
            ..Default::default()
        }
    }

    /// A view carrying no selection.
    pub fn plain(view: View) -> Self {
        Self {
            view,
            ..Default::default()
        }
    }

    pub fn profile_user_id(&self) -> Option<&str> {
        match &self.profile {
            Some(ProfileRef::ById(id)) => Some(id),
            _ => None,
        }
    }

    pub fn profile_user_name(&self) -> Option<&str> {
        match &self.profile {
            Some(ProfileRef::ByName(name)) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_ref_parse() {
        assert_eq!(
            ProfileRef::parse("6f1c2e1a-3b4d-4c5e-8f90-123456789abc"),
            ProfileRef::ById("6f1c2e1a-3b4d-4c5e-8f90-123456789abc".to_string())
        );
        assert_eq!(
            ProfileRef::parse("ayse"),
            ProfileRef::ByName("ayse".to_string())
        );
        // Near-miss UUIDs are names
        assert_eq!(
            ProfileRef::parse("6f1c2e1a-3b4d-4c5e-8f90"),
            ProfileRef::ByName("6f1c2e1a-3b4d-4c5e-8f90".to_string())
        );
    }

    #[test]
    fn test_profile_accessors() {
        let state = ViewState::user(ProfileRef::ByName("ali".to_string()));
        assert_eq!(state.profile_user_name(), Some("ali"));
        assert_eq!(state.profile_user_id(), None);
    }

    #[test]
    fn test_view_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&View::WebStoryEditor).unwrap(),
            "\"web_story_editor\""
        );
    }
}
