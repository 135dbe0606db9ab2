use crate::models::channel::ChannelSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

/// A community - a topic-scoped space with members, roles, and channels.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    pub icon_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_by: Uuid,
    pub member_count: i64,
    pub post_count: i64,
    pub is_private: bool,
    pub last_post_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's membership in one community. At most one row per
/// (community, user) pair, and exactly one Owner row per community.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub role: CommunityRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum CommunityRole {
    Member,
    Moderator,
    Owner,
}

impl CommunityRole {
    /// Case-insensitive parse of a role name from transport input.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "member" => Some(Self::Member),
            "moderator" => Some(Self::Moderator),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Owner => "owner",
        }
    }

    pub fn can_manage(&self) -> bool {
        matches!(self, Self::Owner | Self::Moderator)
    }
}

impl fmt::Display for CommunityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommunity {
    pub name: String,
    pub description: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub is_private: bool,
    pub icon_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommunity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRole {
    pub role: String,
}

/// Lightweight community representation for list endpoints.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunitySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub icon_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub member_count: i64,
    pub post_count: i64,
    pub is_private: bool,
    pub is_joined: bool,
    pub created_at: DateTime<Utc>,
}

/// Full community detail with the caller's membership context and the
/// channel tree.
#[derive(Debug, Serialize)]
pub struct CommunityDetail {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category_id: Uuid,
    pub category_name: String,
    pub icon_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub member_count: i64,
    pub post_count: i64,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub last_post_at: Option<DateTime<Utc>>,
    pub is_member: bool,
    pub user_role: Option<CommunityRole>,
    pub channels: Vec<ChannelSummary>,
}

impl CommunityDetail {
    pub fn new(
        community: Community,
        category_name: String,
        is_member: bool,
        user_role: Option<CommunityRole>,
        channels: Vec<ChannelSummary>,
    ) -> Self {
        Self {
            id: community.id,
            name: community.name,
            slug: community.slug,
            description: community.description,
            category_id: community.category_id,
            category_name,
            icon_url: community.icon_url,
            cover_image_url: community.cover_image_url,
            member_count: community.member_count,
            post_count: community.post_count,
            is_private: community.is_private,
            created_at: community.created_at,
            last_post_at: community.last_post_at,
            is_member,
            user_role,
            channels,
        }
    }
}

/// One row of a community's member listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberInfo {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: CommunityRole,
    pub joined_at: DateTime<Utc>,
}

/// A community the user belongs to, with when they joined it.
#[derive(Debug, Serialize, FromRow)]
pub struct JoinedCommunity {
    #[sqlx(flatten)]
    pub community: CommunitySummary,
    pub joined_at: DateTime<Utc>,
}

/// Closed set of orderings for the community listing. Unknown values fall
/// back to `Newest`; the variants map to static SQL fragments so no caller
/// input ever reaches an ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Members,
    Posts,
    Name,
    Oldest,
    Newest,
}

impl SortKey {
    pub fn from_param(value: Option<&str>) -> Self {
        match value.unwrap_or("newest").to_ascii_lowercase().as_str() {
            "members" => Self::Members,
            "posts" => Self::Posts,
            "name" => Self::Name,
            "oldest" => Self::Oldest,
            _ => Self::Newest,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            Self::Members => "c.member_count DESC, c.created_at DESC",
            Self::Posts => "c.post_count DESC, c.created_at DESC",
            Self::Name => "c.name COLLATE NOCASE ASC, c.created_at DESC",
            Self::Oldest => "c.created_at ASC",
            Self::Newest => "c.created_at DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_params_fall_back_to_newest() {
        assert_eq!(SortKey::from_param(None), SortKey::Newest);
        assert_eq!(SortKey::from_param(Some("popular")), SortKey::Newest);
        assert_eq!(SortKey::from_param(Some("")), SortKey::Newest);
    }

    #[test]
    fn sort_params_are_case_insensitive() {
        assert_eq!(SortKey::from_param(Some("Members")), SortKey::Members);
        assert_eq!(SortKey::from_param(Some("OLDEST")), SortKey::Oldest);
        assert_eq!(SortKey::from_param(Some("name")), SortKey::Name);
        assert_eq!(SortKey::from_param(Some("posts")), SortKey::Posts);
    }

    #[test]
    fn parses_role_names_case_insensitively() {
        assert_eq!(CommunityRole::parse("owner"), Some(CommunityRole::Owner));
        assert_eq!(
            CommunityRole::parse("Moderator"),
            Some(CommunityRole::Moderator)
        );
        assert_eq!(CommunityRole::parse("MEMBER"), Some(CommunityRole::Member));
        assert_eq!(CommunityRole::parse("admin"), None);
        assert_eq!(CommunityRole::parse(""), None);
    }

    #[test]
    fn only_owner_and_moderator_can_manage() {
        assert!(CommunityRole::Owner.can_manage());
        assert!(CommunityRole::Moderator.can_manage());
        assert!(!CommunityRole::Member.can_manage());
    }
}
