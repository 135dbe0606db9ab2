use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// A channel inside a community. Channels nest exactly one level deep:
/// a channel either has no parent or its parent is itself top-level.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Channel {
    pub id: Uuid,
    pub community_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub display_order: i64,
    pub post_count: i64,
    pub is_default: bool,
    pub is_archived: bool,
    pub allow_member_posts: bool,
    pub allow_comments: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ChannelType {
    Announcement,
    #[default]
    Discussion,
    Resource,
    Task,
    QAndA,
}

#[derive(Debug, Deserialize)]
pub struct CreateChannel {
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub channel_type: ChannelType,
    #[serde(default = "default_true")]
    pub allow_member_posts: bool,
    #[serde(default = "default_true")]
    pub allow_comments: bool,
}

fn default_true() -> bool {
    true
}

/// Channel representation inside `CommunityDetail`, with sub-channels
/// nested under their parent.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub display_order: i64,
    pub post_count: i64,
    pub is_default: bool,
    pub is_archived: bool,
    pub allow_member_posts: bool,
    pub allow_comments: bool,
    pub sub_channels: Vec<ChannelSummary>,
}

impl ChannelSummary {
    pub fn new(channel: Channel, sub_channels: Vec<ChannelSummary>) -> Self {
        Self {
            id: channel.id,
            name: channel.name,
            slug: channel.slug,
            description: channel.description,
            channel_type: channel.channel_type,
            display_order: channel.display_order,
            post_count: channel.post_count,
            is_default: channel.is_default,
            is_archived: channel.is_archived,
            allow_member_posts: channel.allow_member_posts,
            allow_comments: channel.allow_comments,
            sub_channels,
        }
    }
}

/// Assembles the two-level channel tree from a flat list already ordered
/// by display order. Relative order is preserved both for top-level
/// channels and within each parent's sub-channels.
pub fn build_channel_tree(channels: Vec<Channel>) -> Vec<ChannelSummary> {
    let (parents, children): (Vec<Channel>, Vec<Channel>) = channels
        .into_iter()
        .partition(|channel| channel.parent_id.is_none());

    let mut by_parent: HashMap<Uuid, Vec<Channel>> = HashMap::new();
    for child in children {
        if let Some(parent_id) = child.parent_id {
            by_parent.entry(parent_id).or_default().push(child);
        }
    }

    parents
        .into_iter()
        .map(|parent| {
            let sub_channels = by_parent
                .remove(&parent.id)
                .unwrap_or_default()
                .into_iter()
                .map(|child| ChannelSummary::new(child, Vec::new()))
                .collect();
            ChannelSummary::new(parent, sub_channels)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(name: &str, parent_id: Option<Uuid>, display_order: i64) -> Channel {
        let now = Utc::now();
        Channel {
            id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            parent_id,
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            channel_type: ChannelType::Discussion,
            display_order,
            post_count: 0,
            is_default: false,
            is_archived: false,
            allow_member_posts: true,
            allow_comments: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn nests_sub_channels_under_their_parent() {
        let general = channel("General", None, 1);
        let help = channel("Help", Some(general.id), 1);
        let showcase = channel("Showcase", Some(general.id), 2);
        let lounge = channel("Lounge", None, 2);

        let tree = build_channel_tree(vec![
            general.clone(),
            lounge.clone(),
            help,
            showcase,
        ]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, general.id);
        assert_eq!(tree[0].sub_channels.len(), 2);
        assert_eq!(tree[0].sub_channels[0].name, "Help");
        assert_eq!(tree[0].sub_channels[1].name, "Showcase");
        assert_eq!(tree[1].id, lounge.id);
        assert!(tree[1].sub_channels.is_empty());
    }

    #[test]
    fn preserves_input_order_at_both_levels() {
        let a = channel("A", None, 1);
        let b = channel("B", None, 2);
        let b1 = channel("B1", Some(b.id), 1);
        let b2 = channel("B2", Some(b.id), 2);

        // Input arrives ordered by display_order with parents interleaved.
        let tree = build_channel_tree(vec![a.clone(), b1, b.clone(), b2]);

        let names: Vec<&str> = tree.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        let subs: Vec<&str> = tree[1]
            .sub_channels
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(subs, ["B1", "B2"]);
    }

    #[test]
    fn empty_input_builds_empty_tree() {
        assert!(build_channel_tree(Vec::new()).is_empty());
    }
}
