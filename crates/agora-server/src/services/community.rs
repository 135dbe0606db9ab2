use crate::error::{AppError, Result};
use crate::models::{
    build_channel_tree, Channel, ChannelSummary, ChannelType, ChangeRole, Community,
    CommunityDetail, CommunityRole, CommunitySummary, CreateChannel, CreateCommunity,
    JoinedCommunity, MemberInfo, Membership, SortKey, UpdateCommunity,
};
use crate::pagination::{Page, PageQuery};
use crate::repo::{CategoryRepository, CommunityRepository};
use crate::slug;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Orchestrates community lifecycle, membership, and role changes. Rules
/// live here; the repository only moves rows. Multi-row writes run inside
/// explicit transactions so a failure can never leave a half-created
/// community or a drifted member count behind.
#[derive(Clone)]
pub struct CommunityService {
    db: SqlitePool,
    repo: CommunityRepository,
    categories: CategoryRepository,
}

impl CommunityService {
    pub fn new(db: SqlitePool) -> Self {
        let repo = CommunityRepository::new(db.clone());
        let categories = CategoryRepository::new(db.clone());
        Self {
            db,
            repo,
            categories,
        }
    }

    /// Creates a community with the caller as Owner and the two default
    /// channels. Community, owner membership, and channels are one
    /// transaction.
    pub async fn create(&self, input: CreateCommunity, user_id: Uuid) -> Result<CommunityDetail> {
        let category = self
            .categories
            .get_by_id(input.category_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Unknown category: {}", input.category_id))
            })?;

        let repo = &self.repo;
        let slug = slug::generate_unique(&input.name, |candidate| async move {
            repo.slug_exists(&candidate).await
        })
        .await?;

        let now = Utc::now();
        let community = Community {
            id: Uuid::new_v4(),
            name: input.name,
            slug,
            description: input.description,
            category_id: category.id,
            icon_url: input.icon_url,
            cover_image_url: None,
            created_by: user_id,
            member_count: 1,
            post_count: 0,
            is_private: input.is_private,
            last_post_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let membership = Membership {
            id: Uuid::new_v4(),
            community_id: community.id,
            user_id,
            role: CommunityRole::Owner,
            joined_at: now,
        };

        let channels = default_channels(community.id, now);

        let mut tx = self.db.begin().await?;
        self.repo.insert(&mut tx, &community).await?;
        self.repo.insert_membership(&mut tx, &membership).await?;
        for channel in &channels {
            self.repo.insert_channel(&mut tx, channel).await?;
        }
        tx.commit().await?;

        tracing::info!(
            name = %community.name,
            slug = %community.slug,
            user = %user_id,
            "community created"
        );

        Ok(CommunityDetail::new(
            community,
            category.name,
            true,
            Some(CommunityRole::Owner),
            build_channel_tree(channels),
        ))
    }

    pub async fn list(
        &self,
        page: PageQuery,
        category: Option<&str>,
        search: Option<&str>,
        sort_by: Option<&str>,
        caller: Option<Uuid>,
    ) -> Result<Page<CommunitySummary>> {
        let page = page.validate()?;
        let sort = SortKey::from_param(sort_by);
        let (items, total) = self.repo.list(page, category, search, sort, caller).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn get_by_slug(&self, slug: &str, caller: Option<Uuid>) -> Result<CommunityDetail> {
        let community = self
            .repo
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        let category_name = self
            .categories
            .get_by_id(community.category_id)
            .await?
            .map(|category| category.name)
            .unwrap_or_default();

        let channels = self.repo.get_channels(community.id).await?;

        let mut is_member = false;
        let mut user_role = None;
        if let Some(user_id) = caller {
            if let Some(membership) = self.repo.get_membership(community.id, user_id).await? {
                is_member = true;
                user_role = Some(membership.role);
            }
        }

        Ok(CommunityDetail::new(
            community,
            category_name,
            is_member,
            user_role,
            build_channel_tree(channels),
        ))
    }

    /// Partial update of community settings; absent fields stay untouched.
    /// A name change re-derives the slug, probing with the community
    /// itself excluded so an unchanged base keeps its slug.
    pub async fn update(
        &self,
        community_id: Uuid,
        input: UpdateCommunity,
        user_id: Uuid,
    ) -> Result<CommunityDetail> {
        let mut community = self
            .repo
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        let membership = self
            .repo
            .get_membership(community_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("You are not a member of this community.".to_string())
            })?;

        if !membership.role.can_manage() {
            return Err(AppError::Forbidden(
                "Only the owner or a moderator can update community settings.".to_string(),
            ));
        }

        if let Some(name) = input.name {
            if name != community.name {
                let repo = &self.repo;
                community.slug = slug::generate_unique(&name, |candidate| async move {
                    repo.slug_exists_excluding(&candidate, community_id).await
                })
                .await?;
            }
            community.name = name;
        }
        if let Some(description) = input.description {
            community.description = description;
        }
        if let Some(icon_url) = input.icon_url {
            community.icon_url = Some(icon_url);
        }
        if let Some(cover_image_url) = input.cover_image_url {
            community.cover_image_url = Some(cover_image_url);
        }
        if let Some(is_private) = input.is_private {
            community.is_private = is_private;
        }
        community.updated_at = Utc::now();

        self.repo.update(&community).await?;

        tracing::info!(
            name = %community.name,
            id = %community.id,
            user = %user_id,
            "community settings updated"
        );

        let category_name = self
            .categories
            .get_by_id(community.category_id)
            .await?
            .map(|category| category.name)
            .unwrap_or_default();
        let channels = self.repo.get_channels(community.id).await?;

        Ok(CommunityDetail::new(
            community,
            category_name,
            true,
            Some(membership.role),
            build_channel_tree(channels),
        ))
    }

    /// Adds the caller as a Member. Membership insert and counter bump
    /// share a transaction; the unique index turns a concurrent double
    /// join into a Conflict instead of a duplicate row.
    pub async fn join(&self, community_id: Uuid, user_id: Uuid) -> Result<()> {
        let community = self
            .repo
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        if community.is_private {
            return Err(AppError::Forbidden(
                "This community is private. You need an invitation to join.".to_string(),
            ));
        }

        if self.repo.is_member(community_id, user_id).await? {
            return Err(AppError::Conflict(
                "You are already a member of this community.".to_string(),
            ));
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            community_id,
            user_id,
            role: CommunityRole::Member,
            joined_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        self.repo.insert_membership(&mut tx, &membership).await?;
        self.repo.adjust_member_count(&mut tx, community_id, 1).await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, community = %community_id, "user joined community");
        Ok(())
    }

    /// Removes the caller's membership. The Owner must transfer ownership
    /// first, so a community can never end up ownerless.
    pub async fn leave(&self, community_id: Uuid, user_id: Uuid) -> Result<()> {
        let membership = self
            .repo
            .get_membership(community_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("You are not a member of this community.".to_string())
            })?;

        if membership.role == CommunityRole::Owner {
            return Err(AppError::BusinessRule(
                "The owner cannot leave the community. Transfer ownership first.".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        self.repo.delete_membership(&mut tx, membership.id).await?;
        self.repo
            .adjust_member_count(&mut tx, community_id, -1)
            .await?;
        tx.commit().await?;

        tracing::info!(user = %user_id, community = %community_id, "user left community");
        Ok(())
    }

    pub async fn get_members(
        &self,
        community_id: Uuid,
        page: PageQuery,
    ) -> Result<Page<MemberInfo>> {
        let page = page.validate()?;

        self.repo
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        let (members, total) = self.repo.list_members(community_id, page).await?;
        Ok(Page::new(members, total, page))
    }

    /// Changes a member's role. Only the Owner may call this. Granting
    /// Owner transfers ownership: the caller is demoted to Moderator and
    /// the target promoted in the same transaction, keeping exactly one
    /// Owner at every commit point.
    pub async fn change_role(
        &self,
        community_id: Uuid,
        target_user_id: Uuid,
        input: ChangeRole,
        caller_id: Uuid,
    ) -> Result<()> {
        let new_role = CommunityRole::parse(&input.role)
            .ok_or_else(|| AppError::Validation(format!("Invalid role: {}", input.role)))?;

        let caller_membership = self
            .repo
            .get_membership(community_id, caller_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("You are not a member of this community.".to_string())
            })?;

        if caller_membership.role != CommunityRole::Owner {
            return Err(AppError::Forbidden(
                "Only the owner can change member roles.".to_string(),
            ));
        }

        let target_membership = self
            .repo
            .get_membership(community_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Member not found in this community.".to_string())
            })?;

        if caller_id == target_user_id && new_role != CommunityRole::Owner {
            return Err(AppError::BusinessRule(
                "You cannot demote yourself. Transfer ownership first.".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        if new_role == CommunityRole::Owner {
            self.repo
                .set_membership_role(&mut tx, caller_membership.id, CommunityRole::Moderator)
                .await?;
            self.repo
                .set_membership_role(&mut tx, target_membership.id, CommunityRole::Owner)
                .await?;
        } else {
            self.repo
                .set_membership_role(&mut tx, target_membership.id, new_role)
                .await?;
        }
        tx.commit().await?;

        if new_role == CommunityRole::Owner {
            tracing::info!(
                community = %community_id,
                previous_owner = %caller_id,
                new_owner = %target_user_id,
                "ownership transferred"
            );
        } else {
            tracing::info!(
                community = %community_id,
                target = %target_user_id,
                role = %new_role,
                changed_by = %caller_id,
                "member role changed"
            );
        }

        Ok(())
    }

    /// Communities the user belongs to, most recently joined first.
    pub async fn joined_communities(&self, user_id: Uuid) -> Result<Vec<JoinedCommunity>> {
        self.repo.joined_communities(user_id).await
    }

    /// Adds a channel. One nesting level only: a channel whose parent
    /// already has a parent is rejected. The slug is unique within its
    /// (community, parent) scope and the display order appends after the
    /// scope's current maximum.
    pub async fn create_channel(
        &self,
        community_id: Uuid,
        input: CreateChannel,
        user_id: Uuid,
    ) -> Result<ChannelSummary> {
        self.repo
            .get_by_id(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        let membership = self
            .repo
            .get_membership(community_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden("You are not a member of this community.".to_string())
            })?;

        if !membership.role.can_manage() {
            return Err(AppError::Forbidden(
                "Only the owner or a moderator can manage channels.".to_string(),
            ));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = self
                .repo
                .get_channel(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Parent channel not found.".to_string()))?;

            if parent.community_id != community_id {
                return Err(AppError::Validation(
                    "Parent channel belongs to a different community.".to_string(),
                ));
            }
            if parent.parent_id.is_some() {
                return Err(AppError::BusinessRule(
                    "Channels support a single level of nesting.".to_string(),
                ));
            }
        }

        let repo = &self.repo;
        let parent_id = input.parent_id;
        let slug = slug::generate_unique(&input.name, |candidate| async move {
            repo.channel_slug_exists(community_id, parent_id, &candidate)
                .await
        })
        .await?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        let display_order = self
            .repo
            .next_display_order(&mut tx, community_id, input.parent_id)
            .await?;

        let channel = Channel {
            id: Uuid::new_v4(),
            community_id,
            parent_id: input.parent_id,
            name: input.name,
            slug,
            description: input.description,
            channel_type: input.channel_type,
            display_order,
            post_count: 0,
            is_default: false,
            is_archived: false,
            allow_member_posts: input.allow_member_posts,
            allow_comments: input.allow_comments,
            created_at: now,
            updated_at: now,
        };

        self.repo.insert_channel(&mut tx, &channel).await?;
        tx.commit().await?;

        tracing::info!(
            channel = %channel.name,
            community = %community_id,
            user = %user_id,
            "channel created"
        );

        Ok(ChannelSummary::new(channel, Vec::new()))
    }
}

/// Every community starts with a read-only Announcements channel and an
/// open General channel.
fn default_channels(community_id: Uuid, now: DateTime<Utc>) -> Vec<Channel> {
    vec![
        Channel {
            id: Uuid::new_v4(),
            community_id,
            parent_id: None,
            name: "Announcements".to_string(),
            slug: "announcements".to_string(),
            description: None,
            channel_type: ChannelType::Announcement,
            display_order: 1,
            post_count: 0,
            is_default: true,
            is_archived: false,
            allow_member_posts: false,
            allow_comments: true,
            created_at: now,
            updated_at: now,
        },
        Channel {
            id: Uuid::new_v4(),
            community_id,
            parent_id: None,
            name: "General".to_string(),
            slug: "general".to_string(),
            description: None,
            channel_type: ChannelType::Discussion,
            display_order: 2,
            post_count: 0,
            is_default: true,
            is_archived: false,
            allow_member_posts: true,
            allow_comments: true,
            created_at: now,
            updated_at: now,
        },
    ]
}
