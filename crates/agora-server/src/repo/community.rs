use crate::error::{AppError, Result};
use crate::models::{
    Channel, Community, CommunityRole, CommunitySummary, JoinedCommunity, MemberInfo, Membership,
    SortKey,
};
use crate::pagination::PageQuery;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Data access for communities, memberships, and channels. Every method is
/// one statement with no business rules in it; multi-statement invariants
/// are the service's job. Writes take a `&mut SqliteConnection` so the
/// caller decides the transaction scope, reads run on the pool.
#[derive(Clone)]
pub struct CommunityRepository {
    db: SqlitePool,
}

impl CommunityRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Community>> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, slug, description, category_id, icon_url, cover_image_url,
                   created_by, member_count, post_count, is_private, last_post_at,
                   is_active, created_at, updated_at
            FROM communities
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(community)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Community>> {
        let community = sqlx::query_as::<_, Community>(
            r#"
            SELECT id, name, slug, description, category_id, icon_url, cover_image_url,
                   created_by, member_count, post_count, is_private, last_post_at,
                   is_active, created_at, updated_at
            FROM communities
            WHERE slug = ? AND is_active = 1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.db)
        .await?;

        Ok(community)
    }

    /// Deactivated communities still hold their slug, so probes look at
    /// every row rather than just active ones.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE slug = ?)",
        )
        .bind(slug)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn slug_exists_excluding(&self, slug: &str, community_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM communities WHERE slug = ? AND id != ?)",
        )
        .bind(slug)
        .bind(community_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, community: &Community) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO communities (id, name, slug, description, category_id, icon_url,
                                     cover_image_url, created_by, member_count, post_count,
                                     is_private, last_post_at, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(community.id)
        .bind(&community.name)
        .bind(&community.slug)
        .bind(&community.description)
        .bind(community.category_id)
        .bind(&community.icon_url)
        .bind(&community.cover_image_url)
        .bind(community.created_by)
        .bind(community.member_count)
        .bind(community.post_count)
        .bind(community.is_private)
        .bind(community.last_post_at)
        .bind(community.is_active)
        .bind(community.created_at)
        .bind(community.updated_at)
        .execute(conn)
        .await
        .map_err(AppError::conflict_on_unique(
            "A community with this slug already exists.",
        ))?;

        Ok(())
    }

    /// Writes the mutable settings back. The slug index still guards
    /// renames that race each other.
    pub async fn update(&self, community: &Community) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE communities
            SET name = ?, slug = ?, description = ?, icon_url = ?, cover_image_url = ?,
                is_private = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&community.name)
        .bind(&community.slug)
        .bind(&community.description)
        .bind(&community.icon_url)
        .bind(&community.cover_image_url)
        .bind(community.is_private)
        .bind(community.updated_at)
        .bind(community.id)
        .execute(&self.db)
        .await
        .map_err(AppError::conflict_on_unique(
            "A community with this slug already exists.",
        ))?;

        Ok(())
    }

    pub async fn get_membership(
        &self,
        community_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, community_id, user_id, role, joined_at
            FROM memberships
            WHERE community_id = ? AND user_id = ?
            "#,
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(membership)
    }

    pub async fn is_member(&self, community_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE community_id = ? AND user_id = ?)",
        )
        .bind(community_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn insert_membership(
        &self,
        conn: &mut SqliteConnection,
        membership: &Membership,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO memberships (id, community_id, user_id, role, joined_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(membership.id)
        .bind(membership.community_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.joined_at)
        .execute(conn)
        .await
        .map_err(AppError::conflict_on_unique(
            "You are already a member of this community.",
        ))?;

        Ok(())
    }

    pub async fn delete_membership(
        &self,
        conn: &mut SqliteConnection,
        membership_id: Uuid,
    ) -> Result<()> {
        sqlx::query("DELETE FROM memberships WHERE id = ?")
            .bind(membership_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn set_membership_role(
        &self,
        conn: &mut SqliteConnection,
        membership_id: Uuid,
        role: CommunityRole,
    ) -> Result<()> {
        sqlx::query("UPDATE memberships SET role = ? WHERE id = ?")
            .bind(role)
            .bind(membership_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Applies a member-count delta in place. Runs in the same transaction
    /// as the membership write so the counter can never drift from the
    /// actual row count.
    pub async fn adjust_member_count(
        &self,
        conn: &mut SqliteConnection,
        community_id: Uuid,
        delta: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE communities SET member_count = member_count + ? WHERE id = ?")
            .bind(delta)
            .bind(community_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn list(
        &self,
        page: PageQuery,
        category: Option<&str>,
        search: Option<&str>,
        sort: SortKey,
        caller: Option<Uuid>,
    ) -> Result<(Vec<CommunitySummary>, i64)> {
        let search_term = search.map(escape_like);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM communities c
            JOIN categories cat ON cat.id = c.category_id
            WHERE c.is_active = 1
              AND (?1 IS NULL OR cat.slug = ?1)
              AND (?2 IS NULL
                   OR c.name LIKE '%' || ?2 || '%' ESCAPE '\'
                   OR c.description LIKE '%' || ?2 || '%' ESCAPE '\')
            "#,
        )
        .bind(category)
        .bind(&search_term)
        .fetch_one(&self.db)
        .await?;

        // The ORDER BY fragment comes from the closed SortKey set, never
        // from caller input.
        let sql = format!(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.category_id,
                   cat.name AS category_name, c.icon_url, c.cover_image_url,
                   c.member_count, c.post_count, c.is_private,
                   EXISTS(
                       SELECT 1 FROM memberships m
                       WHERE m.community_id = c.id AND m.user_id = ?3
                   ) AS is_joined,
                   c.created_at
            FROM communities c
            JOIN categories cat ON cat.id = c.category_id
            WHERE c.is_active = 1
              AND (?1 IS NULL OR cat.slug = ?1)
              AND (?2 IS NULL
                   OR c.name LIKE '%' || ?2 || '%' ESCAPE '\'
                   OR c.description LIKE '%' || ?2 || '%' ESCAPE '\')
            ORDER BY {}
            LIMIT ?4 OFFSET ?5
            "#,
            sort.order_by()
        );

        let items = sqlx::query_as::<_, CommunitySummary>(&sql)
            .bind(category)
            .bind(&search_term)
            .bind(caller)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        Ok((items, total))
    }

    pub async fn list_members(
        &self,
        community_id: Uuid,
        page: PageQuery,
    ) -> Result<(Vec<MemberInfo>, i64)> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE community_id = ?",
        )
        .bind(community_id)
        .fetch_one(&self.db)
        .await?;

        let members = sqlx::query_as::<_, MemberInfo>(
            r#"
            SELECT m.user_id, u.display_name, u.avatar_url, m.role, m.joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.community_id = ?
            ORDER BY m.joined_at ASC, m.id ASC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(community_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        Ok((members, total))
    }

    pub async fn joined_communities(&self, user_id: Uuid) -> Result<Vec<JoinedCommunity>> {
        let communities = sqlx::query_as::<_, JoinedCommunity>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, c.category_id,
                   cat.name AS category_name, c.icon_url, c.cover_image_url,
                   c.member_count, c.post_count, c.is_private,
                   1 AS is_joined, c.created_at, m.joined_at
            FROM memberships m
            JOIN communities c ON c.id = m.community_id
            JOIN categories cat ON cat.id = c.category_id
            WHERE m.user_id = ? AND c.is_active = 1
            ORDER BY m.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(communities)
    }

    pub async fn get_channel(&self, id: Uuid) -> Result<Option<Channel>> {
        let channel = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, community_id, parent_id, name, slug, description, channel_type,
                   display_order, post_count, is_default, is_archived, allow_member_posts,
                   allow_comments, created_at, updated_at
            FROM channels
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(channel)
    }

    pub async fn get_channels(&self, community_id: Uuid) -> Result<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(
            r#"
            SELECT id, community_id, parent_id, name, slug, description, channel_type,
                   display_order, post_count, is_default, is_archived, allow_member_posts,
                   allow_comments, created_at, updated_at
            FROM channels
            WHERE community_id = ?
            ORDER BY display_order ASC, created_at ASC
            "#,
        )
        .bind(community_id)
        .fetch_all(&self.db)
        .await?;

        Ok(channels)
    }

    /// Slug uniqueness is scoped to (community, parent). `IS ?` instead of
    /// `= ?` so a NULL parent matches the top-level scope.
    pub async fn channel_slug_exists(
        &self,
        community_id: Uuid,
        parent_id: Option<Uuid>,
        slug: &str,
    ) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM channels
                WHERE community_id = ? AND parent_id IS ? AND slug = ?
            )
            "#,
        )
        .bind(community_id)
        .bind(parent_id)
        .bind(slug)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    pub async fn next_display_order(
        &self,
        conn: &mut SqliteConnection,
        community_id: Uuid,
        parent_id: Option<Uuid>,
    ) -> Result<i64> {
        let next = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(MAX(display_order), 0) + 1
            FROM channels
            WHERE community_id = ? AND parent_id IS ?
            "#,
        )
        .bind(community_id)
        .bind(parent_id)
        .fetch_one(conn)
        .await?;

        Ok(next)
    }

    pub async fn insert_channel(
        &self,
        conn: &mut SqliteConnection,
        channel: &Channel,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels (id, community_id, parent_id, name, slug, description,
                                  channel_type, display_order, post_count, is_default,
                                  is_archived, allow_member_posts, allow_comments,
                                  created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(channel.id)
        .bind(channel.community_id)
        .bind(channel.parent_id)
        .bind(&channel.name)
        .bind(&channel.slug)
        .bind(&channel.description)
        .bind(channel.channel_type)
        .bind(channel.display_order)
        .bind(channel.post_count)
        .bind(channel.is_default)
        .bind(channel.is_archived)
        .bind(channel.allow_member_posts)
        .bind(channel.allow_comments)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(conn)
        .await
        .map_err(AppError::conflict_on_unique(
            "A channel with this slug already exists here.",
        ))?;

        Ok(())
    }
}

/// Escapes LIKE wildcards in a user-supplied search term. The pattern is
/// built with ESCAPE '\' in the queries above.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
