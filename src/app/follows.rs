use serde::Serialize;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::app::pagination::{Page, PageRequest};
use crate::domain::follow::{Follow, FollowCounts, FollowIdSets, PairRelationship};
use crate::domain::user::PublicUser;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FollowService {
    db: Db,
}

/// A freshly created edge plus the display fields of the user who was
/// followed, so clients can confirm who the edge points at.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedFollow {
    #[serde(flatten)]
    pub follow: Follow,
    pub followed_user: FollowedUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowedUser {
    pub name: String,
    pub last_name: Option<String>,
}

/// One row of a following/followers listing: the user on the far end of
/// the edge, public fields only.
#[derive(Debug, Clone, Serialize)]
pub struct FollowListEntry {
    pub user: PublicUser,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

impl FollowService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates the edge `follower -> followee`. The duplicate pre-check and
    /// the unique-violation mapping surface the same error, so a concurrent
    /// insert that wins the race is indistinguishable from an old edge.
    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<CreatedFollow> {
        if follower_id == followee_id {
            return Err(ServiceError::SelfFollow);
        }

        let target = sqlx::query("SELECT name, last_name FROM users WHERE id = $1")
            .bind(followee_id)
            .fetch_optional(self.db.pool())
            .await?;
        let target = match target {
            Some(target) => target,
            None => {
                return Err(ServiceError::NotFound(
                    "the user you are trying to follow does not exist".to_string(),
                ))
            }
        };

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(self.db.pool())
        .await?;
        if already {
            return Err(ServiceError::AlreadyExists(
                "you are already following this user".to_string(),
            ));
        }

        let row = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id) \
             VALUES ($1, $2) \
             RETURNING created_at",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(self.db.pool())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                ServiceError::AlreadyExists("you are already following this user".to_string())
            } else {
                ServiceError::from(err)
            }
        })?;

        Ok(CreatedFollow {
            follow: Follow {
                follower_id,
                followee_id,
                created_at: row.get("created_at"),
            },
            followed_user: FollowedUser {
                name: target.get("name"),
                last_name: target.get("last_name"),
            },
        })
    }

    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> ServiceResult<()> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound(
                "you are not following this user".to_string(),
            ));
        }
        Ok(())
    }

    /// Users that `user_id` follows, newest edge first.
    pub async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<FollowListEntry>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?;

        let rows = sqlx::query(
            "SELECT u.id, u.name, u.last_name, u.nick, u.bio, u.image, \
                    u.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.followee_id \
             WHERE f.follower_id = $1 \
             ORDER BY f.created_at DESC, f.followee_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.page_size())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok(Page::new(collect_entries(rows), total, page))
    }

    /// Users that follow `user_id`, newest edge first.
    pub async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<FollowListEntry>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?;

        let rows = sqlx::query(
            "SELECT u.id, u.name, u.last_name, u.nick, u.bio, u.image, \
                    u.created_at, f.created_at AS followed_at \
             FROM follows f \
             JOIN users u ON u.id = f.follower_id \
             WHERE f.followee_id = $1 \
             ORDER BY f.created_at DESC, f.follower_id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.page_size())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok(Page::new(collect_entries(rows), total, page))
    }

    /// Both id sets for `user_id`. Best-effort: a failed lookup degrades to
    /// empty sets instead of an error, because the sets enrich listings and
    /// gate the feed and must never cascade a store failure into the request
    /// that asked for them.
    pub async fn follow_id_sets(&self, user_id: Uuid) -> FollowIdSets {
        match self.fetch_id_sets(user_id).await {
            Ok(sets) => sets,
            Err(err) => {
                tracing::warn!(error = ?err, user_id = %user_id, "follow id set lookup failed, using empty sets");
                FollowIdSets::default()
            }
        }
    }

    async fn fetch_id_sets(&self, user_id: Uuid) -> Result<FollowIdSets, sqlx::Error> {
        let following: Vec<Uuid> =
            sqlx::query_scalar("SELECT followee_id FROM follows WHERE follower_id = $1")
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;
        let followers: Vec<Uuid> =
            sqlx::query_scalar("SELECT follower_id FROM follows WHERE followee_id = $1")
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;
        Ok(FollowIdSets {
            following,
            followers,
        })
    }

    /// Both edges between a viewer and a profile. Failures degrade to the
    /// null-filled relationship so a profile page still renders.
    pub async fn pair_relationship(&self, viewer_id: Uuid, profile_id: Uuid) -> PairRelationship {
        match self.fetch_pair(viewer_id, profile_id).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = ?err, viewer_id = %viewer_id, profile_id = %profile_id, "pair relationship lookup failed, treating as unrelated");
                PairRelationship::default()
            }
        }
    }

    async fn fetch_pair(
        &self,
        viewer_id: Uuid,
        profile_id: Uuid,
    ) -> Result<PairRelationship, sqlx::Error> {
        let following = self.find_edge(viewer_id, profile_id).await?;
        let follower = self.find_edge(profile_id, viewer_id).await?;
        Ok(PairRelationship {
            following,
            follower,
        })
    }

    async fn find_edge(
        &self,
        follower_id: Uuid,
        followee_id: Uuid,
    ) -> Result<Option<Follow>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT follower_id, followee_id, created_at \
             FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| Follow {
            follower_id: row.get("follower_id"),
            followee_id: row.get("followee_id"),
            created_at: row.get("created_at"),
        }))
    }

    pub async fn counts(&self, user_id: Uuid) -> ServiceResult<FollowCounts> {
        let row = sqlx::query(
            "SELECT \
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1) AS following, \
                (SELECT COUNT(*) FROM follows WHERE followee_id = $1) AS followers",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(FollowCounts {
            following: row.get("following"),
            followers: row.get("followers"),
        })
    }
}

fn collect_entries(rows: Vec<sqlx::postgres::PgRow>) -> Vec<FollowListEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        entries.push(FollowListEntry {
            user: PublicUser {
                id: row.get("id"),
                name: row.get("name"),
                last_name: row.get("last_name"),
                nick: row.get("nick"),
                bio: row.get("bio"),
                image: row.get("image"),
                created_at: row.get("created_at"),
            },
            followed_at: row.get("followed_at"),
        });
    }
    entries
}
