use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::follows::FollowService;
use crate::app::pagination::{Page, PageRequest};
use crate::app::publications::PublicationWithAuthor;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Composes a user's home feed: publications authored by the users they
    /// follow, newest first with the publication id as a tie-break so the
    /// order is stable across pages. A user who follows nobody gets
    /// `NoFollowees` rather than an empty page, so clients can tell "go
    /// follow someone" apart from "nothing posted yet".
    pub async fn build_feed(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<PublicationWithAuthor>> {
        let sets = FollowService::new(self.db.clone())
            .follow_id_sets(user_id)
            .await;
        if sets.following.is_empty() {
            return Err(ServiceError::NoFollowees);
        }

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM publications WHERE author_id = ANY($1)")
                .bind(&sets.following)
                .fetch_one(self.db.pool())
                .await?;

        let rows = sqlx::query(
            "SELECT p.id, p.text, p.file, p.created_at, \
                    u.id AS author_id, u.name, u.last_name, u.nick, u.bio, u.image, \
                    u.created_at AS author_created_at \
             FROM publications p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.author_id = ANY($1) \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(&sets.following)
        .bind(page.page_size())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        let items = rows
            .iter()
            .map(PublicationWithAuthor::from_row)
            .collect::<Vec<_>>();
        Ok(Page::new(items, total, page))
    }
}
