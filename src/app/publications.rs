use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::pagination::{Page, PageRequest};
use crate::domain::publication::Publication;
use crate::domain::user::PublicUser;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PublicationService {
    db: Db,
}

/// A publication joined with its author's public profile.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationWithAuthor {
    pub id: Uuid,
    pub text: String,
    pub file: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: PublicUser,
}

impl PublicationWithAuthor {
    /// Maps a row of the publication/author join. The query must alias the
    /// author columns as `author_id` and `author_created_at`.
    pub(crate) fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            text: row.get("text"),
            file: row.get("file"),
            created_at: row.get("created_at"),
            author: PublicUser {
                id: row.get("author_id"),
                name: row.get("name"),
                last_name: row.get("last_name"),
                nick: row.get("nick"),
                bio: row.get("bio"),
                image: row.get("image"),
                created_at: row.get("author_created_at"),
            },
        }
    }
}

impl PublicationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        text: String,
        file: Option<String>,
    ) -> ServiceResult<Publication> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ServiceError::Validation(
                "you must send the text of the publication".to_string(),
            ));
        }

        let row = sqlx::query(
            "INSERT INTO publications (author_id, text, file) \
             VALUES ($1, $2, $3) \
             RETURNING id, author_id, text, file, created_at",
        )
        .bind(author_id)
        .bind(&text)
        .bind(&file)
        .fetch_one(self.db.pool())
        .await?;

        Ok(publication_from_row(&row))
    }

    pub async fn get(&self, publication_id: Uuid) -> ServiceResult<Option<PublicationWithAuthor>> {
        let row = sqlx::query(
            "SELECT p.id, p.text, p.file, p.created_at, \
                    u.id AS author_id, u.name, u.last_name, u.nick, u.bio, u.image, \
                    u.created_at AS author_created_at \
             FROM publications p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.id = $1",
        )
        .bind(publication_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| PublicationWithAuthor::from_row(&row)))
    }

    /// Deletes a publication only if `author_id` owns it. Returns the
    /// deleted row, or `None` when it does not exist or belongs to someone
    /// else; callers cannot tell the two apart.
    pub async fn delete_own(
        &self,
        publication_id: Uuid,
        author_id: Uuid,
    ) -> ServiceResult<Option<Publication>> {
        let row = sqlx::query(
            "DELETE FROM publications \
             WHERE id = $1 AND author_id = $2 \
             RETURNING id, author_id, text, file, created_at",
        )
        .bind(publication_id)
        .bind(author_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| publication_from_row(&row)))
    }

    /// One author's publications, newest first.
    pub async fn list_by_author(
        &self,
        author_id: Uuid,
        page: PageRequest,
    ) -> ServiceResult<Page<PublicationWithAuthor>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM publications WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(self.db.pool())
                .await?;

        let rows = sqlx::query(
            "SELECT p.id, p.text, p.file, p.created_at, \
                    u.id AS author_id, u.name, u.last_name, u.nick, u.bio, u.image, \
                    u.created_at AS author_created_at \
             FROM publications p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.author_id = $1 \
             ORDER BY p.created_at DESC, p.id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(author_id)
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

    pub async fn count_by_author(&self, author_id: Uuid) -> ServiceResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM publications WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(total)
    }
}

fn publication_from_row(row: &PgRow) -> Publication {
    Publication {
        id: row.get("id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        file: row.get("file"),
        created_at: row.get("created_at"),
    }
}
