use sqlx::Row;
use uuid::Uuid;

use crate::app::error::ServiceResult;
use crate::domain::user::PublicUser;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_public(&self, user_id: Uuid) -> ServiceResult<Option<PublicUser>> {
        let row = sqlx::query(
            "SELECT id, name, last_name, nick, bio, image, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| PublicUser {
            id: row.get("id"),
            name: row.get("name"),
            last_name: row.get("last_name"),
            nick: row.get("nick"),
            bio: row.get("bio"),
            image: row.get("image"),
            created_at: row.get("created_at"),
        }))
    }
}
