use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Full account record as stored, minus the password hash. Never serialized
/// directly; responses go through [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub last_name: Option<String>,
    pub nick: String,
    pub email: String,
    pub role: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Profile fields safe to show to any authenticated user. Excludes email,
/// role and anything credential-related.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub last_name: Option<String>,
    pub nick: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            last_name: user.last_name,
            nick: user.nick,
            bio: user.bio,
            image: user.image,
            created_at: user.created_at,
        }
    }
}
