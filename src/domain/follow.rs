use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A directed edge in the follow graph: follower -> followee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: Uuid,
    pub followee_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The two id sets derived from a user's edges: who they follow and who
/// follows them. Lookups that fail degrade to empty sets instead of
/// failing the surrounding request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FollowIdSets {
    pub following: Vec<Uuid>,
    pub followers: Vec<Uuid>,
}

/// Edges between a viewer and a profile in both directions. `None` means
/// no edge in that direction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairRelationship {
    pub following: Option<Follow>,
    pub follower: Option<Follow>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FollowCounts {
    pub following: i64,
    pub followers: i64,
}
