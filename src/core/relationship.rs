// Relationship edges between an actor (always a user) and a target (tuit or user)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::strong_types::{current_time_millis, millis_to_datetime, EntityId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Like,
    Dislike,
    Follow,
    Bookmark,
}

impl RelationshipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipKind::Like => "like",
            RelationshipKind::Dislike => "dislike",
            RelationshipKind::Follow => "follow",
            RelationshipKind::Bookmark => "bookmark",
        }
    }

    /// The reaction that cannot coexist with this one on the same target.
    pub fn opposite(self) -> Option<RelationshipKind> {
        match self {
            RelationshipKind::Like => Some(RelationshipKind::Dislike),
            RelationshipKind::Dislike => Some(RelationshipKind::Like),
            RelationshipKind::Follow | RelationshipKind::Bookmark => None,
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(RelationshipKind::Like),
            "dislike" => Ok(RelationshipKind::Dislike),
            "follow" => Ok(RelationshipKind::Follow),
            "bookmark" => Ok(RelationshipKind::Bookmark),
            other => Err(format!("Unknown relationship kind: {}", other)),
        }
    }
}

/// A stored (kind, actor, target) edge.
///
/// For follows the actor is the following user and the target the followed user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub actor_id: EntityId,
    pub target_id: EntityId,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(kind: RelationshipKind, actor_id: EntityId, target_id: EntityId) -> Self {
        Self {
            kind,
            actor_id,
            target_id,
            created_at: millis_to_datetime(current_time_millis()),
        }
    }
}

/// Follow edge as exposed over HTTP: one field convention for both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Follow {
    pub following_user: EntityId,
    pub followed_user: EntityId,
    pub created_at: DateTime<Utc>,
}

impl From<Relationship> for Follow {
    fn from(rel: Relationship) -> Self {
        Follow {
            following_user: rel.actor_id,
            followed_user: rel.target_id,
            created_at: rel.created_at,
        }
    }
}

/// Which side of the edge a lookup is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipScope {
    Actor(EntityId),
    Target(EntityId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in [
            RelationshipKind::Like,
            RelationshipKind::Dislike,
            RelationshipKind::Follow,
            RelationshipKind::Bookmark,
        ] {
            assert_eq!(kind.as_str().parse::<RelationshipKind>().unwrap(), kind);
        }
        assert!("friendship".parse::<RelationshipKind>().is_err());
    }

    #[test]
    fn test_only_reactions_are_exclusive() {
        use RelationshipKind::{Bookmark, Dislike, Follow, Like};

        assert_eq!(Like.opposite(), Some(Dislike));
        assert_eq!(Dislike.opposite(), Some(Like));
        assert_eq!(Follow.opposite(), None);
        assert_eq!(Bookmark.opposite(), None);
    }

    #[test]
    fn test_follow_view_keeps_direction() {
        let rel = Relationship::new(RelationshipKind::Follow, EntityId(1), EntityId(2));
        let follow = Follow::from(rel);
        assert_eq!(follow.following_user, EntityId(1));
        assert_eq!(follow.followed_user, EntityId(2));

        let json = serde_json::to_value(&follow).unwrap();
        assert_eq!(json["followingUser"], 1);
        assert_eq!(json["followedUser"], 2);
    }
}
