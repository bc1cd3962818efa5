use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered user of the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Surrogate key assigned on creation, immutable afterwards
    pub id: i64,
    pub email: String,
    pub login: String,
    /// Display name; falls back to `login` when left blank at creation
    pub name: String,
    pub birthday: NaiveDate,
}

/// A film in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in minutes
    pub duration: i32,
    /// Must resolve in the MPA rating catalog
    pub mpa_id: i32,
    /// Each id must resolve in the genre catalog; empty is allowed
    pub genre_ids: BTreeSet<i32>,
    pub director: Option<String>,
}

/// A user-authored review of a film
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub content: String,
    /// Whether the review itself recommends the film; independent of voting
    pub is_positive: bool,
    /// Author
    pub user_id: i64,
    /// Subject film
    pub film_id: i64,
    /// Derived: count of LIKE votes minus count of DISLIKE votes
    pub useful: i64,
}

/// A voter's reaction to a review. At most one per (review, user) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    /// Contribution of this reaction to a review's useful score
    pub fn delta(self) -> i64 {
        match self {
            Reaction::Like => 1,
            Reaction::Dislike => -1,
        }
    }
}

/// State of the friendship between an unordered pair of users.
///
/// A single edge record covers both directions: `Requested { by }` is a
/// half-open friend request visible only from the requester's side, and
/// `Mutual` means both sides added each other (the persisted `confirmed`
/// flag). Absence of the record is the NONE state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipState {
    Requested { by: i64 },
    Mutual,
}

impl FriendshipState {
    /// Whether `user_id`'s friend list includes the other end of this edge
    pub fn visible_to(&self, user_id: i64) -> bool {
        match self {
            FriendshipState::Mutual => true,
            FriendshipState::Requested { by } => *by == user_id,
        }
    }
}

/// Film attribute that text search can match against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Title,
    Director,
}

impl SearchField {
    /// Parses a single field name; unknown names yield `None` and are
    /// skipped by the caller rather than treated as errors.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => Some(SearchField::Title),
            "director" => Some(SearchField::Director),
            _ => None,
        }
    }
}

/// A film genre from the static reference catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// An MPA age rating from the static reference catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MpaRating {
    pub id: i32,
    pub name: String,
}
