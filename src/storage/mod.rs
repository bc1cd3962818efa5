//! Storage ports for the engagement and relationship core.
//!
//! The service layer depends only on these traits. Two implementations are
//! provided: [`memory::MemoryStore`], a dashmap arena used by tests and as
//! the default backend, and [`postgres::PostgresStore`], backed by sqlx.
//! Each mutation that pairs a relation write with a derived-counter update
//! (review votes and `useful`) must execute as a single atomic unit; the
//! per-key locking or transaction that guarantees this lives behind these
//! traits, not in the services.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::AppResult;
use crate::models::{Film, Reaction, Review, SearchField, User};

/// Payload for creating a user; the store assigns the surrogate id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: NaiveDate,
}

/// Payload for creating a film
#[derive(Debug, Clone)]
pub struct NewFilm {
    pub name: String,
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa_id: i32,
    pub genre_ids: BTreeSet<i32>,
    pub director: Option<String>,
}

/// Payload for creating a review; `useful` always starts at zero
#[derive(Debug, Clone)]
pub struct NewReview {
    pub content: String,
    pub is_positive: bool,
    pub user_id: i64,
    pub film_id: i64,
}

/// Canonical records plus the friendship relation over user ids
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn add_user(&self, user: NewUser) -> AppResult<User>;

    /// Fails `NotFound` when the id is absent
    async fn update_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn all_users(&self) -> AppResult<Vec<User>>;

    /// Inserts or confirms the directed edge `user_id -> friend_id`.
    /// Idempotent; fails `NotFound` when either user is unknown.
    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;

    /// Removes the directed edge; absent edges are a no-op.
    /// Fails `NotFound` only when a user id is unknown.
    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;

    /// Ids reachable by one outgoing edge, ascending
    async fn friend_ids(&self, user_id: i64) -> AppResult<Vec<i64>>;
}

/// Film records plus the per-film like set
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FilmStore: Send + Sync {
    async fn add_film(&self, film: NewFilm) -> AppResult<Film>;

    /// Replaces scalar attributes; the like set is untouched.
    /// Fails `NotFound` when the id is absent.
    async fn update_film(&self, film: Film) -> AppResult<Film>;

    async fn get_film(&self, id: i64) -> AppResult<Option<Film>>;

    async fn all_films(&self) -> AppResult<Vec<Film>>;

    /// Idempotent set insert; fails `NotFound` for unknown film or user
    async fn add_like(&self, film_id: i64, user_id: i64) -> AppResult<()>;

    /// Idempotent removal; still fails `NotFound` for an unknown film
    async fn remove_like(&self, film_id: i64, user_id: i64) -> AppResult<()>;

    /// Films ordered by descending like count, ties by ascending id
    async fn popular_films(&self, count: usize) -> AppResult<Vec<Film>>;

    /// Case-insensitive substring match over the requested fields.
    /// The caller guarantees a non-blank query and a non-empty field set.
    async fn search_films(&self, query: String, by: Vec<SearchField>) -> AppResult<Vec<Film>>;
}

/// Review records plus the per-review vote set and useful counter
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReviewStore: Send + Sync {
    async fn add_review(&self, review: NewReview) -> AppResult<Review>;

    /// Only `content` and `is_positive` change; authorship, subject film
    /// and the useful counter are preserved.
    async fn update_review(&self, id: i64, content: String, is_positive: bool)
        -> AppResult<Review>;

    async fn get_review(&self, id: i64) -> AppResult<Option<Review>>;

    /// Removes the review and its entire vote set; returns whether a
    /// record was deleted
    async fn delete_review(&self, id: i64) -> AppResult<bool>;

    /// Reviews ordered by descending useful score, ties by ascending id.
    /// `film_id = None` means all reviews.
    async fn reviews(&self, film_id: Option<i64>, count: usize) -> AppResult<Vec<Review>>;

    /// Records a vote and adjusts `useful` in the same atomic unit.
    /// Fails `Validation` when the user already holds any reaction on the
    /// review, `Conflict` when a concurrent insert won the race.
    async fn add_reaction(&self, review_id: i64, user_id: i64, reaction: Reaction)
        -> AppResult<()>;

    /// Removes a vote only when it matches the given polarity; a
    /// wrong-polarity or absent vote is a no-op. Successful removal applies
    /// the inverse counter delta in the same atomic unit.
    async fn remove_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()>;
}
