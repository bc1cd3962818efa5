use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Reaction, Review};
use crate::services::list_count;
use crate::storage::{FilmStore, NewReview, ReviewStore, UserStore};

/// Review entity operations and the vote state machine.
///
/// Per (review, voter) pair the only legal transitions are
/// NONE -> LIKE, NONE -> DISLIKE and their polarity-matched removals; a
/// direct LIKE -> DISLIKE switch requires an explicit remove in between.
/// The transition itself and the `useful` adjustment are one atomic unit
/// inside the store.
pub struct ReviewService {
    reviews: Arc<dyn ReviewStore>,
    users: Arc<dyn UserStore>,
    films: Arc<dyn FilmStore>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        users: Arc<dyn UserStore>,
        films: Arc<dyn FilmStore>,
    ) -> Self {
        Self {
            reviews,
            users,
            films,
        }
    }

    pub async fn add_review(&self, review: NewReview) -> AppResult<Review> {
        self.ensure_user(review.user_id).await?;
        self.ensure_film(review.film_id).await?;
        let review = self.reviews.add_review(review).await?;
        tracing::info!(
            review_id = review.id,
            film_id = review.film_id,
            user_id = review.user_id,
            "review created"
        );
        Ok(review)
    }

    pub async fn update_review(
        &self,
        id: i64,
        content: String,
        is_positive: bool,
    ) -> AppResult<Review> {
        let review = self.reviews.update_review(id, content, is_positive).await?;
        tracing::info!(review_id = review.id, "review updated");
        Ok(review)
    }

    pub async fn get_review(&self, id: i64) -> AppResult<Review> {
        self.reviews
            .get_review(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review with id={} not found", id)))
    }

    pub async fn delete_review(&self, id: i64) -> AppResult<bool> {
        if !self.reviews.delete_review(id).await? {
            return Err(AppError::NotFound(format!(
                "Review with id={} not found",
                id
            )));
        }
        tracing::info!(review_id = id, "review deleted");
        Ok(true)
    }

    pub async fn reviews(&self, film_id: Option<i64>, count: Option<i64>) -> AppResult<Vec<Review>> {
        if let Some(film_id) = film_id {
            self.ensure_film(film_id).await?;
        }
        self.reviews.reviews(film_id, list_count(count)).await
    }

    pub async fn add_like(&self, review_id: i64, user_id: i64) -> AppResult<()> {
        self.add_reaction(review_id, user_id, Reaction::Like).await
    }

    pub async fn add_dislike(&self, review_id: i64, user_id: i64) -> AppResult<()> {
        self.add_reaction(review_id, user_id, Reaction::Dislike).await
    }

    pub async fn remove_like(&self, review_id: i64, user_id: i64) -> AppResult<()> {
        self.remove_reaction(review_id, user_id, Reaction::Like).await
    }

    pub async fn remove_dislike(&self, review_id: i64, user_id: i64) -> AppResult<()> {
        self.remove_reaction(review_id, user_id, Reaction::Dislike)
            .await
    }

    async fn add_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.ensure_user(user_id).await?;
        self.reviews.add_reaction(review_id, user_id, reaction).await?;
        tracing::info!(review_id, user_id, ?reaction, "review reaction added");
        Ok(())
    }

    async fn remove_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.ensure_user(user_id).await?;
        self.reviews
            .remove_reaction(review_id, user_id, reaction)
            .await?;
        tracing::info!(review_id, user_id, ?reaction, "review reaction removed");
        Ok(())
    }

    async fn ensure_user(&self, id: i64) -> AppResult<()> {
        self.users
            .get_user(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User with id={} not found", id)))
    }

    async fn ensure_film(&self, id: i64) -> AppResult<()> {
        self.films
            .get_film(id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Film with id={} not found", id)))
    }
}
