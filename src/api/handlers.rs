use std::collections::BTreeSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::models::{Film, Genre, MpaRating, Review, User};
use crate::storage::{NewFilm, NewReview, NewUser};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub id: i64,
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: NaiveDate,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilmRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa_id: i32,
    #[serde(default)]
    pub genre_ids: BTreeSet<i32>,
    #[serde(default)]
    pub director: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFilmRequest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub mpa_id: i32,
    #[serde(default)]
    pub genre_ids: BTreeSet<i32>,
    #[serde(default)]
    pub director: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub content: String,
    pub is_positive: bool,
    pub user_id: i64,
    pub film_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    pub id: i64,
    pub content: String,
    pub is_positive: bool,
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListQuery {
    pub film_id: Option<i64>,
    pub count: Option<i64>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

// Users & friendship graph

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state
        .users
        .add_user(NewUser {
            email: request.email,
            login: request.login,
            name: request.name.unwrap_or_default(),
            birthday: request.birthday,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let user = state
        .users
        .update_user(User {
            id: request.id,
            email: request.email,
            login: request.login,
            name: request.name.unwrap_or_default(),
            birthday: request.birthday,
        })
        .await?;
    Ok(Json(user))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    Ok(Json(state.users.get_user(id).await?))
}

pub async fn get_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.all_users().await?))
}

pub async fn add_friend(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.users.add_friend(id, friend_id).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_friend(
    State(state): State<AppState>,
    Path((id, friend_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.users.remove_friend(id, friend_id).await?;
    Ok(StatusCode::OK)
}

pub async fn get_friends(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.friends(id).await?))
}

pub async fn get_common_friends(
    State(state): State<AppState>,
    Path((id, other_id)): Path<(i64, i64)>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.users.common_friends(id, other_id).await?))
}

// Films, likes & rankings

pub async fn create_film(
    State(state): State<AppState>,
    Json(request): Json<CreateFilmRequest>,
) -> AppResult<(StatusCode, Json<Film>)> {
    let film = state
        .films
        .add_film(NewFilm {
            name: request.name,
            description: request.description,
            release_date: request.release_date,
            duration: request.duration,
            mpa_id: request.mpa_id,
            genre_ids: request.genre_ids,
            director: request.director,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(film)))
}

pub async fn update_film(
    State(state): State<AppState>,
    Json(request): Json<UpdateFilmRequest>,
) -> AppResult<Json<Film>> {
    let film = state
        .films
        .update_film(Film {
            id: request.id,
            name: request.name,
            description: request.description,
            release_date: request.release_date,
            duration: request.duration,
            mpa_id: request.mpa_id,
            genre_ids: request.genre_ids,
            director: request.director,
        })
        .await?;
    Ok(Json(film))
}

pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Film>> {
    Ok(Json(state.films.get_film(id).await?))
}

pub async fn get_films(State(state): State<AppState>) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.all_films().await?))
}

pub async fn add_like(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.films.add_like(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_like(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.films.remove_like(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn get_popular_films(
    State(state): State<AppState>,
    Query(params): Query<PopularQuery>,
) -> AppResult<Json<Vec<Film>>> {
    Ok(Json(state.films.popular_films(params.count).await?))
}

pub async fn search_films(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<Film>>> {
    let films = state
        .films
        .search_films(&params.query, params.by.as_deref())
        .await?;
    Ok(Json(films))
}

// Reviews & votes

pub async fn create_review(
    State(state): State<AppState>,
    Json(request): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<Review>)> {
    let review = state
        .reviews
        .add_review(NewReview {
            content: request.content,
            is_positive: request.is_positive,
            user_id: request.user_id,
            film_id: request.film_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update_review(
    State(state): State<AppState>,
    Json(request): Json<UpdateReviewRequest>,
) -> AppResult<Json<Review>> {
    let review = state
        .reviews
        .update_review(request.id, request.content, request.is_positive)
        .await?;
    Ok(Json(review))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Review>> {
    Ok(Json(state.reviews.get_review(id).await?))
}

pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    Ok(Json(state.reviews.delete_review(id).await?))
}

pub async fn get_reviews(
    State(state): State<AppState>,
    Query(params): Query<ReviewListQuery>,
) -> AppResult<Json<Vec<Review>>> {
    let reviews = state.reviews.reviews(params.film_id, params.count).await?;
    Ok(Json(reviews))
}

pub async fn add_review_like(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.reviews.add_like(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn add_review_dislike(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.reviews.add_dislike(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_review_like(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.reviews.remove_like(id, user_id).await?;
    Ok(StatusCode::OK)
}

pub async fn remove_review_dislike(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    state.reviews.remove_dislike(id, user_id).await?;
    Ok(StatusCode::OK)
}

// Reference catalogs

pub async fn get_genres(State(state): State<AppState>) -> Json<Vec<Genre>> {
    Json(state.reference.all_genres())
}

pub async fn get_genre(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Genre>> {
    Ok(Json(state.reference.genre(id)?))
}

pub async fn get_mpa_ratings(State(state): State<AppState>) -> Json<Vec<MpaRating>> {
    Json(state.reference.all_mpa())
}

pub async fn get_mpa_rating(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<MpaRating>> {
    Ok(Json(state.reference.mpa(id)?))
}
