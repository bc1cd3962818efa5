use std::collections::BTreeSet;

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::error::{AppError, AppResult};
use crate::models::{Film, Reaction, Review, SearchField, User};
use crate::storage::{FilmStore, NewFilm, NewReview, NewUser, ReviewStore, UserStore};

/// Durable store backed by PostgreSQL.
///
/// The `likes` and `review_votes` tables carry unique constraints on their
/// (entity, voter) pair; vote writes and the `useful` counter update run in
/// one transaction, so the counter never drifts from the vote rows. An
/// insert that hits the constraint after the double-vote pre-check passed
/// means a concurrent writer won the race, which surfaces as `Conflict`.
pub struct PostgresStore {
    pool: PgPool,
}

/// Maps driver failures; nothing sqlx-specific leaves this module
fn db(e: sqlx::Error) -> AppError {
    AppError::Unavailable(e.to_string())
}

fn map_user(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        login: row.try_get("login")?,
        name: row.try_get("name")?,
        birthday: row.try_get("birthday")?,
    })
}

fn map_film(row: &PgRow) -> Result<Film, sqlx::Error> {
    Ok(Film {
        id: row.try_get("film_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        release_date: row.try_get("release_date")?,
        duration: row.try_get("duration")?,
        mpa_id: row.try_get("mpa_id")?,
        genre_ids: BTreeSet::new(),
        director: row.try_get("director")?,
    })
}

fn map_review(row: &PgRow) -> Result<Review, sqlx::Error> {
    Ok(Review {
        id: row.try_get("review_id")?,
        content: row.try_get("content")?,
        is_positive: row.try_get("is_positive")?,
        user_id: row.try_get("user_id")?,
        film_id: row.try_get("film_id")?,
        useful: row.try_get("useful")?,
    })
}

impl PostgresStore {
    /// Connects the pool and applies pending migrations
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(db)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Unavailable(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn user_exists(&self, id: i64) -> AppResult<()> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE user_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        if row.try_get::<bool, _>(0).map_err(db)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User with id={} not found", id)))
        }
    }

    async fn film_exists(&self, id: i64) -> AppResult<()> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM films WHERE film_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        if row.try_get::<bool, _>(0).map_err(db)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Film with id={} not found", id)))
        }
    }

    async fn review_exists(&self, id: i64) -> AppResult<()> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM reviews WHERE review_id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        if row.try_get::<bool, _>(0).map_err(db)? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!(
                "Review with id={} not found",
                id
            )))
        }
    }

    async fn load_genre_ids(&self, film_id: i64) -> AppResult<BTreeSet<i32>> {
        let rows = sqlx::query("SELECT genre_id FROM film_genres WHERE film_id = $1")
            .bind(film_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter()
            .map(|row| row.try_get::<i32, _>("genre_id").map_err(db))
            .collect()
    }

    async fn with_genres(&self, mut film: Film) -> AppResult<Film> {
        film.genre_ids = self.load_genre_ids(film.id).await?;
        Ok(film)
    }
}

#[async_trait::async_trait]
impl UserStore for PostgresStore {
    async fn add_user(&self, user: NewUser) -> AppResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (email, login, name, birthday) \
             VALUES ($1, $2, $3, $4) RETURNING user_id",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;

        Ok(User {
            id: row.try_get("user_id").map_err(db)?,
            email: user.email,
            login: user.login,
            name: user.name,
            birthday: user.birthday,
        })
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let result = sqlx::query(
            "UPDATE users SET email = $1, login = $2, name = $3, birthday = $4 \
             WHERE user_id = $5",
        )
        .bind(&user.email)
        .bind(&user.login)
        .bind(&user.name)
        .bind(user.birthday)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User with id={} not found",
                user.id
            )));
        }
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE user_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(|r| map_user(&r).map_err(db)).transpose()
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.iter().map(|r| map_user(r).map_err(db)).collect()
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.user_exists(user_id).await?;
        self.user_exists(friend_id).await?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            "INSERT INTO friends (user_id, friend_id, confirmed) \
             VALUES ($1, $2, false) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        // A request from the other side confirms both halves of the edge
        let reverse =
            sqlx::query("SELECT EXISTS(SELECT 1 FROM friends WHERE user_id = $1 AND friend_id = $2)")
                .bind(friend_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(db)?;
        if reverse.try_get::<bool, _>(0).map_err(db)? {
            sqlx::query(
                "UPDATE friends SET confirmed = true \
                 WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)",
            )
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.user_exists(user_id).await?;
        self.user_exists(friend_id).await?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        let deleted = sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        if deleted.rows_affected() > 0 {
            // The surviving half of a mutual edge drops back to a request
            sqlx::query(
                "UPDATE friends SET confirmed = false WHERE user_id = $1 AND friend_id = $2",
            )
            .bind(friend_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn friend_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        self.user_exists(user_id).await?;
        let rows =
            sqlx::query("SELECT friend_id FROM friends WHERE user_id = $1 ORDER BY friend_id")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db)?;
        rows.iter()
            .map(|row| row.try_get::<i64, _>("friend_id").map_err(db))
            .collect()
    }
}

#[async_trait::async_trait]
impl FilmStore for PostgresStore {
    async fn add_film(&self, film: NewFilm) -> AppResult<Film> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let row = sqlx::query(
            "INSERT INTO films (name, description, release_date, duration, mpa_id, director) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING film_id",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa_id)
        .bind(&film.director)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;
        let id: i64 = row.try_get("film_id").map_err(db)?;

        for genre_id in &film.genre_ids {
            sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2)")
                .bind(id)
                .bind(*genre_id)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;

        Ok(Film {
            id,
            name: film.name,
            description: film.description,
            release_date: film.release_date,
            duration: film.duration,
            mpa_id: film.mpa_id,
            genre_ids: film.genre_ids,
            director: film.director,
        })
    }

    async fn update_film(&self, film: Film) -> AppResult<Film> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let result = sqlx::query(
            "UPDATE films SET name = $1, description = $2, release_date = $3, \
             duration = $4, mpa_id = $5, director = $6 WHERE film_id = $7",
        )
        .bind(&film.name)
        .bind(&film.description)
        .bind(film.release_date)
        .bind(film.duration)
        .bind(film.mpa_id)
        .bind(&film.director)
        .bind(film.id)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Film with id={} not found",
                film.id
            )));
        }

        sqlx::query("DELETE FROM film_genres WHERE film_id = $1")
            .bind(film.id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        for genre_id in &film.genre_ids {
            sqlx::query("INSERT INTO film_genres (film_id, genre_id) VALUES ($1, $2)")
                .bind(film.id)
                .bind(*genre_id)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(film)
    }

    async fn get_film(&self, id: i64) -> AppResult<Option<Film>> {
        let row = sqlx::query("SELECT * FROM films WHERE film_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        match row {
            Some(row) => {
                let film = map_film(&row).map_err(db)?;
                Ok(Some(self.with_genres(film).await?))
            }
            None => Ok(None),
        }
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        let rows = sqlx::query("SELECT * FROM films ORDER BY film_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        let mut films = Vec::with_capacity(rows.len());
        for row in &rows {
            let film = map_film(row).map_err(db)?;
            films.push(self.with_genres(film).await?);
        }
        Ok(films)
    }

    async fn add_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        self.film_exists(film_id).await?;
        self.user_exists(user_id).await?;

        // Unique pair constraint makes repeated likes a no-op
        sqlx::query(
            "INSERT INTO likes (film_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(film_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn remove_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        self.film_exists(film_id).await?;
        sqlx::query("DELETE FROM likes WHERE film_id = $1 AND user_id = $2")
            .bind(film_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }

    async fn popular_films(&self, count: usize) -> AppResult<Vec<Film>> {
        let rows = sqlx::query(
            "SELECT f.*, COUNT(l.user_id) AS likes_count FROM films f \
             LEFT JOIN likes l ON f.film_id = l.film_id \
             GROUP BY f.film_id \
             ORDER BY likes_count DESC, f.film_id ASC \
             LIMIT $1",
        )
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut films = Vec::with_capacity(rows.len());
        for row in &rows {
            let film = map_film(row).map_err(db)?;
            films.push(self.with_genres(film).await?);
        }
        Ok(films)
    }

    async fn search_films(&self, query: String, by: Vec<SearchField>) -> AppResult<Vec<Film>> {
        let mut clauses = Vec::new();
        for field in &by {
            match field {
                SearchField::Title => clauses.push("LOWER(name) LIKE $1"),
                SearchField::Director => clauses.push("LOWER(director) LIKE $1"),
            }
        }
        let sql = format!(
            "SELECT * FROM films WHERE {} ORDER BY film_id",
            clauses.join(" OR ")
        );
        let pattern = format!("%{}%", query.to_lowercase());

        let rows = sqlx::query(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        let mut films = Vec::with_capacity(rows.len());
        for row in &rows {
            let film = map_film(row).map_err(db)?;
            films.push(self.with_genres(film).await?);
        }
        Ok(films)
    }
}

#[async_trait::async_trait]
impl ReviewStore for PostgresStore {
    async fn add_review(&self, review: NewReview) -> AppResult<Review> {
        let row = sqlx::query(
            "INSERT INTO reviews (content, is_positive, user_id, film_id, useful) \
             VALUES ($1, $2, $3, $4, 0) RETURNING review_id",
        )
        .bind(&review.content)
        .bind(review.is_positive)
        .bind(review.user_id)
        .bind(review.film_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;

        Ok(Review {
            id: row.try_get("review_id").map_err(db)?,
            content: review.content,
            is_positive: review.is_positive,
            user_id: review.user_id,
            film_id: review.film_id,
            useful: 0,
        })
    }

    async fn update_review(
        &self,
        id: i64,
        content: String,
        is_positive: bool,
    ) -> AppResult<Review> {
        let row = sqlx::query(
            "UPDATE reviews SET content = $1, is_positive = $2 WHERE review_id = $3 \
             RETURNING review_id, content, is_positive, user_id, film_id, useful",
        )
        .bind(&content)
        .bind(is_positive)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        match row {
            Some(row) => map_review(&row).map_err(db),
            None => Err(AppError::NotFound(format!(
                "Review with id={} not found",
                id
            ))),
        }
    }

    async fn get_review(&self, id: i64) -> AppResult<Option<Review>> {
        let row = sqlx::query("SELECT * FROM reviews WHERE review_id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(|r| map_review(&r).map_err(db)).transpose()
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        // review_votes rows go with the review via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM reviews WHERE review_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn reviews(&self, film_id: Option<i64>, count: usize) -> AppResult<Vec<Review>> {
        let rows = match film_id {
            Some(film_id) => {
                self.film_exists(film_id).await?;
                sqlx::query(
                    "SELECT * FROM reviews WHERE film_id = $1 \
                     ORDER BY useful DESC, review_id ASC LIMIT $2",
                )
                .bind(film_id)
                .bind(count as i64)
                .fetch_all(&self.pool)
                .await
                .map_err(db)?
            }
            None => sqlx::query(
                "SELECT * FROM reviews ORDER BY useful DESC, review_id ASC LIMIT $1",
            )
            .bind(count as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db)?,
        };
        rows.iter().map(|r| map_review(r).map_err(db)).collect()
    }

    async fn add_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.review_exists(review_id).await?;
        self.user_exists(user_id).await?;

        let reacted = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM review_votes WHERE review_id = $1 AND user_id = $2)",
        )
        .bind(review_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        if reacted.try_get::<bool, _>(0).map_err(db)? {
            return Err(AppError::Validation(
                "User has already reacted to this review".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(db)?;

        let inserted = sqlx::query(
            "INSERT INTO review_votes (review_id, user_id, is_like) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(reaction == Reaction::Like)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        // The pre-check passed, so losing the unique-pair insert means a
        // concurrent writer got there first.
        if inserted.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "A concurrent reaction to this review won the race".to_string(),
            ));
        }

        sqlx::query("UPDATE reviews SET useful = useful + $1 WHERE review_id = $2")
            .bind(reaction.delta())
            .bind(review_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.review_exists(review_id).await?;
        self.user_exists(user_id).await?;

        let mut tx = self.pool.begin().await.map_err(db)?;

        let deleted = sqlx::query(
            "DELETE FROM review_votes WHERE review_id = $1 AND user_id = $2 AND is_like = $3",
        )
        .bind(review_id)
        .bind(user_id)
        .bind(reaction == Reaction::Like)
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        if deleted.rows_affected() > 0 {
            sqlx::query("UPDATE reviews SET useful = useful - $1 WHERE review_id = $2")
                .bind(reaction.delta())
                .bind(review_id)
                .execute(&mut *tx)
                .await
                .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }
}
