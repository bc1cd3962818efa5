use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{Film, SearchField};
use crate::reference::ReferenceData;
use crate::services::list_count;
use crate::storage::{FilmStore, NewFilm, UserStore};

/// Film entity operations, the like counter, and the ranking/search façade.
///
/// New and updated films are admitted only after their MPA rating and every
/// genre id resolve in the reference catalog; a dangling reference never
/// reaches the store.
pub struct FilmService {
    films: Arc<dyn FilmStore>,
    users: Arc<dyn UserStore>,
    reference: Arc<ReferenceData>,
}

impl FilmService {
    pub fn new(
        films: Arc<dyn FilmStore>,
        users: Arc<dyn UserStore>,
        reference: Arc<ReferenceData>,
    ) -> Self {
        Self {
            films,
            users,
            reference,
        }
    }

    pub async fn add_film(&self, film: NewFilm) -> AppResult<Film> {
        self.validate_references(film.mpa_id, &film.genre_ids)?;
        let film = self.films.add_film(film).await?;
        tracing::info!(film_id = film.id, name = %film.name, "film created");
        Ok(film)
    }

    pub async fn update_film(&self, film: Film) -> AppResult<Film> {
        self.validate_references(film.mpa_id, &film.genre_ids)?;
        let film = self.films.update_film(film).await?;
        tracing::info!(film_id = film.id, "film updated");
        Ok(film)
    }

    pub async fn get_film(&self, id: i64) -> AppResult<Film> {
        self.films
            .get_film(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Film with id={} not found", id)))
    }

    pub async fn all_films(&self) -> AppResult<Vec<Film>> {
        self.films.all_films().await
    }

    pub async fn add_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id={} not found", user_id)))?;
        self.films.add_like(film_id, user_id).await?;
        tracing::info!(film_id, user_id, "film liked");
        Ok(())
    }

    pub async fn remove_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id={} not found", user_id)))?;
        self.films.remove_like(film_id, user_id).await?;
        tracing::info!(film_id, user_id, "film like removed");
        Ok(())
    }

    pub async fn popular_films(&self, count: Option<i64>) -> AppResult<Vec<Film>> {
        self.films.popular_films(list_count(count)).await
    }

    /// Blank queries return nothing rather than scanning the whole catalog;
    /// unknown field names are dropped from the requested set.
    pub async fn search_films(&self, query: &str, by: Option<&str>) -> AppResult<Vec<Film>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let fields: Vec<SearchField> = match by {
            Some(by) => {
                // Order-preserving, with repeats collapsed wherever they appear
                let mut fields = Vec::new();
                for field in by.split(',').filter_map(SearchField::parse) {
                    if !fields.contains(&field) {
                        fields.push(field);
                    }
                }
                fields
            }
            None => vec![SearchField::Title, SearchField::Director],
        };
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        self.films.search_films(query.to_string(), fields).await
    }

    fn validate_references(&self, mpa_id: i32, genre_ids: &BTreeSet<i32>) -> AppResult<()> {
        self.reference.mpa(mpa_id)?;
        for genre_id in genre_ids {
            self.reference.genre(*genre_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mockall::predicate::eq;

    use super::*;
    use crate::storage::{MemoryStore, MockFilmStore, MockUserStore, NewUser};

    fn new_film(name: &str, mpa_id: i32, genre_ids: &[i32]) -> NewFilm {
        NewFilm {
            name: name.to_string(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(1995, 11, 17).unwrap(),
            duration: 171,
            mpa_id,
            genre_ids: genre_ids.iter().copied().collect(),
            director: None,
        }
    }

    fn service() -> FilmService {
        let store = Arc::new(MemoryStore::new());
        FilmService::new(
            store.clone(),
            store,
            Arc::new(ReferenceData::seeded()),
        )
    }

    #[tokio::test]
    async fn film_with_dangling_mpa_is_rejected() {
        let mut films = MockFilmStore::new();
        films.expect_add_film().never();
        let service = FilmService::new(
            Arc::new(films),
            Arc::new(MockUserStore::new()),
            Arc::new(ReferenceData::seeded()),
        );

        let result = service.add_film(new_film("Heat", 42, &[])).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn film_with_dangling_genre_is_rejected() {
        let service = service();
        let result = service.add_film(new_film("Heat", 4, &[1, 42])).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(service.all_films().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn valid_references_are_admitted() {
        let service = service();
        let film = service.add_film(new_film("Heat", 4, &[2, 6])).await.unwrap();
        assert_eq!(film.id, 1);
        assert_eq!(service.get_film(film.id).await.unwrap(), film);
    }

    #[tokio::test]
    async fn popular_count_defaults_to_ten() {
        let mut films = MockFilmStore::new();
        films
            .expect_popular_films()
            .with(eq(10usize))
            .times(2)
            .returning(|_| Ok(Vec::new()));
        let service = FilmService::new(
            Arc::new(films),
            Arc::new(MockUserStore::new()),
            Arc::new(ReferenceData::seeded()),
        );

        service.popular_films(None).await.unwrap();
        service.popular_films(Some(0)).await.unwrap();
    }

    #[tokio::test]
    async fn blank_search_query_short_circuits() {
        let mut films = MockFilmStore::new();
        films.expect_search_films().never();
        let service = FilmService::new(
            Arc::new(films),
            Arc::new(MockUserStore::new()),
            Arc::new(ReferenceData::seeded()),
        );

        assert!(service.search_films("  ", None).await.unwrap().is_empty());
        // All-unknown field names leave nothing to search
        assert!(service
            .search_films("heat", Some("year,rating"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn repeated_search_fields_are_collapsed() {
        let mut films = MockFilmStore::new();
        films
            .expect_search_films()
            .with(
                eq("heat".to_string()),
                eq(vec![SearchField::Title, SearchField::Director]),
            )
            .returning(|_, _| Ok(Vec::new()));
        let service = FilmService::new(
            Arc::new(films),
            Arc::new(MockUserStore::new()),
            Arc::new(ReferenceData::seeded()),
        );

        service
            .search_films("heat", Some("title,director,title"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_search_fields_are_ignored() {
        let mut films = MockFilmStore::new();
        films
            .expect_search_films()
            .with(eq("heat".to_string()), eq(vec![SearchField::Title]))
            .returning(|_, _| Ok(Vec::new()));
        let service = FilmService::new(
            Arc::new(films),
            Arc::new(MockUserStore::new()),
            Arc::new(ReferenceData::seeded()),
        );

        service
            .search_films("heat", Some("title,year"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn likes_require_a_known_user() {
        let store = Arc::new(MemoryStore::new());
        let service = FilmService::new(
            store.clone(),
            store.clone(),
            Arc::new(ReferenceData::seeded()),
        );
        let film = service.add_film(new_film("Heat", 4, &[])).await.unwrap();

        assert!(matches!(
            service.add_like(film.id, 99).await,
            Err(AppError::NotFound(_))
        ));

        use crate::storage::UserStore;
        let user = store
            .add_user(NewUser {
                email: "alice@example.com".to_string(),
                login: "alice".to_string(),
                name: "alice".to_string(),
                birthday: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            })
            .await
            .unwrap();

        service.add_like(film.id, user.id).await.unwrap();
        service.add_like(film.id, user.id).await.unwrap();
        let popular = service.popular_films(Some(1)).await.unwrap();
        assert_eq!(popular[0].id, film.id);
    }
}
