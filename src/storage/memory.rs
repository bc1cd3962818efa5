use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{AppError, AppResult};
use crate::models::{Film, FriendshipState, Reaction, Review, SearchField, User};
use crate::storage::{FilmStore, NewFilm, NewReview, NewUser, ReviewStore, UserStore};

/// In-memory arena keyed by surrogate id.
///
/// Every relation lives inside the record of the entity that owns it, so a
/// dashmap entry guard serializes writers per film and per review while
/// different keys proceed in parallel. Friendship edges are keyed by the
/// unordered user pair: both directions share one entry, which keeps the
/// confirm/downgrade transitions atomic without taking two locks.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<i64, User>,
    films: DashMap<i64, FilmRecord>,
    reviews: DashMap<i64, ReviewRecord>,
    friendships: DashMap<(i64, i64), FriendshipState>,
    next_user_id: AtomicI64,
    next_film_id: AtomicI64,
    next_review_id: AtomicI64,
}

struct FilmRecord {
    film: Film,
    likes: HashSet<i64>,
}

struct ReviewRecord {
    review: Review,
    /// `review.useful` equals the sum of these deltas at all times; both are
    /// only ever touched under this record's entry guard.
    votes: HashMap<i64, Reaction>,
}

/// Canonical key for a friendship edge
fn pair(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(counter: &AtomicI64) -> i64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn ensure_user(&self, id: i64) -> AppResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User with id={} not found", id)))
        }
    }

    fn ensure_film(&self, id: i64) -> AppResult<()> {
        if self.films.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Film with id={} not found", id)))
        }
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn add_user(&self, user: NewUser) -> AppResult<User> {
        let id = Self::next_id(&self.next_user_id);
        let user = User {
            id,
            email: user.email,
            login: user.login,
            name: user.name,
            birthday: user.birthday,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        match self.users.get_mut(&user.id) {
            Some(mut existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AppError::NotFound(format!(
                "User with id={} not found",
                user.id
            ))),
        }
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn all_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.ensure_user(user_id)?;
        self.ensure_user(friend_id)?;

        match self.friendships.entry(pair(user_id, friend_id)) {
            Entry::Vacant(slot) => {
                slot.insert(FriendshipState::Requested { by: user_id });
            }
            Entry::Occupied(mut slot) => {
                // Re-adding an existing request is a no-op; a request from
                // the other side confirms the edge.
                if *slot.get() == (FriendshipState::Requested { by: friend_id }) {
                    slot.insert(FriendshipState::Mutual);
                }
            }
        }
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.ensure_user(user_id)?;
        self.ensure_user(friend_id)?;

        if let Entry::Occupied(mut slot) = self.friendships.entry(pair(user_id, friend_id)) {
            match *slot.get() {
                FriendshipState::Mutual => {
                    // The other side's half of the edge survives as a request
                    slot.insert(FriendshipState::Requested { by: friend_id });
                }
                FriendshipState::Requested { by } if by == user_id => {
                    slot.remove();
                }
                FriendshipState::Requested { .. } => {}
            }
        }
        Ok(())
    }

    async fn friend_ids(&self, user_id: i64) -> AppResult<Vec<i64>> {
        self.ensure_user(user_id)?;

        let mut ids: Vec<i64> = self
            .friendships
            .iter()
            .filter(|edge| edge.value().visible_to(user_id))
            .filter_map(|edge| {
                let (a, b) = *edge.key();
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[async_trait::async_trait]
impl FilmStore for MemoryStore {
    async fn add_film(&self, film: NewFilm) -> AppResult<Film> {
        let id = Self::next_id(&self.next_film_id);
        let film = Film {
            id,
            name: film.name,
            description: film.description,
            release_date: film.release_date,
            duration: film.duration,
            mpa_id: film.mpa_id,
            genre_ids: film.genre_ids,
            director: film.director,
        };
        self.films.insert(
            id,
            FilmRecord {
                film: film.clone(),
                likes: HashSet::new(),
            },
        );
        Ok(film)
    }

    async fn update_film(&self, film: Film) -> AppResult<Film> {
        match self.films.get_mut(&film.id) {
            Some(mut record) => {
                record.film = film.clone();
                Ok(film)
            }
            None => Err(AppError::NotFound(format!(
                "Film with id={} not found",
                film.id
            ))),
        }
    }

    async fn get_film(&self, id: i64) -> AppResult<Option<Film>> {
        Ok(self.films.get(&id).map(|record| record.film.clone()))
    }

    async fn all_films(&self) -> AppResult<Vec<Film>> {
        let mut films: Vec<Film> = self.films.iter().map(|r| r.film.clone()).collect();
        films.sort_by_key(|f| f.id);
        Ok(films)
    }

    async fn add_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        self.ensure_user(user_id)?;
        match self.films.get_mut(&film_id) {
            Some(mut record) => {
                record.likes.insert(user_id);
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Film with id={} not found",
                film_id
            ))),
        }
    }

    async fn remove_like(&self, film_id: i64, user_id: i64) -> AppResult<()> {
        match self.films.get_mut(&film_id) {
            Some(mut record) => {
                record.likes.remove(&user_id);
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Film with id={} not found",
                film_id
            ))),
        }
    }

    async fn popular_films(&self, count: usize) -> AppResult<Vec<Film>> {
        let mut ranked: Vec<(Film, usize)> = self
            .films
            .iter()
            .map(|record| (record.film.clone(), record.likes.len()))
            .collect();
        ranked.sort_by_key(|(film, likes)| (Reverse(*likes), film.id));
        ranked.truncate(count);
        Ok(ranked.into_iter().map(|(film, _)| film).collect())
    }

    async fn search_films(&self, query: String, by: Vec<SearchField>) -> AppResult<Vec<Film>> {
        let needle = query.to_lowercase();
        let mut matches: Vec<Film> = self
            .films
            .iter()
            .filter(|record| {
                by.iter().any(|field| match field {
                    SearchField::Title => record.film.name.to_lowercase().contains(&needle),
                    SearchField::Director => record
                        .film
                        .director
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle)),
                })
            })
            .map(|record| record.film.clone())
            .collect();
        matches.sort_by_key(|f| f.id);
        Ok(matches)
    }
}

#[async_trait::async_trait]
impl ReviewStore for MemoryStore {
    async fn add_review(&self, review: NewReview) -> AppResult<Review> {
        let id = Self::next_id(&self.next_review_id);
        let review = Review {
            id,
            content: review.content,
            is_positive: review.is_positive,
            user_id: review.user_id,
            film_id: review.film_id,
            useful: 0,
        };
        self.reviews.insert(
            id,
            ReviewRecord {
                review: review.clone(),
                votes: HashMap::new(),
            },
        );
        Ok(review)
    }

    async fn update_review(
        &self,
        id: i64,
        content: String,
        is_positive: bool,
    ) -> AppResult<Review> {
        match self.reviews.get_mut(&id) {
            Some(mut record) => {
                record.review.content = content;
                record.review.is_positive = is_positive;
                Ok(record.review.clone())
            }
            None => Err(AppError::NotFound(format!(
                "Review with id={} not found",
                id
            ))),
        }
    }

    async fn get_review(&self, id: i64) -> AppResult<Option<Review>> {
        Ok(self.reviews.get(&id).map(|record| record.review.clone()))
    }

    async fn delete_review(&self, id: i64) -> AppResult<bool> {
        // The vote set lives inside the record and is discarded with it
        Ok(self.reviews.remove(&id).is_some())
    }

    async fn reviews(&self, film_id: Option<i64>, count: usize) -> AppResult<Vec<Review>> {
        if let Some(film_id) = film_id {
            self.ensure_film(film_id)?;
        }

        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|record| film_id.map_or(true, |id| record.review.film_id == id))
            .map(|record| record.review.clone())
            .collect();
        reviews.sort_by_key(|r| (Reverse(r.useful), r.id));
        reviews.truncate(count);
        Ok(reviews)
    }

    async fn add_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.ensure_user(user_id)?;
        let mut record = self.reviews.get_mut(&review_id).ok_or_else(|| {
            AppError::NotFound(format!("Review with id={} not found", review_id))
        })?;

        // Check and insert happen under the same entry guard, so a racing
        // second vote is always observed as an existing reaction here.
        if record.votes.contains_key(&user_id) {
            return Err(AppError::Validation(
                "User has already reacted to this review".to_string(),
            ));
        }
        record.votes.insert(user_id, reaction);
        record.review.useful += reaction.delta();
        Ok(())
    }

    async fn remove_reaction(
        &self,
        review_id: i64,
        user_id: i64,
        reaction: Reaction,
    ) -> AppResult<()> {
        self.ensure_user(user_id)?;
        let mut record = self.reviews.get_mut(&review_id).ok_or_else(|| {
            AppError::NotFound(format!("Review with id={} not found", review_id))
        })?;

        // Polarity-specific: a vote of the other kind stays on file
        if record.votes.get(&user_id) == Some(&reaction) {
            record.votes.remove(&user_id);
            record.review.useful -= reaction.delta();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;

    async fn seed_user(store: &MemoryStore, login: &str) -> User {
        store
            .add_user(NewUser {
                email: format!("{}@example.com", login),
                login: login.to_string(),
                name: login.to_string(),
                birthday: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn seed_film(store: &MemoryStore, name: &str, director: Option<&str>) -> Film {
        store
            .add_film(NewFilm {
                name: name.to_string(),
                description: String::new(),
                release_date: NaiveDate::from_ymd_opt(1999, 3, 31).unwrap(),
                duration: 120,
                mpa_id: 3,
                genre_ids: Default::default(),
                director: director.map(str::to_string),
            })
            .await
            .unwrap()
    }

    async fn seed_review(store: &MemoryStore, user: &User, film: &Film) -> Review {
        store
            .add_review(NewReview {
                content: "worth watching".to_string(),
                is_positive: true,
                user_id: user.id,
                film_id: film.id,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn assigns_sequential_surrogate_ids() {
        let store = MemoryStore::new();
        let first = seed_user(&store, "alice").await;
        let second = seed_user(&store, "bob").await;
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn update_of_absent_user_is_not_found() {
        let store = MemoryStore::new();
        let mut user = seed_user(&store, "alice").await;
        user.id = 99;
        assert!(matches!(
            store.update_user(user).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn friend_request_is_directed_until_confirmed() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        store.add_friend(alice.id, bob.id).await.unwrap();
        assert_eq!(store.friend_ids(alice.id).await.unwrap(), vec![bob.id]);
        assert_eq!(store.friend_ids(bob.id).await.unwrap(), Vec::<i64>::new());

        store.add_friend(bob.id, alice.id).await.unwrap();
        assert_eq!(store.friend_ids(alice.id).await.unwrap(), vec![bob.id]);
        assert_eq!(store.friend_ids(bob.id).await.unwrap(), vec![alice.id]);
    }

    #[tokio::test]
    async fn removing_mutual_edge_keeps_other_half_as_request() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        store.add_friend(alice.id, bob.id).await.unwrap();
        store.add_friend(bob.id, alice.id).await.unwrap();

        store.remove_friend(alice.id, bob.id).await.unwrap();
        assert_eq!(store.friend_ids(alice.id).await.unwrap(), Vec::<i64>::new());
        assert_eq!(store.friend_ids(bob.id).await.unwrap(), vec![alice.id]);
    }

    #[tokio::test]
    async fn friend_mutations_are_idempotent() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        store.add_friend(alice.id, bob.id).await.unwrap();
        store.add_friend(alice.id, bob.id).await.unwrap();
        assert_eq!(store.friend_ids(alice.id).await.unwrap(), vec![bob.id]);

        store.remove_friend(alice.id, bob.id).await.unwrap();
        store.remove_friend(alice.id, bob.id).await.unwrap();
        assert_eq!(store.friend_ids(alice.id).await.unwrap(), Vec::<i64>::new());
    }

    #[tokio::test]
    async fn friend_mutations_require_known_users() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        assert!(matches!(
            store.add_friend(alice.id, 42).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.remove_friend(42, alice.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.friend_ids(42).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn likes_are_a_set() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;

        store.add_like(film.id, alice.id).await.unwrap();
        store.add_like(film.id, alice.id).await.unwrap();

        // One like from one user regardless of repetition: removing it once
        // leaves the film with an empty like set.
        store.remove_like(film.id, alice.id).await.unwrap();
        store.remove_like(film.id, alice.id).await.unwrap();
        let popular = store.popular_films(10).await.unwrap();
        assert_eq!(popular, vec![film]);
    }

    #[tokio::test]
    async fn like_mutations_validate_targets() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;

        assert!(matches!(
            store.add_like(99, alice.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.add_like(film.id, 99).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.remove_like(99, alice.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn popular_orders_by_likes_then_id() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let quiet = seed_film(&store, "Quiet", None).await;
        let hit = seed_film(&store, "Hit", None).await;
        let tied = seed_film(&store, "Tied", None).await;

        store.add_like(hit.id, alice.id).await.unwrap();
        store.add_like(hit.id, bob.id).await.unwrap();
        store.add_like(tied.id, alice.id).await.unwrap();

        let popular = store.popular_films(10).await.unwrap();
        // Zero-like films still appear, after all liked films
        assert_eq!(popular, vec![hit.clone(), tied, quiet]);

        let top = store.popular_films(1).await.unwrap();
        assert_eq!(top, vec![hit]);
    }

    #[tokio::test]
    async fn search_matches_requested_fields_case_insensitively() {
        let store = MemoryStore::new();
        let heat = seed_film(&store, "Heat", Some("Michael Mann")).await;
        let alien = seed_film(&store, "Alien", Some("Ridley Scott")).await;

        let by_title = store
            .search_films("hea".to_string(), vec![SearchField::Title])
            .await
            .unwrap();
        assert_eq!(by_title, vec![heat.clone()]);

        let by_director = store
            .search_films("SCOTT".to_string(), vec![SearchField::Director])
            .await
            .unwrap();
        assert_eq!(by_director, vec![alien]);

        // Director matches are not reported when only titles are searched
        let misses = store
            .search_films("mann".to_string(), vec![SearchField::Title])
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn useful_tracks_votes_exactly() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;

        store
            .add_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();
        store
            .add_reaction(review.id, bob.id, Reaction::Dislike)
            .await
            .unwrap();
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 0);

        store
            .remove_reaction(review.id, bob.id, Reaction::Dislike)
            .await
            .unwrap();
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 1);
    }

    #[tokio::test]
    async fn second_reaction_is_rejected_and_score_unchanged() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;

        store
            .add_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();
        let second = store
            .add_reaction(review.id, alice.id, Reaction::Dislike)
            .await;
        assert!(matches!(second, Err(AppError::Validation(_))));
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 1);
    }

    #[tokio::test]
    async fn wrong_polarity_removal_is_a_no_op() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;

        store
            .add_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();
        store
            .remove_reaction(review.id, alice.id, Reaction::Dislike)
            .await
            .unwrap();
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 1);

        // The like is still on file, so a dislike is still a double vote
        assert!(matches!(
            store.add_reaction(review.id, alice.id, Reaction::Dislike).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn vote_must_be_removed_before_switching_polarity() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;

        store
            .add_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 1);

        assert!(store
            .add_reaction(review.id, alice.id, Reaction::Dislike)
            .await
            .is_err());
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 1);

        store
            .remove_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();
        assert_eq!(store.get_review(review.id).await.unwrap().unwrap().useful, 0);

        store
            .add_reaction(review.id, alice.id, Reaction::Dislike)
            .await
            .unwrap();
        assert_eq!(
            store.get_review(review.id).await.unwrap().unwrap().useful,
            -1
        );
    }

    #[tokio::test]
    async fn reviews_order_by_useful_and_respect_film_filter() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let heat = seed_film(&store, "Heat", None).await;
        let alien = seed_film(&store, "Alien", None).await;

        let plain = seed_review(&store, &author, &heat).await;
        let praised = seed_review(&store, &alice, &heat).await;
        let other = seed_review(&store, &author, &alien).await;

        store
            .add_reaction(praised.id, author.id, Reaction::Like)
            .await
            .unwrap();

        let for_heat = store.reviews(Some(heat.id), 10).await.unwrap();
        assert_eq!(
            for_heat.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![praised.id, plain.id]
        );

        let all = store.reviews(None, 10).await.unwrap();
        assert_eq!(
            all.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![praised.id, plain.id, other.id]
        );

        let capped = store.reviews(None, 1).await.unwrap();
        assert_eq!(capped.len(), 1);

        assert!(matches!(
            store.reviews(Some(99), 10).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_votes_from_one_user_admit_exactly_one() {
        let store = Arc::new(MemoryStore::new());
        let author = seed_user(&store, "author").await;
        let voter = seed_user(&store, "voter").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;

        let mut tasks = Vec::new();
        for i in 0..64 {
            let store = store.clone();
            let reaction = if i % 2 == 0 {
                Reaction::Like
            } else {
                Reaction::Dislike
            };
            tasks.push(tokio::spawn(async move {
                store.add_reaction(review.id, voter.id, reaction).await
            }));
        }

        let mut successes = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);

        // The counter reflects exactly the vote that won, never a torn pair
        let useful = store.get_review(review.id).await.unwrap().unwrap().useful;
        assert!(useful == 1 || useful == -1, "useful was {}", useful);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_likes_collapse_to_one_set_entry() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(
                async move { store.add_like(film.id, alice.id).await },
            ));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        // All racers land on the same set entry: one removal empties it
        store.remove_like(film.id, alice.id).await.unwrap();
        let rival = seed_film(&store, "Rival", None).await;
        let ranked = store.popular_films(2).await.unwrap();
        assert_eq!(ranked, vec![film, rival]);
    }

    #[tokio::test]
    async fn delete_review_discards_votes() {
        let store = MemoryStore::new();
        let author = seed_user(&store, "author").await;
        let alice = seed_user(&store, "alice").await;
        let film = seed_film(&store, "Heat", None).await;
        let review = seed_review(&store, &author, &film).await;
        store
            .add_reaction(review.id, alice.id, Reaction::Like)
            .await
            .unwrap();

        assert!(store.delete_review(review.id).await.unwrap());
        assert!(!store.delete_review(review.id).await.unwrap());
        assert!(store.get_review(review.id).await.unwrap().is_none());
        assert!(matches!(
            store.add_reaction(review.id, alice.id, Reaction::Like).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn film_update_preserves_the_like_set() {
        let store = MemoryStore::new();
        let alice = seed_user(&store, "alice").await;
        let mut film = seed_film(&store, "Heat", None).await;
        store.add_like(film.id, alice.id).await.unwrap();

        film.description = "crime epic".to_string();
        store.update_film(film.clone()).await.unwrap();

        let popular = store.popular_films(1).await.unwrap();
        assert_eq!(popular[0].description, "crime epic");
        // Still ranked by its one like
        let rival = seed_film(&store, "Rival", None).await;
        let ranked = store.popular_films(2).await.unwrap();
        assert_eq!(ranked, vec![film, rival]);
    }
}
