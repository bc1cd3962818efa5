use std::sync::Arc;

use crate::reference::ReferenceData;
use crate::services::{FilmService, ReviewService, UserService};
use crate::storage::{FilmStore, MemoryStore, ReviewStore, UserStore};

/// Shared application state: the wired service layer
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub films: Arc<FilmService>,
    pub reviews: Arc<ReviewService>,
    pub reference: Arc<ReferenceData>,
}

impl AppState {
    /// Wires all services onto one store backend
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserStore + FilmStore + ReviewStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let films: Arc<dyn FilmStore> = store.clone();
        let reviews: Arc<dyn ReviewStore> = store;
        let reference = Arc::new(ReferenceData::seeded());

        Self {
            users: Arc::new(UserService::new(users.clone())),
            films: Arc::new(FilmService::new(
                films.clone(),
                users.clone(),
                reference.clone(),
            )),
            reviews: Arc::new(ReviewService::new(reviews, users, films)),
            reference,
        }
    }

    /// State over the dashmap arena; the default backend and the one tests use
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }
}
