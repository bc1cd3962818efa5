use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};
use crate::models::{Genre, MpaRating};

/// Static genre and MPA rating catalogs.
///
/// These are read-mostly lookup tables seeded at startup. The film façade
/// consults them to reject films with dangling references; they are also
/// served read-only over the API.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    genres: BTreeMap<i32, Genre>,
    mpa: BTreeMap<i32, MpaRating>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::seeded()
    }
}

impl ReferenceData {
    /// Builds the catalogs with the standard seed rows
    pub fn seeded() -> Self {
        let genres = [
            (1, "Comedy"),
            (2, "Drama"),
            (3, "Cartoon"),
            (4, "Thriller"),
            (5, "Documentary"),
            (6, "Action"),
        ]
        .into_iter()
        .map(|(id, name)| (id, Genre { id, name: name.to_string() }))
        .collect();

        let mpa = [(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")]
            .into_iter()
            .map(|(id, name)| (id, MpaRating { id, name: name.to_string() }))
            .collect();

        Self { genres, mpa }
    }

    pub fn genre(&self, id: i32) -> AppResult<Genre> {
        self.genres
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Genre with id={} not found", id)))
    }

    pub fn mpa(&self, id: i32) -> AppResult<MpaRating> {
        self.mpa
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("MPA rating with id={} not found", id)))
    }

    pub fn all_genres(&self) -> Vec<Genre> {
        self.genres.values().cloned().collect()
    }

    pub fn all_mpa(&self) -> Vec<MpaRating> {
        self.mpa.values().cloned().collect()
    }
}
