pub mod films;
pub mod reviews;
pub mod users;

pub use films::FilmService;
pub use reviews::ReviewService;
pub use users::UserService;

/// Fallback size for ranked listings when the caller sends no count or a
/// non-positive one
pub(crate) const DEFAULT_LIST_COUNT: usize = 10;

/// Resolves an optional caller-supplied count to a usable list size
pub(crate) fn list_count(count: Option<i64>) -> usize {
    match count {
        Some(c) if c > 0 => c as usize,
        _ => DEFAULT_LIST_COUNT,
    }
}
