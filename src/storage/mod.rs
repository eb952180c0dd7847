//! Database-backed storage handles. Each handle wraps a cloned
//! `DatabaseConnection` and is built once at start-up.

mod film;
mod like;
mod reference;
mod user;

pub use film::FilmDbStorage;
pub use like::LikeDbStorage;
pub use reference::ReferenceDbStorage;
pub use user::UserDbStorage;
