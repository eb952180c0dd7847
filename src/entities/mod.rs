pub mod film;
pub mod genre;
pub mod genre_film;
pub mod like;
pub mod mpa;
pub mod user;
