use std::{
    collections::BTreeSet,
    fmt,
    hash::{Hash, Hasher},
};

use jiff::civil::{Date, date};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Earliest accepted release date: the first public film screening.
pub const CINEMA_BIRTHDAY: Date = date(1895, 12, 28);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilmId(pub i64);

impl FilmId {
    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for FilmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_assigned(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mpa {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: i32,
    #[serde(default)]
    pub name: String,
}

/// A film together with its likes and genres.
///
/// Two `Film` values are the same film when their ids match, whatever their
/// other fields hold. `PartialEq` and `Hash` only look at `id`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: FilmId,
    pub name: String,
    pub description: String,
    pub release_date: Date,
    pub duration: i32,
    pub mpa: Mpa,
    pub likes: BTreeSet<UserId>,
    pub genres: Vec<Genre>,
}

impl Film {
    /// Appends a genre unless one with the same id is already present.
    pub fn add_genre(&mut self, genre: Genre) -> bool {
        if self.genres.iter().any(|g| g.id == genre.id) {
            return false;
        }
        self.genres.push(genre);
        true
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }
}

impl PartialEq for Film {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Film {}

impl Hash for Film {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub login: String,
    pub name: String,
    pub birthday: Date,
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Deserialize)]
pub struct IdRef {
    pub id: i32,
}

/// Film body of `POST /films` and `PUT /films`.
///
/// `genres` is optional so that an update can tell "leave genres alone"
/// (field missing) from "clear genres" (empty list).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilmRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub release_date: Date,
    pub duration: i32,
    pub mpa: IdRef,
    #[serde(default)]
    pub genres: Option<Vec<IdRef>>,
}

impl FilmRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid("film name must not be blank"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AppError::invalid(format!(
                "film description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if self.release_date < CINEMA_BIRTHDAY {
            return Err(AppError::invalid(format!(
                "release date must not be before {CINEMA_BIRTHDAY}"
            )));
        }
        if self.duration <= 0 {
            return Err(AppError::invalid("film duration must be positive"));
        }
        Ok(())
    }

    pub fn into_film(self) -> Film {
        let mut film = Film {
            id: FilmId(self.id.unwrap_or_default()),
            name: self.name,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            mpa: Mpa { id: self.mpa.id, name: String::new() },
            likes: BTreeSet::new(),
            genres: Vec::new(),
        };
        for genre in self.genres.into_iter().flatten() {
            film.add_genre(Genre { id: genre.id, name: String::new() });
        }
        film
    }
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub id: Option<i64>,
    pub email: String,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    pub birthday: Date,
}

impl UserRequest {
    pub fn validate(&self, today: Date) -> AppResult<()> {
        if !self.email.contains('@') {
            return Err(AppError::invalid("email must contain '@'"));
        }
        if self.login.is_empty() || self.login.chars().any(char::is_whitespace) {
            return Err(AppError::invalid("login must be non-empty and contain no spaces"));
        }
        if self.birthday > today {
            return Err(AppError::invalid("birthday must not be in the future"));
        }
        Ok(())
    }

    pub fn into_user(self) -> User {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.login.clone(),
        };
        User {
            id: UserId(self.id.unwrap_or_default()),
            email: self.email,
            login: self.login,
            name,
            birthday: self.birthday,
        }
    }
}
