use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::{
    entities::{genre, mpa},
    error::{AppError, AppResult},
    models::{Genre, Mpa},
};

/// Read-only access to the seeded MPA ratings and genres.
#[derive(Clone)]
pub struct ReferenceDbStorage {
    db: DatabaseConnection,
}

impl ReferenceDbStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_all_mpa(&self) -> AppResult<Vec<Mpa>> {
        let rows = mpa::Entity::find().order_by_asc(mpa::Column::MpaId).all(&self.db).await?;
        Ok(rows.into_iter().map(mpa_from_row).collect())
    }

    pub async fn get_mpa_by_id(&self, id: i32) -> AppResult<Mpa> {
        mpa::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(mpa_from_row)
            .ok_or_else(|| AppError::not_found(format!("mpa rating {id} not found")))
    }

    pub async fn get_all_genres(&self) -> AppResult<Vec<Genre>> {
        let rows =
            genre::Entity::find().order_by_asc(genre::Column::GenreId).all(&self.db).await?;
        Ok(rows.into_iter().map(genre_from_row).collect())
    }

    pub async fn get_genre_by_id(&self, id: i32) -> AppResult<Genre> {
        genre::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(genre_from_row)
            .ok_or_else(|| AppError::not_found(format!("genre {id} not found")))
    }
}

pub(super) fn mpa_from_row(row: mpa::Model) -> Mpa {
    Mpa { id: row.mpa_id, name: row.mpa_name }
}

pub(super) fn genre_from_row(row: genre::Model) -> Genre {
    Genre { id: row.genre_id, name: row.genre_name }
}
