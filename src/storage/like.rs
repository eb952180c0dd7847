use std::collections::{BTreeSet, HashMap};

use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use tracing::debug;

use crate::{
    entities::like,
    error::{AppError, AppResult},
    models::{FilmId, UserId},
};

/// Persistence of the film/user like relation.
///
/// `save_like` fails with `Conflict` when the pair already exists; the
/// unique index on `(film_id, user_id)` is what enforces it, so the check
/// holds under concurrent writers too. `remove_like` reports whether a row
/// was deleted and is safe to repeat.
pub trait LikeStorage {
    async fn save_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()>;

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct LikeDbStorage {
    db: DatabaseConnection,
}

impl LikeDbStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn count_likes(&self, film_id: FilmId) -> AppResult<usize> {
        let count = like::Entity::find()
            .filter(like::Column::FilmId.eq(film_id.get()))
            .count(&self.db)
            .await?;
        Ok(count as usize)
    }

    /// Likes of each listed film. Films without likes are absent from the map.
    pub async fn likes_by_film(
        &self,
        film_ids: &[FilmId],
    ) -> AppResult<HashMap<FilmId, BTreeSet<UserId>>> {
        let mut out: HashMap<FilmId, BTreeSet<UserId>> = HashMap::new();
        if film_ids.is_empty() {
            return Ok(out);
        }

        let rows = like::Entity::find()
            .filter(like::Column::FilmId.is_in(film_ids.iter().map(|id| id.get())))
            .all(&self.db)
            .await?;

        for row in rows {
            out.entry(FilmId(row.film_id)).or_default().insert(UserId(row.user_id));
        }
        Ok(out)
    }
}

impl LikeStorage for LikeDbStorage {
    async fn save_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<()> {
        let model = like::ActiveModel {
            id: NotSet,
            film_id: Set(film_id.get()),
            user_id: Set(user_id.get()),
        };
        like::Entity::insert(model).exec(&self.db).await.map_err(|err| {
            AppError::from_unique_violation(
                err,
                format!("user {user_id} already liked film {film_id}"),
            )
        })?;
        debug!(film_id = %film_id, user_id = %user_id, "saved like");
        Ok(())
    }

    async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<bool> {
        let res = like::Entity::delete_many()
            .filter(like::Column::FilmId.eq(film_id.get()))
            .filter(like::Column::UserId.eq(user_id.get()))
            .exec(&self.db)
            .await?;
        debug!(film_id = %film_id, user_id = %user_id, removed = res.rows_affected, "removed like");
        Ok(res.rows_affected > 0)
    }
}
