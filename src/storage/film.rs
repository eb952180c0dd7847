use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info};

use super::{
    like::{LikeDbStorage, LikeStorage},
    reference::{ReferenceDbStorage, genre_from_row, mpa_from_row},
    user::UserDbStorage,
};
use crate::{
    entities::{film, genre, genre_film, like, mpa},
    error::{AppError, AppResult},
    models::{Film, FilmId, Genre, UserId},
};

#[derive(Clone)]
pub struct FilmDbStorage {
    db: DatabaseConnection,
    users: UserDbStorage,
    likes: LikeDbStorage,
    reference: ReferenceDbStorage,
}

impl FilmDbStorage {
    pub fn new(
        db: DatabaseConnection,
        users: UserDbStorage,
        likes: LikeDbStorage,
        reference: ReferenceDbStorage,
    ) -> Self {
        Self { db, users, likes, reference }
    }

    /// `Ok(None)` means the id is well formed but no film carries it.
    pub async fn get_film_by_id(&self, id: FilmId) -> AppResult<Option<Film>> {
        ensure_valid_id(id)?;
        let row = film::Entity::find_by_id(id.get())
            .find_also_related(mpa::Entity)
            .one(&self.db)
            .await?;

        let Some(row) = row else {
            debug!(film_id = %id, "film not found");
            return Ok(None);
        };
        Ok(self.assemble(vec![row]).await?.pop())
    }

    pub async fn get_all_films(&self) -> AppResult<Vec<Film>> {
        let rows = film::Entity::find()
            .find_also_related(mpa::Entity)
            .order_by_asc(film::Column::FilmId)
            .all(&self.db)
            .await?;
        self.assemble(rows).await
    }

    /// Inserts the film row and links its genres in one transaction, then
    /// returns the stored film with its new id. Unknown MPA or genre ids fail
    /// before anything is written.
    pub async fn create_film(&self, mut film: Film) -> AppResult<Film> {
        self.reference.get_mpa_by_id(film.mpa.id).await?;

        let txn = self.db.begin().await?;
        film.id = insert_row(&txn, &film).await?;
        self.create_genre_by_film(&txn, &film).await?;
        txn.commit().await?;

        info!(film_id = %film.id, name = %film.name, genres = film.genres.len(), "created film");
        self.require_film(film.id).await
    }

    /// Links every genre of `film` to it on `conn`. Not idempotent: linking a
    /// genre the film already has fails with `Conflict`.
    pub async fn create_genre_by_film<C: ConnectionTrait>(
        &self,
        conn: &C,
        film: &Film,
    ) -> AppResult<()> {
        if film.genres.is_empty() {
            return Ok(());
        }
        ensure_valid_id(film.id)?;
        ensure_genres_exist(conn, &film.genres).await?;
        insert_genres(conn, film.id, &film.genres).await
    }

    /// Swaps the film's genre links on `conn` for exactly `film.genres`.
    pub async fn replace_genres<C: ConnectionTrait>(&self, conn: &C, film: &Film) -> AppResult<()> {
        ensure_valid_id(film.id)?;
        ensure_genres_exist(conn, &film.genres).await?;

        genre_film::Entity::delete_many()
            .filter(genre_film::Column::FilmId.eq(film.id.get()))
            .exec(conn)
            .await?;
        insert_genres(conn, film.id, &film.genres).await?;

        debug!(film_id = %film.id, genres = film.genres.len(), "replaced film genres");
        Ok(())
    }

    /// Replaces the scalar fields and MPA rating. Likes and genre links are
    /// left as they are.
    pub async fn update_film(&self, film: &Film) -> AppResult<Film> {
        self.require_film(film.id).await?;
        self.reference.get_mpa_by_id(film.mpa.id).await?;

        update_row(&self.db, film).await?;
        info!(film_id = %film.id, "updated film");
        self.require_film(film.id).await
    }

    /// [`Self::update_film`] plus [`Self::replace_genres`], committed together.
    pub async fn update_film_with_genres(&self, film: &Film) -> AppResult<Film> {
        self.require_film(film.id).await?;
        self.reference.get_mpa_by_id(film.mpa.id).await?;

        let txn = self.db.begin().await?;
        update_row(&txn, film).await?;
        self.replace_genres(&txn, film).await?;
        txn.commit().await?;

        info!(film_id = %film.id, "updated film and genres");
        self.require_film(film.id).await
    }

    /// Deletes the film with its likes and genre links in one transaction.
    pub async fn delete_film(&self, film: &Film) -> AppResult<()> {
        ensure_valid_id(film.id)?;
        let id = film.id.get();

        let txn = self.db.begin().await?;
        like::Entity::delete_many().filter(like::Column::FilmId.eq(id)).exec(&txn).await?;
        genre_film::Entity::delete_many()
            .filter(genre_film::Column::FilmId.eq(id))
            .exec(&txn)
            .await?;
        let res = film::Entity::delete_by_id(id).exec(&txn).await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(AppError::not_found(format!("film {} not found", film.id)));
        }
        txn.commit().await?;

        info!(film_id = %film.id, "deleted film");
        Ok(())
    }

    /// Records that `user_id` likes the film and returns the new like count.
    pub async fn put_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<usize> {
        let film = self.require_film(film_id).await?;
        if film.likes.contains(&user_id) {
            return Err(AppError::conflict(format!("user {user_id} already liked film {film_id}")));
        }
        self.users.get_user_by_id(user_id).await?;

        // A concurrent duplicate slips past the check above; the likes
        // unique index turns it into Conflict inside save_like.
        self.likes.save_like(film_id, user_id).await?;
        self.likes.count_likes(film_id).await
    }

    pub async fn remove_like(&self, film_id: FilmId, user_id: UserId) -> AppResult<usize> {
        self.require_film(film_id).await?;
        self.users.get_user_by_id(user_id).await?;

        if !self.likes.remove_like(film_id, user_id).await? {
            return Err(AppError::not_found(format!("user {user_id} has not liked film {film_id}")));
        }
        self.likes.count_likes(film_id).await
    }

    /// Up to `count` films, most liked first; ties go to the lower id.
    pub async fn get_popular_films(&self, count: usize) -> AppResult<Vec<Film>> {
        if count == 0 {
            return Err(AppError::invalid("count must be positive"));
        }
        let mut films = self.get_all_films().await?;
        films.sort_by(|a, b| b.like_count().cmp(&a.like_count()).then(a.id.cmp(&b.id)));
        films.truncate(count);
        Ok(films)
    }

    async fn require_film(&self, id: FilmId) -> AppResult<Film> {
        self.get_film_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("film {id} not found")))
    }

    async fn assemble(&self, rows: Vec<(film::Model, Option<mpa::Model>)>) -> AppResult<Vec<Film>> {
        let ids: Vec<FilmId> = rows.iter().map(|(row, _)| FilmId(row.film_id)).collect();
        let mut genres = self.genres_by_film(&ids).await?;
        let mut likes = self.likes.likes_by_film(&ids).await?;

        rows.into_iter()
            .map(|(row, mpa)| {
                let mpa = mpa.ok_or_else(|| {
                    anyhow!("film {} references unknown mpa {}", row.film_id, row.mpa_id)
                })?;
                let mut film = film_from_row(row, mpa)?;
                film.genres = genres.remove(&film.id).unwrap_or_default();
                film.likes = likes.remove(&film.id).unwrap_or_default();
                Ok(film)
            })
            .collect()
    }

    async fn genres_by_film(&self, ids: &[FilmId]) -> AppResult<HashMap<FilmId, Vec<Genre>>> {
        let mut out: HashMap<FilmId, Vec<Genre>> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }

        let rows = genre_film::Entity::find()
            .filter(genre_film::Column::FilmId.is_in(ids.iter().map(|id| id.get())))
            .order_by_asc(genre_film::Column::Id)
            .find_also_related(genre::Entity)
            .all(&self.db)
            .await?;

        for (link, genre) in rows {
            let genre = genre.ok_or_else(|| {
                anyhow!("film {} references unknown genre {}", link.film_id, link.genre_id)
            })?;
            out.entry(FilmId(link.film_id)).or_default().push(genre_from_row(genre));
        }
        Ok(out)
    }
}

fn ensure_valid_id(id: FilmId) -> AppResult<()> {
    if id.is_assigned() {
        Ok(())
    } else {
        Err(AppError::invalid(format!("invalid film id {id}")))
    }
}

async fn ensure_genres_exist<C: ConnectionTrait>(conn: &C, genres: &[Genre]) -> AppResult<()> {
    let ids: BTreeSet<i32> = genres.iter().map(|g| g.id).collect();
    if ids.is_empty() {
        return Ok(());
    }
    let found = genre::Entity::find()
        .filter(genre::Column::GenreId.is_in(ids.iter().copied()))
        .count(conn)
        .await?;
    if found as usize != ids.len() {
        return Err(AppError::not_found("one or more genres not found"));
    }
    Ok(())
}

async fn insert_row<C: ConnectionTrait>(conn: &C, film: &Film) -> AppResult<FilmId> {
    let model = film::ActiveModel {
        film_id: NotSet,
        film_name: Set(film.name.clone()),
        description: Set(film.description.clone()),
        release_date: Set(film.release_date.to_string()),
        duration: Set(film.duration),
        mpa_id: Set(film.mpa.id),
    };
    let id = film::Entity::insert(model).exec(conn).await?.last_insert_id;
    Ok(FilmId(id))
}

async fn update_row<C: ConnectionTrait>(conn: &C, film: &Film) -> AppResult<()> {
    let model = film::ActiveModel {
        film_id: Set(film.id.get()),
        film_name: Set(film.name.clone()),
        description: Set(film.description.clone()),
        release_date: Set(film.release_date.to_string()),
        duration: Set(film.duration),
        mpa_id: Set(film.mpa.id),
    };
    model
        .update(conn)
        .await
        .map_err(|err| AppError::from_missing_row(err, format!("film {} not found", film.id)))?;
    Ok(())
}

async fn insert_genres<C: ConnectionTrait>(
    conn: &C,
    film_id: FilmId,
    genres: &[Genre],
) -> AppResult<()> {
    for genre in genres {
        let model = genre_film::ActiveModel {
            id: NotSet,
            film_id: Set(film_id.get()),
            genre_id: Set(genre.id),
        };
        genre_film::Entity::insert(model).exec(conn).await.map_err(|err| {
            AppError::from_unique_violation(
                err,
                format!("genre {} already linked to film {film_id}", genre.id),
            )
        })?;
    }
    Ok(())
}

fn film_from_row(row: film::Model, mpa: mpa::Model) -> AppResult<Film> {
    Ok(Film {
        id: FilmId(row.film_id),
        name: row.film_name,
        description: row.description,
        release_date: row.release_date.parse()?,
        duration: row.duration,
        mpa: mpa_from_row(mpa),
        likes: Default::default(),
        genres: Vec::new(),
    })
}
