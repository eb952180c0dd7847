use sea_orm_migration::{prelude::*, schema::*};

use crate::{
    m20240101_000001_create_reference_tables::{Genres, Mpa},
    m20240101_000002_create_users::Users,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(pk_auto(Films::FilmId))
                    .col(string(Films::FilmName))
                    .col(string(Films::Description))
                    .col(string(Films::ReleaseDate))
                    .col(integer(Films::Duration))
                    .col(integer(Films::MpaId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_films_mpa")
                            .from(Films::Table, Films::MpaId)
                            .to(Mpa::Table, Mpa::MpaId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GenreFilm::Table)
                    .if_not_exists()
                    .col(pk_auto(GenreFilm::Id))
                    .col(integer(GenreFilm::FilmId))
                    .col(integer(GenreFilm::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genre_film_film")
                            .from(GenreFilm::Table, GenreFilm::FilmId)
                            .to(Films::Table, Films::FilmId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_genre_film_genre")
                            .from(GenreFilm::Table, GenreFilm::GenreId)
                            .to(Genres::Table, Genres::GenreId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_genre_film_unique")
                    .table(GenreFilm::Table)
                    .col(GenreFilm::FilmId)
                    .col(GenreFilm::GenreId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(pk_auto(Likes::Id))
                    .col(integer(Likes::FilmId))
                    .col(integer(Likes::UserId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_film")
                            .from(Likes::Table, Likes::FilmId)
                            .to(Films::Table, Films::FilmId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_likes_user")
                            .from(Likes::Table, Likes::UserId)
                            .to(Users::Table, Users::UserId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_likes_unique")
                    .table(Likes::Table)
                    .col(Likes::FilmId)
                    .col(Likes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Likes::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(GenreFilm::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Films::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Films {
    Table,
    FilmId,
    FilmName,
    Description,
    ReleaseDate,
    Duration,
    MpaId,
}

#[derive(DeriveIden)]
enum GenreFilm {
    Table,
    Id,
    FilmId,
    GenreId,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    Id,
    FilmId,
    UserId,
}
