use sea_orm_migration::{prelude::*, schema::*};

const MPA_RATINGS: [(i32, &str); 5] = [(1, "G"), (2, "PG"), (3, "PG-13"), (4, "R"), (5, "NC-17")];

const GENRES: [(i32, &str); 6] = [
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Animation"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Mpa::Table)
                    .if_not_exists()
                    .col(integer(Mpa::MpaId).primary_key())
                    .col(string(Mpa::MpaName).unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(integer(Genres::GenreId).primary_key())
                    .col(string(Genres::GenreName).unique_key())
                    .to_owned(),
            )
            .await?;

        let mut mpa = Query::insert();
        mpa.into_table(Mpa::Table).columns([Mpa::MpaId, Mpa::MpaName]);
        for (id, name) in MPA_RATINGS {
            mpa.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(mpa).await?;

        let mut genres = Query::insert();
        genres.into_table(Genres::Table).columns([Genres::GenreId, Genres::GenreName]);
        for (id, name) in GENRES {
            genres.values_panic([id.into(), name.into()]);
        }
        manager.exec_stmt(genres).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Mpa::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Mpa {
    Table,
    MpaId,
    MpaName,
}

#[derive(DeriveIden)]
pub(crate) enum Genres {
    Table,
    GenreId,
    GenreName,
}
