use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, EntityTrait, QueryOrder, Set,
};
use tracing::debug;

use crate::{
    entities::user,
    error::{AppError, AppResult},
    models::{User, UserId},
};

#[derive(Clone)]
pub struct UserDbStorage {
    db: DatabaseConnection,
}

impl UserDbStorage {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_user_by_id(&self, id: UserId) -> AppResult<User> {
        if !id.is_assigned() {
            return Err(AppError::invalid(format!("invalid user id {id}")));
        }
        let row = user::Entity::find_by_id(id.get())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {id} not found")))?;
        user_from_row(row)
    }

    pub async fn get_all_users(&self) -> AppResult<Vec<User>> {
        user::Entity::find()
            .order_by_asc(user::Column::UserId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(user_from_row)
            .collect()
    }

    pub async fn create_user(&self, mut user: User) -> AppResult<User> {
        let model = user::ActiveModel {
            user_id: NotSet,
            email: Set(user.email.clone()),
            login: Set(user.login.clone()),
            user_name: Set(user.name.clone()),
            birthday: Set(user.birthday.to_string()),
        };
        let id = user::Entity::insert(model).exec(&self.db).await?.last_insert_id;
        user.id = UserId(id);
        debug!(user_id = %user.id, login = %user.login, "created user");
        Ok(user)
    }

    pub async fn update_user(&self, user: User) -> AppResult<User> {
        // Fails with InvalidArgument or NotFound before anything is written.
        self.get_user_by_id(user.id).await?;

        let model = user::ActiveModel {
            user_id: Set(user.id.get()),
            email: Set(user.email.clone()),
            login: Set(user.login.clone()),
            user_name: Set(user.name.clone()),
            birthday: Set(user.birthday.to_string()),
        };
        model
            .update(&self.db)
            .await
            .map_err(|err| AppError::from_missing_row(err, format!("user {} not found", user.id)))?;
        debug!(user_id = %user.id, "updated user");
        Ok(user)
    }
}

fn user_from_row(row: user::Model) -> AppResult<User> {
    Ok(User {
        id: UserId(row.user_id),
        email: row.email,
        login: row.login,
        name: row.user_name,
        birthday: row.birthday.parse()?,
    })
}
