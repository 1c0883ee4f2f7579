use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::info;

/// Represents a teacher in the `teachers` table.
///
/// `user_id` is the chat platform's stable identifier; this service treats it
/// as opaque and never issues its own teacher ids.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "teachers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    /// Preferred language code; the transport renders messages with it.
    pub language: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attendance_session::Entity")]
    Sessions,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Registers a teacher or refreshes an existing registration.
    ///
    /// Upserts through the engine's conflict clause so two racing `/start`
    /// events never produce an error, matching the registry's last-write-wins
    /// semantics.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_or_update(
        db: &DatabaseConnection,
        user_id: i64,
        username: Option<&str>,
        first_name: &str,
        last_name: Option<&str>,
        phone_number: Option<&str>,
        language: &str,
        is_admin: bool,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();
        let row = ActiveModel {
            user_id: Set(user_id),
            username: Set(username.map(str::to_owned)),
            first_name: Set(first_name.to_owned()),
            last_name: Set(last_name.map(str::to_owned)),
            phone_number: Set(phone_number.map(str::to_owned)),
            language: Set(language.to_owned()),
            is_admin: Set(is_admin),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::UserId)
                    .update_columns([
                        Column::Username,
                        Column::FirstName,
                        Column::LastName,
                        Column::PhoneNumber,
                        Column::Language,
                        Column::IsAdmin,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(db)
            .await?;

        info!(user_id, ?username, "teacher registered/updated");

        Entity::find_by_id(user_id).one(db).await?.ok_or_else(|| {
            DbErr::RecordNotFound(format!("teacher {user_id} not found after upsert"))
        })
    }

    pub async fn find_by_user_id(
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id(user_id).one(db).await
    }

    /// The teacher's preferred language, if registered.
    pub async fn language(db: &DatabaseConnection, user_id: i64) -> Result<Option<String>, DbErr> {
        Ok(Self::find_by_user_id(db, user_id).await?.map(|t| t.language))
    }

    /// Updates the preferred language. Returns false for unknown users.
    pub async fn set_language(
        db: &DatabaseConnection,
        user_id: i64,
        language: &str,
    ) -> Result<bool, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::Language, Expr::value(language))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Activates or deactivates a teacher without deleting history.
    pub async fn set_active(
        db: &DatabaseConnection,
        user_id: i64,
        active: bool,
    ) -> Result<bool, DbErr> {
        let result = Entity::update_many()
            .col_expr(Column::IsActive, Expr::value(active))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::UserId.eq(user_id))
            .exec(db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn all_active(db: &DatabaseConnection) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::IsActive.eq(true))
            .all(db)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn upsert_is_idempotent_and_refreshes_fields() {
        let db = setup_test_db().await;

        let first = Model::create_or_update(&db, 7, Some("malika"), "Malika", None, None, "uz", false)
            .await
            .unwrap();
        assert_eq!(first.language, "uz");

        let second =
            Model::create_or_update(&db, 7, Some("malika"), "Malika", Some("K."), None, "en", false)
                .await
                .unwrap();
        assert_eq!(second.user_id, 7);
        assert_eq!(second.language, "en");
        assert_eq!(second.last_name.as_deref(), Some("K."));
    }

    #[tokio::test]
    async fn language_updates_only_known_users() {
        let db = setup_test_db().await;
        Model::create_or_update(&db, 8, None, "Aziz", None, None, "uz", false)
            .await
            .unwrap();

        assert!(Model::set_language(&db, 8, "en").await.unwrap());
        assert_eq!(Model::language(&db, 8).await.unwrap().as_deref(), Some("en"));
        assert!(!Model::set_language(&db, 999, "en").await.unwrap());
    }
}
