use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{info, warn};

/// One teacher's attendance for one calendar day.
///
/// A row is created by the first accepted check-in of the day and mutated
/// exactly once more (check-out) or never again. The `(user_id, date)` pair
/// is unique at the storage layer; that index, not application state, is what
/// serializes racing writers from concurrently live process instances.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    /// Calendar day in the school's time zone, computed by the calendar gate.
    pub date: NaiveDate,
    pub check_in_at: DateTime<Utc>,
    pub check_in_lat: f64,
    pub check_in_lon: f64,
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_out_lat: Option<f64>,
    pub check_out_lon: Option<f64>,
    pub status: Status,
    pub arrival: Arrival,
    pub late_minutes: i32,
    pub total_hours: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session lifecycle state. A missing row means the day has not started.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_status")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closed")]
    Closed,
}

/// Punctuality classification recorded at check-in time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString,
    Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "attendance_arrival")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Arrival {
    #[sea_orm(string_value = "on_time")]
    OnTime,
    #[sea_orm(string_value = "late")]
    Late,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::teacher::Entity",
        from = "Column::UserId",
        to = "super::teacher::Column::UserId"
    )]
    Teacher,
}

impl Related<super::teacher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Outcome of a store write that lost to the committed state for its key.
///
/// Conflicts are expected products of the state machine, not faults; only
/// `Db` is a storage failure.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("a session is already open for this user and date")]
    AlreadyOpen,
    #[error("the session for this user and date is already closed")]
    AlreadyClosed,
    #[error("no open session exists for this user and date")]
    NoOpenSession,
    #[error(transparent)]
    Db(#[from] DbErr),
}

impl Model {
    /// Opens the session for `(user_id, date)`.
    ///
    /// The insert races directly against the unique index; when the engine
    /// rejects it the surviving row is re-read to report which conflict the
    /// caller actually lost to. No pre-check is made in process memory, so
    /// the result is correct even when the competing writer lives in the
    /// other deployment instance.
    pub async fn open(
        db: &DatabaseConnection,
        user_id: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        arrival: Arrival,
        late_minutes: i32,
    ) -> Result<Model, SessionStoreError> {
        let row = ActiveModel {
            user_id: Set(user_id),
            date: Set(date),
            check_in_at: Set(at),
            check_in_lat: Set(latitude),
            check_in_lon: Set(longitude),
            status: Set(Status::Open),
            arrival: Set(arrival),
            late_minutes: Set(late_minutes),
            created_at: Set(at),
            updated_at: Set(at),
            ..Default::default()
        };

        match row.insert(db).await {
            Ok(model) => {
                info!(user_id, %date, session_id = model.id, "attendance session opened");
                Ok(model)
            }
            Err(err) => {
                if !matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Err(SessionStoreError::Db(err));
                }
                // Lost the insert race; the committed row decides the error.
                match Self::find_for_day(db, user_id, date).await? {
                    Some(existing) if existing.status == Status::Open => {
                        warn!(user_id, %date, "duplicate check-in attempt");
                        Err(SessionStoreError::AlreadyOpen)
                    }
                    Some(_) => {
                        warn!(user_id, %date, "check-in attempt on closed session");
                        Err(SessionStoreError::AlreadyClosed)
                    }
                    None => Err(SessionStoreError::Db(DbErr::RecordNotFound(format!(
                        "attendance session for user {user_id} on {date} vanished after conflict"
                    )))),
                }
            }
        }
    }

    /// Closes the open session for `(user_id, date)`.
    ///
    /// Reads the committed row, then issues a conditional update guarded by
    /// `status = 'open'`. Zero affected rows means another writer closed the
    /// session between the read and the update, which is reported as
    /// `AlreadyClosed` rather than silently succeeding twice.
    pub async fn close(
        db: &DatabaseConnection,
        user_id: i64,
        date: NaiveDate,
        at: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Model, SessionStoreError> {
        let existing = match Self::find_for_day(db, user_id, date).await? {
            None => {
                warn!(user_id, %date, "check-out without a check-in");
                return Err(SessionStoreError::NoOpenSession);
            }
            Some(row) if row.status == Status::Closed => {
                warn!(user_id, %date, "duplicate check-out attempt");
                return Err(SessionStoreError::AlreadyClosed);
            }
            Some(row) => row,
        };

        // check_out_at must never precede check_in_at; clock skew between
        // instances is clamped rather than persisted.
        let at = if at < existing.check_in_at {
            warn!(user_id, %date, "check-out instant precedes check-in, clamping");
            existing.check_in_at
        } else {
            at
        };
        let total_hours = (at - existing.check_in_at).num_seconds() as f64 / 3600.0;

        let result = Entity::update_many()
            .col_expr(Column::CheckOutAt, Expr::value(at))
            .col_expr(Column::CheckOutLat, Expr::value(latitude))
            .col_expr(Column::CheckOutLon, Expr::value(longitude))
            .col_expr(Column::TotalHours, Expr::value(total_hours))
            .col_expr(Column::Status, Expr::value(Status::Closed))
            .col_expr(Column::UpdatedAt, Expr::value(at))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Date.eq(date))
            .filter(Column::Status.eq(Status::Open))
            .exec(db)
            .await
            .map_err(SessionStoreError::Db)?;

        if result.rows_affected == 0 {
            warn!(user_id, %date, "check-out raced with a concurrent close");
            return Err(SessionStoreError::AlreadyClosed);
        }

        info!(user_id, %date, total_hours, "attendance session closed");
        Self::find_for_day(db, user_id, date)
            .await?
            .ok_or_else(|| {
                SessionStoreError::Db(DbErr::RecordNotFound(format!(
                    "attendance session for user {user_id} on {date} vanished after close"
                )))
            })
    }

    /// Fetches the committed session row for one user-day, if any.
    pub async fn find_for_day(
        db: &DatabaseConnection,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Date.eq(date))
            .one(db)
            .await
    }

    /// One user's sessions in `[from, to]`, ascending by date.
    pub async fn history(
        db: &DatabaseConnection,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Date.gte(from))
            .filter(Column::Date.lte(to))
            .order_by_asc(Column::Date)
            .all(db)
            .await
    }

    /// The user's most recent sessions, newest first.
    pub async fn recent(
        db: &DatabaseConnection,
        user_id: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr> {
        use sea_orm::QuerySelect;

        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_desc(Column::Date)
            .limit(limit)
            .all(db)
            .await
    }

    /// All users' sessions in `[from, to]`, ascending by (date, user_id).
    /// Only committed rows are visible, so exports never observe a
    /// half-applied transition.
    pub async fn export_range(
        db: &DatabaseConnection,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Date.gte(from))
            .filter(Column::Date.lte(to))
            .order_by_asc(Column::Date)
            .order_by_asc(Column::UserId)
            .all(db)
            .await
    }

    /// One day's sessions joined with the teacher registry, in check-in order.
    pub async fn daily_report(
        db: &DatabaseConnection,
        date: NaiveDate,
    ) -> Result<Vec<(Model, Option<super::teacher::Model>)>, DbErr> {
        Entity::find()
            .find_also_related(super::teacher::Entity)
            .filter(Column::Date.eq(date))
            .order_by_asc(Column::CheckInAt)
            .all(db)
            .await
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::teacher::Model as TeacherModel;
    use crate::test_utils::setup_test_db;
    use chrono::TimeZone;

    async fn seed_teacher(db: &DatabaseConnection, user_id: i64) {
        TeacherModel::create_or_update(db, user_id, Some("t"), "Teacher", None, None, "uz", false)
            .await
            .expect("seed teacher");
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 8).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 8, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn open_then_close_happy_path() {
        let db = setup_test_db().await;
        seed_teacher(&db, 11).await;

        let opened = Model::open(&db, 11, monday(), at(3, 0), 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        assert_eq!(opened.status, Status::Open);
        assert!(opened.check_out_at.is_none());
        assert!(opened.total_hours.is_none());

        let closed = Model::close(&db, 11, monday(), at(11, 0), 41.2996, 69.2402)
            .await
            .unwrap();
        assert_eq!(closed.status, Status::Closed);
        assert_eq!(closed.check_in_at, opened.check_in_at);
        assert_eq!(closed.check_out_at, Some(at(11, 0)));
        assert!((closed.total_hours.unwrap() - 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn duplicate_open_fails_already_open() {
        let db = setup_test_db().await;
        seed_teacher(&db, 12).await;

        Model::open(&db, 12, monday(), at(3, 0), 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        let second =
            Model::open(&db, 12, monday(), at(3, 10), 41.2995, 69.2401, Arrival::OnTime, 0).await;
        assert!(matches!(second, Err(SessionStoreError::AlreadyOpen)));
    }

    #[tokio::test]
    async fn open_after_close_fails_already_closed() {
        let db = setup_test_db().await;
        seed_teacher(&db, 13).await;

        Model::open(&db, 13, monday(), at(3, 0), 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        Model::close(&db, 13, monday(), at(11, 0), 41.2995, 69.2401)
            .await
            .unwrap();

        let reopen =
            Model::open(&db, 13, monday(), at(11, 30), 41.2995, 69.2401, Arrival::OnTime, 0).await;
        assert!(matches!(reopen, Err(SessionStoreError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn close_without_open_fails_no_open_session() {
        let db = setup_test_db().await;
        seed_teacher(&db, 14).await;

        let result = Model::close(&db, 14, monday(), at(11, 0), 41.2995, 69.2401).await;
        assert!(matches!(result, Err(SessionStoreError::NoOpenSession)));
        // The failed close must not create a row.
        assert!(Model::find_for_day(&db, 14, monday()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn double_close_fails_already_closed() {
        let db = setup_test_db().await;
        seed_teacher(&db, 15).await;

        Model::open(&db, 15, monday(), at(3, 0), 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        Model::close(&db, 15, monday(), at(11, 0), 41.2995, 69.2401)
            .await
            .unwrap();
        let again = Model::close(&db, 15, monday(), at(11, 5), 41.2995, 69.2401).await;
        assert!(matches!(again, Err(SessionStoreError::AlreadyClosed)));
    }

    #[tokio::test]
    async fn checkout_before_checkin_is_clamped() {
        let db = setup_test_db().await;
        seed_teacher(&db, 16).await;

        Model::open(&db, 16, monday(), at(3, 0), 41.2995, 69.2401, Arrival::OnTime, 0)
            .await
            .unwrap();
        let closed = Model::close(&db, 16, monday(), at(2, 0), 41.2995, 69.2401)
            .await
            .unwrap();
        assert_eq!(closed.check_out_at, Some(closed.check_in_at));
        assert_eq!(closed.total_hours, Some(0.0));
    }

    #[tokio::test]
    async fn round_trip_preserves_timestamps_and_coordinates() {
        let db = setup_test_db().await;
        seed_teacher(&db, 17).await;

        let instant = Utc.with_ymd_and_hms(2025, 9, 8, 3, 0, 42).unwrap();
        let opened = Model::open(&db, 17, monday(), instant, 41.123456, 69.654321, Arrival::Late, 7)
            .await
            .unwrap();

        let read = Model::find_for_day(&db, 17, monday())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read, opened);
        assert_eq!(read.check_in_at, instant);
        assert_eq!(read.check_in_lat, 41.123456);
        assert_eq!(read.check_in_lon, 69.654321);
        assert_eq!(read.arrival, Arrival::Late);
        assert_eq!(read.late_minutes, 7);

        let exported = Model::export_range(&db, monday(), monday()).await.unwrap();
        assert_eq!(exported, vec![read]);
    }

    #[tokio::test]
    async fn history_and_export_are_ordered() {
        let db = setup_test_db().await;
        seed_teacher(&db, 18).await;
        seed_teacher(&db, 19).await;

        let tue = NaiveDate::from_ymd_opt(2025, 9, 9).unwrap();
        let wed = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();

        // Insert out of calendar order.
        Model::open(&db, 18, wed, at(3, 0), 41.0, 69.0, Arrival::OnTime, 0)
            .await
            .unwrap();
        Model::open(&db, 18, monday(), at(3, 0), 41.0, 69.0, Arrival::OnTime, 0)
            .await
            .unwrap();
        Model::open(&db, 19, tue, at(3, 0), 41.0, 69.0, Arrival::OnTime, 0)
            .await
            .unwrap();

        let history = Model::history(&db, 18, monday(), wed).await.unwrap();
        let dates: Vec<_> = history.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![monday(), wed]);

        let exported = Model::export_range(&db, monday(), wed).await.unwrap();
        let keys: Vec<_> = exported.iter().map(|s| (s.date, s.user_id)).collect();
        assert_eq!(keys, vec![(monday(), 18), (tue, 19), (wed, 18)]);
    }
}
