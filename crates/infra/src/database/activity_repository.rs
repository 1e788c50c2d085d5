//! SQLite-backed activity store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use eventsync_core::sync::ActivityRepository;
use eventsync_domain::{Activity, Admission, Location, Result as DomainResult, WindowBoundaryPolicy};
use rusqlite::{params, params_from_iter, Row};
use tokio::task;
use tracing::debug;

use super::manager::{map_sql_error, DbManager, SqliteConnection};
use crate::errors::map_join_error;

pub(crate) const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteActivityRepository {
    db: Arc<DbManager>,
}

impl SqliteActivityRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert or replace an activity together with its admissions.
    pub async fn save_activity(&self, activity: &Activity) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let activity = activity.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            upsert_activity(&mut conn, &activity).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ActivityRepository for SqliteActivityRepository {
    async fn find_activities(
        &self,
        organisation_ids: &[i64],
        start: NaiveDateTime,
        end: NaiveDateTime,
        policy: WindowBoundaryPolicy,
    ) -> DomainResult<Vec<Activity>> {
        if organisation_ids.is_empty() {
            return Ok(Vec::new());
        }
        let db = Arc::clone(&self.db);
        let organisation_ids = organisation_ids.to_vec();

        let activities = task::spawn_blocking(move || -> DomainResult<Vec<Activity>> {
            let conn = db.get_connection()?;
            query_activities(&conn, &organisation_ids, start, end, policy)
        })
        .await
        .map_err(map_join_error)??;

        debug!(count = activities.len(), %policy, "loaded activities");
        Ok(activities)
    }
}

// ============================================================================
// SQL Operations (synchronous)
// ============================================================================

/// Window predicate per policy over `?1` (window start) and `?2` (window end).
fn window_predicate(policy: WindowBoundaryPolicy) -> &'static str {
    match policy {
        WindowBoundaryPolicy::Intersects => {
            "start_time < ?2 AND (end_time > ?1 OR (end_time = start_time AND start_time >= ?1))"
        }
        WindowBoundaryPolicy::StartsWithin => "start_time >= ?1 AND start_time < ?2",
        WindowBoundaryPolicy::ContainedWithin => "start_time >= ?1 AND end_time <= ?2",
    }
}

fn query_activities(
    conn: &SqliteConnection,
    organisation_ids: &[i64],
    start: NaiveDateTime,
    end: NaiveDateTime,
    policy: WindowBoundaryPolicy,
) -> DomainResult<Vec<Activity>> {
    let placeholders: Vec<String> =
        (0..organisation_ids.len()).map(|i| format!("?{}", i + 3)).collect();
    let sql = format!(
        "SELECT id, organisation_id, short_desc, full_desc, start_time, end_time, cancelled,
                street, street_number, zip_code, city, country, address_short_description,
                address_category, cost, late_admission_cost, currency, late_admission_date,
                last_admission_date, dress_code, responsible_group
         FROM activities
         WHERE {} AND organisation_id IN ({})
         ORDER BY start_time, id",
        window_predicate(policy),
        placeholders.join(", ")
    );

    let start = start.format(LOCAL_TIME_FORMAT).to_string();
    let end = end.format(LOCAL_TIME_FORMAT).to_string();
    let mut values: Vec<rusqlite::types::Value> = vec![start.into(), end.into()];
    values.extend(organisation_ids.iter().map(|id| rusqlite::types::Value::from(*id)));

    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let mut activities = stmt
        .query_map(params_from_iter(values), map_activity_row)
        .map_err(map_sql_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_sql_error)?;

    let mut admissions = conn
        .prepare_cached(
            "SELECT alias, email_alias, email_suffix, responsible, note
             FROM admissions WHERE activity_id = ?1 ORDER BY alias",
        )
        .map_err(map_sql_error)?;
    for activity in &mut activities {
        activity.admissions = admissions
            .query_map(params![activity.id], map_admission_row)
            .map_err(map_sql_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sql_error)?;
    }

    Ok(activities)
}

fn upsert_activity(conn: &mut SqliteConnection, activity: &Activity) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO activities (
            id, organisation_id, short_desc, full_desc, start_time, end_time, cancelled,
            street, street_number, zip_code, city, country, address_short_description,
            address_category, cost, late_admission_cost, currency, late_admission_date,
            last_admission_date, dress_code, responsible_group
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
        ON CONFLICT (id) DO UPDATE SET
            organisation_id = excluded.organisation_id,
            short_desc = excluded.short_desc,
            full_desc = excluded.full_desc,
            start_time = excluded.start_time,
            end_time = excluded.end_time,
            cancelled = excluded.cancelled,
            street = excluded.street,
            street_number = excluded.street_number,
            zip_code = excluded.zip_code,
            city = excluded.city,
            country = excluded.country,
            address_short_description = excluded.address_short_description,
            address_category = excluded.address_category,
            cost = excluded.cost,
            late_admission_cost = excluded.late_admission_cost,
            currency = excluded.currency,
            late_admission_date = excluded.late_admission_date,
            last_admission_date = excluded.last_admission_date,
            dress_code = excluded.dress_code,
            responsible_group = excluded.responsible_group",
        params![
            activity.id,
            activity.organisation_id,
            activity.short_desc,
            activity.full_desc,
            activity.start_time.format(LOCAL_TIME_FORMAT).to_string(),
            activity.end_time.format(LOCAL_TIME_FORMAT).to_string(),
            activity.cancelled,
            activity.location.street,
            activity.location.number,
            activity.location.zip_code,
            activity.location.city,
            activity.location.country,
            activity.address_short_description,
            activity.address_category,
            activity.cost,
            activity.late_admission_cost,
            activity.currency,
            activity.late_admission_date.format(DATE_FORMAT).to_string(),
            activity.last_admission_date.format(DATE_FORMAT).to_string(),
            activity.dress_code,
            activity.responsible_group,
        ],
    )?;

    tx.execute("DELETE FROM admissions WHERE activity_id = ?1", params![activity.id])?;
    for admission in &activity.admissions {
        tx.execute(
            "INSERT INTO admissions (activity_id, alias, email_alias, email_suffix, responsible, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                activity.id,
                admission.alias,
                admission.email_alias,
                admission.organisation_email_suffix,
                admission.responsible,
                admission.note,
            ],
        )?;
    }
    tx.commit()
}

fn map_activity_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        organisation_id: row.get(1)?,
        short_desc: row.get(2)?,
        full_desc: row.get(3)?,
        start_time: parse_column(row, 4, |s| NaiveDateTime::parse_from_str(s, LOCAL_TIME_FORMAT))?,
        end_time: parse_column(row, 5, |s| NaiveDateTime::parse_from_str(s, LOCAL_TIME_FORMAT))?,
        cancelled: row.get(6)?,
        location: Location {
            street: row.get(7)?,
            number: row.get(8)?,
            zip_code: row.get(9)?,
            city: row.get(10)?,
            country: row.get(11)?,
        },
        address_short_description: row.get(12)?,
        address_category: row.get(13)?,
        cost: row.get(14)?,
        late_admission_cost: row.get(15)?,
        currency: row.get(16)?,
        late_admission_date: parse_column(row, 17, |s| NaiveDate::parse_from_str(s, DATE_FORMAT))?,
        last_admission_date: parse_column(row, 18, |s| NaiveDate::parse_from_str(s, DATE_FORMAT))?,
        dress_code: row.get(19)?,
        responsible_group: row.get(20)?,
        admissions: Vec::new(),
    })
}

fn map_admission_row(row: &Row<'_>) -> rusqlite::Result<Admission> {
    Ok(Admission {
        alias: row.get(0)?,
        email_alias: row.get(1)?,
        organisation_email_suffix: row.get(2)?,
        responsible: row.get(3)?,
        note: row.get(4)?,
    })
}

/// Read a text column and parse it, reporting failures as conversion errors.
pub(crate) fn parse_column<T, E>(
    row: &Row<'_>,
    index: usize,
    parse: impl FnOnce(&str) -> std::result::Result<T, E>,
) -> rusqlite::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(index)?;
    parse(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}
