//! SQLite-backed organisations and event calendars.

use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use eventsync_core::sync::OrganisationRepository;
use eventsync_domain::{
    DeploymentTag, EventCalendar, EventSyncError, Organisation, Result as DomainResult,
};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;

use super::manager::{map_sql_error, DbManager};
use crate::errors::map_join_error;

pub struct SqliteOrganisationRepository {
    db: Arc<DbManager>,
}

impl SqliteOrganisationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    pub async fn save_organisation(&self, organisation: &Organisation) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let organisation = organisation.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO organisations (id, name, email_suffix) VALUES (?1, ?2, ?3)
                 ON CONFLICT (id) DO UPDATE SET name = excluded.name, email_suffix = excluded.email_suffix",
                params![organisation.id, organisation.name, organisation.email_suffix],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    pub async fn save_event_calendar(&self, calendar: &EventCalendar) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let calendar = calendar.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO event_calendars (
                    id, organisation_id, calendar_identifier, environment, short_desc, full_desc,
                    time_zone
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (id) DO UPDATE SET
                    organisation_id = excluded.organisation_id,
                    calendar_identifier = excluded.calendar_identifier,
                    environment = excluded.environment,
                    short_desc = excluded.short_desc,
                    full_desc = excluded.full_desc,
                    time_zone = excluded.time_zone",
                params![
                    calendar.id,
                    calendar.organisation_id,
                    calendar.calendar_identifier,
                    calendar.environment.as_str(),
                    calendar.short_desc,
                    calendar.full_desc,
                    calendar.time_zone.name(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl OrganisationRepository for SqliteOrganisationRepository {
    async fn find_organisation_by_name(&self, name: &str) -> DomainResult<Option<Organisation>> {
        let db = Arc::clone(&self.db);
        let name = name.to_string();

        task::spawn_blocking(move || -> DomainResult<Option<Organisation>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, name, email_suffix FROM organisations WHERE name = ?1",
                params![name],
                |row| Ok(Organisation { id: row.get(0)?, name: row.get(1)?, email_suffix: row.get(2)? }),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_event_calendar(
        &self,
        organisation_id: i64,
        calendar_identifier: &str,
        environment: &DeploymentTag,
    ) -> DomainResult<Option<EventCalendar>> {
        let db = Arc::clone(&self.db);
        let calendar_identifier = calendar_identifier.to_string();
        let env = environment.clone();

        let row = task::spawn_blocking(move || -> DomainResult<Option<CalendarRow>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, organisation_id, calendar_identifier, short_desc, full_desc, time_zone
                 FROM event_calendars
                 WHERE organisation_id = ?1 AND calendar_identifier = ?2 AND environment = ?3",
                params![organisation_id, calendar_identifier, env.as_str()],
                map_calendar_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        row.map(|row| row.into_calendar(environment.clone())).transpose()
    }
}

struct CalendarRow {
    id: i64,
    organisation_id: i64,
    calendar_identifier: String,
    short_desc: String,
    full_desc: String,
    time_zone: String,
}

impl CalendarRow {
    fn into_calendar(self, environment: DeploymentTag) -> DomainResult<EventCalendar> {
        let time_zone = self.time_zone.parse::<Tz>().map_err(|e| {
            EventSyncError::Config(format!(
                "event calendar {} has unknown time zone '{}': {e}",
                self.id, self.time_zone
            ))
        })?;
        Ok(EventCalendar {
            id: self.id,
            organisation_id: self.organisation_id,
            calendar_identifier: self.calendar_identifier,
            environment,
            short_desc: self.short_desc,
            full_desc: self.full_desc,
            time_zone,
        })
    }
}

fn map_calendar_row(row: &Row<'_>) -> rusqlite::Result<CalendarRow> {
    Ok(CalendarRow {
        id: row.get(0)?,
        organisation_id: row.get(1)?,
        calendar_identifier: row.get(2)?,
        short_desc: row.get(3)?,
        full_desc: row.get(4)?,
        time_zone: row.get(5)?,
    })
}
