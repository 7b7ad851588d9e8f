//! Reference appointment requests

use sqlx::SqlitePool;
use stacks_common::db::{ScheduleRequest, ScheduleRequestSubject};
use stacks_common::Result;

pub async fn get_subjects(pool: &SqlitePool) -> Result<Vec<ScheduleRequestSubject>> {
    let subjects = sqlx::query_as::<_, ScheduleRequestSubject>(
        "SELECT * FROM schedule_request_subjects WHERE is_active = 1 ORDER BY subject",
    )
    .fetch_all(pool)
    .await?;
    Ok(subjects)
}

/// Telephone record id for a normalized number, inserting it if new
pub async fn get_or_add_telephone(pool: &SqlitePool, phone: &str) -> Result<i64> {
    sqlx::query("INSERT OR IGNORE INTO schedule_request_telephones (phone) VALUES (?)")
        .bind(phone)
        .execute(pool)
        .await?;

    let id = sqlx::query_scalar("SELECT id FROM schedule_request_telephones WHERE phone = ?")
        .bind(phone)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

pub async fn add_request(pool: &SqlitePool, request: &ScheduleRequest) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO schedule_requests (
            requested_time, name, email, notes, language,
            schedule_request_subject_id, schedule_request_telephone_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(request.requested_time)
    .bind(&request.name)
    .bind(&request.email)
    .bind(&request.notes)
    .bind(&request.language)
    .bind(request.schedule_request_subject_id)
    .bind(request.schedule_request_telephone_id)
    .bind(request.created_at)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}
