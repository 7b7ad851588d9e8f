//! Reference appointment scheduling routes

mod helpers;

use axum::http::StatusCode;
use helpers::{exec, get_json, post_form, test_app, wednesday_at};
use sqlx::SqlitePool;
use stacks_common::db::settings::{self, keys::scheduling};

async fn enable_scheduling(pool: &SqlitePool) {
    settings::set_setting(pool, scheduling::ENABLE, true).await.unwrap();
    exec(pool, "INSERT INTO schedule_request_subjects (id, subject, is_active) VALUES (1, 'Genealogy', 1)").await;
    exec(pool, "INSERT INTO schedule_request_subjects (id, subject, is_active) VALUES (2, 'Retired topic', 0)").await;
}

const VALID_FORM: &str =
    "requested_date=2024-05-16&requested_time=09%3A00%3A00&name=Pat+Smith&phone=%28602%29+555-0100&subject_id=1";

#[tokio::test]
async fn disabled_scheduling_shows_no_schedule() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(&pool, "INSERT INTO segments (id, name, is_active) VALUES (10, 'Scheduling off', 1)").await;
    exec(&pool, "INSERT INTO segment_texts (segment_id, language_id, text) VALUES (10, 1, 'Call us instead')").await;
    settings::set_setting(&pool, scheduling::DISABLED_SEGMENT, 10).await.unwrap();

    let (status, body) = get_json(&app, "/Help/Schedule").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "NoSchedule");
    assert!(body["segment"]["html"].as_str().unwrap().contains("Call us instead"));
}

#[tokio::test]
async fn enabled_without_subjects_shows_no_schedule() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    settings::set_setting(&pool, scheduling::ENABLE, true).await.unwrap();

    let (_, body) = get_json(&app, "/Help/Schedule").await;
    assert_eq!(body["view"], "NoSchedule");
    assert!(body["segment"].is_null());
}

#[tokio::test]
async fn form_defaults_to_first_available() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    enable_scheduling(&pool).await;

    let (status, body) = get_json(&app, "/Help/Schedule").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "Form");
    assert_eq!(body["first_available"], "2024-05-15T14:00:00");
    assert_eq!(body["form"]["requested_date"], "2024-05-15");
    assert_eq!(body["form"]["requested_time"], "14:00:00");

    let subjects = body["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0]["subject"], "Genealogy");
}

#[tokio::test]
async fn valid_request_is_scheduled() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    enable_scheduling(&pool).await;
    exec(&pool, "INSERT INTO segments (id, name, is_active) VALUES (11, 'Scheduled', 1)").await;
    exec(&pool, "INSERT INTO segment_texts (segment_id, language_id, text) VALUES (11, 1, '**Thank you!**')").await;
    settings::set_setting(&pool, scheduling::SCHEDULED_SEGMENT, 11).await.unwrap();

    let (status, body) = post_form(&app, "/Help/Schedule", VALID_FORM).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "Scheduled");
    assert_eq!(body["subject"], "Genealogy");
    assert_eq!(body["requested_time"], "2024-05-16T09:00:00");
    assert!(body["segment"]["html"]
        .as_str()
        .unwrap()
        .contains("<strong>Thank you!</strong>"));

    let phone: String = sqlx::query_scalar("SELECT phone FROM schedule_request_telephones")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(phone, "6025550100");

    let (name, created_at): (String, chrono::NaiveDateTime) =
        sqlx::query_as("SELECT name, created_at FROM schedule_requests")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(name, "Pat Smith");
    assert_eq!(created_at, wednesday_at(10, 0));
}

#[tokio::test]
async fn repeat_caller_reuses_telephone_record() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    enable_scheduling(&pool).await;

    post_form(&app, "/Help/Schedule", VALID_FORM).await;
    post_form(&app, "/Help/Schedule", VALID_FORM).await;

    let telephones: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedule_request_telephones")
        .fetch_one(&pool)
        .await
        .unwrap();
    let requests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedule_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(telephones, 1);
    assert_eq!(requests, 2);
}

#[tokio::test]
async fn invalid_request_returns_form_with_errors() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    enable_scheduling(&pool).await;

    let body = "requested_date=2024-05-30&requested_time=09%3A00%3A00&name=&phone=555-0100&subject_id=2";
    let (status, body) = post_form(&app, "/Help/Schedule", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "Form");

    let errors = &body["errors"];
    assert_eq!(
        errors["requested_date"],
        "The furthest date you can schedule a call is 5/22/2024"
    );
    assert_eq!(
        errors["phone"],
        "Please enter a telephone number in the format: ###-###-####"
    );
    assert!(errors["name"].is_string());
    assert!(errors["subject_id"].is_string());
    assert_eq!(body["form"]["requested_date"], "2024-05-22");

    let requests: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schedule_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(requests, 0);
}

#[tokio::test]
async fn blank_fields_return_form_with_errors() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    enable_scheduling(&pool).await;

    let body = "requested_date=&requested_time=&name=Pat+Smith&phone=602-555-0100&subject_id=";
    let (status, body) = post_form(&app, "/Help/Schedule", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["view"], "Form");

    let errors = body["errors"].as_object().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["subject_id"], "Please select a subject.");
    assert_eq!(body["form"]["requested_date"], "2024-05-15");
    assert_eq!(body["form"]["requested_time"], "14:00:00");
}
