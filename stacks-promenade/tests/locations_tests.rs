//! Location routes against an in-memory database

mod helpers;

use axum::http::StatusCode;
use helpers::{app_at, exec, get_json, get_json_with_language, test_app, wednesday_at};

#[tokio::test]
async fn health_reports_module() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "stacks-promenade");
}

#[tokio::test]
async fn index_lists_locations_by_name_with_status() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/Locations").await;
    assert_eq!(status, StatusCode::OK);

    let locations = body["locations"].as_array().unwrap();
    let names: Vec<&str> = locations.iter().map(|l| l["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Annex", "Branch", "Central"]);

    assert_eq!(locations[0]["current_status"]["status_message"], "Closed");
    assert_eq!(locations[1]["current_status"]["status_message"], "Open");
    assert_eq!(locations[2]["current_status"]["status_message"], "Open until 5:00 PM");
    assert_eq!(locations[2]["current_status"]["is_currently_open"], true);
    assert!(locations[2]["distance"].is_null());
}

#[tokio::test]
async fn status_before_opening_and_after_closing() {
    let (app, _) = test_app(wednesday_at(7, 30)).await;
    let (_, body) = get_json(&app, "/Locations").await;
    assert_eq!(
        body["locations"][2]["current_status"]["status_message"],
        "Opens at 9:00 AM"
    );
    assert_eq!(
        body["locations"][2]["current_status"]["next_status_change"],
        "2024-05-15T09:00:00"
    );

    let (app, _) = test_app(wednesday_at(18, 0)).await;
    let (_, body) = get_json(&app, "/Locations").await;
    assert_eq!(
        body["locations"][2]["current_status"]["status_message"],
        "Opens tomorrow at 9:00 AM"
    );
}

#[tokio::test]
async fn index_with_coordinates_sorts_nearest_first() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) =
        get_json(&app, "/Locations?latitude=33.4484&longitude=-112.0740").await;
    assert_eq!(status, StatusCode::OK);

    let locations = body["locations"].as_array().unwrap();
    let names: Vec<&str> = locations.iter().map(|l| l["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Central", "Branch", "Annex"]);
    assert_eq!(locations[0]["distance"], 0.0);
    assert!(locations[1]["distance"].as_f64().unwrap() > 0.0);
    assert!(locations[2]["distance"].is_null());
    assert_eq!(body["zip"], "85004");
}

#[tokio::test]
async fn find_by_zip_geocodes_and_warns_when_unknown() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/Locations/Find?zip=85004").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locations"][0]["name"], "Central");
    assert!(body.get("warning").is_none());

    let (status, body) = get_json(&app, "/Locations/Find?zip=99999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["locations"][0]["name"], "Annex");
    assert!(body["warning"].as_str().unwrap().contains("99999"));

    let (status, _) = get_json(&app, "/Locations/Find?zip=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn detail_includes_hours_features_and_neighbors() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/Locations/central").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["location"]["name"], "Central");
    assert_eq!(
        body["location"]["description_segment"]["text"],
        "Welcome to Central"
    );

    let hours = body["hours"].as_array().unwrap();
    assert_eq!(hours.len(), 3);
    assert_eq!(hours[0]["days"], "Mon \u{2013} Fri");
    assert_eq!(hours[0]["time"], "9 am \u{2013} 5 pm");
    assert_eq!(hours[1]["time"], "10 am \u{2013} 2:30 pm");
    assert_eq!(hours[2]["days"], "Sun");
    assert_eq!(hours[2]["time"], "Closed");

    let structured = body["structured_hours"].as_array().unwrap();
    assert_eq!(structured.len(), 2);
    assert_eq!(structured[0]["days"], "Mo\u{2013}Fr");
    assert_eq!(structured[0]["time"], "09:00 \u{2013} 17:00");
    assert_eq!(structured[1]["time"], "10:00 \u{2013} 14:30");

    assert_eq!(body["features"][0]["stub"], "study-rooms");
    assert_eq!(body["neighbor_group"]["stub"], "downtown");

    let neighbors = body["neighbors"].as_array().unwrap();
    assert_eq!(neighbors.len(), 2);
    assert_eq!(neighbors[0]["location"]["name"], "Central");
    assert!(neighbors[1]["location"].is_null());
}

#[tokio::test]
async fn detail_uses_accept_language_with_default_fallback() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (_, body) = get_json_with_language(&app, "/Locations/central", Some("es-US,es;q=0.9")).await;
    assert_eq!(
        body["location"]["description_segment"]["text"],
        "Bienvenidos a Central"
    );

    let (_, body) = get_json_with_language(&app, "/Locations/central", Some("fr-FR")).await;
    assert_eq!(
        body["location"]["description_segment"]["text"],
        "Welcome to Central"
    );
}

#[tokio::test]
async fn unknown_slug_is_not_found() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/Locations/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn closed_override_today_points_to_next_opening() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(
        &pool,
        "INSERT INTO location_hours_overrides (location_id, date, open, reason) VALUES (1, '2024-05-15', 0, 'Staff training')",
    )
    .await;

    let (_, body) = get_json(&app, "/Locations/central").await;
    let status = &body["current_status"];
    assert_eq!(status["is_override"], true);
    assert_eq!(status["is_currently_open"], false);
    assert_eq!(status["status_message"], "Opens tomorrow at 9:00 AM");
    assert_eq!(status["next_open_date_time"], "2024-05-16T09:00:00");
}

#[tokio::test]
async fn next_opening_skips_closed_override_days() {
    let (app, pool) = test_app(wednesday_at(18, 0)).await;
    exec(
        &pool,
        "INSERT INTO location_hours_overrides (location_id, date, open) VALUES (1, '2024-05-16', 0)",
    )
    .await;

    let (_, body) = get_json(&app, "/Locations/central").await;
    assert_eq!(
        body["current_status"]["status_message"],
        "Opens Fri at 9:00 AM"
    );
}

#[tokio::test]
async fn weekly_hours_merge_overrides() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(
        &pool,
        "INSERT INTO location_hours_overrides (location_id, date, open) VALUES (1, '2024-05-16', 0)",
    )
    .await;

    let (status, body) = get_json(&app, "/Locations/central/Weekly").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Central");

    let days = body["weekly_hours"].as_array().unwrap();
    assert_eq!(days.len(), 7);
    for (index, day) in days.iter().enumerate() {
        assert_eq!(day["day_of_week"], index as i64);
    }

    assert_eq!(days[3]["is_currently_open"], true);
    assert_eq!(days[2]["is_currently_open"], false);
    assert_eq!(days[4]["is_override"], true);
    assert_eq!(days[4]["open"], false);
    assert_eq!(days[5]["open_time"], "09:00:00");
}

#[tokio::test]
async fn feature_route_returns_location_feature() {
    let (app, _) = test_app(wednesday_at(10, 0)).await;

    let (status, body) = get_json(&app, "/Locations/central/study-rooms").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feature"]["name"], "Study Rooms");
    assert_eq!(body["feature"]["text"], "Book a room");

    let (status, _) = get_json(&app, "/Locations/central/makerspace").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn closures_report_system_wide_reason() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(
        &pool,
        "INSERT INTO location_hours_overrides (location_id, date, open, reason) VALUES (NULL, '2024-12-25', 0, 'Christmas Day')",
    )
    .await;

    let (_, body) = get_json(&app, "/Closures?date=2024-12-25").await;
    assert_eq!(body["reason"], "Christmas Day");

    let (_, body) = get_json(&app, "/Closures").await;
    assert_eq!(body["date"], "2024-05-15");
    assert!(body["reason"].is_null());
}

#[tokio::test]
async fn force_reload_bypasses_cached_location() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;

    let (_, body) = get_json(&app, "/Locations/central/Weekly").await;
    assert_eq!(body["name"], "Central");

    exec(&pool, "UPDATE locations SET name = 'Central Library' WHERE id = 1").await;

    let (_, body) = get_json(&app, "/Locations/central/Weekly").await;
    assert_eq!(body["name"], "Central");

    let (_, body) = get_json(&app, "/Locations/central/Weekly?forceReload=true").await;
    assert_eq!(body["name"], "Central Library");
}

#[tokio::test]
async fn hours_segment_reports_special_hours() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(&pool, "INSERT INTO segments (id, name, is_active) VALUES (2, 'Holiday hours', 1)").await;
    exec(
        &pool,
        "INSERT INTO segment_texts (segment_id, language_id, text) VALUES (2, 1, 'Open noon to 4 this week')",
    )
    .await;
    exec(&pool, "UPDATE locations SET hours_segment_id = 2 WHERE id = 1").await;

    let (_, body) = get_json(&app, "/Locations/central").await;
    let status = &body["current_status"];
    assert_eq!(status["is_special_hours"], true);
    assert_eq!(status["status_message"], "Special Hours");
    assert_eq!(status["is_currently_open"], false);
    assert_eq!(
        body["location"]["hours_segment"]["text"],
        "Open noon to 4 this week"
    );
}

#[tokio::test]
async fn description_disappears_when_its_window_ends() {
    let (morning, pool) = test_app(wednesday_at(9, 0)).await;
    exec(&pool, "UPDATE segments SET end_date = '2024-05-15 09:30:00' WHERE id = 1").await;

    let (_, body) = get_json(&morning, "/Locations/central").await;
    assert_eq!(
        body["location"]["description_segment"]["text"],
        "Welcome to Central"
    );

    let later = app_at(&pool, wednesday_at(10, 0));
    let (_, body) = get_json(&later, "/Locations/central").await;
    assert!(body["location"]["description_segment"].is_null());
}

#[tokio::test]
async fn inactive_description_is_hidden() {
    let (app, pool) = test_app(wednesday_at(10, 0)).await;
    exec(&pool, "UPDATE segments SET is_active = 0 WHERE id = 1").await;

    let (status, body) = get_json(&app, "/Locations/central").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["location"]["description_segment"].is_null());
}
