//! Intranet pages, product inventory, roster and profiles

mod helpers;

use axum::http::StatusCode;
use helpers::{
    alert_after, exec, follow, get, location, login, post_body, post_form, read_json, test_app,
};

async fn item_count(app: &helpers::TestApp, product_id: i64, location_id: i64) -> Option<i64> {
    sqlx::query_scalar(
        "SELECT item_count FROM product_location_inventories WHERE product_id = ? AND location_id = ?",
    )
    .bind(product_id)
    .bind(location_id)
    .fetch_optional(&app.pool)
    .await
    .unwrap()
    .flatten()
}

#[tokio::test]
async fn section_posts_render_markdown() {
    let app = test_app().await;
    for sql in [
        "INSERT INTO posts (section_id, title, content, published_at) VALUES (1, 'Payday', '**Friday** this week', '2024-05-01 09:00:00')",
        "INSERT INTO posts (section_id, title, content, is_draft) VALUES (1, 'Unfinished', 'draft', 1)",
    ] {
        exec(&app.pool, sql).await;
    }
    let session = login(&app, "jdoe", &[]).await;

    let (status, body) = read_json(get(&app, "/hr/Posts", Some(&session)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["section"]["path"], "hr");
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["title"], "Payday");
    assert_eq!(posts[0]["html"], "<p><strong>Friday</strong> this week</p>\n");
    assert_eq!(body["paginate"]["item_count"], 1);
}

#[tokio::test]
async fn section_posts_past_last_page_redirect() {
    let app = test_app().await;
    exec(
        &app.pool,
        "INSERT INTO posts (section_id, title, content) VALUES (1, 'Payday', 'Friday')",
    )
    .await;
    let session = login(&app, "jdoe", &[]).await;

    let response = get(&app, "/hr/Posts?page=3", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/hr/Posts?page=1");

    let response = get(&app, "/hr/Posts?page=9223372036854775807", Some(&session)).await;
    assert_eq!(location(&response), "/hr/Posts?page=1");
}

#[tokio::test]
async fn create_and_publish_intranet_page() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &[]).await;

    let (_, body) = read_json(
        post_form(&app, "/Admin/Pages/Create", Some(&session), "title=Benefits&section_id=1").await,
    )
    .await;
    assert_eq!(body["success"], true);
    let id = body["id"].as_i64().unwrap();

    let response = post_form(
        &app,
        "/Admin/Pages/Edit",
        Some(&session),
        &format!("id={}&section_id=1&title=Benefits&stub=Open+Enrollment&content=Sign+up&is_draft=false", id),
    )
    .await;
    assert_eq!(location(&response), "/hr/Admin/Pages");
    let (_, body) = follow(&app, response, &session).await;
    assert_eq!(body["alert"]["message"], "Updated page: Benefits");
    assert_eq!(body["pages"][0]["stub"], "open-enrollment");
    assert_eq!(body["pages"][0]["created_by_name"], "Jane Doe");
}

#[tokio::test]
async fn publishing_with_taken_stub_returns_to_edit() {
    let app = test_app().await;
    exec(
        &app.pool,
        "INSERT INTO intranet_pages (id, section_id, title, stub, is_draft) VALUES (1, 1, 'Payroll', 'payroll', 0)",
    )
    .await;
    exec(
        &app.pool,
        "INSERT INTO intranet_pages (id, section_id, title, is_draft) VALUES (2, 1, 'Payroll FAQ', 1)",
    )
    .await;
    let session = login(&app, "jdoe", &[]).await;

    let (_, body) = read_json(
        post_form(&app, "/Admin/Pages/StubInUse", Some(&session), "id=2&section_id=1&stub=Payroll").await,
    )
    .await;
    assert_eq!(body, true);

    let response = post_form(
        &app,
        "/Admin/Pages/Edit",
        Some(&session),
        "id=2&section_id=1&title=Payroll+FAQ&stub=payroll&is_draft=false",
    )
    .await;
    assert_eq!(location(&response), "/hr/Admin/Pages/Edit/2");
    let (_, body) = follow(&app, response, &session).await;
    assert_eq!(
        body["alert"]["message"],
        "The chosen stub is already in use. Please choose a different stub."
    );
    assert_eq!(body["is_draft"], true);
}

#[tokio::test]
async fn edit_view_redirects_on_section_mismatch() {
    let app = test_app().await;
    exec(&app.pool, "INSERT INTO sections (id, name, path) VALUES (2, 'Facilities', 'facilities')").await;
    exec(
        &app.pool,
        "INSERT INTO intranet_pages (id, section_id, title) VALUES (1, 1, 'Payroll')",
    )
    .await;
    let session = login(&app, "jdoe", &[]).await;

    let response = get(&app, "/facilities/Admin/Pages/Edit/1", Some(&session)).await;
    assert_eq!(location(&response), "/facilities/Admin/Pages");
}

#[tokio::test]
async fn product_managers_update_inventory() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &["Kit Staff"]).await;

    let (_, body) = read_json(get(&app, "/Products/Details/Test-Kits", Some(&session)).await).await;
    assert_eq!(body["can_manage"], true);
    assert_eq!(body["inventories"][0]["location_name"], "Central");
    assert_eq!(body["other_locations"][0]["name"], "Branch");

    let response = post_form(
        &app,
        "/Products/UpdateInventory",
        Some(&session),
        "product_id=1&location_id=1&item_count=12",
    )
    .await;
    assert_eq!(location(&response), "/Products/Details/test-kits");
    assert_eq!(alert_after(&app, response, &session).await, "Updated inventory: 12 items");
    assert_eq!(item_count(&app, 1, 1).await, Some(12));
}

#[tokio::test]
async fn other_staff_cannot_update_inventory() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &["Staff"]).await;

    let response = post_form(
        &app,
        "/Products/UpdateInventory",
        Some(&session),
        "product_id=1&location_id=1&item_count=12",
    )
    .await;
    assert_eq!(location(&response), "/Unauthorized");
    assert_eq!(item_count(&app, 1, 1).await, Some(5));
}

#[tokio::test]
async fn bulk_subtract_clamps_at_zero() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &["Kit Staff"]).await;

    let response = post_form(&app, "/Products/BulkInventory", Some(&session), "product_id=1&location_1=8").await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Location Central: count would have been less than 0, using 0"
    );
    assert_eq!(item_count(&app, 1, 1).await, Some(0));

    let response = post_form(
        &app,
        "/Products/BulkInventory",
        Some(&session),
        "product_id=1&add_values=true&location_1=4",
    )
    .await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Updated inventory at 1 locations."
    );
    assert_eq!(item_count(&app, 1, 1).await, Some(4));
}

#[tokio::test]
async fn bulk_add_refuses_oversized_counts() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &["Kit Staff"]).await;

    let response = post_form(
        &app,
        "/Products/BulkInventory",
        Some(&session),
        "product_id=1&add_values=true&location_1=9223372036854775807",
    )
    .await;
    assert_eq!(location(&response), "/Products");
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Adjustments cannot be more than 1000000000."
    );
    assert_eq!(item_count(&app, 1, 1).await, Some(5));

    exec(
        &app.pool,
        "UPDATE product_location_inventories SET item_count = 999999999 WHERE product_id = 1 AND location_id = 1",
    )
    .await;
    let response = post_form(
        &app,
        "/Products/BulkInventory",
        Some(&session),
        "product_id=1&add_values=true&location_1=5",
    )
    .await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Location Central: count would have been more than 1000000000, left unchanged"
    );
    assert_eq!(item_count(&app, 1, 1).await, Some(999999999));
}

#[tokio::test]
async fn tracking_a_location_adds_inventory() {
    let app = test_app().await;
    let session = login(&app, "asmith", &["Web Admins"]).await;

    let response = post_form(
        &app,
        "/Products/SetActiveLocation",
        Some(&session),
        "slug=test-kits&location_id=2&is_active=true",
    )
    .await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Location is now tracking inventory."
    );
    assert_eq!(item_count(&app, 1, 2).await, Some(0));
}

#[tokio::test]
async fn import_reports_unreadable_uploads() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &["Kit Staff"]).await;

    let (_, body) = read_json(
        post_body(&app, "/Products/Import/1", Some(&session), "application/octet-stream", Vec::new()).await,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "You must upload a spreadsheet to import.");

    let (_, body) = read_json(
        post_body(
            &app,
            "/Products/Import/1",
            Some(&session),
            "application/octet-stream",
            b"not a spreadsheet".to_vec(),
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "The uploaded file is not a readable spreadsheet.");
}

#[tokio::test]
async fn roster_search_filters_by_name() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &[]).await;

    let (status, body) = read_json(get(&app, "/Users?search=smith", Some(&session)).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["search"], "smith");
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "asmith");

    let response = get(&app, "/Users?search=Alex+Smith&page=4", Some(&session)).await;
    assert_eq!(location(&response), "/Users?search=Alex%20Smith&page=1");
}

#[tokio::test]
async fn nickname_is_edited_on_own_profile_only() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &[]).await;

    let response = post_form(&app, "/Profile/EditNickname", Some(&session), "user_id=2&nickname=+Jo+").await;
    let (_, body) = follow(&app, response, &session).await;
    assert_eq!(body["alert"]["message"], "Updated nickname: Jo");
    assert_eq!(body["user"]["nickname"], "Jo");

    let response = post_form(&app, "/Profile/EditNickname", Some(&session), "user_id=3&nickname=Boss").await;
    assert_eq!(location(&response), "/Unauthorized");

    let response = post_form(&app, "/Profile/EditNickname", Some(&session), "user_id=2&nickname=+").await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Unable to update nickname: Nickname cannot be empty."
    );
}

#[tokio::test]
async fn viewing_another_profile() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &[]).await;

    let (_, body) = read_json(get(&app, "/Profile/asmith", Some(&session)).await).await;
    assert_eq!(body["user"]["username"], "asmith");
    assert_eq!(body["user_viewing_self"], false);
    assert_eq!(body["can_edit"], false);
    assert_eq!(body["direct_reports"][0]["username"], "jdoe");
    assert!(body.get("permissions").is_none());

    let response = get(&app, "/Profile/nobody", Some(&session)).await;
    assert_eq!(
        alert_after(&app, response, &session).await,
        "Could not find user with username: nobody"
    );
}

#[tokio::test]
async fn picture_upload_needs_permission() {
    let app = test_app().await;
    let session = login(&app, "jdoe", &[]).await;

    let response = get(&app, "/Profile/UpdatePicture/3", Some(&session)).await;
    assert_eq!(location(&response), "/Unauthorized");
}

#[tokio::test]
async fn site_manager_uploads_and_removes_pictures() {
    let app = test_app().await;
    let session = login(&app, "asmith", &["Web Admins"]).await;

    let (_, body) = read_json(get(&app, "/Profile/UpdatePicture/2", Some(&session)).await).await;
    assert_eq!(body["crop_width"], 700);

    let response = post_form(&app, "/Profile/UploadPicture", Some(&session), "user_id=2&profile_picture=").await;
    assert_eq!(location(&response), "/Profile/jdoe");
    assert_eq!(
        alert_after(&app, response, &session).await,
        "You must upload a file to replace a profile image."
    );

    let response = post_form(
        &app,
        "/Profile/UploadPicture",
        Some(&session),
        "user_id=2&profile_picture=data%3Aimage%2Fpng%3Bbase64%2CiVBORw0KGgo%3D",
    )
    .await;
    assert_eq!(location(&response), "/Profile/jdoe");

    let response = get(&app, "/Profile/Picture/jdoe", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");

    let response = post_form(&app, "/Profile/RemovePicture", Some(&session), "user_id=2&username=jdoe").await;
    assert_eq!(location(&response), "/Profile/jdoe");

    let response = get(&app, "/Profile/Picture/jdoe", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
