//! Product inventory administration

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use stacks_common::db::{Location, Product, ProductLocationInventory, Segment};
use stacks_common::pagination::PaginateModel;
use stacks_common::web::{redirect_with_alert, Alert, Flash};
use stacks_common::Error;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

use super::{list_filter, unauthorized, PageQuery};
use crate::auth::CurrentUser;
use crate::db::locations;
use crate::error::{error_alert, user_message, ApiResult};
use crate::services::product_service::MAX_ITEM_COUNT;
use crate::AppState;

const INDEX_PATH: &str = "/Products";

/// Prefix of bulk form fields carrying a location's adjustment
pub const LOCATION_FIELD_PREFIX: &str = "location_";

fn details_path(slug: &str) -> String {
    format!("{}/Details/{}", INDEX_PATH, slug)
}

#[derive(Debug, Serialize)]
pub struct ProductsViewModel {
    pub products: Vec<Product>,
    pub paginate: PaginateModel,
}

/// GET /Products
pub async fn index(
    State(state): State<AppState>,
    _user: CurrentUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
) -> ApiResult<Response> {
    let filter = list_filter(&state, query.page).await?;
    let list = state.products.get_paginated_list(&filter).await?;
    let paginate = PaginateModel::new(list.count, &filter);

    if let Some(last) = paginate.last_page() {
        return Ok(Redirect::to(&format!("{}?page={}", INDEX_PATH, last)).into_response());
    }

    Ok(flash.view(ProductsViewModel {
        products: list.data,
        paginate,
    }))
}

#[derive(Debug, Serialize)]
pub struct ProductDetailsViewModel {
    pub product: Product,
    pub can_manage: bool,
    pub inventories: Vec<ProductLocationInventory>,
    /// Locations not yet tracked for the product
    pub other_locations: Vec<Location>,
    pub segment: Option<Segment>,
}

/// GET /Products/Details/:slug
pub async fn details(
    State(state): State<AppState>,
    user: CurrentUser,
    flash: Flash,
    Path(slug): Path<String>,
) -> ApiResult<Response> {
    let Some(product) = state.products.get_by_slug_ignoring_active(&slug).await? else {
        return Ok(redirect_with_alert(
            INDEX_PATH,
            Alert::danger(format!("Can't find product: {}", slug)),
        ));
    };

    let can_manage = state.products.can_manage(&user, product.id).await?;
    let inventories = state
        .products
        .get_location_inventories_for_product(product.id)
        .await?;

    let other_locations = locations::get_all(&state.db)
        .await?
        .into_iter()
        .filter(|l| !inventories.iter().any(|i| i.location_id == l.id))
        .collect();

    let segment = match product.segment_id {
        Some(segment_id) => state.segments.get_by_id(segment_id).await?,
        None => None,
    };

    Ok(flash.view(ProductDetailsViewModel {
        product,
        can_manage,
        inventories,
        other_locations,
        segment,
    }))
}

/// Product by id, when the user may manage it
async fn managed_product(state: &AppState, user: &CurrentUser, product_id: i64) -> ApiResult<Option<Product>> {
    let Some(product) = state.products.get_by_id(product_id).await? else {
        return Ok(None);
    };
    if !state.products.can_manage(user, product.id).await? {
        return Ok(None);
    }
    Ok(Some(product))
}

#[derive(Debug, Deserialize)]
pub struct InventoryForm {
    pub product_id: i64,
    pub location_id: i64,
    pub item_count: i64,
}

/// POST /Products/UpdateInventory
pub async fn update_inventory(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<InventoryForm>,
) -> ApiResult<Response> {
    let Some(product) = managed_product(&state, &user, form.product_id).await? else {
        return Ok(unauthorized());
    };

    let alert = if form.item_count < 0 {
        Alert::danger("Item count cannot be less than 0.")
    } else if form.item_count > MAX_ITEM_COUNT {
        Alert::danger(format!("Item count cannot be more than {}.", MAX_ITEM_COUNT))
    } else {
        match state
            .products
            .update_inventory_status(product.id, form.location_id, form.item_count, Some(user.id))
            .await
        {
            Ok(()) => Alert::success(format!("Updated inventory: {} items", form.item_count)),
            Err(e) => error_alert("Unable to update inventory: ", &e),
        }
    };
    Ok(redirect_with_alert(&details_path(&product.slug), alert))
}

/// Bulk form fields as parsed from the post
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BulkAdjustments {
    pub product_id: Option<i64>,
    pub add_values: bool,
    pub adjustments: BTreeMap<i64, i64>,
}

/// Read `product_id`, `add_values` and `location_{id}` amounts; blank and
/// zero amounts are left out
pub fn parse_bulk_form(fields: &HashMap<String, String>) -> Result<BulkAdjustments, String> {
    let mut bulk = BulkAdjustments {
        product_id: fields.get("product_id").and_then(|id| id.trim().parse().ok()),
        add_values: fields
            .get("add_values")
            .is_some_and(|v| matches!(v.trim(), "true" | "on" | "1")),
        ..Default::default()
    };

    for (name, value) in fields {
        let Some(location_id) = name.strip_prefix(LOCATION_FIELD_PREFIX) else {
            continue;
        };
        let Ok(location_id) = location_id.parse::<i64>() else {
            continue;
        };

        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let amount: i64 = value
            .parse()
            .map_err(|_| format!("'{}' is not a whole number.", value))?;
        if amount < 0 {
            return Err("Adjustments must be positive numbers.".to_string());
        }
        if amount > MAX_ITEM_COUNT {
            return Err(format!("Adjustments cannot be more than {}.", MAX_ITEM_COUNT));
        }
        if amount != 0 {
            bulk.adjustments.insert(location_id, amount);
        }
    }

    Ok(bulk)
}

/// POST /Products/BulkInventory
pub async fn bulk_inventory(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(fields): Form<HashMap<String, String>>,
) -> ApiResult<Response> {
    let bulk = match parse_bulk_form(&fields) {
        Ok(bulk) => bulk,
        Err(message) => return Ok(redirect_with_alert(INDEX_PATH, Alert::danger(message))),
    };
    let Some(product_id) = bulk.product_id else {
        return Ok(redirect_with_alert(INDEX_PATH, Alert::danger("No product was selected.")));
    };
    let Some(product) = managed_product(&state, &user, product_id).await? else {
        return Ok(unauthorized());
    };

    let alert = match state
        .products
        .bulk_inventory_status_update(product.id, bulk.add_values, &bulk.adjustments, Some(user.id))
        .await
    {
        Ok(issues) if issues.is_empty() => Alert::success(format!(
            "Updated inventory at {} locations.",
            bulk.adjustments.len()
        )),
        Ok(issues) => Alert::warning(issues.join(" ")),
        Err(e) => error_alert("Unable to update inventory: ", &e),
    };
    Ok(redirect_with_alert(&details_path(&product.slug), alert))
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Location id to item count
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub counts: BTreeMap<i64, i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// POST /Products/Import/:id
///
/// The request body is the spreadsheet itself. Counts come back for review;
/// nothing is saved until they are posted to BulkInventory.
pub async fn import(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Response> {
    let Some(product) = managed_product(&state, &user, id).await? else {
        return Ok(unauthorized());
    };

    if body.is_empty() {
        return Ok(Json(ImportResponse {
            success: false,
            message: Some("You must upload a spreadsheet to import.".to_string()),
            counts: BTreeMap::new(),
            issues: Vec::new(),
        })
        .into_response());
    }

    let response = match state.products.parse_inventory(product.id, body.to_vec()).await {
        Ok(counts) => {
            info!(product_id = product.id, locations = counts.len(), "Parsed inventory import");
            ImportResponse {
                success: true,
                message: None,
                counts,
                issues: Vec::new(),
            }
        }
        Err(Error::Import { message, issues }) => {
            warn!(product_id = product.id, issues = issues.len(), "Inventory import had issues");
            ImportResponse {
                success: false,
                message: Some(message),
                counts: BTreeMap::new(),
                issues,
            }
        }
        Err(e) => ImportResponse {
            success: false,
            message: Some(user_message(&e)),
            counts: BTreeMap::new(),
            issues: Vec::new(),
        },
    };
    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ActiveLocationForm {
    pub slug: String,
    pub location_id: i64,
    #[serde(default)]
    pub is_active: bool,
}

/// POST /Products/SetActiveLocation
pub async fn set_active_location(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ActiveLocationForm>,
) -> ApiResult<Response> {
    let Some(product) = state.products.get_by_slug_ignoring_active(&form.slug).await? else {
        return Ok(redirect_with_alert(
            INDEX_PATH,
            Alert::danger(format!("Can't find product: {}", form.slug)),
        ));
    };
    if !state.products.can_manage(&user, product.id).await? {
        return Ok(unauthorized());
    }

    let alert = match state
        .products
        .set_active_location(&product.slug, form.location_id, form.is_active, Some(user.id))
        .await
    {
        Ok(()) if form.is_active => Alert::success("Location is now tracking inventory."),
        Ok(()) => Alert::success("Location is no longer tracking inventory."),
        Err(e) => error_alert("Unable to update location: ", &e),
    };
    Ok(redirect_with_alert(&details_path(&product.slug), alert))
}

#[derive(Debug, Deserialize)]
pub struct ThreshholdForm {
    pub product_id: i64,
    pub location_id: i64,
    pub threshhold: i64,
}

/// POST /Products/UpdateThreshhold
pub async fn update_threshhold(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<ThreshholdForm>,
) -> ApiResult<Response> {
    let Some(product) = managed_product(&state, &user, form.product_id).await? else {
        return Ok(unauthorized());
    };

    let alert = if form.threshhold < 0 {
        Alert::danger("Threshhold cannot be less than 0.")
    } else {
        match state
            .products
            .update_threshhold(product.id, form.location_id, form.threshhold, Some(user.id))
            .await
        {
            Ok(()) => Alert::success(format!("Updated threshhold: {}", form.threshhold)),
            Err(e) => error_alert("Unable to update threshhold: ", &e),
        }
    };
    Ok(redirect_with_alert(&details_path(&product.slug), alert))
}

#[derive(Debug, Deserialize)]
pub struct LinkSegmentForm {
    pub product_id: i64,
    #[serde(default)]
    pub segment_id: Option<i64>,
}

/// POST /Products/LinkSegment
pub async fn link_segment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<LinkSegmentForm>,
) -> ApiResult<Response> {
    let Some(product) = managed_product(&state, &user, form.product_id).await? else {
        return Ok(unauthorized());
    };
    let to = details_path(&product.slug);

    let Some(segment) = (match form.segment_id {
        Some(id) => state.segments.get_by_id(id).await?,
        None => None,
    }) else {
        return Ok(redirect_with_alert(&to, Alert::danger("Unable to find that segment.")));
    };

    let alert = match state
        .products
        .link_segment(product.id, segment.id, Some(user.id))
        .await
    {
        Ok(()) => Alert::success(format!("Linked segment: {}", segment.name)),
        Err(e) => error_alert("Unable to link segment: ", &e),
    };
    Ok(redirect_with_alert(&to, alert))
}

#[derive(Debug, Deserialize)]
pub struct UnlinkSegmentForm {
    pub product_id: i64,
}

/// POST /Products/UnlinkSegment
pub async fn unlink_segment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<UnlinkSegmentForm>,
) -> ApiResult<Response> {
    let Some(product) = managed_product(&state, &user, form.product_id).await? else {
        return Ok(unauthorized());
    };

    let alert = match state.products.unlink_segment(product.id, Some(user.id)).await {
        Ok(()) => Alert::success("Segment unlinked."),
        Err(e) => error_alert("Unable to unlink segment: ", &e),
    };
    Ok(redirect_with_alert(&details_path(&product.slug), alert))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(INDEX_PATH, get(index))
        .route("/Products/Details/:slug", get(details))
        .route("/Products/UpdateInventory", post(update_inventory))
        .route("/Products/BulkInventory", post(bulk_inventory))
        .route("/Products/Import/:id", post(import))
        .route("/Products/SetActiveLocation", post(set_active_location))
        .route("/Products/UpdateThreshhold", post(update_threshhold))
        .route("/Products/LinkSegment", post(link_segment))
        .route("/Products/UnlinkSegment", post(unlink_segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_bulk_form() {
        let bulk = parse_bulk_form(&fields(&[
            ("product_id", "4"),
            ("add_values", "true"),
            ("location_1", "10"),
            ("location_2", ""),
            ("location_3", "0"),
            ("location_x", "5"),
            ("__token", "abc"),
        ]))
        .unwrap();

        assert_eq!(bulk.product_id, Some(4));
        assert!(bulk.add_values);
        assert_eq!(bulk.adjustments, BTreeMap::from([(1, 10)]));
    }

    #[test]
    fn test_parse_bulk_form_rejects_bad_amounts() {
        assert!(parse_bulk_form(&fields(&[("location_1", "ten")])).is_err());
        assert!(parse_bulk_form(&fields(&[("location_1", "-3")])).is_err());
        assert_eq!(
            parse_bulk_form(&fields(&[("location_1", "9223372036854775807")])),
            Err("Adjustments cannot be more than 1000000000.".to_string())
        );

        let bulk = parse_bulk_form(&fields(&[("product_id", "4")])).unwrap();
        assert!(!bulk.add_values);
        assert!(bulk.adjustments.is_empty());
    }
}
