//! Product inventory tracking
//!
//! Staff update per-location item counts by hand, in bulk, or by importing
//! the distribution spreadsheet.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use sqlx::SqlitePool;
use stacks_common::clock::SharedClock;
use stacks_common::db::{Product, ProductLocationInventory};
use stacks_common::pagination::{BaseFilter, CollectionWithCount};
use stacks_common::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use tracing::{error, info, warn};

use crate::auth::CurrentUser;
use crate::db::{locations, products};
use crate::services::UserService;

pub const LOCATION_NAME_HEADING: &str = "Location of test pickup?";
pub const NUMBER_OF_ITEMS_HEADING: &str = "Number of test kits distributed:";

pub const IMPORT_ERROR_MESSAGE: &str = "One or more errors were found during the import";

/// Largest item count or adjustment accepted from a form or spreadsheet cell
pub const MAX_ITEM_COUNT: i64 = 1_000_000_000;

/// Location id to item count
pub type InventoryCounts = BTreeMap<i64, i64>;

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::String(s) => Some(s.trim().to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Empty => None,
        other => Some(other.to_string().trim().to_string()),
    }
    .filter(|s| !s.is_empty())
}

fn cell_count(cell: Option<&Data>) -> std::result::Result<i64, String> {
    let count = match cell {
        Some(Data::Int(i)) => *i as f64,
        Some(Data::Float(f)) => *f,
        Some(Data::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s.trim()))?,
        Some(Data::Empty) | None => return Err("missing item count".to_string()),
        Some(other) => return Err(format!("'{}' is not a number", other)),
    }
    .round();

    if !(0.0..=MAX_ITEM_COUNT as f64).contains(&count) {
        return Err(format!("{} is not between 0 and {}", count, MAX_ITEM_COUNT));
    }
    Ok(count as i64)
}

/// Sum item counts per location from spreadsheet rows
///
/// The first row holds headings. Rows with a blank location are skipped.
/// A location is matched by name first, then through the product's map of
/// spreadsheet labels. Every problem found is reported together.
pub fn tally_inventory_rows<'a, I>(
    rows: I,
    locations: &HashMap<String, i64>,
    location_map: &HashMap<String, i64>,
) -> Result<InventoryCounts>
where
    I: IntoIterator<Item = &'a [Data]>,
{
    let mut rows = rows.into_iter();
    let mut inventory = InventoryCounts::new();
    let mut issues = Vec::new();
    let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();

    let Some(headings) = rows.next() else {
        return Err(Error::InvalidInput("The spreadsheet is empty.".to_string()));
    };

    let column = |heading: &str| {
        headings
            .iter()
            .position(|cell| cell_text(Some(cell)).as_deref() == Some(heading))
    };
    let location_col = column(LOCATION_NAME_HEADING).unwrap_or(0);
    let count_col = column(NUMBER_OF_ITEMS_HEADING).unwrap_or(0);

    for (index, row) in rows.enumerate() {
        let row_number = index + 2;

        let Some(location) = cell_text(row.get(location_col)) else {
            continue;
        };

        let count = match cell_count(row.get(count_col)) {
            Ok(count) => count,
            Err(message) => {
                error!(row = row_number, "Unable to import row {}: {}", row_number, message);
                issues.push(format!("Unable to import row {}: {}", row_number, message));
                continue;
            }
        };

        let location_id = locations
            .get(&location)
            .or_else(|| location_map.get(&location))
            .copied();

        match location_id {
            Some(id) => {
                let total = inventory.entry(id).or_insert(0);
                match total.checked_add(count) {
                    Some(sum) => *total = sum,
                    None => issues.push(format!(
                        "Unable to import row {}: total for '{}' is too large",
                        row_number, location
                    )),
                }
            }
            None => *unmapped.entry(location).or_insert(0) += 1,
        }
    }

    issues.extend(unmapped.into_iter().map(|(location, rows)| {
        format!("Location '{}' could not be mapped on {} rows", location, rows)
    }));

    if !issues.is_empty() {
        return Err(Error::Import {
            message: IMPORT_ERROR_MESSAGE.to_string(),
            issues,
        });
    }

    Ok(inventory)
}

#[derive(Clone)]
pub struct ProductService {
    db: SqlitePool,
    clock: SharedClock,
    users: UserService,
}

impl ProductService {
    pub fn new(db: SqlitePool, clock: SharedClock, users: UserService) -> Self {
        Self { db, clock, users }
    }

    async fn require_inventory(
        &self,
        product_id: i64,
        location_id: i64,
    ) -> Result<ProductLocationInventory> {
        products::get_inventory(&self.db, product_id, location_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "Unable to find inventory for product id {} at location id {}",
                    product_id, location_id
                ))
            })
    }

    /// Add or subtract per-location amounts; returns the problems found
    pub async fn bulk_inventory_status_update(
        &self,
        product_id: i64,
        add_values: bool,
        adjustments: &BTreeMap<i64, i64>,
        user_id: Option<i64>,
    ) -> Result<Vec<String>> {
        let mut issues = Vec::new();

        if adjustments.is_empty() {
            issues.push("There were no adjustments to be made.".to_string());
            return Ok(issues);
        }

        let now = self.clock.now();
        let mut tx = self.db.begin().await?;

        for (&location_id, &amount) in adjustments {
            if amount == 0 {
                continue;
            }
            let Some(mut inventory) = products::get_inventory(&mut *tx, product_id, location_id).await? else {
                issues.push(format!("Location id {}: not tracked for this product", location_id));
                continue;
            };

            let current = inventory.item_count.unwrap_or(0);
            let location_name = inventory.location_name.as_deref().unwrap_or_default();
            inventory.item_count = Some(if add_values {
                match current.checked_add(amount).filter(|sum| *sum <= MAX_ITEM_COUNT) {
                    Some(sum) => sum,
                    None => {
                        issues.push(format!(
                            "Location {}: count would have been more than {}, left unchanged",
                            location_name, MAX_ITEM_COUNT
                        ));
                        continue;
                    }
                }
            } else if current < amount {
                issues.push(format!(
                    "Location {}: count would have been less than 0, using 0",
                    location_name
                ));
                0
            } else {
                current - amount
            });
            inventory.updated_at = Some(now);
            inventory.updated_by = user_id;

            products::update_inventory(&mut *tx, &inventory).await?;
        }

        tx.commit().await?;
        info!(product_id, adjustments = adjustments.len(), "Bulk inventory update");
        Ok(issues)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Product>> {
        products::find(&self.db, id).await
    }

    pub async fn get_by_segment_id(&self, segment_id: i64) -> Result<Vec<Product>> {
        products::get_by_segment_id(&self.db, segment_id).await
    }

    /// Active product with the permission groups that manage it
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let Some(mut product) = products::get_active_by_slug(&self.db, &normalize_slug(slug)?).await? else {
            return Ok(None);
        };
        product.permission_group_ids = products::get_manager_group_ids(&self.db, product.id).await?;
        Ok(Some(product))
    }

    /// Site managers manage every product; others through a manager group
    pub async fn can_manage(&self, user: &CurrentUser, product_id: i64) -> Result<bool> {
        if user.is_site_manager() {
            return Ok(true);
        }
        let permission_ids = user.permission_ids();
        if permission_ids.is_empty() {
            return Ok(false);
        }
        let managers = products::get_manager_group_ids(&self.db, product_id).await?;
        Ok(managers.iter().any(|id| permission_ids.contains(id)))
    }

    pub async fn get_by_slug_ignoring_active(&self, slug: &str) -> Result<Option<Product>> {
        products::get_by_slug(&self.db, &normalize_slug(slug)?).await
    }

    async fn label_updated_by(&self, inventory: &mut ProductLocationInventory) -> Result<()> {
        if let Some(id) = inventory.updated_by {
            if let Some(user) = self.users.get_name_username(id).await? {
                inventory.updated_by_name = user.name;
                inventory.updated_by_username = user.username;
            }
        }
        Ok(())
    }

    pub async fn get_inventory_by_product_and_location(
        &self,
        product_id: i64,
        location_id: i64,
    ) -> Result<ProductLocationInventory> {
        let mut inventory = self.require_inventory(product_id, location_id).await?;
        self.label_updated_by(&mut inventory).await?;

        if let Some(id) = inventory.threshhold_updated_by {
            if let Some(user) = self.users.get_name_username(id).await? {
                inventory.threshhold_updated_by_name = user.name;
                inventory.threshhold_updated_by_username = user.username;
            }
        }
        Ok(inventory)
    }

    pub async fn get_location_inventories_for_product(
        &self,
        product_id: i64,
    ) -> Result<Vec<ProductLocationInventory>> {
        let mut inventories = products::get_inventories_for_product(&self.db, product_id).await?;
        for inventory in &mut inventories {
            self.label_updated_by(inventory).await?;
        }
        Ok(inventories)
    }

    pub async fn get_paginated_list(&self, filter: &BaseFilter) -> Result<CollectionWithCount<Product>> {
        let mut page = products::get_paginated(&self.db, filter).await?;
        for product in &mut page.data {
            product.permission_group_ids =
                products::get_manager_group_ids(&self.db, product.id).await?;
        }
        Ok(page)
    }

    async fn require_product(&self, id: i64) -> Result<Product> {
        products::find(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Unable to find product id {}", id)))
    }

    pub async fn link_segment(&self, product_id: i64, segment_id: i64, user_id: Option<i64>) -> Result<()> {
        let mut product = self.require_product(product_id).await?;
        product.segment_id = Some(segment_id);
        product.updated_at = Some(self.clock.now());
        product.updated_by = user_id;
        products::update(&self.db, &product).await
    }

    pub async fn unlink_segment(&self, product_id: i64, user_id: Option<i64>) -> Result<()> {
        let mut product = self.require_product(product_id).await?;
        product.segment_id = None;
        product.updated_at = Some(self.clock.now());
        product.updated_by = user_id;
        products::update(&self.db, &product).await
    }

    /// Read an uploaded distribution spreadsheet into per-location counts
    pub async fn parse_inventory(&self, product_id: i64, spreadsheet: Vec<u8>) -> Result<InventoryCounts> {
        let locations: HashMap<String, i64> = locations::get_all(&self.db)
            .await?
            .into_iter()
            .map(|l| (l.name.trim().to_string(), l.id))
            .collect();
        let location_map = locations::get_product_map(&self.db, product_id).await?;

        let rows = tokio::task::spawn_blocking(move || read_first_sheet(spreadsheet))
            .await
            .map_err(|e| Error::Internal(format!("Spreadsheet task failed: {}", e)))??;

        tally_inventory_rows(rows.iter().map(Vec::as_slice), &locations, &location_map)
    }

    /// Start or stop tracking a product at a location
    pub async fn set_active_location(
        &self,
        product_slug: &str,
        location_id: i64,
        is_active: bool,
        user_id: Option<i64>,
    ) -> Result<()> {
        let slug = normalize_slug(product_slug)?;
        let product = products::get_by_slug(&self.db, &slug)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Can't find product: {}", product_slug)))?;

        if is_active {
            let now = self.clock.now();
            products::add_inventory(
                &self.db,
                &ProductLocationInventory {
                    product_id: product.id,
                    location_id,
                    item_count: Some(0),
                    created_at: now,
                    created_by: user_id,
                    updated_at: Some(now),
                    updated_by: user_id,
                    ..Default::default()
                },
            )
            .await
        } else {
            products::remove_inventory(&self.db, product.id, location_id).await
        }
    }

    pub async fn update_inventory_status(
        &self,
        product_id: i64,
        location_id: i64,
        item_count: i64,
        user_id: Option<i64>,
    ) -> Result<()> {
        let mut inventory = self.require_inventory(product_id, location_id).await?;
        inventory.item_count = Some(item_count);
        inventory.updated_at = Some(self.clock.now());
        inventory.updated_by = user_id;
        products::update_inventory(&self.db, &inventory).await
    }

    pub async fn update_product(&self, product: &Product, user_id: Option<i64>) -> Result<Product> {
        let mut current = self.require_product(product.id).await?;
        current.cache_inventory_minutes = product.cache_inventory_minutes;
        current.is_active = product.is_active;
        current.is_visible_to_public = product.is_visible_to_public;
        current.name = product.name.trim().to_string();
        current.updated_at = Some(self.clock.now());
        current.updated_by = user_id;
        products::update(&self.db, &current).await?;
        Ok(current)
    }

    pub async fn update_threshhold(
        &self,
        product_id: i64,
        location_id: i64,
        threshhold: i64,
        user_id: Option<i64>,
    ) -> Result<()> {
        let mut inventory = self.require_inventory(product_id, location_id).await?;
        inventory.many_threshhold = Some(threshhold);
        inventory.threshhold_updated_at = Some(self.clock.now());
        inventory.threshhold_updated_by = user_id;
        products::update_inventory(&self.db, &inventory).await
    }
}

fn normalize_slug(slug: &str) -> Result<String> {
    let slug = slug.trim().to_lowercase();
    if slug.is_empty() {
        return Err(Error::InvalidInput("A product slug is required.".to_string()));
    }
    Ok(slug)
}

/// Cells of the workbook's first sheet, row by row
fn read_first_sheet(bytes: Vec<u8>) -> Result<Vec<Vec<Data>>> {
    let unreadable = |e: calamine::Error| {
        warn!("Unable to read spreadsheet: {}", e);
        Error::InvalidInput("The uploaded file is not a readable spreadsheet.".to_string())
    };

    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(unreadable)?;
    let Some(sheet) = workbook.sheet_names().first().cloned() else {
        return Err(Error::InvalidInput("The spreadsheet is empty.".to_string()));
    };
    let range = workbook.worksheet_range(&sheet).map_err(unreadable)?;

    Ok(range.rows().map(<[Data]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn sheet() -> Vec<Vec<Data>> {
        vec![
            vec![s("Timestamp"), s(LOCATION_NAME_HEADING), s(NUMBER_OF_ITEMS_HEADING)],
            vec![s("9:00"), s("Central"), Data::Float(5.0)],
            vec![s("9:05"), s("Central "), Data::Int(3)],
            vec![s("9:10"), s("Downtown Kiosk"), Data::Float(2.0)],
            vec![s("9:15"), Data::Empty, Data::Float(9.0)],
        ]
    }

    fn lookups() -> (HashMap<String, i64>, HashMap<String, i64>) {
        let locations = HashMap::from([("Central".to_string(), 1), ("Branch".to_string(), 2)]);
        let map = HashMap::from([("Downtown Kiosk".to_string(), 2)]);
        (locations, map)
    }

    #[test]
    fn test_tally_matches_names_and_map() {
        let rows = sheet();
        let (locations, map) = lookups();

        let counts = tally_inventory_rows(rows.iter().map(Vec::as_slice), &locations, &map).unwrap();
        assert_eq!(counts.get(&1), Some(&8));
        assert_eq!(counts.get(&2), Some(&2));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_tally_reports_unmapped_and_bad_rows() {
        let mut rows = sheet();
        rows.push(vec![s("9:20"), s("Mystery"), Data::Float(1.0)]);
        rows.push(vec![s("9:25"), s("Mystery"), Data::Float(1.0)]);
        rows.push(vec![s("9:30"), s("Central"), s("lots")]);
        let (locations, map) = lookups();

        let err = tally_inventory_rows(rows.iter().map(Vec::as_slice), &locations, &map).unwrap_err();
        match err {
            Error::Import { message, issues } => {
                assert_eq!(message, IMPORT_ERROR_MESSAGE);
                assert_eq!(
                    issues,
                    vec![
                        "Unable to import row 8: 'lots' is not a number".to_string(),
                        "Location 'Mystery' could not be mapped on 2 rows".to_string(),
                    ]
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_tally_rejects_out_of_range_counts() {
        let rows = vec![
            vec![s("Timestamp"), s(LOCATION_NAME_HEADING), s(NUMBER_OF_ITEMS_HEADING)],
            vec![s("9:00"), s("Central"), Data::Float(1e19)],
            vec![s("9:05"), s("Central"), Data::Int(-4)],
            vec![s("9:10"), s("Branch"), Data::Int(MAX_ITEM_COUNT)],
        ];
        let (locations, map) = lookups();

        match tally_inventory_rows(rows.iter().map(Vec::as_slice), &locations, &map) {
            Err(Error::Import { issues, .. }) => assert_eq!(
                issues,
                vec![
                    "Unable to import row 2: 10000000000000000000 is not between 0 and 1000000000"
                        .to_string(),
                    "Unable to import row 3: -4 is not between 0 and 1000000000".to_string(),
                ]
            ),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_normalize_slug() {
        assert_eq!(normalize_slug("  Test-Kits ").unwrap(), "test-kits");
        assert!(normalize_slug("   ").is_err());
    }
}
