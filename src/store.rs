//! In-Memory Record Store
//!
//! Typed FxHashMap tables behind a single RwLock, holding the working set
//! the handlers operate on. Relational persistence proper is an external
//! collaborator; this store enforces the same boundary rules the schema
//! would: uniqueness, referential integrity on create, and cascade/protect
//! semantics on delete.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::harvest;
use crate::models::{
    Category, Id, Municipality, MunicipalityInput, PriceInput, PriceRecord, Product, ProductInput,
    Sowing, SowingInput,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("category `{0}` already exists")]
    DuplicateCategory(String),

    #[error("product `{0}` already exists in this category")]
    DuplicateProduct(String),

    #[error("municipality `{0}` already exists")]
    DuplicateMunicipality(String),

    #[error("municipality still has sowings recorded against it")]
    MunicipalityInUse,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Optional filters for sowing listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SowingFilter {
    pub farmer_id: Option<Id>,
    pub product_id: Option<Id>,
    pub municipality_id: Option<Id>,
}

#[derive(Default)]
struct Tables {
    next_id: Id,
    categories: FxHashMap<Id, Category>,
    products: FxHashMap<Id, Product>,
    municipalities: FxHashMap<Id, Municipality>,
    sowings: FxHashMap<Id, Sowing>,
    prices: FxHashMap<Id, PriceRecord>,
}

impl Tables {
    fn allocate_id(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared application store. Cheap to clone behind an `Arc` in `AppState`.
#[derive(Default)]
pub struct Store {
    tables: RwLock<Tables>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("store lock poisoned")
    }

    // ========================================================================
    // Categories
    // ========================================================================

    pub fn create_category(&self, name: &str) -> Result<Category> {
        let mut tables = self.write();
        if tables
            .categories
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(name))
        {
            return Err(StoreError::DuplicateCategory(name.to_string()));
        }
        let id = tables.allocate_id();
        let category = Category {
            id,
            name: name.to_string(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    pub fn get_category(&self, id: Id) -> Result<Category> {
        let tables = self.read();
        tables
            .categories
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("category"))
    }

    /// Case-insensitive name lookup, used by the CSV importer.
    pub fn find_category_by_name(&self, name: &str) -> Option<Category> {
        let tables = self.read();
        tables
            .categories
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// All categories, ordered by name.
    pub fn list_categories(&self) -> Vec<Category> {
        let tables = self.read();
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    pub fn update_category(&self, id: Id, name: &str) -> Result<Category> {
        let mut tables = self.write();
        if tables
            .categories
            .values()
            .any(|c| c.id != id && c.name.eq_ignore_ascii_case(name))
        {
            return Err(StoreError::DuplicateCategory(name.to_string()));
        }
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or(StoreError::NotFound("category"))?;
        category.name = name.to_string();
        Ok(category.clone())
    }

    /// Delete a category and cascade to its products, sowings and prices.
    pub fn delete_category(&self, id: Id) -> Result<()> {
        let mut tables = self.write();
        tables
            .categories
            .remove(&id)
            .ok_or(StoreError::NotFound("category"))?;
        let product_ids: Vec<Id> = tables
            .products
            .values()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        for product_id in product_ids {
            tables.products.remove(&product_id);
            tables.sowings.retain(|_, s| s.product_id != product_id);
            tables.prices.retain(|_, p| p.product_id != product_id);
        }
        Ok(())
    }

    // ========================================================================
    // Products
    // ========================================================================

    pub fn create_product(&self, input: &ProductInput) -> Result<Product> {
        let mut tables = self.write();
        if !tables.categories.contains_key(&input.category_id) {
            return Err(StoreError::NotFound("category"));
        }
        if tables.products.values().any(|p| {
            p.category_id == input.category_id && p.name.eq_ignore_ascii_case(&input.name)
        }) {
            return Err(StoreError::DuplicateProduct(input.name.clone()));
        }
        let id = tables.allocate_id();
        let product = product_from_input(id, input);
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    pub fn get_product(&self, id: Id) -> Result<Product> {
        let tables = self.read();
        tables
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("product"))
    }

    pub fn find_product(&self, category_id: Id, name: &str) -> Option<Product> {
        let tables = self.read();
        tables
            .products
            .values()
            .find(|p| p.category_id == category_id && p.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Products ordered by (category name, product name), optionally filtered
    /// by category and name substring.
    pub fn list_products(&self, category_id: Option<Id>, name: Option<&str>) -> Vec<Product> {
        let tables = self.read();
        let needle = name.map(str::to_lowercase);
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| category_id.map_or(true, |cid| p.category_id == cid))
            .filter(|p| {
                needle
                    .as_deref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            let ca = tables
                .categories
                .get(&a.category_id)
                .map(|c| c.name.as_str())
                .unwrap_or("");
            let cb = tables
                .categories
                .get(&b.category_id)
                .map(|c| c.name.as_str())
                .unwrap_or("");
            ca.cmp(cb).then_with(|| a.name.cmp(&b.name))
        });
        products
    }

    pub fn update_product(&self, id: Id, input: &ProductInput) -> Result<Product> {
        let mut tables = self.write();
        if !tables.categories.contains_key(&input.category_id) {
            return Err(StoreError::NotFound("category"));
        }
        if tables.products.values().any(|p| {
            p.id != id
                && p.category_id == input.category_id
                && p.name.eq_ignore_ascii_case(&input.name)
        }) {
            return Err(StoreError::DuplicateProduct(input.name.clone()));
        }
        if !tables.products.contains_key(&id) {
            return Err(StoreError::NotFound("product"));
        }
        let product = product_from_input(id, input);
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    /// Delete a product and cascade to its sowings and prices.
    pub fn delete_product(&self, id: Id) -> Result<()> {
        let mut tables = self.write();
        tables
            .products
            .remove(&id)
            .ok_or(StoreError::NotFound("product"))?;
        tables.sowings.retain(|_, s| s.product_id != id);
        tables.prices.retain(|_, p| p.product_id != id);
        Ok(())
    }

    // ========================================================================
    // Municipalities
    // ========================================================================

    pub fn create_municipality(&self, input: &MunicipalityInput) -> Result<Municipality> {
        let mut tables = self.write();
        if tables
            .municipalities
            .values()
            .any(|m| m.name.eq_ignore_ascii_case(&input.name))
        {
            return Err(StoreError::DuplicateMunicipality(input.name.clone()));
        }
        let id = tables.allocate_id();
        let municipality = Municipality {
            id,
            name: input.name.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
        };
        tables.municipalities.insert(id, municipality.clone());
        Ok(municipality)
    }

    pub fn get_municipality(&self, id: Id) -> Result<Municipality> {
        let tables = self.read();
        tables
            .municipalities
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("municipality"))
    }

    pub fn list_municipalities(&self) -> Vec<Municipality> {
        let tables = self.read();
        let mut municipalities: Vec<Municipality> =
            tables.municipalities.values().cloned().collect();
        municipalities.sort_by(|a, b| a.name.cmp(&b.name));
        municipalities
    }

    pub fn update_municipality(&self, id: Id, input: &MunicipalityInput) -> Result<Municipality> {
        let mut tables = self.write();
        if tables
            .municipalities
            .values()
            .any(|m| m.id != id && m.name.eq_ignore_ascii_case(&input.name))
        {
            return Err(StoreError::DuplicateMunicipality(input.name.clone()));
        }
        let municipality = tables
            .municipalities
            .get_mut(&id)
            .ok_or(StoreError::NotFound("municipality"))?;
        municipality.name = input.name.clone();
        municipality.latitude = input.latitude;
        municipality.longitude = input.longitude;
        Ok(municipality.clone())
    }

    /// Municipalities referenced by sowings are protected against deletion.
    pub fn delete_municipality(&self, id: Id) -> Result<()> {
        let mut tables = self.write();
        if !tables.municipalities.contains_key(&id) {
            return Err(StoreError::NotFound("municipality"));
        }
        if tables.sowings.values().any(|s| s.municipality_id == id) {
            return Err(StoreError::MunicipalityInUse);
        }
        tables.municipalities.remove(&id);
        Ok(())
    }

    // ========================================================================
    // Sowings
    // ========================================================================

    /// Register a sowing for `farmer_id`, deriving harvest estimates from
    /// the product's cycle and cost fields.
    pub fn create_sowing(&self, farmer_id: Id, input: &SowingInput) -> Result<Sowing> {
        let mut tables = self.write();
        let product = tables
            .products
            .get(&input.product_id)
            .cloned()
            .ok_or(StoreError::NotFound("product"))?;
        if !tables.municipalities.contains_key(&input.municipality_id) {
            return Err(StoreError::NotFound("municipality"));
        }
        let estimate = harvest::estimate(&product, input.sowing_date, input.area);
        let id = tables.allocate_id();
        let sowing = Sowing {
            id,
            farmer_id,
            product_id: input.product_id,
            municipality_id: input.municipality_id,
            quantity: input.quantity,
            unit: input.unit,
            area: input.area,
            sowing_date: input.sowing_date,
            status: input.status,
            created_at: Utc::now(),
            estimated_harvest_date: estimate.harvest_date,
            estimated_cost: estimate.cost,
        };
        tables.sowings.insert(id, sowing.clone());
        Ok(sowing)
    }

    pub fn get_sowing(&self, id: Id) -> Result<Sowing> {
        let tables = self.read();
        tables
            .sowings
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("sowing"))
    }

    /// Sowings matching the filter, newest first.
    pub fn list_sowings(&self, filter: SowingFilter) -> Vec<Sowing> {
        let tables = self.read();
        let mut sowings: Vec<Sowing> = tables
            .sowings
            .values()
            .filter(|s| filter.farmer_id.map_or(true, |f| s.farmer_id == f))
            .filter(|s| filter.product_id.map_or(true, |p| s.product_id == p))
            .filter(|s| {
                filter
                    .municipality_id
                    .map_or(true, |m| s.municipality_id == m)
            })
            .cloned()
            .collect();
        sowings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sowings
    }

    /// Update a sowing in place, re-deriving harvest estimates.
    pub fn update_sowing(&self, id: Id, input: &SowingInput) -> Result<Sowing> {
        let mut tables = self.write();
        let product = tables
            .products
            .get(&input.product_id)
            .cloned()
            .ok_or(StoreError::NotFound("product"))?;
        if !tables.municipalities.contains_key(&input.municipality_id) {
            return Err(StoreError::NotFound("municipality"));
        }
        let estimate = harvest::estimate(&product, input.sowing_date, input.area);
        let sowing = tables
            .sowings
            .get_mut(&id)
            .ok_or(StoreError::NotFound("sowing"))?;
        sowing.product_id = input.product_id;
        sowing.municipality_id = input.municipality_id;
        sowing.quantity = input.quantity;
        sowing.unit = input.unit;
        sowing.area = input.area;
        sowing.sowing_date = input.sowing_date;
        sowing.status = input.status;
        sowing.estimated_harvest_date = estimate.harvest_date;
        sowing.estimated_cost = estimate.cost;
        Ok(sowing.clone())
    }

    pub fn delete_sowing(&self, id: Id) -> Result<()> {
        let mut tables = self.write();
        tables
            .sowings
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("sowing"))
    }

    // ========================================================================
    // Prices
    // ========================================================================

    pub fn create_price(&self, user_id: Option<Id>, input: &PriceInput) -> Result<PriceRecord> {
        let mut tables = self.write();
        if !tables.products.contains_key(&input.product_id) {
            return Err(StoreError::NotFound("product"));
        }
        let id = tables.allocate_id();
        let price = PriceRecord {
            id,
            product_id: input.product_id,
            value: input.value,
            quantity: input.quantity,
            unit: input.unit,
            date: input.date,
            user_id,
        };
        tables.prices.insert(id, price.clone());
        Ok(price)
    }

    /// Price records, newest observation first.
    pub fn list_prices(&self, product_id: Option<Id>) -> Vec<PriceRecord> {
        let tables = self.read();
        let mut prices: Vec<PriceRecord> = tables
            .prices
            .values()
            .filter(|p| product_id.map_or(true, |id| p.product_id == id))
            .cloned()
            .collect();
        prices.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        prices
    }
}

fn product_from_input(id: Id, input: &ProductInput) -> Product {
    Product {
        id,
        category_id: input.category_id,
        name: input.name.clone(),
        min_temp: input.min_temp,
        max_temp: input.max_temp,
        min_rain: input.min_rain,
        max_rain: input.max_rain,
        min_humidity: input.min_humidity,
        max_humidity: input.max_humidity,
        min_altitude: input.min_altitude,
        max_altitude: input.max_altitude,
        cycle_days: input.cycle_days,
        cost_per_hectare: input.cost_per_hectare,
        yield_per_hectare: input.yield_per_hectare,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::{AreaUnit, SowingStatus};

    fn seeded_store() -> (Store, Id, Id, Id) {
        let store = Store::new();
        let category = store.create_category("Vegetables").unwrap();
        let product = store
            .create_product(&ProductInput {
                category_id: category.id,
                name: "Tomato".to_string(),
                cycle_days: Some(90),
                cost_per_hectare: Some(1_000_000.0),
                ..Default::default()
            })
            .unwrap();
        let municipality = store
            .create_municipality(&MunicipalityInput {
                name: "Pasto".to_string(),
                latitude: Some(1.21),
                longitude: Some(-77.28),
            })
            .unwrap();
        (store, category.id, product.id, municipality.id)
    }

    fn sowing_input(product_id: Id, municipality_id: Id) -> SowingInput {
        SowingInput {
            product_id,
            municipality_id,
            quantity: 2.0,
            unit: AreaUnit::Hectare,
            area: 2.0,
            sowing_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            status: SowingStatus::Ongoing,
        }
    }

    #[test]
    fn category_names_are_unique_case_insensitive() {
        let (store, _, _, _) = seeded_store();
        let err = store.create_category("vegetables").unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCategory(_)));
    }

    #[test]
    fn product_requires_existing_category() {
        let store = Store::new();
        let err = store
            .create_product(&ProductInput {
                category_id: 999,
                name: "Ghost".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, StoreError::NotFound("category"));
    }

    #[test]
    fn product_name_unique_per_category_only() {
        let (store, category_id, _, _) = seeded_store();
        let err = store
            .create_product(&ProductInput {
                category_id,
                name: "TOMATO".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateProduct(_)));

        // Same name under another category is fine.
        let other = store.create_category("Fruits").unwrap();
        assert!(store
            .create_product(&ProductInput {
                category_id: other.id,
                name: "Tomato".to_string(),
                ..Default::default()
            })
            .is_ok());
    }

    #[test]
    fn sowing_create_derives_estimates() {
        let (store, _, product_id, municipality_id) = seeded_store();
        let sowing = store
            .create_sowing(7, &sowing_input(product_id, municipality_id))
            .unwrap();

        assert_eq!(sowing.farmer_id, 7);
        assert_eq!(
            sowing.estimated_harvest_date,
            Some(NaiveDate::from_ymd_opt(2024, 5, 30).unwrap())
        );
        assert_eq!(sowing.estimated_cost, Some(2_000_000.0));
    }

    #[test]
    fn sowing_filters_by_farmer_and_product() {
        let (store, _, product_id, municipality_id) = seeded_store();
        store
            .create_sowing(1, &sowing_input(product_id, municipality_id))
            .unwrap();
        store
            .create_sowing(2, &sowing_input(product_id, municipality_id))
            .unwrap();

        let mine = store.list_sowings(SowingFilter {
            farmer_id: Some(1),
            ..Default::default()
        });
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].farmer_id, 1);

        let all = store.list_sowings(SowingFilter::default());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn municipality_with_sowings_is_protected() {
        let (store, _, product_id, municipality_id) = seeded_store();
        store
            .create_sowing(1, &sowing_input(product_id, municipality_id))
            .unwrap();

        let err = store.delete_municipality(municipality_id).unwrap_err();
        assert_eq!(err, StoreError::MunicipalityInUse);
    }

    #[test]
    fn deleting_product_cascades_to_sowings_and_prices() {
        let (store, _, product_id, municipality_id) = seeded_store();
        store
            .create_sowing(1, &sowing_input(product_id, municipality_id))
            .unwrap();
        store
            .create_price(
                None,
                &PriceInput {
                    product_id,
                    value: 3500.0,
                    quantity: 1.0,
                    unit: crate::models::PriceUnit::Kilo,
                    date: Utc::now(),
                },
            )
            .unwrap();

        store.delete_product(product_id).unwrap();
        assert!(store.list_sowings(SowingFilter::default()).is_empty());
        assert!(store.list_prices(None).is_empty());
        // With its sowings gone, the municipality can now be removed.
        assert!(store.delete_municipality(municipality_id).is_ok());
    }

    #[test]
    fn deleting_category_cascades_to_products() {
        let (store, category_id, product_id, _) = seeded_store();
        store.delete_category(category_id).unwrap();
        assert_eq!(
            store.get_product(product_id).unwrap_err(),
            StoreError::NotFound("product")
        );
    }

    #[test]
    fn list_products_filters_by_name_substring() {
        let (store, category_id, _, _) = seeded_store();
        store
            .create_product(&ProductInput {
                category_id,
                name: "Cherry Tomato".to_string(),
                ..Default::default()
            })
            .unwrap();

        let hits = store.list_products(None, Some("tomato"));
        assert_eq!(hits.len(), 2);
        let hits = store.list_products(None, Some("cherry"));
        assert_eq!(hits.len(), 1);
    }
}
