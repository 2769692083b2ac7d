// src/model/shelf_life.rs

//! Shelf life by product category.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryInfo {
    pub name: &'static str,
    pub shelf_life_days: i64,
}

const fn info(name: &'static str, shelf_life_days: i64) -> CategoryInfo {
    CategoryInfo {
        name,
        shelf_life_days,
    }
}

/// Known fresh categories, keyed by numeric category id.
const CATEGORIES: &[(u32, CategoryInfo)] = &[
    // Highly perishable
    (0, info("Fresh Prepared Foods", 2)),
    (28, info("Fresh Bakery", 3)),
    (29, info("Deli & Ready Meals", 3)),
    // Perishable
    (5, info("Fresh Fruits", 7)),
    (11, info("Fresh Vegetables", 5)),
    (30, info("Fresh Meat & Poultry", 4)),
    (25, info("Organic Produce", 5)),
    (20, info("Packaged Salads", 7)),
    // Semi-perishable
    (4, info("Dairy Products", 14)),
    (10, info("Fresh Juice", 10)),
    (22, info("Fresh Pasta", 14)),
    (23, info("Fresh Sauces", 14)),
    // Longer shelf life
    (8, info("Eggs", 21)),
    (18, info("Yogurt & Fermented", 21)),
    (16, info("Cheese", 30)),
];

pub const UNKNOWN_CATEGORY: CategoryInfo = info("Other Fresh Products", 7);

pub fn category_info(category_id: u32) -> CategoryInfo {
    CATEGORIES
        .iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, info)| *info)
        .unwrap_or(UNKNOWN_CATEGORY)
}

/// Shelf life for a series: its category's if known, `default_days` when the
/// series carries no category at all.
pub fn shelf_life_days(category_id: Option<u32>, default_days: i64) -> i64 {
    match category_id {
        Some(id) => category_info(id).shelf_life_days,
        None => default_days,
    }
}
