// src/io/prices.rs

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::error::DataError;
use crate::io::{field, malformed, non_negative, require_column};
use crate::simulation::economics::{TableEconomics, UnitEconomics};

/// Reads `product_id,unit_price,unit_cost` rows into per-product economics
/// over `default`.
///
/// Price must be positive and cost non-negative; a product listed twice is
/// rejected rather than silently overwritten.
pub fn read_prices<R: Read>(reader: R, default: UnitEconomics) -> Result<TableEconomics, DataError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?;
    let product_id = require_column(headers, "product_id")?;
    let unit_price = require_column(headers, "unit_price")?;
    let unit_cost = require_column(headers, "unit_cost")?;

    let mut table = TableEconomics::new(default);
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 2;

        let product = field(&record, product_id, row, "product_id")?;
        if product.is_empty() {
            return Err(malformed(row, "empty product_id"));
        }
        if table.contains(product) {
            return Err(malformed(row, format!("duplicate product_id '{product}'")));
        }

        let price = non_negative(field(&record, unit_price, row, "unit_price")?, row, "unit_price")?;
        if price == 0.0 {
            return Err(malformed(row, "unit_price must be > 0"));
        }
        let cost = non_negative(field(&record, unit_cost, row, "unit_cost")?, row, "unit_cost")?;

        table = table.with_product(
            product,
            UnitEconomics {
                unit_price: price,
                unit_cost: cost,
            },
        );
    }
    Ok(table)
}

pub fn load_prices_csv(path: impl AsRef<Path>, default: UnitEconomics) -> Result<TableEconomics, DataError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_prices(file, default)?;
    info!(path = %path.display(), products = table.product_count(), "loaded unit prices");
    Ok(table)
}
