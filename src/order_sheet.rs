//! Wide-format order sheet import.
//!
//! Order sheets list products as rows and customers as columns:
//!
//! ```text
//! product,101,102,103
//! 1,3,,1
//! 2,,5,2
//! ```
//!
//! The first cell of the header is ignored; the remaining header cells are
//! customer ids. A customer's column position (1-based) is its delivery
//! sequence. Empty header cells are allowed as long as no quantity sits
//! below them.
//!
//! Quantity cells are read by their leading integer, so `2.0` is 2 and
//! `3kg` is 3. Cells without leading digits are skipped.

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::model::OrderItem;

/// Errors while reading an order sheet.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("could not read order sheet: {0}")]
    Csv(#[from] csv::Error),
    #[error("order sheet is empty, expected a header row with customer ids")]
    MissingHeader,
    #[error("header column {column} does not contain a customer id: '{value}'")]
    InvalidCustomerId { column: usize, value: String },
    #[error("row {row} does not start with a product id: '{value}'")]
    InvalidProductId { row: usize, value: String },
    #[error("row {row} has a quantity in column {column}, which has no customer id")]
    QuantityWithoutCustomer { row: usize, column: usize },
    #[error("row {row} has {cells} quantity cells but only {customers} customers are listed")]
    RowTooWide {
        row: usize,
        cells: usize,
        customers: usize,
    },
}

// `None` marks an empty header cell, as left behind by a trailing comma.
fn parse_customer_ids(header: &StringRecord) -> Result<Vec<Option<i64>>, SheetError> {
    header
        .iter()
        .enumerate()
        .skip(1)
        .map(|(column, value)| {
            if value.is_empty() {
                return Ok(None);
            }
            value
                .parse::<i64>()
                .map(Some)
                .map_err(|_| SheetError::InvalidCustomerId {
                    column: column + 1,
                    value: value.to_string(),
                })
        })
        .collect()
}

/// Reads the optional sign and digits at the start of a cell.
///
/// Anything after the digits is ignored. Returns `None` when the cell does not
/// start with a number or the number does not fit in an `i64`.
fn leading_integer(cell: &str) -> Option<i64> {
    let cell = cell.trim_start();
    let sign_len = usize::from(cell.starts_with(['+', '-']));
    let digits_len = cell[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    cell[..sign_len + digits_len].parse().ok()
}

/// Converts a wide-format sheet into one `OrderItem` per filled quantity cell.
///
/// Items are emitted row by row, left to right.
pub fn parse_order_sheet(raw: &str) -> Result<Vec<OrderItem>, SheetError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record?,
        None => return Err(SheetError::MissingHeader),
    };
    let customer_ids = parse_customer_ids(&header)?;

    let mut items = Vec::new();
    for (row_idx, result) in records.enumerate() {
        let record = result?;
        let row = record
            .position()
            .map_or(row_idx + 2, |pos| pos.line() as usize);

        let first = record.get(0).unwrap_or_default();
        let product_id = first
            .parse::<i64>()
            .map_err(|_| SheetError::InvalidProductId {
                row,
                value: first.to_string(),
            })?;

        let cells = record.len().saturating_sub(1);
        if cells > customer_ids.len() {
            return Err(SheetError::RowTooWide {
                row,
                cells,
                customers: customer_ids.len(),
            });
        }

        for (offset, cell) in record.iter().skip(1).enumerate() {
            let Some(quantity) = leading_integer(cell) else {
                continue;
            };
            let Some(customer_id) = customer_ids[offset] else {
                return Err(SheetError::QuantityWithoutCustomer {
                    row,
                    column: offset + 2,
                });
            };
            items.push(OrderItem::new(
                product_id,
                customer_id,
                quantity,
                offset as i64 + 1,
            ));
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_wide_sheet_to_order_items() {
        let sheet = "product,101,102,103\n1,3,,1\n2,,5,2\n";
        let items = parse_order_sheet(sheet).unwrap();

        assert_eq!(
            items,
            vec![
                OrderItem::new(1, 101, 3, 1),
                OrderItem::new(1, 103, 1, 3),
                OrderItem::new(2, 102, 5, 2),
                OrderItem::new(2, 103, 2, 3),
            ]
        );
    }

    #[test]
    fn skips_blank_lines_and_non_numeric_cells() {
        let sheet = "sku, 7, 8\n\n5, x , 4\n\n6,2\n";
        let items = parse_order_sheet(sheet).unwrap();
        assert_eq!(
            items,
            vec![OrderItem::new(5, 8, 4, 2), OrderItem::new(6, 7, 2, 1)]
        );
    }

    #[test]
    fn quantity_cells_are_read_by_leading_integer() {
        let items = parse_order_sheet("p,101,102,103,104\n1,2.0,3kg,-1,+4\n").unwrap();
        assert_eq!(
            items,
            vec![
                OrderItem::new(1, 101, 2, 1),
                OrderItem::new(1, 102, 3, 2),
                OrderItem::new(1, 103, -1, 3),
                OrderItem::new(1, 104, 4, 4),
            ]
        );
    }

    #[test]
    fn leading_integer_needs_digits_up_front() {
        assert_eq!(leading_integer("12 boxes"), Some(12));
        assert_eq!(leading_integer("7.9"), Some(7));
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer("kg3"), None);
        assert_eq!(leading_integer(".5"), None);
        assert_eq!(leading_integer(""), None);
        assert_eq!(leading_integer("99999999999999999999"), None);
    }

    #[test]
    fn trailing_empty_header_cell_is_ignored() {
        let items = parse_order_sheet("p,101,102,\n1,2,3\n2,,1,\n").unwrap();
        assert_eq!(
            items,
            vec![
                OrderItem::new(1, 101, 2, 1),
                OrderItem::new(1, 102, 3, 2),
                OrderItem::new(2, 102, 1, 2),
            ]
        );
    }

    #[test]
    fn quantity_under_empty_header_is_rejected() {
        let err = parse_order_sheet("p,101,,103\n1,1,5,1\n").unwrap_err();
        assert!(matches!(
            err,
            SheetError::QuantityWithoutCustomer { row: 2, column: 3 }
        ));
    }

    #[test]
    fn zero_quantities_are_kept() {
        let items = parse_order_sheet("p,1\n3,0\n").unwrap();
        assert_eq!(items, vec![OrderItem::new(3, 1, 0, 1)]);
    }

    #[test]
    fn empty_sheet_is_rejected() {
        assert!(matches!(
            parse_order_sheet(""),
            Err(SheetError::MissingHeader)
        ));
    }

    #[test]
    fn header_only_sheet_yields_no_items() {
        assert!(parse_order_sheet("p,1,2\n").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_numeric_customer_header() {
        let err = parse_order_sheet("p,101,Alice\n1,1,1\n").unwrap_err();
        match err {
            SheetError::InvalidCustomerId { column, value } => {
                assert_eq!(column, 3);
                assert_eq!(value, "Alice");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_row_without_product_id() {
        let err = parse_order_sheet("p,101\nrice,1\n").unwrap_err();
        assert!(matches!(err, SheetError::InvalidProductId { row: 2, .. }));
    }

    #[test]
    fn rejects_rows_wider_than_header() {
        let err = parse_order_sheet("p,101\n1,1,2\n").unwrap_err();
        assert!(matches!(
            err,
            SheetError::RowTooWide {
                row: 2,
                cells: 2,
                customers: 1
            }
        ));
    }
}
