//! Data models for order packing.
//!
//! This module defines the request and result structures of the packer:
//! - `OrderItem`: One submitted line of a customer order
//! - `ProductInfo`: Name and unit weight of a product, as seen by the packer
//! - `PackedItem` / `PackedBox`: The packing result, one box per closure
//!
//! Validation helpers live here as well so the HTTP boundary and the catalog
//! loader share the same rules.

use serde::{Deserialize, Serialize, Serializer};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Validation error for order and catalog data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
}

/// Validates a unit weight. Zero is allowed (unknown products weigh nothing).
pub fn validate_weight_value(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be a finite value >= 0, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates a single box dimension in centimeters.
pub fn validate_dimension(value: u32, name: &str) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Rounds a weight in kg to two decimal places.
pub fn round_kg(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn serialize_rounded_kg<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round_kg(*value))
}

/// One line of a submitted order.
///
/// # Fields
/// * `product_id` - Product being ordered
/// * `customer_id` - Customer placing the line
/// * `quantity` - Number of units
/// * `customer_order` - Delivery sequence of the customer (highest is packed first)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "product_id": 1,
    "customer_id": 101,
    "quantity": 3,
    "customer_order": 1
}))]
pub struct OrderItem {
    pub product_id: i64,
    pub customer_id: i64,
    pub quantity: i64,
    pub customer_order: i64,
}

impl OrderItem {
    pub fn new(product_id: i64, customer_id: i64, quantity: i64, customer_order: i64) -> Self {
        Self {
            product_id,
            customer_id,
            quantity,
            customer_order,
        }
    }

    /// Boundary check applied by the HTTP layer before packing.
    ///
    /// The packer itself accepts any quantity.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity < 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "quantity of product {} for customer {} must not be negative, got: {}",
                self.product_id, self.customer_id, self.quantity
            )));
        }
        Ok(())
    }
}

/// Product data the packer needs: display name and weight of one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductInfo {
    pub name: String,
    pub unit_weight: f64,
}

impl ProductInfo {
    pub fn new(name: impl Into<String>, unit_weight: f64) -> Self {
        Self {
            name: name.into(),
            unit_weight,
        }
    }

    /// Stand-in for a product id missing from the catalog.
    pub fn fallback(product_id: i64) -> Self {
        Self {
            name: format!("Product {}", product_id),
            unit_weight: 0.0,
        }
    }
}

/// An order line as it ends up inside a box.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackedItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub weight_each: f64,
}

impl PackedItem {
    /// Weight contributed by this line (`weight_each * quantity`).
    pub fn line_weight(&self) -> f64 {
        self.weight_each * self.quantity as f64
    }
}

/// A closed shipping box.
///
/// # Fields
/// * `box_id` - Global number (1-based) in emission order
/// * `customer_id` - Owner of every item in the box
/// * `box_type_id` - Alternating box type (1 for odd `box_id`, 2 for even)
/// * `color` - Color name of the box type
/// * `total_weight` - Sum of line weights in kg, rounded only when serialized
/// * `items` - Packed lines in submission order
/// * `stack_level` - Stacking tier among boxes of the same type
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackedBox {
    pub box_id: usize,
    pub customer_id: i64,
    pub box_type_id: i64,
    pub color: String,
    #[serde(serialize_with = "serialize_rounded_kg")]
    pub total_weight: f64,
    pub items: Vec<PackedItem>,
    pub stack_level: usize,
}

impl PackedBox {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// A box is oversized when its weight exceeds `cap`; only possible for a lone item.
    pub fn is_oversized(&self, cap: f64) -> bool {
        self.total_weight > cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_product_has_synthetic_name_and_no_weight() {
        let info = ProductInfo::fallback(42);
        assert_eq!(info.name, "Product 42");
        assert_eq!(info.unit_weight, 0.0);
    }

    #[test]
    fn negative_quantity_is_rejected_at_the_boundary() {
        assert!(OrderItem::new(1, 1, 0, 1).validate().is_ok());
        assert!(OrderItem::new(1, 1, 7, 1).validate().is_ok());
        let err = OrderItem::new(3, 9, -2, 1).validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidQuantity(_)));
        assert!(err.to_string().contains("product 3"));
    }

    #[test]
    fn weight_validation_allows_zero_but_not_negative_or_nan() {
        assert!(validate_weight_value(0.0, "weight_kg").is_ok());
        assert!(validate_weight_value(12.5, "weight_kg").is_ok());
        assert!(validate_weight_value(-0.1, "weight_kg").is_err());
        assert!(validate_weight_value(f64::NAN, "weight_kg").is_err());
        assert!(validate_weight_value(f64::INFINITY, "weight_kg").is_err());
    }

    #[test]
    fn dimension_validation_rejects_zero() {
        assert!(validate_dimension(39, "width_cm").is_ok());
        assert!(validate_dimension(0, "width_cm").is_err());
    }

    #[test]
    fn total_weight_is_rounded_only_on_serialization() {
        let packed = PackedBox {
            box_id: 1,
            customer_id: 7,
            box_type_id: 1,
            color: "Red".to_string(),
            total_weight: 10.30449,
            items: Vec::new(),
            stack_level: 1,
        };
        assert_eq!(packed.total_weight, 10.30449);

        let value = serde_json::to_value(&packed).unwrap();
        assert_eq!(value["total_weight"], json!(10.3));
        assert_ne!(value["total_weight"], json!(packed.total_weight));
        assert_eq!(value["stack_level"], json!(1));
    }

    #[test]
    fn order_item_deserializes_from_upload_payload() {
        let raw = r#"{"product_id": 5, "customer_id": 12, "quantity": 4, "customer_order": 3}"#;
        let item: OrderItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item, OrderItem::new(5, 12, 4, 3));
    }

    #[test]
    fn line_weight_multiplies_unit_weight_by_quantity() {
        let item = PackedItem {
            product_id: 1,
            product_name: "Rice 5kg".to_string(),
            quantity: 3,
            weight_each: 5.0,
        };
        assert_eq!(item.line_weight(), 15.0);
    }
}
