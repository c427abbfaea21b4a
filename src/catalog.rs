//! Product and box-type catalog.
//!
//! The catalog is a read-only snapshot loaded once at startup, either from a
//! JSON file or from built-in defaults. It provides the lookup tables the
//! packer consumes and the listings served by `/products` and `/boxes`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::config::CatalogConfig;
use crate::model::{ProductInfo, ValidationError, validate_dimension, validate_weight_value};

/// Errors while loading a catalog snapshot.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("product id {0} is listed more than once")]
    DuplicateProduct(i64),
    #[error("box type id {0} is listed more than once")]
    DuplicateBoxType(i64),
}

/// Product as listed by the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "id": 1, "product_name": "Jasmine rice 5kg", "weight_kg": 5.0 }))]
pub struct CatalogProduct {
    pub id: i64,
    pub product_name: String,
    pub weight_kg: f64,
}

/// Physical box variant. `name` doubles as the display color.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxType {
    pub id: i64,
    pub name: String,
    pub width_cm: u32,
    pub length_cm: u32,
    #[serde(default)]
    pub height_cm: Option<u32>,
}

/// Box-type listing entry served by `/boxes`.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct BoxDimensions {
    pub name: String,
    pub width: u32,
    pub length: u32,
    pub height: Option<u32>,
}

fn default_box_types() -> Vec<BoxType> {
    vec![
        BoxType {
            id: 1,
            name: "Red".to_string(),
            width_cm: 39,
            length_cm: 59,
            height_cm: None,
        },
        BoxType {
            id: 2,
            name: "Blue".to_string(),
            width_cm: 29,
            length_cm: 39,
            height_cm: None,
        },
    ]
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    products: Vec<CatalogProduct>,
    #[serde(default = "default_box_types")]
    boxes: Vec<BoxType>,
}

/// Validated catalog snapshot with prebuilt lookup tables.
#[derive(Clone, Debug)]
pub struct Catalog {
    products: Vec<CatalogProduct>,
    boxes: Vec<BoxType>,
    product_info: HashMap<i64, ProductInfo>,
    box_colors: HashMap<i64, String>,
}

impl Catalog {
    /// Builds a catalog after validating weights, dimensions and id uniqueness.
    pub fn new(products: Vec<CatalogProduct>, boxes: Vec<BoxType>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for product in &products {
            validate_weight_value(
                product.weight_kg,
                &format!("weight_kg of product {}", product.id),
            )?;
            if !seen.insert(product.id) {
                return Err(CatalogError::DuplicateProduct(product.id));
            }
        }

        let mut seen = HashSet::new();
        for box_type in &boxes {
            validate_dimension(box_type.width_cm, &format!("width_cm of box {}", box_type.id))?;
            validate_dimension(box_type.length_cm, &format!("length_cm of box {}", box_type.id))?;
            if let Some(height) = box_type.height_cm {
                validate_dimension(height, &format!("height_cm of box {}", box_type.id))?;
            }
            if !seen.insert(box_type.id) {
                return Err(CatalogError::DuplicateBoxType(box_type.id));
            }
        }

        let product_info = products
            .iter()
            .map(|p| (p.id, ProductInfo::new(p.product_name.clone(), p.weight_kg)))
            .collect();
        let box_colors = boxes.iter().map(|b| (b.id, b.name.clone())).collect();

        Ok(Self {
            products,
            boxes,
            product_info,
            box_colors,
        })
    }

    /// Parses a catalog document: `{ "products": [...], "boxes": [...] }`.
    ///
    /// A missing `boxes` section falls back to the two default box types.
    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Self::new(file.products, file.boxes)
    }

    /// Reads a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Loads the configured catalog file, or the default snapshot when none is set.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let catalog = match config.path() {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let source = config
            .path()
            .map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string());
        info!(
            products = catalog.products.len(),
            box_types = catalog.boxes.len(),
            %source,
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn products(&self) -> &[CatalogProduct] {
        &self.products
    }

    /// Box types keyed by id, ordered by id.
    pub fn box_dimensions(&self) -> BTreeMap<i64, BoxDimensions> {
        self.boxes
            .iter()
            .map(|b| {
                (
                    b.id,
                    BoxDimensions {
                        name: b.name.clone(),
                        width: b.width_cm,
                        length: b.length_cm,
                        height: b.height_cm,
                    },
                )
            })
            .collect()
    }

    /// Product lookup table for the packer.
    pub fn product_info(&self) -> &HashMap<i64, ProductInfo> {
        &self.product_info
    }

    /// Box type to color lookup table for the packer.
    pub fn box_colors(&self) -> &HashMap<i64, String> {
        &self.box_colors
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let boxes = default_box_types();
        let box_colors = boxes.iter().map(|b| (b.id, b.name.clone())).collect();
        Self {
            products: Vec::new(),
            boxes,
            product_info: HashMap::new(),
            box_colors,
        }
    }
}
