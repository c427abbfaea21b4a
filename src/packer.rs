//! Packing logic for customer orders.
//!
//! Order lines are distributed over shipping boxes in a single greedy pass:
//! - Customers are packed one after another, highest delivery sequence first
//! - A box is closed as soon as the next line would push it over the weight cap
//! - Box types alternate over the global box sequence
//! - Boxes of the same type are stacked in tiers of `STACK_GROUP_SIZE`
//!
//! The packer performs no I/O. Catalog lookups are passed in as resolved maps.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, trace};

use crate::model::{OrderItem, PackedBox, PackedItem, ProductInfo, round_kg};

/// Maximum weight of a box in kg. A single line heavier than this still gets a box of its own.
pub const WEIGHT_CAP_KG: f64 = 20.0;
/// Number of boxes of one type that share a stack level.
pub const STACK_GROUP_SIZE: usize = 5;
/// Number of alternating box types.
pub const BOX_TYPE_COUNT: usize = 2;
/// Color reported for a box type missing from the color map.
pub const UNKNOWN_COLOR: &str = "Unknown";

/// Position in the global box sequence.
///
/// Threaded through every per-customer packing call so numbering continues
/// across customer boundaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoxSequence {
    next_box_id: usize,
}

impl BoxSequence {
    pub fn new() -> Self {
        Self { next_box_id: 1 }
    }

    /// Id the next closed box will receive.
    pub fn next_box_id(&self) -> usize {
        self.next_box_id
    }

    /// Box type for a given box id: 1 for odd ids, 2 for even ids.
    pub fn box_type_for(box_id: usize) -> i64 {
        (box_id.saturating_sub(1) % BOX_TYPE_COUNT) as i64 + 1
    }

    /// Consumes one position and returns `(box_id, box_type_id, next sequence)`.
    fn advance(self) -> (usize, i64, Self) {
        let box_id = self.next_box_id();
        (
            box_id,
            Self::box_type_for(box_id),
            Self {
                next_box_id: box_id + 1,
            },
        )
    }
}

impl Default for BoxSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// All lines of one customer, in submission order.
#[derive(Clone, Debug)]
pub struct CustomerOrders<'a> {
    pub customer_id: i64,
    /// Last delivery sequence seen for this customer.
    pub customer_order: i64,
    pub items: Vec<&'a OrderItem>,
}

/// Events emitted while packing, suitable for streaming to a client.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Packing of a customer's lines begins.
    CustomerStarted {
        customer_id: i64,
        customer_order: i64,
        item_count: usize,
    },
    /// A box was closed and numbered. Its stack level is assigned after all boxes exist.
    BoxClosed {
        box_id: usize,
        customer_id: i64,
        box_type_id: i64,
        color: String,
        total_weight: f64,
        item_count: usize,
    },
    /// Packing finished.
    Finished { boxes: usize, customers: usize },
}

/// Aggregate figures of a packing run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PackingSummary {
    pub boxes: usize,
    pub customers: usize,
    pub items: usize,
    pub total_weight: f64,
    /// Boxes over the weight cap (single oversized line).
    pub oversized_boxes: usize,
}

impl PackingSummary {
    pub fn from_boxes(boxes: &[PackedBox]) -> Self {
        let customers = boxes
            .iter()
            .map(|b| b.customer_id)
            .collect::<HashSet<_>>()
            .len();
        Self {
            boxes: boxes.len(),
            customers,
            items: boxes.iter().map(PackedBox::item_count).sum(),
            total_weight: round_kg(boxes.iter().map(|b| b.total_weight).sum()),
            oversized_boxes: boxes
                .iter()
                .filter(|b| b.is_oversized(WEIGHT_CAP_KG))
                .count(),
        }
    }
}

/// The box currently being filled.
#[derive(Debug, Default)]
struct OpenBox {
    items: Vec<PackedItem>,
    weight: f64,
}

impl OpenBox {
    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // The cap only applies once the box holds something.
    fn would_overflow(&self, line_weight: f64) -> bool {
        !self.is_empty() && self.weight + line_weight > WEIGHT_CAP_KG
    }

    fn push(&mut self, item: PackedItem, line_weight: f64) {
        self.items.push(item);
        self.weight += line_weight;
    }
}

fn resolve_product(products: &HashMap<i64, ProductInfo>, product_id: i64) -> ProductInfo {
    products
        .get(&product_id)
        .cloned()
        .unwrap_or_else(|| ProductInfo::fallback(product_id))
}

fn resolve_color(colors: &HashMap<i64, String>, box_type_id: i64) -> String {
    colors
        .get(&box_type_id)
        .cloned()
        .unwrap_or_else(|| UNKNOWN_COLOR.to_string())
}

/// Groups order lines by customer and orders the customers for packing.
///
/// Customers are sorted by delivery sequence, highest first. Ties keep the
/// order in which customers first appear in `items`. When a customer's lines
/// disagree on the delivery sequence, the last one wins.
pub fn group_by_customer(items: &[OrderItem]) -> Vec<CustomerOrders<'_>> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<CustomerOrders<'_>> = Vec::new();

    for item in items {
        let slot = *index.entry(item.customer_id).or_insert_with(|| {
            groups.push(CustomerOrders {
                customer_id: item.customer_id,
                customer_order: item.customer_order,
                items: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.customer_order = item.customer_order;
        group.items.push(item);
    }

    // sort_by is stable, which keeps first-appearance order for equal sequences
    groups.sort_by(|a, b| b.customer_order.cmp(&a.customer_order));
    groups
}

fn close_box(
    open: OpenBox,
    customer_id: i64,
    colors: &HashMap<i64, String>,
    sequence: BoxSequence,
    on_event: &mut impl FnMut(&PackEvent),
) -> (PackedBox, BoxSequence) {
    let (box_id, box_type_id, next) = sequence.advance();
    let color = resolve_color(colors, box_type_id);

    trace!(
        box_id,
        customer_id,
        box_type_id,
        weight = open.weight,
        items = open.items.len(),
        "box closed"
    );
    on_event(&PackEvent::BoxClosed {
        box_id,
        customer_id,
        box_type_id,
        color: color.clone(),
        total_weight: round_kg(open.weight),
        item_count: open.items.len(),
    });

    let packed = PackedBox {
        box_id,
        customer_id,
        box_type_id,
        color,
        total_weight: open.weight,
        items: open.items,
        // Final tier is set by `assign_stack_levels`.
        stack_level: 1,
    };
    (packed, next)
}

/// Packs the lines of one customer into boxes.
///
/// Lines are never split or reordered. A line that would push a non-empty box
/// over `WEIGHT_CAP_KG` closes that box and starts a new one.
///
/// # Parameters
/// * `customer` - The customer's lines in submission order
/// * `products` - Product lookup; missing ids fall back to `ProductInfo::fallback`
/// * `colors` - Box type to color lookup
/// * `sequence` - Global numbering state before this customer
/// * `on_event` - Progress callback
///
/// # Returns
/// The closed boxes and the numbering state after this customer
pub fn pack_customer(
    customer: &CustomerOrders<'_>,
    products: &HashMap<i64, ProductInfo>,
    colors: &HashMap<i64, String>,
    sequence: BoxSequence,
    on_event: &mut impl FnMut(&PackEvent),
) -> (Vec<PackedBox>, BoxSequence) {
    let mut sequence = sequence;
    let mut boxes = Vec::new();
    let mut open = OpenBox::default();

    for item in &customer.items {
        let info = resolve_product(products, item.product_id);
        let packed_item = PackedItem {
            product_id: item.product_id,
            product_name: info.name,
            quantity: item.quantity,
            weight_each: info.unit_weight,
        };
        let line_weight = packed_item.line_weight();

        if open.would_overflow(line_weight) {
            let (packed, next) = close_box(
                std::mem::take(&mut open),
                customer.customer_id,
                colors,
                sequence,
                &mut *on_event,
            );
            boxes.push(packed);
            sequence = next;
        }

        open.push(packed_item, line_weight);
    }

    if !open.is_empty() {
        let (packed, next) =
            close_box(open, customer.customer_id, colors, sequence, &mut *on_event);
        boxes.push(packed);
        sequence = next;
    }

    (boxes, sequence)
}

/// Assigns stack levels over the final box sequence.
///
/// The k-th box of a type (counted in emission order) lands on level
/// `(k - 1) / STACK_GROUP_SIZE + 1`.
pub fn assign_stack_levels(boxes: &mut [PackedBox]) {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for packed in boxes.iter_mut() {
        let count = counts.entry(packed.box_type_id).or_insert(0);
        *count += 1;
        packed.stack_level = (*count - 1) / STACK_GROUP_SIZE + 1;
    }
}

/// Main entry point: packs all order lines into numbered, stacked boxes.
///
/// # Parameters
/// * `items` - Order lines in submission order
/// * `products` - Product lookup (name and unit weight)
/// * `colors` - Box type to color lookup
///
/// # Returns
/// Boxes in emission order: customers by descending delivery sequence, then
/// closure order within each customer
pub fn pack_orders(
    items: &[OrderItem],
    products: &HashMap<i64, ProductInfo>,
    colors: &HashMap<i64, String>,
) -> Vec<PackedBox> {
    pack_orders_with_progress(items, products, colors, |_| {})
}

/// Like `pack_orders`, with a callback for every step (suitable for SSE).
pub fn pack_orders_with_progress(
    items: &[OrderItem],
    products: &HashMap<i64, ProductInfo>,
    colors: &HashMap<i64, String>,
    mut on_event: impl FnMut(&PackEvent),
) -> Vec<PackedBox> {
    let customers = group_by_customer(items);
    let mut sequence = BoxSequence::new();
    let mut packed: Vec<PackedBox> = Vec::new();

    // Phase 1: emit boxes in customer sequence
    for customer in &customers {
        debug!(
            customer_id = customer.customer_id,
            customer_order = customer.customer_order,
            items = customer.items.len(),
            "packing customer"
        );
        on_event(&PackEvent::CustomerStarted {
            customer_id: customer.customer_id,
            customer_order: customer.customer_order,
            item_count: customer.items.len(),
        });
        let (boxes, next) = pack_customer(customer, products, colors, sequence, &mut on_event);
        packed.extend(boxes);
        sequence = next;
    }

    // Phase 2: stack levels depend on the complete sequence
    assign_stack_levels(&mut packed);

    on_event(&PackEvent::Finished {
        boxes: packed.len(),
        customers: customers.len(),
    });
    packed
}
