//! Pure checkout arithmetic: splitting a cart per seller and working out
//! what a sale does to a product's stock.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Remaining stock at or below this (and above zero) raises a warning.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub product_name: String,
    pub unit_price: i64,
    pub quantity: i32,
}

impl CartLine {
    pub fn total(&self) -> i64 {
        self.unit_price * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerGroup {
    pub seller_id: Uuid,
    pub lines: Vec<CartLine>,
    pub subtotal: i64,
}

/// Groups lines by seller, ordered by seller id. Line order inside a group
/// follows the cart.
pub fn group_by_seller(lines: &[CartLine]) -> Vec<SellerGroup> {
    let mut groups: BTreeMap<Uuid, Vec<CartLine>> = BTreeMap::new();
    for line in lines {
        groups.entry(line.seller_id).or_default().push(line.clone());
    }

    groups
        .into_iter()
        .map(|(seller_id, lines)| {
            let subtotal = lines.iter().map(CartLine::total).sum();
            SellerGroup {
                seller_id,
                lines,
                subtotal,
            }
        })
        .collect()
}

pub fn combined_total(lines: &[CartLine]) -> i64 {
    lines.iter().map(CartLine::total).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub new_stock: i32,
    pub is_active: bool,
    pub low_stock: bool,
}

/// Stock never goes negative; an emptied product is taken off the shop.
pub fn apply_sale(stock: i32, quantity: i32) -> StockUpdate {
    let new_stock = stock.saturating_sub(quantity).max(0);
    StockUpdate {
        new_stock,
        is_active: new_stock > 0,
        low_stock: new_stock > 0 && new_stock <= LOW_STOCK_THRESHOLD,
    }
}

/// `1250` → `"12.50 €"`.
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02} €", cents / 100, cents % 100)
}

/// First block of a UUID, used as a human order reference.
pub fn order_ref(id: Uuid) -> String {
    id.simple().to_string()[..8].to_uppercase()
}
