use greencart_api::checkout::{
    CartLine, LOW_STOCK_THRESHOLD, apply_sale, combined_total, format_price, group_by_seller,
    order_ref,
};
use uuid::Uuid;

fn line(seller_id: Uuid, name: &str, unit_price: i64, quantity: i32) -> CartLine {
    CartLine {
        product_id: Uuid::new_v4(),
        seller_id,
        product_name: name.to_string(),
        unit_price,
        quantity,
    }
}

#[test]
fn cart_is_split_into_one_group_per_seller() {
    let seller_x = Uuid::new_v4();
    let seller_y = Uuid::new_v4();
    let lines = vec![
        line(seller_x, "A", 1000, 2),
        line(seller_y, "B", 500, 1),
    ];

    let groups = group_by_seller(&lines);
    assert_eq!(groups.len(), 2);

    let x = groups.iter().find(|g| g.seller_id == seller_x).expect("group X");
    let y = groups.iter().find(|g| g.seller_id == seller_y).expect("group Y");
    assert_eq!(x.subtotal, 2000);
    assert_eq!(y.subtotal, 500);
    assert_eq!(combined_total(&lines), 2500);
}

#[test]
fn lines_of_the_same_seller_share_a_group() {
    let seller = Uuid::new_v4();
    let lines = vec![
        line(seller, "Pain", 250, 3),
        line(seller, "Fromage", 800, 1),
    ];

    let groups = group_by_seller(&lines);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].lines.len(), 2);
    assert_eq!(groups[0].lines[0].product_name, "Pain");
    assert_eq!(groups[0].subtotal, 1550);
}

#[test]
fn empty_cart_has_no_groups() {
    assert!(group_by_seller(&[]).is_empty());
    assert_eq!(combined_total(&[]), 0);
}

#[test]
fn sale_lowers_stock_and_flags_low_stock() {
    let update = apply_sale(10, 2);
    assert_eq!(update.new_stock, 8);
    assert!(update.is_active);
    assert!(!update.low_stock);

    let update = apply_sale(7, 2);
    assert_eq!(update.new_stock, LOW_STOCK_THRESHOLD);
    assert!(update.low_stock);
}

#[test]
fn selling_out_deactivates_without_low_stock_warning() {
    let update = apply_sale(3, 3);
    assert_eq!(update.new_stock, 0);
    assert!(!update.is_active);
    assert!(!update.low_stock);

    let oversold = apply_sale(2, 5);
    assert_eq!(oversold.new_stock, 0);
    assert!(!oversold.is_active);
}

#[test]
fn prices_are_formatted_in_euros() {
    assert_eq!(format_price(1250), "12.50 €");
    assert_eq!(format_price(5), "0.05 €");
    assert_eq!(format_price(0), "0.00 €");
}

#[test]
fn order_reference_is_short_uppercase_prefix() {
    let id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000000").expect("uuid");
    assert_eq!(order_ref(id), "1A2B3C4D");
}
