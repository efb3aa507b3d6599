//! Checkout bill (结账单)
//!
//! Web order prices already include tax; dine-in prices do not.
//!
//! | Order | net | tax |
//! |-------|-----|-----|
//! | web (remote id) | subtotal / 1.10 | subtotal - net |
//! | dine-in | subtotal | subtotal × 0.10 |

use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{DiningTable, Order};
use shared::money::round_money;
use shared::util::{format_local_millis, now_millis};

use super::service::FloorService;

/// 10%
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillLine {
    pub order_id: i64,
    pub dish_name: String,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub tax_included: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bill {
    pub table_id: i64,
    pub table_name: String,
    pub lines: Vec<BillLine>,
    /// Net of tax
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub generated_at: i64,
}

impl Bill {
    /// Bill for `orders` seated at `table`
    pub fn for_orders<'a>(table: &DiningTable, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        let mut lines = Vec::new();
        let mut net = Decimal::ZERO;
        let mut tax = Decimal::ZERO;

        for order in orders {
            let gross = order.total_amount();
            let tax_included = order.is_web_order();
            if tax_included {
                let order_net = gross / (Decimal::ONE + TAX_RATE);
                net += order_net;
                tax += gross - order_net;
            } else {
                net += gross;
                tax += gross * TAX_RATE;
            }
            lines.extend(order.items.iter().map(|item| BillLine {
                order_id: order.id,
                dish_name: item.dish_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal(),
                tax_included,
            }));
        }

        let subtotal = round_money(net);
        let tax = round_money(tax);
        Self {
            table_id: table.id,
            table_name: table.name.clone(),
            lines,
            subtotal,
            tax,
            total: subtotal + tax,
            generated_at: now_millis(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain-text rendering, one line per item
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Table {}  {}", self.table_name, format_local_millis(self.generated_at));
        for line in &self.lines {
            let _ = writeln!(
                out,
                "{:>3} x {:<24} {:>10.2}",
                line.quantity, line.dish_name, line.subtotal
            );
        }
        let _ = writeln!(out, "{:<30} {:>10.2}", "Subtotal", self.subtotal);
        let _ = writeln!(out, "{:<30} {:>10.2}", "Tax", self.tax);
        let _ = writeln!(out, "{:<30} {:>10.2}", "Total", self.total);
        out
    }
}

impl FloorService {
    /// Bill for the table's open orders, `None` for an unknown table
    pub fn bill_for_table(&self, table_id: i64) -> Option<Bill> {
        let table = self.table(table_id)?;
        Some(Bill::for_orders(table, self.open_orders_for_table(table_id)))
    }

    /// Produce the bill and flag the table as billed
    pub fn print_bill(&mut self, table_id: i64) -> Option<Bill> {
        let bill = self.bill_for_table(table_id)?;
        self.mark_bill_printed(table_id);
        tracing::info!(table_id, total = %bill.total, "Bill printed");
        Some(bill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ADHOC_DISH_ID, DiningTableCreate, OrderCreate, OrderItem, OrderStatus};

    fn item(price: i64, quantity: i32) -> OrderItem {
        OrderItem::new(ADHOC_DISH_ID, "Dish", Decimal::new(price, 2), quantity)
    }

    fn table_with(service: &mut FloorService, orders: Vec<(Option<&str>, Vec<OrderItem>)>) -> i64 {
        let table_id = service.add_table(DiningTableCreate {
            name: "T1".to_string(),
            capacity: None,
            location: None,
            web_customer: None,
        });
        for (remote_id, items) in orders {
            service
                .add_order(OrderCreate {
                    table_id,
                    items,
                    remote_id: remote_id.map(str::to_string),
                    ..Default::default()
                })
                .unwrap();
        }
        table_id
    }

    #[test]
    fn dine_in_adds_tax() {
        let mut service = FloorService::new();
        let table = table_with(&mut service, vec![(None, vec![item(500, 2)])]);

        let bill = service.bill_for_table(table).unwrap();
        assert_eq!(bill.subtotal, Decimal::new(1000, 2));
        assert_eq!(bill.tax, Decimal::new(100, 2));
        assert_eq!(bill.total, Decimal::new(1100, 2));
        assert!(!bill.lines[0].tax_included);
    }

    #[test]
    fn web_order_prices_include_tax() {
        let mut service = FloorService::new();
        let table = table_with(&mut service, vec![(Some("doc"), vec![item(1100, 1)])]);

        let bill = service.bill_for_table(table).unwrap();
        assert_eq!(bill.subtotal, Decimal::new(1000, 2));
        assert_eq!(bill.tax, Decimal::new(100, 2));
        assert_eq!(bill.total, Decimal::new(1100, 2));
        assert!(bill.lines[0].tax_included);
    }

    #[test]
    fn closed_orders_are_not_billed() {
        let mut service = FloorService::new();
        let table = table_with(
            &mut service,
            vec![(None, vec![item(500, 1)]), (None, vec![item(300, 1)])],
        );
        let first = service.orders()[0].id;
        service.update_order_status(first, OrderStatus::Paid);

        let bill = service.bill_for_table(table).unwrap();
        assert_eq!(bill.lines.len(), 1);
        assert_eq!(bill.subtotal, Decimal::new(300, 2));
    }

    #[test]
    fn print_flags_table() {
        let mut service = FloorService::new();
        let table = table_with(&mut service, vec![(None, vec![item(500, 1)])]);

        let bill = service.print_bill(table).unwrap();
        assert!(service.table(table).unwrap().is_bill_printed);
        assert!(bill.render().contains("Total"));
        let json = serde_json::to_value(&bill).unwrap();
        assert_eq!(json["total"], serde_json::json!(5.5));
        assert!(service.print_bill(99).is_none());
    }
}
