//! Take-away draft (外卖购物车)
//!
//! A counter-side cart built from the dish catalog. Nothing touches the
//! floor until the draft is confirmed, which creates a take-away table and
//! its order in one step.

use rust_decimal::Decimal;
use shared::models::{Dish, Order, OrderItem, WebCustomer};

use super::service::{FloorService, TakeawayOrderCreate, TakeawaySource};

pub const TAKEAWAY_NOTE: &str = "Take Away";

#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub dish_id: i64,
    pub dish_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl DraftLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TakeAwayDraft {
    pub customer: WebCustomer,
    lines: Vec<DraftLine>,
}

impl TakeAwayDraft {
    pub fn new(customer: WebCustomer) -> Self {
        Self {
            customer,
            lines: Vec::new(),
        }
    }

    /// Add one unit of `dish`; repeated adds raise the quantity
    ///
    /// Unavailable dishes are refused.
    pub fn add_dish(&mut self, dish: &Dish) -> bool {
        if !dish.is_available {
            return false;
        }
        match self.lines.iter_mut().find(|l| l.dish_id == dish.id) {
            Some(line) => line.quantity += 1,
            None => self.lines.push(DraftLine {
                dish_id: dish.id,
                dish_name: dish.name.clone(),
                unit_price: dish.price,
                quantity: 1,
            }),
        }
        true
    }

    pub fn increase(&mut self, dish_id: i64) -> bool {
        match self.lines.iter_mut().find(|l| l.dish_id == dish_id) {
            Some(line) => {
                line.quantity += 1;
                true
            }
            None => false,
        }
    }

    /// Lower the quantity by one, removing the line at one
    pub fn decrease(&mut self, dish_id: i64) -> bool {
        let Some(index) = self.lines.iter().position(|l| l.dish_id == dish_id) else {
            return false;
        };
        if self.lines[index].quantity > 1 {
            self.lines[index].quantity -= 1;
        } else {
            self.lines.remove(index);
        }
        true
    }

    pub fn remove(&mut self, dish_id: i64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.dish_id != dish_id);
        self.lines.len() != before
    }

    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(DraftLine::subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn notes(&self) -> String {
        match self.customer.phone.as_deref() {
            Some(phone) => format!("{TAKEAWAY_NOTE} - {phone}"),
            None => TAKEAWAY_NOTE.to_string(),
        }
    }

    /// Order payload, `None` for an empty draft
    pub fn into_order_create(self, capacity: i32) -> Option<TakeawayOrderCreate> {
        if self.is_empty() {
            return None;
        }
        let notes = self.notes();
        Some(TakeawayOrderCreate {
            source: TakeawaySource::Counter,
            customer: self.customer,
            capacity,
            created_at: None,
            notes,
            items: self
                .lines
                .into_iter()
                .map(|l| OrderItem::new(l.dish_id, l.dish_name, l.unit_price, l.quantity))
                .collect(),
            remote_id: None,
        })
    }
}

impl FloorService {
    /// Commit a draft as a counter take-away table and order
    pub fn confirm_takeaway(&mut self, draft: TakeAwayDraft, capacity: i32) -> Option<Order> {
        let data = draft.into_order_create(capacity)?;
        self.add_takeaway_order(data)
    }
}
