//! FloorService - canonical tables and orders
//!
//! The only place that assigns ids and changes table/order state. It lives on
//! the owner thread (see [`crate::core::OwnerDispatcher`]) and is never shared
//! behind a lock.
//!
//! # Table occupancy
//!
//! ```text
//!             first open order
//! Available ─────────────────────► Occupied
//!     ▲                               │
//!     └───── no open orders left ─────┘
//!
//! Reserved / Cleaning: set explicitly, left alone by re-evaluation
//! ```
//!
//! Occupancy is re-evaluated after item removal, quantity changes, order
//! status changes and payments. An order whose last item is removed is
//! cancelled.

use std::collections::HashMap;

use shared::models::{
    ADHOC_DISH_ID, DiningTable, DiningTableCreate, Dish, DishCreate, Order, OrderCreate,
    OrderItem, OrderStatus, Payment, PaymentCreate, Reservation, ReservationCreate, TableStatus,
    WebCustomer,
};
use shared::observable::{CollectionChange, ObservableVec, ObserverId};
use shared::util::now_millis;

/// Location shown on take-away tables created for web orders
pub const TAKEAWAY_LOCATION: &str = "Take Away (App)";
/// Web order take-away tables are named `Web_1`, `Web_2`, ...
pub const TAKEAWAY_NAME_PREFIX: &str = "Web_";
/// Location shown on take-away tables rung up at the counter
pub const COUNTER_TAKEAWAY_LOCATION: &str = "Take Away (Counter)";
/// Counter take-away tables are named `Counter_1`, `Counter_2`, ...
pub const COUNTER_TAKEAWAY_NAME_PREFIX: &str = "Counter_";

/// Where a take-away order was placed
///
/// Each source numbers its tables independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TakeawaySource {
    /// Ordering app, ingested from the remote collection
    #[default]
    App,
    /// Walk-in customer at the counter
    Counter,
}

impl TakeawaySource {
    pub fn name_prefix(self) -> &'static str {
        match self {
            TakeawaySource::App => TAKEAWAY_NAME_PREFIX,
            TakeawaySource::Counter => COUNTER_TAKEAWAY_NAME_PREFIX,
        }
    }

    pub fn location(self) -> &'static str {
        match self {
            TakeawaySource::App => TAKEAWAY_LOCATION,
            TakeawaySource::Counter => COUNTER_TAKEAWAY_LOCATION,
        }
    }
}

/// Take-away order payload: creates its own table
#[derive(Debug, Clone, Default)]
pub struct TakeawayOrderCreate {
    pub source: TakeawaySource,
    pub customer: WebCustomer,
    pub capacity: i32,
    pub created_at: Option<i64>,
    pub notes: String,
    pub items: Vec<OrderItem>,
    pub remote_id: Option<String>,
}

/// Local authority over the restaurant floor
pub struct FloorService {
    tables: ObservableVec<DiningTable>,
    orders: ObservableVec<Order>,
    dishes: Vec<Dish>,
    reservations: Vec<Reservation>,
    payments: Vec<Payment>,
    /// remote document id -> local order id
    remote_index: HashMap<String, i64>,
    next_table_id: i64,
    next_dish_id: i64,
    next_order_id: i64,
    next_reservation_id: i64,
    next_payment_id: i64,
    next_app_takeaway: u32,
    next_counter_takeaway: u32,
}

impl std::fmt::Debug for FloorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloorService")
            .field("tables", &self.tables.len())
            .field("orders", &self.orders.len())
            .field("dishes", &self.dishes.len())
            .field("remote_orders", &self.remote_index.len())
            .finish()
    }
}

fn take_id(counter: &mut i64) -> i64 {
    let id = *counter;
    *counter += 1;
    id
}

impl FloorService {
    pub fn new() -> Self {
        Self {
            tables: ObservableVec::new(),
            orders: ObservableVec::new(),
            dishes: Vec::new(),
            reservations: Vec::new(),
            payments: Vec::new(),
            remote_index: HashMap::new(),
            next_table_id: 1,
            next_dish_id: 1,
            next_order_id: 1,
            next_reservation_id: 1,
            next_payment_id: 1,
            next_app_takeaway: 1,
            next_counter_takeaway: 1,
        }
    }

    // ========== Queries ==========

    pub fn tables(&self) -> &[DiningTable] {
        self.tables.as_slice()
    }

    pub fn orders(&self) -> &[Order] {
        self.orders.as_slice()
    }

    pub fn dishes(&self) -> &[Dish] {
        &self.dishes
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn table(&self, table_id: i64) -> Option<&DiningTable> {
        self.tables.find(|t| t.id == table_id)
    }

    pub fn order(&self, order_id: i64) -> Option<&Order> {
        self.orders.find(|o| o.id == order_id)
    }

    /// Local order created from the given remote document, if any
    pub fn order_for_remote(&self, remote_id: &str) -> Option<&Order> {
        let order_id = *self.remote_index.get(remote_id)?;
        self.order(order_id)
    }

    pub fn find_dish_by_name(&self, name: &str) -> Option<&Dish> {
        self.dishes.iter().find(|d| d.matches_name(name))
    }

    /// Orders still keeping the table occupied
    pub fn open_orders_for_table(&self, table_id: i64) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| o.table_id == table_id && o.is_open())
            .collect()
    }

    /// Every order ever seated at the table, including paid ones
    pub fn orders_for_table(&self, table_id: i64) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| o.table_id == table_id)
            .collect()
    }

    // ========== Observers ==========

    pub fn subscribe_tables<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&CollectionChange<'_, DiningTable>) + Send + 'static,
    {
        self.tables.subscribe(observer)
    }

    pub fn subscribe_orders<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&CollectionChange<'_, Order>) + Send + 'static,
    {
        self.orders.subscribe(observer)
    }

    pub fn unsubscribe_tables(&mut self, id: ObserverId) -> bool {
        self.tables.unsubscribe(id)
    }

    pub fn unsubscribe_orders(&mut self, id: ObserverId) -> bool {
        self.orders.unsubscribe(id)
    }

    // ========== Creation ==========

    /// Add a dine-in or take-away table, returns its id
    pub fn add_table(&mut self, data: DiningTableCreate) -> i64 {
        let id = take_id(&mut self.next_table_id);
        self.tables.push(DiningTable {
            id,
            name: data.name,
            capacity: data.capacity.unwrap_or(4),
            status: TableStatus::Available,
            location: data.location.unwrap_or_default(),
            web_customer: data.web_customer,
            is_bill_printed: false,
        });
        tracing::debug!(table_id = id, "Table added");
        id
    }

    pub fn add_dish(&mut self, data: DishCreate) -> i64 {
        let id = take_id(&mut self.next_dish_id);
        self.dishes.push(Dish {
            id,
            name: data.name,
            description: data.description.unwrap_or_default(),
            price: data.price,
            category: data.category.unwrap_or_default(),
            is_available: data.is_available.unwrap_or(true),
        });
        id
    }

    /// Add an order to an existing table and mark the table occupied
    ///
    /// Returns `None` when the table does not exist, an order for the same
    /// remote document already exists, or items were given and none has a
    /// positive quantity.
    pub fn add_order(&mut self, data: OrderCreate) -> Option<i64> {
        let Some(table_index) = self.tables.position(|t| t.id == data.table_id) else {
            tracing::warn!(table_id = data.table_id, "Order rejected: unknown table");
            return None;
        };
        if let Some(remote_id) = data.remote_id.as_deref()
            && let Some(existing) = self.remote_index.get(remote_id)
        {
            tracing::debug!(remote_id, order_id = existing, "Order rejected: remote document already ingested");
            return None;
        }

        let submitted = data.items.len();
        let items: Vec<OrderItem> = data
            .items
            .into_iter()
            .filter(|item| {
                let keep = item.quantity > 0;
                if !keep {
                    tracing::warn!(dish = %item.dish_name, quantity = item.quantity, "Dropping item with non-positive quantity");
                }
                keep
            })
            .collect();
        if submitted > 0 && items.is_empty() {
            tracing::warn!(table_id = data.table_id, submitted, "Order rejected: no item with a positive quantity");
            return None;
        }

        let id = take_id(&mut self.next_order_id);
        if let Some(remote_id) = data.remote_id.as_deref() {
            self.remote_index.insert(remote_id.to_string(), id);
        }
        self.orders.push(Order {
            id,
            table_id: data.table_id,
            created_at: data.created_at.unwrap_or_else(now_millis),
            status: OrderStatus::Pending,
            notes: data.notes.unwrap_or_default(),
            items,
            remote_id: data.remote_id,
        });

        self.tables
            .update(table_index, |t| t.status = TableStatus::Occupied);
        tracing::debug!(order_id = id, table_id = data.table_id, "Order added");
        Some(id)
    }

    /// Create a take-away table and its order in one step
    ///
    /// Returns `None` if the remote document was already ingested or no item
    /// has a positive quantity; nothing is created in that case.
    pub fn add_takeaway_order(&mut self, data: TakeawayOrderCreate) -> Option<Order> {
        if let Some(remote_id) = data.remote_id.as_deref()
            && self.remote_index.contains_key(remote_id)
        {
            tracing::debug!(remote_id, "Take-away order skipped: already ingested");
            return None;
        }
        if !data.items.iter().any(|item| item.quantity > 0) {
            tracing::warn!(source = ?data.source, "Take-away order rejected: no item with a positive quantity");
            return None;
        }

        let counter = match data.source {
            TakeawaySource::App => &mut self.next_app_takeaway,
            TakeawaySource::Counter => &mut self.next_counter_takeaway,
        };
        let number = *counter;
        *counter += 1;
        let table_id = self.add_table(DiningTableCreate {
            name: format!("{}{number}", data.source.name_prefix()),
            capacity: Some(data.capacity),
            location: Some(data.source.location().to_string()),
            web_customer: Some(data.customer),
        });

        let order_id = self.add_order(OrderCreate {
            table_id,
            created_at: data.created_at,
            notes: Some(data.notes),
            items: data.items,
            remote_id: data.remote_id,
        })?;
        self.order(order_id).cloned()
    }

    /// Record a reservation and mark the table Reserved
    ///
    /// Returns `None` for an unknown table.
    pub fn add_reservation(&mut self, data: ReservationCreate) -> Option<i64> {
        let table_index = self.tables.position(|t| t.id == data.table_id)?;
        let id = take_id(&mut self.next_reservation_id);
        self.reservations.push(Reservation {
            id,
            table_id: data.table_id,
            customer_name: data.customer_name,
            customer_phone: data.customer_phone.unwrap_or_default(),
            customer_email: data.customer_email.unwrap_or_default(),
            reservation_time: data.reservation_time,
            number_of_guests: data.number_of_guests,
            special_requests: data.special_requests.unwrap_or_default(),
            is_confirmed: false,
        });

        self.tables
            .update(table_index, |t| t.status = TableStatus::Reserved);
        Some(id)
    }

    /// Settle an order; returns `None` for an unknown order
    pub fn add_payment(&mut self, data: PaymentCreate) -> Option<i64> {
        let order_index = self.orders.position(|o| o.id == data.order_id)?;
        let id = take_id(&mut self.next_payment_id);
        self.payments.push(Payment {
            id,
            order_id: data.order_id,
            amount: data.amount,
            method: data.method,
            payment_time: now_millis(),
            transaction_id: data.transaction_id,
        });

        let table_id = self
            .orders
            .update(order_index, |o| {
                o.status = OrderStatus::Paid;
                o.table_id
            })
            .unwrap_or_default();
        self.refresh_table_occupancy(table_id);
        tracing::debug!(payment_id = id, order_id = data.order_id, "Payment recorded");
        Some(id)
    }

    // ========== Order mutation ==========

    fn open_order_index(&self, order_id: i64) -> Option<usize> {
        let index = self.orders.position(|o| o.id == order_id)?;
        let order = self.orders.get(index)?;
        if order.is_open() {
            Some(index)
        } else {
            tracing::debug!(order_id, status = ?order.status, "Ignoring change to closed order");
            None
        }
    }

    /// Add an item to an open order
    ///
    /// A catalog item (non ad-hoc dish id) with the same unit price as an
    /// existing line is merged into that line.
    pub fn add_item(&mut self, order_id: i64, item: OrderItem) -> bool {
        if item.quantity <= 0 {
            return false;
        }
        let Some(index) = self.open_order_index(order_id) else {
            return false;
        };

        self.orders
            .update(index, |order| {
                let existing = order.items.iter_mut().find(|line| {
                    item.dish_id != ADHOC_DISH_ID
                        && line.dish_id == item.dish_id
                        && line.unit_price == item.unit_price
                        && line.special_instructions == item.special_instructions
                });
                match existing {
                    Some(line) => line.quantity += item.quantity,
                    None => order.items.push(item),
                }
            })
            .is_some()
    }

    /// Remove the item at `item_index` from an open order
    pub fn remove_item(&mut self, order_id: i64, item_index: usize) -> Option<OrderItem> {
        let index = self.open_order_index(order_id)?;
        let (removed, table_id) = self.orders.update(index, |order| {
            if item_index >= order.items.len() {
                return (None, order.table_id);
            }
            let removed = order.items.remove(item_index);
            if order.items.is_empty() {
                order.status = OrderStatus::Cancelled;
                tracing::info!(order_id = order.id, "Last item removed, order cancelled");
            }
            (Some(removed), order.table_id)
        })?;

        if removed.is_some() {
            self.refresh_table_occupancy(table_id);
        }
        removed
    }

    /// Set an item's quantity; zero or less removes the item
    pub fn set_item_quantity(&mut self, order_id: i64, item_index: usize, quantity: i32) -> bool {
        if quantity <= 0 {
            return self.remove_item(order_id, item_index).is_some();
        }
        let Some(index) = self.open_order_index(order_id) else {
            return false;
        };
        self.orders
            .update(index, |order| match order.items.get_mut(item_index) {
                Some(line) => {
                    line.quantity = quantity;
                    true
                }
                None => false,
            })
            .unwrap_or(false)
    }

    /// Explicit status change; any transition is accepted
    pub fn update_order_status(&mut self, order_id: i64, status: OrderStatus) -> bool {
        let Some(index) = self.orders.position(|o| o.id == order_id) else {
            return false;
        };
        let Some(table_id) = self.orders.update(index, |o| {
            o.status = status;
            o.table_id
        }) else {
            return false;
        };
        self.refresh_table_occupancy(table_id);
        true
    }

    /// Operator-driven table status change
    ///
    /// Reserved and Cleaning are applied as given. Available and Occupied
    /// clear any manual status and let the table's orders decide. Returns the
    /// resulting status, `None` for an unknown table.
    pub fn update_table_status(&mut self, table_id: i64, status: TableStatus) -> Option<TableStatus> {
        let index = self.tables.position(|t| t.id == table_id)?;
        let next = if status.is_manual() {
            status
        } else if self.open_orders_for_table(table_id).is_empty() {
            TableStatus::Available
        } else {
            TableStatus::Occupied
        };
        self.tables.update(index, |t| t.status = next);
        Some(next)
    }

    pub fn mark_bill_printed(&mut self, table_id: i64) -> bool {
        match self.tables.position(|t| t.id == table_id) {
            Some(index) => self
                .tables
                .update(index, |t| t.is_bill_printed = true)
                .is_some(),
            None => false,
        }
    }

    /// Re-derive Occupied/Available from the table's open orders
    fn refresh_table_occupancy(&mut self, table_id: i64) {
        let has_open = self
            .orders
            .iter()
            .any(|o| o.table_id == table_id && o.is_open());
        let Some(index) = self.tables.position(|t| t.id == table_id) else {
            return;
        };
        let Some(current) = self.tables.get(index).map(|t| t.status) else {
            return;
        };

        let next = match (current, has_open) {
            (TableStatus::Available, true) => TableStatus::Occupied,
            (TableStatus::Occupied, false) => TableStatus::Available,
            _ => return,
        };
        self.tables.update(index, |t| t.status = next);
        tracing::debug!(table_id, from = ?current, to = ?next, "Table occupancy changed");
    }
}

impl Default for FloorService {
    fn default() -> Self {
        Self::new()
    }
}
