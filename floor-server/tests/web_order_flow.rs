//! End-to-end web order flow against the in-memory document store

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use floor_server::floor::TakeAwayDraft;
use floor_server::remote::{
    ConnectionSettings, DocumentStore, MemoryDocumentStore, MemoryStoreConnector, StoreConnector,
    StoreError,
};
use floor_server::web_orders::SilentNotifier;
use floor_server::{AppError, Config, ErrorCategory, FloorService, OwnerDispatcher, WebOrderService};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use shared::models::{DishCreate, Order, OrderStatus, PaymentCreate, PaymentMethod, TableStatus};
use tempfile::NamedTempFile;
use tokio::sync::{Notify, broadcast};

const ORDERS: &str = "orders";
const PROJECT: &str = "test-resto";

struct Fixture {
    store: MemoryDocumentStore,
    connector: MemoryStoreConnector,
    floor: OwnerDispatcher<FloorService>,
    service: WebOrderService,
    events: broadcast::Receiver<Order>,
    credentials: NamedTempFile,
}

fn credentials_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"project_id":"{PROJECT}","client_email":"svc@test"}}"#).unwrap();
    file
}

fn order_doc(created_at: i64, phone: &str) -> Value {
    json!({
        "createdAt": created_at,
        "phoneNumber": phone,
        "items": [{"name": "Soup", "quantity": 2, "price": 5.00}]
    })
}

fn fixture() -> Fixture {
    let store = MemoryDocumentStore::new();
    let connector = MemoryStoreConnector::new(store.clone());
    let (floor, _owner) = OwnerDispatcher::spawn("floor-owner", FloorService::new()).unwrap();
    let service = WebOrderService::new(
        Config::with_overrides(PROJECT, "unused.json"),
        floor.clone(),
        Arc::new(connector.clone()),
        Arc::new(SilentNotifier),
    );
    let events = service.subscribe_new_orders();
    Fixture {
        store,
        connector,
        floor,
        service,
        events,
        credentials: credentials_file(),
    }
}

impl Fixture {
    async fn start(&self) {
        self.service
            .start_listening(PROJECT, self.credentials.path())
            .await
            .unwrap();
    }

    async fn next_order(&mut self) -> Order {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("timed out waiting for a new order")
            .unwrap()
    }

    async fn floor_counts(&self) -> (usize, usize) {
        self.floor
            .call(|f| (f.tables().len(), f.orders().len()))
            .await
            .unwrap()
    }
}

// --- Test 1: 三张历史订单不导入，新订单导入一次 ---

#[tokio::test]
async fn existing_documents_are_skipped_and_new_one_is_ingested() {
    let mut fx = fixture();
    for i in 0..3 {
        fx.store.insert(ORDERS, order_doc(1000 + i, "555"));
    }
    fx.start().await;

    fx.store.insert(
        ORDERS,
        json!({"phoneNumber": "555-0199", "items": [{"name": "Soup", "quantity": 2, "price": 5.00}]}),
    );
    let order = fx.next_order().await;

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].subtotal(), Decimal::new(1000, 2));
    assert_eq!(order.notes, "App Order - 555-0199");
    // Delivery is ordered: had the replay been ingested it would come first
    assert_eq!(fx.floor_counts().await, (1, 1));

    let table_id = order.table_id;
    let table = fx
        .floor
        .call(move |f| f.table(table_id).cloned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(table.status, TableStatus::Occupied);
    assert_eq!(table.name, "Web_1");
    assert_eq!(table.capacity, 2);
    assert_eq!(table.location, "Take Away (App)");
    assert!(fx.events.try_recv().is_err(), "event fired more than once");
}

// --- Test 2: 空集合订阅后，新订单正常导入 ---

#[tokio::test]
async fn empty_initial_snapshot_still_gates_only_itself() {
    let mut fx = fixture();
    fx.start().await;

    let id = fx.store.insert(ORDERS, order_doc(1, "1"));
    assert_eq!(fx.next_order().await.remote_id.as_deref(), Some(id.as_str()));
}

// --- Test 3: 修改/删除事件不产生订单 ---

#[tokio::test]
async fn modified_and_removed_changes_are_ignored() {
    let mut fx = fixture();
    fx.start().await;

    fx.store.insert_with_id(ORDERS, "d1", order_doc(1, "1"));
    fx.next_order().await;

    fx.store.insert_with_id(ORDERS, "d1", order_doc(2, "2"));
    fx.service.delete_orders(["d1"]).await.unwrap();
    fx.store.insert_with_id(ORDERS, "d2", order_doc(3, "3"));
    assert_eq!(fx.next_order().await.remote_id.as_deref(), Some("d2"));

    assert_eq!(fx.floor_counts().await, (2, 2));
}

// --- Test 4: 无有效菜品的订单被丢弃 ---

#[tokio::test]
async fn document_without_valid_items_creates_nothing() {
    let mut fx = fixture();
    fx.start().await;

    fx.store.insert_with_id(
        ORDERS,
        "bad",
        json!({"items": [{"name": "Soup", "quantity": 0, "price": 5}, {"name": "Tea"}]}),
    );
    fx.store.insert_with_id(ORDERS, "good", order_doc(1, "1"));

    assert_eq!(fx.next_order().await.remote_id.as_deref(), Some("good"));
    assert_eq!(fx.floor_counts().await, (1, 1));
    assert!(fx.events.try_recv().is_err());
}

// --- Test 5: 缓存一致性 ---

#[tokio::test]
async fn history_is_fetched_once_until_invalidated() {
    let fx = fixture();
    fx.store.insert(ORDERS, order_doc(100, "1"));
    fx.store.insert(ORDERS, order_doc(300, "2"));
    fx.store.insert(ORDERS, order_doc(200, "3"));
    fx.start().await;
    // The connection test is the first snapshot
    assert_eq!(fx.store.snapshot_calls(), 1);

    let first = fx.service.get_all_orders().await.unwrap();
    let created: Vec<i64> = first.read().iter().map(|o| o.created_at).collect();
    assert_eq!(created, vec![300, 200, 100]);

    let second = fx.service.get_all_orders().await.unwrap();
    assert!(first.ptr_eq(&second));
    assert_eq!(fx.store.snapshot_calls(), 2);

    fx.service.invalidate_cache().unwrap();
    let third = fx.service.get_all_orders().await.unwrap();
    assert!(!third.ptr_eq(&first));
    assert_eq!(fx.store.snapshot_calls(), 3);
}

// --- Test 6: 新订单插入已填充的缓存 ---

#[tokio::test]
async fn new_order_is_prepended_to_populated_history() {
    let mut fx = fixture();
    fx.store.insert(ORDERS, order_doc(100, "1"));
    fx.start().await;
    let history = fx.service.get_all_orders().await.unwrap();
    assert_eq!(history.len(), 1);

    fx.store.insert_with_id(ORDERS, "fresh", order_doc(500, "2"));
    fx.next_order().await;

    assert_eq!(history.len(), 2);
    assert_eq!(history.read()[0].remote_id.as_deref(), Some("fresh"));
    assert!(history.ptr_eq(&fx.service.get_all_orders().await.unwrap()));
}

// --- Test 7: 删除后缓存失效 ---

#[tokio::test]
async fn delete_invalidates_and_refetch_omits_deleted() {
    let fx = fixture();
    for i in 1..=5 {
        fx.store
            .insert_with_id(ORDERS, &format!("id{i}"), order_doc(i, "1"));
    }
    fx.start().await;
    assert_eq!(fx.service.get_all_orders().await.unwrap().len(), 5);

    fx.service.delete_orders(["id3"]).await.unwrap();

    let history = fx.service.get_all_orders().await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(!history.contains_remote("id3"));
}

#[tokio::test]
async fn partial_delete_reports_failed_ids() {
    let fx = fixture();
    fx.store.insert_with_id(ORDERS, "a", order_doc(1, "1"));
    fx.store.insert_with_id(ORDERS, "b", order_doc(2, "1"));
    fx.start().await;
    fx.store.fail_delete_of("b");

    let err = fx.service.delete_orders(["a", "b"]).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transient);
    assert!(err.to_string().contains('b'));
    assert_eq!(fx.service.remote_count().await.unwrap(), 1);

    assert!(matches!(
        fx.service.delete_orders(Vec::<&str>::new()).await,
        Err(AppError::Validation(_))
    ));
}

// --- Test 8: 启动失败只报告，不终止 ---

#[tokio::test]
async fn startup_failures_are_reported() {
    let fx = fixture();

    assert!(matches!(
        fx.service.get_all_orders().await,
        Err(AppError::NotConnected)
    ));

    let dir = tempfile::tempdir().unwrap();
    let err = fx
        .service
        .start_listening(PROJECT, dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    fx.connector
        .reject_with(StoreError::Unauthenticated("key revoked".into()));
    let err = fx
        .service
        .start_listening(PROJECT, fx.credentials.path())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    fx.connector.accept();

    fx.store
        .fail_next_snapshot(StoreError::Unavailable("timeout".into()));
    let err = fx
        .service
        .start_listening(PROJECT, fx.credentials.path())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Transient);
    assert!(!fx.service.is_listening());

    fx.start().await;
    assert!(fx.service.is_listening());
    assert_eq!(fx.service.connected_project().as_deref(), Some(PROJECT));
    assert!(matches!(
        fx.service
            .start_listening(PROJECT, fx.credentials.path())
            .await,
        Err(AppError::AlreadyListening)
    ));
}

// --- Test 9: 停止后不再导入 ---

#[tokio::test]
async fn stop_ends_ingestion() {
    let mut fx = fixture();
    fx.start().await;
    fx.store.insert(ORDERS, order_doc(1, "1"));
    fx.next_order().await;

    assert!(fx.service.stop().await);
    assert!(!fx.service.is_listening());
    assert!(!fx.service.stop().await);

    fx.store.insert(ORDERS, order_doc(2, "2"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fx.floor_counts().await, (1, 1));
    assert!(matches!(
        fx.service.delete_orders(["x"]).await,
        Err(AppError::NotConnected)
    ));
}

// --- Test 10: 重新连接时已导入的订单不会重复 ---

#[tokio::test]
async fn restart_does_not_duplicate_orders() {
    let mut fx = fixture();
    fx.start().await;
    fx.store.insert_with_id(ORDERS, "d1", order_doc(1, "1"));
    fx.next_order().await;
    fx.service.stop().await;

    fx.start().await;
    // d1 is delivered again as a live Added change, past the first batch
    fx.service.delete_orders(["d1"]).await.unwrap();
    fx.store.insert_with_id(ORDERS, "d1", order_doc(1, "1"));
    fx.store.insert_with_id(ORDERS, "d2", order_doc(2, "2"));

    assert_eq!(fx.next_order().await.remote_id.as_deref(), Some("d2"));
    assert!(fx.events.try_recv().is_err(), "d1 was committed twice");
    assert_eq!(fx.floor_counts().await, (2, 2));
    let d1_orders = fx
        .floor
        .call(|f| {
            f.orders()
                .iter()
                .filter(|o| o.remote_id.as_deref() == Some("d1"))
                .count()
        })
        .await
        .unwrap();
    assert_eq!(d1_orders, 1);
}

// --- Test 11: 支付后外卖桌恢复空闲 ---

#[tokio::test]
async fn paying_web_order_frees_takeaway_table() {
    let mut fx = fixture();
    fx.start().await;
    fx.store.insert(ORDERS, order_doc(1, "1"));
    let order = fx.next_order().await;

    let (order_id, table_id) = (order.id, order.table_id);
    let (status, table_status) = fx
        .floor
        .call(move |f| {
            f.add_payment(PaymentCreate {
                order_id,
                amount: Decimal::new(1000, 2),
                method: PaymentMethod::MobilePayment,
                transaction_id: None,
            });
            (
                f.order(order_id).map(|o| o.status),
                f.table(table_id).map(|t| t.status),
            )
        })
        .await
        .unwrap();

    assert_eq!(status, Some(OrderStatus::Paid));
    assert_eq!(table_status, Some(TableStatus::Available));
}

// --- Test 12: 远程流结束后可以重新启动 ---

#[tokio::test]
async fn restart_after_remote_closes_stream() {
    let mut fx = fixture();
    fx.start().await;

    fx.store.close_streams();
    tokio::time::timeout(Duration::from_secs(5), async {
        while fx.service.is_listening() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener kept running after the stream closed");

    fx.start().await;
    assert!(fx.service.is_listening());
    fx.store.insert_with_id(ORDERS, "after", order_doc(1, "1"));
    assert_eq!(fx.next_order().await.remote_id.as_deref(), Some("after"));
}

// --- Test 13: 启动过程中停止会取消启动 ---

/// Holds `connect` until the test opens the gate
struct GatedConnector {
    inner: MemoryStoreConnector,
    reached: Arc<Notify>,
    gate: Arc<Notify>,
}

#[async_trait]
impl StoreConnector for GatedConnector {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DocumentStore>, StoreError> {
        self.reached.notify_one();
        self.gate.notified().await;
        self.inner.connect(settings).await
    }
}

#[tokio::test]
async fn stop_during_start_cancels_it() {
    let store = MemoryDocumentStore::new();
    let reached = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let (floor, _owner) = OwnerDispatcher::spawn("floor-owner", FloorService::new()).unwrap();
    let service = WebOrderService::new(
        Config::with_overrides(PROJECT, "unused.json"),
        floor.clone(),
        Arc::new(GatedConnector {
            inner: MemoryStoreConnector::new(store.clone()),
            reached: Arc::clone(&reached),
            gate: Arc::clone(&gate),
        }),
        Arc::new(SilentNotifier),
    );
    let credentials = credentials_file();

    let (started, stopped) = tokio::join!(
        service.start_listening(PROJECT, credentials.path()),
        async {
            reached.notified().await;
            let stopped = service.stop().await;
            gate.notify_one();
            stopped
        }
    );
    assert!(stopped);
    assert!(matches!(started, Err(AppError::StartCancelled)));
    assert!(!service.is_listening());
    assert!(service.connected_project().is_none());
    assert_eq!(store.subscriber_count(ORDERS), 0);

    store.insert(ORDERS, order_doc(1, "1"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(floor.call(|f| f.orders().len()).await.unwrap(), 0);

    gate.notify_one();
    service
        .start_listening(PROJECT, credentials.path())
        .await
        .unwrap();
    assert!(service.is_listening());
}

// --- Test 14: 柜台外卖不占用网络订单编号 ---

#[tokio::test]
async fn counter_takeaway_keeps_its_own_labels() {
    let mut fx = fixture();
    fx.start().await;

    let counter_table = fx
        .floor
        .call(|f| {
            f.add_dish(DishCreate {
                name: "Soup".to_string(),
                description: None,
                price: Decimal::new(500, 2),
                category: None,
                is_available: None,
            });
            let soup = f.find_dish_by_name("Soup")?.clone();
            let mut draft = TakeAwayDraft::default();
            draft.add_dish(&soup);
            let order = f.confirm_takeaway(draft, 2)?;
            f.table(order.table_id).cloned()
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter_table.name, "Counter_1");
    assert_eq!(counter_table.location, "Take Away (Counter)");

    fx.store.insert(ORDERS, order_doc(1, "1"));
    let table_id = fx.next_order().await.table_id;
    let web_table = fx
        .floor
        .call(move |f| f.table(table_id).cloned())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(web_table.name, "Web_1");
    assert_eq!(web_table.location, "Take Away (App)");
}
