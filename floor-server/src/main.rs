//! Offline walkthrough of the web order flow against the in-memory store
//!
//! ```text
//! LOG_LEVEL=debug cargo run -p floor-server
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use floor_server::remote::{MemoryDocumentStore, MemoryStoreConnector};
use floor_server::web_orders::TerminalBell;
use floor_server::{
    Config, FloorService, OwnerDispatcher, WebOrderService, init_logger_with_file, print_banner,
};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{DiningTableCreate, DishCategory, DishCreate};

const DEMO_PROJECT: &str = "demo-restaurant";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 配置与日志
    let mut config = Config::from_env();
    init_logger_with_file(&config.log_level, config.log_json, config.log_dir.as_deref())?;
    print_banner();

    if config.project_id.trim().is_empty() {
        config.project_id = DEMO_PROJECT.to_string();
    }
    let credentials_path = demo_credentials(&config).await?;

    // 2. 所有者线程
    let (floor, owner_thread) = OwnerDispatcher::spawn("floor-owner", seeded_floor())
        .context("failed to spawn floor owner thread")?;

    // 3. 远程存储 (内存)，预置三张历史订单
    let store = MemoryDocumentStore::new();
    for (phone, minutes_ago) in [("555-0101", 90), ("555-0102", 60), ("555-0103", 30)] {
        let created = chrono::Utc::now() - chrono::Duration::minutes(minutes_ago);
        store.insert(
            &config.collection,
            json!({
                "createdAt": created.to_rfc3339(),
                "phoneNumber": phone,
                "items": [{"name": "Margherita", "quantity": 1, "price": 9.50}]
            }),
        );
    }

    let collection = config.collection.clone();
    let project_id = config.project_id.clone();
    let service = WebOrderService::new(
        config,
        floor.clone(),
        Arc::new(MemoryStoreConnector::new(store.clone())),
        Arc::new(TerminalBell),
    );
    let mut new_orders = service.subscribe_new_orders();

    // 4. 开始监听 - 已有订单不会被导入
    service.start_listening(&project_id, &credentials_path).await?;

    store.insert(
        &collection,
        json!({
            "createdAt": chrono::Utc::now().to_rfc3339(),
            "firstName": "Ana",
            "lastName": "Ruiz",
            "phoneNumber": "555-0199",
            "pickupTime": "19:30",
            "items": [
                {"name": "Soup", "quantity": 2, "price": 5.00},
                {"name": "margherita", "quantity": 1, "price": 9.50}
            ]
        }),
    );

    let order = tokio::time::timeout(Duration::from_secs(5), new_orders.recv())
        .await
        .context("no web order arrived")??;
    tracing::info!(order = %order, "New web order");

    let table_id = order.table_id;
    let bill = floor
        .call(move |f| f.print_bill(table_id))
        .await?
        .context("take-away table missing")?;
    println!("{}", bill.render());

    // 5. 历史订单与删除
    let history = service.get_all_orders().await?;
    tracing::info!(count = history.len(), "Remote order history");
    let oldest = history
        .read()
        .last()
        .and_then(|o| o.remote_id.clone())
        .context("history is empty")?;
    service.delete_orders([oldest.as_str()]).await?;
    tracing::info!(
        remaining = service.get_all_orders().await?.len(),
        "Oldest order deleted"
    );

    // 6. 停止
    service.stop().await;
    drop(service);
    drop(floor);
    tokio::task::spawn_blocking(move || owner_thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("floor owner thread panicked"))?;
    Ok(())
}

fn seeded_floor() -> FloorService {
    let mut floor = FloorService::new();
    for (name, price, category) in [
        ("Soup", Decimal::new(500, 2), DishCategory::Appetizer),
        ("Margherita", Decimal::new(950, 2), DishCategory::MainCourse),
        ("Tiramisu", Decimal::new(650, 2), DishCategory::Dessert),
    ] {
        floor.add_dish(DishCreate {
            name: name.to_string(),
            description: None,
            price,
            category: Some(category),
            is_available: None,
        });
    }
    for name in ["T1", "T2"] {
        floor.add_table(DiningTableCreate {
            name: name.to_string(),
            capacity: Some(4),
            location: Some("Main Hall".to_string()),
            web_customer: None,
        });
    }
    floor
}

/// Configured credentials if present, otherwise a throwaway file
async fn demo_credentials(config: &Config) -> anyhow::Result<PathBuf> {
    if tokio::fs::try_exists(&config.credentials_path)
        .await
        .unwrap_or(false)
    {
        return Ok(config.credentials_path.clone());
    }
    let path = std::env::temp_dir().join("floor-server-demo-credentials.json");
    let content = json!({
        "type": "service_account",
        "project_id": config.project_id,
        "client_email": format!("demo@{}.local", config.project_id),
    });
    tokio::fs::write(&path, serde_json::to_vec_pretty(&content)?)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
