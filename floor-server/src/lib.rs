//! Floor Server - 网络订单同步引擎
//!
//! # 架构概述
//!
//! Bridges a remote, replay-prone order collection to the locally owned
//! restaurant floor (tables, orders, bills):
//!
//! - **Floor** (`floor`): canonical tables and orders, owned by one thread
//! - **Remote** (`remote`): document store traits and an in-memory store
//! - **Web orders** (`web_orders`): listener, ingestion, history cache,
//!   bulk delete and the [`WebOrderService`] facade
//!
//! # 模块结构
//!
//! ```text
//! floor-server/src/
//! ├── core/          # 配置、所有者线程、后台任务
//! ├── floor/         # 桌台/订单状态、结账、外卖
//! ├── remote/        # 远程文档存储
//! ├── utils/         # 错误、日志
//! └── web_orders/    # 网络订单同步
//! ```

pub mod core;
pub mod floor;
pub mod remote;
pub mod utils;
pub mod web_orders;

// Re-export 公共类型
pub use crate::core::{Config, OwnerDispatcher};
pub use floor::FloorService;
pub use utils::{AppError, AppResult, ErrorCategory};
pub use web_orders::WebOrderService;

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

pub fn print_banner() {
    println!(
        r#"
    ________
   / ____/ /___  ____  _____
  / /_  / / __ \/ __ \/ ___/
 / __/ / / /_/ / /_/ / /
/_/   /_/\____/\____/_/
    "#
    );
}
