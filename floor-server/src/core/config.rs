use std::path::PathBuf;

use crate::utils::{AppError, AppResult};

/// 服务配置 - 远程订单同步的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | FIRESTORE_PROJECT_ID | (必填) | 远程项目 ID |
/// | FIRESTORE_DATABASE_ID | (default) | 远程数据库 ID |
/// | FIRESTORE_CREDENTIALS | firestore-project.json | 凭据文件路径 |
/// | ORDERS_COLLECTION | orders | 订单集合名 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | LOG_DIR | (无) | 日志目录 |
/// | TAKEAWAY_TABLE_CAPACITY | 2 | 外卖桌容量 |
/// | EVENT_CHANNEL_CAPACITY | 256 | 事件通道容量 |
///
/// # 示例
///
/// ```ignore
/// FIRESTORE_PROJECT_ID=my-resto LOG_LEVEL=debug cargo run --example web_order_demo
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 远程项目 ID，为空表示未配置
    pub project_id: String,
    pub database_id: String,
    /// 凭据文件路径
    pub credentials_path: PathBuf,
    /// 订单集合名
    pub collection: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    /// 外卖桌默认座位数
    pub takeaway_capacity: i32,
    /// 新订单事件广播容量
    pub event_channel_capacity: usize,
}

impl Config {
    /// 从环境变量加载配置 (先读取 .env)
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            project_id: std::env::var("FIRESTORE_PROJECT_ID").unwrap_or_default(),
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".into()),
            credentials_path: std::env::var("FIRESTORE_CREDENTIALS")
                .unwrap_or_else(|_| "firestore-project.json".into())
                .into(),
            collection: std::env::var("ORDERS_COLLECTION").unwrap_or_else(|_| "orders".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            takeaway_capacity: std::env::var("TAKEAWAY_TABLE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景，不读取环境变量
    pub fn with_overrides(project_id: impl Into<String>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            credentials_path: credentials_path.into(),
            ..Self::default()
        }
    }

    /// 检查必填项
    pub fn validate(&self) -> AppResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(AppError::config("project id is not set (FIRESTORE_PROJECT_ID)"));
        }
        if self.credentials_path.as_os_str().is_empty() {
            return Err(AppError::config(
                "credentials path is not set (FIRESTORE_CREDENTIALS)",
            ));
        }
        if self.collection.trim().is_empty() {
            return Err(AppError::config("orders collection name is empty"));
        }
        if self.takeaway_capacity <= 0 {
            return Err(AppError::config(format!(
                "take-away table capacity must be positive, got {}",
                self.takeaway_capacity
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(AppError::config("event channel capacity must be positive"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database_id: "(default)".into(),
            credentials_path: PathBuf::from("firestore-project.json"),
            collection: "orders".into(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            takeaway_capacity: 2,
            event_channel_capacity: 256,
        }
    }
}
