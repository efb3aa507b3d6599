//! 核心模块 - 配置、所有者线程和后台任务
//!
//! - [`Config`] - 服务配置
//! - [`OwnerDispatcher`] - 所有者线程调度
//! - [`BackgroundTasks`] - 后台任务管理

pub mod config;
pub mod dispatcher;
pub mod tasks;

pub use config::Config;
pub use dispatcher::{DispatchError, OwnerDispatcher};
pub use tasks::{BackgroundTasks, TaskKind};
