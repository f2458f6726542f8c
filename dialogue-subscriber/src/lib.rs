//! Event subscriber
//!
//! Binds a `host:port`, accepts sessions, decodes every fire-and-forget
//! message with an [`EventCodec`](dialogue_core::EventCodec) and hands the
//! event to a single [`EventHandler`].
//!
//! # TODO
//!
//! ## 生命周期
//! - [x] 启动监听（start）
//! - [x] 连接状态查询（is_connected）
//! - [x] 关闭与释放（dispose，幂等）
//! - [x] 断线后重新监听（refresh_connection）
//! - [x] 状态机（Idle / Listening / Disposed）
//!
//! ## 消息处理
//! - [x] Fire-and-forget 消息解码与分发
//! - [x] 解码失败丢弃并继续
//! - [x] 处理器 panic 捕获并继续
//! - [x] 处理器超时
//! - [ ] TLS 传输

pub mod config;
pub mod handler;
mod listener;
pub mod state;
pub mod subscriber;

pub use config::SubscriberConfig;
pub use handler::{DispatchOutcome, EventHandler};
pub use state::SubscriberState;
pub use subscriber::EventSubscriber;
