//! 带审核流程的博客服务：草稿 → 待审核 → 发布 / 驳回，站内通知，
//! Markdown 清理，以及 AI 生成文章、标题、分类和配图。

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
