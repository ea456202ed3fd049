pub mod auth;
pub mod database;
pub mod generation;
pub mod media;
pub mod notification;
pub mod post;
pub mod workflow;

// 重新导出常用类型
pub use auth::{AuthService, UserDirectory};
pub use database::{ContentStore, Database, NotificationStore};
pub use generation::{GenerationService, RetryPolicy};
pub use media::MediaService;
pub use notification::NotificationService;
pub use post::PostService;
pub use workflow::WorkflowEngine;
