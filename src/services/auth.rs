use crate::{config::Config, error::Result, models::user::Actor};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 身份与角色查询
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<Actor>>;

    async fn is_privileged(&self, id: &str) -> Result<bool>;

    /// 所有审核员
    async fn privileged_users(&self) -> Result<Vec<Actor>>;
}

/// 用户目录。审核员来自配置（STAFF_USERS），普通用户在第一次请求时登记。
/// 登录和会话由上游网关负责，这里只信任网关传来的用户ID。
#[derive(Clone)]
pub struct AuthService {
    users: Arc<DashMap<String, Actor>>,
}

impl AuthService {
    pub async fn new(config: &Config) -> Result<Self> {
        let service = Self {
            users: Arc::new(DashMap::new()),
        };

        for entry in config.staff_users.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, username) = match entry.split_once(':') {
                Some((id, name)) => (id.trim(), Some(name.trim().to_string())),
                None => (entry, None),
            };

            if id.is_empty() {
                warn!("Ignoring malformed STAFF_USERS entry: {}", entry);
                continue;
            }

            service.register(Actor::new(id, username, true));
        }

        info!("User directory initialised with {} staff user(s)", service.users.len());
        Ok(service)
    }

    /// 直接登记用户（覆盖已有记录）
    pub fn register(&self, actor: Actor) {
        self.users.insert(actor.id.clone(), actor);
    }

    /// 解析网关传来的身份：已登记的用户沿用目录中的角色，未登记的按普通用户登记
    pub fn resolve_actor(&self, user_id: &str, username: Option<String>) -> Actor {
        let mut entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("Registering new author {}", user_id);
                Actor::new(user_id, username.clone(), false)
            });

        if entry.username.is_none() && username.is_some() {
            entry.username = username;
        }

        entry.value().clone()
    }
}

#[async_trait]
impl UserDirectory for AuthService {
    async fn find_user(&self, id: &str) -> Result<Option<Actor>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn is_privileged(&self, id: &str) -> Result<bool> {
        Ok(self
            .users
            .get(id)
            .map(|entry| entry.is_privileged)
            .unwrap_or(false))
    }

    async fn privileged_users(&self) -> Result<Vec<Actor>> {
        let mut staff: Vec<Actor> = self
            .users
            .iter()
            .filter(|entry| entry.is_privileged)
            .map(|entry| entry.value().clone())
            .collect();
        staff.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(staff)
    }
}
