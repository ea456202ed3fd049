use serde::{Deserialize, Serialize};

/// 发起请求的用户。身份由上游网关认证，权限由用户目录决定。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub username: Option<String>,
    /// 管理员 / 编辑
    pub is_privileged: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, username: Option<String>, is_privileged: bool) -> Self {
        Self {
            id: id.into(),
            username,
            is_privileged,
        }
    }

    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }
}
