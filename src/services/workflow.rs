//! 文章审核流程状态机
//!
//! 纯计算：给定操作者角色、请求的动作和文章当前状态，得出下一个状态以及需要
//! 发出的通知。持久化和通知落库由 `PostService` / `NotificationService` 完成。

use crate::{
    error::{AppError, Result},
    models::{
        post::{Post, PostStatus},
        user::Actor,
    },
};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::{debug, warn};

/// 表单上的动作按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    Submit,
    Draft,
    Publish,
    Reject,
}

/// 普通作者未给出可识别动作时的兜底动作
pub const AUTHOR_FALLBACK_ACTION: WorkflowAction = WorkflowAction::Submit;

impl WorkflowAction {
    /// 解析动作；空值或无法识别的值返回 None，由兜底策略决定
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw?.trim().to_lowercase().as_str() {
            "submit" => Some(Self::Submit),
            "draft" => Some(Self::Draft),
            "publish" => Some(Self::Publish),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    fn target_status(self) -> PostStatus {
        match self {
            Self::Submit => PostStatus::Pending,
            Self::Draft => PostStatus::Draft,
            Self::Publish => PostStatus::Published,
            Self::Reject => PostStatus::Rejected,
        }
    }

    /// 该角色是否可以直接使用此动作
    fn allowed_for(self, privileged: bool) -> bool {
        match self {
            Self::Draft => true,
            Self::Submit => !privileged,
            Self::Publish | Self::Reject => privileged,
        }
    }
}

/// 审核员提交了无法识别的动作时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivilegedFallback {
    /// 视为发布
    #[default]
    Publish,
    /// 拒绝请求
    Refuse,
}

impl FromStr for PrivilegedFallback {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "publish" => Ok(Self::Publish),
            "refuse" => Ok(Self::Refuse),
            other => Err(format!("Unknown privileged fallback: {}", other)),
        }
    }
}

/// 审核字段的变更
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewStamp {
    Keep,
    Approve,
    Reject { reason: String },
}

/// 状态流转附带的通知
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEffect {
    /// 通知所有审核员有新稿件
    NotifyReviewers,
    NotifyAuthorPublished,
    NotifyAuthorRejected { reason: String },
}

/// 审核面板上的快捷操作
#[derive(Debug, Clone, PartialEq)]
pub enum QuickAction {
    Approve,
    Reject { reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct TransitionExtra {
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest<'a> {
    /// 新建文章时为 None
    pub previous: Option<PostStatus>,
    pub action: Option<WorkflowAction>,
    pub privileged: bool,
    pub rejection_reason: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub previous: Option<PostStatus>,
    pub action: WorkflowAction,
    pub fallback_used: bool,
    pub next: PostStatus,
    pub stamp: ReviewStamp,
    pub effects: Vec<NotificationEffect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub previous: Option<PostStatus>,
    pub status: PostStatus,
    pub effects: Vec<NotificationEffect>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    privileged_fallback: PrivilegedFallback,
}

impl WorkflowEngine {
    pub fn new(privileged_fallback: PrivilegedFallback) -> Self {
        Self { privileged_fallback }
    }

    pub fn privileged_fallback(&self) -> PrivilegedFallback {
        self.privileged_fallback
    }

    /// 确定实际执行的动作，返回 (动作, 是否使用了兜底)
    pub fn resolve_action(
        &self,
        requested: Option<WorkflowAction>,
        privileged: bool,
    ) -> Result<(WorkflowAction, bool)> {
        if let Some(action) = requested {
            if action.allowed_for(privileged) {
                return Ok((action, false));
            }
        }

        if !privileged {
            return Ok((AUTHOR_FALLBACK_ACTION, true));
        }

        match self.privileged_fallback {
            PrivilegedFallback::Publish => Ok((WorkflowAction::Publish, true)),
            PrivilegedFallback::Refuse => Err(AppError::BadRequest(
                "Unrecognized workflow action; expected publish, reject or draft".to_string(),
            )),
        }
    }

    pub fn plan(&self, request: &TransitionRequest<'_>) -> Result<TransitionPlan> {
        let (action, fallback_used) = self.resolve_action(request.action, request.privileged)?;

        let mut next = action.target_status();
        if !request.privileged {
            next = clamp_for_author(next);
        }

        let previous = request.previous;
        let mut effects = Vec::new();

        let stamp = match next {
            PostStatus::Pending => {
                if previous != Some(PostStatus::Pending) {
                    effects.push(NotificationEffect::NotifyReviewers);
                }
                ReviewStamp::Keep
            }
            PostStatus::Published => {
                // 新建即发布时没有需要通知的作者
                if matches!(previous, Some(status) if status != PostStatus::Published) {
                    effects.push(NotificationEffect::NotifyAuthorPublished);
                }
                ReviewStamp::Approve
            }
            PostStatus::Rejected => {
                let reason = request.rejection_reason.unwrap_or_default().to_string();
                effects.push(NotificationEffect::NotifyAuthorRejected {
                    reason: reason.clone(),
                });
                ReviewStamp::Reject { reason }
            }
            PostStatus::Draft => ReviewStamp::Keep,
        };

        if fallback_used {
            debug!(
                "Workflow fallback: requested {:?}, resolved {:?} (privileged: {})",
                request.action, action, request.privileged
            );
        }

        Ok(TransitionPlan {
            previous,
            action,
            fallback_used,
            next,
            stamp,
            effects,
        })
    }

    pub fn apply(&self, post: &mut Post, plan: &TransitionPlan, actor_id: &str, now: DateTime<Utc>) {
        post.status = plan.next;
        post.updated_at = now;

        match &plan.stamp {
            ReviewStamp::Keep => {}
            ReviewStamp::Approve => {
                post.approved_by = Some(actor_id.to_string());
                post.approved_at = Some(now);
                post.rejection_reason = None;
            }
            ReviewStamp::Reject { reason } => {
                post.approved_by = Some(actor_id.to_string());
                post.approved_at = Some(now);
                post.rejection_reason = Some(reason.clone());
            }
        }
    }

    /// 对已存在的文章执行一次状态流转
    pub fn submit_transition(
        &self,
        post: &mut Post,
        actor: &Actor,
        action: Option<&str>,
        extra: &TransitionExtra,
    ) -> Result<TransitionOutcome> {
        let previous = Some(post.status);
        self.transition(post, actor, previous, WorkflowAction::parse(action), extra)
    }

    /// 新建文章时的初始状态
    pub fn initial_transition(
        &self,
        post: &mut Post,
        actor: &Actor,
        action: Option<&str>,
        extra: &TransitionExtra,
    ) -> Result<TransitionOutcome> {
        self.transition(post, actor, None, WorkflowAction::parse(action), extra)
    }

    pub fn quick_transition(
        &self,
        post: &mut Post,
        actor: &Actor,
        quick: QuickAction,
    ) -> Result<TransitionOutcome> {
        if !actor.is_privileged {
            return Err(AppError::Authorization("Admin only.".to_string()));
        }

        let (action, extra) = match quick {
            QuickAction::Approve => (WorkflowAction::Publish, TransitionExtra::default()),
            QuickAction::Reject { reason } => (
                WorkflowAction::Reject,
                TransitionExtra {
                    rejection_reason: Some(reason),
                },
            ),
        };

        let previous = Some(post.status);
        self.transition(post, actor, previous, Some(action), &extra)
    }

    fn transition(
        &self,
        post: &mut Post,
        actor: &Actor,
        previous: Option<PostStatus>,
        action: Option<WorkflowAction>,
        extra: &TransitionExtra,
    ) -> Result<TransitionOutcome> {
        if !can_edit(post, actor) {
            return Err(AppError::Authorization(
                "You are not allowed to edit this blog.".to_string(),
            ));
        }

        let plan = self.plan(&TransitionRequest {
            previous,
            action,
            privileged: actor.is_privileged,
            rejection_reason: extra.rejection_reason.as_deref(),
        })?;

        self.apply(post, &plan, &actor.id, Utc::now());

        Ok(TransitionOutcome {
            previous: plan.previous,
            status: plan.next,
            effects: plan.effects,
        })
    }
}

/// 普通作者只能停留在草稿或待审核
fn clamp_for_author(status: PostStatus) -> PostStatus {
    match status {
        PostStatus::Draft | PostStatus::Pending => status,
        other => {
            warn!("Clamping author transition result {} to pending", other);
            PostStatus::Pending
        }
    }
}

/// 已发布的文章所有人可见，其余状态只有作者和审核员可见
pub fn can_view(post: &Post, viewer: Option<&Actor>) -> bool {
    if post.status.can_be_viewed_by_public() {
        return true;
    }

    match viewer {
        Some(actor) => actor.is_privileged || post.is_authored_by(&actor.id),
        None => false,
    }
}

pub fn can_edit(post: &Post, actor: &Actor) -> bool {
    actor.is_privileged || post.is_authored_by(&actor.id)
}
