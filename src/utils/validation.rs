use crate::error::{AppError, Result};

/// 按字符数截断（不会截断在多字节字符中间）
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// 检查去掉首尾空白后的最少字符数
pub fn validate_min_chars(text: &str, min: usize, field: &str) -> Result<()> {
    if text.trim().chars().count() < min {
        return Err(AppError::Validation(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    Ok(())
}

/// 非空字段
pub fn validate_required(text: &str, field: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// 文章分类：未填写时使用默认分类，填写了则必须在配置的列表中
pub fn resolve_category(requested: Option<&str>, allowed: &[String], fallback: &str) -> Result<String> {
    match requested.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(fallback.to_string()),
        Some(category) => allowed
            .iter()
            .find(|allowed| allowed.eq_ignore_ascii_case(category))
            .cloned()
            .ok_or_else(|| AppError::Validation(format!("Unknown category: {}", category))),
    }
}
