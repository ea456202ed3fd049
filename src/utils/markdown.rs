//! 去除 Markdown 标记，得到纯文本
//!
//! 不做完整解析，只做逐条的结构替换。每一步都只删除字符，
//! 反复执行直到结果不再变化即得到幂等的结果。行首标记一次去掉整串，
//! 嵌套的链接和强调每轮剥一层，轮数有上限。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// 单次 normalize 最多执行的轮数
pub const MAX_PASSES: usize = 16;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("markdown pattern must compile")
}

// 标题、列表、引用标记可以叠在同一行开头，如 `> - # x`
static LINE_PREFIX: Lazy<Regex> =
    Lazy::new(|| re(r"(?m)^(?:(?:#{1,6}|[*+-]|\d+\.|>)[ \t]+)+"));
static BOLD_STARS: Lazy<Regex> = Lazy::new(|| re(r"(?s)\*\*(.+?)\*\*"));
static BOLD_UNDERSCORES: Lazy<Regex> = Lazy::new(|| re(r"(?s)__(.+?)__"));
// regex 不支持环视，用捕获组保留两侧字符
static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| re(r"(^|[^*])\*([^*\s](?:[^*\n]*[^*\s])?)\*([^*]|$)"));
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| re(r"(^|[^\w])_([^_\s](?:[^_\n]*[^_\s])?)_([^\w]|$)"));
static LINK: Lazy<Regex> = Lazy::new(|| re(r"(^|[^!])\[([^\]\n]+)\]\([^)\n]+\)"));
static IMAGE: Lazy<Regex> = Lazy::new(|| re(r"!\[([^\]\n]*)\]\([^)\n]+\)"));
static FENCE_OPEN: Lazy<Regex> = Lazy::new(|| re(r"```\w*\n"));
static FENCE: Lazy<Regex> = Lazy::new(|| re(r"```"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| re(r"`([^`\n]+)`"));
static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| re(r"\n{3,}"));
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| re(r"(?m)^[ \t]+$"));

/// 去掉 Markdown 标记。`normalize(normalize(x)) == normalize(x)`。
pub fn normalize(text: &str) -> String {
    let mut current = strip_once(text);
    for _ in 1..MAX_PASSES {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }

    debug!("Markdown normalization stopped after {} passes", MAX_PASSES);
    current
}

fn strip_once(text: &str) -> String {
    let text = LINE_PREFIX.replace_all(text, "");
    let text = BOLD_STARS.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORES.replace_all(&text, "$1");
    let text = ITALIC_STAR.replace_all(&text, "${1}${2}${3}");
    let text = ITALIC_UNDERSCORE.replace_all(&text, "${1}${2}${3}");
    // 去掉强调后可能露出新的行首标记
    let text = LINE_PREFIX.replace_all(&text, "");
    let text = LINK.replace_all(&text, "${1}${2}");
    let text = IMAGE.replace_all(&text, "$1");
    let text = FENCE_OPEN.replace_all(&text, "");
    let text = FENCE.replace_all(&text, "");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = EXTRA_NEWLINES.replace_all(&text, "\n\n");
    let text = BLANK_LINE.replace_all(&text, "");

    text.trim().to_string()
}
