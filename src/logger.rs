//! 日志
//!
//! - `init_logging`：安装 tracing fmt 订阅器
//! - `sanitize_log_message`：对可能回显配置内容的日志做脱敏

use regex::Regex;
use std::str::FromStr;
use tracing::Level;

/// 初始化全局日志
///
/// 重复调用（或宿主已安装订阅器）时不做任何事，返回 false
pub fn init_logging(level: &str) -> bool {
    let level = Level::from_str(level.trim()).unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .is_ok()
}

/// 日志脱敏规则：API 密钥、管理密码、各类 token
pub fn sanitize_log_message(message: &str) -> String {
    let patterns = [
        // Bearer token
        (r"Bearer\s+[A-Za-z0-9._-]+", "Bearer ***"),
        // 代理生成的 sk- 密钥
        (r"\bsk-[A-Za-z0-9]{16,}", "sk-***"),
        // API key 各种格式
        (
            r#"api[_-]?key["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "api_key: ***",
        ),
        // 通用 token
        (r#"token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#, "token: ***"),
        // authorization header
        (
            r#"[Aa]uthorization["']?\s*[:=]\s*["']?[A-Za-z0-9._\s-]+"#,
            "authorization: ***",
        ),
        // password / admin_password
        (r#"password["']?\s*[:=]\s*["']?[^\s"',}]+"#, "password: ***"),
        (
            r#"secret["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "secret: ***",
        ),
    ];

    let mut sanitized = message.to_string();
    for (pattern, replacement) in patterns {
        if let Ok(re) = Regex::new(pattern) {
            sanitized = re.replace_all(&sanitized, replacement).to_string();
        }
    }
    sanitized
}
