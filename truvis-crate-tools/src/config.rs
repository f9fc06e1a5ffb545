use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

/// 从 toml 文件中读取配置
///
/// `path` 为 None 时直接使用默认值；文件中缺失的字段由 `T` 自己的 serde default 处理
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> anyhow::Result<T> {
    let Some(path) = path else {
        log::info!("no config file given, use default settings");
        return Ok(T::default());
    };

    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let config = toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))?;
    log::info!("config loaded from {}", path.display());
    Ok(config)
}
