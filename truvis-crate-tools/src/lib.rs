//! Truvis 工具集
//!
//! 在各个 crates 之间共享的工具：日志初始化、toml 配置读取。

pub mod config;
pub mod init_log;
