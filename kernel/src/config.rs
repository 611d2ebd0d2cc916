//! Minos 内核配置
//!
//! 常量由 build.rs 根据工作区根目录的 Kernel.toml 生成，
//! 这里只负责 include 生成结果。调整固定表大小请修改 Kernel.toml。

include!(concat!(env!("OUT_DIR"), "/config.rs"));
