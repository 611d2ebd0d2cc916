//! Minos 内核构建脚本
//!
//! 这个脚本在编译前运行，负责：
//! 1. 解析工作区根目录的 Kernel.toml 配置文件
//! 2. 生成配置常量代码（由 src/config.rs include!）
//!
//! 所有固定表上限（进程表、描述符表、管道缓冲区）都来自 Kernel.toml，
//! 内核源代码中不允许出现这些上限的硬编码字面量。

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 从解析后的 TOML 中取整数配置项，缺失时使用默认值
fn get_int(root: &toml::Value, section: &str, key: &str, default: i64) -> i64 {
    root.get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .unwrap_or(default)
}

/// 从解析后的 TOML 中取字符串配置项
fn get_str<'a>(root: &'a toml::Value, section: &str, key: &str, default: &'a str) -> &'a str {
    root.get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or(default)
}

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());

    // Kernel.toml 位于工作区根目录（kernel/ 的上一级）
    let config_path = manifest_dir
        .parent()
        .map(|p| p.join("Kernel.toml"))
        .filter(|p| p.exists())
        .unwrap_or_else(|| manifest_dir.join("Kernel.toml"));

    println!("cargo:rerun-if-changed={}", config_path.display());

    let content = fs::read_to_string(&config_path).unwrap_or_default();
    let root: toml::Value = content
        .parse()
        .unwrap_or(toml::Value::Table(toml::map::Map::new()));

    let kernel_name = get_str(&root, "kernel", "name", "Minos").to_string();

    let nproc = get_int(&root, "process", "max_processes", 64);
    let nofile = get_int(&root, "process", "max_open_files", 16);
    let pid_max = get_int(&root, "process", "pid_max", 32768);
    let init_pid = get_int(&root, "process", "init_pid", 1);
    let time_slice = get_int(&root, "process", "time_slice_ticks", 10);
    let maxarg = get_int(&root, "process", "max_exec_args", 32);
    let pipe_buf = get_int(&root, "ipc", "pipe_buffer_size", 512);

    let generated = format!(
        r#"// 由 build.rs 根据 Kernel.toml 自动生成，请勿手动修改

// ============================================================
// 基本信息
// ============================================================

/// 内核名称
pub const KERNEL_NAME: &str = "{kernel_name}";

/// 内核版本
pub const KERNEL_VERSION: &str = "{version}";

// ============================================================
// 进程配置
// ============================================================

/// 进程表槽位数
pub const NPROC: usize = {nproc};

/// 每进程文件描述符表大小
pub const NOFILE: usize = {nofile};

/// PID 上限
pub const PID_MAX: u32 = {pid_max};

/// init 进程的固定 PID
pub const INIT_PID: u32 = {init_pid};

/// 默认时间片（时钟中断数）
pub const TIME_SLICE_TICKS: u32 = {time_slice};

/// exec 允许的最大 argv 数量
pub const MAXARG: usize = {maxarg};

// ============================================================
// IPC 配置
// ============================================================

/// 管道环形缓冲区容量（字节）
pub const PIPE_BUF_SIZE: usize = {pipe_buf};
"#,
        kernel_name = kernel_name,
        version = env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string()),
        nproc = nproc,
        nofile = nofile,
        pid_max = pid_max,
        init_pid = init_pid,
        time_slice = time_slice,
        maxarg = maxarg,
        pipe_buf = pipe_buf,
    );

    let out_dir = env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("config.rs");
    fs::write(&dest, generated).expect("failed to write generated config");
}
