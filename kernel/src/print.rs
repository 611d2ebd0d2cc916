//! 内核格式化输出与日志桥接
//!
//! `kprint!` / `kprintln!` 直接写控制台；`log` 宏经由 [`ConsoleLogger`]
//! 也落到同一个控制台后端。`debug_log` 特性开启 Debug 级别。

use log::{LevelFilter, Metadata, Record};

#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let _ = write!(&mut $crate::console::Writer, $($arg)*);
    });
}

#[macro_export]
macro_rules! kprintln {
    () => ($crate::kprint!("\n"));
    ($($arg:tt)*) => ({
        use core::fmt::Write;
        let mut writer = $crate::console::Writer;
        let _ = ::core::fmt::Write::write_fmt(&mut writer, ::core::format_args!($($arg)*));
        let _ = ::core::fmt::Write::write_str(&mut writer, "\n");
    });
}

/// 把 log crate 的输出桥接到内核控制台
pub struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            kprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// 初始化内核日志
///
/// 重复调用是无害的（进程内只允许安装一次全局 logger）
pub fn init_logging() {
    let level = if cfg!(feature = "debug_log") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
