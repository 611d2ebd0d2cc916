//! 内核控制台
//!
//! 真正的字符设备驱动是外部协作者，这里只维护一个可插拔的字节
//! 输出后端。没有安装后端时输出进入一个有界捕获缓冲区，宿主环境
//! 可以随时取回最近的诊断输出。

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use lazy_static::lazy_static;
use spin::Mutex;

/// 默认捕获缓冲区的上限（字节）
const CAPTURE_LIMIT: usize = 4096;

/// 控制台输出后端
pub trait ConsoleBackend: Send {
    fn putc(&mut self, c: u8);
}

struct Console {
    backend: Option<Box<dyn ConsoleBackend>>,
    /// 未安装后端时的捕获缓冲区，保留最近 CAPTURE_LIMIT 字节
    capture: VecDeque<u8>,
}

impl Console {
    fn putc(&mut self, c: u8) {
        match self.backend {
            Some(ref mut backend) => backend.putc(c),
            None => {
                if self.capture.len() == CAPTURE_LIMIT {
                    self.capture.pop_front();
                }
                self.capture.push_back(c);
            }
        }
    }
}

lazy_static! {
    static ref CONSOLE: Mutex<Console> = Mutex::new(Console {
        backend: None,
        capture: VecDeque::new(),
    });
}

/// 安装控制台后端（替换默认的捕获缓冲区）
pub fn set_backend(backend: Box<dyn ConsoleBackend>) {
    CONSOLE.lock().backend = Some(backend);
}

/// 写入单个字符
pub fn putchar(c: u8) {
    let mut console = CONSOLE.lock();
    if c == b'\n' {
        console.putc(b'\r');
    }
    console.putc(c);
}

/// 写入字符串
pub fn puts(s: &str) {
    let mut console = CONSOLE.lock();
    for b in s.bytes() {
        if b == b'\n' {
            console.putc(b'\r');
        }
        console.putc(b);
    }
}

/// 取回捕获缓冲区中的内容（安装了后端时总是为空）
pub fn drain_captured() -> Vec<u8> {
    let mut console = CONSOLE.lock();
    console.capture.drain(..).collect()
}

/// fmt::Write 适配器，供 kprint! 宏使用
pub struct Writer;

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        puts(s);
        Ok(())
    }
}
