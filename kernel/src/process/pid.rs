//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! PID 管理
//!
//! - PID 从 INIT_PID 起单调分配，第一次分配给 init
//! - 活着的进程（包括待回收的 Zombie）之间 PID 必须唯一；
//!   单调分配天然满足，回收后的复用留作扩展

use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{INIT_PID, PID_MAX};
use crate::process::task::Pid;

pub struct PidAllocator {
    next: AtomicU32,
}

impl PidAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(INIT_PID),
        }
    }

    /// 分配一个新 PID；超过 PID_MAX 返回 None
    pub fn alloc(&self) -> Option<Pid> {
        let pid = self.next.fetch_add(1, Ordering::Relaxed);
        if pid > PID_MAX {
            // TODO: 位图式 PID 复用
            None
        } else {
            Some(pid)
        }
    }

    pub fn free(&self, _pid: Pid) {
        // 单调分配下无事可做，接口留给位图实现
    }
}

impl Default for PidAllocator {
    fn default() -> Self {
        Self::new()
    }
}
