//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内存协作者接口
//!
//! 物理/虚拟内存分配器和程序加载器不属于进程核心，这里只定义
//! 核心调用它们的契约：
//! - 进程地址空间的创建 / 克隆 (fork) / 销毁 (exit)
//! - exec 时的程序映像装载
//! - 内核管道缓冲区的页帧记账
//!
//! [`SimpleMm`] 是一个用于开发与测试的计数实现（mock 模式），
//! 可配置空间/页帧上限以演练 OutOfMemory 失败路径。

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::errno::Errno;

/// 地址空间句柄，对进程核心完全不透明
pub type AsHandle = u64;

/// 内存/加载器协作者契约
pub trait MemoryOps {
    /// 为手工构造的第一个进程 (init) 创建初始地址空间
    fn create_address_space(&mut self) -> Result<AsHandle, Errno>;

    /// 克隆地址空间（fork 语义：独立副本，不共享）
    ///
    /// 失败返回 `OutOfMemory`，调用方负责回滚
    fn clone_address_space(&mut self, src: AsHandle) -> Result<AsHandle, Errno>;

    /// 装载程序映像，返回全新的地址空间（exec 语义）
    ///
    /// 失败（坏映像、内存不足）时不得动到任何已有地址空间
    fn load_program(&mut self, path: &str, argv: &[&str]) -> Result<AsHandle, Errno>;

    /// 销毁地址空间，释放其页帧
    fn destroy_address_space(&mut self, handle: AsHandle);

    /// 为内核对象（管道缓冲区）申请一个页帧
    fn alloc_page(&mut self) -> Result<(), Errno>;

    /// 归还 [`MemoryOps::alloc_page`] 申请的页帧
    fn free_page(&mut self);
}

/// SimpleMm 的记账计数，经 [`SimpleMm::stats`] 共享给宿主观察
#[derive(Default)]
struct MmCounters {
    live_spaces: AtomicUsize,
    live_pages: AtomicUsize,
    loads: AtomicUsize,
    destroys: AtomicUsize,
}

/// [`SimpleMm`] 计数的只读视图
#[derive(Clone)]
pub struct MmStats {
    counters: Arc<MmCounters>,
}

impl MmStats {
    /// 当前存活的地址空间数量
    pub fn live_spaces(&self) -> usize {
        self.counters.live_spaces.load(Ordering::Acquire)
    }

    /// 当前占用的内核页帧数量（管道缓冲区）
    pub fn live_pages(&self) -> usize {
        self.counters.live_pages.load(Ordering::Acquire)
    }

    /// 成功的 load_program 次数
    pub fn load_count(&self) -> usize {
        self.counters.loads.load(Ordering::Acquire)
    }

    /// destroy_address_space 次数
    pub fn destroy_count(&self) -> usize {
        self.counters.destroys.load(Ordering::Acquire)
    }
}

/// 计数式内存协作者
///
/// 不管理真实内存，只对句柄和页帧做记账，供宿主测试使用：
/// - `with_space_limit` / `with_page_limit` 触发 OutOfMemory
/// - `deny_program` 使指定路径的装载以坏映像失败
pub struct SimpleMm {
    next_handle: AsHandle,
    counters: Arc<MmCounters>,
    space_limit: Option<usize>,
    page_limit: Option<usize>,
    denied: BTreeSet<String>,
}

impl SimpleMm {
    /// 无限制的实例
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            counters: Arc::new(MmCounters::default()),
            space_limit: None,
            page_limit: None,
            denied: BTreeSet::new(),
        }
    }

    /// 限制同时存活的地址空间数量
    pub fn with_space_limit(limit: usize) -> Self {
        let mut mm = Self::new();
        mm.space_limit = Some(limit);
        mm
    }

    /// 限制内核页帧数量（管道缓冲区）
    pub fn with_page_limit(limit: usize) -> Self {
        let mut mm = Self::new();
        mm.page_limit = Some(limit);
        mm
    }

    /// 让指定路径的 load_program 以坏映像失败
    pub fn deny_program(&mut self, path: &str) {
        self.denied.insert(path.to_string());
    }

    /// 取一份计数视图；移交给内核后仍可观察
    pub fn stats(&self) -> MmStats {
        MmStats {
            counters: self.counters.clone(),
        }
    }

    fn alloc_space(&mut self) -> Result<AsHandle, Errno> {
        if let Some(limit) = self.space_limit {
            if self.counters.live_spaces.load(Ordering::Acquire) >= limit {
                return Err(Errno::OutOfMemory);
            }
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.counters.live_spaces.fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }
}

impl Default for SimpleMm {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryOps for SimpleMm {
    fn create_address_space(&mut self) -> Result<AsHandle, Errno> {
        self.alloc_space()
    }

    fn clone_address_space(&mut self, _src: AsHandle) -> Result<AsHandle, Errno> {
        self.alloc_space()
    }

    fn load_program(&mut self, path: &str, _argv: &[&str]) -> Result<AsHandle, Errno> {
        if self.denied.contains(path) {
            return Err(Errno::ExecFormatError);
        }
        let handle = self.alloc_space()?;
        self.counters.loads.fetch_add(1, Ordering::AcqRel);
        Ok(handle)
    }

    fn destroy_address_space(&mut self, _handle: AsHandle) {
        let prev = self.counters.live_spaces.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0);
        self.counters.destroys.fetch_add(1, Ordering::AcqRel);
    }

    fn alloc_page(&mut self) -> Result<(), Errno> {
        if let Some(limit) = self.page_limit {
            if self.counters.live_pages.load(Ordering::Acquire) >= limit {
                return Err(Errno::OutOfMemory);
            }
        }
        self.counters.live_pages.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn free_page(&mut self) {
        let prev = self.counters.live_pages.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_limit() {
        let mut mm = SimpleMm::with_space_limit(1);
        let a = mm.create_address_space().unwrap();
        assert_eq!(mm.clone_address_space(a), Err(Errno::OutOfMemory));
        mm.destroy_address_space(a);
        assert!(mm.create_address_space().is_ok());
    }

    #[test]
    fn test_denied_program() {
        let mut mm = SimpleMm::new();
        mm.deny_program("/bin/bad");
        assert_eq!(
            mm.load_program("/bin/bad", &[]),
            Err(Errno::ExecFormatError)
        );
        assert!(mm.load_program("/bin/ok", &[]).is_ok());
    }

    #[test]
    fn test_page_accounting() {
        let mut mm = SimpleMm::with_page_limit(1);
        let stats = mm.stats();
        mm.alloc_page().unwrap();
        assert_eq!(mm.alloc_page(), Err(Errno::OutOfMemory));
        assert_eq!(stats.live_pages(), 1);
        mm.free_page();
        assert_eq!(stats.live_pages(), 0);
        assert!(mm.alloc_page().is_ok());
    }
}
