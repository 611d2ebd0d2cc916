//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程表
//!
//! 固定 NPROC 个槽位的 arena。槽位索引在进程死亡后会被复用，
//! 因此跨槽位的引用（父链接）必须带 PID 代际校验。
//! 对进程表的结构性修改全部经由持有 `&mut Kernel` 的调用路径，
//! 这就是规格里的进程表锁。

use alloc::vec::Vec;

use crate::config::NPROC;
use crate::process::pid::PidAllocator;
use crate::process::task::{Pid, Task, TaskState};

pub struct ProcessTable {
    procs: Vec<Task>,
    pids: PidAllocator,
}

impl ProcessTable {
    pub fn new() -> Self {
        let mut procs = Vec::with_capacity(NPROC);
        for _ in 0..NPROC {
            procs.push(Task::unused());
        }
        Self {
            procs,
            pids: PidAllocator::new(),
        }
    }

    #[inline]
    pub fn get(&self, slot: usize) -> &Task {
        &self.procs[slot]
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> &mut Task {
        &mut self.procs[slot]
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.procs.len()
    }

    /// 分配一个空闲槽位并赋予新 PID（状态置为 EMBRYO）
    ///
    /// 进程表满或 PID 耗尽返回 None
    pub fn alloc(&mut self) -> Option<usize> {
        let slot = self
            .procs
            .iter()
            .position(|t| t.state() == TaskState::Unused)?;
        let pid = self.pids.alloc()?;
        self.procs[slot].reset(pid);
        Some(slot)
    }

    /// 释放槽位（wait 回收或 fork 失败回滚）
    pub fn release(&mut self, slot: usize) {
        let pid = self.procs[slot].pid();
        self.procs[slot].clear();
        self.pids.free(pid);
    }

    /// 按 PID 查找存活槽位（Zombie 算存活：PID 仍被占用）
    pub fn slot_of(&self, pid: Pid) -> Option<usize> {
        self.procs
            .iter()
            .position(|t| t.state() != TaskState::Unused && t.pid() == pid)
    }

    /// 校验并解析父链接；父槽位已被复用（PID 不符）视为无父
    pub fn parent_slot(&self, slot: usize) -> Option<usize> {
        let (pslot, ppid) = self.procs[slot].parent?;
        let parent = &self.procs[pslot];
        if parent.state() != TaskState::Unused && parent.pid() == ppid {
            Some(pslot)
        } else {
            None
        }
    }

    /// 收集 slot 的全部子进程槽位（按槽位序）
    pub fn children_of(&self, slot: usize) -> Vec<usize> {
        let pid = self.procs[slot].pid();
        (0..self.procs.len())
            .filter(|&c| {
                self.procs[c].state() != TaskState::Unused
                    && self.procs[c].parent == Some((slot, pid))
            })
            .collect()
    }

    /// 存活进程数（诊断用）
    pub fn live_count(&self) -> usize {
        self.procs
            .iter()
            .filter(|t| t.state() != TaskState::Unused)
            .count()
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}
