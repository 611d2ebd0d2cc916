//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 文件对象和文件描述符表
//!
//! 核心概念：
//! - `File`: 打开的文件对象，指向一个 inode 或者管道的一端，
//!   被所有引用它的描述符槽位共同持有（ref_count 计数）
//! - `FdTable`: 每进程固定大小的描述符表，小整数句柄到共享
//!   文件对象的映射
//!
//! 引用计数约定：File 创建时 ref_count = 1，归第一个安装它的
//! 槽位所有；dup/fork 每占用一个新槽位就 dup() 一次；释放槽位
//! 时 release()，计数归零的那次释放负责善后（关 inode 或关管
//! 道端），由内核的 file_close 完成。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use spin::Mutex;

use crate::config::NOFILE;
use crate::errno::Errno;
use crate::fs::pipe::Pipe;
use crate::fs::vfs::Ino;

/// 打开标志位
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OpenFlags(u32);

impl OpenFlags {
    pub const O_RDONLY: u32 = 0o00000000;
    pub const O_WRONLY: u32 = 0o00000001;
    pub const O_RDWR: u32 = 0o00000002;
    pub const O_ACCMODE: u32 = 0o00000003;
    pub const O_CREAT: u32 = 0o00000100;
    pub const O_EXCL: u32 = 0o00000200;
    pub const O_TRUNC: u32 = 0o00001000;
    pub const O_DIRECTORY: u32 = 0o00200000;
    // 接口保留位：本核心不实现 close-on-exec，描述符跨 exec 全量继承
    pub const O_CLOEXEC: u32 = 0o02000000;

    pub const fn new(flags: u32) -> Self {
        Self(flags)
    }

    pub fn is_readonly(&self) -> bool {
        (self.0 & Self::O_ACCMODE) == Self::O_RDONLY
    }

    pub fn is_writeonly(&self) -> bool {
        (self.0 & Self::O_ACCMODE) == Self::O_WRONLY
    }

    pub fn is_rdwr(&self) -> bool {
        (self.0 & Self::O_ACCMODE) == Self::O_RDWR
    }

    /// 该访问模式是否允许读
    pub fn readable(&self) -> bool {
        self.is_readonly() || self.is_rdwr()
    }

    /// 该访问模式是否允许写
    pub fn writable(&self) -> bool {
        self.is_writeonly() || self.is_rdwr()
    }

    pub fn contains(&self, mask: u32) -> bool {
        (self.0 & mask) == mask
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// 文件对象的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// 持久 inode（经由文件系统协作者）
    Inode,
    /// 管道读端
    PipeRead,
    /// 管道写端
    PipeWrite,
}

/// 打开的文件对象
///
/// offset 只对 Inode 类型有意义；pipe 端没有偏移概念。
/// offset 用锁保护：同一文件对象可能同时出现在多个进程的
/// 描述符表中（fork/dup 共享）。
pub struct File {
    kind: FileKind,
    /// 引用本对象的描述符槽位数
    ref_count: AtomicUsize,
    readable: bool,
    writable: bool,
    offset: Mutex<u64>,
    ino: Option<Ino>,
    pipe: Option<Arc<Pipe>>,
}

impl File {
    /// inode 文件对象
    pub fn new_inode(ino: Ino, flags: OpenFlags) -> Self {
        Self {
            kind: FileKind::Inode,
            ref_count: AtomicUsize::new(1),
            readable: flags.readable(),
            writable: flags.writable(),
            offset: Mutex::new(0),
            ino: Some(ino),
            pipe: None,
        }
    }

    /// 管道读端文件对象
    pub fn new_pipe_read(pipe: Arc<Pipe>) -> Self {
        Self {
            kind: FileKind::PipeRead,
            ref_count: AtomicUsize::new(1),
            readable: true,
            writable: false,
            offset: Mutex::new(0),
            ino: None,
            pipe: Some(pipe),
        }
    }

    /// 管道写端文件对象
    pub fn new_pipe_write(pipe: Arc<Pipe>) -> Self {
        Self {
            kind: FileKind::PipeWrite,
            ref_count: AtomicUsize::new(1),
            readable: false,
            writable: true,
            offset: Mutex::new(0),
            ino: None,
            pipe: Some(pipe),
        }
    }

    #[inline]
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    #[inline]
    pub fn readable(&self) -> bool {
        self.readable
    }

    #[inline]
    pub fn writable(&self) -> bool {
        self.writable
    }

    #[inline]
    pub fn ino(&self) -> Option<Ino> {
        self.ino
    }

    #[inline]
    pub fn pipe(&self) -> Option<&Arc<Pipe>> {
        self.pipe.as_ref()
    }

    /// 管道身份标识，用作睡眠/唤醒通道的键
    pub fn pipe_token(&self) -> Option<usize> {
        self.pipe.as_ref().map(|p| Arc::as_ptr(p) as usize)
    }

    /// 新的描述符槽位引用本对象
    pub fn dup(&self) {
        self.ref_count.fetch_add(1, Ordering::AcqRel);
    }

    /// 一个描述符槽位释放引用；返回 true 表示这是最后一个引用，
    /// 调用方必须执行善后
    pub fn release(&self) -> bool {
        let prev = self.ref_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0);
        prev == 1
    }

    /// 当前引用计数（诊断用）
    pub fn refs(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// 当前文件偏移
    pub fn pos(&self) -> u64 {
        *self.offset.lock()
    }

    /// 设置文件偏移
    pub fn set_pos(&self, pos: u64) {
        *self.offset.lock() = pos;
    }
}

/// 每进程文件描述符表
///
/// 固定 NOFILE 个槽位；分配总是取编号最小的空槽
pub struct FdTable {
    slots: [Option<Arc<File>>; NOFILE],
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// 把文件对象安装到编号最小的空槽位
    ///
    /// 不改变 ref_count：File 创建时自带的那个引用归安装它的
    /// 槽位；dup 等共享路径由调用方负责 dup()
    pub fn alloc(&mut self, file: Arc<File>) -> Result<usize, Errno> {
        for (fd, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(file);
                return Ok(fd);
            }
        }
        Err(Errno::TooManyOpenFiles)
    }

    /// 查找描述符对应的文件对象
    pub fn get(&self, fd: usize) -> Result<Arc<File>, Errno> {
        self.slots
            .get(fd)
            .and_then(|slot| slot.clone())
            .ok_or(Errno::BadFileNumber)
    }

    /// 清空槽位并取出文件对象（close 路径）
    pub fn take(&mut self, fd: usize) -> Result<Arc<File>, Errno> {
        self.slots
            .get_mut(fd)
            .and_then(|slot| slot.take())
            .ok_or(Errno::BadFileNumber)
    }

    /// fork 时逐槽复制：共享文件对象，每个非空槽位引用计数 +1
    pub fn fork_copy(&self) -> FdTable {
        let slots = core::array::from_fn(|fd| {
            self.slots[fd].as_ref().map(|file| {
                file.dup();
                file.clone()
            })
        });
        FdTable { slots }
    }

    /// 取出全部打开的文件对象（exit 路径）
    pub fn drain(&mut self) -> Vec<Arc<File>> {
        self.slots.iter_mut().filter_map(|slot| slot.take()).collect()
    }

    /// 占用的槽位数
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
