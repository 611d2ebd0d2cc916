//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 标准错误代码定义
//!
//! 编号与 include/uapi/asm-generic/errno.h 一致

/// 标准错误代码
///
/// 系统调用失败时作为 `Result<_, Errno>` 的 Err 返回；
/// 资源耗尽（进程表满、描述符表满、内存不足）永远是普通错误，
/// 不是内核 panic。
///
/// 使用方法：
/// ```
/// use minos::errno::Errno;
///
/// fn lookup(fd: usize) -> Result<usize, Errno> {
///     if fd >= 16 {
///         return Err(Errno::BadFileNumber);
///     }
///     Ok(fd)
/// }
/// ```
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Errno {
    /// No such file or directory (ENOENT, 2)
    /// 路径解析失败（open/exec/stat/unlink/chdir）
    NoSuchFileOrDirectory = 2,

    /// No such process (ESRCH, 3)
    /// kill 的目标 PID 不存在
    NoSuchProcess = 3,

    /// Interrupted system call (EINTR, 4)
    /// 阻塞中的系统调用被 kill 打断，进程随后退出
    InterruptedSystemCall = 4,

    /// I/O error (EIO, 5)
    /// 底层存储协作者失败
    IOError = 5,

    /// Exec format error (ENOEXEC, 8)
    /// 加载器拒绝了程序映像
    ExecFormatError = 8,

    /// Bad file number (EBADF, 9)
    /// 描述符越界、槽位为空或访问模式不符
    BadFileNumber = 9,

    /// No child process (ECHILD, 10)
    NoChild = 10,

    /// Try again (EAGAIN, 11)
    /// 进程表无空闲槽位，经典的 fork 失败
    TryAgain = 11,

    /// Out of memory (ENOMEM, 12)
    /// 地址空间克隆或管道缓冲区页分配失败
    OutOfMemory = 12,

    /// Permission denied (EACCES, 13)
    PermissionDenied = 13,

    /// Device or resource busy (EBUSY, 16)
    DeviceOrResourceBusy = 16,

    /// File exists (EEXIST, 17)
    FileExists = 17,

    /// Not a directory (ENOTDIR, 20)
    /// chdir 或路径中间分量不是目录
    NotADirectory = 20,

    /// Is a directory (EISDIR, 21)
    IsADirectory = 21,

    /// Invalid argument (EINVAL, 22)
    InvalidArgument = 22,

    /// Too many open files (EMFILE, 24)
    /// 每进程描述符表已满
    TooManyOpenFiles = 24,

    /// Argument list too long (E2BIG, 7)
    ArgumentListTooLong = 7,

    /// Broken pipe (EPIPE, 32)
    /// 向读端已全部关闭的管道写入
    BrokenPipe = 32,
}

impl Errno {
    /// 获取错误代码的正数值（用于比较）
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// 获取错误代码的负数值（用于系统调用返回）
    #[inline]
    pub const fn as_neg_i32(self) -> i32 {
        -(self as i32)
    }
}

/// 常用的错误代码常量
pub mod constants {
    pub const ENOENT: i32 = 2;
    pub const ESRCH: i32 = 3;
    pub const EINTR: i32 = 4;
    pub const EIO: i32 = 5;
    pub const E2BIG: i32 = 7;
    pub const ENOEXEC: i32 = 8;
    pub const EBADF: i32 = 9;
    pub const ECHILD: i32 = 10;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EACCES: i32 = 13;
    pub const EBUSY: i32 = 16;
    pub const EEXIST: i32 = 17;
    pub const ENOTDIR: i32 = 20;
    pub const EISDIR: i32 = 21;
    pub const EINVAL: i32 = 22;
    pub const EMFILE: i32 = 24;
    pub const EPIPE: i32 = 32;
}
