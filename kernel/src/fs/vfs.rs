//! 文件系统协作者接口
//!
//! 磁盘块层、inode 缓存和目录布局不属于进程核心；核心只通过本
//! 接口使用命名空间与 inode 服务。所有路径操作都以调用进程的
//! 当前目录 (cwd) 为起点解析，cwd 本身保存在 PCB 中。
//!
//! 打开引用计数 (idup/iput)：open 和 chdir 会使 inode 处于
//! "被进程持有" 状态，unlink 对仍被持有的 inode 只移除目录项，
//! 实际释放推迟到最后一个 iput。

use crate::errno::Errno;
use crate::fs::file::OpenFlags;
use crate::fs::stat::{Stat, S_IFCHR, S_IFDIR, S_IFREG};

/// inode 编号
pub type Ino = u32;

/// inode 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    /// 常规文件
    Regular,
    /// 目录
    Directory,
    /// 字符设备 (mknod)
    Device,
}

impl InodeKind {
    /// 对应的 st_mode 类型位
    pub fn mode_bits(self) -> u32 {
        match self {
            InodeKind::Regular => S_IFREG,
            InodeKind::Directory => S_IFDIR,
            InodeKind::Device => S_IFCHR,
        }
    }
}

/// 命名空间/inode 协作者契约
///
/// 错误约定：
/// - 路径解析失败: `NoSuchFileOrDirectory`
/// - 中间分量不是目录: `NotADirectory`
/// - 独占创建时已存在: `FileExists`
/// - 以写模式打开目录: `IsADirectory`
/// - 受保护的命名空间操作（删除 `.`/`..`、链接目录、删除非空目录）:
///   `PermissionDenied`
/// - 底层存储失败: `IOError`
pub trait FileSystem {
    /// 根目录 inode
    fn root(&self) -> Ino;

    /// 解析路径（绝对路径从根开始，相对路径从 cwd 开始）
    fn resolve(&self, cwd: Ino, path: &str) -> Result<Ino, Errno>;

    /// 按 flags 打开或创建 inode，成功后持有一个打开引用
    fn open(&mut self, cwd: Ino, path: &str, flags: OpenFlags) -> Result<Ino, Errno>;

    /// 从指定偏移读取，返回实际读取的字节数（0 表示 EOF）
    fn read(&mut self, ino: Ino, off: u64, buf: &mut [u8]) -> Result<usize, Errno>;

    /// 向指定偏移写入，返回实际写入的字节数
    fn write(&mut self, ino: Ino, off: u64, data: &[u8]) -> Result<usize, Errno>;

    /// 复制 inode 元数据
    fn stat(&self, ino: Ino) -> Result<Stat, Errno>;

    /// 为已有 inode 建立新的硬链接
    fn link(&mut self, cwd: Ino, old: &str, new: &str) -> Result<(), Errno>;

    /// 移除目录项；最后一个链接且无打开引用时释放 inode
    fn unlink(&mut self, cwd: Ino, path: &str) -> Result<(), Errno>;

    /// 创建目录
    fn mkdir(&mut self, cwd: Ino, path: &str) -> Result<Ino, Errno>;

    /// 创建设备节点
    fn mknod(&mut self, cwd: Ino, path: &str, major: u16, minor: u16) -> Result<Ino, Errno>;

    /// 增加一个打开引用（fork 继承 cwd、chdir）
    fn idup(&mut self, ino: Ino);

    /// 释放一个打开引用
    fn iput(&mut self, ino: Ino);
}
