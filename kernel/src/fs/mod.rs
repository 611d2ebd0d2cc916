//! 文件层
//!
//! - `file`: 文件对象与每进程描述符表
//! - `pipe`: 管道对象（环形缓冲区 + 端状态）
//! - `vfs`: 命名空间/inode 协作者接口
//! - `stat`: 文件元数据
//! - `ramfs`: 协作者的内存参考实现

pub mod file;
pub mod pipe;
pub mod ramfs;
pub mod stat;
pub mod vfs;

pub use file::{FdTable, File, FileKind, OpenFlags};
pub use pipe::{Pipe, PipeRing};
pub use ramfs::RamFs;
pub use stat::Stat;
pub use vfs::{FileSystem, Ino, InodeKind};
