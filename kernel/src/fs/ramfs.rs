//! 内存文件系统
//!
//! [`FileSystem`] 协作者的参考实现：目录树、硬链接、设备节点都放
//! 在内存里，没有磁盘布局。供宿主测试和没有块设备的环境使用。
//!
//! 语义要点：
//! - unlink 只移除目录项；仍被 open/cwd 持有的 inode 推迟到最后
//!   一个 iput 才释放
//! - 设备节点 (mknod) 的写入按主设备号路由，CONSOLE_MAJOR 直通
//!   内核控制台
//! - 可选的容量上限用来演练底层存储失败 (IOError)

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::console;
use crate::errno::Errno;
use crate::fs::file::OpenFlags;
use crate::fs::stat::Stat;
use crate::fs::vfs::{FileSystem, Ino, InodeKind};

/// 控制台字符设备的主设备号
pub const CONSOLE_MAJOR: u16 = 1;

struct RamInode {
    kind: InodeKind,
    nlink: u32,
    /// open/cwd 持有的引用数
    opens: u32,
    data: Vec<u8>,
    /// 目录项（不含 `.` 和 `..`）
    entries: BTreeMap<String, Ino>,
    /// 目录的上级（`..`），根目录指向自身
    parent: Ino,
    major: u16,
    minor: u16,
}

impl RamInode {
    fn regular() -> Self {
        Self {
            kind: InodeKind::Regular,
            nlink: 1,
            opens: 0,
            data: Vec::new(),
            entries: BTreeMap::new(),
            parent: 0,
            major: 0,
            minor: 0,
        }
    }

    fn directory(parent: Ino) -> Self {
        Self {
            kind: InodeKind::Directory,
            parent,
            ..Self::regular()
        }
    }

    fn device(major: u16, minor: u16) -> Self {
        Self {
            kind: InodeKind::Device,
            major,
            minor,
            ..Self::regular()
        }
    }
}

/// 内存文件系统
pub struct RamFs {
    inodes: BTreeMap<Ino, RamInode>,
    next_ino: Ino,
    root: Ino,
    /// 文件数据总量上限（字节），None 为不限
    capacity: Option<usize>,
    used: usize,
}

impl RamFs {
    pub fn new() -> Self {
        let mut inodes = BTreeMap::new();
        let root: Ino = 1;
        let mut root_node = RamInode::directory(root);
        root_node.parent = root;
        inodes.insert(root, root_node);
        Self {
            inodes,
            next_ino: root + 1,
            root,
            capacity: None,
            used: 0,
        }
    }

    /// 限制文件数据总量，超出后写入以 IOError 失败
    pub fn with_capacity(capacity: usize) -> Self {
        let mut fs = Self::new();
        fs.capacity = Some(capacity);
        fs
    }

    fn node(&self, ino: Ino) -> Result<&RamInode, Errno> {
        self.inodes.get(&ino).ok_or(Errno::IOError)
    }

    fn node_mut(&mut self, ino: Ino) -> Result<&mut RamInode, Errno> {
        self.inodes.get_mut(&ino).ok_or(Errno::IOError)
    }

    /// 逐分量解析路径；绝对路径从根开始，否则从 cwd 开始
    fn walk(&self, cwd: Ino, path: &str) -> Result<Ino, Errno> {
        let mut cur = if path.starts_with('/') { self.root } else { cwd };
        let mut seen_any = false;
        for comp in path.split('/').filter(|c| !c.is_empty()) {
            seen_any = true;
            let node = self.node(cur)?;
            if node.kind != InodeKind::Directory {
                return Err(Errno::NotADirectory);
            }
            cur = match comp {
                "." => cur,
                ".." => node.parent,
                name => *node.entries.get(name).ok_or(Errno::NoSuchFileOrDirectory)?,
            };
        }
        if !seen_any && !path.starts_with('/') {
            // 空路径不命名任何对象
            return Err(Errno::NoSuchFileOrDirectory);
        }
        Ok(cur)
    }

    /// 解析出父目录与最后一个分量（创建/删除类操作用）
    fn walk_parent(&self, cwd: Ino, path: &str) -> Result<(Ino, String), Errno> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
            return Err(Errno::InvalidArgument);
        }
        let (dir_part, name) = match trimmed.rfind('/') {
            Some(idx) => (&trimmed[..idx + 1], &trimmed[idx + 1..]),
            None => ("", trimmed),
        };
        let dir = if dir_part.is_empty() {
            if path.starts_with('/') {
                self.root
            } else {
                cwd
            }
        } else {
            self.walk(cwd, dir_part)?
        };
        if self.node(dir)?.kind != InodeKind::Directory {
            return Err(Errno::NotADirectory);
        }
        Ok((dir, name.to_string()))
    }

    fn insert_inode(&mut self, dir: Ino, name: String, node: RamInode) -> Result<Ino, Errno> {
        let ino = self.next_ino;
        self.next_ino += 1;
        self.inodes.insert(ino, node);
        self.node_mut(dir)?.entries.insert(name, ino);
        Ok(ino)
    }

    /// 链接数和打开引用都归零后真正释放 inode
    fn maybe_free(&mut self, ino: Ino) {
        if let Some(node) = self.inodes.get(&ino) {
            if node.nlink == 0 && node.opens == 0 {
                let freed = self.inodes.remove(&ino);
                if let Some(node) = freed {
                    self.used -= node.data.len();
                }
            }
        }
    }

    /// 当前存在的 inode 数量（诊断用）
    pub fn inode_count(&self) -> usize {
        self.inodes.len()
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for RamFs {
    fn root(&self) -> Ino {
        self.root
    }

    fn resolve(&self, cwd: Ino, path: &str) -> Result<Ino, Errno> {
        self.walk(cwd, path)
    }

    fn open(&mut self, cwd: Ino, path: &str, flags: OpenFlags) -> Result<Ino, Errno> {
        match self.walk(cwd, path) {
            Ok(ino) => {
                if flags.contains(OpenFlags::O_CREAT | OpenFlags::O_EXCL) {
                    return Err(Errno::FileExists);
                }
                let node = self.node(ino)?;
                if node.kind == InodeKind::Directory && flags.writable() {
                    return Err(Errno::IsADirectory);
                }
                if flags.contains(OpenFlags::O_DIRECTORY) && node.kind != InodeKind::Directory {
                    return Err(Errno::NotADirectory);
                }
                if flags.contains(OpenFlags::O_TRUNC) && node.kind == InodeKind::Regular {
                    let node = self.node_mut(ino)?;
                    let dropped = node.data.len();
                    node.data.clear();
                    self.used -= dropped;
                }
                self.node_mut(ino)?.opens += 1;
                Ok(ino)
            }
            Err(Errno::NoSuchFileOrDirectory) if flags.contains(OpenFlags::O_CREAT) => {
                let (dir, name) = self.walk_parent(cwd, path)?;
                let mut node = RamInode::regular();
                node.opens = 1;
                self.insert_inode(dir, name, node)
            }
            Err(e) => Err(e),
        }
    }

    fn read(&mut self, ino: Ino, off: u64, buf: &mut [u8]) -> Result<usize, Errno> {
        let node = self.node(ino)?;
        match node.kind {
            InodeKind::Regular => {
                let off = off as usize;
                if off >= node.data.len() {
                    return Ok(0);
                }
                let n = core::cmp::min(buf.len(), node.data.len() - off);
                buf[..n].copy_from_slice(&node.data[off..off + n]);
                Ok(n)
            }
            // 控制台设备没有输入源
            InodeKind::Device => Ok(0),
            InodeKind::Directory => Err(Errno::IsADirectory),
        }
    }

    fn write(&mut self, ino: Ino, off: u64, data: &[u8]) -> Result<usize, Errno> {
        let capacity = self.capacity;
        let used = self.used;
        let node = self.node_mut(ino)?;
        match node.kind {
            InodeKind::Regular => {
                let off = off as usize;
                let end = off + data.len();
                let grow = end.saturating_sub(node.data.len());
                if let Some(cap) = capacity {
                    if used + grow > cap {
                        return Err(Errno::IOError);
                    }
                }
                if end > node.data.len() {
                    node.data.resize(end, 0);
                }
                node.data[off..end].copy_from_slice(data);
                self.used += grow;
                Ok(data.len())
            }
            InodeKind::Device => {
                if node.major == CONSOLE_MAJOR {
                    for &b in data {
                        console::putchar(b);
                    }
                }
                Ok(data.len())
            }
            InodeKind::Directory => Err(Errno::IsADirectory),
        }
    }

    fn stat(&self, ino: Ino) -> Result<Stat, Errno> {
        let node = self.node(ino)?;
        Ok(Stat {
            st_ino: ino as u64,
            st_mode: node.kind.mode_bits(),
            st_nlink: node.nlink,
            st_size: node.data.len() as u64,
        })
    }

    fn link(&mut self, cwd: Ino, old: &str, new: &str) -> Result<(), Errno> {
        let ino = self.walk(cwd, old)?;
        if self.node(ino)?.kind == InodeKind::Directory {
            // 目录不允许硬链接，否则树会变成图
            return Err(Errno::PermissionDenied);
        }
        let (dir, name) = self.walk_parent(cwd, new)?;
        if self.node(dir)?.entries.contains_key(&name) {
            return Err(Errno::FileExists);
        }
        self.node_mut(dir)?.entries.insert(name, ino);
        self.node_mut(ino)?.nlink += 1;
        Ok(())
    }

    fn unlink(&mut self, cwd: Ino, path: &str) -> Result<(), Errno> {
        let (dir, name) = self.walk_parent(cwd, path)?;
        if name == "." || name == ".." {
            return Err(Errno::PermissionDenied);
        }
        let ino = *self
            .node(dir)?
            .entries
            .get(&name)
            .ok_or(Errno::NoSuchFileOrDirectory)?;
        let node = self.node(ino)?;
        if node.kind == InodeKind::Directory && !node.entries.is_empty() {
            return Err(Errno::PermissionDenied);
        }
        self.node_mut(dir)?.entries.remove(&name);
        self.node_mut(ino)?.nlink -= 1;
        self.maybe_free(ino);
        Ok(())
    }

    fn mkdir(&mut self, cwd: Ino, path: &str) -> Result<Ino, Errno> {
        let (dir, name) = self.walk_parent(cwd, path)?;
        if self.node(dir)?.entries.contains_key(&name) {
            return Err(Errno::FileExists);
        }
        self.insert_inode(dir, name, RamInode::directory(dir))
    }

    fn mknod(&mut self, cwd: Ino, path: &str, major: u16, minor: u16) -> Result<Ino, Errno> {
        let (dir, name) = self.walk_parent(cwd, path)?;
        if self.node(dir)?.entries.contains_key(&name) {
            return Err(Errno::FileExists);
        }
        self.insert_inode(dir, name, RamInode::device(major, minor))
    }

    fn idup(&mut self, ino: Ino) {
        if let Some(node) = self.inodes.get_mut(&ino) {
            node.opens += 1;
        }
    }

    fn iput(&mut self, ino: Ino) {
        if let Some(node) = self.inodes.get_mut(&ino) {
            debug_assert!(node.opens > 0);
            node.opens -= 1;
        }
        self.maybe_free(ino);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creat(fs: &mut RamFs, path: &str) -> Ino {
        let flags = OpenFlags::new(OpenFlags::O_WRONLY | OpenFlags::O_CREAT);
        fs.open(fs.root(), path, flags).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let mut fs = RamFs::new();
        let dir = fs.mkdir(fs.root(), "/etc").unwrap();
        let ino = creat(&mut fs, "/etc/motd");
        assert_eq!(fs.resolve(fs.root(), "/etc/motd").unwrap(), ino);
        assert_eq!(fs.resolve(dir, "motd").unwrap(), ino);
        assert_eq!(fs.resolve(dir, "../etc/./motd").unwrap(), ino);
        assert_eq!(
            fs.resolve(fs.root(), "/etc/nope"),
            Err(Errno::NoSuchFileOrDirectory)
        );
    }

    #[test]
    fn test_link_unlink_nlink() {
        let mut fs = RamFs::new();
        let ino = creat(&mut fs, "/a");
        fs.iput(ino);
        fs.link(fs.root(), "/a", "/b").unwrap();
        assert_eq!(fs.stat(ino).unwrap().st_nlink, 2);
        fs.unlink(fs.root(), "/a").unwrap();
        assert_eq!(fs.stat(ino).unwrap().st_nlink, 1);
        assert_eq!(fs.resolve(fs.root(), "/b").unwrap(), ino);
        fs.unlink(fs.root(), "/b").unwrap();
        // 没有打开引用，最后一个链接移除即释放
        assert_eq!(fs.stat(ino), Err(Errno::IOError));
    }

    #[test]
    fn test_unlink_while_open_defers_free() {
        let mut fs = RamFs::new();
        let ino = creat(&mut fs, "/tmpfile");
        fs.write(ino, 0, b"data").unwrap();
        fs.unlink(fs.root(), "/tmpfile").unwrap();
        // 目录项已消失，但打开引用还在
        assert_eq!(
            fs.resolve(fs.root(), "/tmpfile"),
            Err(Errno::NoSuchFileOrDirectory)
        );
        let mut buf = [0u8; 4];
        assert_eq!(fs.read(ino, 0, &mut buf).unwrap(), 4);
        fs.iput(ino);
        assert_eq!(fs.stat(ino), Err(Errno::IOError));
    }

    #[test]
    fn test_capacity_limit() {
        let mut fs = RamFs::with_capacity(8);
        let ino = creat(&mut fs, "/f");
        assert_eq!(fs.write(ino, 0, b"12345678").unwrap(), 8);
        assert_eq!(fs.write(ino, 8, b"9"), Err(Errno::IOError));
        // 覆盖写不增长，不受限
        assert_eq!(fs.write(ino, 0, b"x").unwrap(), 1);
    }
}
