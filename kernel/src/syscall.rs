//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 描述符层系统调用
//!
//! open/read/write/close/dup/pipe/stat/fstat/link/unlink/mkdir/
//! mknod/chdir/getpid。inode 操作直通文件系统协作者并推进文件
//! 对象的私有偏移；管道操作在缓冲区满/空时挂起调用进程。
//!
//! 可能阻塞的调用返回 [`SysOutcome`]：Ready 表示立即完成，
//! Blocked 表示进程已睡眠，等条件满足、进程被唤醒后由
//! `Kernel::resume` 续跑并交付最终结果 [`SysRet`]。

use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::config::PIPE_BUF_SIZE;
use crate::errno::Errno;
use crate::fs::file::{File, FileKind, OpenFlags};
use crate::fs::pipe::Pipe;
use crate::fs::stat::Stat;
use crate::kernel::Kernel;
use crate::process::task::{PendingOp, Pid, WaitChannel};

/// 可能阻塞的系统调用结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysOutcome<T> {
    /// 调用立即完成
    Ready(T),
    /// 进程已睡眠；被唤醒后经 resume() 继续
    Blocked,
}

impl<T> SysOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SysOutcome<U> {
        match self {
            SysOutcome::Ready(v) => SysOutcome::Ready(f(v)),
            SysOutcome::Blocked => SysOutcome::Blocked,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, SysOutcome::Blocked)
    }

    /// 测试辅助：断言已完成并取出值
    pub fn unwrap_ready(self) -> T {
        match self {
            SysOutcome::Ready(v) => v,
            SysOutcome::Blocked => panic!("operation is blocked"),
        }
    }
}

/// resume() 交付的挂起操作最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysRet {
    /// fork 的子进程侧返回值（恒为 0）
    Fork(Pid),
    /// 管道读完成，读到的字节
    Read(Vec<u8>),
    /// 管道写完成，写入的字节数
    Write(usize),
    /// wait 完成
    Wait { pid: Pid, status: i32 },
}

impl Kernel {
    /// 打开（可能创建）一个 inode 文件，返回描述符
    pub fn sys_open(&mut self, pid: Pid, path: &str, flags: OpenFlags) -> Result<usize, Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        let ino = self.fs.open(cwd, path, flags)?;
        let file = Arc::new(File::new_inode(ino, flags));
        match self.ptable.get_mut(slot).fdtable.alloc(file) {
            Ok(fd) => {
                self.set_retval(slot, fd as i64);
                Ok(fd)
            }
            Err(e) => {
                // 描述符表满：归还 open 拿到的引用，状态复原
                self.fs.iput(ino);
                Err(e)
            }
        }
    }

    /// 创建管道，返回（读端 fd, 写端 fd）
    pub fn sys_pipe(&mut self, pid: Pid) -> Result<(usize, usize), Errno> {
        let slot = self.on_cpu(pid)?;

        // 管道缓冲区占用一个内核页帧
        self.mm.alloc_page()?;
        let pipe = Arc::new(Pipe::new(PIPE_BUF_SIZE));
        let rfile = Arc::new(File::new_pipe_read(pipe.clone()));
        let wfile = Arc::new(File::new_pipe_write(pipe));

        let rfd = match self.ptable.get_mut(slot).fdtable.alloc(rfile.clone()) {
            Ok(fd) => fd,
            Err(e) => {
                self.file_close(rfile);
                self.file_close(wfile);
                return Err(e);
            }
        };
        let wfd = match self.ptable.get_mut(slot).fdtable.alloc(wfile.clone()) {
            Ok(fd) => fd,
            Err(e) => {
                let r = self
                    .ptable
                    .get_mut(slot)
                    .fdtable
                    .take(rfd)
                    .expect("pipe: read end vanished during rollback");
                self.file_close(r);
                self.file_close(wfile);
                return Err(e);
            }
        };

        self.set_retval(slot, rfd as i64);
        Ok((rfd, wfd))
    }

    /// 读描述符：inode 读立即完成，管道读可能阻塞
    pub fn sys_read(
        &mut self,
        pid: Pid,
        fd: usize,
        max: usize,
    ) -> Result<SysOutcome<Vec<u8>>, Errno> {
        let slot = self.on_cpu(pid)?;
        let file = self.ptable.get(slot).fdtable.get(fd)?;
        if !file.readable() {
            return Err(Errno::BadFileNumber);
        }
        match file.kind() {
            FileKind::Inode => {
                let ino = file.ino().expect("inode file without ino");
                let off = file.pos();
                let mut buf = vec![0u8; max];
                let n = self.fs.read(ino, off, &mut buf)?;
                buf.truncate(n);
                file.set_pos(off + n as u64);
                self.set_retval(slot, n as i64);
                Ok(SysOutcome::Ready(buf))
            }
            FileKind::PipeRead => self.pipe_read_step(slot, file, max),
            FileKind::PipeWrite => Err(Errno::BadFileNumber),
        }
    }

    /// 写描述符：inode 写立即完成，管道写满时阻塞直到全部写入
    pub fn sys_write(
        &mut self,
        pid: Pid,
        fd: usize,
        data: &[u8],
    ) -> Result<SysOutcome<usize>, Errno> {
        let slot = self.on_cpu(pid)?;
        let file = self.ptable.get(slot).fdtable.get(fd)?;
        if !file.writable() {
            return Err(Errno::BadFileNumber);
        }
        match file.kind() {
            FileKind::Inode => {
                let ino = file.ino().expect("inode file without ino");
                let off = file.pos();
                let n = self.fs.write(ino, off, data)?;
                file.set_pos(off + n as u64);
                self.set_retval(slot, n as i64);
                Ok(SysOutcome::Ready(n))
            }
            FileKind::PipeWrite => self.pipe_write_step(slot, file, data.to_vec(), 0),
            FileKind::PipeRead => Err(Errno::BadFileNumber),
        }
    }

    /// 关闭描述符
    pub fn sys_close(&mut self, pid: Pid, fd: usize) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let file = self.ptable.get_mut(slot).fdtable.take(fd)?;
        self.file_close(file);
        Ok(())
    }

    /// 复制描述符到编号最小的空槽位，共享同一文件对象
    pub fn sys_dup(&mut self, pid: Pid, fd: usize) -> Result<usize, Errno> {
        let slot = self.on_cpu(pid)?;
        let file = self.ptable.get(slot).fdtable.get(fd)?;
        let newfd = self.ptable.get_mut(slot).fdtable.alloc(file.clone())?;
        file.dup();
        self.set_retval(slot, newfd as i64);
        Ok(newfd)
    }

    /// 按路径取文件元数据
    pub fn sys_stat(&mut self, pid: Pid, path: &str) -> Result<Stat, Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        let ino = self.fs.resolve(cwd, path)?;
        self.fs.stat(ino)
    }

    /// 按描述符取文件元数据；只有 inode 文件有元数据
    pub fn sys_fstat(&mut self, pid: Pid, fd: usize) -> Result<Stat, Errno> {
        let slot = self.on_cpu(pid)?;
        let file = self.ptable.get(slot).fdtable.get(fd)?;
        match file.kind() {
            FileKind::Inode => self.fs.stat(file.ino().expect("inode file without ino")),
            _ => Err(Errno::BadFileNumber),
        }
    }

    /// 建硬链接
    pub fn sys_link(&mut self, pid: Pid, old: &str, new: &str) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        self.fs.link(cwd, old, new)
    }

    /// 删目录项
    pub fn sys_unlink(&mut self, pid: Pid, path: &str) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        self.fs.unlink(cwd, path)
    }

    /// 建目录
    pub fn sys_mkdir(&mut self, pid: Pid, path: &str) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        self.fs.mkdir(cwd, path)?;
        Ok(())
    }

    /// 建设备节点
    pub fn sys_mknod(
        &mut self,
        pid: Pid,
        path: &str,
        major: u16,
        minor: u16,
    ) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let cwd = self.ptable.get(slot).cwd;
        self.fs.mknod(cwd, path, major, minor)?;
        Ok(())
    }

    /// 切换当前目录
    pub fn sys_chdir(&mut self, pid: Pid, path: &str) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;
        let old = self.ptable.get(slot).cwd;
        let ino = self.fs.resolve(old, path)?;
        if !self.fs.stat(ino)?.is_dir() {
            return Err(Errno::NotADirectory);
        }
        self.fs.idup(ino);
        self.fs.iput(old);
        self.ptable.get_mut(slot).cwd = ino;
        Ok(())
    }

    /// 调用进程的 PID
    pub fn sys_getpid(&mut self, pid: Pid) -> Result<Pid, Errno> {
        let slot = self.on_cpu(pid)?;
        Ok(self.ptable.get(slot).pid())
    }

    // ========================================================================
    // 文件对象释放与管道的阻塞读写
    // ========================================================================

    /// 释放一个描述符槽位对文件对象的引用
    ///
    /// 计数归零的那次负责善后：inode 归还打开引用；管道端置关闭
    /// 并唤醒对端睡眠者（让它们看到 EOF/BrokenPipe 而不是挂死），
    /// 两端都关闭后归还缓冲区页帧
    pub(crate) fn file_close(&mut self, file: Arc<File>) {
        if !file.release() {
            return;
        }
        match file.kind() {
            FileKind::Inode => {
                if let Some(ino) = file.ino() {
                    self.fs.iput(ino);
                }
            }
            FileKind::PipeRead => {
                let token = file.pipe_token().expect("pipe file without pipe");
                let pipe = file.pipe().expect("pipe file without pipe").clone();
                pipe.close_read();
                self.wakeup(WaitChannel::PipeWritable(token));
                if pipe.both_closed() {
                    self.mm.free_page();
                }
            }
            FileKind::PipeWrite => {
                let token = file.pipe_token().expect("pipe file without pipe");
                let pipe = file.pipe().expect("pipe file without pipe").clone();
                pipe.close_write();
                self.wakeup(WaitChannel::PipeReadable(token));
                if pipe.both_closed() {
                    self.mm.free_page();
                }
            }
        }
    }

    /// 管道读的单步推进；空且写端仍开时睡眠
    pub(crate) fn pipe_read_step(
        &mut self,
        slot: usize,
        file: Arc<File>,
        max: usize,
    ) -> Result<SysOutcome<Vec<u8>>, Errno> {
        let pipe = file.pipe().expect("pipe file without pipe").clone();
        let token = file.pipe_token().expect("pipe file without pipe");

        let mut ring = pipe.ring().lock();
        if ring.is_empty() {
            if !pipe.write_open() {
                // 写端已关：EOF，返回零字节而不是错误
                drop(ring);
                self.set_retval(slot, 0);
                return Ok(SysOutcome::Ready(Vec::new()));
            }
            drop(ring);
            self.sleep_on(
                slot,
                WaitChannel::PipeReadable(token),
                PendingOp::PipeRead { file, max },
            );
            return Ok(SysOutcome::Blocked);
        }

        // 允许部分读：立刻返回现有数据
        let n = core::cmp::min(max, ring.len());
        let mut buf = vec![0u8; n];
        let got = ring.read(&mut buf);
        debug_assert_eq!(got, n);
        drop(ring);

        self.wakeup(WaitChannel::PipeWritable(token));
        self.set_retval(slot, n as i64);
        Ok(SysOutcome::Ready(buf))
    }

    /// 管道写的单步推进；写满为止，剩余部分记录进度后睡眠
    pub(crate) fn pipe_write_step(
        &mut self,
        slot: usize,
        file: Arc<File>,
        data: Vec<u8>,
        mut written: usize,
    ) -> Result<SysOutcome<usize>, Errno> {
        let pipe = file.pipe().expect("pipe file without pipe").clone();
        let token = file.pipe_token().expect("pipe file without pipe");

        if !pipe.read_open() {
            // 没有读端的写入即使已有部分进度也以 BrokenPipe 失败
            return Err(Errno::BrokenPipe);
        }

        let n = {
            let mut ring = pipe.ring().lock();
            ring.write(&data[written..])
        };
        written += n;
        if n > 0 {
            self.wakeup(WaitChannel::PipeReadable(token));
        }

        if written == data.len() {
            self.set_retval(slot, written as i64);
            return Ok(SysOutcome::Ready(written));
        }

        self.sleep_on(
            slot,
            WaitChannel::PipeWritable(token),
            PendingOp::PipeWrite {
                file,
                data,
                written,
            },
        );
        Ok(SysOutcome::Blocked)
    }
}
