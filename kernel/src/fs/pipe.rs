//! 管道 (Pipe) 对象
//!
//! 固定容量的环形字节缓冲区，一个读端、一个写端。两端各由一个
//! 文件对象持有，文件对象又可经 dup/fork 进入多个描述符槽位；
//! 端的开闭只取决于对应文件对象的引用计数归零。
//!
//! 阻塞语义（睡眠/唤醒）由系统调用层借助调度器实现，本模块只
//! 提供缓冲区和端状态；对缓冲区的一次复制由 ring 锁串行化，
//! 任一时刻只有一个读者或写者在搬运字节。

use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

/// 管道环形缓冲区
///
/// read_pos/write_pos 是单调递增的计数器，实际下标对容量取模：
/// - 空: read_pos == write_pos
/// - 满: write_pos == read_pos + capacity
pub struct PipeRing {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl PipeRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// 可读字节数
    #[inline]
    pub fn len(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// 剩余可写空间
    #[inline]
    pub fn space(&self) -> usize {
        self.data.len() - self.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.read_pos == self.write_pos
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.space() == 0
    }

    /// 读出至多 buf.len() 字节，返回实际读取数
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = core::cmp::min(self.len(), buf.len());
        let cap = self.data.len();
        for slot in buf.iter_mut().take(n) {
            *slot = self.data[self.read_pos % cap];
            self.read_pos += 1;
        }
        n
    }

    /// 写入至多 space() 字节，返回实际写入数
    pub fn write(&mut self, buf: &[u8]) -> usize {
        let n = core::cmp::min(self.space(), buf.len());
        let cap = self.data.len();
        for &b in buf.iter().take(n) {
            self.data[self.write_pos % cap] = b;
            self.write_pos += 1;
        }
        n
    }
}

/// 管道对象
pub struct Pipe {
    ring: Mutex<PipeRing>,
    /// 读端是否仍然打开
    read_open: AtomicBool,
    /// 写端是否仍然打开
    write_open: AtomicBool,
}

impl Pipe {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(PipeRing::new(capacity)),
            read_open: AtomicBool::new(true),
            write_open: AtomicBool::new(true),
        }
    }

    #[inline]
    pub fn ring(&self) -> &Mutex<PipeRing> {
        &self.ring
    }

    /// 关闭读端（读端文件对象引用计数归零时调用）
    pub fn close_read(&self) {
        self.read_open.store(false, Ordering::Release);
    }

    /// 关闭写端
    pub fn close_write(&self) {
        self.write_open.store(false, Ordering::Release);
    }

    #[inline]
    pub fn read_open(&self) -> bool {
        self.read_open.load(Ordering::Acquire)
    }

    #[inline]
    pub fn write_open(&self) -> bool {
        self.write_open.load(Ordering::Acquire)
    }

    /// 两端都关闭后管道即可销毁（缓冲区页帧归还分配器）
    #[inline]
    pub fn both_closed(&self) -> bool {
        !self.read_open() && !self.write_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_fill_and_drain() {
        let mut ring = PipeRing::new(8);
        assert!(ring.is_empty());
        assert_eq!(ring.write(b"abcde"), 5);
        assert_eq!(ring.len(), 5);
        let mut buf = [0u8; 3];
        assert_eq!(ring.read(&mut buf), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_ring_wraparound_preserves_order() {
        let mut ring = PipeRing::new(4);
        assert_eq!(ring.write(b"abcd"), 4);
        assert!(ring.is_full());
        assert_eq!(ring.write(b"x"), 0);

        let mut buf = [0u8; 2];
        assert_eq!(ring.read(&mut buf), 2);
        assert_eq!(&buf, b"ab");

        // 跨越回绕边界写入
        assert_eq!(ring.write(b"ef"), 2);
        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(&out, b"cdef");
        assert!(ring.is_empty());
    }

    #[test]
    fn test_end_flags() {
        let pipe = Pipe::new(16);
        assert!(pipe.read_open());
        assert!(pipe.write_open());
        pipe.close_write();
        assert!(!pipe.write_open());
        assert!(!pipe.both_closed());
        pipe.close_read();
        assert!(pipe.both_closed());
    }
}
