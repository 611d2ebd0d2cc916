//! 描述符表测试
//!
//! 最小槽位分配、dup 的引用计数独立性、EBADF 族错误

use crate::config::NOFILE;
use crate::errno::Errno;
use crate::fs::file::OpenFlags;
use crate::syscall::SysOutcome;
use crate::tests::boot;

fn creat() -> OpenFlags {
    OpenFlags::new(OpenFlags::O_WRONLY | OpenFlags::O_CREAT)
}

#[test]
fn test_lowest_free_slot_allocation() {
    let mut k = boot();
    let init = k.init_pid();

    let fd0 = k.sys_open(init, "/a", creat()).unwrap();
    let fd1 = k.sys_open(init, "/b", creat()).unwrap();
    assert_eq!((fd0, fd1), (0, 1));

    k.sys_close(init, fd0).unwrap();
    // 释放后的最小空槽优先复用
    assert_eq!(k.sys_open(init, "/c", creat()).unwrap(), 0);
}

#[test]
fn test_dup_outlives_original_close() {
    let mut k = boot();
    let init = k.init_pid();
    let (rfd, wfd) = k.sys_pipe(init).unwrap();

    assert_eq!(k.sys_write(init, wfd, b"x").unwrap(), SysOutcome::Ready(1));

    let dupped = k.sys_dup(init, rfd).unwrap();
    assert_ne!(dupped, rfd);
    k.sys_close(init, rfd).unwrap();

    // 引用计数独立于槽位数：副本完全可用
    assert_eq!(
        k.sys_read(init, dupped, 8).unwrap().unwrap_ready(),
        b"x".to_vec()
    );
    assert_eq!(k.sys_write(init, wfd, b"y").unwrap(), SysOutcome::Ready(1));
    assert_eq!(
        k.sys_read(init, dupped, 8).unwrap().unwrap_ready(),
        b"y".to_vec()
    );

    // 写端关闭后副本观察到 EOF（读端并没有随原描述符一起死掉）
    k.sys_close(init, wfd).unwrap();
    assert_eq!(
        k.sys_read(init, dupped, 8).unwrap().unwrap_ready(),
        Vec::new()
    );
}

#[test]
fn test_descriptor_exhaustion() {
    let mut k = boot();
    let init = k.init_pid();

    for i in 0..NOFILE {
        k.sys_open(init, &format!("/f{}", i), creat()).unwrap();
    }
    assert_eq!(
        k.sys_open(init, "/one-more", creat()),
        Err(Errno::TooManyOpenFiles)
    );
    // dup 同样受槽位上限约束
    assert_eq!(k.sys_dup(init, 0), Err(Errno::TooManyOpenFiles));
}

#[test]
fn test_bad_descriptor_errors() {
    let mut k = boot();
    let init = k.init_pid();

    assert_eq!(k.sys_close(init, 3), Err(Errno::BadFileNumber));
    assert_eq!(k.sys_read(init, 99, 1), Err(Errno::BadFileNumber));
    assert_eq!(k.sys_dup(init, NOFILE + 5), Err(Errno::BadFileNumber));

    let fd = k.sys_open(init, "/w", creat()).unwrap();
    // 访问模式不符也是 EBADF
    assert_eq!(k.sys_read(init, fd, 1), Err(Errno::BadFileNumber));
    k.sys_close(init, fd).unwrap();
    // 重复关闭
    assert_eq!(k.sys_close(init, fd), Err(Errno::BadFileNumber));

    let ro = k.sys_open(init, "/w", OpenFlags::new(OpenFlags::O_RDONLY)).unwrap();
    assert_eq!(k.sys_write(init, ro, b"z"), Err(Errno::BadFileNumber));
}

#[test]
fn test_pipe_ends_enforce_direction() {
    let mut k = boot();
    let init = k.init_pid();
    let (rfd, wfd) = k.sys_pipe(init).unwrap();

    assert_eq!(k.sys_write(init, rfd, b"x"), Err(Errno::BadFileNumber));
    assert_eq!(k.sys_read(init, wfd, 1), Err(Errno::BadFileNumber));
}
