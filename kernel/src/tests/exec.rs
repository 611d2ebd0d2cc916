//! exec 系统调用测试
//!
//! 映像替换、失败路径的非破坏性、描述符全量继承

use crate::config::MAXARG;
use crate::errno::Errno;
use crate::fs::file::OpenFlags;
use crate::fs::RamFs;
use crate::mm::SimpleMm;
use crate::syscall::SysOutcome;
use crate::tests::{boot_with_stats, spawn};
use crate::Kernel;

fn creat() -> OpenFlags {
    OpenFlags::new(OpenFlags::O_WRONLY | OpenFlags::O_CREAT)
}

#[test]
fn test_exec_replaces_image_and_keeps_descriptors() {
    let (mut k, stats) = boot_with_stats();
    let init = k.init_pid();

    // 程序文件与一个跨 exec 存活的管道
    let fd = k.sys_open(init, "/echo", creat()).unwrap();
    k.sys_write(init, fd, b"\x7fELF").unwrap();
    k.sys_close(init, fd).unwrap();
    let (rfd, wfd) = k.sys_pipe(init).unwrap();

    let loads = stats.load_count();
    let destroys = stats.destroy_count();
    let spaces = stats.live_spaces();

    k.sys_exec(init, "/echo", &["echo", "hi"]).unwrap();

    // 旧映像被销毁、新映像装入，净存活数不变
    assert_eq!(stats.load_count(), loads + 1);
    assert_eq!(stats.destroy_count(), destroys + 1);
    assert_eq!(stats.live_spaces(), spaces);

    // 描述符原样继承（无 close-on-exec）
    assert_eq!(k.sys_write(init, wfd, b"ok").unwrap(), SysOutcome::Ready(2));
    assert_eq!(
        k.sys_read(init, rfd, 8).unwrap().unwrap_ready(),
        b"ok".to_vec()
    );
}

#[test]
fn test_exec_missing_path_is_nondestructive() {
    let (mut k, stats) = boot_with_stats();
    let init = k.init_pid();
    let (rfd, wfd) = k.sys_pipe(init).unwrap();

    let loads = stats.load_count();
    let destroys = stats.destroy_count();

    assert_eq!(
        k.sys_exec(init, "/no-such-binary", &[]),
        Err(Errno::NoSuchFileOrDirectory)
    );

    // 原映像、描述符、进程状态全部原样
    assert_eq!(stats.load_count(), loads);
    assert_eq!(stats.destroy_count(), destroys);
    assert_eq!(k.sys_write(init, wfd, b"alive").unwrap(), SysOutcome::Ready(5));
    assert_eq!(
        k.sys_read(init, rfd, 8).unwrap().unwrap_ready(),
        b"alive".to_vec()
    );
    assert!(k.sys_fork(init).is_ok());
}

#[test]
fn test_exec_bad_image_is_nondestructive() {
    let mut mm = SimpleMm::new();
    mm.deny_program("/bad");
    let stats = mm.stats();
    let mut k = Kernel::new(Box::new(mm), Box::new(RamFs::new()));
    let init = k.init_pid();

    let fd = k.sys_open(init, "/bad", creat()).unwrap();
    k.sys_close(init, fd).unwrap();

    let destroys = stats.destroy_count();
    assert_eq!(
        k.sys_exec(init, "/bad", &["bad"]),
        Err(Errno::ExecFormatError)
    );
    assert_eq!(stats.destroy_count(), destroys);
    // 调用方照常活着
    assert_eq!(k.sys_getpid(init).unwrap(), init);
}

#[test]
fn test_exec_in_child_does_not_touch_parent() {
    let (mut k, stats) = boot_with_stats();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/prog", creat()).unwrap();
    k.sys_close(init, fd).unwrap();

    let child = spawn(&mut k, init);
    let spaces = stats.live_spaces();
    k.sys_exec(child, "/prog", &["prog"]).unwrap();
    assert_eq!(stats.live_spaces(), spaces);

    // 父进程不受影响，还能正常回收子进程
    k.sys_exit(child, 0);
    assert_eq!(k.sys_wait(init).unwrap().unwrap_ready(), (child, 0));
}

#[test]
fn test_exec_directory_fails() {
    let (mut k, _stats) = boot_with_stats();
    let init = k.init_pid();
    k.sys_mkdir(init, "/dir").unwrap();
    assert_eq!(k.sys_exec(init, "/dir", &[]), Err(Errno::IsADirectory));
}

#[test]
fn test_exec_argv_limit() {
    let (mut k, _stats) = boot_with_stats();
    let init = k.init_pid();
    let argv = vec!["x"; MAXARG + 1];
    assert_eq!(
        k.sys_exec(init, "/whatever", &argv),
        Err(Errno::ArgumentListTooLong)
    );
}
