//! 文件系统边界测试
//!
//! 经由描述符层系统调用驱动命名空间协作者：偏移推进、链接、
//! 目录与 cwd、设备节点、容量上限

use crate::errno::Errno;
use crate::fs::file::OpenFlags;
use crate::fs::ramfs::CONSOLE_MAJOR;
use crate::fs::RamFs;
use crate::mm::SimpleMm;
use crate::syscall::SysOutcome;
use crate::tests::boot;
use crate::Kernel;

fn rdwr_creat() -> OpenFlags {
    OpenFlags::new(OpenFlags::O_RDWR | OpenFlags::O_CREAT)
}

fn rdonly() -> OpenFlags {
    OpenFlags::new(OpenFlags::O_RDONLY)
}

#[test]
fn test_read_write_advance_private_offset() {
    let mut k = boot();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/notes", rdwr_creat()).unwrap();
    assert_eq!(
        k.sys_write(init, fd, b"hello world").unwrap(),
        SysOutcome::Ready(11)
    );
    // 同一文件对象的偏移已推进到末尾
    assert_eq!(k.sys_read(init, fd, 16).unwrap().unwrap_ready(), Vec::new());

    // 另一次 open 得到独立偏移
    let fd2 = k.sys_open(init, "/notes", rdonly()).unwrap();
    assert_eq!(
        k.sys_read(init, fd2, 5).unwrap().unwrap_ready(),
        b"hello".to_vec()
    );
    assert_eq!(
        k.sys_read(init, fd2, 64).unwrap().unwrap_ready(),
        b" world".to_vec()
    );
}

#[test]
fn test_stat_and_fstat() {
    let mut k = boot();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/notes", rdwr_creat()).unwrap();
    k.sys_write(init, fd, b"0123456789a").unwrap();

    let st = k.sys_stat(init, "/notes").unwrap();
    assert!(st.is_regular());
    assert_eq!(st.st_size, 11);
    assert_eq!(st.st_nlink, 1);
    assert_eq!(k.sys_fstat(init, fd).unwrap(), st);

    assert_eq!(
        k.sys_stat(init, "/missing"),
        Err(Errno::NoSuchFileOrDirectory)
    );

    // 管道描述符没有 inode 元数据
    let (rfd, _wfd) = k.sys_pipe(init).unwrap();
    assert_eq!(k.sys_fstat(init, rfd), Err(Errno::BadFileNumber));
}

#[test]
fn test_link_and_unlink() {
    let mut k = boot();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/orig", rdwr_creat()).unwrap();
    k.sys_write(init, fd, b"shared").unwrap();
    k.sys_close(init, fd).unwrap();

    k.sys_link(init, "/orig", "/alias").unwrap();
    assert_eq!(k.sys_stat(init, "/alias").unwrap().st_nlink, 2);

    k.sys_unlink(init, "/orig").unwrap();
    assert_eq!(
        k.sys_stat(init, "/orig"),
        Err(Errno::NoSuchFileOrDirectory)
    );

    // 内容经由剩下的链接完好可读
    let fd = k.sys_open(init, "/alias", rdonly()).unwrap();
    assert_eq!(
        k.sys_read(init, fd, 16).unwrap().unwrap_ready(),
        b"shared".to_vec()
    );
    assert_eq!(k.sys_stat(init, "/alias").unwrap().st_nlink, 1);
}

#[test]
fn test_unlink_while_open_defers_removal() {
    let mut k = boot();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/tmpfile", rdwr_creat()).unwrap();
    k.sys_write(init, fd, b"scratch").unwrap();
    k.sys_unlink(init, "/tmpfile").unwrap();

    // 目录里已经没有它，但打开的描述符仍然能用
    assert_eq!(
        k.sys_stat(init, "/tmpfile"),
        Err(Errno::NoSuchFileOrDirectory)
    );
    assert!(k.sys_fstat(init, fd).is_ok());
    k.sys_close(init, fd).unwrap();
}

#[test]
fn test_mkdir_chdir_relative_paths() {
    let mut k = boot();
    let init = k.init_pid();

    k.sys_mkdir(init, "/home").unwrap();
    k.sys_mkdir(init, "/home/user").unwrap();
    assert_eq!(k.sys_mkdir(init, "/home"), Err(Errno::FileExists));

    k.sys_chdir(init, "/home/user").unwrap();
    let fd = k.sys_open(init, "journal", rdwr_creat()).unwrap();
    k.sys_write(init, fd, b"entry").unwrap();

    // 相对路径在新 cwd 下解析
    assert!(k.sys_stat(init, "/home/user/journal").is_ok());
    k.sys_chdir(init, "..").unwrap();
    assert!(k.sys_stat(init, "user/journal").is_ok());

    assert_eq!(
        k.sys_chdir(init, "user/journal"),
        Err(Errno::NotADirectory)
    );
    assert_eq!(
        k.sys_chdir(init, "/nowhere"),
        Err(Errno::NoSuchFileOrDirectory)
    );
}

#[test]
fn test_cwd_inherited_by_fork() {
    let mut k = boot();
    let init = k.init_pid();

    k.sys_mkdir(init, "/work").unwrap();
    k.sys_chdir(init, "/work").unwrap();

    let child = crate::tests::spawn(&mut k, init);
    let fd = k.sys_open(child, "made-here", rdwr_creat()).unwrap();
    k.sys_close(child, fd).unwrap();
    assert!(k.sys_stat(init, "/work/made-here").is_ok());

    // 子进程退出要归还 cwd 的打开引用；之后父进程一切照常
    k.sys_exit(child, 0);
    k.sys_wait(init).unwrap();
    assert!(k.sys_stat(init, "made-here").is_ok());
}

#[test]
fn test_open_excl_and_directory_rules() {
    let mut k = boot();
    let init = k.init_pid();

    let excl = OpenFlags::new(OpenFlags::O_WRONLY | OpenFlags::O_CREAT | OpenFlags::O_EXCL);
    k.sys_open(init, "/once", excl).unwrap();
    assert_eq!(k.sys_open(init, "/once", excl), Err(Errno::FileExists));

    k.sys_mkdir(init, "/dir").unwrap();
    // 目录不允许写模式打开
    assert_eq!(
        k.sys_open(init, "/dir", OpenFlags::new(OpenFlags::O_WRONLY)),
        Err(Errno::IsADirectory)
    );
    let dfd = k
        .sys_open(
            init,
            "/dir",
            OpenFlags::new(OpenFlags::O_RDONLY | OpenFlags::O_DIRECTORY),
        )
        .unwrap();

    // 删除空目录；打开引用让元数据在关闭前仍可用
    k.sys_unlink(init, "/dir").unwrap();
    assert!(k.sys_fstat(init, dfd).unwrap().is_dir());
    k.sys_close(init, dfd).unwrap();
}

#[test]
fn test_truncate_on_open() {
    let mut k = boot();
    let init = k.init_pid();

    let fd = k.sys_open(init, "/t", rdwr_creat()).unwrap();
    k.sys_write(init, fd, b"long content").unwrap();
    k.sys_close(init, fd).unwrap();

    let trunc = OpenFlags::new(OpenFlags::O_WRONLY | OpenFlags::O_TRUNC);
    k.sys_open(init, "/t", trunc).unwrap();
    assert_eq!(k.sys_stat(init, "/t").unwrap().st_size, 0);
}

#[test]
fn test_mknod_console_device() {
    let mut k = boot();
    let init = k.init_pid();

    k.sys_mknod(init, "/console", CONSOLE_MAJOR, 0).unwrap();
    assert!(k.sys_stat(init, "/console").unwrap().is_device());
    assert_eq!(
        k.sys_mknod(init, "/console", CONSOLE_MAJOR, 0),
        Err(Errno::FileExists)
    );

    let fd = k
        .sys_open(init, "/console", OpenFlags::new(OpenFlags::O_WRONLY))
        .unwrap();
    // 设备写直通控制台
    assert_eq!(
        k.sys_write(init, fd, b"boot ok\n").unwrap(),
        SysOutcome::Ready(8)
    );

    let rd = k.sys_open(init, "/console", rdonly()).unwrap();
    // 控制台设备没有输入源
    assert_eq!(k.sys_read(init, rd, 8).unwrap().unwrap_ready(), Vec::new());
}

#[test]
fn test_storage_capacity_surfaces_ioerror() {
    let mut k = Kernel::new(
        Box::new(SimpleMm::new()),
        Box::new(RamFs::with_capacity(4)),
    );
    let init = k.init_pid();

    let fd = k.sys_open(init, "/small", rdwr_creat()).unwrap();
    assert_eq!(k.sys_write(init, fd, b"12345"), Err(Errno::IOError));
    assert_eq!(
        k.sys_write(init, fd, b"1234").unwrap(),
        SysOutcome::Ready(4)
    );
}
