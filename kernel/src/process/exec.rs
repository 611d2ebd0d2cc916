//! 程序映像替换 (exec)
//!
//! 校验和装载都走外部加载器协作者；任何失败（路径不存在、坏映像、
//! 内存不足）都发生在触碰调用者状态之前，exec 失败是非破坏性的。
//! 成功后描述符表原样保留（没有 close-on-exec 标志，全量继承），
//! 执行从新映像的入口点开始，本调用不再返回旧代码。

use crate::config::MAXARG;
use crate::errno::Errno;
use crate::kernel::Kernel;
use crate::process::task::Pid;

impl Kernel {
    pub fn sys_exec(&mut self, pid: Pid, path: &str, argv: &[&str]) -> Result<(), Errno> {
        let slot = self.on_cpu(pid)?;

        if argv.len() > MAXARG {
            return Err(Errno::ArgumentListTooLong);
        }

        let cwd = self.ptable.get(slot).cwd;
        let ino = self.fs.resolve(cwd, path)?;
        if self.fs.stat(ino)?.is_dir() {
            return Err(Errno::IsADirectory);
        }

        // 新映像装入独立的地址空间；到这里都还没有动旧映像
        let new_space = self.mm.load_program(path, argv)?;

        let old_space = self.ptable.get_mut(slot).address_space.replace(new_space);
        if let Some(old) = old_space {
            self.mm.destroy_address_space(old);
        }

        let name = path.rsplit('/').next().unwrap_or(path);
        self.ptable.get_mut(slot).name = alloc::string::String::from(name);

        log::debug!("exec: pid {} -> {}", pid, path);
        self.set_retval(slot, 0);
        Ok(())
    }
}
