/*
 * child.rs
 *
 * fork+execvp rather than posix_spawn: the child needs setpgid(0, 0) and the
 * pipe-write-end dup2 done between fork and exec, in the child's own address
 * space, and a plain fork gives that directly.
 *
 * Pipe lifetime (spec §3): the two pipe pairs are created once, at
 * ChildManager construction, and live for the whole supervisor process -
 * NOT recreated per spawn. The supervisor keeps its copy of each write end
 * open for the entire run (CLOEXEC'd so it doesn't leak into the child
 * beyond the dup2'd copies at fds 1/2). If the supervisor closed its write
 * end after every exec, the read end would see EOF the moment a child died,
 * which would be indistinguishable from "no data yet" after the next child
 * is spawned. Keeping one dangling write fd open for the process lifetime
 * means the pipe never hits EOF between generations.
 */

use std::ffi::CString;
use std::io;
use std::os::unix::io::RawFd;

use crate::clock;

pub struct Child {
    pub pid: libc::pid_t,
    pub pgid: libc::pid_t,
    pub started_at_ns: u64,
}

pub enum ReapResult {
    /// `waitpid(WNOHANG)` found nothing to reap.
    NoChild,
    /// Reaped a pid that wasn't the tracked child (stray grandchild).
    Stray(libc::pid_t),
    Exited { code: i32 },
    Signaled { signal: i32 },
}

pub struct ChildManager {
    argv: Vec<CString>,
    stdout_read: RawFd,
    stdout_write: RawFd,
    stderr_read: RawFd,
    stderr_write: RawFd,
}

impl ChildManager {
    /// `command` must have at least one element (the executable); spec §3.
    pub fn new(command: &[String]) -> io::Result<Self> {
        assert!(!command.is_empty(), "command vector must be non-empty");

        let argv = command
            .iter()
            .map(|s| CString::new(s.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "argument contains NUL"))?;

        let (stdout_read, stdout_write) = new_pipe()?;
        let (stderr_read, stderr_write) = new_pipe()?;

        for fd in [stdout_read, stderr_read] {
            set_nonblocking_cloexec(fd)?;
        }
        for fd in [stdout_write, stderr_write] {
            set_cloexec(fd)?;
        }

        Ok(Self {
            argv,
            stdout_read,
            stdout_write,
            stderr_read,
            stderr_write,
        })
    }

    #[must_use]
    pub fn stdout_fd(&self) -> RawFd {
        self.stdout_read
    }

    #[must_use]
    pub fn stderr_fd(&self) -> RawFd {
        self.stderr_read
    }

    /// Fork and exec the configured command. The child is placed in its own
    /// process group (`pgid == pid`) and its signal mask is cleared so it
    /// doesn't inherit the supervisor's blocked set (spec §4.4).
    ///
    /// On exec failure the child calls `_exit(127)`, the sentinel the
    /// supervisor reads back via [`ChildManager::reap`] to stop supervising.
    pub fn spawn(&self) -> io::Result<Child> {
        let mut argv_ptrs: Vec<*const libc::c_char> =
            self.argv.iter().map(|c| c.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());

        // SAFETY: fork() duplicates the process; both branches below only
        // touch async-signal-safe APIs (for the child) or ordinary Rust (for
        // the parent). argv_ptrs outlives the exec call in the child because
        // it's stack-local to this function and the child never returns.
        let pid = unsafe { libc::fork() };

        if pid < 0 {
            return Err(io::Error::last_os_error());
        }

        if pid == 0 {
            // Child process. Only async-signal-safe calls from here on.
            // SAFETY: setpgid(0,0) puts us in our own new process group;
            // dup2 replaces fds 1/2 with the pipe write ends (CLOEXEC is not
            // copied by dup2, so these survive exec); clearing the signal
            // mask undoes the supervisor's SIG_BLOCK so the child starts
            // with default disposition; execvp replaces this image entirely.
            unsafe {
                libc::setpgid(0, 0);
                libc::dup2(self.stdout_write, 1);
                libc::dup2(self.stderr_write, 2);

                let mut empty: libc::sigset_t = std::mem::zeroed();
                libc::sigemptyset(&mut empty);
                libc::pthread_sigmask(libc::SIG_SETMASK, &empty, std::ptr::null_mut());

                libc::execvp(argv_ptrs[0], argv_ptrs.as_ptr());
                // execvp only returns on failure.
                libc::_exit(127);
            }
        }

        Ok(Child {
            pid,
            pgid: pid,
            started_at_ns: clock::now_ns(),
        })
    }

    /// Deliver `signal` to the child's entire process group (not just the
    /// child itself), so any descendants it spawned receive it too.
    pub fn forward(&self, child: &Child, signal: i32) -> io::Result<()> {
        // SAFETY: kill() accepts any pid/signal; a negative pid targets the
        // process group. No-op (ESRCH) if the group is already gone.
        let ret = unsafe { libc::kill(-child.pgid, signal) };
        if ret != 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    /// Reap exactly one child via `waitpid(-1, WNOHANG)`. Spec §4.4: if the
    /// reaped pid isn't the tracked child, the caller logs and ignores it
    /// (stray grandchild) without disturbing the tracked `Child`.
    pub fn reap(&self, tracked: &Child) -> io::Result<ReapResult> {
        let mut status: i32 = 0;
        // SAFETY: status is a valid out-pointer; WNOHANG never blocks.
        let pid = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };

        if pid == 0 {
            return Ok(ReapResult::NoChild);
        }
        if pid < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ECHILD) {
                return Ok(ReapResult::NoChild);
            }
            return Err(err);
        }
        if pid != tracked.pid {
            return Ok(ReapResult::Stray(pid));
        }

        if libc::WIFEXITED(status) {
            Ok(ReapResult::Exited {
                code: libc::WEXITSTATUS(status),
            })
        } else if libc::WIFSIGNALED(status) {
            Ok(ReapResult::Signaled {
                signal: libc::WTERMSIG(status),
            })
        } else {
            Ok(ReapResult::NoChild)
        }
    }
}

fn new_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0i32; 2];
    // SAFETY: fds is a valid 2-element array; pipe() writes exactly 2 fds.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

fn set_nonblocking_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is a valid, just-created pipe end.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        if flags < 0 || libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    set_cloexec(fd)
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fd is a valid, just-created pipe end.
    unsafe {
        if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn read_all_available(fd: RawFd) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            // SAFETY: fd is a valid, non-blocking read end for the test.
            let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
            if n <= 0 {
                break;
            }
            #[allow(clippy::cast_sign_loss)]
            out.extend_from_slice(&buf[..n as usize]);
        }
        out
    }

    #[test]
    fn spawn_true_exits_zero() {
        let mgr = ChildManager::new(&["true".to_string()]).unwrap();
        let child = mgr.spawn().unwrap();
        loop {
            match mgr.reap(&child).unwrap() {
                ReapResult::NoChild => sleep(Duration::from_millis(10)),
                ReapResult::Exited { code } => {
                    assert_eq!(code, 0);
                    break;
                }
                _ => panic!("unexpected reap result"),
            }
        }
    }

    #[test]
    fn spawn_captures_stdout_through_pipe() {
        let mgr = ChildManager::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "echo hello".to_string(),
        ])
        .unwrap();
        let child = mgr.spawn().unwrap();

        // Give the child a moment to run and write.
        sleep(Duration::from_millis(100));
        let out = read_all_available(mgr.stdout_fd());
        assert_eq!(out, b"hello\n");

        loop {
            if let ReapResult::Exited { .. } = mgr.reap(&child).unwrap() {
                break;
            }
            sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn exec_failure_exits_127() {
        let mgr = ChildManager::new(&["/no/such/binary-xyz".to_string()]).unwrap();
        let child = mgr.spawn().unwrap();
        loop {
            match mgr.reap(&child).unwrap() {
                ReapResult::Exited { code } => {
                    assert_eq!(code, 127);
                    break;
                }
                ReapResult::NoChild => sleep(Duration::from_millis(10)),
                _ => panic!("unexpected reap result"),
            }
        }
    }

    #[test]
    fn forward_delivers_to_process_group() {
        let mgr = ChildManager::new(&["sleep".to_string(), "5".to_string()]).unwrap();
        let child = mgr.spawn().unwrap();
        mgr.forward(&child, libc::SIGTERM).unwrap();

        loop {
            match mgr.reap(&child).unwrap() {
                ReapResult::Signaled { signal } => {
                    assert_eq!(signal, libc::SIGTERM);
                    break;
                }
                ReapResult::NoChild => sleep(Duration::from_millis(10)),
                _ => panic!("unexpected reap result"),
            }
        }
    }
}
