/*
 * daemon.rs
 *
 * Detaches the process from its controlling terminal (spec §4.9, the `-d`
 * flag). Simpler than agentfs's `daemonize`: that one uses a pipe so the
 * parent can block until the child signals readiness, which matters for a
 * service with a startup phase to wait out. This supervisor has no such
 * phase - once the fork succeeds the parent's job is done, so there's no
 * pipe, just fork/setsid/chdir/redirect-stdio in the child and `exit(0)` in
 * the parent.
 */

use std::io;

/// Fork, detach the child from its controlling terminal, and redirect its
/// standard streams to `/dev/null`. The parent process exits with status 0
/// immediately after a successful fork and never returns to the caller; the
/// child returns normally and continues as the supervisor.
pub fn daemonize() -> io::Result<()> {
    // SAFETY: fork() is safe to call; only the child branch below performs
    // further raw syscalls, and does so before any multi-threaded state
    // (logging, syslog connections) has been set up.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid > 0 {
        std::process::exit(0);
    }

    // SAFETY: setsid() detaches from the controlling terminal and starts a
    // new session; always safe to call once per process.
    if unsafe { libc::setsid() } < 0 {
        return Err(io::Error::last_os_error());
    }

    let root = std::ffi::CString::new("/").expect("no interior NUL");
    // SAFETY: `root` is a valid, NUL-terminated C string.
    if unsafe { libc::chdir(root.as_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    redirect_stdio_to_devnull()
}

fn redirect_stdio_to_devnull() -> io::Result<()> {
    let devnull = std::ffi::CString::new("/dev/null").expect("no interior NUL");
    // SAFETY: `devnull` is a valid path; the fd returned by open() is closed
    // via dup2 into 0/1/2 and then closed itself once no longer needed.
    let fd = unsafe { libc::open(devnull.as_ptr(), libc::O_RDWR) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: fd is a valid, just-opened fd; dup2 onto 0/1/2 is always safe.
    unsafe {
        libc::dup2(fd, 0);
        libc::dup2(fd, 1);
        libc::dup2(fd, 2);
        if fd > 2 {
            libc::close(fd);
        }
    }
    Ok(())
}
