/*
 * supervisor.rs
 *
 * The event loop proper (spec §4.6). Everything else in this crate is a leaf
 * this module composes: SignalInbox for what woke us, ChildManager for what
 * to do about it, BackoffState for when to do it again, LineBuffer for what
 * to say about it. No module here owns more than one concern, following the
 * same leaves-first layering the teacher's runner.rs sketches in its own
 * component table, just split into separate files instead of one.
 */

use std::os::unix::io::RawFd;

use crate::backoff::BackoffState;
use crate::child::{self, ChildManager, ReapResult};
use crate::clock;
use crate::interval;
use crate::linebuf::LineBuffer;
use crate::log as logging;
use crate::signal;
use crate::time_math;

/// Passive spawn/reap counters, observation-only - not part of the
/// supervised state machine and not read by any scheduling decision.
/// Exists so tests can assert how many restart cycles occurred without
/// scraping log output.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub spawns: u64,
    pub reaps: u64,
}

pub struct Supervisor {
    identity: String,
    to_stderr: bool,
    child_mgr: ChildManager,
    child: Option<child::Child>,
    backoff: BackoffState,
    stdout_buf: LineBuffer,
    stderr_buf: LineBuffer,
    stop: bool,
    /// Signal most recently forwarded as part of a shutdown request, so the
    /// matching "child got signal" notice can be suppressed per spec §4.4.
    shutdown_signal: Option<i32>,
    stats: RunStats,
}

impl Supervisor {
    pub fn new(
        identity: String,
        to_stderr: bool,
        command: &[String],
        restart_initial: crate::interval::Interval,
        cooloff: crate::interval::Interval,
        maximum: crate::interval::Interval,
    ) -> std::io::Result<Self> {
        Ok(Self {
            identity,
            to_stderr,
            child_mgr: ChildManager::new(command)?,
            child: None,
            backoff: BackoffState::new(restart_initial, cooloff, maximum),
            stdout_buf: LineBuffer::new(),
            stderr_buf: LineBuffer::new(),
            stop: false,
            shutdown_signal: None,
            stats: RunStats::default(),
        })
    }

    /// Spawn/reap counters accumulated so far. Observation-only.
    #[must_use]
    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Run the supervision loop until a shutdown signal has been forwarded
    /// and the child reaped (or there was never a child to wait for). Always
    /// returns 0. Startup failures are reported before this is called, and
    /// nothing that happens inside the loop is treated as fatal (spec §7).
    pub fn run(&mut self) -> i32 {
        self.spawn_child();

        loop {
            let now = clock::now_ns();
            let pending = signal::drain();

            self.handle_info(&pending, now);
            self.forward_if(pending.hup, libc::SIGHUP);
            self.forward_if(pending.usr1, libc::SIGUSR1);
            self.forward_if(pending.usr2, libc::SIGUSR2);

            if pending.int || pending.term {
                self.stop = true;
                if pending.int {
                    self.forward_shutdown(libc::SIGINT);
                }
                if pending.term {
                    self.forward_shutdown(libc::SIGTERM);
                }
                if self.child.is_none() {
                    break;
                }
            }

            if pending.chld {
                self.handle_reap();
                if self.stop {
                    break;
                }
            }

            let timeout = self.wait_timeout(now);
            self.wait_and_relay(timeout);

            if self.child.is_none() && self.deadline_reached() {
                self.spawn_child();
            }
        }

        self.drain_residual_output();
        0
    }

    fn handle_info(&mut self, pending: &signal::Pending, now: u64) {
        if !pending.info {
            return;
        }
        if let Some(child) = &self.child {
            let up = time_math::elapsed_ns(child.started_at_ns, now).unwrap_or(0);
            log::info!(
                "child {} up {}",
                child.pid,
                interval::format(interval::Interval::from_millis(up / 1_000_000))
            );
        } else if let Some(deadline) = self.backoff.deadline_ns() {
            let remaining = time_math::remaining_ns(now, deadline);
            log::info!(
                "restarting in {}",
                interval::format(interval::Interval::from_millis(remaining / 1_000_000))
            );
        }
    }

    fn forward_if(&self, pending: bool, signal: i32) {
        if !pending {
            return;
        }
        if let Some(child) = &self.child {
            if let Err(e) = self.child_mgr.forward(child, signal) {
                log::error!("failed to forward signal {signal} to child: {e}");
            }
        }
    }

    fn forward_shutdown(&mut self, signal: i32) {
        if let Some(child) = &self.child {
            if let Err(e) = self.child_mgr.forward(child, signal) {
                log::error!("failed to forward shutdown signal {signal} to child: {e}");
            }
            self.shutdown_signal = Some(signal);
        }
    }

    fn handle_reap(&mut self) {
        let Some(child) = self.child.take() else {
            return;
        };

        match self.child_mgr.reap(&child) {
            Ok(ReapResult::NoChild) => {
                // Flag was set but nothing was reapable; put the child back.
                self.child = Some(child);
            }
            Ok(ReapResult::Stray(pid)) => {
                log::info!("ignoring reaped pid {pid} (not the supervised child)");
                self.child = Some(child);
            }
            Ok(ReapResult::Exited { code }) => {
                self.stats.reaps += 1;
                if code != 0 {
                    logging::notice(
                        &self.identity,
                        self.to_stderr,
                        &format!("child {} exited with status {code}", child.pid),
                    );
                }
                if code == 127 {
                    self.stop = true;
                }
                self.after_child_gone(child);
            }
            Ok(ReapResult::Signaled { signal }) => {
                self.stats.reaps += 1;
                let suppress = self.stop && self.shutdown_signal == Some(signal);
                if !suppress {
                    logging::notice(
                        &self.identity,
                        self.to_stderr,
                        &format!(
                            "child {} terminated by signal {}",
                            child.pid,
                            signal_name(signal)
                        ),
                    );
                }
                self.after_child_gone(child);
            }
            Err(e) => {
                log::error!("waitpid failed: {e}");
                self.child = Some(child);
            }
        }
    }

    fn after_child_gone(&mut self, child: child::Child) {
        if self.stop {
            return;
        }
        let now = clock::now_ns();
        let applied = self.backoff.on_reap(child.started_at_ns, now);
        log::info!("restarting in {}", interval::format(applied));
    }

    fn wait_timeout(&self, now: u64) -> Option<libc::timespec> {
        if self.child.is_some() {
            return None;
        }
        let deadline = self.backoff.deadline_ns()?;
        let remaining_ns = time_math::remaining_ns(now, deadline);
        Some(libc::timespec {
            tv_sec: (remaining_ns / 1_000_000_000) as libc::time_t,
            tv_nsec: (remaining_ns % 1_000_000_000) as libc::c_long,
        })
    }

    fn deadline_reached(&self) -> bool {
        match self.backoff.deadline_ns() {
            Some(deadline) => time_math::deadline_reached(clock::now_ns(), deadline),
            None => false,
        }
    }

    /// Block on both pipe read ends (or the computed restart timeout) with
    /// the handled signals atomically unblocked for the duration of the
    /// call, then relay whatever became readable. This is the loop's only
    /// suspension point (spec §5).
    fn wait_and_relay(&mut self, timeout: Option<libc::timespec>) {
        let mask = signal::empty_mask();
        let mut fds = [
            libc::pollfd {
                fd: self.child_mgr.stdout_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.child_mgr.stderr_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        let timeout_ptr = timeout
            .as_ref()
            .map_or(std::ptr::null(), |t| t as *const libc::timespec);

        // SAFETY: fds is a valid 2-element array kept alive for the call;
        // timeout_ptr is either null or points at a live stack value; mask
        // is a fully-initialized sigset_t.
        let ready = unsafe {
            libc::ppoll(
                fds.as_mut_ptr(),
                fds.len() as libc::nfds_t,
                timeout_ptr,
                &mask,
            )
        };

        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                log::error!("ppoll failed: {err}");
            }
            return;
        }
        if ready == 0 {
            return;
        }

        if fds[0].revents & libc::POLLIN != 0 {
            self.relay_stdout();
        }
        if fds[1].revents & libc::POLLIN != 0 {
            self.relay_stderr();
        }
    }

    fn relay_stdout(&mut self) {
        if let Err(e) = self.stdout_buf.fill(self.child_mgr.stdout_fd()) {
            log::error!("reading child stdout: {e}");
            return;
        }
        self.stdout_buf.flush(|line| {
            log::info!("{}", String::from_utf8_lossy(line));
        });
    }

    fn relay_stderr(&mut self) {
        if let Err(e) = self.stderr_buf.fill(self.child_mgr.stderr_fd()) {
            log::error!("reading child stderr: {e}");
            return;
        }
        let identity = self.identity.clone();
        let to_stderr = self.to_stderr;
        self.stderr_buf.flush(|line| {
            logging::notice(&identity, to_stderr, &String::from_utf8_lossy(line));
        });
    }

    fn spawn_child(&mut self) {
        match self.child_mgr.spawn() {
            Ok(child) => {
                self.backoff.clear_deadline();
                self.child = Some(child);
                self.stats.spawns += 1;
            }
            Err(e) => {
                log::error!("failed to spawn child: {e}");
            }
        }
    }

    /// Last call before exit (spec §4.6): pull whatever is left in both
    /// pipes and flush both buffers fully, including any unterminated tail,
    /// since there is no further `fill` to complete a trailing partial line.
    fn drain_residual_output(&mut self) {
        let stdout_fd: RawFd = self.child_mgr.stdout_fd();
        let stderr_fd: RawFd = self.child_mgr.stderr_fd();
        let _ = self.stdout_buf.fill(stdout_fd);
        let identity = self.identity.clone();
        let to_stderr = self.to_stderr;
        self.stdout_buf.flush_final(|line| {
            log::info!("{}", String::from_utf8_lossy(line));
        });
        let _ = self.stderr_buf.fill(stderr_fd);
        self.stderr_buf.flush_final(|line| {
            logging::notice(&identity, to_stderr, &String::from_utf8_lossy(line));
        });
    }
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGHUP => "HUP",
        libc::SIGINT => "INT",
        libc::SIGQUIT => "QUIT",
        libc::SIGILL => "ILL",
        libc::SIGABRT => "ABRT",
        libc::SIGFPE => "FPE",
        libc::SIGKILL => "KILL",
        libc::SIGSEGV => "SEGV",
        libc::SIGPIPE => "PIPE",
        libc::SIGALRM => "ALRM",
        libc::SIGTERM => "TERM",
        libc::SIGUSR1 => "USR1",
        libc::SIGUSR2 => "USR2",
        libc::SIGCHLD => "CHLD",
        libc::SIGCONT => "CONT",
        libc::SIGSTOP => "STOP",
        _ => "UNKNOWN",
    }
}
