/*
 * linebuf.rs
 *
 * Fixed-capacity byte accumulator for one pipe. `fill` pulls bytes in
 * non-blocking; `flush` carves complete lines out of what's accumulated and
 * hands them to the log sink one at a time. A line that never terminates
 * (pathological producer, or capacity reached) still gets emitted once the
 * buffer is full, so a single chatty child can't wedge log relaying.
 */

use std::io::{self, Read};
use std::os::unix::io::RawFd;

/// Matches spec §3: 1024 bytes, invariant `length < capacity` after flush.
pub const CAPACITY: usize = 1024;

pub struct LineBuffer {
    buf: [u8; CAPACITY],
    len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0u8; CAPACITY],
            len: 0,
        }
    }

    /// Read up to `CAPACITY - 1 - len` bytes from `fd` into the tail.
    ///
    /// `EAGAIN`/`EWOULDBLOCK` is not an error - it just means nothing was
    /// readable this time. Any other error is returned to the caller (who
    /// logs it at error priority per spec §4.2/§7) and the buffer is left
    /// untouched. A partial read fills in whatever bytes arrived.
    pub fn fill(&mut self, fd: RawFd) -> io::Result<()> {
        let room = CAPACITY - 1 - self.len;
        if room == 0 {
            return Ok(());
        }

        // SAFETY: `fd` is a valid, non-blocking, supervisor-owned pipe read
        // end for the lifetime of this call. `read` writes at most `room`
        // bytes starting at `buf[self.len..]`, which is in bounds.
        let n = unsafe {
            libc::read(
                fd,
                self.buf.as_mut_ptr().add(self.len).cast(),
                room,
            )
        };

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(());
            }
            return Err(err);
        }

        #[allow(clippy::cast_sign_loss)]
        {
            self.len += n as usize;
        }
        Ok(())
    }

    /// Emit every complete line currently buffered to `sink`, in order.
    ///
    /// If the buffer fills completely with no newline, the whole buffer is
    /// emitted as one record and cleared - forward progress guarantee from
    /// spec §4.2.
    pub fn flush(&mut self, mut sink: impl FnMut(&[u8])) {
        let mut start = 0;
        while let Some(rel_nl) = self.buf[start..self.len].iter().position(|&b| b == b'\n') {
            let nl = start + rel_nl;
            sink(&self.buf[start..nl]);
            start = nl + 1;
        }

        if start == 0 && self.len == CAPACITY - 1 {
            // Scanned the whole buffer, found no newline, and there's no
            // room left to grow it further: force progress.
            sink(&self.buf[..self.len]);
            self.len = 0;
            return;
        }

        self.drop_emitted(start);
    }

    /// Like `flush`, but additionally emits whatever unterminated tail
    /// remains after all complete lines have been carved out, instead of
    /// holding it back for the next `fill`. Used only at shutdown (spec
    /// §4.6's exit sequence), where there is no "next" read to complete the
    /// line: a stream ending without a trailing newline must still produce
    /// one final record for its last partial line.
    pub fn flush_final(&mut self, mut sink: impl FnMut(&[u8])) {
        self.flush(&mut sink);
        if self.len > 0 {
            sink(&self.buf[..self.len]);
            self.len = 0;
        }
    }

    fn drop_emitted(&mut self, start: usize) {
        if start == 0 {
            return;
        }
        self.buf.copy_within(start..self.len, 0);
        self.len -= start;
    }

    #[cfg(test)]
    fn push_raw(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(CAPACITY - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
    }
}

/// A [`std::io::Read`] wrapper used in tests to exercise `fill` without a
/// real pipe fd - `fill` itself always goes through the raw fd, but the
/// parsing/flush logic is fd-agnostic and worth testing directly.
#[cfg(test)]
struct SliceSource<'a> {
    data: &'a [u8],
}

#[cfg(test)]
impl Read for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}
