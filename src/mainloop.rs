
use {
    crate::utils::oserror::OsError,
    std::{collections::BTreeSet, time::Duration},
    thiserror::Error,
    uapi::{Errno, c},
};

pub const READ_FD_SET: u32 = 1 << 0;
pub const WRITE_FD_SET: u32 = 1 << 1;
pub const ERROR_FD_SET: u32 = 1 << 2;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MainloopError {
    #[error("poll failed")]
    Poll(#[source] OsError),
}

/// A set of file descriptors in the style of `fd_set`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FdSet {
    fds: BTreeSet<c::c_int>,
}

impl FdSet {
    pub fn insert(&mut self, fd: c::c_int) {
        self.fds.insert(fd);
    }

    pub fn remove(&mut self, fd: c::c_int) {
        self.fds.remove(&fd);
    }

    pub fn contains(&self, fd: c::c_int) -> bool {
        self.fds.contains(&fd)
    }

    pub fn clear(&mut self) {
        self.fds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = c::c_int> + '_ {
        self.fds.iter().copied()
    }
}

/// The readiness sets of one loop iteration.
///
/// Before `poll` the sets hold the descriptors of interest. After `poll`
/// they hold the descriptors that are ready.
#[derive(Clone, Debug)]
pub struct MainloopContext {
    pub read_fds: FdSet,
    pub write_fds: FdSet,
    pub error_fds: FdSet,
    pub max_fd: c::c_int,
    pub timeout: Duration,
}

impl Default for MainloopContext {
    fn default() -> Self {
        Self {
            read_fds: Default::default(),
            write_fds: Default::default(),
            error_fds: Default::default(),
            max_fd: -1,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MainloopContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the sets for a new iteration.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add_fd_to_set(&mut self, fd: c::c_int, mask: u32) {
        if mask & READ_FD_SET != 0 {
            self.read_fds.insert(fd);
        }
        if mask & WRITE_FD_SET != 0 {
            self.write_fds.insert(fd);
        }
        if mask & ERROR_FD_SET != 0 {
            self.error_fds.insert(fd);
        }
        self.max_fd = self.max_fd.max(fd);
    }

    pub fn set_timeout_if_earlier(&mut self, timeout: Duration) {
        self.timeout = self.timeout.min(timeout);
    }

    /// Waits until a descriptor is ready or the timeout passes.
    pub fn poll(&mut self) -> Result<(), MainloopError> {
        let mut fds: BTreeSet<c::c_int> = self.read_fds.fds.clone();
        fds.extend(self.write_fds.iter());
        fds.extend(self.error_fds.iter());
        let mut pollfds: Vec<_> = fds
            .into_iter()
            .map(|fd| {
                let mut events = 0;
                if self.read_fds.contains(fd) {
                    events |= c::POLLIN;
                }
                if self.write_fds.contains(fd) {
                    events |= c::POLLOUT;
                }
                c::pollfd {
                    fd,
                    events,
                    revents: 0,
                }
            })
            .collect();
        let timeout = self.timeout.as_millis().min(c::c_int::MAX as u128) as c::c_int;
        let res = uapi::poll(&mut pollfds, timeout);
        let read = std::mem::take(&mut self.read_fds);
        let write = std::mem::take(&mut self.write_fds);
        let error = std::mem::take(&mut self.error_fds);
        match res {
            Ok(_) => {}
            Err(Errno(c::EINTR)) => return Ok(()),
            Err(e) => return Err(MainloopError::Poll(e.into())),
        }
        for p in &pollfds {
            if read.contains(p.fd) && p.revents & (c::POLLIN | c::POLLHUP) != 0 {
                self.read_fds.insert(p.fd);
            }
            if write.contains(p.fd) && p.revents & c::POLLOUT != 0 {
                self.write_fds.insert(p.fd);
            }
            if error.contains(p.fd) && p.revents & (c::POLLERR | c::POLLHUP | c::POLLNVAL) != 0 {
                self.error_fds.insert(p.fd);
            }
        }
        Ok(())
    }
}
