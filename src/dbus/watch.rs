use {
    std::{
        cell::Cell,
        ops::{BitAnd, BitOr, BitOrAssign},
        rc::Rc,
    },
    uapi::c,
};

/// Readiness conditions of a file descriptor.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct WatchFlags(pub u32);

impl WatchFlags {
    pub const NONE: Self = Self(0);
    pub const READABLE: Self = Self(1);
    pub const WRITABLE: Self = Self(2);
    pub const ERROR: Self = Self(4);
    pub const HANGUP: Self = Self(8);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for WatchFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for WatchFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for WatchFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

/// A file descriptor the connection wants to be woken up for.
#[derive(Debug)]
pub struct Watch {
    fd: c::c_int,
    flags: WatchFlags,
    enabled: Cell<bool>,
}

impl Watch {
    pub fn new(fd: c::c_int, flags: WatchFlags) -> Rc<Self> {
        Rc::new(Self {
            fd,
            flags,
            enabled: Cell::new(true),
        })
    }

    pub fn fd(&self) -> c::c_int {
        self.fd
    }

    pub fn flags(&self) -> WatchFlags {
        self.flags
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatchStatus {
    DataRemains,
    Complete,
}

/// Receives watches as a connection creates and destroys them.
pub trait WatchListener {
    fn add_watch(&self, watch: &Rc<Watch>);
    fn remove_watch(&self, watch: &Rc<Watch>);
}

/// The reactor-facing half of a connection.
pub trait WatchSource {
    /// Whether parsed messages are waiting to be dispatched.
    fn dispatch_status(&self) -> DispatchStatus;

    /// Performs the I/O for `watch` given the conditions that are ready.
    fn handle_watch(&self, watch: &Watch, flags: WatchFlags);

    /// Dispatches at most one queued message.
    fn dispatch(&self) -> DispatchStatus;
}
