use {
    std::{
        error::Error,
        fmt::{Display, Formatter},
        io,
    },
    uapi::{Errno, c},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OsError(pub c::c_int);

impl OsError {
    pub fn last() -> Self {
        Self(io::Error::last_os_error().raw_os_error().unwrap_or(c::EIO))
    }
}

impl From<Errno> for OsError {
    fn from(e: Errno) -> Self {
        Self(e.0)
    }
}

impl Display for OsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&io::Error::from_raw_os_error(self.0), f)
    }
}

impl Error for OsError {}
