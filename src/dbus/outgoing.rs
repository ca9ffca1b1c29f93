use {
    crate::dbus::DbusError,
    std::collections::VecDeque,
    uapi::{Errno, c},
};

/// Serialized messages waiting to be written.
#[derive(Default)]
pub(super) struct Outgoing {
    msgs: VecDeque<Vec<u8>>,
    offset: usize,
}

impl Outgoing {
    pub fn push(&mut self, buf: Vec<u8>) {
        self.msgs.push_back(buf);
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    /// Writes until the queue is empty or the socket would block.
    pub fn flush_to(&mut self, fd: c::c_int) -> Result<(), DbusError> {
        while let Some(msg) = self.msgs.front() {
            match uapi::write(fd, &msg[self.offset..]) {
                Ok(n) => {
                    self.offset += n;
                    if self.offset == msg.len() {
                        self.msgs.pop_front();
                        self.offset = 0;
                    }
                }
                Err(Errno(c::EAGAIN)) => break,
                Err(Errno(c::EINTR)) => {}
                Err(e) => return Err(DbusError::WriteError(e.into())),
            }
        }
        Ok(())
    }
}
