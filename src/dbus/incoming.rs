use {
    crate::dbus::{DbusError, IncomingMessage, message::FIXED_HEADER_SIZE},
    std::{collections::VecDeque, rc::Rc},
    uapi::{Errno, c},
};

const READ_SIZE: usize = 4096;

/// Bytes read from the socket and the messages framed from them.
#[derive(Default)]
pub(super) struct Incoming {
    buf: Vec<u8>,
    msgs: VecDeque<Rc<IncomingMessage>>,
}

impl Incoming {
    /// Reads until the socket would block and frames every complete message.
    pub fn read_from(&mut self, fd: c::c_int) -> Result<(), DbusError> {
        let mut chunk = [0u8; READ_SIZE];
        loop {
            match uapi::read(fd, &mut chunk[..]) {
                Ok(n) if n.is_empty() => {
                    self.frame()?;
                    return Err(DbusError::Closed);
                }
                Ok(n) => {
                    let n = n.len();
                    self.buf.extend_from_slice(&chunk[..n]);
                }
                Err(Errno(c::EAGAIN)) => break,
                Err(Errno(c::EINTR)) => {}
                Err(e) => return Err(DbusError::ReadError(e.into())),
            }
        }
        self.frame()
    }

    fn frame(&mut self) -> Result<(), DbusError> {
        let mut start = 0;
        while let Some(fixed) = self.buf[start..].first_chunk::<FIXED_HEADER_SIZE>() {
            let len = IncomingMessage::frame_len(fixed)?;
            if self.buf.len() - start < len {
                break;
            }
            let msg = IncomingMessage::parse(&self.buf[start..start + len])?;
            self.msgs.push_back(Rc::new(msg));
            start += len;
        }
        self.buf.drain(..start);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.msgs.is_empty()
    }

    pub fn pop(&mut self) -> Option<Rc<IncomingMessage>> {
        self.msgs.pop_front()
    }

    /// Removes the reply to the call with `serial` from the queue.
    pub fn take_reply(&mut self, serial: u32) -> Option<Rc<IncomingMessage>> {
        let idx = self
            .msgs
            .iter()
            .position(|m| m.reply_serial() == Some(serial))?;
        self.msgs.remove(idx)
    }
}
