use {
    crate::{
        dbus::{DbusError, socket::wait_fd},
        utils::hex,
    },
    std::{io::Write, time::Instant},
    uapi::{Errno, c},
};

const BUF_SIZE: usize = 128;

/// Runs the SASL EXTERNAL handshake on a freshly connected socket.
pub(super) fn authenticate(fd: c::c_int, bus_name: &str, deadline: Instant) -> Result<(), DbusError> {
    let mut auth = Auth {
        fd,
        deadline,
        buf: [0; BUF_SIZE],
        buf_start: 0,
        buf_stop: 0,
    };
    auth.run()?;
    log::info!("{}: Authenticated", bus_name);
    Ok(())
}

struct Auth {
    fd: c::c_int,
    deadline: Instant,

    buf: [u8; BUF_SIZE],
    buf_start: usize,
    buf_stop: usize,
}

impl Auth {
    fn run(&mut self) -> Result<(), DbusError> {
        let uid = hex::to_hex(&uapi::getuid().to_string());
        let mut out_buf = Vec::new();
        let _ = write!(out_buf, "\0AUTH EXTERNAL {}\r\n", uid);
        self.write_buf(&mut out_buf)?;
        let line = self.readline()?;
        let (cmd, _) = line_to_cmd(&line);
        if cmd != "OK" {
            return Err(DbusError::Auth);
        }
        let _ = write!(out_buf, "BEGIN\r\n");
        self.write_buf(&mut out_buf)?;
        Ok(())
    }

    fn readline(&mut self) -> Result<String, DbusError> {
        let mut s = String::new();
        loop {
            for i in self.buf_start..self.buf_stop {
                let c = self.buf[i] as char;
                s.push(c);
                if c == '\n' {
                    self.buf_start = i + 1;
                    return Ok(s);
                }
            }
            self.buf_start = 0;
            self.buf_stop = 0;
            match uapi::read(self.fd, &mut self.buf[..]) {
                Ok([]) => return Err(DbusError::Closed),
                Ok(n) => self.buf_stop = n.len(),
                Err(Errno(c::EAGAIN)) => wait_fd(self.fd, c::POLLIN, self.deadline)?,
                Err(Errno(c::EINTR)) => {}
                Err(e) => return Err(DbusError::ReadError(e.into())),
            }
        }
    }

    fn write_buf(&mut self, buf: &mut Vec<u8>) -> Result<(), DbusError> {
        let mut start = 0;
        while start < buf.len() {
            match uapi::write(self.fd, &buf[start..]) {
                Ok(n) => start += n,
                Err(Errno(c::EAGAIN)) => wait_fd(self.fd, c::POLLOUT, self.deadline)?,
                Err(Errno(c::EINTR)) => {}
                Err(e) => return Err(DbusError::WriteError(e.into())),
            }
        }
        buf.clear();
        Ok(())
    }
}

fn line_to_cmd(line: &str) -> (&str, &str) {
    let line = line.trim();
    line.split_once(' ').unwrap_or((line, ""))
}
