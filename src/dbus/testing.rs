use {
    crate::dbus::{
        DbusConnection, DbusError, DbusRequest, IncomingMessage, OutgoingMessage,
        message::FIXED_HEADER_SIZE,
    },
    std::{
        cell::{Cell, RefCell},
        rc::Rc,
    },
    uapi::c,
};

/// A connection that keeps every message sent through it.
#[derive(Default)]
pub struct RecordingConnection {
    next_serial: Cell<u32>,
    sent: RefCell<Vec<Rc<IncomingMessage>>>,
}

impl RecordingConnection {
    pub fn new() -> (Rc<Self>, Rc<dyn DbusConnection>) {
        let slf = Rc::new(Self::default());
        let conn: Rc<dyn DbusConnection> = slf.clone();
        (slf, conn)
    }

    pub fn take(&self) -> Vec<Rc<IncomingMessage>> {
        self.sent.take()
    }
}

impl DbusConnection for RecordingConnection {
    fn send(&self, msg: &OutgoingMessage) -> Result<u32, DbusError> {
        let serial = self.next_serial.get() + 1;
        self.next_serial.set(serial);
        let parsed = IncomingMessage::parse(&msg.serialize(serial))?;
        self.sent.borrow_mut().push(Rc::new(parsed));
        Ok(serial)
    }
}

/// Turns `msg` into the message a peer would receive.
pub fn receive(msg: &OutgoingMessage, serial: u32) -> Rc<IncomingMessage> {
    Rc::new(IncomingMessage::parse(&msg.serialize(serial)).unwrap())
}

pub fn request(conn: &Rc<dyn DbusConnection>, msg: &OutgoingMessage) -> DbusRequest {
    DbusRequest::new(conn, &receive(msg, 100))
}

/// Reads everything available on the peer end of a socketpair.
pub fn read_messages(fd: c::c_int) -> Vec<IncomingMessage> {
    let mut buf = vec![];
    let mut chunk = [0u8; 4096];
    while let Ok(n) = uapi::read(fd, &mut chunk[..]) {
        if n.is_empty() {
            break;
        }
        let n = n.len();
        buf.extend_from_slice(&chunk[..n]);
    }
    let mut msgs = vec![];
    let mut rest = &buf[..];
    while let Some(fixed) = rest.first_chunk::<FIXED_HEADER_SIZE>() {
        let len = IncomingMessage::frame_len(fixed).unwrap();
        msgs.push(IncomingMessage::parse(&rest[..len]).unwrap());
        rest = &rest[len..];
    }
    msgs
}
