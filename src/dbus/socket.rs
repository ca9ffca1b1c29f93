use {
    crate::{
        dbus::{
            BUS_DEST, BUS_INTERFACE, BUS_PATH, DbusConnection, DbusError, DbusObject, DbusRequest,
            DbusType, DispatchStatus, ERROR_UNKNOWN_METHOD, IncomingMessage, MessageType,
            OutgoingMessage, PEER_INTERFACE, Variant, Watch, WatchFlags, WatchListener,
            WatchSource, auth, incoming::Incoming, object::HandlerResult, outgoing::Outgoing,
            property,
        },
        utils::errorfmt::ErrorFmt,
    },
    ahash::AHashMap,
    std::{
        cell::{Cell, RefCell},
        mem,
        rc::{Rc, Weak},
        slice,
        time::{Duration, Instant},
    },
    uapi::{Errno, OwnedFd, c},
};

const DBUS_NAME_FLAG_DO_NOT_QUEUE: u32 = 4;
const DBUS_REQUEST_NAME_REPLY_PRIMARY_OWNER: u32 = 1;
const DBUS_REQUEST_NAME_REPLY_ALREADY_OWNER: u32 = 4;

type ReplyHandler = Box<dyn FnOnce(Result<Rc<IncomingMessage>, DbusError>)>;

/// A connection to a message bus over a Unix stream socket.
pub struct DbusSocket {
    slf: Weak<DbusSocket>,
    pub(super) bus_name: String,
    fd: OwnedFd,
    unique_name: RefCell<Option<String>>,
    next_serial: Cell<u32>,
    dead: Cell<bool>,
    incoming: RefCell<Incoming>,
    outgoing: RefCell<Outgoing>,
    reply_handlers: RefCell<AHashMap<u32, ReplyHandler>>,
    objects: RefCell<AHashMap<String, Rc<DbusObject>>>,
    listener: RefCell<Option<Rc<dyn WatchListener>>>,
    read_watch: Rc<Watch>,
    write_watch: Rc<Watch>,
    write_watch_added: Cell<bool>,
}

impl DbusSocket {
    /// Connects to the bus listening at `path` and completes the handshake.
    pub fn connect(path: &str, bus_name: &str, timeout: Duration) -> Result<Rc<Self>, DbusError> {
        let socket = match uapi::socket(
            c::AF_UNIX,
            c::SOCK_STREAM | c::SOCK_CLOEXEC | c::SOCK_NONBLOCK,
            0,
        ) {
            Ok(s) => s,
            Err(e) => return Err(DbusError::Socket(e.into())),
        };
        let mut addr: c::sockaddr_un = uapi::pod_zeroed();
        addr.sun_family = c::AF_UNIX as _;
        if path.len() >= addr.sun_path.len() {
            return Err(DbusError::PathTooLong);
        }
        let sun_path = uapi::as_bytes_mut(&mut addr.sun_path[..]);
        sun_path[..path.len()].copy_from_slice(path.as_bytes());
        sun_path[path.len()] = 0;
        if let Err(e) = uapi::connect(socket.raw(), &addr) {
            return Err(DbusError::Connect(e.into()));
        }
        let deadline = Instant::now() + timeout;
        auth::authenticate(socket.raw(), bus_name, deadline)?;
        let slf = Self::from_fd(socket, bus_name);
        slf.hello(deadline)?;
        Ok(slf)
    }

    /// Wraps an already authenticated, non-blocking socket.
    pub fn from_fd(fd: OwnedFd, bus_name: &str) -> Rc<Self> {
        let raw = fd.raw();
        Rc::new_cyclic(|slf| Self {
            slf: slf.clone(),
            bus_name: bus_name.to_owned(),
            fd,
            unique_name: Default::default(),
            next_serial: Cell::new(1),
            dead: Cell::new(false),
            incoming: Default::default(),
            outgoing: Default::default(),
            reply_handlers: Default::default(),
            objects: Default::default(),
            listener: Default::default(),
            read_watch: Watch::new(raw, WatchFlags::READABLE),
            write_watch: Watch::new(raw, WatchFlags::WRITABLE),
            write_watch_added: Cell::new(false),
        })
    }

    pub fn bus_name(&self) -> &str {
        &self.bus_name
    }

    pub fn unique_name(&self) -> Option<String> {
        self.unique_name.borrow().clone()
    }

    pub fn is_dead(&self) -> bool {
        self.dead.get()
    }

    /// This socket as the handle that requests and objects hold.
    pub fn connection(self: &Rc<Self>) -> Rc<dyn DbusConnection> {
        self.clone()
    }

    fn hello(&self, deadline: Instant) -> Result<(), DbusError> {
        let msg = OutgoingMessage::method_call(BUS_DEST, BUS_PATH, BUS_INTERFACE, "Hello");
        let reply = self.call_until(&msg, deadline)?;
        let (name,): (String,) = reply.read_body()?;
        log::info!("{}: Unique name is {}", self.bus_name, name);
        *self.unique_name.borrow_mut() = Some(name);
        Ok(())
    }

    /// Claims the well-known `name` without queueing behind another owner.
    pub fn request_name(&self, name: &str, timeout: Duration) -> Result<(), DbusError> {
        let mut msg =
            OutgoingMessage::method_call(BUS_DEST, BUS_PATH, BUS_INTERFACE, "RequestName");
        msg.append(&(name.to_owned(), DBUS_NAME_FLAG_DO_NOT_QUEUE));
        let reply = self.call_blocking(&msg, timeout)?;
        let (res,): (u32,) = reply.read_body()?;
        match res {
            DBUS_REQUEST_NAME_REPLY_PRIMARY_OWNER | DBUS_REQUEST_NAME_REPLY_ALREADY_OWNER => {
                log::info!("{}: Acquired name {}", self.bus_name, name);
                Ok(())
            }
            _ => Err(DbusError::NameNotAcquired(name.to_owned(), res)),
        }
    }

    /// Sends `msg` and runs `f` once the reply or an error arrives.
    pub fn call<F>(&self, msg: &OutgoingMessage, f: F)
    where
        F: FnOnce(Result<Rc<IncomingMessage>, DbusError>) + 'static,
    {
        match self.send(msg) {
            Ok(serial) => {
                self.reply_handlers.borrow_mut().insert(serial, Box::new(f));
            }
            Err(e) => f(Err(e)),
        }
    }

    /// Sends `msg` and waits for its reply without dispatching anything else.
    ///
    /// Messages that arrive in the meantime stay queued for `dispatch`.
    pub fn call_blocking(
        &self,
        msg: &OutgoingMessage,
        timeout: Duration,
    ) -> Result<Rc<IncomingMessage>, DbusError> {
        self.call_until(msg, Instant::now() + timeout)
    }

    fn call_until(
        &self,
        msg: &OutgoingMessage,
        deadline: Instant,
    ) -> Result<Rc<IncomingMessage>, DbusError> {
        let serial = self.send(msg)?;
        loop {
            if let Some(reply) = self.incoming.borrow_mut().take_reply(serial) {
                return match reply.msg_type() {
                    MessageType::Error => Err(DbusError::CallError(reply.call_error())),
                    _ => Ok(reply),
                };
            }
            if self.dead.get() {
                return Err(DbusError::Killed);
            }
            let mut events = c::POLLIN;
            if !self.outgoing.borrow().is_empty() {
                events |= c::POLLOUT;
            }
            wait_fd(self.fd.raw(), events, deadline)?;
            self.flush()?;
            let res = self.incoming.borrow_mut().read_from(self.fd.raw());
            if let Err(e) = res {
                self.kill();
                return Err(e);
            }
        }
    }

    /// Reads a property of a remote object.
    pub fn get_property(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Variant, DbusError> {
        let msg = property::get_call(destination, path, interface, name);
        let reply = self.call_blocking(&msg, timeout)?;
        let (value,): (Variant,) = reply.read_body()?;
        Ok(value)
    }

    /// Reads a property of a remote object that must have type `T`.
    pub fn get_property_as<T: DbusType>(
        &self,
        destination: &str,
        path: &str,
        interface: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<T, DbusError> {
        let msg = property::get_call(destination, path, interface, name);
        let reply = self.call_blocking(&msg, timeout)?;
        let mut parser = reply.parser();
        let value = parser.read_variant_as()?;
        if !parser.eof() {
            return Err(DbusError::TrailingData);
        }
        Ok(value)
    }

    pub fn add_object(&self, object: Rc<DbusObject>) {
        let path = object.path().to_owned();
        log::debug!("{}: Serving object {}", self.bus_name, path);
        self.objects.borrow_mut().insert(path, object);
    }

    pub fn remove_object(&self, path: &str) -> Option<Rc<DbusObject>> {
        self.objects.borrow_mut().remove(path)
    }

    /// Installs the listener that tracks this socket's watches.
    pub fn set_watch_listener(&self, listener: Rc<dyn WatchListener>) {
        let old = self.listener.borrow_mut().take();
        if let Some(old) = old {
            old.remove_watch(&self.read_watch);
            if self.write_watch_added.get() {
                old.remove_watch(&self.write_watch);
            }
        }
        self.write_watch_added.set(false);
        if self.dead.get() {
            return;
        }
        listener.add_watch(&self.read_watch);
        *self.listener.borrow_mut() = Some(listener);
        self.update_write_watch();
    }

    pub fn kill(&self) {
        if self.dead.replace(true) {
            return;
        }
        log::info!("{}: Connection closed", self.bus_name);
        let _ = uapi::shutdown(self.fd.raw(), c::SHUT_RDWR);
        let listener = self.listener.borrow_mut().take();
        if let Some(listener) = listener {
            listener.remove_watch(&self.read_watch);
            if self.write_watch_added.replace(false) {
                listener.remove_watch(&self.write_watch);
            }
        }
        let handlers = mem::take(&mut *self.reply_handlers.borrow_mut());
        for (_, handler) in handlers {
            handler(Err(DbusError::Killed));
        }
        self.objects.borrow_mut().clear();
    }

    fn serial(&self) -> u32 {
        let serial = self.next_serial.get();
        self.next_serial.set(serial.checked_add(1).unwrap_or(1));
        serial
    }

    fn flush(&self) -> Result<(), DbusError> {
        let res = self.outgoing.borrow_mut().flush_to(self.fd.raw());
        if let Err(e) = res {
            log::error!(
                "{}: Could not send a message to the bus: {}",
                self.bus_name,
                ErrorFmt(&e)
            );
            self.kill();
            return Err(e);
        }
        self.update_write_watch();
        Ok(())
    }

    fn update_write_watch(&self) {
        let listener = self.listener.borrow().clone();
        let Some(listener) = listener else {
            return;
        };
        let pending = !self.outgoing.borrow().is_empty();
        if pending != self.write_watch_added.get() {
            self.write_watch_added.set(pending);
            if pending {
                listener.add_watch(&self.write_watch);
            } else {
                listener.remove_watch(&self.write_watch);
            }
        }
    }

    fn handle_call(&self, msg: &Rc<IncomingMessage>) {
        let Some(slf) = self.slf.upgrade() else {
            return;
        };
        let conn: Rc<dyn DbusConnection> = slf;
        let request = DbusRequest::new(&conn, msg);
        if msg.interface() == Some(PEER_INTERFACE) && msg.member() == Some("Ping") {
            request.reply(&());
            return;
        }
        let object = msg
            .path()
            .and_then(|path| self.objects.borrow().get(path).cloned());
        let res = match object {
            Some(object) => object.handle(&request),
            None => HandlerResult::NotHandled,
        };
        if res == HandlerResult::NotHandled {
            log::debug!(
                "{}: No handler for {}.{} on {}",
                self.bus_name,
                msg.interface().unwrap_or_default(),
                msg.member().unwrap_or_default(),
                msg.path().unwrap_or_default(),
            );
            if msg.expects_reply() {
                let text = format!(
                    "No method {}.{} on object {}",
                    msg.interface().unwrap_or_default(),
                    msg.member().unwrap_or_default(),
                    msg.path().unwrap_or_default(),
                );
                request.reply_error(ERROR_UNKNOWN_METHOD, Some(&text));
            }
        }
    }

    fn handle_reply(&self, msg: Rc<IncomingMessage>) {
        let Some(serial) = msg.reply_serial() else {
            return;
        };
        let handler = self.reply_handlers.borrow_mut().remove(&serial);
        let Some(handler) = handler else {
            log::trace!("{}: Ignoring reply to unknown serial {}", self.bus_name, serial);
            return;
        };
        match msg.msg_type() {
            MessageType::Error => handler(Err(DbusError::CallError(msg.call_error()))),
            _ => handler(Ok(msg)),
        }
    }
}

impl DbusConnection for DbusSocket {
    fn send(&self, msg: &OutgoingMessage) -> Result<u32, DbusError> {
        if self.dead.get() {
            return Err(DbusError::Killed);
        }
        let serial = self.serial();
        self.outgoing.borrow_mut().push(msg.serialize(serial));
        self.flush()?;
        Ok(serial)
    }
}

impl WatchSource for DbusSocket {
    fn dispatch_status(&self) -> DispatchStatus {
        if self.incoming.borrow().is_empty() {
            DispatchStatus::Complete
        } else {
            DispatchStatus::DataRemains
        }
    }

    fn handle_watch(&self, watch: &Watch, flags: WatchFlags) {
        if self.dead.get() || watch.fd() != self.fd.raw() {
            return;
        }
        if flags.intersects(WatchFlags::READABLE | WatchFlags::ERROR | WatchFlags::HANGUP) {
            let res = self.incoming.borrow_mut().read_from(self.fd.raw());
            if let Err(e) = res {
                if !matches!(e, DbusError::Closed) {
                    log::error!(
                        "{}: Could not process incoming data: {}",
                        self.bus_name,
                        ErrorFmt(&e)
                    );
                }
                self.kill();
                return;
            }
        }
        if flags.contains(WatchFlags::WRITABLE) {
            let _ = self.flush();
        }
    }

    fn dispatch(&self) -> DispatchStatus {
        let msg = self.incoming.borrow_mut().pop();
        if let Some(msg) = msg {
            match msg.msg_type() {
                MessageType::MethodCall => self.handle_call(&msg),
                MessageType::MethodReturn | MessageType::Error => self.handle_reply(msg),
                MessageType::Signal => log::trace!(
                    "{}: Ignoring signal {}.{}",
                    self.bus_name,
                    msg.interface().unwrap_or_default(),
                    msg.member().unwrap_or_default(),
                ),
            }
        }
        self.dispatch_status()
    }
}

/// Blocks until `fd` reports one of `events` or `deadline` passes.
pub(super) fn wait_fd(
    fd: c::c_int,
    events: c::c_short,
    deadline: Instant,
) -> Result<(), DbusError> {
    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
        return Err(DbusError::Timeout);
    };
    let timeout = remaining.as_millis().min(c::c_int::MAX as u128) as c::c_int;
    let mut pollfd = c::pollfd {
        fd,
        events,
        revents: 0,
    };
    match uapi::poll(slice::from_mut(&mut pollfd), timeout) {
        Ok(0) => Err(DbusError::Timeout),
        Ok(_) | Err(Errno(c::EINTR)) => Ok(()),
        Err(e) => Err(DbusError::PollError(e.into())),
    }
}
