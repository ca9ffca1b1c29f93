#[cfg(test)]
mod tests;

use {
    crate::{
        dbus::{
            DbusError, DbusSocket, DispatchStatus, Watch, WatchFlags, WatchListener, WatchSource,
        },
        mainloop::{ERROR_FD_SET, MainloopContext, READ_FD_SET, WRITE_FD_SET},
        thread::{ThreadController, ThreadObject, names},
        utils::errorfmt::ErrorFmt,
    },
    std::{
        cell::RefCell,
        rc::Rc,
        time::{Duration, Instant},
    },
    thiserror::Error,
};

pub const DEFAULT_INTERFACE_NAME: &str = "wpan0";
pub const DEFAULT_SYSTEM_BUS_SOCKET: &str = "/var/run/dbus/system_bus_socket";
pub const DEFAULT_WAIT_ALLOWANCE: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

const SYSTEM_BUS_ADDRESS_VAR: &str = "DBUS_SYSTEM_BUS_ADDRESS";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Could not connect to the bus within {allowance:?}")]
    ConnectTimeout {
        allowance: Duration,
        #[source]
        last: DbusError,
    },
    #[error("Could not register the Border Router object")]
    ThreadObject(#[source] DbusError),
    #[error("The bus connection is gone")]
    Disconnected,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub interface_name: String,
    pub bus_address: String,
    pub wait_allowance: Duration,
    pub retry_interval: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interface_name: DEFAULT_INTERFACE_NAME.to_owned(),
            bus_address: system_bus_address(),
            wait_allowance: DEFAULT_WAIT_ALLOWANCE,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// The socket path of the system bus.
///
/// Only `unix:path=` addresses are understood. Anything else falls back to
/// the well-known location.
pub fn system_bus_address() -> String {
    match std::env::var(SYSTEM_BUS_ADDRESS_VAR) {
        Ok(addr) => match parse_bus_address(&addr) {
            Some(path) => path.to_owned(),
            None => {
                log::warn!(
                    "Ignoring unsupported {} `{}`",
                    SYSTEM_BUS_ADDRESS_VAR,
                    addr
                );
                DEFAULT_SYSTEM_BUS_SOCKET.to_owned()
            }
        },
        Err(_) => DEFAULT_SYSTEM_BUS_SOCKET.to_owned(),
    }
}

/// Extracts the socket path of the first `unix:path=` entry of a bus address.
pub fn parse_bus_address(addr: &str) -> Option<&str> {
    for entry in addr.split(';') {
        let Some(params) = entry.strip_prefix("unix:") else {
            continue;
        };
        for param in params.split(',') {
            if let Some(path) = param.strip_prefix("path=") {
                if !path.is_empty() {
                    return Some(path);
                }
            }
        }
    }
    None
}

/// Tracks the watches of a connection and maps them onto the loop context.
#[derive(Default)]
pub struct WatchBridge {
    watches: RefCell<Vec<Rc<Watch>>>,
}

impl WatchBridge {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.watches.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.borrow().is_empty()
    }

    pub fn update(&self, source: &dyn WatchSource, ctx: &mut MainloopContext) {
        if source.dispatch_status() == DispatchStatus::DataRemains {
            ctx.set_timeout_if_earlier(Duration::ZERO);
            return;
        }
        for watch in self.watches.borrow().iter() {
            if !watch.enabled() {
                continue;
            }
            let flags = watch.flags();
            let mut mask = ERROR_FD_SET;
            if flags.contains(WatchFlags::READABLE) {
                mask |= READ_FD_SET;
            }
            if flags.contains(WatchFlags::WRITABLE) {
                mask |= WRITE_FD_SET;
            }
            ctx.add_fd_to_set(watch.fd(), mask);
        }
    }

    pub fn process(&self, source: &dyn WatchSource, ctx: &MainloopContext) {
        // handle_watch may add or remove watches
        let watches = self.watches.borrow().clone();
        for watch in &watches {
            if !watch.enabled() || !self.is_tracked(watch) {
                continue;
            }
            let fd = watch.fd();
            let mut flags = watch.flags() & (WatchFlags::READABLE | WatchFlags::WRITABLE);
            if !ctx.read_fds.contains(fd) {
                flags.remove(WatchFlags::READABLE);
            }
            if !ctx.write_fds.contains(fd) {
                flags.remove(WatchFlags::WRITABLE);
            }
            if ctx.error_fds.contains(fd) {
                flags.insert(WatchFlags::ERROR);
            }
            if !flags.is_empty() {
                source.handle_watch(watch, flags);
            }
        }
        while source.dispatch() == DispatchStatus::DataRemains {}
    }

    fn is_tracked(&self, watch: &Rc<Watch>) -> bool {
        self.watches.borrow().iter().any(|w| Rc::ptr_eq(w, watch))
    }
}

impl WatchListener for WatchBridge {
    fn add_watch(&self, watch: &Rc<Watch>) {
        if !self.is_tracked(watch) {
            self.watches.borrow_mut().push(watch.clone());
        }
    }

    fn remove_watch(&self, watch: &Rc<Watch>) {
        self.watches.borrow_mut().retain(|w| !Rc::ptr_eq(w, watch));
    }
}

/// Owns the bus connection and the Border Router object served on it.
pub struct DbusAgent {
    config: AgentConfig,
    socket: Rc<DbusSocket>,
    bridge: Rc<WatchBridge>,
    thread_object: Rc<ThreadObject>,
}

impl DbusAgent {
    pub fn init(
        config: AgentConfig,
        controller: Rc<dyn ThreadController>,
    ) -> Result<Self, AgentError> {
        let socket = connect(&config)?;
        Self::with_socket(config, socket, controller)
    }

    /// Serves the Border Router object on an established connection.
    pub fn with_socket(
        config: AgentConfig,
        socket: Rc<DbusSocket>,
        controller: Rc<dyn ThreadController>,
    ) -> Result<Self, AgentError> {
        let bridge = WatchBridge::new();
        socket.set_watch_listener(bridge.clone());
        let thread_object =
            ThreadObject::new(&socket.connection(), &config.interface_name, controller);
        socket.add_object(thread_object.object().clone());
        thread_object.init().map_err(AgentError::ThreadObject)?;
        log::info!(
            "Serving {} on {}",
            names::object_path(&config.interface_name),
            config.bus_address
        );
        Ok(Self {
            config,
            socket,
            bridge,
            thread_object,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn socket(&self) -> &Rc<DbusSocket> {
        &self.socket
    }

    pub fn thread_object(&self) -> &Rc<ThreadObject> {
        &self.thread_object
    }

    pub fn update(&self, ctx: &mut MainloopContext) {
        self.bridge.update(&*self.socket, ctx);
    }

    pub fn process(&self, ctx: &MainloopContext) -> Result<(), AgentError> {
        self.bridge.process(&*self.socket, ctx);
        if self.socket.is_dead() {
            return Err(AgentError::Disconnected);
        }
        Ok(())
    }
}

/// Connects and claims the bus name, retrying until the allowance is spent.
fn connect(config: &AgentConfig) -> Result<Rc<DbusSocket>, AgentError> {
    let name = names::bus_name(&config.interface_name);
    let deadline = Instant::now() + config.wait_allowance;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let res = DbusSocket::connect(&config.bus_address, "System bus", remaining)
            .and_then(|socket| {
                socket.request_name(&name, remaining)?;
                Ok(socket)
            });
        let e = match res {
            Ok(socket) => return Ok(socket),
            Err(e) => e,
        };
        if Instant::now() + config.retry_interval >= deadline {
            return Err(AgentError::ConnectTimeout {
                allowance: config.wait_allowance,
                last: e,
            });
        }
        log::warn!(
            "Could not connect to the bus at {}: {}. Retrying in {}",
            config.bus_address,
            ErrorFmt(&e),
            humantime::format_duration(config.retry_interval),
        );
        std::thread::sleep(config.retry_interval);
    }
}
