use {
    crate::{
        agent::{AgentConfig, AgentError, DbusAgent, WatchBridge, connect, parse_bus_address},
        dbus::{
            DbusSocket, DispatchStatus, MessageType, OutgoingMessage, Variant, Watch, WatchFlags,
            WatchListener, WatchSource, property, testing::read_messages,
        },
        mainloop::MainloopContext,
        thread::{SimulatedController, names},
    },
    std::{
        cell::{Cell, RefCell},
        time::{Duration, Instant},
    },
    uapi::c,
};

#[derive(Default)]
struct FakeSource {
    queued: Cell<usize>,
    handled: RefCell<Vec<(c::c_int, WatchFlags)>>,
    dispatched: Cell<usize>,
}

impl WatchSource for FakeSource {
    fn dispatch_status(&self) -> DispatchStatus {
        match self.queued.get() {
            0 => DispatchStatus::Complete,
            _ => DispatchStatus::DataRemains,
        }
    }

    fn handle_watch(&self, watch: &Watch, flags: WatchFlags) {
        self.handled.borrow_mut().push((watch.fd(), flags));
    }

    fn dispatch(&self) -> DispatchStatus {
        if self.queued.get() > 0 {
            self.queued.set(self.queued.get() - 1);
            self.dispatched.set(self.dispatched.get() + 1);
        }
        self.dispatch_status()
    }
}

#[test]
fn update_fills_sets() {
    let bridge = WatchBridge::new();
    let source = FakeSource::default();
    bridge.add_watch(&Watch::new(5, WatchFlags::READABLE));
    bridge.add_watch(&Watch::new(9, WatchFlags::READABLE | WatchFlags::WRITABLE));
    let disabled = Watch::new(12, WatchFlags::READABLE);
    disabled.set_enabled(false);
    bridge.add_watch(&disabled);

    let mut ctx = MainloopContext::new();
    bridge.update(&source, &mut ctx);
    assert!(ctx.read_fds.contains(5));
    assert!(!ctx.write_fds.contains(5));
    assert!(ctx.error_fds.contains(5));
    assert!(ctx.read_fds.contains(9));
    assert!(ctx.write_fds.contains(9));
    assert!(ctx.error_fds.contains(9));
    assert!(!ctx.read_fds.contains(12));
    assert!(!ctx.error_fds.contains(12));
    assert_eq!(ctx.max_fd, 9);
    assert_ne!(ctx.timeout, Duration::ZERO);
}

#[test]
fn update_with_queued_data_does_not_block() {
    let bridge = WatchBridge::new();
    let source = FakeSource::default();
    source.queued.set(1);
    bridge.add_watch(&Watch::new(5, WatchFlags::READABLE));
    let mut ctx = MainloopContext::new();
    bridge.update(&source, &mut ctx);
    assert_eq!(ctx.timeout, Duration::ZERO);
    assert!(ctx.read_fds.is_empty());
    assert_eq!(ctx.max_fd, -1);
}

#[test]
fn process_masks_by_readiness() {
    let bridge = WatchBridge::new();
    let source = FakeSource::default();
    bridge.add_watch(&Watch::new(5, WatchFlags::READABLE | WatchFlags::WRITABLE));
    bridge.add_watch(&Watch::new(6, WatchFlags::READABLE));
    bridge.add_watch(&Watch::new(7, WatchFlags::WRITABLE));

    let mut ctx = MainloopContext::new();
    ctx.write_fds.insert(5);
    ctx.read_fds.insert(7);
    ctx.error_fds.insert(7);
    bridge.process(&source, &ctx);
    assert_eq!(
        *source.handled.borrow(),
        [(5, WatchFlags::WRITABLE), (7, WatchFlags::ERROR)]
    );
}

#[test]
fn process_drains_queue() {
    let bridge = WatchBridge::new();
    let source = FakeSource::default();
    source.queued.set(3);
    bridge.process(&source, &MainloopContext::new());
    assert_eq!(source.dispatched.get(), 3);
    assert_eq!(source.dispatch_status(), DispatchStatus::Complete);
}

#[test]
fn watches_are_tracked_once() {
    let bridge = WatchBridge::new();
    let watch = Watch::new(3, WatchFlags::READABLE);
    bridge.add_watch(&watch);
    bridge.add_watch(&watch);
    assert_eq!(bridge.len(), 1);
    bridge.remove_watch(&Watch::new(3, WatchFlags::READABLE));
    assert_eq!(bridge.len(), 1);
    bridge.remove_watch(&watch);
    assert!(bridge.is_empty());
}

#[test]
fn bus_addresses() {
    assert_eq!(
        parse_bus_address("unix:path=/run/dbus/system_bus_socket"),
        Some("/run/dbus/system_bus_socket")
    );
    assert_eq!(
        parse_bus_address("unix:abstract=/tmp/x;unix:guid=1,path=/tmp/bus"),
        Some("/tmp/bus")
    );
    assert_eq!(parse_bus_address("tcp:host=localhost,port=1"), None);
    assert_eq!(parse_bus_address("unix:path="), None);
}

#[test]
fn connect_gives_up_after_allowance() {
    let config = AgentConfig {
        interface_name: "wpan9".to_owned(),
        bus_address: "/nonexistent/otbr-dbus-test-socket".to_owned(),
        wait_allowance: Duration::from_millis(50),
        retry_interval: Duration::from_millis(10),
    };
    let start = Instant::now();
    let res = connect(&config);
    assert!(matches!(res, Err(AgentError::ConnectTimeout { .. })));
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn serves_over_socketpair() {
    let (ours, theirs) = uapi::socketpair(
        c::AF_UNIX,
        c::SOCK_STREAM | c::SOCK_NONBLOCK | c::SOCK_CLOEXEC,
        0,
    )
    .unwrap();
    let socket = DbusSocket::from_fd(ours, "test");
    let config = AgentConfig {
        interface_name: "wpan0".to_owned(),
        bus_address: "socketpair".to_owned(),
        ..Default::default()
    };
    let agent = DbusAgent::with_socket(config, socket, SimulatedController::new()).unwrap();

    let sent = read_messages(theirs.raw());
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].member(), Some(names::SIGNAL_READY));

    let get = property::get_call(
        &names::bus_name("wpan0"),
        &names::object_path("wpan0"),
        names::INTERFACE,
        names::PROPERTY_NETWORK_NAME,
    );
    let ping = OutgoingMessage::method_call("test", "/", crate::dbus::PEER_INTERFACE, "Ping");
    let mut bytes = get.serialize(20);
    bytes.extend(ping.serialize(21));
    uapi::write(theirs.raw(), &bytes[..]).unwrap();

    let mut ctx = MainloopContext::new();
    agent.update(&mut ctx);
    ctx.timeout = Duration::from_secs(1);
    ctx.poll().unwrap();
    agent.process(&ctx).unwrap();

    let replies = read_messages(theirs.raw());
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].msg_type(), MessageType::MethodReturn);
    assert_eq!(replies[0].reply_serial(), Some(20));
    let (name,): (Variant,) = replies[0].read_body().unwrap();
    assert_eq!(name, Variant::String("OpenThread".to_owned()));
    assert_eq!(replies[1].reply_serial(), Some(21));

    drop(theirs);
    let mut ctx = MainloopContext::new();
    agent.update(&mut ctx);
    ctx.poll().unwrap();
    assert!(matches!(agent.process(&ctx), Err(AgentError::Disconnected)));
}
