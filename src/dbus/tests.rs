use {
    crate::{
        dbus::{
            DbusError, DbusSocket, DbusTuple, DbusType, DispatchStatus, DynamicType,
            ERROR_UNKNOWN_METHOD, Formatter, IncomingMessage, MessageType, OutgoingMessage,
            MAX_ARRAY_LEN, MAX_MESSAGE_LEN, PEER_INTERFACE, Parser, Variant, Watch, WatchFlags,
            WatchListener, WatchSource,
        },
        thread::types::{ActiveScanResult, LinkModeConfig, MacCounters, OnMeshPrefix},
    },
    std::{cell::RefCell, rc::Rc},
    uapi::c,
};

dbus_struct! {
    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    pub struct TestStruct {
        pub tag: u8,
        pub value: u32,
        pub name: String,
    }
}

fn encode<T: DbusTuple>(t: &T) -> Vec<u8> {
    let mut buf = vec![];
    t.marshal_body(&mut Formatter::new(&mut buf));
    buf
}

fn decode<T: DbusTuple>(buf: &[u8]) -> Result<T, DbusError> {
    let mut parser = Parser::new(buf);
    let res = T::unmarshal_body(&mut parser)?;
    assert!(parser.eof());
    Ok(res)
}

#[test]
fn scalars() {
    let v = (
        0xabu8,
        true,
        -2i16,
        0xfffeu16,
        -3i32,
        0xdead_beefu32,
        -4i64,
        u64::MAX,
        1.5f64,
        -5i8,
    );
    assert_eq!(decode::<(u8, bool, i16, u16, i32, u32, i64, u64, f64, i8)>(&encode(&v)).unwrap(), v);
}

#[test]
fn alignment() {
    let buf = encode(&(1u8, 2u64));
    assert_eq!(buf.len(), 16);
    assert_eq!(buf[0], 1);
    assert_eq!(&buf[1..8], &[0; 7]);
    assert_eq!(&buf[8..], &2u64.to_ne_bytes());
}

#[test]
fn empty_array_is_padded() {
    let buf = encode(&(Vec::<u64>::new(),));
    assert_eq!(buf, [0; 8]);
    let buf = encode(&(1u8, Vec::<u8>::new()));
    assert_eq!(buf, [1, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(decode::<(Vec<u64>,)>(&[0; 8]).unwrap(), (vec![],));
}

#[test]
fn strings_and_vectors() {
    let v = (
        String::new(),
        "hello".to_owned(),
        vec![1u8, 2, 3],
        vec![-1i16, 7],
        vec!["a".to_owned(), String::new()],
        [9u32, 8, 7],
    );
    assert_eq!(
        decode::<(String, String, Vec<u8>, Vec<i16>, Vec<String>, [u32; 3])>(&encode(&v)).unwrap(),
        v
    );
}

#[test]
fn fixed_array_length_mismatch() {
    let buf = encode(&(vec![1u32, 2],));
    match decode::<([u32; 3],)>(&buf) {
        Err(DbusError::ArrayLength {
            expected: 3,
            actual: 2,
        }) => {}
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn tuple_order() {
    let v = (
        0x03u8,
        vec![0x04u8, 0x05],
        vec!["hello".to_owned(), "world".to_owned()],
        vec![
            TestStruct {
                tag: 1,
                value: 0xf0a,
                name: "test1".to_owned(),
            },
            TestStruct {
                tag: 2,
                value: 0xf0b,
                name: "test2".to_owned(),
            },
        ],
    );
    let mut msg = OutgoingMessage::signal("/test", "io.test", "Test");
    msg.append(&v);
    assert_eq!(msg.signature(), "yayasa(yus)");
    let msg = IncomingMessage::parse(&msg.serialize(1)).unwrap();
    let decoded: (u8, Vec<u8>, Vec<String>, Vec<TestStruct>) = msg.read_body().unwrap();
    assert_eq!(decoded, v);
}

#[test]
fn struct_signatures() {
    assert_eq!(ActiveScanResult::signature(), "(tstayqqyyyybb)");
    assert_eq!(ActiveScanResult::signature(), ActiveScanResult::signature());
    assert_eq!(LinkModeConfig::signature(), "(bbb)");
    assert_eq!(OnMeshPrefix::signature(), "((ayy)qybbbbbbbbb)");
    assert_eq!(MacCounters::signature(), format!("({})", "u".repeat(32)));
    assert_eq!(TestStruct::signature(), "(yus)");
    assert_eq!(<(Vec<ActiveScanResult>,)>::body_signature(), "a(tstayqqyyyybb)");
}

#[test]
fn zero_valued_struct() {
    let v = (MacCounters::default(), OnMeshPrefix::default());
    assert_eq!(decode::<(MacCounters, OnMeshPrefix)>(&encode(&v)).unwrap(), v);
}

#[test]
fn scan_result_end_to_end() {
    let result = ActiveScanResult {
        ext_address: 1,
        network_name: "a".to_owned(),
        ext_pan_id: 2,
        steering_data: vec![3],
        pan_id: 4,
        joiner_udp_port: 5,
        channel: 6,
        rssi: 7,
        lqi: 8,
        version: 9,
        is_native: true,
        is_joinable: false,
    };
    let mut msg = OutgoingMessage::signal("/test", "io.test", "Scan");
    msg.append(&(vec![result.clone()],));
    let msg = IncomingMessage::parse(&msg.serialize(7)).unwrap();
    assert_eq!(msg.signature(), "a(tstayqqyyyybb)");
    let (results,): (Vec<ActiveScanResult>,) = msg.read_body().unwrap();
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.ext_address, 1);
    assert_eq!(r.network_name, "a");
    assert_eq!(r.ext_pan_id, 2);
    assert_eq!(r.steering_data, [3]);
    assert_eq!(r.pan_id, 4);
    assert_eq!(r.joiner_udp_port, 5);
    assert_eq!(r.channel, 6);
    assert_eq!(r.rssi, 7);
    assert_eq!(r.lqi, 8);
    assert_eq!(r.version, 9);
    assert!(r.is_native);
    assert!(!r.is_joinable);
}

#[test]
fn variant() {
    let mut buf = vec![];
    let mut fmt = Formatter::new(&mut buf);
    fmt.write_variant_as(&vec![1u8, 2]);
    fmt.write_variant_as(&LinkModeConfig {
        rx_on_when_idle: true,
        device_type: false,
        network_data: true,
    });
    fmt.write_variant(&Variant::String("x".to_owned()));
    let mut parser = Parser::new(&buf);
    assert_eq!(parser.read_variant_as::<Vec<u8>>().unwrap(), [1, 2]);
    let mode: LinkModeConfig = parser.read_variant_as().unwrap();
    assert!(mode.rx_on_when_idle);
    assert!(!mode.device_type);
    assert!(mode.network_data);
    assert_eq!(parser.read_variant().unwrap(), Variant::String("x".to_owned()));
    assert!(parser.eof());
}

#[test]
fn dynamic_variant() {
    let mut buf = vec![];
    Formatter::new(&mut buf).write_variant_as(&vec![5u8]);
    let v = Parser::new(&buf).read_variant().unwrap();
    assert_eq!(v, Variant::Array(DynamicType::U8, vec![Variant::U8(5)]));
}

#[test]
fn variant_type_mismatch() {
    let mut buf = vec![];
    Formatter::new(&mut buf).write_variant_as(&7u16);
    match Parser::new(&buf).read_variant_as::<u32>() {
        Err(DbusError::SignatureMismatch { expected, actual }) => {
            assert_eq!(expected, "u");
            assert_eq!(actual, "q");
        }
        r => panic!("unexpected result: {:?}", r),
    }
    match Parser::new(&buf).read_variant_as::<String>() {
        Err(DbusError::SignatureMismatch { .. }) => {}
        r => panic!("unexpected result: {:?}", r),
    }
}

#[test]
fn body_signature_is_checked() {
    let mut msg = OutgoingMessage::signal("/test", "io.test", "Test");
    msg.append(&(1u32,));
    let msg = IncomingMessage::parse(&msg.serialize(1)).unwrap();
    assert!(matches!(
        msg.read_body::<(String,)>(),
        Err(DbusError::SignatureMismatch { .. })
    ));
    assert_eq!(msg.read_body::<(u32,)>().unwrap(), (1,));
}

#[test]
fn truncated_body() {
    let buf = encode(&("hello".to_owned(),));
    assert!(matches!(
        decode::<(String,)>(&buf[..buf.len() - 1]),
        Err(DbusError::UnexpectedEof | DbusError::MissingNul)
    ));
    assert!(matches!(decode::<(u64,)>(&[0; 4]), Err(DbusError::UnexpectedEof)));
}

#[test]
fn invalid_bool() {
    assert!(matches!(
        decode::<(bool,)>(&2u32.to_ne_bytes()),
        Err(DbusError::InvalidBoolValue)
    ));
}

#[test]
fn message_headers() {
    let mut call = OutgoingMessage::method_call("io.test", "/obj", "io.test.Iface", "Method");
    call.append(&("arg".to_owned(),));
    let buf = call.serialize(42);
    let fixed = buf.first_chunk().unwrap();
    assert_eq!(IncomingMessage::frame_len(fixed).unwrap(), buf.len());
    let msg = IncomingMessage::parse(&buf).unwrap();
    assert_eq!(msg.msg_type(), MessageType::MethodCall);
    assert_eq!(msg.serial(), 42);
    assert_eq!(msg.path(), Some("/obj"));
    assert_eq!(msg.interface(), Some("io.test.Iface"));
    assert_eq!(msg.member(), Some("Method"));
    assert_eq!(msg.headers().destination.as_deref(), Some("io.test"));
    assert_eq!(msg.signature(), "s");
    assert!(msg.expects_reply());

    let mut reply = OutgoingMessage::error(&msg, "io.test.Error.Bad");
    reply.append(&("detail".to_owned(),));
    let reply = IncomingMessage::parse(&reply.serialize(43)).unwrap();
    assert_eq!(reply.msg_type(), MessageType::Error);
    assert_eq!(reply.reply_serial(), Some(42));
    let err = reply.call_error();
    assert_eq!(err.name, "io.test.Error.Bad");
    assert_eq!(err.msg.as_deref(), Some("detail"));
}

#[test]
fn signal_expects_no_reply() {
    let msg = OutgoingMessage::signal("/obj", "io.test", "Changed");
    assert!(!msg.expects_reply());
    let msg = IncomingMessage::parse(&msg.serialize(1)).unwrap();
    assert_eq!(msg.msg_type(), MessageType::Signal);
    assert!(msg.is_body_empty());
}

#[test]
fn truncated_message() {
    let buf = OutgoingMessage::signal("/obj", "io.test", "Changed").serialize(1);
    assert!(matches!(
        IncomingMessage::parse(&buf[..buf.len() - 1]),
        Err(DbusError::UnexpectedEof)
    ));
}

#[derive(Default)]
struct Watches {
    watches: RefCell<Vec<Rc<Watch>>>,
}

impl WatchListener for Watches {
    fn add_watch(&self, watch: &Rc<Watch>) {
        self.watches.borrow_mut().push(watch.clone());
    }

    fn remove_watch(&self, watch: &Rc<Watch>) {
        self.watches.borrow_mut().retain(|w| !Rc::ptr_eq(w, watch));
    }
}

fn read_message(fd: c::c_int) -> IncomingMessage {
    let mut buf = [0u8; 4096];
    let n = uapi::read(fd, &mut buf[..]).unwrap().len();
    IncomingMessage::parse(&buf[..n]).unwrap()
}

#[test]
fn socket_answers_calls() {
    let (ours, theirs) = uapi::socketpair(
        c::AF_UNIX,
        c::SOCK_STREAM | c::SOCK_NONBLOCK | c::SOCK_CLOEXEC,
        0,
    )
    .unwrap();
    let socket = DbusSocket::from_fd(ours, "test");
    let watches = Rc::new(Watches::default());
    socket.set_watch_listener(watches.clone());
    assert_eq!(watches.watches.borrow().len(), 1);
    let read_watch = watches.watches.borrow()[0].clone();
    assert_eq!(read_watch.flags(), WatchFlags::READABLE);

    let ping = OutgoingMessage::method_call("test", "/", PEER_INTERFACE, "Ping");
    let unknown = OutgoingMessage::method_call("test", "/nothing", "io.test", "Missing");
    let mut bytes = ping.serialize(10);
    bytes.extend(unknown.serialize(11));
    uapi::write(theirs.raw(), &bytes[..]).unwrap();

    socket.handle_watch(&read_watch, WatchFlags::READABLE);
    assert!(matches!(socket.dispatch(), DispatchStatus::DataRemains));
    let reply = read_message(theirs.raw());
    assert_eq!(reply.msg_type(), MessageType::MethodReturn);
    assert_eq!(reply.reply_serial(), Some(10));

    assert!(matches!(socket.dispatch(), DispatchStatus::Complete));
    let reply = read_message(theirs.raw());
    assert_eq!(reply.msg_type(), MessageType::Error);
    assert_eq!(reply.reply_serial(), Some(11));
    assert_eq!(reply.error_name(), Some(ERROR_UNKNOWN_METHOD));
}

#[test]
fn socket_dies_on_hangup() {
    let (ours, theirs) = uapi::socketpair(
        c::AF_UNIX,
        c::SOCK_STREAM | c::SOCK_NONBLOCK | c::SOCK_CLOEXEC,
        0,
    )
    .unwrap();
    let socket = DbusSocket::from_fd(ours, "test");
    let watches = Rc::new(Watches::default());
    socket.set_watch_listener(watches.clone());
    let read_watch = watches.watches.borrow()[0].clone();
    let failed = Rc::new(RefCell::new(None));
    let failed2 = failed.clone();
    let call = OutgoingMessage::method_call("peer", "/", "io.test", "Call");
    socket.call(&call, move |res| *failed2.borrow_mut() = Some(res.is_err()));
    drop(theirs);
    socket.handle_watch(&read_watch, WatchFlags::HANGUP);
    assert!(socket.is_dead());
    assert_eq!(*failed.borrow(), Some(true));
    assert!(watches.watches.borrow().is_empty());
}

fn nested_variant(depth: usize) -> Variant {
    let mut v = Variant::U8(1);
    for _ in 0..depth {
        v = Variant::Variant(Box::new(v));
    }
    v
}

#[test]
fn variant_nesting_limit() {
    let mut buf = vec![];
    Formatter::new(&mut buf).write_variant(&nested_variant(10));
    assert_eq!(Parser::new(&buf).read_variant().unwrap(), nested_variant(10));

    let mut buf = vec![];
    Formatter::new(&mut buf).write_variant(&nested_variant(100));
    assert!(matches!(
        Parser::new(&buf).read_variant(),
        Err(DbusError::TooDeep)
    ));
}

#[test]
fn array_nesting_limit() {
    let mut buf = vec![];
    Formatter::new(&mut buf).write_variant_as(&vec![vec![vec![1u8]]]);
    assert!(Parser::new(&buf).read_variant().is_ok());

    // A variant holding `aaa...ay` where every array has one element.
    let depth = 100;
    let mut sig = "a".repeat(depth);
    sig.push('y');
    let mut buf = vec![];
    let mut fmt = Formatter::new(&mut buf);
    fmt.write_signature(&sig);
    fn nest(fmt: &mut Formatter, depth: usize) {
        if depth == 0 {
            1u8.marshal(fmt);
            return;
        }
        fmt.write_array_with(if depth == 1 { 1 } else { 4 }, |fmt| nest(fmt, depth - 1));
    }
    nest(&mut fmt, depth);
    assert!(matches!(
        Parser::new(&buf).read_variant(),
        Err(DbusError::TooDeep)
    ));
}

#[test]
fn deeply_nested_header_is_rejected() {
    let base = OutgoingMessage::signal("/obj", "io.test", "Changed").serialize(1);
    let mut buf = base[..12].to_vec();
    let mut fmt = Formatter::new(&mut buf);
    fmt.write_array_with(8, |fmt| {
        (99u8, nested_variant(1000)).marshal(fmt);
    });
    fmt.pad_to(8);
    assert!(matches!(
        IncomingMessage::parse(&buf),
        Err(DbusError::TooDeep)
    ));
}

#[test]
fn foreign_byte_order() {
    let mut buf = OutgoingMessage::signal("/obj", "io.test", "Changed").serialize(1);
    buf[0] = if buf[0] == b'l' { b'B' } else { b'l' };
    let fixed = buf.first_chunk().unwrap();
    assert!(matches!(
        IncomingMessage::frame_len(fixed),
        Err(DbusError::InvalidEndianess)
    ));
    assert!(matches!(
        IncomingMessage::parse(&buf),
        Err(DbusError::InvalidEndianess)
    ));
}

#[test]
fn unknown_protocol_version() {
    let mut buf = OutgoingMessage::signal("/obj", "io.test", "Changed").serialize(1);
    buf[3] = 2;
    assert!(matches!(
        IncomingMessage::parse(&buf),
        Err(DbusError::InvalidProtocol)
    ));
}

#[test]
fn oversized_message() {
    let mut buf = OutgoingMessage::signal("/obj", "io.test", "Changed").serialize(1);
    buf[4..8].copy_from_slice(&(MAX_MESSAGE_LEN as u32).to_ne_bytes());
    let fixed = buf.first_chunk().unwrap();
    assert!(matches!(
        IncomingMessage::frame_len(fixed),
        Err(DbusError::MessageTooLong)
    ));
}

#[test]
fn oversized_array() {
    let len = (MAX_ARRAY_LEN as u32 + 1).to_ne_bytes();
    assert!(matches!(
        decode::<(Vec<u8>,)>(&len),
        Err(DbusError::ArrayTooLong)
    ));
    let len = (MAX_ARRAY_LEN as u32).to_ne_bytes();
    assert!(matches!(
        decode::<(Vec<u8>,)>(&len),
        Err(DbusError::UnexpectedEof)
    ));
}

#[test]
fn trailing_body_data() {
    let mut msg = OutgoingMessage::signal("/obj", "io.test", "Changed");
    msg.append_with("u", |fmt| {
        1u32.marshal(fmt);
        2u32.marshal(fmt);
    });
    let msg = IncomingMessage::parse(&msg.serialize(1)).unwrap();
    assert!(matches!(
        msg.read_body::<(u32,)>(),
        Err(DbusError::TrailingData)
    ));
}

#[cfg(debug_assertions)]
#[test]
#[should_panic]
fn overlong_signature() {
    let fields = (0..300).map(|_| DynamicType::U8).collect();
    let v = Variant::Array(DynamicType::Struct(fields), vec![]);
    Formatter::new(&mut vec![]).write_variant(&v);
}
