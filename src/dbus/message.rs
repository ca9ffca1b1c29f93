use {
    crate::dbus::{
        CallError, DbusError, DbusTuple, DbusType, Formatter, HDR_DESTINATION, HDR_ERROR_NAME,
        HDR_INTERFACE, HDR_MEMBER, HDR_PATH, HDR_REPLY_SERIAL, HDR_SENDER, HDR_SIGNATURE,
        MAX_MESSAGE_LEN, NO_REPLY_EXPECTED, ObjectPath, Parser, Signature, Variant,
    },
    num_derive::FromPrimitive,
    num_traits::FromPrimitive,
    smallvec::SmallVec,
    std::cell::Cell,
};

pub(super) const FIXED_HEADER_SIZE: usize = 16;

#[cfg(target_endian = "little")]
const ENDIANESS: u8 = b'l';
#[cfg(not(target_endian = "little"))]
const ENDIANESS: u8 = b'B';

const PROTOCOL_VERSION: u8 = 1;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum MessageType {
    MethodCall = 1,
    MethodReturn = 2,
    Error = 3,
    Signal = 4,
}

#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Headers {
    pub path: Option<ObjectPath>,
    pub interface: Option<String>,
    pub member: Option<String>,
    pub error_name: Option<String>,
    pub reply_serial: Option<u32>,
    pub destination: Option<String>,
    pub sender: Option<String>,
    pub signature: Option<Signature>,
}

impl Headers {
    fn parse(buf: &[u8]) -> Result<Self, DbusError> {
        let mut parser = Parser::new(buf);
        let mut headers = Headers::default();
        while !parser.eof() {
            parser.align_to(8)?;
            let ty: u8 = parser.unmarshal()?;
            let val = parser.read_variant()?;
            match ty {
                HDR_PATH => headers.path = Some(val.into_object_path()?),
                HDR_INTERFACE => headers.interface = Some(val.into_string()?),
                HDR_MEMBER => headers.member = Some(val.into_string()?),
                HDR_ERROR_NAME => headers.error_name = Some(val.into_string()?),
                HDR_REPLY_SERIAL => headers.reply_serial = Some(val.into_u32()?),
                HDR_DESTINATION => headers.destination = Some(val.into_string()?),
                HDR_SENDER => headers.sender = Some(val.into_string()?),
                HDR_SIGNATURE => headers.signature = Some(val.into_signature()?),
                _ => {}
            }
        }
        Ok(headers)
    }

    fn to_fields(&self, signature: &str) -> SmallVec<[(u8, Variant); 8]> {
        let mut fields = SmallVec::new();
        if let Some(path) = &self.path {
            fields.push((HDR_PATH, Variant::ObjectPath(path.clone())));
        }
        let strings = [
            (HDR_INTERFACE, &self.interface),
            (HDR_MEMBER, &self.member),
            (HDR_ERROR_NAME, &self.error_name),
        ];
        for (code, value) in strings {
            if let Some(value) = value {
                fields.push((code, Variant::String(value.clone())));
            }
        }
        if let Some(serial) = self.reply_serial {
            fields.push((HDR_REPLY_SERIAL, Variant::U32(serial)));
        }
        if let Some(destination) = &self.destination {
            fields.push((HDR_DESTINATION, Variant::String(destination.clone())));
        }
        if let Some(sender) = &self.sender {
            fields.push((HDR_SENDER, Variant::String(sender.clone())));
        }
        if !signature.is_empty() {
            fields.push((
                HDR_SIGNATURE,
                Variant::Signature(Signature(signature.to_owned())),
            ));
        }
        fields
    }
}

/// A message under construction.
///
/// The serial is assigned by the connection when the message is sent.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    msg_type: MessageType,
    flags: u8,
    headers: Headers,
    signature: String,
    body: Vec<u8>,
}

impl OutgoingMessage {
    fn new(msg_type: MessageType, headers: Headers) -> Self {
        Self {
            msg_type,
            flags: 0,
            headers,
            signature: String::new(),
            body: vec![],
        }
    }

    pub fn method_call(destination: &str, path: &str, interface: &str, member: &str) -> Self {
        Self::new(
            MessageType::MethodCall,
            Headers {
                path: Some(ObjectPath(path.to_owned())),
                interface: Some(interface.to_owned()),
                member: Some(member.to_owned()),
                destination: Some(destination.to_owned()),
                ..Default::default()
            },
        )
    }

    pub fn method_return(call: &IncomingMessage) -> Self {
        Self::new(
            MessageType::MethodReturn,
            Headers {
                reply_serial: Some(call.serial()),
                destination: call.headers.sender.clone(),
                ..Default::default()
            },
        )
    }

    pub fn error(call: &IncomingMessage, name: &str) -> Self {
        Self::new(
            MessageType::Error,
            Headers {
                error_name: Some(name.to_owned()),
                reply_serial: Some(call.serial()),
                destination: call.headers.sender.clone(),
                ..Default::default()
            },
        )
    }

    pub fn signal(path: &str, interface: &str, member: &str) -> Self {
        Self::new(
            MessageType::Signal,
            Headers {
                path: Some(ObjectPath(path.to_owned())),
                interface: Some(interface.to_owned()),
                member: Some(member.to_owned()),
                ..Default::default()
            },
        )
        .with_flags(NO_REPLY_EXPECTED)
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags |= flags;
        self
    }

    /// Appends the elements of `args` to the body.
    pub fn append<T: DbusTuple>(&mut self, args: &T) {
        T::write_body_signature(&mut self.signature);
        args.marshal_body(&mut Formatter::new(&mut self.body));
    }

    /// Appends values described by `signature` that are written by `f`.
    pub fn append_with<R>(&mut self, signature: &str, f: impl FnOnce(&mut Formatter) -> R) -> R {
        self.signature.push_str(signature);
        f(&mut Formatter::new(&mut self.body))
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn expects_reply(&self) -> bool {
        self.msg_type == MessageType::MethodCall && self.flags & NO_REPLY_EXPECTED == 0
    }

    /// Produces the wire representation of the message.
    pub fn serialize(&self, serial: u32) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FIXED_HEADER_SIZE + 128 + self.body.len());
        let mut fmt = Formatter::new(&mut buf);
        ENDIANESS.marshal(&mut fmt);
        (self.msg_type as u8).marshal(&mut fmt);
        self.flags.marshal(&mut fmt);
        PROTOCOL_VERSION.marshal(&mut fmt);
        (self.body.len() as u32).marshal(&mut fmt);
        serial.marshal(&mut fmt);
        fmt.write_array(&self.headers.to_fields(&self.signature)[..]);
        fmt.pad_to(8);
        buf.extend_from_slice(&self.body);
        buf
    }
}

/// A message received from the bus.
#[derive(Debug)]
pub struct IncomingMessage {
    msg_type: MessageType,
    flags: u8,
    serial: u32,
    headers: Headers,
    body: Vec<u8>,
    replied: Cell<bool>,
}

impl IncomingMessage {
    /// Returns the size of the message that starts with `fixed`.
    pub fn frame_len(fixed: &[u8; FIXED_HEADER_SIZE]) -> Result<usize, DbusError> {
        if fixed[0] != ENDIANESS {
            return Err(DbusError::InvalidEndianess);
        }
        if fixed[3] != PROTOCOL_VERSION {
            return Err(DbusError::InvalidProtocol);
        }
        let mut parser = Parser::new(&fixed[4..]);
        let body_len: u32 = parser.unmarshal()?;
        let _serial: u32 = parser.unmarshal()?;
        let headers_len: u32 = parser.unmarshal()?;
        let headers_len = headers_len as usize;
        let len = FIXED_HEADER_SIZE
            + headers_len
            + (headers_len.wrapping_neg() & 7)
            + body_len as usize;
        if len > MAX_MESSAGE_LEN {
            return Err(DbusError::MessageTooLong);
        }
        Ok(len)
    }

    /// Parses one complete message.
    pub fn parse(buf: &[u8]) -> Result<Self, DbusError> {
        let Some(fixed) = buf.first_chunk::<FIXED_HEADER_SIZE>() else {
            return Err(DbusError::UnexpectedEof);
        };
        let len = Self::frame_len(fixed)?;
        if buf.len() < len {
            return Err(DbusError::UnexpectedEof);
        }
        let mut parser = Parser::new(&buf[1..FIXED_HEADER_SIZE]);
        let msg_type: u8 = parser.unmarshal()?;
        let flags: u8 = parser.unmarshal()?;
        let mut parser = Parser::new(&buf[4..FIXED_HEADER_SIZE]);
        let body_len: u32 = parser.unmarshal()?;
        let serial: u32 = parser.unmarshal()?;
        let headers_len: u32 = parser.unmarshal()?;
        let headers_end = FIXED_HEADER_SIZE + headers_len as usize;
        let headers = Headers::parse(&buf[FIXED_HEADER_SIZE..headers_end])?;
        let body_start = len - body_len as usize;
        let msg_type = match MessageType::from_u8(msg_type) {
            Some(t) => t,
            None => return Err(DbusError::UnknownType),
        };
        match msg_type {
            MessageType::MethodCall => {
                if headers.path.is_none() || headers.member.is_none() {
                    return Err(DbusError::MissingCallHeaders);
                }
            }
            MessageType::MethodReturn => {
                if headers.reply_serial.is_none() {
                    return Err(DbusError::NoReplySerial);
                }
            }
            MessageType::Error => {
                if headers.reply_serial.is_none() {
                    return Err(DbusError::NoReplySerial);
                }
                if headers.error_name.is_none() {
                    return Err(DbusError::NoErrorName);
                }
            }
            MessageType::Signal => {
                if headers.path.is_none() || headers.interface.is_none() || headers.member.is_none()
                {
                    return Err(DbusError::MissingCallHeaders);
                }
            }
        }
        Ok(Self {
            msg_type,
            flags,
            serial,
            headers,
            body: buf[body_start..len].to_vec(),
            replied: Cell::new(false),
        })
    }

    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn path(&self) -> Option<&str> {
        self.headers.path.as_deref()
    }

    pub fn interface(&self) -> Option<&str> {
        self.headers.interface.as_deref()
    }

    pub fn member(&self) -> Option<&str> {
        self.headers.member.as_deref()
    }

    pub fn error_name(&self) -> Option<&str> {
        self.headers.error_name.as_deref()
    }

    pub fn reply_serial(&self) -> Option<u32> {
        self.headers.reply_serial
    }

    pub fn sender(&self) -> Option<&str> {
        self.headers.sender.as_deref()
    }

    pub fn signature(&self) -> &str {
        self.headers.signature.as_deref().unwrap_or("")
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_body_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn expects_reply(&self) -> bool {
        self.msg_type == MessageType::MethodCall && self.flags & NO_REPLY_EXPECTED == 0
    }

    pub fn parser(&self) -> Parser<'_> {
        Parser::new(&self.body)
    }

    /// Decodes the whole body as `T`.
    pub fn read_body<T: DbusTuple>(&self) -> Result<T, DbusError> {
        let expected = T::body_signature();
        if self.signature() != expected {
            return Err(DbusError::SignatureMismatch {
                expected,
                actual: self.signature().to_owned(),
            });
        }
        let mut parser = self.parser();
        let res = T::unmarshal_body(&mut parser)?;
        if !parser.eof() {
            return Err(DbusError::TrailingData);
        }
        Ok(res)
    }

    /// Describes an error reply by its name and optional leading message.
    pub fn call_error(&self) -> CallError {
        let mut msg = None;
        if self.signature().starts_with('s') {
            msg = self.parser().read_string().ok();
        }
        CallError {
            name: self.error_name().unwrap_or_default().to_owned(),
            msg,
        }
    }

    /// Records that a reply has been sent. Returns `false` if one was
    /// already sent.
    pub(super) fn mark_replied(&self) -> bool {
        !self.replied.replace(true)
    }
}
