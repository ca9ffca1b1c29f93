#[cfg(test)]
mod tests;

use {
    crate::utils::oserror::OsError,
    std::fmt::Display,
    thiserror::Error,
};
pub use {
    message::{Headers, IncomingMessage, MessageType, OutgoingMessage},
    object::DbusObject,
    request::DbusRequest,
    socket::DbusSocket,
    types::*,
    watch::{DispatchStatus, Watch, WatchFlags, WatchListener, WatchSource},
};

mod auth;
mod dynamic_type;
mod formatter;
mod incoming;
mod message;
pub mod object;
mod outgoing;
mod parser;
pub mod property;
pub mod request;
pub mod socket;
#[cfg(test)]
pub mod testing;
mod types;
pub mod watch;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallError {
    pub name: String,
    pub msg: Option<String>,
}

impl Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{}: {}", self.name, msg)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[derive(Debug, Error)]
pub enum DbusError {
    #[error("Encountered an unknown type in a signature")]
    UnknownType,
    #[error("Function call reply does not contain a reply serial")]
    NoReplySerial,
    #[error("Error has no error name")]
    NoErrorName,
    #[error("Method call contains no member or path")]
    MissingCallHeaders,
    #[error("The socket was killed")]
    Killed,
    #[error("{0}")]
    CallError(CallError),
    #[error("Variant has an invalid type")]
    InvalidVariantType,
    #[error("Could not create a socket")]
    Socket(#[source] OsError),
    #[error("Could not connect")]
    Connect(#[source] OsError),
    #[error("Could not write to the dbus socket")]
    WriteError(#[source] OsError),
    #[error("Could not read from the dbus socket")]
    ReadError(#[source] OsError),
    #[error("Could not wait for the dbus socket")]
    PollError(#[source] OsError),
    #[error("Server did not accept our authentication")]
    Auth,
    #[error("Socket path is too long")]
    PathTooLong,
    #[error("Variant signature is not a single type")]
    TrailingVariantSignature,
    #[error("Dict signature does not contain a terminating '}}'")]
    UnterminatedDict,
    #[error("Struct signature does not contain a terminating ')'")]
    UnterminatedStruct,
    #[error("Dict signature contains trailing types")]
    DictTrailing,
    #[error("String does not contain valid UTF-8")]
    InvalidUtf8,
    #[error("String is not terminated by a nul byte")]
    MissingNul,
    #[error("Unexpected end of message")]
    UnexpectedEof,
    #[error("Message body contains trailing data")]
    TrailingData,
    #[error("Boolean value was not 0 or 1")]
    InvalidBoolValue,
    #[error("Signature is empty")]
    EmptySignature,
    #[error("Server message has a different endianess than ourselves")]
    InvalidEndianess,
    #[error("Server speaks an unexpected protocol version")]
    InvalidProtocol,
    #[error("Array is larger than 64 MiB")]
    ArrayTooLong,
    #[error("Message is larger than 128 MiB")]
    MessageTooLong,
    #[error("Containers are nested more than 64 levels deep")]
    TooDeep,
    #[error("Expected an array of {expected} elements but found {actual}")]
    ArrayLength { expected: usize, actual: usize },
    #[error("Expected signature `{expected}` but found `{actual}`")]
    SignatureMismatch { expected: String, actual: String },
    #[error("The peer closed the connection")]
    Closed,
    #[error("Timed out waiting for a reply")]
    Timeout,
    #[error("Could not acquire the name {0} (RequestName returned {1})")]
    NameNotAcquired(String, u32),
}

const TY_BYTE: u8 = b'y';
const TY_BOOLEAN: u8 = b'b';
const TY_INT16: u8 = b'n';
const TY_UINT16: u8 = b'q';
const TY_INT32: u8 = b'i';
const TY_UINT32: u8 = b'u';
const TY_INT64: u8 = b'x';
const TY_UINT64: u8 = b't';
const TY_DOUBLE: u8 = b'd';
const TY_STRING: u8 = b's';
const TY_OBJECT_PATH: u8 = b'o';
const TY_SIGNATURE: u8 = b'g';
const TY_ARRAY: u8 = b'a';
const TY_VARIANT: u8 = b'v';

const HDR_PATH: u8 = 1;
const HDR_INTERFACE: u8 = 2;
const HDR_MEMBER: u8 = 3;
const HDR_ERROR_NAME: u8 = 4;
const HDR_REPLY_SERIAL: u8 = 5;
const HDR_DESTINATION: u8 = 6;
const HDR_SENDER: u8 = 7;
const HDR_SIGNATURE: u8 = 8;

pub const NO_REPLY_EXPECTED: u8 = 0x1;

const MAX_ARRAY_LEN: usize = 1 << 26;
const MAX_MESSAGE_LEN: usize = 1 << 27;
const MAX_DEPTH: usize = 64;

pub const BUS_DEST: &str = "org.freedesktop.DBus";
pub const BUS_PATH: &str = "/org/freedesktop/DBus";
pub const BUS_INTERFACE: &str = "org.freedesktop.DBus";
pub const PEER_INTERFACE: &str = "org.freedesktop.DBus.Peer";
pub const INTROSPECTABLE_INTERFACE: &str = "org.freedesktop.DBus.Introspectable";
pub const ERROR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";
pub const ERROR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DynamicType {
    U8,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F64,
    String,
    ObjectPath,
    Signature,
    Variant,
    Array(Box<DynamicType>),
    DictEntry(Box<DynamicType>, Box<DynamicType>),
    Struct(Vec<DynamicType>),
}

/// A read cursor over a message body.
///
/// Positions are absolute within `buf`, so alignment is computed relative to
/// the start of the body, which is always 8-aligned within the message.
pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
    depth: usize,
}

/// A write cursor that appends to a message body.
pub struct Formatter<'a> {
    buf: &'a mut Vec<u8>,
}

/// A native type with a fixed D-Bus signature.
///
/// The signature depends on the type alone. It is used both to open a
/// container before any element exists and to validate a container that
/// has been read.
pub trait DbusType: Sized {
    const ALIGNMENT: usize;

    fn write_signature(w: &mut String);
    fn marshal(&self, fmt: &mut Formatter);
    fn unmarshal(parser: &mut Parser) -> Result<Self, DbusError>;

    fn signature() -> String {
        let mut s = String::new();
        Self::write_signature(&mut s);
        s
    }

    /// Writes the elements of an array. The length word and the padding to
    /// the element alignment have already been written.
    fn marshal_elements(elements: &[Self], fmt: &mut Formatter) {
        for e in elements {
            e.marshal(fmt);
        }
    }

    /// Reads elements until `parser`, which ends with the array, is exhausted.
    fn unmarshal_elements(parser: &mut Parser) -> Result<Vec<Self>, DbusError> {
        let mut res = vec![];
        while !parser.eof() {
            res.push(Self::unmarshal(parser)?);
        }
        Ok(res)
    }
}

/// Something that delivers messages to the bus.
pub trait DbusConnection {
    /// Queues `msg` for delivery and returns the serial it was assigned.
    fn send(&self, msg: &OutgoingMessage) -> Result<u32, DbusError>;
}

/// The ordered arguments of a message body.
///
/// Elements are written and read in position order. Reading stops at the
/// first element that fails to decode.
pub trait DbusTuple: Sized {
    fn write_body_signature(w: &mut String);
    fn marshal_body(&self, fmt: &mut Formatter);
    fn unmarshal_body(parser: &mut Parser) -> Result<Self, DbusError>;

    fn body_signature() -> String {
        let mut s = String::new();
        Self::write_body_signature(&mut s);
        s
    }
}
