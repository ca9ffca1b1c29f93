#[cfg(test)]
mod tests;

use {
    num_derive::FromPrimitive,
    num_traits::FromPrimitive,
    std::fmt::{self, Display, Formatter},
};

pub const ERROR_PREFIX: &str = "io.openthread.Error";

/// Failure kinds of Thread operations, numbered as in OpenThread.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, FromPrimitive)]
pub enum OtError {
    Failed = 1,
    Drop = 2,
    NoBufs = 3,
    NoRoute = 4,
    Busy = 5,
    Parse = 6,
    InvalidArgs = 7,
    Security = 8,
    AddressQuery = 9,
    NoAddress = 10,
    Abort = 11,
    NotImplemented = 12,
    InvalidState = 13,
    NoAck = 14,
    ChannelAccessFailure = 15,
    Detached = 16,
    Fcs = 17,
    NoFrameReceived = 18,
    UnknownNeighbor = 19,
    InvalidSourceAddress = 20,
    AddressFiltered = 21,
    DestinationAddressFiltered = 22,
    NotFound = 23,
    Already = 24,
    Ip6AddressCreationFailure = 26,
    NotCapable = 27,
    ResponseTimeout = 28,
    Duplicated = 29,
    ReassemblyTimeout = 30,
    NotTmf = 31,
    NotLowpanDataFrame = 32,
    LinkMarginLow = 34,
    InvalidCommand = 35,
    Pending = 36,
    Rejected = 37,
    Generic = 255,
}

/// Error names on the bus. The first entry doubles as the fallback.
static ERROR_NAMES: &[(u8, &str)] = &[
    (0, "io.openthread.Error.OK"),
    (1, "io.openthread.Error.Failed"),
    (2, "io.openthread.Error.Drop"),
    (3, "io.openthread.Error.NoBufs"),
    (4, "io.openthread.Error.NoRoute"),
    (5, "io.openthread.Error.Busy"),
    (6, "io.openthread.Error.Parse"),
    (7, "io.openthread.Error.InvalidArgs"),
    (8, "io.openthread.Error.Security"),
    (9, "io.openthread.Error.AddressQuery"),
    (10, "io.openthread.Error.NoAddress"),
    (11, "io.openthread.Error.Abort"),
    (12, "io.openthread.Error.NotImplemented"),
    (13, "io.openthread.Error.InvalidState"),
    (14, "io.openthread.Error.NoAck"),
    (15, "io.openthread.Error.ChannelAccessFailure"),
    (16, "io.openthread.Error.Detached"),
    (17, "io.openthread.Error.FcsErr"),
    (18, "io.openthread.Error.NoFrameReceived"),
    (19, "io.openthread.Error.UnknownNeighbor"),
    (20, "io.openthread.Error.InvalidSourceAddress"),
    (21, "io.openthread.Error.AddressFiltered"),
    (22, "io.openthread.Error.DestinationAddressFiltered"),
    (23, "io.openthread.Error.NotFound"),
    (24, "io.openthread.Error.Already"),
    (26, "io.openthread.Error.Ipv6AddressCreationFailure"),
    (27, "io.openthread.Error.NotCapable"),
    (28, "io.openthread.Error.ResponseTimeout"),
    (29, "io.openthread.Error.Duplicated"),
    (30, "io.openthread.Error.ReassemblyTimeout"),
    (31, "io.openthread.Error.NotTmf"),
    (32, "io.openthread.Error.NonLowpanDataFrame"),
    (34, "io.openthread.Error.LinkMarginLow"),
    (35, "io.openthread.Error.InvalidCommand"),
    (36, "io.openthread.Error.Pending"),
    (37, "io.openthread.Error.Rejected"),
    (255, "io.openthread.Error.Generic"),
];

/// Maps an error code to its bus name, falling back to the first table entry.
pub fn error_name_for_code(code: u8) -> &'static str {
    ERROR_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .unwrap_or(&ERROR_NAMES[0])
        .1
}

impl OtError {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        error_name_for_code(self.code())
    }

    /// Returns `None` for code 0, which means success.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::from_u8(code)
    }

    /// Inverts `name`. The success name and unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let (code, _) = ERROR_NAMES.iter().find(|(_, n)| *n == name)?;
        Self::from_code(*code)
    }
}

impl Display for OtError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.name();
        let short = name
            .strip_prefix(ERROR_PREFIX)
            .and_then(|n| n.strip_prefix('.'))
            .unwrap_or(name);
        f.write_str(short)
    }
}

impl std::error::Error for OtError {}
