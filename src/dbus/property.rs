//! Shapes of the `org.freedesktop.DBus.Properties` interface.

use crate::dbus::{DbusType, Formatter, OutgoingMessage};

pub const INTERFACE: &str = "org.freedesktop.DBus.Properties";

pub const GET: &str = "Get";
pub const SET: &str = "Set";
pub const GET_ALL: &str = "GetAll";
pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";

pub const GET_SIGNATURE: &str = "ss";
pub const SET_SIGNATURE: &str = "ssv";
pub const GET_ALL_SIGNATURE: &str = "s";
pub const GET_ALL_REPLY_SIGNATURE: &str = "a{sv}";
pub const PROPERTIES_CHANGED_SIGNATURE: &str = "sa{sv}as";

pub fn get_call(destination: &str, path: &str, interface: &str, property: &str) -> OutgoingMessage {
    let mut msg = OutgoingMessage::method_call(destination, path, INTERFACE, GET);
    msg.append(&(interface.to_owned(), property.to_owned()));
    msg
}

pub fn set_call<T: DbusType>(
    destination: &str,
    path: &str,
    interface: &str,
    property: &str,
    value: &T,
) -> OutgoingMessage {
    let mut msg = OutgoingMessage::method_call(destination, path, INTERFACE, SET);
    msg.append_with(SET_SIGNATURE, |fmt| {
        fmt.write_str(interface);
        fmt.write_str(property);
        fmt.write_variant_as(value);
    });
    msg
}

pub fn get_all_call(destination: &str, path: &str, interface: &str) -> OutgoingMessage {
    let mut msg = OutgoingMessage::method_call(destination, path, INTERFACE, GET_ALL);
    msg.append(&(interface.to_owned(),));
    msg
}

/// Writes one `{sv}` entry whose value is produced by `f`.
pub fn write_entry<R>(fmt: &mut Formatter, name: &str, f: impl FnOnce(&mut Formatter) -> R) -> R {
    fmt.pad_to(8);
    fmt.write_str(name);
    f(fmt)
}

/// A `PropertiesChanged` signal announcing a single new value.
pub fn changed_signal<T: DbusType>(
    path: &str,
    interface: &str,
    property: &str,
    value: &T,
) -> OutgoingMessage {
    let mut msg = OutgoingMessage::signal(path, INTERFACE, PROPERTIES_CHANGED);
    msg.append_with(PROPERTIES_CHANGED_SIGNATURE, |fmt| {
        fmt.write_str(interface);
        fmt.write_array_with(8, |fmt| {
            write_entry(fmt, property, |fmt| fmt.write_variant_as(value));
        });
        fmt.write_array::<String>(&[]);
    });
    msg
}
