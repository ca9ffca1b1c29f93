use crate::ot_error::{OtError, error_name_for_code};

#[test]
fn names() {
    assert_eq!(OtError::InvalidArgs.name(), "io.openthread.Error.InvalidArgs");
    assert_eq!(OtError::NotFound.name(), "io.openthread.Error.NotFound");
    assert_eq!(OtError::Generic.name(), "io.openthread.Error.Generic");
    assert_eq!(OtError::Fcs.name(), "io.openthread.Error.FcsErr");
}

#[test]
fn unknown_code_falls_back_to_first_entry() {
    assert_eq!(error_name_for_code(25), "io.openthread.Error.OK");
    assert_eq!(error_name_for_code(200), "io.openthread.Error.OK");
}

#[test]
fn codes() {
    assert_eq!(OtError::from_code(0), None);
    assert_eq!(OtError::from_code(7), Some(OtError::InvalidArgs));
    assert_eq!(OtError::from_code(25), None);
    assert_eq!(OtError::Rejected.code(), 37);
}

#[test]
fn from_name() {
    assert_eq!(
        OtError::from_name("io.openthread.Error.Busy"),
        Some(OtError::Busy)
    );
    assert_eq!(OtError::from_name("io.openthread.Error.OK"), None);
    assert_eq!(OtError::from_name("org.freedesktop.DBus.Error.Failed"), None);
}

#[test]
fn display() {
    assert_eq!(OtError::InvalidState.to_string(), "InvalidState");
}
