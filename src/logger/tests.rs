use {
    crate::logger::{LogWrapper, Logger, format_record},
    log::{Level, Log, Metadata, Record},
    std::time::{Duration, SystemTime},
};

#[test]
fn line_format() {
    let mut buf = vec![];
    let now = SystemTime::UNIX_EPOCH + Duration::from_millis(1500);
    format_record(
        &mut buf,
        &Record::builder()
            .level(Level::Warn)
            .module_path(Some("otbr_dbus::agent"))
            .args(format_args!("hello"))
            .build(),
        now,
    );
    assert_eq!(
        buf,
        b"[1970-01-01T00:00:01.500Z WARN  otbr_dbus::agent] hello\n"
    );
}

#[test]
fn line_format_without_module() {
    let mut buf = vec![];
    format_record(
        &mut buf,
        &Record::builder()
            .level(Level::Error)
            .args(format_args!("x {}", 1))
            .build(),
        SystemTime::UNIX_EPOCH,
    );
    assert_eq!(buf, b"[1970-01-01T00:00:00.000Z ERROR] x 1\n");
}

#[test]
fn level_filter() {
    let file = uapi::fcntl_dupfd_cloexec(2, 0).unwrap();
    let wrapper = LogWrapper {
        logger: Logger::new(Level::Info, file),
    };
    let enabled = |level| wrapper.enabled(&Metadata::builder().level(level).build());
    assert!(enabled(Level::Error));
    assert!(enabled(Level::Info));
    assert!(!enabled(Level::Debug));
    assert!(!enabled(Level::Trace));
}
