#[cfg(test)]
mod tests;

use {
    crate::utils::{errorfmt::ErrorFmt, oserror::OsError},
    backtrace::Backtrace,
    log::{Level, Log, Metadata, Record},
    std::{cell::RefCell, io::Write, time::SystemTime},
    uapi::{Fd, OwnedFd, c},
};

thread_local! {
    static BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

pub struct Logger {
    level: Level,
    file: OwnedFd,
}

impl Logger {
    pub fn install_stderr(level: Level) {
        let file = match uapi::fcntl_dupfd_cloexec(2, 0) {
            Ok(fd) => fd,
            Err(e) => {
                let e = OsError::from(e);
                fatal!("Error: Could not dup stderr: {}", ErrorFmt(e));
            }
        };
        Self::install(level, file)
    }

    /// Appends to the log file at `path`, creating it if necessary.
    pub fn install_file(level: Level, path: &str) {
        let file = match uapi::open(
            path,
            c::O_CREAT | c::O_APPEND | c::O_CLOEXEC | c::O_WRONLY,
            0o644,
        ) {
            Ok(f) => f,
            Err(e) => {
                let e = OsError::from(e);
                fatal!("Error: Could not open log file {}: {}", path, ErrorFmt(e));
            }
        };
        Self::install(level, file)
    }

    fn new(level: Level, file: OwnedFd) -> Self {
        Self { level, file }
    }

    fn install(level: Level, file: OwnedFd) {
        let res = log::set_boxed_logger(Box::new(LogWrapper {
            logger: Self::new(level, file),
        }));
        if res.is_err() {
            fatal!("Error: A logger is already installed");
        }
        log::set_max_level(level.to_level_filter());
        install_panic_hook();
    }
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|p| {
        if let Some(loc) = p.location() {
            log::error!(
                "Panic at {} line {} column {}",
                loc.file(),
                loc.line(),
                loc.column()
            );
        } else {
            log::error!("Panic at unknown location");
        }
        if let Some(msg) = p.payload().downcast_ref::<&str>() {
            log::error!("Message: {}", msg);
        }
        if let Some(msg) = p.payload().downcast_ref::<String>() {
            log::error!("Message: {}", msg);
        }
        log::error!("Backtrace:\n{:?}", Backtrace::new());
    }));
}

struct LogWrapper {
    logger: Logger,
}

impl Log for LogWrapper {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.logger.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        BUFFER.with_borrow_mut(|buffer| {
            buffer.clear();
            format_record(buffer, record, SystemTime::now());
            let mut fd = Fd::new(self.logger.file.raw());
            let _ = fd.write_all(buffer);
        });
    }

    fn flush(&self) {
        // nothing
    }
}

fn format_record(buffer: &mut Vec<u8>, record: &Record, now: SystemTime) {
    let _ = if let Some(mp) = record.module_path() {
        writeln!(
            buffer,
            "[{} {:5} {}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            mp,
            record.args(),
        )
    } else {
        writeln!(
            buffer,
            "[{} {:5}] {}",
            humantime::format_rfc3339_millis(now),
            record.level(),
            record.args(),
        )
    };
}
