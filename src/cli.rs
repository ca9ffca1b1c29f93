mod get;
mod run;

use {
    ::log::Level,
    clap::{Args, Parser, Subcommand, ValueEnum},
    std::time::Duration,
};

/// The D-Bus agent of the OpenThread Border Router.
#[derive(Parser, Debug)]
#[command(version)]
struct OtbrAgent {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// The log level.
    #[arg(value_enum, long, default_value_t)]
    pub log_level: CliLogLevel,
    /// Append log messages to this file instead of writing them to stderr.
    #[arg(long)]
    pub log_file: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Serve the Border Router interface on the system bus.
    Run(RunArgs),
    /// Read a property from a running agent.
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// The name of the Thread network interface.
    #[arg(long, short, default_value = "wpan0")]
    pub interface: String,
    /// The socket of the system bus.
    ///
    /// Defaults to the path in DBUS_SYSTEM_BUS_ADDRESS or
    /// /var/run/dbus/system_bus_socket.
    #[arg(long)]
    pub bus_address: Option<String>,
    /// How long to keep trying to connect to the bus.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    pub wait_allowance: Duration,
    /// The pause between two connection attempts.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    pub retry_interval: Duration,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// The name of the Thread network interface.
    #[arg(long, short, default_value = "wpan0")]
    pub interface: String,
    /// The socket of the system bus.
    #[arg(long)]
    pub bus_address: Option<String>,
    /// How long to wait for the reply.
    #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
    pub timeout: Duration,
    /// The property to read, for example `DeviceRole`.
    pub property: String,
}

#[derive(ValueEnum, Debug, Copy, Clone, Hash, Default)]
pub enum CliLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Trace => Level::Trace,
            CliLogLevel::Debug => Level::Debug,
            CliLogLevel::Info => Level::Info,
            CliLogLevel::Warn => Level::Warn,
            CliLogLevel::Error => Level::Error,
        }
    }
}

pub fn main() {
    let cli = OtbrAgent::parse();
    match cli.command {
        Cmd::Run(a) => run::main(cli.global, a),
        Cmd::Get(a) => get::main(cli.global, a),
    }
}

fn install_logger(global: &GlobalArgs) {
    let level = global.log_level.into();
    match &global.log_file {
        Some(path) => crate::logger::Logger::install_file(level, path),
        None => crate::logger::Logger::install_stderr(level),
    }
}
