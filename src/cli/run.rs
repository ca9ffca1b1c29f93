use {
    crate::{
        agent::{AgentConfig, AgentError, DbusAgent, system_bus_address},
        cli::{GlobalArgs, RunArgs, install_logger},
        mainloop::{MainloopContext, MainloopError},
        thread::SimulatedController,
        utils::errorfmt::ErrorFmt,
    },
    thiserror::Error,
    uapi::c,
};

#[derive(Debug, Error)]
enum MainError {
    #[error("The agent caused an error")]
    AgentError(#[from] AgentError),
    #[error("The main loop caused an error")]
    MainloopError(#[from] MainloopError),
}

pub fn main(global: GlobalArgs, args: RunArgs) {
    install_logger(&global);
    if let Err(e) = run(args) {
        log::error!("A fatal error occurred: {}", ErrorFmt(e));
        std::process::exit(1);
    }
}

fn run(args: RunArgs) -> Result<(), MainError> {
    // Writes to a closed bus socket must fail with EPIPE.
    unsafe {
        c::signal(c::SIGPIPE, c::SIG_IGN);
    }
    let config = AgentConfig {
        interface_name: args.interface,
        bus_address: args.bus_address.unwrap_or_else(system_bus_address),
        wait_allowance: args.wait_allowance,
        retry_interval: args.retry_interval,
    };
    let controller = SimulatedController::new();
    let agent = DbusAgent::init(config, controller.clone())?;
    let mut ctx = MainloopContext::new();
    loop {
        ctx.reset();
        controller.update(&mut ctx);
        agent.update(&mut ctx);
        ctx.poll()?;
        agent.process(&ctx)?;
        controller.process(&ctx);
    }
}
