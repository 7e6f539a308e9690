/*
 * main.rs
 *
 * Wiring only: parse argv, install signal handling, daemonize if asked,
 * stand up logging, hand off to the supervisor loop, translate its result
 * into an exit code. Spec §6's two exit codes (0 normal shutdown, 1 startup
 * failure) fall directly out of this function's control flow.
 */

use supervone::{args, daemon, log as app_log, signal, supervisor::Supervisor};

fn main() {
    let argv: Vec<String> = std::env::args().skip(1).collect();

    let config = match args::parse(&argv) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let identity = config.name.clone().unwrap_or_else(|| {
        config
            .command
            .first()
            .and_then(|p| p.rsplit('/').next())
            .unwrap_or("supervone")
            .to_string()
    });

    if config.daemonize {
        if let Err(e) = daemon::daemonize() {
            eprintln!("error: failed to daemonize: {e}");
            std::process::exit(1);
        }
    }

    let to_stderr = !config.daemonize;
    if let Err(e) = app_log::init(&identity, to_stderr) {
        eprintln!("error: failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = signal::install_handlers() {
        log::error!("failed to install signal handlers: {e}");
        std::process::exit(1);
    }
    if let Err(e) = signal::block_handled() {
        log::error!("failed to block signals: {e}");
        std::process::exit(1);
    }

    let mut supervisor = match Supervisor::new(
        identity,
        to_stderr,
        &config.command,
        config.restart_initial,
        config.cooloff,
        config.maximum,
    ) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to set up supervisor: {e}");
            std::process::exit(1);
        }
    };

    std::process::exit(supervisor.run());
}
