use https_rs::server::Server;
use https_rs::server_config::ServerConfigBuilder;
use log::LevelFilter;
use pretty_env_logger::env_logger::Target;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn usage(program: &str) -> ! {
    eprintln!("usage: {program} <root-dir> <cert-file> <key-file> <port>");
    std::process::exit(2);
}

fn main() {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .target(Target::Stdout)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        usage(&args[0]);
    }

    let Ok(port) = args[4].parse::<u16>() else {
        eprintln!("{}: not a valid port number", args[4]);
        usage(&args[0]);
    };

    let config = ServerConfigBuilder::new()
        .root(args[1].as_str())
        .cert_path(args[2].as_str())
        .key_path(args[3].as_str())
        .port(port)
        .get();

    let server = match Server::new(config) {
        Ok(server) => server,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    // The flag is never set from the CLI; the process serves until it is
    // terminated. Embedders set it to drain and stop the accept loop.
    let shutdown = Arc::new(AtomicBool::new(false));

    if let Err(err) = server.run(shutdown) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
