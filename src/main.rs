use std::sync::Arc;

use metric_sum::accumulator::Accumulator;
use metric_sum::configuration::ServerConfig;
use metric_sum::server::Server;
use pingora::server::configuration::Opt;

fn main() {
    // Enable basic logging; set RUST_LOG=info for visibility.
    env_logger::init();

    let opt = Opt::parse_args();

    // The same YAML file carries pingora's settings and ours.
    let server_conf = match opt.conf.as_deref() {
        Some(path) => ServerConfig::load(path).expect("Failed to load server config"),
        None => {
            log::warn!("No config file given, using defaults");
            ServerConfig::default()
        }
    };

    let mut server = Server::new(Some(opt)).expect("Failed to create server");

    server
        .bootstrap(server_conf, Arc::new(Accumulator::default()))
        .expect("Failed to bootstrap server");

    server.run_forever();
}
