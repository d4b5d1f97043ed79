use std::sync::Arc;
use std::time::Duration;

use pingora::apps::http_app::HttpServer;
use pingora::prelude::*;
use pingora::server::RunArgs;
use pingora::server::Server as PingoraServer;
use pingora::server::configuration::Opt;
use pingora::services::background::GenBackgroundService;
use pingora::services::listening::Service;

use crate::accumulator::Accumulator;
use crate::api::MetricApi;
use crate::configuration::ServerConfig;
use crate::sweep::ExpirySweeper;

pub struct Server {
    server: PingoraServer,
}

impl Server {
    pub fn new(opt: Option<Opt>) -> Result<Self> {
        let server = PingoraServer::new(opt)?;
        Ok(Server { server })
    }

    pub fn bootstrap(
        &mut self,
        server_conf: ServerConfig,
        accumulator: Arc<Accumulator>,
    ) -> Result<()> {
        server_conf.validate().map_err(|e| {
            Error::explain(ErrorType::InternalError, format!("invalid server config: {e}"))
        })?;

        self.server.bootstrap();

        if let Some(secs) = server_conf.sweep_interval_secs {
            log::info!("Evicting expired buckets every {}s", secs);
            let sweeper = ExpirySweeper::new(accumulator.clone(), Duration::from_secs(secs));
            let background =
                GenBackgroundService::new("bucket sweeper".to_string(), Arc::new(sweeper));
            self.server.add_service(background);
        } else {
            log::info!("Bucket eviction disabled, retaining all minute buckets");
        }

        let mut api_service = Service::new(
            "metric api".to_string(),
            HttpServer::new_app(MetricApi::new(accumulator)),
        );
        api_service.add_tcp(&server_conf.listen);
        log::info!("Serving metrics on {}", server_conf.listen);
        self.server.add_service(api_service);

        Ok(())
    }

    pub fn run_forever(self) {
        self.server.run_forever();
    }

    pub fn run(self, args: RunArgs) {
        self.server.run(args);
    }
}
