use crate::http::{run_http_server, ApiState, HttpServerConfig};
use rots_runner::{app_process, AppProcess};
use tracing::debug;

/// HTTP surface for device registration, command submission and history
pub struct RotsApi {
    state: ApiState,
    config: HttpServerConfig,
}

impl RotsApi {
    pub fn new(state: ApiState, config: HttpServerConfig) -> Self {
        debug!("initializing ROTS API module");
        Self { state, config }
    }

    pub fn into_runner_process(self) -> AppProcess {
        app_process(move |ctx| run_http_server(self.config, self.state, ctx))
    }
}
