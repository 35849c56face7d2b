/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! REST API server and resources.

mod http_resources {
    //! API resources

    pub mod metrics_resource;
}
mod common {
    //! Common REST API resources and utils.

    mod api_error_mapper;
    mod basic_authentication_checker;

    pub use api_error_mapper::*;
    pub use basic_authentication_checker::*;
}

use self::common::BasicAuthenticationChecker;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::web;
use muxporter_core::conf::AppConfig;
use muxporter_metrics::registry::MetricsProviderRegistry;
use std::sync::Arc;

/// Number of parallel requests the can be served for each CPU core.
const WORKERS_PER_CORE: usize = 256;

/// Shared state between requests.
#[derive(Clone)]
struct AppState {
    registry: Arc<MetricsProviderRegistry>,
    auth: Option<Arc<BasicAuthenticationChecker>>,
}

impl AppState {
    fn new(
        registry: &Arc<MetricsProviderRegistry>,
        auth: Option<BasicAuthenticationChecker>,
    ) -> Self {
        Self {
            registry: Arc::clone(registry),
            auth: auth.map(Arc::new),
        }
    }
}

/// Run HTTP server until it fails.
///
/// The server does not react to signals. Stop it by dropping the returned
/// future.
pub async fn run_http_server(
    app_config: &Arc<AppConfig>,
    registry: &Arc<MetricsProviderRegistry>,
) -> Result<(), Box<dyn core::error::Error>> {
    let app_config = Arc::clone(app_config);
    let auth = BasicAuthenticationChecker::new(
        app_config.api.basic_auth_user(),
        app_config.api.basic_auth_pass(),
    )?;
    let workers = std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1);
    let max_connections = WORKERS_PER_CORE * workers;
    let metrics_path = app_config.api.metrics_path().to_owned();
    log::info!(
        "Metrics are exposed at http://{}:{}{metrics_path} (basic authentication {}) and allows {max_connections} concurrent connections.",
        &app_config.api.bind_address(),
        &app_config.api.bind_port(),
        if auth.is_some() {
            "enabled"
        } else {
            "disabled"
        },
    );
    let app_data = web::Data::<AppState>::new(AppState::new(registry, auth));
    HttpServer::new(move || {
        App::new().app_data(app_data.clone()).service(
            web::resource(metrics_path.as_str())
                .route(web::get().to(http_resources::metrics_resource::metrics)),
        )
    })
    .workers(workers)
    .backlog(u32::try_from(max_connections / 2).unwrap_or(2048))
    .max_connections(max_connections)
    .bind_auto_h2c((app_config.api.bind_address(), app_config.api.bind_port()))?
    .disable_signals()
    .shutdown_timeout(5) // Default 30
    .run()
    .await?;
    Ok(())
}
