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

//! Metrics API resource.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::web::Data;

/*
https://prometheus.io/docs/instrumenting/content_negotiation/
```
Protocol                MIME Type                       Parameters
---                     ---                             ---
PrometheusText0.0.4     text/plain                      version=0.0.4
```
*/

/// Provides metrics of all registered collectors in the `PrometheusText0.0.4`
/// format.
///
/// When basic authentication is enabled, requests without the expected
/// credentials are rejected before any collector is invoked.
pub async fn metrics(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    if let Some(auth) = &app_state.auth {
        auth.check(&http_request)
            .map_err(ApiErrorMapper::from_exporter_error)?;
    }
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(app_state.registry.get_metrics().await.as_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest_api::common::BasicAuthenticationChecker;
    use actix_web::App;
    use actix_web::http::StatusCode;
    use actix_web::http::header;
    use actix_web::test;
    use actix_web::web;
    use async_trait::async_trait;
    use muxporter_metrics::ExporterError;
    use muxporter_metrics::metric::Metric;
    use muxporter_metrics::metric::MetricLabeledValue;
    use muxporter_metrics::registry::MetricsProvider;
    use muxporter_metrics::registry::MetricsProviderRegistry;
    use muxporter_metrics::registry::MetricsResult;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    /// Provider that counts how often it was scraped.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetricsProvider for CountingProvider {
        async fn metrics(
            &self,
            metrics_result: MetricsResult,
        ) -> Result<MetricsResult, ExporterError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(metrics_result.add_metric(Metric::from_metric_labeled_value(
                "up",
                MetricLabeledValue::new(1.0),
            )))
        }
    }

    fn init_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    fn registry(provider: &Arc<CountingProvider>) -> Arc<MetricsProviderRegistry> {
        let mut registry = MetricsProviderRegistry::new("muxporter", "1.2.3")
            .with_grouping_window(Duration::from_secs(60));
        registry
            .register_metrics("redis", Arc::clone(provider) as Arc<dyn MetricsProvider>)
            .unwrap();
        Arc::new(registry)
    }

    fn app_state(
        registry: &Arc<MetricsProviderRegistry>,
        credentials: Option<(&str, &str)>,
    ) -> Data<AppState> {
        let auth = credentials.map(|(username, password)| {
            BasicAuthenticationChecker::new(username, password)
                .unwrap()
                .unwrap()
        });
        Data::new(AppState::new(registry, auth))
    }

    fn basic(credentials: &str) -> (header::HeaderName, String) {
        use base64::Engine;
        (
            header::AUTHORIZATION,
            "Basic ".to_string() + &base64::engine::general_purpose::STANDARD.encode(credentials),
        )
    }

    #[actix_web::test]
    async fn unauthenticated_scrape() {
        init_logger();
        let provider = Arc::new(CountingProvider::default());
        let app = test::init_service(
            App::new()
                .app_data(app_state(&registry(&provider), None))
                .route("/metrics", web::get().to(metrics)),
        )
        .await;
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
        let body = String::from_utf8(test::read_body(res).await.to_vec()).unwrap();
        assert!(body.contains("redis_up 1\n"));
        assert!(body.contains("muxporter_build_info{version=\"1.2.3\"} 1\n"));
        let res =
            test::call_service(&app, test::TestRequest::get().uri("/other").to_request()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn gated_scrape() {
        init_logger();
        let provider = Arc::new(CountingProvider::default());
        let registry = registry(&provider);
        let open_app = test::init_service(
            App::new()
                .app_data(app_state(&registry, None))
                .route("/metrics", web::get().to(metrics)),
        )
        .await;
        let gated_app = test::init_service(
            App::new()
                .app_data(app_state(&registry, Some(("admin", "secret"))))
                .route("/metrics", web::get().to(metrics)),
        )
        .await;
        for req in [
            test::TestRequest::get().uri("/metrics"),
            test::TestRequest::get()
                .uri("/metrics")
                .insert_header(basic("admin:wrong")),
            test::TestRequest::get()
                .uri("/metrics")
                .insert_header((header::AUTHORIZATION, "Basic %%%")),
        ] {
            let res = test::call_service(&gated_app, req.to_request()).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                res.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Basic realm=\"metrics\""
            );
            let body = test::read_body(res).await;
            assert_eq!(body, ApiErrorMapper::AUTHENTICATION_FAILURE_BODY.as_bytes());
        }
        // Rejected requests never reach the collectors
        assert_eq!(provider.calls.load(Ordering::Relaxed), 0);
        let res = test::call_service(
            &gated_app,
            test::TestRequest::get()
                .uri("/metrics")
                .insert_header(basic("admin:secret"))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let gated_body = test::read_body(res).await;
        let res = test::call_service(
            &open_app,
            test::TestRequest::get().uri("/metrics").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let open_body = test::read_body(res).await;
        // Second scrape is served from the grouping window
        assert_eq!(gated_body, open_body);
        assert_eq!(provider.calls.load(Ordering::Relaxed), 1);
    }
}
