//! HTTP server for the order façades.
//!
//! Each façade contributes a router; this module adds the shared middleware,
//! binds the listener and serves until a shutdown signal arrives.

use axum::{extract::DefaultBodyLimit, Router};
use orders_config::ServerConfig;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Wraps a façade router with request tracing, CORS and the body limit.
pub fn with_middleware(router: Router, server: &ServerConfig) -> Router {
	router.layer(
		ServiceBuilder::new()
			.layer(TraceLayer::new_for_http())
			.layer(CorsLayer::permissive())
			.layer(DefaultBodyLimit::max(server.max_request_size)),
	)
}

/// Serves `router` on the configured address until Ctrl-C or SIGTERM.
pub async fn start_server(
	name: &'static str,
	router: Router,
	server: &ServerConfig,
	default_port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = with_middleware(router, server);

	let bind_address = server.bind_address(default_port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!(service = name, address = %bind_address, "API server starting");

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!(service = name, "API server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "Failed to listen for Ctrl-C");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{signal, SignalKind};
		match signal(SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			},
			Err(e) => {
				tracing::error!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::{Body, Bytes},
		http::{Method, Request, StatusCode},
		routing::post,
	};
	use tower::ServiceExt;

	fn echo_router() -> Router {
		Router::new().route("/echo", post(|body: Bytes| async move { body }))
	}

	fn server_config(max_request_size: usize) -> ServerConfig {
		ServerConfig {
			max_request_size,
			..ServerConfig::default()
		}
	}

	#[tokio::test]
	async fn test_body_limit() {
		let app = with_middleware(echo_router(), &server_config(16));

		let request = Request::builder()
			.method(Method::POST)
			.uri("/echo")
			.body(Body::from(r#"{"orderId":1}"#))
			.unwrap();
		let response = app.clone().oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);

		let request = Request::builder()
			.method(Method::POST)
			.uri("/echo")
			.body(Body::from(vec![b'x'; 64]))
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
	}

	#[tokio::test]
	async fn test_cors_headers() {
		let app = with_middleware(echo_router(), &ServerConfig::default());

		let request = Request::builder()
			.method(Method::POST)
			.uri("/echo")
			.header("origin", "http://example.com")
			.body(Body::empty())
			.unwrap();
		let response = app.oneshot(request).await.unwrap();
		assert_eq!(response.status(), StatusCode::OK);
		assert!(response.headers().contains_key("access-control-allow-origin"));
	}

	#[tokio::test]
	async fn test_bind_failure_is_reported() {
		let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let server = ServerConfig {
			host: "127.0.0.1".to_string(),
			port: Some(occupied.local_addr().unwrap().port()),
			..ServerConfig::default()
		};
		assert!(start_server("state", echo_router(), &server, 8080).await.is_err());
	}
}
