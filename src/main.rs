mod routes;
mod logger;
mod config;
mod response;
mod error;
mod models;
mod middleware;
mod state;
mod handler;
mod service;
mod pipeline;

mod tracer;

use log::{info, warn};
use opentelemetry::global;
use opentelemetry::global::shutdown_tracer_provider;
use tokio::signal;
use crate::logger::logger::setup_logger;
use config::settings::SETTINGS;
use crate::pipeline::emotion_pipeline::emotion_pipeline::EmotionPipeline;
use crate::routes::root::{root_routes, RouterState};


#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
use crate::tracer::tracer::init_tracer_provider;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() {
    // Setup logger
    setup_logger(SETTINGS.logger.as_ref());
    let addr = format!("0.0.0.0:{}", SETTINGS.server.http_port);

    // Load cascade and emotion model once, shared read-only by every request
    let emotion_pipeline = EmotionPipeline::new(
        SETTINGS.model.cascade_path.as_str(),
        SETTINGS.model.emotion_model_path.as_str(),
    )
        .unwrap_or_else(|e| panic!("Failed to init emotion pipeline: {}", e));
    info!("completed initializing emotion pipeline");

    // Setup tracing
    let tracing_enabled = match &SETTINGS.tracer {
        Some(tracer) => {
            let tracer_provider = init_tracer_provider(tracer, &SETTINGS.app.name)
                .expect("Failed to initialize tracer provider.");
            global::set_tracer_provider(tracer_provider);
            true
        }
        None => {
            warn!("no tracer configured, span export disabled");
            false
        }
    };

    // Init server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to create new listener: {}", e));
    info!("starting {} on {}", SETTINGS.app.name, SETTINGS.server);
    let router_state = RouterState::new(emotion_pipeline, SETTINGS.server.max_body_size_bytes());

    axum::serve(listener, root_routes(router_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| panic!("Failed to start api server: {}", e));

    if tracing_enabled {
        shutdown_tracer_provider();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
