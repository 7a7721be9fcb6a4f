//! Platform server entry point.

use std::time::Duration;

use broker::InMemoryBroker;
use event_bus::BusConfig;
use platform::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire the broker, bus, and subscriptions
    let broker = InMemoryBroker::new();
    let bus_config = BusConfig::new(config.service_name.clone());
    let state = platform::create_default_state(broker, bus_config)
        .await
        .expect("failed to set up subscriptions");

    // 4. Start the demo producer
    let demo_task = config.demo_producer.then(|| {
        tracing::info!("starting demo producer");
        tokio::spawn(platform::demo::run(state.bus.clone(), Duration::from_secs(2)))
    });

    // 5. Build the application
    let app = platform::create_app(state.clone(), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting platform server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Stop producing and drain in-flight deliveries
    if let Some(task) = demo_task {
        task.abort();
    }
    state.bus.shutdown().await;

    tracing::info!("server shut down gracefully");
}
