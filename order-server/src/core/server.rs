//! HTTP server
//!
//! Builds the router, attaches the Socket.IO layer, registers background
//! tasks (idle order sweep, outbox delivery worker), and serves until
//! interrupted.

use std::time::Duration;
use socketioxide::SocketIo;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, ServerState};
use crate::db::repository::{OrderRepository, OutboxRepository};
use crate::notify::{OutboxWorker, RealtimeNotifier};
use crate::orders::IdleOrderSweep;

pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Serve until ctrl-c, then shut background tasks down gracefully.
    pub async fn run(self) -> anyhow::Result<()> {
        let (socket_layer, io) = SocketIo::new_layer();
        RealtimeNotifier::register(&io);
        let state = self.state.with_realtime(RealtimeNotifier::new(io));

        let mut tasks = BackgroundTasks::new();
        let shutdown = tasks.shutdown_token();

        let sweep = IdleOrderSweep::new(
            OrderRepository::new(state.db.clone()),
            self.config.pending_order_ttl_minutes,
            Duration::from_secs(self.config.sweep_interval_secs),
        );
        let sweep_token = shutdown.clone();
        tasks.spawn("idle_order_sweep", TaskKind::Periodic, async move {
            sweep.run(sweep_token).await;
        });

        let worker = OutboxWorker::new(
            OutboxRepository::new(state.db.clone()),
            state.realtime.clone(),
            state.mailer.clone(),
            Duration::from_secs(self.config.outbox_poll_secs),
        );
        let worker_token = shutdown.clone();
        tasks.spawn("outbox_worker", TaskKind::Worker, async move {
            worker.run(worker_token).await;
        });

        let app = crate::api::router()
            .with_state(state)
            .layer(socket_layer)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        let addr = format!("0.0.0.0:{}", self.config.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        tracing::info!(addr = %addr, "Order server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tasks.shutdown().await;
        Ok(())
    }
}
