pub mod error;
pub mod routes;
pub mod store;

pub use error::StoreError;
pub use routes::{AdminCaller, AppState, Caller, create_router};
pub use store::{
    ChartPoint, GameRecord, GameStats, LeaderboardEntry, NewUser, Role, Store, User, UserChart,
    UserRank, UserSummary,
};

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Binds `addr` and serves the router until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    serve_on(TcpListener::bind(addr).await?, state).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "persistence service listening");
    axum::serve(listener, create_router(state)).await
}
