use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::room::RoomMonitorEntry;
use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: usize,
    pub rooms: RoomsInfo,
}

#[derive(Serialize)]
pub struct RoomsInfo {
    pub active: usize,
    pub players: usize,
}

/// `/healthz` — server status, connection count, and room totals.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ws_connection_count.load(Ordering::Relaxed);
    let (active, players) = {
        let rooms = state.rooms.read().await;
        rooms.stats()
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections,
        rooms: RoomsInfo { active, players },
    })
}

/// `/monitor` — unauthenticated introspection: one row per active room
/// with its phase and occupancy.
pub async fn monitor(State(state): State<AppState>) -> Json<Vec<RoomMonitorEntry>> {
    let rooms = state.rooms.read().await;
    Json(rooms.monitor_entries())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_response_serializes() {
        let resp = HealthResponse {
            status: "healthy",
            version: "0.1.0",
            connections: 3,
            rooms: RoomsInfo {
                active: 1,
                players: 2,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"healthy\""));
        assert!(json.contains("\"connections\":3"));
        assert!(json.contains("\"active\":1"));
    }
}
