// src/cli/serve.rs — `pomotask serve`

use crate::api::{self, ApiState};
use crate::infra::config::Config;
use crate::store;

/// Open the database, spawn the store task and serve HTTP until killed.
pub async fn run_serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let mut server = config.server.clone();
    if let Some(port) = port {
        server.port = port;
    }

    let db_path = config.database.resolved_path();
    let store = store::open(&db_path)?;
    let (handle, _store_task) = store::spawn_store_server(store);

    if server.force_https {
        tracing::info!("HTTPS-only cookies and HSTS enabled");
    }
    let state = ApiState::new(handle, config.timer.clone(), server.force_https)?;
    api::start_server(&server, state).await
}
