use actix_web::{web, App, HttpServer};

use super::{configure, AppState};

/// Serve the order API, metrics and health on `port` until shutdown
pub async fn start_http_server(state: web::Data<AppState>, port: u16) -> std::io::Result<()> {
    tracing::info!("🚀 Order API listening on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
