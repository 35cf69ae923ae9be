use std::fs;

use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;

use backend::services;
use backend::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    info!("Initializing state...");
    let state = web::Data::new(AppState::new().expect("Failed to initialize application state"));

    let media_root = state.config.media_root.clone();
    fs::create_dir_all(&media_root)?;

    let host = state.config.bind_host.clone();
    let port = state.config.bind_port;
    info!("Server running at http://{host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(state.clone())
            .service(services::auth::configure_routes())
            .service(services::recipes::configure_routes())
            .service(services::sitecontent::configure_routes())
            .service(services::staff::configure_routes())
            .service(actix_files::Files::new("/media", media_root.clone()))
    })
    .bind((host, port))?
    .run()
    .await
}
