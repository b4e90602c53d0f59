use std::io;

use actix_web::middleware::{Compress, Logger};
use actix_web::{web, App, HttpServer};
use log::{info, warn};

use linkfeed::graphql::{graphiql, graphql};
use linkfeed::metrics::metrics;
use linkfeed::{database, AppState, Config};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    if config.app_secret.is_empty() {
        warn!("APP_SECRET is empty; tokens are signed with an empty key");
    }

    // Open the store once; every request gets a handle to it
    let db = database::connect(&config).await.map_err(io::Error::other)?;
    let state = AppState::new(db.clone(), &config);

    let (host, port) = config.bind_addr();
    info!("Server listening at http://{}:{}/graphql", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .wrap(Compress::default())
            .service(graphql)
            .service(graphiql)
            .route("/metrics", web::get().to(metrics))
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    db.close().await;
    info!("Server stopped");
    Ok(())
}
