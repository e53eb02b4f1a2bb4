use agrivision::{routes, utils::config::Config};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    routes::init_tracing();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {}", err);
            std::process::exit(1);
        }
    };
    let bind_addr = config.bind_addr.clone();

    let app = match routes::make_app(config).await {
        Ok(app) => app,
        Err(err) => {
            error!("failed to start: {}", err);
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {}: {}", bind_addr, err);
            std::process::exit(1);
        }
    };
    info!("Listening on http://{}", bind_addr);

    if let Err(err) = serve(listener, app).await {
        error!("server error: {}", err);
    }
}
