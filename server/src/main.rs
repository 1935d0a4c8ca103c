use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::ServerArgs;
use server::network::Server;

/// Main-method of the application.
/// Parses command-line arguments, binds both listeners and runs the simulation loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let args = ServerArgs::parse();

    let server = match Server::new(&args).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server loop failed: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
