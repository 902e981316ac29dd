use checkers_lobby::store::{DEFAULT_STORE_PORT, DocumentServer};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt::init();

    let bind_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("0.0.0.0:{}", DEFAULT_STORE_PORT));

    println!("   Checkers Lobby Document Server");
    println!("   Binding to {}", bind_addr);
    println!("   Press Ctrl+C to stop\n");

    let server = DocumentServer::new();
    tokio::select! {
        result = server.run(&bind_addr) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n   Shutting down");
            Ok(())
        }
    }
}
