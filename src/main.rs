#[tokio::main]
async fn main() {
    if let Err(e) = songdeck_lib::run().await {
        log::error!("{}", e);
        eprintln!("songdeck: {}", e);
        std::process::exit(1);
    }
}
