#[tokio::main]
async fn main() {
    if let Err(e) = kraftodent_lib::run().await {
        eprintln!("kraftodent: {e}");
        std::process::exit(1);
    }
}
