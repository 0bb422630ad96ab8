#[tokio::main]
async fn main() {
    if let Err(e) = storefront::run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
