#[tokio::main]
async fn main() {
    if let Err(e) = clinicvault_lib::run().await {
        eprintln!("clinicvault: {e}");
        std::process::exit(1);
    }
}
