//! GrackerKYC HTTP server

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gracker_kyc::server::run().await
}
