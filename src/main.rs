#[tokio::main]
async fn main() -> anyhow::Result<()> {
    studyflow_lib::run().await
}
