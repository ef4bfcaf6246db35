#[tokio::main]
async fn main() -> std::process::ExitCode {
    nodecfg_app::run().await
}
