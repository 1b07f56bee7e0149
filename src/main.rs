use deskqueue::app;

#[tokio::main]
async fn main() {
    let code = app::startup::run().await;
    std::process::exit(code);
}
