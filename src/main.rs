#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    profile_docs::run().await
}
