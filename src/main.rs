#[actix_web::main]
async fn main() -> std::io::Result<()> {
    askdb_lib::run().await
}
