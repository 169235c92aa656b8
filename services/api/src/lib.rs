mod cli;
mod infra;
mod routes;
mod server;

use homologa::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
