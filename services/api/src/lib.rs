mod cli;
mod forecast;
mod infra;
mod routes;
mod server;

use seat_forecast::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
