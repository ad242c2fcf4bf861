use std::sync::Arc;

use lambda_http::{run, service_fn, Error, Request};
use slack_resource_lookup::{function_handler, App, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let config = Config::from_env()?;
    if config.signing_secret.is_none() {
        tracing::error!("SLACK_SIGNING_SECRET is not set; every request will fail verification");
    }
    let app = Arc::new(App::new(&config)?);

    run(service_fn(move |event: Request| {
        let app = Arc::clone(&app);
        async move { function_handler(&app, event).await }
    }))
    .await
}
