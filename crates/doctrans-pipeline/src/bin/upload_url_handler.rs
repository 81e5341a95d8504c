//! Lambda entry point for the upload-URL API

use doctrans_common::logging::{init_logging, LogConfig};
use doctrans_pipeline::{events::ApiRequest, handlers, PipelineContext};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(&LogConfig::from_env()?)?;

    let ctx = PipelineContext::from_env().await?;
    info!("Upload URL handler ready");

    run(service_fn(|event: LambdaEvent<ApiRequest>| {
        let ctx = &ctx;
        async move {
            Ok::<_, Error>(handlers::handle_upload_url_request(ctx, event.payload).await)
        }
    }))
    .await
}
