#![recursion_limit = "256"]

use alarm_notifier::{
    config::Args, HttpPoster, KmsDecrypter, MessageTemplate, Notifier, SecretCache, Webhook,
};
use clap::Parser;
use std::sync::Arc;

fn main() -> Result<(), anyhow::Error> {
    // CloudWatch Logs stamps each line itself and doesn't render colors.
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .without_time()
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    let args = Args::parse();
    tracing::info!(?args, "started!");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async_main(args));

    tracing::info!(?result, "main function completed, shutting down runtime");
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    result
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let webhook = if args.dry_run {
        Webhook::Disabled
    } else {
        Webhook::Http(HttpPoster::new(args.post_timeout)?)
    };
    let ciphertext = args.ciphertext().map(str::to_string);
    if ciphertext.is_none() {
        tracing::warn!("ENCRYPTED_HOOK_URL is not set; every invocation will fail");
    }

    let Args {
        slack_channel,
        slack_username,
        function_arn,
        ..
    } = args;

    // Lives as long as the execution environment, and is shared by every
    // invocation it serves.
    let notifier = Arc::new(Notifier::new(
        SecretCache::default(),
        ciphertext,
        KmsDecrypter::from_env().await,
        MessageTemplate {
            channel: slack_channel,
            username: slack_username,
            function_arn,
        },
        webhook,
    ));

    let handler = lambda_runtime::service_fn(
        move |event: lambda_runtime::LambdaEvent<serde_json::Value>| {
            let notifier = notifier.clone();
            async move { invoke(&notifier, event).await }
        },
    );

    lambda_runtime::run(handler)
        .await
        .map_err(|err| anyhow::anyhow!(err))
}

#[tracing::instrument(skip_all, fields(request_id = %event.context.request_id))]
async fn invoke(
    notifier: &Notifier<KmsDecrypter, Webhook>,
    event: lambda_runtime::LambdaEvent<serde_json::Value>,
) -> Result<(), lambda_runtime::Error> {
    let lambda_runtime::LambdaEvent { payload, context } = event;

    match notifier.handle(payload, &context.invoked_function_arn).await {
        Ok(delivered) => {
            tracing::debug!(?delivered, "invocation succeeded");
            Ok(())
        }
        Err(error) if error.is_retryable() => {
            tracing::warn!(?error, "invocation failed; event may be redelivered");
            Err(error.into_invocation_error())
        }
        Err(error) => {
            tracing::error!(?error, "invocation failed");
            Err(error.into_invocation_error())
        }
    }
}
