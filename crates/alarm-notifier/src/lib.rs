//! Forwards CloudWatch alarm state changes, delivered as SNS notifications, to
//! a Slack incoming webhook.
//!
//! Each invocation runs one pass of:
//!
//! - Resolve the hook URL. It's decrypted with KMS on first use and cached
//!   by the `Notifier` for as long as its execution environment lives.
//! - Translate the first SNS record into a Slack message.
//! - Post the message, and classify the webhook's response.
//!
//! Returning `Ok` tells the invoking runtime the event is done. Returning
//! `Err` fails the invocation, and the runtime may redeliver the event.
//! Only server errors and transport failures are worth redelivering
//! (see `Error::is_retryable`), but every error fails the invocation.
pub mod config;
pub mod event;
pub mod message;
pub mod secret;
pub mod webhook;

pub use event::AlarmEvent;
pub use message::{MessageTemplate, OutboundMessage};
pub use secret::{Decrypter, KmsDecrypter, SecretCache};
pub use webhook::{Disposition, HttpPoster, Poster, Webhook};

/// Error of a single notifier invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hook URL has not been set")]
    HookUrlUnset,
    #[error("encrypted hook URL is not valid base64")]
    CiphertextEncoding(#[source] base64::DecodeError),
    #[error("failed to decrypt hook URL")]
    Decrypt(#[source] anyhow::Error),
    #[error("decrypted hook URL is not valid UTF-8")]
    Plaintext(#[source] std::string::FromUtf8Error),
    #[error("failed to parse SNS event envelope")]
    Envelope(#[source] serde_json::Error),
    #[error("SNS event envelope has no records")]
    NoRecords,
    #[error("failed to parse CloudWatch alarm message")]
    AlarmMessage(#[source] serde_json::Error),
    #[error("failed to serialize Slack message")]
    Serialize(#[source] serde_json::Error),
    #[error("no response from webhook")]
    Transport(#[source] anyhow::Error),
    #[error("server error when processing message: {status} - {reason}")]
    Server {
        status: u16,
        reason: String,
        body: String,
    },
}

impl Error {
    /// Is this a transient failure that redelivery of the event may resolve?
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Server { .. })
    }

    /// Convert into the error reported to the Lambda runtime. The runtime
    /// shows only the top-level message, so the full cause chain is folded in.
    pub fn into_invocation_error(self) -> lambda_runtime::Error {
        format!("{:#}", anyhow::Error::new(self)).into()
    }
}

/// The successful outcome of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    /// The webhook accepted the message.
    Posted,
    /// The webhook refused the message as malformed. It's not redelivered.
    Rejected { status: u16, reason: String },
}

#[derive(Debug)]
pub struct Notifier<D, P> {
    secret: SecretCache,
    ciphertext: Option<String>,
    decrypter: D,
    template: MessageTemplate,
    webhook: P,
}

impl<D: Decrypter, P: Poster> Notifier<D, P> {
    /// Build a Notifier which resolves its hook URL through `secret`,
    /// decrypting `ciphertext` if `secret` is cold.
    pub fn new(
        secret: SecretCache,
        ciphertext: Option<String>,
        decrypter: D,
        template: MessageTemplate,
        webhook: P,
    ) -> Notifier<D, P> {
        Notifier {
            secret,
            ciphertext,
            decrypter,
            template,
            webhook,
        }
    }

    #[tracing::instrument(skip_all, fields(alarm_name, new_state))]
    pub async fn handle(
        &self,
        payload: serde_json::Value,
        invoked_function_arn: &str,
    ) -> Result<Delivered, Error> {
        let cached = self.secret.get().is_some();
        let hook_url = self
            .secret
            .resolve(self.ciphertext.as_deref(), &self.decrypter)
            .await?;
        tracing::debug!(%cached, "resolved hook URL");

        let alarm = AlarmEvent::from_envelope(payload)?;
        tracing::Span::current()
            .record("alarm_name", alarm.alarm_name.as_str())
            .record("new_state", alarm.new_state_value.as_str());

        let message = self.template.render(&alarm, invoked_function_arn);
        let body = serde_json::to_vec(&message).map_err(Error::Serialize)?;

        let webhook::Response {
            status,
            reason,
            body,
        } = self
            .webhook
            .post(hook_url, body)
            .await
            .map_err(Error::Transport)?;

        match Disposition::classify(status) {
            Disposition::Delivered => {
                tracing::info!(%status, "Message posted successfully");
                Ok(Delivered::Posted)
            }
            Disposition::Rejected => {
                tracing::error!(
                    %status,
                    %reason,
                    %body,
                    "Error posting message to Slack API: {status} - {reason}"
                );
                Ok(Delivered::Rejected { status, reason })
            }
            Disposition::Retry => Err(Error::Server {
                status,
                reason,
                body,
            }),
        }
    }
}
