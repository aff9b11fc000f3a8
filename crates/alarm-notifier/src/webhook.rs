/// Response of the webhook to a posted message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

/// How a webhook response status should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The message was accepted.
    Delivered,
    /// The request itself was faulty. Redelivering it cannot help.
    Rejected,
    /// The webhook failed in a way which may pass, and redelivery should be requested.
    Retry,
}

impl Disposition {
    pub fn classify(status: u16) -> Disposition {
        match status {
            0..=399 => Disposition::Delivered,
            400..=499 => Disposition::Rejected,
            _ => Disposition::Retry,
        }
    }
}

/// Poster posts a serialized JSON message to a webhook URL.
///
/// An error means no response was received at all.
pub trait Poster: std::fmt::Debug + Send + Sync + 'static {
    fn post<'s>(
        &'s self,
        url: &'s str,
        body: Vec<u8>,
    ) -> impl std::future::Future<Output = anyhow::Result<Response>> + Send + 's;
}

/// Posts over HTTPS using reqwest.
#[derive(Debug, Clone)]
pub struct HttpPoster {
    http_client: reqwest::Client,
}

impl HttpPoster {
    pub fn new(timeout: std::time::Duration) -> anyhow::Result<HttpPoster> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("alarm-notifier/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpPoster { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> HttpPoster {
        HttpPoster { http_client }
    }
}

impl Poster for HttpPoster {
    async fn post<'s>(&'s self, url: &'s str, body: Vec<u8>) -> anyhow::Result<Response> {
        use anyhow::Context;

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .context("sending webhook request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("reading webhook response body")?;

        Ok(Response {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

#[derive(Debug)]
pub enum Webhook {
    /// Messages are logged rather than posted.
    Disabled,
    Http(HttpPoster),
}

impl Poster for Webhook {
    async fn post<'s>(&'s self, url: &'s str, body: Vec<u8>) -> anyhow::Result<Response> {
        match self {
            Webhook::Disabled => {
                tracing::warn!(
                    body = %String::from_utf8_lossy(&body),
                    "skipping webhook post (disabled)"
                );
                Ok(Response {
                    status: 204,
                    reason: "No Content".to_string(),
                    body: String::new(),
                })
            }
            Webhook::Http(http) => http.post(url, body).await,
        }
    }
}
