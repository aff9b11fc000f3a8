use derivative::Derivative;

/// Placeholder value shipped in deployment templates before a real
/// ciphertext has been provisioned.
pub const CIPHERTEXT_SENTINEL: &str = "<kmsEncryptedHookUrl>";

/// Alarm-notifier forwards CloudWatch alarm notifications, delivered through
/// SNS, to a Slack incoming webhook.
///
/// All arguments are read once at cold start, typically from the Lambda
/// function's environment.
#[derive(Derivative, clap::Parser)]
#[derivative(Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Base64-encoded KMS ciphertext of the Slack hook URL, excluding its
    /// scheme (for example "hooks.slack.com/services/abc123").
    #[derivative(Debug = "ignore")]
    #[clap(long, env = "ENCRYPTED_HOOK_URL")]
    pub encrypted_hook_url: Option<String>,
    /// Slack channel to which messages are posted.
    #[clap(long, env = "SLACK_CHANNEL", default_value = "#devops")]
    pub slack_channel: String,
    /// Display name of posted messages.
    #[clap(
        long,
        env = "SLACK_USERNAME",
        default_value = "CloudWatch Alarms (from SNS Notification)"
    )]
    pub slack_username: String,
    /// ARN announced at the foot of each message. Defaults to the invoked
    /// function ARN reported by the runtime.
    #[clap(long, env = "FUNCTION_ARN")]
    pub function_arn: Option<String>,
    /// Timeout of the outbound webhook POST.
    #[clap(long, env = "POST_TIMEOUT", default_value = "10s")]
    #[arg(value_parser = humantime::parse_duration)]
    pub post_timeout: std::time::Duration,
    /// Render and log messages without posting them. The hook URL is still
    /// resolved, so a usable ENCRYPTED_HOOK_URL and KMS access are required.
    /// Any value other than a falsey one ("0", "false", "no", "off") enables it.
    #[clap(long, env = "DRY_RUN")]
    #[arg(value_parser = clap::builder::FalseyValueParser::new())]
    pub dry_run: bool,
}

impl Args {
    /// The configured ciphertext, or None if it's absent, empty, or still the
    /// deployment placeholder.
    pub fn ciphertext(&self) -> Option<&str> {
        usable_ciphertext(self.encrypted_hook_url.as_deref())
    }
}

pub(crate) fn usable_ciphertext(ciphertext: Option<&str>) -> Option<&str> {
    ciphertext
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != CIPHERTEXT_SENTINEL)
}
