use crate::Error;
use aws_sdk_kms::error::ProvideErrorMetadata;

/// Scheme prepended to the decrypted hook URL, which is encrypted without it.
pub const HOOK_URL_SCHEME: &str = "https://";

/// Decrypter turns a ciphertext blob into its plaintext.
pub trait Decrypter: std::fmt::Debug + Send + Sync + 'static {
    fn decrypt<'s>(
        &'s self,
        ciphertext: Vec<u8>,
    ) -> impl std::future::Future<Output = anyhow::Result<Vec<u8>>> + Send + 's;
}

/// Decrypts using AWS KMS, with region and credentials taken from the
/// standard AWS environment of the function.
#[derive(Debug, Clone)]
pub struct KmsDecrypter {
    client: aws_sdk_kms::Client,
}

impl KmsDecrypter {
    pub async fn from_env() -> KmsDecrypter {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        KmsDecrypter {
            client: aws_sdk_kms::Client::new(&config),
        }
    }
}

impl Decrypter for KmsDecrypter {
    async fn decrypt<'s>(&'s self, ciphertext: Vec<u8>) -> anyhow::Result<Vec<u8>> {
        let response = match self
            .client
            .decrypt()
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => anyhow::bail!(
                "KMS decrypt failed ({}): {}",
                e.code().unwrap_or_default(),
                e.message().unwrap_or_default()
            ),
        };

        let Some(plaintext) = response.plaintext else {
            anyhow::bail!("no plaintext returned from KMS decrypt");
        };
        Ok(plaintext.into_inner())
    }
}

/// SecretCache holds the resolved hook URL for the lifetime of an execution
/// environment. It's assigned at most once and never invalidated.
#[derive(Debug, Default)]
pub struct SecretCache {
    hook_url: tokio::sync::OnceCell<String>,
}

impl SecretCache {
    /// A cache which already holds `hook_url`, as a reused environment would.
    pub fn warmed(hook_url: impl Into<String>) -> SecretCache {
        SecretCache {
            hook_url: tokio::sync::OnceCell::new_with(Some(hook_url.into())),
        }
    }

    pub fn get(&self) -> Option<&str> {
        self.hook_url.get().map(String::as_str)
    }

    /// Resolve the hook URL, decrypting `ciphertext` only if the cache is cold.
    ///
    /// Concurrent callers racing on a cold cache are serialized, so at most one
    /// decryption is in flight. A failed decryption leaves the cache cold.
    pub async fn resolve<D: Decrypter>(
        &self,
        ciphertext: Option<&str>,
        decrypter: &D,
    ) -> Result<&str, Error> {
        if let Some(hook_url) = self.get() {
            return Ok(hook_url);
        }
        let Some(ciphertext) = crate::config::usable_ciphertext(ciphertext) else {
            return Err(Error::HookUrlUnset);
        };

        let hook_url = self
            .hook_url
            .get_or_try_init(|| async {
                let blob = base64::decode(ciphertext).map_err(Error::CiphertextEncoding)?;
                let plaintext = decrypter.decrypt(blob).await.map_err(Error::Decrypt)?;
                let plaintext = String::from_utf8(plaintext).map_err(Error::Plaintext)?;

                tracing::debug!("decrypted hook URL");
                Ok::<_, Error>(format!("{HOOK_URL_SCHEME}{}", plaintext.trim()))
            })
            .await?;

        Ok(hook_url.as_str())
    }
}
