//! Time-based one-time passwords (RFC 6238) for the console's second factor.

use crate::session::CredentialProvider;
use eyre::{
    eyre,
    Context as _,
    Result,
};
use hmac::{
    Hmac,
    Mac,
};
use secrecy::{
    ExposeSecret as _,
    SecretString,
};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

const STEP_SECONDS: u64 = 30;
const DIGITS: u32 = 6;

/// Generates the current code from a shared base32 secret, or nothing if no
/// secret is configured.
#[derive(Clone, Default)]
pub struct TotpProvider {
    mac: Option<HmacSha1>,
}

impl std::fmt::Debug for TotpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TotpProvider")
            .field("configured", &self.mac.is_some())
            .finish()
    }
}

impl TotpProvider {
    pub fn new(secret: Option<&SecretString>) -> Result<Self> {
        let mac = secret
            .map(|secret| {
                let key = decode_secret(secret.expose_secret())?;
                HmacSha1::new_from_slice(&key).map_err(|e| eyre!("unusable TOTP secret: {e}"))
            })
            .transpose()?;
        Ok(Self { mac })
    }

    pub fn is_configured(&self) -> bool {
        self.mac.is_some()
    }

    /// Code valid at the given unix time.
    pub fn code_at(&self, unix_seconds: u64) -> Option<String> {
        let mut mac = self.mac.clone()?;
        mac.update(&(unix_seconds / STEP_SECONDS).to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // Dynamic truncation, RFC 4226 section 5.3.
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = u32::from_be_bytes([
            digest[offset] & 0x7f,
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]);
        let code = binary % 10u32.pow(DIGITS);
        Some(format!("{code:0width$}", width = DIGITS as usize))
    }
}

impl CredentialProvider for TotpProvider {
    fn current_code(&self) -> Option<String> {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.code_at(now)
    }
}

fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect::<String>();
    if normalized.is_empty() {
        return Err(eyre!("TOTP secret is empty"));
    }
    data_encoding::BASE32_NOPAD
        .decode(normalized.as_bytes())
        .wrap_err("TOTP secret is not valid base32")
}
