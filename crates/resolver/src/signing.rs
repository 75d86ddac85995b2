//! Signing resolution
//!
//! Release builds are never left unsigned: they use explicit credentials
//! when present and otherwise fall back to the debug identity. The fallback
//! is carried in the type so callers have to look at it.

use crate::credentials::SigningCredentials;
use crate::variant::Variant;
use serde::Serialize;
use std::path::Path;

/// Outcome of a resolution that may have taken a fallback branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<T> {
    /// The value the variant asked for
    Explicit(T),
    /// A substitute used because the requested input was absent
    Fallback(T),
}

impl<T> Resolved<T> {
    /// The resolved value, whichever branch produced it
    pub fn value(&self) -> &T {
        match self {
            Resolved::Explicit(value) | Resolved::Fallback(value) => value,
        }
    }

    /// Consume and return the value
    pub fn into_value(self) -> T {
        match self {
            Resolved::Explicit(value) | Resolved::Fallback(value) => value,
        }
    }

    /// True if the fallback branch was taken
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolved::Fallback(_))
    }
}

/// Credential set a variant is signed with
#[derive(Debug, Clone)]
pub enum SigningIdentity {
    /// The SDK's well-known debug keystore
    Debug(SigningCredentials),
    /// Credentials loaded from the project's descriptor
    Release(SigningCredentials),
}

impl SigningIdentity {
    /// Underlying credentials
    pub fn credentials(&self) -> &SigningCredentials {
        match self {
            SigningIdentity::Debug(creds) | SigningIdentity::Release(creds) => creds,
        }
    }

    /// True for the debug identity
    pub fn is_debug(&self) -> bool {
        matches!(self, SigningIdentity::Debug(_))
    }

    /// Short label for reports
    pub fn label(&self) -> &'static str {
        match self {
            SigningIdentity::Debug(_) => "debug",
            SigningIdentity::Release(_) => "release",
        }
    }
}

/// Resolved signing assignment for one variant
#[derive(Debug, Clone)]
pub struct SigningPolicy {
    /// Variant the policy applies to
    pub variant: Variant,
    /// Identity and the branch that produced it
    pub resolution: Resolved<SigningIdentity>,
}

impl SigningPolicy {
    /// Identity used to sign
    pub fn identity(&self) -> &SigningIdentity {
        self.resolution.value()
    }

    /// True when a distributable variant is signed with the debug key
    pub fn used_insecure_fallback(&self) -> bool {
        self.resolution.is_fallback()
    }

    /// Serializable view without secrets
    pub fn summary(&self) -> SigningSummary {
        let creds = self.identity().credentials();
        SigningSummary {
            variant: self.variant,
            identity: self.identity().label(),
            store_file: creds.store_file.display().to_string(),
            store_type: creds.store_type.to_string(),
            key_alias: creds.key_alias.clone(),
            used_insecure_fallback: self.used_insecure_fallback(),
        }
    }
}

/// Secret-free signing report
#[derive(Debug, Clone, Serialize)]
pub struct SigningSummary {
    /// Variant the policy applies to
    pub variant: Variant,
    /// `debug` or `release`
    pub identity: &'static str,
    /// Keystore path
    pub store_file: String,
    /// Detected keystore format
    pub store_type: String,
    /// Key alias inside the keystore
    pub key_alias: String,
    /// True when release fell back to the debug key
    pub used_insecure_fallback: bool,
}

/// Pick the signing identity for `variant`
///
/// Debug always uses the debug identity. Release uses `credentials` when
/// given and otherwise falls back to the debug identity with a warning.
pub fn resolve_signing(
    variant: Variant,
    credentials: Option<SigningCredentials>,
    debug_keystore: &Path,
) -> SigningPolicy {
    let debug_identity = || {
        SigningIdentity::Debug(SigningCredentials::debug(debug_keystore).with_detected_store_type())
    };

    let resolution = match variant {
        Variant::Debug => Resolved::Explicit(debug_identity()),
        Variant::Release => match credentials {
            Some(creds) => Resolved::Explicit(SigningIdentity::Release(creds)),
            None => {
                tracing::warn!(
                    variant = %variant,
                    debug_keystore = %debug_keystore.display(),
                    "No release signing credentials; signing with the debug key. \
                     This artifact is NOT release-signed"
                );
                Resolved::Fallback(debug_identity())
            }
        },
    };

    SigningPolicy {
        variant,
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const DEBUG_KEYSTORE: &str = "/home/dev/.android/debug.keystore";

    fn release_creds() -> SigningCredentials {
        SigningCredentials::new("/keys/upload.jks", "storepass", "upload", "keypass")
    }

    #[test]
    fn test_debug_uses_debug_identity() {
        let policy = resolve_signing(Variant::Debug, None, Path::new(DEBUG_KEYSTORE));

        assert!(matches!(policy.resolution, Resolved::Explicit(SigningIdentity::Debug(_))));
        assert!(!policy.used_insecure_fallback());
        assert!(policy.identity().credentials().is_debug_identity());
    }

    #[test]
    fn test_debug_ignores_release_credentials() {
        let policy = resolve_signing(Variant::Debug, Some(release_creds()), Path::new(DEBUG_KEYSTORE));

        assert!(policy.identity().is_debug());
        assert!(!policy.used_insecure_fallback());
    }

    #[test]
    fn test_release_without_credentials_falls_back() {
        let policy = resolve_signing(Variant::Release, None, Path::new(DEBUG_KEYSTORE));

        assert!(policy.used_insecure_fallback());
        assert!(policy.identity().is_debug());
        assert_eq!(
            policy.identity().credentials().store_file,
            Path::new(DEBUG_KEYSTORE)
        );
    }

    #[test]
    fn test_release_with_credentials_is_explicit() {
        let policy = resolve_signing(Variant::Release, Some(release_creds()), Path::new(DEBUG_KEYSTORE));

        assert!(!policy.used_insecure_fallback());
        let creds = match &policy.resolution {
            Resolved::Explicit(SigningIdentity::Release(creds)) => creds,
            other => panic!("unexpected resolution: {:?}", other),
        };
        assert_eq!(creds.store_file, Path::new("/keys/upload.jks"));
        assert_eq!(creds.key_alias, "upload");
        assert_eq!(creds.store_password().expose_secret(), "storepass");
        assert_eq!(creds.key_password().expose_secret(), "keypass");
    }

    #[test]
    fn test_summary_has_no_secrets() {
        let policy = resolve_signing(Variant::Release, Some(release_creds()), Path::new(DEBUG_KEYSTORE));
        let json = serde_json::to_string(&policy.summary()).unwrap();

        assert!(json.contains("\"identity\":\"release\""));
        assert!(json.contains("\"used_insecure_fallback\":false"));
        assert!(!json.contains("storepass"));
        assert!(!json.contains("keypass"));
    }

    #[test]
    fn test_resolved_accessors() {
        let explicit = Resolved::Explicit(1);
        let fallback = Resolved::Fallback(2);
        assert!(!explicit.is_fallback());
        assert!(fallback.is_fallback());
        assert_eq!(*explicit.value(), 1);
        assert_eq!(fallback.into_value(), 2);
    }
}
