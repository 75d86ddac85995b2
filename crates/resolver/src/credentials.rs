//! Signing credentials and the `key.properties` descriptor
//!
//! The descriptor is optional: when it does not exist the release variant
//! falls back to the debug identity. When it exists it must define all four
//! keys with non-empty values.

use crate::properties::{decode, parse_properties, render_properties, Properties};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use varsign_core::error::{Error, Result};

/// Key for the keystore path
pub const STORE_FILE_KEY: &str = "storeFile";
/// Key for the keystore password
pub const STORE_PASSWORD_KEY: &str = "storePassword";
/// Key for the key alias
pub const KEY_ALIAS_KEY: &str = "keyAlias";
/// Key for the key password
pub const KEY_PASSWORD_KEY: &str = "keyPassword";

const REQUIRED_KEYS: [&str; 4] = [
    STORE_FILE_KEY,
    STORE_PASSWORD_KEY,
    KEY_ALIAS_KEY,
    KEY_PASSWORD_KEY,
];

/// Well-known debug keystore credentials shipped with every Android SDK
pub const DEBUG_STORE_PASSWORD: &str = "android";
/// Alias of the debug signing key
pub const DEBUG_KEY_ALIAS: &str = "androiddebugkey";
/// Password of the debug signing key
pub const DEBUG_KEY_PASSWORD: &str = "android";

/// Keystore container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystoreType {
    /// Java KeyStore (magic `FE ED FE ED`)
    Jks,
    /// PKCS#12
    Pkcs12,
    /// Keystore could not be read
    Unknown,
}

impl fmt::Display for KeystoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeystoreType::Jks => "jks",
            KeystoreType::Pkcs12 => "pkcs12",
            KeystoreType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Detect the keystore format from its leading bytes
pub fn detect_keystore_type(path: &Path) -> KeystoreType {
    let mut magic = [0u8; 4];
    let read = std::fs::File::open(path).and_then(|mut f| f.read_exact(&mut magic));

    match read {
        Ok(()) if magic == [0xFE, 0xED, 0xFE, 0xED] => KeystoreType::Jks,
        // PKCS12 is an ASN.1 SEQUENCE
        Ok(()) if magic[0] == 0x30 => KeystoreType::Pkcs12,
        _ => KeystoreType::Unknown,
    }
}

/// Credential set used to sign an artifact
///
/// Passwords are held as secrets and never appear in `Debug` output.
#[derive(Debug)]
pub struct SigningCredentials {
    /// Keystore path, absolute or relative to the working directory
    pub store_file: PathBuf,
    store_password: SecretString,
    /// Alias of the signing key inside the keystore
    pub key_alias: String,
    key_password: SecretString,
    /// Detected keystore format
    pub store_type: KeystoreType,
}

impl SigningCredentials {
    /// Create credentials; the keystore format starts as unknown
    pub fn new(
        store_file: impl Into<PathBuf>,
        store_password: impl Into<String>,
        key_alias: impl Into<String>,
        key_password: impl Into<String>,
    ) -> Self {
        Self {
            store_file: store_file.into(),
            store_password: SecretString::from(store_password.into()),
            key_alias: key_alias.into(),
            key_password: SecretString::from(key_password.into()),
            store_type: KeystoreType::Unknown,
        }
    }

    /// The well-known debug identity stored at `keystore`
    pub fn debug(keystore: impl Into<PathBuf>) -> Self {
        Self::new(
            keystore,
            DEBUG_STORE_PASSWORD,
            DEBUG_KEY_ALIAS,
            DEBUG_KEY_PASSWORD,
        )
    }

    /// Fill in the keystore format by reading the store file
    #[must_use]
    pub fn with_detected_store_type(mut self) -> Self {
        self.store_type = detect_keystore_type(&self.store_file);
        self
    }

    /// Keystore password
    pub fn store_password(&self) -> &SecretString {
        &self.store_password
    }

    /// Key password
    pub fn key_password(&self) -> &SecretString {
        &self.key_password
    }

    /// Whether these are the debug keystore's well-known credentials
    pub fn is_debug_identity(&self) -> bool {
        self.key_alias == DEBUG_KEY_ALIAS
            && self.store_password.expose_secret() == DEBUG_STORE_PASSWORD
            && self.key_password.expose_secret() == DEBUG_KEY_PASSWORD
    }
}

impl Clone for SigningCredentials {
    fn clone(&self) -> Self {
        Self {
            store_file: self.store_file.clone(),
            store_password: SecretString::from(self.store_password.expose_secret().to_owned()),
            key_alias: self.key_alias.clone(),
            key_password: SecretString::from(self.key_password.expose_secret().to_owned()),
            store_type: self.store_type,
        }
    }
}

/// Default debug keystore: `$ANDROID_USER_HOME/debug.keystore`, else
/// `~/.android/debug.keystore`
pub fn default_debug_keystore() -> Option<PathBuf> {
    if let Some(user_home) = std::env::var_os("ANDROID_USER_HOME") {
        return Some(PathBuf::from(user_home).join("debug.keystore"));
    }
    dirs::home_dir().map(|home| home.join(".android").join("debug.keystore"))
}

/// Load credentials, resolving a relative `storeFile` against the
/// descriptor's own directory
pub fn load_credentials(path: &Path) -> Result<Option<SigningCredentials>> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_credentials_in(path, base)
}

/// Load credentials, resolving a relative `storeFile` against `module_dir`
///
/// Returns `Ok(None)` when `path` does not exist. Any other failure to read
/// or interpret the file is a fatal parse error.
pub fn load_credentials_in(path: &Path, module_dir: &Path) -> Result<Option<SigningCredentials>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let note = Error::missing_optional(path);
            tracing::debug!(code = %note.code, "{}", note.message);
            return Ok(None);
        }
        Err(e) => {
            return Err(Error::credentials_parse(path, format!("unreadable: {}", e)).with_source(e));
        }
    };

    let props = parse_properties(&decode(&bytes))
        .map_err(|e| Error::credentials_parse(path, e.to_string()).with_source(e))?;

    let creds = credentials_from_properties(&props, path, module_dir)?;
    tracing::debug!(
        path = %path.display(),
        store_file = %creds.store_file.display(),
        key_alias = %creds.key_alias,
        store_type = %creds.store_type,
        "Loaded signing credentials"
    );

    Ok(Some(creds))
}

fn credentials_from_properties(
    props: &Properties,
    path: &Path,
    module_dir: &Path,
) -> Result<SigningCredentials> {
    for key in REQUIRED_KEYS {
        match props.get(key) {
            None => return Err(Error::missing_credential_key(path, key)),
            Some(value) if value.trim().is_empty() => {
                return Err(Error::credentials_parse(
                    path,
                    format!("empty value for {}", key),
                ));
            }
            Some(_) => {}
        }
    }

    // Checked above
    let value = |key: &str| props.get(key).unwrap_or_default();

    let store_file = PathBuf::from(value(STORE_FILE_KEY).trim());
    let store_file = if store_file.is_absolute() {
        store_file
    } else {
        module_dir.join(store_file)
    };

    Ok(SigningCredentials::new(
        store_file,
        value(STORE_PASSWORD_KEY),
        value(KEY_ALIAS_KEY).trim(),
        value(KEY_PASSWORD_KEY),
    )
    .with_detected_store_type())
}

/// Render credentials in the layout Gradle scripts read
pub fn render_key_properties(creds: &SigningCredentials) -> String {
    let store_file = creds.store_file.to_string_lossy();
    render_properties([
        (STORE_PASSWORD_KEY, creds.store_password.expose_secret()),
        (KEY_PASSWORD_KEY, creds.key_password.expose_secret()),
        (KEY_ALIAS_KEY, creds.key_alias.as_str()),
        (STORE_FILE_KEY, store_file.as_ref()),
    ])
}
