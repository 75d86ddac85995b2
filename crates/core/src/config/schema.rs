//! Build descriptor schema
//!
//! Declarative inputs for variant resolution. Every section has defaults so
//! an absent or partial `varsign.toml` still describes a buildable module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub sdk: SdkConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub signing: SigningConfig,

    #[serde(default)]
    pub shrink: ShrinkConfig,

    #[serde(default)]
    pub packaging: PackagingConfig,
}

/// Application identity, opaque to resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace used for generated R classes
    #[serde(default = "default_application_id")]
    pub namespace: String,

    /// Package identifier of the installed application
    #[serde(default = "default_application_id")]
    pub application_id: String,

    #[serde(default = "default_version_code")]
    pub version_code: u32,

    #[serde(default = "default_version_name")]
    pub version_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: default_application_id(),
            application_id: default_application_id(),
            version_code: default_version_code(),
            version_name: default_version_name(),
        }
    }
}

fn default_application_id() -> String {
    "com.example.app".to_string()
}

fn default_version_code() -> u32 {
    1
}

fn default_version_name() -> String {
    "1.0.0".to_string()
}

/// Platform version constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default = "default_compile_sdk")]
    pub compile_sdk: u32,

    /// Minimum declared by the UI framework
    #[serde(default = "default_min_sdk")]
    pub min_sdk: u32,

    /// Lowest minimum the module accepts; `min_sdk` is raised to it
    #[serde(default = "default_min_sdk_floor")]
    pub min_sdk_floor: u32,

    #[serde(default = "default_target_sdk")]
    pub target_sdk: u32,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            compile_sdk: default_compile_sdk(),
            min_sdk: default_min_sdk(),
            min_sdk_floor: default_min_sdk_floor(),
            target_sdk: default_target_sdk(),
        }
    }
}

fn default_compile_sdk() -> u32 {
    35
}

fn default_min_sdk() -> u32 {
    21
}

fn default_min_sdk_floor() -> u32 {
    23
}

fn default_target_sdk() -> u32 {
    35
}

/// Compiler and packaging toolchain settings, passed through to the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Pinned NDK version; the plugin default is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndk_version: Option<String>,

    /// Java source/target compatibility and Kotlin `jvmTarget`
    #[serde(default = "default_java_version")]
    pub java_version: u32,

    #[serde(default = "default_multidex")]
    pub multidex: bool,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            ndk_version: None,
            java_version: default_java_version(),
            multidex: default_multidex(),
        }
    }
}

fn default_java_version() -> u32 {
    17
}

fn default_multidex() -> bool {
    true
}

/// Signing inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Credential descriptor, relative to the project root
    #[serde(default = "default_credentials_file")]
    pub credentials_file: PathBuf,

    /// Override for the debug keystore location
    #[serde(default)]
    pub debug_keystore: Option<PathBuf>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            credentials_file: default_credentials_file(),
            debug_keystore: None,
        }
    }
}

fn default_credentials_file() -> PathBuf {
    PathBuf::from("key.properties")
}

/// Code shrinker rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShrinkConfig {
    /// Optimize rules shipped with the Android Gradle plugin, by name
    #[serde(default = "default_rules")]
    pub default_rules: PathBuf,

    /// Project rules, relative to the module directory
    #[serde(default = "default_project_rules")]
    pub project_rules: Vec<PathBuf>,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            default_rules: default_rules(),
            project_rules: default_project_rules(),
        }
    }
}

fn default_rules() -> PathBuf {
    PathBuf::from("proguard-android-optimize.txt")
}

fn default_project_rules() -> Vec<PathBuf> {
    vec![PathBuf::from("proguard-rules.pro")]
}

/// Packaging options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingConfig {
    /// Resource paths left out of the artifact; brace groups are expanded
    #[serde(default = "default_resource_excludes")]
    pub resource_excludes: Vec<String>,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            resource_excludes: default_resource_excludes(),
        }
    }
}

fn default_resource_excludes() -> Vec<String> {
    vec!["/META-INF/{AL2.0,LGPL2.1}".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_descriptor_fills_defaults() {
        let schema: ConfigSchema = toml::from_str(
            r#"
            [app]
            application_id = "com.example.smartstock"

            [sdk]
            min_sdk = 19
            "#,
        )
        .unwrap();

        assert_eq!(schema.app.application_id, "com.example.smartstock");
        assert_eq!(schema.app.namespace, "com.example.app");
        assert_eq!(schema.sdk.min_sdk, 19);
        assert_eq!(schema.sdk.min_sdk_floor, 23);
        assert_eq!(schema.shrink.project_rules, vec![PathBuf::from("proguard-rules.pro")]);
        assert!(schema.signing.debug_keystore.is_none());
        assert_eq!(schema.toolchain, ToolchainConfig::default());
    }

    #[test]
    fn test_toolchain_section() {
        let schema: ConfigSchema = toml::from_str(
            "[toolchain]\nndk_version = \"27.0.12077973\"\nmultidex = false\n",
        )
        .unwrap();

        assert_eq!(schema.toolchain.ndk_version.as_deref(), Some("27.0.12077973"));
        assert_eq!(schema.toolchain.java_version, 17);
        assert!(!schema.toolchain.multidex);
    }

    #[test]
    fn test_empty_project_rules_allowed() {
        let schema: ConfigSchema = toml::from_str("[shrink]\nproject_rules = []\n").unwrap();
        assert!(schema.shrink.project_rules.is_empty());
        assert_eq!(
            schema.shrink.default_rules,
            PathBuf::from("proguard-android-optimize.txt")
        );
    }
}
