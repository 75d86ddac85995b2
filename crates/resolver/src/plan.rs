//! Whole-variant resolution
//!
//! A [`Resolver`] is built once from an explicit [`ResolverContext`]. It
//! loads the optional credential descriptor and validates the static parts
//! of the descriptor up front; each [`Resolver::resolve`] call is then a pure
//! function of the variant and the files on disk.

use crate::credentials::{default_debug_keystore, load_credentials_in, SigningCredentials};
use crate::packaging::PackagingRules;
use crate::sdk::{resolve_sdk, SdkBounds};
use crate::shrink::{resolve_shrinking, RulesFiles, ShrinkPolicy};
use crate::signing::{resolve_signing, SigningPolicy, SigningSummary};
use crate::variant::Variant;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use varsign_core::config::{ConfigSchema, ToolchainConfig};
use varsign_core::error::{Error, Result, ResultExt};

/// Everything resolution depends on, gathered by the caller
#[derive(Debug, Clone)]
pub struct ResolverContext {
    /// Build descriptor
    pub descriptor: ConfigSchema,
    /// Application module directory; rules files and keystores resolve here
    pub module_dir: PathBuf,
    /// Location of `key.properties`
    pub credentials_file: PathBuf,
    /// Location of the debug keystore
    pub debug_keystore: PathBuf,
}

impl ResolverContext {
    /// Derive file locations from the descriptor
    ///
    /// The credentials file resolves against the project root (the module's
    /// parent directory). Without a configured debug keystore the SDK
    /// default under the user's home is used.
    pub fn new(descriptor: ConfigSchema, module_dir: impl Into<PathBuf>) -> Result<Self> {
        let module_dir = module_dir.into();
        let project_root = project_root(&module_dir);

        let credentials_file = project_root.join(&descriptor.signing.credentials_file);
        let debug_keystore = match &descriptor.signing.debug_keystore {
            Some(path) => project_root.join(path),
            None => default_debug_keystore().ok_or_else(|| {
                Error::config("Cannot locate the debug keystore: no home directory")
                    .with_suggestion("Set signing.debug_keystore in varsign.toml")
            })?,
        };

        Ok(Self {
            descriptor,
            module_dir,
            credentials_file,
            debug_keystore,
        })
    }

    /// Use a different credential descriptor
    #[must_use]
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = path.into();
        self
    }

    /// Use a different debug keystore
    #[must_use]
    pub fn with_debug_keystore(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_keystore = path.into();
        self
    }
}

fn project_root(module_dir: &Path) -> PathBuf {
    match module_dir.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Application identity carried into the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppIdentity {
    /// Namespace for generated classes
    pub namespace: String,
    /// Installed package identifier
    pub application_id: String,
    /// Monotonic build number
    pub version_code: u32,
    /// User-visible version
    pub version_name: String,
}

impl AppIdentity {
    fn from_descriptor(descriptor: &ConfigSchema) -> Result<Self> {
        let app = &descriptor.app;
        if app.application_id.trim().is_empty() {
            return Err(Error::invalid_value("app.application_id", "must not be empty"));
        }
        if app.namespace.trim().is_empty() {
            return Err(Error::invalid_value("app.namespace", "must not be empty"));
        }
        if app.version_code == 0 {
            return Err(Error::invalid_value("app.version_code", "must be greater than zero"));
        }

        Ok(Self {
            namespace: app.namespace.clone(),
            application_id: app.application_id.clone(),
            version_code: app.version_code,
            version_name: app.version_name.clone(),
        })
    }
}

/// Resolved configuration for one variant
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Variant this plan is for
    pub variant: Variant,
    /// Application identity
    pub app: AppIdentity,
    /// Effective SDK bounds
    pub sdk: SdkBounds,
    /// NDK, Java level and multidex, unchanged from the descriptor
    pub toolchain: ToolchainConfig,
    /// Signing identity and whether it fell back
    pub signing: SigningPolicy,
    /// Minification settings
    pub shrink: ShrinkPolicy,
    /// Resource exclusions
    pub packaging: PackagingRules,
}

impl BuildPlan {
    /// Serializable, secret-free view
    pub fn report(&self) -> PlanReport {
        PlanReport {
            variant: self.variant,
            app: self.app.clone(),
            sdk: self.sdk,
            toolchain: self.toolchain.clone(),
            signing: self.signing.summary(),
            shrink: self.shrink.clone(),
            packaging: self.packaging.clone(),
        }
    }
}

/// JSON form of a [`BuildPlan`]
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    /// Variant this plan is for
    pub variant: Variant,
    /// Application identity
    pub app: AppIdentity,
    /// Effective SDK bounds
    pub sdk: SdkBounds,
    /// Toolchain settings
    pub toolchain: ToolchainConfig,
    /// Signing without secrets
    pub signing: SigningSummary,
    /// Minification settings
    pub shrink: ShrinkPolicy,
    /// Resource exclusions
    pub packaging: PackagingRules,
}

/// Resolves build plans from a fixed context
#[derive(Debug)]
pub struct Resolver {
    context: ResolverContext,
    credentials: Option<SigningCredentials>,
    app: AppIdentity,
    sdk: SdkBounds,
    rules: RulesFiles,
    packaging: PackagingRules,
}

impl Resolver {
    /// Load credentials and validate the descriptor
    ///
    /// A missing credential file is fine; a malformed one aborts.
    pub fn new(context: ResolverContext) -> Result<Self> {
        let credentials = load_credentials_in(&context.credentials_file, &context.module_dir)
            .context("Loading release signing credentials")?;
        let app = AppIdentity::from_descriptor(&context.descriptor)?;
        let sdk = resolve_sdk(&context.descriptor.sdk)?;
        if context.descriptor.toolchain.java_version < 8 {
            return Err(Error::invalid_value(
                "toolchain.java_version",
                format!("{} is older than Java 8", context.descriptor.toolchain.java_version),
            ));
        }
        let rules = RulesFiles::from_config(&context.descriptor.shrink, &context.module_dir);
        let packaging =
            PackagingRules::from_patterns(&context.descriptor.packaging.resource_excludes)?;

        Ok(Self {
            context,
            credentials,
            app,
            sdk,
            rules,
            packaging,
        })
    }

    /// Context the resolver was built from
    pub fn context(&self) -> &ResolverContext {
        &self.context
    }

    /// Release credentials, if the descriptor was present
    pub fn credentials(&self) -> Option<&SigningCredentials> {
        self.credentials.as_ref()
    }

    /// Declared shrinker rules
    pub fn rules(&self) -> &RulesFiles {
        &self.rules
    }

    /// Resolve signing, shrinking and packaging for `variant`
    pub fn resolve(&self, variant: Variant) -> Result<BuildPlan> {
        let signing = resolve_signing(
            variant,
            self.credentials.clone(),
            &self.context.debug_keystore,
        );
        let shrink = resolve_shrinking(variant, &self.rules)?;

        tracing::info!(
            variant = %variant,
            application_id = %self.app.application_id,
            identity = signing.identity().label(),
            insecure_fallback = signing.used_insecure_fallback(),
            minify = shrink.minify_enabled(),
            "Resolved build plan"
        );

        Ok(BuildPlan {
            variant,
            app: self.app.clone(),
            sdk: self.sdk,
            toolchain: self.context.descriptor.toolchain.clone(),
            signing,
            shrink,
            packaging: self.packaging.clone(),
        })
    }

    /// Resolve every known variant; each resolution is independent
    pub fn resolve_all(&self) -> Vec<(Variant, Result<BuildPlan>)> {
        Variant::ALL
            .par_iter()
            .map(|&variant| (variant, self.resolve(variant)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{Resolved, SigningIdentity};
    use tempfile::TempDir;
    use varsign_core::ErrorCode;

    struct Project {
        dir: TempDir,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            std::fs::create_dir_all(dir.path().join("android/app")).unwrap();
            Self { dir }
        }

        fn module(&self) -> PathBuf {
            self.dir.path().join("android/app")
        }

        fn with_rules(self) -> Self {
            std::fs::write(self.module().join("proguard-rules.pro"), "-keep class io.flutter.** { *; }\n")
                .unwrap();
            self
        }

        fn with_key_properties(self, content: &str) -> Self {
            std::fs::write(self.dir.path().join("android/key.properties"), content).unwrap();
            self
        }

        fn resolver(&self) -> Result<Resolver> {
            let context = ResolverContext::new(ConfigSchema::default(), self.module())?
                .with_debug_keystore(self.dir.path().join("debug.keystore"));
            Resolver::new(context)
        }
    }

    #[test]
    fn test_context_locations() {
        let project = Project::new();
        let context = ResolverContext::new(ConfigSchema::default(), project.module()).unwrap();
        assert_eq!(
            context.credentials_file,
            project.dir.path().join("android/key.properties")
        );
    }

    #[test]
    fn test_debug_scenario() {
        let project = Project::new();
        let plan = project.resolver().unwrap().resolve(Variant::Debug).unwrap();

        assert!(!plan.shrink.minify_enabled());
        assert!(!plan.shrink.shrink_resources());
        assert!(plan.shrink.rules_files().is_empty());
        assert!(plan.signing.identity().is_debug());
        assert!(!plan.signing.used_insecure_fallback());
        assert_eq!(plan.sdk.min_sdk, 23);
    }

    #[test]
    fn test_release_without_credentials_scenario() {
        let project = Project::new().with_rules();
        let plan = project.resolver().unwrap().resolve(Variant::Release).unwrap();

        assert!(plan.signing.used_insecure_fallback());
        assert!(matches!(
            plan.signing.resolution,
            Resolved::Fallback(SigningIdentity::Debug(_))
        ));
        assert!(plan.shrink.minify_enabled());
        assert!(plan.shrink.shrink_resources());
        assert_eq!(
            plan.shrink.rules_files(),
            &[
                PathBuf::from("proguard-android-optimize.txt"),
                project.module().join("proguard-rules.pro"),
            ]
        );
    }

    #[test]
    fn test_release_with_credentials_scenario() {
        let project = Project::new().with_rules().with_key_properties(
            "storePassword=sp\nkeyPassword=kp\nkeyAlias=upload\nstoreFile=upload.jks\n",
        );
        let plan = project.resolver().unwrap().resolve(Variant::Release).unwrap();

        assert!(!plan.signing.used_insecure_fallback());
        let creds = plan.signing.identity().credentials();
        assert_eq!(creds.key_alias, "upload");
        assert_eq!(creds.store_file, project.module().join("upload.jks"));
    }

    #[test]
    fn test_malformed_credentials_abort() {
        let project = Project::new().with_rules().with_key_properties("keyAlias=upload\n");
        let err = project.resolver().unwrap_err();

        assert!(err.is_parse_error());
        assert_eq!(err.context.as_deref(), Some("Loading release signing credentials"));
    }

    #[test]
    fn test_release_missing_rules_aborts() {
        let project = Project::new();
        let err = project.resolver().unwrap().resolve(Variant::Release).unwrap_err();
        assert_eq!(err.code, ErrorCode::RulesFileNotFound);
        assert!(err.message.contains("proguard-rules.pro"));
    }

    #[test]
    fn test_resolve_all_reports_each_variant() {
        let project = Project::new();
        let results = project.resolver().unwrap().resolve_all();

        assert_eq!(results.len(), 2);
        for (variant, result) in results {
            match variant {
                Variant::Debug => assert!(result.is_ok()),
                Variant::Release => assert!(result.is_err()),
            }
        }
    }

    #[test]
    fn test_report_serializes_without_secrets() {
        let project = Project::new().with_rules().with_key_properties(
            "storePassword=hunter2\nkeyPassword=hunter3\nkeyAlias=upload\nstoreFile=upload.jks\n",
        );
        let plan = project.resolver().unwrap().resolve(Variant::Release).unwrap();
        let json = serde_json::to_value(plan.report()).unwrap();

        assert_eq!(json["variant"], "release");
        assert_eq!(json["signing"]["identity"], "release");
        assert_eq!(json["shrink"]["shrink_resources"], true);
        assert_eq!(json["packaging"]["excludes"][1], "/META-INF/LGPL2.1");
        assert_eq!(json["toolchain"]["java_version"], 17);
        assert_eq!(json["toolchain"]["multidex"], true);
        assert!(!json.to_string().contains("hunter"));
    }

    #[test]
    fn test_release_with_only_project_rules() {
        let project = Project::new().with_rules();
        assert!(!project.module().join("proguard-android-optimize.txt").exists());

        let plan = project.resolver().unwrap().resolve(Variant::Release).unwrap();
        assert_eq!(
            plan.shrink.rules_files()[0],
            PathBuf::from("proguard-android-optimize.txt")
        );
    }

    #[test]
    fn test_ancient_java_version_rejected() {
        let project = Project::new();
        let mut descriptor = ConfigSchema::default();
        descriptor.toolchain.java_version = 6;

        let context = ResolverContext::new(descriptor, project.module())
            .unwrap()
            .with_debug_keystore(project.dir.path().join("debug.keystore"));
        let err = Resolver::new(context).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
        assert!(err.message.contains("toolchain.java_version"));
    }

    #[test]
    fn test_empty_application_id_rejected() {
        let project = Project::new();
        let mut descriptor = ConfigSchema::default();
        descriptor.app.application_id = "  ".to_string();

        let context = ResolverContext::new(descriptor, project.module())
            .unwrap()
            .with_debug_keystore(project.dir.path().join("debug.keystore"));
        let err = Resolver::new(context).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfigValue);
    }
}
