//! Build-variant resolution for Android application modules
//!
//! This crate decides, for each build variant:
//! - Which signing identity applies (release credentials or the debug key)
//! - Whether code and resources are shrunk, and with which rules
//! - The effective SDK bounds and packaging exclusions
//!
//! # Example
//!
//! ```rust,no_run
//! use varsign_core::config::Config;
//! use varsign_resolver::{Resolver, ResolverContext, Variant};
//!
//! let config = Config::load(None, std::path::Path::new(".")).expect("descriptor");
//! let context = ResolverContext::new(config.schema, "android/app").expect("context");
//! let plan = Resolver::new(context)
//!     .and_then(|r| r.resolve(Variant::Release))
//!     .expect("release plan");
//!
//! if plan.signing.used_insecure_fallback() {
//!     eprintln!("release build is signed with the debug key");
//! }
//! ```

#![warn(missing_docs)]

pub mod credentials;
pub mod packaging;
pub mod plan;
pub mod properties;
pub mod sdk;
pub mod shrink;
pub mod signing;
pub mod variant;

pub use credentials::{load_credentials, load_credentials_in, KeystoreType, SigningCredentials};
pub use plan::{BuildPlan, PlanReport, Resolver, ResolverContext};
pub use shrink::{resolve_shrinking, RulesFiles, ShrinkPolicy};
pub use signing::{resolve_signing, Resolved, SigningIdentity, SigningPolicy};
pub use variant::Variant;
