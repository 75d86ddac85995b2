//! varsign CLI
//!
//! Resolves signing identity, shrink policy and packaging rules for the
//! build variants of an Android application module.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use varsign_cli::output::{format_count, format_flag, Status};
use varsign_core::config::Config;
use varsign_core::error::{exit_codes, Error};
use varsign_resolver::credentials::{load_credentials_in, render_key_properties};
use varsign_resolver::packaging::PackagingRules;
use varsign_resolver::sdk::resolve_sdk;
use varsign_resolver::{BuildPlan, Resolver, ResolverContext, SigningCredentials, Variant};
use varsign_telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "varsign")]
#[command(about = "Resolve signing and shrink policy for Android build variants")]
#[command(version)]
struct Cli {
    /// Build descriptor path (default: varsign.toml, .varsign.toml or android/varsign.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Application module directory
    #[arg(short, long, global = true, default_value = "android/app")]
    module_dir: PathBuf,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the plan for one variant
    Resolve {
        /// Variant: debug, release
        #[arg(long, default_value = "release")]
        variant: String,
        /// Credential descriptor (overrides signing.credentials_file)
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Fail when release signing falls back to the debug key
        #[arg(long)]
        strict: bool,
    },

    /// Resolve the plan for every variant
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// Fail when release signing falls back to the debug key
        #[arg(long)]
        strict: bool,
    },

    /// Check signing inputs and rules files without resolving
    Check {
        /// Treat a missing credential descriptor as an error
        #[arg(long)]
        strict: bool,
    },

    /// Write a key.properties template
    Init {
        /// Keystore path to record, relative to the module directory
        #[arg(long, default_value = "upload-keystore.jks")]
        store_file: PathBuf,
        /// Key alias to record
        #[arg(long, default_value = "upload")]
        alias: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let mut telemetry = TelemetryConfig::from_verbosity(cli.verbose, cli.quiet);
    if cli.no_color {
        telemetry = telemetry.without_ansi();
    }
    varsign_telemetry::init_with_config(telemetry)?;

    let exit_code = match &cli.command {
        Commands::Resolve {
            variant,
            credentials,
            json,
            strict,
        } => run_resolve(&cli, variant, credentials.as_deref(), *json, *strict),
        Commands::Plan { json, strict } => run_plan(&cli, *json, *strict),
        Commands::Check { strict } => run_check(&cli, *strict),
        Commands::Init {
            store_file,
            alias,
            force,
        } => run_init(&cli, store_file, alias, *force),
    };

    std::process::exit(exit_code);
}

fn load_context(cli: &Cli) -> varsign_core::Result<ResolverContext> {
    let config = Config::load(cli.config.as_deref(), Path::new("."))?;
    ResolverContext::new(config.schema, &cli.module_dir)
}

fn build_resolver(cli: &Cli, credentials: Option<&Path>) -> varsign_core::Result<Resolver> {
    let mut context = load_context(cli)?;
    if let Some(path) = credentials {
        context = context.with_credentials_file(path);
    }
    Resolver::new(context)
}

fn fail(err: &Error, json: bool) -> i32 {
    if json {
        let report = serde_json::json!({ "error": err.to_report() });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        Status::error(&err.to_string());
    }
    err.exit_code()
}

fn run_resolve(
    cli: &Cli,
    variant: &str,
    credentials: Option<&Path>,
    json: bool,
    strict: bool,
) -> i32 {
    let variant: Variant = match variant.parse() {
        Ok(v) => v,
        Err(e) => return fail(&e, json),
    };

    let plan = match build_resolver(cli, credentials).and_then(|r| r.resolve(variant)) {
        Ok(plan) => plan,
        Err(e) => return fail(&e, json),
    };

    if json {
        match serde_json::to_string_pretty(&plan.report()) {
            Ok(out) => println!("{}", out),
            Err(e) => return fail(&e.into(), json),
        }
    } else if !cli.quiet {
        print_plan(&plan);
    }

    finish(&[&plan], strict)
}

fn run_plan(cli: &Cli, json: bool, strict: bool) -> i32 {
    let resolver = match build_resolver(cli, None) {
        Ok(r) => r,
        Err(e) => return fail(&e, json),
    };

    let results = resolver.resolve_all();
    let mut plans = Vec::new();
    let mut exit_code = exit_codes::SUCCESS;
    let mut reports = serde_json::Map::new();

    for (variant, result) in &results {
        match result {
            Ok(plan) => {
                if json {
                    match serde_json::to_value(plan.report()) {
                        Ok(value) => {
                            reports.insert(variant.to_string(), value);
                        }
                        Err(e) => return fail(&e.into(), json),
                    }
                } else if !cli.quiet {
                    print_plan(plan);
                }
                plans.push(plan);
            }
            Err(e) => {
                if json {
                    reports.insert(
                        variant.to_string(),
                        serde_json::json!({ "error": e.to_report() }),
                    );
                } else {
                    Status::error(&format!("{}: {}", variant, e));
                }
                if exit_code == exit_codes::SUCCESS {
                    exit_code = e.exit_code();
                }
            }
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::Value::Object(reports)).unwrap_or_default()
        );
    }

    let signing_exit = finish(&plans, strict);
    if exit_code == exit_codes::SUCCESS {
        signing_exit
    } else {
        exit_code
    }
}

/// Surface insecure fallbacks and pick the exit code
fn finish(plans: &[&BuildPlan], strict: bool) -> i32 {
    let mut fell_back = false;
    for plan in plans.iter().filter(|p| p.signing.used_insecure_fallback()) {
        fell_back = true;
        let keystore = plan.signing.identity().credentials().store_file.display().to_string();
        let using = format!("Signing with the debug key at {}", keystore);
        Status::alert(
            &format!("{} build is NOT release-signed", plan.variant),
            &[
                "No release signing credentials were found.",
                using.as_str(),
                "Do not distribute this artifact. Run `varsign init` to create key.properties.",
            ],
        );
    }

    if fell_back && strict {
        exit_codes::INSECURE_FALLBACK
    } else {
        exit_codes::SUCCESS
    }
}

fn print_plan(plan: &BuildPlan) {
    Status::header(&format!("Build plan: {}", plan.variant));

    Status::field("application id", &plan.app.application_id);
    Status::field("namespace", &plan.app.namespace);
    Status::field(
        "version",
        &format!("{} ({})", plan.app.version_name, plan.app.version_code),
    );
    Status::field(
        "sdk",
        &format!(
            "min {} / target {} / compile {}",
            plan.sdk.min_sdk, plan.sdk.target_sdk, plan.sdk.compile_sdk
        ),
    );
    let toolchain = &plan.toolchain;
    Status::field(
        "toolchain",
        &format!(
            "java {} / ndk {} / multidex {}",
            toolchain.java_version,
            toolchain.ndk_version.as_deref().unwrap_or("default"),
            format_flag(toolchain.multidex)
        ),
    );

    let identity = plan.signing.identity();
    let creds = identity.credentials();
    Status::field(
        "signing",
        &format!(
            "{} ({} @ {}, {})",
            identity.label(),
            creds.key_alias,
            creds.store_file.display(),
            creds.store_type
        ),
    );
    Status::field(
        "insecure fallback",
        if plan.signing.used_insecure_fallback() {
            "yes"
        } else {
            "no"
        },
    );

    Status::field("minify", format_flag(plan.shrink.minify_enabled()));
    Status::field("shrink resources", format_flag(plan.shrink.shrink_resources()));
    let rules = plan.shrink.rules_files();
    Status::field(
        "rules",
        &format_count(rules.len(), "rules file", "rules files"),
    );
    for rule in rules {
        println!("    {}", rule.display());
    }

    let excludes = plan.packaging.excludes();
    Status::field(
        "excludes",
        &format_count(excludes.len(), "pattern", "patterns"),
    );
    for exclude in excludes {
        println!("    {}", exclude);
    }
}

fn run_check(cli: &Cli, strict: bool) -> i32 {
    let config = match Config::load(cli.config.as_deref(), Path::new(".")) {
        Ok(c) => c,
        Err(e) => return fail(&e, false),
    };
    let descriptor_source = config
        .path
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    let context = match ResolverContext::new(config.schema, &cli.module_dir) {
        Ok(c) => c,
        Err(e) => return fail(&e, false),
    };

    Status::header("Signing check");
    Status::info(&format!("Descriptor: {}", descriptor_source));

    let mut first_error: Option<Error> = None;
    let mut record = |err: Error| {
        Status::error(&err.to_string());
        first_error.get_or_insert(err);
    };

    let mut fell_back = false;
    match load_credentials_in(&context.credentials_file, &context.module_dir) {
        Ok(Some(creds)) => {
            Status::success(&format!(
                "Release credentials: {} @ {} ({})",
                creds.key_alias,
                creds.store_file.display(),
                creds.store_type
            ));
            if !creds.store_file.is_file() {
                Status::warning(&format!(
                    "Keystore not found: {}",
                    creds.store_file.display()
                ));
            }
        }
        Ok(None) => {
            fell_back = true;
            Status::warning(&format!(
                "No {}; release builds will be signed with the debug key",
                context.credentials_file.display()
            ));
        }
        Err(e) => record(e),
    }

    if context.debug_keystore.is_file() {
        Status::success(&format!("Debug keystore: {}", context.debug_keystore.display()));
    } else {
        Status::warning(&format!(
            "Debug keystore not found: {} (the build toolchain creates it on first use)",
            context.debug_keystore.display()
        ));
    }

    let rules = varsign_resolver::RulesFiles::from_config(
        &context.descriptor.shrink,
        &context.module_dir,
    );
    Status::info(&format!(
        "Default rules: {} (provided by the build toolchain)",
        rules.default_rules.display()
    ));
    let missing = rules.missing();
    for path in rules.project_rules.iter().filter(|p| !missing.contains(p)) {
        Status::success(&format!("Rules file: {}", path.display()));
    }
    for path in &missing {
        record(Error::rules_file_not_found(path).with_context("Required by the release variant"));
    }

    match resolve_sdk(&context.descriptor.sdk) {
        Ok(sdk) => Status::success(&format!(
            "SDK: min {} / target {} / compile {}",
            sdk.min_sdk, sdk.target_sdk, sdk.compile_sdk
        )),
        Err(e) => record(e),
    }

    match PackagingRules::from_patterns(&context.descriptor.packaging.resource_excludes) {
        Ok(packaging) => Status::success(&format!(
            "Packaging: {}",
            format_count(packaging.excludes().len(), "exclude pattern", "exclude patterns")
        )),
        Err(e) => record(e),
    }

    if let Some(err) = first_error {
        return err.exit_code();
    }
    if fell_back && strict {
        return exit_codes::INSECURE_FALLBACK;
    }
    exit_codes::SUCCESS
}

fn run_init(cli: &Cli, store_file: &Path, alias: &str, force: bool) -> i32 {
    let context = match load_context(cli) {
        Ok(c) => c,
        Err(e) => return fail(&e, false),
    };
    let target = &context.credentials_file;

    if target.exists() && !force {
        Status::error(&format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        ));
        return exit_codes::FAILURE;
    }

    let template = SigningCredentials::new(store_file, "change-me", alias, "change-me");
    let content = format!(
        "# Release signing credentials. Keep this file out of version control.\n{}",
        render_key_properties(&template)
    );

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return fail(&e.into(), false);
        }
    }
    if let Err(e) = std::fs::write(target, content) {
        return fail(&Error::from(e).with_context(format!("Writing {}", target.display())), false);
    }

    Status::success(&format!("Wrote {}", target.display()));
    Status::info("Replace the placeholder passwords and add the file to .gitignore");
    exit_codes::SUCCESS
}
