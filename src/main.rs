// gsm-lookup - Resolve secrets from Google Secret Manager
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gsm_lookup::cloud::gcp::access_token_from_env;
use gsm_lookup::cloud::SecretManagerClient;
use gsm_lookup::config::{
    detect_project_id, global_config_path, resolve_project, LookupConfig, CONFIG_FILE_NAME,
};
use gsm_lookup::resolver::SecretResolver;
use tracing_subscriber::EnvFilter;

/// gsm-lookup - Resolve secrets from Google Secret Manager
#[derive(Parser, Debug)]
#[command(name = "gsm-lookup")]
#[command(version)]
#[command(about = "Look up secrets stored in Google Secret Manager", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check prerequisites and system configuration
    Doctor,

    /// Resolve one or more secrets and print their values
    Lookup {
        /// Secret names, or `name.key1.key2` with --nested
        #[arg(required = true)]
        terms: Vec<String>,

        /// Google Cloud project ID (auto-detected if not specified)
        #[arg(short, long)]
        project: Option<String>,

        /// Path to a configuration file (default: gsm-lookup.yaml if present)
        #[arg(short, long)]
        config: Option<String>,

        /// Secrets contain nested JSON values
        #[arg(long, overrides_with = "no_nested")]
        nested: bool,

        /// Turn off `nested` set in the configuration file
        #[arg(long, overrides_with = "nested")]
        no_nested: bool,

        /// Join the values into one extended secret
        #[arg(long, overrides_with = "no_join")]
        join: bool,

        /// Turn off `join` set in the configuration file
        #[arg(long, overrides_with = "join")]
        no_join: bool,

        /// Terms were expanded from a hierarchy (disables --join)
        #[arg(long, overrides_with = "no_bypath")]
        bypath: bool,

        /// Turn off `bypath` set in the configuration file
        #[arg(long, overrides_with = "bypath")]
        no_bypath: bool,

        /// Version of the secret(s) (default: latest)
        #[arg(long)]
        version_id: Option<String>,

        /// Stage of the secret version
        #[arg(long)]
        version_stage: Option<String>,

        /// Action if the secret is missing: error, warn or skip
        #[arg(long)]
        on_missing: Option<String>,

        /// Action if access to the secret is denied: error, warn or skip
        #[arg(long)]
        on_denied: Option<String>,

        /// Print one value per line instead of a JSON array
        #[arg(long, default_value = "false")]
        raw: bool,
    },
}

struct LookupArgs {
    terms: Vec<String>,
    config_path: Option<String>,
    overrides: LookupConfig,
    raw: bool,
}

fn run_lookup(args: LookupArgs) -> Result<()> {
    // Step 1: Merge file configuration with command-line flags
    let file_config = match &args.config_path {
        Some(path) => LookupConfig::from_file(path)
            .with_context(|| format!("Failed to load config from: {}", path))?,
        None => LookupConfig::from_current_dir()?.unwrap_or_default(),
    };
    let project_flag = args.overrides.project.clone();
    let config = file_config.clone().merge(args.overrides);

    // Step 2: Validate policies before touching the network
    let options = config
        .into_options()
        .context("Configuration validation failed")?;

    // Step 3: The --project flag wins, then the usual detection order
    let project = resolve_project(project_flag, Some(&file_config))?
        .context("No project ID found. Pass --project or set GSM_LOOKUP_PROJECT")?;

    // Step 4: Fetch secrets
    let client = SecretManagerClient::from_env()?;
    let resolver = SecretResolver::new(client, project);
    let values = resolver.resolve(&args.terms, &options)?;

    if args.raw {
        for value in &values {
            println!("{}", value);
        }
    } else {
        println!("{}", serde_json::to_string(&values)?);
    }

    Ok(())
}

/// Tri-state for a `--flag` / `--no-flag` pair; `None` keeps the file value.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn run_doctor() -> Result<()> {
    println!("🔍 gsm-lookup Doctor");
    println!("Checking prerequisites...\n");

    let mut all_checks_passed = true;

    // Check 1: access token
    print!("1. Checking for an access token in the environment... ");
    let has_token = access_token_from_env().is_some();
    if has_token {
        println!("✓");
    } else {
        println!("⊘");
        println!("   ⚠️  GSM_LOOKUP_ACCESS_TOKEN / GOOGLE_OAUTH_ACCESS_TOKEN not set, gcloud will be used");
    }

    // Check 2: gcloud installation, required only without a token
    print!("2. Checking if 'gcloud' is installed... ");
    if which::which("gcloud").is_ok() {
        println!("✓");
    } else if has_token {
        println!("⊘");
        println!("   ⚠️  Skipped (access token provided)");
    } else {
        println!("✗");
        println!("   ❌ 'gcloud' is not installed or not in PATH");
        println!("   📦 Install from: https://cloud.google.com/sdk/docs/install");
        all_checks_passed = false;
    }

    // Check 3: project detection
    print!("3. Detecting Google Cloud project... ");
    match detect_project_id() {
        Ok(Some(project)) => println!("✓ ({})", project),
        Ok(None) => {
            println!("✗");
            println!("   ❌ No project found");
            println!(
                "   💡 Set GSM_LOOKUP_PROJECT or add `project:` to {}",
                CONFIG_FILE_NAME
            );
            all_checks_passed = false;
        }
        Err(e) => {
            println!("✗");
            println!("   ❌ Error reading configuration: {}", e);
            all_checks_passed = false;
        }
    }

    // Check 4: global config, informational
    print!("4. Checking global config... ");
    match global_config_path() {
        Ok(path) if path.exists() => println!("✓ ({})", path.display()),
        Ok(path) => {
            println!("⊘");
            println!("   ⚠️  Not found: {}", path.display());
        }
        Err(e) => {
            println!("⊘");
            println!("   ⚠️  {}", e);
        }
    }

    println!();
    if all_checks_passed {
        println!("✅ All checks passed! Your system is ready.");
        Ok(())
    } else {
        println!("❌ Some checks failed. Please fix the issues above.");
        Err(anyhow::anyhow!("Doctor checks failed"))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Doctor => {
            if let Err(e) = run_doctor() {
                eprintln!("\nError: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Lookup {
            terms,
            project,
            config,
            nested,
            no_nested,
            join,
            no_join,
            bypath,
            no_bypath,
            version_id,
            version_stage,
            on_missing,
            on_denied,
            raw,
        } => {
            let args = LookupArgs {
                terms,
                config_path: config,
                overrides: LookupConfig {
                    project,
                    version_id,
                    version_stage,
                    nested: toggle(nested, no_nested),
                    join: toggle(join, no_join),
                    bypath: toggle(bypath, no_bypath),
                    on_missing,
                    on_denied,
                },
                raw,
            };
            if let Err(e) = run_lookup(args) {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
