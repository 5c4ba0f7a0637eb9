//! App shell Android CLI
//!
//! Validates, inspects, renders and imports the Android build descriptor.

use anyhow::Result;
use appshell_android::descriptor::BuildDescriptor;
use appshell_android::format::{self, DescriptorFormat};
use appshell_android::gradle;
use appshell_android::validate::{ValidatedDescriptor, ValidationPolicy};
use appshell_cli::output::{self, Status};
use appshell_core::config::Config;
use appshell_core::error::{exit_codes, Error};
use appshell_telemetry::{Timer, TelemetryConfig};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "appshell-android")]
#[command(about = "Build descriptor tools for the app shell's Android target")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

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
    /// Validate a build descriptor
    Validate {
        /// Descriptor file (defaults to general.descriptor from config)
        file: Option<PathBuf>,
        /// Treat release signing with debug keys as fatal
        #[arg(long)]
        production: bool,
        /// Fail on any warning
        #[arg(long)]
        deny_warnings: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved build settings
    Show {
        /// Descriptor file (defaults to general.descriptor from config)
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render build.gradle.kts from a descriptor
    Render {
        /// Descriptor file (defaults to general.descriptor from config)
        file: Option<PathBuf>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a descriptor from an existing build.gradle.kts
    Import {
        /// Gradle build script (defaults to build.gradle.kts)
        gradle_file: Option<PathBuf>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format when writing to stdout: toml, json
        #[arg(long, default_value = "toml")]
        format: String,
    },

    /// Write the reference descriptor
    Init {
        /// Destination (defaults to general.descriptor from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
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
    output::set_quiet(cli.quiet);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e);
            std::process::exit(e.exit_code());
        }
    };

    let level = appshell_telemetry::level_for(cli.verbose, cli.quiet, &config.schema.logging.level);
    appshell_telemetry::init_with_config(TelemetryConfig::with_level(level))?;
    match &config.path {
        Some(path) => tracing::debug!(path = %path.display(), "Loaded tool configuration"),
        None => tracing::debug!("No tool configuration found, using defaults"),
    }

    let command = cli.command.name();
    tracing::debug!(command, "Running command");

    let exit_code = match cli.command {
        Commands::Validate { file, production, deny_warnings, json } => {
            let policy = ValidationPolicy {
                production: production || config.schema.policy.production,
                deny_warnings: deny_warnings || config.schema.policy.deny_warnings,
            };
            run_validate(&descriptor_path(file, &config), policy, json)
        }
        Commands::Show { file, json } => {
            run_show(&descriptor_path(file, &config), json)
        }
        Commands::Render { file, output } => {
            run_render(&descriptor_path(file, &config), output.as_deref())
        }
        Commands::Import { gradle_file, output, format } => {
            let gradle_file = gradle_file.unwrap_or_else(|| PathBuf::from(gradle::BUILD_SCRIPT));
            run_import(&gradle_file, output.as_deref(), &format)
        }
        Commands::Init { output, force } => {
            run_init(&descriptor_path(output, &config), force)
        }
    };

    tracing::debug!(command, exit_code, "Command finished");
    std::process::exit(exit_code);
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Show { .. } => "show",
            Commands::Render { .. } => "render",
            Commands::Import { .. } => "import",
            Commands::Init { .. } => "init",
        }
    }
}

fn descriptor_path(file: Option<PathBuf>, config: &Config) -> PathBuf {
    file.unwrap_or_else(|| PathBuf::from(&config.schema.general.descriptor))
}

fn load_validated(path: &Path, policy: ValidationPolicy) -> Result<ValidatedDescriptor, Error> {
    let descriptor = format::load(path)?;
    Ok(descriptor.validate(policy)?)
}

fn report_error(err: &Error) {
    Status::error(&format!("[{}] {}", err.code, err.message));
    if let Some(context) = &err.context {
        Status::hint(context);
    }
    if let Some(suggestion) = &err.suggestion {
        Status::hint(&format!("Suggestion: {}", suggestion));
    }
}

fn report_diagnostics(validated: &ValidatedDescriptor) {
    for diagnostic in validated.diagnostics() {
        Status::warning(&diagnostic.to_string());
        Status::hint(&diagnostic.suggestion());
    }
}

fn run_validate(path: &Path, policy: ValidationPolicy, json: bool) -> i32 {
    let timer = Timer::start("validate");
    let result = load_validated(path, policy);
    let elapsed = timer.stop();

    if json {
        let report = match &result {
            Ok(validated) => serde_json::json!({
                "valid": true,
                "descriptor": path.display().to_string(),
                "warnings": validated.diagnostics(),
            }),
            Err(e) => serde_json::json!({
                "valid": false,
                "descriptor": path.display().to_string(),
                "error": e.to_report(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return result.map_or_else(|e| e.exit_code(), |_| exit_codes::SUCCESS);
    }

    match result {
        Ok(validated) => {
            report_diagnostics(&validated);
            let warnings = validated.diagnostics().len();
            Status::success(&format!(
                "{} is valid ({}, {})",
                path.display(),
                output::format_count(warnings, "warning", "warnings"),
                output::format_duration(elapsed)
            ));
            exit_codes::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    }
}

fn run_show(path: &Path, json: bool) -> i32 {
    let validated = match load_validated(path, ValidationPolicy::default()) {
        Ok(validated) => validated,
        Err(e) => {
            report_error(&e);
            return e.exit_code();
        }
    };

    let bounds = validated.sdk_bounds();
    let signing = validated.signing();

    if json {
        let report = serde_json::json!({
            "applicationId": validated.application_id(),
            "namespace": validated.namespace(),
            "pluginChain": validated.plugin_chain(),
            "sdkBounds": bounds,
            "nativeToolchainVersion": validated.native_toolchain_version(),
            "supportedArchitectures": validated.abi_set(),
            "signing": signing,
            "dependencies": validated.dependencies(),
            "sourceRoot": validated.source_root().display().to_string(),
            "warnings": validated.diagnostics(),
        });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        return exit_codes::SUCCESS;
    }

    Status::header(validated.application_id());
    Status::detail("namespace", validated.namespace());
    Status::detail("plugins", &output::format_list(validated.plugin_chain()));
    Status::detail(
        "sdk (min/target/compile)",
        &format!(
            "{} / {} / {}",
            bounds.min_platform_version, bounds.target_platform_version, bounds.compile_version
        ),
    );
    Status::detail("ndk", validated.native_toolchain_version());
    Status::detail("abis", &output::format_list(validated.abi_set()));

    let key_store = match signing.key_alias {
        Some(alias) => format!("{} ({})", signing.key_store, alias),
        None => signing.key_store.to_string(),
    };
    Status::detail("signing", &format!("{} via {}", signing.profile, key_store));

    let dependencies: Vec<String> = validated
        .dependencies()
        .iter()
        .map(|d| format!("{} [{}]", d.notation(), d.constraint_kind()))
        .collect();
    Status::detail("dependencies", &output::format_list(&dependencies));
    Status::detail("source root", &validated.source_root().display().to_string());

    report_diagnostics(&validated);
    exit_codes::SUCCESS
}

fn run_render(path: &Path, output: Option<&Path>) -> i32 {
    let validated = match load_validated(path, ValidationPolicy::default()) {
        Ok(validated) => validated,
        Err(e) => {
            report_error(&e);
            return e.exit_code();
        }
    };
    report_diagnostics(&validated);

    let script = gradle::render_kts(&validated);
    match output {
        None => {
            print!("{}", script);
            exit_codes::SUCCESS
        }
        Some(out) => match std::fs::write(out, script) {
            Ok(()) => {
                Status::success(&format!("Wrote {}", out.display()));
                exit_codes::SUCCESS
            }
            Err(e) => {
                let e = Error::from(e).with_context(format!("Writing {}", out.display()));
                report_error(&e);
                e.exit_code()
            }
        },
    }
}

fn run_import(gradle_file: &Path, output: Option<&Path>, format_name: &str) -> i32 {
    let result = gradle::import_file(gradle_file).and_then(|descriptor| {
        let validated = descriptor.validate(ValidationPolicy::default())?;
        report_diagnostics(&validated);
        let descriptor = validated.into_inner();
        match output {
            Some(out) => {
                format::save(&descriptor, out)?;
                Status::success(&format!(
                    "Imported {} into {}",
                    gradle_file.display(),
                    out.display()
                ));
            }
            None => {
                let format: DescriptorFormat = format_name.parse()?;
                print!("{}", format::to_string(&descriptor, format)?);
            }
        }
        Ok(())
    });

    match result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    }
}

fn run_init(path: &Path, force: bool) -> i32 {
    if path.exists() && !force {
        let e = Error::file_exists(path);
        report_error(&e);
        return e.exit_code();
    }

    match format::save(&BuildDescriptor::template(), path) {
        Ok(()) => {
            Status::success(&format!("Wrote {}", path.display()));
            Status::info("Release builds are signed with the debug keys until signingKeyStore is set");
            exit_codes::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            e.exit_code()
        }
    }
}
