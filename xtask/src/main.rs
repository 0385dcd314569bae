use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use edi_bridge_core::config::{
    parse_enabled_transaction_sets, ENABLED_TRANSACTION_SETS_VAR, FUNCTION_NAME_VAR,
};
use edi_bridge_core::resource_ids::{parse_resource_ids, RESOURCE_IDS_FILE_NAME};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the EDI bridge workspace",
    long_about = "A unified CLI for packaging the EDI bridge Lambda functions,\n\
                  rendering their deploy-time environment, and running CI checks."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci,
    /// Build and package Rust Lambda artifacts as `dist/{function}.zip`
    ServerlessPackage {
        /// Compilation target triple for Lambda binaries
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for binaries
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
    /// Merge `.env` and resource ids into `dist/{function}.env.json`
    DeployEnv {
        /// Base environment file in KEY=VALUE format
        #[arg(long, default_value = ".env")]
        env_file: PathBuf,
        /// Directory holding one sub-directory per transaction set
        #[arg(long, env = "BRIDGE_RESOURCES_DIR", default_value = "resources")]
        resources_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

struct LambdaFunction {
    name: &'static str,
    bin: &'static str,
}

const LAMBDA_FUNCTIONS: [LambdaFunction; 2] = [
    LambdaFunction {
        name: "read-inbound-edi",
        bin: "read_inbound_edi",
    },
    LambdaFunction {
        name: "write-outbound-edi",
        bin: "write_outbound_edi",
    },
];

const DIST_DIR: &str = "dist";

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_serverless_lambdas(target: &str, profile: BuildProfile) {
    ensure_rust_target_installed(target);
    ensure_c_linker_available(target);

    step("Build serverless lambda binaries");

    let mut cargo_args = vec!["build", "-p", "edi_bridge_lambda", "--target", target];
    for function in &LAMBDA_FUNCTIONS {
        cargo_args.extend(["--bin", function.bin]);
    }
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifacts");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create lambda dist directory");

    let mut packaged = Vec::new();
    for function in &LAMBDA_FUNCTIONS {
        let zip_path = dist_dir.join(format!("{}.zip", function.name));
        package_lambda_zip(
            &target_dir.join(binary_name(function.bin, target)),
            &zip_path,
        );
        packaged.push(zip_path);
    }

    eprintln!("\nPackaged artifacts:");
    for path in packaged {
        eprintln!("- {}", path.display());
    }
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- serverless-package`"
        );
    }
}

fn ensure_c_linker_available(target: &str) {
    if !cfg!(windows) || !target.ends_with("unknown-linux-gnu") {
        return;
    }

    let env_override_keys = [
        format!("CC_{}", target.replace('-', "_")),
        format!("CC_{target}"),
        "TARGET_CC".to_string(),
        "CC".to_string(),
    ];

    for key in env_override_keys {
        if let Ok(value) = std::env::var(&key) {
            let candidate = value.trim();
            if !candidate.is_empty() && tool_works(candidate) {
                return;
            }
        }
    }

    let canonical = "x86_64-linux-gnu-gcc";
    if tool_works(canonical) {
        return;
    }

    panic!(
        "missing C cross-linker for target `{target}`. install `{canonical}` (or set CC_x86_64_unknown_linux_gnu) before running `cargo run -p xtask -- serverless-package`.\n\
         Tip: the TLS stack behind the HTTP clients needs a Linux C toolchain when cross-compiling from Windows."
    );
}

fn tool_works(program: &str) -> bool {
    let mut parts = program.split_whitespace();
    let Some(bin) = parts.next() else {
        return false;
    };
    let args: Vec<&str> = parts.collect();

    Command::new(bin)
        .args(&args)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected lambda binary at '{}'", binary_path.display());
    }

    let binary = fs::read(binary_path).expect("failed to read lambda binary");
    let file = fs::File::create(zip_path).expect("failed to create lambda zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in lambda zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");
    zip.finish().expect("failed to finish lambda zip");
}

// ── deploy environment ─────────────────────────────────────────────

fn read_key_values(path: &Path) -> BTreeMap<String, String> {
    let contents = fs::read_to_string(path)
        .unwrap_or_else(|error| panic!("failed to read '{}': {error}", path.display()));
    parse_resource_ids(&contents)
}

fn write_deploy_env(env_file: &Path, resources_dir: &Path) {
    step("Collect deploy environment");

    let mut merged = if env_file.exists() {
        read_key_values(env_file)
    } else {
        eprintln!("warning: '{}' not found; using resource ids only", env_file.display());
        BTreeMap::new()
    };

    let enabled = merged
        .get(ENABLED_TRANSACTION_SETS_VAR)
        .cloned()
        .or_else(|| std::env::var(ENABLED_TRANSACTION_SETS_VAR).ok())
        .unwrap_or_else(|| {
            panic!(
                "{ENABLED_TRANSACTION_SETS_VAR} must be configured in '{}' or the environment",
                env_file.display()
            )
        });

    for transaction_set in parse_enabled_transaction_sets(&enabled) {
        let path = resources_dir
            .join(&transaction_set)
            .join(RESOURCE_IDS_FILE_NAME);
        if !path.exists() {
            panic!(
                "missing resource ids for `{transaction_set}` at '{}'. run `cargo run -p edi_bridge_lambda --bin bridge_setup -- create-guides` and `create-mappings` first",
                path.display()
            );
        }
        merged.extend(read_key_values(&path));
    }

    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir).expect("failed to create dist directory");

    for function in &LAMBDA_FUNCTIONS {
        let mut environment = merged.clone();
        environment.insert(FUNCTION_NAME_VAR.to_string(), function.name.to_string());

        let path = dist_dir.join(format!("{}.env.json", function.name));
        let rendered =
            serde_json::to_string_pretty(&environment).expect("environment should serialize");
        fs::write(&path, rendered)
            .unwrap_or_else(|error| panic!("failed to write '{}': {error}", path.display()));
        eprintln!("- {}", path.display());
    }
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test edi_bridge_core");
    run_cargo(&["test", "-p", "edi_bridge_core"]);

    step("Test edi_bridge_lambda");
    run_cargo(&["test", "-p", "edi_bridge_lambda"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci => {
            ci_check();
            eprintln!("\nCI job passed.");
        }
        Commands::ServerlessPackage { target, profile } => {
            package_serverless_lambdas(&target, profile);
        }
        Commands::DeployEnv {
            env_file,
            resources_dir,
        } => {
            write_deploy_env(&env_file, &resources_dir);
        }
    }
}
