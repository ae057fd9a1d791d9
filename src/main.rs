//! lyra-validate - humanoid character validator
//!
//! Prints the bone validation report of a VRM file and optionally runs the
//! repair pipeline on it.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lyra_avatar::{
    config::{Config, LoaderConfig},
    humanoid::{fix_vrm_bones, validate_vrm, ValidationReport},
    loader::CharacterLoader,
};

/// Validate (and optionally repair) a VRM humanoid character
#[derive(Parser, Debug)]
#[command(name = "lyra-validate", version, about, long_about = None)]
struct Args {
    /// Path to the VRM file
    file: PathBuf,

    /// Attempt to fix issues
    #[arg(short, long)]
    fix: bool,

    /// Where the fixed file would be written
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", lyra_avatar::NAME, lyra_avatar::VERSION);

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    if !args.file.exists() {
        anyhow::bail!("File not found: {}", args.file.display());
    }

    // Report the file as it is; repair only on request.
    let loader = CharacterLoader::new(LoaderConfig {
        auto_repair: false,
        ..config.loader.clone()
    });
    println!("Loading VRM file: {}", args.file.display());
    let loaded = loader
        .load(&args.file)
        .await
        .with_context(|| format!("Error processing VRM file {}", args.file.display()))?;
    let mut character = loaded.character;

    print_report("VRM VALIDATION REPORT", &loaded.report, args.json, false)?;

    if args.fix && !loaded.report.valid {
        let output = args.output.clone().unwrap_or_else(|| default_output_path(&args.file));

        println!("\n=== ATTEMPTING TO FIX VRM ISSUES ===");
        let outcome = fix_vrm_bones(&mut character);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        if outcome.succeeded() {
            println!("✓ Successfully applied fixes");
            let report = validate_vrm(&character);
            print_report("UPDATED VRM VALIDATION REPORT", &report, args.json, true)?;

            println!("\nFixed VRM would be saved to: {}", output.display());
            println!("(Saving functionality not yet implemented)");
        } else {
            println!("✗ Could not automatically fix all issues");
            if !outcome.still_missing.is_empty() {
                let missing: Vec<String> = outcome.still_missing.iter().map(|r| r.to_string()).collect();
                println!("Still missing: {}", missing.join(", "));
            }
            println!("Some issues require manual intervention in a 3D modeling application");
        }
    }

    Ok(())
}

/// `<dir>/<stem>-fixed.<ext>`
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}-fixed.{}", stem, ext.to_string_lossy()),
        None => format!("{}-fixed", stem),
    };
    input.with_file_name(name)
}

fn print_report(title: &str, report: &ValidationReport, json: bool, updated: bool) -> anyhow::Result<()> {
    println!("\n=== {} ===", title);
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match (report.valid, updated) {
        (true, false) => println!("✓ VRM is valid and ready for animation"),
        (false, false) => println!("✗ VRM has issues that need to be addressed"),
        (true, true) => println!("✓ VRM is now valid and ready for animation"),
        (false, true) => println!("✗ VRM still has some issues that need manual attention"),
    }

    println!("\nBone Mapping");
    let mapping = &report.bone_mapping;
    if mapping.valid {
        println!("✓ Valid");
    } else {
        println!("✗ Invalid");
        if !mapping.missing_bones.is_empty() {
            println!("Missing Bones:");
            for bone in &mapping.missing_bones {
                println!("{}", bone);
            }
        }
        if !mapping.incorrect_bones.is_empty() {
            println!("Incorrect Bone Names:");
            for bone in &mapping.incorrect_bones {
                println!("{}", bone);
            }
        }
    }

    println!("\nSkeleton Hierarchy");
    if report.skeleton_hierarchy.valid {
        println!("✓ Valid");
    } else {
        println!("✗ Invalid");
        println!("Hierarchy Issues:");
        for issue in &report.skeleton_hierarchy.issues {
            println!("- {}", issue);
        }
    }

    println!("\nAnimation Readiness");
    if report.animation_readiness.ready {
        println!("✓ Ready for Animation");
    } else {
        println!("✗ Not Ready for Animation");
        println!("Animation Issues:");
        for issue in &report.animation_readiness.issues {
            println!("- {}", issue);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("models/Lyra.vrm")),
            PathBuf::from("models/Lyra-fixed.vrm")
        );
        assert_eq!(default_output_path(Path::new("rig")), PathBuf::from("rig-fixed"));
    }

    #[test]
    fn test_cli_flags() {
        let args = Args::parse_from(["lyra-validate", "Lyra.vrm", "-f", "-o", "out.vrm"]);
        assert!(args.fix);
        assert_eq!(args.output, Some(PathBuf::from("out.vrm")));
        assert!(!args.json);
    }
}
