//! CI step: report whether any `FROM` image of a build file is newer than the
//! published package named by `package_tag`.
//!
//! Prints `::set-output name=result::<0|1>` (and appends `result=<0|1>` to
//! `$GITHUB_OUTPUT` when set). Always exits 0; the workflow reads the result.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use dockertools::{
    package_tag_from_env, run_update_check, set_output_line, CheckOutcome, Config, Progress,
    SystemRunner, UpdateCheckConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "check-base-image-updated",
    version,
    about = "Print ::set-output name=result::1 when a base image in the build file is newer than $package_tag."
)]
struct Args {
    /// Build file whose FROM lines name the tracked images
    build_file: PathBuf,

    /// Print every docker invocation
    #[arg(long)]
    verbose: bool,
}

fn append_github_output(value: u8) {
    let Ok(path) = std::env::var("GITHUB_OUTPUT") else {
        return;
    };
    if path.trim().is_empty() {
        return;
    }
    let written = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut f| writeln!(f, "result={value}"));
    if let Err(e) = written {
        eprintln!("check-base-image-updated: cannot write {path}: {e}");
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _ = dockertools::telemetry_init();
    let cfg = Config::load();
    let check = UpdateCheckConfig {
        build_file: args.build_file,
        reference_image: package_tag_from_env(),
        docker: cfg.docker,
    };
    let runner = SystemRunner::new(args.verbose);

    let outcome = run_update_check(&runner, &check, &mut |p: &Progress<'_>| {
        println!("{}", p.render())
    });
    match &outcome {
        CheckOutcome::BuildFileMissing(e) => {
            println!(
                "Error: Dockerfile not found at {} ({e})",
                check.build_file.display()
            );
        }
        CheckOutcome::Checked(report) => {
            if let Some(reason) = &report.reference_error {
                eprintln!("check-base-image-updated: reference unavailable: {reason}");
            }
        }
    }

    let value = outcome.result_value();
    println!("{}", set_output_line(value));
    append_github_output(value);
    ExitCode::from(0)
}
