use std::process::ExitCode;

use critplane_core::{CriticalPlane, StressUnit};
use critplane_io::{run_job, save_report, DamageReport, Job};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("usage: critplane run <job.json> [--report <out.json>] [--json]");
    eprintln!("       critplane check <job.json>");
}

fn format_unit(unit: StressUnit) -> String {
    format!("stress_unit: {}", unit.symbol())
}

fn format_critical(critical: &CriticalPlane) -> String {
    format!(
        "max_damage={:.6e} theta={:.1} deg phi={:.1} deg (cell {},{})",
        critical.max_damage,
        critical.theta_deg,
        critical.phi_deg,
        critical.theta_index,
        critical.phi_index,
    )
}

fn print_summary(report: &DamageReport) {
    println!("job: {}", report.job);
    println!("{}", format_unit(report.stress_unit));
    for channel in &report.channels {
        println!(
            "{}: {} samples={}",
            channel.channel,
            format_critical(&channel.critical),
            channel.num_samples,
        );
        if !channel.failures.is_empty() {
            println!("  failed_cells: {}", channel.failures.len());
        }
    }
    if let Some(worst) = report.most_damaged() {
        println!("most_damaged: {}", worst.channel);
    }
}

struct RunArgs {
    job: String,
    report: Option<String>,
    json: bool,
}

fn parse_run_args(args: &[String]) -> Option<RunArgs> {
    let mut job = None;
    let mut report = None;
    let mut json = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--report" => report = Some(iter.next()?.clone()),
            "--json" => json = true,
            other if other.starts_with("--") => return None,
            other if job.is_none() => job = Some(other.to_string()),
            _ => return None,
        }
    }
    Some(RunArgs {
        job: job?,
        report,
        json,
    })
}

fn run(args: RunArgs) -> ExitCode {
    let job = match Job::load(&args.job) {
        Ok(job) => job,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };
    let report = match run_job(&job) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: {err}");
                return ExitCode::from(1);
            }
        }
    } else {
        print_summary(&report);
    }

    if let Some(path) = args.report {
        if let Err(err) = save_report(&path, &report) {
            eprintln!("error: {err}");
            return ExitCode::from(1);
        }
        tracing::info!(path = %path, "report written");
    }
    ExitCode::SUCCESS
}

fn check(path: &str) -> ExitCode {
    let result = Job::load(path).and_then(|job| {
        job.validate()?;
        let series = job.build_series()?;
        Ok((job, series))
    });
    match result {
        Ok((job, series)) => {
            println!("job: {}", job.name);
            for s in &series {
                println!("{}: {} samples", s.channel, s.len());
            }
            println!(
                "grid: {} x {}, bins: {}",
                job.config.num_theta_steps, job.config.num_phi_steps, job.config.num_stress_bins
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("run") => match parse_run_args(&args[2..]) {
            Some(run_args) => run(run_args),
            None => {
                usage();
                ExitCode::from(2)
            }
        },
        Some("check") if args.len() == 3 => check(&args[2]),
        _ => {
            usage();
            ExitCode::from(2)
        }
    }
}
