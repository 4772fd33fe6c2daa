// Main entry point for specstream
//
// Plays the role of a small test-execution engine: it runs a scripted
// demo suite and feeds every lifecycle transition to the reporter. A real
// engine would discover examples from spec files instead.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use specstream::capture;
use specstream::cli::Cli;
use specstream::event::{ExampleOutcome, TestIdentity};
use specstream::report::JsonlReporter;

use std::fs::File;
use std::io::{self, Write};

/// One scripted example. A body of `None` marks the example pending.
struct DemoExample {
    identity: TestIdentity,
    body: Option<fn() -> ExampleOutcome>,
}

fn demo_suite() -> Vec<DemoExample> {
    vec![
        DemoExample {
            identity: TestIdentity::new(
                "/work/demo/specs/calculator.spec",
                "specs/calculator.spec",
                4,
            ),
            body: Some(|| {
                println!("adding 2 + 2");
                ExampleOutcome::Passed
            }),
        },
        DemoExample {
            identity: TestIdentity::new(
                "/work/demo/specs/calculator.spec",
                "specs/calculator.spec",
                11,
            ),
            body: Some(|| ExampleOutcome::Passed),
        },
        DemoExample {
            identity: TestIdentity::new(
                "/work/demo/specs/calculator.spec",
                "specs/calculator.spec",
                18,
            ),
            body: Some(|| {
                println!("comparing totals");
                ExampleOutcome::Failed {
                    message_lines: vec!["expected 10".to_string(), "got 7".to_string()],
                }
            }),
        },
        DemoExample {
            identity: TestIdentity::new("/work/demo/specs/parser.spec", "specs/parser.spec", 3),
            body: Some(|| ExampleOutcome::Failed {
                message_lines: vec![
                    "ParseError: unexpected end of input".to_string(),
                    "while reading specs/fixtures/empty.doc".to_string(),
                ],
            }),
        },
        DemoExample {
            identity: TestIdentity::new("/work/demo/specs/parser.spec", "specs/parser.spec", 12),
            body: None,
        },
    ]
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose {
        "specstream=debug,warn"
    } else {
        "specstream=warn,error"
    };

    use tracing_subscriber::EnvFilter;

    // Diagnostics go to stderr: stdout carries the JSONL stream and the
    // demo examples' own output.
    tracing_subscriber::fmt()
        .event_format(specstream::logging::EventFormatter)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.verbose {
        info!("Starting specstream v{}", env!("CARGO_PKG_VERSION"));
    }

    // Handle completion flag
    if let Some(shell_type) = &cli.completion {
        handle_completion(shell_type)?;
        return Ok(());
    }

    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?),
        None => Box::new(io::stdout()),
    };

    let mut reporter = JsonlReporter::new(sink).with_captured_output(cli.capture_enabled());
    if let Some(sender) = &cli.sender {
        reporter = reporter.with_sender(sender.clone());
    }

    run_suite(&mut reporter, cli.capture_enabled())
}

fn run_suite(reporter: &mut JsonlReporter<Box<dyn Write>>, capture_enabled: bool) -> Result<()> {
    let suite = demo_suite();
    info!("Running {} demo example(s)", suite.len());
    reporter.report_start(suite.len())?;

    let mut failed = 0usize;
    for example in &suite {
        let Some(body) = example.body else {
            reporter.report_pending(&example.identity)?;
            continue;
        };

        let (outcome, captured) = if capture_enabled {
            let (outcome, text) = capture::capture(body).with_context(|| {
                format!(
                    "stdout capture failed for {}:{}",
                    example.identity.small_filepath, example.identity.line_number
                )
            })?;
            (outcome, Some(text))
        } else {
            (body(), None)
        };

        match outcome {
            ExampleOutcome::Passed => reporter.report_passed(&example.identity, captured)?,
            ExampleOutcome::Failed { message_lines } => {
                failed += 1;
                reporter.report_failed(&example.identity, captured, message_lines)?;
            }
        }
    }

    if failed > 0 {
        warn!("{} example(s) failed", failed);
        std::process::exit(1);
    }

    Ok(())
}

fn handle_completion(shell_type: &str) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let shell = match shell_type {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        "powershell" => Shell::PowerShell,
        // Unreachable through the CLI; its value_parser vets the input
        _ => return Err(anyhow::anyhow!("Unsupported shell type '{}'", shell_type)),
    };

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, &bin_name, &mut std::io::stdout());

    Ok(())
}
