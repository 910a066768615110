//! `urlsift scan`: resolve flags into a run, wire the pipeline, report.

use crate::cli::output::{self, Styled};
use crate::config::targets::{parse_target_list, target_dir_name};
use crate::config::{parse_list, parse_status_codes, ApiKeys, FilterFlags, RunConfig};
use crate::error::ConfigError;
use crate::notify::FirstSighting;
use crate::pipeline::{Pipeline, StatsSnapshot};
use crate::scan::{ExternalJsScanner, SecondaryScanner};
use crate::sink::{OutputOptions, OutputWriter};
use crate::sources::{builtin_sources, SourceManager};
use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Root directory for auto-saved results when `-o` is not given.
pub const AUTO_OUTPUT_ROOT: &str = "targets";

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Target domain, e.g. example.com (a leading `*.` enables wildcard scope)
    #[arg(short = 'd', long)]
    pub domain: Option<String>,

    /// File of URLs or hosts to replay through the pipeline
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// File listing target domains, one per line, scanned in turn
    #[arg(short = 't', long = "target-list", conflicts_with_all = ["domain", "input"])]
    pub target_list: Option<PathBuf>,

    /// Output directory (default: targets/<name>, with stdout streaming)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Write results as JSON Lines
    #[arg(long)]
    pub json: bool,

    /// Stream results to stdout as well as to files
    #[arg(long)]
    pub stdout: bool,

    /// Concurrent pipeline workers
    #[arg(short = 'w', long, default_value_t = 20)]
    pub workers: usize,

    /// Delay before each record is processed, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay: u64,

    /// Liveness probe timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Classify sensitive URLs: secrets, configs, backups, VCS, databases, cloud and more
    #[arg(long = "sensitive-urls")]
    pub sensitive_urls: bool,

    /// Classify URLs carrying query parameters
    #[arg(long)]
    pub params: bool,

    /// Classify JavaScript files
    #[arg(long)]
    pub js: bool,

    /// Skip well-known JS libraries (jquery, bootstrap, react, vue)
    #[arg(long)]
    pub exclude_libs: bool,

    /// Classify PDF files
    #[arg(long)]
    pub pdf: bool,

    /// Classify log files
    #[arg(long)]
    pub log: bool,

    /// Classify config files without the full sensitive set
    #[arg(long = "config")]
    pub config_files: bool,

    /// Run JSSecretHunter on discovered JS files (implies --js)
    #[arg(long)]
    pub js_scan: bool,

    /// Accept subdomains of the target
    #[arg(long)]
    pub wildcard: bool,

    /// Keep duplicate URLs
    #[arg(long)]
    pub no_dedup: bool,

    /// Only keep URLs answering with these status codes, e.g. 200,403
    #[arg(long = "mc", value_name = "CODES")]
    pub match_codes: Option<String>,

    /// Comma-separated sources to use (default: all)
    #[arg(long, value_name = "LIST")]
    pub sources: Option<String>,

    /// Write an empty key file to ~/.urlsift/config.json and exit
    #[arg(long)]
    pub init_config: bool,
}

impl ScanArgs {
    fn filter_flags(&self) -> FilterFlags {
        FilterFlags {
            sensitive: self.sensitive_urls,
            params: self.params,
            js: self.js || self.js_scan,
            exclude_libs: self.exclude_libs,
            pdf: self.pdf,
            log: self.log,
            config_files: self.config_files,
        }
    }

    /// Build the run configuration for one target.
    pub fn run_config(&self, domain: Option<&str>) -> Result<RunConfig, ConfigError> {
        let mut builder = RunConfig::builder()
            .wildcard(self.wildcard)
            .workers(self.workers)
            .delay(Duration::from_millis(self.delay))
            .probe_timeout(Duration::from_secs(self.timeout))
            .no_dedup(self.no_dedup)
            .filters(self.filter_flags());

        if let Some(domain) = domain {
            builder = builder.domain(domain);
        }
        if let Some(input) = &self.input {
            builder = builder.input_file(input.clone());
        }
        if let Some(list) = &self.sources {
            builder = builder.sources(parse_list(list));
        }
        if let Some(codes) = &self.match_codes {
            builder = builder.accept_status(parse_status_codes(codes)?);
        }
        builder.build()
    }

    /// Name of the auto-save directory for a single-target run.
    pub fn auto_name(&self) -> String {
        if let Some(domain) = &self.domain {
            return target_dir_name(domain);
        }
        if let Some(stem) = self
            .input
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|s| s.to_str())
        {
            return target_dir_name(stem);
        }
        "unknown".to_string()
    }
}

/// How one target's run ended.
pub struct TargetOutcome {
    pub snapshot: StatsSnapshot,
    pub interrupted: bool,
}

/// Entry point for `urlsift scan` and the bare `urlsift` form.
pub async fn run(args: ScanArgs) -> Result<()> {
    let s = Styled::new();

    if args.init_config {
        let path = ApiKeys::default_path()?;
        if ApiKeys::init_file(&path)? {
            eprintln!("  {} Created {}", s.ok_sym(), path.display());
        } else {
            eprintln!("  {} {} already exists", s.info_sym(), path.display());
        }
        return Ok(());
    }

    let keys = ApiKeys::resolve().context("loading API keys")?;

    if let Some(list) = &args.target_list {
        return run_batch(&args, list, &keys, &s).await;
    }

    if args.domain.is_none() && args.input.is_none() {
        bail!("a target domain (-d), input file (-i) or target list (-t) is required");
    }

    let (out_dir, stdout) = match &args.output {
        Some(dir) => (dir.clone(), args.stdout),
        None => {
            let dir = Path::new(AUTO_OUTPUT_ROOT).join(args.auto_name());
            eprintln!("  {} Auto-save: results go to {}", s.info_sym(), dir.display());
            (dir, true)
        }
    };

    if !args.json && !stdout {
        output::print_header(&s);
    }
    run_target(&args, args.domain.as_deref(), out_dir, stdout, &keys, &s).await?;
    Ok(())
}

async fn run_batch(args: &ScanArgs, list: &Path, keys: &ApiKeys, s: &Styled) -> Result<()> {
    let targets = parse_target_list(list)?;
    let total = targets.len();
    eprintln!(
        "  {} Batch mode: {total} targets from {}",
        s.info_sym(),
        list.display()
    );

    for (idx, target) in targets.iter().enumerate() {
        let root = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(AUTO_OUTPUT_ROOT));
        let out_dir = root.join(target_dir_name(target));

        eprintln!();
        eprintln!(
            "  {} [{}/{total}] {}",
            s.info_sym(),
            idx + 1,
            s.cyan(target)
        );

        let outcome = run_target(args, Some(target), out_dir, args.stdout, keys, s)
            .await
            .with_context(|| format!("scanning {target}"))?;
        if outcome.interrupted {
            eprintln!("  {} Interrupted, skipping remaining targets", s.warn_sym());
            return Ok(());
        }
        eprintln!("  {} Completed {target}", s.ok_sym());
    }

    eprintln!();
    eprintln!(
        "  {} {}",
        s.ok_sym(),
        s.green(&format!("Batch complete: {total} targets"))
    );
    Ok(())
}

/// Run the core once for one target and print its summary.
async fn run_target(
    args: &ScanArgs,
    domain: Option<&str>,
    out_dir: PathBuf,
    stdout: bool,
    keys: &ApiKeys,
    s: &Styled,
) -> Result<TargetOutcome> {
    let config = Arc::new(args.run_config(domain)?);

    let sink = OutputWriter::create(OutputOptions {
        dir: Some(out_dir.clone()),
        json: args.json,
        stdout,
    })
    .with_context(|| format!("preparing output in {}", out_dir.display()))?;

    let mut pipeline =
        Pipeline::new(Arc::clone(&config), Arc::new(sink)).context("building probe client")?;

    if !args.json && !stdout {
        let flash = Styled::new();
        pipeline = pipeline.with_notifier(Arc::new(FirstSighting::new(move |category| {
            eprintln!("{}", output::flash_line(&flash, category));
        })));
    }

    if args.js_scan {
        match ExternalJsScanner::discover() {
            Some(scanner) if scanner.is_available() => {
                pipeline = pipeline.with_scanner(Arc::new(scanner), Some(out_dir.clone()));
            }
            _ => warn!("JSSecretHunter not found under ~/tools, JS secret scans disabled"),
        }
    }

    let pipeline = Arc::new(pipeline);
    let stats = pipeline.stats();

    let mut manager = SourceManager::new(Arc::clone(&config), keys.clone());
    for source in builtin_sources(&config, keys) {
        manager.register(source);
    }

    let label = config
        .domain
        .clone()
        .or_else(|| args.input.as_ref().map(|p| p.display().to_string()))
        .unwrap_or_default();
    info!(target = %label, output = %out_dir.display(), "scan started");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let rx = manager.start_all(&cancel);
    pipeline
        .start(cancel.clone(), rx)
        .await
        .context("pipeline task failed")?;
    signal.abort();

    let snapshot = stats.snapshot();
    if args.json {
        output::print_json(&serde_json::json!({ "target": label, "summary": snapshot }));
    } else {
        output::print_summary(s, &label, &snapshot);
        eprintln!("  Results: {}", s.dim(&out_dir.display().to_string()));
    }

    Ok(TargetOutcome {
        snapshot,
        interrupted: cancel.is_cancelled(),
    })
}
