use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "texcombine", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack four channel sources into one image.
    Pack(PackArgs),
    /// Upgrade a legacy material record to HDRP/Lit, packing its mask and detail maps.
    Migrate(MigrateArgs),
}

#[derive(Parser, Debug)]
struct PackArgs {
    /// Combine spec JSON. Mutually exclusive with the per-channel flags.
    #[arg(long, conflicts_with_all = ["r", "g", "b", "a", "out"])]
    spec: Option<PathBuf>,

    /// Red source as `<path|#hex>:<channel>` (channel 0..=4, negative inverts).
    #[arg(long, allow_hyphen_values = true)]
    r: Option<String>,

    /// Green source as `<path|#hex>:<channel>`.
    #[arg(long, allow_hyphen_values = true)]
    g: Option<String>,

    /// Blue source as `<path|#hex>:<channel>`.
    #[arg(long, allow_hyphen_values = true)]
    b: Option<String>,

    /// Alpha source as `<path|#hex>:<channel>`.
    #[arg(long, allow_hyphen_values = true)]
    a: Option<String>,

    /// Output path relative to the root; the extension picks the encoding.
    #[arg(long)]
    out: Option<String>,

    /// Remap one output channel, e.g. `a=0:0.8`. Repeatable.
    #[arg(long = "remap", value_parser = parse_remap, allow_hyphen_values = true)]
    remaps: Vec<(texcombine::OutputChannel, texcombine::RemapRange)>,

    /// Resampling filter.
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,

    /// Root directory for sources and output. Defaults to the spec's directory, else `.`.
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(flatten)]
    threading: ThreadingArgs,
}

#[derive(Parser, Debug)]
struct MigrateArgs {
    /// Input material JSON. Repeatable.
    #[arg(long = "in", required_unless_present = "dir")]
    in_paths: Vec<PathBuf>,

    /// Upgrade every material JSON under this directory (recursive).
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Project root that material texture paths are relative to.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Output material JSON for a single input. Printed to stdout when omitted.
    #[arg(long, conflicts_with_all = ["out_dir", "in_place", "dir"])]
    out: Option<PathBuf>,

    /// Write upgraded materials under this directory, keeping their relative names.
    #[arg(long, conflicts_with = "in_place")]
    out_dir: Option<PathBuf>,

    /// Overwrite each input with its upgraded record.
    #[arg(long)]
    in_place: bool,

    /// Continue past failed materials and report them at the end.
    #[arg(long)]
    keep_going: bool,

    #[command(flatten)]
    threading: ThreadingArgs,
}

#[derive(clap::Args, Debug)]
struct ThreadingArgs {
    /// Assemble pixels on the calling thread only.
    #[arg(long)]
    sequential: bool,

    /// Worker threads for parallel assembly.
    #[arg(long)]
    threads: Option<usize>,
}

impl ThreadingArgs {
    fn opts(&self) -> texcombine::CompositorOpts {
        texcombine::CompositorOpts {
            parallel: !self.sequential,
            threads: self.threads,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterChoice {
    Bilinear,
    Nearest,
}

impl From<FilterChoice> for texcombine::SampleFilter {
    fn from(c: FilterChoice) -> Self {
        match c {
            FilterChoice::Bilinear => Self::Bilinear,
            FilterChoice::Nearest => Self::Nearest,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Pack(args) => cmd_pack(args),
        Command::Migrate(args) => cmd_migrate(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_remap(s: &str) -> Result<(texcombine::OutputChannel, texcombine::RemapRange), String> {
    let (ch, range) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <channel>=<min>:<max>, got '{s}'"))?;
    let ch = match ch.trim().to_ascii_lowercase().as_str() {
        "r" => texcombine::OutputChannel::R,
        "g" => texcombine::OutputChannel::G,
        "b" => texcombine::OutputChannel::B,
        "a" => texcombine::OutputChannel::A,
        other => return Err(format!("unknown channel '{other}' (expected r, g, b or a)")),
    };
    let (min, max) = range
        .split_once(':')
        .ok_or_else(|| format!("expected <min>:<max>, got '{range}'"))?;
    let min: f32 = min.trim().parse().map_err(|e| format!("min '{min}': {e}"))?;
    let max: f32 = max.trim().parse().map_err(|e| format!("max '{max}': {e}"))?;
    Ok((ch, texcombine::RemapRange::new(min, max)))
}

fn cmd_pack(args: PackArgs) -> anyhow::Result<()> {
    let (spec, default_root) = match &args.spec {
        Some(path) => {
            let spec = texcombine::CombineSpec::from_path(path)?;
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            (spec, dir)
        }
        None => (spec_from_flags(&args)?, PathBuf::from(".")),
    };
    let root = args.root.clone().unwrap_or(default_root);

    let mut req = spec.to_request();
    if let Some(filter) = args.filter {
        req.filter = filter.into();
    }
    for (ch, range) in &args.remaps {
        req.set_remapping(*ch, range.min, range.max);
    }

    let compositor = texcombine::Compositor::new(
        Arc::new(texcombine::ChannelSourceResolver::new(&root)),
        args.threading.opts(),
    );
    let mut sink = texcombine::FsSink::new(&root);
    let packed = compositor
        .combine(&req, &mut sink)
        .with_context(|| format!("pack '{}'", req.destination))?;

    eprintln!(
        "wrote {} ({}x{})",
        root.join(packed.handle.path()).display(),
        packed.width(),
        packed.height()
    );
    Ok(())
}

fn spec_from_flags(args: &PackArgs) -> anyhow::Result<texcombine::CombineSpec> {
    let slot = |name: &str, v: &Option<String>| -> anyhow::Result<texcombine::SlotSpec> {
        let v = v
            .as_deref()
            .with_context(|| format!("--{name} is required without --spec"))?;
        texcombine::SlotSpec::parse_shorthand(v).with_context(|| format!("--{name}"))
    };
    Ok(texcombine::CombineSpec {
        r: slot("r", &args.r)?,
        g: slot("g", &args.g)?,
        b: slot("b", &args.b)?,
        a: slot("a", &args.a)?,
        filter: texcombine::SampleFilter::default(),
        out: args
            .out
            .clone()
            .context("--out is required without --spec")?,
    })
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let compositor = texcombine::Compositor::new(
        Arc::new(texcombine::ChannelSourceResolver::new(&args.root)),
        args.threading.opts(),
    );
    let upgrader = texcombine::MaterialUpgrader::new(compositor);
    let mut sink = texcombine::FsSink::new(&args.root);

    let batch = args.dir.is_some() || args.in_paths.len() > 1 || args.out_dir.is_some();
    if !batch && !args.in_place {
        return migrate_one(&upgrader, &args, &mut sink);
    }

    let jobs = migrate_jobs(&args)?;
    let policy = if args.keep_going {
        texcombine::FailurePolicy::KeepGoing
    } else {
        texcombine::FailurePolicy::Abort
    };
    let report = upgrader.upgrade_batch(&jobs, policy, &mut sink);

    for (input, err) in report.failures() {
        eprintln!("failed {}: {err}", input.display());
    }
    eprintln!(
        "migrated {}, skipped {}, failed {}, not run {}",
        report.upgraded_count(),
        report.skipped_count(),
        report.failed_count(),
        report.not_run.len()
    );
    if !report.is_success() {
        anyhow::bail!(
            "{} of {} materials failed",
            report.failed_count(),
            jobs.len()
        );
    }
    Ok(())
}

fn migrate_one(
    upgrader: &texcombine::MaterialUpgrader,
    args: &MigrateArgs,
    sink: &mut texcombine::FsSink,
) -> anyhow::Result<()> {
    let in_path = args
        .in_paths
        .first()
        .context("--in is required without --dir")?;
    let src = texcombine::MaterialRecord::from_path(in_path)?;
    let dst = upgrader
        .upgrade(&src, sink)
        .with_context(|| format!("migrate material '{}'", src.name))?;

    match &args.out {
        Some(out) => {
            texcombine::write_material(out, &dst)?;
            eprintln!("wrote {}", out.display());
        }
        None => println!("{}", dst.to_json_pretty()?),
    }
    Ok(())
}

/// Inputs from `--in` and `--dir`, paired with where their upgraded records go.
fn migrate_jobs(args: &MigrateArgs) -> anyhow::Result<Vec<texcombine::MaterialJob>> {
    let mut named: Vec<(PathBuf, PathBuf)> = Vec::new();
    for path in &args.in_paths {
        let name = path
            .file_name()
            .with_context(|| format!("'{}' is not a file path", path.display()))?;
        named.push((path.clone(), PathBuf::from(name)));
    }
    if let Some(dir) = &args.dir {
        for path in texcombine::find_material_files(dir)? {
            let rel = path.strip_prefix(dir).unwrap_or(&path).to_path_buf();
            named.push((path, rel));
        }
    }

    let mut seen = std::collections::BTreeSet::new();
    let mut jobs = Vec::with_capacity(named.len());
    for (input, rel) in named {
        let job = match &args.out_dir {
            Some(out_dir) => texcombine::MaterialJob::new(&input, out_dir.join(&rel)),
            None if args.in_place => texcombine::MaterialJob::in_place(&input),
            None => anyhow::bail!("several materials need --out-dir or --in-place"),
        };
        if !seen.insert(job.output.clone()) {
            anyhow::bail!("two inputs would both write '{}'", job.output.display());
        }
        jobs.push(job);
    }
    Ok(jobs)
}
