//! tilescan: tile an individual genome into FastJ.
//!
//! Usage: tilescan <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tilescan::commands::{CheckCommand, TileCommand, TileError};
use tilescan::config::{GapFill, ScanConfig, DEFAULT_BUILD, DEFAULT_TAG_LEN};
use tilescan::policy::VariantPolicy;
use tilescan::streaming::open_output;

#[derive(Parser)]
#[command(name = "tilescan")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "tilescan: convert reference-anchored variant calls into tag-bounded FastJ tiles", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tile a diff stream against a reference tile library
    Tile {
        /// Reference tile library (FastJ, optionally gzipped)
        #[arg(short = 'l', long)]
        library: PathBuf,

        /// Reference FASTA (optionally gzipped)
        #[arg(short = 'r', long)]
        reference: PathBuf,

        /// Diff stream (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output FastJ file (use - for stdout, .gz to compress)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Tag length in bases
        #[arg(long = "tag-length", default_value_t = DEFAULT_TAG_LEN)]
        tag_length: u64,

        /// Variant policy: reported, heta, random or regex
        #[arg(short = 'P', long = "variant-policy", default_value = "reported")]
        variant_policy: VariantPolicy,

        /// Allow variants on tags instead of merging tiles
        #[arg(short = 'T', long = "allow-variant-on-tag")]
        allow_variant_on_tag: bool,

        /// Fill positions without a diff record from the reference
        #[arg(long = "fill-no-call-with-ref")]
        fill_no_call_with_ref: bool,

        /// Seed for the random allele policy
        #[arg(short = 'S', long, default_value = "0")]
        seed: u64,

        /// Note placed first on every tile
        #[arg(short = 'a', long)]
        note: Option<String>,

        /// Reference build name
        #[arg(long, default_value = DEFAULT_BUILD)]
        build: String,

        /// Log per-path timings
        #[arg(long)]
        profile: bool,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,

        /// Skip sorted validation (faster for pre-sorted input)
        #[arg(long)]
        assume_sorted: bool,
    },

    /// Verify a FastJ tile file
    Check {
        /// FastJ file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Tag length in bases
        #[arg(long = "tag-length", default_value_t = DEFAULT_TAG_LEN)]
        tag_length: u64,

        /// Print statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
        {
            eprintln!("Error: failed to initialize thread pool: {}", e);
            process::exit(1);
        }
    }

    let result = match cli.command {
        Commands::Tile {
            library,
            reference,
            input,
            output,
            tag_length,
            variant_policy,
            allow_variant_on_tag,
            fill_no_call_with_ref,
            seed,
            note,
            build,
            profile,
            stats,
            assume_sorted,
        } => {
            let gap_fill = if fill_no_call_with_ref {
                GapFill::Reference
            } else {
                GapFill::NoCall
            };
            let config = ScanConfig::new()
                .with_tag_len(tag_length)
                .with_policy(variant_policy)
                .with_allow_variant_on_tag(allow_variant_on_tag)
                .with_gap_fill(gap_fill)
                .with_seed(seed)
                .with_note(note)
                .with_build(build)
                .with_profile(profile);
            run_tile(
                TileCommand::new(config).with_assume_sorted(assume_sorted),
                library,
                reference,
                input,
                output,
                stats,
            )
        }

        Commands::Check {
            input,
            tag_length,
            stats,
        } => run_check(input, tag_length, stats),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_tile(
    cmd: TileCommand,
    library: PathBuf,
    reference: PathBuf,
    input: PathBuf,
    output: PathBuf,
    stats: bool,
) -> Result<(), TileError> {
    log::info!(
        "Tiling {} against {} (policy {}, tag length {})",
        input.display(),
        library.display(),
        cmd.config.policy,
        cmd.config.tag_len
    );
    let writer = open_output(&output)?;
    let result = cmd.run(&library, &reference, &input, writer)?;

    if stats {
        eprintln!("Tile stats: {}", result);
    }
    Ok(())
}

fn run_check(input: PathBuf, tag_length: u64, stats: bool) -> Result<(), TileError> {
    let cmd = CheckCommand::new().with_tag_len(tag_length);
    let result = cmd.run(&input)?;

    if stats {
        eprintln!("Check stats: {}", result);
    }
    Ok(())
}
