mod logger;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kdp_assembly::{
    ArtifactKind, BarcodePayload, Ebook, ExportEngine, ExportReport, ExportRequest, PageRole,
    PageSelector, PageSet, PolicyTable, RegenerationCoordinator, SpineCalculator, SpineFill,
    TrimGeometryResolver, ValidationResult, calculate_statistics, decode_image_file,
    load_page_manifest, save_artifact,
};
use logger::CliLogger;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exit status when validation reports hard violations
const EXIT_BLOCKED: i32 = 2;

#[derive(Parser)]
#[command(name = "kdpt", about = "Print-on-demand book assembly tools", version)]
struct Cli {
    /// Policy table JSON (built-in defaults when omitted)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in policy table as JSON
    Policy {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute spine width and cover canvas for a page count
    Spine {
        /// Paper type id
        #[arg(long)]
        paper: String,

        /// Interior page count
        #[arg(long)]
        pages: usize,

        /// Trim format id
        #[arg(long, default_value = "6x9")]
        trim: String,
    },

    /// Show page counts, dimensions and estimated cost
    Stats {
        #[command(flatten)]
        book: BookArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a book against the print policy without assembling
    Validate {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Validate and assemble print-ready PDFs
    Export {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Output directory
        #[arg(short = 'd', long)]
        out_dir: PathBuf,
    },

    /// Swap one page image and rebuild the artifacts that contain it
    Replace {
        #[command(flatten)]
        book: BookArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Output directory
        #[arg(short = 'd', long)]
        out_dir: PathBuf,

        /// Page index to replace
        #[arg(long, conflicts_with = "role", required_unless_present = "role")]
        index: Option<usize>,

        /// Page role to replace (front-cover or back-cover)
        #[arg(long)]
        role: Option<RoleArg>,

        /// Replacement image (PNG or JPEG)
        #[arg(long)]
        image: PathBuf,

        /// Resolution of the replacement image
        #[arg(long, default_value = "300")]
        dpi: u32,
    },
}

#[derive(Args)]
struct BookArgs {
    /// Ebook metadata JSON
    #[arg(short, long)]
    ebook: PathBuf,

    /// Page manifest CSV (index,role,path,seed[,dpi])
    #[arg(short, long)]
    manifest: PathBuf,

    /// Resolution assumed for manifest rows without a dpi column
    #[arg(long, default_value = "300")]
    default_dpi: u32,
}

#[derive(Args)]
struct OutputArgs {
    /// Artifacts to produce (all when omitted)
    #[arg(short, long, value_enum, num_args = 1..)]
    kind: Vec<KindArg>,

    /// ISBN-13 for the back cover barcode
    #[arg(long)]
    isbn: Option<String>,

    /// EAN-5 price add-on, e.g. 51299
    #[arg(long, requires = "isbn")]
    price: Option<String>,

    /// Spine color as RRGGBB
    #[arg(long, value_parser = parse_hex_color)]
    spine_color: Option<[u8; 3]>,

    /// Draw trim, safe-area and zone guides
    #[arg(long)]
    guides: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Full,
    Interior,
    Cover,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    FrontCover,
    BackCover,
}

impl From<KindArg> for ArtifactKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Full => Self::FullBook,
            KindArg::Interior => Self::InteriorManuscript,
            KindArg::Cover => Self::CoverOnly,
        }
    }
}

impl From<RoleArg> for PageRole {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::FrontCover => Self::FrontCover,
            RoleArg::BackCover => Self::BackCover,
        }
    }
}

impl OutputArgs {
    fn request(&self) -> ExportRequest {
        let mut request = if self.kind.is_empty() {
            ExportRequest::default()
        } else {
            let kinds: Vec<ArtifactKind> = self.kind.iter().map(|&k| k.into()).collect();
            ExportRequest::only(&kinds)
        };
        if let Some(isbn) = &self.isbn {
            request = request.with_barcode(BarcodePayload {
                isbn: isbn.clone(),
                price: self.price.clone(),
            });
        }
        if let Some(rgb) = self.spine_color {
            request = request.with_spine_fill(SpineFill::Flat(rgb));
        }
        request.with_guides(self.guides)
    }
}

fn parse_hex_color(s: &str) -> Result<[u8; 3], String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected RRGGBB, got '{}'", s));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("'{}': {}", s, e))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

async fn load_policy(path: Option<&Path>) -> Result<PolicyTable> {
    match path {
        Some(path) => PolicyTable::load(path)
            .await
            .with_context(|| format!("loading policy {}", path.display())),
        None => Ok(PolicyTable::kdp_default()),
    }
}

async fn load_book(args: &BookArgs) -> Result<(Ebook, PageSet)> {
    let json = tokio::fs::read(&args.ebook)
        .await
        .with_context(|| format!("reading {}", args.ebook.display()))?;
    let ebook: Ebook = serde_json::from_slice(&json)
        .with_context(|| format!("parsing {}", args.ebook.display()))?;
    let pages = load_page_manifest(&args.manifest, args.default_dpi)
        .await
        .with_context(|| format!("loading manifest {}", args.manifest.display()))?;
    log::info!(
        "loaded '{}' ({}) with {} pages",
        ebook.title,
        ebook.id,
        pages.pages().len()
    );
    Ok((ebook, pages))
}

fn print_validation(result: &ValidationResult) {
    for violation in &result.violations {
        println!("  {}", violation);
    }
    if result.passed {
        println!("Validation passed");
    } else {
        println!(
            "Validation failed: {} blocking violation(s)",
            result.hard().count()
        );
    }
}

async fn write_artifacts(ebook: &Ebook, report: &ExportReport, out_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(out_dir).await?;
    for artifact in &report.artifacts {
        let path = out_dir.join(format!("{}-{}.pdf", ebook.id, artifact.kind.file_stem()));
        save_artifact(artifact, &path).await?;
        println!(
            "{} ({} pages) → {}",
            artifact.kind,
            artifact.source_page_count,
            path.display()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    CliLogger::new(cli.verbose).init()?;
    let policy = Arc::new(load_policy(cli.policy.as_deref()).await?);

    match cli.command {
        Commands::Policy { output } => {
            let json = serde_json::to_string_pretty(policy.as_ref())?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json).await?;
                    println!("Policy → {}", path.display());
                }
                None => println!("{}", json),
            }
        }

        Commands::Spine { paper, pages, trim } => {
            let calc = SpineCalculator::new(&policy);
            let spine = calc.spine_width(&paper, pages)?;
            let cover = TrimGeometryResolver::new(&policy).cover(policy.trim_format(&trim)?, spine);
            println!("Spine width: {} in", spine);
            println!(
                "Cover canvas: {} x {} in",
                cover.canvas_width_in, cover.canvas_height_in
            );
            println!(
                "Spine text: {}",
                if calc.allows_spine_text(spine) {
                    "allowed"
                } else {
                    "omitted"
                }
            );
        }

        Commands::Stats { book, json } => {
            let (ebook, pages) = load_book(&book).await?;
            let stats = calculate_statistics(&policy, &ebook, &pages)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Book Statistics:");
                println!("  Content pages: {}", stats.content_pages);
                println!("  Filler pages: {}", stats.filler_pages);
                println!("  Interior pages: {}", stats.interior_pages);
                println!("  Full book pages: {}", stats.full_book_pages);
                println!("  Spine width: {} in", stats.spine_width_in);
                println!(
                    "  Cover: {} x {} in",
                    stats.cover_width_in, stats.cover_height_in
                );
                println!("  Estimated print cost: {:.2}", stats.estimated_print_cost);
            }
        }

        Commands::Validate { book, output } => {
            let (ebook, pages) = load_book(&book).await?;
            let result = ExportEngine::new(policy)?.validate(&ebook, &pages, &output.request())?;
            print_validation(&result);
            if result.is_blocking() {
                std::process::exit(EXIT_BLOCKED);
            }
        }

        Commands::Export {
            book,
            output,
            out_dir,
        } => {
            let (ebook, pages) = load_book(&book).await?;
            let report = ExportEngine::new(policy)?
                .export_async(ebook.clone(), pages, output.request())
                .await?;
            print_validation(&report.validation);
            if report.is_blocked() {
                std::process::exit(EXIT_BLOCKED);
            }
            write_artifacts(&ebook, &report, &out_dir).await?;
        }

        Commands::Replace {
            book,
            output,
            out_dir,
            index,
            role,
            image,
            dpi,
        } => {
            let selector = match (index, role) {
                (Some(index), _) => PageSelector::Index(index),
                (None, Some(role)) => PageSelector::Role(role.into()),
                (None, None) => bail!("either --index or --role is required"),
            };
            let (ebook, mut pages) = load_book(&book).await?;
            let buffer = decode_image_file(&image, dpi)
                .with_context(|| format!("decoding {}", image.display()))?;
            let request = output.request();

            let coordinator = RegenerationCoordinator::new(policy)?;
            let task_ebook = ebook.clone();
            let regen = tokio::task::spawn_blocking(move || {
                coordinator.replace_page(&task_ebook, &mut pages, selector, buffer, &request)
            })
            .await??;

            println!(
                "Replaced {} page {}; rebuilding {:?}",
                regen.role, regen.page_index, regen.reassembled
            );
            print_validation(&regen.report.validation);
            if regen.report.is_blocked() {
                std::process::exit(EXIT_BLOCKED);
            }
            write_artifacts(&ebook, &regen.report, &out_dir).await?;
        }
    }

    Ok(())
}
