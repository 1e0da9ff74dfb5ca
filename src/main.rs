use clap::{Parser, Subcommand};
use quire::config::{self, FailurePolicy};
use quire::context::BuildContext;
use quire::driver::{self, BuildOptions};
use quire::highlight::Highlighter;
use quire::output;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("QUIRE_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("QUIRE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Static site generator for a markdown blog")]
#[command(long_about = "\
Static site generator for a markdown blog

Posts are CommonMark files with a JSON frontmatter block. Each one becomes a
minified HTML page under the output directory, keeping its source path:

  site/
  ├── config.toml                  # Optional, see 'quire gen-config'
  ├── data/manifest.json           # Optional, written by the asset bundler
  └── posts/
      ├── hello.md                 # → public/posts/hello.md.html
      └── 2020/
          └── retro.md             # → public/posts/2020/retro.md.html

Frontmatter:

  ---
  {
    \"title\": \"Hello\",
    \"subtitle\": \"A first post\",
    \"date\": \"2021-01-02\",
    \"code\": true,                   # inline the highlighting stylesheet
    \"math\": false,                  # load MathJax
    \"unlisted\": false               # leave out of index.html
  }
  ---

Set RUST_LOG (e.g. RUST_LOG=quire=debug) for diagnostic logging.")]
#[command(version = version_string())]
struct Cli {
    /// Site root containing config.toml and the posts
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (defaults to <root>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Build every document even if some fail; exit non-zero afterwards
    #[arg(long)]
    keep_going: bool,

    /// Write pages without minifying them
    #[arg(long)]
    no_minify: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Render every post and write the site
    Build(BuildArgs),
    /// Render every post without writing anything
    Check,
    /// Print a stock config.toml with all options documented
    GenConfig,
    /// Print the code-highlighting stylesheet for the configured theme
    HighlightCss,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print an error chain to stderr and exit non-zero.
fn exit_with(error: &dyn std::error::Error) -> ! {
    for line in output::format_error_chain(error) {
        eprintln!("error: {}", line.trim_start());
    }
    std::process::exit(1);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Build(args) => {
            let site_config = config::load_config(&cli.root, cli.config.as_deref())?;
            let ctx = BuildContext::init(&cli.root, site_config)?;

            let mut options = BuildOptions::from_config(&ctx.config);
            if args.keep_going {
                options.policy = FailurePolicy::Continue;
            }
            if args.no_minify {
                options.minify = false;
            }

            let output_root = ctx.output_root();
            println!("==> Building {} → {}", ctx.config.posts, output_root.display());
            let report = driver::build(&ctx, &options).unwrap_or_else(|e| exit_with(&e));
            output::print_build_output(&report, &output_root);
            if let Err(e) = report.ensure_success() {
                exit_with(&e);
            }
            println!("==> Build complete: {}", output_root.display());
        }
        Command::Check => {
            let site_config = config::load_config(&cli.root, cli.config.as_deref())?;
            let ctx = BuildContext::init(&cli.root, site_config)?;
            let options = BuildOptions {
                policy: FailurePolicy::Continue,
                write: false,
                ..BuildOptions::from_config(&ctx.config)
            };

            println!("==> Checking {}", ctx.config.posts);
            let report = driver::build(&ctx, &options).unwrap_or_else(|e| exit_with(&e));
            output::print_check_output(&report);
            if let Err(e) = report.ensure_success() {
                exit_with(&e);
            }
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::HighlightCss => {
            let site_config = config::load_config(&cli.root, cli.config.as_deref())?;
            let highlighter = Highlighter::new(&site_config.highlight.theme)?;
            print!("{}", highlighter.stylesheet()?);
        }
    }

    Ok(())
}
