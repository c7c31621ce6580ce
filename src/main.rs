use clap::{Parser, Subcommand};
use static_i18n::{build_site, check_site, config, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "static-i18n")]
#[command(about = "Multi-language builds for static documentation sites")]
#[command(long_about = "\
Multi-language builds for static documentation sites

One docs tree holds every language. Each language is built into its own URL
prefix with localized navigation, theme locale and language switcher; pages
without a translation fall back to the default language.

Project structure (suffix layout):

  site.toml                      # Config, including [[i18n.languages]]
  docs/
  ├── index.md                   # Default language
  ├── index.fr.md                # French translation → site/fr/index.html
  ├── about.md                   # No translation: French falls back to it
  └── img/logo.png               # Assets are shared between languages

Folder layout: docs/en/index.md, docs/fr/index.md, ...
Set i18n.docs_structure = \"folder\" to use it.

Run 'static-i18n gen-config' to generate a documented site.toml.")]
#[command(version = env!("STATIC_I18N_VERSION"))]
struct Cli {
    /// Project root containing site.toml
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every language into site_dir
    Build {
        /// Build only this language; it becomes the default
        #[arg(long)]
        only: Option<String>,
        /// Output directory, overriding site_dir from site.toml
        #[arg(long)]
        site_dir: Option<String>,
    },
    /// Resolve every language and show where each file would go
    Check,
    /// Print a stock site.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Build { only, site_dir } => {
            let mut config = config::load_config(&cli.root)?;
            if let Some(locale) = only {
                config.i18n.build_only_locale = Some(locale);
            }
            if let Some(dir) = site_dir {
                config.site_dir = dir;
            }
            config.validate()?;
            println!("==> Building {}", cli.root.display());
            let report = build_site(&cli.root, config)?;
            output::print_build_report(&report);
        }
        Command::Check => {
            let config = config::load_config(&cli.root)?;
            println!("==> Checking {}", cli.root.display());
            let plugin = check_site(&cli.root, &config)?;
            if let Some(sets) = plugin.file_sets() {
                output::print_resolution(sets, plugin.registry());
            }
            println!("==> Sources are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "static_i18n=debug" } else { "static_i18n=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}
