use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use toolbelt::combine::{CombineFormat, CombineOptions};
use toolbelt::dirtree::{render_paths, render_tree, DirTreeOptions};
use toolbelt::edit::edit_files;
use toolbelt::git_history::render_changes;
use toolbelt::licenses::{load_manifests, render_markdown, MISSING};
use toolbelt::output::{write_lines, write_text};
use toolbelt::prompt::{AlwaysYes, Confirm, StdinConfirm};
use toolbelt::scrape::{FileNaming, ScrapeOptions};
use toolbelt::test_stubs::StubLayout;
use toolbelt::{
    logging, Combiner, Config, DirTree, Fetcher, GitHistory, ImportFinder, LineEdit, RegistryClient, Scraper,
    StubGenerator, ToolKind,
};

#[derive(Parser)]
#[command(name = "toolbelt")]
#[command(about = "Small file, web and repository utilities")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path (defaults to ~/.toolbelt.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the structure of a directory, one entry per line
    Dirtree {
        /// Directory to walk
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Output file (defaults to <output_dir>/dirtree.txt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Draw a tree instead of a flat path list
        #[arg(long)]
        tree: bool,

        /// Include dot-files and dot-directories
        #[arg(long)]
        hidden: bool,

        /// Enter every directory without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Concatenate the files of a directory into one file
    Combine {
        /// Output file (defaults to <output_dir>/combine.txt, or combine.md with --markdown)
        output: Option<PathBuf>,

        /// Source directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Only include files with this extension (repeatable)
        #[arg(short, long = "ext")]
        extensions: Vec<String>,

        /// Leave out files or directories matching this glob pattern (repeatable)
        #[arg(short = 'x', long)]
        exclude: Vec<String>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Include dot-files and dot-directories
        #[arg(long)]
        hidden: bool,

        /// Write a markdown document with a structure tree and code blocks
        #[arg(long)]
        markdown: bool,
    },
    /// Fetch one URL and save its content
    Scrape {
        url: String,

        /// File name to save as, inside the output directory
        #[arg(short, long)]
        name: Option<String>,

        /// Save visible text instead of raw HTML
        #[arg(long)]
        text: bool,
    },
    /// Fetch every URL listed in a file, one per line
    ScrapeList {
        url_file: PathBuf,

        /// Output directory (defaults to output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        text: bool,

        /// Name files after the last URL path segment
        #[arg(long)]
        basename: bool,
    },
    /// Fetch a page and every page it links to
    ScrapeLinks {
        url: String,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        text: bool,
    },
    /// Save the links found on a page, one per line
    Links { url: String },
    /// Look up the license of every dependency in a project's manifests
    Licenses {
        /// Project directory holding the manifests
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Conda environment file, relative to the project directory
        #[arg(short, long, default_value = "environment.yml")]
        env_file: PathBuf,

        /// pip requirements file, relative to the project directory
        #[arg(short, long, default_value = "requirements.txt")]
        req_file: PathBuf,

        /// Markdown output file (defaults to <output_dir>/licenses.md)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the imports declared by every source file under a directory
    Imports {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Show every commit that touched a file, with its diff
    History { file: PathBuf },
    /// Generate pytest stubs for the functions of a Python source tree
    TestStubs {
        #[arg(short, long, default_value = ".")]
        source_dir: PathBuf,

        #[arg(short, long, default_value = "./tests")]
        test_dir: PathBuf,

        /// One test file per source file instead of a single combined file
        #[arg(long)]
        per_file: bool,
    },
    /// Edit lines or strings in place across files of one extension
    Edit {
        #[command(subcommand)]
        action: EditAction,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ~/.toolbelt.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct EditTarget {
    /// Directory to search recursively
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// File extension to edit
    #[arg(short, long, default_value = "txt")]
    extension: String,
}

#[derive(Subcommand)]
enum EditAction {
    /// Remove every line equal to LINE (surrounding whitespace ignored)
    RemoveLine {
        line: String,
        #[command(flatten)]
        target: EditTarget,
    },
    /// Replace every line equal to FROM with TO
    ReplaceLine {
        from: String,
        to: String,
        #[command(flatten)]
        target: EditTarget,
    },
    /// Replace every occurrence of FROM with TO
    ReplaceString {
        from: String,
        to: String,
        #[command(flatten)]
        target: EditTarget,
    },
}

impl Commands {
    fn tool(&self) -> ToolKind {
        match self {
            Commands::Dirtree { .. } => ToolKind::DirTree,
            Commands::Combine { .. } => ToolKind::Combine,
            Commands::Scrape { .. } => ToolKind::Scrape,
            Commands::ScrapeList { .. } => ToolKind::ScrapeList,
            Commands::ScrapeLinks { .. } => ToolKind::ScrapeLinks,
            Commands::Links { .. } => ToolKind::Links,
            Commands::Licenses { .. } => ToolKind::Licenses,
            Commands::Imports { .. } => ToolKind::Imports,
            Commands::History { .. } => ToolKind::History,
            Commands::TestStubs { .. } => ToolKind::TestStubs,
            Commands::Edit { .. } => ToolKind::Edit,
            Commands::Config { .. } => ToolKind::Config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return generate_config(output.clone());
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?.with_env_overrides(),
        None => Config::load()?,
    };
    let tool = cli.command.tool();
    logging::init(&config.log_dir, tool)?;

    let start_time = Instant::now();
    match cli.command {
        Commands::Dirtree { root, output, tree, hidden, yes } => {
            export_structure(&config, &root, output, tree, hidden, yes)?;
        }
        Commands::Combine { output, dir, extensions, exclude, recursive, hidden, markdown } => {
            let options = CombineOptions {
                extensions,
                exclude,
                recursive,
                include_hidden: hidden || config.walk.include_hidden,
                skip_paths: vec![config.log_dir.clone()],
                format: if markdown { CombineFormat::Markdown } else { CombineFormat::Plain },
            };
            combine_files(&config, &dir, output, options)?;
        }
        Commands::Scrape { url, name, text } => {
            let scraper = build_scraper(&config, tool, config.output_dir.clone(), text, FileNaming::Sanitized)?;
            let path = scraper.scrape_url(&url, name.as_deref()).await?;
            println!("✅ Content from {} saved to {}", url, path.display());
        }
        Commands::ScrapeList { url_file, output, text, basename } => {
            let naming = if basename { FileNaming::UrlBasename } else { FileNaming::Sanitized };
            let dir = output.unwrap_or_else(|| config.output_dir.clone());
            let report = build_scraper(&config, tool, dir, text, naming)?.scrape_list(&url_file).await?;
            report.print_summary();
        }
        Commands::ScrapeLinks { url, output, text } => {
            let dir = output.unwrap_or_else(|| config.output_dir.clone());
            let report = build_scraper(&config, tool, dir, text, FileNaming::Sanitized)?
                .scrape_with_links(&url)
                .await?;
            report.print_summary();
        }
        Commands::Links { url } => {
            let scraper = build_scraper(&config, tool, config.output_dir.clone(), false, FileNaming::Sanitized)?;
            let (path, links) = scraper.collect_links(&url).await?;
            println!("🔗 {} link(s) from {} saved to {}", links.len(), url, path.display());
        }
        Commands::Licenses { dir, env_file, req_file, output } => {
            fetch_licenses(&config, &dir, &env_file, &req_file, output).await?;
        }
        Commands::Imports { dir } => {
            find_imports(&config, &dir)?;
        }
        Commands::History { file } => {
            let changes = GitHistory::new(&file)?.changes()?;
            if changes.is_empty() {
                println!("No commits touch {}", file.display());
            } else {
                print!("{}", render_changes(&changes));
            }
        }
        Commands::TestStubs { source_dir, test_dir, per_file } => {
            let layout = if per_file { StubLayout::PerFile } else { StubLayout::Combined };
            let report = StubGenerator::new()?.generate(&source_dir, &test_dir, layout)?;
            println!("\n🧪 Generated {} test stubs.", report.stubs_created);
            for file in report.files_written {
                println!("   - {}", file.display());
            }
        }
        Commands::Edit { action } => {
            apply_edit(action)?;
        }
        Commands::Config { .. } => {}
    }

    tracing::debug!("{} finished in {:.2}s", tool, start_time.elapsed().as_secs_f64());
    Ok(())
}

fn export_structure(
    config: &Config,
    root: &Path,
    output: Option<PathBuf>,
    tree: bool,
    hidden: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let output = output
        .map(|o| config.output_path(&o))
        .unwrap_or_else(|| config.output_path(Path::new(&ToolKind::DirTree.default_output_name())));
    let options = DirTreeOptions {
        include_hidden: hidden || config.walk.include_hidden,
        follow_links: false,
        exclude: vec![output.clone(), config.output_dir.clone(), config.log_dir.clone()],
    };
    let mut confirm: Box<dyn Confirm> = if yes { Box::new(AlwaysYes) } else { Box::new(StdinConfirm) };
    let entries = DirTree::new(options).walk(root, confirm.as_mut())?;

    let lines = if tree {
        let root_name = root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| root.display().to_string());
        render_tree(&root_name, &entries)
    } else {
        render_paths(&entries)
    };

    write_lines(&output, &lines)?;
    println!("📁 {} entries written to {}", entries.len(), output.display());
    Ok(())
}

fn combine_files(
    config: &Config,
    dir: &Path,
    output: Option<PathBuf>,
    options: CombineOptions,
) -> anyhow::Result<()> {
    let default_name = match options.format {
        CombineFormat::Plain => ToolKind::Combine.default_output_name(),
        CombineFormat::Markdown => format!("{}.md", ToolKind::Combine),
    };
    let output = config.output_path(&output.unwrap_or_else(|| PathBuf::from(default_name)));

    let report = Combiner::new(options)?.combine(dir, &output)?;
    println!(
        "✅ Combined {} file(s) into {} ({} bytes)",
        report.included.len(),
        output.display(),
        report.bytes_written
    );
    if !report.skipped.is_empty() {
        println!("⚠️  Skipped {} file(s):", report.skipped.len());
        for path in &report.skipped {
            println!("   - {}", path.display());
        }
    }
    Ok(())
}

fn build_scraper(
    config: &Config,
    tool: ToolKind,
    output_dir: PathBuf,
    text_only: bool,
    naming: FileNaming,
) -> anyhow::Result<Scraper> {
    let fetcher = Fetcher::new(&config.http)?;
    Scraper::new(fetcher, ScrapeOptions { output_dir, text_only, naming, tool })
}

async fn fetch_licenses(
    config: &Config,
    dir: &Path,
    env_file: &Path,
    req_file: &Path,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let packages = load_manifests(&dir.join(env_file), &dir.join(req_file))?;
    println!("📦 Looking up {} package(s)", packages.len());

    let client = RegistryClient::new(Fetcher::new(&config.http)?, config.registry.clone());
    let rows = client.fetch_all(&packages).await;
    let markdown = render_markdown(&rows);

    let output = config.output_path(&output.unwrap_or_else(|| PathBuf::from("licenses.md")));
    write_text(&output, &markdown)?;

    print!("{}", markdown);
    let unknown = rows.iter().filter(|r| r.license.is_none()).count();
    println!("\n✅ License table saved to {} ({} {})", output.display(), unknown, MISSING);
    Ok(())
}

fn find_imports(config: &Config, dir: &Path) -> anyhow::Result<()> {
    let report = ImportFinder::new(&config.imports)?.scan(dir)?;
    if report.is_empty() {
        println!("No imports found under {}", dir.display());
        return Ok(());
    }

    print!("{}", report.render(dir));
    let modules = report.top_level_modules();
    let output = config.output_path(Path::new("identified_imports.txt"));
    write_lines(&output, &modules)?;
    println!("\n📄 {} top-level module(s) written to {}", modules.len(), output.display());
    Ok(())
}

fn apply_edit(action: EditAction) -> anyhow::Result<()> {
    let (edit, target) = match action {
        EditAction::RemoveLine { line, target } => (LineEdit::RemoveLine(line), target),
        EditAction::ReplaceLine { from, to, target } => (LineEdit::ReplaceLine { from, to }, target),
        EditAction::ReplaceString { from, to, target } => (LineEdit::ReplaceString { from, to }, target),
    };
    let report = edit_files(&target.dir, &target.extension, &edit)?;
    println!(
        "✏️  {} change(s) in {} of {} file(s)",
        report.total_changes(),
        report.edited.len(),
        report.scanned
    );
    for failure in &report.failed {
        println!("   ✗ {}: {}", failure.path.display(), failure.reason);
    }
    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = output_path.unwrap_or_else(|| {
        Config::default_config_path().unwrap_or_else(|_| PathBuf::from("toolbelt.toml"))
    });

    println!("📝 Generating configuration file: {}", config_path.display());
    write_text(&config_path, &Config::create_documented_config())?;

    println!("✅ Configuration file created successfully!");
    println!("💡 Edit the file to set output and log directories, HTTP timeouts and registry URLs.");
    Ok(())
}
