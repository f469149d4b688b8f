//! textball CLI
//!
//! Create, extract and list textballs, and instantiate skeleton trees.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use textball::{
    create_textball, create_textball_file, tree_entries, unpack_textball,
    write_entries_to_directory, Content, CreateOptions, PathFilter, Substitutions, TextballIter,
    UnpackOptions,
};

#[derive(Parser, Debug)]
#[command(name = "textball")]
#[command(version)]
#[command(about = "Diff-friendly single-file archives of directory trees")]
struct Cli {
    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a textball from a directory
    Create {
        /// Directory to archive
        input: PathBuf,

        /// Output textball file (default: stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Keep editor backups, swap files and other spurious files
        #[arg(long)]
        no_filter: bool,

        /// Do not tag executable files
        #[arg(long)]
        no_exec_marks: bool,
    },

    /// Extract a textball
    #[command(name = "x")]
    Extract {
        /// Textball to extract (default: stdin)
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Directory to extract to (default: current directory)
        #[arg(short = 'C', long, default_value = ".")]
        directory: PathBuf,

        /// Create missing parent directories of the target
        #[arg(long)]
        parents: bool,

        /// Allow extracting into a non-empty directory
        #[arg(long)]
        exist_ok: bool,
    },

    /// List contents of a textball
    #[command(name = "t")]
    List {
        /// Textball to list (default: stdin)
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Show kind, executable flag and size
        #[arg(short, long)]
        long: bool,
    },

    /// Copy a skeleton directory, replacing placeholders in names and text files
    Instantiate {
        /// Skeleton directory
        skeleton: PathBuf,

        /// Destination directory (must be empty or missing)
        destination: PathBuf,

        /// Replacement in the form PLACEHOLDER=VALUE
        #[arg(short, long = "map", value_name = "FROM=TO")]
        maps: Vec<String>,

        /// Also replace the upper- and lower-case spellings of each placeholder
        #[arg(long)]
        case_variants: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        simplelog::LevelFilter::Debug
    } else if cli.quiet {
        simplelog::LevelFilter::Warn
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .context("Could not initialize logging")?;

    match cli.command {
        Commands::Create {
            input,
            output,
            no_filter,
            no_exec_marks,
        } => create(&input, output.as_deref(), no_filter, no_exec_marks),
        Commands::Extract {
            input,
            directory,
            parents,
            exist_ok,
        } => extract(input.as_deref(), &directory, parents, exist_ok),
        Commands::List { input, long } => list(input.as_deref(), long),
        Commands::Instantiate {
            skeleton,
            destination,
            maps,
            case_variants,
        } => instantiate(&skeleton, &destination, &maps, case_variants),
    }
}

fn create(input: &Path, output: Option<&Path>, no_filter: bool, no_exec_marks: bool) -> Result<()> {
    let mut options = CreateOptions::default().with_mark_executable_files(!no_exec_marks);
    if no_filter {
        options = options.with_path_filter(None);
    }

    match output {
        Some(path) => {
            let textball = create_textball_file(input, path, &options)
                .with_context(|| format!("Failed to create textball {}", path.display()))?;
            log::info!("Created: {} ({} bytes)", path.display(), textball.len());
        }
        None => {
            let textball = create_textball(input, &options)
                .with_context(|| format!("Failed to create textball from {}", input.display()))?;
            io::stdout().write_all(textball.as_bytes())?;
        }
    }
    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))?;
            String::from_utf8(bytes).with_context(|| format!("Not valid UTF-8: {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read textball from stdin")?;
            Ok(buffer)
        }
    }
}

fn extract(input: Option<&Path>, directory: &Path, parents: bool, exist_ok: bool) -> Result<()> {
    let textball = read_input(input)?;
    let options = UnpackOptions::new()
        .with_parents(parents)
        .with_exist_ok(exist_ok);
    let n = unpack_textball(&textball, directory, &options)
        .with_context(|| format!("Failed to unpack into {}", directory.display()))?;
    log::info!("Extracted {} files into {}", n, directory.display());
    Ok(())
}

fn list(input: Option<&Path>, long: bool) -> Result<()> {
    let textball = read_input(input)?;
    let mut stdout = io::stdout().lock();
    for vfile in TextballIter::new(&textball)? {
        let vfile = vfile?;
        if long {
            let (kind, size) = match vfile.content() {
                Some(Content::Binary(data)) => ("binary", data.len()),
                Some(content) => ("text", content.len()),
                None => ("dir", 0),
            };
            let exe = if vfile.executable() { "x" } else { "-" };
            writeln!(stdout, "{}  {}  {}  {}", kind, exe, size, vfile.path().display())?;
        } else {
            writeln!(stdout, "{}", vfile.path().display())?;
        }
    }
    Ok(())
}

fn parse_substitutions(maps: &[String], case_variants: bool) -> Result<Substitutions> {
    let mut substitutions = Substitutions::new();
    for map in maps {
        let Some((from, to)) = map.split_once('=') else {
            bail!("Invalid --map {:?}, expected FROM=TO", map);
        };
        if from.is_empty() {
            bail!("Invalid --map {:?}, placeholder is empty", map);
        }
        substitutions = if case_variants {
            substitutions.with_case_variants(from, to)
        } else {
            substitutions.with(from, to)
        };
    }
    Ok(substitutions)
}

fn instantiate(skeleton: &Path, destination: &Path, maps: &[String], case_variants: bool) -> Result<()> {
    if !skeleton.is_dir() {
        bail!("Skeleton directory not found: {}", skeleton.display());
    }
    let substitutions = parse_substitutions(maps, case_variants)?;
    let entries = substitutions.entries(tree_entries(skeleton, Some(PathFilter::spurious_files())));

    let mut reporter = CreatedReporter::new(io::stdout().lock(), destination);
    let mut report = |dest: &Path| reporter.record(dest);
    let n = write_entries_to_directory(entries, destination, Some(&mut report))
        .with_context(|| format!("Failed to instantiate skeleton into {}", destination.display()))?;
    reporter.finish().context("Failed to report created files")?;

    log::info!(
        "Created {} new files from {} under {}",
        n,
        skeleton.display(),
        destination.display()
    );
    Ok(())
}

/// Prints one line per created file, keeping the first write error
struct CreatedReporter<'a, W: Write> {
    out: W,
    base: &'a Path,
    error: Option<io::Error>,
}

impl<'a, W: Write> CreatedReporter<'a, W> {
    fn new(out: W, base: &'a Path) -> Self {
        Self {
            out,
            base,
            error: None,
        }
    }

    fn record(&mut self, dest: &Path) {
        if self.error.is_some() {
            return;
        }
        let shown = dest.strip_prefix(self.base).unwrap_or(dest);
        if let Err(e) = writeln!(self.out, "Created file: {}", shown.display()) {
            self.error = Some(e);
        }
    }

    fn finish(mut self) -> io::Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => self.out.flush(),
        }
    }
}
