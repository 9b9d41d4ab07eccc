//! Command-line interface for txtbook.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::book::{build_book, split_book, BuildOptions, SplitOptions};
use crate::config::{
    parse_title_max, LeadingTitlePolicy, SegmenterConfig, DEFAULT_AUTHOR, DEFAULT_LANG,
};
use crate::error::{Result, TxtbookError};
use crate::segment::SegmentStats;

/// txtbook - Split plain-text novels into chapters and package them as EPUB.
#[derive(Parser)]
#[command(name = "txtbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a text file into an EPUB book.
    Build {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        /// Book name, also used as the output file name
        #[arg(short, long = "book-name")]
        book_name: String,

        /// Cover image (jpg, png, gif, webp or svg)
        #[arg(short, long)]
        cover: Option<PathBuf>,

        /// Author written into the book metadata
        #[arg(short, long, default_value = DEFAULT_AUTHOR)]
        author: String,

        /// Language tag written into the book metadata
        #[arg(short, long, default_value = DEFAULT_LANG)]
        lang: String,

        /// Output directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Book description
        #[arg(long)]
        description: Option<String>,

        #[command(flatten)]
        segmenter: SegmenterArgs,
    },

    /// Split a text file into one text file per chapter.
    Split {
        /// Input text file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (default: the input file name without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        segmenter: SegmenterArgs,
    },
}

/// Title detection flags shared by all commands.
#[derive(Args, Debug, Default)]
pub struct SegmenterArgs {
    /// Longest line, in characters, that can still be a title
    #[arg(long, value_parser = parse_title_max_arg)]
    pub title_max: Option<usize>,

    /// Regular expression a title line must match
    #[arg(long)]
    pub title_pattern: Option<String>,

    /// Discard a title that appears before any body text
    #[arg(long)]
    pub drop_leading_title: bool,
}

impl SegmenterArgs {
    /// Resolve flags on top of the environment configuration.
    #[must_use]
    pub fn resolve(&self, base: SegmenterConfig) -> SegmenterConfig {
        let mut config = base;
        if let Some(max) = self.title_max {
            config = config.with_title_max(max);
        }
        if let Some(pattern) = &self.title_pattern {
            config = config.with_title_pattern(pattern);
        }
        if self.drop_leading_title {
            config = config.with_leading_title(LeadingTitlePolicy::Drop);
        }
        config
    }
}

fn parse_title_max_arg(raw: &str) -> std::result::Result<usize, String> {
    parse_title_max(raw).map_err(|e| e.to_string())
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            book_name,
            cover,
            author,
            lang,
            output,
            description,
            segmenter,
        } => {
            let mut options = BuildOptions::new(input, book_name)
                .with_author(author)
                .with_lang(lang)
                .with_segmenter(segmenter.resolve(SegmenterConfig::from_env()?));
            if let Some(cover) = cover {
                options = options.with_cover(cover);
            }
            if let Some(description) = description {
                options = options.with_description(description);
            }
            if let Some(output) = output {
                options = options.with_output_dir(output);
            }
            build_command(&options)
        }
        Commands::Split {
            input,
            output,
            segmenter,
        } => {
            let mut options = SplitOptions::new(input)
                .with_segmenter(segmenter.resolve(SegmenterConfig::from_env()?));
            if let Some(output) = output {
                options = options.with_output_dir(output);
            }
            split_command(&options)
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn check_output_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(TxtbookError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", dir.display()),
        )));
    }
    if !dir.is_dir() {
        return Err(TxtbookError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", dir.display()),
        )));
    }
    Ok(())
}

fn print_stats(stats: &SegmentStats) {
    println!("  Lines: {}", stats.lines);
    println!("  Titles: {}", stats.title_lines);
    if stats.dropped_titles > 0 {
        println!(
            "  Dropped titles: {}",
            style(stats.dropped_titles).yellow().bold()
        );
    }
}

/// Execute the build command.
fn build_command(options: &BuildOptions) -> Result<()> {
    // Fail on bad arguments before any work is done
    options.validate()?;
    check_output_dir(&options.output_dir)?;

    println!(
        "{} {} from {}",
        style("Building").bold(),
        style(options.book_name.trim()).cyan(),
        style(options.input.display()).green()
    );
    println!();

    let pb = spinner();
    pb.set_message("Segmenting chapters...");

    let report = match build_book(options) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Encoding: {}", report.encoding);
    println!("  Chapters: {}", style(report.sections).green());
    print_stats(&report.stats);

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        report.output.display()
    );

    Ok(())
}

/// Execute the split command.
fn split_command(options: &SplitOptions) -> Result<()> {
    options.segmenter.validate()?;

    println!(
        "{} {}",
        style("Splitting").bold(),
        style(options.input.display()).green()
    );
    println!();

    let pb = spinner();
    pb.set_message("Segmenting chapters...");

    let report = match split_book(options) {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    pb.finish_and_clear();

    println!("  Encoding: {}", report.encoding);
    println!("  Chapters: {}", style(report.sections).green());
    print_stats(&report.stats);

    println!();
    println!(
        "{} {}",
        style("Saved to:").green().bold(),
        report.output_dir.display()
    );
    println!("  Index: {}", report.index.display());

    Ok(())
}
