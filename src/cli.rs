use crate::align::CostWeights;
use crate::score::writers::{ConfusionFormat, ReportFormat};
use crate::utils::Result;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| env!("CARGO_PKG_VERSION").to_string());

#[derive(Parser)]
#[command(name="power",
          version=&**FULL_VERSION,
          about="Phonetically-oriented word error rate scoring",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Score hypothesis transcripts against references")]
    Score(ScoreArgs),
    #[clap(about = "Build a pronunciation lexicon from a CMU-style dictionary")]
    Lexicon(LexiconArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("score")))]
#[command(arg_required_else_help(true))]
pub struct ScoreArgs {
    #[clap(required = true)]
    #[clap(long = "ref")]
    #[clap(help = "Reference transcript file, one utterance per line")]
    #[clap(value_name = "REF")]
    #[arg(value_parser = check_file_exists)]
    pub ref_path: PathBuf,

    #[clap(required = true)]
    #[clap(long = "hyp")]
    #[clap(help = "Hypothesis transcript file, one utterance per line")]
    #[clap(value_name = "HYP")]
    #[arg(value_parser = check_file_exists)]
    pub hyp_path: PathBuf,

    #[clap(short = 'l')]
    #[clap(long = "lexicon")]
    #[clap(help = "Pronunciation lexicon (JSON word-to-phonemes dict); letters are used as phonemes when omitted")]
    #[clap(value_name = "LEXICON")]
    #[arg(value_parser = check_file_exists)]
    pub lexicon_path: Option<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(help = "Prefix for output files")]
    #[clap(value_name = "OUTPUT_PREFIX")]
    #[arg(value_parser = check_prefix_path)]
    pub output_prefix: String,

    #[clap(short = 'f')]
    #[clap(long = "format")]
    #[clap(help = "Output report formats")]
    #[clap(value_name = "FORMAT")]
    #[clap(value_delimiter = ',')]
    #[clap(default_value = "snt")]
    pub formats: Vec<ReportFormat>,

    #[clap(long = "print-wer")]
    #[clap(help = "Also write reports for the unrefined word-level alignment")]
    pub print_wer: bool,

    #[clap(long = "compare")]
    #[clap(help = "Write a summary comparing the refined score against plain WER")]
    pub compare: bool,

    #[clap(long = "show-phonemes")]
    #[clap(help = "Include phonetic alignments of error regions in reports")]
    pub show_phonemes: bool,

    #[clap(long = "show-confusions")]
    #[clap(help = "Write substitution confusion pairs")]
    #[clap(value_name = "CONF_FORMAT")]
    #[clap(value_delimiter = ',')]
    pub show_confusions: Option<Vec<ConfusionFormat>>,

    #[clap(long = "case-sensitive")]
    #[clap(help = "Align words case-sensitively")]
    pub case_sensitive: bool,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "word-align-weights")]
    #[clap(value_name = "WEIGHTS")]
    #[clap(help = "Word aligner costs (non-negative values): C,S,D,I")]
    #[clap(default_value = "0,4,3,3")]
    #[arg(value_parser = weights_from_string)]
    pub word_align_weights: CostWeights,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("lexicon")))]
#[command(arg_required_else_help(true))]
pub struct LexiconArgs {
    #[clap(required = true)]
    #[clap(short = 'd')]
    #[clap(long = "dict")]
    #[clap(help = "CMU-style pronunciation dictionary")]
    #[clap(value_name = "DICT")]
    #[arg(value_parser = check_file_exists)]
    pub dict_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output JSON lexicon path")]
    #[clap(value_name = "OUTPUT")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(format!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn weights_from_string(s: &str) -> Result<CostWeights> {
    let values: Vec<u32> = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| format!("`{}` is not a non-negative integer", v))
        })
        .collect::<Result<Vec<u32>>>()?;
    if values.len() != 4 {
        return Err(format!(
            "Expected 4 comma-separated values for weights, got {}",
            values.len()
        ));
    }
    Ok(CostWeights {
        correct: values[0],
        substitution: values[1],
        deletion: values[2],
        insertion: values[3],
    })
}
