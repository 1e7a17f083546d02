use clap::{Parser, Subcommand};
use lstmzip::error::{Error, Result};
use lstmzip::header::write_header;
use lstmzip::preprocess::{Dictionary, Preprocessor};
use lstmzip::vocab::Vocabulary;
use lstmzip::{compress, decompress, generate, Decompressed};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "lstmzip", version, about = "LSTM-driven arithmetic coder")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a file
    Compress {
        /// Word dictionary applied before compression
        #[arg(short, long)]
        dictionary: Option<PathBuf>,
        input: PathBuf,
        output: PathBuf,
    },
    /// Decompress a file
    Decompress {
        /// Word dictionary; required if one was used when compressing
        #[arg(short, long)]
        dictionary: Option<PathBuf>,
        input: PathBuf,
        output: PathBuf,
    },
    /// Apply the dictionary transform and store without entropy coding
    Store {
        #[arg(short, long)]
        dictionary: PathBuf,
        input: PathBuf,
        output: PathBuf,
    },
    /// Train on a sample file and synthesize new bytes
    Generate {
        input: PathBuf,
        output: PathBuf,
        size: usize,
        /// Seed for reproducible output; random when absent
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::Resource {
        path: path.to_path_buf(),
        source,
    })
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data).map_err(|source| Error::Resource {
        path: path.to_path_buf(),
        source,
    })
}

fn preprocessor(dictionary: Option<&PathBuf>) -> Result<Preprocessor> {
    match dictionary {
        Some(path) => Ok(Preprocessor::Dictionary(Dictionary::load(path)?)),
        None => Ok(Preprocessor::None),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Compress { dictionary, input, output } => {
            let timer = Instant::now();
            let data = read_input(&input)?;
            let pre = preprocessor(dictionary.as_ref())?;
            let mut coded = Vec::new();
            compress(&pre.encode(&data), &mut coded)?;
            write_output(&output, &coded)?;
            println!(
                "{} bytes -> {} bytes in {:.2} s",
                data.len(),
                coded.len(),
                timer.elapsed().as_secs_f64()
            );
            if !data.is_empty() {
                println!("cross entropy: {:.3}", 8.0 * coded.len() as f64 / data.len() as f64);
            }
        }
        Command::Decompress { dictionary, input, output } => {
            let timer = Instant::now();
            let coded = read_input(&input)?;
            let pre = preprocessor(dictionary.as_ref())?;
            let mut cursor = coded.as_slice();
            let plain = match decompress(&mut cursor)? {
                Decompressed::Plain(bytes) => pre.decode(&bytes)?,
                // zero-length sentinel: the rest of the stream is a stored
                // preprocessor payload, or nothing at all
                Decompressed::Stored if cursor.is_empty() => Vec::new(),
                Decompressed::Stored => match pre {
                    Preprocessor::Dictionary(_) => pre.decode(cursor)?,
                    Preprocessor::None => return Err(Error::MissingDictionary),
                },
            };
            write_output(&output, &plain)?;
            println!(
                "{} bytes -> {} bytes in {:.2} s",
                coded.len(),
                plain.len(),
                timer.elapsed().as_secs_f64()
            );
        }
        Command::Store { dictionary, input, output } => {
            let timer = Instant::now();
            let data = read_input(&input)?;
            let pre = preprocessor(Some(&dictionary))?;
            let mut stored = Vec::new();
            write_header(0, &Vocabulary::empty(), &mut stored)?;
            stored.extend_from_slice(&pre.encode(&data));
            write_output(&output, &stored)?;
            println!(
                "{} bytes -> {} bytes in {:.2} s",
                data.len(),
                stored.len(),
                timer.elapsed().as_secs_f64()
            );
        }
        Command::Generate { input, output, size, seed } => {
            let timer = Instant::now();
            let sample = read_input(&input)?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let (out, cross_entropy) = generate(&sample, size, &mut rng)?;
            write_output(&output, &out)?;
            println!("model cross entropy: {cross_entropy:.4}");
            println!(
                "{} bytes -> {} bytes in {:.2} s",
                sample.len(),
                out.len(),
                timer.elapsed().as_secs_f64()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("run with --help for usage");
            ExitCode::FAILURE
        }
    }
}
