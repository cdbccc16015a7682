use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image_to_pdf_rust::{convert_with_progress, ConvertOptions, ImageQueue, ImageSource};

/// Convert JPEG and PNG images into PDF documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input images, in page order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the PDFs are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Put all images into a single multi-page PDF
    #[arg(long)]
    merge: bool,

    /// Re-save the output with compressed streams
    #[arg(long)]
    compress: bool,
}

fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let target = dir.join(file_name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    tmp.write_all(bytes)?;
    tmp.persist(&target)
        .with_context(|| format!("Failed to write {:?}", target))?;
    Ok(target)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let sources = args
        .inputs
        .iter()
        .map(|path| {
            ImageSource::from_path(path).with_context(|| format!("Failed to read {:?}", path))
        })
        .collect::<Result<Vec<_>>>()?;
    let input_size: usize = sources.iter().map(|s| s.bytes.len()).sum();

    let mut queue = ImageQueue::new();
    queue.add(sources).context("No usable input")?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {:?}", args.out_dir))?;

    let options = ConvertOptions {
        merge: args.merge,
        compress: args.compress,
    };
    let start = Instant::now();
    let outputs = convert_with_progress(queue.items(), options, |stage| {
        println!("{}", stage.message())
    })
    .context("Error during conversion")?;
    println!("Converted {} images in {:.2?}", queue.len(), start.elapsed());

    for output in &outputs {
        let path = write_atomically(&args.out_dir, &output.file_name, &output.bytes)?;
        println!(
            "Wrote {:?} ({:.2} MB)",
            path,
            output.bytes.len() as f64 / 1_048_576.0
        );
    }

    let output_size: usize = outputs.iter().map(|o| o.bytes.len()).sum();
    println!("Input size:  {:.2} MB", input_size as f64 / 1_048_576.0);
    println!("Output size: {:.2} MB", output_size as f64 / 1_048_576.0);

    Ok(())
}
