use std::path::PathBuf;

use clap::Args;

use crate::cli::OutputFormat;
use crate::core::read::{AlignmentRecord, LaidOutRead};
use crate::core::region::Region;
use crate::core::types::SoftClipDisplay;
use crate::layout::engine::{LayoutEngine, LayoutOptions, ReadLayout};
use crate::readstore::files::{read_alignment_file, StoredRead};
use crate::viewport::jump::fuzzy_find_sequence;

/// Regions wider than this are listed but not drawn as text tracks
pub const MAX_DRAWN_WIDTH: u64 = 400;

#[derive(Args)]
pub struct LayoutArgs {
    /// Input file (SAM or BAM)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Region to lay out, e.g. chr1:10,000-10,200 (1-based, inclusive)
    #[arg(required = true)]
    pub region: Region,

    /// Whether soft-clipped bases are drawn
    #[arg(long, value_enum, default_value = "hide")]
    pub soft_clips: SoftClipDisplay,
}

pub fn run(args: LayoutArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let file = read_alignment_file(&args.input)?;
    let sequence = fuzzy_find_sequence(&file.ref_sequences, &args.region.sequence)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Sequence '{}' not found in {}",
                args.region.sequence,
                args.input.display()
            )
        })?
        .clone();
    let (start, end) = args.region.to_range(sequence.length);

    let records: Vec<AlignmentRecord> = file
        .reads
        .into_iter()
        .filter(|r| r.reference_sequence_name.as_deref() == Some(sequence.name.as_str()))
        .map(StoredRead::new)
        .filter(|r| r.overlaps(start, end))
        .map(|r| r.record)
        .collect();

    if verbose {
        eprintln!(
            "{}: {} reads overlap {}:{}-{}",
            args.input.display(),
            records.len(),
            sequence.name,
            start + 1,
            end
        );
    }

    let engine = LayoutEngine::new(LayoutOptions {
        soft_clips: args.soft_clips,
    });
    let layout = engine.layout(&records);

    print_layout(&layout, &sequence.name, (start, end), format)
}

/// Print a layout in the requested format; `range` is 0-based half-open
pub(crate) fn print_layout(
    layout: &ReadLayout,
    sequence: &str,
    range: (u64, u64),
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print_text_layout(layout, sequence, range),
        OutputFormat::Json => print_json_layout(layout, sequence, range)?,
        OutputFormat::Tsv => print_tsv_layout(layout),
    }

    for issue in &layout.issues {
        eprintln!("Warning: {}", issue.message());
    }
    Ok(())
}

fn print_text_layout(layout: &ReadLayout, sequence: &str, (start, end): (u64, u64)) {
    println!("Read Layout");
    println!("{}", "=".repeat(60));
    println!("\nRegion: {sequence}:{}-{end}", start + 1);
    println!("  Reads: {}", layout.reads.len());
    println!("  Tracks: {}", layout.track_count);
    if !layout.issues.is_empty() {
        println!("  Integrity issues: {}", layout.issues.len());
    }

    if end > start && end - start <= MAX_DRAWN_WIDTH {
        println!();
        for track in 0..layout.track_count {
            println!("{}", render_track(layout.reads_on_track(track), (start, end)));
        }
    }

    println!("\nReads:");
    for read in &layout.reads {
        println!(
            "  [{}] {} {}:{}-{} {}",
            read.track,
            read.name,
            sequence,
            read.position + 1,
            read.end,
            if read.reverse { "(-)" } else { "(+)" }
        );
    }
}

/// Draw one track as text. Reverse-strand reads are lowercase; positions
/// without a piece are blank.
pub(crate) fn render_track<'a>(
    reads: impl Iterator<Item = &'a LaidOutRead>,
    (start, end): (u64, u64),
) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let mut row = vec![' '; (end - start) as usize];
    for read in reads {
        for piece in &read.pieces {
            if piece.x < start || piece.x >= end {
                continue;
            }
            let letter = if read.reverse {
                piece.letter.to_ascii_lowercase()
            } else {
                piece.letter
            };
            #[allow(clippy::cast_possible_truncation)]
            let column = (piece.x - start) as usize;
            row[column] = letter;
        }
    }
    row.into_iter().collect::<String>().trim_end().to_string()
}

fn print_json_layout(
    layout: &ReadLayout,
    sequence: &str,
    (start, end): (u64, u64),
) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "region": {
            "sequence": sequence,
            "start": start,
            "end": end,
        },
        "trackCount": layout.track_count,
        "reads": layout.reads,
        "issues": layout.issues,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv_layout(layout: &ReadLayout) {
    println!("id\tname\tposition\tend\tstrand\ttrack\tcigar");
    for read in &layout.reads {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            read.id,
            read.name,
            read.position,
            read.end,
            if read.reverse { "-" } else { "+" },
            read.track,
            read.record.cigar.as_deref().unwrap_or("*"),
        );
    }
}
