use std::collections::BTreeMap;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::RecordBuf;
use noodles::sam::header::record::value::map::read_group::tag as rg_tag;
use tracing::{debug, info, warn};

use crate::core::api::{FileData, ReadsetSummary, RefSequence};
use crate::core::read::{AlignmentRecord, PHRED_OFFSET};
use crate::core::types::CigarOpKind;
use crate::layout::cigar::Cigar;
use crate::readstore::StoreError;
use crate::utils::validation::readset_id;

/// File extensions loaded as alignment files
pub const ALIGNMENT_EXTENSIONS: [&str; 2] = ["sam", "bam"];

/// Dataset name used when the data directory has no usable name
pub const DEFAULT_DATASET: &str = "default";

const UNMAPPED_FLAG: u16 = 0x4;

impl From<Kind> for CigarOpKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Match => CigarOpKind::Match,
            Kind::Insertion => CigarOpKind::Insertion,
            Kind::Deletion => CigarOpKind::Deletion,
            Kind::Skip => CigarOpKind::Skip,
            Kind::SoftClip => CigarOpKind::SoftClip,
            Kind::HardClip => CigarOpKind::HardClip,
            Kind::Pad => CigarOpKind::Pad,
            Kind::SequenceMatch => CigarOpKind::SequenceMatch,
            Kind::SequenceMismatch => CigarOpKind::SequenceMismatch,
        }
    }
}

/// A mapped read held by the store, with the end of its reference span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRead {
    pub record: AlignmentRecord,
    /// Exclusive end of the reference positions the read covers
    pub end: u64,
}

impl StoredRead {
    pub fn new(record: AlignmentRecord) -> Self {
        let span = record
            .cigar
            .as_deref()
            .and_then(|cigar| cigar.parse::<Cigar>().ok())
            .map_or(0, |cigar| cigar.reference_length());
        let end = record.position + span;
        Self { record, end }
    }

    /// Whether the read touches `[start, end)`; reads without a reference
    /// span count as covering their start position.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        let read_end = self.end.max(self.record.position + 1);
        self.record.position < end && read_end > start
    }
}

/// Header information and mapped reads of one SAM/BAM file
#[derive(Debug, Clone)]
pub struct AlignmentFile {
    pub path: PathBuf,
    /// Sample from the first `@RG SM` tag, or the file stem
    pub sample: String,
    pub ref_sequences: Vec<RefSequence>,
    pub reads: Vec<AlignmentRecord>,
}

/// Read a SAM or BAM file, keeping mapped reads only
///
/// # Errors
///
/// Returns `StoreError::Io` if the file cannot be opened,
/// `StoreError::Noodles` if parsing fails, or
/// `StoreError::UnsupportedFormat` for other extensions.
pub fn read_alignment_file(path: &Path) -> Result<AlignmentFile, StoreError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("sam") => {
            let mut reader = std::fs::File::open(path)
                .map(BufReader::new)
                .map(sam::io::Reader::new)?;
            let header = reader
                .read_header()
                .map_err(|e| StoreError::Noodles(e.to_string()))?;
            collect_reads(path, &header, reader.record_bufs(&header))
        }
        Some("bam") => {
            use noodles::bam;

            let mut reader = std::fs::File::open(path).map(bam::io::Reader::new)?;
            let header = reader
                .read_header()
                .map_err(|e| StoreError::Noodles(e.to_string()))?;
            collect_reads(path, &header, reader.record_bufs(&header))
        }
        Some(ext) => Err(StoreError::UnsupportedFormat(ext.to_string())),
        None => Err(StoreError::UnsupportedFormat(path.display().to_string())),
    }
}

fn collect_reads<I>(
    path: &Path,
    header: &sam::Header,
    records: I,
) -> Result<AlignmentFile, StoreError>
where
    I: Iterator<Item = std::io::Result<RecordBuf>>,
{
    let ref_sequences = header
        .reference_sequences()
        .iter()
        .map(|(name, map)| RefSequence {
            name: name.to_string(),
            length: map.length().get() as u64,
        })
        .collect();

    let sample = header
        .read_groups()
        .values()
        .find_map(|rg| rg.other_fields().get(&rg_tag::SAMPLE))
        .map(ToString::to_string)
        .or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| path.display().to_string());

    let mut reads = Vec::new();
    let mut skipped = 0usize;
    for result in records {
        let record = result.map_err(|e| StoreError::Noodles(e.to_string()))?;
        match to_alignment_record(&record, header) {
            Some(read) => reads.push(read),
            None => skipped += 1,
        }
    }

    debug!(
        path = %path.display(),
        sample = %sample,
        reads = reads.len(),
        skipped,
        "Read alignment file"
    );

    Ok(AlignmentFile {
        path: path.to_path_buf(),
        sample,
        ref_sequences,
        reads,
    })
}

/// Convert a noodles record to the wire schema; `None` for unmapped reads
fn to_alignment_record(record: &RecordBuf, header: &sam::Header) -> Option<AlignmentRecord> {
    let flags = record.flags().bits();
    if flags & UNMAPPED_FLAG != 0 {
        return None;
    }

    let reference_sequences = header.reference_sequences();
    let (sequence_name, _) = reference_sequences.get_index(record.reference_sequence_id()?)?;
    let start = record.alignment_start()?;

    let cigar: String = record
        .cigar()
        .as_ref()
        .iter()
        .map(|op| format!("{}{}", op.len(), CigarOpKind::from(op.kind()).as_char()))
        .collect();
    let bases = String::from_utf8_lossy(record.sequence().as_ref()).into_owned();
    let quality: String = record
        .quality_scores()
        .as_ref()
        .iter()
        .map(|q| char::from(q.saturating_add(PHRED_OFFSET).min(b'~')))
        .collect();

    let mate_reference_sequence_name = record
        .mate_reference_sequence_id()
        .and_then(|id| reference_sequences.get_index(id))
        .map(|(name, _)| name.to_string());

    Some(AlignmentRecord {
        name: record.name().map(|name| name.to_string()),
        flags,
        reference_sequence_name: Some(sequence_name.to_string()),
        position: (usize::from(start) - 1) as u64,
        mapping_quality: record.mapping_quality().map(|mq| mq.get()),
        cigar: Some(cigar),
        mate_reference_sequence_name,
        mate_position: record
            .mate_alignment_start()
            .map(|p| (usize::from(p) - 1) as u64),
        template_length: Some(i64::from(record.template_length())),
        original_bases: Some(bases),
        base_quality: (!quality.is_empty()).then_some(quality),
        ..AlignmentRecord::default()
    })
}

/// The reads of one sample within a dataset, merged from one or more files
#[derive(Debug, Clone)]
pub struct Readset {
    pub id: String,
    pub name: String,
    pub dataset: String,
    pub files: Vec<PathBuf>,
    pub ref_sequences: Vec<RefSequence>,
    reads: BTreeMap<String, Vec<StoredRead>>,
    max_span: u64,
}

impl Readset {
    pub fn new(dataset: impl Into<String>, name: impl Into<String>) -> Self {
        let dataset = dataset.into();
        let name = name.into();
        Self {
            id: readset_id(&dataset, &name),
            name,
            dataset,
            files: Vec::new(),
            ref_sequences: Vec::new(),
            reads: BTreeMap::new(),
            max_span: 0,
        }
    }

    /// Merge a file's sequences and reads into this readset
    pub fn add_file(&mut self, file: AlignmentFile) {
        for sequence in file.ref_sequences {
            match self.ref_sequences.iter().find(|s| s.name == sequence.name) {
                Some(existing) if existing.length != sequence.length => warn!(
                    readset = %self.name,
                    sequence = %sequence.name,
                    "Sequence length differs between files, keeping the first"
                ),
                Some(_) => {}
                None => self.ref_sequences.push(sequence),
            }
        }

        for mut record in file.reads {
            let Some(sequence) = record.reference_sequence_name.clone() else {
                continue;
            };
            record.readset_id = Some(self.id.clone());
            let read = StoredRead::new(record);
            self.max_span = self.max_span.max(read.end - read.record.position);
            self.reads.entry(sequence).or_default().push(read);
        }

        for reads in self.reads.values_mut() {
            reads.sort_by_key(|read| read.record.position);
        }
        self.files.push(file.path);
    }

    pub fn summary(&self) -> ReadsetSummary {
        ReadsetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    pub fn file_data(&self) -> FileData {
        FileData {
            ref_sequences: self.ref_sequences.clone(),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.values().map(Vec::len).sum()
    }

    /// Resolve a requested sequence name, also trying the `chr` prefix
    pub fn resolve_sequence(&self, name: &str) -> Option<&str> {
        let prefixed = format!("chr{name}");
        self.ref_sequences
            .iter()
            .map(|s| s.name.as_str())
            .find(|s| *s == name || *s == prefixed)
    }

    /// Reads overlapping `[start, end)` on `sequence`, ordered by position
    pub fn overlapping(&self, sequence: &str, start: u64, end: u64) -> Vec<&StoredRead> {
        let Some(reads) = self
            .resolve_sequence(sequence)
            .and_then(|name| self.reads.get(name))
        else {
            return Vec::new();
        };

        let earliest = start.saturating_sub(self.max_span.max(1));
        let lo = reads.partition_point(|read| read.record.position < earliest);
        let hi = reads.partition_point(|read| read.record.position < end);
        reads[lo..hi.max(lo)]
            .iter()
            .filter(|read| read.overlaps(start, end))
            .collect()
    }
}

fn is_alignment_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                ALIGNMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
}

/// Load every SAM/BAM file directly inside `dir` as one dataset.
///
/// Files are grouped into readsets by sample.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or a file fails to parse.
pub fn load_dataset(dir: &Path, dataset: &str) -> Result<Vec<Readset>, StoreError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_alignment_file(path))
        .collect();
    paths.sort();

    let mut readsets: Vec<Readset> = Vec::new();
    for path in paths {
        let file = read_alignment_file(&path)?;
        match readsets.iter_mut().find(|r| r.name == file.sample) {
            Some(readset) => readset.add_file(file),
            None => {
                let mut readset = Readset::new(dataset, file.sample.clone());
                readset.add_file(file);
                readsets.push(readset);
            }
        }
    }
    Ok(readsets)
}

/// Load the data directory: its own files form one dataset named after the
/// directory and each immediate subdirectory forms another.
///
/// # Errors
///
/// Returns an error if a directory cannot be listed or a file fails to parse.
pub fn load_data_dir(root: &Path) -> Result<Vec<Readset>, StoreError> {
    let root_name = dataset_name(root);
    let mut readsets = load_dataset(root, &root_name)?;

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();

    for dir in subdirs {
        let name = dataset_name(&dir);
        readsets.extend(load_dataset(&dir, &name)?);
    }

    info!(
        root = %root.display(),
        readsets = readsets.len(),
        reads = readsets.iter().map(Readset::read_count).sum::<usize>(),
        "Loaded data directory"
    );
    Ok(readsets)
}

fn dataset_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
        .map_or_else(|| DEFAULT_DATASET.to_string(), str::to_string)
}
