use std::{fs::File, path::Path};

use bio::{
    alphabets::Alphabet,
    data_structures::{
        bwt::{bwt, less, Occ},
        suffix_array::suffix_array,
    },
    io::fastq,
};
use rayon::prelude::*;
use serde::Serialize;
use tempfile::tempdir;

use bwalign::{
    errors::Error,
    index::{
        index_files_exist, load_reference_index_from_path, Orientation, PositionalMapping,
        ReferenceIndex, StrandIndex,
    },
    map::{
        fm_index::FmIndex,
        input_chunk_reader::IntoTaskQueue,
        mapping,
        record::{EditOperation, Record},
        Aligner, AlignmentParameters, Strand,
    },
};

const GENOME: &[u8] = b"\
TGTACTCGGGTGCCGAAGCCTACAGCTGGACCACCCGATGGCGTGCCTCTATCGGCACTC\
GGCAGAATTGTTCCGGACGTATTGCAACTCCTCCGTACTTTGGTCCGTAAACTCACTTAG\
CTACCCTGTCACCCCTGCGGTATTTAAAAGGCCTAAGCTGATCTTGCACGTGAGAGCCTC\
GCGTCTTGTGAGAAAAAGGTCCGGAAGTAATGGTTTGACACGATCAACGCCCGTCACGCC\
GTATGGTCTGCTTAGCCCAACTAGAGTTTTAACAATGAACTTAGGGAACGACCAGGGAAC";

fn build_strand_index(sequence: &[u8]) -> StrandIndex {
    let mut text = sequence.to_vec();
    text.push(b'$');
    let alphabet = Alphabet::new(b"ACGT");
    let sa = suffix_array(&text);
    let bwt = bwt(&text, &sa);
    let less = less(&bwt, &alphabet);
    let occ = Occ::new(&bwt, 3, &alphabet);
    StrandIndex::new(
        FmIndex::new(bwt, less, occ).unwrap(),
        PositionalMapping::new(sa),
    )
    .unwrap()
}

fn build_reference_index(sequence: &[u8]) -> ReferenceIndex {
    let reversed = sequence.iter().rev().copied().collect::<Vec<_>>();
    ReferenceIndex::new(build_strand_index(sequence), build_strand_index(&reversed)).unwrap()
}

/// Same layout as the on-disk index container
#[derive(Serialize)]
struct VersionedItem<'a, T> {
    version: u8,
    data: &'a T,
}

fn write_item<T: Serialize>(path: String, version: u8, data: &T) {
    let mut writer = snap::write::FrameEncoder::new(File::create(path).unwrap());
    bincode::serialize_into(&mut writer, &VersionedItem { version, data }).unwrap();
}

fn write_reference_index(reference_index: &ReferenceIndex, prefix: &Path, version: u8) {
    let prefix = prefix.to_str().unwrap();
    for (orientation, infix) in [(Orientation::Forward, "fwd"), (Orientation::Reverse, "rev")] {
        let strand_index = reference_index.get(orientation);
        write_item(
            format!("{prefix}.{infix}.tbw"),
            version,
            &strand_index.fm_index.bwt,
        );
        write_item(
            format!("{prefix}.{infix}.tle"),
            version,
            &strand_index.fm_index.less,
        );
        write_item(
            format!("{prefix}.{infix}.toc"),
            version,
            &strand_index.fm_index.occ,
        );
        write_item(
            format!("{prefix}.{infix}.tsa"),
            version,
            &strand_index.suffix_array,
        );
    }
}

#[test]
fn integration_1() {
    let reference = build_reference_index(GENOME);
    let aligner = Aligner::new(&reference, AlignmentParameters::default());

    // Exact match
    let alignments = aligner.align(b"TTAACAATGAACTTAGGGAACGACCAGG");
    assert_eq!(alignments.len(), 1);
    assert_eq!(alignments[0].strand, Strand::Positive);
    assert_eq!(alignments[0].alignment_start, 269);
    assert_eq!(alignments[0].cigar_string(), "28M");

    // Reverse complement
    let alignments = aligner.align(b"CCTGGTCGTTCCCTAAGTTCATTGTTAA");
    assert_eq!(alignments.len(), 1);
    assert_eq!(alignments[0].strand, Strand::Negative);
    assert_eq!(alignments[0].alignment_start, 269);
    assert_eq!(alignments[0].score(), 0);

    // Substitution
    let alignments = aligner.align(b"TTAACAATGAACTTCGGGAACGACCAGG");
    assert_eq!(alignments.len(), 1);
    assert_eq!(alignments[0].alignment_start, 269);
    assert_eq!(alignments[0].mismatches, 1);
    assert_eq!(
        alignments[0].edit_operations.iter().nth(14),
        Some(&EditOperation::Mismatch(b'A'))
    );

    // Nothing similar in the reference
    assert!(aligner.align(b"GATTGGTGCACGGACGCGCGTTGAAAGG").is_empty());
}

#[test]
fn integration_gapped() {
    let reference = build_reference_index(GENOME);
    let parameters = AlignmentParameters::default();
    let aligner = Aligner::new(&reference, parameters.clone());

    // Deletion
    let alignments = aligner.align(b"CCTGGTCGTTCCCAAGTTCATTGTTAA");
    let best = &alignments[0];
    assert_eq!(best.strand, Strand::Negative);
    assert_eq!(best.alignment_start, 269);
    assert_eq!(best.cigar_string(), "14M1D13M");
    assert_eq!(best.score(), parameters.penalty_gap_open);
    assert!(alignments
        .iter()
        .all(|alignment| alignment.num_differences() <= 2 && alignment.alignment_start == 269));

    // Insertion
    let alignments = aligner.align(b"CCTGGTCGTTCCCTTAAGTTCATTGTTAA");
    let best = &alignments[0];
    assert_eq!(best.strand, Strand::Negative);
    assert_eq!(best.alignment_start, 269);
    assert_eq!(best.cigar_string(), "14M1I14M");
    assert_eq!(best.gap_opens, 1);
    assert_eq!(best.edit_operations.effective_len(), 28);
    // Both placements of the extra `T` are equally good
    assert_eq!(alignments[1].cigar_string(), "15M1I13M");
    assert_eq!(alignments[1].score(), best.score());
}

#[test]
fn integration_parallel_reads() {
    let reference = build_reference_index(GENOME);
    let aligner = Aligner::new(&reference, AlignmentParameters::default());
    let reads = [
        b"TTAACAATGAACTTAGGGAACGACCAGG".as_slice(),
        b"CCTGGTCGTTCCCTAAGTTCATTGTTAA".as_slice(),
        b"CCTGGTCGTTCCCAAGTTCATTGTTAA".as_slice(),
        b"GATTGGTGCACGGACGCGCGTTGAAAGG".as_slice(),
    ];

    let sequential = reads
        .iter()
        .map(|read| aligner.align(read))
        .collect::<Vec<_>>();
    let parallel = reads
        .par_iter()
        .map(|read| aligner.align(read))
        .collect::<Vec<_>>();
    assert_eq!(sequential, parallel);
}

#[test]
fn integration_load_from_disk() {
    let temp_dir = tempdir().unwrap();
    let prefix = temp_dir.path().join("genome");
    let reference = build_reference_index(GENOME);
    write_reference_index(&reference, &prefix, 1);
    assert!(index_files_exist(prefix.to_str().unwrap()));

    let loaded = load_reference_index_from_path(prefix.to_str().unwrap()).unwrap();
    assert_eq!(loaded.len(), GENOME.len());
    let aligner = Aligner::new(&loaded, AlignmentParameters::default());
    let alignments = aligner.align(b"CCTGGTCGTTCCCTAAGTTCATTGTTAA");
    assert_eq!(alignments[0].alignment_start, 269);
}

#[test]
fn integration_index_version_mismatch() {
    let temp_dir = tempdir().unwrap();
    let prefix = temp_dir.path().join("genome");
    let reference = build_reference_index(GENOME);
    write_reference_index(&reference, &prefix, 0);

    assert!(matches!(
        load_reference_index_from_path(prefix.to_str().unwrap()),
        Err(Error::IndexVersionMismatch {
            running: 1,
            on_disk: 0
        })
    ));
}

#[test]
fn integration_fastq_pipeline() {
    let reference = build_reference_index(GENOME);
    let fastq_content = b"\
@read_fwd some description
TTAACAATGAACTTAGGGAACGACCAGG
+
]]]]]]]]]]]]]]]]]]]]]]]]]]]]
@read_rev
CCTGGTCGTTCCCTAAGTTCATTGTTAA
+
]]]]]]]]]]]]]]]]]]]]]]]]]]]]
@read_unmapped
GATTGGTGCACGGACGCGCGTTGAAAGG
+
]]]]]]]]]]]]]]]]]]]]]]]]]]]]
";
    let records = fastq::Reader::new(fastq_content.as_slice()).records();

    let mut out = Vec::new();
    mapping::run_inner(
        records.into_tasks(2),
        &reference,
        &AlignmentParameters::default(),
        &mut out,
    )
    .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "read_fwd\t+\t269\t28M\t0\t0\t0\t0\n\
         read_rev\t-\t269\t28M\t0\t0\t0\t0\n\
         read_unmapped\t*\t0\t*\t*\t*\t*\t*\n"
    );
}

#[test]
fn integration_record_conversion() {
    let fastq_record = fastq::Record::with_attrs("read_1", None, b"acgtn", b"IIIII");
    let record = Record::from(fastq_record);
    assert_eq!(record.sequence, b"ACGTN");
    assert_eq!(record.to_string(), "read_1");
}
