use std::fmt;

use bio::io::fastq;
use either::Either;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::map::{
    backtrack_tree::{NodeId, Tree},
    AlignmentState, Strand,
};

/// Input read. Base qualities play no role in the search and are not kept.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Record {
    pub sequence: Vec<u8>,
    pub name: Option<Vec<u8>>,
}

impl From<fastq::Record> for Record {
    fn from(fq_record: fastq::Record) -> Self {
        Self {
            sequence: fq_record.seq().to_ascii_uppercase(),
            name: Some(fq_record.id().as_bytes().to_owned()),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let read_name = self.name.as_deref().unwrap_or(b"*".as_slice());
        write!(f, "{}", String::from_utf8_lossy(read_name))
    }
}

/// Variants store the reference base where it differs from the read
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOperation {
    Match,
    Mismatch(u8),
    Insertion,
    Deletion(u8),
}

impl EditOperation {
    pub fn state(self) -> AlignmentState {
        match self {
            EditOperation::Match | EditOperation::Mismatch(_) => AlignmentState::MatchOrMismatch,
            EditOperation::Insertion => AlignmentState::Insertion,
            EditOperation::Deletion(_) => AlignmentState::Deletion,
        }
    }

    fn cigar_symbol(self) -> char {
        match self.state() {
            AlignmentState::MatchOrMismatch => 'M',
            AlignmentState::Insertion => 'I',
            AlignmentState::Deletion => 'D',
        }
    }
}

/// Contains edit operations performed in order to align the sequence, in the order of the
/// forward strand of the reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOperationsTrack(Vec<EditOperation>);

impl EditOperationsTrack {
    pub fn new(edit_operations: Vec<EditOperation>) -> Self {
        Self(edit_operations)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditOperation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Calculates the amount of positions in the genome
    /// that are covered by this read
    pub fn effective_len(&self) -> usize {
        self.0
            .iter()
            .filter(|edit_operation| {
                !matches!(edit_operation, EditOperation::Insertion)
            })
            .count()
    }

    /// Number of read bases covered by the track
    pub fn read_len(&self) -> usize {
        self.0
            .iter()
            .filter(|edit_operation| !matches!(edit_operation, EditOperation::Deletion(_)))
            .count()
    }

    /// Number of edited positions (like the `NM` tag)
    pub fn edit_distance(&self) -> usize {
        self.0
            .iter()
            .filter(|edit_operation| !matches!(edit_operation, EditOperation::Match))
            .count()
    }

    /// Run-length encoded operations, e.g. `[(12, 'M'), (1, 'I'), (7, 'M')]`
    pub fn cigar(&self) -> SmallVec<[(u32, char); 8]> {
        let mut cigar = SmallVec::<[(u32, char); 8]>::new();
        for edit_operation in &self.0 {
            let symbol = edit_operation.cigar_symbol();
            match cigar.last_mut() {
                Some((length, last_symbol)) if *last_symbol == symbol => *length += 1,
                _ => cigar.push((1, symbol)),
            }
        }
        cigar
    }

    pub fn cigar_string(&self) -> String {
        self.cigar()
            .into_iter()
            .map(|(length, symbol)| format!("{length}{symbol}"))
            .collect()
    }
}

/// Walks the edit tree from a leaf up and puts the operations into reference order.
///
/// Positive-strand alignments consume the read in reference order, so the (newest-first) path is
/// reversed. Negative-strand alignments consume the complemented read towards the start of the
/// reference, so the path is already in reference order.
pub fn extract_edit_operations(
    end_node: Option<NodeId>,
    edit_tree: &Tree<EditOperation>,
    strand: Strand,
) -> EditOperationsTrack {
    let path = end_node
        .map(|end_node| edit_tree.ancestors(end_node).copied().collect::<Vec<_>>())
        .unwrap_or_default();
    EditOperationsTrack(
        match strand {
            Strand::Positive => Either::Left(path.into_iter().rev()),
            Strand::Negative => Either::Right(path.into_iter()),
        }
        .collect(),
    )
}
