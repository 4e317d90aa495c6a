pub mod backtrack_tree;
pub mod base;
pub mod fm_index;
pub mod input_chunk_reader;
pub mod lower_bound;
pub mod mapping;
pub mod record;

use std::{cmp::Ordering, fmt};

use min_max_heap::MinMaxHeap;
use serde::{Deserialize, Serialize};

use crate::{
    index::{Orientation, ReferenceIndex},
    map::{
        backtrack_tree::{NodeId, Tree},
        fm_index::BwtInterval,
        mapping::{k_difference_search, SearchResult},
        record::{EditOperation, EditOperationsTrack},
    },
};

/// Limits and penalties of the edit model. The defaults follow BWA's `aln` defaults
/// (`-n 4 -o 1 -e 6 -M 3 -O 11 -E 4 -i 5`).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentParameters {
    pub max_edit_distance: u8,
    pub max_gap_opens: u8,
    pub max_gap_extensions: u8,
    pub penalty_mismatch: u32,
    pub penalty_gap_open: u32,
    pub penalty_gap_extend: u32,
    /// Indels are not allowed within this many bases of either read end
    pub indel_end_skip: u8,
    /// Discard partial alignments that can not be completed within the edit budget according to
    /// the D-array. Turning this off only makes the search slower.
    pub lower_bound_pruning: bool,
    /// Number of reads that are processed in parallel by `mapping::run()`
    pub chunk_size: usize,
}

impl Default for AlignmentParameters {
    fn default() -> Self {
        Self {
            max_edit_distance: 4,
            max_gap_opens: 1,
            max_gap_extensions: 6,
            penalty_mismatch: 3,
            penalty_gap_open: 11,
            penalty_gap_extend: 4,
            indel_end_skip: 5,
            lower_bound_pruning: true,
            chunk_size: 10_000,
        }
    }
}

impl AlignmentParameters {
    pub fn score(&self, mismatches: u8, gap_opens: u8, gap_extensions: u8) -> u32 {
        u32::from(mismatches) * self.penalty_mismatch
            + u32::from(gap_opens) * self.penalty_gap_open
            + u32::from(gap_extensions) * self.penalty_gap_extend
    }
}

/// Strand a read is aligned to
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Positive,
    Negative,
}

impl Strand {
    pub const BOTH: [Strand; 2] = [Strand::Positive, Strand::Negative];

    /// Position in per-strand lookup tables
    fn table_index(self) -> usize {
        match self {
            Strand::Positive => 0,
            Strand::Negative => 1,
        }
    }

    /// The index that is traversed while aligning to this strand.
    /// Reads are consumed from their first to their last base, which, with backward search,
    /// means prepending to a pattern in the reversed reference for positive-strand alignments.
    /// Negative-strand alignments consume the complemented read and prepend to a pattern in the
    /// forward reference.
    fn search_orientation(self) -> Orientation {
        match self {
            Strand::Positive => Orientation::Reverse,
            Strand::Negative => Orientation::Forward,
        }
    }

    /// The index used to compute the D-array, which consumes the read in the opposite direction
    fn lower_bound_orientation(self) -> Orientation {
        match self.search_orientation() {
            Orientation::Forward => Orientation::Reverse,
            Orientation::Reverse => Orientation::Forward,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Positive => write!(f, "+"),
            Strand::Negative => write!(f, "-"),
        }
    }
}

/// Kind of the newest edit operation of a partial alignment
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AlignmentState {
    MatchOrMismatch,
    Insertion,
    Deletion,
}

/// Stores information about partial alignments on the priority stack.
/// States are never modified once they are on the stack. Expanding a state creates new ones
/// which share the edit history of their parent via the edit tree.
#[derive(Debug, Clone, Copy)]
pub struct SearchState {
    interval: BwtInterval,
    /// Last consumed read position, -1 before the first base
    read_position: isize,
    mismatches: u8,
    gap_opens: u8,
    gap_extensions: u8,
    strand: Strand,
    edit_node_id: Option<NodeId>,
    /// Derived from the counters when the state is pushed
    score: u32,
    /// Breaks ties between equally scored states
    insertion_order: u64,
}

impl SearchState {
    /// Fictional alignment just off the start of the read, spanning the whole index
    fn seed(strand: Strand, interval: BwtInterval) -> Self {
        Self {
            interval,
            read_position: -1,
            mismatches: 0,
            gap_opens: 0,
            gap_extensions: 0,
            strand,
            edit_node_id: None,
            score: 0,
            insertion_order: 0,
        }
    }

    fn num_differences(&self) -> u32 {
        u32::from(self.mismatches) + u32::from(self.gap_opens) + u32::from(self.gap_extensions)
    }

    fn current_state(&self, edit_tree: &Tree<EditOperation>) -> AlignmentState {
        self.edit_node_id
            .and_then(|node_id| edit_tree.get(node_id))
            .map_or(AlignmentState::MatchOrMismatch, |edit_operation| {
                edit_operation.state()
            })
    }
}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then(self.insertion_order.cmp(&other.insertion_order))
    }
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

/// A completed alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub strand: Strand,
    /// 1-based position of the leftmost aligned reference base on the forward strand
    pub alignment_start: usize,
    pub mismatches: u8,
    pub gap_opens: u8,
    pub gap_extensions: u8,
    pub score: u32,
    /// Final interval in the index of the search orientation of `strand`
    pub interval: BwtInterval,
    pub edit_operations: EditOperationsTrack,
}

impl Alignment {
    pub fn num_differences(&self) -> u32 {
        u32::from(self.mismatches) + u32::from(self.gap_opens) + u32::from(self.gap_extensions)
    }

    /// Number of reference positions this alignment fits equally well. Only the first one is
    /// reported as `alignment_start`.
    pub fn interval_size(&self) -> usize {
        self.interval.width()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn cigar_string(&self) -> String {
        self.edit_operations.cigar_string()
    }
}

/// Aligns reads against a loaded reference. The reference is only borrowed, so one `Aligner`
/// can be shared by any number of threads.
pub struct Aligner<'a> {
    reference: &'a ReferenceIndex,
    parameters: AlignmentParameters,
}

impl<'a> Aligner<'a> {
    pub fn new(reference: &'a ReferenceIndex, parameters: AlignmentParameters) -> Self {
        Self {
            reference,
            parameters,
        }
    }

    /// Returns all alignments found for `read` in the order they were discovered
    pub fn align(&self, read: &[u8]) -> Vec<Alignment> {
        self.align_with_stats(read).alignments
    }

    pub fn align_with_stats(&self, read: &[u8]) -> SearchResult {
        let mut stack = MinMaxHeap::new();
        let mut edit_tree = Tree::new();
        k_difference_search(
            read,
            &self.parameters,
            self.reference,
            &mut stack,
            &mut edit_tree,
        )
    }
}
