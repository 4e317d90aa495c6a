use std::{
    cell::RefCell,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::Instant,
};

use bio::io::fastq;
use log::{debug, info, trace};
use min_max_heap::MinMaxHeap;
use rayon::prelude::*;
use smallvec::{smallvec, SmallVec};

use crate::{
    errors::Result,
    index::{load_reference_index_from_path, Orientation, ReferenceIndex},
    map::{
        backtrack_tree::Tree,
        base::{complement, Base},
        fm_index::FmIndex,
        input_chunk_reader::{IntoTaskQueue, TaskQueue},
        lower_bound::LowerBounds,
        record::{extract_edit_operations, EditOperation, Record},
        Alignment, AlignmentParameters, AlignmentState, SearchState, Strand,
    },
};

/// Counters describing the work done by one call of `k_difference_search()`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    pub pushed: usize,
    pub popped: usize,
    pub pruned: usize,
    pub expanded: usize,
}

#[derive(Debug)]
pub struct SearchResult {
    /// Completed alignments in the order they were found
    pub alignments: Vec<Alignment>,
    pub stats: SearchStats,
}

/// Loads index files and launches the mapping process. Results are printed to stdout.
pub fn run(
    reads_path: &str,
    reference_path: &str,
    alignment_parameters: &AlignmentParameters,
) -> Result<()> {
    let reads_path = Path::new(reads_path);
    if !reads_path.exists() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "The given input file could not be found",
        )
        .into());
    }

    info!("Load reference index");
    let reference = load_reference_index_from_path(reference_path)?;

    info!("Map reads");
    let reader = fastq::Reader::new(File::open(reads_path)?);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run_inner(
        reader.records().into_tasks(alignment_parameters.chunk_size),
        &reference,
        alignment_parameters,
        &mut out,
    )?;
    out.flush()?;

    info!("Done");
    Ok(())
}

/// Maps chunks of reads in parallel and writes the results in input order
pub fn run_inner<T, W>(
    records: TaskQueue<T>,
    reference: &ReferenceIndex,
    alignment_parameters: &AlignmentParameters,
    out: &mut W,
) -> Result<()>
where
    T: Iterator<Item = Result<Record>>,
    W: Write,
{
    thread_local! {
        static STACK_BUF: RefCell<MinMaxHeap<SearchState>> = RefCell::new(MinMaxHeap::new());
        static TREE_BUF: RefCell<Tree<EditOperation>> = RefCell::new(Tree::new());
    }

    for chunk in records {
        debug!("Map chunk {} ({} records)", chunk, chunk.len());
        let start = Instant::now();
        let results = chunk
            .get_records()
            .into_par_iter()
            .map(|record| {
                STACK_BUF.with(|stack_buf| {
                    TREE_BUF.with(|tree_buf| {
                        let search_result = k_difference_search(
                            &record.sequence,
                            alignment_parameters,
                            reference,
                            &mut stack_buf.borrow_mut(),
                            &mut tree_buf.borrow_mut(),
                        );
                        (record, search_result.alignments)
                    })
                })
            })
            .collect::<Vec<_>>();
        debug!("Mapped chunk in {} s", start.elapsed().as_secs_f32());

        for (record, alignments) in results {
            write_alignments(&record, &alignments, out)?;
        }
    }
    Ok(())
}

/// Prints one tab-separated line per alignment, or a placeholder line if there is none
fn write_alignments<W: Write>(record: &Record, alignments: &[Alignment], out: &mut W) -> Result<()> {
    if alignments.is_empty() {
        writeln!(out, "{record}\t*\t0\t*\t*\t*\t*\t*")?;
    }
    for alignment in alignments {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record,
            alignment.strand,
            alignment.alignment_start,
            alignment.cigar_string(),
            alignment.mismatches,
            alignment.gap_opens,
            alignment.gap_extensions,
            alignment.score(),
        )?;
    }
    Ok(())
}

/// What the search needs to know about one strand
struct StrandSearch<'a> {
    /// Read bases in the order they are consumed
    bases: Vec<u8>,
    fm_index: &'a FmIndex,
    lower_bounds: LowerBounds,
}

impl<'a> StrandSearch<'a> {
    fn new(strand: Strand, pattern: &[u8], reference: &'a ReferenceIndex) -> Self {
        let bases = match strand {
            Strand::Positive => pattern.to_vec(),
            Strand::Negative => pattern.iter().map(|&symbol| complement(symbol)).collect(),
        };
        let lower_bounds = LowerBounds::new(
            &bases,
            &reference.get(strand.lower_bound_orientation()).fm_index,
        );
        Self {
            bases,
            fm_index: &reference.get(strand.search_orientation()).fm_index,
            lower_bounds,
        }
    }
}

/// Assigns score and queue position to a new state and pushes it onto the stack
fn push_search_state(
    mut search_state: SearchState,
    edit_operation: Option<EditOperation>,
    edit_tree: &mut Tree<EditOperation>,
    stack: &mut MinMaxHeap<SearchState>,
    stats: &mut SearchStats,
    parameters: &AlignmentParameters,
) {
    debug_assert!(search_state.interval.lo <= search_state.interval.hi);
    debug_assert!(search_state.gap_opens <= parameters.max_gap_opens);
    debug_assert!(search_state.gap_extensions <= parameters.max_gap_extensions);

    if let Some(edit_operation) = edit_operation {
        search_state.edit_node_id = Some(edit_tree.add_node(edit_operation, search_state.edit_node_id));
    }
    search_state.score = parameters.score(
        search_state.mismatches,
        search_state.gap_opens,
        search_state.gap_extensions,
    );
    search_state.insertion_order = stats.pushed as u64;
    stats.pushed += 1;
    stack.push(search_state);
}

/// Translates a state that consumed the whole read into an alignment
fn finalize(
    search_state: &SearchState,
    reference: &ReferenceIndex,
    edit_tree: &Tree<EditOperation>,
) -> Alignment {
    let edit_operations =
        extract_edit_operations(search_state.edit_node_id, edit_tree, search_state.strand);
    let alignment_start = match search_state.strand {
        Strand::Positive => {
            // The match was found in the reversed reference. Its start there is the end of the
            // match in the forward reference.
            let reverse = reference.get(Orientation::Reverse);
            reverse.len() + 1
                - reverse.suffix_array.get(search_state.interval.lo)
                - edit_operations.effective_len()
        }
        Strand::Negative => {
            reference
                .get(Orientation::Forward)
                .suffix_array
                .get(search_state.interval.lo)
                + 1
        }
    };

    Alignment {
        strand: search_state.strand,
        alignment_start,
        mismatches: search_state.mismatches,
        gap_opens: search_state.gap_opens,
        gap_extensions: search_state.gap_extensions,
        score: search_state.score,
        interval: search_state.interval,
        edit_operations,
    }
}

/// Finds all alignments of `pattern` to both strands of the reference w.r.t. supplied
/// alignment parameters.
///
/// The search is best-first: partial alignments are expanded in the order of their score
/// (ties in the order they were created) until the best remaining partial alignment scores
/// worse than the best complete one by more than a mismatch. `stack` and `edit_tree` are
/// cleared before use and can be reused across calls to save allocations.
pub fn k_difference_search(
    pattern: &[u8],
    parameters: &AlignmentParameters,
    reference: &ReferenceIndex,
    stack: &mut MinMaxHeap<SearchState>,
    edit_tree: &mut Tree<EditOperation>,
) -> SearchResult {
    let mut alignments = Vec::new();
    let mut stats = SearchStats::default();
    stack.clear();
    edit_tree.clear();

    if pattern.is_empty() || reference.is_empty() {
        return SearchResult { alignments, stats };
    }

    let strand_searches =
        Strand::BOTH.map(|strand| StrandSearch::new(strand, pattern, reference));
    for strand in Strand::BOTH {
        let seed = SearchState::seed(
            strand,
            strand_searches[strand.table_index()].fm_index.init_interval(),
        );
        push_search_state(seed, None, edit_tree, stack, &mut stats, parameters);
    }

    let last_position = pattern.len() as isize - 1;
    let indel_end_skip = isize::from(parameters.indel_end_skip);
    let mut best_score = u32::MAX;
    let mut best_diff = u32::from(parameters.max_edit_distance) + 1;
    let mut max_diff = u32::from(parameters.max_edit_distance);

    while let Some(search_state) = stack.pop_min() {
        stats.popped += 1;

        if search_state.score > best_score.saturating_add(parameters.penalty_mismatch) {
            break;
        }

        // Read is fully consumed
        if search_state.read_position == last_position {
            let alignment = finalize(&search_state, reference, edit_tree);
            best_score = best_score.min(alignment.score);
            best_diff = best_diff.min(alignment.num_differences());
            max_diff = max_diff.min(best_diff + 1);
            alignments.push(alignment);
            continue;
        }

        let strand_search = &strand_searches[search_state.strand.table_index()];
        let next_position = (search_state.read_position + 1) as usize;
        let lower_bound = strand_search.lower_bounds.get(next_position);

        // Admissible pruning with the D-array
        let remaining_budget =
            i64::from(max_diff) - i64::from(search_state.num_differences());
        let required = if parameters.lower_bound_pruning {
            i64::from(lower_bound.min_mismatches)
        } else {
            0
        };
        if remaining_budget < required {
            stats.pruned += 1;
            continue;
        }
        stats.expanded += 1;

        // Insertions and deletions
        let num_gaps = isize::from(search_state.gap_opens) + isize::from(search_state.gap_extensions);
        if remaining_budget > 0
            && search_state.read_position + 1 >= indel_end_skip - 1 + num_gaps
            && last_position - (search_state.read_position + 1) >= indel_end_skip + num_gaps
        {
            match search_state.current_state(edit_tree) {
                AlignmentState::MatchOrMismatch => {
                    if search_state.gap_opens < parameters.max_gap_opens {
                        let opened = SearchState {
                            gap_opens: search_state.gap_opens + 1,
                            ..search_state
                        };
                        push_insertion(opened, edit_tree, stack, &mut stats, parameters);
                        push_deletions(
                            opened,
                            strand_search.fm_index,
                            edit_tree,
                            stack,
                            &mut stats,
                            parameters,
                        );
                    }
                }
                AlignmentState::Insertion => {
                    if search_state.gap_extensions < parameters.max_gap_extensions {
                        let extended = SearchState {
                            gap_extensions: search_state.gap_extensions + 1,
                            ..search_state
                        };
                        push_insertion(extended, edit_tree, stack, &mut stats, parameters);
                    }
                }
                AlignmentState::Deletion => {
                    if search_state.gap_extensions < parameters.max_gap_extensions {
                        let extended = SearchState {
                            gap_extensions: search_state.gap_extensions + 1,
                            ..search_state
                        };
                        push_deletions(
                            extended,
                            strand_search.fm_index,
                            edit_tree,
                            stack,
                            &mut stats,
                            parameters,
                        );
                    }
                }
            }
        }

        // Matches and mismatches. Mismatches are not tried here if the D-array shows that
        // the next position needs one anyway.
        let mut allow_mismatches = remaining_budget > 0;
        if (next_position as isize) < last_position {
            let lower_bound_ahead = strand_search.lower_bounds.get(next_position + 1);
            allow_mismatches &= !(i64::from(lower_bound_ahead.min_mismatches) == remaining_budget - 1
                && i64::from(lower_bound.min_mismatches) == remaining_budget - 1
                && lower_bound_ahead.width == lower_bound.width);
        }

        let read_base = Base::from_symbol(strand_search.bases[next_position]);
        let candidates: SmallVec<[Base; 4]> = match (allow_mismatches, read_base) {
            (true, Some(read_base)) => read_base.rotated_last().collect(),
            (true, None) => Base::ALL.into_iter().collect(),
            (false, Some(read_base)) => smallvec![read_base],
            (false, None) => SmallVec::new(),
        };

        for base in candidates {
            if let Some(interval) = strand_search
                .fm_index
                .backward_ext(&search_state.interval, base)
            {
                let is_match = read_base == Some(base);
                let edit_operation = if is_match {
                    EditOperation::Match
                } else {
                    EditOperation::Mismatch(base.to_symbol())
                };
                push_search_state(
                    SearchState {
                        interval,
                        read_position: search_state.read_position + 1,
                        mismatches: search_state.mismatches + u8::from(!is_match),
                        ..search_state
                    },
                    Some(edit_operation),
                    edit_tree,
                    stack,
                    &mut stats,
                    parameters,
                );
            }
        }
    }

    trace!(
        "Read length {}: {} alignments, {} pushed, {} popped, {} pruned, {} expanded",
        pattern.len(),
        alignments.len(),
        stats.pushed,
        stats.popped,
        stats.pruned,
        stats.expanded,
    );

    SearchResult { alignments, stats }
}

/// Consumes a read base without narrowing the interval
fn push_insertion(
    search_state: SearchState,
    edit_tree: &mut Tree<EditOperation>,
    stack: &mut MinMaxHeap<SearchState>,
    stats: &mut SearchStats,
    parameters: &AlignmentParameters,
) {
    push_search_state(
        SearchState {
            read_position: search_state.read_position + 1,
            ..search_state
        },
        Some(EditOperation::Insertion),
        edit_tree,
        stack,
        stats,
        parameters,
    );
}

/// Narrows the interval by each reference base without consuming a read base
fn push_deletions(
    search_state: SearchState,
    fm_index: &FmIndex,
    edit_tree: &mut Tree<EditOperation>,
    stack: &mut MinMaxHeap<SearchState>,
    stats: &mut SearchStats,
    parameters: &AlignmentParameters,
) {
    for base in Base::ALL {
        if let Some(interval) = fm_index.backward_ext(&search_state.interval, base) {
            push_search_state(
                SearchState {
                    interval,
                    ..search_state
                },
                Some(EditOperation::Deletion(base.to_symbol())),
                edit_tree,
                stack,
                stats,
                parameters,
            );
        }
    }
}
