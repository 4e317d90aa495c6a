//! Helpers for tests. Indexes are built from small in-memory references here; the crate itself
//! only ever loads pre-built ones.

use bio::{
    alphabets::Alphabet,
    data_structures::{
        bwt::{bwt, less, Occ},
        suffix_array::suffix_array,
    },
};

use crate::{
    index::{PositionalMapping, ReferenceIndex, StrandIndex, DNA_UPPERCASE_ALPHABET},
    map::fm_index::{FmIndex, SENTINEL},
};

/// Builds FM-index and full suffix array of `reference`
pub fn build_auxiliary_structures(reference: &[u8]) -> (FmIndex, PositionalMapping) {
    let mut text = reference.to_ascii_uppercase();
    text.push(SENTINEL);

    let alphabet = Alphabet::new(DNA_UPPERCASE_ALPHABET);
    let sa = suffix_array(&text);
    let bwt = bwt(&text, &sa);
    let less = less(&bwt, &alphabet);
    let occ = Occ::new(&bwt, 3, &alphabet);

    (
        FmIndex::new(bwt, less, occ).expect("index is generated internally"),
        PositionalMapping::new(sa),
    )
}

/// Builds forward and reverse index of `reference`
pub fn build_reference_index(reference: &[u8]) -> ReferenceIndex {
    let build_strand = |sequence: &[u8]| {
        let (fm_index, suffix_array) = build_auxiliary_structures(sequence);
        StrandIndex::new(fm_index, suffix_array).expect("index is generated internally")
    };
    let reversed = reference.iter().rev().copied().collect::<Vec<_>>();
    ReferenceIndex::new(build_strand(reference), build_strand(&reversed))
        .expect("index is generated internally")
}
