mod versioned_index;

use std::{fmt, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    index::versioned_index::Item,
    map::fm_index::FmIndex,
};

pub const DNA_UPPERCASE_ALPHABET: &[u8; 4] = b"ACGT";

/// Orientation of the indexed reference sequence. The reverse index is built over the reversed
/// (not complemented) reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reverse,
}

impl Orientation {
    fn file_infix(self) -> &'static str {
        match self {
            Orientation::Forward => "fwd",
            Orientation::Reverse => "rev",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Forward => write!(f, "forward"),
            Orientation::Reverse => write!(f, "reverse"),
        }
    }
}

/// Full (unsampled) suffix array. Maps index ranks to 0-based positions in the sequence of the
/// corresponding orientation.
#[derive(Serialize, Deserialize, Debug)]
pub struct PositionalMapping(Vec<usize>);

impl PositionalMapping {
    pub fn new(suffix_array: Vec<usize>) -> Self {
        Self(suffix_array)
    }

    /// Panics if `rank` is out of bounds. Ranks handed out by the paired `FmIndex` never are.
    pub fn get(&self, rank: usize) -> usize {
        self.0[rank]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// FM-index and suffix array of one orientation
pub struct StrandIndex {
    pub fm_index: FmIndex,
    pub suffix_array: PositionalMapping,
}

impl StrandIndex {
    pub fn new(fm_index: FmIndex, suffix_array: PositionalMapping) -> Result<Self> {
        if suffix_array.len() != fm_index.bwt.len() {
            return Err(Error::InvalidIndex(format!(
                "Suffix array length ({}) does not match BWT length ({})",
                suffix_array.len(),
                fm_index.bwt.len()
            )));
        }
        Ok(Self {
            fm_index,
            suffix_array,
        })
    }

    /// Length of the indexed sequence
    pub fn len(&self) -> usize {
        self.fm_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fm_index.is_empty()
    }
}

/// Both orientations of the reference. Loaded once, then only ever borrowed immutably.
pub struct ReferenceIndex {
    forward: StrandIndex,
    reverse: StrandIndex,
}

impl ReferenceIndex {
    pub fn new(forward: StrandIndex, reverse: StrandIndex) -> Result<Self> {
        if forward.len() != reverse.len() {
            return Err(Error::InvalidIndex(format!(
                "Forward ({}) and reverse ({}) index lengths differ",
                forward.len(),
                reverse.len()
            )));
        }
        Ok(Self { forward, reverse })
    }

    pub fn get(&self, orientation: Orientation) -> &StrandIndex {
        match orientation {
            Orientation::Forward => &self.forward,
            Orientation::Reverse => &self.reverse,
        }
    }

    pub fn into_parts(self) -> (StrandIndex, StrandIndex) {
        (self.forward, self.reverse)
    }

    /// Length of the reference sequence
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

fn index_file_path(reference_path: &str, orientation: Orientation, extension: &str) -> String {
    format!(
        "{reference_path}.{}.{extension}",
        orientation.file_infix()
    )
}

pub fn load_suffix_array_from_path(
    reference_path: &str,
    orientation: Orientation,
) -> Result<PositionalMapping> {
    Item::read_from_path(index_file_path(reference_path, orientation, "tsa"))?.try_take()
}

pub fn load_fm_index_from_path(reference_path: &str, orientation: Orientation) -> Result<FmIndex> {
    debug!("Load {orientation} BWT");
    let bwt = Item::read_from_path(index_file_path(reference_path, orientation, "tbw"))?
        .try_take()?;

    debug!("Load {orientation} \"C\" table");
    let less = Item::read_from_path(index_file_path(reference_path, orientation, "tle"))?
        .try_take()?;

    debug!("Load {orientation} \"Occ\" table");
    let occ = Item::read_from_path(index_file_path(reference_path, orientation, "toc"))?
        .try_take()?;

    debug!("Reconstruct {orientation} index");
    FmIndex::new(bwt, less, occ)
}

pub fn load_strand_index_from_path(
    reference_path: &str,
    orientation: Orientation,
) -> Result<StrandIndex> {
    let fm_index = load_fm_index_from_path(reference_path, orientation)?;
    debug!("Load {orientation} suffix array");
    let suffix_array = load_suffix_array_from_path(reference_path, orientation)?;
    StrandIndex::new(fm_index, suffix_array)
}

/// Loads both orientations of a pre-built reference index. Every failure is fatal.
pub fn load_reference_index_from_path(reference_path: &str) -> Result<ReferenceIndex> {
    ReferenceIndex::new(
        load_strand_index_from_path(reference_path, Orientation::Forward)?,
        load_strand_index_from_path(reference_path, Orientation::Reverse)?,
    )
}

/// Returns `true` if all files of a reference index exist
pub fn index_files_exist(reference_path: &str) -> bool {
    [Orientation::Forward, Orientation::Reverse]
        .into_iter()
        .flat_map(|orientation| {
            ["tbw", "tle", "toc", "tsa"]
                .into_iter()
                .map(move |extension| index_file_path(reference_path, orientation, extension))
        })
        .all(|path| Path::new(&path).exists())
}

/// Writes a strand index the way `load_strand_index_from_path()` expects it
#[cfg(test)]
pub(crate) fn write_strand_index_to_path(
    strand_index: &StrandIndex,
    reference_path: &str,
    orientation: Orientation,
) -> Result<()> {
    let fm_index = &strand_index.fm_index;
    Item::new(&fm_index.bwt)
        .write_to_path(index_file_path(reference_path, orientation, "tbw"))?;
    Item::new(&fm_index.less)
        .write_to_path(index_file_path(reference_path, orientation, "tle"))?;
    Item::new(&fm_index.occ)
        .write_to_path(index_file_path(reference_path, orientation, "toc"))?;
    Item::new(&strand_index.suffix_array)
        .write_to_path(index_file_path(reference_path, orientation, "tsa"))
}
