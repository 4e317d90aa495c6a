use bio::data_structures::bwt::{BWTSlice, Less, Occ, BWT};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    map::base::Base,
};

/// Symbol terminating the indexed sequence. It sorts before all bases.
pub const SENTINEL: u8 = b'$';

/// FM-index over the BWT of one orientation of the reference (`sequence + "$"`).
///
/// The sentinel occupies rank 0, so valid ranks are `0..=len()` and an interval spanning the whole
/// index is `[0, len()]`. Counts and ranks are reported the way the backtracking search expects
/// them: `total_count` does not count the sentinel, so that
///
/// ```text
/// lo' = total_count(a) + occurrences(a, lo - 1) + 1
/// hi' = total_count(a) + occurrences(a, hi)
/// ```
///
/// narrows `[lo, hi]` to the suffixes prefixed by `a`.
#[derive(Serialize, Deserialize)]
pub struct FmIndex {
    pub bwt: BWT,
    pub less: Less,
    pub occ: Occ,
}

impl FmIndex {
    /// Reassembles an index from its parts and checks that they fit together
    pub fn new(bwt: BWT, less: Less, occ: Occ) -> Result<Self> {
        let num_sentinels = bwt.iter().filter(|&&symbol| symbol == SENTINEL).count();
        if num_sentinels != 1 {
            return Err(Error::InvalidIndex(format!(
                "Expected exactly one sentinel in BWT, found {num_sentinels}"
            )));
        }
        if let Some(&symbol) = bwt
            .iter()
            .find(|&&symbol| symbol != SENTINEL && Base::from_symbol(symbol).is_none())
        {
            return Err(Error::InvalidIndex(format!(
                "Unexpected symbol {:?} in BWT",
                char::from(symbol)
            )));
        }
        if less.len() <= usize::from(Base::T.to_symbol()) {
            return Err(Error::InvalidIndex("\"C\" table is too short".into()));
        }

        // Recompute the "C" table and compare
        let mut expected = 1;
        for base in Base::ALL {
            if less[usize::from(base.to_symbol())] != expected {
                return Err(Error::InvalidIndex(
                    "\"C\" table does not match BWT".into(),
                ));
            }
            expected += bwt
                .iter()
                .filter(|&&symbol| symbol == base.to_symbol())
                .count();
        }

        OccCheckpoints::from_occ(&occ)?.validate(&bwt)?;

        Ok(Self { bwt, less, occ })
    }

    /// Length of the indexed sequence (without sentinel)
    pub fn len(&self) -> usize {
        self.bwt.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of bases in the indexed sequence that are smaller than `base`
    pub fn total_count(&self, base: Base) -> usize {
        self.less[usize::from(base.to_symbol())] - 1
    }

    /// Number of occurrences of `base` in `BWT[0..=rank]`. Negative ranks yield 0.
    pub fn occurrences(&self, base: Base, rank: isize) -> usize {
        usize::try_from(rank).map_or(0, |rank| {
            self.occ.get(&self.bwt, rank, base.to_symbol())
        })
    }

    /// Interval of the empty pattern. It spans the whole index.
    pub fn init_interval(&self) -> BwtInterval {
        BwtInterval {
            lo: 0,
            hi: self.len(),
        }
    }

    /// Backward extension of `interval` with `base`. Returns `None` if no suffix starts with
    /// `base` followed by the pattern `interval` represents.
    pub fn backward_ext(&self, interval: &BwtInterval, base: Base) -> Option<BwtInterval> {
        let total_count = self.total_count(base);
        let lo = total_count + self.occurrences(base, interval.lo as isize - 1) + 1;
        let hi = total_count + self.occurrences(base, interval.hi as isize);
        (lo <= hi).then_some(BwtInterval { lo, hi })
    }

    /// Exact backward search. The pattern is consumed from its last to its first symbol.
    pub fn backward_search<'a, T>(&self, pattern: T) -> Option<BwtInterval>
    where
        T: IntoIterator<Item = &'a u8>,
        T::IntoIter: DoubleEndedIterator,
    {
        pattern
            .into_iter()
            .rev()
            .try_fold(self.init_interval(), |interval, &symbol| {
                self.backward_ext(&interval, Base::from_symbol(symbol)?)
            })
    }
}

/// Serialized layout of `bio`'s `Occ`, whose fields are private. Rank queries index the
/// checkpoints without bounds checks of their own, so a table that does not belong to the BWT
/// has to be rejected before the first query.
#[derive(Deserialize)]
struct OccCheckpoints {
    occ: Vec<Vec<usize>>,
    k: u32,
}

impl OccCheckpoints {
    fn from_occ(occ: &Occ) -> Result<Self> {
        Ok(bincode::deserialize(&bincode::serialize(occ)?)?)
    }

    /// Recomputes every checkpoint from `bwt` and compares
    fn validate(&self, bwt: &BWTSlice) -> Result<()> {
        let k = self.k as usize;
        if k == 0 {
            return Err(Error::InvalidIndex(
                "\"Occ\" table has a sampling rate of 0".into(),
            ));
        }

        let num_checkpoints = (bwt.len() - 1) / k + 1;
        let mut rows = Vec::with_capacity(Base::ALL.len());
        for base in Base::ALL {
            let row = self
                .occ
                .get(usize::from(base.to_symbol()))
                .map_or(&[][..], Vec::as_slice);
            if row.len() != num_checkpoints {
                return Err(Error::InvalidIndex(format!(
                    "\"Occ\" table has {} checkpoints for {}, expected {num_checkpoints}",
                    row.len(),
                    char::from(base.to_symbol()),
                )));
            }
            rows.push(row);
        }

        let mut counts = [0_usize; 4];
        for (i, &symbol) in bwt.iter().enumerate() {
            if let Some(base) = Base::from_symbol(symbol) {
                counts[usize::from(base.code())] += 1;
            }
            if i % k == 0 {
                let checkpoint = i / k;
                if rows
                    .iter()
                    .zip(counts)
                    .any(|(row, count)| row[checkpoint] != count)
                {
                    return Err(Error::InvalidIndex(
                        "\"Occ\" table does not match BWT".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Inclusive interval of index ranks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BwtInterval {
    pub lo: usize,
    pub hi: usize,
}

impl BwtInterval {
    pub fn width(&self) -> usize {
        self.hi - self.lo + 1
    }
}
