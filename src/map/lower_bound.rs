use crate::map::{base::Base, fm_index::FmIndex};

/// One entry of the D-array
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LowerBound {
    /// Minimal number of differences needed to align the rest of the read
    pub min_mismatches: u32,
    /// Width of the exact-match interval at this position
    pub width: usize,
}

/// Compute the lower bound of mismatches of a read per position by aligning perfectly,
/// starting from the read end and progressing to the start. As soon as the extension of
/// the alignment is not possible, we found at least one mismatch and record that per
/// read-position in the so-called D-array. The content of the array is used to prune the search
/// tree.
///
/// The array has `pattern.len() + 1` entries. Entry `i` bounds the differences in
/// `pattern[i..]`; the last entry belongs to the empty suffix and is always zero.
#[derive(Debug)]
pub struct LowerBounds(Vec<LowerBound>);

impl LowerBounds {
    /// `fm_index` must be the index of the orientation _opposite_ to the one the pattern is
    /// going to be aligned against, since the pattern is consumed in the opposite direction here.
    pub fn new(pattern: &[u8], fm_index: &FmIndex) -> Self {
        let mut bounds = vec![
            LowerBound {
                min_mismatches: 0,
                width: 0,
            };
            pattern.len() + 1
        ];

        let mut interval = fm_index.init_interval();
        let mut z = 0;
        for (bound, &symbol) in bounds[..pattern.len()].iter_mut().zip(pattern).rev() {
            let extended =
                Base::from_symbol(symbol).and_then(|base| fm_index.backward_ext(&interval, base));
            match extended {
                Some(interval_prime) => interval = interval_prime,
                None => {
                    interval = fm_index.init_interval();
                    z += 1;
                }
            }
            *bound = LowerBound {
                min_mismatches: z,
                width: interval.width(),
            };
        }

        Self(bounds)
    }

    /// Panics if `position > pattern.len()`
    pub fn get(&self, position: usize) -> LowerBound {
        self.0[position]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::build_auxiliary_structures;

    fn min_mismatches(lower_bounds: &LowerBounds) -> Vec<u32> {
        (0..lower_bounds.len())
            .map(|i| lower_bounds.get(i).min_mismatches)
            .collect()
    }

    #[test]
    fn test_d() {
        let (fm_index, _) = build_auxiliary_structures(b"GATTACA");

        // Occurs exactly
        let lower_bounds = LowerBounds::new(b"TTAC", &fm_index);
        assert_eq!(min_mismatches(&lower_bounds), vec![0, 0, 0, 0, 0]);
        assert_eq!(lower_bounds.get(3).width, 1);
        assert_eq!(lower_bounds.get(4).width, 0);
        // "AC" occurs once, "C" occurs once
        assert_eq!(lower_bounds.get(2).width, 1);

        // "CC" does not occur
        let lower_bounds = LowerBounds::new(b"CCCC", &fm_index);
        assert_eq!(min_mismatches(&lower_bounds), vec![2, 1, 1, 0, 0]);
        // After a reset, the interval covers the whole index
        assert_eq!(lower_bounds.get(2).width, fm_index.len() + 1);
    }

    #[test]
    fn test_ambiguous_symbols() {
        let (fm_index, _) = build_auxiliary_structures(b"GATTACA");
        let lower_bounds = LowerBounds::new(b"GANTA", &fm_index);
        assert_eq!(min_mismatches(&lower_bounds), vec![1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_monotonic() {
        let (fm_index, _) = build_auxiliary_structures(b"ACGTTGCAAGGCTAGCTAGGATCCA");
        let lower_bounds = LowerBounds::new(b"TTTTGGGGCCCCAAAATTTT", &fm_index);
        let values = min_mismatches(&lower_bounds);
        assert!(values.windows(2).all(|pair| pair[0] >= pair[1]));
        assert_eq!(values.last(), Some(&0));
    }
}
