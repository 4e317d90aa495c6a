use serde::{Deserialize, Serialize};

/// Nucleotides the index is built over. The declaration order (A, C, G, T) is the enumeration
/// order used everywhere "all bases" are tried, on both strands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Base {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::T];

    /// Maps an ASCII symbol to a base. Ambiguous symbols ("no calls") have no base.
    pub fn from_symbol(symbol: u8) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            b'A' => Some(Base::A),
            b'C' => Some(Base::C),
            b'G' => Some(Base::G),
            b'T' => Some(Base::T),
            _ => None,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    pub fn to_symbol(self) -> u8 {
        b"ACGT"[self as usize]
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn complement(self) -> Self {
        match self {
            Base::A => Base::T,
            Base::C => Base::G,
            Base::G => Base::C,
            Base::T => Base::A,
        }
    }

    /// All four bases, rotated so that `self` comes last
    pub fn rotated_last(self) -> impl Iterator<Item = Base> {
        Self::ALL
            .into_iter()
            .cycle()
            .skip(self as usize + 1)
            .take(Self::ALL.len())
    }
}

/// Complements an ASCII symbol. Everything that is not a base becomes `N`.
pub fn complement(symbol: u8) -> u8 {
    Base::from_symbol(symbol).map_or(b'N', |base| base.complement().to_symbol())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_mapping() {
        for base in Base::ALL {
            assert_eq!(Base::from_symbol(base.to_symbol()), Some(base));
            assert_eq!(Base::from_code(base.code()), Some(base));
        }
        assert_eq!(Base::from_symbol(b'g'), Some(Base::G));
        assert_eq!(Base::from_symbol(b'N'), None);
        assert_eq!(Base::from_symbol(b'$'), None);
        assert_eq!(Base::from_code(4), None);
    }

    #[test]
    fn test_complement() {
        assert_eq!(complement(b'A'), b'T');
        assert_eq!(complement(b'c'), b'G');
        assert_eq!(complement(b'N'), b'N');
        assert_eq!(complement(b'X'), b'N');
        for base in Base::ALL {
            assert_eq!(base.complement().complement(), base);
        }
    }

    #[test]
    fn test_rotation() {
        assert_eq!(
            Base::C.rotated_last().collect::<Vec<_>>(),
            vec![Base::G, Base::T, Base::A, Base::C]
        );
        assert_eq!(
            Base::T.rotated_last().collect::<Vec<_>>(),
            Base::ALL.to_vec()
        );
    }
}
