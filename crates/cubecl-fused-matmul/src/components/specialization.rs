use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Which problem dimensions are padded up to a multiple of the block tile.
///
/// Without padding on a dimension, the raw extent must already be a multiple of the block tile
/// along it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GemmSpecialization {
    #[default]
    Default,
    MPadding,
    NPadding,
    KPadding,
    MNPadding,
    MKPadding,
    NKPadding,
    MNKPadding,
}

impl GemmSpecialization {
    pub fn pad_m(&self) -> bool {
        matches!(
            self,
            Self::MPadding | Self::MNPadding | Self::MKPadding | Self::MNKPadding
        )
    }

    pub fn pad_n(&self) -> bool {
        matches!(
            self,
            Self::NPadding | Self::MNPadding | Self::NKPadding | Self::MNKPadding
        )
    }

    pub fn pad_k(&self) -> bool {
        matches!(
            self,
            Self::KPadding | Self::MKPadding | Self::NKPadding | Self::MNKPadding
        )
    }
}

impl Display for GemmSpecialization {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Default => "Default",
            Self::MPadding => "MPadding",
            Self::NPadding => "NPadding",
            Self::KPadding => "KPadding",
            Self::MNPadding => "MNPadding",
            Self::MKPadding => "MKPadding",
            Self::NKPadding => "NKPadding",
            Self::MNKPadding => "MNKPadding",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn padded_dimensions() {
        assert!(!GemmSpecialization::Default.pad_m());
        assert!(!GemmSpecialization::Default.pad_k());
        assert!(GemmSpecialization::MKPadding.pad_m());
        assert!(!GemmSpecialization::MKPadding.pad_n());
        assert!(GemmSpecialization::MKPadding.pad_k());
        assert!(GemmSpecialization::MNKPadding.pad_n());
    }
}
