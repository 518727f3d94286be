
/// One of the two parental haplotypes, numbered the way HP tags number them
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, strum_macros::FromRepr)]
pub enum Haplotype {
    Hap1=1,
    Hap2=2
}

impl Haplotype {
    /// The 1-based haplotype number, same encoding as the HP tag
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Returns the opposite haplotype
    pub fn other(&self) -> Haplotype {
        match self {
            Haplotype::Hap1 => Haplotype::Hap2,
            Haplotype::Hap2 => Haplotype::Hap1
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PhasedSnpError {
    #[error("{label} allele must be a single base, found {allele:?}")]
    AlleleLen1 { label: &'static str, allele: String },
    #[error("haplotype alleles must differ at a heterozygous site, both are {allele:?}")]
    Homozygous { allele: char },
    #[error("position must be >= 0, found {position}")]
    NegativePosition { position: i64 }
}

/// A heterozygous SNV whose alleles have already been assigned to the two haplotypes of a sample.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhasedSnpSite {
    /// The 0-based reference coordinate of the SNV
    position: i64,
    /// The reference base
    ref_allele: u8,
    /// The base carried on haplotype 1
    hap1_allele: u8,
    /// The base carried on haplotype 2
    hap2_allele: u8
}

impl PhasedSnpSite {
    /// Creates a new phased SNV site. Bases are stored upper-cased.
    /// # Arguments
    /// * `position` - the 0-based coordinate of the SNV
    /// * `ref_allele` - the REF allele from the VCF, must be length 1
    /// * `hap1_allele` - the allele on haplotype 1 (first GT entry), must be length 1
    /// * `hap2_allele` - the allele on haplotype 2 (second GT entry), must be length 1
    /// # Errors
    /// * if any allele is not exactly 1 bp long
    /// * if the two haplotype alleles are identical
    /// * if the position is negative
    pub fn new(position: i64, ref_allele: &[u8], hap1_allele: &[u8], hap2_allele: &[u8]) -> Result<PhasedSnpSite, PhasedSnpError> {
        if position < 0 {
            return Err(PhasedSnpError::NegativePosition { position });
        }
        for (label, allele) in [("REF", ref_allele), ("haplotype 1", hap1_allele), ("haplotype 2", hap2_allele)] {
            if allele.len() != 1 {
                return Err(PhasedSnpError::AlleleLen1 {
                    label,
                    allele: String::from_utf8_lossy(allele).to_string()
                });
            }
        }

        let hap1_allele = hap1_allele[0].to_ascii_uppercase();
        let hap2_allele = hap2_allele[0].to_ascii_uppercase();
        if hap1_allele == hap2_allele {
            return Err(PhasedSnpError::Homozygous { allele: hap1_allele as char });
        }

        Ok(PhasedSnpSite {
            position,
            ref_allele: ref_allele[0].to_ascii_uppercase(),
            hap1_allele,
            hap2_allele
        })
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn ref_allele(&self) -> u8 {
        self.ref_allele
    }

    pub fn hap1_allele(&self) -> u8 {
        self.hap1_allele
    }

    pub fn hap2_allele(&self) -> u8 {
        self.hap2_allele
    }

    /// Returns the allele carried by the given haplotype
    pub fn allele(&self, haplotype: Haplotype) -> u8 {
        match haplotype {
            Haplotype::Hap1 => self.hap1_allele,
            Haplotype::Hap2 => self.hap2_allele
        }
    }

    /// Returns the haplotype carrying an observed base, or None if it matches neither (sequencing error or third allele).
    /// Comparison ignores case.
    /// # Arguments
    /// * `base` - the observed read base
    pub fn haplotype_of(&self, base: u8) -> Option<Haplotype> {
        let base = base.to_ascii_uppercase();
        if base == self.hap1_allele {
            Some(Haplotype::Hap1)
        } else if base == self.hap2_allele {
            Some(Haplotype::Hap2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haplotype_repr() {
        assert_eq!(Haplotype::from_repr(1), Some(Haplotype::Hap1));
        assert_eq!(Haplotype::from_repr(2), Some(Haplotype::Hap2));
        assert_eq!(Haplotype::from_repr(0), None);
        assert_eq!(Haplotype::from_repr(3), None);
        assert_eq!(Haplotype::Hap2.number(), 2);
        assert_eq!(Haplotype::Hap1.other(), Haplotype::Hap2);
        assert_eq!(Haplotype::Hap2.other(), Haplotype::Hap1);
    }

    #[test]
    fn test_basic_site() {
        // 1|0 genotype puts ALT on haplotype 1
        let site = PhasedSnpSite::new(100, b"a", b"G", b"A").unwrap();
        assert_eq!(site.position(), 100);
        assert_eq!(site.ref_allele(), b'A');
        assert_eq!(site.allele(Haplotype::Hap1), b'G');
        assert_eq!(site.allele(Haplotype::Hap2), b'A');

        assert_eq!(site.haplotype_of(b'G'), Some(Haplotype::Hap1));
        assert_eq!(site.haplotype_of(b'g'), Some(Haplotype::Hap1));
        assert_eq!(site.haplotype_of(b'A'), Some(Haplotype::Hap2));
        assert_eq!(site.haplotype_of(b'T'), None);
        assert_eq!(site.haplotype_of(b'N'), None);
    }

    #[test]
    fn test_invalid_sites() {
        assert_eq!(
            PhasedSnpSite::new(5, b"AC", b"A", b"G"),
            Err(PhasedSnpError::AlleleLen1 { label: "REF", allele: "AC".to_string() })
        );
        assert_eq!(
            PhasedSnpSite::new(5, b"A", b"", b"G"),
            Err(PhasedSnpError::AlleleLen1 { label: "haplotype 1", allele: "".to_string() })
        );
        assert_eq!(
            PhasedSnpSite::new(5, b"A", b"G", b"g"),
            Err(PhasedSnpError::Homozygous { allele: 'G' })
        );
        assert_eq!(
            PhasedSnpSite::new(-1, b"A", b"A", b"G"),
            Err(PhasedSnpError::NegativePosition { position: -1 })
        );
    }
}
