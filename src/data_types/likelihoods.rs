
use crate::data_types::phased_snp::Haplotype;

use std::cmp::Ordering;
use std::ops::AddAssign;

/// Log-likelihood a read comes from a haplotype when the evidence agrees with it
pub const FROM_HAP_LL: f64 = -0.01;
/// Log-likelihood a read comes from a haplotype when the evidence disagrees with it
pub const OTHER_HAP_LL: f64 = -1000.0;
/// Log-likelihood used for both haplotypes when there is no evidence either way
pub const NEUTRAL_LL: f64 = 0.0;

/// Per-read pair of log-likelihoods that the read originated from haplotype 1 and haplotype 2.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HaplotypeLikelihoodPair {
    /// log P(read | haplotype 1)
    log_p1: f64,
    /// log P(read | haplotype 2)
    log_p2: f64
}

impl Default for HaplotypeLikelihoodPair {
    fn default() -> Self {
        HaplotypeLikelihoodPair::neutral()
    }
}

impl HaplotypeLikelihoodPair {
    pub fn new(log_p1: f64, log_p2: f64) -> HaplotypeLikelihoodPair {
        HaplotypeLikelihoodPair {
            log_p1,
            log_p2
        }
    }

    /// A pair with no preference for either haplotype
    pub fn neutral() -> HaplotypeLikelihoodPair {
        HaplotypeLikelihoodPair::new(NEUTRAL_LL, NEUTRAL_LL)
    }

    /// A pair that strongly favors `haplotype`: near-zero for it, the large penalty for the other one
    /// # Arguments
    /// * `haplotype` - the haplotype the evidence points to
    pub fn from_haplotype(haplotype: Haplotype) -> HaplotypeLikelihoodPair {
        match haplotype {
            Haplotype::Hap1 => HaplotypeLikelihoodPair::new(FROM_HAP_LL, OTHER_HAP_LL),
            Haplotype::Hap2 => HaplotypeLikelihoodPair::new(OTHER_HAP_LL, FROM_HAP_LL)
        }
    }

    pub fn log_p1(&self) -> f64 {
        self.log_p1
    }

    pub fn log_p2(&self) -> f64 {
        self.log_p2
    }

    /// Returns the log-likelihood for the given haplotype
    pub fn log_p(&self, haplotype: Haplotype) -> f64 {
        match haplotype {
            Haplotype::Hap1 => self.log_p1,
            Haplotype::Hap2 => self.log_p2
        }
    }

    /// Returns the haplotype with the strictly larger log-likelihood, None on ties
    pub fn preferred_haplotype(&self) -> Option<Haplotype> {
        match self.log_p1.partial_cmp(&self.log_p2) {
            Some(Ordering::Greater) => Some(Haplotype::Hap1),
            Some(Ordering::Less) => Some(Haplotype::Hap2),
            _ => None
        }
    }

    /// True if neither haplotype is preferred
    pub fn is_neutral(&self) -> bool {
        self.preferred_haplotype().is_none()
    }
}

/// Log-space evidence combines additively
impl AddAssign for HaplotypeLikelihoodPair {
    fn add_assign(&mut self, rhs: Self) {
        self.log_p1 += rhs.log_p1;
        self.log_p2 += rhs.log_p2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_haplotype() {
        let p = HaplotypeLikelihoodPair::from_haplotype(Haplotype::Hap1);
        assert_eq!(p.log_p1(), FROM_HAP_LL);
        assert_eq!(p.log_p2(), OTHER_HAP_LL);
        assert_eq!(p.preferred_haplotype(), Some(Haplotype::Hap1));

        let p = HaplotypeLikelihoodPair::from_haplotype(Haplotype::Hap2);
        assert_eq!(p.log_p(Haplotype::Hap1), OTHER_HAP_LL);
        assert_eq!(p.log_p(Haplotype::Hap2), FROM_HAP_LL);
        assert_eq!(p.preferred_haplotype(), Some(Haplotype::Hap2));
    }

    #[test]
    fn test_neutral() {
        let p = HaplotypeLikelihoodPair::default();
        assert_eq!(p, HaplotypeLikelihoodPair::neutral());
        assert!(p.is_neutral());
        assert_eq!(p.preferred_haplotype(), None);
    }

    #[test]
    fn test_add_assign() {
        let mut p = HaplotypeLikelihoodPair::neutral();
        p += HaplotypeLikelihoodPair::from_haplotype(Haplotype::Hap1);
        p += HaplotypeLikelihoodPair::from_haplotype(Haplotype::Hap2);

        // one vote each way is a tie
        assert_eq!(p.log_p1(), p.log_p2());
        assert!(p.is_neutral());
    }
}
