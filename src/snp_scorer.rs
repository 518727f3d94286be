
use crate::data_types::aligned_read::AlignedRead;
use crate::data_types::likelihoods::HaplotypeLikelihoodPair;
use crate::data_types::phased_snp::{Haplotype, PhasedSnpSite};

use log::trace;
use std::ops::AddAssign;

/// The result of comparing one read (or both reads of a fragment) against the phased SNPs it overlaps
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SnpEvidence {
    /// Summed log-likelihoods; neutral if no site was informative
    likelihoods: HaplotypeLikelihoodPair,
    /// The number of sites where the read base matched haplotype 1
    hap1_sites: usize,
    /// The number of sites where the read base matched haplotype 2
    hap2_sites: usize
}

impl SnpEvidence {
    pub fn likelihoods(&self) -> HaplotypeLikelihoodPair {
        self.likelihoods
    }

    pub fn hap1_sites(&self) -> usize {
        self.hap1_sites
    }

    pub fn hap2_sites(&self) -> usize {
        self.hap2_sites
    }

    /// The number of sites that contributed to the score
    pub fn informative_sites(&self) -> usize {
        self.hap1_sites + self.hap2_sites
    }

    /// True if at least one site contributed
    pub fn has_evidence(&self) -> bool {
        self.informative_sites() > 0
    }

    /// The haplotype with the strictly better score, None if there is no evidence or the score is tied
    pub fn preferred_haplotype(&self) -> Option<Haplotype> {
        self.likelihoods.preferred_haplotype()
    }
}

/// Pools the evidence of a read and its mate
impl AddAssign for SnpEvidence {
    fn add_assign(&mut self, rhs: Self) {
        self.likelihoods += rhs.likelihoods;
        self.hap1_sites += rhs.hap1_sites;
        self.hap2_sites += rhs.hap2_sites;
    }
}

/// Scores a read against the phased SNPs in its region.
/// Every site inside the read's aligned span is checked: if the read has an aligned base there with quality >= `min_base_quality`
/// that matches exactly one haplotype allele, that haplotype gains `FROM_HAP_LL` and the other gets `OTHER_HAP_LL`.
/// Gaps, clipped bases, low quality bases, and third alleles contribute nothing.
/// # Arguments
/// * `read` - the read to score
/// * `phased_sites` - the region's phased sites, sorted by position
/// * `min_base_quality` - minimum base quality for a read base to be used
pub fn score_against_snps(read: &AlignedRead, phased_sites: &[PhasedSnpSite], min_base_quality: u8) -> SnpEvidence {
    let span = read.reference_span();
    let mut likelihoods = HaplotypeLikelihoodPair::neutral();
    let mut hap1_sites: usize = 0;
    let mut hap2_sites: usize = 0;

    // jump to the first site at or after the read start
    let first_site = phased_sites.partition_point(|site| site.position() < span.start);
    for site in phased_sites[first_site..].iter().take_while(|site| site.position() < span.end) {
        let (base, qual) = match read.base_at(site.position()) {
            Some(bq) => bq,
            None => {
                trace!("\t{}: {} not aligned", read.read_name(), site.position());
                continue;
            }
        };
        if qual < min_base_quality {
            trace!("\t{}: {} below base quality ({} < {})", read.read_name(), site.position(), qual, min_base_quality);
            continue;
        }

        match site.haplotype_of(base) {
            Some(haplotype) => {
                likelihoods += HaplotypeLikelihoodPair::from_haplotype(haplotype);
                match haplotype {
                    Haplotype::Hap1 => hap1_sites += 1,
                    Haplotype::Hap2 => hap2_sites += 1
                };
            },
            None => {
                trace!("\t{}: {} base {} matches neither allele", read.read_name(), site.position(), base as char);
            }
        };
    }

    SnpEvidence {
        likelihoods,
        hap1_sites,
        hap2_sites
    }
}
