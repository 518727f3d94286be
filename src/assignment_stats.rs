
use std::ops::AddAssign;
use std::time::Duration;

/// Sentinel for the per-locus timing value before any locus has been processed
pub const UNSET_LOCUS_TIME: f64 = -1.0;

/// Running agreement counts between tag-based and SNP-based haplotype calls.
/// A read only counts when both sources produced a preference.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConcordanceCounters {
    /// Reads where the tag and the SNPs picked the same haplotype
    match_count: u64,
    /// Reads where the tag and the SNPs picked different haplotypes
    mismatch_count: u64
}

impl ConcordanceCounters {
    pub fn new() -> ConcordanceCounters {
        Default::default()
    }

    /// Records one read where both sources had a preference
    /// # Arguments
    /// * `is_match` - true if both sources picked the same haplotype
    pub fn record(&mut self, is_match: bool) {
        if is_match {
            self.match_count += 1;
        } else {
            self.mismatch_count += 1;
        }
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    pub fn mismatch_count(&self) -> u64 {
        self.mismatch_count
    }

    /// The number of reads where both sources were determinable
    pub fn total(&self) -> u64 {
        self.match_count + self.mismatch_count
    }
}

/// Merges per-region counts into the run total
impl AddAssign for ConcordanceCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.match_count += rhs.match_count;
        self.mismatch_count += rhs.mismatch_count;
    }
}

/// Wall-clock time spent retrieving and scoring SNP phase evidence, in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingAccumulators {
    /// Sum over all processed loci, only ever increases
    total_snp_phase_info_time: f64,
    /// The most recent locus, `UNSET_LOCUS_TIME` until the first locus finishes
    locus_snp_phase_info_time: f64
}

impl Default for TimingAccumulators {
    fn default() -> Self {
        TimingAccumulators {
            total_snp_phase_info_time: 0.0,
            locus_snp_phase_info_time: UNSET_LOCUS_TIME
        }
    }
}

impl TimingAccumulators {
    pub fn new() -> TimingAccumulators {
        Default::default()
    }

    /// Overwrites the per-locus time and adds it to the total
    /// # Arguments
    /// * `elapsed` - time spent on SNP evidence for the locus that just finished
    pub fn record_locus(&mut self, elapsed: Duration) {
        let seconds = elapsed.as_secs_f64();
        self.locus_snp_phase_info_time = seconds;
        self.total_snp_phase_info_time += seconds;
    }

    pub fn total_snp_phase_info_time(&self) -> f64 {
        self.total_snp_phase_info_time
    }

    pub fn locus_snp_phase_info_time(&self) -> f64 {
        self.locus_snp_phase_info_time
    }
}
