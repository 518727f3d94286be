
use crate::assignment_stats::{ConcordanceCounters, TimingAccumulators};
use crate::data_types::aligned_read::{AlignedRead, PairingStatus};
use crate::data_types::likelihoods::HaplotypeLikelihoodPair;
use crate::data_types::phased_snp::{Haplotype, PhasedSnpSite};
use crate::data_types::region::Region;
use crate::phase_source::{PhaseSource, PhaseSourceError, VcfPhaseSource};
use crate::read_loading::GroupedReads;
use crate::snp_scorer::{SnpEvidence, score_against_snps};
use crate::tag_resolver::resolve_tag_haplotype;

use log::{debug, info, trace, warn};
use std::path::Path;
use std::time::Instant;

/// Settings that control how evidence is gathered for each read
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentConfig {
    /// If true, platform HP tags are resolved for every read (linked-read mode)
    pub use_explicit_haplotype_tags: bool,
    /// Minimum base quality for a read base to count at a phased SNP
    pub min_base_quality: u8,
    /// Phased SNPs are fetched from the region extended by this many bases on each side
    pub snp_search_padding: u64
}

impl Default for AssignmentConfig {
    fn default() -> Self {
        AssignmentConfig {
            use_explicit_haplotype_tags: false,
            min_base_quality: 10,
            snp_search_padding: 1000
        }
    }
}

/// The haplotype assignment for one read
#[derive(Clone, Debug, PartialEq)]
pub struct ReadLikelihood {
    /// the read name
    pub read_name: String,
    /// the read group of the read
    pub read_group: String,
    /// the pairing status of the read
    pub pairing: PairingStatus,
    /// the haplotype from the HP tag, if resolved; shared by both reads of a pair
    pub tag_haplotype: Option<Haplotype>,
    /// the haplotype preferred by SNP overlap, if any
    pub snp_haplotype: Option<Haplotype>,
    /// the number of phased SNPs that contributed evidence, summed over read and mate
    pub snp_sites: usize,
    /// the emitted log-likelihood pair
    pub likelihoods: HaplotypeLikelihoodPair
}

/// Everything the genotyping step needs for one region
#[derive(Clone, Debug, PartialEq)]
pub struct RegionLikelihoods<'a> {
    /// The processed region
    pub region: Region,
    /// The reference allele, passed through unchanged
    pub reference_allele: &'a str,
    /// The reference sequence context, passed through unchanged
    pub reference_sequence: &'a [u8],
    /// One entry per read, in group then paired/mate/unpaired order
    pub reads: Vec<ReadLikelihood>,
    /// Tag/SNP concordance for this region only
    pub concordance: ConcordanceCounters
}

/// Merges tag and SNP evidence for a single fragment (a read, or a read and its mate).
/// Returns the emitted pair and, if both sources had a preference, whether they agreed.
/// * SNPs prefer a haplotype - the SNP-derived pair is emitted
/// * otherwise a tag - the tagged haplotype gets `FROM_HAP_LL`, the other `OTHER_HAP_LL`
/// * otherwise tied SNP sites - the tied SNP-derived pair is emitted
/// * neither - a neutral pair
/// # Arguments
/// * `tag_haplotype` - the resolved tag, if any
/// * `snp_evidence` - the SNP overlap result for the fragment
pub fn combine_evidence(tag_haplotype: Option<Haplotype>, snp_evidence: &SnpEvidence) -> (HaplotypeLikelihoodPair, Option<bool>) {
    match (tag_haplotype, snp_evidence.preferred_haplotype()) {
        (Some(tag), Some(snp)) => (snp_evidence.likelihoods(), Some(tag == snp)),
        (None, Some(_)) => (snp_evidence.likelihoods(), None),
        (Some(tag), None) => (HaplotypeLikelihoodPair::from_haplotype(tag), None),
        (None, None) => {
            if snp_evidence.has_evidence() {
                (snp_evidence.likelihoods(), None)
            } else {
                (HaplotypeLikelihoodPair::neutral(), None)
            }
        }
    }
}

/// Resolves one tag for a fragment; the mate fills in a missing tag, conflicting tags resolve to None.
/// Returns the fragment tag and the number of reads that carried a usable tag.
/// # Arguments
/// * `read` - the first read of the fragment
/// * `opt_mate` - its mate, if fetched
fn resolve_fragment_tag(read: &AlignedRead, opt_mate: Option<&AlignedRead>) -> (Option<Haplotype>, usize) {
    let read_tag = resolve_tag_haplotype(read);
    let mate_tag = opt_mate.and_then(resolve_tag_haplotype);
    let num_tagged = read_tag.is_some() as usize + mate_tag.is_some() as usize;
    let fragment_tag = match (read_tag, mate_tag) {
        (Some(r), Some(m)) if r != m => {
            debug!("{}: read and mate carry different haplotype tags ({:?}, {:?}), ignoring both", read.read_name(), r, m);
            None
        },
        (Some(r), _) => Some(r),
        (None, m) => m
    };
    (fragment_tag, num_tagged)
}

/// The assignment shared by every read of a fragment
struct FragmentCall {
    tag_haplotype: Option<Haplotype>,
    evidence: SnpEvidence,
    likelihoods: HaplotypeLikelihoodPair
}

/// Assigns reads to haplotypes region by region, tracking tag/SNP concordance and SNP evidence timing over the whole run.
pub struct HaplotypeAssigner {
    /// The evidence settings
    config: AssignmentConfig,
    /// Phased SNP provider, None if SNP scoring is disabled
    phase_source: Option<Box<dyn PhaseSource>>,
    /// Run-wide concordance
    concordance: ConcordanceCounters,
    /// Run-wide SNP evidence timing
    timing: TimingAccumulators,
    /// Number of regions processed so far
    regions_processed: u64,
    /// Number of reads scored so far
    reads_scored: u64
}

impl HaplotypeAssigner {
    /// Creates a new assigner
    /// # Arguments
    /// * `config` - the evidence settings
    /// * `phase_source` - optional phased SNP provider; without one, only tags are used
    pub fn new(config: AssignmentConfig, phase_source: Option<Box<dyn PhaseSource>>) -> HaplotypeAssigner {
        HaplotypeAssigner {
            config,
            phase_source,
            concordance: ConcordanceCounters::new(),
            timing: TimingAccumulators::new(),
            regions_processed: 0,
            reads_scored: 0
        }
    }

    /// Creates an assigner that scores reads against a phased SNP VCF.
    /// # Arguments
    /// * `config` - the evidence settings
    /// * `snp_vcf` - the phased SNP VCF, must be indexed
    /// * `sample_name` - the sample to use, or None for the first sample
    /// # Errors
    /// * if the VCF cannot be opened or the sample is missing; this must stop the run before any region is processed
    pub fn with_phased_vcf(config: AssignmentConfig, snp_vcf: &Path, sample_name: Option<&str>) -> Result<HaplotypeAssigner, PhaseSourceError> {
        let vcf_source = VcfPhaseSource::open(snp_vcf, sample_name)?;
        info!("Using phased SNPs for sample {:?} from {:?}", vcf_source.sample_name(), snp_vcf);
        Ok(HaplotypeAssigner::new(config, Some(Box::new(vcf_source))))
    }

    pub fn config(&self) -> &AssignmentConfig {
        &self.config
    }

    pub fn has_phase_source(&self) -> bool {
        self.phase_source.is_some()
    }

    pub fn concordance(&self) -> ConcordanceCounters {
        self.concordance
    }

    pub fn timing(&self) -> TimingAccumulators {
        self.timing
    }

    /// Seconds spent on SNP evidence over all loci
    pub fn total_snp_phase_info_time(&self) -> f64 {
        self.timing.total_snp_phase_info_time()
    }

    /// Seconds spent on SNP evidence for the last locus, -1.0 before any locus
    pub fn locus_snp_phase_info_time(&self) -> f64 {
        self.timing.locus_snp_phase_info_time()
    }

    pub fn regions_processed(&self) -> u64 {
        self.regions_processed
    }

    pub fn reads_scored(&self) -> u64 {
        self.reads_scored
    }

    /// Loads the phased sites near a region. Fetch failures are logged and treated as a region without SNPs.
    fn fetch_region_sites(&mut self, region: &Region) -> Vec<PhasedSnpSite> {
        let search_region = region.padded(self.config.snp_search_padding);
        match self.phase_source.as_mut() {
            Some(phase_source) => match phase_source.fetch_phased_sites(&search_region) {
                Ok(sites) => sites,
                Err(e) => {
                    warn!("Failed to load phased SNPs for {}, continuing without SNP evidence: {}", region, e);
                    vec![]
                }
            },
            None => vec![]
        }
    }

    /// Computes a haplotype likelihood pair for every read in a region.
    /// Phased SNPs are fetched once for the region. A read and its mate are one fragment: their SNP evidence is summed,
    /// their tags are resolved together, and both reads receive the fragment's pair.
    /// The run-wide concordance counters (one entry per fragment) and SNP timing are updated before returning.
    /// # Arguments
    /// * `reads` - the region's reads, grouped by read group and pairing status
    /// * `region` - the region being processed
    /// * `reference_allele` - the reference allele for the region, passed through
    /// * `reference_sequence` - the reference context for the region, passed through
    pub fn process_reads<'a>(
        &mut self, reads: &GroupedReads, region: &Region,
        reference_allele: &'a str, reference_sequence: &'a [u8]
    ) -> RegionLikelihoods<'a> {
        // SNP evidence first, this is the only part that is timed
        let snp_start = Instant::now();
        let phased_sites: Vec<PhasedSnpSite> = self.fetch_region_sites(region);
        let min_base_quality: u8 = self.config.min_base_quality;
        let group_evidence: Vec<Vec<SnpEvidence>> = reads.groups().iter()
            .map(|group| {
                group.fragments()
                    .map(|(read, opt_mate)| {
                        let mut evidence = score_against_snps(read, &phased_sites, min_base_quality);
                        if let Some(mate) = opt_mate {
                            evidence += score_against_snps(mate, &phased_sites, min_base_quality);
                        }
                        evidence
                    })
                    .collect()
            })
            .collect();
        self.timing.record_locus(snp_start.elapsed());
        debug!("{}: {} phased sites, {:.6} seconds of SNP evidence", region, phased_sites.len(), self.timing.locus_snp_phase_info_time());

        let mut region_concordance = ConcordanceCounters::new();
        let mut read_likelihoods: Vec<ReadLikelihood> = Vec::with_capacity(reads.num_reads());
        let mut num_tagged: usize = 0;
        for (group, fragment_evidence) in reads.groups().iter().zip(group_evidence.into_iter()) {
            let mut fragment_calls: Vec<FragmentCall> = Vec::with_capacity(fragment_evidence.len());
            for ((read, opt_mate), evidence) in group.fragments().zip(fragment_evidence.into_iter()) {
                let tag_haplotype: Option<Haplotype> = if self.config.use_explicit_haplotype_tags {
                    let (fragment_tag, fragment_tagged) = resolve_fragment_tag(read, opt_mate);
                    num_tagged += fragment_tagged;
                    fragment_tag
                } else {
                    None
                };

                let (likelihoods, concordance) = combine_evidence(tag_haplotype, &evidence);
                if let Some(is_match) = concordance {
                    region_concordance.record(is_match);
                    if !is_match {
                        trace!("{}: tag says {:?}, SNPs say {:?}", read.read_name(), tag_haplotype, evidence.preferred_haplotype());
                    }
                } else if evidence.has_evidence() && evidence.preferred_haplotype().is_none() {
                    trace!("{}: SNP sites are tied ({} vs {}), tag {:?}", read.read_name(), evidence.hap1_sites(), evidence.hap2_sites(), tag_haplotype);
                }

                fragment_calls.push(FragmentCall {
                    tag_haplotype,
                    evidence,
                    likelihoods
                });
            }

            // fragments list pairs first, so mates share the index of their first read
            let num_pairs: usize = group.paired().len();
            let call_indices = (0..num_pairs)
                .chain(0..num_pairs)
                .chain(num_pairs..fragment_calls.len());
            for (read, call_index) in group.iter().zip(call_indices) {
                let fragment_call = &fragment_calls[call_index];
                read_likelihoods.push(ReadLikelihood {
                    read_name: read.read_name().to_string(),
                    read_group: read.read_group().to_string(),
                    pairing: read.pairing(),
                    tag_haplotype: fragment_call.tag_haplotype,
                    snp_haplotype: fragment_call.evidence.preferred_haplotype(),
                    snp_sites: fragment_call.evidence.informative_sites(),
                    likelihoods: fragment_call.likelihoods
                });
            }
        }

        // linked-read data is expected to carry the tag on nearly every read
        if self.config.use_explicit_haplotype_tags && !read_likelihoods.is_empty() {
            let tagged_fraction = num_tagged as f64 / read_likelihoods.len() as f64;
            debug!("{}: {} / {} reads carry a usable HP tag", region, num_tagged, read_likelihoods.len());
            if tagged_fraction < 0.5 {
                warn!("{}: only {:.1}% of reads carry a usable HP tag, are these linked reads?", region, 100.0 * tagged_fraction);
            }
        }

        self.concordance += region_concordance;
        self.regions_processed += 1;
        self.reads_scored += read_likelihoods.len() as u64;

        RegionLikelihoods {
            region: region.clone(),
            reference_allele,
            reference_sequence,
            reads: read_likelihoods,
            concordance: region_concordance
        }
    }

    /// Reports the run-wide concordance and returns it
    pub fn finish(&self) -> ConcordanceCounters {
        info!("SNP matching statistics: {}\t{}", self.concordance.match_count(), self.concordance.mismatch_count());
        self.concordance
    }
}
