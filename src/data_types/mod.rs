
/// Contains the AlignedRead type and raw haplotype tags
pub mod aligned_read;
/// Haplotype likelihood pairs and their constants
pub mod likelihoods;
/// Contains the Haplotype and PhasedSnpSite types
pub mod phased_snp;
/// Wrapper for an indexed reference genome
pub mod reference_genome;
/// Genomic regions and region file loading
pub mod region;
