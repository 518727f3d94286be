
/// Haplotype assignment engine, combines tag and SNP evidence per read
pub mod assigner;
/// Run-wide concordance counters and SNP timing
pub mod assignment_stats;
/// CLI functionality and checks
pub mod cli;
/// Contains multiple wrappers for useful data types
pub mod data_types;
/// Phased SNP providers, VCF-backed or in-memory
pub mod phase_source;
/// Components for loading reads from BAM files and grouping them for a region
pub mod read_loading;
/// Scores reads against the phased SNPs they overlap
pub mod snp_scorer;
/// Converts raw HP tag values into haplotypes
pub mod tag_resolver;
/// Contains the output writers
pub mod writers;
