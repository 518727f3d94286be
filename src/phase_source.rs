
use crate::data_types::phased_snp::PhasedSnpSite;
use crate::data_types::region::Region;

use log::{debug, trace, warn};
use rust_htslib::bcf;
use rust_htslib::bcf::record::GenotypeAllele;
use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum PhaseSourceError {
    #[error("failed to open phased SNP file {path:?}: {source}")]
    Open { path: PathBuf, source: rust_htslib::errors::Error },
    #[error("phased SNP file {path:?} does not contain any samples")]
    NoSamples { path: PathBuf },
    #[error("sample {sample:?} was not found in phased SNP file {path:?}")]
    SampleNotFound { sample: String, path: PathBuf }
}

/// Anything that can supply the phased heterozygous SNPs of one sample for a region.
pub trait PhaseSource {
    /// Returns all phased sites with a position inside `region`, ordered by position.
    /// An empty list means no sites overlap (or the contig is unknown to the source).
    /// # Errors
    /// * if the underlying data cannot be read
    fn fetch_phased_sites(&mut self, region: &Region) -> Result<Vec<PhasedSnpSite>, Box<dyn std::error::Error>>;
}

/// Converts a single sample genotype into a phased SNV site.
/// Returns None unless the genotype is diploid, phased, heterozygous, non-missing, and every involved allele is a single base.
/// Haplotype 1 receives the first genotype allele and haplotype 2 the second.
/// # Arguments
/// * `position` - the 0-based position of the record
/// * `alleles` - the record alleles, REF first
/// * `genotype` - the genotype entries for the sample
pub fn phased_site_from_genotype(position: i64, alleles: &[&[u8]], genotype: &[GenotypeAllele]) -> Option<PhasedSnpSite> {
    if genotype.len() != 2 {
        trace!("{position}: skipping non-diploid genotype {genotype:?}");
        return None;
    }

    // htslib stores the phase flag on the second allele
    if !matches!(genotype[1], GenotypeAllele::Phased(_)) {
        trace!("{position}: skipping unphased genotype {genotype:?}");
        return None;
    }

    let index_hap1 = genotype[0].index()? as usize;
    let index_hap2 = genotype[1].index()? as usize;
    if index_hap1 == index_hap2 || index_hap1 >= alleles.len() || index_hap2 >= alleles.len() {
        trace!("{position}: skipping homozygous or out-of-range genotype {genotype:?}");
        return None;
    }

    match PhasedSnpSite::new(position, alleles[0], alleles[index_hap1], alleles[index_hap2]) {
        Ok(site) => Some(site),
        Err(e) => {
            trace!("{position}: skipping non-SNV record: {e}");
            None
        }
    }
}

/// Phased SNP source backed by an indexed VCF/BCF file.
pub struct VcfPhaseSource {
    /// The file we opened, for messages
    filename: PathBuf,
    /// The indexed reader
    vcf_reader: bcf::IndexedReader,
    /// The sample we extract genotypes for
    sample_name: String,
    /// The index of that sample in the file
    sample_index: usize
}

impl VcfPhaseSource {
    /// Opens an indexed VCF/BCF file with phased genotypes.
    /// # Arguments
    /// * `filename` - the VCF path, must be bgzipped and indexed
    /// * `sample_name` - the sample to use; if None, the first sample in the file is used
    /// # Errors
    /// * if the file or its index cannot be opened
    /// * if the file has no samples
    /// * if the requested sample is not present
    pub fn open(filename: &Path, sample_name: Option<&str>) -> Result<VcfPhaseSource, PhaseSourceError> {
        use rust_htslib::bcf::Read;
        let vcf_reader: bcf::IndexedReader = bcf::IndexedReader::from_path(filename)
            .map_err(|e| PhaseSourceError::Open { path: filename.to_path_buf(), source: e })?;

        let sample_names: Vec<String> = vcf_reader.header().samples().iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect();
        if sample_names.is_empty() {
            return Err(PhaseSourceError::NoSamples { path: filename.to_path_buf() });
        }

        let sample_index: usize = match sample_name {
            Some(name) => {
                sample_names.iter().position(|s| s == name)
                    .ok_or_else(|| PhaseSourceError::SampleNotFound { sample: name.to_string(), path: filename.to_path_buf() })?
            },
            None => {
                if sample_names.len() > 1 {
                    warn!("Multi-sample phased SNP file detected, but sample name was not provided.  Assuming name is {:?}.", sample_names[0]);
                }
                0
            }
        };
        debug!("Using sample {:?} (index {}) from {:?}", sample_names[sample_index], sample_index, filename);

        Ok(VcfPhaseSource {
            filename: filename.to_path_buf(),
            vcf_reader,
            sample_name: sample_names[sample_index].clone(),
            sample_index
        })
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }
}

impl PhaseSource for VcfPhaseSource {
    fn fetch_phased_sites(&mut self, region: &Region) -> Result<Vec<PhasedSnpSite>, Box<dyn std::error::Error>> {
        use rust_htslib::bcf::Read;

        let chrom_index: u32 = match self.vcf_reader.header().name2rid(region.chrom().as_bytes()) {
            Ok(rid) => rid,
            Err(_) => {
                debug!("Contig {:?} is not in {:?}, no phased sites for {}", region.chrom(), self.filename, region);
                return Ok(vec![]);
            }
        };

        // htslib end coordinate is inclusive
        if self.vcf_reader.fetch(chrom_index, region.start(), Some(region.end() - 1)).is_err() {
            // this usually happens when there are no entries for the chromosome
            return Ok(vec![]);
        }

        let mut sites: Vec<PhasedSnpSite> = vec![];
        for record_result in self.vcf_reader.records() {
            let record = record_result?;
            let position: i64 = record.pos();
            if position < region.start() as i64 || position >= region.end() as i64 {
                continue;
            }

            let all_genotypes = record.genotypes()?;
            let genotype = all_genotypes.get(self.sample_index);
            let alleles: Vec<&[u8]> = record.alleles();
            if let Some(site) = phased_site_from_genotype(position, &alleles, &genotype) {
                sites.push(site);
            }
        }

        // VCFs are sorted, but nothing downstream should rely on that
        sites.sort_by_key(|s| s.position());
        trace!("Fetched {} phased sites for {}", sites.len(), region);
        Ok(sites)
    }
}

/// In-memory phased SNP source, keyed by contig.
#[derive(Clone, Debug, Default)]
pub struct StaticPhaseSource {
    /// Sorted sites for each contig
    contig_sites: HashMap<String, Vec<PhasedSnpSite>>
}

impl StaticPhaseSource {
    pub fn new() -> StaticPhaseSource {
        Default::default()
    }

    /// Adds sites to a contig, keeping the contig sorted by position
    pub fn add_sites(&mut self, chrom: &str, sites: Vec<PhasedSnpSite>) {
        let contig = self.contig_sites.entry(chrom.to_string()).or_default();
        contig.extend(sites);
        contig.sort_by_key(|s| s.position());
    }
}

impl PhaseSource for StaticPhaseSource {
    fn fetch_phased_sites(&mut self, region: &Region) -> Result<Vec<PhasedSnpSite>, Box<dyn std::error::Error>> {
        let sites = match self.contig_sites.get(region.chrom()) {
            Some(contig) => contig.iter()
                .filter(|s| s.position() >= region.start() as i64 && s.position() < region.end() as i64)
                .cloned()
                .collect(),
            None => vec![]
        };
        Ok(sites)
    }
}
