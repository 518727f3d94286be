
use crate::data_types::region::Region;

use bio::io::fasta;
use log::{debug, info, warn};
use simple_error::bail;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Wrapper around an indexed reference FASTA that keeps the most recently used chromosome in memory.
/// Regions are processed in file order, so consecutive regions usually hit the cached chromosome.
pub struct ReferenceGenome {
    /// The filename we loaded
    filename: PathBuf,
    /// Contig names in the order of the .fai index
    contig_keys: Vec<String>,
    /// Handle to the indexed FASTA
    fasta_reader: fasta::IndexedReader<File>,
    /// The cached contig name and its upper-cased sequence
    cached_contig: Option<(String, Vec<u8>)>
}

impl ReferenceGenome {
    /// Opens an indexed reference FASTA file
    /// # Arguments
    /// * `fasta_fn` - the FASTA filename, a `.fai` index must be next to it
    /// # Errors
    /// * if the FASTA or its index cannot be opened
    pub fn from_fasta(fasta_fn: &Path) -> Result<ReferenceGenome, Box<dyn std::error::Error>> {
        info!("Opening reference {:?}...", fasta_fn);
        let fasta_reader = fasta::IndexedReader::from_file(&fasta_fn)?;
        let contig_keys: Vec<String> = fasta_reader.index.sequences().into_iter()
            .map(|s| s.name)
            .collect();
        info!("Found {} contigs in reference index.", contig_keys.len());

        Ok(ReferenceGenome {
            filename: fasta_fn.to_path_buf(),
            contig_keys,
            fasta_reader,
            cached_contig: None
        })
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn contig_keys(&self) -> &[String] {
        &self.contig_keys
    }

    /// Retrieves a full chromosome by name, loading it from disk if it is not the cached one
    /// # Arguments
    /// * `chromosome` - the chromosome to load
    /// # Errors
    /// * if `chromosome` was not in the FASTA index
    /// * if the sequence cannot be read
    pub fn get_full_chromosome(&mut self, chromosome: &str) -> Result<&[u8], Box<dyn std::error::Error>> {
        let is_cached = matches!(self.cached_contig.as_ref(), Some((name, _)) if name == chromosome);
        if !is_cached {
            if !self.contig_keys.iter().any(|k| k == chromosome) {
                bail!("Chromosome {:?} was not found in reference: {:?}", chromosome, self.filename);
            }
            debug!("Loading reference chromosome {:?}...", chromosome);
            let mut sequence: Vec<u8> = vec![];
            self.fasta_reader.fetch_all(chromosome)?;
            self.fasta_reader.read(&mut sequence)?;
            sequence.make_ascii_uppercase();
            self.cached_contig = Some((chromosome.to_string(), sequence));
        }

        match self.cached_contig.as_ref() {
            Some((_, sequence)) => Ok(sequence),
            None => bail!("Reference cache is empty after loading {:?}", chromosome)
        }
    }

    /// Retrieves the reference allele spanned by a region.
    /// If the region goes past the contig end, it is truncated to the contig length.
    /// # Arguments
    /// * `region` - the region to slice
    /// # Errors
    /// * if the chromosome cannot be loaded
    pub fn get_region_allele(&mut self, region: &Region) -> Result<String, Box<dyn std::error::Error>> {
        let full_contig = self.get_full_chromosome(region.chrom())?;
        let contig_len = full_contig.len();
        let start = (region.start() as usize).min(contig_len);
        let end = (region.end() as usize).min(contig_len);
        if end < region.end() as usize {
            warn!("Region {} extends past the contig end ({}), truncating reference allele", region, contig_len);
        }
        Ok(String::from_utf8_lossy(&full_contig[start..end]).to_string())
    }
}
