
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::assigner::RegionLikelihoods;

/// Writes one row per scored read, the per-read handoff to any downstream genotyper
pub struct LikelihoodWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>,
    /// Rows written so far
    rows_written: u64
}

/// Contains all the data written to each row of the likelihood table
#[derive(Serialize)]
struct LikelihoodRow<'a> {
    /// the chromosome of the region
    chrom: &'a str,
    /// the 0-based region start
    start: u64,
    /// the 0-based exclusive region end
    end: u64,
    /// the region label, empty if the region file did not have one
    region_name: &'a str,
    /// the read name
    read_name: &'a str,
    /// the read group of the read
    read_group: &'a str,
    /// paired, mate, or unpaired
    pairing: String,
    /// haplotype from the HP tag, empty if unresolved
    tag_haplotype: Option<u8>,
    /// haplotype preferred by the phased SNPs, empty if none
    snp_haplotype: Option<u8>,
    /// the number of informative phased SNPs
    snp_sites: usize,
    /// log-likelihood of haplotype 1
    log_p1: f64,
    /// log-likelihood of haplotype 2
    log_p2: f64
}

impl LikelihoodWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write the table to, ".csv" gives comma-delimited output and anything else is tab-delimited
    pub fn new(filename: &Path) -> csv::Result<LikelihoodWriter> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;
        Ok(LikelihoodWriter {
            csv_writer,
            rows_written: 0
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Writes every read of a processed region.
    /// # Arguments
    /// * `region_likelihoods` - the assignment result for one region
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_region(&mut self, region_likelihoods: &RegionLikelihoods) -> Result<(), Box<dyn std::error::Error>> {
        let region = &region_likelihoods.region;
        for read_likelihood in region_likelihoods.reads.iter() {
            let row: LikelihoodRow = LikelihoodRow {
                chrom: region.chrom(),
                start: region.start(),
                end: region.end(),
                region_name: region.name().unwrap_or_default(),
                read_name: &read_likelihood.read_name,
                read_group: &read_likelihood.read_group,
                pairing: read_likelihood.pairing.to_string(),
                tag_haplotype: read_likelihood.tag_haplotype.map(|h| h.number()),
                snp_haplotype: read_likelihood.snp_haplotype.map(|h| h.number()),
                snp_sites: read_likelihood.snp_sites,
                log_p1: read_likelihood.likelihoods.log_p1(),
                log_p2: read_likelihood.likelihoods.log_p2()
            };
            self.csv_writer.serialize(&row)?;
            self.rows_written += 1;
        }
        self.csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::ReadLikelihood;
    use crate::assignment_stats::ConcordanceCounters;
    use crate::data_types::aligned_read::PairingStatus;
    use crate::data_types::likelihoods::HaplotypeLikelihoodPair;
    use crate::data_types::phased_snp::Haplotype;
    use crate::data_types::region::Region;

    fn test_result() -> RegionLikelihoods<'static> {
        RegionLikelihoods {
            region: Region::new("chr1".to_string(), 100, 110, Some("STR_1".to_string())),
            reference_allele: "ACACACACAC",
            reference_sequence: b"ACACACACAC",
            reads: vec![
                ReadLikelihood {
                    read_name: "read_1".to_string(),
                    read_group: "rg".to_string(),
                    pairing: PairingStatus::Paired,
                    tag_haplotype: Some(Haplotype::Hap1),
                    snp_haplotype: None,
                    snp_sites: 0,
                    likelihoods: HaplotypeLikelihoodPair::from_haplotype(Haplotype::Hap1)
                },
                ReadLikelihood {
                    read_name: "read_2".to_string(),
                    read_group: "rg".to_string(),
                    pairing: PairingStatus::Unpaired,
                    tag_haplotype: None,
                    snp_haplotype: None,
                    snp_sites: 0,
                    likelihoods: HaplotypeLikelihoodPair::neutral()
                }
            ],
            concordance: ConcordanceCounters::new()
        }
    }

    #[test]
    fn test_write_csv() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("likelihoods.csv");
        let mut writer = LikelihoodWriter::new(&filename).unwrap();
        writer.write_region(&test_result()).unwrap();
        assert_eq!(writer.rows_written(), 2);
        std::mem::drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "chrom,start,end,region_name,read_name,read_group,pairing,tag_haplotype,snp_haplotype,snp_sites,log_p1,log_p2");
        assert!(lines[1].starts_with("chr1,100,110,STR_1,read_1,rg,paired,1,,0,"));
        assert!(lines[2].starts_with("chr1,100,110,STR_1,read_2,rg,unpaired,,,0,"));

        // read it back to check the numbers
        let mut reader = csv::Reader::from_path(&filename).unwrap();
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records[0][10].parse::<f64>().unwrap(), -0.01);
        assert_eq!(records[0][11].parse::<f64>().unwrap(), -1000.0);
        assert_eq!(records[1][10].parse::<f64>().unwrap(), 0.0);
    }

    #[test]
    fn test_write_tsv() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("likelihoods.tsv");
        let mut writer = LikelihoodWriter::new(&filename).unwrap();
        writer.write_region(&test_result()).unwrap();
        std::mem::drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        assert!(contents.lines().next().unwrap().starts_with("chrom\tstart\tend\t"));
    }
}
