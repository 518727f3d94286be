
use log::info;
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::assigner::HaplotypeAssigner;

/// The single row of the end-of-run summary file
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSummary {
    /// the number of regions that went through the assigner
    pub regions_processed: u64,
    /// the number of reads that received a likelihood pair
    pub reads_scored: u64,
    /// fragments where the tag and the SNPs agreed
    pub match_count: u64,
    /// fragments where the tag and the SNPs disagreed
    pub mismatch_count: u64,
    /// seconds spent on SNP evidence over all regions
    pub total_snp_phase_info_time: f64
}

impl RunSummary {
    /// Collects the run-wide values from an assigner
    pub fn from_assigner(assigner: &HaplotypeAssigner) -> RunSummary {
        let concordance = assigner.concordance();
        RunSummary {
            regions_processed: assigner.regions_processed(),
            reads_scored: assigner.reads_scored(),
            match_count: concordance.match_count(),
            mismatch_count: concordance.mismatch_count(),
            total_snp_phase_info_time: assigner.total_snp_phase_info_time()
        }
    }
}

/// Saves the run summary to a csv/tsv file
/// # Arguments
/// * `filename` - the output path, ".csv" gives comma-delimited output and anything else is tab-delimited
/// * `summary` - the values to write
/// # Errors
/// * if the file cannot be created or written
pub fn write_summary(filename: &Path, summary: &RunSummary) -> csv::Result<()> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;
    csv_writer.serialize(summary)?;
    csv_writer.flush()?;
    info!("Summary: {} regions, {} reads, {} tag/SNP matches, {} mismatches", summary.regions_processed, summary.reads_scored, summary.match_count, summary.mismatch_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::AssignmentConfig;

    #[test]
    fn test_write_summary() {
        let out_dir = tempfile::tempdir().unwrap();
        let filename = out_dir.path().join("summary.tsv");
        let summary = RunSummary {
            regions_processed: 12,
            reads_scored: 340,
            match_count: 98,
            mismatch_count: 2,
            total_snp_phase_info_time: 0.5
        };
        write_summary(&filename, &summary).unwrap();

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "regions_processed\treads_scored\tmatch_count\tmismatch_count\ttotal_snp_phase_info_time",
            "12\t340\t98\t2\t0.5"
        ]);
    }

    #[test]
    fn test_from_fresh_assigner() {
        let assigner = HaplotypeAssigner::new(AssignmentConfig::default(), None);
        let summary = RunSummary::from_assigner(&assigner);
        assert_eq!(summary, RunSummary {
            regions_processed: 0,
            reads_scored: 0,
            match_count: 0,
            mismatch_count: 0,
            total_snp_phase_info_time: 0.0
        });
    }
}
