
use hapassign::assigner::{HaplotypeAssigner, RegionLikelihoods};
use hapassign::cli::{Settings, check_settings, get_raw_settings};
use hapassign::data_types::reference_genome::ReferenceGenome;
use hapassign::data_types::region::{Region, load_regions};
use hapassign::read_loading::{GroupedReads, load_region_reads};
use hapassign::writers::likelihood_writer::LikelihoodWriter;
use hapassign::writers::summary_writer::{RunSummary, write_summary};

use log::{LevelFilter, debug, error, info, warn};
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);

    // the SNP source must open before we touch any region
    let mut assigner: HaplotypeAssigner = match cli_settings.snp_vcf_filename {
        Some(ref snp_vcf) => {
            match HaplotypeAssigner::with_phased_vcf(cli_settings.assignment_config(), snp_vcf, cli_settings.sample_name.as_deref()) {
                Ok(a) => a,
                Err(e) => {
                    error!("Error while opening phased SNP file: {}", e);
                    std::process::exit(exitcode::NOINPUT);
                }
            }
        },
        None => HaplotypeAssigner::new(cli_settings.assignment_config(), None)
    };

    let regions: Vec<Region> = match load_regions(&cli_settings.regions_filename) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while loading regions: {}", e);
            std::process::exit(exitcode::DATAERR);
        }
    };
    if regions.is_empty() {
        warn!("No regions found in {:?}, output will be empty", cli_settings.regions_filename);
    }

    let mut reference_genome: ReferenceGenome = match ReferenceGenome::from_fasta(&cli_settings.reference_filename) {
        Ok(rg) => rg,
        Err(e) => {
            error!("Error during reference loading: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let mut likelihood_writer: LikelihoodWriter = match LikelihoodWriter::new(&cli_settings.output_filename) {
        Ok(lw) => lw,
        Err(e) => {
            error!("Error during likelihood writer creation: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let start_time: Instant = Instant::now();
    let mut total_reads: u64 = 0;
    let mut regions_done: u64 = 0;

    // values related to printing
    const UPDATE_SPEED: u64 = 100;
    info!("Haplotype assignment starting on {} regions...", regions.len());

    for region in regions.iter() {
        if !reference_genome.contig_keys().iter().any(|k| k == region.chrom()) {
            warn!("Skipping {}, contig is not in the reference", region);
            continue;
        }

        let grouped_reads: GroupedReads = match load_region_reads(
            &cli_settings.bam_filenames,
            &cli_settings.reference_filename,
            region,
            cli_settings.min_mapping_quality,
            cli_settings.ignore_read_groups
        ) {
            Ok(gr) => gr,
            Err(e) => {
                error!("Error while loading reads for {}: {}", region, e);
                std::process::exit(exitcode::IOERR);
            }
        };

        let reference_allele: String = match reference_genome.get_region_allele(region) {
            Ok(ra) => ra,
            Err(e) => {
                error!("Error while loading reference allele for {}: {}", region, e);
                std::process::exit(exitcode::IOERR);
            }
        };
        let reference_sequence: &[u8] = match reference_genome.get_full_chromosome(region.chrom()) {
            Ok(rs) => rs,
            Err(e) => {
                error!("Error while loading reference sequence for {}: {}", region, e);
                std::process::exit(exitcode::IOERR);
            }
        };

        let region_result: RegionLikelihoods = assigner.process_reads(&grouped_reads, region, &reference_allele, reference_sequence);
        debug!("{}: {} reads, {} tag/SNP matches, {} mismatches", region, region_result.reads.len(), region_result.concordance.match_count(), region_result.concordance.mismatch_count());

        match likelihood_writer.write_region(&region_result) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing likelihood file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };

        total_reads += region_result.reads.len() as u64;
        regions_done += 1;
        if regions_done % UPDATE_SPEED == 0 {
            let time_so_far: f64 = start_time.elapsed().as_secs_f64();
            let regions_per_sec: f64 = regions_done as f64 / time_so_far;
            let reads_per_sec: f64 = total_reads as f64 / time_so_far;
            info!("Processed {} / {} regions: {:.4} regions/sec, {:.4} reads/sec, latest region {}", regions_done, regions.len(), regions_per_sec, reads_per_sec, region);
        }
    }

    // always report concordance
    assigner.finish();
    info!("Total SNP phasing time: {:.4} seconds", assigner.total_snp_phase_info_time());

    if let Some(ref filename) = cli_settings.summary_filename {
        info!("Saving summary statistics to {:?}...", filename);
        match write_summary(filename, &RunSummary::from_assigner(&assigner)) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing summary statistics file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
    }

    info!("All {} regions finished successfully after {} seconds, {} rows written.", regions_done, start_time.elapsed().as_secs_f64(), likelihood_writer.rows_written());
}
