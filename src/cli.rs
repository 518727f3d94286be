
use clap::Parser;
use chrono::Datelike;
use flate2::bufread::MultiGzDecoder;
use lazy_static::lazy_static;
use log::{error, info, trace, warn};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::assigner::AssignmentConfig;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) {}     The hapassign authors
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input alignment file in BAM/CRAM format
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    #[clap(help_heading = Some("Input/Output"))]
    pub bam_filenames: Vec<PathBuf>,

    /// Regions to process in BED format (chrom, start, end, optional name)
    #[clap(required = true)]
    #[clap(short = 'R')]
    #[clap(long = "regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub regions_filename: PathBuf,

    /// Reference FASTA file, must have a .fai index
    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reference_filename: PathBuf,

    /// Phased SNP file in VCF format (optional, bgzipped and indexed)
    #[clap(long = "snp-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub snp_vcf_filename: Option<PathBuf>,

    /// Sample name to use within the phased SNP VCF (default: first sample)
    #[clap(short = 's')]
    #[clap(long = "sample-name")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample_name: Option<String>,

    /// Ignore BAM file read group IDs
    #[clap(long = "ignore-read-groups")]
    #[clap(help_heading = Some("Input/Output"))]
    pub ignore_read_groups: bool,

    /// Output per-read haplotype likelihood table (csv/tsv)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Output summary statistics file (optional, csv/tsv)
    #[clap(long = "summary-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub summary_filename: Option<PathBuf>,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Sets a minimum MAPQ to include a read
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(default_value = "5")]
    #[clap(help_heading = Some("Read Filtering"))]
    pub min_mapping_quality: u8,

    /// Use the HP tag of linked reads as haplotype evidence
    #[clap(long = "use-hp-tags")]
    #[clap(help_heading = Some("Haplotype Assignment"))]
    pub use_hp_tags: bool,

    /// Read bases with quality at or above this value count at a phased SNP
    #[clap(long = "min-base-quality")]
    #[clap(value_name = "QUAL")]
    #[clap(default_value = "10")]
    #[clap(help_heading = Some("Haplotype Assignment"))]
    pub min_base_quality: u8,

    /// Phased SNPs are loaded from each region extended by this many bases on both sides
    #[clap(long = "snp-padding")]
    #[clap(value_name = "LENGTH")]
    #[clap(default_value = "1000")]
    #[clap(help_heading = Some("Haplotype Assignment"))]
    pub snp_padding: u64,
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

/// Checks if the VCF file exists, is bgzipped, and has an index. If it fails any of those, this will exit.
/// # Argument
/// * `filename` - the VCF file path to check
/// * `label` - the label to use for error messages
fn check_required_vcf(filename: &Path, label: &str) {
    check_required_filename(filename, label);

    // a plain gzip file will also pass this, the index check should catch it
    let vcf_file: File = match File::open(filename) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while opening {filename:?}: {e}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let file_reader = BufReader::new(vcf_file);
    let mut gz_decoder = MultiGzDecoder::new(file_reader);
    let mut small_buffer: [u8; 10] = [0; 10];
    match gz_decoder.read(&mut small_buffer) {
        Ok(bytes_read) => {
            trace!("Successfully read {bytes_read} bytes from VCF.")
        },
        Err(e) => {
            error!("Error while reading {filename:?} as gzip, is the VCF bgzipped? {e}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // tbi or csi
    let index_found: bool = ["tbi", "csi"].iter()
        .any(|ext| {
            let mut index_path = filename.to_owned().into_os_string();
            index_path.push(format!(".{ext}"));
            PathBuf::from(index_path).exists()
        });
    if !index_found {
        error!("Error while checking {filename:?}: no tabix index found (.tbi or .csi)");
        std::process::exit(exitcode::NOINPUT);
    }
}

impl Settings {
    /// Builds the assignment engine configuration from our CLI settings
    pub fn assignment_config(&self) -> AssignmentConfig {
        AssignmentConfig {
            use_explicit_haplotype_tags: self.use_hp_tags,
            min_base_quality: self.min_base_quality,
            snp_search_padding: self.snp_padding
        }
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(settings: Settings) -> Settings {
    for filename in settings.bam_filenames.iter() {
        check_required_filename(filename, "Alignment file");
    }
    check_required_filename(&settings.regions_filename, "Region file");
    check_required_filename(&settings.reference_filename, "Reference file");
    if let Some(ref filename) = settings.snp_vcf_filename {
        check_required_vcf(filename, "Phased SNP file");
    } else if settings.sample_name.is_some() {
        warn!("--sample-name was provided without --snp-vcf, it will be ignored");
    }

    info!("Read filtering:");
    info!("\tMinimum mapping quality: {}", settings.min_mapping_quality);
    info!("\tRead groups: {}", if settings.ignore_read_groups { "IGNORED" } else { "ENABLED" });

    info!("Haplotype assignment:");
    info!("\tHP tag evidence: {}", if settings.use_hp_tags { "ENABLED" } else { "DISABLED" });
    if settings.snp_vcf_filename.is_some() {
        info!("\tPhased SNP evidence: ENABLED");
        info!("\tMinimum base quality: {}", settings.min_base_quality);
        info!("\tSNP search padding: +-{} bp", settings.snp_padding);
    } else {
        info!("\tPhased SNP evidence: DISABLED");
        if settings.use_hp_tags {
            warn!("\tHP tags without --snp-vcf cannot be checked for tag/SNP concordance");
        } else {
            warn!("\tNeither --use-hp-tags nor --snp-vcf provided, every read will be neutral");
        }
    }

    info!("Output file: {:?}", settings.output_filename);
    settings
}
