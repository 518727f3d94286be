
use crate::data_types::aligned_read::{AlignedRead, PairingStatus};
use crate::data_types::region::Region;

use log::{debug, trace};
use simple_error::bail;
use rust_htslib::bam::record::Aux;
use rust_htslib::{bam, htslib};
use rustc_hash::FxHashMap as HashMap;
use std::path::{Path, PathBuf};

/// Read group name used when read groups are ignored or missing
pub const DEFAULT_READ_GROUP: &str = "all";

/// Reads from one read group, split by pairing status.
/// `paired` and `mates` are parallel: `mates[i]` is the mate of `paired[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadGroupReads {
    /// The read group name
    name: String,
    /// First-seen reads of pairs with both mates present
    paired: Vec<AlignedRead>,
    /// Second-seen reads of pairs, same order as `paired`
    mates: Vec<AlignedRead>,
    /// Everything else
    unpaired: Vec<AlignedRead>
}

impl ReadGroupReads {
    pub fn new(name: String) -> ReadGroupReads {
        ReadGroupReads {
            name,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds both reads of a fragment
    /// # Arguments
    /// * `read` - the first-seen read, expected to be `PairingStatus::Paired`
    /// * `mate` - its mate, expected to be `PairingStatus::Mate`
    pub fn add_pair(&mut self, read: AlignedRead, mate: AlignedRead) {
        debug_assert_eq!(read.read_name(), mate.read_name());
        self.paired.push(read);
        self.mates.push(mate);
    }

    /// Adds a read without a fetched mate
    pub fn add_unpaired(&mut self, read: AlignedRead) {
        self.unpaired.push(read);
    }

    pub fn paired(&self) -> &[AlignedRead] {
        &self.paired
    }

    pub fn mates(&self) -> &[AlignedRead] {
        &self.mates
    }

    pub fn unpaired(&self) -> &[AlignedRead] {
        &self.unpaired
    }

    /// Iterates over paired reads, then mates, then unpaired reads
    pub fn iter(&self) -> impl Iterator<Item = &AlignedRead> {
        self.paired.iter()
            .chain(self.mates.iter())
            .chain(self.unpaired.iter())
    }

    /// Iterates over fragments: every pair as (read, Some(mate)), then every unpaired read as (read, None)
    pub fn fragments(&self) -> impl Iterator<Item = (&AlignedRead, Option<&AlignedRead>)> {
        self.paired.iter().zip(self.mates.iter().map(Some))
            .chain(self.unpaired.iter().map(|r| (r, None)))
    }

    pub fn num_fragments(&self) -> usize {
        self.paired.len() + self.unpaired.len()
    }

    pub fn len(&self) -> usize {
        self.paired.len() + self.mates.len() + self.unpaired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// All reads for a region, grouped by read group in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupedReads {
    /// The groups in first-seen order
    groups: Vec<ReadGroupReads>,
    /// read group name -> index in `groups`
    group_lookup: HashMap<String, usize>
}

impl GroupedReads {
    pub fn new() -> GroupedReads {
        Default::default()
    }

    /// Returns the group with the given name, creating it if needed
    fn group_mut(&mut self, read_group: &str) -> &mut ReadGroupReads {
        let group_index = match self.group_lookup.get(read_group) {
            Some(&gi) => gi,
            None => {
                let gi = self.groups.len();
                self.groups.push(ReadGroupReads::new(read_group.to_string()));
                self.group_lookup.insert(read_group.to_string(), gi);
                gi
            }
        };
        &mut self.groups[group_index]
    }

    /// Adds both reads of a fragment to the group named by the first read
    pub fn add_pair(&mut self, read: AlignedRead, mate: AlignedRead) {
        let group_name = read.read_group().to_string();
        self.group_mut(&group_name).add_pair(read, mate);
    }

    /// Adds a read without a fetched mate to the group it names
    pub fn add_unpaired(&mut self, read: AlignedRead) {
        let group_name = read.read_group().to_string();
        self.group_mut(&group_name).add_unpaired(read);
    }

    pub fn groups(&self) -> &[ReadGroupReads] {
        &self.groups
    }

    /// Iterates over every read in group order
    pub fn iter(&self) -> impl Iterator<Item = &AlignedRead> {
        self.groups.iter().flat_map(|g| g.iter())
    }

    pub fn num_reads(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }
}

/// Returns true if an alignment record should be filtered out, aka ignored.
/// Main reasons for ignoring are if it is unmapped, secondary, supplementary, failed QC, a duplicate, has too low of a MAPQ,
/// or has no stored sequence (SEQ `*`).
/// # Arguments
/// * `record` - the record of interest
/// * `min_mapq` - the minimum MAPQ we allow
pub fn filter_out_alignment_record(record: &bam::Record, min_mapq: u8) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FSUPPLEMENTARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((record.flags() as u32) & FLAG_FILTER) != 0 || record.mapq() < min_mapq || record.seq_len() == 0
}

/// Returns the read group for a record, falling back to `DEFAULT_READ_GROUP`
/// # Arguments
/// * `record` - the record of interest
/// * `ignore_read_groups` - if true, every record goes to the default group
fn get_read_group(record: &bam::Record, ignore_read_groups: bool) -> String {
    if ignore_read_groups {
        return DEFAULT_READ_GROUP.to_string();
    }
    match record.aux(b"RG") {
        Ok(Aux::String(rg)) => rg.to_string(),
        _ => DEFAULT_READ_GROUP.to_string()
    }
}

/// Assigns pairing status to records in fetch order.
/// A paired record whose mate was also fetched is `Paired` the first time the name is seen and `Mate` the second time.
/// # Arguments
/// * `records` - the filtered records, in fetch order
fn assign_pairing(records: &[bam::Record]) -> Vec<PairingStatus> {
    let mut name_counts: HashMap<&[u8], usize> = Default::default();
    for record in records.iter().filter(|r| r.is_paired()) {
        *name_counts.entry(record.qname()).or_default() += 1;
    }

    let mut name_seen: HashMap<&[u8], usize> = Default::default();
    records.iter()
        .map(|record| {
            if !record.is_paired() || name_counts.get(record.qname()).copied().unwrap_or(0) != 2 {
                return PairingStatus::Unpaired;
            }
            let seen = name_seen.entry(record.qname()).or_default();
            *seen += 1;
            if *seen == 1 { PairingStatus::Paired } else { PairingStatus::Mate }
        })
        .collect()
}

/// Loads all usable reads overlapping a region and groups them by read group and pairing status.
/// # Arguments
/// * `bam_paths` - the BAM/CRAM files to parse, must be indexed
/// * `reference_filename` - the reference FASTA, needed for CRAM decoding
/// * `region` - the region to fetch
/// * `min_mapq` - the minimum MAPQ to consider a read
/// * `ignore_read_groups` - if true, all reads are placed in a single group
/// # Errors
/// * if a BAM file cannot be opened, fetched, or read
pub fn load_region_reads(
    bam_paths: &[PathBuf], reference_filename: &Path, region: &Region,
    min_mapq: u8, ignore_read_groups: bool
) -> Result<GroupedReads, Box<dyn std::error::Error>> {
    use rust_htslib::bam::Read;

    let mut records: Vec<bam::Record> = vec![];
    let mut num_filtered: usize = 0;
    for bam_filename in bam_paths.iter() {
        let mut bam_reader = bam::IndexedReader::from_path(bam_filename)?;
        bam_reader.set_reference(reference_filename)?;
        bam_reader.fetch((region.chrom(), region.start(), region.end()))?;

        for read_entry in bam_reader.records() {
            let record = read_entry?;
            if filter_out_alignment_record(&record, min_mapq) {
                num_filtered += 1;
                continue;
            }
            records.push(record);
        }
    }

    let pairing = assign_pairing(&records);

    // fragments in first-seen order, a mate is slotted next to its first read
    let mut fragments: Vec<(AlignedRead, Option<AlignedRead>)> = Vec::with_capacity(records.len());
    let mut open_pairs: HashMap<String, usize> = Default::default();
    for (mut record, pairing_status) in records.into_iter().zip(pairing) {
        let read_group = get_read_group(&record, ignore_read_groups);
        let read = AlignedRead::from_record(&mut record, read_group, pairing_status);
        trace!("Loaded {} ({}, {})", read.read_name(), read.read_group(), read.pairing());
        match pairing_status {
            PairingStatus::Paired => {
                open_pairs.insert(read.read_name().to_string(), fragments.len());
                fragments.push((read, None));
            },
            PairingStatus::Mate => {
                // assign_pairing guarantees the first read came earlier
                let fragment_index = match open_pairs.remove(read.read_name()) {
                    Some(fi) => fi,
                    None => bail!("Mate {:?} was found before its first read in {}", read.read_name(), region)
                };
                fragments[fragment_index].1 = Some(read);
            },
            PairingStatus::Unpaired => fragments.push((read, None))
        };
    }

    let mut grouped_reads = GroupedReads::new();
    for (read, opt_mate) in fragments.into_iter() {
        match opt_mate {
            Some(mate) => grouped_reads.add_pair(read, mate),
            None => grouped_reads.add_unpaired(read)
        };
    }

    debug!("Loaded {} reads in {} read groups for {} ({} filtered)", grouped_reads.num_reads(), grouped_reads.groups().len(), region, num_filtered);
    Ok(grouped_reads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_htslib::bam::record::{Cigar, CigarString};

    fn make_record(name: &[u8], paired: bool, rg: Option<&str>) -> bam::Record {
        let mut record = bam::Record::new();
        let cigar = CigarString(vec![Cigar::Match(4)]);
        record.set(name, Some(&cigar), b"ACGT", &[30, 30, 30, 30]);
        record.set_pos(10);
        record.set_mapq(60);
        if paired {
            record.set_paired();
        }
        if let Some(rg) = rg {
            record.push_aux(b"RG", Aux::String(rg)).unwrap();
        }
        record
    }

    fn simple_read(name: &str, read_group: &str, pairing: PairingStatus) -> AlignedRead {
        AlignedRead::new(
            name.to_string(), read_group.to_string(), pairing,
            b"A".to_vec(), vec![30], &[(0, 5)], None
        )
    }

    #[test]
    fn test_filter_out_alignment_record() {
        let mut record = make_record(b"r1", false, None);
        assert!(!filter_out_alignment_record(&record, 5));
        assert!(filter_out_alignment_record(&record, 61));

        record.set_duplicate();
        assert!(filter_out_alignment_record(&record, 5));

        let mut record = make_record(b"r2", false, None);
        record.set_supplementary();
        assert!(filter_out_alignment_record(&record, 5));

        let mut record = make_record(b"r3", false, None);
        record.set_unmapped();
        assert!(filter_out_alignment_record(&record, 5));
    }

    #[test]
    fn test_get_read_group() {
        let record = make_record(b"r1", false, Some("sample_rg"));
        assert_eq!(get_read_group(&record, false), "sample_rg");
        assert_eq!(get_read_group(&record, true), DEFAULT_READ_GROUP);

        let record = make_record(b"r2", false, None);
        assert_eq!(get_read_group(&record, false), DEFAULT_READ_GROUP);
    }

    #[test]
    fn test_assign_pairing() {
        let records = vec![
            make_record(b"pair", true, None),
            make_record(b"single_end", false, None),
            make_record(b"lonely_mate", true, None),
            make_record(b"pair", true, None)
        ];
        let pairing = assign_pairing(&records);
        assert_eq!(pairing, vec![
            PairingStatus::Paired,
            PairingStatus::Unpaired,
            PairingStatus::Unpaired,
            PairingStatus::Mate
        ]);
    }

    #[test]
    fn test_filter_seqless_record() {
        // SEQ * with a real CIGAR is legal, but there is nothing to score
        let mut record = bam::Record::new();
        let cigar = CigarString(vec![Cigar::Match(4)]);
        record.set(b"no_seq", Some(&cigar), b"", &[]);
        record.set_mapq(60);
        assert!(filter_out_alignment_record(&record, 5));
    }

    #[test]
    fn test_grouped_reads() {
        let mut grouped_reads = GroupedReads::new();
        grouped_reads.add_unpaired(simple_read("u1", "rg2", PairingStatus::Unpaired));
        grouped_reads.add_pair(simple_read("p1", "rg1", PairingStatus::Paired), simple_read("p1", "rg1", PairingStatus::Mate));
        grouped_reads.add_pair(simple_read("p2", "rg2", PairingStatus::Paired), simple_read("p2", "rg2", PairingStatus::Mate));
        grouped_reads.add_pair(simple_read("p3", "rg2", PairingStatus::Paired), simple_read("p3", "rg2", PairingStatus::Mate));

        assert_eq!(grouped_reads.num_reads(), 7);
        let group_names: Vec<&str> = grouped_reads.groups().iter().map(|g| g.name()).collect();
        assert_eq!(group_names, vec!["rg2", "rg1"]);

        // paired, then mates, then unpaired within a group
        let read_order: Vec<(&str, PairingStatus)> = grouped_reads.iter().map(|r| (r.read_name(), r.pairing())).collect();
        assert_eq!(read_order, vec![
            ("p2", PairingStatus::Paired), ("p3", PairingStatus::Paired),
            ("p2", PairingStatus::Mate), ("p3", PairingStatus::Mate),
            ("u1", PairingStatus::Unpaired),
            ("p1", PairingStatus::Paired), ("p1", PairingStatus::Mate)
        ]);

        // mates line up with their first read
        let rg2 = &grouped_reads.groups()[0];
        assert_eq!(rg2.num_fragments(), 3);
        let fragments: Vec<(&str, Option<&str>)> = rg2.fragments()
            .map(|(r, m)| (r.read_name(), m.map(|m| m.read_name())))
            .collect();
        assert_eq!(fragments, vec![("p2", Some("p2")), ("p3", Some("p3")), ("u1", None)]);
    }

    /// Record on chr1 (tid 0) at `pos`, mate fields point at chr1 when paired
    fn placed_record(name: &[u8], pos: i64, paired: bool, rg: Option<&str>) -> bam::Record {
        let mut record = make_record(name, paired, rg);
        record.set_tid(0);
        record.set_pos(pos);
        if paired {
            record.set_mtid(0);
            record.set_mpos(pos);
        } else {
            record.set_mtid(-1);
            record.set_mpos(-1);
        }
        record
    }

    /// Writes sorted records to an indexed BAM with a single 10 kbp contig and read groups rg1/rg2
    fn write_test_bam(folder: &Path, records: &[bam::Record]) -> PathBuf {
        use rust_htslib::bam::header::HeaderRecord;

        let mut header = bam::Header::new();
        let mut sq_record = HeaderRecord::new(b"SQ");
        sq_record.push_tag(b"SN", &"chr1");
        sq_record.push_tag(b"LN", &10000);
        header.push_record(&sq_record);
        for rg in ["rg1", "rg2"] {
            let mut rg_record = HeaderRecord::new(b"RG");
            rg_record.push_tag(b"ID", &rg);
            header.push_record(&rg_record);
        }

        let bam_fn = folder.join("test_reads.bam");
        {
            let mut bam_writer = bam::Writer::from_path(&bam_fn, &header, bam::Format::Bam).unwrap();
            for record in records.iter() {
                bam_writer.write(record).unwrap();
            }
        }
        bam::index::build(&bam_fn, None, bam::index::Type::Bai, 1).unwrap();
        bam_fn
    }

    fn test_bam_records() -> Vec<bam::Record> {
        let mut duplicate = placed_record(b"dup", 110, false, Some("rg1"));
        duplicate.set_duplicate();
        let mut low_mapq = placed_record(b"low_mapq", 115, false, Some("rg1"));
        low_mapq.set_mapq(1);
        let mut secondary = placed_record(b"secondary", 120, false, Some("rg2"));
        secondary.set_secondary();

        vec![
            placed_record(b"frag", 100, true, Some("rg1")),
            placed_record(b"single", 105, false, Some("rg2")),
            duplicate,
            low_mapq,
            secondary,
            placed_record(b"frag", 150, true, Some("rg1")),
            placed_record(b"no_rg", 160, false, None),
            placed_record(b"far_away", 5000, false, Some("rg1"))
        ]
    }

    #[test]
    fn test_load_region_reads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let bam_fn = write_test_bam(temp_dir.path(), &test_bam_records());
        let reference_fn = temp_dir.path().join("unused_reference.fa");
        let region = Region::new("chr1".to_string(), 100, 300, None);

        let grouped_reads = load_region_reads(&[bam_fn.clone()], &reference_fn, &region, 5, false).unwrap();
        assert_eq!(grouped_reads.num_reads(), 4);
        let group_names: Vec<&str> = grouped_reads.groups().iter().map(|g| g.name()).collect();
        assert_eq!(group_names, vec!["rg1", "rg2", DEFAULT_READ_GROUP]);

        let rg1 = &grouped_reads.groups()[0];
        assert_eq!(rg1.paired().len(), 1);
        assert_eq!(rg1.mates().len(), 1);
        assert!(rg1.unpaired().is_empty());
        assert_eq!(rg1.paired()[0].reference_span(), &(100..104));
        assert_eq!(rg1.mates()[0].reference_span(), &(150..154));
        assert_eq!(rg1.mates()[0].pairing(), PairingStatus::Mate);

        assert_eq!(grouped_reads.groups()[1].unpaired()[0].read_name(), "single");
        assert_eq!(grouped_reads.groups()[2].unpaired()[0].read_name(), "no_rg");

        // MAPQ equal to the minimum is kept
        let grouped_reads = load_region_reads(&[bam_fn.clone()], &reference_fn, &region, 1, false).unwrap();
        assert_eq!(grouped_reads.num_reads(), 5);

        let grouped_reads = load_region_reads(&[bam_fn], &reference_fn, &region, 5, true).unwrap();
        assert_eq!(grouped_reads.groups().len(), 1);
        let all_reads = &grouped_reads.groups()[0];
        assert_eq!(all_reads.name(), DEFAULT_READ_GROUP);
        assert_eq!(all_reads.num_fragments(), 3);
        assert_eq!(all_reads.len(), 4);
    }

    #[test]
    fn test_load_missing_bam() {
        let temp_dir = tempfile::tempdir().unwrap();
        let region = Region::new("chr1".to_string(), 100, 300, None);
        let result = load_region_reads(&[temp_dir.path().join("missing.bam")], &temp_dir.path().join("ref.fa"), &region, 5, false);
        assert!(result.is_err());
    }
}
