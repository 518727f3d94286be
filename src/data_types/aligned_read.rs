
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;
use rustc_hash::FxHashMap as HashMap;
use std::ops::Range;

/// The aux tag linked-read platforms use to store the haplotype of origin
pub const HAPLOTYPE_TAG: &[u8; 2] = b"HP";

/// The raw content of a platform haplotype tag, before any interpretation
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawHaplotypeTag {
    /// Any of the integer aux types
    Integer(i64),
    /// String or character aux types
    Text(String),
    /// Float or array aux types, never a valid haplotype
    Unsupported
}

impl RawHaplotypeTag {
    /// Converts an htslib aux value into the raw tag representation
    fn from_aux(aux: Aux<'_>) -> RawHaplotypeTag {
        match aux {
            Aux::I8(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::U8(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::I16(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::U16(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::I32(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::U32(v) => RawHaplotypeTag::Integer(v as i64),
            Aux::Char(c) => RawHaplotypeTag::Text((c as char).to_string()),
            Aux::String(s) => RawHaplotypeTag::Text(s.to_string()),
            _ => RawHaplotypeTag::Unsupported
        }
    }
}

/// How a read relates to its mate within the fetched region
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, strum_macros::Display)]
pub enum PairingStatus {
    /// First-seen read of a pair where both mates were fetched
    #[strum(serialize = "paired")]
    Paired,
    /// Second-seen read of a pair where both mates were fetched
    #[strum(serialize = "mate")]
    Mate,
    /// Single-end reads, or pairs where only one mate was fetched
    #[strum(serialize = "unpaired")]
    Unpaired
}

/// An aligned read reduced to what haplotype assignment needs.
/// The reference-to-read lookup only contains aligned (M/=/X) positions, so soft clips, insertions, and deletions have no entry.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedRead {
    /// the read name
    read_name: String,
    /// the read group this read belongs to
    read_group: String,
    /// pairing status relative to the fetched region
    pairing: PairingStatus,
    /// the decoded read bases
    sequence: Vec<u8>,
    /// the per-base qualities (raw phred, no offset)
    qualities: Vec<u8>,
    /// the 0-based aligned reference span, end exclusive
    reference_span: Range<i64>,
    /// reference coordinate -> read offset
    coordinate_lookup: HashMap<i64, usize>,
    /// the platform haplotype tag, if present
    haplotype_tag: Option<RawHaplotypeTag>
}

impl AlignedRead {
    /// Creates a read from already decoded parts.
    /// # Arguments
    /// * `read_name` - the read name
    /// * `read_group` - the read group name
    /// * `pairing` - the pairing status of this read
    /// * `sequence` - the read bases
    /// * `qualities` - the base qualities, same length as `sequence`
    /// * `aligned_pairs` - (read offset, reference coordinate) pairs for every aligned base
    /// * `haplotype_tag` - the raw HP tag, if any
    /// Aligned pairs that point outside of `sequence` are dropped, so a record stored without SEQ has an empty lookup.
    /// # Panics
    /// * if `sequence` and `qualities` differ in length
    pub fn new(
        read_name: String, read_group: String, pairing: PairingStatus,
        sequence: Vec<u8>, qualities: Vec<u8>, aligned_pairs: &[(usize, i64)],
        haplotype_tag: Option<RawHaplotypeTag>
    ) -> AlignedRead {
        assert_eq!(sequence.len(), qualities.len());

        let mut coordinate_lookup: HashMap<i64, usize> = Default::default();
        let mut min_position = i64::MAX;
        let mut max_position = i64::MIN;
        for &(segment_index, ref_index) in aligned_pairs.iter().filter(|(si, _)| *si < sequence.len()) {
            coordinate_lookup.insert(ref_index, segment_index);
            min_position = min_position.min(ref_index);
            max_position = max_position.max(ref_index);
        }

        // max_position is the last aligned base, so +1 for an exclusive end
        let reference_span = if coordinate_lookup.is_empty() { 0..0 } else { min_position..(max_position + 1) };

        AlignedRead {
            read_name,
            read_group,
            pairing,
            sequence,
            qualities,
            reference_span,
            coordinate_lookup,
            haplotype_tag
        }
    }

    /// Builds a read from an htslib record.
    /// # Arguments
    /// * `record` - the alignment record, mutable only so the CIGAR can be cached
    /// * `read_group` - the read group name assigned by the caller
    /// * `pairing` - the pairing status assigned by the caller
    pub fn from_record(record: &mut bam::Record, read_group: String, pairing: PairingStatus) -> AlignedRead {
        use rust_htslib::bam::ext::BamRecordExtensions;

        record.cache_cigar();
        let aligned_pairs: Vec<(usize, i64)> = record.aligned_pairs()
            .map(|bp| (bp[0] as usize, bp[1]))
            .collect();

        let haplotype_tag: Option<RawHaplotypeTag> = record.aux(HAPLOTYPE_TAG)
            .ok()
            .map(RawHaplotypeTag::from_aux);

        AlignedRead::new(
            String::from_utf8_lossy(record.qname()).to_string(),
            read_group,
            pairing,
            record.seq().as_bytes(),
            record.qual().to_vec(),
            &aligned_pairs,
            haplotype_tag
        )
    }

    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    pub fn read_group(&self) -> &str {
        &self.read_group
    }

    pub fn pairing(&self) -> PairingStatus {
        self.pairing
    }

    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    pub fn qualities(&self) -> &[u8] {
        &self.qualities
    }

    pub fn reference_span(&self) -> &Range<i64> {
        &self.reference_span
    }

    pub fn haplotype_tag(&self) -> Option<&RawHaplotypeTag> {
        self.haplotype_tag.as_ref()
    }

    /// Returns the (base, quality) aligned to a reference coordinate, or None if the coordinate is not aligned in this read
    /// # Arguments
    /// * `ref_position` - the 0-based reference coordinate
    pub fn base_at(&self, ref_position: i64) -> Option<(u8, u8)> {
        self.coordinate_lookup.get(&ref_position)
            .map(|&si| (self.sequence[si], self.qualities[si]))
    }
}
