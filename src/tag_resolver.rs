
use crate::data_types::aligned_read::{AlignedRead, RawHaplotypeTag};
use crate::data_types::phased_snp::Haplotype;

use log::trace;

/// Resolves the haplotype stated by a read's platform tag.
/// Only the values 1 and 2 (integer or text encoded) are recognized; anything else, including a missing tag, gives None.
/// Malformed tags are never an error, the read just falls back to SNP evidence.
/// # Arguments
/// * `read` - the read to check
pub fn resolve_tag_haplotype(read: &AlignedRead) -> Option<Haplotype> {
    let haplotype = match read.haplotype_tag()? {
        RawHaplotypeTag::Integer(value) => u8::try_from(*value).ok().and_then(Haplotype::from_repr),
        RawHaplotypeTag::Text(value) => value.trim().parse::<u8>().ok().and_then(Haplotype::from_repr),
        RawHaplotypeTag::Unsupported => None
    };

    if haplotype.is_none() {
        trace!("Ignoring unrecognized haplotype tag on {}: {:?}", read.read_name(), read.haplotype_tag());
    }
    haplotype
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::aligned_read::PairingStatus;

    fn tagged_read(tag: Option<RawHaplotypeTag>) -> AlignedRead {
        AlignedRead::new(
            "read".to_string(), "rg".to_string(), PairingStatus::Unpaired,
            b"ACGT".to_vec(), vec![30; 4], &[(0, 10), (1, 11), (2, 12), (3, 13)],
            tag
        )
    }

    #[test]
    fn test_valid_tags() {
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(1)))), Some(Haplotype::Hap1));
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(2)))), Some(Haplotype::Hap2));
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Text("1".to_string())))), Some(Haplotype::Hap1));
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Text("2".to_string())))), Some(Haplotype::Hap2));
    }

    #[test]
    fn test_unusable_tags() {
        assert_eq!(resolve_tag_haplotype(&tagged_read(None)), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(0)))), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(3)))), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(-1)))), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Integer(257)))), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Text("hap1".to_string())))), None);
        assert_eq!(resolve_tag_haplotype(&tagged_read(Some(RawHaplotypeTag::Unsupported))), None);
    }
}
