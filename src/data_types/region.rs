
use log::{debug, info};
use std::fmt;
use std::path::Path;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RegionError {
    #[error("line {line}: expected at least 3 columns (chrom, start, end), found {found}")]
    MissingColumns { line: u64, found: usize },
    #[error("line {line}: could not parse {column} value {value:?}")]
    InvalidCoordinate { line: u64, column: &'static str, value: String },
    #[error("line {line}: start ({start}) must be < end ({end})")]
    EmptyRegion { line: u64, start: u64, end: u64 }
}

/// A genomic locus to process, stored with 0-based half-open coordinates.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Region {
    /// The chromosome of the region
    chrom: String,
    /// The 0-based start coordinate, inclusive
    start: u64,
    /// The 0-based end coordinate, exclusive
    end: u64,
    /// Optional label from the region file
    name: Option<String>
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)?;
        if let Some(name) = self.name.as_ref() {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

impl Region {
    /// Creates a new region
    /// # Panics
    /// * if `start >= end`
    pub fn new(chrom: String, start: u64, end: u64, name: Option<String>) -> Region {
        assert!(start < end, "start >= end: {start} >= {end}");
        Region {
            chrom,
            start,
            end,
            name
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn bp_len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns true if the 0-based half-open range `[other_start, other_end)` overlaps this region
    pub fn is_overlapping(&self, other_start: u64, other_end: u64) -> bool {
        other_start < self.end && self.start < other_end
    }

    /// Returns an unnamed copy extended by `padding` on both sides, the start stops at 0
    pub fn padded(&self, padding: u64) -> Region {
        Region {
            chrom: self.chrom.clone(),
            start: self.start.saturating_sub(padding),
            end: self.end.saturating_add(padding),
            name: None
        }
    }
}

/// Loads all regions from a BED-style file: tab-delimited chrom, 0-based start, exclusive end, and an optional name.
/// Lines starting with `#`, `track`, or `browser` are skipped, extra columns are ignored.
/// # Arguments
/// * `filename` - the region file to load
/// # Errors
/// * if the file cannot be opened or read
/// * if a line has fewer than 3 columns, unparseable coordinates, or an empty interval
pub fn load_regions(filename: &Path) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
    info!("Loading regions from {:?}...", filename);
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(filename)?;

    let mut regions: Vec<Region> = vec![];
    for (line_index, entry) in csv_reader.records().enumerate() {
        let record = entry?;
        let line: u64 = record.position().map(|p| p.line()).unwrap_or(line_index as u64 + 1);

        // header-ish lines in BED files
        let first = record.get(0).unwrap_or_default();
        if first.is_empty() || first.starts_with('#') || first.starts_with("track") || first.starts_with("browser") {
            debug!("Skipping region line {line}: {record:?}");
            continue;
        }

        if record.len() < 3 {
            return Err(Box::new(RegionError::MissingColumns { line, found: record.len() }));
        }

        let parse_coordinate = |column: &'static str, value: &str| -> Result<u64, RegionError> {
            value.trim().parse::<u64>().map_err(|_| RegionError::InvalidCoordinate {
                line,
                column,
                value: value.to_string()
            })
        };
        let start = parse_coordinate("start", &record[1])?;
        let end = parse_coordinate("end", &record[2])?;
        if start >= end {
            return Err(Box::new(RegionError::EmptyRegion { line, start, end }));
        }

        let name = record.get(3)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        regions.push(Region::new(first.to_string(), start, end, name));
    }

    info!("Finished loading {} regions.", regions.len());
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_region_overlap() {
        let region = Region::new("chr1".to_string(), 100, 200, None);
        assert_eq!(region.bp_len(), 100);
        assert!(region.is_overlapping(50, 101));
        assert!(region.is_overlapping(199, 300));
        assert!(!region.is_overlapping(50, 100));
        assert!(!region.is_overlapping(200, 300));
        assert_eq!(region.to_string(), "chr1:100-200");

        let named = Region::new("chr2".to_string(), 5, 10, Some("STR_1".to_string()));
        assert_eq!(named.to_string(), "chr2:5-10 (STR_1)");

        let padded = named.padded(20);
        assert_eq!((padded.start(), padded.end()), (0, 30));
        assert_eq!(padded.name(), None);
    }

    #[test]
    fn test_load_regions() {
        let file = write_temp("#chrom\tstart\tend\nchr1\t100\t200\tlocus_a\textra\nchr2\t5\t10\n");
        let regions = load_regions(file.path()).unwrap();
        assert_eq!(regions, vec![
            Region::new("chr1".to_string(), 100, 200, Some("locus_a".to_string())),
            Region::new("chr2".to_string(), 5, 10, None)
        ]);
    }

    #[test]
    fn test_load_bad_regions() {
        let file = write_temp("chr1\t100\n");
        let result = load_regions(file.path());
        assert_eq!(result.err().unwrap().to_string(), "line 1: expected at least 3 columns (chrom, start, end), found 2");

        let file = write_temp("chr1\tabc\t200\n");
        let result = load_regions(file.path());
        assert_eq!(result.err().unwrap().to_string(), "line 1: could not parse start value \"abc\"");

        let file = write_temp("chr1\t200\t200\n");
        let result = load_regions(file.path());
        assert_eq!(result.err().unwrap().to_string(), "line 1: start (200) must be < end (200)");
    }
}
