//! CSV outputs for raw and snapped facilities

use crate::domain::{Facility, SnappedFacility};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Failed to write record to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Write `name,latitude,longitude` rows
pub fn write_facilities(path: &Path, facilities: &[Facility]) -> Result<()> {
    write_records(path, facilities)
}

/// Write `name,latitude,longitude,node_id` rows
pub fn write_snapped(path: &Path, facilities: &[SnappedFacility]) -> Result<()> {
    write_records(path, facilities)
}

/// Read back a snapped-facility table
pub fn read_snapped(path: &Path) -> Result<Vec<SnappedFacility>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<SnappedFacility>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_facilities_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("hospitals.csv");
        let facilities = vec![
            Facility::new("Amang Rodriguez Memorial Medical Center", 14.6335, 121.0989),
            Facility::new("St. Vincent, \"East\"", 14.65, 121.11),
        ];

        write_facilities(&path, &facilities).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();

        assert_eq!(lines.next(), Some("name,latitude,longitude"));
        assert_eq!(
            lines.next(),
            Some("Amang Rodriguez Memorial Medical Center,14.6335,121.0989")
        );
        assert_eq!(lines.next(), Some("\"St. Vincent, \"\"East\"\"\",14.65,121.11"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_snapped_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nodes.csv");
        let snapped = vec![SnappedFacility::new(
            &Facility::new("Marikina Valley Medical Center", 14.6401, 121.1053),
            3_001_234_567,
        )];

        write_snapped(&path, &snapped).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("name,latitude,longitude,node_id\n"));
        assert!(text.contains(",3001234567"));

        assert_eq!(read_snapped(&path).unwrap(), snapped);
    }

    #[test]
    fn test_empty_table_has_no_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_facilities(&path, &[]).unwrap();
        assert!(fs::read_to_string(&path).unwrap().is_empty());
    }
}
