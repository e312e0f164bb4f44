//! Work item input: version ids read from a CSV file.
//!
//! Every non-empty cell counts as one item, regardless of how the cells are
//! spread over rows.
use crate::error::{CliError, Result};
use log::{debug, warn};
use std::path::Path;

/// Split CSV content into trimmed, unquoted, non-empty cells.
#[must_use]
pub fn parse_cells(content: &str) -> Vec<String> {
    content
        .lines()
        .flat_map(|line| line.split(','))
        .map(|cell| cell.trim().trim_matches('"').trim())
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the work items of a batch run.
///
/// # Errors
///
/// Returns an error if the file cannot be read. An empty file yields no
/// items.
pub async fn read_work_items(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        CliError::Input(format!("Cannot read version list {}: {e}", path.display()))
    })?;
    let items = parse_cells(&content);
    if items.is_empty() {
        warn!("⚠️  Version list {} contains no entries", path.display());
        return Ok(items);
    }
    debug!("Read {} work items from {}", items.len(), path.display());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_across_rows() {
        assert_eq!(parse_cells("2,3\n4\r\n5, 6,\n"), vec!["2", "3", "4", "5", "6"]);
    }

    #[test]
    fn test_quoted_and_blank_cells() {
        assert_eq!(parse_cells("\"7\", ,\"\"\n\n  8  "), vec!["7", "8"]);
        assert!(parse_cells("").is_empty());
    }

    #[tokio::test]
    async fn test_read_work_items_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("versions.csv");
        tokio::fs::write(&file, "10,11\n12\n").await.unwrap();

        let items = read_work_items(&file).await.unwrap();
        assert_eq!(items, vec!["10", "11", "12"]);
    }

    #[tokio::test]
    async fn test_read_work_items_empty_or_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.csv");
        tokio::fs::write(&file, " \n").await.unwrap();

        assert!(read_work_items(&file).await.unwrap().is_empty());
        assert!(matches!(
            read_work_items(&dir.path().join("missing.csv")).await,
            Err(CliError::Input(_))
        ));
    }
}
