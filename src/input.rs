use std::fs::File;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord};

use crate::domain::Doi;
use crate::error::EnrichError;

/// Index of the first header containing "doi", case-insensitively.
pub fn doi_column(headers: &StringRecord) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.to_lowercase().contains("doi"))
}

/// Reads the DOI column of a comma-separated file with a header row.
/// Rows that are too short or have a blank DOI cell are skipped.
pub fn read_dois(path: &Utf8Path) -> Result<Vec<Doi>, EnrichError> {
    let read_error = |message: String| EnrichError::InputRead {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|err| read_error(err.to_string()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|err| read_error(err.to_string()))?
        .clone();
    let column =
        doi_column(&headers).ok_or_else(|| EnrichError::MissingDoiColumn(path.to_path_buf()))?;
    tracing::debug!(path = %path, column, header = &headers[column], "DOI column");

    let mut dois = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| read_error(err.to_string()))?;
        if let Some(doi) = row.get(column).and_then(|value| value.parse::<Doi>().ok()) {
            dois.push(doi);
        }
    }
    Ok(dois)
}
