//! Loaders and writers for snapshot data.
//!
//! Snapshot files store one snapshot per row; every loader returns the
//! transposed matrix so that columns are time-ordered snapshots.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use faer::Mat;
use tracing::debug;

use crate::types::DmdError;

/// Number of header lines preceding the data block of an IMSRG flow log.
pub const IMSRG_HEADER_LINES: usize = 7;

fn io_err(path: &Path, e: impl std::fmt::Display) -> DmdError {
    DmdError::Io(format!("{}: {e}", path.display()))
}

fn parse_value(path: &Path, line: usize, field: &str) -> Result<f64, DmdError> {
    field.trim().parse::<f64>().map_err(|e| {
        DmdError::Parse(format!(
            "{}: line {line}: '{}' is not a number ({e})",
            path.display(),
            field.trim()
        ))
    })
}

/// Build a (variables × snapshots) matrix from row-major snapshot rows.
fn rows_to_snapshots(path: &Path, rows: Vec<Vec<f64>>) -> Result<Mat<f64>, DmdError> {
    let n_snapshots = rows.len();
    if n_snapshots == 0 {
        return Err(DmdError::Parse(format!(
            "{}: no snapshot rows",
            path.display()
        )));
    }
    let n_vars = rows[0].len();
    if let Some((k, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_vars) {
        return Err(DmdError::Parse(format!(
            "{}: snapshot {k} has {} values, snapshot 0 has {n_vars}",
            path.display(),
            row.len()
        )));
    }
    debug!(path = %path.display(), n_vars, n_snapshots, "loaded snapshots");
    Ok(Mat::from_fn(n_vars, n_snapshots, |i, k| rows[k][i]))
}

/// Load a comma-separated snapshot table (rows = time).
///
/// Lines starting with `#` and blank lines are skipped. One trailing comma
/// per row is allowed; empty fields elsewhere and rows of differing length
/// are a [`DmdError::Parse`] error.
pub fn load_snapshot_csv(path: impl AsRef<Path>) -> Result<Mat<f64>, DmdError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| io_err(path, e))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DmdError::Parse(format!("{}: {e}", path.display())))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        let mut fields: Vec<&str> = record.iter().collect();
        // a single trailing delimiter is tolerated
        if fields.last().is_some_and(|f| f.is_empty()) {
            fields.pop();
        }
        if fields.iter().any(|f| f.is_empty()) {
            return Err(DmdError::Parse(format!(
                "{}: line {line}: empty field",
                path.display()
            )));
        }
        let row = fields
            .into_iter()
            .map(|f| parse_value(path, line, f))
            .collect::<Result<Vec<f64>, _>>()?;
        if !row.is_empty() {
            rows.push(row);
        }
    }
    rows_to_snapshots(path, rows)
}

/// Load an IMSRG flow log.
///
/// The first [`IMSRG_HEADER_LINES`] lines and the final line are not data;
/// each data line ends with a trailing comma.
pub fn load_imsrg_log(path: impl AsRef<Path>) -> Result<Mat<f64>, DmdError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() < IMSRG_HEADER_LINES + 2 {
        return Err(DmdError::Parse(format!(
            "{}: flow log has {} lines, expected a {IMSRG_HEADER_LINES}-line header, data and a footer",
            path.display(),
            lines.len()
        )));
    }

    let data = &lines[IMSRG_HEADER_LINES..lines.len() - 1];
    let rows = data
        .iter()
        .enumerate()
        .map(|(k, line)| {
            let fields: Vec<&str> = line.split(',').collect();
            // trailing comma leaves an empty last field
            fields[..fields.len() - 1]
                .iter()
                .map(|f| parse_value(path, IMSRG_HEADER_LINES + k + 1, f))
                .collect::<Result<Vec<f64>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    rows_to_snapshots(path, rows)
}

/// Non-empty, non-comment lines of a text file.
fn content_lines(path: &Path) -> Result<Vec<(usize, String)>, DmdError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim().to_string()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
        .collect())
}

/// Load training parameters, one value per line.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<Vec<f64>, DmdError> {
    let path = path.as_ref();
    let params = content_lines(path)?
        .iter()
        .map(|(line, l)| parse_value(path, *line, l))
        .collect::<Result<Vec<f64>, _>>()?;
    if params.is_empty() {
        return Err(DmdError::Parse(format!(
            "{}: no parameter values",
            path.display()
        )));
    }
    Ok(params)
}

/// Load every snapshot file named in a list file, in order, with `load`.
///
/// Relative entries that do not exist from the working directory are
/// resolved against the list file's directory.
pub fn load_data_list<F>(path: impl AsRef<Path>, load: F) -> Result<Vec<Mat<f64>>, DmdError>
where
    F: Fn(&Path) -> Result<Mat<f64>, DmdError>,
{
    let path = path.as_ref();
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let entries = content_lines(path)?;
    if entries.is_empty() {
        return Err(DmdError::Parse(format!(
            "{}: no snapshot files listed",
            path.display()
        )));
    }
    entries
        .iter()
        .map(|(_, entry)| {
            let mut file = PathBuf::from(entry);
            if file.is_relative() && !file.exists() {
                file = base.join(&file);
            }
            load(&file)
        })
        .collect()
}

/// Write reconstructed snapshots as CSV: one row per time, the first column
/// holding `s` and the rest the state variables.
pub fn write_prediction_csv(
    path: impl AsRef<Path>,
    s_range: &[f64],
    prediction: &Mat<f64>,
) -> Result<(), DmdError> {
    let path = path.as_ref();
    if prediction.ncols() != s_range.len() {
        return Err(DmdError::ShapeMismatch(format!(
            "{} time values for {} predicted snapshots",
            s_range.len(),
            prediction.ncols()
        )));
    }
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| io_err(path, e))?;

    // header is a comment line so the file loads back with load_snapshot_csv
    let mut header = vec!["# s".to_string()];
    header.extend((0..prediction.nrows()).map(|i| format!("x{i}")));
    writer
        .write_record(&header)
        .map_err(|e| io_err(path, e))?;

    for (k, s) in s_range.iter().enumerate() {
        let mut record = Vec::with_capacity(prediction.nrows() + 1);
        record.push(format!("{s:.16e}"));
        record.extend((0..prediction.nrows()).map(|i| format!("{:.16e}", prediction[(i, k)])));
        writer.write_record(&record).map_err(|e| io_err(path, e))?;
    }
    writer.flush().map_err(|e| io_err(path, e))?;
    debug!(path = %path.display(), rows = s_range.len(), "wrote prediction");
    Ok(())
}
