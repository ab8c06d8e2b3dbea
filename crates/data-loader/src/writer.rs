//! Export of matrices back to the `row,col,data` format, using the original
//! tokens so the files can be read again by the loaders.

use crate::collection::DataState;
use crate::error::{DataLoadError, Result};
use crate::sparse::SparseMatrix;
use crate::types::TokenMapper;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Write `matrix` to any writer, resolving indices through the mappers
pub fn write_matrix_to<W: Write>(
    writer: W,
    matrix: &SparseMatrix,
    row_mapper: &TokenMapper,
    col_mapper: &TokenMapper,
    delimiter: u8,
    file: &str,
) -> Result<()> {
    let to_error = |source: csv::Error| DataLoadError::WriteError {
        file: file.to_string(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    writer.write_record(["row", "col", "data"]).map_err(to_error)?;

    for (&value, (row, col)) in matrix.iter() {
        let row_token = token(row_mapper, row, "row")?;
        let col_token = token(col_mapper, col, "column")?;
        writer
            .write_record([row_token, col_token, value.to_string().as_str()])
            .map_err(to_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `matrix` to `path`
pub fn write_matrix(
    path: &Path,
    matrix: &SparseMatrix,
    row_mapper: &TokenMapper,
    col_mapper: &TokenMapper,
    delimiter: u8,
) -> Result<()> {
    let file = fs::File::create(path)?;
    write_matrix_to(
        file,
        matrix,
        row_mapper,
        col_mapper,
        delimiter,
        &path.display().to_string(),
    )
}

/// Write the URM and every named ICM/UCM of `state` into `dir`:
/// `URM_all.csv`, `ICM_<name>.csv`, `UCM_<name>.csv`. Returns the number of
/// files written.
pub fn write_state(dir: &Path, state: &DataState, delimiter: u8) -> Result<usize> {
    fs::create_dir_all(dir)?;
    write_matrix(
        &dir.join("URM_all.csv"),
        &state.urm,
        &state.user_mapper,
        &state.item_mapper,
        delimiter,
    )?;
    let mut written = 1;

    for (name, feature) in state.icms.iter() {
        let path = dir.join(format!("ICM_{}.csv", name));
        write_matrix(&path, &feature.matrix, &state.item_mapper, &feature.mapper, delimiter)?;
        written += 1;
    }
    for (name, feature) in state.ucms.iter() {
        let path = dir.join(format!("UCM_{}.csv", name));
        write_matrix(&path, &feature.matrix, &state.user_mapper, &feature.mapper, delimiter)?;
        written += 1;
    }
    tracing::info!("Exported {} matrices to {}", written, dir.display());
    Ok(written)
}

fn token<'a>(mapper: &'a TokenMapper, idx: usize, axis: &str) -> Result<&'a str> {
    mapper.token(idx).ok_or_else(|| DataLoadError::ShapeMismatch {
        context: format!("{} mapper", axis),
        expected: idx + 1,
        found: mapper.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IncrementalSparseMatrix;
    use crate::parser::parse_records_from_reader;

    #[test]
    fn test_written_matrix_reads_back() {
        let mut builder = IncrementalSparseMatrix::new();
        builder
            .add_entries(&["u7", "u3"], &["i1", "i2"], &[1.0, 2.5])
            .unwrap();
        let built = builder.finalize();

        let mut buffer = Vec::new();
        write_matrix_to(
            &mut buffer,
            &built.matrix,
            &built.row_mapper,
            &built.col_mapper,
            b',',
            "memory",
        )
        .unwrap();

        let records = parse_records_from_reader(buffer.as_slice(), b',', "memory").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, "u7");
        assert_eq!(records[1].col, "i2");
        assert_eq!(records[1].data, Some(2.5));
    }

    /// Sink that rejects every write
    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_write_is_a_write_error() {
        // enough rows to overflow the csv writer's internal buffer
        let users: Vec<String> = (0..2_000).map(|u| format!("user-{:06}", u)).collect();
        let items: Vec<String> = (0..2_000).map(|i| format!("item-{:06}", i)).collect();
        let mut builder = IncrementalSparseMatrix::new();
        builder.add_entries(&users, &items, &vec![1.0; 2_000]).unwrap();
        let built = builder.finalize();

        let err = write_matrix_to(
            Closed,
            &built.matrix,
            &built.row_mapper,
            &built.col_mapper,
            b',',
            "URM_all.csv",
        )
        .unwrap_err();
        assert!(matches!(err, DataLoadError::WriteError { ref file, .. } if file == "URM_all.csv"));
        assert!(err.to_string().starts_with("Write error in URM_all.csv"));
    }

    #[test]
    fn test_missing_token_fails() {
        let mut builder = IncrementalSparseMatrix::new();
        builder.add_entries(&["u"], &["i"], &[1.0]).unwrap();
        let built = builder.finalize();

        let err = write_matrix_to(
            Vec::new(),
            &built.matrix,
            &TokenMapper::new(),
            &built.col_mapper,
            b',',
            "memory",
        )
        .unwrap_err();
        assert!(matches!(err, DataLoadError::ShapeMismatch { .. }));
    }
}
