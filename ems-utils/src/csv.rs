use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Array2};
use std::{fmt::Display, fs, path::Path};

fn parse_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.split(',')
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|e| {
                        anyhow!("{}:{}: invalid number {:?}: {}", path.display(), i + 1, field, e)
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

/// Reads a comma separated matrix with one row per line.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let rows = parse_rows(path)?;
    let num_rows = rows.len();
    let num_cols = rows.first().map_or(0, |row| row.len());
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != num_cols) {
        return Err(anyhow!(
            "{}: row {} has {} columns, expected {}",
            path.display(),
            i + 1,
            row.len(),
            num_cols
        ));
    }
    Array2::from_shape_vec((num_rows, num_cols), rows.into_iter().flatten().collect())
        .map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Reads a vector stored either one value per line or as a single row.
pub fn read_vector<P: AsRef<Path>>(path: P) -> Result<Array1<f64>> {
    let matrix = read_matrix(path.as_ref())?;
    match matrix.dim() {
        (_, 1) | (1, _) | (0, 0) => Ok(matrix.iter().copied().collect()),
        (rows, cols) => Err(anyhow!(
            "{}: expected a single row or column, found {}x{}",
            path.as_ref().display(),
            rows,
            cols
        )),
    }
}

pub fn write_matrix<P: AsRef<Path>, T: Display>(path: P, matrix: &Array2<T>) -> Result<()> {
    let mut text = String::new();
    for row in matrix.rows() {
        let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        text.push_str(&fields.join(","));
        text.push('\n');
    }
    fs::write(path.as_ref(), text).with_context(|| format!("Failed to write {}", path.as_ref().display()))
}

/// Writes one value per line.
pub fn write_column<P: AsRef<Path>, T: Display>(path: P, values: &[T]) -> Result<()> {
    let text: String = values.iter().map(|v| format!("{}\n", v)).collect();
    fs::write(path.as_ref(), text).with_context(|| format!("Failed to write {}", path.as_ref().display()))
}
