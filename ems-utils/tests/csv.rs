use ems_utils::{read_matrix, read_vector, write_column, write_matrix};
use ndarray::array;
use std::fs;

#[test]
fn test_read_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("travel_times.csv");
    fs::write(&path, "1.5,2,3\n4, 5.25 ,6e1\n\n").unwrap();
    let matrix = read_matrix(&path).unwrap();
    assert_eq!(matrix, array![[1.5, 2.0, 3.0], [4.0, 5.25, 60.0]]);
}

#[test]
fn test_read_matrix_errors() {
    let dir = tempfile::tempdir().unwrap();
    let ragged = dir.path().join("ragged.csv");
    fs::write(&ragged, "1,2\n3\n").unwrap();
    assert!(read_matrix(&ragged).is_err());

    let garbage = dir.path().join("garbage.csv");
    fs::write(&garbage, "1,two\n").unwrap();
    let error = read_matrix(&garbage).unwrap_err().to_string();
    assert!(error.contains("invalid number"));

    assert!(read_matrix(dir.path().join("missing.csv")).is_err());
}

#[test]
fn test_read_vector() {
    let dir = tempfile::tempdir().unwrap();
    let column = dir.path().join("column.csv");
    fs::write(&column, "1\n2\n3\n").unwrap();
    assert_eq!(read_vector(&column).unwrap(), array![1.0, 2.0, 3.0]);

    let row = dir.path().join("row.csv");
    fs::write(&row, "4,5\n").unwrap();
    assert_eq!(read_vector(&row).unwrap(), array![4.0, 5.0]);

    let matrix = dir.path().join("matrix.csv");
    fs::write(&matrix, "1,2\n3,4\n").unwrap();
    assert!(read_vector(&matrix).is_err());
}

#[test]
fn test_write_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.csv");
    write_matrix(&path, &array![[0.25, 0.125], [1.0, 3.5]]).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "0.25,0.125\n1,3.5\n");
    assert_eq!(read_matrix(&path).unwrap(), array![[0.25, 0.125], [1.0, 3.5]]);

    let path = dir.path().join("allocation.csv");
    write_column(&path, &[0u32, 1, 5, 1]).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "0\n1\n5\n1\n");
}
