use matrix_util::common_io::{create_temp_dir_file, write_lines};
use matrix_util::traits::{IoOps, MatWithNames};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn runif(nrow: usize, ncol: usize, seed: u64) -> DMatrix<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    DMatrix::from_fn(nrow, ncol, |_, _| rng.random::<f64>())
}

#[test]
fn dmatrix_io_test() -> anyhow::Result<()> {
    let xx = runif(50, 20, 1);

    let tsv_file = create_temp_dir_file("txt.gz")?;
    let tsv_file = tsv_file.to_str().unwrap();
    xx.to_tsv(tsv_file)?;

    let yy = DMatrix::<f64>::read_file_delim(tsv_file, "\t", None)?;

    approx::assert_abs_diff_eq!(xx, yy, epsilon = 1e-12);

    Ok(())
}

#[test]
fn named_table_round_trip() -> anyhow::Result<()> {
    let xx = runif(4, 3, 7);
    let rows: Vec<Box<str>> = ["101", "102", "103", "104"].map(Box::from).to_vec();
    let cols: Vec<Box<str>> = ["LC4", "LC6", "LPLC2"].map(Box::from).to_vec();

    let file = create_temp_dir_file(".tsv")?;
    let file = file.to_str().unwrap();
    xx.write_data_delim(file, &rows, &cols, "bodyId", "\t")?;

    let MatWithNames {
        rows: rows_in,
        cols: cols_in,
        mat,
    } = DMatrix::<f64>::read_data(file, "\t", 0, 1)?;

    assert_eq!(rows_in, rows);
    assert_eq!(cols_in, cols);
    approx::assert_abs_diff_eq!(xx, mat, epsilon = 1e-12);
    Ok(())
}

#[test]
fn pandas_style_csv_with_index_column() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".csv")?;
    let file = file.to_str().unwrap();
    let lines: Vec<Box<str>> = vec![
        ",bodyId,bin0,bin1".into(),
        "0,1001,3,0".into(),
        "1,1002,0.5,7".into(),
    ];
    write_lines(&lines, file)?;

    let out = DMatrix::<f64>::read_data(file, ",", 1, 2)?;
    assert_eq!(out.rows, vec![Box::<str>::from("1001"), Box::<str>::from("1002")]);
    assert_eq!(out.cols, vec![Box::<str>::from("bin0"), Box::<str>::from("bin1")]);
    assert_eq!(out.mat[(1, 0)], 0.5);
    assert_eq!(out.mat[(1, 1)], 7.0);
    Ok(())
}

#[test]
fn ragged_line_is_rejected() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".csv")?;
    let file = file.to_str().unwrap();
    let lines: Vec<Box<str>> = vec!["bodyId,a,b".into(), "1,2".into()];
    write_lines(&lines, file)?;
    assert!(DMatrix::<f64>::read_data(file, ",", 0, 1).is_err());
    Ok(())
}
