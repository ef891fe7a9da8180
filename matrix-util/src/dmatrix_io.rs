use crate::common_io::{read_lines_of_words_delim, write_lines, Delimiter};
use crate::traits::*;
pub use nalgebra::{DMatrix, DVector};

use std::fmt::{Debug, Display};
use std::str::FromStr;

fn parse_word<T>(word: &str, file: &str, line: usize) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: Debug,
{
    let word = word.trim();
    if word.is_empty() || word.eq_ignore_ascii_case("nan") {
        anyhow::bail!("missing value in {} (data line {})", file, line + 1);
    }
    word.parse::<T>().map_err(|e| {
        anyhow::anyhow!(
            "failed to parse `{}` in {} (data line {}): {:?}",
            word,
            file,
            line + 1,
            e
        )
    })
}

impl<T> IoOps for DMatrix<T>
where
    T: nalgebra::Scalar + FromStr + Display + Copy,
    <T as FromStr>::Err: Debug,
{
    type Scalar = T;
    type Mat = Self;

    fn read_data(
        file: &str,
        delim: impl Into<Delimiter>,
        row_name_index: usize,
        data_start: usize,
    ) -> anyhow::Result<MatWithNames<Self::Mat>> {
        let out = read_lines_of_words_delim(file, delim, Some(0))?;

        if out.header.len() <= data_start {
            anyhow::bail!(
                "{}: header has {} columns, but data should start at column {}",
                file,
                out.header.len(),
                data_start
            );
        }

        let cols: Vec<Box<str>> = out.header[data_start..]
            .iter()
            .map(|x| Box::from(x.trim()))
            .collect();
        let ncols = cols.len();
        let nrows = out.lines.len();

        let mut rows = Vec::with_capacity(nrows);
        let mut data = Vec::with_capacity(nrows * ncols);

        for (i, words) in out.lines.iter().enumerate() {
            if words.len() != out.header.len() || row_name_index >= words.len() {
                anyhow::bail!(
                    "{}: data line {} has {} fields, header has {}",
                    file,
                    i + 1,
                    words.len(),
                    out.header.len()
                );
            }
            rows.push(Box::from(words[row_name_index].trim()));
            for w in &words[data_start..] {
                data.push(parse_word::<T>(w, file, i)?);
            }
        }

        log::debug!("read {} x {} table from {}", nrows, ncols, file);

        Ok(MatWithNames {
            rows,
            cols,
            mat: DMatrix::<T>::from_row_iterator(nrows, ncols, data),
        })
    }

    fn read_file_delim(
        file: &str,
        delim: impl Into<Delimiter>,
        skip: Option<usize>,
    ) -> anyhow::Result<Self::Mat> {
        let lines = read_lines_of_words_delim(file, delim, skip)?.lines;

        if lines.is_empty() {
            return Err(anyhow::anyhow!("No data in file {}", file));
        }

        let ncols = lines[0].len();
        let nrows = lines.len();
        let mut data = Vec::with_capacity(nrows * ncols);
        for (i, words) in lines.iter().enumerate() {
            if words.len() != ncols {
                anyhow::bail!("{}: ragged line {}", file, i + 1);
            }
            for w in words {
                data.push(parse_word::<T>(w, file, i)?);
            }
        }

        Ok(DMatrix::<T>::from_row_iterator(nrows, ncols, data))
    }

    fn write_file_delim(&self, file: &str, delim: &str) -> anyhow::Result<()> {
        let lines = self
            .row_iter()
            .map(|row| {
                row.iter()
                    .map(|x| format!("{}", *x))
                    .collect::<Vec<String>>()
                    .join(delim)
                    .into_boxed_str()
            })
            .collect::<Vec<_>>();

        write_lines(&lines, file)?;
        Ok(())
    }

    fn write_data_delim(
        &self,
        file: &str,
        row_names: &[Box<str>],
        column_names: &[Box<str>],
        corner: &str,
        delim: &str,
    ) -> anyhow::Result<()> {
        if row_names.len() != self.nrows() {
            anyhow::bail!(
                "{} row names for {} rows",
                row_names.len(),
                self.nrows()
            );
        }
        if column_names.len() != self.ncols() {
            anyhow::bail!(
                "{} column names for {} columns",
                column_names.len(),
                self.ncols()
            );
        }

        let mut lines: Vec<Box<str>> = Vec::with_capacity(self.nrows() + 1);

        let header = std::iter::once(corner.to_string())
            .chain(column_names.iter().map(|x| x.to_string()))
            .collect::<Vec<_>>()
            .join(delim);
        lines.push(header.into_boxed_str());

        for (name, row) in row_names.iter().zip(self.row_iter()) {
            let line = std::iter::once(name.to_string())
                .chain(row.iter().map(|x| format!("{}", *x)))
                .collect::<Vec<_>>()
                .join(delim);
            lines.push(line.into_boxed_str());
        }

        write_lines(&lines, file)
    }
}
