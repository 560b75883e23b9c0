use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Named columns of equal length, written as CSV.
#[derive(Debug, Default)]
pub struct CsvTable<'a> {
    columns: Vec<(&'a str, &'a [f64])>,
}

impl<'a> CsvTable<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, header: &'a str, values: &'a [f64]) -> Self {
        self.columns.push((header, values));
        self
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let n_rows = self.n_rows();
        if let Some((header, values)) = self.columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "column '{}' has {} rows, expected {}",
                    header,
                    values.len(),
                    n_rows
                ),
            ));
        }

        let headers: Vec<&str> = self.columns.iter().map(|(h, _)| *h).collect();
        writeln!(out, "{}", headers.join(","))?;

        for i in 0..n_rows {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|(_, values)| format!("{:.15e}", values[i]))
                .collect();
            writeln!(out, "{}", row.join(","))?;
        }
        Ok(())
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()
    }
}
