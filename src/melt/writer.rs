use crate::error::{MeltError, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// One already-formatted cell of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// String data; quoted on output
    Text(String),
    /// Number, boolean or key; written as is
    Bare(String),
    Empty,
}

impl Field {
    pub fn bare(value: impl ToString) -> Self {
        Field::Bare(value.to_string())
    }
}

/// Quote `s` for CSV, doubling any inner quotes.
pub fn escape(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// A complete CSV line for `fields`, newline included.
pub fn format_record(fields: &[Field]) -> String {
    let mut line = fields
        .iter()
        .map(|field| match field {
            Field::Text(s) => escape(s),
            Field::Bare(s) => s.clone(),
            Field::Empty => String::new(),
        })
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

fn format_header(columns: &[&str]) -> String {
    let mut line = columns.join(",");
    line.push('\n');
    line
}

/// Destination for emitted rows, addressed by table name
pub trait RecordSink {
    /// Start the output for `table` with its column names.
    fn write_header(&mut self, table: &str, columns: &[&str]) -> Result<()>;

    /// Append one record to `table`.
    fn write_record(&mut self, table: &str, fields: &[Field]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Writes each table to `<dir>/<table>.csv`
pub struct CsvDirWriter {
    dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl CsvDirWriter {
    /// Create a writer for `output_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| MeltError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(CsvDirWriter {
            dir,
            writers: HashMap::new(),
        })
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", table))
    }

    fn open(&self, table: &str, truncate: bool) -> Result<BufWriter<File>> {
        let path = self.path_for(table);
        let file = if truncate {
            File::create(&path)
        } else {
            OpenOptions::new().create(true).append(true).open(&path)
        };
        file.map(BufWriter::new)
            .map_err(|source| MeltError::Io { path, source })
    }
}

impl RecordSink for CsvDirWriter {
    fn write_header(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        if self.writers.contains_key(table) {
            warn!(table, "output already started for this table name, keeping first header");
            return Ok(());
        }
        let mut writer = self.open(table, true)?;
        writer
            .write_all(format_header(columns).as_bytes())
            .map_err(|source| MeltError::Sink {
                table: table.to_string(),
                source,
            })?;
        self.writers.insert(table.to_string(), writer);
        Ok(())
    }

    fn write_record(&mut self, table: &str, fields: &[Field]) -> Result<()> {
        if !self.writers.contains_key(table) {
            let writer = self.open(table, false)?;
            self.writers.insert(table.to_string(), writer);
        }
        let Some(writer) = self.writers.get_mut(table) else {
            return Ok(());
        };
        writer
            .write_all(format_record(fields).as_bytes())
            .map_err(|source| MeltError::Sink {
                table: table.to_string(),
                source,
            })
    }

    fn flush(&mut self) -> Result<()> {
        let mut first_err = None;
        for (table, writer) in self.writers.iter_mut() {
            if let Err(source) = writer.flush() {
                first_err.get_or_insert(MeltError::Sink {
                    table: table.clone(),
                    source,
                });
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Keeps every table's CSV lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: BTreeMap<String, Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines of `table`, header first.
    pub fn lines(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// Data lines of `table`, header excluded.
    pub fn rows(&self, table: &str) -> &[String] {
        self.lines(table)
            .and_then(|lines| lines.get(1..))
            .unwrap_or(&[])
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Write every table to `out`, each preceded by a `==> name.csv <==` banner.
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for (name, lines) in &self.tables {
            writeln!(out, "==> {}.csv <==", name)?;
            for line in lines {
                out.write_all(line.as_bytes())?;
            }
            writeln!(out)?;
        }
        out.flush()
    }
}

impl RecordSink for MemorySink {
    fn write_header(&mut self, table: &str, columns: &[&str]) -> Result<()> {
        if self.tables.contains_key(table) {
            warn!(table, "output already started for this table name, keeping first header");
            return Ok(());
        }
        self.tables.insert(table.to_string(), vec![format_header(columns)]);
        Ok(())
    }

    fn write_record(&mut self, table: &str, fields: &[Field]) -> Result<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .push(format_record(fields));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
