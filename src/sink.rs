use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Incremental JSON array writer.
///
/// Elements are serialized straight into a buffered destination, so memory use
/// does not grow with the number of records written. The output is a valid
/// JSON array once [`close`](Self::close) has run, including when nothing was
/// written. Dropping the writer without closing leaves the array unterminated.
pub struct JsonArrayWriter<W: Write> {
    writer: BufWriter<W>,
    count: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn open(destination: W) -> Result<Self> {
        let mut writer = BufWriter::new(destination);
        writer.write_all(b"[")?;
        Ok(Self { writer, count: 0 })
    }

    pub fn write<T: Serialize + ?Sized>(&mut self, element: &T) -> Result<()> {
        if self.count > 0 {
            self.writer.write_all(b",")?;
        }
        self.writer.write_all(b"\n")?;
        serde_json::to_writer(&mut self.writer, element)?;
        self.count += 1;
        Ok(())
    }

    /// Number of elements written so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Terminate the array, flush, and hand back the destination.
    pub fn close(mut self) -> Result<W> {
        if self.count > 0 {
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(b"]\n")?;
        self.writer.flush()?;
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }
}

/// Create (or truncate) a file destination, creating parent directories.
pub fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn written(records: &[Value]) -> Result<Vec<u8>> {
        let mut writer = JsonArrayWriter::open(Vec::new())?;
        for record in records {
            writer.write(record)?;
        }
        writer.close()
    }

    #[test]
    fn zero_records_is_an_empty_array() -> Result<()> {
        let bytes = written(&[])?;
        assert_eq!(bytes, b"[]\n");
        let parsed: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(parsed, json!([]));
        Ok(())
    }

    #[test]
    fn one_record_round_trips() -> Result<()> {
        let bytes = written(&[json!({ "Name": "Rex" })])?;
        let parsed: Value = serde_json::from_slice(&bytes)?;
        assert_eq!(parsed, json!([{ "Name": "Rex" }]));
        assert!(bytes.ends_with(b"]\n"));
        Ok(())
    }

    #[test]
    fn many_records_keep_order() -> Result<()> {
        let records: Vec<Value> = (0..250).map(|i| json!({ "Id": i })).collect();
        let bytes = written(&records)?;
        let parsed: Vec<Value> = serde_json::from_slice(&bytes)?;
        assert_eq!(parsed, records);
        Ok(())
    }

    #[test]
    fn unclosed_writer_leaves_array_open() -> Result<()> {
        let mut buffer = Vec::new();
        {
            let mut writer = JsonArrayWriter::open(&mut buffer)?;
            writer.write(&json!({ "Id": 1 }))?;
        }
        assert!(serde_json::from_slice::<Value>(&buffer).is_err());
        Ok(())
    }

    #[test]
    fn file_destination_creates_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("exports").join("pets.json");
        let mut writer = JsonArrayWriter::open(create_file(&path)?)?;
        writer.write(&json!({ "Name": "Rex" }))?;
        writer.close()?;

        let parsed: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, json!([{ "Name": "Rex" }]));
        Ok(())
    }
}
