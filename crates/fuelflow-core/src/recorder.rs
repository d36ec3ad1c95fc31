//! Output rows and the sinks that collect them.
//!
//! Rows are built with [`DatumBuilder`]:
//!
//! ```
//! use fuelflow_core::recorder::MemoryRecorder;
//! use fuelflow_core::traits::Recorder;
//!
//! let sink = MemoryRecorder::new();
//! let dyn_sink: &dyn Recorder = &sink;
//! dyn_sink.new_datum("Compositions")
//!     .add_val("QualId", 1_i64)
//!     .add_val("NucId", 922350000)
//!     .add_val("MassFrac", 1.0)
//!     .record();
//! assert_eq!(sink.rows_in("Compositions").len(), 1);
//! ```

use std::io::{self, Write};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::traits::Recorder;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One committed row: a table name and ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub table: String,
    pub fields: Vec<(String, Value)>,
}

impl Datum {
    /// Create an empty row for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// JSON object with a `table` key followed by the fields.
    pub fn to_json(&self) -> JsonValue {
        let mut obj = Map::new();
        obj.insert("table".into(), JsonValue::String(self.table.clone()));
        for (k, v) in &self.fields {
            let json = serde_json::to_value(v).unwrap_or(JsonValue::Null);
            obj.insert(k.clone(), json);
        }
        JsonValue::Object(obj)
    }
}

/// Builder returned by `new_datum`; nothing reaches the sink until
/// [`record`](Self::record) is called.
#[must_use = "a datum is only emitted when `record` is called"]
pub struct DatumBuilder<'a> {
    sink: &'a dyn Recorder,
    datum: Datum,
}

impl<'a> DatumBuilder<'a> {
    pub fn new(sink: &'a dyn Recorder, table: impl Into<String>) -> Self {
        Self {
            sink,
            datum: Datum::new(table),
        }
    }

    /// Append a field.
    pub fn add_val(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.datum.fields.push((key.into(), value.into()));
        self
    }

    /// Commit the row to the sink.
    pub fn record(self) {
        self.sink.record(self.datum);
    }
}

impl dyn Recorder + '_ {
    /// Start a new row for `table`.
    pub fn new_datum(&self, table: &str) -> DatumBuilder<'_> {
        DatumBuilder::new(self, table)
    }
}

/// Keeps every row in memory. Used by tests and by short CLI runs.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    rows: Mutex<Vec<Datum>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all rows recorded so far.
    pub fn rows(&self) -> Vec<Datum> {
        self.rows.lock().clone()
    }

    /// Rows recorded into `table`.
    pub fn rows_in(&self, table: &str) -> Vec<Datum> {
        self.rows
            .lock()
            .iter()
            .filter(|d| d.table == table)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

impl Recorder for MemoryRecorder {
    fn record(&self, datum: Datum) {
        self.rows.lock().push(datum);
    }
}

/// Writes one JSON object per line.
///
/// Write failures are logged and counted; the first one is surfaced by
/// [`flush`](Self::flush).
pub struct JsonLinesRecorder<W: Write + Send> {
    inner: Mutex<JsonLinesState<W>>,
}

struct JsonLinesState<W> {
    out: W,
    written: u64,
    failures: u64,
}

impl<W: Write + Send> JsonLinesRecorder<W> {
    pub fn new(out: W) -> Self {
        Self {
            inner: Mutex::new(JsonLinesState {
                out,
                written: 0,
                failures: 0,
            }),
        }
    }

    /// Number of rows written successfully.
    pub fn written(&self) -> u64 {
        self.inner.lock().written
    }

    /// Flush the underlying writer. Fails if any earlier row failed to write.
    pub fn flush(&self) -> io::Result<()> {
        let mut state = self.inner.lock();
        state.out.flush()?;
        if state.failures > 0 {
            return Err(io::Error::other(format!(
                "{} rows failed to write",
                state.failures
            )));
        }
        Ok(())
    }

    /// Consume the recorder and return the writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner().out
    }
}

impl<W: Write + Send> Recorder for JsonLinesRecorder<W> {
    fn record(&self, datum: Datum) {
        let line = datum.to_json().to_string();
        let mut state = self.inner.lock();
        match writeln!(state.out, "{line}") {
            Ok(()) => state.written += 1,
            Err(e) => {
                state.failures += 1;
                tracing::warn!(table = %datum.table, "failed to write row: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Seek, SeekFrom};

    #[test]
    fn value_conversions() {
        assert_eq!(Value::from(3_i32), Value::Int(3));
        assert_eq!(Value::from(3_u64), Value::Int(3));
        assert_eq!(Value::from(0.25), Value::Float(0.25));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
    }

    #[test]
    fn datum_to_json() {
        let mut d = Datum::new("Compositions");
        d.fields.push(("QualId".into(), Value::Int(4)));
        d.fields.push(("MassFrac".into(), Value::Float(0.5)));
        let json = d.to_json();
        assert_eq!(json["table"], "Compositions");
        assert_eq!(json["QualId"], 4);
        assert_eq!(json["MassFrac"], 0.5);
    }

    #[test]
    fn memory_recorder_filters_by_table() {
        let r = MemoryRecorder::new();
        let sink: &dyn Recorder = &r;
        sink.new_datum("A").add_val("k", 1).record();
        sink.new_datum("B").add_val("k", 2).record();
        sink.new_datum("A").add_val("k", 3).record();
        assert_eq!(r.len(), 3);
        assert_eq!(r.rows_in("A").len(), 2);
        assert_eq!(r.rows_in("B")[0].get("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn builder_without_record_emits_nothing() {
        let r = MemoryRecorder::new();
        let sink: &dyn Recorder = &r;
        let _unused = sink.new_datum("A").add_val("k", 1);
        assert!(r.is_empty());
    }

    #[test]
    fn json_lines_to_file() {
        let file = tempfile::tempfile().unwrap();
        let r = JsonLinesRecorder::new(file);
        let sink: &dyn Recorder = &r;
        sink.new_datum("Compositions")
            .add_val("QualId", 1)
            .add_val("NucId", 922350000)
            .add_val("MassFrac", 1.0)
            .record();
        sink.new_datum("Compositions").add_val("QualId", 2).record();
        r.flush().unwrap();
        assert_eq!(r.written(), 2);

        let mut file = r.into_inner();
        file.seek(SeekFrom::Start(0)).unwrap();
        let lines: Vec<String> = BufReader::new(file).lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        let first: JsonValue = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["NucId"], 922350000);
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_lines_surfaces_failures_on_flush() {
        let r = JsonLinesRecorder::new(FailingWriter);
        r.record(Datum::new("A"));
        assert_eq!(r.written(), 0);
        assert!(r.flush().is_err());
    }
}
