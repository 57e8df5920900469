/*! External sort

Sorts parallel text streams along with their score stream, using fields of the score values as keys.

Input is read in chunks of `chunk_size` rows. Each chunk is sorted in memory and spilled to a gzipped
JSON lines file in a temporary directory, then runs are merged through a binary heap, at most `fan_in`
at a time (larger run counts go through intermediate merge passes).
Ties are broken by input row index, which makes the whole sort stable.

Keys are field references into score objects: `Name` for a whole field, `Name.i` for the i-th item of a list
(nested references such as `Name.sub.0` work the same way). An empty reference list sorts by the value itself.

Key values compare as follows:
- numbers by total order, booleans as 0/1 and `null` (an infinite score) as +∞,
- strings lexicographically, after every number,
- lists and objects can't be used as keys.

With `combine`, adjacent rows that have equal keys after merging are collapsed into one:
the designated fields are summed (element-wise for lists), everything else comes from the first row.
!*/
use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt,
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::{
    error::{Error, StreamError},
    io::{commit_all, ParallelReader, ParallelWriter, PartialFile, ValueReader, ValueWriter},
    pipeline::Pipeline,
    record::Record,
};

/// Dotted reference to a (possibly nested) field of a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef(Vec<String>);

impl FieldRef {
    pub fn parse(reference: &str) -> Self {
        if reference.is_empty() {
            Self(vec![])
        } else {
            Self(reference.split('.').map(String::from).collect())
        }
    }

    pub fn get<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(value, |current, part| match current {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn get_mut<'a>(&self, value: &'a mut Value) -> Option<&'a mut Value> {
        self.0.iter().try_fold(value, |current, part| match current {
            Value::Object(map) => map.get_mut(part),
            Value::Array(items) => part
                .parse::<usize>()
                .ok()
                .and_then(move |i| items.get_mut(i)),
            _ => None,
        })
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Single component of a sort key.
#[derive(Debug, Clone)]
pub enum KeyPart {
    Number(f64),
    Text(String),
}

impl KeyPart {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(KeyPart::Number(f64::INFINITY)),
            Value::Bool(b) => Some(KeyPart::Number(if *b { 1.0 } else { 0.0 })),
            Value::Number(n) => n.as_f64().map(KeyPart::Number),
            Value::String(s) => Some(KeyPart::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => a.total_cmp(b),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Number(_), KeyPart::Text(_)) => Ordering::Less,
            (KeyPart::Text(_), KeyPart::Number(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyPart {}

/// Combination operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
}

/// Collapse rows with equal keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combine {
    pub operator: Operator,
    pub fields: Vec<String>,
}

/// Row, as spilled to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    row: usize,
    segments: Vec<String>,
    value: Value,
}

#[derive(Debug)]
struct Keyed {
    key: Vec<KeyPart>,
    entry: Entry,
}

fn order(a: &Keyed, b: &Keyed, reverse: bool) -> Ordering {
    let by_key = a.key.cmp(&b.key);
    let by_key = if reverse { by_key.reverse() } else { by_key };
    by_key.then(a.entry.row.cmp(&b.entry.row))
}

/// Head of a sorted run.
struct Head {
    keyed: Keyed,
    run: usize,
    reverse: bool,
}

// BinaryHeap is a max-heap: the smallest row has to compare as the greatest.
impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        order(&self.keyed, &other.keyed, self.reverse).reverse()
    }
}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

/// Sum `other` into `acc`. `null` stands for +∞ and absorbs everything.
fn add(acc: &mut Value, other: &Value) -> Result<(), String> {
    match (acc, other) {
        (Value::Null, _) => Ok(()),
        (acc, Value::Null) => {
            *acc = Value::Null;
            Ok(())
        }
        (acc @ Value::Number(_), Value::Number(b)) => {
            let sum = match (acc.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x.checked_add(y).map(|s| Value::Number(s.into())),
                _ => None,
            };
            let sum = match sum {
                Some(sum) => sum,
                None => {
                    let s = acc.as_f64().unwrap_or(f64::NAN) + b.as_f64().unwrap_or(f64::NAN);
                    Number::from_f64(s).map_or(Value::Null, Value::Number)
                }
            };
            *acc = sum;
            Ok(())
        }
        (Value::Array(a), Value::Array(b)) if a.len() == b.len() => {
            for (a, b) in a.iter_mut().zip(b) {
                add(a, b)?;
            }
            Ok(())
        }
        (a, b) => Err(format!("can't add {b} to {a}")),
    }
}

pub struct Sort {
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    values: PathBuf,
    values_output: PathBuf,
    key: Vec<FieldRef>,
    reverse: bool,
    combine: Option<(Operator, Vec<FieldRef>)>,
    chunk_size: usize,
    fan_in: usize,
    tmp_root: Option<PathBuf>,
}

impl Sort {
    pub fn new(
        inputs: Vec<PathBuf>,
        outputs: Vec<PathBuf>,
        values: PathBuf,
        values_output: PathBuf,
        key: &[String],
    ) -> Self {
        Self {
            inputs,
            outputs,
            values,
            values_output,
            key: key.iter().map(|k| FieldRef::parse(k)).collect(),
            reverse: false,
            combine: None,
            chunk_size: 100_000,
            fan_in: 256,
            tmp_root: None,
        }
    }

    /// Descending order.
    pub fn reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    pub fn combine(mut self, combine: Option<&Combine>) -> Self {
        self.combine = combine.map(|c| {
            (
                c.operator,
                c.fields.iter().map(|f| FieldRef::parse(f)).collect(),
            )
        });
        self
    }

    /// Number of rows sorted in memory before spilling.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Maximum number of runs open at once while merging.
    pub fn fan_in(mut self, fan_in: usize) -> Self {
        self.fan_in = fan_in.max(2);
        self
    }

    /// Directory in which temporary runs are created (system default otherwise).
    pub fn tmp_root(mut self, tmp_root: Option<PathBuf>) -> Self {
        self.tmp_root = tmp_root;
        self
    }

    fn key_of(&self, entry: &Entry) -> Result<Vec<KeyPart>, Error> {
        if self.key.is_empty() {
            return KeyPart::from_value(&entry.value)
                .map(|k| vec![k])
                .ok_or_else(|| {
                    Error::config(format!(
                        "row {}: value {} can't be used as a sort key",
                        entry.row, entry.value
                    ))
                });
        }
        self.key
            .iter()
            .map(|field| {
                let value = field.get(&entry.value).ok_or_else(|| {
                    Error::config(format!("row {}: missing sort key {field}", entry.row))
                })?;
                KeyPart::from_value(value).ok_or_else(|| {
                    Error::config(format!(
                        "row {}: {field} is not a valid sort key (use a reference to a single item)",
                        entry.row
                    ))
                })
            })
            .collect()
    }

    fn keyed(&self, entry: Entry) -> Result<Keyed, Error> {
        Ok(Keyed {
            key: self.key_of(&entry)?,
            entry,
        })
    }

    fn next_row(
        texts: &mut Option<ParallelReader>,
        values: &mut ValueReader,
        row: usize,
    ) -> Result<Option<(Vec<String>, Value)>, Error> {
        let value = values.next().transpose()?;
        let segments = match texts {
            Some(reader) => reader.next().transpose()?.map(Record::into_segments),
            None => value.as_ref().map(|_| vec![]),
        };
        match (segments, value) {
            (None, None) => Ok(None),
            (Some(segments), Some(value)) => Ok(Some((segments, value))),
            _ => Err(StreamError::new("text and value streams have different lengths")
                .with_path(values.path())
                .with_row(row)
                .into()),
        }
    }

    /// Sort chunks and spill them to `dir`. Returns the run paths.
    fn spill(&self, dir: &Path) -> Result<(Vec<PathBuf>, usize), Error> {
        let mut texts = if self.inputs.is_empty() {
            None
        } else {
            Some(ParallelReader::open(&self.inputs)?)
        };
        let mut values = ValueReader::open(&self.values)?;

        let mut runs = Vec::new();
        let mut row = 0;
        let mut exhausted = false;
        while !exhausted {
            let mut chunk = Vec::new();
            while chunk.len() < self.chunk_size {
                match Self::next_row(&mut texts, &mut values, row)? {
                    Some((segments, value)) => {
                        chunk.push(self.keyed(Entry {
                            row,
                            segments,
                            value,
                        })?);
                        row += 1;
                    }
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }
            if chunk.is_empty() {
                break;
            }

            chunk.sort_by(|a, b| order(a, b, self.reverse));
            let path = dir.join(format!("run-{}.jsonl.gz", runs.len()));
            let mut run = PartialFile::create(&path)?;
            for keyed in &chunk {
                run.write_line(&serde_json::to_string(&keyed.entry)?)?;
            }
            run.finish()?;
            debug!("spilled run {} ({} rows)", runs.len(), chunk.len());
            runs.push(path);
        }
        Ok((runs, row))
    }

    fn next_in_run(&self, run: &mut ValueReader) -> Result<Option<Keyed>, Error> {
        match run.next().transpose()? {
            Some(value) => Ok(Some(self.keyed(serde_json::from_value::<Entry>(value)?)?)),
            None => Ok(None),
        }
    }

    /// Merge groups of `fan_in` runs into longer runs until at most `fan_in` are left.
    /// Rows keep their input index, so later merges still break ties the same way.
    fn reduce(&self, mut runs: Vec<PathBuf>, dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut pass = 0;
        while runs.len() > self.fan_in {
            debug!("merge pass {pass}: {} runs", runs.len());
            let mut merged = Vec::with_capacity(runs.len() / self.fan_in + 1);
            for (group_idx, group) in runs.chunks(self.fan_in).enumerate() {
                if let [single] = group {
                    merged.push(single.clone());
                    continue;
                }
                let path = dir.join(format!("merge-{pass}-{group_idx}.jsonl.gz"));
                let mut run = PartialFile::create(&path)?;
                self.merge(group, false, |entry| {
                    run.write_line(&serde_json::to_string(&entry)?)
                })?;
                run.finish()?;
                for done in group {
                    std::fs::remove_file(done)?;
                }
                merged.push(path);
            }
            runs = merged;
            pass += 1;
        }
        Ok(runs)
    }

    /// Merge sorted runs, calling `emit` on every row in order.
    /// Rows are only combined when `combine` is set.
    fn merge(
        &self,
        runs: &[PathBuf],
        combine: bool,
        mut emit: impl FnMut(Entry) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let mut readers = runs
            .iter()
            .map(|p| ValueReader::open(p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut heap = BinaryHeap::with_capacity(readers.len());
        for (run, reader) in readers.iter_mut().enumerate() {
            if let Some(keyed) = self.next_in_run(reader)? {
                heap.push(Head {
                    keyed,
                    run,
                    reverse: self.reverse,
                });
            }
        }
        debug!("merging {} runs", heap.len());

        let mut pending: Option<Keyed> = None;
        while let Some(Head { keyed, run, .. }) = heap.pop() {
            if let Some(next) = self.next_in_run(&mut readers[run])? {
                heap.push(Head {
                    keyed: next,
                    run,
                    reverse: self.reverse,
                });
            }

            let fields = match (combine, &self.combine) {
                (true, Some((Operator::Add, fields))) => fields,
                _ => {
                    emit(keyed.entry)?;
                    continue;
                }
            };
            match pending.as_mut() {
                Some(acc) if acc.key == keyed.key => {
                    for field in fields {
                        let missing = || {
                            Error::config(format!(
                                "row {}: missing combined field {field}",
                                keyed.entry.row
                            ))
                        };
                        let other = field.get(&keyed.entry.value).ok_or_else(missing)?;
                        let sum = field.get_mut(&mut acc.entry.value).ok_or_else(missing)?;
                        add(sum, other).map_err(|e| {
                            Error::config(format!("row {}: {field}: {e}", keyed.entry.row))
                        })?;
                    }
                }
                _ => {
                    if let Some(previous) = pending.replace(keyed) {
                        emit(previous.entry)?;
                    }
                }
            }
        }
        if let Some(last) = pending {
            emit(last.entry)?;
        }
        Ok(())
    }
}

impl Pipeline<usize> for Sort {
    fn run(&self) -> Result<usize, Error> {
        if self.inputs.len() != self.outputs.len() {
            return Err(Error::config(format!(
                "sort has {} inputs but {} outputs",
                self.inputs.len(),
                self.outputs.len()
            )));
        }
        info!(
            "sorting {:?} by {}",
            self.values,
            self.key.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ")
        );

        // removed on drop, whatever happens next
        let mut builder = tempfile::Builder::new();
        builder.prefix("paraclean-sort-");
        let tmp = match &self.tmp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        let (runs, rows) = self.spill(tmp.path())?;
        info!("{rows} rows in {} sorted runs", runs.len());
        let runs = self.reduce(runs, tmp.path())?;

        let mut texts = if self.outputs.is_empty() {
            None
        } else {
            Some(ParallelWriter::create(&self.outputs)?)
        };
        let mut values = ValueWriter::create(&self.values_output)?;
        self.merge(&runs, true, |entry| {
            if let Some(writer) = texts.as_mut() {
                writer.write_segments(&entry.segments)?;
            }
            values.write(&entry.value)
        })?;

        let written = values.written();
        let mut files = match texts {
            Some(writer) => writer.into_files()?,
            None => vec![],
        };
        files.push(values.into_file());
        commit_all(files)?;
        info!("wrote {written} sorted rows");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn write_values(dir: &Path, values: &[Value]) -> PathBuf {
        let path = dir.join("values.jsonl");
        let lines: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    fn read_values(path: &Path) -> Vec<Value> {
        ValueReader::open(path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn field_refs() {
        let value = json!({"a": [1, 2], "b": {"c": true}});
        assert_eq!(FieldRef::parse("a.1").get(&value), Some(&json!(2)));
        assert_eq!(FieldRef::parse("b.c").get(&value), Some(&json!(true)));
        assert_eq!(FieldRef::parse("").get(&value), Some(&value));
        assert_eq!(FieldRef::parse("a.2").get(&value), None);
        assert_eq!(FieldRef::parse("c").get(&value), None);
        assert_eq!(FieldRef::parse("a.1").to_string(), "a.1");
    }

    #[test]
    fn key_order() {
        let null = KeyPart::from_value(&Value::Null).unwrap();
        let one = KeyPart::from_value(&json!(1)).unwrap();
        let yes = KeyPart::from_value(&json!(true)).unwrap();
        let text = KeyPart::from_value(&json!("a")).unwrap();
        assert!(one < null);
        assert_eq!(one, yes);
        assert!(null < text);
        assert!(KeyPart::from_value(&json!([1])).is_none());
    }

    #[test]
    fn sums() {
        let mut acc = json!([1, 2.5]);
        add(&mut acc, &json!([2, 0.5])).unwrap();
        assert_eq!(acc, json!([3, 3.0]));
        let mut acc = json!(1);
        add(&mut acc, &Value::Null).unwrap();
        assert_eq!(acc, Value::Null);
        assert!(add(&mut json!([1]), &json!([1, 2])).is_err());
        assert!(add(&mut json!("a"), &json!(1)).is_err());
    }

    #[test]
    fn sort_values_only() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(dir.path(), &[json!({"s": 3}), json!({"s": 1}), json!({"s": 2})]);
        let out = dir.path().join("sorted.jsonl");
        let n = Sort::new(vec![], vec![], values, out.clone(), &["s".to_string()])
            .chunk_size(2)
            .run()
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            read_values(&out),
            vec![json!({"s": 1}), json!({"s": 2}), json!({"s": 3})]
        );
    }

    #[test]
    fn missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(dir.path(), &[json!({"s": 3}), json!({"t": 1})]);
        let out = dir.path().join("sorted.jsonl");
        let r = Sort::new(vec![], vec![], values, out.clone(), &["s".to_string()]).run();
        assert!(matches!(r, Err(Error::Configuration(_))));
        assert!(!out.exists());
    }

    #[test]
    fn whole_list_is_not_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(dir.path(), &[json!({"s": [3, 1]})]);
        let out = dir.path().join("sorted.jsonl");
        let r = Sort::new(vec![], vec![], values, out, &["s".to_string()]).run();
        assert!(matches!(r, Err(Error::Configuration(_))));
    }

    #[test]
    fn combine_adjacent() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(
            dir.path(),
            &[
                json!({"k": "b", "n": 1, "v": [1, 1], "tag": "first b"}),
                json!({"k": "a", "n": 2, "v": [0, 1], "tag": "first a"}),
                json!({"k": "b", "n": 3, "v": [2, 2], "tag": "second b"}),
            ],
        );
        let out = dir.path().join("combined.jsonl");
        let combine = Combine {
            operator: Operator::Add,
            fields: vec!["n".to_string(), "v".to_string()],
        };
        Sort::new(vec![], vec![], values, out.clone(), &["k".to_string()])
            .combine(Some(&combine))
            .chunk_size(1)
            .run()
            .unwrap();
        assert_eq!(
            read_values(&out),
            vec![
                json!({"k": "a", "n": 2, "v": [0, 1], "tag": "first a"}),
                json!({"k": "b", "n": 4, "v": [3, 3], "tag": "first b"}),
            ]
        );
    }

    #[test]
    fn more_runs_than_fan_in() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Value> = (0..50).map(|i| json!({"k": (i * 7) % 5, "i": i})).collect();
        let values = write_values(dir.path(), &rows);
        let text = dir.path().join("text.txt");
        let lines: Vec<String> = (0..50).map(|i| format!("row {i}")).collect();
        std::fs::write(&text, lines.join("\n") + "\n").unwrap();

        let sort = |name: &str, chunk_size: usize, fan_in: usize| {
            let out = dir.path().join(format!("{name}.txt"));
            let values_out = dir.path().join(format!("{name}.jsonl"));
            let n = Sort::new(
                vec![text.clone()],
                vec![out.clone()],
                values.clone(),
                values_out.clone(),
                &["k".to_string()],
            )
            .chunk_size(chunk_size)
            .fan_in(fan_in)
            .tmp_root(Some(dir.path().to_path_buf()))
            .run()
            .unwrap();
            assert_eq!(n, 50);
            (std::fs::read_to_string(out).unwrap(), read_values(&values_out))
        };

        // 50 runs over three merge passes
        let (text_small, values_small) = sort("small", 1, 3);
        let (text_whole, values_whole) = sort("whole", 50, 3);
        assert_eq!(text_small, text_whole);
        assert_eq!(values_small, values_whole);

        let mut expected = rows.clone();
        expected.sort_by_key(|v| v["k"].as_u64());
        assert_eq!(values_small, expected);
        // spill directories are gone
        assert!(std::fs::read_dir(dir.path())
            .unwrap()
            .all(|e| !e.unwrap().file_name().to_string_lossy().starts_with("paraclean-sort-")));
    }

    #[test]
    fn combine_across_merge_passes() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Value> = (0..20).map(|i| json!({"k": i % 2, "n": 1})).collect();
        let values = write_values(dir.path(), &rows);
        let out = dir.path().join("combined.jsonl");
        let combine = Combine {
            operator: Operator::Add,
            fields: vec!["n".to_string()],
        };
        Sort::new(vec![], vec![], values, out.clone(), &["k".to_string()])
            .combine(Some(&combine))
            .chunk_size(1)
            .fan_in(2)
            .run()
            .unwrap();
        assert_eq!(
            read_values(&out),
            vec![json!({"k": 0, "n": 10}), json!({"k": 1, "n": 10})]
        );
    }

    #[test]
    fn outputs_are_committed_together() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(dir.path(), &[json!({"s": 2}), json!({"s": 1})]);
        let text = dir.path().join("text.txt");
        std::fs::write(&text, "b\na\n").unwrap();
        // the score output can't be renamed over a non-empty directory
        let values_out = dir.path().join("out.jsonl");
        std::fs::create_dir(&values_out).unwrap();
        std::fs::write(values_out.join("keep"), "x").unwrap();

        let out = dir.path().join("out.txt");
        let r = Sort::new(
            vec![text],
            vec![out.clone()],
            values,
            values_out.clone(),
            &["s".to_string()],
        )
        .run();
        assert!(r.is_err());
        assert!(!out.exists());
        assert!(!dir.path().join("out.txt.partial").exists());
        assert!(values_out.join("keep").exists());
    }

    #[test]
    fn misaligned_values() {
        let dir = tempfile::tempdir().unwrap();
        let values = write_values(dir.path(), &[json!(1), json!(2)]);
        let text = dir.path().join("text.txt");
        std::fs::write(&text, "a\n").unwrap();
        let r = Sort::new(
            vec![text],
            vec![dir.path().join("out.txt")],
            values,
            dir.path().join("out.jsonl"),
            &[],
        )
        .run();
        assert!(matches!(r, Err(Error::Stream(_))));
    }
}
