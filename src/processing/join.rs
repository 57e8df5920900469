/*! Join

Merges several score streams row by row into a single stream of JSON objects.

Objects are merged field by field. Plain values (labels, single scores) are wrapped
into an object under the key given for their input. A field present in more than one input
is an error, as is any difference in stream lengths.
!*/
use std::path::PathBuf;

use log::info;
use serde_json::{Map, Value};

use crate::{
    error::Error,
    io::{ValueReader, ValueWriter},
    pipeline::Pipeline,
};

pub struct Join {
    inputs: Vec<PathBuf>,
    keys: Vec<Option<String>>,
    output: PathBuf,
}

impl Join {
    /// `keys` is either empty or holds one optional wrapping key per input.
    pub fn new(
        inputs: Vec<PathBuf>,
        keys: Vec<Option<String>>,
        output: PathBuf,
    ) -> Result<Self, Error> {
        if inputs.is_empty() {
            return Err(Error::config("join needs at least one input"));
        }
        if !keys.is_empty() && keys.len() != inputs.len() {
            return Err(Error::config(format!(
                "join has {} inputs but {} keys",
                inputs.len(),
                keys.len()
            )));
        }
        Ok(Self {
            inputs,
            keys,
            output,
        })
    }

    fn key(&self, input: usize) -> Option<&str> {
        self.keys.get(input).and_then(|k| k.as_deref())
    }

    /// Merge the values of one row.
    pub fn merge(&self, row: usize, values: Vec<Value>) -> Result<Value, Error> {
        let mut merged = Map::new();
        for (input, value) in values.into_iter().enumerate() {
            let object = match (value, self.key(input)) {
                (value, Some(key)) => {
                    let mut wrapped = Map::new();
                    wrapped.insert(key.to_string(), value);
                    wrapped
                }
                (Value::Object(object), None) => object,
                (value, None) => {
                    return Err(Error::config(format!(
                        "row {row}: value {value} of {:?} is not an object, give a key for this input",
                        self.inputs[input]
                    )))
                }
            };
            for (field, value) in object {
                if merged.contains_key(&field) {
                    return Err(Error::config(format!(
                        "row {row}: field {field:?} of {:?} is already set by another input",
                        self.inputs[input]
                    )));
                }
                merged.insert(field, value);
            }
        }
        Ok(Value::Object(merged))
    }
}

impl Pipeline<usize> for Join {
    fn run(&self) -> Result<usize, Error> {
        info!("joining {:?}", self.inputs);
        let mut readers = self
            .inputs
            .iter()
            .map(|p| ValueReader::open(p))
            .collect::<Result<Vec<_>, _>>()?;
        let mut writer = ValueWriter::create(&self.output)?;

        let mut row = 0;
        loop {
            let values = readers
                .iter_mut()
                .map(|r| r.next().transpose())
                .collect::<Result<Vec<Option<Value>>, _>>()?;
            let ended = values.iter().filter(|v| v.is_none()).count();
            if ended == values.len() {
                break;
            }
            if ended > 0 {
                let short: Vec<_> = values
                    .iter()
                    .zip(&self.inputs)
                    .filter(|(v, _)| v.is_none())
                    .map(|(_, p)| p)
                    .collect();
                return Err(Error::Alignment(format!(
                    "{short:?} ended after {row} rows while other inputs continue"
                )));
            }
            let merged = self.merge(row, values.into_iter().flatten().collect())?;
            writer.write(&merged)?;
            row += 1;
        }

        writer.finish()?;
        info!("joined {row} rows");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_json::json;

    use super::*;

    fn write(dir: &Path, name: &str, values: &[Value]) -> PathBuf {
        let path = dir.join(name);
        let lines: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    #[test]
    fn wrap_and_merge() {
        let join = Join::new(
            vec!["scores".into(), "labels".into()],
            vec![None, Some("label".to_string())],
            "out".into(),
        )
        .unwrap();
        assert_eq!(
            join.merge(0, vec![json!({"a": 1}), json!(true)]).unwrap(),
            json!({"a": 1, "label": true})
        );
        assert!(matches!(
            join.merge(0, vec![json!(1), json!(true)]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn collision() {
        let join = Join::new(vec!["a".into(), "b".into()], vec![], "out".into()).unwrap();
        assert!(matches!(
            join.merge(3, vec![json!({"a": 1}), json!({"a": 2})]),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn unequal_lengths() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.jsonl", &[json!({"a": 1}), json!({"a": 2})]);
        let b = write(dir.path(), "b.jsonl", &[json!({"b": 1})]);
        let out = dir.path().join("out.jsonl");
        let r = Join::new(vec![a, b], vec![], out.clone()).unwrap().run();
        assert!(matches!(r, Err(Error::Alignment(_))));
        assert!(!out.exists());
    }

    #[test]
    fn bad_keys() {
        assert!(Join::new(vec!["a".into()], vec![None, None], "out".into()).is_err());
        assert!(Join::new(vec![], vec![], "out".into()).is_err());
    }
}
