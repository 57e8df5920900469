//! HTML tag detection.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::Error, record::Record};

use super::{Filter, Score, Value};

lazy_static! {
    // opening/closing/self-closing tags, comments, doctype and CDATA
    static ref TAG: Regex = Regex::new(
        r#"(?x)
        </?[A-Za-z][A-Za-z0-9:-]*(\s+[^<>]*)?/?>
        | <!--.*?-->
        | <!\[CDATA\[
        | <!DOCTYPE[^>]*>
        "#
    )
    .unwrap();
}

/// Drops records where any segment contains markup.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct HtmlTag {}

impl HtmlTag {
    pub fn has_tags(text: &str) -> bool {
        TAG.is_match(text)
    }

    fn flags(record: &Record) -> Vec<bool> {
        record.segments().iter().map(|s| Self::has_tags(s)).collect()
    }
}

impl Filter<&Record> for HtmlTag {
    fn detect(&self, record: &Record) -> Result<bool, Error> {
        Ok(!Self::flags(record).into_iter().any(|f| f))
    }
}

impl Score<&Record> for HtmlTag {
    fn score(&self, record: &Record) -> Result<Value, Error> {
        Ok(Value::Bools(Self::flags(record)))
    }
}
