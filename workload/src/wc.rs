//! Word count. A word is a maximal run of letters.

use anyhow::Result;

use common::KeyValue;

pub fn map(_file: &str, contents: &str, _aux: &[String]) -> Result<Vec<KeyValue>> {
    Ok(contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| KeyValue::new(word, "1"))
        .collect())
}

pub fn reduce(_key: &str, values: Vec<String>, _aux: &[String]) -> Result<String> {
    let mut count = 0u64;
    for value in values {
        count += value.parse::<u64>()?;
    }
    Ok(count.to_string())
}
