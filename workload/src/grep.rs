//! Distributed grep. The first auxiliary argument is the pattern; every
//! matching line is reported together with where it was found.

use anyhow::{anyhow, Result};

use common::KeyValue;

pub fn map(file: &str, contents: &str, aux: &[String]) -> Result<Vec<KeyValue>> {
    let pattern = aux
        .first()
        .ok_or_else(|| anyhow!("grep needs a pattern as its first argument"))?;

    Ok(contents
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains(pattern.as_str()))
        .map(|(index, line)| KeyValue::new(line, format!("{file}:{}", index + 1)))
        .collect())
}

pub fn reduce(_key: &str, values: Vec<String>, _aux: &[String]) -> Result<String> {
    Ok(values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_matching_lines_with_locations() {
        let aux = vec!["fox".to_string()];
        let kvs = map("a.txt", "the fox\nno match\nfox again", &aux).unwrap();

        assert_eq!(
            kvs,
            vec![
                KeyValue::new("the fox", "a.txt:1"),
                KeyValue::new("fox again", "a.txt:3"),
            ]
        );
    }

    #[test]
    fn needs_a_pattern() {
        assert!(map("a.txt", "text", &[]).is_err());
    }

    #[test]
    fn joins_locations() {
        let values = vec!["a.txt:1".to_string(), "b.txt:7".to_string()];
        assert_eq!(reduce("the fox", values, &[]).unwrap(), "a.txt:1,b.txt:7");
    }
}
