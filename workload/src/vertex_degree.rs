//! A MapReduce-compatible application that computes the
//! degree of each vertex in a graph, given a list of edges.
//!

use anyhow::{anyhow, Result};

use common::KeyValue;

fn parse_line(line: &str) -> Result<(u64, u64)> {
    let mut iter = line.split_whitespace().take(2);
    let a = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    let b = iter
        .next()
        .ok_or_else(|| anyhow!("Invalid input file format"))?
        .parse()?;
    Ok((a, b))
}

pub fn map(_file: &str, contents: &str, _aux: &[String]) -> Result<Vec<KeyValue>> {
    let edges = contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect::<Result<Vec<_>>>()?;

    Ok(edges
        .into_iter()
        .flat_map(|(a, b)| [KeyValue::new(a.to_string(), "1"), KeyValue::new(b.to_string(), "1")])
        .collect())
}

pub fn reduce(_key: &str, values: Vec<String>, _aux: &[String]) -> Result<String> {
    let mut count = 0u64;

    for value in values {
        count += value.parse::<u64>()?;
    }

    Ok(format!("deg={count}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_ends_of_an_edge_count() {
        let kvs = map("edges.txt", "1 2\n\n2 3\n", &[]).unwrap();
        let keys: Vec<&str> = kvs.iter().map(KeyValue::key).collect();

        assert_eq!(keys, ["1", "2", "2", "3"]);
    }

    #[test]
    fn rejects_malformed_edges() {
        assert!(map("edges.txt", "1\n", &[]).is_err());
        assert!(map("edges.txt", "a b\n", &[]).is_err());
    }

    #[test]
    fn degree_is_the_sum() {
        let values = vec!["1".to_string(); 3];
        assert_eq!(reduce("2", values, &[]).unwrap(), "deg=3");
    }
}
