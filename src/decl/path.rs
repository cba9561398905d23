//! Path-expression syntax for cross-references in declarations.
//!
//! `^1.settings["db"][0]` hops one parent up, reads `settings`, then indexes
//! it with `"db"` and `0`. Identifiers and parent hops are separated by `.`;
//! index brackets attach directly to what precedes them.

use anyhow::{Context, bail};
use regex::Regex;

use crate::rule::Path;

pub fn parse_path(input: &str) -> anyhow::Result<Path> {
    let token = Regex::new(
        r#"\A(?:\^(\d+)|([A-Za-z_][A-Za-z0-9_]*)|\[(-?\d+)\]|\["([^"]*)"\]|\['([^']*)'\])"#,
    )?;

    let mut path = Path::this();
    let mut rest = input.trim();
    let mut first = true;
    while !rest.is_empty() {
        let dotted = match rest.strip_prefix('.') {
            Some(after) if !first => {
                rest = after;
                true
            }
            Some(_) => bail!("path '{}' starts with '.'", input),
            None => false,
        };

        let Some(caps) = token.captures(rest) else {
            bail!("unexpected input in path '{}' at '{}'", input, rest);
        };
        let is_index = caps.get(1).is_none() && caps.get(2).is_none();
        if !is_index && !first && !dotted {
            bail!("missing '.' before '{}' in path '{}'", rest, input);
        }
        if is_index && dotted {
            bail!("unexpected '.' before '{}' in path '{}'", rest, input);
        }

        if let Some(hops) = caps.get(1) {
            let levels: usize = hops
                .as_str()
                .parse()
                .with_context(|| format!("bad parent hop in path '{}'", input))?;
            path = path.parent(levels);
        } else if let Some(name) = caps.get(2) {
            path = path.attr(name.as_str());
        } else if let Some(int) = caps.get(3) {
            let index: i64 = int
                .as_str()
                .parse()
                .with_context(|| format!("bad index in path '{}'", input))?;
            path = path.index(index);
        } else if let Some(key) = caps.get(4).or_else(|| caps.get(5)) {
            path = path.index(key.as_str());
        }

        let consumed = caps.get(0).map(|m| m.end()).unwrap_or(rest.len());
        rest = &rest[consumed..];
        first = false;
    }

    if path.steps().is_empty() {
        bail!("path '{}' is empty", input);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Step;
    use crate::value::Key;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_hops_attributes_and_indexes() {
        let path = parse_path(r#"^1.settings["db"][0]"#).expect("parse");
        assert_eq!(
            path.steps(),
            &[
                Step::Parent(1),
                Step::Attr("settings".into()),
                Step::Index(Key::Str("db".into())),
                Step::Index(Key::Int(0)),
            ]
        );
    }

    #[test]
    fn single_quotes_and_negative_indexes() {
        let path = parse_path("items['a'][-1].name").expect("parse");
        assert_eq!(path.to_string(), r#"items["a"][-1].name"#);
    }

    #[test]
    fn rejects_malformed_paths() {
        for bad in ["", ".a", "a.", "a b", "a^1", "a.[0]", "a[x]"] {
            assert!(parse_path(bad).is_err(), "{:?} should not parse", bad);
        }
    }
}
