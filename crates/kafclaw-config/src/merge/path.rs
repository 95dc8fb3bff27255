//! Dotted-path navigation helpers over `toml::Value` trees.

/// Navigate into a nested `toml::Value` by path segments.
pub(crate) fn get_nested<'a>(val: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Value> {
    let mut current = val;
    for segment in path {
        current = current.as_table()?.get(*segment)?;
    }
    Some(current)
}

/// Set a value at a nested path. Silently does nothing if an
/// intermediate segment is missing — callers only set paths that already
/// exist after the defaults layer has merged in.
pub(crate) fn set_nested(val: &mut toml::Value, path: &[&str], new_val: toml::Value) {
    let Some((leaf, parents)) = path.split_last() else { return };

    let mut current = val;
    for segment in parents {
        let Some(next) = current.as_table_mut().and_then(|t| t.get_mut(*segment)) else {
            return;
        };
        current = next;
    }

    if let Some(table) = current.as_table_mut() {
        table.insert((*leaf).to_owned(), new_val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_nested_walks_tables() {
        let val: toml::Value = toml::from_str("[a]\nb = 7").unwrap();
        assert_eq!(get_nested(&val, &["a", "b"]).and_then(toml::Value::as_integer), Some(7));
    }

    #[test]
    fn set_nested_overwrites_leaf() {
        let mut val: toml::Value = toml::from_str("[a]\nb = 7").unwrap();
        set_nested(&mut val, &["a", "b"], toml::Value::Integer(9));
        assert_eq!(val["a"]["b"].as_integer(), Some(9));
    }

    #[test]
    fn set_nested_missing_parent_is_noop() {
        let mut val: toml::Value = toml::from_str("[a]\nb = 7").unwrap();
        set_nested(&mut val, &["missing", "b"], toml::Value::Integer(9));
        assert_eq!(val["a"]["b"].as_integer(), Some(7));
    }
}
