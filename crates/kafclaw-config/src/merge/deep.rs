//! Recursive deep-merge of TOML value trees.

/// Deep-merge `overlay` into `base`.
///
/// Tables merge recursively per-field; scalars and arrays from the
/// overlay *replace* the base value outright. A key missing from
/// `overlay` leaves the corresponding `base` value untouched.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_scalar_replaces_base() {
        let mut base: toml::Value = toml::from_str("x = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("x = 9").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base.get("x").unwrap().as_integer(), Some(9));
        assert_eq!(base.get("y").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn nested_tables_merge_recursively() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\nx = 9").unwrap();
        deep_merge(&mut base, &overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(9));
        assert_eq!(base["a"]["y"].as_integer(), Some(2));
    }
}
