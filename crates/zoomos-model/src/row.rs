use std::collections::BTreeMap;

/// One input record: column name to raw string value.
///
/// Rows carry no schema; each stage reads only the columns it cares about.
pub type Row = BTreeMap<String, String>;

/// Build a row from `(column, value)` pairs.
pub fn row_from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Row
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
