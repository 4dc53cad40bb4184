//! Search request URLs

use url::Url;

/// Set query parameters on a copy of `base`.
///
/// Each key in `params` replaces the first existing parameter of that name
/// in place and drops any later duplicates; keys the base does not have are
/// appended in the order given. When a key is given twice the last value
/// wins. Every other parameter of the base URL is kept.
pub fn merge_params<'a, I>(base: &Url, params: I) -> Url
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let params: Vec<(&str, &str)> = params.into_iter().collect();
    let lookup = |key: &str| {
        params
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    };

    let mut merged: Vec<(String, String)> = Vec::new();
    for (key, value) in base.query_pairs() {
        let value = match lookup(key.as_ref()) {
            Some(_) if merged.iter().any(|(k, _)| *k == key) => continue,
            Some(replacement) => replacement.to_string(),
            None => value.into_owned(),
        };
        merged.push((key.into_owned(), value));
    }
    for (key, value) in &params {
        if !merged.iter().any(|(k, _)| k == key) {
            let value = lookup(*key).unwrap_or(*value);
            merged.push((key.to_string(), value.to_string()));
        }
    }

    let mut url = base.clone();
    if merged.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(merged.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    url
}
