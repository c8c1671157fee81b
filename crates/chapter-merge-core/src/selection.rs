use std::collections::BTreeSet;

/// Which candidate sessions the user wants merged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Keys(BTreeSet<String>),
}

impl Selection {
    /// An empty list selects everything. So does the word `all`, which
    /// [`sieve`] handles.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys
            .into_iter()
            .map(|k| {
                let k: String = k.into();
                k.trim().to_string()
            })
            .filter(|k| !k.is_empty())
            .collect();
        if keys.is_empty() {
            Selection::All
        } else {
            Selection::Keys(keys)
        }
    }
}

/// Candidates split according to a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sieve {
    pub selected: Vec<String>,
    pub deselected: Vec<String>,
    /// Requested keys that are not candidates.
    pub unknown: Vec<String>,
}

pub fn sieve<'a, I>(candidates: I, selection: &Selection) -> Sieve
where
    I: IntoIterator<Item = &'a str>,
{
    let candidates: BTreeSet<&str> = candidates.into_iter().collect();

    match selection {
        Selection::All => Sieve {
            selected: candidates.iter().map(|k| k.to_string()).collect(),
            ..Sieve::default()
        },
        Selection::Keys(keys) if keys.contains("all") => Sieve {
            selected: candidates.iter().map(|k| k.to_string()).collect(),
            deselected: Vec::new(),
            unknown: keys
                .iter()
                .filter(|k| *k != "all" && !candidates.contains(k.as_str()))
                .cloned()
                .collect(),
        },
        Selection::Keys(keys) => {
            let mut result = Sieve::default();
            for candidate in &candidates {
                if keys.contains(*candidate) {
                    result.selected.push(candidate.to_string());
                } else {
                    result.deselected.push(candidate.to_string());
                }
            }
            result.unknown = keys
                .iter()
                .filter(|k| !candidates.contains(k.as_str()))
                .cloned()
                .collect();
            result
        }
    }
}
