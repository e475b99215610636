//! Fuzzy name matching for items, containers and exits.

/// Split a trailing `#N` selector off a search term. `sword#2` asks for the second sword.
pub fn split_match_number(search: &str) -> (&str, usize) {
    if let Some((name, n)) = search.rsplit_once('#') {
        if let Ok(n) = n.trim().parse::<usize>() {
            if n > 0 {
                return (name.trim(), n);
            }
        }
    }
    (search, 1)
}

/// Find `search` among `candidates`, case-insensitively.
///
/// Returns `(close, exact)` indices. A prefix hit counts as close and an equal
/// string as exact; when no prefix hit exists, a substring hit is accepted as
/// close instead. Ties go to the first candidate found, and a `#N` suffix
/// selects the N-th hit.
pub fn find_match_in<S: AsRef<str>>(search: &str, candidates: &[S]) -> (Option<usize>, Option<usize>) {
    let trimmed = search.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    let (name, nth) = split_match_number(trimmed);
    let needle = name.to_lowercase();
    if needle.is_empty() {
        return (None, None);
    }

    let mut close = None;
    let mut exact = None;
    let mut close_ct = 0;
    let mut exact_ct = 0;

    for (idx, candidate) in candidates.iter().enumerate() {
        let hay = candidate.as_ref().to_lowercase();
        if !hay.starts_with(&needle) {
            continue;
        }
        close_ct += 1;
        if close_ct == nth {
            close = Some(idx);
        }
        if hay == needle {
            exact_ct += 1;
            if exact_ct == nth {
                exact = Some(idx);
                break;
            }
        }
    }

    if close.is_none() {
        let mut contains_ct = 0;
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidate.as_ref().to_lowercase().contains(&needle) {
                contains_ct += 1;
                if contains_ct == nth {
                    close = Some(idx);
                    break;
                }
            }
        }
    }

    (close, exact)
}
