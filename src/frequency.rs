//! Frequency aggregation across sampled answers.

use crate::literal::Literal;

/// `(value, count)` pairs, most frequent first. Equal counts keep the order
/// in which values were first seen.
pub type FrequencyTable<T> = Vec<(T, usize)>;

/// Counts `values` and returns at most `limit` entries.
pub fn most_common<T, I>(values: I, limit: Option<usize>) -> FrequencyTable<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    // Linear lookup: f64 literals are not hashable.
    let mut table: FrequencyTable<T> = Vec::new();
    for value in values {
        match table.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => table.push((value, 1)),
        }
    }

    table.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(limit) = limit {
        table.truncate(limit);
    }
    table
}

/// Counts the elements of every list, flattened one level.
pub fn most_common_flattened<T, I>(lists: I, limit: Option<usize>) -> FrequencyTable<T>
where
    T: PartialEq,
    I: IntoIterator<Item = Vec<T>>,
{
    most_common(lists.into_iter().flatten(), limit)
}

/// Aggregates parsed literals: when every value is a list the elements are
/// counted, otherwise the values themselves.
pub fn most_common_literals(
    values: Vec<Literal>,
    limit: Option<usize>,
) -> FrequencyTable<Literal> {
    let all_lists =
        !values.is_empty() && values.iter().all(|value| matches!(value, Literal::List(_)));
    if !all_lists {
        return most_common(values, limit);
    }

    let lists = values.into_iter().filter_map(|value| match value {
        Literal::List(items) => Some(items),
        _ => None,
    });
    most_common_flattened(lists, limit)
}
