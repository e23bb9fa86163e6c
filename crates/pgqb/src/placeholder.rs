//! `?` → `$N` placeholder rewriting.
//!
//! Fragments are rewritten as they are added to a builder, so numbering always
//! continues from the number of parameters already bound.

use crate::value::Value;

/// Outcome of rewriting one fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    /// Fragment with markers replaced.
    pub sql: String,
    /// Values for which no `?` marker was left to replace.
    pub surplus: usize,
}

/// Replace `?` markers in `fragment` left to right, one per value, appending
/// each value to `params`.
///
/// The marker for the k-th value becomes `$N` with `N = params.len() + 1` at the
/// moment that value is appended. Markers without a value stay as literal `?`.
/// Values without a marker are still appended and counted in
/// [`Rewritten::surplus`].
pub fn rewrite<I>(fragment: &str, values: I, params: &mut Vec<Value>) -> Rewritten
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let mut sql = String::with_capacity(fragment.len() + 8);
    let mut rest = fragment;
    let mut surplus = 0;

    for value in values {
        params.push(value.into());
        match rest.find('?') {
            Some(pos) => {
                sql.push_str(&rest[..pos]);
                sql.push('$');
                sql.push_str(&params.len().to_string());
                rest = &rest[pos + 1..];
            }
            None => surplus += 1,
        }
    }
    sql.push_str(rest);

    Rewritten { sql, surplus }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_continue_from_existing_params() {
        let mut params = vec![Value::from("already"), Value::from("bound")];
        let out = rewrite("a = ? AND b = ?", [1, 2], &mut params);
        assert_eq!(out.sql, "a = $3 AND b = $4");
        assert_eq!(out.surplus, 0);
        assert_eq!(params[2..], [Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn no_values_leaves_fragment_untouched() {
        let mut params = Vec::new();
        let out = rewrite("deleted_at IS NULL", Vec::<Value>::new(), &mut params);
        assert_eq!(out.sql, "deleted_at IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn under_supply_keeps_literal_markers() {
        let mut params = Vec::new();
        let out = rewrite("a = ? AND b = ?", [1], &mut params);
        assert_eq!(out.sql, "a = $1 AND b = ?");
        assert_eq!(out.surplus, 0);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn over_supply_is_counted() {
        let mut params = Vec::new();
        let out = rewrite("a = ?", [1, 2, 3], &mut params);
        assert_eq!(out.sql, "a = $1");
        assert_eq!(out.surplus, 2);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn multibyte_text_around_markers() {
        let mut params = Vec::new();
        let out = rewrite("name = 'ёж' OR name = ?", ["ёж"], &mut params);
        assert_eq!(out.sql, "name = 'ёж' OR name = $1");
    }

    #[test]
    fn double_digit_numbers() {
        let mut params = vec![Value::Null; 9];
        let out = rewrite("x IN (?, ?)", [10, 11], &mut params);
        assert_eq!(out.sql, "x IN ($10, $11)");
    }
}
