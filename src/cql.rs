//! Structural validation for Confluence Query Language (CQL).
//!
//! This is deliberately not a CQL parser. Confluence sites ship their own
//! fields and functions, and rejecting valid-but-unknown syntax would make
//! the search tool useless on those sites. Instead [`validate_cql`] checks
//! only the skeleton every query must have:
//!
//! ```text
//! query     := condition ( (AND | OR) condition )* [ ORDER BY <anything> ]
//! condition := [NOT] <A> operator <B>
//! operator  := NOT IN | IN | != | !~ | >= | <= | = | ~ | > | <
//! ```
//!
//! All scanning happens outside double-quoted literals. An unescaped `"`
//! toggles the quoted state; `\"` does not. Keywords match
//! case-insensitively and only on ASCII word boundaries, so `ORDERING` is
//! never read as `ORDER` and `NOTIN` is never read as `NOT IN`.

use thiserror::Error;

/// Boolean connector between two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl std::fmt::Display for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connector::And => f.write_str("AND"),
            Connector::Or => f.write_str("OR"),
        }
    }
}

/// Structural keyword that must not appear in the middle of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    Or,
    Not,
    OrderBy,
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Keyword::And => f.write_str("AND"),
            Keyword::Or => f.write_str("OR"),
            Keyword::Not => f.write_str("NOT"),
            Keyword::OrderBy => f.write_str("ORDER BY"),
        }
    }
}

/// Comparison operator recognized inside a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Contains,
    NotContains,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Contains => "~",
            Operator::NotContains => "!~",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }
}

/// Why a query was rejected. `Display` is the message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CqlError {
    #[error("CQL is empty")]
    Empty,
    #[error("ORDER BY must have a following expression")]
    OrderByWithoutExpression,
    #[error("Multiple ORDER BY is not allowed")]
    MultipleOrderBy,
    #[error("Missing condition before ORDER BY")]
    MissingConditionBeforeOrderBy,
    #[error("\"{0}\" must be followed by a condition")]
    DanglingConnector(Connector),
    #[error("Empty condition")]
    EmptyCondition,
    #[error("NOT must be followed by a condition")]
    DanglingNot,
    #[error("Missing operator")]
    MissingOperator,
    #[error("Missing left operand (A)")]
    MissingLeftOperand,
    #[error("Missing right operand (B)")]
    MissingRightOperand,
    #[error("Unexpected keyword \"{0}\" inside a condition")]
    StrayKeyword(Keyword),
}

/// Checks the structural shape of a CQL query.
///
/// The `ORDER BY` tail, if any, is only checked for presence of an
/// expression; its contents are passed through unexamined.
///
/// # Example
///
/// ```rust
/// use confluence_mcp::cql::{validate_cql, CqlError};
///
/// assert!(validate_cql(r#"title = "ORDER BY created" AND space = ABC"#).is_ok());
/// assert_eq!(
///     validate_cql("title = a ORDER BY created ORDER BY updated"),
///     Err(CqlError::MultipleOrderBy)
/// );
/// ```
pub fn validate_cql(cql: &str) -> Result<(), CqlError> {
    let input = cql.trim();
    if input.is_empty() {
        return Err(CqlError::Empty);
    }

    let condition = match find_order_by(input.as_bytes()) {
        Some(idx) => {
            let expression = strip_order_by(&input[idx..]).trim();
            if expression.is_empty() {
                return Err(CqlError::OrderByWithoutExpression);
            }
            if find_order_by(expression.as_bytes()).is_some() {
                return Err(CqlError::MultipleOrderBy);
            }
            let condition = input[..idx].trim();
            if condition.is_empty() {
                return Err(CqlError::MissingConditionBeforeOrderBy);
            }
            condition
        }
        None => input,
    };

    let mut rest = condition;
    loop {
        let b = rest.as_bytes();
        let next = scan_outside_quotes(b, |i| {
            if match_word_ci(b, i, "AND") {
                Some((3, Connector::And))
            } else if match_word_ci(b, i, "OR") {
                Some((2, Connector::Or))
            } else {
                None
            }
        });

        let segment = match &next {
            Some(hit) => &rest[..hit.at],
            None => rest,
        };
        validate_condition(segment)?;

        let Some(hit) = next else { break };
        rest = rest[hit.at + hit.len..].trim();
        if rest.is_empty() {
            return Err(CqlError::DanglingConnector(hit.kind));
        }
    }

    Ok(())
}

/// Prepends a site-wide default condition to a query.
///
/// Produces `(<default>) AND (<condition>)` and keeps the query's
/// `ORDER BY` tail at the very end, so the default never lands inside the
/// sort clause. An empty default leaves the query untouched.
pub fn merge_default_cql(cql: &str, default_cql: &str) -> String {
    let default_cql = default_cql.trim();
    if default_cql.is_empty() {
        return cql.to_string();
    }

    match find_order_by(cql.as_bytes()) {
        Some(idx) => {
            let condition = cql[..idx].trim();
            let order_by = cql[idx..].trim();
            format!("({}) AND ({}) {}", default_cql, condition, order_by)
                .trim()
                .to_string()
        }
        None => format!("({}) AND ({})", default_cql, cql.trim()),
    }
}

// ── Condition ───────────────────────────────────────────────────────────

fn validate_condition(segment: &str) -> Result<(), CqlError> {
    let raw = segment.trim();
    if raw.is_empty() {
        return Err(CqlError::EmptyCondition);
    }

    // Byte ranges in `raw` where a keyword is legitimately part of the syntax.
    let mut allowed: Vec<std::ops::Range<usize>> = Vec::with_capacity(2);

    let raw_bytes = raw.as_bytes();
    let (body, offset) = if match_word_ci(raw_bytes, 0, "NOT") {
        let end = skip_ws(raw_bytes, 3);
        allowed.push(0..end);
        let body = raw[end..].trim_start();
        if body.is_empty() {
            return Err(CqlError::DanglingNot);
        }
        (body, raw.len() - body.len())
    } else {
        (raw, 0)
    };

    let op = find_operator(body.as_bytes()).ok_or(CqlError::MissingOperator)?;

    if body[..op.at].trim().is_empty() {
        return Err(CqlError::MissingLeftOperand);
    }
    if body[op.at + op.len..].trim().is_empty() {
        return Err(CqlError::MissingRightOperand);
    }

    allowed.push(offset + op.at..offset + op.at + op.len);

    if let Some(keyword) = find_stray_keyword(raw_bytes, &allowed) {
        return Err(CqlError::StrayKeyword(keyword));
    }

    Ok(())
}

fn find_operator(b: &[u8]) -> Option<Hit<Operator>> {
    scan_outside_quotes(b, |i| {
        if match_word_ci(b, i, "NOT") {
            // "NOTIN" and "NOT=" are not operators.
            if !b.get(i + 3).is_some_and(|c| c.is_ascii_whitespace()) {
                return None;
            }
            let j = skip_ws(b, i + 3);
            if match_word_ci(b, j, "IN") {
                return Some((j + 2 - i, Operator::NotIn));
            }
        }
        if match_word_ci(b, i, "IN") {
            return Some((2, Operator::In));
        }

        match b.get(i..i + 2) {
            Some(b"!=") => return Some((2, Operator::NotEq)),
            Some(b"!~") => return Some((2, Operator::NotContains)),
            Some(b">=") => return Some((2, Operator::Gte)),
            Some(b"<=") => return Some((2, Operator::Lte)),
            _ => {}
        }

        match b[i] {
            b'=' => Some((1, Operator::Eq)),
            b'~' => Some((1, Operator::Contains)),
            b'>' => Some((1, Operator::Gt)),
            b'<' => Some((1, Operator::Lt)),
            _ => None,
        }
    })
}

fn find_stray_keyword(b: &[u8], allowed: &[std::ops::Range<usize>]) -> Option<Keyword> {
    let is_allowed = |pos: usize| allowed.iter().any(|r| r.contains(&pos));

    let order_by = scan_all_outside_quotes(b, |i| order_by_at(b, i).map(|len| (len, Keyword::OrderBy)));
    let connectors = scan_all_outside_quotes(b, |i| {
        if match_word_ci(b, i, "AND") {
            Some((3, Keyword::And))
        } else if match_word_ci(b, i, "OR") {
            Some((2, Keyword::Or))
        } else if match_word_ci(b, i, "NOT") {
            Some((3, Keyword::Not))
        } else {
            None
        }
    });

    order_by
        .into_iter()
        .chain(connectors)
        .find(|hit| !is_allowed(hit.at))
        .map(|hit| hit.kind)
}

// ── ORDER BY ────────────────────────────────────────────────────────────

fn find_order_by(b: &[u8]) -> Option<usize> {
    scan_outside_quotes(b, |i| order_by_at(b, i).map(|len| (len, ()))).map(|hit| hit.at)
}

/// Length of an `ORDER <ws> BY` keyword pair starting at `i`.
fn order_by_at(b: &[u8], i: usize) -> Option<usize> {
    if !match_word_ci(b, i, "ORDER") {
        return None;
    }
    let j = skip_ws(b, i + 5);
    if j == i + 5 || !match_word_ci(b, j, "BY") {
        return None;
    }
    Some(j + 2 - i)
}

/// Drops the leading `ORDER BY` keyword pair. `s` must start with one.
fn strip_order_by(s: &str) -> &str {
    match order_by_at(s.as_bytes(), 0) {
        Some(len) => &s[len..],
        None => s,
    }
}

// ── Scanner ─────────────────────────────────────────────────────────────

struct Hit<K> {
    at: usize,
    len: usize,
    kind: K,
}

/// Calls `on_token` at every byte offset outside double quotes and
/// returns the first token it reports.
fn scan_outside_quotes<K>(
    b: &[u8],
    mut on_token: impl FnMut(usize) -> Option<(usize, K)>,
) -> Option<Hit<K>> {
    let mut in_quotes = false;
    for i in 0..b.len() {
        if b[i] == b'"' && !(i > 0 && b[i - 1] == b'\\') {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some((len, kind)) = on_token(i) {
            return Some(Hit { at: i, len, kind });
        }
    }
    None
}

/// Like [`scan_outside_quotes`] but collects every token.
fn scan_all_outside_quotes<K>(
    b: &[u8],
    mut on_token: impl FnMut(usize) -> Option<(usize, K)>,
) -> Vec<Hit<K>> {
    let mut hits = Vec::new();
    let mut in_quotes = false;
    for i in 0..b.len() {
        if b[i] == b'"' && !(i > 0 && b[i - 1] == b'\\') {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some((len, kind)) = on_token(i) {
            hits.push(Hit { at: i, len, kind });
        }
    }
    hits
}

fn is_word_byte(c: Option<&u8>) -> bool {
    c.is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
}

/// Case-insensitive keyword match at `i` bounded by non-word bytes.
fn match_word_ci(b: &[u8], i: usize, word: &str) -> bool {
    let end = i + word.len();
    let Some(candidate) = b.get(i..end) else {
        return false;
    };
    if !candidate.eq_ignore_ascii_case(word.as_bytes()) {
        return false;
    }
    let before = if i == 0 { None } else { b.get(i - 1) };
    !is_word_byte(before) && !is_word_byte(b.get(end))
}

fn skip_ws(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_queries() {
        let valid = [
            r#"title = "Hello""#,
            "NOT type = page",
            r#"status NOT IN ("a","b")"#,
            r#"title = "a AND b" OR space = ABC"#,
            r#"title = "ORDER BY created" AND space = ABC"#,
            "title = abc ORDER BY created DESC",
            "tItLe = abc aNd space = ABC",
            "title = a AND space = ABC",
            "title = a OR space = ABC",
            "type IN (page, blogpost)",
            "type != page",
            "title = ORDER",
            "title = a ORDER created",
            "text !~ draft and created >= 2024-01-01 or created <= now()",
            "label ~ ordering",
            "ordering = 1 order by title",
            "status not   in (archived)",
        ];
        for cql in valid {
            assert_eq!(validate_cql(cql), Ok(()), "expected valid: {}", cql);
        }
    }

    #[test]
    fn test_invalid_queries() {
        let cases = [
            ("   ", "CQL is empty"),
            ("AND title = a", "Empty condition"),
            ("OR title = a", "Empty condition"),
            ("title", "Missing operator"),
            ("= a", "Missing left operand (A)"),
            ("a =", "Missing right operand (B)"),
            ("NOT", "NOT must be followed by a condition"),
            ("title = a AND", "\"AND\" must be followed by a condition"),
            ("title = a OR", "\"OR\" must be followed by a condition"),
            ("title = a ORDER BY   ", "ORDER BY must have a following expression"),
            ("ORDER BY created", "Missing condition before ORDER BY"),
            (
                "title = a ORDER BY created ORDER BY updated",
                "Multiple ORDER BY is not allowed",
            ),
            ("status NOTIN (a)", "Missing operator"),
            ("a = b NOT c = d", "Unexpected keyword \"NOT\" inside a condition"),
            ("a NOT= b", "Unexpected keyword \"NOT\" inside a condition"),
        ];
        for (cql, message) in cases {
            let err = validate_cql(cql).expect_err(cql);
            assert_eq!(err.to_string(), message, "query: {}", cql);
        }
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        assert_eq!(validate_cql(r#"title = "say \"AND\" now""#), Ok(()));
        assert_eq!(validate_cql(r#"title = "x \" AND y""#), Ok(()));
    }

    #[test]
    fn test_unterminated_quote_hides_rest() {
        // Everything after the opening quote is literal, including the connector.
        assert_eq!(validate_cql(r#"title = "abc AND"#), Ok(()));
    }

    #[test]
    fn test_stray_keyword_after_allowed_unary_not() {
        assert_eq!(
            validate_cql("NOT a = b NOT c"),
            Err(CqlError::StrayKeyword(Keyword::Not))
        );
    }

    #[test]
    fn test_not_in_operator_span_is_not_stray() {
        assert_eq!(validate_cql("NOT status NOT IN (a, b)"), Ok(()));
    }

    #[test]
    fn test_order_by_needs_whitespace_between_words() {
        // "ORDER" alone is just a value; no sort clause is detected.
        assert_eq!(find_order_by(b"title = ORDER"), None);
        assert_eq!(find_order_by(b"a = b order\tby c"), Some(6));
        assert_eq!(find_order_by(b"a = b ORDERBY c"), None);
    }

    #[test]
    fn test_merge_default_cql_without_order_by() {
        assert_eq!(
            merge_default_cql("title ~ deploy", "space = OPS"),
            "(space = OPS) AND (title ~ deploy)"
        );
    }

    #[test]
    fn test_merge_default_cql_keeps_order_by_last() {
        let merged = merge_default_cql("title ~ deploy ORDER BY created DESC", "space = OPS");
        assert_eq!(merged, "(space = OPS) AND (title ~ deploy) ORDER BY created DESC");
        assert_eq!(validate_cql(&merged), Ok(()));
    }

    #[test]
    fn test_merge_default_cql_ignores_quoted_order_by() {
        let merged = merge_default_cql(r#"title = "ORDER BY x""#, "type = page");
        assert_eq!(merged, r#"(type = page) AND (title = "ORDER BY x")"#);
    }

    #[test]
    fn test_merge_empty_default_is_identity() {
        assert_eq!(merge_default_cql("a = b", "   "), "a = b");
    }
}
