//! Per-column-family filter state compiled from a scan spec.

use std::collections::{BTreeSet, HashSet};

use regex::{bytes::Regex as BytesRegex, Regex};

use crate::{
    error::Error,
    key::TIMESTAMP_MIN,
    scan_spec::{ColumnPredicate, PredicateOp},
};

/// A value predicate with its regular expression compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledPredicate {
    operation: PredicateOp,
    value: Option<Vec<u8>>,
    regex: Option<BytesRegex>,
}

impl CompiledPredicate {
    fn compile(predicate: &ColumnPredicate) -> Result<Self, Error> {
        let regex = match (predicate.operation, &predicate.value) {
            (PredicateOp::Regex, Some(pattern)) => {
                let pattern = std::str::from_utf8(pattern).map_err(|_| {
                    Error::BadScanSpec(format!(
                        "value predicate regexp on {:?} is not UTF-8",
                        predicate.column_family
                    ))
                })?;
                Some(BytesRegex::new(pattern).map_err(|err| {
                    Error::BadScanSpec(format!("invalid value predicate regexp {pattern:?}: {err}"))
                })?)
            }
            _ => None,
        };
        Ok(Self {
            operation: predicate.operation,
            value: predicate.value.clone(),
            regex,
        })
    }

    fn matches(&self, value: Option<&[u8]>) -> bool {
        let Some(operand) = &self.value else {
            return value.map_or(true, <[u8]>::is_empty);
        };
        let value = value.unwrap_or_default();
        match self.operation {
            PredicateOp::Exact => value == operand.as_slice(),
            PredicateOp::Prefix => value.starts_with(operand),
            PredicateOp::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(value)),
        }
    }
}

/// Filter state of one column family: TTL cutoff, version cap, qualifier
/// matchers and value predicates.
#[derive(Debug, Clone)]
pub struct CellFilterInfo {
    /// Cells with an older timestamp have expired.
    pub cutoff_time: i64,
    /// Version cap, `0` for unlimited.
    pub max_versions: u32,
    all_qualifiers: bool,
    exact: HashSet<String>,
    prefixes: BTreeSet<String>,
    regexps: Vec<Regex>,
    predicates: Vec<CompiledPredicate>,
}

impl Default for CellFilterInfo {
    fn default() -> Self {
        Self {
            cutoff_time: TIMESTAMP_MIN,
            max_versions: 0,
            all_qualifiers: false,
            exact: HashSet::new(),
            prefixes: BTreeSet::new(),
            regexps: Vec::new(),
            predicates: Vec::new(),
        }
    }
}

impl CellFilterInfo {
    /// Register a qualifier matcher.
    pub fn add_qualifier(
        &mut self,
        qualifier: &str,
        is_regex: bool,
        is_prefix: bool,
    ) -> Result<(), Error> {
        if is_regex {
            let regex = Regex::new(qualifier).map_err(|err| {
                Error::BadScanSpec(format!("invalid qualifier regexp {qualifier:?}: {err}"))
            })?;
            self.regexps.push(regex);
        } else if is_prefix {
            self.prefixes.insert(qualifier.to_owned());
        } else {
            self.exact.insert(qualifier.to_owned());
        }
        Ok(())
    }

    /// Accept every qualifier regardless of other matchers.
    pub fn accept_all_qualifiers(&mut self) {
        self.all_qualifiers = true;
    }

    /// Register a value predicate.
    pub fn add_predicate(&mut self, predicate: &ColumnPredicate) -> Result<(), Error> {
        self.predicates.push(CompiledPredicate::compile(predicate)?);
        Ok(())
    }

    /// Whether any qualifier matcher was configured.
    pub fn has_qualifier_filter(&self) -> bool {
        !self.all_qualifiers
            && !(self.exact.is_empty() && self.prefixes.is_empty() && self.regexps.is_empty())
    }

    /// Whether value predicates are configured.
    pub fn has_predicates(&self) -> bool {
        !self.predicates.is_empty()
    }

    /// Exact set first, then sorted prefixes, then regular expressions.
    pub fn qualifier_matches(&self, qualifier: &str) -> bool {
        if !self.has_qualifier_filter() || self.exact.contains(qualifier) {
            return true;
        }
        for prefix in &self.prefixes {
            if prefix.as_str() > qualifier {
                break;
            }
            if qualifier.starts_with(prefix.as_str()) {
                return true;
            }
        }
        self.regexps.iter().any(|re| re.is_match(qualifier))
    }

    /// Whether any value predicate accepts `value`.
    pub fn value_matches(&self, value: Option<&[u8]>) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|p| p.matches(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifier_matchers_in_precedence_order() {
        let mut info = CellFilterInfo::default();
        info.add_qualifier("a", false, false).unwrap();
        info.add_qualifier("b", false, true).unwrap();
        info.add_qualifier("^c", true, false).unwrap();
        assert!(info.qualifier_matches("a"));
        assert!(info.qualifier_matches("bxy"));
        assert!(info.qualifier_matches("cz"));
        assert!(!info.qualifier_matches("d"));
    }

    #[test]
    fn no_matcher_accepts_everything() {
        let info = CellFilterInfo::default();
        assert!(info.qualifier_matches("anything"));
        assert!(info.qualifier_matches(""));
    }

    #[test]
    fn family_selection_overrides_qualifiers() {
        let mut info = CellFilterInfo::default();
        info.add_qualifier("only", false, false).unwrap();
        assert!(!info.qualifier_matches("other"));
        info.accept_all_qualifiers();
        assert!(info.qualifier_matches("other"));
    }

    #[test]
    fn prefix_scan_stops_past_qualifier() {
        let mut info = CellFilterInfo::default();
        for prefix in ["ab", "abd", "x"] {
            info.add_qualifier(prefix, false, true).unwrap();
        }
        assert!(info.qualifier_matches("abc"));
        assert!(info.qualifier_matches("abdz"));
        assert!(!info.qualifier_matches("aa"));
        assert!(!info.qualifier_matches("w"));
        assert!(info.qualifier_matches("xylophone"));
    }

    #[test]
    fn bad_qualifier_regexp_is_rejected() {
        let mut info = CellFilterInfo::default();
        assert!(matches!(
            info.add_qualifier("(", true, false),
            Err(Error::BadScanSpec(_))
        ));
    }

    #[test]
    fn value_predicates() {
        let mut info = CellFilterInfo::default();
        assert!(info.value_matches(Some(b"x")));
        info.add_predicate(&ColumnPredicate::new("f", PredicateOp::Exact, "red"))
            .unwrap();
        info.add_predicate(&ColumnPredicate::new("f", PredicateOp::Prefix, "bl"))
            .unwrap();
        info.add_predicate(&ColumnPredicate::new("f", PredicateOp::Regex, "^gr(e|a)y$"))
            .unwrap();
        assert!(info.has_predicates());
        assert!(info.value_matches(Some(b"red")));
        assert!(info.value_matches(Some(b"blue")));
        assert!(info.value_matches(Some(b"gray")));
        assert!(!info.value_matches(Some(b"green")));
        assert!(!info.value_matches(None));
    }

    #[test]
    fn absent_operand_matches_absent_value() {
        let mut info = CellFilterInfo::default();
        info.add_predicate(&ColumnPredicate::absent("f")).unwrap();
        assert!(info.value_matches(None));
        assert!(info.value_matches(Some(b"")));
        assert!(!info.value_matches(Some(b"v")));
    }
}
