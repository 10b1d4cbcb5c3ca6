//! Path patterns and the parameters they capture.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! | segment        | matches                                   |
//! |----------------|-------------------------------------------|
//! | `about`        | exactly `about`                           |
//! | `*`            | any single segment, nothing is captured   |
//! | `:name`        | any non-empty segment, captured as text   |
//! | `:name:int`    | a segment parsing as `i64`                |
//! | `:name:float`  | a segment parsing as `f64`                |
//! | `:name:bool`   | `true`/`false`/`1`/`0`, ignoring case      |
//! | `:name:str`    | same as `:name`                           |
//!
//! A path matches only when it has exactly as many segments as the pattern, so
//! `/kwtest/:testnum` matches `/kwtest/7` but neither `/kwtest/7/extra` nor `/kwtest/7/`.
//! Typed parameters are converted while matching: `/users/:id:int` does not match
//! `/users/abc`.
//!
//! ```
//! use plus_web::pattern::{ParamValue, PathPattern};
//!
//! let pattern = PathPattern::parse("/product/:id:int").unwrap();
//! let params = pattern.matches("/product/42").unwrap();
//! assert_eq!(params.get("id"), Some(&ParamValue::Int(42)));
//! assert!(pattern.matches("/product/latest").is_none());
//! ```

use crate::error::PatternError;
use std::collections::HashSet;
use std::fmt;

/// Declared type of a pattern parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Str,
    Int,
    Float,
    Bool,
}

impl ParamType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }

    /// Converts a raw segment, `None` if it isn't a value of this type.
    fn convert(self, raw: &str) -> Option<ParamValue> {
        match self {
            Self::Str => Some(ParamValue::Str(raw.to_owned())),
            Self::Int => raw.parse().ok().map(ParamValue::Int),
            Self::Float => raw.parse().ok().map(ParamValue::Float),
            Self::Bool => {
                if raw.eq_ignore_ascii_case("true") || raw == "1" {
                    Some(ParamValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
                    Some(ParamValue::Bool(false))
                } else {
                    None
                }
            }
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A captured parameter value, converted to its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ParamValue {
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Str(_) => ParamType::Str,
            Self::Int(_) => ParamType::Int,
            Self::Float(_) => ParamType::Float,
            Self::Bool(_) => ParamType::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// One captured parameter: its name, the raw segment text and the converted value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    raw: String,
    value: ParamValue,
}

impl Param {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> &ParamValue {
        &self.value
    }

    pub fn param_type(&self) -> ParamType {
        self.value.param_type()
    }
}

/// Parameters captured from a request path, in pattern order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    params: Vec<Param>,
}

impl PathParams {
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// The converted value of the parameter called `name`.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&ParamValue> {
        self.param(name).map(Param::value)
    }

    pub fn param(&self, name: impl AsRef<str>) -> Option<&Param> {
        let name = name.as_ref();
        self.params.iter().find(|param| param.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
    Param { name: String, param_type: ParamType },
}

impl Segment {
    fn parse(pattern: &str, segment: &str) -> Result<Self, PatternError> {
        if segment == "*" {
            return Ok(Segment::Wildcard);
        }

        let Some(param) = segment.strip_prefix(':') else {
            return Ok(Segment::Literal(segment.to_owned()));
        };

        let mut parts = param.split(':');
        let name = parts.next().unwrap_or_default();
        let type_name = parts.next();

        if parts.next().is_some() {
            return Err(PatternError::MalformedParam { pattern: pattern.to_owned(), segment: segment.to_owned() });
        }

        if name.is_empty() {
            return Err(PatternError::EmptyParamName { pattern: pattern.to_owned() });
        }

        let param_type = match type_name {
            None => ParamType::Str,
            Some(type_name) => ParamType::from_name(type_name).ok_or_else(|| PatternError::UnknownParamType {
                pattern: pattern.to_owned(),
                type_name: type_name.to_owned(),
            })?,
        };

        Ok(Segment::Param { name: name.to_owned(), param_type })
    }
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the pattern doesn't start with `/`, a parameter has no
    /// name or more than one type qualifier, the type is not one of `str`, `int`, `float`,
    /// `bool`, or two parameters share a name.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash { pattern: pattern.to_owned() });
        }

        let segments = pattern.split('/').map(|segment| Segment::parse(pattern, segment)).collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for segment in &segments {
            if let Segment::Param { name, .. } = segment {
                if !seen.insert(name.as_str()) {
                    return Err(PatternError::DuplicateParam { pattern: pattern.to_owned(), name: name.clone() });
                }
            }
        }

        Ok(Self { raw: pattern.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern has no wildcard and no parameter.
    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|segment| matches!(segment, Segment::Literal(_)))
    }

    /// Matches a request path (without query string).
    ///
    /// Returns the captured parameters, or `None` when the segment counts differ, a
    /// literal differs, or a parameter segment is empty or not of the declared type.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = Vec::new();
        let mut path_segments = path.split('/');

        for segment in &self.segments {
            let raw = path_segments.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if literal != raw {
                        return None;
                    }
                }
                Segment::Wildcard => {}
                Segment::Param { name, param_type } => {
                    if raw.is_empty() {
                        return None;
                    }
                    let value = param_type.convert(raw)?;
                    params.push(Param { name: name.clone(), raw: raw.to_owned(), value });
                }
            }
        }

        if path_segments.next().is_some() {
            return None;
        }

        Some(PathParams { params })
    }

    /// Whether one of the two patterns matches the other's text, i.e. some paths could be
    /// served by both.
    pub fn overlaps(&self, other: &PathPattern) -> bool {
        self.raw == other.raw || self.matches(&other.raw).is_some() || other.matches(&self.raw).is_some()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compiles `pattern` and matches `path` against it in one go.
///
/// # Errors
///
/// An invalid pattern is an error, never a silent non-match.
pub fn match_route(path: &str, pattern: &str) -> Result<Option<PathParams>, PatternError> {
    Ok(PathPattern::parse(pattern)?.matches(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_match() {
        let params = match_route("/about", "/about").unwrap().unwrap();
        assert!(params.is_empty());
        assert!(match_route("/about", "/contact").unwrap().is_none());
        assert!(PathPattern::parse("/about/team").unwrap().is_literal());
    }

    #[test]
    fn str_param() {
        let params = match_route("/kwtest/7", "/kwtest/:testnum").unwrap().unwrap();
        let param = params.param("testnum").unwrap();

        assert_eq!(param.name(), "testnum");
        assert_eq!(param.raw(), "7");
        assert_eq!(param.param_type(), ParamType::Str);
        assert_eq!(params.get("testnum").and_then(ParamValue::as_str), Some("7"));
    }

    #[test]
    fn typed_params() {
        let params = match_route("/product/42/1.5/TRUE", "/product/:id:int/:ratio:float/:on:bool").unwrap().unwrap();

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("id"), Some(&ParamValue::Int(42)));
        assert_eq!(params.get("ratio").and_then(ParamValue::as_float), Some(1.5));
        assert_eq!(params.get("on").and_then(ParamValue::as_bool), Some(true));
        assert_eq!(params.param("id").unwrap().param_type(), ParamType::Int);
        assert_eq!(params.get("id").unwrap().to_string(), "42");
    }

    #[test]
    fn typed_param_mismatch_is_no_match() {
        assert!(match_route("/product/abc", "/product/:id:int").unwrap().is_none());
        assert!(match_route("/flag/yes", "/flag/:on:bool").unwrap().is_none());
        assert!(match_route("/ratio/x1", "/ratio/:r:float").unwrap().is_none());
    }

    #[test]
    fn explicit_str_type() {
        let params = match_route("/user/bob", "/user/:name:str").unwrap().unwrap();
        assert_eq!(params.get("name"), Some(&ParamValue::Str("bob".into())));
    }

    #[test]
    fn segment_count_must_be_equal() {
        assert!(match_route("/kwtest/7/extra", "/kwtest/:testnum").unwrap().is_none());
        assert!(match_route("/kwtest", "/kwtest/:testnum").unwrap().is_none());
        assert!(match_route("/kwtest/7/", "/kwtest/:testnum").unwrap().is_none());
    }

    #[test]
    fn empty_segment_binds_nothing() {
        assert!(match_route("/kwtest/", "/kwtest/:testnum").unwrap().is_none());
    }

    #[test]
    fn wildcard_matches_one_segment() {
        let params = match_route("/files/anything/raw", "/files/*/raw").unwrap().unwrap();
        assert!(params.is_empty());
        assert!(match_route("/files/a/b/raw", "/files/*/raw").unwrap().is_none());
    }

    #[test]
    fn root_pattern() {
        assert!(match_route("/", "/").unwrap().is_some());
        assert!(match_route("/index", "/").unwrap().is_none());
    }

    #[test]
    fn invalid_patterns() {
        assert!(matches!(match_route("/a", "/a/:b:uuid"), Err(PatternError::UnknownParamType { type_name, .. }) if type_name == "uuid"));
        assert!(matches!(PathPattern::parse("a/b"), Err(PatternError::MissingLeadingSlash { .. })));
        assert!(matches!(PathPattern::parse("/a/:"), Err(PatternError::EmptyParamName { .. })));
        assert!(matches!(PathPattern::parse("/a/:b:int:x"), Err(PatternError::MalformedParam { .. })));
        assert!(matches!(PathPattern::parse("/a/:id/:id"), Err(PatternError::DuplicateParam { name, .. }) if name == "id"));
    }

    #[test]
    fn overlapping_patterns() {
        let by_name = PathPattern::parse("/user/:name").unwrap();
        let by_id = PathPattern::parse("/user/:id:int").unwrap();
        let literal = PathPattern::parse("/user/me").unwrap();
        let other = PathPattern::parse("/team/:name").unwrap();

        assert!(by_name.overlaps(&by_id));
        assert!(by_id.overlaps(&by_name));
        assert!(by_name.overlaps(&literal));
        assert!(!by_id.overlaps(&literal));
        assert!(!by_name.overlaps(&other));
    }

    #[test]
    fn params_iterate_in_pattern_order() {
        let params = match_route("/a/1/b/2", "/a/:first/b/:second").unwrap().unwrap();
        let names = params.iter().map(Param::name).collect::<Vec<_>>();
        assert_eq!(names, ["first", "second"]);
    }
}
