//! Command parameter signatures and argument binding.

use crate::error::CommandError;
use std::collections::HashMap;
use std::fmt;

/// Type a token is converted to before the callback sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgType {
    /// Kept as written.
    #[default]
    Str,
    /// Signed integer.
    Int,
    /// Floating point number.
    Float,
    /// `true/false`, `yes/no`, `on/off`, `1/0`.
    Bool,
}

impl ArgType {
    /// Converts a raw token, returning `None` when it does not parse.
    pub fn convert(self, token: &str) -> Option<ArgValue> {
        match self {
            Self::Str => Some(ArgValue::Str(token.to_string())),
            Self::Int => token.parse().ok().map(ArgValue::Int),
            Self::Float => token.parse().ok().map(ArgValue::Float),
            Self::Bool => match token.to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "on" | "1" | "enable" => Some(ArgValue::Bool(true)),
                "false" | "no" | "n" | "off" | "0" | "disable" => Some(ArgValue::Bool(false)),
                _ => None,
            },
        }
    }

    /// Name used in error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "number",
            Self::Bool => "boolean",
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Text.
    Str(String),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Values collected by a variadic parameter.
    List(Vec<ArgValue>),
}

impl ArgValue {
    /// Text value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value; integers widen.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean value.
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Items of a variadic list.
    pub fn as_list(&self) -> Option<&[ArgValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// How a parameter consumes tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Exactly one token, which must be present.
    Required,
    /// One token if present, else the default (or nothing).
    Optional(Option<ArgValue>),
    /// Every remaining token, bound positionally as one list.
    Variadic,
    /// Every remaining token joined with spaces, bound by name.
    Rest {
        /// Fail when no tokens are left.
        required: bool,
        /// Bound when no tokens are left.
        default: Option<ArgValue>,
    },
}

/// One declared parameter of a command (the context is implicit).
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Name, used for keyword binding and error messages.
    pub name: String,
    /// Consumption rule.
    pub kind: ParamKind,
    /// Conversion applied to each consumed token.
    pub ty: ArgType,
}

impl Param {
    fn with_kind(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: ArgType::Str,
        }
    }

    /// A required positional parameter.
    pub fn required(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Required)
    }

    /// An optional positional parameter without default.
    pub fn optional(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Optional(None))
    }

    /// An optional positional parameter bound to `default` when missing.
    pub fn with_default(name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        Self::with_kind(name, ParamKind::Optional(Some(default.into())))
    }

    /// A trailing parameter collecting all remaining tokens.
    pub fn variadic(name: impl Into<String>) -> Self {
        Self::with_kind(name, ParamKind::Variadic)
    }

    /// A keyword parameter taking the rest of the line; left unset when empty.
    pub fn rest(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            ParamKind::Rest {
                required: false,
                default: None,
            },
        )
    }

    /// A keyword parameter taking the rest of the line, which must be non-empty.
    pub fn rest_required(name: impl Into<String>) -> Self {
        Self::with_kind(
            name,
            ParamKind::Rest {
                required: true,
                default: None,
            },
        )
    }

    /// A keyword parameter taking the rest of the line, or `default`.
    pub fn rest_or(name: impl Into<String>, default: impl Into<ArgValue>) -> Self {
        Self::with_kind(
            name,
            ParamKind::Rest {
                required: false,
                default: Some(default.into()),
            },
        )
    }

    /// Sets the conversion type.
    #[must_use]
    pub const fn typed(mut self, ty: ArgType) -> Self {
        self.ty = ty;
        self
    }

    const fn is_trailing(&self) -> bool {
        matches!(self.kind, ParamKind::Variadic | ParamKind::Rest { .. })
    }
}

/// Checks a signature: trailing parameters must come last and there can be at
/// most one, and required positionals cannot follow optional ones.
pub fn validate_signature(params: &[Param]) -> Result<(), String> {
    let mut seen_optional = false;
    for (index, param) in params.iter().enumerate() {
        if param.is_trailing() && index + 1 != params.len() {
            return Err(format!(
                "parameter '{}' consumes the rest of the line and must be last",
                param.name
            ));
        }
        match param.kind {
            ParamKind::Required if seen_optional => {
                return Err(format!(
                    "required parameter '{}' follows an optional one",
                    param.name
                ));
            }
            ParamKind::Optional(_) => seen_optional = true,
            _ => {}
        }
        if params[..index].iter().any(|p| p.name == param.name) {
            return Err(format!("parameter '{}' is declared twice", param.name));
        }
    }
    Ok(())
}

/// Positional and keyword arguments bound for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<ArgValue>,
    keyword: HashMap<String, ArgValue>,
}

impl Args {
    /// Builds arguments directly.
    pub fn new(positional: Vec<ArgValue>, keyword: HashMap<String, ArgValue>) -> Self {
        Self { positional, keyword }
    }

    /// Positional values in declaration order.
    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    /// Keyword values.
    pub const fn keyword(&self) -> &HashMap<String, ArgValue> {
        &self.keyword
    }

    /// Positional value at `index`.
    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.positional.get(index)
    }

    /// Positional string at `index`.
    pub fn str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(ArgValue::as_str)
    }

    /// Positional integer at `index`.
    pub fn int(&self, index: usize) -> Option<i64> {
        self.get(index).and_then(ArgValue::as_int)
    }

    /// Keyword value named `name`.
    pub fn kwarg(&self, name: &str) -> Option<&ArgValue> {
        self.keyword.get(name)
    }

    /// Number of positional values.
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// True when nothing was bound.
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

fn convert(command: &str, param: &Param, token: &str) -> Result<ArgValue, CommandError> {
    param
        .ty
        .convert(token)
        .ok_or_else(|| CommandError::BadArgument {
            command: command.to_string(),
            param: param.name.clone(),
            value: token.to_string(),
            expected: param.ty,
        })
}

/// Binds `tokens` (the words after the command name) to `params`.
///
/// Tokens beyond the signature are ignored.
pub fn bind(command: &str, params: &[Param], tokens: Vec<String>) -> Result<Args, CommandError> {
    let mut args = Args::default();
    let mut remaining = tokens.into_iter();

    for param in params {
        match &param.kind {
            ParamKind::Required => {
                let token = remaining.next().ok_or_else(|| CommandError::MissingArgument {
                    command: command.to_string(),
                    param: param.name.clone(),
                })?;
                args.positional.push(convert(command, param, &token)?);
            }
            ParamKind::Optional(default) => match remaining.next() {
                Some(token) => args.positional.push(convert(command, param, &token)?),
                None => {
                    if let Some(value) = default {
                        args.positional.push(value.clone());
                    }
                }
            },
            ParamKind::Variadic => {
                let values = remaining
                    .by_ref()
                    .map(|token| convert(command, param, &token))
                    .collect::<Result<Vec<_>, _>>()?;
                args.positional.push(ArgValue::List(values));
            }
            ParamKind::Rest { required, default } => {
                let rest = remaining.by_ref().collect::<Vec<_>>().join(" ");
                if !rest.is_empty() {
                    let value = convert(command, param, &rest)?;
                    args.keyword.insert(param.name.clone(), value);
                } else if let Some(value) = default {
                    args.keyword.insert(param.name.clone(), value.clone());
                } else if *required {
                    return Err(CommandError::MissingArgument {
                        command: command.to_string(),
                        param: param.name.clone(),
                    });
                }
            }
        }
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[test]
    fn test_required_consume_in_order() {
        let params = vec![Param::required("a"), Param::required("b").typed(ArgType::Int)];
        let args = bind("cmd", &params, tokens(&["x", "42", "extra"])).unwrap();
        assert_eq!(args.str(0), Some("x"));
        assert_eq!(args.int(1), Some(42));
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_missing_required() {
        let params = vec![Param::required("a"), Param::required("b")];
        let err = bind("cmd", &params, tokens(&["x"])).unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { ref param, .. } if param == "b"));
    }

    #[test]
    fn test_optional_default() {
        let params = vec![Param::required("a"), Param::with_default("b", 5).typed(ArgType::Int)];
        let args = bind("cmd", &params, tokens(&["x"])).unwrap();
        assert_eq!(args.int(1), Some(5));

        let params = vec![Param::optional("b")];
        assert!(bind("cmd", &params, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_variadic_collects_everything() {
        let params = vec![Param::required("first"), Param::variadic("rest")];
        let args = bind("cmd", &params, tokens(&["a", "b", "c"])).unwrap();
        assert_eq!(
            args.get(1).and_then(ArgValue::as_list).map(<[ArgValue]>::len),
            Some(2)
        );

        let args = bind("cmd", &params, tokens(&["a"])).unwrap();
        assert_eq!(args.get(1), Some(&ArgValue::List(Vec::new())));
    }

    #[test]
    fn test_rest_joins_remaining_tokens() {
        let params = vec![Param::required("target"), Param::rest("reason")];
        let args = bind("cmd", &params, tokens(&["user", "too", "loud"])).unwrap();
        assert_eq!(args.kwarg("reason"), Some(&ArgValue::from("too loud")));

        let args = bind("cmd", &params, tokens(&["user"])).unwrap();
        assert!(args.kwarg("reason").is_none());
    }

    #[test]
    fn test_rest_required_and_default() {
        let params = vec![Param::rest_required("text")];
        assert!(bind("cmd", &params, Vec::new()).is_err());

        let params = vec![Param::rest_or("text", "nothing")];
        let args = bind("cmd", &params, Vec::new()).unwrap();
        assert_eq!(args.kwarg("text"), Some(&ArgValue::from("nothing")));
    }

    #[test]
    fn test_bad_conversion() {
        let params = vec![Param::required("count").typed(ArgType::Int)];
        let err = bind("cmd", &params, tokens(&["many"])).unwrap_err();
        assert!(matches!(
            err,
            CommandError::BadArgument { expected: ArgType::Int, ref value, .. } if value == "many"
        ));
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(ArgType::Bool.convert("YES"), Some(ArgValue::Bool(true)));
        assert_eq!(ArgType::Bool.convert("off"), Some(ArgValue::Bool(false)));
        assert_eq!(ArgType::Bool.convert("maybe"), None);
    }

    #[test]
    fn test_signature_validation() {
        assert!(validate_signature(&[Param::required("a"), Param::variadic("b")]).is_ok());
        assert!(validate_signature(&[Param::variadic("a"), Param::required("b")]).is_err());
        assert!(validate_signature(&[Param::optional("a"), Param::required("b")]).is_err());
        assert!(validate_signature(&[Param::required("a"), Param::required("a")]).is_err());
    }
}
