//! Factory expressions: `name` or `name(key=value, ...)`.
//!
//! Values are read loosely: integers, floats, `True`/`False`, `None`, and
//! single- or double-quoted strings. Anything else is taken as a bare string.

use crate::error::{RecipeError, RecipeResult};
use serde_json::{Number, Value};

/// Keyword arguments of a factory call.
pub type Kwargs = serde_json::Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct FactoryCall {
    pub name: String,
    pub kwargs: Kwargs,
}

pub fn parse_factory_call(expr: &str) -> RecipeResult<FactoryCall> {
    let invalid = |reason: &str| RecipeError::InvalidExpression {
        expr: expr.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = expr.trim();

    let (name, body) = match trimmed.find('(') {
        None => (trimmed, None),
        Some(open) => {
            let Some(inner) = trimmed[open + 1..].strip_suffix(')') else {
                return Err(invalid("missing closing parenthesis"));
            };
            (trimmed[..open].trim(), Some(inner))
        }
    };

    if name.is_empty() {
        return Err(invalid("missing factory name"));
    }
    if !is_identifier_path(name) {
        return Err(invalid("factory names may only contain letters, digits, `_` and `.`"));
    }

    let mut kwargs = Kwargs::new();
    if let Some(body) = body {
        for piece in split_top_level(body).map_err(|reason| invalid(&reason))? {
            if piece.trim().is_empty() {
                continue;
            }
            let (key, value) = parse_assignment(piece).map_err(|reason| invalid(&reason))?;
            if kwargs.insert(key.clone(), value).is_some() {
                return Err(invalid(&format!("keyword `{key}` given more than once")));
            }
        }
    }

    Ok(FactoryCall {
        name: name.to_string(),
        kwargs,
    })
}

fn is_identifier_path(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Split `key=value`. The key must be a plain identifier path.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected `key=value`, got `{}`", raw.trim()));
    };
    let key = key.trim();
    if key.is_empty() || !is_identifier_path(key) {
        return Err(format!("invalid keyword `{key}`"));
    }
    Ok((key.to_string(), parse_value(value)))
}

pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();

    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Value::String(raw[1..raw.len() - 1].to_string());
        }
    }

    match raw {
        "None" | "null" => return Value::Null,
        "True" | "true" => return Value::Bool(true),
        "False" | "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

/// Split on commas that are not inside quotes.
fn split_top_level(body: &str) -> Result<Vec<&str>, String> {
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => {
                pieces.push(&body[start..idx]);
                start = idx + 1;
            }
            (None, _) => {}
        }
    }

    if quote.is_some() {
        return Err("unterminated string".to_string());
    }
    pieces.push(&body[start..]);
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_name() {
        let call = parse_factory_call("  gpt3_175b ").unwrap();
        assert_eq!(call.name, "gpt3_175b");
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn test_call_with_keywords() {
        let expr = "gpt3_175b(num_nodes=64, name='my_175b, pretrain', dir=None)";
        let call = parse_factory_call(expr).unwrap();
        assert_eq!(call.name, "gpt3_175b");
        assert_eq!(call.kwargs["num_nodes"], json!(64));
        assert_eq!(call.kwargs["name"], json!("my_175b, pretrain"));
        assert_eq!(call.kwargs["dir"], json!(null));
    }

    #[test]
    fn test_dotted_name_and_trailing_comma() {
        let expr = "nemotron4_22b.pretrain_recipe_performance(num_nodes=4,)";
        let call = parse_factory_call(expr).unwrap();
        assert_eq!(call.name, "nemotron4_22b.pretrain_recipe_performance");
        assert_eq!(call.kwargs.len(), 1);
    }

    #[test]
    fn test_values() {
        assert_eq!(parse_value("1e-5"), json!(1e-5));
        assert_eq!(parse_value("-3"), json!(-3));
        assert_eq!(parse_value("True"), json!(true));
        assert_eq!(parse_value("\"16-mixed\""), json!("16-mixed"));
        assert_eq!(parse_value("bf16-mixed"), json!("bf16-mixed"));
        assert_eq!(parse_value("/results/run"), json!("/results/run"));
    }

    #[test]
    fn test_malformed_expressions() {
        assert!(parse_factory_call("gpt3_175b(num_nodes=64").is_err());
        assert!(parse_factory_call("(num_nodes=64)").is_err());
        assert!(parse_factory_call("gpt3_175b(num_nodes)").is_err());
        assert!(parse_factory_call("gpt3_175b(name='open)").is_err());
        assert!(parse_factory_call("gpt3_175b(a=1, a=2)").is_err());
        assert!(parse_factory_call("gpt 175b").is_err());
    }
}
