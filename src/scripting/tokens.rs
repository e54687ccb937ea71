use crate::error::{MapperError, MapperResult};
use crate::mapping::ParameterMapping;
use crate::types::TypeHandlerRegistry;
use crate::value::JdbcType;
use tracing::debug;

/// Finds `open ... close` tokens left to right and replaces each with the handler's output.
/// A backslash before `open` (or before `close` inside a token) escapes it.
pub struct GenericTokenParser<'a> {
    open: &'a str,
    close: &'a str,
}

impl<'a> GenericTokenParser<'a> {
    pub fn new(open: &'a str, close: &'a str) -> Self { Self { open, close } }

    pub fn parse<F>(&self, text: &str, mut handler: F) -> MapperResult<String>
    where
        F: FnMut(&str) -> MapperResult<String>,
    {
        let Some(mut start) = text.find(self.open) else { return Ok(text.to_string()); };
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut offset = 0;
        loop {
            if start > 0 && bytes[start - 1] == b'\\' {
                out.push_str(&text[offset..start - 1]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();
                let mut expression = String::new();
                let mut end = text[offset..].find(self.close).map(|i| i + offset);
                while let Some(e) = end {
                    if e > offset && bytes[e - 1] == b'\\' {
                        expression.push_str(&text[offset..e - 1]);
                        expression.push_str(self.close);
                        offset = e + self.close.len();
                        end = text[offset..].find(self.close).map(|i| i + offset);
                    } else {
                        expression.push_str(&text[offset..e]);
                        break;
                    }
                }
                match end {
                    None => {
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                    Some(e) => {
                        out.push_str(&handler(&expression)?);
                        offset = e + self.close.len();
                    }
                }
            }
            match text[offset..].find(self.open) {
                Some(i) => start = i + offset,
                None => break,
            }
        }
        out.push_str(&text[offset..]);
        Ok(out)
    }
}

/// Replace every `#{...}` with `?`, returning the SQL and its placeholders in order.
pub fn parse_parameter_tokens(sql: &str, registry: &TypeHandlerRegistry) -> MapperResult<(String, Vec<ParameterMapping>)> {
    let mut mappings = Vec::new();
    let parsed = GenericTokenParser::new("#{", "}").parse(sql, |content| {
        mappings.push(build_parameter_mapping(content, registry)?);
        Ok("?".to_string())
    })?;
    Ok((collapse_whitespace(&parsed), mappings))
}

/// `property[, jdbcType=NAME][, javaType=alias]`; other qualifiers are ignored.
fn build_parameter_mapping(content: &str, registry: &TypeHandlerRegistry) -> MapperResult<ParameterMapping> {
    let mut parts = content.split(',');
    let property = parts.next().unwrap_or_default().trim();
    if property.is_empty() {
        return Err(MapperError::builder(format!("empty parameter token '#{{{}}}'", content)));
    }
    let mut mapping = ParameterMapping::new(property);
    let mut java_type = None;
    for part in parts {
        let (key, value) = part.split_once('=').map(|(k, v)| (k.trim(), v.trim())).unwrap_or((part.trim(), ""));
        match key {
            "jdbcType" => {
                let jt = JdbcType::from_name(value)
                    .ok_or_else(|| MapperError::builder(format!("unknown jdbcType '{}' in '#{{{}}}'", value, content)))?;
                mapping.jdbc_type = Some(jt);
            }
            "javaType" => java_type = Some(value.to_string()),
            other => debug!(target: "sqlmapper::exec", "ignoring parameter qualifier '{}' in '#{{{}}}'", other, content),
        }
    }
    if let Some(alias) = java_type {
        mapping.type_handler = Some(registry.by_alias(&alias, mapping.jdbc_type)?);
    }
    Ok(mapping)
}

/// Collapse whitespace runs outside single-quoted literals into one space.
pub fn collapse_whitespace(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_quote = false;
    let mut pending_space = false;
    for c in sql.trim().chars() {
        if in_quote {
            out.push(c);
            if c == '\'' { in_quote = false; }
            continue;
        }
        if c.is_whitespace() { pending_space = true; continue; }
        if pending_space { out.push(' '); pending_space = false; }
        if c == '\'' { in_quote = true; }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_become_question_marks_in_order() {
        let reg = TypeHandlerRegistry::new();
        let (sql, maps) = parse_parameter_tokens("SELECT * FROM t WHERE a = #{a} AND b = #{b, jdbcType=VARCHAR}", &reg).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b = ?");
        assert_eq!(maps.iter().map(|m| m.property.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(maps[1].jdbc_type, Some(JdbcType::Varchar));
    }

    #[test]
    fn java_type_picks_explicit_handler() {
        let reg = TypeHandlerRegistry::new();
        let (_, maps) = parse_parameter_tokens("#{id, javaType=long, mode=IN}", &reg).unwrap();
        assert_eq!(maps[0].type_handler.as_ref().map(|h| h.name()), Some("long"));
    }

    #[test]
    fn unknown_jdbc_type_is_rejected() {
        let reg = TypeHandlerRegistry::new();
        let err = parse_parameter_tokens("#{a, jdbcType=BLOBBY}", &reg).unwrap_err();
        assert_eq!(err.code_str(), "builder");
        assert!(parse_parameter_tokens("#{ }", &reg).is_err());
    }

    #[test]
    fn escaped_and_unclosed_tokens_stay_literal() {
        let p = GenericTokenParser::new("${", "}");
        let out = p.parse("a \\${x} ${y} ${z", |e| Ok(format!("<{}>", e))).unwrap();
        assert_eq!(out, "a ${x} <y> ${z");
        let out = p.parse("${a\\}b}", |e| Ok(e.to_string())).unwrap();
        assert_eq!(out, "a}b");
    }

    #[test]
    fn whitespace_inside_quotes_is_kept() {
        assert_eq!(collapse_whitespace("  SELECT\n  'a   b'\t FROM  t "), "SELECT 'a   b' FROM t");
    }
}
