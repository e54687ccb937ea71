//! Statement template markup: plain SQL with `<if test="...">...</if>` (nestable) and
//! `<bind name="..." value="..."/>` elements. Attribute values and text use XML entities
//! (`&lt;` `&gt;` `&amp;` `&quot;` `&apos;`).

use super::node::SqlNode;
use crate::error::{MapperError, MapperResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ATTRIBUTE_RE: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#));

pub struct ScriptBuilder;

struct Frame {
    test: Option<String>,
    children: Vec<SqlNode>,
}

impl ScriptBuilder {
    /// Parse a template into its node tree and report whether it is dynamic.
    pub fn parse(template: &str) -> MapperResult<(SqlNode, bool)> {
        let mut stack = vec![Frame { test: None, children: Vec::new() }];
        let mut rest = template;
        while let Some(pos) = find_tag(rest) {
            push_text(&mut stack, &rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with("</") {
                let end = tail.find('>').ok_or_else(|| MapperError::builder("unterminated closing tag"))?;
                let name = tail[2..end].trim();
                if name != "if" {
                    return Err(MapperError::builder(format!("unexpected closing tag </{}>", name)));
                }
                if stack.len() < 2 {
                    return Err(MapperError::builder("</if> without matching <if>"));
                }
                if let Some(frame) = stack.pop() {
                    let node = SqlNode::If { test: frame.test.unwrap_or_default(), contents: Box::new(SqlNode::Mixed(frame.children)) };
                    if let Some(parent) = stack.last_mut() { parent.children.push(node); }
                }
                rest = &tail[end + 1..];
                continue;
            }
            let end = tag_end(tail).ok_or_else(|| MapperError::builder("unterminated tag"))?;
            let self_closing = tail[..end].ends_with('/');
            let body = if self_closing { &tail[1..end - 1] } else { &tail[1..end] };
            let (name, attrs) = body.split_once(|c: char| c.is_whitespace()).unwrap_or((body, ""));
            let attrs = parse_attributes(attrs)?;
            match name {
                "if" => {
                    if self_closing { return Err(MapperError::builder("<if> must have a body")); }
                    let test = attrs.get("test").cloned().ok_or_else(|| MapperError::builder("<if> requires a test attribute"))?;
                    if test.trim().is_empty() { return Err(MapperError::builder("<if> test must not be empty")); }
                    stack.push(Frame { test: Some(test), children: Vec::new() });
                }
                "bind" => {
                    if !self_closing { return Err(MapperError::builder("<bind> must be self-closing")); }
                    let name = attrs.get("name").cloned().ok_or_else(|| MapperError::builder("<bind> requires a name attribute"))?;
                    let expression = attrs.get("value").cloned().ok_or_else(|| MapperError::builder("<bind> requires a value attribute"))?;
                    if let Some(frame) = stack.last_mut() { frame.children.push(SqlNode::Bind { name, expression }); }
                }
                other => return Err(MapperError::builder(format!("unsupported element <{}>", other))),
            }
            rest = &tail[end + 1..];
        }
        push_text(&mut stack, rest);
        if stack.len() != 1 {
            return Err(MapperError::builder("unclosed <if> element"));
        }
        let root = SqlNode::Mixed(stack.pop().map(|f| f.children).unwrap_or_default());
        let dynamic = root.is_dynamic();
        Ok((root, dynamic))
    }
}

fn push_text(stack: &mut [Frame], text: &str) {
    if text.trim().is_empty() { return; }
    if let Some(frame) = stack.last_mut() {
        frame.children.push(SqlNode::text(decode_entities(text)));
    }
}

/// Byte offset of the next `<if`, `<bind` or `</if` tag; other `<` characters are SQL text.
fn find_tag(s: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = s[from..].find('<') {
        let at = from + i;
        let tail = &s[at + 1..];
        let is_tag = ["if", "bind", "/if"].iter().any(|name| {
            tail.strip_prefix(name).map(|r| r.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/')).unwrap_or(false)
        });
        if is_tag { return Some(at); }
        from = at + 1;
    }
    None
}

/// Index of the `>` closing the tag at the start of `s`, skipping quoted attribute values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_attributes(s: &str) -> MapperResult<HashMap<String, String>> {
    let re = ATTRIBUTE_RE.as_ref().map_err(|e| MapperError::builder(e.to_string()))?;
    let mut out = HashMap::new();
    for cap in re.captures_iter(s) {
        let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str()).unwrap_or_default();
        out.insert(cap[1].to_string(), decode_entities(value));
    }
    Ok(out)
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sql_is_static() {
        let (node, dynamic) = ScriptBuilder::parse("SELECT * FROM t WHERE a < #{a}").unwrap();
        assert!(!dynamic);
        assert_eq!(node, SqlNode::Mixed(vec![SqlNode::StaticText("SELECT * FROM t WHERE a < #{a}".into())]));
    }

    #[test]
    fn nested_if_and_bind() {
        let (node, dynamic) = ScriptBuilder::parse(
            r#"<bind name="p" value="'%' + name"/>SELECT * FROM t WHERE 1 = 1
               <if test="name != null"> AND name LIKE #{p}<if test='age &gt; 3'> AND age > #{age}</if></if>"#,
        ).unwrap();
        assert!(dynamic);
        let SqlNode::Mixed(children) = node else { panic!("expected mixed root") };
        assert_eq!(children[0], SqlNode::Bind { name: "p".into(), expression: "'%' + name".into() });
        let SqlNode::If { test, contents } = &children[2] else { panic!("expected if") };
        assert_eq!(test, "name != null");
        let SqlNode::Mixed(inner) = contents.as_ref() else { panic!("expected mixed body") };
        assert!(matches!(&inner[1], SqlNode::If { test, .. } if test == "age > 3"));
    }

    #[test]
    fn substitution_makes_template_dynamic() {
        let (_, dynamic) = ScriptBuilder::parse("SELECT * FROM ${table}").unwrap();
        assert!(dynamic);
    }

    #[test]
    fn malformed_markup_is_rejected() {
        for bad in [
            "SELECT <if test=\"a\">x",
            "SELECT x</if>",
            "<if>x</if>",
            "<bind name=\"a\" value=\"1\">",
            "<if test=\"a\"/>",
            "<bind value=\"1\"/>",
        ] {
            let err = ScriptBuilder::parse(bad).unwrap_err();
            assert_eq!(err.code_str(), "builder", "{}", bad);
        }
    }
}
