use super::context::DynamicContext;
use super::expr;
use super::tokens::GenericTokenParser;
use crate::error::MapperResult;

/// Statement template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Literal text, appended as is.
    StaticText(String),
    /// Text containing `${expr}` substitutions. The value is inlined into the SQL verbatim,
    /// so substituting caller-controlled input opens the statement to SQL injection.
    Text(String),
    If { test: String, contents: Box<SqlNode> },
    Mixed(Vec<SqlNode>),
    /// Evaluate `expression` and expose the result to later nodes and placeholders as `name`.
    Bind { name: String, expression: String },
}

impl SqlNode {
    /// Text node: `Text` when it holds a substitution, `StaticText` otherwise.
    pub fn text<S: Into<String>>(s: S) -> Self {
        let s = s.into();
        if s.contains("${") { SqlNode::Text(s) } else { SqlNode::StaticText(s) }
    }

    /// Append this node's SQL to the context; false when nothing was contributed.
    pub fn apply(&self, ctx: &mut DynamicContext<'_>) -> MapperResult<bool> {
        match self {
            SqlNode::StaticText(s) => {
                ctx.append_sql(s);
                Ok(true)
            }
            SqlNode::Text(s) => {
                let parser = GenericTokenParser::new("${", "}");
                let rendered = parser.parse(s, |e| Ok(expr::evaluate(e.trim(), ctx)?.to_sql_text()))?;
                ctx.append_sql(&rendered);
                Ok(true)
            }
            SqlNode::If { test, contents } => {
                if expr::evaluate_boolean(test, ctx)? {
                    contents.apply(ctx)?;
                    return Ok(true);
                }
                Ok(false)
            }
            SqlNode::Mixed(children) => {
                for child in children {
                    child.apply(ctx)?;
                }
                Ok(true)
            }
            SqlNode::Bind { name, expression } => {
                let v = expr::evaluate(expression, ctx)?;
                ctx.bind(name.clone(), v);
                Ok(true)
            }
        }
    }

    /// Whether rendering depends on the parameter (conditionals, bindings or substitutions).
    pub fn is_dynamic(&self) -> bool {
        match self {
            SqlNode::StaticText(_) => false,
            SqlNode::Text(_) | SqlNode::If { .. } | SqlNode::Bind { .. } => true,
            SqlNode::Mixed(children) => children.iter().any(SqlNode::is_dynamic),
        }
    }
}
