use crate::reflection::ParameterObject;
use crate::value::Value;
use std::collections::HashMap;

/// Binding name under which a scalar parameter is visible to expressions.
pub const PARAMETER_OBJECT_KEY: &str = "_parameter";

/// Per-render scratch state: the SQL being assembled, side bindings and the parameter.
pub struct DynamicContext<'p> {
    parameter: &'p dyn ParameterObject,
    bindings: HashMap<String, Value>,
    sql: String,
}

impl<'p> DynamicContext<'p> {
    pub fn new(parameter: &'p dyn ParameterObject) -> Self {
        let mut bindings = HashMap::new();
        if let Some(v) = parameter.scalar() {
            bindings.insert(PARAMETER_OBJECT_KEY.to_string(), v);
        }
        Self { parameter, bindings, sql: String::new() }
    }

    pub fn parameter(&self) -> &dyn ParameterObject { self.parameter }

    /// Append a fragment; fragments are joined by a single space.
    pub fn append_sql(&mut self, fragment: &str) {
        let f = fragment.trim();
        if f.is_empty() { return; }
        if !self.sql.is_empty() { self.sql.push(' '); }
        self.sql.push_str(f);
    }

    pub fn sql(&self) -> &str { self.sql.trim() }

    pub fn bind<S: Into<String>>(&mut self, name: S, value: Value) { self.bindings.insert(name.into(), value); }

    pub fn binding(&self, name: &str) -> Option<&Value> { self.bindings.get(name) }

    pub fn bindings(&self) -> &HashMap<String, Value> { &self.bindings }

    pub fn into_parts(self) -> (String, HashMap<String, Value>) { (self.sql, self.bindings) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::Record;

    #[test]
    fn fragments_join_with_single_space() {
        let mut ctx = DynamicContext::new(&());
        ctx.append_sql("  SELECT *  ");
        ctx.append_sql("");
        ctx.append_sql("FROM t\n");
        assert_eq!(ctx.sql(), "SELECT * FROM t");
    }

    #[test]
    fn scalar_parameter_is_bound() {
        let ctx = DynamicContext::new(&7i64);
        assert_eq!(ctx.binding(PARAMETER_OBJECT_KEY), Some(&Value::Long(7)));
        let rec = Record::new().with("a", 1);
        let ctx = DynamicContext::new(&rec);
        assert!(ctx.binding(PARAMETER_OBJECT_KEY).is_none());
    }
}
