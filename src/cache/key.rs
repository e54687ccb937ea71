use crate::error::{MapperError, MapperResult};
use crate::reflection::ParameterObject;
use crate::value::Value;
use std::hash::{Hash, Hasher};
use xxhash_rust::xxh3::xxh3_64;

const DEFAULT_MULTIPLIER: u64 = 37;
const DEFAULT_HASHCODE: u64 = 17;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKeyPart {
    Text(String),
    Value(Value),
    /// Structural snapshot of a parameter object, in property order.
    Fields(Vec<(String, Value)>),
    Absent,
}

impl CacheKeyPart {
    fn digest(&self) -> u64 {
        let mut buf = Vec::with_capacity(32);
        match self {
            CacheKeyPart::Text(s) => { buf.push(1); buf.extend_from_slice(s.as_bytes()); }
            CacheKeyPart::Value(v) => { buf.push(2); encode_value(v, &mut buf); }
            CacheKeyPart::Fields(fields) => {
                buf.push(3);
                for (name, v) in fields {
                    buf.extend_from_slice(name.as_bytes());
                    buf.push(0);
                    encode_value(v, &mut buf);
                }
            }
            CacheKeyPart::Absent => buf.push(4),
        }
        xxh3_64(&buf)
    }
}

fn encode_value(v: &Value, buf: &mut Vec<u8>) {
    match v {
        Value::Null => buf.push(0),
        Value::Bool(b) => { buf.push(1); buf.push(*b as u8); }
        Value::Int(i) => { buf.push(2); buf.extend_from_slice(&i.to_le_bytes()); }
        Value::Long(l) => { buf.push(3); buf.extend_from_slice(&l.to_le_bytes()); }
        Value::Double(d) => { buf.push(4); buf.extend_from_slice(&d.to_bits().to_le_bytes()); }
        Value::Text(s) => { buf.push(5); buf.extend_from_slice(&(s.len() as u64).to_le_bytes()); buf.extend_from_slice(s.as_bytes()); }
        Value::Timestamp(t) => {
            buf.push(6);
            buf.extend_from_slice(&t.and_utc().timestamp().to_le_bytes());
            buf.extend_from_slice(&t.and_utc().timestamp_subsec_nanos().to_le_bytes());
        }
    }
}

/// Composite cache key. The hash is order-sensitive and precomputed as parts are added;
/// equality compares the parts themselves.
#[derive(Debug, Clone)]
pub struct CacheKey {
    hashcode: u64,
    checksum: u64,
    count: usize,
    parts: Vec<CacheKeyPart>,
}

impl Default for CacheKey {
    fn default() -> Self { Self::new() }
}

impl CacheKey {
    pub fn new() -> Self { Self { hashcode: DEFAULT_HASHCODE, checksum: 0, count: 0, parts: Vec::new() } }

    pub fn update(&mut self, part: CacheKeyPart) {
        let base = part.digest();
        self.count += 1;
        self.checksum = self.checksum.wrapping_add(base);
        self.hashcode = DEFAULT_MULTIPLIER.wrapping_mul(self.hashcode).wrapping_add(base.wrapping_mul(self.count as u64));
        self.parts.push(part);
    }

    pub fn update_text<S: Into<String>>(&mut self, s: S) { self.update(CacheKeyPart::Text(s.into())); }

    /// Key for one query: statement id, rendered SQL, parameter snapshot, environment id.
    /// Parameters that cannot be snapshotted structurally yield `MapperError::CacheKey`.
    pub fn for_query(statement_id: &str, sql: &str, parameter: &dyn ParameterObject, environment_id: &str) -> MapperResult<Self> {
        let mut key = Self::new();
        key.update_text(statement_id);
        key.update_text(sql);
        key.update(parameter_part(parameter)?);
        key.update_text(environment_id);
        Ok(key)
    }

    pub fn hashcode(&self) -> u64 { self.hashcode }
    pub fn len(&self) -> usize { self.count }
    pub fn is_empty(&self) -> bool { self.count == 0 }
    pub fn parts(&self) -> &[CacheKeyPart] { &self.parts }
}

fn parameter_part(parameter: &dyn ParameterObject) -> MapperResult<CacheKeyPart> {
    if let Some(v) = parameter.scalar() { return Ok(CacheKeyPart::Value(v)); }
    match parameter.meta() {
        Some(meta) => meta.snapshot().map(CacheKeyPart::Fields).ok_or_else(|| {
            MapperError::CacheKey(format!("parameter of type '{}' has no structural snapshot", meta.type_name()))
        }),
        None => Ok(CacheKeyPart::Absent),
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hashcode == other.hashcode && self.checksum == other.checksum && self.count == other.count && self.parts == other.parts
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) { state.write_u64(self.hashcode); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::{MetaObject, PropertyInfo, Record};

    #[test]
    fn same_components_same_key() {
        let p = Record::new().with("id", 1).with("name", "a");
        let a = CacheKey::for_query("ns.byId", "SELECT 1", &p, "dev").unwrap();
        let b = CacheKey::for_query("ns.byId", "SELECT 1", &p.clone(), "dev").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hashcode(), b.hashcode());
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn any_component_changes_the_key() {
        let base = CacheKey::for_query("ns.byId", "SELECT 1", &1i64, "dev").unwrap();
        assert_ne!(base, CacheKey::for_query("ns.other", "SELECT 1", &1i64, "dev").unwrap());
        assert_ne!(base, CacheKey::for_query("ns.byId", "SELECT 2", &1i64, "dev").unwrap());
        assert_ne!(base, CacheKey::for_query("ns.byId", "SELECT 1", &2i64, "dev").unwrap());
        assert_ne!(base, CacheKey::for_query("ns.byId", "SELECT 1", &1i32, "dev").unwrap());
        assert_ne!(base, CacheKey::for_query("ns.byId", "SELECT 1", &1i64, "prod").unwrap());
        assert_ne!(base, CacheKey::for_query("ns.byId", "SELECT 1", &(), "dev").unwrap());
    }

    #[test]
    fn order_matters() {
        let mut a = CacheKey::new();
        a.update_text("x");
        a.update_text("y");
        let mut b = CacheKey::new();
        b.update_text("y");
        b.update_text("x");
        assert_ne!(a, b);
        assert_ne!(a.hashcode(), b.hashcode());
    }

    struct Opaque;
    impl MetaObject for Opaque {
        fn type_name(&self) -> &str { "Opaque" }
        fn property(&self, _name: &str) -> Option<PropertyInfo> { None }
        fn property_names(&self) -> Vec<String> { vec!["secret".into()] }
        fn get_value(&self, name: &str) -> MapperResult<Value> { Err(MapperError::property("Opaque", name, "no getter")) }
        fn set_value(&mut self, name: &str, _value: Value) -> MapperResult<()> { Err(MapperError::property("Opaque", name, "no setter")) }
    }
    impl ParameterObject for Opaque {
        fn meta(&self) -> Option<&dyn MetaObject> { Some(self) }
    }

    #[test]
    fn opaque_parameter_cannot_key() {
        let err = CacheKey::for_query("ns.x", "SELECT 1", &Opaque, "dev").unwrap_err();
        assert_eq!(err.code_str(), "cache_key");
    }
}
