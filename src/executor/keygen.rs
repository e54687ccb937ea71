use crate::driver::PreparedStatement;
use crate::error::{MapperError, MapperResult};
use crate::mapping::MappedStatement;
use crate::reflection::ParameterObject;
use crate::types::handlers::coerce;
use crate::value::ValueType;
use tracing::debug;

pub trait KeyGenerator: Send + Sync {
    /// Whether the statement must be prepared with generated-key retrieval.
    fn requests_generated_keys(&self) -> bool { false }

    /// Runs after a successful update on the same statement.
    fn process_after(&self, ms: &MappedStatement, stmt: &mut dyn PreparedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<()>;
}

pub struct NoKeyGenerator;

impl KeyGenerator for NoKeyGenerator {
    fn process_after(&self, _ms: &MappedStatement, _stmt: &mut dyn PreparedStatement, _parameter: &mut dyn ParameterObject) -> MapperResult<()> {
        Ok(())
    }
}

/// Copies store-generated keys onto the parameter object. `key_property` may list several
/// comma-separated properties, matched to key columns by position.
pub struct Jdbc3KeyGenerator;

impl KeyGenerator for Jdbc3KeyGenerator {
    fn requests_generated_keys(&self) -> bool { true }

    fn process_after(&self, ms: &MappedStatement, stmt: &mut dyn PreparedStatement, parameter: &mut dyn ParameterObject) -> MapperResult<()> {
        let Some(key_property) = ms.key_property() else { return Ok(()); };
        let keys = stmt.generated_keys().map_err(|e| MapperError::execution(ms.id(), e))?;
        let Some(row) = keys.rows().first() else {
            debug!(target: "sqlmapper::exec", "{}: no generated keys returned", ms.id());
            return Ok(());
        };
        let meta = parameter.meta_mut().ok_or_else(|| {
            MapperError::property("<scalar>", key_property, "parameter object cannot receive generated keys")
        })?;
        for (i, property) in key_property.split(',').map(str::trim).enumerate() {
            let Some(raw) = row.get(i + 1).cloned() else {
                return Err(MapperError::property(meta.type_name(), property, format!("no generated key column #{}", i + 1)));
            };
            let name = meta.find_property(property)
                .ok_or_else(|| MapperError::property(meta.type_name(), property, "no setter for generated key"))?;
            let declared = meta.property(&name).map(|p| p.value_type).unwrap_or(ValueType::Object);
            let value = match declared {
                ValueType::Integer | ValueType::Long | ValueType::String => coerce(raw, declared)?,
                _ => raw,
            };
            debug!(target: "sqlmapper::exec", "{}: generated key {} = {}", ms.id(), name, value);
            meta.set_value(&name, value)?;
        }
        Ok(())
    }
}
