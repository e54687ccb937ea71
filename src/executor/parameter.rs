use crate::driver::PreparedStatement;
use crate::error::{MapperError, MapperResult};
use crate::mapping::{BoundStatement, ParameterMapping};
use crate::reflection::ParameterObject;
use crate::types::TypeHandlerRegistry;
use crate::value::{Value, ValueType};
use tracing::debug;

/// Binds the placeholders of a bound statement from the parameter object, in order.
pub struct DefaultParameterHandler<'a> {
    registry: &'a TypeHandlerRegistry,
    bound: &'a BoundStatement,
}

impl<'a> DefaultParameterHandler<'a> {
    pub fn new(registry: &'a TypeHandlerRegistry, bound: &'a BoundStatement) -> Self { Self { registry, bound } }

    pub fn set_parameters(&self, ps: &mut dyn PreparedStatement, parameter: &dyn ParameterObject) -> MapperResult<()> {
        for (i, mapping) in self.bound.parameter_mappings.iter().enumerate() {
            let index = i + 1;
            let value = self.resolve(mapping, parameter)?;
            let handler = match (&mapping.type_handler, value.is_null()) {
                (Some(h), _) => h.clone(),
                (None, false) => self.registry.for_value(&value, mapping.jdbc_type)?,
                (None, true) => self.registry.get(ValueType::Object, mapping.jdbc_type)?,
            };
            debug!(target: "sqlmapper::exec", "bind #{} {} = {:?} via {}", index, mapping.property, value, handler.name());
            handler.set_parameter(ps, index, &value, mapping.jdbc_type)?;
        }
        Ok(())
    }

    /// Side bindings first, then a bare scalar, then a property of the parameter object.
    fn resolve(&self, mapping: &ParameterMapping, parameter: &dyn ParameterObject) -> MapperResult<Value> {
        let property = mapping.property.as_str();
        if let Some(v) = self.bound.additional_parameter(property) { return Ok(v.clone()); }
        if let Some(v) = parameter.scalar() {
            if !property.contains('.') { return Ok(v); }
        }
        match parameter.meta() {
            Some(meta) => {
                let name = meta.find_property(property)
                    .ok_or_else(|| MapperError::property(meta.type_name(), property, "no getter"))?;
                meta.get_value(&name)
            }
            None if parameter.is_absent() => Ok(Value::Null),
            None => Err(MapperError::property("<scalar>", property, "cannot navigate into a scalar parameter")),
        }
    }
}
