use std::sync::Arc;

use serde_json::Value;

use crate::{
    config::ProcConfig,
    errors::ProcError,
    procedures::registry::{
        ParamType, ProcMode, ProcedureRegistry, ProcedureSignature, handler, int_list_arg,
        record, string_arg,
    },
    store::NodeStore,
};

/// Value of `property` on each node, in input order; `null` where absent.
pub fn node_props<N>(nodes: &N, ids: &[i64], property: &str) -> Result<Vec<Value>, ProcError>
where
    N: NodeStore + ?Sized,
{
    let key = [property.to_string()];
    let mut values = Vec::with_capacity(ids.len());
    for &id in ids {
        let mut found = nodes.properties(id, &key)?;
        values.push(found.remove(property).unwrap_or(Value::Null));
    }
    Ok(values)
}

/// Value of `property` on each relationship, in input order; `null` where absent.
pub fn rel_props<N>(nodes: &N, ids: &[i64], property: &str) -> Result<Vec<Value>, ProcError>
where
    N: NodeStore + ?Sized,
{
    let mut values = Vec::with_capacity(ids.len());
    for &id in ids {
        let mut relationship = nodes.relationship(id)?;
        values.push(relationship.properties.remove(property).unwrap_or(Value::Null));
    }
    Ok(values)
}

/// Installs `getNodeProps` and `getRelProps`.
pub fn register_property_procedures<N>(
    registry: &mut ProcedureRegistry,
    nodes: Arc<N>,
    config: &ProcConfig,
) -> Result<(), ProcError>
where
    N: NodeStore + Send + Sync + 'static,
{
    let store = nodes.clone();
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("getNodeProps"),
            ProcMode::Read,
            "Returns the list of values of the given property for the given nodes",
        )
        .param("nodes", ParamType::list_of(ParamType::Integer))
        .param("property", ParamType::String)
        .output("value"),
        handler(move |args| {
            let ids = int_list_arg(args, 0, "nodes")?;
            let property = string_arg(args, 1, "property")?;
            let values = node_props(store.as_ref(), &ids, property)?;
            Ok(vec![record("value", Value::Array(values))])
        }),
    )?;

    let store = nodes;
    registry.register(
        ProcedureSignature::new(
            config.procedure_name("getRelProps"),
            ProcMode::Read,
            "Returns the list of values of the given property for the given relationships",
        )
        .param("rels", ParamType::list_of(ParamType::Integer))
        .param("property", ParamType::String)
        .output("value"),
        handler(move |args| {
            let ids = int_list_arg(args, 0, "rels")?;
            let property = string_arg(args, 1, "property")?;
            let values = rel_props(store.as_ref(), &ids, property)?;
            Ok(vec![record("value", Value::Array(values))])
        }),
    )?;

    Ok(())
}
