//! `schemas` and `show` commands.

use anyhow::Context;
use iot_console::SchemaRegistry;

use crate::render;

pub fn run_schemas(registry: &SchemaRegistry, json: bool) -> anyhow::Result<()> {
    if json {
        let schemas = registry.all().collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }
    for line in render::schema_list(registry) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_show(registry: &SchemaRegistry, id: &str) -> anyhow::Result<()> {
    let schema = registry
        .get(id)
        .with_context(|| format!("unknown message type '{id}'"))?;
    let fields = schema
        .fields
        .iter()
        .map(|field| (field, field.default_value.as_ref()))
        .collect::<Vec<_>>();
    for line in render::schema_fields(schema, &fields) {
        println!("{line}");
    }
    Ok(())
}
