//! Node contexts
//!
//! A node whose interface names a context type needs a serialized context
//! before it runs. The context comes from a context-builder interface of
//! the same data type, preferably from the node's own module, whose context
//! type tag matches.

use crate::error::{GraphError, Result};
use crate::node::FilterNode;
use tint_core::object::{Entity, NameType, Ref};
use tint_core::registration::{field, RegField};
use tint_core::Blob;
use tint_module::{ApiKind, ModuleError, ModuleRegistry, SelectRequest};

/// Pattern selecting context builders for `registration`, e.g. `//color`
/// for `org/tint/color/icc_color.lcms`
pub fn builder_pattern(registration: &str) -> String {
    match field(registration, RegField::Type) {
        Some(ty) => format!("//{}", ty),
        None => String::new(),
    }
}

/// Build and attach the context of `node`. Returns `None` for nodes without
/// a context type; an already built context is reused.
pub fn build_context(registry: &ModuleRegistry, node: &Ref<FilterNode>) -> Result<Option<Ref<Blob>>> {
    let context_type = node.context_type().to_string();
    if context_type.is_empty() {
        return Ok(None);
    }
    if let Some(existing) = node.context_blob() {
        return Ok(Some(existing));
    }

    let request = SelectRequest::new(builder_pattern(node.registration()))
        .kind(ApiKind::ContextBuilder)
        .preferred(node.core().api().module());

    let builder = registry
        .select(request)
        .into_iter()
        .filter_map(|ranked| {
            let api = ranked.api.as_context_builder()?;
            if api.context_type != context_type {
                return None;
            }
            api.builder.clone()
        })
        .next()
        .ok_or_else(|| GraphError::NoContext {
            node: node.id(),
            context_type: context_type.clone(),
        })?;

    let data = builder
        .context_to_mem(&**node)
        .map_err(|status| ModuleError::call_failed("context_to_mem", status))?;
    let blob = Blob::tagged(data, context_type.as_str(), None);
    if let Some(text) = builder.describe(&**node) {
        blob.object().set_name(NameType::Description, text);
    }
    log::debug!(
        "Built '{}' context of {} bytes for node {}",
        context_type,
        blob.len(),
        node.id()
    );
    node.set_context(Some(blob.clone()));
    Ok(Some(blob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_pattern() {
        assert_eq!(builder_pattern("org/tint/color/icc_color.lcms"), "//color");
        assert_eq!(builder_pattern("org/tint"), "");
    }
}
