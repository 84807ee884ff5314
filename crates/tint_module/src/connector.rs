//! Typed connection points of data-processing interfaces

use std::any::Any;
use tint_core::object::{DeepCopy, Entity, EntityType, NameType, Object, Ref};
use tint_core::registration::registration_match;
use tint_core::{Allocator, CoreError, Describe, StructKind};

/// Which side of an edge a connector sits on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Input, pulls data from a socket
    Plug,
    /// Output, provides data to plugs
    Socket,
}

/// Connector declaration with a data type and multiplicity bounds
pub struct Connector {
    direction: Direction,
    /// Registration-style data type, e.g. `//color/image`
    data_type: String,
    min: usize,
    max: usize,
    object: Object,
}

impl Connector {
    /// Declare an input connector
    pub fn plug(
        name: &str,
        data_type: &str,
        min: usize,
        max: usize,
    ) -> tint_core::Result<Ref<Connector>> {
        Self::build(Direction::Plug, name, data_type, min, max, None)
    }

    /// Declare an output connector
    pub fn socket(
        name: &str,
        data_type: &str,
        min: usize,
        max: usize,
    ) -> tint_core::Result<Ref<Connector>> {
        Self::build(Direction::Socket, name, data_type, min, max, None)
    }

    /// Declare a connector with an explicit allocator
    pub fn build(
        direction: Direction,
        name: &str,
        data_type: &str,
        min: usize,
        max: usize,
        alloc: Option<Allocator>,
    ) -> tint_core::Result<Ref<Connector>> {
        if max == 0 || min > max || data_type.is_empty() {
            let err = CoreError::allocation_failed(
                StructKind::Connector,
                format!(
                    "connector '{}' has bounds {}..={} and type '{}'",
                    name, min, max, data_type
                ),
            );
            log::warn!("{}", err);
            return Err(err);
        }
        let object = Object::new(StructKind::Connector, alloc);
        object.set_name(NameType::Nick, name);
        Ok(Ref::new(Self {
            direction,
            data_type: data_type.to_string(),
            min,
            max,
            object,
        }))
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Minimum number of connections for a complete graph
    pub fn min(&self) -> usize {
        self.min
    }

    /// Maximum number of simultaneous connections
    pub fn max(&self) -> usize {
        self.max
    }

    pub fn name(&self) -> String {
        self.object.name(NameType::Nick).unwrap_or_default()
    }

    /// Whether a connection between this connector and `other` is allowed:
    /// opposite directions and matching data types
    pub fn accepts(&self, other: &Connector) -> bool {
        self.direction != other.direction
            && (registration_match(&other.data_type, &self.data_type, None) > 0
                || registration_match(&self.data_type, &other.data_type, None) > 0)
    }
}

impl Entity for Connector {
    fn object(&self) -> &Object {
        &self.object
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl EntityType for Connector {
    fn describe(&self, form: Describe) -> String {
        match form {
            Describe::Long => format!(
                "{} {:?} {} [{}..{}]",
                self.name(),
                self.direction,
                self.data_type,
                self.min,
                self.max
            ),
            _ => self.object.default_description(form),
        }
    }
}

impl DeepCopy for Connector {
    fn deep_copy(&self, object: Object) -> tint_core::Result<Self> {
        Ok(Self {
            direction: self.direction,
            data_type: self.data_type.clone(),
            min: self.min,
            max: self.max,
            object,
        })
    }
}
