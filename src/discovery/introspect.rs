//! Structural view of a container, as the classifier needs it.

use std::ops::BitOr;

use thiserror::Error;

/// Access and kind flags. Bit values follow the JVM access-flag layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const PUBLIC: Modifiers = Modifiers(0x0001);
    pub const STATIC: Modifiers = Modifiers(0x0008);
    pub const INTERFACE: Modifiers = Modifiers(0x0200);
    pub const ABSTRACT: Modifiers = Modifiers(0x0400);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }

    pub const fn is_abstract(self) -> bool {
        self.contains(Self::ABSTRACT)
    }

    pub const fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }
}

impl BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Self) -> Self::Output {
        Modifiers(self.0 | rhs.0)
    }
}

/// Whether a method returns nothing or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    Unit,
    Value,
}

/// A declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    name: String,
    modifiers: Modifiers,
    parameter_count: usize,
    returns: Returns,
    annotations: Vec<String>,
}

impl MethodInfo {
    /// A public, parameterless method returning nothing and carrying no annotations.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::PUBLIC,
            parameter_count: 0,
            returns: Returns::Unit,
            annotations: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_parameters(mut self, count: usize) -> Self {
        self.parameter_count = count;
        self
    }

    pub fn returning(mut self, returns: Returns) -> Self {
        self.returns = returns;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.push(annotation.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn returns(&self) -> Returns {
        self.returns
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }
}

/// A container with its modifiers, direct supertype and declared methods (declaration order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    name: String,
    modifiers: Modifiers,
    superclass: Option<String>,
    methods: Vec<MethodInfo>,
}

impl ContainerInfo {
    /// A public, concrete container without a supertype or methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::PUBLIC,
            superclass: None,
            methods: Vec::new(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    pub fn push_method(&mut self, method: MethodInfo) {
        self.methods.push(method);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Errors produced while inspecting a container.
#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("container '{0}' not found")]
    NotFound(String),

    #[error("container '{name}' cannot be inspected: {reason}")]
    Unreadable { name: String, reason: String },
}

/// Gives structural information about containers by name.
pub trait Introspector {
    fn inspect(&self, container: &str) -> Result<ContainerInfo, IntrospectError>;
}

impl<T: Introspector + ?Sized> Introspector for std::sync::Arc<T> {
    fn inspect(&self, container: &str) -> Result<ContainerInfo, IntrospectError> {
        (**self).inspect(container)
    }
}
