//! Error types for fluentsim.
//!
//! Every failure is strongly typed using thiserror, one enum per category:
//! construction-time failures (`ModelError`, `InstantiationError`) abort engine
//! creation, while step-time failures (`ActionError`, `DomainError`) leave the
//! committed state untouched so the caller can resubmit.

use thiserror::Error;

/// Malformed domain definitions. Fatal at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Unknown type '{type_name}' referenced by {context}")]
    UnknownType {
        type_name: String,
        context: String,
    },

    #[error("Unknown fluent '{name}' referenced by {context}")]
    UnknownFluent {
        name: String,
        context: String,
    },

    #[error("Fluent '{fluent}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        fluent: String,
        expected: usize,
        actual: usize,
    },

    #[error("Object '{object}' is not in the domain of type '{type_name}' (argument of '{fluent}')")]
    ObjectOutOfDomain {
        fluent: String,
        object: String,
        type_name: String,
    },

    #[error("Variable '{var}' is not bound in {context}")]
    UnboundVariable {
        var: String,
        context: String,
    },

    #[error("Variable '{var}' has type '{actual}' but '{fluent}' expects '{expected}'")]
    VariableTypeMismatch {
        var: String,
        fluent: String,
        expected: String,
        actual: String,
    },

    #[error("Duplicate {kind} declaration '{name}'")]
    Duplicate {
        kind: String,
        name: String,
    },

    #[error("Invalid identifier '{name}'")]
    InvalidIdentifier {
        name: String,
    },

    #[error("Fluent '{fluent}' has no CPF")]
    MissingCpf {
        fluent: String,
    },

    #[error("CPF declared for '{fluent}', which is not a state or observ fluent")]
    UnexpectedCpf {
        fluent: String,
    },

    #[error("Invalid default for '{fluent}': {reason}")]
    InvalidDefault {
        fluent: String,
        reason: String,
    },

    #[error("{context} may not read '{fluent}': {reason}")]
    IllegalReference {
        fluent: String,
        context: String,
        reason: String,
    },

    #[error("Invalid expression in {context}: {reason}")]
    InvalidExpression {
        context: String,
        reason: String,
    },

    #[error("Cyclic CPF dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        cycle: Vec<String>,
    },
}

/// Errors binding an instance to a domain. Fatal at construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstantiationError {
    #[error("Object domain for type '{type_name}' is empty")]
    EmptyObjectDomain {
        type_name: String,
    },

    #[error("Instance '{instance}' targets domain '{expected}', got '{actual}'")]
    DomainMismatch {
        instance: String,
        expected: String,
        actual: String,
    },

    #[error("Object '{object}' declared more than once")]
    DuplicateObject {
        object: String,
    },

    #[error("Invalid object name '{object}'")]
    InvalidObjectName {
        object: String,
    },

    #[error("Objects declared for unknown type '{type_name}'")]
    UnknownObjectType {
        type_name: String,
    },

    #[error("Value for '{fluent}' has type {actual}, expected {expected}")]
    ValueTypeMismatch {
        fluent: String,
        expected: String,
        actual: String,
    },

    #[error("{context} references undeclared fluent '{fluent}'")]
    UndeclaredFluent {
        fluent: String,
        context: String,
    },

    #[error("{context} references '{fluent}', which is a {actual} fluent")]
    WrongFluentKind {
        fluent: String,
        context: String,
        actual: String,
    },

    #[error("Horizon must be > 0")]
    InvalidHorizon,

    #[error("Discount {value} is out of range [0.0, 1.0]")]
    InvalidDiscount {
        value: f64,
    },
}

/// Rejected action submissions. Recoverable: engine state is unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("Action has {actual} non-default fluents, maximum is {max}")]
    TooManyNonDefault {
        max: usize,
        actual: usize,
    },

    #[error("Unknown action fluent '{fluent}'")]
    UnknownFluent {
        fluent: String,
    },

    #[error("'{fluent}' is not an action fluent")]
    NotAnAction {
        fluent: String,
    },

    #[error("Action '{fluent}' expects {expected} arguments, got {actual}")]
    ArityMismatch {
        fluent: String,
        expected: usize,
        actual: usize,
    },

    #[error("Object '{object}' is not a valid '{type_name}' argument for action '{fluent}'")]
    UnknownObject {
        fluent: String,
        object: String,
        type_name: String,
    },

    #[error("Action '{fluent}' expects a {expected} value, got {actual}")]
    ValueTypeMismatch {
        fluent: String,
        expected: String,
        actual: String,
    },

    #[error("Action '{fluent}' assigned more than once")]
    DuplicateAssignment {
        fluent: String,
    },

    #[error("State-action constraint #{index} is violated")]
    ConstraintViolated {
        index: usize,
    },
}

/// Evaluation failures while stepping. Recoverable per step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Bernoulli probability {value} is out of range [0.0, 1.0] in {context}")]
    ProbabilityOutOfRange {
        value: f64,
        context: String,
    },

    #[error("Uniform bounds [{low}, {high}) are invalid in {context}")]
    InvalidBounds {
        low: f64,
        high: f64,
        context: String,
    },

    #[error("Expected {expected}, found {found} in {context}")]
    TypeMismatch {
        expected: String,
        found: String,
        context: String,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero {
        context: String,
    },
}

/// Configuration rejected by `validate()`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration '{field}': {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },
}

/// Reason a step was refused for lifecycle reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EpisodeEnded {
    #[error("Episode ended after {horizon} steps")]
    HorizonReached {
        horizon: u32,
    },

    #[error("Episode has not been reset")]
    NotStarted,
}

/// Top-level error type for fluentsim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Instantiation error: {0}")]
    Instantiation(#[from] InstantiationError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    EpisodeEnded(#[from] EpisodeEnded),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SimError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised while building a model.
    #[must_use]
    pub const fn is_construction(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Instantiation(_))
    }

    /// Returns true if this is an action error.
    #[must_use]
    pub const fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }

    /// Returns true if this is a domain error.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }

    /// Returns true if the episode refused a step for lifecycle reasons.
    #[must_use]
    pub const fn is_episode_ended(&self) -> bool {
        matches!(self, Self::EpisodeEnded(_))
    }

    /// Returns true if the engine is still usable after this error.
    ///
    /// Recoverable errors never touch committed state; the caller may resubmit.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Action(_) | Self::Domain(_) => true,
            Self::EpisodeEnded(e) => matches!(e, EpisodeEnded::NotStarted),
            Self::Model(_) | Self::Instantiation(_) | Self::Config(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for fluentsim operations.
pub type SimResult<T> = Result<T, SimError>;
