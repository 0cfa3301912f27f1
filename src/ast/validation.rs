//! Structural validation of definitions.
//!
//! This covers what can be checked without grounding: identifier syntax,
//! duplicate declarations and episode parameters. Reference resolution is the
//! grounder's job.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{InstantiationError, ModelError};

use super::domain::DomainDef;
use super::expr::{Expr, Term};
use super::instance::InstanceDef;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier_regex() -> &'static Regex {
    IDENTIFIER.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_\-]*$").expect("identifier pattern compiles")
    })
}

/// Returns true if `name` is a valid type, fluent, object or variable name.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

fn check_identifier(name: &str) -> Result<(), ModelError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ModelError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}

fn check_unique<'a>(
    kind: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::Duplicate {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_expr_identifiers(expr: &Expr) -> Result<(), ModelError> {
    let mut result = Ok(());
    expr.visit(&mut |e| {
        if result.is_err() {
            return;
        }
        let check = match e {
            Expr::Fluent { name, args, .. } => check_identifier(name).and_then(|()| {
                args.iter().try_for_each(|t| match t {
                    Term::Var(v) | Term::Object(v) => check_identifier(v),
                })
            }),
            Expr::Term {
                term: Term::Var(v) | Term::Object(v),
            } => check_identifier(v),
            Expr::Aggregate { vars, .. } => vars.iter().try_for_each(|v| {
                check_identifier(&v.var)?;
                check_identifier(&v.type_name)
            }),
            _ => Ok(()),
        };
        if check.is_err() {
            result = check;
        }
    });
    result
}

impl DomainDef {
    /// Validates identifiers and rejects duplicate declarations.
    pub fn validate(&self) -> Result<(), ModelError> {
        check_identifier(&self.name)?;
        for t in &self.types {
            check_identifier(t)?;
        }
        check_unique("type", self.types.iter().map(String::as_str))?;

        for p in &self.pvariables {
            check_identifier(&p.name)?;
            for param in &p.params {
                check_identifier(param)?;
            }
        }
        check_unique("pvariable", self.pvariables.iter().map(|p| p.name.as_str()))?;

        for cpf in &self.cpfs {
            check_identifier(&cpf.fluent)?;
            for param in &cpf.params {
                check_identifier(param)?;
            }
            check_unique("CPF parameter", cpf.params.iter().map(String::as_str))?;
            check_expr_identifiers(&cpf.expr)?;
        }
        check_unique("CPF", self.cpfs.iter().map(|c| c.fluent.as_str()))?;

        check_expr_identifiers(&self.reward)?;
        for c in &self.state_action_constraints {
            check_expr_identifiers(c)?;
        }
        Ok(())
    }
}

impl InstanceDef {
    /// Validates episode parameters and object names.
    pub fn validate(&self) -> Result<(), InstantiationError> {
        if self.horizon == 0 {
            return Err(InstantiationError::InvalidHorizon);
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(InstantiationError::InvalidDiscount {
                value: self.discount,
            });
        }

        let mut seen = HashSet::new();
        for decl in &self.objects {
            for object in &decl.objects {
                if !is_identifier(object) {
                    return Err(InstantiationError::InvalidObjectName {
                        object: object.clone(),
                    });
                }
                if !seen.insert(object.as_str()) {
                    return Err(InstantiationError::DuplicateObject {
                        object: object.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CpfDef, PVariableDecl};
    use crate::value::ValueType;

    #[test]
    fn identifiers_follow_language_rules() {
        assert!(is_identifier("agentAt"));
        assert!(is_identifier("ADJACENT-LEFT"));
        assert!(is_identifier("x_pos"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a b"));
    }

    #[test]
    fn duplicate_pvariables_are_rejected() {
        let domain = DomainDef::new("d")
            .with_pvariable(PVariableDecl::state("s", ValueType::Bool, &[], false))
            .with_pvariable(PVariableDecl::state("s", ValueType::Bool, &[], false));
        assert!(matches!(domain.validate(), Err(ModelError::Duplicate { .. })));
    }

    #[test]
    fn bad_identifier_in_expression_is_rejected() {
        let domain = DomainDef::new("d").with_cpf(CpfDef::new(
            "s",
            &[],
            Expr::fluent("bad name", &[]),
        ));
        assert!(matches!(
            domain.validate(),
            Err(ModelError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn instance_parameters_are_checked() {
        let inst = InstanceDef::new("i", "d").with_horizon(0);
        assert_eq!(inst.validate(), Err(InstantiationError::InvalidHorizon));

        let inst = InstanceDef::new("i", "d").with_discount(1.5);
        assert!(matches!(
            inst.validate(),
            Err(InstantiationError::InvalidDiscount { .. })
        ));

        let inst = InstanceDef::new("i", "d")
            .with_objects("obj", &["o1"])
            .with_objects("tool", &["o1"]);
        assert!(matches!(
            inst.validate(),
            Err(InstantiationError::DuplicateObject { .. })
        ));
    }
}
