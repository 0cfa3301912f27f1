//! Elevators.
//!
//! Passengers arrive at floors wanting to go up or down. Elevators pick them
//! up when they stop at a floor with their door open in the passenger's
//! direction, and drop them off at the top or bottom floor. Every waiting
//! passenger costs 1 per step; riding passengers cost a small penalty when
//! the elevator heads their way and a large one when it does not.

use std::sync::Arc;

use crate::ast::{CpfDef, DomainDef, Expr, InstanceDef, PVariableDecl};
use crate::error::SimResult;
use crate::grounding::{ground, GroundedModel};
use crate::value::ValueType::{Bool, Real};

/// Name of the domain.
pub const DOMAIN_NAME: &str = "elevators_mdp";

fn f(name: &str, args: &[&str]) -> Expr {
    Expr::fluent(name, args)
}

fn kd(e: Expr) -> Expr {
    Expr::kron_delta(e)
}

fn open_heading(up: bool) -> Expr {
    let dir = f("elevator-dir-up", &["?e"]);
    Expr::and(vec![
        f("elevator-at-floor", &["?e", "?f"]),
        if up { dir } else { !dir },
        !f("elevator-closed", &["?e"]),
    ])
}

fn waiting_cpf(name: &str, up: bool) -> Expr {
    Expr::if_then_else(
        Expr::and(vec![
            f(name, &["?f"]),
            !Expr::exists(&[("?e", "elevator")], open_heading(up)),
        ]),
        kd(Expr::bool(true)),
        Expr::bernoulli(f("ARRIVE-PARAM", &["?f"])),
    )
}

fn riding_cpf(name: &str, up: bool) -> Expr {
    let (terminal, waiting) = if up {
        ("TOP-FLOOR", "person-waiting-up")
    } else {
        ("BOTTOM-FLOOR", "person-waiting-down")
    };
    Expr::if_then_else(
        f(name, &["?e"]),
        kd(!Expr::exists(
            &[("?f", "floor")],
            Expr::and(vec![f("elevator-at-floor", &["?e", "?f"]), f(terminal, &["?f"])]),
        )),
        kd(Expr::exists(
            &[("?f", "floor")],
            Expr::and(vec![f(waiting, &["?f"]), open_heading(up)]),
        )),
    )
}

fn at_floor_cpf() -> Expr {
    let here = f("elevator-at-floor", &["?e", "?f"]);
    let moving = f("move-current-dir", &["?e"]);
    let dir_up = f("elevator-dir-up", &["?e"]);
    let from_below = Expr::exists(
        &[("?cur", "floor")],
        Expr::and(vec![f("elevator-at-floor", &["?e", "?cur"]), f("ADJACENT-UP", &["?cur", "?f"])]),
    );
    let from_above = Expr::exists(
        &[("?cur", "floor")],
        Expr::and(vec![f("elevator-at-floor", &["?e", "?cur"]), f("ADJACENT-UP", &["?f", "?cur"])]),
    );
    let stuck_at_top = Expr::and(vec![
        here.clone(),
        !Expr::exists(&[("?nxt", "floor")], f("ADJACENT-UP", &["?f", "?nxt"])),
    ]);
    let stuck_at_bottom = Expr::and(vec![
        here.clone(),
        !Expr::exists(&[("?nxt", "floor")], f("ADJACENT-UP", &["?nxt", "?f"])),
    ]);

    Expr::if_then_else(
        Expr::or(vec![!f("elevator-closed", &["?e"]), !moving.clone()]),
        kd(here),
        Expr::if_then_else(
            Expr::and(vec![dir_up.clone(), from_below]),
            kd(Expr::bool(true)),
            Expr::if_then_else(
                Expr::and(vec![!dir_up.clone(), from_above]),
                kd(Expr::bool(true)),
                Expr::if_then_else(
                    Expr::and(vec![dir_up.clone(), stuck_at_top]),
                    kd(Expr::bool(true)),
                    Expr::if_then_else(
                        Expr::and(vec![!dir_up, stuck_at_bottom]),
                        kd(Expr::bool(true)),
                        kd(Expr::bool(false)),
                    ),
                ),
            ),
        ),
    )
}

fn rider_penalty(weight: &str, rider: &str, heading_up: bool) -> Expr {
    let dir = f("elevator-dir-up", &["?e"]);
    Expr::sum(
        &[("?e", "elevator")],
        -f(weight, &[]) * Expr::and(vec![f(rider, &["?e"]), if heading_up { dir } else { !dir }]),
    )
}

/// The Elevators domain definition.
#[must_use]
pub fn domain() -> DomainDef {
    let mut d = DomainDef::new(DOMAIN_NAME)
        .with_types(&["elevator", "floor"])
        .with_pvariable(PVariableDecl::non_fluent("ELEVATOR-PENALTY-RIGHT-DIR", Real, &[], 0.75))
        .with_pvariable(PVariableDecl::non_fluent("ELEVATOR-PENALTY-WRONG-DIR", Real, &[], 3.0))
        .with_pvariable(PVariableDecl::non_fluent("ADJACENT-UP", Bool, &["floor", "floor"], false))
        .with_pvariable(PVariableDecl::non_fluent("TOP-FLOOR", Bool, &["floor"], false))
        .with_pvariable(PVariableDecl::non_fluent("BOTTOM-FLOOR", Bool, &["floor"], false))
        .with_pvariable(PVariableDecl::non_fluent("ARRIVE-PARAM", Real, &["floor"], 0.0));

    for name in ["person-waiting-up", "person-waiting-down"] {
        d = d.with_pvariable(PVariableDecl::state(name, Bool, &["floor"], false));
    }
    for name in ["person-in-elevator-going-up", "person-in-elevator-going-down"] {
        d = d.with_pvariable(PVariableDecl::state(name, Bool, &["elevator"], false));
    }
    d = d
        .with_pvariable(PVariableDecl::state("elevator-dir-up", Bool, &["elevator"], true))
        .with_pvariable(PVariableDecl::state("elevator-closed", Bool, &["elevator"], true))
        .with_pvariable(PVariableDecl::state("elevator-at-floor", Bool, &["elevator", "floor"], false));

    for name in ["move-current-dir", "open-door-going-up", "open-door-going-down", "close-door"] {
        d = d.with_pvariable(PVariableDecl::action(name, Bool, &["elevator"], false));
    }

    let closed = kd(Expr::or(vec![
        Expr::and(vec![
            f("elevator-closed", &["?e"]),
            !f("open-door-going-up", &["?e"]),
            !f("open-door-going-down", &["?e"]),
        ]),
        f("close-door", &["?e"]),
    ]));
    let dir_up = Expr::if_then_else(
        f("open-door-going-up", &["?e"]),
        kd(Expr::bool(true)),
        Expr::if_then_else(
            f("open-door-going-down", &["?e"]),
            kd(Expr::bool(false)),
            kd(f("elevator-dir-up", &["?e"])),
        ),
    );

    d = d
        .with_cpf(CpfDef::new("person-waiting-up", &["?f"], waiting_cpf("person-waiting-up", true)))
        .with_cpf(CpfDef::new("person-waiting-down", &["?f"], waiting_cpf("person-waiting-down", false)))
        .with_cpf(CpfDef::new(
            "person-in-elevator-going-up",
            &["?e"],
            riding_cpf("person-in-elevator-going-up", true),
        ))
        .with_cpf(CpfDef::new(
            "person-in-elevator-going-down",
            &["?e"],
            riding_cpf("person-in-elevator-going-down", false),
        ))
        .with_cpf(CpfDef::new("elevator-closed", &["?e"], closed))
        .with_cpf(CpfDef::new("elevator-dir-up", &["?e"], dir_up))
        .with_cpf(CpfDef::new("elevator-at-floor", &["?e", "?f"], at_floor_cpf()));

    let right = "ELEVATOR-PENALTY-RIGHT-DIR";
    let wrong = "ELEVATOR-PENALTY-WRONG-DIR";
    let reward = rider_penalty(right, "person-in-elevator-going-up", true)
        + rider_penalty(right, "person-in-elevator-going-down", false)
        + rider_penalty(wrong, "person-in-elevator-going-up", false)
        + rider_penalty(wrong, "person-in-elevator-going-down", true)
        + Expr::sum(
            &[("?f", "floor")],
            -f("person-waiting-up", &["?f"]) - f("person-waiting-down", &["?f"]),
        );

    // At most one action per elevator per step.
    let one_action = Expr::forall(
        &[("?e", "elevator")],
        Expr::le(
            f("open-door-going-up", &["?e"])
                + f("open-door-going-down", &["?e"])
                + f("close-door", &["?e"])
                + f("move-current-dir", &["?e"]),
            Expr::int(1),
        ),
    );

    d.with_reward(reward).with_constraint(one_action)
}

/// One elevator serving three floors.
#[must_use]
pub fn instance() -> InstanceDef {
    InstanceDef::new("elevators_inst_1e3f", DOMAIN_NAME)
        .with_objects("elevator", &["e0"])
        .with_objects("floor", &["f0", "f1", "f2"])
        .with_non_fluent("ADJACENT-UP", &["f0", "f1"], true)
        .with_non_fluent("ADJACENT-UP", &["f1", "f2"], true)
        .with_non_fluent("TOP-FLOOR", &["f2"], true)
        .with_non_fluent("BOTTOM-FLOOR", &["f0"], true)
        .with_non_fluent("ARRIVE-PARAM", &["f1"], 0.14)
        .with_non_fluent("ARRIVE-PARAM", &["f2"], 0.14)
        .with_init("elevator-at-floor", &["e0", "f0"], true)
        .with_horizon(40)
        .with_discount(1.0)
}

/// Grounds [`domain`] against [`instance`].
///
/// # Errors
///
/// Fails only if the bundled definitions are inconsistent.
pub fn model() -> SimResult<Arc<GroundedModel>> {
    ground(&domain(), &instance())
}
