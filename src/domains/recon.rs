//! Reconnaissance POMDP.
//!
//! A rover moves on an x/y grid carrying tools. Water and life detectors
//! check objects for water and life; the camera photographs them. Standing
//! on a hazard may damage tools, and tools are repaired at the base.
//! Photographing an object with life earns `GOOD_PIC_WEIGHT`; photographing
//! a lifeless object costs `BAD_PIC_WEIGHT`. Each object pays out once.

use std::sync::Arc;

use crate::ast::{CpfDef, DomainDef, Expr, InstanceDef, PVariableDecl};
use crate::error::SimResult;
use crate::grounding::{ground, GroundedModel};
use crate::value::ValueType::{Bool, Real};

/// Name of the domain.
pub const DOMAIN_NAME: &str = "recon_pomdp";

fn f(name: &str, args: &[&str]) -> Expr {
    Expr::fluent(name, args)
}

fn nx(name: &str, args: &[&str]) -> Expr {
    Expr::next(name, args)
}

fn kd(e: Expr) -> Expr {
    Expr::kron_delta(e)
}

/// The agent `?a` stands on the cell holding `?o`.
fn co_located(layer: fn(&str, &[&str]) -> Expr) -> Expr {
    Expr::exists(
        &[("?x", "x_pos"), ("?y", "y_pos")],
        Expr::and(vec![layer("agentAt", &["?a", "?x", "?y"]), f("objAt", &["?o", "?x", "?y"])]),
    )
}

/// Some agent applies a tool satisfying `kind` (and `extra`) to `?o` on its cell.
fn tool_used_on(kind: &str, extra: Option<Expr>, layer: fn(&str, &[&str]) -> Expr) -> Expr {
    let mut body = vec![f("useToolOn", &["?a", "?t", "?o"]), f(kind, &["?t"])];
    body.extend(extra);
    body.push(co_located(layer));
    Expr::exists(&[("?a", "agent"), ("?t", "tool")], Expr::and(body))
}

fn picture_taken_now() -> Expr {
    tool_used_on("CAMERA_TOOL", Some(!f("damaged", &["?t"])), f)
}

/// Position update: the agent enters `(?x, ?y)` from the neighbouring cell
/// named by the chosen direction, leaves it when moving to a neighbour, and
/// otherwise stays put.
fn agent_at_cpf() -> Expr {
    let arrives = |action: &str, adj: &str, horizontal: bool| {
        let from = if horizontal {
            Expr::exists(
                &[("?x2", "x_pos")],
                Expr::and(vec![f("agentAt", &["?a", "?x2", "?y"]), f(adj, &["?x2", "?x"])]),
            )
        } else {
            Expr::exists(
                &[("?y2", "y_pos")],
                Expr::and(vec![f("agentAt", &["?a", "?x", "?y2"]), f(adj, &["?y2", "?y"])]),
            )
        };
        Expr::and(vec![f(action, &["?a"]), from])
    };
    let leaves = |action: &str, adj: &str, horizontal: bool| {
        let to = if horizontal {
            Expr::exists(&[("?x2", "x_pos")], f(adj, &["?x", "?x2"]))
        } else {
            Expr::exists(&[("?y2", "y_pos")], f(adj, &["?y", "?y2"]))
        };
        Expr::and(vec![f(action, &["?a"]), to])
    };

    let moves = [
        ("up", "ADJACENT-UP", false),
        ("down", "ADJACENT-DOWN", false),
        ("left", "ADJACENT-LEFT", true),
        ("right", "ADJACENT-RIGHT", true),
    ];
    let here = f("agentAt", &["?a", "?x", "?y"]);
    let left_cell = Expr::and(vec![
        here.clone(),
        Expr::or(moves.iter().map(|&(a, adj, h)| leaves(a, adj, h)).collect()),
    ]);

    let mut cpf = Expr::if_then_else(left_cell, kd(Expr::bool(false)), kd(here));
    for &(action, adj, horizontal) in moves.iter().rev() {
        cpf = Expr::if_then_else(arrives(action, adj, horizontal), kd(Expr::bool(true)), cpf);
    }
    cpf
}

/// Repair at the base always succeeds; an undamaged tool on a hazard breaks
/// with its `DAMAGE_PROB`.
fn damaged_cpf() -> Expr {
    let repaired = Expr::exists(
        &[("?a", "agent"), ("?x", "x_pos"), ("?y", "y_pos")],
        Expr::and(vec![
            f("repair", &["?a", "?t"]),
            f("agentAt", &["?a", "?x", "?y"]),
            f("BASE", &["?x", "?y"]),
        ]),
    );
    let exposed = Expr::and(vec![
        !f("damaged", &["?t"]),
        Expr::exists(
            &[("?a", "agent"), ("?x", "x_pos"), ("?y", "y_pos")],
            Expr::and(vec![f("agentAt", &["?a", "?x", "?y"]), f("HAZARD", &["?x", "?y"])]),
        ),
    ]);
    Expr::if_then_else(
        repaired,
        kd(Expr::bool(false)),
        Expr::if_then_else(
            exposed,
            Expr::bernoulli(f("DAMAGE_PROB", &["?t"])),
            kd(f("damaged", &["?t"])),
        ),
    )
}

/// Detection of `presence` with a `kind` tool: reliable with `DETECT_PROB`,
/// degraded to `DETECT_PROB_DAMAGED` when the tool is damaged.
fn detection_cpf(kind: &str, presence: &str) -> Expr {
    let used = |damaged: bool| {
        let state = nx("damaged", &["?t"]);
        tool_used_on(kind, Some(if damaged { state } else { !state }), nx)
    };
    Expr::if_then_else(
        !nx(presence, &["?o"]),
        kd(Expr::bool(false)),
        Expr::if_then_else(
            used(false),
            Expr::bernoulli(f("DETECT_PROB", &[])),
            Expr::if_then_else(
                used(true),
                Expr::bernoulli(f("DETECT_PROB_DAMAGED", &[])),
                kd(Expr::bool(false)),
            ),
        ),
    )
}

/// `sticky'(?o)` latches once `trigger` holds.
fn latch(name: &str, trigger: Expr) -> Expr {
    kd(Expr::or(vec![f(name, &["?o"]), trigger]))
}

/// The Reconnaissance domain definition.
#[must_use]
pub fn domain() -> DomainDef {
    let mut d = DomainDef::new(DOMAIN_NAME).with_types(&["x_pos", "y_pos", "obj", "agent", "tool"]);

    for (name, params) in [
        ("ADJACENT-LEFT", ["x_pos", "x_pos"]),
        ("ADJACENT-RIGHT", ["x_pos", "x_pos"]),
        ("ADJACENT-UP", ["y_pos", "y_pos"]),
        ("ADJACENT-DOWN", ["y_pos", "y_pos"]),
    ] {
        d = d.with_pvariable(PVariableDecl::non_fluent(name, Bool, &params, false));
    }
    d = d
        .with_pvariable(PVariableDecl::non_fluent("objAt", Bool, &["obj", "x_pos", "y_pos"], false))
        .with_pvariable(PVariableDecl::non_fluent("HAZARD", Bool, &["x_pos", "y_pos"], false))
        .with_pvariable(PVariableDecl::non_fluent("BASE", Bool, &["x_pos", "y_pos"], false))
        .with_pvariable(PVariableDecl::non_fluent("DAMAGE_PROB", Real, &["tool"], 0.0))
        .with_pvariable(PVariableDecl::non_fluent("DETECT_PROB", Real, &[], 0.8))
        .with_pvariable(PVariableDecl::non_fluent("DETECT_PROB_DAMAGED", Real, &[], 0.4))
        .with_pvariable(PVariableDecl::non_fluent("CAMERA_TOOL", Bool, &["tool"], false))
        .with_pvariable(PVariableDecl::non_fluent("LIFE_TOOL", Bool, &["tool"], false))
        .with_pvariable(PVariableDecl::non_fluent("WATER_TOOL", Bool, &["tool"], false))
        .with_pvariable(PVariableDecl::non_fluent("WATER_PROB", Real, &["obj"], 0.0))
        .with_pvariable(PVariableDecl::non_fluent("LIFE_PROB", Real, &["obj"], 0.0))
        .with_pvariable(PVariableDecl::non_fluent("GOOD_PIC_WEIGHT", Real, &[], 1.0))
        .with_pvariable(PVariableDecl::non_fluent("BAD_PIC_WEIGHT", Real, &[], 2.0));

    d = d
        .with_pvariable(PVariableDecl::state("damaged", Bool, &["tool"], false))
        .with_pvariable(PVariableDecl::state("HAS_WATER", Bool, &["obj"], false))
        .with_pvariable(PVariableDecl::state("HAS_LIFE", Bool, &["obj"], false))
        .with_pvariable(PVariableDecl::state("waterChecked", Bool, &["obj"], false))
        .with_pvariable(PVariableDecl::state("lifeChecked", Bool, &["obj"], false))
        .with_pvariable(PVariableDecl::state("pictureTaken", Bool, &["obj"], false))
        .with_pvariable(PVariableDecl::state("agentAt", Bool, &["agent", "x_pos", "y_pos"], false));

    d = d
        .with_pvariable(PVariableDecl::observ("waterObserved", Bool, &["obj"]))
        .with_pvariable(PVariableDecl::observ("lifeObserved", Bool, &["obj"]))
        .with_pvariable(PVariableDecl::observ("objDetected", Bool, &["obj"]))
        .with_pvariable(PVariableDecl::observ("agentAtObs", Bool, &["agent", "x_pos", "y_pos"]))
        .with_pvariable(PVariableDecl::observ("damagedObs", Bool, &["tool"]));

    for dir in ["up", "down", "left", "right"] {
        d = d.with_pvariable(PVariableDecl::action(dir, Bool, &["agent"], false));
    }
    d = d
        .with_pvariable(PVariableDecl::action("useToolOn", Bool, &["agent", "tool", "obj"], false))
        .with_pvariable(PVariableDecl::action("repair", Bool, &["agent", "tool"], false));

    // Life only appears where water already was at the start of the step.
    let has_water = Expr::if_then_else(
        f("HAS_WATER", &["?o"]),
        kd(Expr::bool(true)),
        Expr::bernoulli(f("WATER_PROB", &["?o"])),
    );
    let has_life = Expr::if_then_else(
        f("HAS_LIFE", &["?o"]),
        kd(Expr::bool(true)),
        Expr::if_then_else(
            f("HAS_WATER", &["?o"]),
            Expr::bernoulli(f("LIFE_PROB", &["?o"])),
            kd(Expr::bool(false)),
        ),
    );

    d = d
        .with_cpf(CpfDef::new("damaged", &["?t"], damaged_cpf()))
        .with_cpf(CpfDef::new("HAS_WATER", &["?o"], has_water))
        .with_cpf(CpfDef::new("HAS_LIFE", &["?o"], has_life))
        .with_cpf(CpfDef::new("waterChecked", &["?o"], latch("waterChecked", tool_used_on("WATER_TOOL", None, f))))
        .with_cpf(CpfDef::new("lifeChecked", &["?o"], latch("lifeChecked", tool_used_on("LIFE_TOOL", None, f))))
        .with_cpf(CpfDef::new("pictureTaken", &["?o"], latch("pictureTaken", picture_taken_now())))
        .with_cpf(CpfDef::new("agentAt", &["?a", "?x", "?y"], agent_at_cpf()));

    d = d
        .with_cpf(CpfDef::new("waterObserved", &["?o"], detection_cpf("WATER_TOOL", "HAS_WATER")))
        .with_cpf(CpfDef::new("lifeObserved", &["?o"], detection_cpf("LIFE_TOOL", "HAS_LIFE")))
        .with_cpf(CpfDef::new(
            "objDetected",
            &["?o"],
            kd(Expr::or(vec![f("waterObserved", &["?o"]), f("lifeObserved", &["?o"])])),
        ))
        .with_cpf(CpfDef::new("agentAtObs", &["?a", "?x", "?y"], kd(nx("agentAt", &["?a", "?x", "?y"]))))
        .with_cpf(CpfDef::new("damagedObs", &["?t"], kd(nx("damaged", &["?t"]))));

    let picture_value = Expr::if_then_else(
        f("HAS_LIFE", &["?o"]),
        f("GOOD_PIC_WEIGHT", &[]),
        -f("BAD_PIC_WEIGHT", &[]),
    );
    let reward = Expr::sum(
        &[("?o", "obj")],
        Expr::if_then_else(
            Expr::and(vec![picture_taken_now(), !f("pictureTaken", &["?o"])]),
            picture_value,
            Expr::real(0.0),
        ),
    );

    d.with_reward(reward)
}

/// A 3x3 grid with two objects and one rover carrying one tool of each kind.
///
/// The base is at `(x1, y1)`, a hazard at `(x3, y3)`; `o1` at `(x2, y2)` has
/// water and life, `o2` at `(x3, y1)` has neither.
#[must_use]
pub fn instance() -> InstanceDef {
    let mut inst = InstanceDef::new("recon_inst_grid3", DOMAIN_NAME)
        .with_objects("x_pos", &["x1", "x2", "x3"])
        .with_objects("y_pos", &["y1", "y2", "y3"])
        .with_objects("obj", &["o1", "o2"])
        .with_objects("agent", &["a1"])
        .with_objects("tool", &["w1", "l1", "p1"]);

    for (a, b) in [("x1", "x2"), ("x2", "x3")] {
        inst = inst
            .with_non_fluent("ADJACENT-RIGHT", &[a, b], true)
            .with_non_fluent("ADJACENT-LEFT", &[b, a], true);
    }
    for (a, b) in [("y1", "y2"), ("y2", "y3")] {
        inst = inst
            .with_non_fluent("ADJACENT-UP", &[a, b], true)
            .with_non_fluent("ADJACENT-DOWN", &[b, a], true);
    }

    inst.with_non_fluent("BASE", &["x1", "y1"], true)
        .with_non_fluent("HAZARD", &["x3", "y3"], true)
        .with_non_fluent("objAt", &["o1", "x2", "y2"], true)
        .with_non_fluent("objAt", &["o2", "x3", "y1"], true)
        .with_non_fluent("WATER_TOOL", &["w1"], true)
        .with_non_fluent("LIFE_TOOL", &["l1"], true)
        .with_non_fluent("CAMERA_TOOL", &["p1"], true)
        .with_non_fluent("DAMAGE_PROB", &["w1"], 0.5)
        .with_non_fluent("DAMAGE_PROB", &["l1"], 0.5)
        .with_non_fluent("DAMAGE_PROB", &["p1"], 0.5)
        .with_init("agentAt", &["a1", "x1", "y1"], true)
        .with_init("HAS_WATER", &["o1"], true)
        .with_init("HAS_LIFE", &["o1"], true)
        .with_max_nondef_actions(1)
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
