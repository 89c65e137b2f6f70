//! Built-in relations wired into networks, plus wiring edge cases.

use std::borrow::Cow;

use propnet::relations::Multiplier;
use propnet::{Constraint, Network, NetworkError, Reaction, ReactionResult, Role, RoleValues};

// ============================================================================
// Multiplier
// ============================================================================

#[test]
fn multiplier_forward_and_backward() {
    let mut net: Network<i64> = Network::new();
    let [x, y, p] = [(); 3].map(|_| net.add_connector());
    net.add_multiplier(x, y, p).unwrap();

    net.set_value(p, 12).unwrap();
    net.set_value(x, 3).unwrap();
    assert_eq!(net.get_value(y), Ok(4));
}

#[test]
fn multiplier_zero_fixes_product() {
    let mut net: Network<i64> = Network::new();
    let [x, y, p] = [(); 3].map(|_| net.add_connector());
    net.add_multiplier(x, y, p).unwrap();

    net.set_value(y, 0).unwrap();
    assert_eq!(net.get_value(p), Ok(0));
    assert!(!net.has_value(x));
}

#[test]
fn multiplier_rejects_inexact_quotient() {
    let mut net: Network<i64> = Network::new();
    let [x, y, p] = [(); 3].map(|_| net.add_connector());
    net.add_multiplier(x, y, p).unwrap();

    net.set_value(p, 10).unwrap();
    let err = net.set_value(x, 3).unwrap_err();
    assert!(err.to_string().contains("10 is not divisible by 3"));
    assert!(!net.has_value(x));
}

#[test]
fn celsius_fahrenheit_converter() {
    // 9 * c = u, v * 5 = u, v + 32 = f
    let mut net: Network<f64> = Network::new();
    let c = net.add_named_connector("c");
    let f = net.add_named_connector("f");
    let [u, v, nine, five, k32] = [(); 5].map(|_| net.add_connector());
    net.add_multiplier(c, nine, u).unwrap();
    net.add_multiplier(v, five, u).unwrap();
    net.add_adder(v, k32, f).unwrap();
    net.add_constant(nine, 9.0).unwrap();
    net.add_constant(five, 5.0).unwrap();
    net.add_constant(k32, 32.0).unwrap();

    net.set_value(c, 25.0).unwrap();
    assert_eq!(net.get_value(f), Ok(77.0));

    net.drop_value(c).unwrap();
    net.drop_value(u).unwrap();
    net.drop_value(v).unwrap();
    net.drop_value(f).unwrap();
    net.set_value(f, 212.0).unwrap();
    assert_eq!(net.get_value(c), Ok(100.0));
}

// ============================================================================
// Equality and constants
// ============================================================================

#[test]
fn equality_aliases_and_forwards_drops() {
    let mut net: Network<i64> = Network::new();
    let [a, b, c] = [(); 3].map(|_| net.add_connector());
    net.add_equality(&[a, b, c]).unwrap();

    net.set_value(b, 7).unwrap();
    assert_eq!(net.get_value(a), Ok(7));
    assert_eq!(net.get_value(c), Ok(7));

    net.drop_value(a).unwrap();
    assert!(!net.has_value(b));
    assert!(!net.has_value(c));
}

#[test]
fn equality_attach_spreads_existing_value() {
    let mut net: Network<i64> = Network::new();
    let [a, b] = [(); 2].map(|_| net.add_connector());
    net.set_value(b, 3).unwrap();
    net.add_equality(&[a, b]).unwrap();
    assert_eq!(net.get_value(a), Ok(3));
}

#[test]
fn constant_injects_on_attach_and_rejects_other_values() {
    let mut net: Network<i64> = Network::new();
    let k = net.add_connector();
    net.add_constant(k, 42).unwrap();
    assert_eq!(net.get_value(k), Ok(42));

    net.drop_value(k).unwrap();
    assert!(!net.has_value(k));

    assert!(net.set_value(k, 41).unwrap_err().is_contradiction());
    net.set_value(k, 42).unwrap();
}

// ============================================================================
// Summation
// ============================================================================

#[test]
fn summation_derives_total_and_missing_term() {
    let mut net: Network<i64> = Network::new();
    let terms = [(); 4].map(|_| net.add_connector());
    let total = net.add_named_connector("total");
    let sum = net.add_summation(&terms, total).unwrap();
    assert_eq!(net.constraint_kind(sum), Some("sum"));

    for (term, value) in terms.iter().zip([1, 2, 3, 4]) {
        net.set_value(*term, value).unwrap();
    }
    assert_eq!(net.get_value(total), Ok(10));

    net.drop_value(total).unwrap();
    net.drop_value(terms[2]).unwrap();
    net.set_value(total, 20).unwrap();
    assert_eq!(net.get_value(terms[2]), Ok(13));
}

// ============================================================================
// Wiring
// ============================================================================

/// `out = 2 * input`, a user-defined relation.
struct Doubler;

impl Constraint<i64> for Doubler {
    fn kind(&self) -> &'static str {
        "doubler"
    }

    fn arity(&self) -> usize {
        2
    }

    fn role_name(&self, role: Role) -> Cow<'static, str> {
        Cow::Borrowed(if role == 0 { "input" } else { "out" })
    }

    fn on_set(&self, roles: RoleValues<'_, i64>, role: Role, value: i64) -> ReactionResult<i64> {
        match (role, roles.get(1 - role)) {
            (0, None) => Ok(Reaction::set(1, value * 2)),
            (1, None) if value % 2 == 0 => Ok(Reaction::set(0, value / 2)),
            _ => Ok(Reaction::none()),
        }
    }
}

#[test]
fn custom_constraint_bound_role_by_role() {
    let mut net: Network<i64> = Network::new();
    let [input, out] = [(); 2].map(|_| net.add_connector());
    let doubler = net.add_constraint(Doubler);

    assert_eq!(net.unbound_constraints(), vec![doubler]);
    assert_eq!(
        net.check_wiring(),
        Err(NetworkError::UnboundConstraint { constraint: doubler, role: "input".to_string() })
    );

    // Unbound constraints are not consulted
    net.bind(doubler, 1, out).unwrap();
    net.set_value(out, 8).unwrap();
    assert!(!net.has_value(input));

    net.bind(doubler, 0, input).unwrap();
    assert!(net.check_wiring().is_ok());
    net.react(doubler, out).unwrap();
    assert_eq!(net.get_value(input), Ok(4));

    // Reacting again changes nothing
    net.react(doubler, out).unwrap();
    assert_eq!(net.last_stats().writes, 0);
}

#[test]
fn removing_a_connector_unbinds_its_constraints() {
    let mut net: Network<i64> = Network::new();
    let [a, b, c] = [(); 3].map(|_| net.add_connector());
    let adder = net.add_adder(a, b, c).unwrap();

    net.remove_connector(b).unwrap();
    assert_eq!(net.bindings(adder).unwrap(), &[Some(a), None, Some(c)]);
    assert_eq!(net.unbound_constraints(), vec![adder]);

    net.set_value(a, 1).unwrap();
    net.set_value(c, 5).unwrap();

    let d = net.add_connector();
    net.bind(adder, 1, d).unwrap();
    assert_eq!(net.get_value(d), Ok(4));
}

#[test]
fn stale_handles_are_rejected() {
    let mut net: Network<i64> = Network::new();
    let a = net.add_connector();
    net.remove_connector(a).unwrap();
    let reused = net.add_connector();

    assert_eq!(a.slot().index, reused.slot().index);
    assert_eq!(net.set_value(a, 1), Err(NetworkError::UnknownConnector(a)));
    assert_eq!(net.remove_connector(a), Err(NetworkError::UnknownConnector(a)));
    assert!(net.connector(a).is_none());
    assert!(net.connector(reused).is_some());

    let k = net.add_constant(reused, 1).unwrap();
    net.remove_constraint(k).unwrap();
    assert_eq!(net.remove_constraint(k), Err(NetworkError::UnknownConstraint(k)));
    assert_eq!(net.bind(k, 0, reused), Err(NetworkError::UnknownConstraint(k)));
    assert!(net.connector(reused).unwrap().subscribers().is_empty());
    // Values outlive the constraint that produced them
    assert_eq!(net.get_value(reused), Ok(1));
}

#[test]
fn role_constants_match_bindings() {
    let mut net: Network<i64> = Network::new();
    let [x, y, p] = [(); 3].map(|_| net.add_connector());
    let m = net.add_multiplier(x, y, p).unwrap();
    let bindings = net.bindings(m).unwrap();
    assert_eq!(bindings[Multiplier::LHS], Some(x));
    assert_eq!(bindings[Multiplier::PRODUCT], Some(p));

    let constraint = net.constraint(m).unwrap();
    assert_eq!(constraint.role_name(Multiplier::RHS), "rhs");
}

#[test]
fn find_connector_by_label() {
    let mut net: Network<i64> = Network::new();
    let t = net.add_named_connector("temperature");
    let anonymous = net.add_connector();
    assert_eq!(net.find_connector("temperature"), Some(t));
    assert_eq!(net.find_connector("pressure"), None);
    assert_eq!(net.describe(t), "temperature");
    assert_eq!(net.describe(anonymous), anonymous.to_string());
}
