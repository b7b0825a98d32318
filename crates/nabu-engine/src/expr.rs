//! Binding and conditional resolution for markup values.
//!
//! | Form | Meaning |
//! |------|---------|
//! | `@{scope.name}` | microapp variable `name` of microapp `scope` |
//! | `@@{name}` | engine variable `name` |
//! | `*if(cond)*then(a)*else(b)` | `a` or `b`, depending on `cond` |
//!
//! Resolution never fails: a reference that cannot be resolved is left in
//! the output exactly as written.
//!
//! Conditions are a single comparison (`==`, `!=`, `>=`, `<=`, `>`, `<`)
//! between two operands, each of which may be a single integer modulo
//! (`7 % 2`). Branch boundaries are found by plain marker search, so a
//! branch that itself contains `)` is cut short.

use crate::context::ResolutionContext;

const IF_PREFIX: &str = "*if(";
const THEN_MARKER: &str = ")*then(";
const ELSE_MARKER: &str = ")*else(";

/// Resolve `raw` against `ctx`.
pub fn resolve_value_expression(raw: &str, ctx: &ResolutionContext) -> String {
    match Conditional::split(raw) {
        Some(cond) => {
            let condition = resolve_variables(cond.condition, ctx);
            let branch = if evaluate_condition(&condition) { cond.then_branch } else { cond.else_branch };
            resolve_variables(branch, ctx)
        }
        None => resolve_variables(raw, ctx),
    }
}

// ── variables ─────────────────────────────────────────────────────────────

/// Substitute every `@{scope.name}` and `@@{name}` reference in `raw`.
pub fn resolve_variables(raw: &str, ctx: &ResolutionContext) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let tail = &rest[at..];

        let (open, engine) = if tail.starts_with("@@{") {
            (3, true)
        } else if tail.starts_with("@{") {
            (2, false)
        } else {
            out.push('@');
            rest = &tail[1..];
            continue;
        };

        let Some(close) = tail[open..].find('}') else {
            // Unterminated reference: the rest is literal.
            out.push_str(tail);
            return out;
        };
        let key = &tail[open..open + close];
        let reference = &tail[..open + close + 1];

        let value = if engine {
            ctx.engine(key)
        } else {
            key.split_once('.').and_then(|(scope, name)| ctx.microapp(scope, name))
        };
        match value {
            Some(v) => out.push_str(&v.to_string()),
            None => {
                log::trace!("unresolved reference {reference}");
                out.push_str(reference);
            }
        }
        rest = &tail[reference.len()..];
    }

    out.push_str(rest);
    out
}

// ── conditional template ──────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct Conditional<'a> {
    condition: &'a str,
    then_branch: &'a str,
    else_branch: &'a str,
}

impl<'a> Conditional<'a> {
    /// `None` when `raw` is not a well-formed conditional template.
    fn split(raw: &'a str) -> Option<Self> {
        let body = raw.strip_prefix(IF_PREFIX)?;
        let base = IF_PREFIX.len();

        let cond_end = base + body.find(THEN_MARKER)?;
        let then_start = cond_end + THEN_MARKER.len();

        let else_at = then_start + raw[then_start..].find(ELSE_MARKER)?;
        // First `)` after the then-start; never past the else marker, which
        // itself begins with `)`.
        let then_end = then_start + raw[then_start..].find(')')?;

        let else_start = else_at + ELSE_MARKER.len();
        let else_end = raw.rfind(')')?;
        if else_end < else_start {
            return None;
        }

        Some(Self {
            condition: &raw[base..cond_end],
            then_branch: &raw[then_start..then_end],
            else_branch: &raw[else_start..else_end],
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
}

/// Tried in this order; the first operator present splits the condition.
const OPERATORS: &[(&str, Op)] = &[
    ("==", Op::Eq),
    ("!=", Op::Ne),
    (">=", Op::Ge),
    ("<=", Op::Le),
    (">", Op::Gt),
    ("<", Op::Lt),
];

/// Evaluate an already variable-resolved condition.
///
/// Without an operator the condition holds only if it reads `true`.
fn evaluate_condition(condition: &str) -> bool {
    let Some((lhs, rhs, op)) = OPERATORS
        .iter()
        .find_map(|&(token, op)| condition.split_once(token).map(|(l, r)| (l, r, op)))
    else {
        return condition.trim() == "true";
    };

    let lhs = evaluate_operand(lhs);
    let rhs = evaluate_operand(rhs);

    match (lhs.parse::<f64>(), rhs.parse::<f64>()) {
        (Ok(l), Ok(r)) => match op {
            Op::Eq => l == r,
            Op::Ne => l != r,
            Op::Ge => l >= r,
            Op::Le => l <= r,
            Op::Gt => l > r,
            Op::Lt => l < r,
        },
        // Ordering is only defined between numbers.
        _ => match op {
            Op::Eq => lhs == rhs,
            Op::Ne => lhs != rhs,
            Op::Ge | Op::Le | Op::Gt | Op::Lt => false,
        },
    }
}

/// `a % b` between two integer literals, else the trimmed text.
fn evaluate_operand(operand: &str) -> String {
    let operand = operand.trim();
    let modulo = operand.split_once('%').and_then(|(a, b)| {
        let a = a.trim().parse::<i64>().ok()?;
        let b = b.trim().parse::<i64>().ok()?;
        a.checked_rem(b)
    });
    match modulo {
        Some(n) => n.to_string(),
        None => operand.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolutionContext {
        ResolutionContext::new()
            .with_microapp("app", "x", "5")
            .with_microapp("app", "name", "Ada")
            .with_engine("token", "t-1")
            .with_engine("n", 7i64)
    }

    fn resolve(raw: &str) -> String {
        resolve_value_expression(raw, &ctx())
    }

    // ── variables ─────────────────────────────────────────────────────────

    #[test]
    fn microapp_reference() {
        assert_eq!(resolve("@{app.x}"), "5");
    }

    #[test]
    fn missing_reference_stays_literal() {
        let empty = ResolutionContext::new();
        assert_eq!(resolve_value_expression("@{app.x}", &empty), "@{app.x}");
        assert_eq!(resolve_value_expression("@@{token}", &empty), "@@{token}");
    }

    #[test]
    fn engine_reference() {
        assert_eq!(resolve("@@{token}"), "t-1");
    }

    #[test]
    fn references_embedded_in_text() {
        assert_eq!(resolve("Hi @{app.name}, you have @@{n} items"), "Hi Ada, you have 7 items");
    }

    #[test]
    fn reference_without_scope_is_unresolved() {
        assert_eq!(resolve("@{x}"), "@{x}");
    }

    #[test]
    fn stray_at_and_unterminated_reference() {
        assert_eq!(resolve("mail@host"), "mail@host");
        assert_eq!(resolve("a @{app.x"), "a @{app.x");
    }

    #[test]
    fn local_overrides_win() {
        let ctx = ctx().with_local("app.x", "local").with_local("n", 0i64);
        assert_eq!(resolve_value_expression("@{app.x}/@@{n}", &ctx), "local/0");
    }

    // ── conditionals ──────────────────────────────────────────────────────

    #[test]
    fn numeric_condition_picks_then() {
        assert_eq!(resolve("*if(@{app.x} > 3)*then(big)*else(small)"), "big");
        assert_eq!(resolve("*if(@{app.x} > 9)*then(big)*else(small)"), "small");
    }

    #[test]
    fn operators_without_spaces() {
        let five = ResolutionContext::new().with_microapp("app", "x", 5i64);
        let three = ResolutionContext::new().with_microapp("app", "x", 3i64);
        let eq = "*if(@{app.x}==5)*then(A)*else(B)";
        assert_eq!(resolve_value_expression(eq, &five), "A");
        assert_eq!(resolve_value_expression(eq, &three), "B");

        let parity = "*if(@{app.x}%2==0)*then(even)*else(odd)";
        let four = ResolutionContext::new().with_microapp("app", "x", 4i64);
        assert_eq!(resolve_value_expression(parity, &four), "even");
        assert_eq!(resolve_value_expression(parity, &five), "odd");
    }

    #[test]
    fn missing_binding_in_condition_compares_literally() {
        let empty = ResolutionContext::new();
        assert_eq!(resolve_value_expression("*if(@{app.x}==5)*then(A)*else(B)", &empty), "B");
    }

    #[test]
    fn modulo_operand() {
        assert_eq!(resolve("*if(7 % 2 == 1)*then(odd)*else(even)"), "odd");
        assert_eq!(resolve("*if(@@{n} % 7 == 0)*then(div)*else(nodiv)"), "div");
    }

    #[test]
    fn modulo_by_zero_is_text() {
        assert_eq!(evaluate_operand(" 4 % 0 "), "4 % 0");
    }

    #[test]
    fn string_equality() {
        assert_eq!(resolve("*if(@{app.name} == Ada)*then(yes)*else(no)"), "yes");
        assert_eq!(resolve("*if(@{app.name} != Ada)*then(yes)*else(no)"), "no");
    }

    #[test]
    fn numeric_equality_ignores_formatting() {
        assert!(evaluate_condition("1 == 1.0"));
    }

    #[test]
    fn non_numeric_ordering_is_false() {
        // Both directions are false: ordering is undefined for text.
        assert!(!evaluate_condition("b > a"));
        assert!(!evaluate_condition("a < b"));
        assert!(!evaluate_condition("a >= a"));
    }

    #[test]
    fn operator_priority() {
        // `>=` is found before `>`.
        assert!(evaluate_condition("3 >= 3"));
        assert!(evaluate_condition("2 <= 3"));
    }

    #[test]
    fn bare_condition() {
        assert!(evaluate_condition(" true "));
        assert!(!evaluate_condition("yes"));
    }

    #[test]
    fn branches_are_resolved() {
        assert_eq!(resolve("*if(1 == 1)*then(@{app.name})*else(@@{token})"), "Ada");
        assert_eq!(resolve("*if(1 == 2)*then(@{app.name})*else(@@{token})"), "t-1");
    }

    #[test]
    fn branches_are_not_re_evaluated_as_conditionals() {
        let ctx = ResolutionContext::new().with_engine("inner", "*if(true)*then(a)*else(b)");
        assert_eq!(
            resolve_value_expression("*if(true)*then(@@{inner})*else(x)", &ctx),
            "*if(true)*then(a)*else(b)"
        );
    }

    #[test]
    fn missing_markers_fall_back_to_literal() {
        assert_eq!(resolve("*if(1 == 1)*then(a)"), "*if(1 == 1)*then(a)");
        assert_eq!(resolve("*if(1 == 1)*else(b)*then(a)"), "*if(1 == 1)*else(b)*then(a)");
        assert_eq!(resolve("*if(@{app.x} == 5"), "*if(5 == 5");
    }

    #[test]
    fn parenthesis_in_then_branch_cuts_it_short() {
        // Known limitation of marker search.
        assert_eq!(resolve("*if(true)*then(f(x))*else(y)"), "f(x");
    }

    #[test]
    fn else_branch_ends_at_last_paren() {
        assert_eq!(resolve("*if(false)*then(a)*else(g(y))"), "g(y)");
    }
}
