use lyra_engine::analysis::domain::AbstractDomain;
use lyra_engine::analysis::interval::{Bound, Interval};
use lyra_engine::analysis::parity::Parity;
use lyra_engine::analysis::taint::{Taint, TaintDomain, TaintThreeLevels};

fn range(low: i64, high: i64) -> Interval {
    Interval::range(Bound::Int(low), Bound::Int(high))
}

#[test]
fn interval_join_and_meet() {
    assert_eq!(range(0, 5).join(&range(3, 10)), range(0, 10));
    assert_eq!(range(0, 5).meet(&range(3, 10)), range(3, 5));
    // disjoint ranges have no common value
    assert_eq!(range(0, 1).meet(&range(3, 4)), Interval::Bottom);

    assert_eq!(Interval::Bottom.join(&range(1, 2)), range(1, 2));
    assert_eq!(Interval::Bottom.meet(&range(1, 2)), Interval::Bottom);
    assert_eq!(Interval::top().meet(&range(1, 2)), range(1, 2));
}

#[test]
fn interval_ordering() {
    assert!(Interval::Bottom.leq(&range(0, 0)));
    assert!(range(1, 2).leq(&range(0, 3)));
    assert!(!range(0, 3).leq(&range(1, 2)));
    assert!(range(0, 3).leq(&Interval::top()));
    assert!(!Interval::top().leq(&range(0, 3)));
}

#[test]
fn interval_inconsistent_bounds_collapse() {
    assert_eq!(range(3, 1), Interval::Bottom);
    assert_eq!(
        Interval::range(Bound::PosInf, Bound::NegInf),
        Interval::Bottom
    );
}

#[test]
fn interval_widening_jumps_to_infinity() {
    assert_eq!(
        range(0, 2).widen(&range(0, 3)),
        Interval::range(Bound::Int(0), Bound::PosInf)
    );
    assert_eq!(
        range(0, 3).widen(&range(-1, 3)),
        Interval::range(Bound::NegInf, Bound::Int(3))
    );
    // a shrinking iterate does not move the bounds
    assert_eq!(range(0, 2).widen(&range(0, 1)), range(0, 2));
}

#[test]
fn interval_widening_terminates() {
    // any strictly growing chain stabilizes in a bounded number of widenings
    let mut current = range(0, 0);
    let mut steps = 0;
    for k in 1..100 {
        let next = current.widen(&range(-k, k));
        if next == current {
            break;
        }
        current = next;
        steps += 1;
    }
    assert_eq!(current, Interval::top());
    assert!(steps <= 3);
}

#[test]
fn interval_narrowing_refines_infinite_bounds_only() {
    let widened = Interval::range(Bound::Int(0), Bound::PosInf);
    assert_eq!(widened.narrow(&range(0, 10)), range(0, 10));
    assert_eq!(Interval::top().narrow(&range(-5, 5)), range(-5, 5));
    // finite bounds are already precise and stay put
    assert_eq!(range(0, 5).narrow(&range(0, 3)), range(0, 5));
    assert_eq!(Interval::Bottom.narrow(&range(0, 3)), Interval::Bottom);
    assert_eq!(range(0, 3).narrow(&Interval::Bottom), Interval::Bottom);
}

#[test]
fn taint_two_levels() {
    assert_eq!(Taint::top(), Taint::Tainted);
    assert_eq!(Taint::Clean.join(&Taint::Tainted), Taint::Tainted);
    assert_eq!(Taint::Clean.meet(&Taint::Tainted), Taint::Clean);
    assert!(Taint::Bottom.leq(&Taint::Clean));
    assert!(Taint::Clean.leq(&Taint::Tainted));
    assert!(!Taint::Tainted.leq(&Taint::Clean));

    // in the two-level lattice, Tainted only ever means "might be"
    assert!(!Taint::Tainted.is_always_tainted());
    assert!(Taint::Tainted.is_possibly_tainted());
    assert!(!Taint::Clean.is_possibly_tainted());
}

#[test]
fn taint_three_levels() {
    use TaintThreeLevels::*;
    // definite taint and definite cleanliness are incomparable
    assert_eq!(Tainted.join(&Clean), Top);
    assert_eq!(Tainted.meet(&Clean), Bottom);
    assert!(Tainted.leq(&Top));
    assert!(Clean.leq(&Top));
    assert!(!Tainted.leq(&Clean));

    assert!(Tainted.is_always_tainted());
    assert!(!Top.is_always_tainted());
    assert!(Top.is_possibly_tainted());
    assert!(!Clean.is_possibly_tainted());
}

#[test]
fn parity_diamond() {
    use Parity::*;
    assert_eq!(Even.join(&Odd), Top);
    assert_eq!(Even.meet(&Odd), Bottom);
    assert_eq!(Top.meet(&Odd), Odd);
    assert!(Bottom.leq(&Even));
    assert!(Even.leq(&Top));
    assert!(!Even.leq(&Odd));
}

#[test]
fn finite_lattices_widen_by_join() {
    // the default widening falls back to join on finite-height domains
    assert_eq!(Parity::Even.widen(&Parity::Odd), Parity::Top);
    assert_eq!(
        TaintThreeLevels::Clean.widen(&TaintThreeLevels::Tainted),
        TaintThreeLevels::Top
    );
    // and the default narrowing has nothing to refine
    assert_eq!(Parity::Top.narrow(&Parity::Even), Parity::Top);
}
