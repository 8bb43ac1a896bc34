//! Property-based invariant tests for window bookkeeping.
//!
//! 1. Window ids stay dense (1..=count) across any add/close sequence
//! 2. Focus is present exactly when windows exist, and in range
//! 3. Focus-relative split targets always point at an older window
//! 4. The window count never exceeds MAX_WINDOWS

use deimos::wm::{SplitTarget, WindowId, WindowManager, MAX_WINDOWS};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    AddSplit(i32, i32, bool),
    AddLaunch(i32, i32, bool, i32, i32),
    Close(WindowId),
    CloseFocused,
    Focus(WindowId),
    SetSplit(WindowId, i32, i32),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i32..1024, 0i32..768, any::<bool>()).prop_map(|(x, y, f)| Op::AddSplit(x, y, f)),
        (0i32..1024, 0i32..768, any::<bool>(), -10i32..600, -10i32..400)
            .prop_map(|(x, y, fl, w, h)| Op::AddLaunch(x, y, fl, w, h)),
        (0u32..20).prop_map(Op::Close),
        Just(Op::CloseFocused),
        (0u32..20).prop_map(Op::Focus),
        (0u32..20, 0i32..1024, 0i32..768).prop_map(|(id, x, y)| Op::SetSplit(id, x, y)),
    ]
}

fn target(focus: bool) -> SplitTarget {
    if focus {
        SplitTarget::Focus
    } else {
        SplitTarget::Mouse
    }
}

fn apply(wm: &mut WindowManager, op: &Op) {
    match *op {
        Op::AddSplit(x, y, f) => {
            wm.add_split(x, y, target(f));
        }
        Op::AddLaunch(x, y, fl, w, h) => {
            wm.add_launch(x, y, SplitTarget::Mouse, fl, w, h);
        }
        Op::Close(id) => {
            wm.close(id);
        }
        Op::CloseFocused => {
            wm.close_focused();
        }
        Op::Focus(id) => {
            wm.set_focus(id);
        }
        Op::SetSplit(id, x, y) => {
            wm.set_split(id, x, y);
        }
    }
}

fn check(wm: &WindowManager) -> Result<(), TestCaseError> {
    let count = wm.window_count();
    prop_assert!(count <= MAX_WINDOWS);

    let ids: Vec<WindowId> = wm.windows().map(|(id, _)| id).collect();
    let expected: Vec<WindowId> = (1..=count as WindowId).collect();
    prop_assert_eq!(ids, expected);

    match wm.focused() {
        None => prop_assert_eq!(count, 0),
        Some(f) => prop_assert!(f >= 1 && f as usize <= count, "focus {} of {}", f, count),
    }

    for (id, window) in wm.windows() {
        if let Some(t) = window.split.target_id {
            prop_assert!(t >= 1 && t < id, "window {} targets {}", id, t);
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Dense ids, focus range, target ordering
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ids_stay_dense_and_focus_in_range(ops in prop::collection::vec(op_strategy(), 0..80)) {
        let mut wm = WindowManager::new();
        for op in &ops {
            apply(&mut wm, op);
            check(&wm)?;
        }
    }

    #[test]
    fn closing_the_focused_window_keeps_its_position(
        adds in 1usize..=MAX_WINDOWS,
        pick in 0usize..MAX_WINDOWS,
    ) {
        let mut wm = WindowManager::new();
        for i in 0..adds {
            wm.add_split(i as i32 * 10, 0, SplitTarget::Mouse);
        }
        let id = (pick % adds) as WindowId + 1;
        wm.set_focus(id);
        let closed = wm.close_focused().map(|c| c.id);
        prop_assert_eq!(closed, Some(id));
        let remaining = (adds - 1) as WindowId;
        let expected = if remaining == 0 { None } else { Some(id.min(remaining)) };
        prop_assert_eq!(wm.focused(), expected);
    }

    #[test]
    fn adds_beyond_capacity_are_ignored(extra in 1usize..10) {
        let mut wm = WindowManager::new();
        for _ in 0..MAX_WINDOWS {
            prop_assert!(wm.add_split(0, 0, SplitTarget::Focus).is_some());
        }
        for _ in 0..extra {
            prop_assert!(wm.add_split(0, 0, SplitTarget::Focus).is_none());
        }
        prop_assert_eq!(wm.window_count(), MAX_WINDOWS);
        prop_assert!(wm.is_full());
    }
}
