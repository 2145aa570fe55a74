//! Property tests for the session reducer and pointer geometry, exercised
//! only through the public crate API.

use linkmouse_core::domain::pointer::wrap_axis;
use linkmouse_core::{
    reduce, PointerState, RenderPosition, SessionEvent, SessionState, Viewport,
};
use proptest::prelude::*;

fn replay<'a>(events: impl IntoIterator<Item = &'a str>) -> SessionState {
    events
        .into_iter()
        .map(SessionEvent::new)
        .fold(SessionState::default(), |state, event| reduce(state, &event))
}

/// Wire names mixed with names the reducer must ignore.
fn event_name() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => proptest::sample::select(SessionState::ALL.to_vec())
            .prop_map(|state| SessionEvent::from(state).name),
        1 => "[A-Za-z_]{0,24}",
        1 => Just(String::new()),
        1 => Just("controlling_started".to_string()),
    ]
}

fn delta() -> impl Strategy<Value = (i32, i32)> {
    (any::<i32>(), any::<i32>())
}

// ── Session reducer ───────────────────────────────────────────────────────────

#[test]
fn test_last_recognized_event_wins_reference_cases() {
    let cases: &[(&[&str], SessionState)] = &[
        (&[], SessionState::ConnectingServer),
        (
            &["SERVER_CONNECTED_WAITING_USER", "USER_CONNECTING", "USER_CONNECTED"],
            SessionState::UserConnected,
        ),
        (
            &["CONTROLLING_STARTED", "", "controlling_stopped", "SOMETHING_NEW"],
            SessionState::ControllingStarted,
        ),
        (&["NOT_A_STATE", "ALSO_NOT"], SessionState::ConnectingServer),
    ];

    for (events, expected) in cases {
        assert_eq!(replay(events.iter().copied()), *expected, "events: {events:?}");
    }
}

#[test]
fn test_every_state_is_reachable_from_every_state() {
    for from in SessionState::ALL {
        for to in SessionState::ALL {
            assert_eq!(reduce(from, &SessionEvent::from(to)), to);
        }
    }
}

proptest! {
    /// The state after any event sequence is the last recognized name in it,
    /// or the initial state when none was recognized.
    #[test]
    fn last_recognized_event_wins(
        names in proptest::collection::vec(event_name(), 0..64),
    ) {
        let expected = names
            .iter()
            .rev()
            .find_map(|name| SessionEvent::new(name.as_str()).state().ok())
            .unwrap_or_default();

        prop_assert_eq!(replay(names.iter().map(String::as_str)), expected);
    }

    /// Appending unrecognized names never changes the state.
    #[test]
    fn unrecognized_suffix_is_ignored(
        names in proptest::collection::vec(event_name(), 0..32),
        noise in proptest::collection::vec("[a-z]{1,12}", 0..8),
    ) {
        let before = replay(names.iter().map(String::as_str));
        let after = replay(names.iter().chain(noise.iter()).map(String::as_str));
        prop_assert_eq!(before, after);
    }
}

// ── Pointer geometry ──────────────────────────────────────────────────────────

proptest! {
    /// The report is the exact sum of every delta, and the render position
    /// never leaves `[-radius, extent + radius]` on either axis.
    #[test]
    fn report_is_exact_sum_and_render_stays_bounded(
        width in 1u32..2_000,
        height in 1u32..2_000,
        radius in 0i32..100,
        deltas in proptest::collection::vec(delta(), 0..256),
    ) {
        let viewport = Viewport::new(width, height, radius);
        let mut state = PointerState::new(RenderPosition::new(0, 0));
        let (mut sum_x, mut sum_y) = (0i64, 0i64);

        for (dx, dy) in deltas {
            state.apply(&viewport, dx, dy);
            sum_x += i64::from(dx);
            sum_y += i64::from(dy);
            prop_assert!(
                viewport.contains(state.render()),
                "render {:?} escaped {:?}",
                state.render(),
                viewport
            );
        }

        prop_assert_eq!(state.report_x, sum_x);
        prop_assert_eq!(state.report_y, sum_y);
    }

    /// Each new grant zeroes the report; afterwards it only reflects deltas
    /// received since that grant.  The render position carries over.
    #[test]
    fn report_restarts_from_zero_on_every_grant(
        captures in proptest::collection::vec(
            proptest::collection::vec(delta(), 0..32),
            1..8,
        ),
    ) {
        let viewport = Viewport::new(480, 270, 20);
        let mut state = PointerState::new(RenderPosition::new(50, 50));

        for deltas in captures {
            let render_before = state.render();
            state.reset_report();
            prop_assert_eq!((state.report_x, state.report_y), (0, 0));
            prop_assert_eq!(state.render(), render_before);

            for &(dx, dy) in &deltas {
                state.apply(&viewport, dx, dy);
            }
            let sum_x: i64 = deltas.iter().map(|&(dx, _)| i64::from(dx)).sum();
            let sum_y: i64 = deltas.iter().map(|&(_, dy)| i64::from(dy)).sum();
            prop_assert_eq!(state.report_x, sum_x);
            prop_assert_eq!(state.report_y, sum_y);
        }
    }
}

#[test]
fn test_wraparound_reference_case() {
    assert_eq!(wrap_axis(50 + 80, 100, 20), -20);
}
