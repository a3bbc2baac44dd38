//! Property tests for the task timer invariants.
//!
//! Random operation sequences run against every behavioral variant; after
//! each step the remaining time, activity flag and break count must stay
//! within their bounds.

use focusboard_core::{Event, Phase, SettingField, TaskTimer, TimerBehavior, TimerSettings};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Tick(u16),
    Toggle,
    Reset,
    Update(SettingField, i64),
}

fn field() -> impl Strategy<Value = SettingField> {
    prop_oneof![
        Just(SettingField::WorkMinutes),
        Just(SettingField::BreakMinutes),
        Just(SettingField::LongBreakMinutes),
        Just(SettingField::SessionsBeforeLongBreak),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u16..400).prop_map(Op::Tick),
        3 => Just(Op::Toggle),
        1 => Just(Op::Reset),
        2 => (field(), -10i64..150).prop_map(|(f, v)| Op::Update(f, v)),
    ]
}

fn settings() -> impl Strategy<Value = TimerSettings> {
    (1u32..=5, 1u32..=3, proptest::option::of((1u32..=4, 1u32..=4))).prop_map(
        |(work, brk, long)| {
            let s = TimerSettings::new(work, brk);
            match long {
                Some((minutes, sessions)) => s.with_long_break(minutes, sessions),
                None => s,
            }
        },
    )
}

fn behavior() -> impl Strategy<Value = TimerBehavior> {
    (any::<bool>(), any::<bool>()).prop_map(|(pause_consumes_break, settings_edit_pauses)| {
        TimerBehavior {
            pause_consumes_break,
            settings_edit_pauses,
        }
    })
}

fn apply(timer: &mut TaskTimer, op: &Op) -> bool {
    match *op {
        Op::Tick(n) => {
            let mut restored = false;
            for _ in 0..n {
                if let Some(Event::PhaseCompleted { to, .. }) = timer.tick() {
                    restored |= to == Phase::LongBreak;
                }
            }
            restored
        }
        Op::Toggle => matches!(timer.toggle_active(), Some(Event::TimerReset { .. })),
        Op::Reset => {
            timer.reset();
            true
        }
        Op::Update(field, value) => {
            timer.update_settings(field, value);
            false
        }
    }
}

proptest! {
    #[test]
    fn invariants_hold_for_any_sequence(
        settings in settings(),
        behavior in behavior(),
        ops in proptest::collection::vec(op(), 1..60),
    ) {
        let mut timer = TaskTimer::new(settings).with_behavior(behavior);
        let mut prev_count = timer.state().break_count;

        for op in &ops {
            let restored = apply(&mut timer, op);

            let state = timer.state();
            prop_assert!(state.time_remaining <= state.phase_bound());
            prop_assert!(state.time_remaining <= state.settings.max_secs());
            prop_assert!(!state.is_active || state.time_remaining > 0);
            prop_assert!(state.break_count <= state.settings.break_threshold());
            if restored {
                prop_assert_eq!(state.break_count, state.settings.break_threshold());
            } else {
                prop_assert!(state.break_count <= prev_count);
            }
            prev_count = state.break_count;
        }
    }

    #[test]
    fn settings_update_is_idempotent(
        settings in settings(),
        behavior in behavior(),
        warmup in proptest::collection::vec(op(), 0..20),
        field in field(),
        value in -10i64..150,
    ) {
        let mut timer = TaskTimer::new(settings).with_behavior(behavior);
        for op in &warmup {
            apply(&mut timer, op);
        }

        timer.update_settings(field, value);
        let once = *timer.state();
        prop_assert!(timer.update_settings(field, value).is_none());
        prop_assert_eq!(*timer.state(), once);
    }

    #[test]
    fn out_of_range_values_never_change_state(
        settings in settings(),
        field in field(),
        value in prop_oneof![-1000i64..=0, 200i64..1000],
    ) {
        let mut timer = TaskTimer::new(settings);
        let before = *timer.state();
        prop_assert!(timer.update_settings(field, value).is_none());
        prop_assert_eq!(*timer.state(), before);
    }
}
