//! Integration tests for the board: live timers, the task list they report
//! into, and the SQLite store that carries timer state between runs.

use std::time::Duration;

use focusboard_core::{
    Board, Config, Database, Phase, SettingField, TaskListEvent, TimerSettings,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn timer_state_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focusboard.db");

    let id = {
        let mut db = Database::open_at(&path).unwrap();
        let mut board = Board::new(db.load_list().unwrap());
        let id = board.add_task("write the report").unwrap().id;

        board.timer(&id).unwrap().toggle_active().unwrap();
        sleep(Duration::from_secs_f64(90.5)).await;
        board.timer(&id).unwrap().toggle_active().unwrap();

        db.save_list(&board.list().unwrap()).unwrap();
        id
    };

    let db = Database::open_at(&path).unwrap();
    let mut board = Board::new(db.load_list().unwrap());
    let state = board.timer(&id).unwrap().state().unwrap();
    assert!(!state.is_active);
    assert_eq!(state.current_phase, Phase::Work);
    assert_eq!(state.time_remaining, 25 * 60 - 90);
    assert!(state.paused_since_ms.is_some());
}

#[tokio::test(start_paused = true)]
async fn full_cycle_with_long_break() {
    let mut config = Config::default();
    config.timer.work_minutes = 1;
    config.timer.break_minutes = 1;
    config.timer.long_break_enabled = true;
    config.timer.long_break_minutes = 2;
    config.timer.sessions_before_long_break = 1;

    let mut board = Board::from_config(Default::default(), &config);
    let id = board.add_task("sprint").unwrap().id;
    let mut rx = board.subscribe().unwrap();

    let mut phases = Vec::new();
    for _ in 0..4 {
        board.timer(&id).unwrap().toggle_active().unwrap();
        sleep(Duration::from_secs_f64(121.5)).await;
        phases.push(board.timer(&id).unwrap().state().unwrap().current_phase);
    }
    assert_eq!(
        phases,
        [Phase::Break, Phase::Work, Phase::LongBreak, Phase::Work]
    );

    let mut updates = 0;
    loop {
        match rx.try_recv() {
            Ok(TaskListEvent::TimerUpdated { id: got, .. }) => {
                assert_eq!(got, id);
                updates += 1;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    assert!(updates > 0);
}

#[tokio::test(start_paused = true)]
async fn settings_edit_pauses_running_timer() {
    let mut board = Board::new(Default::default())
        .with_defaults(TimerSettings::new(25, 5), Default::default());
    let id = board.add_task("edit me").unwrap().id;

    let timer = board.timer(&id).unwrap();
    timer.toggle_active().unwrap();
    sleep(Duration::from_secs_f64(4.5)).await;
    let event = timer.update_settings(SettingField::WorkMinutes, 30).unwrap();
    assert!(event.is_some());
    assert!(!timer.is_ticking());

    sleep(Duration::from_secs(10)).await;
    let list = board.list().unwrap();
    let stored = list.get(&id).unwrap().timer.unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.time_remaining, 1800);
}
