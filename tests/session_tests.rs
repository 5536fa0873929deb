//! Solo session driven through the game loop with terminal key events.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use versus_tetris::core::GameSnapshot;
use versus_tetris::engine::{GameLoop, LoopCallbacks, ManualScheduler, Renderer, SoloSession};
use versus_tetris::scores::{LocalScoreStore, ScoreStore};
use versus_tetris::types::{GameAction, GameStatus, FIXED_STEP_MS};

#[derive(Default)]
struct Recorder {
    frames: usize,
    last: Option<GameSnapshot>,
}

impl Renderer for Recorder {
    fn render(&mut self, snapshot: &GameSnapshot) {
        self.frames += 1;
        self.last = Some(snapshot.clone());
    }
}

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
}

#[test]
fn loop_drives_input_engine_and_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalScoreStore::new(dir.path().join("scores.json"));
    let session = SoloSession::new(21, store, Recorder::default());
    let mut lp = GameLoop::new(session, ManualScheduler::new());

    lp.start(0.0);
    let x0 = lp.callbacks().game().active().unwrap().x;
    lp.callbacks_mut()
        .input_mut()
        .handle_key_event(press(KeyCode::Left));

    let mut t = 0.0;
    for _ in 0..10 {
        t += FIXED_STEP_MS;
        lp.frame(t);
    }

    let session = lp.callbacks();
    assert_eq!(session.game().active().unwrap().x, x0 - 1);
    assert_eq!(session.renderer().frames, 10);
    let last = session.renderer().last.as_ref().unwrap();
    assert_eq!(last.status, GameStatus::Playing);
    assert_eq!(last.active.unwrap().x, x0 - 1);
}

#[test]
fn pause_key_freezes_gravity() {
    let store = versus_tetris::scores::MemoryScoreStore::new();
    let mut session = SoloSession::new(21, store, Recorder::default());
    let y0 = session.game().active().unwrap().y;

    session
        .input_mut()
        .handle_key_event(press(KeyCode::Char('p')));
    for _ in 0..120 {
        session.update(FIXED_STEP_MS);
    }
    assert_eq!(session.game().status(), GameStatus::Paused);
    assert_eq!(session.game().active().unwrap().y, y0);

    session.input_mut().press(GameAction::Pause);
    for _ in 0..70 {
        session.update(FIXED_STEP_MS);
    }
    assert_eq!(session.game().status(), GameStatus::Playing);
    assert!(session.game().active().unwrap().y > y0);
}

#[test]
fn game_over_writes_the_score_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scores.json");
    let mut session = SoloSession::new(3, LocalScoreStore::new(&path), Recorder::default());
    session.set_player_name("tester");

    for _ in 0..200 {
        if session.game().status() == GameStatus::GameOver {
            break;
        }
        session
            .input_mut()
            .handle_key_event(press(KeyCode::Char(' ')));
        session.update(FIXED_STEP_MS);
    }
    assert_eq!(session.game().status(), GameStatus::GameOver);

    let top = LocalScoreStore::new(&path).load_top_scores(10).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].name, "tester");
    assert_eq!(top[0].score, session.game().score());
    assert_eq!(top[0].lines, Some(session.game().lines()));
}
