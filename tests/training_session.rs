use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::rc::Rc;

use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tempfile::TempDir;

use kochr::audio::morse::{MorseEncoder, Symbol};
use kochr::audio::playback::{Playback, PlaybackError};
use kochr::audio::synth::{AudioBuffer, SampleFormat, ToneSynthesizer};
use kochr::audio::timing::Timing;
use kochr::engine::curriculum::KOCH_ORDER;
use kochr::session::trainer::{InputSource, Response, SessionView, StatusDisplay, Trainer};
use kochr::store::json_store::JsonStore;
use kochr::store::schema::ProgressData;

fn timing() -> Timing {
    Timing::new(600.0, 30.0, 10.0).unwrap()
}

fn synth() -> ToneSynthesizer {
    ToneSynthesizer::new(4000, SampleFormat::U8)
}

fn make_store() -> (TempDir, JsonStore) {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    (dir, store)
}

/// Recognises which character a buffer encodes and shares it with the input.
struct EarPlayback {
    encoder: MorseEncoder,
    heard: Rc<RefCell<Option<char>>>,
    buffers: usize,
}

impl EarPlayback {
    fn new(heard: Rc<RefCell<Option<char>>>) -> Self {
        Self {
            encoder: MorseEncoder::new(&timing(), &synth()),
            heard,
            buffers: 0,
        }
    }
}

impl Playback for EarPlayback {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<(), PlaybackError> {
        self.buffers += 1;
        let symbol = KOCH_ORDER
            .chars()
            .filter_map(|c| Symbol::from_char(c).ok())
            .find(|&s| &self.encoder.compose_symbol(s) == buffer);
        *self.heard.borrow_mut() = symbol.map(|s| s.as_char());
        Ok(())
    }
}

/// Answers what it heard (or a fixed wrong key) a set number of times, then exits.
struct Learner {
    heard: Rc<RefCell<Option<char>>>,
    remaining: usize,
    always: Option<char>,
}

impl InputSource for Learner {
    fn next_response(&mut self) -> Result<Response> {
        if self.remaining == 0 {
            return Ok(Response::Exit);
        }
        self.remaining -= 1;
        let key = self
            .always
            .or(*self.heard.borrow())
            .unwrap_or('#');
        Ok(Response::Key(key))
    }
}

struct ScriptedInput(VecDeque<Response>);

impl InputSource for ScriptedInput {
    fn next_response(&mut self) -> Result<Response> {
        Ok(self.0.pop_front().unwrap_or(Response::Exit))
    }
}

#[derive(Default)]
struct RecordingDisplay {
    views: Vec<SessionView>,
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, view: &SessionView) -> Result<()> {
        self.views.push(view.clone());
        Ok(())
    }
}

/// Answers like `Learner`, then fails to read the terminal instead of exiting.
struct LostTerminal(Learner);

impl InputSource for LostTerminal {
    fn next_response(&mut self) -> Result<Response> {
        match self.0.next_response()? {
            Response::Exit => Err(anyhow::anyhow!("terminal read failed")),
            response => Ok(response),
        }
    }
}

/// Draws a fixed number of frames, then fails.
struct FlakyDisplay {
    frames_left: usize,
}

impl StatusDisplay for FlakyDisplay {
    fn show(&mut self, _view: &SessionView) -> Result<()> {
        if self.frames_left == 0 {
            anyhow::bail!("terminal draw failed");
        }
        self.frames_left -= 1;
        Ok(())
    }
}

struct BrokenDevice;

impl Playback for BrokenDevice {
    fn play(&mut self, _buffer: &AudioBuffer) -> Result<(), PlaybackError> {
        Err(PlaybackError::NoDevice)
    }
}

fn make_trainer(store: &JsonStore, seed: u64) -> Trainer<SmallRng> {
    Trainer::new(
        &timing(),
        &synth(),
        &store.load_progress(),
        SmallRng::seed_from_u64(seed),
        40,
    )
}

#[test]
fn perfect_learner_unlocks_next_character_and_progress_is_saved() {
    let (_dir, store) = make_store();
    let mut trainer = make_trainer(&store, 11);
    let heard = Rc::new(RefCell::new(None));
    let mut playback = EarPlayback::new(heard.clone());
    let mut input = Learner {
        heard,
        remaining: 400,
        always: None,
    };
    let mut display = RecordingDisplay::default();

    trainer
        .run(&mut playback, &mut input, &mut display, &store)
        .unwrap();

    assert!(trainer.state().unlocked_count > 5);
    assert_eq!(display.views.len(), 401);
    // priming silence, 401 characters, closing silence
    assert_eq!(playback.buffers, 403);

    let saved = store.load_progress();
    assert_eq!(saved.unlocked_count, trainer.state().unlocked_count);
    assert_eq!(saved.reactions["*"].len(), 50);
    assert!(saved.mistakes["K"].iter().all(|&m| m == 0));
    assert!(saved.saved_at.is_some());
}

#[test]
fn wrong_answers_are_charged_to_played_characters() {
    let (_dir, store) = make_store();
    let mut trainer = make_trainer(&store, 5);
    let heard = Rc::new(RefCell::new(None));
    let mut playback = EarPlayback::new(heard.clone());
    let mut input = Learner {
        heard,
        remaining: 30,
        always: Some('Q'),
    };
    let mut display = RecordingDisplay::default();

    trainer
        .run(&mut playback, &mut input, &mut display, &store)
        .unwrap();

    let saved = store.load_progress();
    let charged: usize = "KMURE".chars().map(|c| saved.mistakes[&c.to_string()].len()).sum();
    assert_eq!(charged, 30);
    assert!(saved.mistakes["Q"].is_empty());
    assert!(saved.reactions["*"].is_empty());
    assert_eq!(saved.unlocked_count, 5);
    // accuracy problems grow the pool beyond the bare alphabet
    assert!(display.views.last().unwrap().pool.len() > 5);
}

#[test]
fn spaces_are_ignored() {
    let (_dir, store) = make_store();
    let mut trainer = make_trainer(&store, 9);
    let heard = Rc::new(RefCell::new(None));
    let mut playback = EarPlayback::new(heard);
    let mut input = ScriptedInput(VecDeque::from(vec![Response::Key(' '); 10]));
    let mut display = RecordingDisplay::default();

    trainer
        .run(&mut playback, &mut input, &mut display, &store)
        .unwrap();

    assert_eq!(trainer.view().last_outcome, None);
    assert!(display.views.iter().all(|v| v.history.is_empty()));
    let saved = store.load_progress();
    assert!(saved.mistakes.values().all(|w| w.is_empty()));
    assert!(saved.reactions.values().all(|w| w.is_empty()));
}

#[test]
fn progress_carries_over_between_sessions() {
    let (_dir, store) = make_store();
    let heard = Rc::new(RefCell::new(None));

    {
        let mut trainer = make_trainer(&store, 1);
        let mut playback = EarPlayback::new(heard.clone());
        let mut input = Learner {
            heard: heard.clone(),
            remaining: 20,
            always: None,
        };
        trainer
            .run(&mut playback, &mut input, &mut RecordingDisplay::default(), &store)
            .unwrap();
    }

    let trainer = make_trainer(&store, 2);
    assert_eq!(trainer.view().overall.sample_count, 20);
    assert_eq!(trainer.view().history, "");
}

#[test]
fn device_failure_ends_session_without_saving() {
    let (dir, store) = make_store();
    let mut trainer = make_trainer(&store, 3);
    let mut input = ScriptedInput(VecDeque::new());
    let mut display = RecordingDisplay::default();

    let err = trainer
        .run(&mut BrokenDevice, &mut input, &mut display, &store)
        .unwrap_err();
    assert!(err.to_string().contains("no audio output device"));
    assert!(display.views.is_empty());
    assert!(!dir.path().join("progress.json").exists());
}

#[test]
fn input_failure_still_saves_recorded_responses() {
    let (_dir, store) = make_store();
    let heard = Rc::new(RefCell::new(None));
    let mut trainer = make_trainer(&store, 4);
    let mut playback = EarPlayback::new(heard.clone());
    let mut input = LostTerminal(Learner {
        heard,
        remaining: 12,
        always: None,
    });

    let err = trainer
        .run(&mut playback, &mut input, &mut RecordingDisplay::default(), &store)
        .unwrap_err();
    assert!(err.to_string().contains("terminal read failed"));

    let reloaded = make_trainer(&store, 5);
    assert_eq!(reloaded.view().overall.sample_count, 12);
}

#[test]
fn display_failure_still_saves_recorded_responses() {
    let (_dir, store) = make_store();
    let heard = Rc::new(RefCell::new(None));
    let mut trainer = make_trainer(&store, 6);
    let mut playback = EarPlayback::new(heard.clone());
    let mut input = Learner {
        heard,
        remaining: 100,
        always: None,
    };
    let mut display = FlakyDisplay { frames_left: 3 };

    let err = trainer
        .run(&mut playback, &mut input, &mut display, &store)
        .unwrap_err();
    assert!(err.to_string().contains("terminal draw failed"));

    let reloaded = make_trainer(&store, 7);
    assert_eq!(reloaded.view().overall.sample_count, 3);
}

#[test]
fn partial_progress_file_is_backfilled() {
    let (dir, store) = make_store();
    fs::write(
        dir.path().join("progress.json"),
        r#"{"reactions": {"K": [120, 130]}}"#,
    )
    .unwrap();

    let progress: ProgressData = store.load_progress();
    assert_eq!(progress.unlocked_count, 5);
    assert_eq!(progress.reactions["K"], vec![120, 130]);
    assert!(progress.reactions["*"].is_empty());
    assert!(progress.mistakes["X"].is_empty());
}
