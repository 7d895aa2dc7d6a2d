use tracing::{info, warn};

use crate::engine::{EngineOptions, GameEngine};
use crate::error::LevelLoadError;
use crate::types::{LevelStatus, Snapshot, WorldInit};
use crate::world::LevelDescriptor;

#[derive(Debug)]
enum SessionState {
    Loading,
    LoadFailed(LevelLoadError),
    Running(Box<GameEngine>),
    TornDown,
}

/// One level from load request to teardown.
///
/// Ticks are only delivered while an engine is running; a failed load never starts one, and
/// once torn down the session drops its engine and ignores every further call.
#[derive(Debug)]
pub struct LevelSession {
    level: u32,
    state: SessionState,
}

impl LevelSession {
    pub fn loading(level: u32) -> Self {
        Self {
            level,
            state: SessionState::Loading,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Resolves the pending load. On success the engine starts at `now_ms`.
    pub fn finish_loading(
        &mut self,
        loaded: Result<LevelDescriptor, LevelLoadError>,
        options: EngineOptions,
        now_ms: u64,
    ) -> Result<WorldInit, LevelLoadError> {
        if !matches!(self.state, SessionState::Loading) {
            return Err(LevelLoadError::Malformed {
                message: "session is not loading".to_string(),
            });
        }
        let engine = loaded.and_then(|descriptor| GameEngine::new(&descriptor, options, now_ms));
        match engine {
            Ok(engine) => {
                let init = engine.world_init();
                self.state = SessionState::Running(Box::new(engine));
                Ok(init)
            }
            Err(error) => {
                warn!(level = self.level, %error, "level failed to load");
                self.state = SessionState::LoadFailed(error.clone());
                Err(error)
            }
        }
    }

    /// `None` once torn down.
    pub fn status(&self) -> Option<LevelStatus> {
        match &self.state {
            SessionState::Loading => Some(LevelStatus::Loading),
            SessionState::LoadFailed(_) => Some(LevelStatus::LoadFailed),
            SessionState::Running(engine) => Some(engine.status()),
            SessionState::TornDown => None,
        }
    }

    pub fn load_error(&self) -> Option<&LevelLoadError> {
        match &self.state {
            SessionState::LoadFailed(error) => Some(error),
            _ => None,
        }
    }

    pub fn engine(&self) -> Option<&GameEngine> {
        match &self.state {
            SessionState::Running(engine) => Some(&**engine),
            _ => None,
        }
    }

    pub fn engine_mut(&mut self) -> Option<&mut GameEngine> {
        match &mut self.state {
            SessionState::Running(engine) => Some(&mut **engine),
            _ => None,
        }
    }

    /// Advances the running engine and returns its snapshot with drained events.
    pub fn tick(&mut self, now_ms: u64) -> Option<Snapshot> {
        self.engine_mut().map(|engine| engine.tick(now_ms))
    }

    pub fn is_torn_down(&self) -> bool {
        matches!(self.state, SessionState::TornDown)
    }

    pub fn teardown(&mut self) {
        if self.is_torn_down() {
            return;
        }
        info!(level = self.level, "level session torn down");
        self.state = SessionState::TornDown;
    }
}
