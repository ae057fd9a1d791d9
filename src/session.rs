//! The companion session: one character, its animations, gaze and dialogue.
//!
//! Everything here is driven from a single owner. Event handlers and
//! [`CompanionSession::tick`] run to completion one after another; the only
//! suspension points are asset loads.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::animation::{prepare_clip, AnimationClip, AnimationPlayer, LoopMode, PlayerEvent};
use crate::avatar::expression::{is_blink, NEUTRAL_EXPRESSION};
use crate::avatar::{CharacterState, HumanoidCharacter};
use crate::config::Config;
use crate::error::{AvatarError, LoadError, Result};
use crate::gaze::{BlinkScheduler, GazeController, GazeFrame, ViewRect};
use crate::humanoid::bone::BoneRole;
use crate::humanoid::{fix_vrm_bones, map_bone, validate_vrm, RepairOutcome, ValidationReport};
use crate::interaction::{
    DialogueCategory, DialogueManager, InteractionCue, InteractionTimers, Notification, Speaker,
    SpeechSynthesizer,
};
use crate::loader::{self, CharacterLoader, LoadSequencer, LoadTicket, LoadedCharacter};

/// Everything one frame produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// `None` when there was no character or look-at target
    pub gaze: Option<GazeFrame>,
    /// New blink weight, when it changed
    pub blink: Option<f32>,
    pub animation_event: Option<PlayerEvent>,
    /// Bones written by the animation pose
    pub posed_bones: usize,
    /// Lines started this frame
    pub lines: Vec<String>,
    /// Fallback notifications raised this frame
    pub notifications: Vec<Notification>,
    pub speech_finished: bool,
}

/// Decoded clips registered under a display name
#[derive(Debug, Clone)]
struct AnimationEntry {
    clips: Vec<AnimationClip>,
}

pub struct CompanionSession {
    config: Config,
    loader: CharacterLoader,
    sequencer: LoadSequencer,
    character: Option<HumanoidCharacter>,
    report: Option<ValidationReport>,
    load_error: Option<String>,
    animations: BTreeMap<String, AnimationEntry>,
    current_animation: Option<String>,
    idle_animation: Option<String>,
    player: AnimationPlayer,
    gaze: GazeController,
    blink: BlinkScheduler,
    timers: InteractionTimers,
    dialogue: DialogueManager,
    speaker: Speaker,
    expression: Option<String>,
    expression_reset_at: Option<Instant>,
    last_tick: Option<Instant>,
    state_tx: broadcast::Sender<CharacterState>,
}

impl std::fmt::Debug for CompanionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanionSession")
            .field("character", &self.character.as_ref().map(|c| c.name()))
            .field("animations", &self.animations.keys().collect::<Vec<_>>())
            .field("current_animation", &self.current_animation)
            .field("gaze", &self.gaze.state())
            .finish()
    }
}

impl CompanionSession {
    pub fn new(config: Config, now: Instant) -> Self {
        let speaker = Speaker::silent(Duration::from_secs(config.interaction.notification_secs));
        Self::with_speaker(config, speaker, now)
    }

    pub fn with_synthesizer(config: Config, synth: Box<dyn SpeechSynthesizer>, now: Instant) -> Self {
        let speaker = Speaker::new(synth, Duration::from_secs(config.interaction.notification_secs));
        Self::with_speaker(config, speaker, now)
    }

    fn with_speaker(config: Config, speaker: Speaker, now: Instant) -> Self {
        let (state_tx, _) = broadcast::channel(64);
        Self {
            loader: CharacterLoader::new(config.loader.clone()),
            sequencer: LoadSequencer::new(),
            character: None,
            report: None,
            load_error: None,
            animations: BTreeMap::new(),
            current_animation: None,
            idle_animation: None,
            player: AnimationPlayer::new(),
            gaze: GazeController::new(config.gaze.clone(), now),
            blink: BlinkScheduler::new(config.blink.clone(), now),
            timers: InteractionTimers::new(&config.interaction),
            dialogue: DialogueManager::new(),
            speaker,
            expression: None,
            expression_reset_at: None,
            last_tick: None,
            state_tx,
            config,
        }
    }

    /// Use a fixed dialogue seed.
    pub fn with_dialogue(mut self, dialogue: DialogueManager) -> Self {
        self.dialogue = dialogue;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn character(&self) -> Option<&HumanoidCharacter> {
        self.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut HumanoidCharacter> {
        self.character.as_mut()
    }

    pub fn gaze(&self) -> &GazeController {
        &self.gaze
    }

    pub fn player(&self) -> &AnimationPlayer {
        &self.player
    }

    pub fn timers(&self) -> &InteractionTimers {
        &self.timers
    }

    pub fn speaker(&self) -> &Speaker {
        &self.speaker
    }

    /// Subscribe to state snapshots.
    pub fn subscribe_state(&self) -> broadcast::Receiver<CharacterState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of everything the UI shows.
    pub fn state(&self) -> CharacterState {
        let base = match (&self.character, &self.load_error) {
            (Some(character), _) => CharacterState::new().with_loaded(
                character.name(),
                character
                    .expressions()
                    .available_presets()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            ),
            (None, Some(error)) => CharacterState::new().with_error(error.clone()),
            (None, None) => CharacterState::new(),
        };
        base.with_animations(self.animation_names())
            .with_current_animation(self.current_animation.clone())
            .with_expression(self.expression.clone())
            .with_speaking(self.speaker.is_speaking())
            .with_idle(self.timers.is_idle())
    }

    fn publish(&self) {
        let _ = self.state_tx.send(self.state());
    }

    // --- Character loading ---

    /// Start a character load. Only the newest ticket may commit.
    pub fn begin_character_load(&self) -> LoadTicket {
        self.sequencer.begin()
    }

    pub fn loader(&self) -> &CharacterLoader {
        &self.loader
    }

    /// Install a finished load. Returns `Ok(false)` when the ticket was
    /// superseded and the result discarded.
    pub fn commit_character(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<LoadedCharacter, LoadError>,
        now: Instant,
    ) -> Result<bool> {
        if !self.sequencer.is_current(ticket) {
            match &result {
                Ok(loaded) => tracing::warn!("Discarding stale load of {}", loaded.character.name()),
                Err(e) => tracing::warn!("Discarding stale load failure: {}", e),
            }
            return Ok(false);
        }

        self.unload_character();
        match result {
            Ok(LoadedCharacter {
                mut character,
                report,
                ..
            }) => {
                if self.config.animation.relax_arms_on_load {
                    character.apply_relaxed_arms();
                }
                character.capture_rest_pose();
                character.install_look_at_target(self.gaze.anchor());

                tracing::info!("Character {} ready", character.name());
                self.character = Some(character);
                self.report = Some(report);
                self.load_error = None;
                self.gaze = GazeController::new(self.config.gaze.clone(), now);
                self.timers.start(now);
                self.publish();
                Ok(true)
            }
            Err(e) => {
                tracing::error!("Failed to load character: {}", e);
                self.load_error = Some(e.to_string());
                self.publish();
                Err(e.into())
            }
        }
    }

    /// Load a character file, then the default idle animation if configured.
    pub async fn load_character(&mut self, path: &Path, now: Instant) -> Result<bool> {
        let ticket = self.begin_character_load();
        let result = self.loader.load(path).await;
        if !self.commit_character(ticket, result, now)? {
            return Ok(false);
        }

        if let Some(idle) = self.config.animation.default_idle_animation.clone() {
            let name = loader::display_name(&idle);
            if !self.animations.contains_key(&name) {
                self.add_animation_file(&idle).await;
            }
            self.play_idle(&name)?;
        }
        Ok(true)
    }

    fn unload_character(&mut self) {
        self.player.stop();
        self.current_animation = None;
        self.idle_animation = None;
        self.expression = None;
        self.expression_reset_at = None;
        if let Some(mut character) = self.character.take() {
            character.remove_look_at_target();
            tracing::info!("Unloaded character {}", character.name());
        }
        self.report = None;
    }

    /// Drop every pending timer and the character.
    pub fn teardown(&mut self) {
        self.sequencer.cancel_all();
        self.timers.cancel_all();
        self.speaker.stop();
        self.unload_character();
        self.publish();
    }

    // --- Validation ---

    pub fn validation_report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    pub fn revalidate(&mut self) -> Result<&ValidationReport> {
        let character = self.character.as_ref().ok_or(AvatarError::NoCharacter)?;
        Ok(self.report.insert(validate_vrm(character)))
    }

    /// Run the repair pipeline on the current character and revalidate.
    pub fn fix_character(&mut self) -> Result<RepairOutcome> {
        let character = self.character.as_mut().ok_or(AvatarError::NoCharacter)?;
        let outcome = fix_vrm_bones(character);
        if !outcome.succeeded() {
            tracing::warn!("Repair only partially succeeded: {:?}", outcome.still_missing);
        }
        self.report = Some(validate_vrm(character));
        Ok(outcome)
    }

    /// Point `role` at the scene bone named `bone_name` and revalidate.
    /// Returns false when no such bone exists.
    pub fn map_bone(&mut self, role: BoneRole, bone_name: &str) -> Result<bool> {
        let character = self.character.as_mut().ok_or(AvatarError::NoCharacter)?;
        if map_bone(character, role, bone_name).is_none() {
            return Ok(false);
        }
        self.report = Some(validate_vrm(character));
        Ok(true)
    }

    // --- Animations ---

    /// Register decoded clips. An empty list is kept but cannot play.
    pub fn register_animation(&mut self, name: &str, clips: Vec<AnimationClip>) {
        tracing::info!("Registered animation {} ({} clips)", name, clips.len());
        self.animations.insert(name.to_string(), AnimationEntry { clips });
        self.publish();
    }

    /// Decode an animation file right away and register it under its file stem.
    pub async fn add_animation_file(&mut self, path: &Path) -> String {
        let name = loader::display_name(path);
        let clips = loader::load_animation(path).await;
        self.register_animation(&name, clips);
        name
    }

    pub fn animation_names(&self) -> Vec<String> {
        self.animations.keys().cloned().collect()
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current_animation.as_deref()
    }

    fn start_animation(&mut self, name: &str, loop_mode: LoopMode) -> Result<()> {
        let character = self.character.as_mut().ok_or(AvatarError::NoCharacter)?;
        let entry = self
            .animations
            .get(name)
            .ok_or_else(|| AvatarError::UnknownAnimation(name.to_string()))?;
        let source = entry
            .clips
            .first()
            .ok_or_else(|| AvatarError::AnimationNotDecoded(name.to_string()))?;

        let prepared = prepare_clip(character, source);
        if !prepared.unmapped.is_empty() {
            tracing::warn!("{}: {} tracks did not resolve to bones", name, prepared.unmapped.len());
        }
        if prepared.animated_roles.is_empty() {
            tracing::warn!("{}: no humanoid bone is animated", name);
        }
        self.player.switch_to(Arc::new(prepared.clip), loop_mode);
        self.current_animation = Some(name.to_string());
        self.publish();
        Ok(())
    }

    /// Make `name` the looping animation.
    pub fn set_current_animation(&mut self, name: &str) -> Result<()> {
        self.start_animation(name, LoopMode::Repeat)?;
        self.idle_animation = None;
        Ok(())
    }

    /// Play `name` once, returning to the rest pose when it ends.
    pub fn play_idle(&mut self, name: &str) -> Result<()> {
        self.start_animation(name, LoopMode::Once)?;
        self.idle_animation = Some(name.to_string());
        Ok(())
    }

    pub fn stop_animation(&mut self) {
        self.player.stop();
        self.current_animation = None;
        self.idle_animation = None;
        self.publish();
    }

    // --- Expressions ---

    pub fn available_expressions(&self) -> Vec<&'static str> {
        self.character
            .as_ref()
            .map(|c| c.expressions().available_presets())
            .unwrap_or_default()
    }

    /// Show an expression. Any other emotion is cleared first.
    pub fn set_expression(&mut self, name: &str, weight: f32) -> Result<()> {
        let character = self.character.as_mut().ok_or(AvatarError::NoCharacter)?;
        let expressions = character.expressions_mut();
        if !expressions.contains(name) {
            return Err(AvatarError::InvalidExpression(name.to_string()).into());
        }

        if !is_blink(name) {
            expressions.clear_emotions();
        }
        expressions.set(name, weight)?;

        if !is_blink(name) {
            self.expression = (weight > 0.0).then(|| name.to_string());
        }
        self.expression_reset_at = None;
        self.publish();
        Ok(())
    }

    /// Back to the resting face.
    pub fn reset_expression(&mut self) {
        if let Some(character) = self.character.as_mut() {
            let expressions = character.expressions_mut();
            expressions.clear_emotions();
            if expressions.contains(NEUTRAL_EXPRESSION) {
                let _ = expressions.set(NEUTRAL_EXPRESSION, 1.0);
            }
        }
        self.expression = Some(NEUTRAL_EXPRESSION.to_string());
        self.expression_reset_at = None;
        self.publish();
    }

    // --- Input events ---

    pub fn on_mouse_move(&mut self, client_x: f32, client_y: f32, rect: &ViewRect, now: Instant) {
        self.gaze.on_cursor(client_x, client_y, rect, now);
        self.timers.register_interaction(now);
    }

    pub fn on_click(&mut self, now: Instant) -> FrameOutput {
        self.timers.register_interaction(now);
        self.respond(DialogueCategory::Click, now)
    }

    /// Click on the character itself: a short happy face and a click line.
    pub fn on_character_click(&mut self, now: Instant) -> FrameOutput {
        let expression = self.config.interaction.click_expression.clone();
        match self.set_expression(&expression, 1.0) {
            Ok(()) => {
                self.expression_reset_at =
                    Some(now + Duration::from_secs(self.config.interaction.click_expression_secs));
            }
            Err(e) => tracing::debug!("Click expression skipped: {}", e),
        }
        self.on_click(now)
    }

    pub fn on_key(&mut self, key: &str, now: Instant) -> FrameOutput {
        self.timers.register_interaction(now);
        self.respond(DialogueCategory::for_key(key), now)
    }

    pub fn on_focus(&mut self, now: Instant) -> FrameOutput {
        self.timers.register_interaction(now);
        self.respond(DialogueCategory::Greeting, now)
    }

    pub fn on_blur(&mut self) {
        self.timers.mark_idle();
        self.publish();
    }

    /// Named interaction from the UI. Unknown actions get an idle line.
    pub fn trigger_interaction(&mut self, action: &str, now: Instant) -> FrameOutput {
        self.timers.register_interaction(now);
        self.respond(DialogueCategory::from_action(action), now)
    }

    pub fn set_gaze_enabled(&mut self, enabled: bool) {
        self.gaze.set_enabled(enabled);
    }

    fn respond(&mut self, category: DialogueCategory, now: Instant) -> FrameOutput {
        let mut output = FrameOutput::default();
        let line = self.dialogue.response(category);
        self.say(line, now, &mut output);
        output
    }

    fn say(&mut self, line: &str, now: Instant, output: &mut FrameOutput) {
        output.lines.push(line.to_string());
        if let Some(notification) = self.speaker.say(line, now) {
            output.notifications.push(notification);
        }
        self.publish();
    }

    // --- Frame loop ---

    /// Run one frame.
    pub fn tick(&mut self, now: Instant) -> FrameOutput {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32())
            .unwrap_or(0.0);
        self.last_tick = Some(now);

        let mut output = FrameOutput::default();

        for cue in self.timers.poll(now) {
            let category = match cue {
                InteractionCue::Greeting => DialogueCategory::Greeting,
                InteractionCue::Idle => DialogueCategory::Idle,
                InteractionCue::LongIdle => DialogueCategory::LongIdle,
            };
            let line = self.dialogue.response(category);
            self.say(line, now, &mut output);
        }

        if self.speaker.poll(now) {
            output.speech_finished = true;
            self.publish();
        }

        if self.expression_reset_at.is_some_and(|at| now >= at) {
            self.reset_expression();
        }

        let Some(character) = self.character.as_mut() else {
            return output;
        };

        if let Some(weight) = self.blink.tick(now) {
            character.expressions_mut().set_blink(weight);
            output.blink = Some(weight);
        }

        output.animation_event = self.player.advance(dt);
        if let Some(pose) = self.player.sample() {
            output.posed_bones = pose.apply(character.scene_mut());
        }
        if let Some(PlayerEvent::Finished { clip }) = &output.animation_event {
            if self.idle_animation.is_some() {
                tracing::info!("Idle animation {} finished, back to rest pose", clip);
                self.player.stop();
                character.reset_to_rest_pose();
                self.idle_animation = None;
                self.current_animation = None;
                self.publish();
            }
        }

        if let Some(character) = self.character.as_mut() {
            if character.look_at().is_some() {
                let frame = self.gaze.tick(now, character.expressions().has_blocking_active());
                character.install_look_at_target(frame.position);
                output.gaze = Some(frame);
            }
        }

        output
    }
}
