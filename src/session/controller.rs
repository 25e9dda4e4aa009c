//! Quiz session state machine
//!
//! The controller is driven through `&mut self` by a single caller. Deck
//! generation and the initial score load run concurrently inside `start`.
//! Image lookups run as spawned tasks and report back as [`SessionEvent`]s,
//! which are applied only while they still describe the current card.
//! Score increments go to a per-session writer task.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::state::{
    Answer, ImageState, Progress, ReplayOutcome, SessionEvent, SessionPhase, SessionSnapshot,
};
use super::writer::{FlushReport, ScoreWriter};
use super::POINTS_PER_CORRECT;
use crate::flashcards::{Deck, Flashcard};
use crate::generator::{ContentGenerator, GenerationError};
use crate::images::{ImageRef, ImageResolver};
use crate::scores::ScoreStore;
use crate::speech::SpeechOutput;

/// Collaborators a session talks to
#[derive(Clone)]
pub struct Services {
    pub generator: Arc<dyn ContentGenerator>,
    pub images: Arc<dyn ImageResolver>,
    pub scores: Arc<dyn ScoreStore>,
}

pub struct SessionController {
    category: String,
    user_id: Option<String>,
    services: Services,
    phase: SessionPhase,
    deck: Option<Deck>,
    current_index: usize,
    selected_answer: Option<String>,
    score: u64,
    score_loaded: bool,
    load_failed: bool,
    image: ImageState,
    /// Bumped whenever the deck is replaced
    generation: u64,
    pending_images: usize,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    writer: Option<ScoreWriter>,
}

impl SessionController {
    /// A session for `category`. Without a user the score stays local.
    pub fn new(category: impl Into<String>, user_id: Option<String>, services: Services) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            category: category.into(),
            user_id,
            services,
            phase: SessionPhase::Loading,
            deck: None,
            current_index: 0,
            selected_answer: None,
            score: 0,
            score_loaded: false,
            load_failed: false,
            image: ImageState::Pending,
            generation: 0,
            pending_images: 0,
            events_tx,
            events_rx,
            writer: None,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The card being asked, if any
    pub fn current_card(&self) -> Option<&Flashcard> {
        if !self.phase.has_current_card() {
            return None;
        }
        self.deck.as_ref()?.get(self.current_index)
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.selected_answer.as_deref()
    }

    pub fn is_revealed(&self) -> bool {
        self.phase == SessionPhase::Revealed
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn image(&self) -> &ImageState {
        &self.image
    }

    pub fn current_image(&self) -> Option<&ImageRef> {
        match &self.image {
            ImageState::Ready(image) => Some(image),
            ImageState::Pending => None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Score changes are no longer reaching the store
    pub fn persistence_degraded(&self) -> bool {
        self.load_failed || self.writer.as_ref().is_some_and(ScoreWriter::is_degraded)
    }

    /// Generate a deck and, the first time, load the stored score.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn start(&mut self) {
        self.phase = SessionPhase::Loading;
        self.deck = None;
        self.current_index = 0;
        self.selected_answer = None;
        self.image = ImageState::Pending;
        self.generation += 1;

        log::info!(
            "Starting session for '{}' (deck {})",
            self.category,
            self.generation
        );

        let load_user = if self.score_loaded {
            None
        } else {
            self.user_id.as_deref()
        };
        let scores = &self.services.scores;
        let load = async move {
            match load_user {
                Some(uid) => Some(scores.load_score(uid).await),
                None => None,
            }
        };

        let (generated, loaded) =
            tokio::join!(self.services.generator.generate_deck(&self.category), load);

        if let Some(result) = loaded {
            self.score_loaded = true;
            match result {
                Ok(stored) => self.score = stored,
                Err(e) => {
                    log::warn!("Could not load score, keeping it in memory only: {}", e);
                    self.load_failed = true;
                }
            }
        }

        if self.writer.is_none() {
            if let Some(uid) = &self.user_id {
                self.writer = Some(ScoreWriter::spawn(
                    Arc::clone(&self.services.scores),
                    uid.clone(),
                ));
            }
        }

        match generated {
            Ok(deck) if deck.is_empty() => self.fail(GenerationError::EmptyDeck),
            Ok(deck) => {
                log::info!("Deck ready: {} cards", deck.len());
                self.deck = Some(deck);
                self.phase = SessionPhase::AwaitingAnswer;
                self.request_image();
            }
            Err(e) => self.fail(e),
        }
    }

    /// Start over after a failed generation. Ignored in any other phase.
    pub async fn retry(&mut self) -> bool {
        if !matches!(self.phase, SessionPhase::Failed(_)) {
            return false;
        }
        self.start().await;
        true
    }

    /// Replace the deck with a fresh one for the same category, keeping the score
    pub async fn regenerate(&mut self) -> bool {
        if self.phase == SessionPhase::Loading {
            return false;
        }
        self.start().await;
        true
    }

    fn fail(&mut self, err: GenerationError) {
        log::warn!("Deck generation for '{}' failed: {}", self.category, err);
        self.deck = None;
        self.phase = SessionPhase::Failed(err);
    }

    /// Answer the current card. Only the first selection per card counts.
    pub fn select_option(&mut self, option: &str) -> Option<Answer> {
        if self.phase != SessionPhase::AwaitingAnswer {
            return None;
        }
        let correct = self.current_card()?.is_correct(option);

        self.selected_answer = Some(option.to_string());
        self.phase = SessionPhase::Revealed;

        let points_awarded = if correct { POINTS_PER_CORRECT } else { 0 };
        if correct {
            self.score = self.score.saturating_add(points_awarded);
            self.persist(points_awarded);
        }

        Some(Answer {
            correct,
            points_awarded,
            score: self.score,
        })
    }

    fn persist(&mut self, delta: u64) {
        if let Some(writer) = &self.writer {
            if !writer.add(delta) {
                log::warn!("Score writer is gone, keeping score in memory only");
                self.load_failed = true;
            }
        }
    }

    /// Move past a revealed card.
    ///
    /// Must be called within a Tokio runtime.
    pub fn advance(&mut self) -> Option<Progress> {
        if self.phase != SessionPhase::Revealed {
            return None;
        }
        let last = self.deck.as_ref()?.last_index()?;

        if self.current_index >= last {
            log::info!("Session for '{}' finished with {}", self.category, self.score);
            self.phase = SessionPhase::Finished {
                final_score: self.score,
            };
            return Some(Progress::Finished {
                final_score: self.score,
            });
        }

        self.current_index += 1;
        self.selected_answer = None;
        self.phase = SessionPhase::AwaitingAnswer;
        self.request_image();

        Some(Progress::Next {
            index: self.current_index,
        })
    }

    /// Speak the current card's prompt
    pub fn replay_audio(&self, speech: &dyn SpeechOutput) -> ReplayOutcome {
        let Some(card) = self.current_card() else {
            return ReplayOutcome::Unavailable;
        };
        if !speech.is_available() {
            return ReplayOutcome::Unavailable;
        }

        match speech.speak(card.item()) {
            Ok(()) => ReplayOutcome::Spoken,
            Err(e) => {
                log::warn!("Speech failed: {}", e);
                ReplayOutcome::Unavailable
            }
        }
    }

    fn request_image(&mut self) {
        self.image = ImageState::Pending;
        let Some(card) = self.current_card() else {
            return;
        };

        let term = card.correct_answer().to_string();
        let images = Arc::clone(&self.services.images);
        let events = self.events_tx.clone();
        let (index, generation) = (self.current_index, self.generation);

        self.pending_images += 1;
        tokio::spawn(async move {
            let image = images.resolve_image(&term).await;
            let _ = events.send(SessionEvent::ImageResolved {
                index,
                generation,
                image,
            });
        });
    }

    /// Apply a background result. Returns false when it was stale.
    pub fn apply_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::ImageResolved {
                index,
                generation,
                image,
            } => {
                if generation != self.generation
                    || index != self.current_index
                    || self.deck.is_none()
                {
                    log::debug!(
                        "Dropping stale image for card {} of deck {}",
                        index,
                        generation
                    );
                    return false;
                }
                self.image = ImageState::Ready(image);
                true
            }
        }
    }

    /// Wait for the next background result, if any is outstanding
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.pending_images == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.pending_images -= 1;
        Some(event)
    }

    /// Apply every result that has already arrived. Returns how many applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.pending_images = self.pending_images.saturating_sub(1);
            if self.apply_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until the current card's image is known. Returns false when no
    /// lookup is outstanding for it.
    pub async fn settle_image(&mut self) -> bool {
        while self.image == ImageState::Pending && self.current_card().is_some() {
            match self.next_event().await {
                Some(event) => {
                    self.apply_event(event);
                }
                None => return false,
            }
        }
        self.current_image().is_some()
    }

    /// Wait until queued score writes have been attempted
    pub async fn flush(&self) -> FlushReport {
        match &self.writer {
            Some(writer) => writer.flush().await,
            None => FlushReport::default(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let card = self.current_card();
        let revealed = self.is_revealed();

        SessionSnapshot {
            category: self.category.clone(),
            phase: self.phase.name(),
            index: self.current_index,
            total: self.deck.as_ref().map(Deck::len).unwrap_or(0),
            score: self.score,
            item: card.map(|c| c.item().to_string()),
            options: card.map(|c| c.options().to_vec()).unwrap_or_default(),
            selected_answer: self.selected_answer.clone(),
            correct_answer: card
                .filter(|_| revealed)
                .map(|c| c.correct_answer().to_string()),
            image: self.current_image().cloned(),
            error: match &self.phase {
                SessionPhase::Failed(e) => Some(e.to_string()),
                _ => None,
            },
            persistence_degraded: self.persistence_degraded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GeminiGenerator;
    use crate::images::{placeholder_url, ImageSource, UnsplashResolver};
    use crate::scores::{MemoryScoreStore, PersistenceError};
    use crate::speech::{NoSpeech, SpeechError};
    use crate::test_support::{fast_settings, serve};
    use async_trait::async_trait;
    use axum::{http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    const ANIMALS: [&str; 15] = [
        "Elephant", "Lion", "Zebra", "Giraffe", "Tiger", "Panda", "Koala", "Horse", "Camel",
        "Rabbit", "Monkey", "Whale", "Eagle", "Penguin", "Kangaroo",
    ];

    fn card(answer: &str, others: [&str; 3]) -> Flashcard {
        let options = vec![
            others[0].to_string(),
            answer.to_string(),
            others[1].to_string(),
            others[2].to_string(),
        ];
        Flashcard::new(format!("Which one is the {}?", answer), options, answer.to_string())
            .unwrap()
    }

    fn animal_deck() -> Deck {
        let cards = ANIMALS
            .iter()
            .map(|animal| card(animal, ["Rock", "Cloud", "Spoon"]))
            .collect();
        Deck::new("Animals", cards)
    }

    fn small_deck(len: usize) -> Deck {
        Deck::new("Animals", animal_deck().cards()[..len].to_vec())
    }

    /// Hands out prepared results in order, then repeats the last one
    struct ScriptedGenerator {
        results: Mutex<Vec<Result<Deck, GenerationError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(results: Vec<Result<Deck, GenerationError>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate_deck(&self, _category: &str) -> Result<Deck, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            if results.len() > 1 {
                results.remove(0)
            } else {
                results[0].clone()
            }
        }
    }

    /// Resolves instantly to a URL naming the term
    struct EchoImages;

    #[async_trait]
    impl ImageResolver for EchoImages {
        async fn resolve_image(&self, term: &str) -> ImageRef {
            ImageRef::found(format!("https://images.example/{}.jpg", term))
        }
    }

    /// Slow for one term, instant for the rest
    struct SlowFor(&'static str);

    #[async_trait]
    impl ImageResolver for SlowFor {
        async fn resolve_image(&self, term: &str) -> ImageRef {
            if term == self.0 {
                tokio::time::sleep(Duration::from_millis(150)).await;
            }
            ImageRef::found(format!("https://images.example/{}.jpg", term))
        }
    }

    /// Never answers
    struct StuckImages;

    #[async_trait]
    impl ImageResolver for StuckImages {
        async fn resolve_image(&self, _term: &str) -> ImageRef {
            std::future::pending().await
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ScoreStore for BrokenStore {
        async fn load_score(&self, _user_id: &str) -> crate::scores::Result<u64> {
            Err(PersistenceError::Timeout)
        }

        async fn peek_score(&self, _user_id: &str) -> crate::scores::Result<u64> {
            Err(PersistenceError::Timeout)
        }

        async fn add_score(&self, _user_id: &str, _delta: u64) -> crate::scores::Result<u64> {
            Err(PersistenceError::Http {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    struct RecordingSpeech(Mutex<Vec<String>>);

    impl SpeechOutput for RecordingSpeech {
        fn is_available(&self) -> bool {
            true
        }

        fn speak(&self, text: &str) -> Result<(), SpeechError> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn services(
        generator: Arc<dyn ContentGenerator>,
        images: Arc<dyn ImageResolver>,
        scores: Arc<dyn ScoreStore>,
    ) -> Services {
        Services {
            generator,
            images,
            scores,
        }
    }

    fn deck_services(deck: Deck, scores: Arc<dyn ScoreStore>) -> Services {
        services(
            Arc::new(ScriptedGenerator::new(vec![Ok(deck)])),
            Arc::new(EchoImages),
            scores,
        )
    }

    async fn started(deck: Deck) -> SessionController {
        let mut session = SessionController::new(
            "Animals",
            Some("u1".to_string()),
            deck_services(deck, Arc::new(MemoryScoreStore::new())),
        );
        session.start().await;
        session
    }

    fn answer_current(session: &mut SessionController, correctly: bool) -> Answer {
        let card = session.current_card().unwrap().clone();
        let option = if correctly {
            card.correct_answer().to_string()
        } else {
            card.options()
                .iter()
                .find(|o| !card.is_correct(o))
                .unwrap()
                .clone()
        };
        session.select_option(&option).unwrap()
    }

    #[tokio::test]
    async fn test_animals_first_card_scenario() {
        let mut session = started(animal_deck()).await;

        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert_eq!(session.deck().unwrap().len(), 15);
        assert_eq!(session.current_index(), 0);

        let answer = session.select_option("Elephant").unwrap();
        assert_eq!(
            answer,
            Answer {
                correct: true,
                points_awarded: 10,
                score: 10
            }
        );
        assert_eq!(session.score(), 10);
        assert_eq!(session.phase(), &SessionPhase::Revealed);
        assert_eq!(session.selected_answer(), Some("Elephant"));

        assert_eq!(session.advance(), Some(Progress::Next { index: 1 }));
        assert_eq!(session.current_index(), 1);
        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert_eq!(session.selected_answer(), None);
        assert!(!session.is_revealed());
    }

    #[tokio::test]
    async fn test_generator_http_500_fails_session() {
        async fn handler() -> impl IntoResponse {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal")
        }

        let mut settings = fast_settings(2);
        settings.gemini_base_url =
            serve(Router::new().route("/v1beta/models/{call}", post(handler))).await;
        let generator = GeminiGenerator::new("key".to_string(), &settings).unwrap();

        let mut session = SessionController::new(
            "Animals",
            None,
            services(
                Arc::new(generator),
                Arc::new(EchoImages),
                Arc::new(MemoryScoreStore::new()),
            ),
        );
        session.start().await;

        match session.phase() {
            SessionPhase::Failed(err) => {
                assert!(matches!(err, GenerationError::Http { status: 500, .. }));
                assert!(!err.to_string().is_empty());
            }
            other => panic!("unexpected phase: {:?}", other),
        }
        assert!(session.deck().is_none());
        assert!(session.current_card().is_none());
        assert_eq!(session.select_option("Elephant"), None);
        assert!(session.snapshot().error.is_some());
    }

    #[tokio::test]
    async fn test_carrot_without_results_gets_placeholder() {
        async fn handler() -> impl IntoResponse {
            Json(json!({ "total": 0, "results": [] }))
        }

        let mut settings = fast_settings(1);
        settings.unsplash_base_url =
            serve(Router::new().route("/search/photos", get(handler))).await;
        let resolver = UnsplashResolver::new("access".to_string(), &settings).unwrap();

        let deck = Deck::new("Vegetables", vec![card("Carrot", ["Pea", "Leek", "Kale"])]);
        let mut session = SessionController::new(
            "Vegetables",
            None,
            services(
                Arc::new(ScriptedGenerator::new(vec![Ok(deck)])),
                Arc::new(resolver),
                Arc::new(MemoryScoreStore::new()),
            ),
        );
        session.start().await;

        assert!(session.settle_image().await);
        let image = session.current_image().unwrap();
        assert_eq!(image.source, ImageSource::Placeholder);
        assert_eq!(image.url, placeholder_url("Carrot"));
        assert!(image.url.contains("Carrot"));
    }

    #[tokio::test]
    async fn test_selection_is_idempotent_per_card() {
        let mut session = started(animal_deck()).await;

        let first = answer_current(&mut session, false);
        assert!(!first.correct);
        assert_eq!(first.points_awarded, 0);

        assert_eq!(session.select_option("Elephant"), None);
        assert_eq!(session.select_option("Rock"), None);
        assert_eq!(session.selected_answer(), Some("Rock"));
        assert_eq!(session.score(), 0);
    }

    #[tokio::test]
    async fn test_score_never_decreases() {
        let mut session = started(animal_deck()).await;
        let mut previous = session.score();

        for i in 0..15 {
            let answer = answer_current(&mut session, i % 3 != 0);
            assert!(answer.score >= previous);
            previous = answer.score;
            session.advance().unwrap();
        }
        assert_eq!(session.score(), 100);
    }

    #[tokio::test]
    async fn test_advance_finishes_exactly_once() {
        let mut session = started(small_deck(4)).await;
        let mut finished = 0;

        for _ in 0..4 {
            assert!(session.current_index() <= 3);
            answer_current(&mut session, true);
            if let Some(Progress::Finished { final_score }) = session.advance() {
                assert_eq!(final_score, 40);
                finished += 1;
            }
        }

        assert_eq!(finished, 1);
        assert_eq!(session.phase(), &SessionPhase::Finished { final_score: 40 });
        assert_eq!(session.current_index(), 3);
        assert_eq!(session.advance(), None);
        assert_eq!(session.select_option("Elephant"), None);
    }

    #[tokio::test]
    async fn test_advance_requires_reveal() {
        let mut session = started(animal_deck()).await;
        assert_eq!(session.advance(), None);
        assert_eq!(session.current_index(), 0);
    }

    #[tokio::test]
    async fn test_stale_image_event_is_dropped() {
        let mut session = SessionController::new(
            "Animals",
            None,
            deck_services(animal_deck(), Arc::new(MemoryScoreStore::new())),
        );
        session.services.images = Arc::new(StuckImages);
        session.start().await;

        answer_current(&mut session, true);
        session.advance();

        let old_card = SessionEvent::ImageResolved {
            index: 0,
            generation: session.generation(),
            image: ImageRef::found("https://images.example/old.jpg"),
        };
        assert!(!session.apply_event(old_card));
        assert_eq!(session.image(), &ImageState::Pending);

        let old_deck = SessionEvent::ImageResolved {
            index: 1,
            generation: session.generation() - 1,
            image: ImageRef::found("https://images.example/old.jpg"),
        };
        assert!(!session.apply_event(old_deck));
        assert_eq!(session.image(), &ImageState::Pending);

        let current = SessionEvent::ImageResolved {
            index: 1,
            generation: session.generation(),
            image: ImageRef::found("https://images.example/Lion.jpg"),
        };
        assert!(session.apply_event(current));
        assert_eq!(
            session.current_image().map(|i| i.url.as_str()),
            Some("https://images.example/Lion.jpg")
        );
    }

    #[tokio::test]
    async fn test_late_image_for_previous_card_is_ignored() {
        let mut session = SessionController::new(
            "Animals",
            None,
            services(
                Arc::new(ScriptedGenerator::new(vec![Ok(animal_deck())])),
                Arc::new(SlowFor("Elephant")),
                Arc::new(MemoryScoreStore::new()),
            ),
        );
        session.start().await;

        answer_current(&mut session, true);
        session.advance();

        assert!(session.settle_image().await);
        let lion = session.current_image().cloned().unwrap();
        assert_eq!(lion.url, "https://images.example/Lion.jpg");

        let late = session.next_event().await.unwrap();
        assert!(!session.apply_event(late));
        assert_eq!(session.current_image(), Some(&lion));
        assert_eq!(session.next_event().await, None);
    }

    #[tokio::test]
    async fn test_image_does_not_block_answering() {
        let mut session = SessionController::new(
            "Animals",
            None,
            deck_services(animal_deck(), Arc::new(MemoryScoreStore::new())),
        );
        session.services.images = Arc::new(StuckImages);
        session.start().await;

        assert_eq!(session.image(), &ImageState::Pending);
        assert!(answer_current(&mut session, true).correct);
        assert_eq!(session.drain_events(), 0);
    }

    #[tokio::test]
    async fn test_score_is_loaded_and_persisted() {
        let store = Arc::new(MemoryScoreStore::with_score("u1", 30));
        let mut session =
            SessionController::new("Animals", Some("u1".to_string()), deck_services(animal_deck(), store.clone()));
        session.start().await;
        assert_eq!(session.score(), 30);

        answer_current(&mut session, true);
        session.advance();
        answer_current(&mut session, true);

        let report = session.flush().await;
        assert_eq!(report.persisted_total, Some(50));
        assert_eq!(report.failed_writes, 0);
        assert_eq!(store.peek_score("u1").await.unwrap(), 50);
        assert!(!session.persistence_degraded());
    }

    #[tokio::test]
    async fn test_new_user_record_is_created() {
        let store = Arc::new(MemoryScoreStore::new());
        let mut session =
            SessionController::new("Animals", Some("new".to_string()), deck_services(animal_deck(), store.clone()));
        session.start().await;

        assert_eq!(session.score(), 0);
        assert!(store.contains("new"));
    }

    #[tokio::test]
    async fn test_anonymous_session_keeps_score_locally() {
        let store = Arc::new(MemoryScoreStore::new());
        let mut session = SessionController::new("Animals", None, deck_services(animal_deck(), store.clone()));
        session.start().await;

        answer_current(&mut session, true);
        assert_eq!(session.score(), 10);
        assert_eq!(session.flush().await, FlushReport::default());
        assert!(!store.contains("u1"));
    }

    #[tokio::test]
    async fn test_broken_store_degrades_without_blocking() {
        let mut session = SessionController::new(
            "Animals",
            Some("u1".to_string()),
            deck_services(animal_deck(), Arc::new(BrokenStore)),
        );
        session.start().await;

        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert!(session.persistence_degraded());
        assert_eq!(session.score(), 0);

        let answer = answer_current(&mut session, true);
        assert_eq!(answer.score, 10);

        let report = session.flush().await;
        assert_eq!(report.persisted_total, None);
        assert_eq!(report.failed_writes, 1);
        assert_eq!(session.score(), 10);
    }

    #[tokio::test]
    async fn test_retry_after_failure() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Err(GenerationError::Timeout),
            Ok(animal_deck()),
        ]));
        let mut session = SessionController::new(
            "Animals",
            None,
            services(generator.clone(), Arc::new(EchoImages), Arc::new(MemoryScoreStore::new())),
        );

        session.start().await;
        assert_eq!(session.phase(), &SessionPhase::Failed(GenerationError::Timeout));

        assert!(session.retry().await);
        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert_eq!(generator.calls(), 2);

        assert!(!session.retry().await);
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_deck_fails() {
        let mut session = started(Deck::new("Animals", Vec::new())).await;
        assert_eq!(session.phase(), &SessionPhase::Failed(GenerationError::EmptyDeck));
        assert!(session.deck().is_none());
    }

    #[tokio::test]
    async fn test_regenerate_keeps_score() {
        let generator = Arc::new(ScriptedGenerator::new(vec![
            Ok(animal_deck()),
            Ok(small_deck(2)),
        ]));
        let store = Arc::new(MemoryScoreStore::with_score("u1", 20));
        let mut session = SessionController::new(
            "Animals",
            Some("u1".to_string()),
            services(generator.clone(), Arc::new(EchoImages), store.clone()),
        );

        assert!(!session.regenerate().await);
        session.start().await;
        answer_current(&mut session, true);
        let generation = session.generation();

        assert!(session.regenerate().await);
        assert_eq!(session.generation(), generation + 1);
        assert_eq!(session.deck().unwrap().len(), 2);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert_eq!(session.score(), 30);

        session.flush().await;
        assert_eq!(store.peek_score("u1").await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_replay_audio() {
        let mut session = SessionController::new(
            "Animals",
            None,
            deck_services(animal_deck(), Arc::new(MemoryScoreStore::new())),
        );
        let speech = RecordingSpeech(Mutex::new(Vec::new()));

        assert_eq!(session.replay_audio(&speech), ReplayOutcome::Unavailable);

        session.start().await;
        assert_eq!(session.replay_audio(&NoSpeech), ReplayOutcome::Unavailable);
        assert_eq!(session.replay_audio(&speech), ReplayOutcome::Spoken);
        assert_eq!(session.phase(), &SessionPhase::AwaitingAnswer);
        assert_eq!(
            speech.0.lock().unwrap().as_slice(),
            ["Which one is the Elephant?".to_string()]
        );
    }

    #[tokio::test]
    async fn test_snapshot_hides_answer_until_revealed() {
        let mut session = started(animal_deck()).await;

        let before = session.snapshot();
        assert_eq!(before.phase, "awaiting_answer");
        assert_eq!(before.total, 15);
        assert_eq!(before.options.len(), 4);
        assert_eq!(before.correct_answer, None);

        session.select_option("Elephant");
        let after = session.snapshot();
        assert_eq!(after.phase, "revealed");
        assert_eq!(after.correct_answer.as_deref(), Some("Elephant"));
        assert_eq!(after.score, 10);
    }
}
