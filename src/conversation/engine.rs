//! # Conversation Engine
//!
//! Orchestrates one full turn: transcribe the captured segment, append the
//! user utterance, build the prompt from the running history, request the
//! assistant reply, append it, and hand both texts back.
//!
//! ## Partial-Failure Contract:
//! - Transcription failure aborts the turn before any store mutation.
//! - Completion failure happens after the user turn is appended; that turn
//!   stays. The spoken record survives even when no reply was generated, and
//!   the error carries the transcript so callers can surface it.
//!
//! A successful call appends exactly one USER and one ASSISTANT turn; no other
//! append pattern is visible to readers.

use crate::audio::segment::AudioSegment;
use crate::completion::gateway::{ChatCompletion, ChatMessage, CompletionError};
use crate::conversation::store::{ConversationStore, StoreError};
use crate::conversation::turn::Role;
use crate::transcription::gateway::{SpeechToText, TranscriptionError};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Both sides of one completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnExchange {
    /// What the user said, as transcribed
    pub user_text: String,

    /// What the assistant replied
    pub assistant_text: String,
}

/// Failure cases for one orchestrated turn.
#[derive(Debug)]
pub enum TurnError {
    /// Transcription failed; no conversation state was touched
    Transcription(TranscriptionError),

    /// Reply generation failed after the user turn was appended. The
    /// transcript is the partial state that remains in the conversation.
    Completion {
        transcript: String,
        source: CompletionError,
    },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Transcription(err) => write!(f, "{}", err),
            TurnError::Completion { source, .. } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for TurnError {}

/// Turn pipeline over the store and the two external capabilities.
///
/// ## Thread Safety:
/// Cheap to share behind an `Arc`; every collaborator is already shared. No
/// lock is held across the provider suspension points, so concurrent turns on
/// different conversations proceed fully in parallel.
pub struct ConversationEngine {
    store: Arc<ConversationStore>,
    transcriber: Arc<dyn SpeechToText>,
    completer: Arc<dyn ChatCompletion>,

    /// Fixed system instruction that opens every prompt
    system_prompt: String,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<ConversationStore>,
        transcriber: Arc<dyn SpeechToText>,
        completer: Arc<dyn ChatCompletion>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transcriber,
            completer,
            system_prompt: system_prompt.into(),
        }
    }

    /// Run one full turn for `conversation_id`.
    ///
    /// ## Process:
    /// 1. Ensure the conversation exists (auto-creates on first contact)
    /// 2. Transcribe the segment; failure aborts with the store untouched
    /// 3. Append the USER turn
    /// 4. Build the prompt: system instruction, then full history oldest first
    /// 5. Request the completion
    /// 6. On failure, return `Completion` with the retained transcript
    /// 7. On success, append the ASSISTANT turn and return both texts
    pub async fn handle_turn(
        &self,
        conversation_id: &str,
        segment: AudioSegment,
    ) -> Result<TurnExchange, TurnError> {
        let started = Instant::now();
        self.store.ensure(conversation_id);

        let user_text = match self.transcriber.transcribe(&segment).await {
            Ok(text) => text,
            Err(err) => {
                error!(
                    conversation_id = %conversation_id,
                    error = %err,
                    "Transcription failed, turn aborted"
                );
                return Err(TurnError::Transcription(err));
            }
        };

        let user_turn = self
            .store
            .append(conversation_id, Role::User, user_text.clone());
        debug!(
            conversation_id = %conversation_id,
            sequence = user_turn.sequence,
            chars = user_text.len(),
            "Appended user turn"
        );

        let history = match self.store.snapshot(conversation_id) {
            Ok(turns) => turns,
            // Cleared out from under us between append and snapshot; the
            // prompt still carries the current utterance.
            Err(StoreError::NotFound(_)) => vec![user_turn.clone()],
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        for turn in &history {
            messages.push(ChatMessage::new(turn.role.as_str(), turn.content.clone()));
        }

        let assistant_text = match self.completer.complete(&messages).await {
            Ok(text) => text,
            Err(err) => {
                error!(
                    conversation_id = %conversation_id,
                    error = %err,
                    "Completion failed, user turn retained"
                );
                return Err(TurnError::Completion {
                    transcript: user_text,
                    source: err,
                });
            }
        };

        let assistant_turn =
            self.store
                .append(conversation_id, Role::Assistant, assistant_text.clone());

        info!(
            conversation_id = %conversation_id,
            user_sequence = user_turn.sequence,
            assistant_sequence = assistant_turn.sequence,
            duration_ms = started.elapsed().as_millis() as u64,
            "Turn completed"
        );

        Ok(TurnExchange {
            user_text,
            assistant_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Transcriber that echoes the segment bytes as UTF-8 text, or fails when
    /// told to.
    struct EchoTranscriber {
        fail: bool,
    }

    #[async_trait]
    impl SpeechToText for EchoTranscriber {
        async fn transcribe(&self, segment: &AudioSegment) -> Result<String, TranscriptionError> {
            if self.fail {
                return Err(TranscriptionError::Request("stub offline".to_string()));
            }
            Ok(String::from_utf8_lossy(&segment.bytes).to_string())
        }
    }

    /// Completer that returns a fixed reply (or fails) and records every
    /// prompt it was handed.
    struct ScriptedCompleter {
        reply: Option<String>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompleter {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> Vec<ChatMessage> {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedCompleter {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(CompletionError::Request("stub offline".to_string())),
            }
        }
    }

    fn engine_with(
        transcriber_fails: bool,
        completer: Arc<ScriptedCompleter>,
    ) -> (ConversationEngine, Arc<ConversationStore>) {
        let store = Arc::new(ConversationStore::new());
        let engine = ConversationEngine::new(
            Arc::clone(&store),
            Arc::new(EchoTranscriber {
                fail: transcriber_fails,
            }),
            completer,
            "You are a medical assistant that provides concise answers for medical questions.",
        );
        (engine, store)
    }

    fn segment(text: &str) -> AudioSegment {
        AudioSegment::webm(text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_successful_turn_appends_user_then_assistant() {
        let completer = Arc::new(ScriptedCompleter::replying("hi there"));
        let (engine, store) = engine_with(false, Arc::clone(&completer));

        let exchange = engine.handle_turn("c1", segment("hello")).await.unwrap();
        assert_eq!(exchange.user_text, "hello");
        assert_eq!(exchange.assistant_text, "hi there");

        let turns = store.snapshot("c1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
        assert_eq!(turns[0].sequence, 1);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "hi there");
        assert_eq!(turns[1].sequence, 2);
    }

    #[tokio::test]
    async fn test_transcription_failure_leaves_store_untouched() {
        let completer = Arc::new(ScriptedCompleter::replying("unused"));
        let (engine, store) = engine_with(true, Arc::clone(&completer));

        let result = engine.handle_turn("c1", segment("hello")).await;
        assert!(matches!(result, Err(TurnError::Transcription(_))));

        // The conversation was ensured but never written to.
        assert_eq!(store.snapshot("c1").unwrap().len(), 0);
        assert!(completer.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_completion_failure_retains_user_turn() {
        let completer = Arc::new(ScriptedCompleter::failing());
        let (engine, store) = engine_with(false, Arc::clone(&completer));

        let result = engine.handle_turn("c1", segment("hello")).await;
        match result {
            Err(TurnError::Completion { transcript, .. }) => assert_eq!(transcript, "hello"),
            other => panic!("Expected Completion error, got {:?}", other),
        }

        let turns = store.snapshot("c1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "hello");
    }

    #[tokio::test]
    async fn test_prompt_is_system_instruction_then_history_oldest_first() {
        let completer = Arc::new(ScriptedCompleter::replying("take two"));
        let (engine, store) = engine_with(false, Arc::clone(&completer));

        store.append("c1", Role::User, "I have a headache".to_string());
        store.append("c1", Role::Assistant, "How long has it lasted?".to_string());

        engine.handle_turn("c1", segment("two days")).await.unwrap();

        let prompt = completer.last_prompt();
        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].role, "system");
        assert_eq!(
            prompt[0].content,
            "You are a medical assistant that provides concise answers for medical questions."
        );
        assert_eq!(prompt[1].role, "user");
        assert_eq!(prompt[1].content, "I have a headache");
        assert_eq!(prompt[2].role, "assistant");
        assert_eq!(prompt[2].content, "How long has it lasted?");
        assert_eq!(prompt[3].role, "user");
        assert_eq!(prompt[3].content, "two days");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_on_distinct_ids_are_independent() {
        let completer = Arc::new(ScriptedCompleter::replying("noted"));
        let (engine, store) = engine_with(false, Arc::clone(&completer));
        let engine = Arc::new(engine);

        let a = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.handle_turn("c-a", segment("fever")).await })
        };
        let b = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.handle_turn("c-b", segment("cough")).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let turns_a = store.snapshot("c-a").unwrap();
        let turns_b = store.snapshot("c-b").unwrap();
        assert_eq!(turns_a.len(), 2);
        assert_eq!(turns_b.len(), 2);
        assert_eq!(turns_a[0].content, "fever");
        assert_eq!(turns_b[0].content, "cough");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_turns_on_same_id_sequence_gaplessly() {
        let completer = Arc::new(ScriptedCompleter::replying("noted"));
        let (engine, store) = engine_with(false, Arc::clone(&completer));
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .handle_turn("shared", segment(&format!("utterance {}", i)))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let turns = store.snapshot("shared").unwrap();
        assert_eq!(turns.len(), 8);
        for (index, turn) in turns.iter().enumerate() {
            assert_eq!(turn.sequence, index as u64 + 1);
        }

        let users = turns.iter().filter(|t| t.role == Role::User).count();
        let assistants = turns.iter().filter(|t| t.role == Role::Assistant).count();
        assert_eq!(users, 4);
        assert_eq!(assistants, 4);
    }
}
