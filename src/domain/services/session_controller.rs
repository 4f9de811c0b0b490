#[cfg(test)]
#[path = "session_controller_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::CallbackRegistry;
use super::DeviceProbe;
use super::InitProgressTracker;
use super::MessageObserver;
use super::WorkerProxy;
use crate::domain::models::sort_by_recent;
use crate::domain::models::CommitPolicy;
use crate::domain::models::Conversation;
use crate::domain::models::DetectorBox;
use crate::domain::models::DeviceCapability;
use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResponse;
use crate::domain::models::InitProgress;
use crate::domain::models::InitState;
use crate::domain::models::Message;
use crate::domain::models::SessionError;
use crate::domain::models::StoreBox;
use crate::domain::models::WorkerBox;

enum StoreSlot {
    NotReady,
    Ready(StoreBox),
}

/// What the receive loop needs to know about the request it is serving.
struct InFlight {
    store: StoreBox,
    conversation_id: String,
    request_id: String,
    assistant_message_id: String,
    assistant_role_name: String,
}

struct Inner {
    store: RwLock<StoreSlot>,
    worker: WorkerProxy,
    detector: DetectorBox,
    commit_policy: CommitPolicy,
    callbacks: CallbackRegistry,
    init_tracker: InitProgressTracker,
    device_probe: DeviceProbe,
    generating: watch::Sender<bool>,
    cancel: Mutex<Option<CancellationToken>>,
}

/// Owns the single generation session of a chat. At most one request is in
/// flight at a time; a second `send` while generating is rejected.
///
/// Actions return as soon as the work is handed off. Results show up in the
/// conversation store, the registered observer, and the watch channels
/// exposed by the accessors.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Spawns the worker task and starts device detection. Must be called
    /// from within a tokio runtime.
    pub fn new(
        worker: WorkerBox,
        detector: DetectorBox,
        commit_policy: CommitPolicy,
    ) -> SessionController {
        let (generating, _) = watch::channel(false);
        let controller = SessionController {
            inner: Arc::new(Inner {
                store: RwLock::new(StoreSlot::NotReady),
                worker: WorkerProxy::spawn(worker),
                detector,
                commit_policy,
                callbacks: CallbackRegistry::default(),
                init_tracker: InitProgressTracker::default(),
                device_probe: DeviceProbe::default(),
                generating,
                cancel: Mutex::new(None),
            }),
        };

        controller.recheck_device();

        return controller;
    }

    pub fn attach_store(&self, store: StoreBox) {
        *self
            .inner
            .store
            .write()
            .unwrap_or_else(PoisonError::into_inner) = StoreSlot::Ready(store);
    }

    pub fn is_store_ready(&self) -> bool {
        return self.store().is_ok();
    }

    fn store(&self) -> Result<StoreBox, SessionError> {
        match &*self
            .inner
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
        {
            StoreSlot::Ready(store) => return Ok(store.clone()),
            StoreSlot::NotReady => return Err(SessionError::StoreNotReady),
        }
    }

    // Model loading

    /// Starts loading the model. Does nothing while a load is running or
    /// after one succeeded.
    pub fn init(&self) -> Result<(), SessionError> {
        if !self.inner.worker.is_available() {
            return Err(self.inner.worker.unavailable());
        }

        if !self.inner.init_tracker.begin() {
            tracing::debug!(state = ?self.inner.init_tracker.state(), "Init already requested");
            return Ok(());
        }

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<InitProgress>();
        let (done_tx, done_rx) = oneshot::channel::<anyhow::Result<()>>();
        if let Err(err) = self.inner.worker.init(progress_tx, done_tx) {
            self.inner.init_tracker.fail(&err.to_string());
            return Err(err);
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                inner.init_tracker.update(progress);
            }

            match done_rx.await {
                Ok(Ok(())) => {
                    tracing::info!("Model loaded");
                    inner.init_tracker.finish();
                }
                Ok(Err(err)) => {
                    inner.init_tracker.fail(&err.to_string());
                }
                Err(_) => {
                    inner
                        .init_tracker
                        .fail("The worker stopped before the model finished loading");
                }
            }
        });

        return Ok(());
    }

    pub fn loading_status(&self) -> InitProgress {
        return self.inner.init_tracker.progress();
    }

    pub fn init_state(&self) -> InitState {
        return self.inner.init_tracker.state();
    }

    pub fn subscribe_loading_status(&self) -> watch::Receiver<InitProgress> {
        return self.inner.init_tracker.subscribe_progress();
    }

    pub fn subscribe_init_state(&self) -> watch::Receiver<InitState> {
        return self.inner.init_tracker.subscribe_state();
    }

    // Device detection

    pub fn device(&self) -> DeviceCapability {
        return self.inner.device_probe.capability();
    }

    pub fn subscribe_device(&self) -> watch::Receiver<DeviceCapability> {
        return self.inner.device_probe.subscribe();
    }

    /// Runs device detection again in the background. Returns false if a
    /// probe is already running.
    pub fn recheck_device(&self) -> bool {
        if !self.inner.device_probe.try_begin() {
            return false;
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner.device_probe.probe(&inner.detector).await;
        });

        return true;
    }

    // Callbacks and roles

    /// Registers the observer for streamed responses, replacing any
    /// previous one.
    pub fn on_message(&self, observer: MessageObserver) {
        self.inner.callbacks.set_observer(observer);
    }

    pub fn user_role_name(&self) -> String {
        return self.inner.callbacks.user_role_name();
    }

    pub fn set_user_role_name(&self, name: &str) {
        self.inner.callbacks.set_user_role_name(name);
    }

    pub fn assistant_role_name(&self) -> String {
        return self.inner.callbacks.assistant_role_name();
    }

    pub fn set_assistant_role_name(&self, name: &str) {
        self.inner.callbacks.set_assistant_role_name(name);
    }

    // Generation

    pub fn is_generating(&self) -> bool {
        return *self.inner.generating.borrow();
    }

    pub fn subscribe_generating(&self) -> watch::Receiver<bool> {
        return self.inner.generating.subscribe();
    }

    /// Appends `text` as a user message to the current conversation and asks
    /// the worker for a reply. Returns the request id once the request is
    /// handed to the worker. When `stop_sequences` is `None` both role names
    /// are used.
    pub async fn send(
        &self,
        text: &str,
        max_tokens: u32,
        stop_sequences: Option<Vec<String>>,
    ) -> Result<String, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let store = self.store()?;
        let conversation_id = store
            .current_conversation_id()
            .await
            .map_err(SessionError::Store)?
            .ok_or(SessionError::NoActiveConversation)?;
        let mut conversation = store
            .conversation(&conversation_id)
            .await
            .map_err(SessionError::Store)?
            .ok_or(SessionError::NoActiveConversation)?;

        if !self.inner.worker.is_available() {
            return Err(self.inner.worker.unavailable());
        }

        let claimed = self.inner.generating.send_if_modified(|generating| {
            if *generating {
                return false;
            }
            *generating = true;
            return true;
        });
        if !claimed {
            return Err(SessionError::AlreadyGenerating);
        }

        let user_message = Message::new(&self.user_role_name(), text);
        if let Err(err) = store
            .add_message(&conversation_id, user_message.clone())
            .await
        {
            self.inner.generating.send_replace(false);
            return Err(SessionError::Store(err));
        }
        conversation.upsert_message(user_message);

        let request_id = Uuid::new_v4().to_string();
        let assistant_role_name = self.assistant_role_name();
        let request = GenerationRequest {
            request_id: request_id.to_string(),
            conversation,
            stop_sequences: stop_sequences
                .unwrap_or_else(|| return self.inner.callbacks.default_stop_sequences()),
            max_tokens,
            assistant_role_name: assistant_role_name.to_string(),
        };

        let (response_tx, response_rx) = mpsc::unbounded_channel::<GenerationResponse>();
        let cancel = CancellationToken::new();
        if let Err(err) = self
            .inner
            .worker
            .generate(request, response_tx, cancel.clone())
        {
            self.inner.generating.send_replace(false);
            return Err(err);
        }

        *self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(cancel.clone());

        tracing::debug!(
            request_id = %request_id,
            conversation_id = %conversation_id,
            max_tokens,
            "Generation requested"
        );

        let in_flight = InFlight {
            store,
            conversation_id,
            request_id: request_id.to_string(),
            assistant_message_id: Uuid::new_v4().to_string(),
            assistant_role_name,
        };
        tokio::spawn(receive_responses(
            self.inner.clone(),
            in_flight,
            response_rx,
            cancel,
        ));

        return Ok(request_id);
    }

    /// Stops the in-flight generation, if any. The partial reply is kept and
    /// the session finishes with a cancelled response.
    pub fn cancel(&self) -> bool {
        let cancel = self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(token) = cancel {
            token.cancel();
            return true;
        }

        return false;
    }

    // Conversations

    pub async fn current_conversation(&self) -> Result<Option<Conversation>, SessionError> {
        let store = self.store()?;
        let id = store
            .current_conversation_id()
            .await
            .map_err(SessionError::Store)?;
        if let Some(id) = id {
            return store.conversation(&id).await.map_err(SessionError::Store);
        }

        return Ok(None);
    }

    /// All conversations, most recently updated first.
    pub async fn all_conversations(&self) -> Result<Vec<Conversation>, SessionError> {
        let mut conversations = self
            .store()?
            .conversations()
            .await
            .map_err(SessionError::Store)?;
        sort_by_recent(&mut conversations);

        return Ok(conversations);
    }

    /// Creates a conversation and makes it the current one.
    pub async fn new_conversation(
        &self,
        title: &str,
        system_prompt: &str,
    ) -> Result<Conversation, SessionError> {
        let store = self.store()?;
        let conversation = Conversation::new(title, system_prompt);
        store
            .create_conversation(conversation.clone())
            .await
            .map_err(SessionError::Store)?;
        store
            .set_current_conversation_id(Some(conversation.id.to_string()))
            .await
            .map_err(SessionError::Store)?;

        return Ok(conversation);
    }

    pub async fn select_conversation(&self, id: &str) -> Result<Conversation, SessionError> {
        let store = self.store()?;
        let conversation = store
            .conversation(id)
            .await
            .map_err(SessionError::Store)?
            .ok_or_else(|| return SessionError::ConversationNotFound(id.to_string()))?;
        store
            .set_current_conversation_id(Some(id.to_string()))
            .await
            .map_err(SessionError::Store)?;

        return Ok(conversation);
    }

    pub async fn set_conversation_title(&self, id: &str, title: &str) -> Result<(), SessionError> {
        let store = self.store()?;
        self.ensure_exists(&store, id).await?;

        return store
            .set_conversation_title(id, title)
            .await
            .map_err(SessionError::Store);
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<(), SessionError> {
        let store = self.store()?;
        self.ensure_exists(&store, id).await?;

        return store
            .delete_conversation(id)
            .await
            .map_err(SessionError::Store);
    }

    pub async fn delete_all_conversations(&self) -> Result<(), SessionError> {
        return self
            .store()?
            .delete_all_conversations()
            .await
            .map_err(SessionError::Store);
    }

    pub async fn clear_messages(&self, id: &str) -> Result<(), SessionError> {
        let store = self.store()?;
        self.ensure_exists(&store, id).await?;

        return store.delete_messages(id).await.map_err(SessionError::Store);
    }

    async fn ensure_exists(&self, store: &StoreBox, id: &str) -> Result<(), SessionError> {
        let exists = store
            .conversation(id)
            .await
            .map_err(SessionError::Store)?
            .is_some();
        if !exists {
            return Err(SessionError::ConversationNotFound(id.to_string()));
        }

        return Ok(());
    }
}

/// Drains one request's responses. This is the only place that decides a
/// request is finished, and it always ends with exactly one terminal
/// response, even when the worker goes away or the request is cancelled.
async fn receive_responses(
    inner: Arc<Inner>,
    in_flight: InFlight,
    mut rx: mpsc::UnboundedReceiver<GenerationResponse>,
    cancel: CancellationToken,
) {
    let mut last_text = String::new();

    loop {
        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(request_id = %in_flight.request_id, "Generation cancelled");
                GenerationResponse::failed(&in_flight.request_id, &last_text, "Generation was cancelled.")
            }
            res = rx.recv() => match res {
                Some(res) => res,
                None => GenerationResponse::failed(
                    &in_flight.request_id,
                    &last_text,
                    "The worker stopped before finishing its response.",
                ),
            },
        };

        if response.request_id != in_flight.request_id {
            tracing::warn!(
                expected = %in_flight.request_id,
                received = %response.request_id,
                "Dropping response for another request"
            );
            continue;
        }

        if response.is_error() && response.output_text.is_empty() {
            response.output_text = last_text.to_string();
        }
        last_text = response.output_text.to_string();

        handle_response(&inner, &in_flight, &response).await;

        if response.is_finished {
            break;
        }
    }
}

/// Observer first, then the store, then the generating flag. The flag is
/// cleared last so that anyone seeing `is_generating() == false` also sees
/// the committed reply.
async fn handle_response(inner: &Inner, in_flight: &InFlight, response: &GenerationResponse) {
    inner.callbacks.notify(response);

    let should_commit = match inner.commit_policy {
        CommitPolicy::Streaming => true,
        CommitPolicy::OnFinish => response.is_finished,
    };

    if should_commit && !response.output_text.is_empty() {
        let message = Message::with_id(
            &in_flight.assistant_message_id,
            &in_flight.assistant_role_name,
            &response.output_text,
        );

        if let Err(err) = in_flight
            .store
            .add_message(&in_flight.conversation_id, message)
            .await
        {
            tracing::error!(
                request_id = %in_flight.request_id,
                conversation_id = %in_flight.conversation_id,
                error = ?err,
                "Failed to store assistant message"
            );
        }
    }

    if response.is_finished {
        if let Some(err) = &response.error {
            tracing::warn!(request_id = %in_flight.request_id, error = %err, "Generation finished with an error");
        } else {
            tracing::debug!(request_id = %in_flight.request_id, "Generation finished");
        }

        inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        inner.generating.send_replace(false);
    }
}
