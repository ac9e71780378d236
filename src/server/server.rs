//! WebSocket server implementation.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::data::questions_from_paper;
use crate::error::QuizError;
use crate::extract::resolve_count;
use crate::generate::{
    ChatMode, GeminiClient, LanguageModel, build_chat_prompt, format_response, generate_topic_quiz,
};
use crate::models::{ChatEntry, ChatRole};
use crate::protocol::{AI_SENDER, ClientMessage, ServerMessage, USER_SENDER, required};

use super::state::{ServerState, Session};

/// Shared server state wrapped in Arc<Mutex> for async access.
pub type SharedState = Arc<Mutex<ServerState>>;

const CHAT_FIELDS_REQUIRED: &str = "Message, userId, and mode are required.";
const CHAT_FAILED: &str = "Failed to generate AI response.";
const QUESTIONS_FAILED: &str = "An error occurred while fetching questions.";
const TOO_MANY_REQUESTS: &str = "Too many requests to generate questions. Please try again later.";
const USER_ID_REQUIRED: &str = "userId is required.";
const INVALID_MESSAGE: &str = "Invalid message.";

/// Run the quiz server until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), QuizError> {
    let model: Option<Arc<dyn LanguageModel>> = match config.gemini {
        Some(gemini) => Some(Arc::new(GeminiClient::new(gemini)?)),
        None => {
            warn!("GEMINI_API_KEY is missing, topic quizzes are mocked and chat is disabled");
            None
        }
    };

    let state = Arc::new(Mutex::new(ServerState::new(model, config.question_limit)));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Server listening");

    let prune_state = Arc::clone(&state);
    let window = config.question_limit.window.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            prune_state.lock().await.question_limiter.prune();
        }
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(stream, addr, Arc::clone(&state)));
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: SharedState) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let session = Session::new(addr.ip(), tx);
    let session_id = session.id;
    session.send(ServerMessage::ConnectionAck);
    state.lock().await.sessions.insert(session_id, session);
    info!(%session_id, %addr, "User connected");

    // Forward messages from the channel to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(%session_id, error = %e, "Socket error");
                break;
            }
            _ => continue,
        };

        handle_client_text(session_id, addr.ip(), &text, &state).await;
    }

    state.lock().await.sessions.remove(&session_id);
    info!(%session_id, "User disconnected");
    send_task.abort();
}

/// Decode one text frame and handle it. Frames that are not a known message
/// get an error reply.
pub async fn handle_client_text(session_id: Uuid, ip: IpAddr, text: &str, state: &SharedState) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => handle_client_message(session_id, ip, msg, state).await,
        Err(e) => {
            warn!(%session_id, error = %e, "Malformed message");
            state.lock().await.send_to(session_id, ServerMessage::error(INVALID_MESSAGE));
        }
    }
}

/// Handle a single client message.
pub async fn handle_client_message(
    session_id: Uuid,
    ip: IpAddr,
    msg: ClientMessage,
    state: &SharedState,
) {
    match msg {
        ClientMessage::SendMessage {
            user_id,
            message,
            mode,
        } => handle_chat(session_id, &user_id, &message, &mode, state).await,
        ClientMessage::RegisterPaper {
            user_id,
            path,
            original_name,
        } => handle_register_paper(session_id, &user_id, &path, &original_name, state).await,
        ClientMessage::FetchQuestions {
            paper_id,
            topic,
            question_count,
        } => handle_fetch_questions(session_id, ip, paper_id, topic, question_count, state).await,
        ClientMessage::GetChatHistory { user_id } => {
            let state = state.lock().await;
            let reply = match required(&user_id) {
                None => ServerMessage::error(USER_ID_REQUIRED),
                Some(user_id) => ServerMessage::ChatHistory {
                    history: state.chat_history(user_id),
                },
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::SaveTestResult {
            user_id,
            percentage,
            topic,
            paper_id,
        } => {
            let mut state = state.lock().await;
            let reply = match (required(&user_id), percentage.filter(|p| p.is_finite())) {
                (Some(user_id), Some(percentage)) => {
                    state.record_result(user_id, percentage, topic, paper_id);
                    ServerMessage::TestResultSaved {
                        message: "Test result saved successfully.".to_string(),
                    }
                }
                _ => ServerMessage::error("userId and percentage are required."),
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::GetTestResult { user_id } => {
            let state = state.lock().await;
            let reply = match required(&user_id) {
                None => ServerMessage::error(USER_ID_REQUIRED),
                Some(user_id) => match state.latest_result(user_id) {
                    Some(result) => ServerMessage::LatestTestResult {
                        percentage: result.percentage,
                    },
                    None => ServerMessage::error("No test result found for this user."),
                },
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::GetTestHistory { user_id } => {
            let state = state.lock().await;
            let reply = match required(&user_id) {
                None => ServerMessage::error(USER_ID_REQUIRED),
                Some(user_id) => ServerMessage::TestHistory {
                    history: state.result_history(user_id),
                },
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::SaveCanvas {
            user_id,
            canvas_data,
        } => {
            let mut state = state.lock().await;
            let reply = match (required(&user_id), required(&canvas_data)) {
                (Some(user_id), Some(canvas_data)) => {
                    state.record_canvas(user_id, canvas_data);
                    debug!(%session_id, user_id, bytes = canvas_data.len(), "Canvas saved");
                    ServerMessage::CanvasSaved {
                        message: "Canvas drawing saved successfully.".to_string(),
                    }
                }
                _ => ServerMessage::error("userId and canvasData are required."),
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::GetCanvas { user_id } => {
            let state = state.lock().await;
            let reply = match required(&user_id) {
                None => ServerMessage::error(USER_ID_REQUIRED),
                Some(user_id) => match state.latest_canvas(user_id) {
                    Some(drawing) => ServerMessage::Canvas {
                        canvas_data: drawing.canvas_data.clone(),
                    },
                    None => ServerMessage::error("No canvas drawing found for this user."),
                },
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::SaveSearch {
            user_id,
            query,
            option,
        } => {
            let mut state = state.lock().await;
            let reply = match (required(&user_id), required(&query), required(&option)) {
                (Some(user_id), Some(query), Some(option)) => ServerMessage::SearchSaved {
                    message: "Search saved successfully!".to_string(),
                    entry: state.record_search(user_id, query, option),
                },
                _ => ServerMessage::error("Missing fields"),
            };
            state.send_to(session_id, reply);
        }
        ClientMessage::GetSearchHistory { user_id } => {
            let state = state.lock().await;
            let reply = match required(&user_id) {
                None => ServerMessage::error(USER_ID_REQUIRED),
                Some(user_id) => match state.search_history(user_id) {
                    history if history.is_empty() => ServerMessage::error("No history found"),
                    history => ServerMessage::SearchHistory { history },
                },
            };
            state.send_to(session_id, reply);
        }
    }
}

/// Relay a chat message to everyone and answer it with the model.
async fn handle_chat(session_id: Uuid, user_id: &str, message: &str, mode: &str, state: &SharedState) {
    let (Some(user_id), Some(message), Some(mode)) =
        (required(user_id), required(message), required(mode))
    else {
        state
            .lock()
            .await
            .send_to(session_id, ServerMessage::error(CHAT_FIELDS_REQUIRED));
        return;
    };

    let mode: ChatMode = match mode.parse() {
        Ok(mode) => mode,
        Err(e) => {
            state.lock().await.send_to(session_id, ServerMessage::error(e.to_string()));
            return;
        }
    };

    let model = {
        let state = state.lock().await;
        state.broadcast(ServerMessage::ReceiveMessage {
            sender: USER_SENDER.to_string(),
            text: format!("{}: {}", mode, message),
        });
        state.model.clone()
    };

    let Some(model) = model else {
        warn!(%session_id, "Chat requested without a configured model");
        state.lock().await.send_to(session_id, ServerMessage::error(CHAT_FAILED));
        return;
    };

    debug!(%session_id, %mode, "Processing chat");
    match model.generate(build_chat_prompt(mode, message)).await {
        Ok(reply) => {
            let answer = format_response(&reply);
            let mut state = state.lock().await;
            state.record_chat(
                user_id,
                [
                    ChatEntry::new(ChatRole::User, message),
                    ChatEntry::new(ChatRole::Ai, answer.clone()),
                ],
            );
            state.broadcast(ServerMessage::ReceiveMessage {
                sender: AI_SENDER.to_string(),
                text: answer,
            });
        }
        Err(e) => {
            error!(%session_id, error = %e, "Chat generation failed");
            state.lock().await.send_to(session_id, ServerMessage::error(CHAT_FAILED));
        }
    }
}

async fn handle_register_paper(
    session_id: Uuid,
    user_id: &str,
    path: &str,
    original_name: &str,
    state: &SharedState,
) {
    let mut state = state.lock().await;

    let (Some(user_id), Some(path)) = (required(user_id), required(path)) else {
        state.send_to(session_id, ServerMessage::error("userId and path are required."));
        return;
    };

    let file = Path::new(path);
    let is_pdf = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf || !file.is_file() {
        state.send_to(session_id, ServerMessage::error("Only PDF files are allowed."));
        return;
    }

    let original_name = match required(original_name) {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string()),
    };

    let paper_id = state.register_paper(user_id, path, &original_name);
    info!(%paper_id, user_id, path, "Question paper registered");
    state.send_to(
        session_id,
        ServerMessage::PaperRegistered {
            message: "Question paper registered successfully.".to_string(),
            paper_id,
        },
    );
}

async fn handle_fetch_questions(
    session_id: Uuid,
    ip: IpAddr,
    paper_id: Option<String>,
    topic: Option<String>,
    question_count: Option<usize>,
    state: &SharedState,
) {
    let count = resolve_count(question_count);
    let paper_id = paper_id.filter(|id| required(id).is_some());
    let topic = topic.filter(|t| required(t).is_some());

    // Look up what the request needs while holding the lock once.
    let (paper_path, model) = {
        let guard = state.lock().await;
        if !guard.admit_question_request(ip) {
            guard.send_to(session_id, ServerMessage::error(TOO_MANY_REQUESTS));
            return;
        }

        let paper_path = match &paper_id {
            Some(id) => match guard.papers.get(id.trim()) {
                Some(paper) => Some(paper.path.clone()),
                None => {
                    guard.send_to(session_id, ServerMessage::error("Question paper not found."));
                    return;
                }
            },
            None => None,
        };
        (paper_path, guard.model.clone())
    };

    let result = if let Some(path) = paper_path {
        match tokio::task::spawn_blocking(move || questions_from_paper(path, count)).await {
            Ok(Ok(questions)) => Ok(questions),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    } else if let Some(topic) = topic {
        generate_topic_quiz(model.as_deref(), topic.trim(), count)
            .await
            .map_err(|e| e.to_string())
    } else {
        state
            .lock()
            .await
            .send_to(session_id, ServerMessage::error("Either paperId or topic is required."));
        return;
    };

    let reply = match result {
        Ok(questions) => {
            debug!(%session_id, count = questions.len(), "Sending questions");
            ServerMessage::Questions { questions }
        }
        Err(e) => {
            error!(%session_id, error = %e, "Error fetching questions");
            ServerMessage::error(QUESTIONS_FAILED)
        }
    };
    state.lock().await.send_to(session_id, reply);
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::Ipv4Addr;

    use super::*;
    use crate::config::RateLimit;
    use crate::generate::testing::{FailingModel, StaticModel};

    const IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn shared(model: Option<Arc<dyn LanguageModel>>) -> SharedState {
        Arc::new(Mutex::new(ServerState::new(model, RateLimit::default())))
    }

    async fn connect(state: &SharedState) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(IP, tx);
        let id = session.id;
        state.lock().await.sessions.insert(id, session);
        (id, rx)
    }

    fn expect_error(rx: &mut mpsc::UnboundedReceiver<ServerMessage>, expected: &str) {
        match rx.try_recv() {
            Ok(ServerMessage::ErrorMessage { error }) => assert_eq!(error, expected),
            other => panic!("expected error {:?}, got {:?}", expected, other),
        }
    }

    fn fetch(paper_id: Option<&str>, topic: Option<&str>, count: Option<usize>) -> ClientMessage {
        ClientMessage::FetchQuestions {
            paper_id: paper_id.map(str::to_string),
            topic: topic.map(str::to_string),
            question_count: count,
        }
    }

    #[tokio::test]
    async fn test_chat_is_relayed_to_everyone() {
        let model = Arc::new(StaticModel::new("**Gravity** pulls. It is weak."));
        let state = shared(Some(model.clone() as Arc<dyn LanguageModel>));
        let (sender, mut sender_rx) = connect(&state).await;
        let (_, mut other_rx) = connect(&state).await;

        let msg = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "gravity".to_string(),
            mode: "Explain Topic".to_string(),
        };
        handle_client_message(sender, IP, msg, &state).await;

        for rx in [&mut sender_rx, &mut other_rx] {
            match rx.try_recv() {
                Ok(ServerMessage::ReceiveMessage { sender, text }) => {
                    assert_eq!(sender, "User");
                    assert_eq!(text, "Explain Topic: gravity");
                }
                other => panic!("unexpected {:?}", other),
            }
            match rx.try_recv() {
                Ok(ServerMessage::ReceiveMessage { sender, text }) => {
                    assert_eq!(sender, "Exam-AI");
                    assert_eq!(text, "Gravity pulls.\nIt is weak.");
                }
                other => panic!("unexpected {:?}", other),
            }
        }

        assert_eq!(state.lock().await.chats["u1"].len(), 2);
        assert!(model.prompts.lock().unwrap()[0].ends_with("Explain the following topic: \"gravity\". Provide examples."));
    }

    #[tokio::test]
    async fn test_chat_validation() {
        let state = shared(Some(Arc::new(StaticModel::new("ok")) as Arc<dyn LanguageModel>));
        let (id, mut rx) = connect(&state).await;

        let blank = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "   ".to_string(),
            mode: "Explain Topic".to_string(),
        };
        handle_client_message(id, IP, blank, &state).await;
        expect_error(&mut rx, CHAT_FIELDS_REQUIRED);

        let bad_mode = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "gravity".to_string(),
            mode: "Sing a Song".to_string(),
        };
        handle_client_message(id, IP, bad_mode, &state).await;
        expect_error(&mut rx, "Invalid mode selected.");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_failure_only_reaches_sender() {
        let state = shared(Some(Arc::new(FailingModel) as Arc<dyn LanguageModel>));
        let (id, mut rx) = connect(&state).await;
        let (_, mut other_rx) = connect(&state).await;

        let msg = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "gravity".to_string(),
            mode: "Start a Test".to_string(),
        };
        handle_client_message(id, IP, msg, &state).await;

        assert!(matches!(rx.try_recv(), Ok(ServerMessage::ReceiveMessage { .. })));
        expect_error(&mut rx, CHAT_FAILED);
        assert!(matches!(other_rx.try_recv(), Ok(ServerMessage::ReceiveMessage { .. })));
        assert!(other_rx.try_recv().is_err());
        assert!(state.lock().await.chats.is_empty());
    }

    #[tokio::test]
    async fn test_chat_without_model() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;
        let msg = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "gravity".to_string(),
            mode: "Explore Questions".to_string(),
        };
        handle_client_message(id, IP, msg, &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::ReceiveMessage { .. })));
        expect_error(&mut rx, CHAT_FAILED);
    }

    #[tokio::test]
    async fn test_topic_questions_without_model_are_mocked() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;
        handle_client_message(id, IP, fetch(None, Some("Cell%20Biology"), None), &state).await;

        match rx.try_recv() {
            Ok(ServerMessage::Questions { questions }) => {
                assert_eq!(questions.len(), 2);
                assert_eq!(questions[0].prompt, "Mocked Question 1 about Cell Biology");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_requires_paper_or_topic() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;
        handle_client_message(id, IP, fetch(Some("  "), None, Some(3)), &state).await;
        expect_error(&mut rx, "Either paperId or topic is required.");
    }

    #[tokio::test]
    async fn test_unknown_paper() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;
        handle_client_message(id, IP, fetch(Some("nope"), Some("ignored"), None), &state).await;
        expect_error(&mut rx, "Question paper not found.");
    }

    #[tokio::test]
    async fn test_registered_paper_that_is_not_a_pdf() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        write!(file, "Q1. not really a pdf").unwrap();
        let path = file.path().display().to_string();

        let register = ClientMessage::RegisterPaper {
            user_id: "u1".to_string(),
            path,
            original_name: String::new(),
        };
        handle_client_message(id, IP, register, &state).await;
        let paper_id = match rx.try_recv() {
            Ok(ServerMessage::PaperRegistered { paper_id, .. }) => paper_id,
            other => panic!("unexpected {:?}", other),
        };

        {
            let state = state.lock().await;
            let paper = &state.papers[&paper_id];
            assert!(paper.original_name.ends_with(".pdf"));
        }

        handle_client_message(id, IP, fetch(Some(&paper_id), None, Some(1)), &state).await;
        expect_error(&mut rx, QUESTIONS_FAILED);
    }

    #[tokio::test]
    async fn test_register_rejects_non_pdf() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();

        let register = ClientMessage::RegisterPaper {
            user_id: "u1".to_string(),
            path: file.path().display().to_string(),
            original_name: "notes.txt".to_string(),
        };
        handle_client_message(id, IP, register, &state).await;
        expect_error(&mut rx, "Only PDF files are allowed.");

        let missing = ClientMessage::RegisterPaper {
            user_id: " ".to_string(),
            path: "paper.pdf".to_string(),
            original_name: String::new(),
        };
        handle_client_message(id, IP, missing, &state).await;
        expect_error(&mut rx, "userId and path are required.");
    }

    #[tokio::test]
    async fn test_question_requests_are_rate_limited() {
        let state = Arc::new(Mutex::new(ServerState::new(
            None,
            RateLimit {
                max_requests: 1,
                window: Duration::from_secs(60),
            },
        )));
        let (id, mut rx) = connect(&state).await;

        handle_client_message(id, IP, fetch(None, Some("algebra"), Some(1)), &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Questions { .. })));

        handle_client_message(id, IP, fetch(None, Some("algebra"), Some(1)), &state).await;
        expect_error(&mut rx, TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_test_results() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        handle_client_message(id, IP, ClientMessage::GetTestResult { user_id: "u1".to_string() }, &state).await;
        expect_error(&mut rx, "No test result found for this user.");

        for percentage in [50.0, 75.0] {
            let save = ClientMessage::SaveTestResult {
                user_id: "u1".to_string(),
                percentage: Some(percentage),
                topic: Some("algebra".to_string()),
                paper_id: None,
            };
            handle_client_message(id, IP, save, &state).await;
            assert!(matches!(rx.try_recv(), Ok(ServerMessage::TestResultSaved { .. })));
        }

        handle_client_message(id, IP, ClientMessage::GetTestResult { user_id: "u1".to_string() }, &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::LatestTestResult { percentage }) if percentage == 75.0));

        handle_client_message(id, IP, ClientMessage::GetTestHistory { user_id: "u1".to_string() }, &state).await;
        match rx.try_recv() {
            Ok(ServerMessage::TestHistory { history }) => {
                let percentages: Vec<_> = history.iter().map(|r| r.percentage).collect();
                assert_eq!(percentages, [75.0, 50.0]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let invalid = ClientMessage::SaveTestResult {
            user_id: "u1".to_string(),
            percentage: Some(f64::NAN),
            topic: None,
            paper_id: None,
        };
        handle_client_message(id, IP, invalid, &state).await;
        expect_error(&mut rx, "userId and percentage are required.");
    }

    #[tokio::test]
    async fn test_frames_with_missing_fields_get_an_error() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        handle_client_text(id, IP, r#"{"type":"SaveTestResult","userId":"u1"}"#, &state).await;
        expect_error(&mut rx, "userId and percentage are required.");

        handle_client_text(id, IP, r#"{"type":"GetTestResult"}"#, &state).await;
        expect_error(&mut rx, USER_ID_REQUIRED);

        handle_client_text(id, IP, r#"{"type":"GetTestHistory","userId":"  "}"#, &state).await;
        expect_error(&mut rx, USER_ID_REQUIRED);

        handle_client_text(id, IP, r#"{"type":"SendMessage","message":"gravity"}"#, &state).await;
        expect_error(&mut rx, CHAT_FIELDS_REQUIRED);

        handle_client_text(id, IP, "not json", &state).await;
        expect_error(&mut rx, INVALID_MESSAGE);
        handle_client_text(id, IP, r#"{"type":"Shutdown"}"#, &state).await;
        expect_error(&mut rx, INVALID_MESSAGE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_frames_are_dispatched() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        handle_client_text(id, IP, r#"{"type":"SaveTestResult","userId":"u1","percentage":62.5}"#, &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::TestResultSaved { .. })));
        handle_client_text(id, IP, r#"{"type":"GetTestResult","userId":"u1"}"#, &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::LatestTestResult { percentage }) if percentage == 62.5));
    }

    #[tokio::test]
    async fn test_chat_history() {
        let state = shared(Some(Arc::new(StaticModel::new("Cells divide.")) as Arc<dyn LanguageModel>));
        let (id, mut rx) = connect(&state).await;

        let msg = ClientMessage::SendMessage {
            user_id: "u1".to_string(),
            message: "mitosis".to_string(),
            mode: "Explain Topic".to_string(),
        };
        handle_client_message(id, IP, msg, &state).await;
        while rx.try_recv().is_ok() {}

        handle_client_text(id, IP, r#"{"type":"GetChatHistory","userId":"u1"}"#, &state).await;
        match rx.try_recv() {
            Ok(ServerMessage::ChatHistory { history }) => {
                let lines: Vec<_> = history.iter().map(|e| (e.role, e.content.as_str())).collect();
                assert_eq!(lines, [(ChatRole::User, "mitosis"), (ChatRole::Ai, "Cells divide.")]);
            }
            other => panic!("unexpected {:?}", other),
        }

        handle_client_text(id, IP, r#"{"type":"GetChatHistory","userId":"u2"}"#, &state).await;
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::ChatHistory { history }) if history.is_empty()));

        handle_client_text(id, IP, r#"{"type":"GetChatHistory"}"#, &state).await;
        expect_error(&mut rx, USER_ID_REQUIRED);
    }

    #[tokio::test]
    async fn test_canvas() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        handle_client_text(id, IP, r#"{"type":"GetCanvas","userId":"u1"}"#, &state).await;
        expect_error(&mut rx, "No canvas drawing found for this user.");

        handle_client_text(id, IP, r#"{"type":"SaveCanvas","userId":"u1"}"#, &state).await;
        expect_error(&mut rx, "userId and canvasData are required.");

        for data in ["data:image/png;base64,AAAA", "data:image/png;base64,BBBB"] {
            let save = ClientMessage::SaveCanvas {
                user_id: "u1".to_string(),
                canvas_data: data.to_string(),
            };
            handle_client_message(id, IP, save, &state).await;
            assert!(matches!(rx.try_recv(), Ok(ServerMessage::CanvasSaved { .. })));
        }

        handle_client_text(id, IP, r#"{"type":"GetCanvas","userId":"u1"}"#, &state).await;
        match rx.try_recv() {
            Ok(ServerMessage::Canvas { canvas_data }) => assert_eq!(canvas_data, "data:image/png;base64,BBBB"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_history() {
        let state = shared(None);
        let (id, mut rx) = connect(&state).await;

        handle_client_text(id, IP, r#"{"type":"GetSearchHistory","userId":"u1"}"#, &state).await;
        expect_error(&mut rx, "No history found");

        handle_client_text(id, IP, r#"{"type":"SaveSearch","userId":"u1","query":"osmosis"}"#, &state).await;
        expect_error(&mut rx, "Missing fields");

        for query in ["osmosis", "diffusion"] {
            let save = ClientMessage::SaveSearch {
                user_id: "u1".to_string(),
                query: query.to_string(),
                option: "Explain Topic".to_string(),
            };
            handle_client_message(id, IP, save, &state).await;
            match rx.try_recv() {
                Ok(ServerMessage::SearchSaved { entry, .. }) => assert_eq!(entry.query, query),
                other => panic!("unexpected {:?}", other),
            }
        }

        handle_client_text(id, IP, r#"{"type":"GetSearchHistory","userId":"u1"}"#, &state).await;
        match rx.try_recv() {
            Ok(ServerMessage::SearchHistory { history }) => {
                let queries: Vec<_> = history.iter().map(|e| e.query.as_str()).collect();
                assert_eq!(queries, ["diffusion", "osmosis"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
