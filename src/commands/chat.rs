use crate::models::chat::{ChatMessage, SubjectInfo, TimetableEntry};

use super::{AppState, CommandError, CommandResult};

pub async fn chat_send(state: &AppState, message: String) -> CommandResult<ChatMessage> {
    state
        .chat()
        .send(&message)
        .await
        .map_err(CommandError::from)
}

pub fn chat_transcript(state: &AppState) -> CommandResult<Vec<ChatMessage>> {
    state.chat().transcript().map_err(CommandError::from)
}

pub async fn campus_timetable_fetch(
    state: &AppState,
    day: String,
) -> CommandResult<TimetableEntry> {
    state
        .chat()
        .timetable(&day)
        .await
        .map_err(CommandError::from)
}

pub async fn campus_subject_fetch(state: &AppState, subject: String) -> CommandResult<SubjectInfo> {
    state
        .chat()
        .subject_info(&subject)
        .await
        .map_err(CommandError::from)
}
